use crate::core::multilook::{self, Looks};
use crate::io::annotation;
use crate::io::dem;
use crate::io::npy;
use crate::io::raster::RasterCodec;
use crate::io::rsc;
use crate::types::{
    AnnInfo, BandStack, ComplexImage, RealImage, RscData, SampleKind, SarError, SarResult,
};
use chrono::NaiveDate;
use ndarray::{s, Array2, Array3};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Closed set of known file format families. Each extension maps to exactly
/// one family, which carries its decode policy; anything else is
/// `UnsupportedFormat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    /// `.npy`: passthrough native array format
    NumpyArray,
    /// `.geojson`: structured text, not raster
    GeoJson,
    /// `.rsc`: the sidecar descriptor itself
    Resource,
    /// `.dem`, `.hgt`: int16 elevation models with their own loader
    Elevation,
    /// `.png`, `.tif`, `.tiff`, `.jpg`: generic images, loaded as luminance
    Image,
    /// `.cc`, `.unw`, `.unwflat`, `.unw.grd`, `.cc.grd`: dual-band stacked
    Stacked,
    /// `.amp`, `.cor`, `.cor.grd`: one float per pixel
    Real,
    /// `.int`, `.slc`, `.geo`, `.int.grd`: interleaved real/imag floats
    Complex,
    /// `.grd`, `.mlc`: real or complex depending on the polarization tokens
    /// in the filename
    PolDependent,
}

impl FormatFamily {
    /// Classify a path by its (possibly compound) extension
    pub fn from_path(path: &Path) -> SarResult<Self> {
        let ext = full_extension(path)?;
        Self::from_extension(&ext)
    }

    pub fn from_extension(ext: &str) -> SarResult<Self> {
        match ext {
            ".npy" => Ok(Self::NumpyArray),
            ".geojson" => Ok(Self::GeoJson),
            ".rsc" => Ok(Self::Resource),
            ".dem" | ".hgt" => Ok(Self::Elevation),
            ".png" | ".tif" | ".tiff" | ".jpg" => Ok(Self::Image),
            ".cc" | ".unw" | ".unwflat" | ".unw.grd" | ".cc.grd" => Ok(Self::Stacked),
            ".int" | ".slc" | ".geo" | ".int.grd" => Ok(Self::Complex),
            ".amp" | ".cor" | ".cor.grd" => Ok(Self::Real),
            ".grd" | ".mlc" => Ok(Self::PolDependent),
            other => Err(SarError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Extract the effective extension, resolving `.grd` products that are
/// really compound (`.int.grd`, `.unw.grd`, `.cor.grd`, `.cc.grd`).
pub fn full_extension(path: &Path) -> SarResult<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SarError::UnsupportedFormat(path.display().to_string()))?
        .to_lowercase();
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() < 2 || parts.last().unwrap().is_empty() {
        return Err(SarError::UnsupportedFormat(name));
    }
    let last = format!(".{}", parts.last().unwrap());
    if last == ".grd"
        && parts.len() >= 3
        && [".int", ".unw", ".cor", ".cc"]
            .iter()
            .any(|t| name.contains(t))
    {
        return Ok(format!(".{}.{}", parts[parts.len() - 2], parts.last().unwrap()));
    }
    Ok(last)
}

/// Is the pixel data of `path` complex?
///
/// Pol-dependent products go by the polarization tokens in the filename;
/// everything else is a static property of the extension table.
pub fn is_complex(path: &Path) -> SarResult<bool> {
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    match FormatFamily::from_path(path)? {
        FormatFamily::Complex | FormatFamily::Stacked => Ok(true),
        FormatFamily::Real => Ok(false),
        FormatFamily::PolDependent => Ok(annotation::has_complex_pol(filename)),
        other => Err(SarError::UnsupportedFormat(format!(
            "is_complex not defined for {:?}",
            other
        ))),
    }
}

/// Pixel kind `load` will decode for a single-band raster path.
pub fn sample_kind(path: &Path) -> SarResult<SampleKind> {
    if is_complex(path)? {
        Ok(SampleKind::Complex)
    } else {
        Ok(SampleKind::Real)
    }
}

/// Caller-side knobs for `load`. All fields optional; the default loads at
/// full resolution and discovers metadata from the file's directory.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Downsample both axes by this factor (shorthand for equal looks)
    pub downsample: Option<usize>,
    /// Independent (row, col) look factors
    pub looks: Option<Looks>,
    /// Explicit path to a `.rsc` sidecar descriptor
    pub rsc_file: Option<PathBuf>,
    /// Already-parsed sidecar descriptor
    pub rsc_data: Option<RscData>,
    /// Already-parsed annotation metadata
    pub ann_info: Option<AnnInfo>,
    /// For stacked files: return both bands instead of just the data band
    pub return_amp: bool,
}

impl LoadOptions {
    pub fn with_rsc_data(rsc_data: RscData) -> Self {
        Self {
            rsc_data: Some(rsc_data),
            ..Default::default()
        }
    }

    fn resolve_looks(&self) -> SarResult<Looks> {
        let looks = match (self.downsample, self.looks) {
            (Some(d), _) => (d, d),
            (None, Some(l)) => l,
            (None, None) => (1, 1),
        };
        multilook::validate_looks(looks)?;
        Ok(looks)
    }
}

/// What `load` hands back, varying by format family
#[derive(Debug, Clone)]
pub enum Loaded {
    Real(RealImage),
    Complex(ComplexImage),
    Stack(BandStack),
    Image(Array2<u8>),
    GeoJson(serde_json::Value),
    Rsc(RscData),
}

impl Loaded {
    pub fn into_real(self) -> SarResult<RealImage> {
        match self {
            Loaded::Real(img) => Ok(img),
            other => Err(SarError::InvalidShape(format!(
                "expected a real raster, got {:?}",
                variant_name(&other)
            ))),
        }
    }

    pub fn into_complex(self) -> SarResult<ComplexImage> {
        match self {
            Loaded::Complex(img) => Ok(img),
            other => Err(SarError::InvalidShape(format!(
                "expected a complex raster, got {:?}",
                variant_name(&other)
            ))),
        }
    }

    pub fn into_stack(self) -> SarResult<BandStack> {
        match self {
            Loaded::Stack(stack) => Ok(stack),
            other => Err(SarError::InvalidShape(format!(
                "expected a band stack, got {:?}",
                variant_name(&other)
            ))),
        }
    }
}

fn variant_name(loaded: &Loaded) -> &'static str {
    match loaded {
        Loaded::Real(_) => "Real",
        Loaded::Complex(_) => "Complex",
        Loaded::Stack(_) => "Stack",
        Loaded::Image(_) => "Image",
        Loaded::GeoJson(_) => "GeoJson",
        Loaded::Rsc(_) => "Rsc",
    }
}

/// Examine the file type and run the appropriate decoder.
///
/// Look factors are validated before any I/O. Metadata resolution order:
/// caller-supplied descriptor, then a discovered `.rsc` sidecar in the same
/// directory, then a parsed annotation file; nothing resolving is fatal for
/// formats that need sizing.
///
/// An `.rsc` descriptor, discovered or supplied, marks the file as Sentinel
/// output and switches nominally real extensions to the complex decode. A
/// stray `.rsc` next to a UAVSAR real product will therefore flip it to the
/// complex path; pass explicit `ann_info` (or keep sidecars out of UAVSAR
/// directories) to avoid that.
pub fn load(path: &Path, options: &LoadOptions) -> SarResult<Loaded> {
    let looks = options.resolve_looks()?;
    let family = FormatFamily::from_path(path)?;
    log::debug!("loading {} as {:?}", path.display(), family);

    match family {
        FormatFamily::NumpyArray => {
            let (shape, data) = npy::read_npy_raw(path)?;
            match shape.len() {
                2 => {
                    let arr = Array2::from_shape_vec((shape[0], shape[1]), data)
                        .map_err(|e| SarError::InvalidShape(e.to_string()))?;
                    Ok(Loaded::Real(multilook::take_looks(&arr, looks)?))
                }
                3 => {
                    let arr = Array3::from_shape_vec((shape[0], shape[1], shape[2]), data)
                        .map_err(|e| SarError::InvalidShape(e.to_string()))?;
                    Ok(Loaded::Stack(multilook::subsample_stack(&arr, looks)?))
                }
                n => Err(SarError::InvalidShape(format!(
                    "cannot load rank-{} npy as a raster",
                    n
                ))),
            }
        }
        FormatFamily::GeoJson => {
            let text = fs::read_to_string(path)?;
            Ok(Loaded::GeoJson(serde_json::from_str(&text)?))
        }
        FormatFamily::Resource => Ok(Loaded::Rsc(rsc::load_rsc(path)?)),
        FormatFamily::Image => {
            let img = image::open(path)?.to_luma8();
            let (w, h) = img.dimensions();
            let arr = Array2::from_shape_fn((h as usize, w as usize), |(r, c)| {
                img.get_pixel(c as u32, r as u32)[0]
            });
            Ok(Loaded::Image(arr))
        }
        FormatFamily::Elevation => {
            let (rsc_data, ann_info) = resolve_metadata(path, options)?;
            let (_rows, cols) =
                RasterCodec::resolve_rows_cols(path, rsc_data.as_ref(), ann_info.as_ref())?;
            let elev = dem::load_elevation(path, cols)?;
            Ok(Loaded::Real(multilook::take_looks(&elev, looks)?))
        }
        FormatFamily::Stacked => {
            let (rsc_data, ann_info) = resolve_metadata(path, options)?;
            let (_rows, cols) =
                RasterCodec::resolve_rows_cols(path, rsc_data.as_ref(), ann_info.as_ref())?;
            let bytes = fs::read(path)?;
            let stack = RasterCodec::decode_stacked(&bytes, cols)?;
            // Stacked products downsample by strided slicing, not averaging
            let stack = multilook::subsample_stack(&stack, looks)?;
            if options.return_amp {
                Ok(Loaded::Stack(stack))
            } else {
                Ok(Loaded::Real(stack.slice(s![1, .., ..]).to_owned()))
            }
        }
        FormatFamily::Real | FormatFamily::Complex | FormatFamily::PolDependent => {
            let (rsc_data, ann_info) = resolve_metadata(path, options)?;
            let (_rows, cols) =
                RasterCodec::resolve_rows_cols(path, rsc_data.as_ref(), ann_info.as_ref())?;
            // Sidecar rsc data implies Sentinel processing, whose non-stacked
            // products are complex even for nominally real extensions
            let complex = rsc_data.is_some() || is_complex(path)?;
            let bytes = fs::read(path)?;
            if complex {
                let img = RasterCodec::decode_complex(&bytes, cols)?;
                Ok(Loaded::Complex(multilook::take_looks(&img, looks)?))
            } else {
                let img = RasterCodec::decode_real(&bytes, cols)?;
                Ok(Loaded::Real(multilook::take_looks(&img, looks)?))
            }
        }
    }
}

/// Save `data` in the format implied by the path's extension.
///
/// Real/complex/pol-dependent extensions write raw little-endian floats;
/// stacked extensions require the 2-band stack; elevation writes int16.
pub fn save(path: &Path, data: &Loaded) -> SarResult<()> {
    let family = FormatFamily::from_path(path)?;
    match (family, data) {
        (FormatFamily::Stacked, Loaded::Stack(stack)) => {
            let bytes = RasterCodec::encode_stacked(stack)?;
            fs::write(path, bytes)?;
            Ok(())
        }
        (FormatFamily::Stacked, _) => Err(SarError::InvalidShape(
            "need a [2, rows, cols] stack ([amp, data]) to save a stacked file".to_string(),
        )),
        (
            FormatFamily::Real | FormatFamily::Complex | FormatFamily::PolDependent,
            Loaded::Real(img),
        ) => {
            fs::write(path, RasterCodec::encode_real(img))?;
            Ok(())
        }
        (
            FormatFamily::Real | FormatFamily::Complex | FormatFamily::PolDependent,
            Loaded::Complex(img),
        ) => {
            fs::write(path, RasterCodec::encode_complex(img))?;
            Ok(())
        }
        (FormatFamily::Elevation, Loaded::Real(img)) => dem::save_elevation(path, img),
        (FormatFamily::NumpyArray, Loaded::Real(img)) => npy::write_npy(path, img.view()),
        (FormatFamily::NumpyArray, Loaded::Stack(stack)) => npy::write_npy(path, stack.view()),
        (family, _) => Err(SarError::UnsupportedFormat(format!(
            "saving {:?} not implemented for {}",
            family,
            path.display()
        ))),
    }
}

/// Search a directory for the single expected `.rsc` sidecar.
///
/// Zero candidates is tolerated as "no metadata"; more than one means we
/// cannot know which descriptor sizes the file, and guessing is worse than
/// failing.
pub fn find_rsc_file(data_path: &Path) -> SarResult<Option<PathBuf>> {
    let directory = data_path.parent().unwrap_or_else(|| Path::new("."));
    let mut candidates: Vec<PathBuf> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("rsc"))
        .collect();
    candidates.sort();
    match candidates.len() {
        0 => {
            log::info!("no .rsc file found in {}", directory.display());
            Ok(None)
        }
        1 => Ok(Some(candidates.remove(0))),
        _ => Err(SarError::AmbiguousSidecar {
            path: data_path.to_path_buf(),
            candidates,
        }),
    }
}

fn resolve_metadata(
    path: &Path,
    options: &LoadOptions,
) -> SarResult<(Option<RscData>, Option<AnnInfo>)> {
    if options.rsc_data.is_some() && options.ann_info.is_some() {
        return Err(SarError::AmbiguousMetadata(path.to_path_buf()));
    }

    let mut rsc_data = options.rsc_data.clone();
    if rsc_data.is_none() {
        if let Some(rsc_file) = &options.rsc_file {
            rsc_data = Some(rsc::load_rsc(rsc_file)?);
        }
    }
    let mut ann_info = options.ann_info.clone();

    if rsc_data.is_none() && ann_info.is_none() {
        if let Some(found) = find_rsc_file(path)? {
            rsc_data = Some(rsc::load_rsc(&found)?);
        }
    }
    if rsc_data.is_none() && ann_info.is_none() {
        ann_info = annotation::find_ann_info(path)?;
    }
    Ok((rsc_data, ann_info))
}

/// Load a set of same-shape real rasters into one `[n, rows, cols]` stack.
pub fn load_stack(paths: &[PathBuf], options: &LoadOptions) -> SarResult<Array3<f32>> {
    let first_path = paths
        .first()
        .ok_or_else(|| SarError::InvalidParameter("load_stack needs at least one file".into()))?;
    let first = load(first_path, options)?.into_real()?;
    let (rows, cols) = first.dim();

    let mut out = Array3::<f32>::zeros((paths.len(), rows, cols));
    out.slice_mut(s![0, .., ..]).assign(&first);
    for (idx, path) in paths.iter().enumerate().skip(1) {
        let img = load(path, options)?.into_real()?;
        if img.dim() != (rows, cols) {
            return Err(SarError::InvalidShape(format!(
                "{} is {:?}, expected {:?}",
                path.display(),
                img.dim(),
                (rows, cols)
            )));
        }
        out.slice_mut(s![idx, .., ..]).assign(&img);
    }
    Ok(out)
}

/// All files in `directory` ending with `file_ext`, in name-sorted order
pub fn find_files(directory: &Path, file_ext: &str) -> SarResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(file_ext))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Parse the acquisition dates of the `.geo` files in a directory, sorted
/// ascending. Handles `S1A_YYYYMMDD.geo` / `S1B_...` and bare `YYYYMMDD.geo`
/// names.
pub fn find_geo_dates(directory: &Path) -> SarResult<Vec<NaiveDate>> {
    let geo_files = find_files(directory, ".geo")?;
    if geo_files.is_empty() {
        return Err(SarError::InvalidParameter(format!(
            "no .geo files found in {}",
            directory.display()
        )));
    }
    let re = Regex::new(r"^(?:S1[AB]_)?(\d{8})\.geo$")
        .map_err(|e| SarError::Parse(format!("regex error: {}", e)))?;
    let mut dates = Vec::with_capacity(geo_files.len());
    for path in &geo_files {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let caps = re.captures(name).ok_or_else(|| {
            SarError::Parse(format!("cannot parse acquisition date from {}", name))
        })?;
        let date = NaiveDate::parse_from_str(&caps[1], "%Y%m%d")
            .map_err(|e| SarError::Parse(format!("{}: {}", name, e)))?;
        dates.push(date);
    }
    dates.sort();
    Ok(dates)
}
