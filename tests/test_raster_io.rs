use ndarray::{array, Array2, Array3};
use sarlink::io::{load, save, LoadOptions, Loaded, RasterCodec};
use sarlink::types::{RscData, SarComplex, SarError};
use std::fs;
use tempfile::tempdir;

fn write_rsc(dir: &std::path::Path, width: usize, file_length: usize) {
    fs::write(
        dir.join("dem.rsc"),
        format!("WIDTH {}\nFILE_LENGTH {}\n", width, file_length),
    )
    .expect("failed to write rsc fixture");
}

#[test]
fn test_stacked_unw_end_to_end() -> anyhow::Result<()> {
    // Initialize logging to see the dispatch decisions
    let _ = env_logger::try_init();

    let dir = tempdir()?;
    let path = dir.path().join("20141128_20150503.unw");
    let floats = [
        10.0f32, 11.0, 12.0, 0.1, 0.2, 0.3, // row 0: amplitude | phase
        20.0, 21.0, 22.0, 0.4, 0.5, 0.6, // row 1
    ];
    fs::write(&path, RasterCodec::f32_to_bytes(&floats))?;
    write_rsc(dir.path(), 3, 2);

    // Default load returns just the phase band
    let phase = load(&path, &LoadOptions::default())?.into_real()?;
    assert_eq!(phase, array![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]);

    // return_amp gives both bands with amplitude first
    let both = load(
        &path,
        &LoadOptions {
            return_amp: true,
            ..Default::default()
        },
    )?
    .into_stack()?;
    assert_eq!(both.dim(), (2, 2, 3));
    assert_eq!(both[[0, 0, 0]], 10.0);
    assert_eq!(both[[0, 1, 2]], 22.0);
    assert_eq!(both[[1, 0, 0]], 0.1);

    // Writing the stack back reproduces the original bytes exactly
    let out_path = dir.path().join("rewritten.unw");
    save(&out_path, &Loaded::Stack(both))?;
    assert_eq!(fs::read(&out_path)?, fs::read(&path)?);
    Ok(())
}

#[test]
fn test_complex_int_round_trip_through_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("20141128_20150503.int");
    let img: Array2<SarComplex> = array![
        [SarComplex::new(1.0, 0.5), SarComplex::new(-2.0, 1.5)],
        [SarComplex::new(0.0, -4.0), SarComplex::new(3.25, 0.0)],
    ];
    save(&path, &Loaded::Complex(img.clone())).unwrap();
    write_rsc(dir.path(), 2, 2);

    let back = load(&path, &LoadOptions::default())
        .unwrap()
        .into_complex()
        .unwrap();
    assert_eq!(back, img);
}

#[test]
fn test_real_load_with_downsampling() {
    let dir = tempdir().unwrap();
    // UAVSAR-style real file sized by explicit metadata, no sidecar
    let path = dir.path().join("scene_HHHH_ML5X5.grd");
    let floats: Vec<f32> = (0..16).map(|v| v as f32).collect();
    fs::write(&path, RasterCodec::f32_to_bytes(&floats)).unwrap();

    let options = LoadOptions {
        downsample: Some(2),
        ann_info: Some(sarlink::AnnInfo { rows: 4, cols: 4 }),
        ..Default::default()
    };
    let img = load(&path, &options).unwrap().into_real().unwrap();
    assert_eq!(img.dim(), (2, 2));
    // Block means of the 2x2 looks windows
    assert_eq!(img[[0, 0]], 2.5);
    assert_eq!(img[[1, 1]], 12.5);
}

#[test]
fn test_stacked_downsample_is_strided() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pair.cc");
    // 4x4 image, both bands hold the row*10 + col pattern
    let mut floats = Vec::new();
    for row in 0..4 {
        for band in 0..2 {
            for col in 0..4 {
                floats.push((band * 100 + row * 10 + col) as f32);
            }
        }
    }
    fs::write(&path, RasterCodec::f32_to_bytes(&floats)).unwrap();
    write_rsc(dir.path(), 4, 4);

    let options = LoadOptions {
        downsample: Some(2),
        ..Default::default()
    };
    let corr = load(&path, &options).unwrap().into_real().unwrap();
    assert_eq!(corr.dim(), (2, 2));
    // Strided subsampling keeps the original pixel values
    assert_eq!(corr[[0, 0]], 100.0);
    assert_eq!(corr[[1, 1]], 122.0);
}

#[test]
fn test_size_mismatch_aborts_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.amp");
    fs::write(&path, RasterCodec::f32_to_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();

    let options = LoadOptions::with_rsc_data(RscData::new(4, 2));
    match load(&path, &options) {
        Err(SarError::SizeMismatch { cols, n_samples }) => {
            assert_eq!(cols, 4);
            assert_eq!(n_samples, 5);
        }
        other => panic!("expected SizeMismatch, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_unknown_extension() {
    let err = load(
        std::path::Path::new("mystery.xyz"),
        &LoadOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SarError::UnsupportedFormat(_)));
}

#[test]
fn test_npy_stack_passthrough() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("deformation.npy");
    let stack = Array3::from_shape_fn((2, 3, 3), |(e, r, c)| (e * 9 + r * 3 + c) as f32);
    save(&path, &Loaded::Stack(stack.clone())).unwrap();

    let back = load(&path, &LoadOptions::default())
        .unwrap()
        .into_stack()
        .unwrap();
    assert_eq!(back, stack);
}
