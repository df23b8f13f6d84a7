//! End-to-end behaviour through the public API: normalization, diffusion and
//! output mapping.

use dither_diffusion::dither::{
    adaptive_diffuse, error_diffuse, kernel_info, list_kernel_aliases, lookup_kernel,
    palette_diffuse, resolve_kernel_name, AdaptiveConfig, AdaptiveMethod, DiffusionConfig,
    Palette,
};
use dither_diffusion::grayscale::{grayscale, map_threshold, prepare_rgb, ImageView, RgbBuffer};
use dither_diffusion::output::{to_u8_image, OutputType};
use dither_diffusion::{DitherError, ErrorKind, GrayBuffer};

fn ramp(width: usize, height: usize) -> Vec<u8> {
    (0..width * height)
        .map(|i| ((i % width) * 255 / (width - 1).max(1)) as u8)
        .collect()
}

fn gray_of(data: &[u8], width: usize, height: usize) -> GrayBuffer {
    let view = ImageView::new(data, &[height, width]).unwrap();
    grayscale(&view).unwrap()
}

#[test]
fn test_uniform_200_first_row_saturates() {
    let data = [200u8; 16];
    let gray = gray_of(&data, 4, 4);
    let cfg = DiffusionConfig { threshold: 128.0, serpentine: false };
    let out = error_diffuse(&gray, "FS", &cfg, None).unwrap();
    assert!(out.as_slice()[..4].iter().all(|&v| v == 255));
    // Density tracks the input level
    let on = out.as_slice().iter().filter(|&&v| v == 255).count();
    assert_eq!(on, 13);
}

#[test]
fn test_ostromoukhov_all_black() {
    let data = [0u8; 64];
    let gray = gray_of(&data, 8, 8);
    let out = adaptive_diffuse(&gray, &AdaptiveConfig::default(), None).unwrap();
    assert!(out.as_slice().iter().all(|&v| v == 0));
}

/// Black/white palette and threshold-128 scalar mode agree unless an effective
/// value lands in (127.5, 128). Denominator-1 kernels never leave integers.
#[test]
fn test_black_white_palette_equals_binary() {
    let (w, h) = (32, 8);
    let data = ramp(w, h);
    let gray = gray_of(&data, w, h);
    let rgb = RgbBuffer::from_gray(&gray);
    let palette = Palette::rgb(&[[0, 0, 0], [255, 255, 255]]).unwrap();

    for kernel in ["H", "V", "M"] {
        let scalar = error_diffuse(&gray, kernel, &DiffusionConfig::default(), None).unwrap();
        let pal = palette_diffuse(&rgb, &palette, kernel, true, None).unwrap();
        let expanded: Vec<u8> = scalar.as_slice().iter().flat_map(|&v| [v, v, v]).collect();
        assert_eq!(pal.as_slice(), expanded.as_slice(), "kernel {}", kernel);
    }
}

#[test]
fn test_black_white_palette_can_differ_with_fractional_weights() {
    // JJN pushes 7/48 of 6 right: 127 + 0.875 = 127.875
    let data = [6u8, 127];
    let gray = gray_of(&data, 2, 1);
    let rgb = RgbBuffer::from_gray(&gray);
    let palette = Palette::gray_ramp(2).unwrap();
    let cfg = DiffusionConfig { threshold: 128.0, serpentine: false };

    let scalar = error_diffuse(&gray, "JJN", &cfg, None).unwrap();
    let pal = palette_diffuse(&rgb, &palette, "JJN", false, None).unwrap();
    assert_eq!(scalar.as_slice(), &[0, 0]);
    assert_eq!(pal.as_slice(), &[0, 0, 0, 255, 255, 255]);
}

#[test]
fn test_zhou_fang_without_noise_is_ostromoukhov_at_128() {
    let (w, h) = (40, 12);
    let data = ramp(w, h);
    let gray = gray_of(&data, w, h);
    let zf = AdaptiveConfig {
        method: AdaptiveMethod::ZhouFang,
        noise_scale: 0.0,
        seed: None,
        ..AdaptiveConfig::default()
    };
    let ostro = AdaptiveConfig {
        method: AdaptiveMethod::Ostromoukhov,
        threshold: 128.0,
        ..AdaptiveConfig::default()
    };
    let a = adaptive_diffuse(&gray, &zf, None).unwrap();
    let b = adaptive_diffuse(&gray, &ostro, None).unwrap();
    assert_eq!(a.as_slice(), b.as_slice());
}

#[test]
fn test_zhou_fang_seed_reproducible() {
    let (w, h) = (24, 24);
    let gray = gray_of(&ramp(w, h), w, h);
    let cfg = AdaptiveConfig {
        method: AdaptiveMethod::ZhouFang,
        seed: Some(1234),
        ..AdaptiveConfig::default()
    };
    let a = adaptive_diffuse(&gray, &cfg, None).unwrap();
    let b = adaptive_diffuse(&gray, &cfg, None).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_every_alias_resolves_to_same_kernel() {
    for (alias, canon) in list_kernel_aliases() {
        assert_eq!(resolve_kernel_name(alias), canon);
        assert_eq!(lookup_kernel(resolve_kernel_name(alias)).unwrap(), lookup_kernel(canon).unwrap());
        assert_eq!(kernel_info(alias).unwrap().name, canon);
    }
}

#[test]
fn test_dtype_mapping_round_trip() {
    let data = ramp(9, 3);
    let out = error_diffuse(&gray_of(&data, 9, 3), "SL", &DiffusionConfig::default(), None).unwrap();
    let as_bool: Vec<bool> = out.map();
    let as_f64: Vec<f64> = out.map();
    assert_eq!(to_u8_image(&as_bool), out.as_slice());
    assert_eq!(to_u8_image(&as_f64), out.as_slice());
    assert_eq!(to_u8_image(out.as_slice()), out.as_slice());
}

#[test]
fn test_float_threshold_domain() {
    assert_eq!(map_threshold(0.5, OutputType::F32), 128.0);
    assert_eq!(map_threshold(0.3, OutputType::F32), 76.0);
    assert_eq!(map_threshold(200.0, OutputType::Bool), 200.0);
    assert_eq!(map_threshold(128.0, OutputType::U8), 128.0);
    assert_eq!(map_threshold(300.0, OutputType::U16), 255.0);
}

#[test]
fn test_rgba_input_for_palette_mode() {
    let data = [10u8, 20, 30, 255, 250, 240, 230, 0];
    let view = ImageView::new(&data, &[1, 2, 4]).unwrap();
    let rgb = prepare_rgb(&view).unwrap();
    assert_eq!(rgb.get(0, 1), [250.0, 240.0, 230.0]);
    let out = palette_diffuse(&rgb, &Palette::gray_ramp(2).unwrap(), "FS", false, None).unwrap();
    assert_eq!(out.as_slice(), &[0, 0, 0, 255, 255, 255]);
}

#[test]
fn test_validation_errors() {
    let gray = GrayBuffer::filled(10.0, 2, 2);
    let err = error_diffuse(&gray, "unknown_kernel", &DiffusionConfig::default(), None).unwrap_err();
    assert!(matches!(err, DitherError::UnknownKernel { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = error_diffuse(&gray, "HEX", &DiffusionConfig::default(), None).unwrap_err();
    assert!(matches!(err, DitherError::Causality(_)));

    let err = ImageView::new(&[0u8; 5], &[2, 2]).unwrap_err();
    assert!(matches!(err, DitherError::InvalidShape(_)));

    let err = "bayer".parse::<AdaptiveMethod>().unwrap_err();
    assert!(matches!(err, DitherError::UnknownMode(_)));
}
