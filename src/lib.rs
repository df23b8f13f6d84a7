/// Causal error-diffusion dithering - Rust/WASM
///
/// Converts continuous-tone images to binary or palette images by quantizing
/// each pixel and diffusing the quantization error onto unprocessed neighbours.
/// Fixed catalog kernels, Ostromoukhov/Zhou-Fang variable coefficients and
/// palette-vector diffusion share one scan engine.
///
/// The library is usable natively (see `dither`) and exports a small
/// `wasm_bindgen` surface working on raw byte slices.

use wasm_bindgen::prelude::*;
use js_sys;

pub mod dither;
pub mod error;
pub mod grayscale;
pub mod output;

pub use dither::{
    adaptive_diffuse, error_diffuse, palette_diffuse, AdaptiveConfig, AdaptiveMethod,
    DiffusionConfig, Palette, PaletteImage,
};
pub use error::{DitherError, ErrorKind, Result};
pub use grayscale::{grayscale, map_threshold, prepare_rgb, GrayBuffer, ImageView, RgbBuffer};
pub use output::{to_u8_image, BinaryImage, OutputSample, OutputType};

// ============================================================================
// WASM helpers
// ============================================================================

fn to_js(err: DitherError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Run `f` with the JS progress callback adapted to `FnMut(f32)`.
fn with_progress<R>(
    progress_callback: Option<js_sys::Function>,
    f: impl FnOnce(Option<&mut dyn FnMut(f32)>) -> R,
) -> R {
    match progress_callback {
        Some(callback) => {
            let js_this = JsValue::NULL;
            let mut progress_fn = |progress: f32| {
                let _ = callback.call1(&js_this, &JsValue::from_f64(progress as f64));
            };
            f(Some(&mut progress_fn))
        }
        None => f(None),
    }
}

fn gray_from_bytes(data: &[u8], width: u32, height: u32) -> std::result::Result<GrayBuffer, JsValue> {
    let view = ImageView::new(data, &[height as usize, width as usize]).map_err(to_js)?;
    grayscale(&view).map_err(to_js)
}

// ============================================================================
// WASM exports
// ============================================================================

/// Binary error diffusion of 8-bit grayscale pixels with a catalog kernel.
///
/// Returns one byte per pixel, 0 or 255.
#[wasm_bindgen]
pub fn error_diffuse_gray(
    data: &[u8],
    width: u32,
    height: u32,
    kernel: &str,
    threshold: f64,
    serpentine: bool,
    progress_callback: Option<js_sys::Function>,
) -> std::result::Result<Vec<u8>, JsValue> {
    let gray = gray_from_bytes(data, width, height)?;
    let config = DiffusionConfig {
        threshold: map_threshold(threshold, OutputType::U8),
        serpentine,
    };
    let out = with_progress(progress_callback, |progress| {
        error_diffuse(&gray, kernel, &config, progress)
    })
    .map_err(to_js)?;
    Ok(out.into_vec())
}

/// Ostromoukhov or Zhou-Fang diffusion of 8-bit grayscale pixels.
///
/// `method` is "ostromoukhov" or "zhou_fang". `threshold` is ignored by Zhou-Fang.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn adaptive_diffuse_gray(
    data: &[u8],
    width: u32,
    height: u32,
    method: &str,
    threshold: f64,
    serpentine: bool,
    noise_scale: f64,
    seed: Option<u32>,
    progress_callback: Option<js_sys::Function>,
) -> std::result::Result<Vec<u8>, JsValue> {
    let method: AdaptiveMethod = method.parse().map_err(to_js)?;
    let gray = gray_from_bytes(data, width, height)?;
    let config = AdaptiveConfig {
        method,
        threshold: map_threshold(threshold, OutputType::U8),
        serpentine,
        noise_scale,
        seed: seed.map(u64::from),
    };
    let out = with_progress(progress_callback, |progress| {
        adaptive_diffuse(&gray, &config, progress)
    })
    .map_err(to_js)?;
    Ok(out.into_vec())
}

/// Palette diffusion of 8-bit RGB or RGBA pixels.
///
/// `palette` is flat RGB triples. Returns interleaved RGB bytes.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn palette_diffuse_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    channels: u32,
    palette: &[u8],
    kernel: &str,
    serpentine: bool,
    progress_callback: Option<js_sys::Function>,
) -> std::result::Result<Vec<u8>, JsValue> {
    let shape = [height as usize, width as usize, channels as usize];
    let view = ImageView::new(data, &shape).map_err(to_js)?;
    let rgb = prepare_rgb(&view).map_err(to_js)?;
    let palette =
        Palette::from_rows(3, palette.iter().map(|&c| c as f32).collect()).map_err(to_js)?;

    let out = with_progress(progress_callback, |progress| {
        palette_diffuse(&rgb, &palette, kernel, serpentine, progress)
    })
    .map_err(to_js)?;
    Ok(out.into_vec())
}

/// Kernel catalog as a JSON array of `{name, family, aliases, denominator, normalized, causal}`.
#[wasm_bindgen]
pub fn list_kernels_json() -> String {
    let kernels: Vec<serde_json::Value> = dither::list_available_kernels()
        .into_iter()
        .filter_map(|name| dither::kernel_info(name).ok())
        .map(|info| {
            let causal = info.taps.iter().all(|&(dy, _, _)| dy >= 0);
            serde_json::json!({
                "name": info.name,
                "family": info.family.name(),
                "aliases": info.aliases,
                "denominator": info.denominator,
                "normalized": info.is_normalized,
                "causal": causal,
            })
        })
        .collect();
    serde_json::Value::Array(kernels).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_kernels_json() {
        let parsed: serde_json::Value = serde_json::from_str(&list_kernels_json()).unwrap();
        let arr = parsed.as_array().unwrap();
        assert_eq!(arr.len(), 40);
        let fs = arr.iter().find(|k| k["name"] == "floyd_steinberg").unwrap();
        assert_eq!(fs["aliases"][0], "FS");
        assert_eq!(fs["causal"], true);
        let radial = arr.iter().find(|k| k["name"] == "radial").unwrap();
        assert_eq!(radial["causal"], false);
    }

    #[test]
    fn test_error_diffuse_gray_bytes() {
        let data = [200u8; 16];
        let out = error_diffuse_gray(&data, 4, 4, "FS", 128.0, false, None).unwrap();
        assert_eq!(out.len(), 16);
        assert!(out[..4].iter().all(|&v| v == 255));
    }
}
