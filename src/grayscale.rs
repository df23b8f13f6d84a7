/// Input normalization for error diffusion.
///
/// Converts pixel tensors of any integer or float sample type into the
/// canonical buffers the diffusion engine scans:
/// - `GrayBuffer`: H×W intensities on the 0-255 scale (scalar modes)
/// - `RgbBuffer`: H×W×3 intensities on the 0-255 scale (palette mode)

use crate::error::{DitherError, Result};
use crate::output::OutputType;

/// ITU-R BT.601 luminance coefficients
const LUMA_R: f32 = 0.2989;
const LUMA_G: f32 = 0.5870;
const LUMA_B: f32 = 0.1140;

// ============================================================================
// Sample types
// ============================================================================

/// A pixel sample type accepted at the image boundary.
///
/// Integer samples are scaled by the type's maximum. Float samples are taken
/// as 0-1 unless the image maximum exceeds 1.0, in which case they are taken
/// as already on the 0-255 scale.
pub trait Sample: Copy {
    const IS_FLOAT: bool;
    /// Type maximum for integer samples. Unused for floats.
    const MAX: f32;
    fn to_f32(self) -> f32;
}

macro_rules! impl_int_sample {
    ($($t:ty),*) => {
        $(
            impl Sample for $t {
                const IS_FLOAT: bool = false;
                const MAX: f32 = <$t>::MAX as f32;
                #[inline]
                fn to_f32(self) -> f32 {
                    self as f32
                }
            }
        )*
    };
}

impl_int_sample!(u8, u16, u32, u64, i8, i16, i32, i64);

impl Sample for f32 {
    const IS_FLOAT: bool = true;
    const MAX: f32 = 1.0;
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

impl Sample for f64 {
    const IS_FLOAT: bool = true;
    const MAX: f32 = 1.0;
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

/// Product of tensor dimensions. Shapes whose size overflows are rejected.
fn element_count(dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| DitherError::InvalidShape(format!("shape {:?} is too large", dims)))
}

// ============================================================================
// ImageView - borrowed pixel tensor
// ============================================================================

/// Borrowed H×W or H×W×C pixel tensor in row-major interleaved order.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, T: Sample> {
    data: &'a [T],
    height: usize,
    width: usize,
    channels: usize,
}

impl<'a, T: Sample> ImageView<'a, T> {
    /// Wrap `data` with a tensor shape: `[h, w]`, `[h, w, 1]`, `[h, w, 3]` or `[h, w, 4]`.
    pub fn new(data: &'a [T], shape: &[usize]) -> Result<Self> {
        let (height, width, channels) = match *shape {
            [h, w] => (h, w, 1),
            [h, w, c @ (1 | 3 | 4)] => (h, w, c),
            _ => {
                return Err(DitherError::InvalidShape(format!(
                    "shape {:?}. Expected 2D grayscale, HxWx3 RGB, or HxWx4 RGBA",
                    shape
                )))
            }
        };
        let expected = element_count(&[height, width, channels])?;
        if data.len() != expected {
            return Err(DitherError::InvalidShape(format!(
                "data length {} doesn't match {}x{}x{} = {}",
                data.len(),
                height,
                width,
                channels,
                expected
            )));
        }
        Ok(Self { data, height, width, channels })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Scale factor from raw samples to the 0-1 range.
    fn unit_scale(&self) -> f32 {
        if T::IS_FLOAT {
            let vmax = self
                .data
                .iter()
                .map(|v| v.to_f32())
                .filter(|v| !v.is_nan())
                .fold(f32::NEG_INFINITY, f32::max);
            if vmax > 1.0 {
                1.0 / 255.0
            } else {
                1.0
            }
        } else if T::MAX > 0.0 {
            1.0 / T::MAX
        } else {
            1.0 / 255.0
        }
    }
}

// ============================================================================
// GrayBuffer
// ============================================================================

/// Immutable H×W intensity buffer on the 0-255 scale.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayBuffer {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl GrayBuffer {
    /// Wrap row-major intensities already on the 0-255 scale.
    pub fn from_f32(data: Vec<f32>, width: usize, height: usize) -> Result<Self> {
        let expected = element_count(&[height, width])?;
        if data.len() != expected {
            return Err(DitherError::InvalidShape(format!(
                "data length {} doesn't match {}x{} = {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self { data, width, height })
    }

    /// Uniform buffer, mostly useful for tests and calibration.
    pub fn filled(value: f32, width: usize, height: usize) -> Self {
        Self { data: vec![value; width * height], width, height }
    }

    #[inline]
    pub fn get(&self, y: usize, x: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

// ============================================================================
// RgbBuffer
// ============================================================================

/// Immutable H×W×3 buffer on the 0-255 scale, consumed by palette diffusion.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbBuffer {
    data: Vec<[f32; 3]>,
    width: usize,
    height: usize,
}

impl RgbBuffer {
    /// Wrap interleaved RGB values already on the 0-255 scale.
    pub fn from_f32(data: &[f32], width: usize, height: usize) -> Result<Self> {
        let expected = element_count(&[height, width, 3])?;
        if data.len() != expected {
            return Err(DitherError::InvalidShape(format!(
                "data length {} doesn't match {}x{}x3 = {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        let data = data.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        Ok(Self { data, width, height })
    }

    /// Lift a grayscale buffer to three equal channels.
    pub fn from_gray(gray: &GrayBuffer) -> Self {
        Self {
            data: gray.as_slice().iter().map(|&v| [v, v, v]).collect(),
            width: gray.width(),
            height: gray.height(),
        }
    }

    #[inline]
    pub fn get(&self, y: usize, x: usize) -> [f32; 3] {
        self.data[y * self.width + x]
    }

    pub fn as_slice(&self) -> &[[f32; 3]] {
        &self.data
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Convert any accepted tensor to a `GrayBuffer`.
///
/// RGB/RGBA inputs are reduced with BT.601 luminance and alpha is dropped.
/// Luminance is clipped to 0-1 and rounded (half to even) to an 8-bit level.
pub fn grayscale<T: Sample>(img: &ImageView<'_, T>) -> Result<GrayBuffer> {
    let scale = img.unit_scale();
    let pixels = img.width * img.height;
    let mut data = Vec::with_capacity(pixels);

    for i in 0..pixels {
        let base = i * img.channels;
        let y01 = if img.channels >= 3 {
            let r = img.data[base].to_f32() * scale;
            let g = img.data[base + 1].to_f32() * scale;
            let b = img.data[base + 2].to_f32() * scale;
            r * LUMA_R + g * LUMA_G + b * LUMA_B
        } else {
            img.data[base].to_f32() * scale
        };
        let y01 = if y01.is_nan() { 0.0 } else { y01.clamp(0.0, 1.0) };
        data.push((y01 * 255.0).round_ties_even().clamp(0.0, 255.0));
    }

    GrayBuffer::from_f32(data, img.width, img.height)
}

/// Convert an RGB/RGBA tensor to an `RgbBuffer` for palette diffusion.
///
/// Integer samples are rescaled to 0-255; float samples are multiplied by 255
/// when their maximum is at most 1.0. Alpha is dropped.
pub fn prepare_rgb<T: Sample>(img: &ImageView<'_, T>) -> Result<RgbBuffer> {
    if img.channels < 3 {
        return Err(DitherError::InvalidShape(
            "input image must be HxWx3 or HxWx4".to_string(),
        ));
    }
    let scale = img.unit_scale() * 255.0;
    let data = img
        .data
        .chunks_exact(img.channels)
        .map(|px| {
            let mut out = [0.0f32; 3];
            for (o, v) in out.iter_mut().zip(px) {
                let s = v.to_f32() * scale;
                *o = if s.is_nan() { 0.0 } else { s.clamp(0.0, 255.0) };
            }
            out
        })
        .collect();
    Ok(RgbBuffer { data, width: img.width, height: img.height })
}

/// Map a caller threshold from the target's domain into the 0-255 domain.
///
/// Float targets take a threshold in 0-1; integer and bool targets take one
/// in 0-255. Halves round to even.
pub fn map_threshold(threshold: f64, target: OutputType) -> f32 {
    let t = if target.is_float() {
        (threshold * 255.0).round_ties_even()
    } else {
        threshold.round_ties_even()
    };
    t.clamp(0.0, 255.0) as f32
}
