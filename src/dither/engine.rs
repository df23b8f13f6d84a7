/// Causal error diffusion engine.
///
/// A single raster pass over the image. Each pixel gets exactly one decision;
/// the quantization error is pushed to unprocessed neighbours through a
/// rolling `ErrorField`. The pass is parameterized by:
/// - a `TapSource` (fixed kernel or adaptive table)
/// - a quantizer (scalar threshold or nearest palette color)
/// - serpentine scanning (odd rows right-to-left, column offsets mirrored)

use tracing::debug;

pub use super::kernels::TapSource;
use super::adaptive::{
    ostromoukhov_table, zhou_fang_strength, AdaptiveMethod, AdaptiveTaps, FixedThreshold,
    JitterThreshold, ThresholdSource,
};
use super::kernels::resolve_kernel;
use super::palette::Palette;
use crate::error::{DitherError, Result};
use crate::grayscale::{GrayBuffer, RgbBuffer};
use crate::output::BinaryImage;

// ============================================================================
// Error values
// ============================================================================

/// Per-column accumulator value: a scalar for gray diffusion, an RGB triple
/// for palette diffusion.
pub trait ErrorValue: Copy + Default {
    fn plus(self, other: Self) -> Self;
    fn minus(self, other: Self) -> Self;
    /// `self += e * w`
    fn accumulate(&mut self, e: Self, w: f32);
    /// Intensity used to select adaptive weights.
    fn level(self) -> f32;
}

impl ErrorValue for f32 {
    #[inline]
    fn plus(self, other: Self) -> Self {
        self + other
    }
    #[inline]
    fn minus(self, other: Self) -> Self {
        self - other
    }
    #[inline]
    fn accumulate(&mut self, e: Self, w: f32) {
        *self += e * w;
    }
    #[inline]
    fn level(self) -> f32 {
        self
    }
}

impl ErrorValue for [f32; 3] {
    #[inline]
    fn plus(self, other: Self) -> Self {
        [self[0] + other[0], self[1] + other[1], self[2] + other[2]]
    }
    #[inline]
    fn minus(self, other: Self) -> Self {
        [self[0] - other[0], self[1] - other[1], self[2] - other[2]]
    }
    #[inline]
    fn accumulate(&mut self, e: Self, w: f32) {
        self[0] += e[0] * w;
        self[1] += e[1] * w;
        self[2] += e[2] * w;
    }
    #[inline]
    fn level(self) -> f32 {
        0.2989 * self[0] + 0.5870 * self[1] + 0.1140 * self[2]
    }
}

// ============================================================================
// ErrorField
// ============================================================================

/// Ring of `max_row_offset + 1` accumulator rows. Row 0 (at `head`) belongs
/// to the row being scanned.
#[derive(Debug, Clone)]
pub struct ErrorField<V> {
    rows: Vec<Vec<V>>,
    head: usize,
}

impl<V: ErrorValue> ErrorField<V> {
    pub fn new(width: usize, max_row_offset: usize) -> Self {
        Self {
            rows: vec![vec![V::default(); width]; max_row_offset + 1],
            head: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    fn slot(&self, dy: usize) -> usize {
        (self.head + dy) % self.rows.len()
    }

    /// Accumulated error for column `x` of the current row.
    #[inline]
    pub fn current(&self, x: usize) -> V {
        self.rows[self.head][x]
    }

    /// `field[dy][x] += e * w`
    #[inline]
    pub fn add(&mut self, dy: usize, x: usize, e: V, w: f32) {
        let slot = self.slot(dy);
        self.rows[slot][x].accumulate(e, w);
    }

    pub fn row(&self, dy: usize) -> &[V] {
        &self.rows[self.slot(dy)]
    }

    /// Zero every row except the current one.
    pub fn clear_future(&mut self) {
        for dy in 1..self.rows.len() {
            let slot = self.slot(dy);
            self.rows[slot].fill(V::default());
        }
    }

    /// Rotate: the next row becomes current. The finished row is zeroed so a
    /// single-row field does not carry error into the next image row.
    #[inline]
    pub fn advance(&mut self) {
        self.rows[self.head].fill(V::default());
        self.head = self.slot(1);
    }
}

// ============================================================================
// Scan
// ============================================================================

/// Push `e` to every in-bounds tap around (y, x). Out-of-bounds taps are dropped.
#[inline]
#[allow(clippy::too_many_arguments)]
fn spread<V: ErrorValue>(
    field: &mut ErrorField<V>,
    offsets: &[(usize, isize)],
    weights: &[f32],
    x: usize,
    y: usize,
    dir: isize,
    width: usize,
    height: usize,
    e: V,
) {
    for (&(dy, dx), &w) in offsets.iter().zip(weights) {
        if y + dy >= height {
            continue;
        }
        let col = x as isize + dir * dx;
        if col < 0 || col >= width as isize {
            continue;
        }
        field.add(dy, col as usize, e, w);
    }
}

/// Generic raster pass. `quantize(index, effective)` records the decision for
/// the pixel at flat `index` and returns the quantized value.
fn scan<V, S, F>(
    input: &[V],
    width: usize,
    height: usize,
    taps: &S,
    serpentine: bool,
    mut quantize: F,
    mut progress: Option<&mut dyn FnMut(f32)>,
) where
    V: ErrorValue,
    S: TapSource + ?Sized,
    F: FnMut(usize, V) -> V,
{
    let offsets = taps.offsets();
    let mut field = ErrorField::<V>::new(width, taps.max_row_offset());

    for y in 0..height {
        let flip = serpentine && y % 2 == 1;
        let dir: isize = if flip { -1 } else { 1 };
        field.clear_future();

        for i in 0..width {
            let x = if flip { width - 1 - i } else { i };
            let idx = y * width + x;
            let original = input[idx];
            let effective = original.plus(field.current(x));
            let quantized = quantize(idx, effective);
            let e = effective.minus(quantized);
            let weights = taps.weights(original.level());
            spread(&mut field, offsets, weights, x, y, dir, width, height, e);
        }

        field.advance();
        if let Some(ref mut cb) = progress {
            cb((y + 1) as f32 / height as f32);
        }
    }
}

/// Two-level diffusion of a gray buffer: 255 where `effective >= threshold`, else 0.
///
/// The threshold source is queried once per pixel in visitation order.
pub fn diffuse_scalar<S, T>(
    img: &GrayBuffer,
    taps: &S,
    thresholds: &mut T,
    serpentine: bool,
    progress: Option<&mut dyn FnMut(f32)>,
) -> BinaryImage
where
    S: TapSource + ?Sized,
    T: ThresholdSource + ?Sized,
{
    let (width, height) = img.dimensions();
    let mut out = vec![0u8; width * height];

    scan(
        img.as_slice(),
        width,
        height,
        taps,
        serpentine,
        |idx, effective: f32| {
            if effective >= thresholds.next_threshold() {
                out[idx] = 255;
                255.0
            } else {
                0.0
            }
        },
        progress,
    );

    BinaryImage::new(out, width, height)
}

/// Palette diffusion result: interleaved RGB bytes plus the chosen palette index per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteImage {
    data: Vec<u8>,
    indices: Vec<u32>,
    width: usize,
    height: usize,
}

impl PaletteImage {
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

/// Vector diffusion of an RGB buffer onto the nearest palette colors.
///
/// The RGB error is diffused per channel with the same tap weights.
pub fn diffuse_palette<S: TapSource + ?Sized>(
    img: &RgbBuffer,
    taps: &S,
    palette: &Palette,
    serpentine: bool,
    progress: Option<&mut dyn FnMut(f32)>,
) -> Result<PaletteImage> {
    if palette.channels() != 3 {
        return Err(DitherError::DimensionMismatch {
            expected: 3,
            actual: palette.channels(),
        });
    }

    let (width, height) = (img.width(), img.height());
    let mut data = vec![0u8; width * height * 3];
    let mut indices = vec![0u32; width * height];

    scan(
        img.as_slice(),
        width,
        height,
        taps,
        serpentine,
        |idx, effective: [f32; 3]| {
            let i = palette.nearest_index(&effective);
            let c = palette.color(i);
            indices[idx] = i as u32;
            for ch in 0..3 {
                data[idx * 3 + ch] = c[ch].clamp(0.0, 255.0) as u8;
            }
            [c[0], c[1], c[2]]
        },
        progress,
    );

    Ok(PaletteImage { data, indices, width, height })
}

// ============================================================================
// Call configuration and entry points
// ============================================================================

/// Fixed-kernel call options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffusionConfig {
    /// Threshold on the 0-255 scale
    pub threshold: f32,
    pub serpentine: bool,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self { threshold: 128.0, serpentine: true }
    }
}

/// Adaptive call options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveConfig {
    pub method: AdaptiveMethod,
    /// Threshold on the 0-255 scale, used by Ostromoukhov only
    pub threshold: f32,
    pub serpentine: bool,
    /// Zhou-Fang jitter multiplier
    pub noise_scale: f64,
    /// Zhou-Fang RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            method: AdaptiveMethod::Ostromoukhov,
            threshold: 128.0,
            serpentine: true,
            noise_scale: 1.0,
            seed: None,
        }
    }
}

/// Binary error diffusion with a catalog kernel (name or alias).
pub fn error_diffuse(
    img: &GrayBuffer,
    kernel: &str,
    config: &DiffusionConfig,
    progress: Option<&mut dyn FnMut(f32)>,
) -> Result<BinaryImage> {
    let taps = resolve_kernel(kernel)?;
    debug!(
        kernel = taps.name(),
        width = img.width(),
        height = img.height(),
        threshold = config.threshold,
        serpentine = config.serpentine,
        "error diffusion"
    );

    let mut threshold = FixedThreshold(config.threshold);
    Ok(diffuse_scalar(img, &taps, &mut threshold, config.serpentine, progress))
}

/// Variable-coefficient binary diffusion (Ostromoukhov or Zhou-Fang).
pub fn adaptive_diffuse(
    img: &GrayBuffer,
    config: &AdaptiveConfig,
    progress: Option<&mut dyn FnMut(f32)>,
) -> Result<BinaryImage> {
    let taps = AdaptiveTaps::new(ostromoukhov_table()?);
    debug!(
        method = config.method.name(),
        width = img.width(),
        height = img.height(),
        serpentine = config.serpentine,
        "adaptive diffusion"
    );

    let out = match config.method {
        AdaptiveMethod::Ostromoukhov => {
            let mut threshold = FixedThreshold(config.threshold);
            diffuse_scalar(img, &taps, &mut threshold, config.serpentine, progress)
        }
        AdaptiveMethod::ZhouFang => {
            let strength = zhou_fang_strength()?;
            debug!(
                strength = strength.value(),
                noise_scale = config.noise_scale,
                seed = ?config.seed,
                "threshold jitter"
            );
            let mut threshold = JitterThreshold::new(strength, config.noise_scale, config.seed);
            diffuse_scalar(img, &taps, &mut threshold, config.serpentine, progress)
        }
    };
    Ok(out)
}

/// Palette diffusion with a catalog kernel (name or alias).
pub fn palette_diffuse(
    img: &RgbBuffer,
    palette: &Palette,
    kernel: &str,
    serpentine: bool,
    progress: Option<&mut dyn FnMut(f32)>,
) -> Result<PaletteImage> {
    let taps = resolve_kernel(kernel)?;
    debug!(
        kernel = taps.name(),
        colors = palette.len(),
        width = img.width(),
        height = img.height(),
        serpentine,
        "palette diffusion"
    );
    diffuse_palette(img, &taps, palette, serpentine, progress)
}
