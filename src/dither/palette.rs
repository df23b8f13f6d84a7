/// Palette types and nearest-color search for palette-vector diffusion.

use crate::error::{DitherError, Result};

/// Ordered list of RGB or RGBA colors on the 0-255 scale.
///
/// Entries are kept as f32 so the diffusion error can be formed directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    channels: usize,
    colors: Vec<f32>,
}

impl Palette {
    /// Build from flat row-major entries of `channels` (3 or 4) values each.
    pub fn from_rows(channels: usize, colors: Vec<f32>) -> Result<Self> {
        if channels != 3 && channels != 4 {
            return Err(DitherError::InvalidShape(format!(
                "palette entries must have 3 or 4 channels, got {}",
                channels
            )));
        }
        if colors.is_empty() {
            return Err(DitherError::EmptyPalette);
        }
        if colors.len() % channels != 0 {
            return Err(DitherError::InvalidShape(format!(
                "palette length {} is not a multiple of {}",
                colors.len(),
                channels
            )));
        }
        Ok(Self { channels, colors })
    }

    pub fn rgb(colors: &[[u8; 3]]) -> Result<Self> {
        Self::from_rows(3, colors.iter().flatten().map(|&c| c as f32).collect())
    }

    pub fn rgba(colors: &[[u8; 4]]) -> Result<Self> {
        Self::from_rows(4, colors.iter().flatten().map(|&c| c as f32).collect())
    }

    /// Evenly spaced gray levels from black to white: `rint(linspace(0, 255, levels))`.
    pub fn gray_ramp(levels: usize) -> Result<Self> {
        if levels < 2 {
            return Err(DitherError::InvalidLevels(levels));
        }
        let step = 255.0 / (levels - 1) as f64;
        let colors = (0..levels)
            .flat_map(|i| {
                let v = (i as f64 * step).round_ties_even() as f32;
                [v, v, v]
            })
            .collect();
        Self::from_rows(3, colors)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn len(&self) -> usize {
        self.colors.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color(&self, index: usize) -> &[f32] {
        &self.colors[index * self.channels..(index + 1) * self.channels]
    }

    /// Index of the nearest entry. Caller guarantees matching channel counts.
    #[inline]
    pub(crate) fn nearest_index(&self, pixel: &[f32]) -> usize {
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for (i, entry) in self.colors.chunks_exact(self.channels).enumerate() {
            let dist: f32 = entry
                .iter()
                .zip(pixel)
                .map(|(&c, &p)| {
                    let d = c - p;
                    d * d
                })
                .sum();
            // Strict comparison keeps the lowest index on ties
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        best
    }
}

/// Nearest palette color by squared Euclidean distance.
///
/// Returns the color and its index; ties resolve to the lowest index.
pub fn nearest_color<'p>(pixel: &[f32], palette: &'p Palette) -> Result<(&'p [f32], usize)> {
    if pixel.len() != palette.channels {
        return Err(DitherError::DimensionMismatch {
            expected: palette.channels,
            actual: pixel.len(),
        });
    }
    let index = palette.nearest_index(pixel);
    Ok((palette.color(index), index))
}
