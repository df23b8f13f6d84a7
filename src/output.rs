/// Output representation of dithered images.
///
/// The engine always decides between the two levels {0, 255}. This module maps
/// those decisions to the caller's requested sample type:
/// - bool: {false, true}
/// - f32/f64: {0.0, 1.0}
/// - u8: {0, 255}
/// - other integers: {0, type max}

/// Requested output sample type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Bool,
    U8,
    U16,
    U32,
    I16,
    I32,
    F32,
    F64,
}

impl OutputType {
    /// True for targets whose natural range is 0-1 (floats and bool).
    pub fn is_unit_range(self) -> bool {
        matches!(self, OutputType::Bool | OutputType::F32 | OutputType::F64)
    }

    /// True for float targets, whose thresholds are given in 0-1.
    pub fn is_float(self) -> bool {
        matches!(self, OutputType::F32 | OutputType::F64)
    }
}

/// Sample type a binary decision can be mapped to.
pub trait OutputSample: Copy {
    const TYPE: OutputType;
    fn from_level(on: bool) -> Self;
    /// True if this sample represents the upper level.
    fn is_on(self) -> bool;
}

impl OutputSample for bool {
    const TYPE: OutputType = OutputType::Bool;
    #[inline]
    fn from_level(on: bool) -> Self {
        on
    }
    #[inline]
    fn is_on(self) -> bool {
        self
    }
}

macro_rules! impl_output_int {
    ($($t:ty => $kind:ident),*) => {
        $(
            impl OutputSample for $t {
                const TYPE: OutputType = OutputType::$kind;
                #[inline]
                fn from_level(on: bool) -> Self {
                    if on { <$t>::MAX } else { 0 }
                }
                #[inline]
                fn is_on(self) -> bool {
                    self > 0
                }
            }
        )*
    };
}

impl_output_int!(u8 => U8, u16 => U16, u32 => U32, i16 => I16, i32 => I32);

impl OutputSample for f32 {
    const TYPE: OutputType = OutputType::F32;
    #[inline]
    fn from_level(on: bool) -> Self {
        if on { 1.0 } else { 0.0 }
    }
    #[inline]
    fn is_on(self) -> bool {
        self > 0.0
    }
}

impl OutputSample for f64 {
    const TYPE: OutputType = OutputType::F64;
    #[inline]
    fn from_level(on: bool) -> Self {
        if on { 1.0 } else { 0.0 }
    }
    #[inline]
    fn is_on(self) -> bool {
        self > 0.0
    }
}

/// Two-level dithering result, stored as {0, 255} bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl BinaryImage {
    pub(crate) fn new(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { data, width, height }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Map to the requested output representation.
    pub fn map<O: OutputSample>(&self) -> Vec<O> {
        map_levels(&self.data)
    }
}

/// Map any two-level samples to another output representation.
///
/// Mapping is idempotent: `map_levels::<u8, u8>(&map_levels::<u8, u8>(x))`
/// equals `map_levels::<u8, u8>(x)`.
pub fn map_levels<I: OutputSample, O: OutputSample>(data: &[I]) -> Vec<O> {
    data.iter().map(|&v| O::from_level(v.is_on())).collect()
}

/// Convert any two-level output back to {0, 255} bytes for saving.
pub fn to_u8_image<I: OutputSample>(data: &[I]) -> Vec<u8> {
    map_levels::<I, u8>(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_contract() {
        let img = BinaryImage::new(vec![0, 255, 255, 0], 2, 2);
        assert_eq!(img.map::<u8>(), vec![0, 255, 255, 0]);
        assert_eq!(img.map::<bool>(), vec![false, true, true, false]);
        assert_eq!(img.map::<f32>(), vec![0.0, 1.0, 1.0, 0.0]);
        assert_eq!(img.map::<u16>(), vec![0, u16::MAX, u16::MAX, 0]);
        assert_eq!(img.map::<i32>(), vec![0, i32::MAX, i32::MAX, 0]);
    }

    #[test]
    fn test_u8_mapping_idempotent() {
        let x = vec![0u8, 255, 0, 255, 255];
        let once = map_levels::<u8, u8>(&x);
        let twice = map_levels::<u8, u8>(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_to_u8_image_roundtrip_from_float() {
        let floats = [0.0f64, 1.0, 1.0];
        assert_eq!(to_u8_image(&floats), vec![0, 255, 255]);
    }

    #[test]
    fn test_unit_range_targets() {
        assert!(OutputType::F32.is_unit_range());
        assert!(OutputType::Bool.is_unit_range());
        assert!(!OutputType::U8.is_unit_range());
        assert!(!OutputType::I16.is_unit_range());
        assert!(OutputType::F64.is_float());
        assert!(!OutputType::Bool.is_float());
    }
}
