/// Variable-coefficient diffusion support.
///
/// Ostromoukhov (2001) picks the three diffusion weights from a 256-row table
/// indexed by the original pixel intensity. Zhou-Fang (2007) uses the same
/// weights and additionally jitters the threshold with a seeded uniform draw
/// per pixel, scaled by a strength derived from a strength table.
///
/// Both tables are process-wide: loaded once (built-in data unless overridden
/// by `init_adaptive_tables`) and shared read-only afterwards.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::kernels::TapSource;
use crate::error::{DitherError, Result};

const BUILTIN_OSTRO: &str = include_str!("../../data/weights_ostromoukhov.txt");
const BUILTIN_ZF: &str = include_str!("../../data/strengths_zhou_fang.txt");

const OSTRO_LEVELS: usize = 256;

/// Base threshold the Zhou-Fang jitter is added to.
const JITTER_BASE: f64 = 128.0;
/// Full jitter range before strength and noise scaling.
const JITTER_RANGE: f64 = 128.0;

/// Right, diagonal (below, forward) and down, in left-to-right orientation.
const ADAPTIVE_OFFSETS: [(usize, isize); 3] = [(0, 1), (1, 1), (1, 0)];

// ============================================================================
// Table parsing
// ============================================================================

/// Parse whitespace-delimited rows of three numbers. Blank lines and `#`
/// comments are skipped.
fn parse_rows(text: &str, origin: &str) -> Result<Vec<[f64; 3]>> {
    let mut rows = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 3 {
            return Err(DitherError::malformed(
                origin,
                format!("line {}: expected 3 columns, got {}", lineno + 1, tokens.len()),
            ));
        }

        let mut row = [0.0f64; 3];
        for (slot, tok) in row.iter_mut().zip(&tokens) {
            *slot = tok.parse::<f64>().map_err(|_| {
                DitherError::malformed(origin, format!("line {}: invalid number '{}'", lineno + 1, tok))
            })?;
        }
        rows.push(row);
    }
    Ok(rows)
}

fn read_table(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| DitherError::TableIo {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// AdaptiveTable
// ============================================================================

/// 256 rows of normalized (right, diag, down) weights.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveTable {
    rows: Vec<[f32; 3]>,
}

impl AdaptiveTable {
    /// Parse table text. Each row is divided by its own sum; zero-sum rows
    /// are kept as they are.
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let raw = parse_rows(text, origin)?;
        if raw.len() != OSTRO_LEVELS {
            return Err(DitherError::malformed(
                origin,
                format!("expected {} rows, got {}", OSTRO_LEVELS, raw.len()),
            ));
        }

        let rows = raw
            .iter()
            .map(|r| {
                let sum = r[0] + r[1] + r[2];
                let div = if sum == 0.0 { 1.0 } else { sum };
                [(r[0] / div) as f32, (r[1] / div) as f32, (r[2] / div) as f32]
            })
            .collect();

        Ok(Self { rows })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let table = Self::parse(&read_table(path)?, &path.display().to_string())?;
        info!(path = %path.display(), "loaded Ostromoukhov coefficient table");
        Ok(table)
    }

    pub fn builtin() -> Result<Self> {
        debug!("using built-in Ostromoukhov coefficient table");
        Self::parse(BUILTIN_OSTRO, "<builtin weights_ostromoukhov.txt>")
    }

    /// Row index for an intensity: `clamp(round(intensity), 0, 255)`.
    #[inline]
    pub fn index_for(intensity: f32) -> usize {
        let idx = (intensity + 0.5).floor();
        if idx.is_nan() || idx <= 0.0 {
            0
        } else if idx >= (OSTRO_LEVELS - 1) as f32 {
            OSTRO_LEVELS - 1
        } else {
            idx as usize
        }
    }

    #[inline]
    pub fn row(&self, intensity: f32) -> &[f32; 3] {
        &self.rows[Self::index_for(intensity)]
    }
}

// ============================================================================
// JitterStrength
// ============================================================================

/// Zhou-Fang threshold modulation strength in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterStrength(f64);

impl JitterStrength {
    pub const ZERO: JitterStrength = JitterStrength(0.0);

    /// Reduce the strength column (third) to `clip(mean, 0, 1)`.
    ///
    /// The result is only kept if strictly positive; otherwise the strength is 0.
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let rows = parse_rows(text, origin)?;
        if rows.is_empty() {
            return Err(DitherError::malformed(origin, "no strength rows"));
        }

        let mean = rows.iter().map(|r| r[2]).sum::<f64>() / rows.len() as f64;
        let s = mean.clamp(0.0, 1.0);
        Ok(if s > 0.0 { JitterStrength(s) } else { JitterStrength::ZERO })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let strength = Self::parse(&read_table(path)?, &path.display().to_string())?;
        info!(path = %path.display(), strength = strength.0, "loaded Zhou-Fang strength table");
        Ok(strength)
    }

    pub fn builtin() -> Result<Self> {
        debug!("using built-in Zhou-Fang strength table");
        Self::parse(BUILTIN_ZF, "<builtin strengths_zhou_fang.txt>")
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

// ============================================================================
// Process-wide tables
// ============================================================================

static OSTRO_TABLE: OnceCell<AdaptiveTable> = OnceCell::new();
static ZF_STRENGTH: OnceCell<JitterStrength> = OnceCell::new();

/// Load coefficient tables from files before first use.
///
/// `None` selects the built-in table. Both files are parsed before anything
/// is installed, so a bad file leaves the process state untouched. Fails with
/// `AlreadyInitialized` once either table is in use.
pub fn init_adaptive_tables(ostro_path: Option<&Path>, zf_path: Option<&Path>) -> Result<()> {
    let table = match ostro_path {
        Some(p) => AdaptiveTable::load(p)?,
        None => AdaptiveTable::builtin()?,
    };
    let strength = match zf_path {
        Some(p) => JitterStrength::load(p)?,
        None => JitterStrength::builtin()?,
    };

    if OSTRO_TABLE.get().is_some() || ZF_STRENGTH.get().is_some() {
        return Err(DitherError::AlreadyInitialized);
    }
    OSTRO_TABLE.set(table).map_err(|_| DitherError::AlreadyInitialized)?;
    ZF_STRENGTH.set(strength).map_err(|_| DitherError::AlreadyInitialized)?;
    Ok(())
}

/// Shared Ostromoukhov table, initialized from built-in data on first use.
pub fn ostromoukhov_table() -> Result<&'static AdaptiveTable> {
    OSTRO_TABLE.get_or_try_init(AdaptiveTable::builtin)
}

/// Shared Zhou-Fang strength, initialized from built-in data on first use.
pub fn zhou_fang_strength() -> Result<JitterStrength> {
    ZF_STRENGTH.get_or_try_init(JitterStrength::builtin).copied()
}

// ============================================================================
// Method selection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveMethod {
    Ostromoukhov,
    ZhouFang,
}

impl AdaptiveMethod {
    pub fn name(self) -> &'static str {
        match self {
            AdaptiveMethod::Ostromoukhov => "ostromoukhov",
            AdaptiveMethod::ZhouFang => "zhou_fang",
        }
    }
}

impl FromStr for AdaptiveMethod {
    type Err = DitherError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ostromoukhov" => Ok(AdaptiveMethod::Ostromoukhov),
            "zhou_fang" => Ok(AdaptiveMethod::ZhouFang),
            other => Err(DitherError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for AdaptiveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Tap and threshold sources
// ============================================================================

/// Three-tap source whose weights follow the original pixel intensity.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveTaps<'a> {
    table: &'a AdaptiveTable,
}

impl<'a> AdaptiveTaps<'a> {
    pub fn new(table: &'a AdaptiveTable) -> Self {
        Self { table }
    }
}

impl TapSource for AdaptiveTaps<'_> {
    #[inline]
    fn offsets(&self) -> &[(usize, isize)] {
        &ADAPTIVE_OFFSETS
    }

    #[inline]
    fn weights(&self, intensity: f32) -> &[f32] {
        self.table.row(intensity)
    }

    #[inline]
    fn max_row_offset(&self) -> usize {
        1
    }
}

/// Per-pixel threshold, queried once per pixel in visitation order.
pub trait ThresholdSource {
    fn next_threshold(&mut self) -> f32;
}

/// Constant threshold on the 0-255 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedThreshold(pub f32);

impl ThresholdSource for FixedThreshold {
    #[inline]
    fn next_threshold(&mut self) -> f32 {
        self.0
    }
}

/// Zhou-Fang threshold: `128 + U[0,1) * 128 * strength * noise_scale`.
#[derive(Debug, Clone)]
pub struct JitterThreshold {
    rng: StdRng,
    amplitude: f64,
}

impl JitterThreshold {
    pub fn new(strength: JitterStrength, noise_scale: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            amplitude: JITTER_RANGE * strength.value() * noise_scale,
        }
    }
}

impl ThresholdSource for JitterThreshold {
    #[inline]
    fn next_threshold(&mut self) -> f32 {
        (JITTER_BASE + self.rng.gen::<f64>() * self.amplitude) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ostro_text(rows: usize) -> String {
        let mut s = String::from("# header\n\n");
        for i in 0..rows {
            if i == 7 {
                s.push_str("0 0 0\n");
            } else {
                s.push_str("2 1 1  # trailing comment\n");
            }
        }
        s
    }

    #[test]
    fn test_builtin_tables_parse() {
        let table = AdaptiveTable::builtin().unwrap();
        assert_eq!(table.rows.len(), 256);
        for row in &table.rows {
            assert_abs_diff_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        }
        let s = JitterStrength::builtin().unwrap();
        assert!(s.value() > 0.0 && s.value() <= 1.0);
    }

    #[test]
    fn test_rows_normalized_and_zero_rows_kept() {
        let table = AdaptiveTable::parse(&ostro_text(256), "test").unwrap();
        assert_eq!(table.row(0.0), &[0.5, 0.25, 0.25]);
        assert_eq!(table.row(7.0), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_wrong_row_count_is_config_error() {
        let err = AdaptiveTable::parse(&ostro_text(255), "short").unwrap_err();
        assert!(matches!(err, DitherError::MalformedTable { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn test_bad_tokens_rejected() {
        assert!(AdaptiveTable::parse("1 2\n", "cols").is_err());
        assert!(JitterStrength::parse("1 2 x\n", "tok").is_err());
        assert!(JitterStrength::parse("# only comments\n", "empty").is_err());
    }

    #[test]
    fn test_index_clamped_and_rounded() {
        assert_eq!(AdaptiveTable::index_for(-4.0), 0);
        assert_eq!(AdaptiveTable::index_for(0.4), 0);
        assert_eq!(AdaptiveTable::index_for(0.5), 1);
        assert_eq!(AdaptiveTable::index_for(254.6), 255);
        assert_eq!(AdaptiveTable::index_for(900.0), 255);
    }

    #[test]
    fn test_strength_mean_and_clip() {
        let s = JitterStrength::parse("0 0 0.2\n1 1 0.4\n", "t").unwrap();
        assert_abs_diff_eq!(s.value(), 0.3, epsilon = 1e-12);
        let s = JitterStrength::parse("0 0 3\n", "t").unwrap();
        assert_eq!(s.value(), 1.0);
        let s = JitterStrength::parse("0 0 -2\n", "t").unwrap();
        assert_eq!(s, JitterStrength::ZERO);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ostro_text(256).as_bytes()).unwrap();
        let table = AdaptiveTable::load(file.path()).unwrap();
        assert_eq!(table.row(100.0), &[0.5, 0.25, 0.25]);

        let missing = file.path().with_extension("missing");
        match AdaptiveTable::load(&missing) {
            Err(DitherError::TableIo { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected TableIo, got {:?}", other),
        }
    }

    #[test]
    fn test_init_rejects_bad_file_before_install() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"1 2 3\n").unwrap();
        let err = init_adaptive_tables(Some(file.path()), None).unwrap_err();
        assert!(matches!(err, DitherError::MalformedTable { .. }));
    }

    #[test]
    fn test_init_after_use_fails() {
        ostromoukhov_table().unwrap();
        let err = init_adaptive_tables(None, None).unwrap_err();
        assert!(matches!(err, DitherError::AlreadyInitialized));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("ostromoukhov".parse::<AdaptiveMethod>().unwrap(), AdaptiveMethod::Ostromoukhov);
        assert_eq!("zhou_fang".parse::<AdaptiveMethod>().unwrap(), AdaptiveMethod::ZhouFang);
        match "floyd".parse::<AdaptiveMethod>() {
            Err(DitherError::UnknownMode(m)) => assert_eq!(m, "floyd"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_jitter_threshold_seeded() {
        let s = JitterStrength(0.5);
        let mut a = JitterThreshold::new(s, 1.0, Some(7));
        let mut b = JitterThreshold::new(s, 1.0, Some(7));
        for _ in 0..100 {
            let t = a.next_threshold();
            assert_eq!(t, b.next_threshold());
            assert!((128.0..=192.0).contains(&t));
        }
    }

    #[test]
    fn test_zero_noise_scale_is_fixed_128() {
        let mut j = JitterThreshold::new(JitterStrength(1.0), 0.0, None);
        for _ in 0..10 {
            assert_eq!(j.next_threshold(), 128.0);
        }
    }

    #[test]
    fn test_adaptive_taps() {
        let table = AdaptiveTable::parse(&ostro_text(256), "t").unwrap();
        let taps = AdaptiveTaps::new(&table);
        assert_eq!(taps.offsets(), &[(0, 1), (1, 1), (1, 0)]);
        assert_eq!(taps.weights(3.0), &[0.5, 0.25, 0.25]);
        assert_eq!(taps.max_row_offset(), 1);
    }
}
