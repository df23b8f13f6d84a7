/// Error diffusion kernel catalog.
///
/// Provides:
/// - `KERNELS`: Static table of canonical kernels grouped by family
/// - `KernelId`: Closed integer handle resolved once per call
/// - `NormalizedKernel`: Causality-checked taps with weights divided by the denominator
/// - `TapSource`: Trait the diffusion engine scans with (fixed kernels and adaptive taps)
/// - Name/alias resolution and listing helpers for front ends

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use once_cell::sync::Lazy;

use crate::error::{DitherError, Result};

// ============================================================================
// Tap source trait
// ============================================================================

/// Source of diffusion taps for the engine.
///
/// Offsets are given for left-to-right scanning; the engine mirrors the column
/// offset on reversed rows. Weights may depend on the original pixel intensity
/// (0-255 scale), which is how variable-coefficient kernels plug in.
pub trait TapSource {
    /// Tap offsets as (row offset, column offset). Row offsets are never negative.
    fn offsets(&self) -> &[(usize, isize)];

    /// Weights parallel to `offsets()` for a pixel of the given original intensity.
    fn weights(&self, intensity: f32) -> &[f32];

    /// Largest row offset, fixing the error field depth.
    fn max_row_offset(&self) -> usize;
}

// ============================================================================
// Static catalog
// ============================================================================

/// Descriptive kernel family, used for listing only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KernelFamily {
    Classic,
    Sierra,
    Burkes,
    Atkinson,
    Research,
    Fan,
    Simple,
    Directional,
    Artistic,
    Optimized,
    VariableStatic,
    Experimental,
}

impl KernelFamily {
    pub const ALL: [KernelFamily; 12] = [
        KernelFamily::Classic,
        KernelFamily::Sierra,
        KernelFamily::Burkes,
        KernelFamily::Atkinson,
        KernelFamily::Research,
        KernelFamily::Fan,
        KernelFamily::Simple,
        KernelFamily::Directional,
        KernelFamily::Artistic,
        KernelFamily::Optimized,
        KernelFamily::VariableStatic,
        KernelFamily::Experimental,
    ];

    pub fn name(self) -> &'static str {
        match self {
            KernelFamily::Classic => "classic",
            KernelFamily::Sierra => "sierra",
            KernelFamily::Burkes => "burkes",
            KernelFamily::Atkinson => "atkinson",
            KernelFamily::Research => "research",
            KernelFamily::Fan => "fan",
            KernelFamily::Simple => "simple",
            KernelFamily::Directional => "directional",
            KernelFamily::Artistic => "artistic",
            KernelFamily::Optimized => "optimized",
            KernelFamily::VariableStatic => "variable_static",
            KernelFamily::Experimental => "experimental",
        }
    }
}

/// A catalog entry: raw integer taps `(dy, dx, weight)` and the designed divisor.
#[derive(Debug, PartialEq, Eq)]
pub struct KernelDef {
    pub name: &'static str,
    pub family: KernelFamily,
    pub taps: &'static [(i32, i32, u32)],
    pub denom: u32,
}

impl KernelDef {
    pub fn weight_sum(&self) -> u32 {
        self.taps.iter().map(|&(_, _, w)| w).sum()
    }

    /// True when the divisor equals the weight sum, so in-bounds error is conserved.
    pub fn is_normalized(&self) -> bool {
        self.denom == self.weight_sum()
    }

    /// Reject kernels that target already-finalized rows.
    pub fn validate_causal(&self) -> Result<()> {
        if self.taps.iter().any(|&(dy, _, _)| dy < 0) {
            return Err(DitherError::Causality(self.name.to_string()));
        }
        Ok(())
    }
}

use KernelFamily::*;

macro_rules! kernel {
    ($name:literal, $family:expr, $denom:literal, [$(($dy:literal, $dx:literal, $w:literal)),* $(,)?]) => {
        KernelDef { name: $name, family: $family, taps: &[$(($dy, $dx, $w)),*], denom: $denom }
    };
}

/// Canonical kernels. Taps are (row offset, column offset, weight).
pub static KERNELS: [KernelDef; 40] = [
    // Classic
    //       * 7
    //     3 5 1   (/16)
    kernel!("floyd_steinberg", Classic, 16, [(0, 1, 7), (1, -1, 3), (1, 0, 5), (1, 1, 1)]),
    kernel!("jarvis_judice_ninke", Classic, 48, [
        (0, 1, 7), (0, 2, 5),
        (1, -2, 3), (1, -1, 5), (1, 0, 7), (1, 1, 5), (1, 2, 3),
        (2, -2, 1), (2, -1, 3), (2, 0, 5), (2, 1, 3), (2, 2, 1),
    ]),
    kernel!("stucki", Classic, 42, [
        (0, 1, 8), (0, 2, 4),
        (1, -2, 2), (1, -1, 4), (1, 0, 8), (1, 1, 4), (1, 2, 2),
        (2, -2, 1), (2, -1, 2), (2, 0, 4), (2, 1, 2), (2, 2, 1),
    ]),
    // Sierra
    kernel!("sierra", Sierra, 32, [
        (0, 1, 5), (0, 2, 3),
        (1, -2, 2), (1, -1, 4), (1, 0, 5), (1, 1, 4), (1, 2, 2),
        (2, -1, 2), (2, 0, 3), (2, 1, 2),
    ]),
    kernel!("two_row_sierra", Sierra, 16, [
        (0, 1, 4), (0, 2, 3),
        (1, -2, 1), (1, -1, 2), (1, 0, 3), (1, 1, 2), (1, 2, 1),
    ]),
    kernel!("sierra_lite", Sierra, 4, [(0, 1, 2), (1, -1, 1), (1, 0, 1)]),
    kernel!("sierra_2", Sierra, 16, [
        (0, 1, 4), (0, 2, 3),
        (1, -2, 1), (1, -1, 2), (1, 0, 3), (1, 1, 2), (1, 2, 1),
    ]),
    kernel!("filter_lite", Sierra, 4, [(0, 1, 2), (1, 0, 1)]),
    // Burkes
    kernel!("burkes", Burkes, 32, [
        (0, 1, 8), (0, 2, 4),
        (1, -2, 2), (1, -1, 4), (1, 0, 8), (1, 1, 4), (1, 2, 2),
    ]),
    // Atkinson: only 6/8 of the error is propagated
    kernel!("atkinson", Atkinson, 8, [
        (0, 1, 1), (0, 2, 1),
        (1, -1, 1), (1, 0, 1), (1, 1, 1),
        (2, 0, 1),
    ]),
    // Research
    kernel!("bell", Research, 36, [
        (0, 1, 8), (0, 2, 4),
        (1, -2, 2), (1, -1, 4), (1, 0, 8), (1, 1, 4), (1, 2, 2),
        (2, -1, 1), (2, 0, 2), (2, 1, 1),
    ]),
    kernel!("stevenson_arce", Research, 200, [
        (0, 1, 32), (0, 2, 12),
        (1, -2, 5), (1, -1, 12), (1, 0, 26), (1, 1, 12), (1, 2, 5),
        (2, -2, 2), (2, -1, 5), (2, 0, 12), (2, 1, 5), (2, 2, 2),
    ]),
    // Fan
    kernel!("fan", Fan, 16, [(0, 1, 7), (1, -1, 1), (1, 0, 3), (1, 1, 5)]),
    kernel!("shiau_fan", Fan, 8, [(0, 1, 4), (1, -1, 1), (1, 0, 1), (1, 1, 2)]),
    kernel!("shiau_fan2", Fan, 16, [(0, 1, 8), (1, -1, 1), (1, 0, 2), (1, 1, 4)]),
    // Simple
    kernel!("simple_2d", Simple, 2, [(0, 1, 1), (1, 0, 1)]),
    kernel!("false_floyd_steinberg", Simple, 8, [(0, 1, 3), (1, -1, 1), (1, 0, 1)]),
    kernel!("three_pixel", Simple, 4, [(0, 1, 2), (1, -1, 1), (1, 0, 1)]),
    kernel!("four_pixel", Simple, 6, [(0, 1, 2), (1, -1, 1), (1, 0, 2), (1, 1, 1)]),
    kernel!("micro", Simple, 1, [(0, 1, 1)]),
    // Directional
    kernel!("diagonal", Directional, 2, [(0, 1, 1), (1, 1, 1)]),
    kernel!("x_diagonal", Directional, 2, [(1, -1, 1), (1, 1, 1)]),
    kernel!("horizontal", Directional, 1, [(0, 1, 1)]),
    kernel!("vertical", Directional, 1, [(1, 0, 1)]),
    kernel!("cross", Directional, 4, [(0, 1, 1), (0, -1, 1), (-1, 0, 1), (1, 0, 1)]),
    // Artistic
    kernel!("threshold", Artistic, 10, [(0, 1, 3), (1, -1, 2), (1, 0, 3), (1, 1, 2)]),
    kernel!("gradient", Artistic, 14, [(0, 1, 6), (0, 2, 4), (0, 3, 2), (1, 0, 2)]),
    kernel!("radial", Artistic, 16, [
        (0, 1, 4), (0, 2, 2),
        (-1, 1, 1),
        (1, -1, 2), (1, 0, 4), (1, 1, 2),
        (2, 0, 1),
    ]),
    kernel!("spiral", Artistic, 11, [(0, 1, 5), (1, 1, 3), (1, 0, 2), (1, -1, 1)]),
    kernel!("asymmetric", Artistic, 16, [
        (0, 1, 5), (0, 2, 2),
        (1, -1, 1), (1, 0, 3), (1, 1, 4), (1, 2, 1),
    ]),
    kernel!("weighted_diagonal", Artistic, 9, [(0, 1, 2), (1, -1, 3), (1, 0, 1), (1, 1, 3)]),
    // Optimized
    kernel!("minimized_average_error", Optimized, 42, [
        (0, 1, 8), (0, 2, 4),
        (1, -2, 2), (1, -1, 4), (1, 0, 8), (1, 1, 4), (1, 2, 2),
        (2, -2, 1), (2, -1, 2), (2, 0, 4), (2, 1, 2), (2, 2, 1),
    ]),
    kernel!("pigeon", Optimized, 8, [(0, 1, 2), (1, -1, 1), (1, 0, 2), (1, 1, 1)]),
    // Static versions of the variable-coefficient kernels
    kernel!("ostromoukhov_static", VariableStatic, 20, [(0, 1, 13), (1, -1, 0), (1, 0, 5), (1, 1, 2)]),
    kernel!("zhou_fang_static", VariableStatic, 12, [(0, 1, 7), (1, -1, 1), (1, 0, 3), (1, 1, 1)]),
    // Experimental
    kernel!("ripple", Experimental, 12, [
        (0, 1, 4), (0, 2, 2), (0, 3, 1),
        (1, -1, 1), (1, 0, 2), (1, 1, 1),
        (2, 0, 1),
    ]),
    kernel!("cluster", Experimental, 12, [(0, 1, 3), (0, 2, 3), (1, 0, 3), (1, 1, 3)]),
    kernel!("serpentine", Experimental, 16, [
        (0, 1, 6),
        (1, -1, 2), (1, 0, 4), (1, 1, 2),
        (2, -1, 1), (2, 1, 1),
    ]),
    kernel!("diamond", Experimental, 10, [
        (0, 1, 4),
        (-1, 0, 2),
        (1, -1, 1), (1, 0, 2), (1, 1, 1),
    ]),
    kernel!("hexagonal", Experimental, 12, [
        (0, 1, 3), (0, 2, 1),
        (-1, 1, 1),
        (1, -1, 1), (1, 0, 3), (1, 1, 3),
    ]),
];

/// Alias -> canonical name.
pub static KERNEL_ALIASES: [(&str, &str); 40] = [
    ("FS", "floyd_steinberg"),
    ("JJN", "jarvis_judice_ninke"),
    ("ST", "stucki"),
    ("SI", "sierra"),
    ("2RS", "two_row_sierra"),
    ("SL", "sierra_lite"),
    ("S2", "sierra_2"),
    ("FL", "filter_lite"),
    ("B", "burkes"),
    ("A", "atkinson"),
    ("BELL", "bell"),
    ("SA", "stevenson_arce"),
    ("FAN", "fan"),
    ("SF", "shiau_fan"),
    ("SF2", "shiau_fan2"),
    ("S2D", "simple_2d"),
    ("FFS", "false_floyd_steinberg"),
    ("3P", "three_pixel"),
    ("4P", "four_pixel"),
    ("M", "micro"),
    ("DIAG", "diagonal"),
    ("XDIAG", "x_diagonal"),
    ("H", "horizontal"),
    ("V", "vertical"),
    ("CROSS", "cross"),
    ("T", "threshold"),
    ("G", "gradient"),
    ("RAD", "radial"),
    ("SP", "spiral"),
    ("ASYM", "asymmetric"),
    ("WD", "weighted_diagonal"),
    ("MAE", "minimized_average_error"),
    ("P", "pigeon"),
    ("OST", "ostromoukhov_static"),
    ("ZF", "zhou_fang_static"),
    ("RIP", "ripple"),
    ("CL", "cluster"),
    ("SERP", "serpentine"),
    ("DIA", "diamond"),
    ("HEX", "hexagonal"),
];

struct Catalog {
    by_name: HashMap<&'static str, KernelId>,
    aliases: HashMap<&'static str, &'static str>,
}

static CATALOG: Lazy<Catalog> = Lazy::new(|| Catalog {
    by_name: KERNELS
        .iter()
        .enumerate()
        .map(|(i, k)| (k.name, KernelId(i as u16)))
        .collect(),
    aliases: KERNEL_ALIASES.iter().copied().collect(),
});

// ============================================================================
// KernelId
// ============================================================================

/// Resolved handle into `KERNELS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelId(u16);

impl KernelId {
    pub fn def(self) -> &'static KernelDef {
        &KERNELS[self.0 as usize]
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }

    /// Check causality and divide weights by the denominator.
    pub fn normalize(self) -> Result<NormalizedKernel> {
        let def = self.def();
        def.validate_causal()?;

        let denom = def.denom as f32;
        let offsets: Vec<(usize, isize)> = def
            .taps
            .iter()
            .map(|&(dy, dx, _)| (dy as usize, dx as isize))
            .collect();
        let weights = def.taps.iter().map(|&(_, _, w)| w as f32 / denom).collect();
        let max_dy = offsets.iter().map(|&(dy, _)| dy).max().unwrap_or(0);

        Ok(NormalizedKernel { id: self, offsets, weights, max_dy })
    }
}

// ============================================================================
// NormalizedKernel
// ============================================================================

/// One normalized tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub dy: usize,
    pub dx: isize,
    pub weight: f32,
}

/// Causal kernel with weights already divided by the denominator.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedKernel {
    id: KernelId,
    offsets: Vec<(usize, isize)>,
    weights: Vec<f32>,
    max_dy: usize,
}

impl NormalizedKernel {
    pub fn id(&self) -> KernelId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    pub fn taps(&self) -> impl Iterator<Item = Tap> + '_ {
        self.offsets
            .iter()
            .zip(&self.weights)
            .map(|(&(dy, dx), &weight)| Tap { dy, dx, weight })
    }
}

impl TapSource for NormalizedKernel {
    #[inline]
    fn offsets(&self) -> &[(usize, isize)] {
        &self.offsets
    }

    #[inline]
    fn weights(&self, _intensity: f32) -> &[f32] {
        &self.weights
    }

    #[inline]
    fn max_row_offset(&self) -> usize {
        self.max_dy
    }
}

// ============================================================================
// Name resolution and listing
// ============================================================================

fn supported_names() -> String {
    let mut names = list_available_kernels();
    names.extend(KERNEL_ALIASES.iter().map(|&(alias, _)| alias));
    names.join(", ")
}

/// Resolve an alias to its canonical name. Canonical and unknown names pass through.
pub fn resolve_kernel_name(name: &str) -> &str {
    CATALOG.aliases.get(name).copied().unwrap_or(name)
}

/// Look up a canonical kernel name.
pub fn lookup_kernel(canonical: &str) -> Result<KernelId> {
    CATALOG
        .by_name
        .get(canonical)
        .copied()
        .ok_or_else(|| DitherError::UnknownKernel {
            name: canonical.to_string(),
            supported: supported_names(),
        })
}

/// Resolve, look up and normalize a kernel by name or alias.
pub fn resolve_kernel(name: &str) -> Result<NormalizedKernel> {
    lookup_kernel(resolve_kernel_name(name))?.normalize()
}

/// Kernel details for inspection and listing.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelInfo {
    pub name: &'static str,
    pub family: KernelFamily,
    pub aliases: Vec<&'static str>,
    pub taps: &'static [(i32, i32, u32)],
    pub denominator: u32,
    pub weight_sum: u32,
    pub is_normalized: bool,
}

/// Inspect a kernel by name or alias.
pub fn kernel_info(name: &str) -> Result<KernelInfo> {
    let def = lookup_kernel(resolve_kernel_name(name))?.def();
    let aliases = KERNEL_ALIASES
        .iter()
        .filter(|&&(_, canon)| canon == def.name)
        .map(|&(alias, _)| alias)
        .collect();

    Ok(KernelInfo {
        name: def.name,
        family: def.family,
        aliases,
        taps: def.taps,
        denominator: def.denom,
        weight_sum: def.weight_sum(),
        is_normalized: def.is_normalized(),
    })
}

/// Canonical kernel names, sorted.
pub fn list_available_kernels() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = KERNELS.iter().map(|k| k.name).collect();
    names.sort_unstable();
    names
}

/// Alias -> canonical mapping.
pub fn list_kernel_aliases() -> BTreeMap<&'static str, &'static str> {
    KERNEL_ALIASES.iter().copied().collect()
}

/// Family -> sorted canonical names, in family declaration order.
pub fn list_kernels_by_family() -> Vec<(KernelFamily, Vec<&'static str>)> {
    KernelFamily::ALL
        .iter()
        .map(|&family| {
            let mut names: Vec<&'static str> = KERNELS
                .iter()
                .filter(|k| k.family == family)
                .map(|k| k.name)
                .collect();
            names.sort_unstable();
            (family, names)
        })
        .collect()
}

/// Pretty listing of kernels grouped by family with their aliases.
///
/// ```text
/// classic:
///   - floyd_steinberg            aliases: FS
/// ```
pub fn format_kernels_by_family() -> String {
    let mut out = String::new();
    for (family, names) in list_kernels_by_family() {
        if names.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}:", family.name());
        for name in names {
            let mut aliases: Vec<&str> = KERNEL_ALIASES
                .iter()
                .filter(|&&(alias, canon)| canon == name && alias != name)
                .map(|&(alias, _)| alias)
                .collect();
            aliases.sort_unstable();
            let alias_str = if aliases.is_empty() { "-".to_string() } else { aliases.join(", ") };
            let _ = writeln!(out, "  - {:<26} aliases: {}", name, alias_str);
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// Validate a list of kernel names or aliases, returning canonical names.
pub fn check_kernels<S: AsRef<str>>(names: &[S]) -> Result<Vec<&'static str>> {
    names
        .iter()
        .map(|n| {
            let n = n.as_ref();
            lookup_kernel(resolve_kernel_name(n))
                .map(KernelId::name)
                .map_err(|_| DitherError::UnknownKernel {
                    name: n.to_string(),
                    supported: list_available_kernels().join(", "),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_catalog_names_unique() {
        assert_eq!(CATALOG.by_name.len(), KERNELS.len());
        assert_eq!(CATALOG.aliases.len(), KERNEL_ALIASES.len());
        for &(_, canon) in KERNEL_ALIASES.iter() {
            assert!(CATALOG.by_name.contains_key(canon), "dangling alias target {}", canon);
        }
    }

    #[test]
    fn test_resolve_is_noop_for_canonical() {
        for k in KERNELS.iter() {
            assert_eq!(resolve_kernel_name(k.name), k.name);
        }
        assert_eq!(resolve_kernel_name("FS"), "floyd_steinberg");
        assert_eq!(resolve_kernel_name("no_such_kernel"), "no_such_kernel");
    }

    #[test]
    fn test_alias_round_trip() {
        for &(alias, canon) in KERNEL_ALIASES.iter() {
            let via_alias = lookup_kernel(resolve_kernel_name(alias)).unwrap();
            let direct = lookup_kernel(canon).unwrap();
            assert_eq!(via_alias, direct);
            assert_eq!(via_alias.def(), direct.def());
        }
    }

    #[test]
    fn test_unknown_kernel() {
        let err = lookup_kernel("nope").unwrap_err();
        assert!(matches!(err, DitherError::UnknownKernel { .. }));
        // Aliases are not canonical names
        assert!(lookup_kernel("FS").is_err());
    }

    #[test]
    fn test_non_causal_kernels_rejected() {
        for name in ["radial", "cross", "diamond", "hexagonal"] {
            let id = lookup_kernel(name).unwrap();
            match id.normalize() {
                Err(DitherError::Causality(n)) => assert_eq!(n, name),
                other => panic!("expected causality error for {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_normalized_weights() {
        let fs = resolve_kernel("FS").unwrap();
        assert_eq!(fs.max_row_offset(), 1);
        let taps: Vec<Tap> = fs.taps().collect();
        assert_eq!(taps[0], Tap { dy: 0, dx: 1, weight: 7.0 / 16.0 });
        assert_abs_diff_eq!(fs.weights(0.0).iter().sum::<f32>(), 1.0, epsilon = 1e-6);

        let jjn = resolve_kernel("JJN").unwrap();
        assert_eq!(jjn.max_row_offset(), 2);
        assert_eq!(resolve_kernel("micro").unwrap().max_row_offset(), 0);
    }

    #[test]
    fn test_kernel_info() {
        let info = kernel_info("A").unwrap();
        assert_eq!(info.name, "atkinson");
        assert_eq!(info.family, KernelFamily::Atkinson);
        assert_eq!(info.aliases, vec!["A"]);
        assert_eq!(info.weight_sum, 6);
        assert!(!info.is_normalized);

        let info = kernel_info("floyd_steinberg").unwrap();
        assert!(info.is_normalized);
        assert_eq!(info.denominator, 16);
    }

    #[test]
    fn test_listing() {
        let names = list_available_kernels();
        assert_eq!(names.len(), 40);
        assert!(names.windows(2).all(|w| w[0] < w[1]));

        let by_family = list_kernels_by_family();
        assert_eq!(by_family.len(), KernelFamily::ALL.len());
        let total: usize = by_family.iter().map(|(_, v)| v.len()).sum();
        assert_eq!(total, 40);

        let text = format_kernels_by_family();
        assert!(text.starts_with("classic:"));
        assert!(text.contains("floyd_steinberg"));
        assert!(text.contains("aliases: FS"));
    }

    #[test]
    fn test_check_kernels() {
        let ok = check_kernels(&["FS", "stucki", "2RS"]).unwrap();
        assert_eq!(ok, vec!["floyd_steinberg", "stucki", "two_row_sierra"]);
        match check_kernels(&["FS", "bogus"]) {
            Err(DitherError::UnknownKernel { name, .. }) => assert_eq!(name, "bogus"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
