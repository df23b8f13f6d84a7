//! Error diffusion module
//!
//! Quantizes gray or RGB buffers to two levels (or a palette) in a single
//! causal raster pass, pushing each pixel's quantization error onto its
//! unprocessed neighbours.
//!
//! # Module Structure
//! - `kernels`: Kernel catalog, aliases, causality checks and the `TapSource` trait
//! - `adaptive`: Ostromoukhov coefficient table and Zhou-Fang threshold jitter
//! - `palette`: Palettes and nearest-color search
//! - `engine`: Error field, scan loop and the public entry points

pub mod kernels;
pub mod adaptive;
pub mod palette;
pub mod engine;

// Re-export the catalog surface
pub use kernels::{
    check_kernels,
    format_kernels_by_family,
    kernel_info,
    list_available_kernels,
    list_kernel_aliases,
    list_kernels_by_family,
    lookup_kernel,
    resolve_kernel,
    resolve_kernel_name,
    KernelDef,
    KernelFamily,
    KernelId,
    KernelInfo,
    NormalizedKernel,
    Tap,
    TapSource,
};

// Re-export adaptive diffusion support
pub use adaptive::{
    init_adaptive_tables,
    ostromoukhov_table,
    zhou_fang_strength,
    AdaptiveMethod,
    AdaptiveTable,
    AdaptiveTaps,
    FixedThreshold,
    JitterStrength,
    JitterThreshold,
    ThresholdSource,
};

pub use palette::{nearest_color, Palette};

// Re-export core diffusion functions
pub use engine::{
    adaptive_diffuse,
    diffuse_palette,
    diffuse_scalar,
    error_diffuse,
    palette_diffuse,
    AdaptiveConfig,
    DiffusionConfig,
    ErrorField,
    ErrorValue,
    PaletteImage,
};
