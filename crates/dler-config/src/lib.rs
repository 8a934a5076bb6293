//! Configuration layer for dler builds.
//!
//! Everything a package build needs to know before it touches the output
//! directory lives here: the package manifest model, option types, presets,
//! config-file discovery and the layered merger that produces [`BuildOptions`].

pub mod defaults;
pub mod discovery;
pub mod error;
pub mod external;
pub mod manifest;
pub mod merge;
pub mod options;
pub mod preset;
pub mod validation;

pub use defaults::{NODE_BUILTINS, default_options};
pub use discovery::{ConfigDiscovery, discover};
pub use error::*;
pub use external::ExternalPattern;
pub use manifest::{BinField, PackageManifest, package_name};
pub use merge::{merge_layer, merge_options, merge_values};
pub use options::*;
pub use preset::{Preset, PresetFactory, ResolvedPreset, resolve_preset, select_preset};
pub use validation::{ConfigValidator, OptionsValidator, validate_options};
