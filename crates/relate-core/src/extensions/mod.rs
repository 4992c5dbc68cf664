//! Extensions: add-on packages with their own manifest, discovered from disk
//! or from a package registry, installed per type under the data root.

pub mod discovery;
pub mod install;
pub mod manifest;
pub mod registry;

pub use discovery::{discover_extension, discover_extension_distributions, ExtensionMeta};
pub use install::ExtensionManager;
pub use manifest::{ExtensionManifest, ExtensionType};
pub use registry::{ExtensionRegistry, ExtensionVersion, HttpExtensionRegistry};
