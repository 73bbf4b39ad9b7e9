//! Runtime Dependency Manager (RDM)
//!
//! On-demand installation and loading of a plugin host's third-party
//! dependencies. Packages are not bundled with the plugin; they are installed
//! into the host's runtime at first use, either individually from the package
//! index, from an explicit path/URL/VCS location, or as a set pinned in a
//! requirements file, and then loaded into the host's module registry.

pub mod dependency;
pub mod error;
pub mod manager;
pub mod registry;
mod types;

#[cfg(test)]
mod tests;

pub use dependency::pip::{PipClient, PipDependency, PipPathDependency};
pub use dependency::requirements::{RequirementDependency, RequirementsFileDependency};
pub use dependency::{Dependency, Installer, Loader};
pub use error::{Error, Result};
pub use manager::{install_missing, DependencySet};
pub use registry::{DirectoryRegistry, LoadedModule, ModuleRegistry};
pub use types::{InstalledPackage, Requirement};
