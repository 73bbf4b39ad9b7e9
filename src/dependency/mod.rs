use async_trait::async_trait;

pub mod pip;
pub mod requirements;

use crate::{error::Result, registry::ModuleRegistry};

/// Loading side of a dependency: moves an importable unit in and out of the
/// host's module registry.
pub trait Loader: Send + Sync {
    /// Load the unit into `registry`. No-op when already loaded, and silently
    /// does nothing when the unit cannot be located; callers that need to
    /// distinguish the outcomes follow up with [`Loader::is_loaded`].
    fn load(&self, registry: &mut dyn ModuleRegistry);

    /// Remove the unit from `registry` if present.
    fn unload(&self, registry: &mut dyn ModuleRegistry);

    /// Re-execute the unit in place, or fall back to [`Loader::load`] when it
    /// is not currently loaded.
    fn reload(&self, registry: &mut dyn ModuleRegistry);

    /// Check the current registry state. Never a cached answer.
    fn is_loaded(&self, registry: &dyn ModuleRegistry) -> bool;
}

/// Installing side of a dependency, backed by the package manager.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Name used for registry lookups and user-facing messages. Two
    /// descriptors may refer to the same underlying package under different
    /// names.
    fn name(&self) -> &str;

    /// Query the package manager's metadata without installing.
    async fn is_installed(&self) -> Result<bool>;

    /// Install via the package manager. Not guaranteed to be a no-op when
    /// already installed; check [`Installer::is_installed`] first.
    async fn install(&self, registry: &mut dyn ModuleRegistry) -> Result<()>;

    /// Uninstall via the package manager.
    async fn uninstall(&self, registry: &mut dyn ModuleRegistry) -> Result<()>;

    /// Upgrade to the latest compatible version.
    async fn update(&self) -> Result<()>;
}

/// Full dependency contract: anything that can both install and load.
pub trait Dependency: Installer + Loader {
    fn as_installer(&self) -> &dyn Installer;
    fn as_loader(&self) -> &dyn Loader;
}

impl<T: Installer + Loader> Dependency for T {
    fn as_installer(&self) -> &dyn Installer {
        self
    }

    fn as_loader(&self) -> &dyn Loader {
        self
    }
}
