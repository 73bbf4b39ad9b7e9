use tracing::info;

use crate::{
    dependency::{Dependency, Installer},
    error::Result,
    registry::ModuleRegistry,
};

/// Install every dependency in `dependencies` that is not already satisfied.
///
/// Sequential and fail-fast: the first installation error propagates
/// immediately and the remaining entries are left untouched. There is no
/// rollback and no partial-success report beyond what was logged.
pub async fn install_missing(
    dependencies: &[&dyn Installer],
    registry: &mut dyn ModuleRegistry,
) -> Result<()> {
    for dependency in dependencies {
        if dependency.is_installed().await? {
            info!("Dependency '{}' is already satisfied.", dependency.name());
        } else {
            dependency.install(registry).await?;
        }
    }
    Ok(())
}

/// An ordered inventory of dependencies the host cares about.
#[derive(Default)]
pub struct DependencySet {
    dependencies: Vec<Box<dyn Dependency>>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, dependency: Box<dyn Dependency>) {
        self.dependencies.push(dependency);
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Names of all dependencies, in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.dependencies
            .iter()
            .map(|dependency| dependency.name())
            .collect()
    }

    /// Names of the dependencies the package manager reports as installed.
    pub async fn list_installed(&self) -> Result<Vec<&str>> {
        let mut installed = Vec::new();
        for dependency in &self.dependencies {
            if dependency.is_installed().await? {
                installed.push(dependency.name());
            }
        }
        Ok(installed)
    }

    /// Names of the dependencies currently loaded in `registry`.
    pub fn list_loaded(&self, registry: &dyn ModuleRegistry) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter(|dependency| dependency.is_loaded(registry))
            .map(|dependency| dependency.name())
            .collect()
    }

    /// Install whatever the package manager does not already report as
    /// satisfied. See [`install_missing`].
    pub async fn install_missing(&self, registry: &mut dyn ModuleRegistry) -> Result<()> {
        let installers: Vec<&dyn Installer> = self
            .dependencies
            .iter()
            .map(|dependency| dependency.as_installer())
            .collect();
        install_missing(&installers, registry).await
    }
}

impl From<Vec<Box<dyn Dependency>>> for DependencySet {
    fn from(dependencies: Vec<Box<dyn Dependency>>) -> Self {
        Self { dependencies }
    }
}
