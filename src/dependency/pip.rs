use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};
use which::which;

use super::{Installer, Loader};
use crate::{
    error::{Error, Result},
    registry::ModuleRegistry,
    types::InstalledPackage,
};

/// Wrapper around the pip executable.
///
/// Every invocation runs as a separate OS process awaited on the host's
/// runtime, so a network-bound install never blocks the host itself. There is
/// no timeout or watchdog; an invocation completes, fails with a non-zero
/// exit, or runs until pip gives up.
#[derive(Debug, Clone)]
pub struct PipClient {
    program: PathBuf,
    quiet: bool,
}

impl Default for PipClient {
    fn default() -> Self {
        let program = which("pip3")
            .or_else(|_| which("pip"))
            .unwrap_or_else(|_| PathBuf::from("pip3"));
        Self {
            program,
            quiet: false,
        }
    }
}

impl PipClient {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            quiet: false,
        }
    }

    /// Suppress pip's progress output.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Returns true if the pip executable can be found.
    pub fn is_available(&self) -> bool {
        which(&self.program).is_ok()
    }

    pub async fn install(&self, spec: &str, target: Option<&Path>) -> Result<()> {
        let mut args = self.install_args();
        args.push(spec.to_string());
        push_target(&mut args, target);
        self.run(&args).await
    }

    pub async fn install_requirements(&self, path: &Path, target: Option<&Path>) -> Result<()> {
        let mut args = self.install_args();
        args.push("-r".to_string());
        args.push(path.display().to_string());
        push_target(&mut args, target);
        self.run(&args).await
    }

    pub async fn uninstall(&self, name: &str) -> Result<()> {
        self.run(&[
            "uninstall".to_string(),
            "-y".to_string(),
            name.to_string(),
        ])
        .await
    }

    pub async fn uninstall_requirements(&self, path: &Path) -> Result<()> {
        self.run(&[
            "uninstall".to_string(),
            "-y".to_string(),
            "-r".to_string(),
            path.display().to_string(),
        ])
        .await
    }

    pub async fn upgrade(&self, name: &str) -> Result<()> {
        self.run(&[
            "install".to_string(),
            "--upgrade".to_string(),
            name.to_string(),
        ])
        .await
    }

    pub async fn upgrade_requirements(&self, path: &Path) -> Result<()> {
        self.run(&[
            "install".to_string(),
            "--upgrade".to_string(),
            "-r".to_string(),
            path.display().to_string(),
        ])
        .await
    }

    /// Query package metadata. True when the distribution is known to pip.
    pub async fn show(&self, name: &str) -> Result<bool> {
        let output = Command::new(&self.program)
            .args(["show", name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                Error::PackageManager(format!("Failed to query package status: {}", e))
            })?;
        Ok(output.status.success())
    }

    /// Decode `pip list --format=json` into package records.
    pub async fn list_installed(&self) -> Result<Vec<InstalledPackage>> {
        let args = ["list".to_string(), "--format=json".to_string()];
        let output = Command::new(&self.program)
            .args(&args)
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::PackageManager(format!("Failed to list packages: {}", e)))?;
        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: render_command(&self.program, &args),
                status: output.status,
            });
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::PackageManager(format!("Failed to decode package list: {}", e)))
    }

    fn install_args(&self) -> Vec<String> {
        let mut args = vec!["install".to_string()];
        if self.quiet {
            args.push("--quiet".to_string());
        }
        args
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        let command = render_command(&self.program, args);
        debug!("Running: {}", command);
        let status = Command::new(&self.program)
            .args(args)
            .status()
            .await
            .map_err(|e| Error::PackageManager(format!("Failed to run '{}': {}", command, e)))?;
        if !status.success() {
            return Err(Error::CommandFailed { command, status });
        }
        Ok(())
    }
}

fn push_target(args: &mut Vec<String>, target: Option<&Path>) {
    if let Some(dir) = target {
        args.push("--target".to_string());
        args.push(dir.display().to_string());
    }
}

fn render_command(program: &Path, args: &[String]) -> String {
    format!("{} {}", program.display(), args.join(" "))
}

/// A single package installed from the package index.
///
/// `name` is the import name used for registry lookups. When the install-time
/// spec differs - a different distribution name, or a pinned version - set it
/// with [`PipDependency::with_package`].
#[derive(Debug, Clone)]
pub struct PipDependency {
    name: String,
    package: Option<String>,
    destination: Option<PathBuf>,
    client: PipClient,
}

impl PipDependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: None,
            destination: None,
            client: PipClient::default(),
        }
    }

    /// Install-time name/version spec when it differs from the import name.
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Directory to install into (`--target`).
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_client(mut self, client: PipClient) -> Self {
        self.client = client;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The spec handed to the package manager on install.
    pub fn package_spec(&self) -> &str {
        self.package.as_deref().unwrap_or(&self.name)
    }

    /// Distribution name as known to the package manager: the package spec
    /// stripped of version constraints, extras, and direct references.
    fn project_name(&self) -> &str {
        let spec = self.package_spec();
        spec.split(['<', '>', '=', '!', '~', '[', '@', ' '])
            .next()
            .unwrap_or(spec)
    }

    fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }
}

#[async_trait]
impl Installer for PipDependency {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_installed(&self) -> Result<bool> {
        self.client.show(self.project_name()).await
    }

    async fn install(&self, registry: &mut dyn ModuleRegistry) -> Result<()> {
        info!("Installing dependency '{}'", self.name);
        self.client
            .install(self.package_spec(), self.destination())
            .await
            .map_err(|e| Error::Installation {
                name: self.name.clone(),
                cause: Box::new(e),
            })?;
        registry.invalidate_caches();
        debug!("Successfully installed dependency '{}'", self.name);
        Ok(())
    }

    async fn uninstall(&self, registry: &mut dyn ModuleRegistry) -> Result<()> {
        info!("Uninstalling dependency '{}'", self.name);
        self.client.uninstall(self.project_name()).await?;
        registry.invalidate_caches();
        Ok(())
    }

    async fn update(&self) -> Result<()> {
        info!("Updating dependency '{}'", self.name);
        self.client.upgrade(self.project_name()).await
    }
}

impl Loader for PipDependency {
    fn load(&self, registry: &mut dyn ModuleRegistry) {
        if registry.is_loaded(&self.name) {
            return;
        }
        if !registry.load(&self.name) {
            debug!("Module '{}' not found, nothing to load", self.name);
        }
    }

    fn unload(&self, registry: &mut dyn ModuleRegistry) {
        registry.unload(&self.name);
        registry.invalidate_caches();
    }

    fn reload(&self, registry: &mut dyn ModuleRegistry) {
        if !registry.reload(&self.name) {
            self.load(registry);
        }
    }

    fn is_loaded(&self, registry: &dyn ModuleRegistry) -> bool {
        registry.is_loaded(&self.name)
    }
}

/// A package installed from an explicit location: a filesystem path, URL, or
/// version-control locator. Loading and unloading work exactly as for
/// [`PipDependency`].
#[derive(Debug, Clone)]
pub struct PipPathDependency {
    dependency: PipDependency,
    path: String,
}

impl PipPathDependency {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            dependency: PipDependency::new(name),
            path: path.into(),
        }
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.dependency = self.dependency.with_destination(destination);
        self
    }

    pub fn with_client(mut self, client: PipClient) -> Self {
        self.dependency = self.dependency.with_client(client);
        self
    }

    pub fn name(&self) -> &str {
        self.dependency.name()
    }

    /// The install source handed to the package manager.
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl Installer for PipPathDependency {
    fn name(&self) -> &str {
        self.dependency.name()
    }

    async fn is_installed(&self) -> Result<bool> {
        self.dependency.is_installed().await
    }

    async fn install(&self, registry: &mut dyn ModuleRegistry) -> Result<()> {
        info!("Installing dependency '{}' from {}", self.name(), self.path);
        self.dependency
            .client
            .install(&self.path, self.dependency.destination())
            .await
            .map_err(|e| Error::Installation {
                name: self.name().to_string(),
                cause: Box::new(e),
            })?;
        registry.invalidate_caches();
        Ok(())
    }

    async fn uninstall(&self, registry: &mut dyn ModuleRegistry) -> Result<()> {
        self.dependency.uninstall(registry).await
    }

    async fn update(&self) -> Result<()> {
        self.dependency.update().await
    }
}

impl Loader for PipPathDependency {
    fn load(&self, registry: &mut dyn ModuleRegistry) {
        self.dependency.load(registry);
    }

    fn unload(&self, registry: &mut dyn ModuleRegistry) {
        self.dependency.unload(registry);
    }

    fn reload(&self, registry: &mut dyn ModuleRegistry) {
        self.dependency.reload(registry);
    }

    fn is_loaded(&self, registry: &dyn ModuleRegistry) -> bool {
        self.dependency.is_loaded(registry)
    }
}
