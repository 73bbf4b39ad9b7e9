use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use super::pip::{PipClient, PipDependency, PipPathDependency};
use super::{Installer, Loader};
use crate::{
    error::{Error, Result},
    registry::ModuleRegistry,
    types::Requirement,
};

/// One entry of a requirements file: either an index package or a direct
/// location reference.
#[derive(Debug, Clone)]
pub enum RequirementDependency {
    Package(PipDependency),
    Location(PipPathDependency),
}

impl RequirementDependency {
    pub fn name(&self) -> &str {
        match self {
            RequirementDependency::Package(dependency) => dependency.name(),
            RequirementDependency::Location(dependency) => dependency.name(),
        }
    }
}

#[async_trait]
impl Installer for RequirementDependency {
    fn name(&self) -> &str {
        RequirementDependency::name(self)
    }

    async fn is_installed(&self) -> Result<bool> {
        match self {
            RequirementDependency::Package(dependency) => dependency.is_installed().await,
            RequirementDependency::Location(dependency) => dependency.is_installed().await,
        }
    }

    async fn install(&self, registry: &mut dyn ModuleRegistry) -> Result<()> {
        match self {
            RequirementDependency::Package(dependency) => dependency.install(registry).await,
            RequirementDependency::Location(dependency) => dependency.install(registry).await,
        }
    }

    async fn uninstall(&self, registry: &mut dyn ModuleRegistry) -> Result<()> {
        match self {
            RequirementDependency::Package(dependency) => dependency.uninstall(registry).await,
            RequirementDependency::Location(dependency) => dependency.uninstall(registry).await,
        }
    }

    async fn update(&self) -> Result<()> {
        match self {
            RequirementDependency::Package(dependency) => dependency.update().await,
            RequirementDependency::Location(dependency) => dependency.update().await,
        }
    }
}

impl Loader for RequirementDependency {
    fn load(&self, registry: &mut dyn ModuleRegistry) {
        match self {
            RequirementDependency::Package(dependency) => dependency.load(registry),
            RequirementDependency::Location(dependency) => dependency.load(registry),
        }
    }

    fn unload(&self, registry: &mut dyn ModuleRegistry) {
        match self {
            RequirementDependency::Package(dependency) => dependency.unload(registry),
            RequirementDependency::Location(dependency) => dependency.unload(registry),
        }
    }

    fn reload(&self, registry: &mut dyn ModuleRegistry) {
        match self {
            RequirementDependency::Package(dependency) => dependency.reload(registry),
            RequirementDependency::Location(dependency) => dependency.reload(registry),
        }
    }

    fn is_loaded(&self, registry: &dyn ModuleRegistry) -> bool {
        match self {
            RequirementDependency::Package(dependency) => dependency.is_loaded(registry),
            RequirementDependency::Location(dependency) => dependency.is_loaded(registry),
        }
    }
}

/// An ordered set of dependencies parsed from a requirements file.
///
/// The file is read once at construction and never re-read; to pick up edits,
/// construct a new descriptor. Each entry's import name is taken from its
/// distribution name, so distributions whose import name differs (`Pillow`
/// importing as `PIL`) will misreport their load status. That constraint is
/// inherited from the file format, which carries no import names.
#[derive(Debug, Clone)]
pub struct RequirementsFileDependency {
    name: String,
    path: PathBuf,
    destination: Option<PathBuf>,
    client: PipClient,
    requirements: Vec<RequirementDependency>,
}

impl RequirementsFileDependency {
    /// Read and parse `path`. Fails on an unreadable file or a line that does
    /// not conform to the requirement grammar.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_options(name, path, None, PipClient::default())
    }

    pub fn with_options(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        destination: Option<PathBuf>,
        client: PipClient,
    ) -> Result<Self> {
        let path = path.into();
        let contents = fs::read_to_string(&path)?;
        let requirements = parse_requirements(&contents, destination.as_deref(), &client)?;
        Ok(Self {
            name: name.into(),
            path,
            destination,
            client,
            requirements,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed entries, in file order.
    pub fn requirements(&self) -> &[RequirementDependency] {
        &self.requirements
    }
}

#[async_trait]
impl Installer for RequirementsFileDependency {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_installed(&self) -> Result<bool> {
        for requirement in &self.requirements {
            if !requirement.is_installed().await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Installs the entire file in one package-manager invocation. Partial
    /// failure aborts the whole set.
    async fn install(&self, registry: &mut dyn ModuleRegistry) -> Result<()> {
        info!("Installing requirements from {}", self.path.display());
        self.client
            .install_requirements(&self.path, self.destination.as_deref())
            .await
            .map_err(|e| Error::Installation {
                name: self.path.display().to_string(),
                cause: Box::new(e),
            })?;
        registry.invalidate_caches();
        Ok(())
    }

    async fn uninstall(&self, registry: &mut dyn ModuleRegistry) -> Result<()> {
        info!("Uninstalling requirements from {}", self.path.display());
        self.client.uninstall_requirements(&self.path).await?;
        registry.invalidate_caches();
        Ok(())
    }

    async fn update(&self) -> Result<()> {
        info!("Updating requirements from {}", self.path.display());
        self.client.upgrade_requirements(&self.path).await
    }
}

impl Loader for RequirementsFileDependency {
    fn load(&self, registry: &mut dyn ModuleRegistry) {
        if self.is_loaded(registry) {
            return;
        }
        for requirement in &self.requirements {
            if !requirement.is_loaded(registry) {
                requirement.load(registry);
            }
        }
    }

    fn unload(&self, registry: &mut dyn ModuleRegistry) {
        for requirement in &self.requirements {
            requirement.unload(registry);
        }
    }

    fn reload(&self, registry: &mut dyn ModuleRegistry) {
        for requirement in &self.requirements {
            requirement.reload(registry);
        }
    }

    fn is_loaded(&self, registry: &dyn ModuleRegistry) -> bool {
        self.requirements
            .iter()
            .all(|requirement| requirement.is_loaded(registry))
    }
}

fn parse_requirements(
    contents: &str,
    destination: Option<&Path>,
    client: &PipClient,
) -> Result<Vec<RequirementDependency>> {
    let pattern = requirement_pattern();
    let mut requirements = Vec::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let requirement = parse_line(&pattern, trimmed)?;
        requirements.push(to_dependency(requirement, destination, client));
    }
    Ok(requirements)
}

/// Parse one requirement line: a name, optional extras, then either a direct
/// `@ <location>` reference or version constraints. An environment marker
/// after `;` is ignored, as are constraints past the first.
pub fn parse_requirement(line: &str) -> Result<Requirement> {
    parse_line(&requirement_pattern(), line)
}

fn requirement_pattern() -> Regex {
    Regex::new(
        r"(?x)
        ^
        (?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)
        \s*
        (?:\[[A-Za-z0-9._,\s-]*\])?
        \s*
        (?:
            @\s*(?P<url>\S+)
          |
            (?P<version>(?:===|==|~=|!=|<=|>=|<|>)\s*[^,\s]+)
            (?:\s*,\s*(?:===|==|~=|!=|<=|>=|<|>)\s*[^,\s]+)*
        )?
        \s*$
    ",
    )
    .unwrap()
}

fn parse_line(pattern: &Regex, line: &str) -> Result<Requirement> {
    let spec = line.split(';').next().unwrap_or(line).trim();
    let caps = pattern.captures(spec).ok_or_else(|| Error::Parse {
        line: line.to_string(),
        reason: "does not match the requirement grammar".to_string(),
    })?;
    Ok(Requirement {
        name: caps["name"].to_string(),
        version: caps
            .name("version")
            .map(|m| m.as_str().replace(char::is_whitespace, "")),
        url: caps.name("url").map(|m| m.as_str().to_string()),
    })
}

fn to_dependency(
    requirement: Requirement,
    destination: Option<&Path>,
    client: &PipClient,
) -> RequirementDependency {
    let Requirement { name, version, url } = requirement;
    if let Some(url) = url {
        let mut dependency = PipPathDependency::new(name, url).with_client(client.clone());
        if let Some(dir) = destination {
            dependency = dependency.with_destination(dir);
        }
        RequirementDependency::Location(dependency)
    } else {
        let package = match &version {
            Some(version) => format!("{}{}", name, version),
            None => name.clone(),
        };
        let mut dependency = PipDependency::new(name)
            .with_package(package)
            .with_client(client.clone());
        if let Some(dir) = destination {
            dependency = dependency.with_destination(dir);
        }
        RequirementDependency::Package(dependency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_bare_name() {
        let requirement = parse_requirement("requests").unwrap();
        assert_eq!(requirement.name, "requests");
        assert_eq!(requirement.version, None);
        assert_eq!(requirement.url, None);
    }

    #[test]
    fn test_parses_first_version_constraint() {
        let requirement = parse_requirement("requests >= 2.0, < 3").unwrap();
        assert_eq!(requirement.name, "requests");
        assert_eq!(requirement.version.as_deref(), Some(">=2.0"));
    }

    #[test]
    fn test_parses_direct_reference() {
        let requirement =
            parse_requirement("tracker @ git+https://example.com/tracker.git").unwrap();
        assert_eq!(requirement.name, "tracker");
        assert_eq!(
            requirement.url.as_deref(),
            Some("git+https://example.com/tracker.git")
        );
    }

    #[test]
    fn test_extras_and_markers_are_ignored() {
        let requirement =
            parse_requirement("uvicorn[standard]==0.23.2 ; python_version >= \"3.8\"").unwrap();
        assert_eq!(requirement.name, "uvicorn");
        assert_eq!(requirement.version.as_deref(), Some("==0.23.2"));
    }

    #[test]
    fn test_rejects_malformed_line() {
        let result = parse_requirement("???");
        assert!(matches!(result, Err(Error::Parse { .. })));
    }

    #[test]
    fn test_rejects_trailing_garbage() {
        let result = parse_requirement("requests==2.0 oops");
        assert!(matches!(result, Err(Error::Parse { .. })));
    }
}
