use serde::{Deserialize, Serialize};

/// One parsed line of a requirements file.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    /// First version constraint on the line, e.g. `>=2.0`.
    pub version: Option<String>,
    /// Direct reference: a local path, URL, or VCS locator.
    pub url: Option<String>,
}

/// One row of `pip list --format=json`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
}
