use crate::error::{Error, Result};
use crate::loader::{search_root, SourceResolver};
use crate::output::{CollisionPolicy, Documentation};
use crate::tree::{DirectoryRecord, WalkRules};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub docs: DocsConfig,
    pub walker: WalkerConfig,
    pub loader: LoaderConfig,
}

/// Project layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    /// Source directory to document
    pub root: PathBuf,
    /// Top-level package name that dotted identifiers start at
    pub package_root: Option<String>,
}

/// Documentation site settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    pub base_url: String,
    pub on_collision: CollisionPolicy,
}

/// Traversal settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    /// Folders whose name starts with one of these are skipped
    pub excluded_prefixes: Vec<String>,
    /// Glob patterns on folder names
    pub exclude: Vec<String>,
}

/// Module loading settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Searched after the project's own search root
    pub search_paths: Vec<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Untitled Project".to_string(),
            root: PathBuf::from("."),
            package_root: None,
        }
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            base_url: "docs".to_string(),
            on_collision: CollisionPolicy::default(),
        }
    }
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec!["__".to_string(), ".mypy_cache".to_string()],
            exclude: vec![],
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load config from file or return defaults
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let base_url = &self.docs.base_url;
        if base_url.is_empty() {
            return Err(Error::config_validation("docs.base_url must not be empty"));
        }
        if base_url.chars().any(char::is_whitespace) {
            return Err(Error::config_validation(format!(
                "docs.base_url contains whitespace: {:?}",
                base_url
            )));
        }

        if let Some(pkg) = &self.project.package_root {
            if pkg.contains(|c: char| matches!(c, '.' | '/' | '\\')) {
                return Err(Error::config_validation(format!(
                    "project.package_root must be a single package name, got {:?}",
                    pkg
                )));
            }
        }

        if self.walker.excluded_prefixes.iter().any(String::is_empty) {
            return Err(Error::config_validation(
                "walker.excluded_prefixes must not contain an empty prefix",
            ));
        }

        for pattern in &self.walker.exclude {
            Pattern::new(pattern).map_err(|e| {
                Error::config_validation(format!("invalid exclude pattern {:?}: {}", pattern, e))
            })?;
        }

        Ok(())
    }

    fn package_root(&self) -> Option<&str> {
        self.project
            .package_root
            .as_deref()
            .filter(|pkg| !pkg.is_empty())
    }

    /// Exclusion rules for the walker
    pub fn walk_rules(&self) -> Result<WalkRules> {
        WalkRules::new(&self.walker.excluded_prefixes, &self.walker.exclude)
    }

    /// Record for the project's source directory
    pub fn root_directory(&self) -> Result<DirectoryRecord> {
        Ok(DirectoryRecord::new(&self.project.root, self.package_root())?
            .with_rules(self.walk_rules()?))
    }

    /// Documentation site for the project's source directory
    pub fn documentation(&self) -> Result<Documentation> {
        Ok(Documentation::new(self.root_directory()?, self.docs.base_url.clone())
            .with_policy(self.docs.on_collision))
    }

    /// Directory the project's modules are imported from.
    ///
    /// When the root lies inside the package, this is the folder holding
    /// the package. When the root contains the package, it is the root.
    pub fn search_root(&self) -> Result<PathBuf> {
        let root = &self.project.root;
        match search_root(root, self.package_root()) {
            Ok(path) => Ok(path),
            Err(e) if e.is_not_found() => Ok(root.clone()),
            Err(e) => Err(e),
        }
    }

    /// Module resolver over the search root and the configured search paths
    pub fn resolver(&self) -> Result<SourceResolver> {
        let mut resolver = SourceResolver::new([self.search_root()?])?;
        for path in &self.loader.search_paths {
            resolver.add_search_path(path);
        }
        Ok(resolver)
    }
}
