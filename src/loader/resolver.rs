// Module resolution and the module cache
//
// Resolving a dotted identifier locates its source on the search paths,
// parses it once, and keeps the handle until the cache is cleared. Edits
// made to a file after it was loaded are not seen until then.

use super::{validate_identifier, PACKAGE_INIT, SEPARATOR, SOURCE_EXTENSION};
use crate::error::{Error, Result};
use crate::parser::{Namespace, ParsedModule, PythonParser};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// How a module was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Parsed from a `.py` file
    Source,
    /// Compiled extension; cannot be introspected
    Extension,
    /// Directory without an initializer; cannot be introspected
    Namespace,
}

/// A loaded module handle
#[derive(Debug)]
pub struct LoadedModule {
    name: String,
    kind: ModuleKind,
    origin: PathBuf,
    parsed: Option<ParsedModule>,
}

impl LoadedModule {
    fn source(parsed: ParsedModule) -> Self {
        Self {
            name: parsed.module_name.clone(),
            kind: ModuleKind::Source,
            origin: parsed.path.clone(),
            parsed: Some(parsed),
        }
    }

    fn opaque(name: &str, kind: ModuleKind, origin: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            kind,
            origin,
            parsed: None,
        }
    }

    /// Dotted name the module was loaded under
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// File (or directory, for namespace packages) the module came from
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Cleaned module docstring
    pub fn doc(&self) -> Option<&str> {
        self.parsed.as_ref()?.docstring.as_deref()
    }

    /// Symbol table, or `None` when the module cannot be introspected
    pub fn namespace(&self) -> Option<&Namespace> {
        self.parsed.as_ref().map(|p| &p.namespace)
    }

    pub fn parsed(&self) -> Option<&ParsedModule> {
        self.parsed.as_ref()
    }
}

/// The module resolution capability.
///
/// Implementations decide where modules come from and how long loaded
/// handles are kept. Resolving the same identifier twice without clearing
/// must return the same handle.
pub trait ModuleResolver {
    fn resolve(&mut self, module_id: &str) -> Result<Arc<LoadedModule>>;
}

/// Where a dotted identifier was found on the search paths
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Source(PathBuf),
    Extension(PathBuf),
    Namespace(PathBuf),
}

/// Resolves modules from source files on a list of search paths
pub struct SourceResolver {
    search_paths: Vec<PathBuf>,
    parser: PythonParser,
    cache: HashMap<String, Arc<LoadedModule>>,
}

impl SourceResolver {
    /// Create a resolver with an empty cache
    pub fn new<I, P>(search_paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut resolver = Self {
            search_paths: Vec::new(),
            parser: PythonParser::new()?,
            cache: HashMap::new(),
        };
        for path in search_paths {
            resolver.add_search_path(path);
        }
        Ok(resolver)
    }

    /// Append a search path; duplicates are ignored
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.search_paths.contains(&path) {
            self.search_paths.push(path);
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn is_cached(&self, module_id: &str) -> bool {
        self.cache.contains_key(module_id)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Forget every loaded module
    pub fn clear(&mut self) {
        debug!(modules = self.cache.len(), "clearing module cache");
        self.cache.clear();
    }

    /// Find `module_id` on the search paths.
    ///
    /// Per search path a package initializer wins over an extension module,
    /// which wins over a plain source file. A bare directory only counts as
    /// a namespace package once no search path has anything better.
    fn locate(&self, module_id: &str) -> Option<Location> {
        let segments: Vec<&str> = module_id.split(SEPARATOR).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        let (last, parents) = segments.split_last()?;

        let mut namespace = None;
        for search_path in &self.search_paths {
            let dir = parents.iter().fold(search_path.clone(), |acc, p| acc.join(p));
            let package = dir.join(last);

            let init = package.join(format!("{}.{}", PACKAGE_INIT, SOURCE_EXTENSION));
            if init.is_file() {
                return Some(Location::Source(init));
            }
            if let Some(ext) = find_extension(&dir, last) {
                return Some(Location::Extension(ext));
            }
            let file = dir.join(format!("{}.{}", last, SOURCE_EXTENSION));
            if file.is_file() {
                return Some(Location::Source(file));
            }
            if namespace.is_none() && package.is_dir() {
                namespace = Some(package);
            }
        }

        namespace.map(Location::Namespace)
    }

    fn load(&mut self, module_id: &str) -> Result<LoadedModule> {
        match self.locate(module_id) {
            Some(Location::Source(path)) => {
                debug!(module = module_id, path = %path.display(), "loading module");
                let parsed = self.parser.parse_file(&path, module_id)?;
                Ok(LoadedModule::source(parsed))
            }
            Some(Location::Extension(path)) => {
                debug!(module = module_id, path = %path.display(), "extension module");
                Ok(LoadedModule::opaque(module_id, ModuleKind::Extension, path))
            }
            Some(Location::Namespace(path)) => {
                debug!(module = module_id, path = %path.display(), "namespace package");
                Ok(LoadedModule::opaque(module_id, ModuleKind::Namespace, path))
            }
            None => Err(Error::not_found(format!("No module named '{}'", module_id))),
        }
    }
}

impl ModuleResolver for SourceResolver {
    fn resolve(&mut self, module_id: &str) -> Result<Arc<LoadedModule>> {
        validate_identifier(module_id)?;
        if let Some(module) = self.cache.get(module_id) {
            return Ok(Arc::clone(module));
        }

        let module = Arc::new(self.load(module_id)?);
        self.cache.insert(module_id.to_string(), Arc::clone(&module));
        Ok(module)
    }
}

/// `name.so`, `name.pyd`, or tagged forms like `name.cpython-312-x86_64-linux-gnu.so`
fn find_extension(dir: &Path, name: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let tagged = format!("{}.", name);

    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                return false;
            };
            let is_binary = file_name.ends_with(".so") || file_name.ends_with(".pyd");
            is_binary && file_name.starts_with(&tagged) && path.is_file()
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}
