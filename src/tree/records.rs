// Module and directory records
//
// Thin handles on paths in the source tree. Nothing is imported until a
// caller asks for a module's documentation or members.

use crate::analysis::{members, ClassRecord, FunctionRecord, Holder, MemberKind, SymbolRecord};
use crate::error::{Error, Result};
use crate::loader::{
    import_module, is_package_init, module_display_name, resolve_module_id, LoadedModule,
    ModuleResolver, SOURCE_EXTENSION,
};
use crate::tree::walker::{list_source_files, list_subdirectories, WalkRules};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn normalize_root(package_root: Option<&str>) -> Option<String> {
    package_root
        .filter(|root| !root.is_empty())
        .map(str::to_string)
}

/// A source file in the tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ModuleRecord {
    path: PathBuf,
    package_root: Option<String>,
}

impl ModuleRecord {
    /// Record for the source file at `path`, which must exist
    pub fn new(path: impl Into<PathBuf>, package_root: Option<&str>) -> Result<Self> {
        let path = path.into();
        let is_source = path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION);
        if !is_source || !path.is_file() {
            return Err(Error::type_mismatch("source file", path));
        }
        Ok(Self::from_parts(path, package_root))
    }

    pub(crate) fn from_parts(path: PathBuf, package_root: Option<&str>) -> Self {
        Self {
            path,
            package_root: normalize_root(package_root),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn package_root(&self) -> Option<&str> {
        self.package_root.as_deref()
    }

    /// Dotted identifier used to import this file
    pub fn module_id(&self) -> Result<String> {
        resolve_module_id(&self.path, self.package_root())
    }

    /// File stem, or the package name for an `__init__.py`
    pub fn name(&self) -> String {
        module_display_name(&self.path)
    }

    pub fn is_package_init(&self) -> bool {
        is_package_init(&self.path)
    }

    /// Import the module through `resolver`
    pub fn load(&self, resolver: &mut dyn ModuleResolver) -> Result<Arc<LoadedModule>> {
        import_module(resolver, &self.module_id()?)
    }

    /// Module docstring
    pub fn doc(&self, resolver: &mut dyn ModuleResolver) -> Result<Option<String>> {
        Ok(self.load(resolver)?.doc().map(str::to_string))
    }

    /// Members declared in this module, sorted by bound name
    pub fn members(
        &self,
        resolver: &mut dyn ModuleResolver,
        kind: MemberKind,
    ) -> Result<Vec<SymbolRecord>> {
        let module_id = self.module_id()?;
        let module = import_module(resolver, &module_id)?;
        Ok(members(Holder::Module(&module), &module_id, kind, resolver))
    }

    pub fn functions(&self, resolver: &mut dyn ModuleResolver) -> Result<Vec<FunctionRecord>> {
        Ok(self
            .members(resolver, MemberKind::Function)?
            .into_iter()
            .filter_map(SymbolRecord::into_function)
            .collect())
    }

    pub fn classes(&self, resolver: &mut dyn ModuleResolver) -> Result<Vec<ClassRecord>> {
        Ok(self
            .members(resolver, MemberKind::Class)?
            .into_iter()
            .filter_map(SymbolRecord::into_class)
            .collect())
    }
}

/// A folder in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    path: PathBuf,
    package_root: Option<String>,
    rules: Arc<WalkRules>,
}

impl DirectoryRecord {
    /// Record for the folder at `path`, which must exist
    pub fn new(path: impl Into<PathBuf>, package_root: Option<&str>) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(Error::type_mismatch("directory", path));
        }
        Ok(Self::from_parts(path, package_root, Arc::new(WalkRules::default())))
    }

    pub(crate) fn from_parts(
        path: PathBuf,
        package_root: Option<&str>,
        rules: Arc<WalkRules>,
    ) -> Self {
        Self {
            path,
            package_root: normalize_root(package_root),
            rules,
        }
    }

    /// Replace the exclusion rules; sub-folders inherit them
    pub fn with_rules(mut self, rules: WalkRules) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn package_root(&self) -> Option<&str> {
        self.package_root.as_deref()
    }

    pub fn rules(&self) -> &WalkRules {
        &self.rules
    }

    /// Last path segment
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Source files directly in this folder, sorted by file name
    pub fn modules(&self) -> Result<Vec<ModuleRecord>> {
        list_source_files(&self.path, self.package_root())
    }

    /// Sub-folders that are not excluded, sorted by name
    pub fn directories(&self) -> Result<Vec<DirectoryRecord>> {
        list_subdirectories(&self.path, self.package_root(), &self.rules)
    }
}

/// The `__init__.py` of the package at `dir`
pub fn package_init_file(dir: &Path, package_root: Option<&str>) -> Result<ModuleRecord> {
    DirectoryRecord::new(dir, package_root)?
        .modules()?
        .into_iter()
        .find(ModuleRecord::is_package_init)
        .ok_or_else(|| {
            Error::not_found(format!("no '__init__.py' file found in {}", dir.display()))
        })
}
