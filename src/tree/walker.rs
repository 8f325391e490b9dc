// Directory walker
//
// One-level enumerations of a folder. Recursion happens through
// DirectoryRecord::directories(), one level per call.

use crate::error::{Error, Result};
use crate::loader::SOURCE_EXTENSION;
use crate::tree::records::{DirectoryRecord, ModuleRecord};
use glob::Pattern;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Which folders are left out of traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkRules {
    excluded_prefixes: Vec<String>,
    exclude: Vec<Pattern>,
}

impl Default for WalkRules {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec!["__".to_string(), ".mypy_cache".to_string()],
            exclude: Vec::new(),
        }
    }
}

impl WalkRules {
    /// Rules from folder name prefixes and glob patterns on folder names
    pub fn new<S: AsRef<str>>(excluded_prefixes: &[S], exclude: &[S]) -> Result<Self> {
        let exclude = exclude
            .iter()
            .map(|p| Pattern::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            excluded_prefixes: excluded_prefixes
                .iter()
                .map(|p| p.as_ref().to_string())
                .collect(),
            exclude,
        })
    }

    pub fn excluded_prefixes(&self) -> &[String] {
        &self.excluded_prefixes
    }

    /// Check if a folder with this name is skipped
    pub fn is_excluded(&self, dir_name: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|prefix| dir_name.starts_with(prefix.as_str()))
            || self.exclude.iter().any(|pattern| pattern.matches(dir_name))
    }
}

/// Direct children of `root`, sorted by file name
fn children(root: &Path) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(e) if e.depth() > 0 => {
                warn!(root = %root.display(), error = %e, "skipping unreadable entry");
            }
            Err(e) => return Err(Error::WalkDir(e)),
        }
    }
    Ok(entries)
}

/// Sub-folders of `root` that are not excluded by `rules`.
///
/// Symlinked folders are not followed.
pub fn list_subdirectories(
    root: &Path,
    package_root: Option<&str>,
    rules: &Arc<WalkRules>,
) -> Result<Vec<DirectoryRecord>> {
    let mut dirs = Vec::new();
    for entry in children(root)? {
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if rules.is_excluded(&name) {
            debug!(path = %entry.path().display(), "excluded folder");
            continue;
        }
        dirs.push(DirectoryRecord::from_parts(
            entry.into_path(),
            package_root,
            Arc::clone(rules),
        ));
    }
    Ok(dirs)
}

/// Source files directly inside `root`
pub fn list_source_files(root: &Path, package_root: Option<&str>) -> Result<Vec<ModuleRecord>> {
    let mut files = Vec::new();
    for entry in children(root)? {
        let path = entry.path();
        let is_source = path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION);
        if is_source && path.is_file() {
            files.push(ModuleRecord::from_parts(entry.into_path(), package_root));
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn layout() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for sub in ["domain", "interactors", "__pycache__", ".mypy_cache", "build_tmp"] {
            fs::create_dir_all(root.join(sub)).unwrap();
        }
        fs::write(root.join("__init__.py"), "").unwrap();
        fs::write(root.join("b_module.py"), "").unwrap();
        fs::write(root.join("a_module.py"), "").unwrap();
        fs::write(root.join("notes.md"), "").unwrap();
        fs::write(root.join("__pycache__").join("cached.py"), "").unwrap();
        dir
    }

    fn dir_names(dirs: &[DirectoryRecord]) -> Vec<String> {
        dirs.iter().map(DirectoryRecord::name).collect()
    }

    #[test]
    fn test_default_rules() {
        let rules = WalkRules::default();
        assert!(rules.is_excluded("__pycache__"));
        assert!(rules.is_excluded("__private"));
        assert!(rules.is_excluded(".mypy_cache"));
        assert!(!rules.is_excluded("domain"));
        assert!(!rules.is_excluded("_single"));
    }

    #[test]
    fn test_custom_rules() {
        let rules = WalkRules::new(&[".cache"], &["*_tmp", "node_*"]).unwrap();
        assert!(rules.is_excluded(".cache-x"));
        assert!(rules.is_excluded("build_tmp"));
        assert!(rules.is_excluded("node_modules"));
        assert!(!rules.is_excluded("__pycache__"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = WalkRules::new(&["__"], &["[unclosed"]).unwrap_err();
        assert!(matches!(err, Error::GlobPattern(_)));
    }

    #[test]
    fn test_list_subdirectories_skips_excluded() {
        let dir = layout();
        let rules = Arc::new(WalkRules::default());
        let dirs = list_subdirectories(dir.path(), None, &rules).unwrap();
        assert_eq!(dir_names(&dirs), vec!["build_tmp", "domain", "interactors"]);

        let rules = Arc::new(WalkRules::new(&["__", ".mypy_cache"], &["*_tmp"]).unwrap());
        let dirs = list_subdirectories(dir.path(), None, &rules).unwrap();
        assert_eq!(dir_names(&dirs), vec!["domain", "interactors"]);
    }

    #[test]
    fn test_list_source_files_sorted_and_filtered() {
        let dir = layout();
        let files = list_source_files(dir.path(), None).unwrap();
        let names: Vec<String> = files.iter().map(ModuleRecord::name).collect();
        let root_name = dir.path().file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(names, vec![root_name, "a_module".to_string(), "b_module".to_string()]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let err = list_source_files(Path::new("/nonexistent/sourcedoc/root"), None).unwrap_err();
        assert!(matches!(err, Error::WalkDir(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_folders_not_followed() {
        let dir = layout();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("domain").join("loop")).unwrap();
        let rules = Arc::new(WalkRules::default());
        let domain = dir.path().join("domain");
        assert!(list_subdirectories(&domain, None, &rules).unwrap().is_empty());
    }
}
