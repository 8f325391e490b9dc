//! Module loading: dotted identifiers from file paths, and the import step.
//!
//! A dotted identifier is built from the path segments of a source file,
//! anchored at the package root when one is given. Importing a dotted
//! identifier goes through a [`ModuleResolver`], which owns the module cache.

mod resolver;

pub use resolver::{LoadedModule, ModuleKind, ModuleResolver, SourceResolver};

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Extension of importable source files
pub const SOURCE_EXTENSION: &str = "py";

/// Stem of a package initializer file
pub const PACKAGE_INIT: &str = "__init__";

/// Separator between segments of a dotted identifier
pub const SEPARATOR: char = '.';

/// Normal path segments of `path`, without the file extension
fn module_segments(path: &Path) -> Vec<String> {
    path.with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Dotted identifier of the source file at `path`.
///
/// Without a package root every path segment is used. With one, the
/// identifier starts at the first segment equal to the package root.
/// A package initializer keeps its own name: `pkg/__init__.py` gives
/// `pkg.__init__`.
pub fn resolve_module_id(path: &Path, package_root: Option<&str>) -> Result<String> {
    let segments = module_segments(path);

    let start = match package_root.filter(|root| !root.is_empty()) {
        None => 0,
        Some(root) => segments.iter().position(|s| s == root).ok_or_else(|| {
            Error::not_found(format!(
                "package root '{}' in {}",
                root,
                path.display()
            ))
        })?,
    };

    Ok(segments[start..].join(&SEPARATOR.to_string()))
}

/// Directory from which `resolve_module_id(path, package_root)` is importable
pub fn search_root(path: &Path, package_root: Option<&str>) -> Result<PathBuf> {
    let package_root = package_root.filter(|root| !root.is_empty());
    let mut root = PathBuf::new();

    for component in path.components() {
        match (component, package_root) {
            (Component::Normal(segment), Some(pkg)) if segment == pkg => {
                return Ok(non_empty(root));
            }
            (Component::Normal(segment), Some(_)) => root.push(segment),
            (Component::Normal(_), None) => return Ok(non_empty(root)),
            (other, _) => root.push(other.as_os_str()),
        }
    }

    match package_root {
        Some(pkg) => Err(Error::not_found(format!(
            "package root '{}' in {}",
            pkg,
            path.display()
        ))),
        None => Ok(non_empty(root)),
    }
}

fn non_empty(path: PathBuf) -> PathBuf {
    if path.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        path
    }
}

/// True for `__init__.py` files
pub fn is_package_init(path: &Path) -> bool {
    path.file_stem().is_some_and(|stem| stem == PACKAGE_INIT)
        && path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
}

/// Display name of a module: its file stem, or the package directory name
/// for a package initializer
pub fn module_display_name(path: &Path) -> String {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    if is_package_init(path) {
        path.parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| stem.into_owned())
    } else {
        stem.into_owned()
    }
}

/// Reject identifiers that can never name a module
pub fn validate_identifier(module_id: &str) -> Result<()> {
    if module_id.is_empty() || module_id == "." || module_id == ".." {
        return Err(Error::InvalidIdentifier(module_id.to_string()));
    }
    Ok(())
}

/// Import `module_id` through `resolver`.
///
/// Invalid identifiers fail before the resolver is consulted; every other
/// failure is reported as [`Error::ImportFailure`] carrying the cause.
pub fn import_module(
    resolver: &mut dyn ModuleResolver,
    module_id: &str,
) -> Result<Arc<LoadedModule>> {
    validate_identifier(module_id)?;
    resolver
        .resolve(module_id)
        .map_err(|cause| Error::import_failure(module_id, cause))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_module_id_with_package_root() {
        let path = Path::new("python/bacore/domain/source_code.py");
        assert_eq!(
            resolve_module_id(path, Some("bacore")).unwrap(),
            "bacore.domain.source_code"
        );
    }

    #[test]
    fn test_module_id_package_init() {
        let path = Path::new("python/bacore/__init__.py");
        assert_eq!(resolve_module_id(path, Some("bacore")).unwrap(), "bacore.__init__");
        assert_eq!(module_display_name(path), "bacore");
    }

    #[test]
    fn test_module_id_without_package_root() {
        let path = Path::new("python/bacore/domain/files.py");
        assert_eq!(
            resolve_module_id(path, None).unwrap(),
            "python.bacore.domain.files"
        );
        assert_eq!(
            resolve_module_id(path, Some("")).unwrap(),
            "python.bacore.domain.files"
        );
    }

    #[test]
    fn test_module_id_uses_first_occurrence() {
        let path = Path::new("src/app/core/app/main.py");
        assert_eq!(resolve_module_id(path, Some("app")).unwrap(), "app.core.app.main");
    }

    #[test]
    fn test_module_id_skips_root_and_dots() {
        let path = Path::new("/srv/./proj/pkg/mod.py");
        assert_eq!(resolve_module_id(path, Some("pkg")).unwrap(), "pkg.mod");
        assert_eq!(resolve_module_id(path, None).unwrap(), "srv.proj.pkg.mod");
    }

    #[test]
    fn test_module_id_missing_package_root() {
        let err = resolve_module_id(Path::new("python/other/mod.py"), Some("bacore")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.to_string().contains("bacore"));
    }

    #[test]
    fn test_module_id_is_deterministic() {
        let path = Path::new("python/bacore/interactors/source_code_reader.py");
        let first = resolve_module_id(path, Some("bacore")).unwrap();
        for _ in 0..3 {
            assert_eq!(resolve_module_id(path, Some("bacore")).unwrap(), first);
        }
    }

    #[test]
    fn test_search_root() {
        assert_eq!(
            search_root(Path::new("python/bacore/domain/x.py"), Some("bacore")).unwrap(),
            PathBuf::from("python")
        );
        assert_eq!(
            search_root(Path::new("bacore/x.py"), Some("bacore")).unwrap(),
            PathBuf::from(".")
        );
        assert_eq!(
            search_root(Path::new("/srv/proj/bacore/x.py"), Some("bacore")).unwrap(),
            PathBuf::from("/srv/proj")
        );
        assert_eq!(
            search_root(Path::new("python/bacore/x.py"), None).unwrap(),
            PathBuf::from(".")
        );
        assert_eq!(
            search_root(Path::new("/srv/proj/x.py"), None).unwrap(),
            PathBuf::from("/")
        );
        assert!(search_root(Path::new("python/x.py"), Some("bacore")).is_err());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(module_display_name(Path::new("pkg/source_code.py")), "source_code");
        assert_eq!(module_display_name(Path::new("pkg/__init__.py")), "pkg");
        assert_eq!(module_display_name(Path::new("__init__.py")), "__init__");
        assert!(is_package_init(Path::new("a/__init__.py")));
        assert!(!is_package_init(Path::new("a/__init__.pyi")));
    }

    #[test]
    fn test_validate_identifier() {
        assert!(matches!(validate_identifier(""), Err(Error::InvalidIdentifier(_))));
        assert!(matches!(validate_identifier("."), Err(Error::InvalidIdentifier(_))));
        assert!(matches!(validate_identifier(".."), Err(Error::InvalidIdentifier(_))));
        assert!(validate_identifier("pkg.mod").is_ok());
    }

    #[test]
    fn test_import_module_errors() {
        let dir = TempDir::new().unwrap();
        let mut resolver = SourceResolver::new([dir.path()]).unwrap();

        assert!(matches!(
            import_module(&mut resolver, ""),
            Err(Error::InvalidIdentifier(_))
        ));
        assert!(matches!(
            import_module(&mut resolver, "."),
            Err(Error::InvalidIdentifier(_))
        ));
        let err = import_module(&mut resolver, "nonexistent.module").unwrap_err();
        assert!(matches!(err, Error::ImportFailure { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_import_module_syntax_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.py"), "def broken(:\n").unwrap();
        let mut resolver = SourceResolver::new([dir.path()]).unwrap();

        match import_module(&mut resolver, "broken") {
            Err(Error::ImportFailure { module, cause }) => {
                assert_eq!(module, "broken");
                assert!(matches!(*cause, Error::Parse { .. }));
            }
            other => panic!("expected import failure, got {other:?}"),
        }
    }

    #[test]
    fn test_import_module_success() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tool.py"), "\"\"\"Tool module.\"\"\"\n").unwrap();
        let mut resolver = SourceResolver::new([dir.path()]).unwrap();

        let module = import_module(&mut resolver, "tool").unwrap();
        assert_eq!(module.name(), "tool");
        assert_eq!(module.doc(), Some("Tool module."));
    }
}
