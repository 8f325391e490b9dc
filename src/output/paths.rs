// Documentation URL paths
//
// Maps a module to the hyphenated, slash separated path it is served
// under. The format is the contract renderers rely on when building links.

use crate::error::Result;
use crate::loader::{PACKAGE_INIT, SEPARATOR};
use crate::tree::ModuleRecord;

/// Separator between segments of a documentation URL
pub const URL_SEPARATOR: char = '/';

/// Canonical documentation URL of `module` under `base_url`.
///
/// The package root prefix is cut from the dotted identifier, package
/// initializers collapse onto their package, underscores become hyphens and
/// dots become slashes. A root `__init__.py` maps to `base_url` itself.
pub fn canonical_path(
    module: &ModuleRecord,
    base_url: &str,
    package_root: Option<&str>,
) -> Result<String> {
    let module_id = module.module_id()?;
    Ok(url_for_id(&module_id, base_url, package_root))
}

fn url_for_id(module_id: &str, base_url: &str, package_root: Option<&str>) -> String {
    let offset = match package_root {
        Some(root) if !root.is_empty() => root.chars().count() + 1,
        _ => 0,
    };

    let relative: String = module_id.chars().skip(offset).collect();
    let relative = relative
        .replace(PACKAGE_INIT, "")
        .replace('_', "-")
        .replace(SEPARATOR, &URL_SEPARATOR.to_string());

    let base = base_url.strip_suffix(URL_SEPARATOR).unwrap_or(base_url);
    let url = format!("{base}{URL_SEPARATOR}{relative}");
    match url.strip_suffix(URL_SEPARATOR) {
        Some(trimmed) => trimmed.to_string(),
        None => url,
    }
}
