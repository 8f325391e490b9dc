// Documentation output: URL paths, the URL to module tree, and page content

pub mod docs;
pub mod page;
pub mod paths;

pub use docs::{build_tree, CollisionPolicy, DocsTree, Documentation};
pub use page::{title_case, ModulePage};
pub use paths::{canonical_path, URL_SEPARATOR};
