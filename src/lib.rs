//! Sourcedoc - Documentation paths for Python source trees
//!
//! Walks a Python package, loads its modules, extracts the classes and
//! functions each module declares, and maps every module to a canonical
//! documentation URL.

pub mod analysis;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod parser;
pub mod tree;

// Re-export main types
pub use analysis::{ClassRecord, FunctionRecord, MemberKind, SymbolRecord};
pub use config::Config;
pub use error::{Error, Result};
pub use loader::{import_module, resolve_module_id, ModuleResolver, SourceResolver};
pub use output::{build_tree, canonical_path, CollisionPolicy, Documentation, ModulePage};
pub use tree::{package_init_file, DirectoryRecord, ModuleRecord};
