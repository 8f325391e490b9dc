//! Source tree model: records for folders and source files, and the
//! one-level walker behind them.

mod records;
mod walker;

pub use records::{package_init_file, DirectoryRecord, ModuleRecord};
pub use walker::{list_source_files, list_subdirectories, WalkRules};
