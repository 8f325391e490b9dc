// Parser module for turning Python source into namespaces

pub mod ast;
mod python;

pub use ast::*;
pub use python::PythonParser;
