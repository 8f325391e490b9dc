// Symbol records
//
// Read-only views over functions and classes found in a loaded module.
// Class records carry their own nested members, so renderers never have
// to go back to the loader.

use crate::parser::{ClassDef, FunctionDef};
use serde::Serialize;

/// A function or method
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionRecord {
    name: String,
    doc: Option<String>,
    signature: String,
    is_async: bool,
    module: String,
}

impl FunctionRecord {
    pub(crate) fn new(def: &FunctionDef, module: &str) -> Self {
        Self {
            name: def.name.clone(),
            doc: def.docstring.clone(),
            signature: def.signature(),
            is_async: def.is_async,
            module: module.to_string(),
        }
    }

    /// The function's own name, even when bound under an alias
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// `def name(params) -> ret` as written in the source
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Dotted name of the module that defines the function
    pub fn module(&self) -> &str {
        &self.module
    }
}

/// A class, with its methods and nested classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassRecord {
    name: String,
    doc: Option<String>,
    bases: Vec<String>,
    module: String,
    functions: Vec<FunctionRecord>,
    classes: Vec<ClassRecord>,
}

impl ClassRecord {
    pub(crate) fn new(
        def: &ClassDef,
        module: &str,
        functions: Vec<FunctionRecord>,
        classes: Vec<ClassRecord>,
    ) -> Self {
        Self {
            name: def.name.clone(),
            doc: def.docstring.clone(),
            bases: def.bases.clone(),
            module: module.to_string(),
            functions,
            classes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Base classes as written in the class statement
    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// Dotted name of the module that defines the class
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Methods, including ones inherited from bases of the same module
    pub fn functions(&self) -> &[FunctionRecord] {
        &self.functions
    }

    /// Nested classes
    pub fn classes(&self) -> &[ClassRecord] {
        &self.classes
    }
}

/// A function or a class, as produced by the member extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SymbolRecord {
    Function(FunctionRecord),
    Class(ClassRecord),
}

impl SymbolRecord {
    pub fn name(&self) -> &str {
        match self {
            SymbolRecord::Function(f) => f.name(),
            SymbolRecord::Class(c) => c.name(),
        }
    }

    pub fn doc(&self) -> Option<&str> {
        match self {
            SymbolRecord::Function(f) => f.doc(),
            SymbolRecord::Class(c) => c.doc(),
        }
    }

    pub fn module(&self) -> &str {
        match self {
            SymbolRecord::Function(f) => f.module(),
            SymbolRecord::Class(c) => c.module(),
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRecord> {
        match self {
            SymbolRecord::Function(f) => Some(f),
            SymbolRecord::Class(_) => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassRecord> {
        match self {
            SymbolRecord::Class(c) => Some(c),
            SymbolRecord::Function(_) => None,
        }
    }

    pub fn into_function(self) -> Option<FunctionRecord> {
        match self {
            SymbolRecord::Function(f) => Some(f),
            SymbolRecord::Class(_) => None,
        }
    }

    pub fn into_class(self) -> Option<ClassRecord> {
        match self {
            SymbolRecord::Class(c) => Some(c),
            SymbolRecord::Function(_) => None,
        }
    }
}
