// Namespace types for parsed Python modules
//
// A parsed module is reduced to what executing its body would bind:
// an ordered symbol table of names to bindings. Class bodies get their
// own symbol table, so nested classes and methods fall out naturally.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Symbol table of a module or class body, ordered by bound name
pub type Namespace = BTreeMap<String, Binding>;

/// A parsed Python source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedModule {
    /// Source file the module was parsed from
    pub path: PathBuf,
    /// Dotted name the module was loaded under
    pub module_name: String,
    /// Module-level docstring, cleaned
    pub docstring: Option<String>,
    /// Names bound by the module body
    pub namespace: Namespace,
    /// Modules pulled in with `from x import *`
    pub star_imports: Vec<String>,
}

impl ParsedModule {
    pub fn new(path: PathBuf, module_name: String) -> Self {
        Self {
            path,
            module_name,
            docstring: None,
            namespace: Namespace::new(),
            star_imports: Vec::new(),
        }
    }

    /// Check if the module binds anything at all
    pub fn is_empty(&self) -> bool {
        self.namespace.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.namespace.get(name)
    }
}

/// What a name is bound to after the body has run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Binding {
    /// `def name(...)` or `async def name(...)`
    Function(FunctionDef),
    /// `class Name(...)`
    Class(Arc<ClassDef>),
    /// `from module import name`; `module` is absolute
    Imported { module: String, name: String },
    /// `import module` or `import module as alias`
    Module { module: String },
    /// Any other assignment
    Value,
}

impl Binding {
    pub fn as_class(&self) -> Option<&ClassDef> {
        match self {
            Binding::Class(class) => Some(class.as_ref()),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionDef> {
        match self {
            Binding::Function(func) => Some(func),
            _ => None,
        }
    }
}

/// A class definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassDef {
    /// Class name (`__name__`)
    pub name: String,
    /// Class docstring, cleaned
    pub docstring: Option<String>,
    /// Base classes as written
    pub bases: Vec<String>,
    /// What the first name of each base was bound to when the class
    /// statement ran. Unbound names are absent.
    pub base_scope: Namespace,
    /// Decorators applied to the class
    pub decorators: Vec<String>,
    /// Names bound by the class body
    pub namespace: Namespace,
    /// Starting line number
    pub line: usize,
}

impl ClassDef {
    pub fn new(name: &str, line: usize) -> Self {
        Self {
            name: name.to_string(),
            docstring: None,
            bases: Vec::new(),
            base_scope: Namespace::new(),
            decorators: Vec::new(),
            namespace: Namespace::new(),
            line,
        }
    }
}

/// A function or method definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDef {
    /// Function name (`__name__`)
    pub name: String,
    /// Function docstring, cleaned
    pub docstring: Option<String>,
    /// Parameter list as written, including parentheses
    pub parameters: String,
    /// Return annotation as written
    pub return_type: Option<String>,
    /// Decorators applied, without `@` or call arguments
    pub decorators: Vec<String>,
    /// Whether this is an async function
    pub is_async: bool,
    /// Starting line number
    pub line: usize,
}

impl FunctionDef {
    pub fn new(name: &str, line: usize) -> Self {
        Self {
            name: name.to_string(),
            docstring: None,
            parameters: "()".to_string(),
            return_type: None,
            decorators: Vec::new(),
            is_async: false,
            line,
        }
    }

    /// Property-like descriptors are attributes, not functions
    pub fn is_property(&self) -> bool {
        self.decorators.iter().any(|d| {
            let last = d.rsplit('.').next().unwrap_or(d);
            d == "property"
                || last == "cached_property"
                || d.ends_with(".setter")
                || d.ends_with(".getter")
                || d.ends_with(".deleter")
        })
    }

    /// Get the function signature as a string
    pub fn signature(&self) -> String {
        let ret = self
            .return_type
            .as_ref()
            .map(|r| format!(" -> {}", r))
            .unwrap_or_default();
        let prefix = if self.is_async { "async " } else { "" };
        format!("{}def {}{}{}", prefix, self.name, self.parameters, ret)
    }
}

/// Clean up a docstring the way `inspect.cleandoc` does.
///
/// The first line loses its leading whitespace, the remaining lines lose
/// their common indentation, and blank lines at either end are dropped.
pub fn clean_doc(raw: &str) -> String {
    let expanded: Vec<String> = raw.split('\n').map(expand_tabs).collect();
    let lines: Vec<&str> = expanded.iter().map(String::as_str).collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim_start().is_empty())
        .map(|l| l.chars().count() - l.trim_start().chars().count())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<&str> = Vec::with_capacity(lines.len());
    if let Some(first) = lines.first() {
        cleaned.push(first.trim_start());
    }
    for line in lines.iter().skip(1) {
        let rest = line
            .char_indices()
            .nth(margin)
            .map_or("", |(start, _)| &line[start..]);
        cleaned.push(rest.trim_end_matches('\r'));
    }

    while cleaned.last().is_some_and(|l| l.trim().is_empty()) {
        cleaned.pop();
    }
    let leading = cleaned.iter().take_while(|l| l.trim().is_empty()).count();

    cleaned[leading..].join("\n")
}

/// Expand tabs to 8-column tab stops
fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = 8 - column % 8;
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}
