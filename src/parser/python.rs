// Python parser using tree-sitter
//
// Evaluates the binding statements of a module body into a namespace,
// which is what the loader hands out as a loaded module.

use crate::error::{Error, Result};
use crate::parser::ast::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tree_sitter::{Node, Parser};

/// Parser for Python source files
pub struct PythonParser {
    parser: Parser,
}

/// Per-module state shared by every body evaluated while parsing it
struct Scope<'a> {
    source: &'a [u8],
    /// Package relative imports are anchored at (`__package__`)
    package: &'a str,
}

impl PythonParser {
    /// Create a new Python parser
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::language();
        parser
            .set_language(&language)
            .map_err(|e| Error::Parser(format!("Failed to set Python language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Parse a Python file as the module `module_name`
    pub fn parse_file(&mut self, path: &Path, module_name: &str) -> Result<ParsedModule> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
        })?;

        self.parse_source(&source, path.to_path_buf(), module_name.to_string())
    }

    /// Parse Python source code
    pub fn parse_source(
        &mut self,
        source: &str,
        path: PathBuf,
        module_name: String,
    ) -> Result<ParsedModule> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| Error::parser("Failed to parse source"))?;

        let root = tree.root_node();
        if let Some(bad) = first_error(root) {
            let pos = bad.start_position();
            return Err(Error::parse(
                path,
                format!("invalid syntax at line {}, column {}", pos.row + 1, pos.column + 1),
            ));
        }

        let package = anchor_package(&path, &module_name);
        let mut module = ParsedModule::new(path, module_name);
        let scope = Scope {
            source: source.as_bytes(),
            package: &package,
        };

        let docstring = body_docstring(&root, scope.source);
        let mut namespace = Namespace::new();
        let mut star_imports = Vec::new();
        exec_body(&root, &scope, &mut namespace, None, &mut star_imports);

        module.docstring = docstring;
        module.namespace = namespace;
        module.star_imports = star_imports;
        Ok(module)
    }
}

/// `__package__` of the module: the module itself when it was loaded from
/// a package's `__init__.py` under the package name, its parent otherwise
fn anchor_package(path: &Path, module_name: &str) -> String {
    let (parent, last) = match module_name.rsplit_once('.') {
        Some((parent, last)) => (parent, last),
        None => ("", module_name),
    };
    let from_init = path.file_stem().is_some_and(|stem| stem == "__init__");
    if from_init && last != "__init__" {
        module_name.to_string()
    } else {
        parent.to_string()
    }
}

/// Find the first error or missing node, if the tree has one
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(bad) = first_error(child) {
            return Some(bad);
        }
    }
    Some(node)
}

/// Run every statement of a block (or the module) against `namespace`.
///
/// `globals` is the module namespace as bound so far when `namespace` is a
/// class body, and `None` at module level.
fn exec_body(
    node: &Node,
    scope: &Scope,
    namespace: &mut Namespace,
    globals: Option<&Namespace>,
    stars: &mut Vec<String>,
) {
    let mut cursor = node.walk();
    for stmt in node.named_children(&mut cursor) {
        match stmt.kind() {
            "function_definition" | "class_definition" | "decorated_definition" => {
                if let Some((name, binding)) = parse_definition(&stmt, scope, namespace, globals) {
                    namespace.insert(name, binding);
                }
            }
            "import_statement" => bind_import(&stmt, scope, namespace),
            "import_from_statement" => bind_import_from(&stmt, scope, namespace, stars),
            "expression_statement" => bind_assignment(&stmt, scope, namespace),
            "if_statement" | "try_statement" | "with_statement" | "for_statement"
            | "while_statement" => exec_compound(&stmt, scope, namespace, globals, stars),
            _ => {}
        }
    }
}

/// Compound statements bind names from every branch, in source order
fn exec_compound(
    node: &Node,
    scope: &Scope,
    namespace: &mut Namespace,
    globals: Option<&Namespace>,
    stars: &mut Vec<String>,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "block" => exec_body(&child, scope, namespace, globals, stars),
            kind if kind.ends_with("_clause") => {
                exec_compound(&child, scope, namespace, globals, stars)
            }
            _ => {}
        }
    }
}

/// Docstring of a module or block: the first statement, if it is a string
fn body_docstring(node: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let first = node
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    string_value(&expr, source).map(|raw| clean_doc(&raw))
}

/// Value of a plain string literal; f-strings and bytes yield None
fn string_value(node: &Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => decode_string_literal(node.utf8_text(source).ok()?),
        "concatenated_string" => {
            let mut value = String::new();
            let mut cursor = node.walk();
            for part in node.named_children(&mut cursor) {
                value.push_str(&string_value(&part, source)?);
            }
            Some(value)
        }
        _ => None,
    }
}

fn decode_string_literal(text: &str) -> Option<String> {
    let quote_at = text.find(|c: char| c == '"' || c == '\'')?;
    let prefix = text[..quote_at].to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }

    let body = &text[quote_at..];
    let inner = if body.starts_with("\"\"\"") || body.starts_with("'''") {
        body.get(3..body.len().saturating_sub(3))?
    } else {
        body.get(1..body.len().saturating_sub(1))?
    };

    if prefix.contains('r') {
        Some(inner.to_string())
    } else {
        Some(unescape(inner))
    }
}

/// Resolve the common backslash escapes of a non-raw string
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Parse a (possibly decorated) class or function definition
fn parse_definition(
    node: &Node,
    scope: &Scope,
    locals: &Namespace,
    globals: Option<&Namespace>,
) -> Option<(String, Binding)> {
    let (decorators, def) = if node.kind() == "decorated_definition" {
        (extract_decorators(node, scope.source), node.child_by_field_name("definition")?)
    } else {
        (Vec::new(), *node)
    };

    match def.kind() {
        "function_definition" => {
            let func = parse_function(&def, scope.source, decorators)?;
            Some((func.name.clone(), Binding::Function(func)))
        }
        "class_definition" => {
            let class = parse_class(&def, scope, decorators, locals, globals)?;
            Some((class.name.clone(), Binding::Class(Arc::new(class))))
        }
        _ => None,
    }
}

/// Extract decorators from a decorated definition
fn extract_decorators(node: &Node, source: &[u8]) -> Vec<String> {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            if let Ok(text) = child.utf8_text(source) {
                // Remove @ prefix and any arguments
                let dec = text.trim_start_matches('@');
                let dec = match dec.find('(') {
                    Some(idx) => &dec[..idx],
                    None => dec,
                };
                decorators.push(dec.trim().to_string());
            }
        }
    }

    decorators
}

fn parse_function(node: &Node, source: &[u8], decorators: Vec<String>) -> Option<FunctionDef> {
    let name = node.child_by_field_name("name")?.utf8_text(source).ok()?;
    let mut func = FunctionDef::new(name, node.start_position().row + 1);

    if let Some(params) = node.child_by_field_name("parameters") {
        func.parameters = params.utf8_text(source).ok()?.to_string();
    }
    if let Some(ret) = node.child_by_field_name("return_type") {
        func.return_type = Some(ret.utf8_text(source).ok()?.to_string());
    }
    if let Some(body) = node.child_by_field_name("body") {
        func.docstring = body_docstring(&body, source);
    }
    func.decorators = decorators;
    func.is_async = has_async_keyword(node);

    Some(func)
}

/// Check if a function_definition node has an async keyword
fn has_async_keyword(node: &Node) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == "async");
    found
}

/// Parse a class statement. Base names are looked up in the enclosing body
/// as bound so far, then in the module, so the class itself and any class
/// still being defined around it are never visible to its bases.
fn parse_class(
    node: &Node,
    scope: &Scope,
    decorators: Vec<String>,
    locals: &Namespace,
    globals: Option<&Namespace>,
) -> Option<ClassDef> {
    let name = node.child_by_field_name("name")?.utf8_text(scope.source).ok()?;
    let mut class = ClassDef::new(name, node.start_position().row + 1);
    class.decorators = decorators;

    if let Some(args) = node.child_by_field_name("superclasses") {
        class.bases = extract_bases(&args, scope.source);
        for base in &class.bases {
            let head = base_head(base);
            let bound = locals.get(head).or_else(|| globals.and_then(|g| g.get(head)));
            if let Some(binding) = bound {
                class.base_scope.insert(head.to_string(), binding.clone());
            }
        }
    }
    if let Some(body) = node.child_by_field_name("body") {
        class.docstring = body_docstring(&body, scope.source);
        // Star imports are only legal at module level
        let mut ignored = Vec::new();
        let module_scope = globals.unwrap_or(locals);
        exec_body(&body, scope, &mut class.namespace, Some(module_scope), &mut ignored);
    }

    Some(class)
}

/// First name of a base expression: `models` in `models.Base[T]`
pub(crate) fn base_head(base: &str) -> &str {
    base.split(|c: char| matches!(c, '.' | '[' | '('))
        .next()
        .unwrap_or(base)
        .trim()
}

/// Extract base classes from argument list, skipping `metaclass=` and friends
fn extract_bases(node: &Node, source: &[u8]) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = node.walk();

    for child in node.named_children(&mut cursor) {
        if matches!(child.kind(), "identifier" | "attribute" | "subscript" | "call") {
            if let Ok(text) = child.utf8_text(source) {
                bases.push(text.to_string());
            }
        }
    }

    bases
}

/// `import a.b` binds `a`; `import a.b as c` binds `c` to `a.b`
fn bind_import(node: &Node, scope: &Scope, namespace: &mut Namespace) {
    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        match child.kind() {
            "dotted_name" => {
                let Ok(text) = child.utf8_text(scope.source) else { continue };
                let top = text.split('.').next().unwrap_or(text).trim();
                namespace.insert(
                    top.to_string(),
                    Binding::Module {
                        module: top.to_string(),
                    },
                );
            }
            "aliased_import" => {
                let module = child
                    .child_by_field_name("name")
                    .and_then(|n| n.utf8_text(scope.source).ok());
                let alias = child
                    .child_by_field_name("alias")
                    .and_then(|n| n.utf8_text(scope.source).ok());
                if let (Some(module), Some(alias)) = (module, alias) {
                    namespace.insert(
                        alias.to_string(),
                        Binding::Module {
                            module: module.to_string(),
                        },
                    );
                }
            }
            _ => {}
        }
    }
}

/// `from m import x [as y]`, with relative module names made absolute
fn bind_import_from(node: &Node, scope: &Scope, namespace: &mut Namespace, stars: &mut Vec<String>) {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return;
    };
    let module = match module_node.kind() {
        "relative_import" => resolve_relative(&module_node, scope),
        _ => module_node.utf8_text(scope.source).ok().map(str::to_string),
    };

    let mut cursor = node.walk();
    let is_wildcard = node.children(&mut cursor).any(|c| c.kind() == "wildcard_import");
    if is_wildcard {
        if let Some(module) = module {
            stars.push(module);
        }
        return;
    }

    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        let (name, bound_as) = match child.kind() {
            "aliased_import" => {
                let name = child
                    .child_by_field_name("name")
                    .and_then(|n| n.utf8_text(scope.source).ok());
                let alias = child
                    .child_by_field_name("alias")
                    .and_then(|n| n.utf8_text(scope.source).ok());
                match (name, alias) {
                    (Some(name), Some(alias)) => (name, alias),
                    _ => continue,
                }
            }
            _ => match child.utf8_text(scope.source) {
                Ok(name) => (name, name),
                Err(_) => continue,
            },
        };

        let binding = match &module {
            Some(module) => Binding::Imported {
                module: module.clone(),
                name: name.to_string(),
            },
            // Relative import beyond the top-level package
            None => Binding::Value,
        };
        namespace.insert(bound_as.to_string(), binding);
    }
}

/// `..pkg` inside the module `a.b.c` resolves to `a.pkg`; inside the
/// package `a.b.c` it resolves to `a.b.pkg`
fn resolve_relative(node: &Node, scope: &Scope) -> Option<String> {
    let mut level = 0;
    let mut tail = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_prefix" => {
                level = child
                    .utf8_text(scope.source)
                    .ok()?
                    .chars()
                    .filter(|c| *c == '.')
                    .count();
            }
            "dotted_name" => tail = Some(child.utf8_text(scope.source).ok()?),
            _ => {}
        }
    }

    let parts: Vec<&str> = match scope.package {
        "" => Vec::new(),
        package => package.split('.').collect(),
    };
    if level == 0 || level > parts.len() {
        return None;
    }
    let base = &parts[..parts.len() + 1 - level];

    let mut resolved = base.join(".");
    if let Some(tail) = tail {
        resolved.push('.');
        resolved.push_str(tail);
    }
    Some(resolved)
}

/// Plain assignments rebind names; `x = y` aliases whatever `y` is bound to
fn bind_assignment(node: &Node, scope: &Scope, namespace: &mut Namespace) {
    let Some(mut assignment) = node.named_child(0) else {
        return;
    };
    if assignment.kind() != "assignment" {
        return;
    }

    let mut targets = Vec::new();
    let value = loop {
        if let Some(left) = assignment.child_by_field_name("left") {
            targets.push(left);
        }
        match assignment.child_by_field_name("right") {
            Some(right) if right.kind() == "assignment" => assignment = right,
            Some(right) => break Some(right),
            // Bare annotation, nothing is bound
            None => break None,
        }
    };
    let Some(value) = value else {
        return;
    };

    let binding = if value.kind() == "identifier" {
        value
            .utf8_text(scope.source)
            .ok()
            .and_then(|name| namespace.get(name).cloned())
            .unwrap_or(Binding::Value)
    } else {
        Binding::Value
    };

    for target in targets {
        let mut names = Vec::new();
        collect_target_names(&target, scope.source, &mut names);
        let single = names.len() == 1 && target.kind() == "identifier";
        for name in names {
            let bound = if single { binding.clone() } else { Binding::Value };
            namespace.insert(name, bound);
        }
    }
}

fn collect_target_names(node: &Node, source: &[u8], names: &mut Vec<String>) {
    match node.kind() {
        "identifier" => {
            if let Ok(text) = node.utf8_text(source) {
                names.push(text.to_string());
            }
        }
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_target_names(&child, source, names);
            }
        }
        _ => {}
    }
}
