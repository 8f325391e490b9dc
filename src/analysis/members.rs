// Member extraction
//
// Enumerates the classes and functions bound in a module or class and keeps
// only those declared by the holder itself. Imported names are followed to
// the object they refer to, so re-exports are recognised by where the
// object was really defined, not by where it is bound.

use crate::analysis::records::{ClassRecord, FunctionRecord, SymbolRecord};
use crate::loader::{LoadedModule, ModuleResolver, SEPARATOR};
use crate::parser::{Binding, ClassDef, FunctionDef};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Longest chain of `from x import y` re-exports that is followed
const MAX_IMPORT_HOPS: usize = 8;

/// Deepest class nesting or inheritance chain that is expanded
const MAX_CLASS_DEPTH: usize = 16;

/// Which members to extract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Function,
    Class,
    ClassAndFunction,
}

impl MemberKind {
    fn accepts_class(self) -> bool {
        matches!(self, MemberKind::Class | MemberKind::ClassAndFunction)
    }

    fn accepts_function(self) -> bool {
        matches!(self, MemberKind::Function | MemberKind::ClassAndFunction)
    }
}

/// Something whose members can be listed
#[derive(Debug, Clone, Copy)]
pub enum Holder<'a> {
    /// A loaded module
    Module(&'a Arc<LoadedModule>),
    /// A class, together with the module whose scope it was defined in
    Class {
        class: &'a ClassDef,
        home: &'a Arc<LoadedModule>,
    },
}

/// A binding together with the module whose scope it lives in
struct Member {
    binding: Binding,
    home: Arc<LoadedModule>,
}

/// The object a binding ends up referring to
enum Resolved {
    Function {
        def: FunctionDef,
        declared_in: String,
    },
    Class {
        def: Arc<ClassDef>,
        home: Arc<LoadedModule>,
    },
}

impl Resolved {
    fn declared_in(&self) -> &str {
        match self {
            Resolved::Function { declared_in, .. } => declared_in,
            Resolved::Class { home, .. } => home.name(),
        }
    }
}

/// Identity of a class definition
#[derive(Debug, Clone, PartialEq, Eq)]
struct ClassKey {
    module: String,
    name: String,
    line: usize,
}

impl ClassKey {
    fn of(def: &ClassDef, home: &LoadedModule) -> Self {
        Self {
            module: home.name().to_string(),
            name: def.name.clone(),
            line: def.line,
        }
    }
}

/// List the members of `holder` of the requested `kind`.
///
/// A member is kept only if the dotted name of its declaring module starts
/// with `holder_qualified_name`. Records come out sorted by the name they
/// are bound under. A holder that cannot be introspected (an extension or
/// namespace module) has no members.
pub fn members(
    holder: Holder<'_>,
    holder_qualified_name: &str,
    kind: MemberKind,
    resolver: &mut dyn ModuleResolver,
) -> Vec<SymbolRecord> {
    let mut lineage = Vec::new();
    extract(holder, holder_qualified_name, kind, resolver, &mut lineage)
}

/// `lineage` holds the classes being expanded: enclosing classes and the
/// inheritance chain under construction. None of them can be a base again.
fn extract(
    holder: Holder<'_>,
    holder_qualified_name: &str,
    kind: MemberKind,
    resolver: &mut dyn ModuleResolver,
    lineage: &mut Vec<ClassKey>,
) -> Vec<SymbolRecord> {
    let table = match holder {
        Holder::Module(module) => match module.namespace() {
            Some(namespace) => namespace
                .iter()
                .map(|(name, binding)| {
                    let member = Member {
                        binding: binding.clone(),
                        home: Arc::clone(module),
                    };
                    (name.clone(), member)
                })
                .collect(),
            None => {
                debug!(module = module.name(), "module cannot be introspected");
                return Vec::new();
            }
        },
        Holder::Class { class, home } => class_table(class, home, resolver, lineage),
    };

    let mut records = Vec::new();
    for (bound_name, member) in table {
        let Some(object) = resolve_member(member, resolver, 0) else {
            continue;
        };
        if !object.declared_in().starts_with(holder_qualified_name) {
            debug!(
                member = %bound_name,
                declared_in = object.declared_in(),
                holder = holder_qualified_name,
                "skipping member declared elsewhere"
            );
            continue;
        }

        match object {
            Resolved::Function { def, declared_in } => {
                if kind.accepts_function() && !def.is_property() {
                    records.push(SymbolRecord::Function(FunctionRecord::new(&def, &declared_in)));
                }
            }
            Resolved::Class { def, home } => {
                if kind.accepts_class() {
                    let record = class_record(&def, &home, resolver, lineage);
                    records.push(SymbolRecord::Class(record));
                }
            }
        }
    }

    records
}

/// Build a class record, extracting its methods and nested classes
fn class_record(
    def: &ClassDef,
    home: &Arc<LoadedModule>,
    resolver: &mut dyn ModuleResolver,
    lineage: &mut Vec<ClassKey>,
) -> ClassRecord {
    let key = ClassKey::of(def, home);
    if lineage.len() > MAX_CLASS_DEPTH || lineage.contains(&key) {
        return ClassRecord::new(def, home.name(), Vec::new(), Vec::new());
    }

    lineage.push(key);
    let holder = Holder::Class { class: def, home };
    let nested = extract(holder, home.name(), MemberKind::ClassAndFunction, resolver, lineage);
    lineage.pop();

    let mut functions = Vec::new();
    let mut classes = Vec::new();
    for record in nested {
        match record {
            SymbolRecord::Function(f) => functions.push(f),
            SymbolRecord::Class(c) => classes.push(c),
        }
    }

    ClassRecord::new(def, home.name(), functions, classes)
}

/// Effective namespace of a class: inherited members first, own members
/// shadowing them. Earlier bases shadow later ones.
fn class_table(
    class: &ClassDef,
    home: &Arc<LoadedModule>,
    resolver: &mut dyn ModuleResolver,
    lineage: &mut Vec<ClassKey>,
) -> BTreeMap<String, Member> {
    let mut table = BTreeMap::new();

    if lineage.len() < MAX_CLASS_DEPTH {
        let key = ClassKey::of(class, home);
        // Already on top when called for the class record being built
        let pushed = lineage.last() != Some(&key);
        if pushed {
            lineage.push(key);
        }
        for base in class.bases.iter().rev() {
            let Some((base_def, base_home)) = resolve_base(base, class, home, resolver) else {
                continue;
            };
            if lineage.contains(&ClassKey::of(&base_def, &base_home)) {
                debug!(class = %class.name, base = %base, "skipping base that is still being defined");
                continue;
            }
            table.extend(class_table(&base_def, &base_home, resolver, lineage));
        }
        if pushed {
            lineage.pop();
        }
    }

    for (name, binding) in &class.namespace {
        let member = Member {
            binding: binding.clone(),
            home: Arc::clone(home),
        };
        table.insert(name.clone(), member);
    }

    table
}

/// Follow imports until the binding lands on a function or class
fn resolve_member(
    member: Member,
    resolver: &mut dyn ModuleResolver,
    hops: usize,
) -> Option<Resolved> {
    match member.binding {
        Binding::Function(def) => Some(Resolved::Function {
            def,
            declared_in: member.home.name().to_string(),
        }),
        Binding::Class(def) => Some(Resolved::Class {
            def,
            home: member.home,
        }),
        Binding::Imported { module, name } => {
            if hops >= MAX_IMPORT_HOPS {
                debug!(module = %module, name = %name, "import chain too long");
                return None;
            }
            lookup(&module, &name, resolver)
                .and_then(|target| resolve_member(target, resolver, hops + 1))
        }
        Binding::Module { .. } | Binding::Value => None,
    }
}

/// `name` as bound in `module`, if the module loads and binds it
fn lookup(module: &str, name: &str, resolver: &mut dyn ModuleResolver) -> Option<Member> {
    let target = match resolver.resolve(module) {
        Ok(target) => target,
        Err(e) => {
            debug!(module = %module, error = %e, "cannot follow import");
            return None;
        }
    };
    let binding = target.namespace()?.get(name)?.clone();
    Some(Member {
        binding,
        home: target,
    })
}

/// Resolve a base class expression such as `Base`, `models.Base` or
/// `Generic[T]` against what its first name was bound to when `class` was
/// defined in `home`
fn resolve_base(
    base: &str,
    class: &ClassDef,
    home: &Arc<LoadedModule>,
    resolver: &mut dyn ModuleResolver,
) -> Option<(Arc<ClassDef>, Arc<LoadedModule>)> {
    let base = base.split('[').next().unwrap_or(base).trim();
    if base.contains('(') {
        return None;
    }

    let mut parts = base.split(SEPARATOR);
    let head = parts.next()?;
    let rest: Vec<&str> = parts.collect();
    let bound = class.base_scope.get(head)?.clone();

    let member = match (rest.split_last(), bound) {
        (None, binding) => Member {
            binding,
            home: Arc::clone(home),
        },
        (Some((attr, path)), Binding::Module { module }) => {
            let module = qualify(&module, path);
            lookup(&module, attr, resolver)?
        }
        (Some((attr, path)), Binding::Imported { module, name }) => {
            let module = qualify(&format!("{}{}{}", module, SEPARATOR, name), path);
            lookup(&module, attr, resolver)?
        }
        _ => return None,
    };

    match resolve_member(member, resolver, 0)? {
        Resolved::Class { def, home } => Some((def, home)),
        Resolved::Function { .. } => None,
    }
}

fn qualify(module: &str, path: &[&str]) -> String {
    let mut qualified = module.to_string();
    for segment in path {
        qualified.push(SEPARATOR);
        qualified.push_str(segment);
    }
    qualified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SourceResolver;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn project() -> (TempDir, SourceResolver) {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/__init__.py", "\"\"\"Package.\"\"\"\nfrom .models import Model\n");
        write(
            dir.path(),
            "pkg/models.py",
            r#""""Models."""
from pathlib import Path
from .base import Base, helper
from pkg.base import Mixin as RenamedMixin
import os


class Model(Base):
    """A model."""

    class Config:
        """Nested config."""

        def describe(self):
            """Describe config."""

    def save(self):
        """Save the model."""

    @property
    def size(self):
        return 1

    @staticmethod
    def build():
        pass


def load(path):
    """Load a model."""


Alias = Model
"#,
        );
        write(
            dir.path(),
            "pkg/base.py",
            r#"
class Base:
    """Base class."""

    def save(self):
        """Base save."""

    def validate(self):
        """Validate."""


class Mixin:
    pass


def helper():
    pass
"#,
        );
        write(
            dir.path(),
            "pkg/models_extra.py",
            "from pkg.models import load\n\ndef extra():\n    pass\n",
        );
        let resolver = SourceResolver::new([dir.path()]).unwrap();
        (dir, resolver)
    }

    fn names(records: &[SymbolRecord]) -> Vec<&str> {
        records.iter().map(SymbolRecord::name).collect()
    }

    #[test]
    fn test_module_functions_exclude_imports() {
        let (_dir, mut resolver) = project();
        let module = resolver.resolve("pkg.models").unwrap();
        let funcs = members(Holder::Module(&module), "pkg.models", MemberKind::Function, &mut resolver);
        assert_eq!(names(&funcs), vec!["load"]);
        assert_eq!(funcs[0].doc(), Some("Load a model."));
    }

    #[test]
    fn test_module_classes_include_aliases() {
        let (_dir, mut resolver) = project();
        let module = resolver.resolve("pkg.models").unwrap();
        let classes = members(Holder::Module(&module), "pkg.models", MemberKind::Class, &mut resolver);
        // Bound as `Alias` and `Model`, both are the same class
        assert_eq!(names(&classes), vec!["Model", "Model"]);
    }

    #[test]
    fn test_class_members_and_nesting() {
        let (_dir, mut resolver) = project();
        let module = resolver.resolve("pkg.models").unwrap();
        let classes = members(Holder::Module(&module), "pkg.models", MemberKind::Class, &mut resolver);
        let model = classes[1].as_class().unwrap();

        assert_eq!(model.doc(), Some("A model."));
        assert_eq!(model.module(), "pkg.models");
        let methods: Vec<&str> = model.functions().iter().map(FunctionRecord::name).collect();
        // `size` is a property; `validate` comes from a base in another module
        assert_eq!(methods, vec!["build", "save"]);
        assert_eq!(model.functions()[1].doc(), Some("Save the model."));

        assert_eq!(model.classes().len(), 1);
        let config = &model.classes()[0];
        assert_eq!(config.name(), "Config");
        assert_eq!(config.functions()[0].name(), "describe");
    }

    #[test]
    fn test_reexports_are_excluded() {
        let (_dir, mut resolver) = project();
        let package = resolver.resolve("pkg.__init__").unwrap();
        let all = members(
            Holder::Module(&package),
            "pkg.__init__",
            MemberKind::ClassAndFunction,
            &mut resolver,
        );
        assert!(all.is_empty());
    }

    #[test]
    fn test_ownership_is_a_prefix_test() {
        let (_dir, mut resolver) = project();
        let module = resolver.resolve("pkg.models_extra").unwrap();
        let funcs = members(Holder::Module(&module), "pkg.models", MemberKind::Function, &mut resolver);
        assert_eq!(names(&funcs), vec!["extra", "load"]);
        assert_eq!(funcs[1].module(), "pkg.models");
    }

    #[test]
    fn test_partition_property() {
        let (_dir, mut resolver) = project();
        for id in ["pkg.models", "pkg.base", "pkg.models_extra"] {
            let module = resolver.resolve(id).unwrap();
            let holder = Holder::Module(&module);
            let both = members(holder, id, MemberKind::ClassAndFunction, &mut resolver);
            let classes = members(holder, id, MemberKind::Class, &mut resolver);
            let funcs = members(holder, id, MemberKind::Function, &mut resolver);

            assert_eq!(both.len(), classes.len() + funcs.len());
            for record in &both {
                let in_classes = classes.contains(record);
                let in_funcs = funcs.contains(record);
                assert!(in_classes ^ in_funcs, "{} in {}", record.name(), id);
            }
        }
    }

    #[test]
    fn test_inherited_members_from_same_module() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "shapes.py",
            r#"
class Shape:
    def area(self):
        """Area."""

    def name(self):
        """Shape name."""


class Square(Shape):
    def name(self):
        """Square name."""
"#,
        );
        let mut resolver = SourceResolver::new([dir.path()]).unwrap();
        let module = resolver.resolve("shapes").unwrap();
        let classes = members(Holder::Module(&module), "shapes", MemberKind::Class, &mut resolver);
        let square = classes.iter().find(|c| c.name() == "Square").unwrap().as_class().unwrap();
        let docs: Vec<Option<&str>> = square.functions().iter().map(FunctionRecord::doc).collect();
        assert_eq!(docs, vec![Some("Area."), Some("Square name.")]);
    }

    #[test]
    fn test_opaque_holder_is_empty() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nspkg")).unwrap();
        let mut resolver = SourceResolver::new([dir.path()]).unwrap();
        let module = resolver.resolve("nspkg").unwrap();
        let all = members(Holder::Module(&module), "nspkg", MemberKind::ClassAndFunction, &mut resolver);
        assert!(all.is_empty());
    }

    #[test]
    fn test_import_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "from b import thing\n");
        write(dir.path(), "b.py", "from a import thing\n");
        let mut resolver = SourceResolver::new([dir.path()]).unwrap();
        let module = resolver.resolve("a").unwrap();
        let all = members(Holder::Module(&module), "", MemberKind::ClassAndFunction, &mut resolver);
        assert!(all.is_empty());
    }

    #[test]
    fn test_self_referencing_nested_class_terminates() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "loop.py",
            "class Outer:\n    class Inner(Outer):\n        pass\n",
        );
        let mut resolver = SourceResolver::new([dir.path()]).unwrap();
        let module = resolver.resolve("loop").unwrap();
        let classes = members(Holder::Module(&module), "loop", MemberKind::Class, &mut resolver);
        assert_eq!(names(&classes), vec!["Outer"]);
    }

    #[test]
    fn test_rebound_base_name_uses_earlier_class() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "tree.py",
            r#"
class Node:
    def visit(self):
        pass


class Node(Node):
    class Left(Node):
        pass

    class Right(Node):
        pass

    class Middle(Node):
        pass
"#,
        );
        let mut resolver = SourceResolver::new([dir.path()]).unwrap();
        let module = resolver.resolve("tree").unwrap();
        let classes = members(Holder::Module(&module), "tree", MemberKind::Class, &mut resolver);

        assert_eq!(names(&classes), vec!["Node"]);
        let node = classes[0].as_class().unwrap();
        let nested: Vec<&str> = node.classes().iter().map(ClassRecord::name).collect();
        assert_eq!(nested, vec!["Left", "Middle", "Right"]);
        for inner in node.classes() {
            assert!(inner.classes().is_empty(), "{} has nested classes", inner.name());
            let methods: Vec<&str> = inner.functions().iter().map(FunctionRecord::name).collect();
            assert_eq!(methods, vec!["visit"]);
        }
    }

    #[test]
    fn test_base_resolving_to_itself_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "selfref.py",
            "from selfref import Node\n\nclass Node(Node):\n    class Child(Node):\n        pass\n",
        );
        let mut resolver = SourceResolver::new([dir.path()]).unwrap();
        let module = resolver.resolve("selfref").unwrap();
        let classes = members(Holder::Module(&module), "selfref", MemberKind::Class, &mut resolver);

        assert_eq!(names(&classes), vec!["Node"]);
        let node = classes[0].as_class().unwrap();
        assert_eq!(node.classes().len(), 1);
        assert!(node.classes()[0].classes().is_empty());
    }

    #[test]
    fn test_reexport_through_package_init() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "top/__init__.py",
            "from .core import Base\nfrom .models_base import helper\n",
        );
        write(
            dir.path(),
            "top/core.py",
            "class Base:\n    def shared(self):\n        pass\n",
        );
        write(dir.path(), "top/models_base.py", "def helper():\n    pass\n");
        write(
            dir.path(),
            "top/models.py",
            "from top import Base, helper\n\nclass Model(Base):\n    def own(self):\n        pass\n",
        );
        let mut resolver = SourceResolver::new([dir.path()]).unwrap();
        let module = resolver.resolve("top.models").unwrap();
        let all = members(
            Holder::Module(&module),
            "top.models",
            MemberKind::ClassAndFunction,
            &mut resolver,
        );

        // `top.models_base` starts with `top.models`, `top.core` does not
        assert_eq!(names(&all), vec!["Model", "helper"]);
        let model = all[0].as_class().unwrap();
        let methods: Vec<&str> = model.functions().iter().map(FunctionRecord::name).collect();
        assert_eq!(methods, vec!["own", "shared"]);
    }

    #[test]
    fn test_module_qualified_base() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "pkg/base.py",
            "class Base:\n    def shared(self):\n        pass\n",
        );
        write(
            dir.path(),
            "pkg/child.py",
            "import pkg.base\n\nclass Child(pkg.base.Base):\n    def own(self):\n        pass\n",
        );
        let mut resolver = SourceResolver::new([dir.path()]).unwrap();
        let module = resolver.resolve("pkg.child").unwrap();
        let classes = members(Holder::Module(&module), "pkg", MemberKind::Class, &mut resolver);
        let child = classes[0].as_class().unwrap();
        let methods: Vec<&str> = child.functions().iter().map(FunctionRecord::name).collect();
        assert_eq!(methods, vec!["own", "shared"]);
    }
}
