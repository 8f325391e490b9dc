// Documentation tree
//
// Walks a directory depth-first and keys every module by its canonical
// URL. Direct modules of a folder come before its sub-folders, both in
// name order, so the traversal order is stable across platforms.

use crate::error::{Error, Result};
use crate::loader::ModuleResolver;
use crate::output::page::{title_case, ModulePage};
use crate::output::paths::canonical_path;
use crate::tree::{DirectoryRecord, ModuleRecord};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Mapping from canonical URL to module
pub type DocsTree = BTreeMap<String, ModuleRecord>;

/// What to do when two modules map to the same URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// The module found later in traversal order wins
    #[default]
    Last,
    /// The module found first wins
    First,
    /// Fail with [`Error::DuplicateUrl`]
    Error,
}

/// Build the documentation tree rooted at `dir`
pub fn build_tree(
    dir: &DirectoryRecord,
    base_url: &str,
    package_root: Option<&str>,
    policy: CollisionPolicy,
) -> Result<DocsTree> {
    let mut tree = DocsTree::new();
    collect(dir, base_url, package_root, policy, &mut tree)?;
    Ok(tree)
}

fn collect(
    dir: &DirectoryRecord,
    base_url: &str,
    package_root: Option<&str>,
    policy: CollisionPolicy,
    tree: &mut DocsTree,
) -> Result<()> {
    debug!(path = %dir.path().display(), "collecting modules");

    for module in dir.modules()? {
        let url = canonical_path(&module, base_url, package_root)?;
        insert(tree, url, module, policy)?;
    }

    for sub in dir.directories()? {
        collect(&sub, base_url, package_root, policy, tree)?;
    }

    Ok(())
}

fn insert(
    tree: &mut DocsTree,
    url: String,
    module: ModuleRecord,
    policy: CollisionPolicy,
) -> Result<()> {
    match tree.entry(url) {
        Entry::Vacant(slot) => {
            slot.insert(module);
        }
        Entry::Occupied(mut slot) => {
            let first = slot.get().path().to_path_buf();
            let second = module.path().to_path_buf();
            match policy {
                CollisionPolicy::Last => {
                    warn!(url = %slot.key(), kept = %second.display(), dropped = %first.display(), "duplicate documentation url");
                    slot.insert(module);
                }
                CollisionPolicy::First => {
                    warn!(url = %slot.key(), kept = %first.display(), dropped = %second.display(), "duplicate documentation url");
                }
                CollisionPolicy::Error => {
                    return Err(Error::DuplicateUrl {
                        url: slot.key().clone(),
                        first,
                        second,
                    });
                }
            }
        }
    }
    Ok(())
}

/// A documentation site over one source directory
#[derive(Debug, Clone)]
pub struct Documentation {
    root: DirectoryRecord,
    base_url: String,
    policy: CollisionPolicy,
}

impl Documentation {
    /// Documentation for `root`, served under `base_url`. URLs are anchored
    /// at the root record's package root.
    pub fn new(root: DirectoryRecord, base_url: impl Into<String>) -> Self {
        Self {
            root,
            base_url: base_url.into(),
            policy: CollisionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn root(&self) -> &DirectoryRecord {
        &self.root
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn package_root(&self) -> Option<&str> {
        self.root.package_root()
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// Build a fresh tree. Nothing is cached between calls, so changes on
    /// disk show up in the next call.
    pub fn docs_tree(&self) -> Result<DocsTree> {
        build_tree(&self.root, &self.base_url, self.package_root(), self.policy)
    }

    /// Module served at `url`
    pub fn module(&self, url: &str) -> Result<ModuleRecord> {
        self.docs_tree()?
            .remove(url)
            .ok_or_else(|| Error::not_found(format!("no module documented at '{url}'")))
    }

    /// Page content for the module served at `url`
    pub fn page(&self, url: &str, resolver: &mut dyn ModuleResolver) -> Result<ModulePage> {
        let module = self.module(url)?;
        let page = ModulePage {
            url: url.to_string(),
            title: title_case(&module.name()),
            module_id: module.module_id()?,
            doc: module.doc(resolver)?,
            functions: module.functions(resolver)?,
            classes: module.classes(resolver)?,
        };
        debug!(url, module = %page.module_id, "built page");
        Ok(page)
    }
}
