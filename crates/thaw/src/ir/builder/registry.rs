//! Cross-document symbol registry and intern policy.
//!
//! The registry maps a linkage name to the single def that carries it for the
//! whole run: externally named globals and internal-linkage continuations.
//! A later document that names the same symbol resolves to the same node.

use super::super::types::*;
use super::super::world::World;
use std::collections::{BTreeMap, BTreeSet};

/// Linkage name → def, shared by every document of one run.
#[derive(Debug, Clone, Default)]
pub struct ExternalRegistry {
    symbols: BTreeMap<String, DefId>,
}

impl ExternalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<DefId> {
        self.symbols.get(name).copied()
    }

    /// Register `def` under `name`. A name is bound at most once per run.
    pub(crate) fn insert(&mut self, name: &str, def: DefId) {
        debug_assert!(
            !self.symbols.contains_key(name),
            "linkage name `{}` registered twice",
            name
        );
        self.symbols.insert(name.to_string(), def);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// All symbols, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, DefId)> {
        self.symbols.iter().map(|(name, def)| (name.as_str(), *def))
    }
}

/// What to do with internal-linkage continuations once every document is in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternPolicy {
    remove_interns: bool,
    keep: BTreeSet<String>,
}

impl InternPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip internal linkage from every intern not explicitly kept.
    pub fn remove_interns(mut self) -> Self {
        self.remove_interns = true;
        self
    }

    /// Keep the intern called `name`. Implies [`InternPolicy::remove_interns`]
    /// for all other names.
    pub fn keep(mut self, name: impl Into<String>) -> Self {
        self.remove_interns = true;
        self.keep.insert(name.into());
        self
    }

    pub fn removes_interns(&self) -> bool {
        self.remove_interns
    }

    pub fn kept(&self) -> &BTreeSet<String> {
        &self.keep
    }

    /// Apply the policy to every internal continuation in `registry`.
    ///
    /// Stripped continuations become ordinary private continuations; their
    /// registry entries stay so lookups by name keep resolving.
    /// Returns the names that were stripped.
    pub fn apply(&self, world: &mut World, registry: &ExternalRegistry) -> Vec<String> {
        if !self.remove_interns {
            return Vec::new();
        }

        let mut stripped = Vec::new();
        for (name, def) in registry.iter() {
            if self.keep.contains(name) {
                continue;
            }
            if let Some(cont) = world.continuation_mut(def) {
                if cont.linkage == Linkage::Internal {
                    cont.linkage = Linkage::Private;
                    stripped.push(name.to_string());
                }
            }
        }
        stripped
    }
}
