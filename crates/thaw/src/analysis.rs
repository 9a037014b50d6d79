//! Scope analysis over a reconstructed document.
//!
//! The scope of a continuation is the continuation itself, its parameters and
//! every def that transitively uses one of them. A nested continuation that
//! lands in the scope brings its own parameters along, so whatever uses them
//! is in scope too.

use crate::error::{ReconstructError, Result};
use crate::ir::{Def, DefId, DefTable, World};
use std::collections::{HashMap, HashSet};

/// Map from each def to the defs that use it.
fn build_users(world: &World) -> HashMap<DefId, Vec<DefId>> {
    let mut users: HashMap<DefId, Vec<DefId>> = HashMap::new();
    for (id, def) in world.defs() {
        for op in def.operands() {
            users.entry(op).or_default().push(id);
        }
    }
    users
}

/// Set of defs belonging to one continuation's scope.
#[derive(Debug, Clone)]
pub struct Scope {
    entry: DefId,
    members: HashSet<DefId>,
}

impl Scope {
    /// Compute the scope of `entry`. Returns `None` if `entry` is not a
    /// continuation.
    pub fn new(world: &World, entry: DefId) -> Option<Scope> {
        let users = build_users(world);

        let mut members = HashSet::new();
        members.insert(entry);
        let mut worklist = world.continuation(entry)?.params.clone();

        while let Some(id) = worklist.pop() {
            if !members.insert(id) {
                continue;
            }
            if let Def::Continuation(cont) = world.def(id) {
                worklist.extend(cont.params.iter().copied());
            }
            if let Some(uses) = users.get(&id) {
                worklist.extend(uses.iter().copied());
            }
        }

        Some(Scope { entry, members })
    }

    pub fn entry(&self) -> DefId {
        self.entry
    }

    pub fn contains(&self, def: DefId) -> bool {
        self.members.contains(&def)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Aliases of `defs`, in alias order, whose node is in the scope of the
/// continuation registered as `entry`.
pub fn scope_aliases(world: &World, defs: &DefTable, entry: &str) -> Result<Vec<String>> {
    let id = defs.lookup(entry)?;
    let scope = Scope::new(world, id).ok_or_else(|| ReconstructError::KindMismatch {
        alias: entry.to_string(),
        expected: "continuation",
    })?;

    Ok(defs
        .iter()
        .filter(|(_, def)| scope.contains(*def))
        .map(|(alias, _)| alias.to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{build_document, Session};
    use crate::parser::parse_document;

    const DOC: &str = r#"{
        "type_table": [
            {"type": "mem", "name": "mem"},
            {"type": "prim", "tag": "qs32", "length": 1, "name": "i32"},
            {"type": "function", "args": ["mem"], "name": "fn_ret"},
            {"type": "function", "args": ["mem", "i32", "fn_ret"], "name": "fn_f"},
            {"type": "function", "args": ["mem"], "name": "fn_inner"}
        ],
        "defs": [
            {"type": "const", "const_type": "i32", "value": 1, "name": "one"},
            {"type": "continuation", "name": "inner", "fn_type": "fn_inner"},
            {"type": "continuation", "name": "f", "fn_type": "fn_f",
             "arg_names": ["m", "x", "ret"], "app": {"target": "inner", "args": ["m"]}},
            {"type": "arithop", "op": "add", "args": ["x", "one"], "name": "sum"},
            {"type": "continuation", "name": "inner",
             "arg_names": ["m2"], "app": {"target": "ret", "args": ["m2"]}},
            {"type": "continuation", "name": "unrelated", "fn_type": "fn_ret",
             "arg_names": ["m3"], "app": {"target": "unrelated", "args": ["m3"]}}
        ]
    }"#;

    fn scope_of(entry: &str) -> Result<Vec<String>> {
        let doc = parse_document("scope.json", DOC).unwrap();
        let mut session = Session::new();
        let tables = build_document(&mut session, &doc).unwrap();
        scope_aliases(session.world(), &tables.defs, entry)
    }

    #[test]
    fn test_scope_follows_params_into_nested_continuations() {
        let aliases = scope_of("f").unwrap();
        assert_eq!(aliases, vec!["f", "inner", "m", "m2", "ret", "sum", "x"]);
    }

    #[test]
    fn test_scope_excludes_free_defs() {
        let aliases = scope_of("f").unwrap();
        assert!(!aliases.contains(&"one".to_string()));
        assert!(!aliases.contains(&"unrelated".to_string()));
    }

    #[test]
    fn test_scope_of_non_continuation() {
        assert_eq!(
            scope_of("one"),
            Err(ReconstructError::KindMismatch {
                alias: "one".to_string(),
                expected: "continuation"
            })
        );
    }

    #[test]
    fn test_scope_of_unknown_alias() {
        assert!(matches!(
            scope_of("nope"),
            Err(ReconstructError::UnresolvedAlias { .. })
        ));
    }
}
