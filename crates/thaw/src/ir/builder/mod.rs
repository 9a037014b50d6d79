//! # IR Builder
//!
//! Reconstructs a `ParsedDocument` (typed descriptors) into nodes of the
//! session's `World` arena.
//!
//! ## Pipeline overview
//!
//! ```text
//! ParsedDocument
//!      │
//!      ├─[type_table]────────────────────────────────────────────┐
//!      │  for each type descriptor:                              │
//!      │    TypeTable::define()                                  │
//!      │      ├── structural kinds ─► World::intern_type()       │
//!      │      └── struct / variant ─► declare, then patch fields │
//!      │                                                         │
//!      └─[def_table]─────────────────────────────────────────┐   │
//!         for each def descriptor:                           │   │
//!           IrBuilder::define()                              │   │
//!             ├── value kinds  ─► resolve, check arity, push │   │
//!             ├── continuation ─► identity, then complete    │   │
//!             └── global       ─► merge through registry     │   │
//!                                                            │   │
//! ◄──────────────────────────────────────────────────────────┘───┘
//!   DocumentTables { types, defs }
//!
//! after every document:
//!   Session::apply_intern_policy()
//! ```
//!
//! ## Architecture
//!
//! | Module        | Responsibility                                              |
//! |---------------|-------------------------------------------------------------|
//! | [`type_table`]| Type alias table, two-phase nominal types                   |
//! | [`def_table`] | Def alias table and `IrBuilder` dispatch                    |
//! | [`resolve`]   | Alias list resolution with fixed-arity checks               |
//! | [`registry`]  | Run-wide linkage-name registry and intern policy            |
//! | [`session`]   | Run context: arena, registry, target, diagnostics           |
//!
//! Alias tables are per document and dropped once a document is done; the
//! session outlives them and carries everything shared between documents.

pub mod def_table;
pub mod registry;
mod resolve;
pub mod session;
pub mod type_table;

pub use def_table::{DefTable, IrBuilder};
pub use registry::{ExternalRegistry, InternPolicy};
pub use session::{Diagnostic, Session, TargetDesc, TargetField};
pub use type_table::TypeTable;

use crate::error::Result;
use crate::parser::ParsedDocument;

/// Alias tables of one reconstructed document.
#[derive(Debug, Clone, Default)]
pub struct DocumentTables {
    pub types: TypeTable,
    pub defs: DefTable,
}

/// Reconstruct every descriptor of `doc` into `session`.
///
/// All type descriptors are built before the first def descriptor, since
/// defs reference types but not the other way round.
pub fn build_document(session: &mut Session, doc: &ParsedDocument) -> Result<DocumentTables> {
    let mut types = TypeTable::new();
    for desc in &doc.type_table {
        types.define(session.world_mut(), desc)?;
    }

    let mut builder = IrBuilder::new(session, &types);
    for desc in &doc.defs {
        builder.define(desc)?;
    }
    let defs = builder.finish();

    Ok(DocumentTables { types, defs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::*;
    use crate::parser::parse_document;

    #[test]
    fn test_types_are_built_before_defs() {
        // `defs` comes first in the text.
        let doc = parse_document(
            "doc.json",
            r#"{
                "defs": [{"type": "sizeof", "target_type": "m", "name": "sz"}],
                "type_table": [{"type": "mem", "name": "m"}]
            }"#,
        )
        .unwrap();
        let mut session = Session::new();
        let tables = build_document(&mut session, &doc).unwrap();
        let sz = tables.defs.lookup("sz").unwrap();
        let m = tables.types.lookup("m").unwrap();
        assert_eq!(*session.world().def(sz), Def::SizeOf { target: m });
    }

    #[test]
    fn test_first_error_stops_the_document() {
        let doc = parse_document(
            "doc.json",
            r#"{
                "type_table": [{"type": "prim", "tag": "qs32", "length": 1, "name": "i32"}],
                "defs": [
                    {"type": "const", "const_type": "i32", "value": 1, "name": "a"},
                    {"type": "known", "def": "nowhere", "name": "k"},
                    {"type": "const", "const_type": "i32", "value": 2, "name": "b"}
                ]
            }"#,
        )
        .unwrap();
        let mut session = Session::new();
        let err = build_document(&mut session, &doc).unwrap_err();
        assert_eq!(err.to_string(), "unresolved def alias `nowhere`");
        // Only `a` made it into the arena.
        assert_eq!(session.world().num_defs(), 1);
    }
}
