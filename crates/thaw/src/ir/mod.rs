//! Intermediate Representation (IR) reconstructed from serialized documents.
//!
//! This module defines the node graph the loader thaws documents into: typed
//! handles into a run-owned arena, type and def nodes, literal values, and the
//! builder that fills the arena one document at a time.

mod types;
pub use types::*;

pub mod literal;
pub use literal::{Half, Literal};

mod world;
pub use world::World;

pub mod builder;
pub use builder::{
    build_document, DefTable, Diagnostic, DocumentTables, ExternalRegistry, InternPolicy,
    IrBuilder, Session, TargetDesc, TargetField, TypeTable,
};
