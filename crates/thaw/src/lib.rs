//! thaw — reconstructs a serialized IR graph into a live arena.
//!
//! This crate provides the loading pipeline that turns one or more serialized
//! translation units (JSON documents of type and def descriptors) into a
//! single node graph, merging externally linked symbols across documents.

pub mod analysis;
pub mod error;
pub mod ir;
pub mod parser;
pub mod printer;

// Re-export key types for convenience
pub use anyhow::{Context, Result};
pub use error::ReconstructError;
use ir::{build_document, DocumentTables, InternPolicy, Session, TargetDesc};
use parser::ParsedDocument;
use std::collections::BTreeSet;

/// Module name used when neither the caller nor any document supplies one.
pub const DEFAULT_MODULE_NAME: &str = "module";

/// Configuration options for reconstruction
#[derive(Debug, Clone, Default)]
pub struct ReconstructOptions {
    /// Module name; falls back to the first document's `module` field
    pub module_name: Option<String>,
    /// Strip internal linkage from continuations once every document is in
    pub remove_interns: bool,
    /// Interns that keep their linkage. Non-empty implies `remove_interns`.
    pub keep_interns: BTreeSet<String>,
    /// Target description to start from, before any document's fields
    pub target: TargetDesc,
    /// Continuation alias whose scope is computed in each document
    pub scope: Option<String>,
}

impl ReconstructOptions {
    /// The intern policy these options describe.
    pub fn intern_policy(&self) -> InternPolicy {
        let mut policy = InternPolicy::new();
        if self.remove_interns {
            policy = policy.remove_interns();
        }
        for name in &self.keep_interns {
            policy = policy.keep(name.clone());
        }
        policy
    }
}

/// Scope analysis result for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentScope {
    /// Label of the document the entry was found in
    pub document: String,
    /// Aliases in the scope, in alias order
    pub aliases: Vec<String>,
}

/// Output of a reconstruction run.
#[derive(Debug)]
pub struct Reconstruction {
    pub module_name: String,
    /// Arena, registry, merged target and diagnostics of the run
    pub session: Session,
    /// Alias tables, one per input document, in input order
    pub documents: Vec<DocumentTables>,
    pub scopes: Vec<DocumentScope>,
    /// Interns whose linkage was stripped by the intern policy
    pub stripped_interns: Vec<String>,
}

/// Reconstruct parsed documents into one graph.
///
/// This is the main entry point for the loading pipeline. Documents are
/// processed in order; the first error aborts the run.
///
/// # Arguments
/// * `documents` - Parsed documents, in the order their symbols should merge
/// * `options` - Reconstruction configuration options
///
/// # Example
/// ```no_run
/// use thaw::{parser::parse_document, reconstruct, ReconstructOptions};
///
/// let text = std::fs::read_to_string("unit.json").unwrap();
/// let doc = parse_document("unit.json", &text).unwrap();
/// let result = reconstruct(&[doc], &ReconstructOptions::default()).unwrap();
/// println!("{}", thaw::printer::print_world(result.session.world()));
/// ```
pub fn reconstruct(
    documents: &[ParsedDocument],
    options: &ReconstructOptions,
) -> Result<Reconstruction> {
    let module_name = options
        .module_name
        .clone()
        .or_else(|| documents.first().and_then(|doc| doc.module.clone()))
        .unwrap_or_else(|| DEFAULT_MODULE_NAME.to_string());

    let mut session = Session::with_target(options.target.clone());
    let mut tables = Vec::with_capacity(documents.len());
    let mut scopes = Vec::new();

    for doc in documents {
        tracing::debug!(
            document = %doc.label,
            types = doc.type_table.len(),
            defs = doc.defs.len(),
            "reconstructing document"
        );
        session.merge_target(
            &doc.label,
            doc.host_triple.as_deref(),
            doc.host_cpu.as_deref(),
            doc.host_attr.as_deref(),
        );

        let doc_tables = build_document(&mut session, doc)
            .with_context(|| format!("failed to reconstruct {}", doc.label))?;

        if let Some(entry) = &options.scope {
            if doc_tables.defs.contains(entry) {
                let aliases =
                    analysis::scope_aliases(session.world(), &doc_tables.defs, entry)
                        .with_context(|| format!("scope analysis failed in {}", doc.label))?;
                scopes.push(DocumentScope {
                    document: doc.label.clone(),
                    aliases,
                });
            }
        }
        tables.push(doc_tables);
    }

    if let Some(entry) = &options.scope {
        if scopes.is_empty() {
            return Err(ReconstructError::UnresolvedAlias {
                table: error::AliasTable::Defs,
                alias: entry.clone(),
            })
            .context("scope entry is not defined in any document");
        }
    }

    let stripped_interns = session.apply_intern_policy(&options.intern_policy());

    tracing::debug!(
        module = %module_name,
        types = session.world().num_types(),
        defs = session.world().num_defs(),
        externals = session.externals().len(),
        warnings = session.diagnostics().len(),
        "reconstruction complete"
    );

    Ok(Reconstruction {
        module_name,
        session,
        documents: tables,
        scopes,
        stripped_interns,
    })
}

/// Parse and reconstruct documents given as `(label, json text)` pairs.
pub fn reconstruct_json<'a>(
    sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    options: &ReconstructOptions,
) -> Result<Reconstruction> {
    let documents = sources
        .into_iter()
        .map(|(label, text)| {
            parser::parse_document(label, text)
                .with_context(|| format!("failed to parse {}", label))
        })
        .collect::<Result<Vec<_>>>()?;
    reconstruct(&documents, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_intern_implies_remove() {
        let options = ReconstructOptions {
            keep_interns: ["f".to_string()].into_iter().collect(),
            ..ReconstructOptions::default()
        };
        let policy = options.intern_policy();
        assert!(policy.removes_interns());
        assert!(policy.kept().contains("f"));
    }

    #[test]
    fn test_default_policy_keeps_interns() {
        assert!(!ReconstructOptions::default().intern_policy().removes_interns());
    }

    #[test]
    fn test_module_name_fallbacks() {
        let named = r#"{"module": "from_doc"}"#;
        let unnamed = r#"{}"#;

        let result = reconstruct_json([("a.json", named)], &ReconstructOptions::default()).unwrap();
        assert_eq!(result.module_name, "from_doc");

        let options = ReconstructOptions {
            module_name: Some("cli".to_string()),
            ..ReconstructOptions::default()
        };
        let result = reconstruct_json([("a.json", named)], &options).unwrap();
        assert_eq!(result.module_name, "cli");

        let result =
            reconstruct_json([("a.json", unnamed)], &ReconstructOptions::default()).unwrap();
        assert_eq!(result.module_name, DEFAULT_MODULE_NAME);
    }

    #[test]
    fn test_error_names_the_document() {
        let err = reconstruct_json(
            [("bad.json", r#"{"defs": [{"type": "known", "def": "x", "name": "k"}]}"#)],
            &ReconstructOptions::default(),
        )
        .unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("bad.json"), "message: {}", message);
        assert!(message.contains("unresolved def alias `x`"), "message: {}", message);
    }

    #[test]
    fn test_scope_entry_missing_everywhere() {
        let options = ReconstructOptions {
            scope: Some("main".to_string()),
            ..ReconstructOptions::default()
        };
        assert!(reconstruct_json([("a.json", "{}")], &options).is_err());
    }
}
