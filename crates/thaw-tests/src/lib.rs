//! Fixture documents and helpers for the thaw end-to-end tests.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use thaw::parser::{parse_document, ParsedDocument};
use thaw::{reconstruct, ReconstructOptions, Reconstruction};

/// Directory holding the fixture documents.
pub fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Load and parse one fixture by file name.
pub fn load(name: &str) -> Result<ParsedDocument> {
    let path = data_dir().join(name);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_document(name, &text).with_context(|| format!("failed to parse {}", name))
}

/// Reconstruct fixtures in the given order.
pub fn reconstruct_fixtures(names: &[&str], options: &ReconstructOptions) -> Result<Reconstruction> {
    let documents = names
        .iter()
        .map(|name| load(name))
        .collect::<Result<Vec<_>>>()?;
    reconstruct(&documents, options)
}

/// A synthetic document with `num_blocks` continuations chained into a loop,
/// each doing a little arithmetic on its counter parameter.
pub fn synthetic_document(num_blocks: usize) -> String {
    let mut defs = vec![json!({"type": "const", "const_type": "i32", "value": 1, "name": "one"})];

    // Predeclare every block so later blocks can jump backwards and forwards.
    for i in 0..num_blocks {
        defs.push(json!({
            "type": "continuation",
            "name": format!("b{}", i),
            "fn_type": "fn_block",
            "arg_names": [format!("m{}", i), format!("x{}", i)]
        }));
    }
    for i in 0..num_blocks {
        let next = (i + 1) % num_blocks;
        defs.push(json!({
            "type": "arithop", "op": "add",
            "args": [format!("x{}", i), "one"],
            "name": format!("s{}", i)
        }));
        defs.push(json!({
            "type": "continuation",
            "name": format!("b{}", i),
            "app": {"target": format!("b{}", next), "args": [format!("m{}", i), format!("s{}", i)]}
        }));
    }

    let doc: Value = json!({
        "module": "synthetic",
        "type_table": [
            {"type": "mem", "name": "mem"},
            {"type": "prim", "tag": "qs32", "length": 1, "name": "i32"},
            {"type": "function", "args": ["mem", "i32"], "name": "fn_block"}
        ],
        "defs": defs
    });
    doc.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_fixture_parses() {
        let mut count = 0;
        for entry in std::fs::read_dir(data_dir()).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                let name = path.file_name().unwrap().to_str().unwrap().to_string();
                load(&name).unwrap();
                count += 1;
            }
        }
        assert!(count > 0);
    }

    #[test]
    fn test_synthetic_document_reconstructs() {
        let text = synthetic_document(8);
        let result =
            thaw::reconstruct_json([("synthetic.json", text.as_str())], &ReconstructOptions::default())
                .unwrap();
        let defs = &result.documents[0].defs;
        let world = result.session.world();
        let b7 = defs.lookup("b7").unwrap();
        let b0 = defs.lookup("b0").unwrap();
        assert_eq!(world.continuation(b7).unwrap().body.as_ref().unwrap().callee, b0);
    }
}
