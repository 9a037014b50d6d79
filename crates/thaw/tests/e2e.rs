//! End-to-end integration tests for thaw.
//!
//! These tests verify the complete pipeline: JSON text → descriptors → graph.

use anyhow::Result;
use serde_json::json;
use thaw::ir::{Def, Diagnostic, GlobalInit, Literal, PrimTag, Type};
use thaw::parser::parse_document;
use thaw::{reconstruct, reconstruct_json, ReconstructError, ReconstructOptions};

/// Helper to reconstruct a single inline document.
fn thaw_one(text: &str) -> Result<thaw::Reconstruction> {
    reconstruct_json([("inline.json", text)], &ReconstructOptions::default())
}

/// The innermost reconstruction error behind an anyhow chain.
fn root_error(err: &anyhow::Error) -> &ReconstructError {
    err.root_cause()
        .downcast_ref::<ReconstructError>()
        .expect("root cause should be a ReconstructError")
}

#[test]
fn test_constant_end_to_end() -> Result<()> {
    let text = r#"{
        "type_table": [{"type": "prim", "tag": "qs32", "length": 1, "name": "i32"}],
        "defs": [{"type": "const", "const_type": "i32", "value": 42, "name": "c1"}]
    }"#;

    let result = thaw_one(text)?;
    let world = result.session.world();
    let defs = &result.documents[0].defs;

    assert_eq!(world.num_defs(), 1);
    assert_eq!(defs.len(), 1);
    let c1 = defs.lookup("c1")?;
    match world.def(c1) {
        Def::Literal { ty, value } => {
            assert_eq!(
                *world.ty(*ty),
                Type::Prim {
                    tag: PrimTag::Qs32,
                    lanes: 1
                }
            );
            assert_eq!(*value, Literal::S32(42));
        }
        other => panic!("expected literal, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_every_prim_tag_decodes_a_constant() -> Result<()> {
    // One representative value per tag, chosen to be exact in the tag's width.
    for tag in PrimTag::ALL {
        let value = match tag {
            PrimTag::Bool => json!(true),
            t if t.name().contains('f') => json!(-2.5),
            t if t.name().contains('u') => json!(200),
            _ => json!(-100),
        };
        let doc = json!({
            "type_table": [{"type": "prim", "tag": tag.name(), "length": 1, "name": "t"}],
            "defs": [{"type": "const", "const_type": "t", "value": value, "name": "c"}]
        });
        let result = thaw_one(&doc.to_string())?;
        let world = result.session.world();
        let c = result.documents[0].defs.lookup("c")?;
        let Def::Literal { value: literal, .. } = world.def(c) else {
            panic!("expected literal for {}", tag);
        };
        let expected = match tag {
            PrimTag::Bool => "true",
            t if t.name().contains('f') => "-2.5",
            t if t.name().contains('u') => "200",
            _ => "-100",
        };
        assert_eq!(literal.to_string(), expected, "tag {}", tag);
    }
    Ok(())
}

#[test]
fn test_predeclared_continuation_identity() -> Result<()> {
    let text = r#"{
        "type_table": [
            {"type": "mem", "name": "mem"},
            {"type": "function", "args": ["mem"], "name": "fn_mem"}
        ],
        "defs": [
            {"type": "continuation", "name": "k", "fn_type": "fn_mem"},
            {"type": "continuation", "name": "entry", "fn_type": "fn_mem",
             "arg_names": ["m"], "app": {"target": "k", "args": ["m"]}},
            {"type": "continuation", "name": "k",
             "arg_names": ["km"], "app": {"target": "entry", "args": ["km"]}}
        ]
    }"#;
    let doc = parse_document("inline.json", text)?;

    // Build the first descriptor alone to observe the placeholder.
    let mut early = doc.clone();
    early.defs.truncate(1);
    let before = reconstruct(&[early], &ReconstructOptions::default())?;
    let k_before = before.documents[0].defs.lookup("k")?;
    assert!(!before.session.world().continuation(k_before).unwrap().has_body());

    let result = reconstruct(&[doc], &ReconstructOptions::default())?;
    let world = result.session.world();
    let defs = &result.documents[0].defs;
    let k = defs.lookup("k")?;
    let entry = defs.lookup("entry")?;

    // Same arena order, so the handle allocated at first mention is stable.
    assert_eq!(k, k_before);
    assert_eq!(world.continuation(entry).unwrap().body.as_ref().unwrap().callee, k);
    let body = world.continuation(k).unwrap().body.as_ref().unwrap();
    assert_eq!(body.callee, entry);
    assert_eq!(body.args, vec![defs.lookup("km")?]);
    Ok(())
}

#[test]
fn test_self_referential_struct() -> Result<()> {
    let text = r#"{
        "type_table": [
            {"type": "struct", "name": "S", "struct_name": "List", "arg_names": ["head", "tail", "len"]},
            {"type": "prim", "tag": "ps64", "length": 1, "name": "i64"},
            {"type": "ptr", "args": ["S"], "length": 1, "name": "pS"},
            {"type": "struct", "name": "S", "struct_name": "List",
             "arg_names": ["head", "tail", "len"], "args": ["i64", "pS", "i64"]}
        ]
    }"#;

    let result = thaw_one(text)?;
    let world = result.session.world();
    let types = &result.documents[0].types;
    let s = types.lookup("S")?;
    let p = types.lookup("pS")?;

    let Type::Struct(nominal) = world.ty(s) else {
        panic!("expected struct");
    };
    assert_eq!(nominal.name, "List");
    assert_eq!(nominal.fields.len(), 3);
    assert_eq!(nominal.fields[1], Some(p));
    assert!(matches!(world.ty(p), Type::Ptr { pointee, .. } if *pointee == s));
    Ok(())
}

const GLOBAL_TYPES: &str = r#"[
    {"type": "prim", "tag": "qs32", "length": 1, "name": "i32"}
]"#;

fn global_doc(init: Option<i64>) -> String {
    let types: serde_json::Value = serde_json::from_str(GLOBAL_TYPES).unwrap();
    let mut defs = Vec::new();
    let mut global = json!({"type": "global", "mutable": true, "external": "g", "name": "g"});
    if let Some(value) = init {
        defs.push(json!({"type": "const", "const_type": "i32", "value": value, "name": "init"}));
        global["init"] = json!("init");
    }
    defs.push(global);
    json!({"type_table": types, "defs": defs}).to_string()
}

fn global_init(result: &thaw::Reconstruction) -> Option<Literal> {
    let world = result.session.world();
    let g = result.session.externals().lookup("g")?;
    match world.def(g).as_global()?.init {
        GlobalInit::Value(init) => match world.def(init) {
            Def::Literal { value, .. } => Some(*value),
            _ => None,
        },
        GlobalInit::Pending => None,
    }
}

#[test]
fn test_global_placeholder_then_definition() -> Result<()> {
    let a = global_doc(None);
    let b = global_doc(Some(5));
    let result = reconstruct_json(
        [("a.json", a.as_str()), ("b.json", b.as_str())],
        &ReconstructOptions::default(),
    )?;

    assert_eq!(global_init(&result), Some(Literal::S32(5)));
    assert!(result.session.diagnostics().is_empty());

    // Both documents' `g` alias is the same node.
    let ga = result.documents[0].defs.lookup("g")?;
    let gb = result.documents[1].defs.lookup("g")?;
    assert_eq!(ga, gb);
    Ok(())
}

#[test]
fn test_conflicting_globals_last_write_wins() -> Result<()> {
    let a = global_doc(Some(5));
    let b = global_doc(Some(7));
    let result = reconstruct_json(
        [("a.json", a.as_str()), ("b.json", b.as_str())],
        &ReconstructOptions::default(),
    )?;

    assert_eq!(global_init(&result), Some(Literal::S32(7)));
    assert_eq!(
        result.session.diagnostics(),
        &[Diagnostic::LinkageConflict {
            name: "g".to_string()
        }]
    );
    Ok(())
}

#[test]
fn test_definition_then_placeholder_keeps_value() -> Result<()> {
    let a = global_doc(Some(5));
    let b = global_doc(None);
    let result = reconstruct_json(
        [("a.json", a.as_str()), ("b.json", b.as_str())],
        &ReconstructOptions::default(),
    )?;

    assert_eq!(global_init(&result), Some(Literal::S32(5)));
    assert!(result.session.diagnostics().is_empty());
    Ok(())
}

const SELECT_PRELUDE: &str = r#"
    "type_table": [
        {"type": "prim", "tag": "bool", "length": 1, "name": "bool"},
        {"type": "prim", "tag": "qs32", "length": 1, "name": "i32"}
    ],
    "defs": [
        {"type": "const", "const_type": "bool", "value": true, "name": "cond"},
        {"type": "const", "const_type": "i32", "value": 1, "name": "a"},
        {"type": "const", "const_type": "i32", "value": 2, "name": "b"},
"#;

#[test]
fn test_select_with_two_operands_fails() {
    let text = format!(
        r#"{{ {} {{"type": "select", "args": ["cond", "a"], "name": "s"}} ] }}"#,
        SELECT_PRELUDE
    );
    let doc = parse_document("inline.json", &text).unwrap();
    let mut session = thaw::ir::Session::new();
    let err = thaw::ir::build_document(&mut session, &doc).unwrap_err();

    assert_eq!(
        err,
        ReconstructError::ArityMismatch {
            alias: "s".to_string(),
            kind: "select",
            expected: 3,
            found: 2
        }
    );
    // Only the three constants were built.
    assert_eq!(session.world().num_defs(), 3);

    let err = reconstruct(&[doc], &ReconstructOptions::default()).unwrap_err();
    assert!(matches!(root_error(&err), ReconstructError::ArityMismatch { .. }));
}

#[test]
fn test_select_with_three_operands() -> Result<()> {
    let text = format!(
        r#"{{ {} {{"type": "select", "args": ["cond", "a", "b"], "name": "s"}} ] }}"#,
        SELECT_PRELUDE
    );
    let result = thaw_one(&text)?;
    let defs = &result.documents[0].defs;
    let s = defs.lookup("s")?;

    assert_eq!(
        *result.session.world().def(s),
        Def::Select {
            cond: defs.lookup("cond")?,
            if_true: defs.lookup("a")?,
            if_false: defs.lookup("b")?,
        }
    );
    Ok(())
}

#[test]
fn test_unknown_def_tag_is_fatal() {
    let err = thaw_one(r#"{"defs": [{"type": "teleport", "name": "x"}]}"#).unwrap_err();
    assert!(matches!(
        root_error(&err),
        ReconstructError::MalformedDescriptor { alias, .. } if alias == "x"
    ));
}

#[test]
fn test_unresolved_type_alias_is_fatal() {
    let err = thaw_one(
        r#"{"defs": [{"type": "sizeof", "target_type": "ghost", "name": "sz"}]}"#,
    )
    .unwrap_err();
    assert_eq!(err.root_cause().to_string(), "unresolved type alias `ghost`");
}

#[test]
fn test_type_aliases_do_not_leak_between_documents() {
    let a = r#"{"type_table": [{"type": "mem", "name": "m"}]}"#;
    let b = r#"{"defs": [{"type": "sizeof", "target_type": "m", "name": "sz"}]}"#;
    let result = reconstruct_json([("a.json", a), ("b.json", b)], &ReconstructOptions::default());
    assert!(result.is_err());
}

#[test]
fn test_target_mismatch_warns_and_keeps_latest() -> Result<()> {
    let a = r#"{"host_triple": "x86_64-unknown-linux-gnu"}"#;
    let b = r#"{"host_triple": "aarch64-unknown-linux-gnu"}"#;
    let result = reconstruct_json([("a.json", a), ("b.json", b)], &ReconstructOptions::default())?;

    assert_eq!(
        result.session.target().triple.as_deref(),
        Some("aarch64-unknown-linux-gnu")
    );
    assert_eq!(result.session.diagnostics().len(), 1);
    Ok(())
}
