//! Document loader.
//!
//! This module turns one serialized translation unit (JSON) into typed
//! descriptors. Each descriptor is decoded on its own so that an unknown tag or
//! a missing field is reported against the descriptor's alias.

use crate::error::{ReconstructError, Result};
use crate::ir::{AddrSpace, ArithOp, AsmFlag, CmpOp, MathOp, PrimTag};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// A type descriptor: alias plus tag-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDesc {
    /// Alias under which the type is registered.
    pub name: String,
    pub kind: TypeDescKind,
}

/// Type descriptor payload, keyed by the wire `type` tag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum TypeDescKind {
    #[serde(rename = "def_array")]
    DefiniteArray { args: Vec<String>, length: u64 },
    #[serde(rename = "indef_array")]
    IndefiniteArray { args: Vec<String> },
    #[serde(rename = "bottom")]
    Bottom,
    #[serde(rename = "function")]
    Function { args: Vec<String> },
    #[serde(rename = "closure")]
    Closure { args: Vec<String> },
    #[serde(rename = "frame")]
    Frame,
    #[serde(rename = "mem")]
    Mem,
    /// A bare declaration has no `args`; the defining descriptor supplies them.
    #[serde(rename = "struct")]
    Struct {
        struct_name: String,
        arg_names: Vec<String>,
        args: Option<Vec<String>>,
    },
    #[serde(rename = "variant")]
    Variant {
        variant_name: String,
        arg_names: Vec<String>,
        args: Option<Vec<String>>,
    },
    #[serde(rename = "tuple")]
    Tuple { args: Vec<String> },
    #[serde(rename = "prim")]
    Prim { tag: PrimTag, length: usize },
    #[serde(rename = "ptr")]
    Ptr {
        args: Vec<String>,
        length: usize,
        addrspace: Option<AddrSpace>,
    },
}

/// A def descriptor: alias plus tag-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DefDesc {
    /// Alias under which the def is registered.
    pub name: String,
    pub kind: DefDescKind,
}

/// Terminating transfer of a continuation descriptor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppDesc {
    pub target: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Continuation descriptor payload. Every field is optional: a descriptor with
/// only a signature predeclares the continuation, a later one with the same
/// alias completes it.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ContinuationDesc {
    pub fn_type: Option<String>,
    pub intrinsic: Option<String>,
    pub variant_type: Option<String>,
    pub num_patterns: Option<usize>,
    pub filter: Option<String>,
    pub arg_names: Option<Vec<String>>,
    pub external: Option<String>,
    pub internal: Option<String>,
    pub device: Option<String>,
    pub app: Option<AppDesc>,
}

/// Inline assembly descriptor payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssemblyDesc {
    pub asm_type: String,
    pub inputs: Vec<String>,
    pub asm_template: String,
    #[serde(default)]
    pub output_constraints: Vec<String>,
    #[serde(default)]
    pub input_constraints: Vec<String>,
    #[serde(default)]
    pub clobbers: Vec<String>,
    #[serde(default)]
    pub flags: AsmFlag,
}

/// Def descriptor payload, keyed by the wire `type` tag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum DefDescKind {
    #[serde(rename = "arithop")]
    ArithOp { op: ArithOp, args: Vec<String> },
    #[serde(rename = "mathop")]
    MathOp { op: MathOp, args: Vec<String> },
    #[serde(rename = "continuation")]
    Continuation(Box<ContinuationDesc>),
    #[serde(rename = "const")]
    Constant { const_type: String, value: Value },
    #[serde(rename = "top")]
    Top { const_type: String },
    #[serde(rename = "bottom")]
    Bottom { const_type: String },
    #[serde(rename = "cmp")]
    Cmp { op: CmpOp, args: Vec<String> },
    #[serde(rename = "lea")]
    Lea { args: Vec<String> },
    #[serde(rename = "load")]
    Load { args: Vec<String> },
    #[serde(rename = "extract")]
    Extract { args: Vec<String> },
    #[serde(rename = "insert")]
    Insert { args: Vec<String> },
    #[serde(rename = "cast")]
    Cast { target_type: String, source: String },
    #[serde(rename = "bitcast")]
    Bitcast { target_type: String, source: String },
    #[serde(rename = "run")]
    Run { target: String },
    #[serde(rename = "hlt")]
    Hlt { target: String },
    #[serde(rename = "store")]
    Store { args: Vec<String> },
    #[serde(rename = "enter")]
    Enter { mem: String },
    #[serde(rename = "slot")]
    Slot { target_type: String, frame: String },
    #[serde(rename = "def_array")]
    DefiniteArray {
        elem_type: String,
        args: Vec<String>,
    },
    #[serde(rename = "indef_array")]
    IndefiniteArray { elem_type: String, dim: String },
    #[serde(rename = "global")]
    Global {
        #[serde(default)]
        mutable: bool,
        init: Option<String>,
        external: Option<String>,
    },
    #[serde(rename = "closure")]
    Closure {
        closure_type: String,
        args: Vec<String>,
    },
    #[serde(rename = "struct")]
    Struct {
        struct_type: String,
        args: Vec<String>,
    },
    #[serde(rename = "tuple")]
    Tuple { args: Vec<String> },
    #[serde(rename = "vector")]
    Vector { args: Vec<String> },
    #[serde(rename = "alloc")]
    Alloc {
        target_type: String,
        args: Vec<String>,
    },
    #[serde(rename = "release")]
    Release { args: Vec<String> },
    #[serde(rename = "known")]
    Known { def: String },
    #[serde(rename = "sizeof")]
    Sizeof { target_type: String },
    #[serde(rename = "alignof")]
    Alignof { target_type: String },
    #[serde(rename = "select")]
    Select { args: Vec<String> },
    #[serde(rename = "filter")]
    Filter { args: Vec<String> },
    #[serde(rename = "variant")]
    Variant {
        variant_type: String,
        value: String,
        index: usize,
    },
    #[serde(rename = "variant_extract")]
    VariantExtract { value: String, index: usize },
    #[serde(rename = "variant_index")]
    VariantIndex { value: String },
    #[serde(rename = "assembly")]
    Assembly(Box<AssemblyDesc>),
}

/// One parsed translation unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedDocument {
    /// Where the document came from (file name or caller-chosen label).
    pub label: String,
    pub module: Option<String>,
    pub host_triple: Option<String>,
    pub host_cpu: Option<String>,
    pub host_attr: Option<String>,
    pub type_table: Vec<TypeDesc>,
    pub defs: Vec<DefDesc>,
}

#[derive(Deserialize)]
struct RawDocument {
    module: Option<String>,
    host_triple: Option<String>,
    host_cpu: Option<String>,
    host_attr: Option<String>,
    #[serde(default)]
    type_table: Vec<Value>,
    #[serde(default)]
    defs: Vec<Value>,
}

/// Alias of a raw descriptor, or a positional placeholder when it has none.
fn alias_of(value: &Value, section: &str, position: usize) -> Result<String> {
    match value.get("name") {
        Some(Value::String(name)) => Ok(name.clone()),
        Some(other) => Err(ReconstructError::malformed(
            format!("{}[{}]", section, position),
            format!("`name` must be a string, found {}", other),
        )),
        None => Err(ReconstructError::malformed(
            format!("{}[{}]", section, position),
            "missing field `name`",
        )),
    }
}

fn decode_kind<T: DeserializeOwned>(alias: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ReconstructError::malformed(alias, e.to_string()))
}

/// Decode a single type descriptor.
pub fn parse_type_desc(value: Value, position: usize) -> Result<TypeDesc> {
    let name = alias_of(&value, "type_table", position)?;
    let kind = decode_kind(&name, value)?;
    Ok(TypeDesc { name, kind })
}

/// Decode a single def descriptor.
pub fn parse_def_desc(value: Value, position: usize) -> Result<DefDesc> {
    let name = alias_of(&value, "defs", position)?;
    let kind = decode_kind(&name, value)?;
    Ok(DefDesc { name, kind })
}

/// Parse a serialized document.
///
/// # Arguments
/// * `label` - Name used in diagnostics (usually the file name)
/// * `text` - JSON text of the document
pub fn parse_document(label: &str, text: &str) -> Result<ParsedDocument> {
    let raw: RawDocument = serde_json::from_str(text)
        .map_err(|e| ReconstructError::malformed(label, e.to_string()))?;

    let type_table = raw
        .type_table
        .into_iter()
        .enumerate()
        .map(|(i, value)| parse_type_desc(value, i))
        .collect::<Result<Vec<_>>>()?;

    let defs = raw
        .defs
        .into_iter()
        .enumerate()
        .map(|(i, value)| parse_def_desc(value, i))
        .collect::<Result<Vec<_>>>()?;

    Ok(ParsedDocument {
        label: label.to_string(),
        module: raw.module,
        host_triple: raw.host_triple,
        host_cpu: raw.host_cpu,
        host_attr: raw.host_attr,
        type_table,
        defs,
    })
}
