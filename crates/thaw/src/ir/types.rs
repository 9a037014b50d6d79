//! IR type definitions.
//!
//! Types and defs live in the run-owned [`World`](super::World) arena and are
//! referenced through typed handles. A handle is allocated at the first mention
//! of a node and never changes afterwards, so nominal types and continuations
//! can be completed in place while earlier holders keep pointing at them.

use super::literal::Literal;
use serde::Deserialize;
use std::fmt;

/// Generic index type with a phantom tag to distinguish different index spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Idx<TAG> {
    idx: usize,
    _marker: std::marker::PhantomData<TAG>,
}

impl<TAG> Idx<TAG> {
    pub fn new(idx: usize) -> Self {
        Self {
            idx,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn as_usize(&self) -> usize {
        self.idx
    }
}

impl<TAG> From<Idx<TAG>> for usize {
    fn from(idx: Idx<TAG>) -> Self {
        idx.idx
    }
}

/// Marker type for the type index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag;

/// Marker type for the def index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefTag;

/// Handle to a type node, indexing into `World::types`.
pub type TypeId = Idx<TypeTag>;

/// Handle to a def node, indexing into `World::defs`.
pub type DefId = Idx<DefTag>;

impl fmt::Display for Idx<TypeTag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.idx)
    }
}

impl fmt::Display for Idx<DefTag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.idx)
    }
}

// ─── Tag enumerations ───────────────────────────────────────────────────────

/// Primitive type tags.
///
/// `p*` tags are precise (exact overflow / IEEE semantics), `q*` tags are
/// quick: the backend may relax them to whatever the hardware does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimTag {
    Ps8,
    Ps16,
    Ps32,
    Ps64,
    Pu8,
    Pu16,
    Pu32,
    Pu64,
    Qs8,
    Qs16,
    Qs32,
    Qs64,
    Qu8,
    Qu16,
    Qu32,
    Qu64,
    Bool,
    Pf16,
    Pf32,
    Pf64,
    Qf16,
    Qf32,
    Qf64,
}

impl PrimTag {
    pub const ALL: [PrimTag; 23] = [
        PrimTag::Ps8,
        PrimTag::Ps16,
        PrimTag::Ps32,
        PrimTag::Ps64,
        PrimTag::Pu8,
        PrimTag::Pu16,
        PrimTag::Pu32,
        PrimTag::Pu64,
        PrimTag::Qs8,
        PrimTag::Qs16,
        PrimTag::Qs32,
        PrimTag::Qs64,
        PrimTag::Qu8,
        PrimTag::Qu16,
        PrimTag::Qu32,
        PrimTag::Qu64,
        PrimTag::Bool,
        PrimTag::Pf16,
        PrimTag::Pf32,
        PrimTag::Pf64,
        PrimTag::Qf16,
        PrimTag::Qf32,
        PrimTag::Qf64,
    ];

    /// The wire name of this tag.
    pub fn name(&self) -> &'static str {
        use PrimTag::*;
        match self {
            Ps8 => "ps8",
            Ps16 => "ps16",
            Ps32 => "ps32",
            Ps64 => "ps64",
            Pu8 => "pu8",
            Pu16 => "pu16",
            Pu32 => "pu32",
            Pu64 => "pu64",
            Qs8 => "qs8",
            Qs16 => "qs16",
            Qs32 => "qs32",
            Qs64 => "qs64",
            Qu8 => "qu8",
            Qu16 => "qu16",
            Qu32 => "qu32",
            Qu64 => "qu64",
            Bool => "bool",
            Pf16 => "pf16",
            Pf32 => "pf32",
            Pf64 => "pf64",
            Qf16 => "qf16",
            Qf32 => "qf32",
            Qf64 => "qf64",
        }
    }
}

impl fmt::Display for PrimTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pointer address spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddrSpace {
    #[default]
    Generic,
    Global,
    Texture,
    Shared,
    Constant,
    Private,
}

impl fmt::Display for AddrSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AddrSpace::Generic => "generic",
            AddrSpace::Global => "global",
            AddrSpace::Texture => "texture",
            AddrSpace::Shared => "shared",
            AddrSpace::Constant => "constant",
            AddrSpace::Private => "private",
        };
        f.write_str(s)
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

/// Math library operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathOp {
    Copysign,
    Fabs,
    Round,
    Floor,
    Ceil,
    Fmin,
    Fmax,
    Cos,
    Sin,
    Tan,
    Acos,
    Asin,
    Atan,
    Atan2,
    Sqrt,
    Cbrt,
    Pow,
    Exp,
    Exp2,
    Log,
    Log2,
    Log10,
}

impl MathOp {
    /// Number of operands the operator takes.
    pub fn arity(&self) -> usize {
        match self {
            MathOp::Copysign | MathOp::Fmin | MathOp::Fmax | MathOp::Atan2 | MathOp::Pow => 2,
            _ => 1,
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// Inline assembly flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsmFlag {
    #[default]
    NoFlag,
    HasSideEffects,
    IsAlignStack,
    IsIntelDialect,
}

// Operator Display uses the wire spelling; Debug already matches it modulo case.
macro_rules! display_lowercase_debug {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", format!("{:?}", self).to_lowercase())
            }
        })*
    };
}

display_lowercase_debug!(ArithOp, MathOp, CmpOp, AsmFlag);

// ─── Type nodes ─────────────────────────────────────────────────────────────

/// A named aggregate whose fields may be filled in after its handle exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NominalType {
    /// Declared name (`struct_name` / `variant_name` on the wire).
    pub name: String,
    /// Field types; `None` until the defining descriptor arrives.
    pub fields: Vec<Option<TypeId>>,
    /// Field names; `None` until the defining descriptor arrives.
    pub field_names: Vec<Option<String>>,
}

impl NominalType {
    pub fn new(name: impl Into<String>, num_fields: usize) -> Self {
        Self {
            name: name.into(),
            fields: vec![None; num_fields],
            field_names: vec![None; num_fields],
        }
    }

    /// Whether every field has a type.
    pub fn is_complete(&self) -> bool {
        self.fields.iter().all(Option::is_some)
    }
}

/// A type node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    DefiniteArray {
        elem: TypeId,
        len: u64,
    },
    IndefiniteArray {
        elem: TypeId,
    },
    Bottom,
    Fn {
        params: Vec<TypeId>,
    },
    Closure {
        params: Vec<TypeId>,
    },
    Frame,
    Mem,
    Struct(NominalType),
    Variant(NominalType),
    Tuple {
        elems: Vec<TypeId>,
    },
    Prim {
        tag: PrimTag,
        lanes: usize,
    },
    Ptr {
        pointee: TypeId,
        lanes: usize,
        addr_space: AddrSpace,
    },
}

impl Type {
    /// Nominal types get a fresh handle per declaration and are never interned.
    pub fn is_nominal(&self) -> bool {
        matches!(self, Type::Struct(_) | Type::Variant(_))
    }

    /// Lane count of vector-shaped types (primitives and pointers).
    pub fn lanes(&self) -> Option<usize> {
        match self {
            Type::Prim { lanes, .. } | Type::Ptr { lanes, .. } => Some(*lanes),
            _ => None,
        }
    }

    /// Short kind name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Type::DefiniteArray { .. } => "definite array type",
            Type::IndefiniteArray { .. } => "indefinite array type",
            Type::Bottom => "bottom type",
            Type::Fn { .. } => "function type",
            Type::Closure { .. } => "closure type",
            Type::Frame => "frame type",
            Type::Mem => "memory type",
            Type::Struct(_) => "struct type",
            Type::Variant(_) => "variant type",
            Type::Tuple { .. } => "tuple type",
            Type::Prim { .. } => "primitive type",
            Type::Ptr { .. } => "pointer type",
        }
    }
}

// ─── Def nodes ──────────────────────────────────────────────────────────────

/// Linkage of a continuation or global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Linkage {
    /// Visible only through the alias table of the document that built it.
    #[default]
    Private,
    /// Published under its name for the backends.
    External,
    /// Shared across documents of one run through the external registry.
    Internal,
}

/// Calling convention of a continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallingConv {
    #[default]
    Default,
    Device,
}

/// Built-in operation a continuation stands for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Intrinsic {
    #[default]
    None,
    /// Two-way branch on a boolean.
    Branch,
    /// Pattern match on a tagged union.
    Match { variant: TypeId, num_patterns: usize },
    /// Named device or compiler intrinsic.
    Named(String),
}

/// Terminating transfer of a continuation: `callee(args...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct App {
    pub callee: DefId,
    pub args: Vec<DefId>,
}

/// A control-flow node: a basic block / function with parameters and one
/// terminating transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    /// Signature (always a `Type::Fn`).
    pub ty: TypeId,
    /// One `Def::Param` per signature parameter, in order.
    pub params: Vec<DefId>,
    /// `None` while the continuation is only declared.
    pub body: Option<App>,
    /// Speculative-execution filter (`Def::Filter`).
    pub filter: Option<DefId>,
    pub name: Option<String>,
    pub linkage: Linkage,
    pub cc: CallingConv,
    pub intrinsic: Intrinsic,
}

impl Continuation {
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

/// Initializer of a global variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalInit {
    /// No value yet; a later document may supply one.
    Pending,
    Value(DefId),
}

/// A global variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub init: GlobalInit,
    pub mutable: bool,
    pub name: Option<String>,
    pub linkage: Linkage,
}

/// Inline assembly payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub ty: TypeId,
    pub inputs: Vec<DefId>,
    pub template: String,
    pub output_constraints: Vec<String>,
    pub input_constraints: Vec<String>,
    pub clobbers: Vec<String>,
    pub flags: AsmFlag,
}

/// A def node: an IR value or control node.
#[derive(Debug, Clone, PartialEq)]
pub enum Def {
    ArithOp {
        op: ArithOp,
        lhs: DefId,
        rhs: DefId,
    },
    MathOp {
        op: MathOp,
        args: Vec<DefId>,
    },
    Cmp {
        op: CmpOp,
        lhs: DefId,
        rhs: DefId,
    },
    Literal {
        ty: TypeId,
        value: Literal,
    },
    Top {
        ty: TypeId,
    },
    Bottom {
        ty: TypeId,
    },
    /// Address computation (`ptr + index`).
    Lea {
        ptr: DefId,
        index: DefId,
    },
    Load {
        mem: DefId,
        ptr: DefId,
    },
    Extract {
        agg: DefId,
        index: DefId,
    },
    Insert {
        agg: DefId,
        index: DefId,
        value: DefId,
    },
    Cast {
        target: TypeId,
        source: DefId,
    },
    Bitcast {
        target: TypeId,
        source: DefId,
    },
    Run {
        def: DefId,
    },
    Hlt {
        def: DefId,
    },
    Store {
        mem: DefId,
        ptr: DefId,
        value: DefId,
    },
    Enter {
        mem: DefId,
    },
    Slot {
        target: TypeId,
        frame: DefId,
    },
    DefiniteArray {
        elem: TypeId,
        elems: Vec<DefId>,
    },
    IndefiniteArray {
        elem: TypeId,
        dim: DefId,
    },
    Global(Global),
    Closure {
        ty: TypeId,
        func: DefId,
        env: DefId,
    },
    Struct {
        ty: TypeId,
        fields: Vec<DefId>,
    },
    Tuple {
        elems: Vec<DefId>,
    },
    Vector {
        elems: Vec<DefId>,
    },
    Alloc {
        target: TypeId,
        mem: DefId,
        extra: DefId,
    },
    Release {
        mem: DefId,
        alloc: DefId,
    },
    Known {
        def: DefId,
    },
    SizeOf {
        target: TypeId,
    },
    AlignOf {
        target: TypeId,
    },
    /// `if cond { if_true } else { if_false }`
    Select {
        cond: DefId,
        if_true: DefId,
        if_false: DefId,
    },
    Filter {
        conds: Vec<DefId>,
    },
    Variant {
        ty: TypeId,
        value: DefId,
        index: usize,
    },
    VariantExtract {
        value: DefId,
        index: usize,
    },
    VariantIndex {
        value: DefId,
    },
    Assembly(Box<Assembly>),
    /// Parameter `index` of continuation `cont`.
    Param {
        cont: DefId,
        index: usize,
    },
    Continuation(Continuation),
}

impl Def {
    /// Defs this node uses, in operand order.
    ///
    /// A parameter's owning continuation is not an operand: the edge runs from
    /// the continuation to its parameters.
    pub fn operands(&self) -> Vec<DefId> {
        match self {
            Def::ArithOp { lhs, rhs, .. } | Def::Cmp { lhs, rhs, .. } => vec![*lhs, *rhs],
            Def::MathOp { args, .. } => args.clone(),
            Def::Literal { .. }
            | Def::Top { .. }
            | Def::Bottom { .. }
            | Def::SizeOf { .. }
            | Def::AlignOf { .. }
            | Def::Param { .. } => Vec::new(),
            Def::Lea { ptr, index } => vec![*ptr, *index],
            Def::Load { mem, ptr } => vec![*mem, *ptr],
            Def::Extract { agg, index } => vec![*agg, *index],
            Def::Insert { agg, index, value } => vec![*agg, *index, *value],
            Def::Cast { source, .. } | Def::Bitcast { source, .. } => vec![*source],
            Def::Run { def } | Def::Hlt { def } | Def::Known { def } => vec![*def],
            Def::Store { mem, ptr, value } => vec![*mem, *ptr, *value],
            Def::Enter { mem } => vec![*mem],
            Def::Slot { frame, .. } => vec![*frame],
            Def::DefiniteArray { elems, .. } | Def::Tuple { elems } | Def::Vector { elems } => {
                elems.clone()
            }
            Def::IndefiniteArray { dim, .. } => vec![*dim],
            Def::Global(global) => match global.init {
                GlobalInit::Value(init) => vec![init],
                GlobalInit::Pending => Vec::new(),
            },
            Def::Closure { func, env, .. } => vec![*func, *env],
            Def::Struct { fields, .. } => fields.clone(),
            Def::Alloc { mem, extra, .. } => vec![*mem, *extra],
            Def::Release { mem, alloc } => vec![*mem, *alloc],
            Def::Select {
                cond,
                if_true,
                if_false,
            } => vec![*cond, *if_true, *if_false],
            Def::Filter { conds } => conds.clone(),
            Def::Variant { value, .. }
            | Def::VariantExtract { value, .. }
            | Def::VariantIndex { value } => vec![*value],
            Def::Assembly(asm) => asm.inputs.clone(),
            Def::Continuation(cont) => {
                let mut ops = Vec::new();
                ops.extend(cont.filter);
                if let Some(app) = &cont.body {
                    ops.push(app.callee);
                    ops.extend(app.args.iter().copied());
                }
                ops
            }
        }
    }

    /// Short kind name, used in diagnostics and the printer.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Def::ArithOp { .. } => "arithop",
            Def::MathOp { .. } => "mathop",
            Def::Cmp { .. } => "cmp",
            Def::Literal { .. } => "const",
            Def::Top { .. } => "top",
            Def::Bottom { .. } => "bottom",
            Def::Lea { .. } => "lea",
            Def::Load { .. } => "load",
            Def::Extract { .. } => "extract",
            Def::Insert { .. } => "insert",
            Def::Cast { .. } => "cast",
            Def::Bitcast { .. } => "bitcast",
            Def::Run { .. } => "run",
            Def::Hlt { .. } => "hlt",
            Def::Store { .. } => "store",
            Def::Enter { .. } => "enter",
            Def::Slot { .. } => "slot",
            Def::DefiniteArray { .. } => "def_array",
            Def::IndefiniteArray { .. } => "indef_array",
            Def::Global(_) => "global",
            Def::Closure { .. } => "closure",
            Def::Struct { .. } => "struct",
            Def::Tuple { .. } => "tuple",
            Def::Vector { .. } => "vector",
            Def::Alloc { .. } => "alloc",
            Def::Release { .. } => "release",
            Def::Known { .. } => "known",
            Def::SizeOf { .. } => "sizeof",
            Def::AlignOf { .. } => "alignof",
            Def::Select { .. } => "select",
            Def::Filter { .. } => "filter",
            Def::Variant { .. } => "variant",
            Def::VariantExtract { .. } => "variant_extract",
            Def::VariantIndex { .. } => "variant_index",
            Def::Assembly(_) => "assembly",
            Def::Param { .. } => "param",
            Def::Continuation(_) => "continuation",
        }
    }

    pub fn as_continuation(&self) -> Option<&Continuation> {
        match self {
            Def::Continuation(cont) => Some(cont),
            _ => None,
        }
    }

    pub fn as_global(&self) -> Option<&Global> {
        match self {
            Def::Global(global) => Some(global),
            _ => None,
        }
    }
}
