//! The run-owned IR arena.
//!
//! All nodes reconstructed during one run live here, across every input
//! document. Structural types are interned so identical types share a handle;
//! nominal types and defs always get a fresh one.

use super::types::*;
use std::collections::HashMap;

/// Arena of type and def nodes.
#[derive(Debug, Clone, Default)]
pub struct World {
    types: Vec<Type>,
    /// Structural type → handle. Nominal types never enter this map.
    type_interner: HashMap<Type, TypeId>,
    defs: Vec<Def>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Accessors ─────────────────────────────────────────────────────────

    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.as_usize()]
    }

    pub fn def(&self, id: DefId) -> &Def {
        &self.defs[id.as_usize()]
    }

    pub fn def_mut(&mut self, id: DefId) -> &mut Def {
        &mut self.defs[id.as_usize()]
    }

    pub fn num_types(&self) -> usize {
        self.types.len()
    }

    pub fn num_defs(&self) -> usize {
        self.defs.len()
    }

    pub fn types(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, ty)| (TypeId::new(i), ty))
    }

    pub fn defs(&self) -> impl Iterator<Item = (DefId, &Def)> {
        self.defs
            .iter()
            .enumerate()
            .map(|(i, def)| (DefId::new(i), def))
    }

    pub fn continuation(&self, id: DefId) -> Option<&Continuation> {
        self.def(id).as_continuation()
    }

    pub fn continuation_mut(&mut self, id: DefId) -> Option<&mut Continuation> {
        match self.def_mut(id) {
            Def::Continuation(cont) => Some(cont),
            _ => None,
        }
    }

    pub fn global_mut(&mut self, id: DefId) -> Option<&mut Global> {
        match self.def_mut(id) {
            Def::Global(global) => Some(global),
            _ => None,
        }
    }

    // ─── Types ─────────────────────────────────────────────────────────────

    /// Intern a structural type, or allocate a fresh nominal one.
    pub fn intern_type(&mut self, ty: Type) -> TypeId {
        if ty.is_nominal() {
            return self.push_type(ty);
        }
        if let Some(&id) = self.type_interner.get(&ty) {
            return id;
        }
        let id = self.push_type(ty.clone());
        self.type_interner.insert(ty, id);
        id
    }

    fn push_type(&mut self, ty: Type) -> TypeId {
        let id = TypeId::new(self.types.len());
        self.types.push(ty);
        id
    }

    pub fn mem_type(&mut self) -> TypeId {
        self.intern_type(Type::Mem)
    }

    pub fn bool_type(&mut self) -> TypeId {
        self.intern_type(Type::Prim {
            tag: PrimTag::Bool,
            lanes: 1,
        })
    }

    pub fn fn_type(&mut self, params: Vec<TypeId>) -> TypeId {
        self.intern_type(Type::Fn { params })
    }

    pub fn tuple_type(&mut self, elems: Vec<TypeId>) -> TypeId {
        self.intern_type(Type::Tuple { elems })
    }

    /// Allocate a struct type with `num_fields` unset fields.
    pub fn struct_type(&mut self, name: &str, num_fields: usize) -> TypeId {
        self.push_type(Type::Struct(NominalType::new(name, num_fields)))
    }

    /// Allocate a variant type with `num_fields` unset cases.
    pub fn variant_type(&mut self, name: &str, num_fields: usize) -> TypeId {
        self.push_type(Type::Variant(NominalType::new(name, num_fields)))
    }

    /// Mutable access to the field list of a nominal type.
    pub fn nominal_mut(&mut self, id: TypeId) -> Option<&mut NominalType> {
        match &mut self.types[id.as_usize()] {
            Type::Struct(nominal) | Type::Variant(nominal) => Some(nominal),
            _ => None,
        }
    }

    /// Parameter types of a function type, if `id` is one.
    pub fn fn_params(&self, id: TypeId) -> Option<&[TypeId]> {
        match self.ty(id) {
            Type::Fn { params } => Some(params),
            _ => None,
        }
    }

    // ─── Defs ──────────────────────────────────────────────────────────────

    /// Append a def node and return its handle.
    pub fn push_def(&mut self, def: Def) -> DefId {
        let id = DefId::new(self.defs.len());
        self.defs.push(def);
        id
    }

    /// Allocate a body-less continuation of function type `fn_ty`, with one
    /// parameter node per signature parameter.
    ///
    /// Returns `None` if `fn_ty` is not a function type.
    pub fn continuation_of(&mut self, fn_ty: TypeId) -> Option<DefId> {
        let num_params = self.fn_params(fn_ty)?.len();
        Some(self.alloc_continuation(fn_ty, num_params, Intrinsic::None))
    }

    fn alloc_continuation(
        &mut self,
        fn_ty: TypeId,
        num_params: usize,
        intrinsic: Intrinsic,
    ) -> DefId {
        let cont = self.push_def(Def::Continuation(Continuation {
            ty: fn_ty,
            params: Vec::new(),
            body: None,
            filter: None,
            name: None,
            linkage: Linkage::Private,
            cc: CallingConv::Default,
            intrinsic,
        }));

        let params: Vec<DefId> = (0..num_params)
            .map(|index| self.push_def(Def::Param { cont, index }))
            .collect();

        if let Some(c) = self.continuation_mut(cont) {
            c.params = params;
        }
        cont
    }

    /// Branch intrinsic: `fn(mem, bool, fn(mem), fn(mem))`.
    pub fn branch(&mut self) -> DefId {
        let mem = self.mem_type();
        let cond = self.bool_type();
        let target = self.fn_type(vec![mem]);
        let fn_ty = self.fn_type(vec![mem, cond, target, target]);
        self.alloc_continuation(fn_ty, 4, Intrinsic::Branch)
    }

    /// Match intrinsic over `variant`:
    /// `fn(mem, variant, fn(mem), tuple(variant, fn(mem)) × num_patterns)`.
    pub fn match_on(&mut self, variant: TypeId, num_patterns: usize) -> DefId {
        let mem = self.mem_type();
        let target = self.fn_type(vec![mem]);
        let case = self.tuple_type(vec![variant, target]);

        let mut params = vec![mem, variant, target];
        params.extend(std::iter::repeat(case).take(num_patterns));
        let num_params = params.len();
        let fn_ty = self.fn_type(params);
        self.alloc_continuation(
            fn_ty,
            num_params,
            Intrinsic::Match {
                variant,
                num_patterns,
            },
        )
    }

    /// Allocate a private global.
    pub fn global(&mut self, init: GlobalInit, mutable: bool) -> DefId {
        self.push_def(Def::Global(Global {
            init,
            mutable,
            name: None,
            linkage: Linkage::Private,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_types_are_interned() {
        let mut world = World::new();
        let a = world.intern_type(Type::Prim {
            tag: PrimTag::Qs32,
            lanes: 1,
        });
        let b = world.intern_type(Type::Prim {
            tag: PrimTag::Qs32,
            lanes: 1,
        });
        let c = world.intern_type(Type::Prim {
            tag: PrimTag::Qs32,
            lanes: 4,
        });
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(world.num_types(), 2);
    }

    #[test]
    fn test_nominal_types_are_never_interned() {
        let mut world = World::new();
        let a = world.struct_type("S", 1);
        let b = world.struct_type("S", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_nominal_fields_start_unset() {
        let mut world = World::new();
        let s = world.struct_type("List", 2);
        let nominal = world.nominal_mut(s).unwrap();
        assert_eq!(nominal.fields.len(), 2);
        assert!(!nominal.is_complete());
    }

    #[test]
    fn test_continuation_allocates_params() {
        let mut world = World::new();
        let mem = world.mem_type();
        let i32_ty = world.intern_type(Type::Prim {
            tag: PrimTag::Ps32,
            lanes: 1,
        });
        let fn_ty = world.fn_type(vec![mem, i32_ty]);

        let cont = world.continuation_of(fn_ty).unwrap();
        let params = world.continuation(cont).unwrap().params.clone();
        assert_eq!(params.len(), 2);
        for (index, param) in params.iter().enumerate() {
            assert_eq!(*world.def(*param), Def::Param { cont, index });
        }
        assert!(!world.continuation(cont).unwrap().has_body());
    }

    #[test]
    fn test_continuation_of_non_function_type() {
        let mut world = World::new();
        let mem = world.mem_type();
        assert!(world.continuation_of(mem).is_none());
        assert_eq!(world.num_defs(), 0);
    }

    #[test]
    fn test_branch_signature() {
        let mut world = World::new();
        let branch = world.branch();
        let cont = world.continuation(branch).unwrap().clone();
        assert_eq!(cont.intrinsic, Intrinsic::Branch);
        assert_eq!(cont.params.len(), 4);

        let mem = world.mem_type();
        let target = world.fn_type(vec![mem]);
        assert_eq!(world.fn_params(cont.ty).unwrap()[2], target);
    }

    #[test]
    fn test_match_signature() {
        let mut world = World::new();
        let variant = world.variant_type("Option", 2);
        let matcher = world.match_on(variant, 2);
        let cont = world.continuation(matcher).unwrap().clone();
        assert_eq!(cont.params.len(), 5);
        assert_eq!(
            cont.intrinsic,
            Intrinsic::Match {
                variant,
                num_patterns: 2
            }
        );
        let params = world.fn_params(cont.ty).unwrap().to_vec();
        assert_eq!(params[1], variant);
        assert_eq!(params[3], params[4]);
    }

    #[test]
    fn test_global_starts_private() {
        let mut world = World::new();
        let g = world.global(GlobalInit::Pending, true);
        let global = world.def(g).as_global().unwrap();
        assert_eq!(global.linkage, Linkage::Private);
        assert_eq!(global.init, GlobalInit::Pending);
        assert!(global.mutable);
    }
}
