//! Semantic model: binding, types, and the operation tree.
//!
//! [`compile`] takes Opal source and produces a [`Compilation`]: the syntax
//! tree plus a typed operation tree with resolved library members. Rules read
//! the compilation; nothing here mutates source text.

pub mod bind;
pub mod ops;
pub mod types;
pub mod well_known;

use std::sync::OnceLock;

use crate::syntax::{self, ParseError, Span};

pub use ops::{ComparisonKind, ConstValue, LocalId, OpArena, OpId, OpKind, OpNode, ParamId};
pub use types::{Ctor, MemberId, MemberKind, Profile, SizeProp, TypeId, TypeKind, TypeTable};
pub use well_known::{WellKnown, WellKnownSymbols};

/// Modules brought in by `use` declarations. The `core` module is implicit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Imports {
    pub collections: bool,
    pub spans: bool,
}

/// A function with a bound body.
#[derive(Debug)]
pub struct BoundFunction {
    pub name: String,
    pub name_span: Span,
    pub params: Vec<ParamId>,
    pub ret: TypeId,
    pub body: OpId,
}

#[derive(Debug)]
pub struct LocalInfo {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Debug)]
pub struct ParamInfo {
    pub name: String,
    pub ty: TypeId,
}

/// Everything the analysis knows about one source file.
#[derive(Debug)]
pub struct Compilation {
    pub profile: Profile,
    pub imports: Imports,
    pub tree: syntax::SourceFile,
    pub types: TypeTable,
    pub ops: OpArena,
    pub functions: Vec<BoundFunction>,
    pub locals: Vec<LocalInfo>,
    pub params: Vec<ParamInfo>,
    well_known: OnceLock<WellKnownSymbols>,
}

impl Compilation {
    pub fn op(&self, id: OpId) -> &OpNode {
        self.ops.get(id)
    }

    pub fn parent(&self, id: OpId) -> Option<OpId> {
        self.ops.get(id).parent
    }

    pub fn parent_op(&self, id: OpId) -> Option<(OpId, &OpNode)> {
        let parent = self.ops.get(id).parent?;
        Some((parent, self.ops.get(parent)))
    }

    /// Peel implicit conversion wrappers off `id`.
    pub fn strip_conversions(&self, mut id: OpId) -> OpId {
        while let OpKind::Conversion { operand } = self.ops.get(id).kind {
            id = operand;
        }
        id
    }

    /// Well-known library symbols, resolved once per compilation.
    pub fn well_known(&self) -> &WellKnownSymbols {
        self.well_known
            .get_or_init(|| WellKnownSymbols::resolve(self.profile))
    }

    /// First operation with exactly this span satisfying `pred`.
    ///
    /// Conversion wrappers share their operand's span, so callers pass a
    /// shape predicate to land on the node they mean.
    pub fn find_op(&self, span: Span, pred: impl Fn(&OpNode) -> bool) -> Option<OpId> {
        self.ops
            .iter()
            .find(|(_, node)| node.span == span && pred(node))
            .map(|(id, _)| id)
    }

    /// Source text under an operation.
    pub fn op_text<'a>(&self, source: &'a str, id: OpId) -> &'a str {
        self.ops.get(id).span.text(source)
    }
}

/// Parse and bind one Opal source file.
///
/// Bind failures surface as [`ParseError`] with the offending offset; callers
/// treat them the same as syntax errors.
pub fn compile(source: &str, profile: Profile) -> Result<Compilation, ParseError> {
    let tree = syntax::parse(source)?;
    bind::bind(tree, profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_minimal_file() {
        let comp = compile("void Main() { return; }", Profile::Modern).unwrap();
        assert_eq!(comp.functions.len(), 1);
        assert_eq!(comp.functions[0].name, "Main");
    }

    #[test]
    fn test_strip_conversions_passthrough() {
        let comp = compile("long F(int n) { return n; }", Profile::Modern).unwrap();
        // Find the converted return operand: a ParamRef under a Conversion.
        let conv = comp
            .ops
            .iter()
            .find(|(_, node)| matches!(node.kind, OpKind::Conversion { .. }))
            .map(|(id, _)| id)
            .unwrap();
        let inner = comp.strip_conversions(conv);
        assert!(matches!(comp.op(inner).kind, OpKind::ParamRef { .. }));
        assert_eq!(comp.op(conv).span, comp.op(inner).span);
    }

    #[test]
    fn test_well_known_cached_per_compilation() {
        let comp = compile("void Main() { }", Profile::Legacy).unwrap();
        let a = comp.well_known() as *const _;
        let b = comp.well_known() as *const _;
        assert_eq!(a, b);
    }
}
