//! The bound operation tree.
//!
//! Operations live in a flat arena indexed by [`OpId`]; each node carries its
//! resolved type, the exact source span it was bound from, a parent link, and
//! a `quoted` flag for code inside deferred lambda arguments. Rule matchers
//! walk this arena, never the raw syntax tree.

use crate::syntax::{BinaryOp, Span, UnaryOp};

use super::types::{MemberId, TypeId};

/// Handle to an operation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpId(u32);

impl OpId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a local variable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalId(pub(crate) u32);

/// Handle to a function parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(pub(crate) u32);

impl LocalId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ParamId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// `StringComparison` enum members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonKind {
    Ordinal,
    OrdinalIgnoreCase,
    CurrentCulture,
    CurrentCultureIgnoreCase,
    InvariantCulture,
    InvariantCultureIgnoreCase,
}

impl ComparisonKind {
    pub fn name(self) -> &'static str {
        match self {
            ComparisonKind::Ordinal => "Ordinal",
            ComparisonKind::OrdinalIgnoreCase => "OrdinalIgnoreCase",
            ComparisonKind::CurrentCulture => "CurrentCulture",
            ComparisonKind::CurrentCultureIgnoreCase => "CurrentCultureIgnoreCase",
            ComparisonKind::InvariantCulture => "InvariantCulture",
            ComparisonKind::InvariantCultureIgnoreCase => "InvariantCultureIgnoreCase",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Ordinal" => Some(ComparisonKind::Ordinal),
            "OrdinalIgnoreCase" => Some(ComparisonKind::OrdinalIgnoreCase),
            "CurrentCulture" => Some(ComparisonKind::CurrentCulture),
            "CurrentCultureIgnoreCase" => Some(ComparisonKind::CurrentCultureIgnoreCase),
            "InvariantCulture" => Some(ComparisonKind::InvariantCulture),
            "InvariantCultureIgnoreCase" => Some(ComparisonKind::InvariantCultureIgnoreCase),
            _ => None,
        }
    }
}

/// A compile-time constant.
///
/// Floats are stored as raw bit patterns so that `-0.0` keeps its sign and
/// NaN payloads survive; equality on this enum is bit equality, which is what
/// default-value matching wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstValue {
    Int(i64),
    Long(i64),
    Float(u32),
    Double(u64),
    Str(String),
    Char(char),
    Bool(bool),
    Null,
    Comparison(ComparisonKind),
}

impl ConstValue {
    pub fn float(value: f32) -> Self {
        ConstValue::Float(value.to_bits())
    }

    pub fn double(value: f64) -> Self {
        ConstValue::Double(value.to_bits())
    }

    /// Integral value when this constant is `int` or `long`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ConstValue::Int(v) | ConstValue::Long(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum OpKind {
    Literal {
        value: ConstValue,
    },
    /// `default` / `default(T)`; the node's type says which default.
    DefaultValue,
    ObjectCreation {
        args: Vec<OpId>,
    },
    LocalRef {
        local: LocalId,
    },
    ParamRef {
        param: ParamId,
    },
    /// Implicit conversion inserted by the binder; span equals the operand's.
    Conversion {
        operand: OpId,
    },
    Invocation {
        method: MemberId,
        receiver: Option<OpId>,
        args: Vec<OpId>,
        /// Extension call written instance-style (`xs.Any()`); false for the
        /// equivalent static form (`Seq.Any(xs)`).
        reduced: bool,
    },
    /// Call to another function declared in the same file.
    UserCall {
        function: usize,
        args: Vec<OpId>,
    },
    PropertyRef {
        property: MemberId,
        receiver: OpId,
    },
    IndexRef {
        member: MemberId,
        receiver: OpId,
        index: OpId,
    },
    Binary {
        op: BinaryOp,
        lhs: OpId,
        rhs: OpId,
    },
    Unary {
        op: UnaryOp,
        operand: OpId,
    },
    Assignment {
        target: OpId,
        value: OpId,
    },
    /// `if` statement or ternary expression.
    Conditional {
        cond: OpId,
        when_true: OpId,
        when_false: Option<OpId>,
        is_statement: bool,
    },
    Loop {
        cond: OpId,
        body: OpId,
    },
    Block {
        stmts: Vec<OpId>,
    },
    ExpressionStatement {
        expr: OpId,
    },
    LocalDecl {
        local: LocalId,
        init: Option<OpId>,
    },
    Return {
        value: Option<OpId>,
    },
    Lambda {
        param: LocalId,
        body: OpId,
    },
}

#[derive(Debug, Clone)]
pub struct OpNode {
    pub kind: OpKind,
    pub ty: TypeId,
    pub span: Span,
    pub parent: Option<OpId>,
    /// Inside a deferred lambda argument; rewrites must not touch quoted code.
    pub quoted: bool,
}

#[derive(Debug, Default)]
pub struct OpArena {
    nodes: Vec<OpNode>,
}

impl OpArena {
    pub fn new() -> Self {
        OpArena { nodes: Vec::new() }
    }

    pub fn push(&mut self, node: OpNode) -> OpId {
        let id = OpId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: OpId) -> &OpNode {
        &self.nodes[id.index()]
    }

    pub(crate) fn set_parent(&mut self, child: OpId, parent: OpId) {
        self.nodes[child.index()].parent = Some(parent);
    }

    pub(crate) fn set_span(&mut self, id: OpId, span: Span) {
        self.nodes[id.index()].span = span;
    }

    pub(crate) fn node_mut(&mut self, id: OpId) -> &mut OpNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OpId, &OpNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (OpId(i as u32), node))
    }
}

impl std::ops::Index<OpId> for OpArena {
    type Output = OpNode;

    fn index(&self, id: OpId) -> &OpNode {
        self.get(id)
    }
}
