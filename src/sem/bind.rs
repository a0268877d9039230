//! Binder: resolves names and library members over the syntax tree and
//! produces the typed operation tree.
//!
//! Binding is strict and aborts on the first error, the same contract the
//! parser has. Implicit conversions become explicit [`OpKind::Conversion`]
//! nodes spanning exactly their operand; parenthesized expressions widen the
//! inner operation's span to cover the parentheses, so lifting an operation's
//! text always lifts the parens with it.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::syntax::{
    BinaryOp, Block, CallExpr, Expr, LambdaExpr, LitKind, MemberExpr, ParseError, Span, Stmt,
    TypeRef, UnaryOp,
};

use super::ops::{ComparisonKind, ConstValue, LocalId, OpArena, OpId, OpKind, OpNode, ParamId};
use super::types::{MemberId, MemberKind, Overload, Profile, TypeId, TypeTable};
use super::{BoundFunction, Compilation, Imports, LocalInfo, ParamInfo};

pub(crate) fn bind(
    tree: crate::syntax::SourceFile,
    profile: Profile,
) -> Result<Compilation, ParseError> {
    let mut imports = Imports::default();
    for use_decl in &tree.uses {
        match use_decl.module.as_str() {
            "core" => {}
            "collections" => imports.collections = true,
            "spans" => {
                if profile != Profile::Modern {
                    return Err(ParseError::new(
                        format!(
                            "module 'spans' is not available with profile '{}'",
                            profile.name()
                        ),
                        use_decl.span.start,
                    ));
                }
                imports.spans = true;
            }
            other => {
                return Err(ParseError::new(
                    format!("unknown module '{other}'"),
                    use_decl.span.start,
                ))
            }
        }
    }

    let mut binder = Binder {
        profile,
        imports,
        types: TypeTable::new(),
        ops: OpArena::new(),
        locals: Vec::new(),
        params: Vec::new(),
        scopes: Vec::new(),
        signatures: Vec::new(),
        quote_depth: 0,
        current_ret: TypeTable::VOID,
    };

    // Signatures first so functions can call each other regardless of order.
    for function in &tree.functions {
        let ret = binder.resolve_type(&function.ret)?;
        let mut params = Vec::with_capacity(function.params.len());
        for param in &function.params {
            params.push(binder.resolve_type(&param.ty)?);
        }
        binder.signatures.push(FnSig {
            name: function.name.clone(),
            params,
            ret,
        });
    }

    let mut functions = Vec::with_capacity(tree.functions.len());
    for (index, function) in tree.functions.iter().enumerate() {
        functions.push(binder.bind_function(index, function)?);
    }

    Ok(Compilation {
        profile,
        imports,
        tree,
        types: binder.types,
        ops: binder.ops,
        functions,
        locals: binder.locals,
        params: binder.params,
        well_known: OnceLock::new(),
    })
}

struct FnSig {
    name: String,
    params: Vec<TypeId>,
    ret: TypeId,
}

#[derive(Clone, Copy)]
enum NameRef {
    Local(LocalId),
    Param(ParamId),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum StaticName {
    Comparison,
    Float,
    Double,
    Seq,
}

/// Call argument held back until an overload is chosen.
enum Delayed<'e> {
    Bound(OpId),
    Lambda(&'e LambdaExpr),
    Default(Span),
}

struct Binder {
    profile: Profile,
    imports: Imports,
    types: TypeTable,
    ops: OpArena,
    locals: Vec<LocalInfo>,
    params: Vec<ParamInfo>,
    scopes: Vec<HashMap<String, NameRef>>,
    signatures: Vec<FnSig>,
    quote_depth: usize,
    current_ret: TypeId,
}

impl Binder {
    fn alloc(&mut self, kind: OpKind, ty: TypeId, span: Span) -> OpId {
        self.ops.push(OpNode {
            kind,
            ty,
            span,
            parent: None,
            quoted: self.quote_depth > 0,
        })
    }

    fn adopt(&mut self, parent: OpId, children: &[OpId]) {
        for &child in children {
            self.ops.set_parent(child, parent);
        }
    }

    fn err(message: impl Into<String>, span: Span) -> ParseError {
        ParseError::new(message, span.start)
    }

    fn lookup(&self, name: &str) -> Option<NameRef> {
        self.scopes.iter().rev().find_map(|s| s.get(name).copied())
    }

    fn declare_local(&mut self, name: &str, ty: TypeId) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(LocalInfo {
            name: name.to_string(),
            ty,
        });
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), NameRef::Local(id));
        }
        id
    }

    fn resolve_type(&mut self, tref: &TypeRef) -> Result<TypeId, ParseError> {
        let mut args = Vec::with_capacity(tref.args.len());
        for arg in &tref.args {
            args.push(self.resolve_type(arg)?);
        }
        self.types
            .resolve_named(&tref.name, args, self.profile, self.imports)
            .ok_or_else(|| Self::err(format!("unknown type '{}'", tref.name), tref.span))
    }

    fn wrap_conversion(&mut self, id: OpId, target: TypeId) -> OpId {
        let span = self.ops.get(id).span;
        let conv = self.alloc(OpKind::Conversion { operand: id }, target, span);
        self.ops.set_parent(id, conv);
        conv
    }

    /// Apply an implicit conversion to `target`, or fail.
    fn coerce(&mut self, id: OpId, target: TypeId) -> Result<OpId, ParseError> {
        let ty = self.ops.get(id).ty;
        if ty == target {
            return Ok(id);
        }
        if self.types.converts(ty, target) {
            return Ok(self.wrap_conversion(id, target));
        }
        let span = self.ops.get(id).span;
        Err(Self::err(
            format!(
                "cannot convert '{}' to '{}'",
                self.types.display(ty),
                self.types.display(target)
            ),
            span,
        ))
    }

    /// Bring two operands to a common type, converting one side if needed.
    fn balance(&mut self, lhs: OpId, rhs: OpId, span: Span) -> Result<(OpId, OpId, TypeId), ParseError> {
        let lt = self.ops.get(lhs).ty;
        let rt = self.ops.get(rhs).ty;
        if lt == rt {
            return Ok((lhs, rhs, lt));
        }
        if self.types.converts(lt, rt) {
            let lhs = self.wrap_conversion(lhs, rt);
            return Ok((lhs, rhs, rt));
        }
        if self.types.converts(rt, lt) {
            let rhs = self.wrap_conversion(rhs, lt);
            return Ok((lhs, rhs, lt));
        }
        Err(Self::err(
            format!(
                "operands have incompatible types '{}' and '{}'",
                self.types.display(lt),
                self.types.display(rt)
            ),
            span,
        ))
    }

    fn require_bool(&self, id: OpId, span: Span) -> Result<(), ParseError> {
        if self.ops.get(id).ty != TypeTable::BOOL {
            return Err(Self::err("condition must be 'bool'", span));
        }
        Ok(())
    }

    fn bind_function(
        &mut self,
        index: usize,
        function: &crate::syntax::Function,
    ) -> Result<BoundFunction, ParseError> {
        let ret = self.signatures[index].ret;
        self.current_ret = ret;
        self.scopes.push(HashMap::new());
        let mut param_ids = Vec::with_capacity(function.params.len());
        for (slot, param) in function.params.iter().enumerate() {
            let ty = self.signatures[index].params[slot];
            let id = ParamId(self.params.len() as u32);
            self.params.push(ParamInfo {
                name: param.name.clone(),
                ty,
            });
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(param.name.clone(), NameRef::Param(id));
            }
            param_ids.push(id);
        }
        let body = self.bind_block(&function.body)?;
        self.scopes.pop();
        Ok(BoundFunction {
            name: function.name.clone(),
            name_span: function.name_span,
            params: param_ids,
            ret,
            body,
        })
    }

    fn bind_block(&mut self, block: &Block) -> Result<OpId, ParseError> {
        self.scopes.push(HashMap::new());
        let mut stmts = Vec::with_capacity(block.stmts.len());
        for stmt in &block.stmts {
            stmts.push(self.bind_stmt(stmt)?);
        }
        self.scopes.pop();
        let op = self.alloc(OpKind::Block { stmts: stmts.clone() }, TypeTable::VOID, block.span);
        self.adopt(op, &stmts);
        Ok(op)
    }

    fn bind_stmt(&mut self, stmt: &Stmt) -> Result<OpId, ParseError> {
        match stmt {
            Stmt::Local(local) => {
                let (ty, init) = match (&local.ty, &local.init) {
                    (Some(tref), init) => {
                        let declared = self.resolve_type(tref)?;
                        let init = match init {
                            Some(expr) => {
                                let bound = self.bind_expr_expect(expr, Some(declared))?;
                                Some(self.coerce(bound, declared)?)
                            }
                            None => None,
                        };
                        (declared, init)
                    }
                    (None, Some(expr)) => {
                        let bound = self.bind_expr(expr)?;
                        let ty = self.ops.get(bound).ty;
                        if ty == TypeTable::NULL {
                            return Err(Self::err(
                                "cannot infer a type for 'null'",
                                expr.span(),
                            ));
                        }
                        if ty == TypeTable::LAMBDA {
                            return Err(Self::err(
                                "a lambda is only valid as a call argument",
                                expr.span(),
                            ));
                        }
                        if ty == TypeTable::VOID {
                            return Err(Self::err(
                                "cannot store an expression of type 'void'",
                                expr.span(),
                            ));
                        }
                        (ty, Some(bound))
                    }
                    // The parser requires an initializer on `var`.
                    (None, None) => unreachable!(),
                };
                let id = self.declare_local(&local.name, ty);
                let op = self.alloc(
                    OpKind::LocalDecl { local: id, init },
                    TypeTable::VOID,
                    local.span,
                );
                if let Some(init) = init {
                    self.adopt(op, &[init]);
                }
                Ok(op)
            }
            Stmt::Expr(stmt) => {
                let expr = self.bind_expr(&stmt.expr)?;
                let op = self.alloc(
                    OpKind::ExpressionStatement { expr },
                    TypeTable::VOID,
                    stmt.span,
                );
                self.adopt(op, &[expr]);
                Ok(op)
            }
            Stmt::If(stmt) => {
                let cond = self.bind_expr(&stmt.cond)?;
                self.require_bool(cond, stmt.cond.span())?;
                let when_true = self.bind_stmt(&stmt.then_branch)?;
                let when_false = match &stmt.else_branch {
                    Some(branch) => Some(self.bind_stmt(branch)?),
                    None => None,
                };
                let op = self.alloc(
                    OpKind::Conditional {
                        cond,
                        when_true,
                        when_false,
                        is_statement: true,
                    },
                    TypeTable::VOID,
                    stmt.span,
                );
                self.adopt(op, &[cond, when_true]);
                if let Some(when_false) = when_false {
                    self.adopt(op, &[when_false]);
                }
                Ok(op)
            }
            Stmt::While(stmt) => {
                let cond = self.bind_expr(&stmt.cond)?;
                self.require_bool(cond, stmt.cond.span())?;
                let body = self.bind_stmt(&stmt.body)?;
                let op = self.alloc(OpKind::Loop { cond, body }, TypeTable::VOID, stmt.span);
                self.adopt(op, &[cond, body]);
                Ok(op)
            }
            Stmt::Return(stmt) => {
                let value = match &stmt.value {
                    Some(expr) => {
                        if self.current_ret == TypeTable::VOID {
                            return Err(Self::err(
                                "cannot return a value from a 'void' function",
                                expr.span(),
                            ));
                        }
                        let bound = self.bind_expr_expect(expr, Some(self.current_ret))?;
                        Some(self.coerce(bound, self.current_ret)?)
                    }
                    None => None,
                };
                let op = self.alloc(OpKind::Return { value }, TypeTable::VOID, stmt.span);
                if let Some(value) = value {
                    self.adopt(op, &[value]);
                }
                Ok(op)
            }
            Stmt::Block(block) => self.bind_block(block),
        }
    }

    fn bind_expr(&mut self, expr: &Expr) -> Result<OpId, ParseError> {
        self.bind_expr_expect(expr, None)
    }

    fn bind_expr_expect(
        &mut self,
        expr: &Expr,
        expected: Option<TypeId>,
    ) -> Result<OpId, ParseError> {
        match expr {
            Expr::Lit(lit) => {
                let (value, ty) = match &lit.kind {
                    LitKind::Int(v) => (ConstValue::Int(*v), TypeTable::INT),
                    LitKind::Long(v) => (ConstValue::Long(*v), TypeTable::LONG),
                    LitKind::Float(v) => (ConstValue::float(*v), TypeTable::FLOAT),
                    LitKind::Double(v) => (ConstValue::double(*v), TypeTable::DOUBLE),
                    LitKind::Str(v) => (ConstValue::Str(v.clone()), TypeTable::STR),
                    LitKind::Char(v) => (ConstValue::Char(*v), TypeTable::CHAR),
                    LitKind::Bool(v) => (ConstValue::Bool(*v), TypeTable::BOOL),
                    LitKind::Null => (ConstValue::Null, TypeTable::NULL),
                };
                Ok(self.alloc(OpKind::Literal { value }, ty, lit.span))
            }
            Expr::Ident(ident) => match self.lookup(&ident.name) {
                Some(NameRef::Local(local)) => {
                    let ty = self.locals[local.index()].ty;
                    Ok(self.alloc(OpKind::LocalRef { local }, ty, ident.span))
                }
                Some(NameRef::Param(param)) => {
                    let ty = self.params[param.index()].ty;
                    Ok(self.alloc(OpKind::ParamRef { param }, ty, ident.span))
                }
                None => Err(Self::err(
                    format!("unknown name '{}'", ident.name),
                    ident.span,
                )),
            },
            Expr::Member(member) => self.bind_member(member),
            Expr::Call(call) => self.bind_call(call),
            Expr::Index(index) => {
                let receiver = self.bind_expr(&index.recv)?;
                let recv_ty = self.ops.get(receiver).ty;
                let Some((member, elem)) = self.types.indexer(recv_ty) else {
                    return Err(Self::err(
                        format!("type '{}' cannot be indexed", self.types.display(recv_ty)),
                        index.recv.span(),
                    ));
                };
                let idx = self.bind_expr(&index.index)?;
                let idx = self.coerce(idx, TypeTable::INT)?;
                let op = self.alloc(
                    OpKind::IndexRef {
                        member,
                        receiver,
                        index: idx,
                    },
                    elem,
                    index.span,
                );
                self.adopt(op, &[receiver, idx]);
                Ok(op)
            }
            Expr::Unary(unary) => {
                let operand = self.bind_expr(&unary.operand)?;
                match unary.op {
                    UnaryOp::Not => {
                        self.require_bool(operand, unary.operand.span())?;
                        let op = self.alloc(
                            OpKind::Unary {
                                op: UnaryOp::Not,
                                operand,
                            },
                            TypeTable::BOOL,
                            unary.span,
                        );
                        self.adopt(op, &[operand]);
                        Ok(op)
                    }
                    UnaryOp::Neg => {
                        let ty = self.ops.get(operand).ty;
                        if !self.types.is_numeric(ty) {
                            return Err(Self::err(
                                "unary '-' requires a numeric operand",
                                unary.operand.span(),
                            ));
                        }
                        // Fold `-literal` into a single constant so sign bits
                        // (notably -0.0) are visible to matchers.
                        if let OpKind::Literal { value } = &self.ops.get(operand).kind {
                            let folded = match value {
                                ConstValue::Int(v) => Some(ConstValue::Int(v.wrapping_neg())),
                                ConstValue::Long(v) => Some(ConstValue::Long(v.wrapping_neg())),
                                ConstValue::Float(bits) => {
                                    Some(ConstValue::float(-f32::from_bits(*bits)))
                                }
                                ConstValue::Double(bits) => {
                                    Some(ConstValue::double(-f64::from_bits(*bits)))
                                }
                                _ => None,
                            };
                            if let Some(folded) = folded {
                                let node = self.ops.node_mut(operand);
                                node.kind = OpKind::Literal { value: folded };
                                node.span = unary.span;
                                return Ok(operand);
                            }
                        }
                        let op = self.alloc(
                            OpKind::Unary {
                                op: UnaryOp::Neg,
                                operand,
                            },
                            ty,
                            unary.span,
                        );
                        self.adopt(op, &[operand]);
                        Ok(op)
                    }
                }
            }
            Expr::Binary(binary) => self.bind_binary(binary),
            Expr::Assign(assign) => {
                let target = self.bind_expr(&assign.target)?;
                if !matches!(
                    self.ops.get(target).kind,
                    OpKind::LocalRef { .. } | OpKind::ParamRef { .. } | OpKind::IndexRef { .. }
                ) {
                    return Err(Self::err(
                        "invalid assignment target",
                        assign.target.span(),
                    ));
                }
                let target_ty = self.ops.get(target).ty;
                let value = self.bind_expr_expect(&assign.value, Some(target_ty))?;
                let value = self.coerce(value, target_ty)?;
                let op = self.alloc(
                    OpKind::Assignment { target, value },
                    target_ty,
                    assign.span,
                );
                self.adopt(op, &[target, value]);
                Ok(op)
            }
            Expr::Ternary(ternary) => {
                let cond = self.bind_expr(&ternary.cond)?;
                self.require_bool(cond, ternary.cond.span())?;
                let when_true = self.bind_expr_expect(&ternary.when_true, expected)?;
                let when_false = self.bind_expr_expect(&ternary.when_false, expected)?;
                let (when_true, when_false, ty) =
                    self.merge_arms(when_true, when_false, ternary.span)?;
                let op = self.alloc(
                    OpKind::Conditional {
                        cond,
                        when_true,
                        when_false: Some(when_false),
                        is_statement: false,
                    },
                    ty,
                    ternary.span,
                );
                self.adopt(op, &[cond, when_true, when_false]);
                Ok(op)
            }
            Expr::Lambda(lambda) => Err(Self::err(
                "a lambda is only valid as an argument to a deferred method",
                lambda.span,
            )),
            Expr::Paren(paren) => {
                let inner = self.bind_expr_expect(&paren.inner, expected)?;
                // Widen so lifting this operation's text includes the parens.
                self.ops.set_span(inner, paren.span);
                Ok(inner)
            }
            Expr::New(new) => {
                let ty = self.resolve_type(&new.ty)?;
                if !new.args.is_empty() {
                    return Err(Self::err(
                        "constructor arguments are not supported",
                        new.args_span,
                    ));
                }
                Ok(self.alloc(OpKind::ObjectCreation { args: Vec::new() }, ty, new.span))
            }
            Expr::Default(default) => {
                let ty = match (&default.ty, expected) {
                    (Some(tref), _) => self.resolve_type(tref)?,
                    (None, Some(expected)) => expected,
                    (None, None) => {
                        return Err(Self::err(
                            "cannot infer a type for 'default' here",
                            default.span,
                        ))
                    }
                };
                Ok(self.alloc(OpKind::DefaultValue, ty, default.span))
            }
        }
    }

    /// Merge ternary arm types: identical, numeric-balanced, or null against
    /// a reference type.
    fn merge_arms(
        &mut self,
        when_true: OpId,
        when_false: OpId,
        span: Span,
    ) -> Result<(OpId, OpId, TypeId), ParseError> {
        let tt = self.ops.get(when_true).ty;
        let ft = self.ops.get(when_false).ty;
        if tt == ft {
            return Ok((when_true, when_false, tt));
        }
        if self.types.is_numeric(tt) && self.types.is_numeric(ft) {
            return self.balance(when_true, when_false, span);
        }
        if tt == TypeTable::NULL && self.types.is_reference_type(ft) {
            let when_true = self.wrap_conversion(when_true, ft);
            return Ok((when_true, when_false, ft));
        }
        if ft == TypeTable::NULL && self.types.is_reference_type(tt) {
            let when_false = self.wrap_conversion(when_false, tt);
            return Ok((when_true, when_false, tt));
        }
        Err(Self::err(
            format!(
                "ternary arms have incompatible types '{}' and '{}'",
                self.types.display(tt),
                self.types.display(ft)
            ),
            span,
        ))
    }

    fn bind_binary(&mut self, binary: &crate::syntax::BinaryExpr) -> Result<OpId, ParseError> {
        let lhs = self.bind_expr(&binary.lhs)?;
        let rhs = self.bind_expr(&binary.rhs)?;
        let lt = self.ops.get(lhs).ty;
        let rt = self.ops.get(rhs).ty;

        let (lhs, rhs, ty) = match binary.op {
            BinaryOp::And | BinaryOp::Or => {
                self.require_bool(lhs, binary.lhs.span())?;
                self.require_bool(rhs, binary.rhs.span())?;
                (lhs, rhs, TypeTable::BOOL)
            }
            BinaryOp::Add if lt == TypeTable::STR && rt == TypeTable::STR => {
                (lhs, rhs, TypeTable::STR)
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                if !self.types.is_numeric(lt) || !self.types.is_numeric(rt) {
                    return Err(Self::err(
                        "arithmetic requires numeric operands",
                        binary.span,
                    ));
                }
                self.balance(lhs, rhs, binary.span)?
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if !self.types.is_numeric(lt) || !self.types.is_numeric(rt) {
                    return Err(Self::err(
                        "ordering comparison requires numeric operands",
                        binary.span,
                    ));
                }
                let (lhs, rhs, _) = self.balance(lhs, rhs, binary.span)?;
                (lhs, rhs, TypeTable::BOOL)
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                if self.types.is_numeric(lt) && self.types.is_numeric(rt) {
                    let (lhs, rhs, _) = self.balance(lhs, rhs, binary.span)?;
                    (lhs, rhs, TypeTable::BOOL)
                } else if lt == rt {
                    (lhs, rhs, TypeTable::BOOL)
                } else if lt == TypeTable::NULL && self.types.is_reference_type(rt) {
                    let lhs = self.wrap_conversion(lhs, rt);
                    (lhs, rhs, TypeTable::BOOL)
                } else if rt == TypeTable::NULL && self.types.is_reference_type(lt) {
                    let rhs = self.wrap_conversion(rhs, lt);
                    (lhs, rhs, TypeTable::BOOL)
                } else {
                    return Err(Self::err(
                        format!(
                            "cannot compare '{}' and '{}'",
                            self.types.display(lt),
                            self.types.display(rt)
                        ),
                        binary.span,
                    ));
                }
            }
        };

        let op = self.alloc(
            OpKind::Binary {
                op: binary.op,
                lhs,
                rhs,
            },
            ty,
            binary.span,
        );
        self.adopt(op, &[lhs, rhs]);
        Ok(op)
    }

    /// Receiver idents that name a static surface rather than a value.
    fn static_receiver(&self, expr: &Expr) -> Option<StaticName> {
        let Expr::Ident(ident) = expr else {
            return None;
        };
        if self.lookup(&ident.name).is_some() {
            return None;
        }
        match ident.name.as_str() {
            "StringComparison" => Some(StaticName::Comparison),
            "float" => Some(StaticName::Float),
            "double" => Some(StaticName::Double),
            "Seq" if self.imports.collections => Some(StaticName::Seq),
            _ => None,
        }
    }

    fn bind_member(&mut self, member: &MemberExpr) -> Result<OpId, ParseError> {
        if let Some(name) = self.static_receiver(&member.recv) {
            return match name {
                StaticName::Comparison => match ComparisonKind::from_name(&member.name) {
                    Some(kind) => Ok(self.alloc(
                        OpKind::Literal {
                            value: ConstValue::Comparison(kind),
                        },
                        TypeTable::COMPARISON,
                        member.span,
                    )),
                    None => Err(Self::err(
                        format!("'StringComparison' has no member '{}'", member.name),
                        member.name_span,
                    )),
                },
                StaticName::Float => match member.name.as_str() {
                    "NaN" => Ok(self.alloc(
                        OpKind::Literal {
                            value: ConstValue::float(f32::NAN),
                        },
                        TypeTable::FLOAT,
                        member.span,
                    )),
                    _ => Err(Self::err(
                        format!("'float' has no member '{}'", member.name),
                        member.name_span,
                    )),
                },
                StaticName::Double => match member.name.as_str() {
                    "NaN" => Ok(self.alloc(
                        OpKind::Literal {
                            value: ConstValue::double(f64::NAN),
                        },
                        TypeTable::DOUBLE,
                        member.span,
                    )),
                    _ => Err(Self::err(
                        format!("'double' has no member '{}'", member.name),
                        member.name_span,
                    )),
                },
                StaticName::Seq => Err(Self::err(
                    format!("'Seq.{}' is a method and must be called", member.name),
                    member.span,
                )),
            };
        }

        let receiver = self.bind_expr(&member.recv)?;
        let recv_ty = self.ops.get(receiver).ty;
        let members = self
            .types
            .instance_members(recv_ty, &member.name, self.profile);
        if let Some(prop) = members.iter().find(|o| o.kind == MemberKind::Property) {
            let op = self.alloc(
                OpKind::PropertyRef {
                    property: prop.member,
                    receiver,
                },
                prop.ret,
                member.span,
            );
            self.adopt(op, &[receiver]);
            return Ok(op);
        }
        let has_method = !members.is_empty()
            || !self
                .types
                .extension_members(recv_ty, &member.name, self.profile, self.imports)
                .is_empty();
        if has_method {
            return Err(Self::err(
                format!("'{}' is a method; call it with ()", member.name),
                member.span,
            ));
        }
        Err(Self::err(
            format!(
                "type '{}' has no member '{}'",
                self.types.display(recv_ty),
                member.name
            ),
            member.name_span,
        ))
    }

    fn bind_call(&mut self, call: &CallExpr) -> Result<OpId, ParseError> {
        match &call.callee {
            Expr::Ident(ident) => {
                if self.lookup(&ident.name).is_some() {
                    return Err(Self::err(
                        format!("'{}' is not callable", ident.name),
                        ident.span,
                    ));
                }
                let Some(index) = self
                    .signatures
                    .iter()
                    .position(|sig| sig.name == ident.name)
                else {
                    return Err(Self::err(
                        format!("unknown function '{}'", ident.name),
                        ident.span,
                    ));
                };
                let arity = self.signatures[index].params.len();
                if call.args.len() != arity {
                    return Err(Self::err(
                        format!(
                            "'{}' takes {} argument(s), got {}",
                            ident.name,
                            arity,
                            call.args.len()
                        ),
                        call.args_span,
                    ));
                }
                let mut args = Vec::with_capacity(call.args.len());
                for (slot, arg) in call.args.iter().enumerate() {
                    let param_ty = self.signatures[index].params[slot];
                    let bound = self.bind_expr_expect(arg, Some(param_ty))?;
                    args.push(self.coerce(bound, param_ty)?);
                }
                let ret = self.signatures[index].ret;
                let op = self.alloc(
                    OpKind::UserCall {
                        function: index,
                        args: args.clone(),
                    },
                    ret,
                    call.span,
                );
                self.adopt(op, &args);
                Ok(op)
            }
            Expr::Member(member) => {
                if let Some(name) = self.static_receiver(&member.recv) {
                    return self.bind_static_call(name, member, call);
                }
                let receiver = self.bind_expr(&member.recv)?;
                self.bind_method_call(receiver, member, call)
            }
            other => Err(Self::err("this expression is not callable", other.span())),
        }
    }

    fn bind_static_call(
        &mut self,
        name: StaticName,
        member: &MemberExpr,
        call: &CallExpr,
    ) -> Result<OpId, ParseError> {
        if name != StaticName::Seq {
            return Err(Self::err(
                format!("'{}' is not a method", member.name),
                member.span,
            ));
        }
        let method = match member.name.as_str() {
            "Any" => MemberId::SeqAny,
            "Count" => MemberId::SeqCount,
            other => {
                return Err(Self::err(
                    format!("'Seq' has no method '{other}'"),
                    member.name_span,
                ))
            }
        };
        if call.args.len() != 1 {
            return Err(Self::err(
                format!("'Seq.{}' takes exactly one argument", member.name),
                call.args_span,
            ));
        }
        let arg = self.bind_expr(&call.args[0])?;
        let arg_ty = self.ops.get(arg).ty;
        let Some(elem) = self.types.seq_element(arg_ty) else {
            return Err(Self::err(
                format!("'{}' is not a sequence", self.types.display(arg_ty)),
                call.args[0].span(),
            ));
        };
        let seq_ty = self.types.generic(super::Ctor::Seq, vec![elem]);
        let arg = self.coerce(arg, seq_ty)?;
        let ret = match method {
            MemberId::SeqAny => TypeTable::BOOL,
            _ => TypeTable::INT,
        };
        let op = self.alloc(
            OpKind::Invocation {
                method,
                receiver: None,
                args: vec![arg],
                reduced: false,
            },
            ret,
            call.span,
        );
        self.adopt(op, &[arg]);
        Ok(op)
    }

    fn bind_method_call(
        &mut self,
        receiver: OpId,
        member: &MemberExpr,
        call: &CallExpr,
    ) -> Result<OpId, ParseError> {
        let recv_ty = self.ops.get(receiver).ty;
        let mut overloads: Vec<Overload> = self
            .types
            .instance_members(recv_ty, &member.name, self.profile)
            .into_iter()
            .filter(|o| o.kind == MemberKind::Method)
            .collect();
        let had_property = self
            .types
            .instance_members(recv_ty, &member.name, self.profile)
            .iter()
            .any(|o| o.kind == MemberKind::Property);
        overloads.extend(self.types.extension_members(
            recv_ty,
            &member.name,
            self.profile,
            self.imports,
        ));
        if overloads.is_empty() {
            if had_property {
                return Err(Self::err(
                    format!("'{}' is a property, not a method", member.name),
                    member.span,
                ));
            }
            return Err(Self::err(
                format!(
                    "type '{}' has no method '{}'",
                    self.types.display(recv_ty),
                    member.name
                ),
                member.name_span,
            ));
        }

        // Bind eagerly except lambdas and bare `default`, which need the
        // chosen parameter type.
        let mut delayed = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            let slot = match arg {
                Expr::Lambda(lambda) => Delayed::Lambda(lambda),
                Expr::Default(d) if d.ty.is_none() => Delayed::Default(d.span),
                other => Delayed::Bound(self.bind_expr(other)?),
            };
            delayed.push(slot);
        }

        let Some(choice) = self.choose_overload(&overloads, &delayed) else {
            return Err(Self::err(
                format!("no overload of '{}' matches these arguments", member.name),
                call.span,
            ));
        };
        let overload = overloads[choice].clone();

        let mut args = Vec::with_capacity(delayed.len());
        for (slot, arg) in delayed.into_iter().enumerate() {
            let param_ty = overload.params[slot];
            let bound = match arg {
                Delayed::Bound(id) => self.coerce(id, param_ty)?,
                Delayed::Default(span) => self.alloc(OpKind::DefaultValue, param_ty, span),
                Delayed::Lambda(lambda) => {
                    let elem = self.types.seq_element(recv_ty).unwrap_or(TypeTable::ERROR);
                    self.bind_lambda(lambda, elem, overload.deferred)?
                }
            };
            args.push(bound);
        }

        let (final_receiver, reduced) = if overload.is_extension {
            let receiver = match overload.member {
                MemberId::SeqAny | MemberId::SeqCount => {
                    let elem = match self.types.seq_element(recv_ty) {
                        Some(elem) => elem,
                        // seq_element held during extension lookup
                        None => unreachable!(),
                    };
                    let seq_ty = self.types.generic(super::Ctor::Seq, vec![elem]);
                    self.coerce(receiver, seq_ty)?
                }
                _ => receiver,
            };
            (Some(receiver), true)
        } else {
            (Some(receiver), false)
        };

        let op = self.alloc(
            OpKind::Invocation {
                method: overload.member,
                receiver: final_receiver,
                args: args.clone(),
                reduced,
            },
            overload.ret,
            call.span,
        );
        if let Some(receiver) = final_receiver {
            self.adopt(op, &[receiver]);
        }
        self.adopt(op, &args);
        Ok(op)
    }

    /// Best-scoring candidate index: exact matches beat conversions, ties go
    /// to declaration order.
    fn choose_overload(&mut self, overloads: &[Overload], args: &[Delayed]) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (index, overload) in overloads.iter().enumerate() {
            let Some(score) = self.score_overload(overload, args) else {
                continue;
            };
            match best {
                Some((_, best_score)) if best_score >= score => {}
                _ => best = Some((index, score)),
            }
        }
        best.map(|(index, _)| index)
    }

    fn score_overload(&mut self, overload: &Overload, args: &[Delayed]) -> Option<u32> {
        if overload.params.len() != args.len() {
            return None;
        }
        let mut total = 0;
        for (arg, &param) in args.iter().zip(&overload.params) {
            total += match arg {
                Delayed::Bound(id) => {
                    let ty = self.ops.get(*id).ty;
                    if ty == param {
                        2
                    } else if self.types.converts(ty, param) {
                        1
                    } else {
                        return None;
                    }
                }
                Delayed::Lambda(_) => {
                    if param == TypeTable::LAMBDA {
                        2
                    } else {
                        return None;
                    }
                }
                Delayed::Default(_) => 2,
            };
        }
        Some(total)
    }

    fn bind_lambda(
        &mut self,
        lambda: &LambdaExpr,
        param_ty: TypeId,
        deferred: bool,
    ) -> Result<OpId, ParseError> {
        self.scopes.push(HashMap::new());
        let param = self.declare_local(&lambda.param, param_ty);
        if deferred {
            self.quote_depth += 1;
        }
        let body = self.bind_expr(&lambda.body);
        if deferred {
            self.quote_depth -= 1;
        }
        self.scopes.pop();
        let body = body?;
        let op = self.alloc(OpKind::Lambda { param, body }, TypeTable::LAMBDA, lambda.span);
        self.adopt(op, &[body]);
        Ok(op)
    }
}
