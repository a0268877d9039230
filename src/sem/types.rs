//! Type representation and the Opal core-library catalog.
//!
//! Types are interned into a [`TypeTable`] so they compare as small ids.
//! The library surface is code, not data files: member lookup answers
//! questions against the receiver's type kind, gated by the compilation's
//! [`Profile`] so that an older runtime simply lacks certain members.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Interned handle to a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which runtime library surface the analyzed program targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Full surface: spans module, char overloads on string.
    #[default]
    Modern,
    /// No spans module; string lacks the char overloads of
    /// `StartsWith`/`EndsWith`/`Contains` and `IndexOf(char, comparison)`.
    Legacy,
}

impl Profile {
    pub fn name(self) -> &'static str {
        match self {
            Profile::Modern => "modern",
            Profile::Legacy => "legacy",
        }
    }
}

/// Generic library type constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ctor {
    List,
    Dictionary,
    HashSet,
    Vector,
    Seq,
    Query,
    Span,
    ReadOnlySpan,
}

impl Ctor {
    pub fn name(self) -> &'static str {
        match self {
            Ctor::List => "List",
            Ctor::Dictionary => "Dictionary",
            Ctor::HashSet => "HashSet",
            Ctor::Vector => "Vector",
            Ctor::Seq => "Seq",
            Ctor::Query => "Query",
            Ctor::Span => "Span",
            Ctor::ReadOnlySpan => "ReadOnlySpan",
        }
    }

    fn arity(self) -> usize {
        match self {
            Ctor::Dictionary => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Error,
    Void,
    /// Type of the `null` literal before conversion.
    Null,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Char,
    Str,
    /// The `StringComparison` enum.
    Comparison,
    /// Opaque type of a lambda expression.
    Lambda,
    Generic(Ctor, Vec<TypeId>),
}

/// Identity of a library member, stable across compilations.
///
/// Overloads are distinct members: `IndexOf(string)` and `IndexOf(char)` are
/// different identities, which is what rule matchers compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberId {
    StrLength,
    StrIndexer,
    StrAsSpan,
    StrIndexOfStr,
    StrIndexOfStrCmp,
    StrIndexOfStrStart,
    StrIndexOfChar,
    StrIndexOfCharCmp,
    StrIndexOfCharStart,
    StrStartsWithStr,
    StrStartsWithStrCmp,
    StrStartsWithChar,
    StrEndsWithStr,
    StrEndsWithStrCmp,
    StrEndsWithChar,
    StrContainsStr,
    StrContainsChar,
    SpanLength,
    SpanIndexer,
    SpanFill,
    SpanClear,
    RoSpanLength,
    RoSpanIndexer,
    RoSpanStartsWithStr,
    ListCount,
    ListAdd,
    ListRemove,
    ListContains,
    ListIndexOf,
    DictCount,
    DictContainsKey,
    DictAdd,
    DictRemove,
    SetCount,
    SetContains,
    SetAdd,
    SetRemove,
    VecLength,
    VecIsEmpty,
    VecContains,
    VecIndexer,
    SeqAny,
    SeqCount,
    QueryWhere,
    QuerySelect,
}

impl MemberId {
    /// Source-level member name, for diagnostics and rewrites.
    pub fn name(self) -> &'static str {
        match self {
            MemberId::StrLength | MemberId::SpanLength | MemberId::RoSpanLength
            | MemberId::VecLength => "Length",
            MemberId::StrIndexer | MemberId::SpanIndexer | MemberId::RoSpanIndexer
            | MemberId::VecIndexer => "[]",
            MemberId::StrAsSpan => "AsSpan",
            MemberId::StrIndexOfStr
            | MemberId::StrIndexOfStrCmp
            | MemberId::StrIndexOfStrStart
            | MemberId::StrIndexOfChar
            | MemberId::StrIndexOfCharCmp
            | MemberId::StrIndexOfCharStart
            | MemberId::ListIndexOf => "IndexOf",
            MemberId::StrStartsWithStr
            | MemberId::StrStartsWithStrCmp
            | MemberId::StrStartsWithChar
            | MemberId::RoSpanStartsWithStr => "StartsWith",
            MemberId::StrEndsWithStr | MemberId::StrEndsWithStrCmp | MemberId::StrEndsWithChar => {
                "EndsWith"
            }
            MemberId::StrContainsStr
            | MemberId::StrContainsChar
            | MemberId::ListContains
            | MemberId::SetContains
            | MemberId::VecContains => "Contains",
            MemberId::SpanFill => "Fill",
            MemberId::SpanClear => "Clear",
            MemberId::ListCount | MemberId::DictCount | MemberId::SetCount => "Count",
            MemberId::ListAdd | MemberId::DictAdd | MemberId::SetAdd => "Add",
            MemberId::ListRemove | MemberId::DictRemove | MemberId::SetRemove => "Remove",
            MemberId::DictContainsKey => "ContainsKey",
            MemberId::VecIsEmpty => "IsEmpty",
            MemberId::SeqAny => "Any",
            MemberId::SeqCount => "Count",
            MemberId::QueryWhere => "Where",
            MemberId::QuerySelect => "Select",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Property,
    Indexer,
}

/// One resolved overload candidate for a member lookup.
#[derive(Debug, Clone)]
pub struct Overload {
    pub member: MemberId,
    pub kind: MemberKind,
    pub params: Vec<TypeId>,
    pub ret: TypeId,
    /// Instance sugar over a static module function (`xs.Any()`).
    pub is_extension: bool,
    /// Lambda arguments bind in a quoted, deferred context.
    pub deferred: bool,
}

/// A size/emptiness-shaped property exposed by a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeProp {
    IsEmpty,
    Length,
    Count,
}

impl SizeProp {
    pub fn property_name(self) -> &'static str {
        match self {
            SizeProp::IsEmpty => "IsEmpty",
            SizeProp::Length => "Length",
            SizeProp::Count => "Count",
        }
    }
}

#[derive(Debug)]
pub struct TypeTable {
    kinds: Vec<TypeKind>,
    lookup: HashMap<TypeKind, TypeId>,
}

impl TypeTable {
    pub const ERROR: TypeId = TypeId(0);
    pub const VOID: TypeId = TypeId(1);
    pub const NULL: TypeId = TypeId(2);
    pub const INT: TypeId = TypeId(3);
    pub const LONG: TypeId = TypeId(4);
    pub const FLOAT: TypeId = TypeId(5);
    pub const DOUBLE: TypeId = TypeId(6);
    pub const BOOL: TypeId = TypeId(7);
    pub const CHAR: TypeId = TypeId(8);
    pub const STR: TypeId = TypeId(9);
    pub const COMPARISON: TypeId = TypeId(10);
    pub const LAMBDA: TypeId = TypeId(11);

    pub fn new() -> Self {
        let mut table = TypeTable {
            kinds: Vec::new(),
            lookup: HashMap::new(),
        };
        // Interning order must match the associated constants above.
        for kind in [
            TypeKind::Error,
            TypeKind::Void,
            TypeKind::Null,
            TypeKind::Int,
            TypeKind::Long,
            TypeKind::Float,
            TypeKind::Double,
            TypeKind::Bool,
            TypeKind::Char,
            TypeKind::Str,
            TypeKind::Comparison,
            TypeKind::Lambda,
        ] {
            table.intern(kind);
        }
        table
    }

    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.lookup.get(&kind) {
            return id;
        }
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(kind.clone());
        self.lookup.insert(kind, id);
        id
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id.index()]
    }

    pub fn generic(&mut self, ctor: Ctor, args: Vec<TypeId>) -> TypeId {
        self.intern(TypeKind::Generic(ctor, args))
    }

    /// Human-readable rendering for messages.
    pub fn display(&self, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Error => "<error>".to_string(),
            TypeKind::Void => "void".to_string(),
            TypeKind::Null => "null".to_string(),
            TypeKind::Int => "int".to_string(),
            TypeKind::Long => "long".to_string(),
            TypeKind::Float => "float".to_string(),
            TypeKind::Double => "double".to_string(),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Char => "char".to_string(),
            TypeKind::Str => "string".to_string(),
            TypeKind::Comparison => "StringComparison".to_string(),
            TypeKind::Lambda => "<lambda>".to_string(),
            TypeKind::Generic(ctor, args) => {
                let rendered: Vec<String> = args.iter().map(|&a| self.display(a)).collect();
                format!("{}<{}>", ctor.name(), rendered.join(", "))
            }
        }
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        matches!(
            self.kind(id),
            TypeKind::Int | TypeKind::Long | TypeKind::Float | TypeKind::Double
        )
    }

    pub fn is_value_type(&self, id: TypeId) -> bool {
        matches!(
            self.kind(id),
            TypeKind::Int
                | TypeKind::Long
                | TypeKind::Float
                | TypeKind::Double
                | TypeKind::Bool
                | TypeKind::Char
                | TypeKind::Comparison
        )
    }

    pub fn is_reference_type(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Str | TypeKind::Generic(..))
    }

    /// Element type when `id` is sequence-shaped (usable as `Seq<T>`).
    pub fn seq_element(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Generic(Ctor::List, args)
            | TypeKind::Generic(Ctor::HashSet, args)
            | TypeKind::Generic(Ctor::Vector, args)
            | TypeKind::Generic(Ctor::Query, args)
            | TypeKind::Generic(Ctor::Seq, args) => Some(args[0]),
            _ => None,
        }
    }

    /// Whether `from` converts implicitly to `to` (identity excluded).
    pub fn converts(&mut self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return false;
        }
        match (self.kind(from).clone(), self.kind(to).clone()) {
            (TypeKind::Int, TypeKind::Long | TypeKind::Float | TypeKind::Double) => true,
            (TypeKind::Long, TypeKind::Float | TypeKind::Double) => true,
            (TypeKind::Float, TypeKind::Double) => true,
            (TypeKind::Null, _) => self.is_reference_type(to),
            (_, TypeKind::Generic(Ctor::Seq, args)) => {
                self.seq_element(from) == Some(args[0])
            }
            _ => false,
        }
    }

    /// Size/emptiness properties the receiver exposes, in declaration order.
    pub fn size_properties(&self, recv: TypeId) -> Vec<(SizeProp, MemberId)> {
        match self.kind(recv) {
            TypeKind::Str => vec![(SizeProp::Length, MemberId::StrLength)],
            TypeKind::Generic(Ctor::List, _) => vec![(SizeProp::Count, MemberId::ListCount)],
            TypeKind::Generic(Ctor::Dictionary, _) => {
                vec![(SizeProp::Count, MemberId::DictCount)]
            }
            TypeKind::Generic(Ctor::HashSet, _) => vec![(SizeProp::Count, MemberId::SetCount)],
            TypeKind::Generic(Ctor::Vector, _) => vec![
                (SizeProp::IsEmpty, MemberId::VecIsEmpty),
                (SizeProp::Length, MemberId::VecLength),
            ],
            TypeKind::Generic(Ctor::Span, _) => vec![(SizeProp::Length, MemberId::SpanLength)],
            TypeKind::Generic(Ctor::ReadOnlySpan, _) => {
                vec![(SizeProp::Length, MemberId::RoSpanLength)]
            }
            _ => Vec::new(),
        }
    }

    /// Resolve a syntactic type name against the library.
    ///
    /// `None` means the name is unknown in this profile/import set; the
    /// caller turns that into a bind error.
    pub fn resolve_named(
        &mut self,
        name: &str,
        args: Vec<TypeId>,
        profile: Profile,
        imports: super::Imports,
    ) -> Option<TypeId> {
        let prim = match name {
            "void" => Some(Self::VOID),
            "int" => Some(Self::INT),
            "long" => Some(Self::LONG),
            "float" => Some(Self::FLOAT),
            "double" => Some(Self::DOUBLE),
            "bool" => Some(Self::BOOL),
            "char" => Some(Self::CHAR),
            "string" => Some(Self::STR),
            "StringComparison" => Some(Self::COMPARISON),
            _ => None,
        };
        if let Some(id) = prim {
            return if args.is_empty() { Some(id) } else { None };
        }

        let ctor = match name {
            "List" => Ctor::List,
            "Dictionary" => Ctor::Dictionary,
            "HashSet" => Ctor::HashSet,
            "Vector" => Ctor::Vector,
            "Seq" => Ctor::Seq,
            "Query" => Ctor::Query,
            "Span" => Ctor::Span,
            "ReadOnlySpan" => Ctor::ReadOnlySpan,
            _ => return None,
        };
        match ctor {
            Ctor::Span | Ctor::ReadOnlySpan => {
                if profile != Profile::Modern || !imports.spans {
                    return None;
                }
            }
            _ => {
                if !imports.collections {
                    return None;
                }
            }
        }
        if args.len() != ctor.arity() {
            return None;
        }
        Some(self.generic(ctor, args))
    }

    /// Instance members (methods and properties) named `name` on `recv`.
    pub fn instance_members(
        &mut self,
        recv: TypeId,
        name: &str,
        profile: Profile,
    ) -> Vec<Overload> {
        let modern = profile == Profile::Modern;
        let method = |member, params, ret| Overload {
            member,
            kind: MemberKind::Method,
            params,
            ret,
            is_extension: false,
            deferred: false,
        };
        let property = |member, ret| Overload {
            member,
            kind: MemberKind::Property,
            params: Vec::new(),
            ret,
            is_extension: false,
            deferred: false,
        };

        match self.kind(recv).clone() {
            TypeKind::Str => match name {
                "Length" => vec![property(MemberId::StrLength, Self::INT)],
                "IndexOf" => {
                    let mut list = vec![
                        method(MemberId::StrIndexOfStr, vec![Self::STR], Self::INT),
                        method(MemberId::StrIndexOfChar, vec![Self::CHAR], Self::INT),
                        method(
                            MemberId::StrIndexOfStrCmp,
                            vec![Self::STR, Self::COMPARISON],
                            Self::INT,
                        ),
                        method(
                            MemberId::StrIndexOfStrStart,
                            vec![Self::STR, Self::INT],
                            Self::INT,
                        ),
                        method(
                            MemberId::StrIndexOfCharStart,
                            vec![Self::CHAR, Self::INT],
                            Self::INT,
                        ),
                    ];
                    if modern {
                        list.push(method(
                            MemberId::StrIndexOfCharCmp,
                            vec![Self::CHAR, Self::COMPARISON],
                            Self::INT,
                        ));
                    }
                    list
                }
                "StartsWith" => {
                    let mut list = vec![
                        method(MemberId::StrStartsWithStr, vec![Self::STR], Self::BOOL),
                        method(
                            MemberId::StrStartsWithStrCmp,
                            vec![Self::STR, Self::COMPARISON],
                            Self::BOOL,
                        ),
                    ];
                    if modern {
                        list.push(method(
                            MemberId::StrStartsWithChar,
                            vec![Self::CHAR],
                            Self::BOOL,
                        ));
                    }
                    list
                }
                "EndsWith" => {
                    let mut list = vec![
                        method(MemberId::StrEndsWithStr, vec![Self::STR], Self::BOOL),
                        method(
                            MemberId::StrEndsWithStrCmp,
                            vec![Self::STR, Self::COMPARISON],
                            Self::BOOL,
                        ),
                    ];
                    if modern {
                        list.push(method(
                            MemberId::StrEndsWithChar,
                            vec![Self::CHAR],
                            Self::BOOL,
                        ));
                    }
                    list
                }
                "Contains" => {
                    let mut list =
                        vec![method(MemberId::StrContainsStr, vec![Self::STR], Self::BOOL)];
                    if modern {
                        list.push(method(
                            MemberId::StrContainsChar,
                            vec![Self::CHAR],
                            Self::BOOL,
                        ));
                    }
                    list
                }
                _ => Vec::new(),
            },
            TypeKind::Generic(Ctor::Span, args) => {
                let elem = args[0];
                match name {
                    "Length" => vec![property(MemberId::SpanLength, Self::INT)],
                    "Fill" => vec![method(MemberId::SpanFill, vec![elem], Self::VOID)],
                    "Clear" => vec![method(MemberId::SpanClear, Vec::new(), Self::VOID)],
                    _ => Vec::new(),
                }
            }
            TypeKind::Generic(Ctor::ReadOnlySpan, args) => match name {
                "Length" => vec![property(MemberId::RoSpanLength, Self::INT)],
                "StartsWith" if args[0] == Self::CHAR => {
                    vec![method(MemberId::RoSpanStartsWithStr, vec![Self::STR], Self::BOOL)]
                }
                _ => Vec::new(),
            },
            TypeKind::Generic(Ctor::List, args) => {
                let elem = args[0];
                match name {
                    "Count" => vec![property(MemberId::ListCount, Self::INT)],
                    "Add" => vec![method(MemberId::ListAdd, vec![elem], Self::VOID)],
                    "Remove" => vec![method(MemberId::ListRemove, vec![elem], Self::BOOL)],
                    "Contains" => vec![method(MemberId::ListContains, vec![elem], Self::BOOL)],
                    "IndexOf" => vec![method(MemberId::ListIndexOf, vec![elem], Self::INT)],
                    _ => Vec::new(),
                }
            }
            TypeKind::Generic(Ctor::Dictionary, args) => {
                let key = args[0];
                let value = args[1];
                match name {
                    "Count" => vec![property(MemberId::DictCount, Self::INT)],
                    "ContainsKey" => {
                        vec![method(MemberId::DictContainsKey, vec![key], Self::BOOL)]
                    }
                    "Add" => vec![method(MemberId::DictAdd, vec![key, value], Self::VOID)],
                    "Remove" => vec![method(MemberId::DictRemove, vec![key], Self::BOOL)],
                    _ => Vec::new(),
                }
            }
            TypeKind::Generic(Ctor::HashSet, args) => {
                let elem = args[0];
                match name {
                    "Count" => vec![property(MemberId::SetCount, Self::INT)],
                    "Contains" => vec![method(MemberId::SetContains, vec![elem], Self::BOOL)],
                    "Add" => vec![method(MemberId::SetAdd, vec![elem], Self::BOOL)],
                    "Remove" => vec![method(MemberId::SetRemove, vec![elem], Self::BOOL)],
                    _ => Vec::new(),
                }
            }
            TypeKind::Generic(Ctor::Vector, args) => {
                let elem = args[0];
                match name {
                    "Length" => vec![property(MemberId::VecLength, Self::INT)],
                    "IsEmpty" => vec![property(MemberId::VecIsEmpty, Self::BOOL)],
                    "Contains" => vec![method(MemberId::VecContains, vec![elem], Self::BOOL)],
                    _ => Vec::new(),
                }
            }
            TypeKind::Generic(Ctor::Query, _) => match name {
                "Where" => vec![Overload {
                    member: MemberId::QueryWhere,
                    kind: MemberKind::Method,
                    params: vec![Self::LAMBDA],
                    ret: recv,
                    is_extension: false,
                    deferred: true,
                }],
                "Select" => vec![Overload {
                    member: MemberId::QuerySelect,
                    kind: MemberKind::Method,
                    params: vec![Self::LAMBDA],
                    ret: recv,
                    is_extension: false,
                    deferred: true,
                }],
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Extension members applicable to `recv`, honoring imports and profile.
    pub fn extension_members(
        &mut self,
        recv: TypeId,
        name: &str,
        profile: Profile,
        imports: super::Imports,
    ) -> Vec<Overload> {
        let mut list = Vec::new();
        if imports.collections && self.seq_element(recv).is_some() {
            match name {
                "Any" => list.push(Overload {
                    member: MemberId::SeqAny,
                    kind: MemberKind::Method,
                    params: Vec::new(),
                    ret: Self::BOOL,
                    is_extension: true,
                    deferred: false,
                }),
                "Count" => list.push(Overload {
                    member: MemberId::SeqCount,
                    kind: MemberKind::Method,
                    params: Vec::new(),
                    ret: Self::INT,
                    is_extension: true,
                    deferred: false,
                }),
                _ => {}
            }
        }
        if imports.spans && profile == Profile::Modern && recv == Self::STR && name == "AsSpan" {
            let ro_span_char = self.generic(Ctor::ReadOnlySpan, vec![Self::CHAR]);
            list.push(Overload {
                member: MemberId::StrAsSpan,
                kind: MemberKind::Method,
                params: Vec::new(),
                ret: ro_span_char,
                is_extension: true,
                deferred: false,
            });
        }
        list
    }

    /// Indexer on `recv`, if any.
    pub fn indexer(&self, recv: TypeId) -> Option<(MemberId, TypeId)> {
        match self.kind(recv) {
            TypeKind::Str => Some((MemberId::StrIndexer, Self::CHAR)),
            TypeKind::Generic(Ctor::Span, args) => Some((MemberId::SpanIndexer, args[0])),
            TypeKind::Generic(Ctor::ReadOnlySpan, args) => {
                Some((MemberId::RoSpanIndexer, args[0]))
            }
            TypeKind::Generic(Ctor::Vector, args) => Some((MemberId::VecIndexer, args[0])),
            _ => None,
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sem::Imports;

    fn all_imports() -> Imports {
        Imports {
            collections: true,
            spans: true,
        }
    }

    #[test]
    fn test_interning_is_stable() {
        let mut t = TypeTable::new();
        let a = t.generic(Ctor::List, vec![TypeTable::INT]);
        let b = t.generic(Ctor::List, vec![TypeTable::INT]);
        let c = t.generic(Ctor::List, vec![TypeTable::STR]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(t.display(a), "List<int>");
    }

    #[test]
    fn test_implicit_numeric_conversions() {
        let mut t = TypeTable::new();
        assert!(t.converts(TypeTable::INT, TypeTable::LONG));
        assert!(t.converts(TypeTable::INT, TypeTable::DOUBLE));
        assert!(t.converts(TypeTable::FLOAT, TypeTable::DOUBLE));
        assert!(!t.converts(TypeTable::DOUBLE, TypeTable::FLOAT));
        assert!(!t.converts(TypeTable::LONG, TypeTable::INT));
    }

    #[test]
    fn test_sequence_conversion() {
        let mut t = TypeTable::new();
        let list = t.generic(Ctor::List, vec![TypeTable::STR]);
        let seq = t.generic(Ctor::Seq, vec![TypeTable::STR]);
        let seq_int = t.generic(Ctor::Seq, vec![TypeTable::INT]);
        assert!(t.converts(list, seq));
        assert!(!t.converts(list, seq_int));
    }

    #[test]
    fn test_char_overloads_gated_by_profile() {
        let mut t = TypeTable::new();
        let modern = t.instance_members(TypeTable::STR, "StartsWith", Profile::Modern);
        let legacy = t.instance_members(TypeTable::STR, "StartsWith", Profile::Legacy);
        assert!(modern.iter().any(|o| o.member == MemberId::StrStartsWithChar));
        assert!(!legacy.iter().any(|o| o.member == MemberId::StrStartsWithChar));
    }

    #[test]
    fn test_span_types_need_modern_profile() {
        let mut t = TypeTable::new();
        assert!(t
            .resolve_named("Span", vec![TypeTable::INT], Profile::Modern, all_imports())
            .is_some());
        assert!(t
            .resolve_named("Span", vec![TypeTable::INT], Profile::Legacy, all_imports())
            .is_none());
    }

    #[test]
    fn test_size_properties_order() {
        let mut t = TypeTable::new();
        let vector = t.generic(Ctor::Vector, vec![TypeTable::INT]);
        let props: Vec<SizeProp> = t.size_properties(vector).into_iter().map(|p| p.0).collect();
        assert_eq!(props, vec![SizeProp::IsEmpty, SizeProp::Length]);
    }

    #[test]
    fn test_extension_members_require_import() {
        let mut t = TypeTable::new();
        let list = t.generic(Ctor::List, vec![TypeTable::INT]);
        let none = t.extension_members(list, "Any", Profile::Modern, Imports::default());
        let some = t.extension_members(list, "Any", Profile::Modern, all_imports());
        assert!(none.is_empty());
        assert_eq!(some.len(), 1);
        assert!(some[0].is_extension);
    }
}
