//! The type checker implementation.
//!
//! Five passes decouple the mutually recursive top-level namespace:
//! 1. type aliases and enumerations, 2. interfaces, 3. classes,
//! 4. function signatures, 5. every statement body. Diagnostics accumulate
//! in discovery order and are stable-sorted by line at the end, so reported
//! output is deterministic and non-decreasing.

use detype_ast::node::*;
use detype_ast::types::{EnvId, TypeId};
use detype_ast::TokenKind;
use detype_diagnostics::{messages, Diagnostic, DiagnosticCollection};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::scope::{BindingKind, ScopeArena, ValueBinding};
use crate::types::{
    ClassType, EnumMemberValue, EnumType, FunctionSignature, IndexInfo, MemberInfo,
    SignatureParameter, TypeKind, TypeTable,
};

/// Depth bound for type stringification on circular member types.
const MAX_TYPE_TO_STRING_DEPTH: u32 = 16;

/// Array members that resolve without diagnostics; `length` is `number`,
/// the methods fall back to `any`.
const ARRAY_METHODS: &[&str] = &[
    "push", "pop", "shift", "unshift", "slice", "splice", "concat", "join", "reverse", "sort",
    "indexOf", "lastIndexOf", "includes", "find", "findIndex", "filter", "map", "forEach",
    "reduce", "reduceRight", "some", "every", "flat", "flatMap", "fill", "keys", "values",
    "entries",
];

/// String members that resolve without diagnostics.
const STRING_METHODS: &[&str] = &[
    "charAt", "charCodeAt", "codePointAt", "concat", "endsWith", "includes", "indexOf",
    "lastIndexOf", "localeCompare", "match", "normalize", "padEnd", "padStart", "repeat",
    "replace", "replaceAll", "search", "slice", "split", "startsWith", "substring",
    "toLowerCase", "toUpperCase", "trim", "trimEnd", "trimStart", "valueOf", "toString",
];

/// Host globals seeded into the global scope with type `any`.
const HOST_GLOBALS: &[&str] = &[
    "console", "Math", "JSON", "parseInt", "parseFloat", "NaN", "Infinity",
];

/// Checker configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckerOptions {
    /// Parent function and method bodies to their lexical enclosing scope
    /// instead of the global scope. Off by default: the historical behavior
    /// reparents every function body to the global environment, so captures
    /// of outer locals are not validated.
    pub lexical_function_scopes: bool,
}

/// Check a program with default options and return the diagnostics, ordered
/// by source line.
pub fn check(program: &Program<'_>) -> Vec<Diagnostic> {
    let mut checker = Checker::new(CheckerOptions::default());
    checker.check_program(program);
    checker.into_diagnostics()
}

/// The type checker resolves types and reports type errors. It never fails
/// on well-formed trees; problems become diagnostics.
pub struct Checker {
    pub type_table: TypeTable,
    scopes: ScopeArena,
    global: EnvId,
    current: EnvId,
    diagnostics: DiagnosticCollection,
    options: CheckerOptions,
    /// Expected return types of enclosing function bodies; `None` means the
    /// return type is inferred and not enforced.
    return_stack: Vec<Option<TypeId>>,
    /// Instance type of the enclosing class body, for `this` and `super`.
    current_class: Option<TypeId>,
    /// Memoized assignability verdicts; also the recursion guard for
    /// circular member types.
    assignability_cache: FxHashMap<(TypeId, TypeId), bool>,
}

impl Checker {
    pub fn new(options: CheckerOptions) -> Self {
        let type_table = TypeTable::new();
        let mut scopes = ScopeArena::new();
        let global = scopes.push(None);
        for name in HOST_GLOBALS {
            scopes.define_value(
                global,
                name,
                ValueBinding {
                    type_id: type_table.any_type,
                    kind: BindingKind::Variable,
                    mutable: false,
                },
            );
        }
        Self {
            type_table,
            scopes,
            global,
            current: global,
            diagnostics: DiagnosticCollection::new(),
            options,
            return_stack: Vec::new(),
            current_class: None,
            assignability_cache: FxHashMap::default(),
        }
    }

    pub fn diagnostics(&self) -> &DiagnosticCollection {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_diagnostics()
    }

    fn error(&mut self, message: &detype_diagnostics::DiagnosticMessage, args: &[&str], line: u32) {
        self.diagnostics.add(Diagnostic::new(message, args, line));
    }

    // ========================================================================
    // Program checking
    // ========================================================================

    pub fn check_program(&mut self, program: &Program<'_>) {
        // Pass 1: type aliases and enumerations.
        for statement in program.statements {
            match as_declaration(statement) {
                Statement::TypeAlias(decl) => self.collect_type_alias(decl),
                Statement::Enum(decl) => self.collect_enum(decl),
                _ => {}
            }
        }
        // Pass 2: interfaces (may reference aliases).
        for statement in program.statements {
            if let Statement::Interface(decl) = as_declaration(statement) {
                self.collect_interface(decl);
            }
        }
        // Pass 3: classes (may extend other classes).
        for statement in program.statements {
            if let Statement::Class(decl) = as_declaration(statement) {
                self.collect_class(decl);
            }
        }
        // Pass 4: function signatures.
        for statement in program.statements {
            if let Statement::Function(decl) = as_declaration(statement) {
                self.collect_function_signature(decl);
            }
        }
        // Pass 5: statement bodies, initializers, and uses.
        for statement in program.statements {
            self.check_statement(statement);
        }

        self.diagnostics.sort();
    }

    // ========================================================================
    // Declaration collection
    // ========================================================================

    fn collect_type_alias(&mut self, decl: &TypeAliasDeclaration<'_>) {
        let resolved = self.resolve_type(decl.type_node);
        self.scopes.define_type(self.current, &decl.name, resolved);
    }

    fn collect_enum(&mut self, decl: &EnumDeclaration<'_>) {
        if self.scopes.has_local_value(self.current, &decl.name) {
            self.error(
                &messages::IDENTIFIER_0_HAS_ALREADY_BEEN_DECLARED,
                &[&decl.name],
                decl.line,
            );
        }
        let mut members = IndexMap::new();
        let mut next_value: i64 = 0;
        for member in decl.members {
            let value = match member.initializer {
                Some(Expression::NumericLiteral(n)) => {
                    next_value = n.value as i64 + 1;
                    EnumMemberValue::Int(n.value as i64)
                }
                Some(Expression::Unary(u))
                    if u.operator == TokenKind::MinusToken
                        && matches!(u.operand, Expression::NumericLiteral(_)) =>
                {
                    let Expression::NumericLiteral(n) = u.operand else {
                        unreachable!()
                    };
                    let v = -(n.value as i64);
                    next_value = v + 1;
                    EnumMemberValue::Int(v)
                }
                Some(Expression::StringLiteral(s)) => EnumMemberValue::Str(s.value.clone()),
                _ => {
                    // Non-literal initializers are emitted verbatim; the
                    // checker keeps counting.
                    let v = next_value;
                    next_value += 1;
                    EnumMemberValue::Int(v)
                }
            };
            members.insert(member.name.clone(), value);
        }
        let enum_type = self.type_table.add(TypeKind::Enum(EnumType {
            name: decl.name.clone(),
            is_const: decl.is_const,
            members,
        }));
        self.scopes.define_type(self.current, &decl.name, enum_type);
        self.scopes.define_value(
            self.current,
            &decl.name,
            ValueBinding {
                type_id: enum_type,
                kind: BindingKind::Enum,
                mutable: false,
            },
        );
    }

    fn collect_interface(&mut self, decl: &InterfaceDeclaration<'_>) {
        let mut members: IndexMap<String, MemberInfo> = IndexMap::new();
        let mut index: Option<IndexInfo> = None;

        // Seed from the extends clause before own members are added.
        for base in decl.extends {
            let base_type = self.resolve_type(base);
            if let TypeKind::Interface {
                members: base_members,
                index: base_index,
                ..
            } = self.type_table.kind(base_type).clone()
            {
                for (name, info) in base_members {
                    members.insert(name, info);
                }
                if index.is_none() {
                    index = base_index;
                }
            }
        }

        for member in decl.members {
            match member {
                TypeMember::Property(p) => {
                    let type_id = match p.type_annotation {
                        Some(annotation) => self.resolve_type(annotation),
                        None => self.type_table.any_type,
                    };
                    members.insert(
                        p.name.clone(),
                        MemberInfo {
                            type_id,
                            optional: p.optional,
                            readonly: p.readonly,
                        },
                    );
                }
                TypeMember::Method(m) => {
                    let signature =
                        self.signature_from(m.parameters, m.return_type, self.type_table.any_type);
                    let type_id = self.type_table.add(TypeKind::Function(signature));
                    members.insert(
                        m.name.clone(),
                        MemberInfo {
                            type_id,
                            optional: m.optional,
                            readonly: false,
                        },
                    );
                }
                TypeMember::Index(i) => {
                    let key_type = self.resolve_type(i.key_type);
                    let value_type = self.resolve_type(i.value_type);
                    index = Some(IndexInfo {
                        key_type,
                        value_type,
                    });
                }
            }
        }

        let interface_type = self.type_table.add(TypeKind::Interface {
            name: decl.name.clone(),
            members,
            index,
        });
        self.scopes.define_type(self.current, &decl.name, interface_type);
    }

    fn collect_class(&mut self, decl: &ClassDeclaration<'_>) -> TypeId {
        if !decl.name.is_empty() && self.scopes.has_local_value(self.current, &decl.name) {
            self.error(
                &messages::IDENTIFIER_0_HAS_ALREADY_BEEN_DECLARED,
                &[&decl.name],
                decl.line,
            );
        }
        let class_type = self.build_class_type(decl);
        if !decl.name.is_empty() {
            self.scopes.define_type(self.current, &decl.name, class_type);
            self.scopes.define_value(
                self.current,
                &decl.name,
                ValueBinding {
                    type_id: class_type,
                    kind: BindingKind::Class,
                    mutable: false,
                },
            );
        }
        class_type
    }

    fn build_class_type(&mut self, decl: &ClassDeclaration<'_>) -> TypeId {
        let mut instance_members: IndexMap<String, MemberInfo> = IndexMap::new();
        let mut static_members: IndexMap<String, MemberInfo> = IndexMap::new();
        let mut constructor = None;
        let mut superclass = None;

        // A subclass is seeded with shallow copies of the superclass maps
        // before its own members are added.
        if let Some(heritage) = &decl.superclass {
            superclass = Some(heritage.name.clone());
            match self.scopes.lookup_type(self.current, &heritage.name) {
                Some(super_type) => {
                    if let TypeKind::Class(super_class) = self.type_table.kind(super_type).clone() {
                        instance_members = super_class.instance_members.clone();
                        static_members = super_class.static_members.clone();
                        constructor = super_class.constructor.clone();
                    }
                }
                None => {
                    self.error(&messages::CANNOT_FIND_NAME_0, &[&heritage.name], heritage.line);
                }
            }
        }

        for member in decl.members {
            match member {
                ClassMember::Property(p) => {
                    let type_id = match p.type_annotation {
                        Some(annotation) => self.resolve_type(annotation),
                        None => self.type_table.any_type,
                    };
                    let info = MemberInfo {
                        type_id,
                        optional: p.optional,
                        readonly: p.modifiers.contains(detype_ast::types::ModifierFlags::READONLY),
                    };
                    if p.modifiers.contains(detype_ast::types::ModifierFlags::STATIC) {
                        static_members.insert(p.name.clone(), info);
                    } else {
                        instance_members.insert(p.name.clone(), info);
                    }
                }
                ClassMember::Method(m) => {
                    let signature =
                        self.signature_from(m.parameters, m.return_type, self.type_table.any_type);
                    let type_id = self.type_table.add(TypeKind::Function(signature));
                    let info = MemberInfo {
                        type_id,
                        optional: false,
                        readonly: false,
                    };
                    if m.modifiers.contains(detype_ast::types::ModifierFlags::STATIC) {
                        static_members.insert(m.name.clone(), info);
                    } else {
                        instance_members.insert(m.name.clone(), info);
                    }
                }
                ClassMember::Constructor(c) => {
                    constructor =
                        Some(self.signature_from(c.parameters, None, self.type_table.void_type));
                }
            }
        }

        self.type_table.add(TypeKind::Class(ClassType {
            name: decl.name.clone(),
            instance_members,
            static_members,
            constructor,
            superclass,
        }))
    }

    fn collect_function_signature(&mut self, decl: &FunctionDeclaration<'_>) {
        if self.scopes.has_local_value(self.current, &decl.name) {
            self.error(
                &messages::IDENTIFIER_0_HAS_ALREADY_BEEN_DECLARED,
                &[&decl.name],
                decl.line,
            );
        }
        let signature =
            self.signature_from(decl.parameters, decl.return_type, self.type_table.void_type);
        let type_id = self.type_table.add(TypeKind::Function(signature));
        self.scopes.define_value(
            self.current,
            &decl.name,
            ValueBinding {
                type_id,
                kind: BindingKind::Function,
                mutable: false,
            },
        );
    }

    /// Build a function signature from declared parameters. Missing
    /// annotations default to `any`; a rest parameter keeps the spread
    /// token in its recorded name.
    fn signature_from(
        &mut self,
        parameters: &[Parameter<'_>],
        return_type: Option<&TypeNode<'_>>,
        default_return: TypeId,
    ) -> FunctionSignature {
        let mut params = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let type_id = match parameter.type_annotation {
                Some(annotation) => self.resolve_type(annotation),
                None => self.type_table.any_type,
            };
            let name = if parameter.is_rest {
                format!("...{}", parameter.name)
            } else {
                parameter.name.clone()
            };
            params.push(SignatureParameter {
                name,
                type_id,
                optional: parameter.optional || parameter.initializer.is_some(),
            });
        }
        let return_type = match return_type {
            Some(node) => self.resolve_type(node),
            None => default_return,
        };
        FunctionSignature {
            parameters: params,
            return_type,
        }
    }

    // ========================================================================
    // Type resolution
    // ========================================================================

    fn resolve_type(&mut self, node: &TypeNode<'_>) -> TypeId {
        match node {
            TypeNode::Keyword(k) => self.keyword_type(k.kind),
            TypeNode::Reference(r) => {
                if r.name == "Array" {
                    let element = match r.type_arguments {
                        Some([element]) => self.resolve_type(element),
                        _ => self.type_table.any_type,
                    };
                    return self.type_table.add(TypeKind::Array { element });
                }
                // Generic arguments are parsed but erased without
                // substitution; unresolved names (type parameters included)
                // fall back to `any`.
                self.scopes
                    .lookup_type(self.current, &r.name)
                    .unwrap_or(self.type_table.any_type)
            }
            TypeNode::Array(a) => {
                let element = self.resolve_type(a.element_type);
                self.type_table.add(TypeKind::Array { element })
            }
            TypeNode::Tuple(t) => {
                let elements = t.elements.iter().map(|e| self.resolve_type(e)).collect();
                self.type_table.add(TypeKind::Tuple { elements })
            }
            TypeNode::Union(u) => {
                let parts: Vec<TypeId> = u.types.iter().map(|t| self.resolve_type(t)).collect();
                self.make_union(parts)
            }
            TypeNode::Intersection(i) => {
                let mut parts = Vec::new();
                for part in i.types {
                    let id = self.resolve_type(part);
                    match self.type_table.kind(id) {
                        TypeKind::Intersection { types } => parts.extend(types.clone()),
                        _ => parts.push(id),
                    }
                }
                if parts.len() == 1 {
                    parts[0]
                } else {
                    self.type_table.add(TypeKind::Intersection { types: parts })
                }
            }
            TypeNode::Function(f) => {
                let signature = self.signature_from(
                    f.parameters,
                    Some(f.return_type),
                    self.type_table.any_type,
                );
                self.type_table.add(TypeKind::Function(signature))
            }
            TypeNode::Object(o) => {
                let mut members: IndexMap<String, MemberInfo> = IndexMap::new();
                let mut index = None;
                for member in o.members {
                    match member {
                        TypeMember::Property(p) => {
                            let type_id = match p.type_annotation {
                                Some(annotation) => self.resolve_type(annotation),
                                None => self.type_table.any_type,
                            };
                            members.insert(
                                p.name.clone(),
                                MemberInfo {
                                    type_id,
                                    optional: p.optional,
                                    readonly: p.readonly,
                                },
                            );
                        }
                        TypeMember::Method(m) => {
                            let signature = self.signature_from(
                                m.parameters,
                                m.return_type,
                                self.type_table.any_type,
                            );
                            let type_id = self.type_table.add(TypeKind::Function(signature));
                            members.insert(
                                m.name.clone(),
                                MemberInfo {
                                    type_id,
                                    optional: m.optional,
                                    readonly: false,
                                },
                            );
                        }
                        TypeMember::Index(i) => {
                            let key_type = self.resolve_type(i.key_type);
                            let value_type = self.resolve_type(i.value_type);
                            index = Some(IndexInfo {
                                key_type,
                                value_type,
                            });
                        }
                    }
                }
                self.type_table.add(TypeKind::Interface {
                    name: String::new(),
                    members,
                    index,
                })
            }
            TypeNode::Literal(l) => match &l.value {
                LiteralValue::String(s) => self
                    .type_table
                    .add(TypeKind::StringLiteral { value: s.clone() }),
                LiteralValue::Number(n) => {
                    self.type_table.add(TypeKind::NumberLiteral { value: *n })
                }
                LiteralValue::Boolean(b) => {
                    self.type_table.add(TypeKind::BooleanLiteral { value: *b })
                }
            },
            TypeNode::Conditional(c) => {
                let check_type = self.resolve_type(c.check_type);
                let extends_type = self.resolve_type(c.extends_type);
                if self.is_assignable(check_type, extends_type) {
                    self.resolve_type(c.true_type)
                } else {
                    self.resolve_type(c.false_type)
                }
            }
            TypeNode::IndexedAccess(ia) => {
                let object = self.resolve_type(ia.object_type);
                let index = self.resolve_type(ia.index_type);
                match (
                    self.type_table.kind(object).clone(),
                    self.type_table.kind(index).clone(),
                ) {
                    (TypeKind::Interface { members, .. }, TypeKind::StringLiteral { value }) => {
                        members
                            .get(&value)
                            .map(|m| m.type_id)
                            .unwrap_or(self.type_table.any_type)
                    }
                    (TypeKind::Array { element }, _) => element,
                    (TypeKind::Tuple { elements }, TypeKind::NumberLiteral { value }) => elements
                        .get(value as usize)
                        .copied()
                        .unwrap_or(self.type_table.any_type),
                    _ => self.type_table.any_type,
                }
            }
            TypeNode::Parenthesized(p) => self.resolve_type(p.type_node),
            TypeNode::Query(q) => self
                .scopes
                .lookup_value(self.current, &q.name)
                .map(|b| b.type_id)
                .unwrap_or(self.type_table.any_type),
            TypeNode::Operator(op) if op.operator == TokenKind::KeyOfKeyword => {
                let operand = self.resolve_type(op.type_node);
                self.keyof_type(operand)
            }
            TypeNode::Operator(_) => self.type_table.any_type,
            TypeNode::Optional(o) => self.resolve_type(o.type_node),
            TypeNode::Rest(r) => {
                let element = self.resolve_type(r.type_node);
                self.type_table.add(TypeKind::Array { element })
            }
            // Mapped and infer forms are erased to `any` in this core.
            TypeNode::Mapped(_) | TypeNode::Infer(_) => self.type_table.any_type,
        }
    }

    fn keyword_type(&self, kind: TokenKind) -> TypeId {
        match kind {
            TokenKind::NumberKeyword => self.type_table.number_type,
            TokenKind::StringKeyword => self.type_table.string_type,
            TokenKind::BooleanKeyword => self.type_table.boolean_type,
            TokenKind::VoidKeyword => self.type_table.void_type,
            TokenKind::NullKeyword => self.type_table.null_type,
            TokenKind::UndefinedKeyword => self.type_table.undefined_type,
            TokenKind::UnknownKeyword => self.type_table.unknown_type,
            TokenKind::NeverKeyword => self.type_table.never_type,
            TokenKind::ObjectKeyword => self.type_table.object_type,
            TokenKind::SymbolKeyword => self.type_table.symbol_type,
            TokenKind::BigIntKeyword => self.type_table.bigint_type,
            _ => self.type_table.any_type,
        }
    }

    /// `keyof T`: the union of string-literal member names, or `string`.
    fn keyof_type(&mut self, operand: TypeId) -> TypeId {
        let names: Vec<String> = match self.type_table.kind(operand) {
            TypeKind::Interface { members, .. } => members.keys().cloned().collect(),
            TypeKind::Class(c) => c.instance_members.keys().cloned().collect(),
            TypeKind::Enum(e) => e.members.keys().cloned().collect(),
            _ => return self.type_table.string_type,
        };
        if names.is_empty() {
            return self.type_table.never_type;
        }
        let parts = names
            .into_iter()
            .map(|value| self.type_table.add(TypeKind::StringLiteral { value }))
            .collect();
        self.make_union(parts)
    }

    /// Build a union: flatten nested unions and deduplicate constituents by
    /// structural stringification. A single surviving part is returned
    /// unwrapped.
    fn make_union(&mut self, parts: Vec<TypeId>) -> TypeId {
        let mut flat = Vec::new();
        for part in parts {
            match self.type_table.kind(part) {
                TypeKind::Union { types } => flat.extend(types.clone()),
                _ => flat.push(part),
            }
        }
        let mut seen = rustc_hash::FxHashSet::default();
        let mut unique = Vec::new();
        for id in flat {
            if seen.insert(self.type_to_string(id)) {
                unique.push(id);
            }
        }
        match unique.len() {
            0 => self.type_table.never_type,
            1 => unique[0],
            _ => self.type_table.add(TypeKind::Union { types: unique }),
        }
    }

    /// Widen a literal type to its primitive.
    fn widen(&self, type_id: TypeId) -> TypeId {
        match self.type_table.kind(type_id) {
            TypeKind::StringLiteral { .. } => self.type_table.string_type,
            TypeKind::NumberLiteral { .. } => self.type_table.number_type,
            TypeKind::BooleanLiteral { .. } => self.type_table.boolean_type,
            _ => type_id,
        }
    }

    fn is_any(&self, type_id: TypeId) -> bool {
        type_id == self.type_table.any_type
    }

    fn is_number_like(&self, type_id: TypeId) -> bool {
        if type_id == self.type_table.number_type {
            return true;
        }
        match self.type_table.kind(type_id) {
            TypeKind::NumberLiteral { .. } | TypeKind::Enum(_) => true,
            TypeKind::Union { types } => types.iter().all(|&t| self.is_number_like(t)),
            _ => false,
        }
    }

    fn is_string_like(&self, type_id: TypeId) -> bool {
        if type_id == self.type_table.string_type {
            return true;
        }
        match self.type_table.kind(type_id) {
            TypeKind::StringLiteral { .. } => true,
            TypeKind::Union { types } => types.iter().all(|&t| self.is_string_like(t)),
            _ => false,
        }
    }

    // ========================================================================
    // Type stringification
    // ========================================================================

    pub fn type_to_string(&self, type_id: TypeId) -> String {
        self.type_to_string_depth(type_id, 0)
    }

    fn type_to_string_depth(&self, type_id: TypeId, depth: u32) -> String {
        if depth > MAX_TYPE_TO_STRING_DEPTH {
            return "...".to_string();
        }
        match self.type_table.kind(type_id) {
            TypeKind::Intrinsic { name } => (*name).to_string(),
            TypeKind::StringLiteral { value } => format!("\"{}\"", value),
            TypeKind::NumberLiteral { value } => format_number(*value),
            TypeKind::BooleanLiteral { value } => value.to_string(),
            TypeKind::Array { element } => {
                let inner = self.type_to_string_depth(*element, depth + 1);
                match self.type_table.kind(*element) {
                    TypeKind::Union { .. } | TypeKind::Function(_) => format!("({})[]", inner),
                    _ => format!("{}[]", inner),
                }
            }
            TypeKind::Tuple { elements } => {
                let parts: Vec<String> = elements
                    .iter()
                    .map(|e| self.type_to_string_depth(*e, depth + 1))
                    .collect();
                format!("[{}]", parts.join(", "))
            }
            TypeKind::Union { types } => types
                .iter()
                .map(|t| self.type_to_string_depth(*t, depth + 1))
                .collect::<Vec<_>>()
                .join(" | "),
            TypeKind::Intersection { types } => types
                .iter()
                .map(|t| self.type_to_string_depth(*t, depth + 1))
                .collect::<Vec<_>>()
                .join(" & "),
            TypeKind::Function(signature) => {
                let params: Vec<String> = signature
                    .parameters
                    .iter()
                    .map(|p| {
                        format!(
                            "{}{}: {}",
                            p.name,
                            if p.optional { "?" } else { "" },
                            self.type_to_string_depth(p.type_id, depth + 1)
                        )
                    })
                    .collect();
                format!(
                    "({}) => {}",
                    params.join(", "),
                    self.type_to_string_depth(signature.return_type, depth + 1)
                )
            }
            TypeKind::Interface { name, members, .. } => {
                if !name.is_empty() {
                    return name.clone();
                }
                let parts: Vec<String> = members
                    .iter()
                    .map(|(member_name, info)| {
                        format!(
                            "{}{}: {}",
                            member_name,
                            if info.optional { "?" } else { "" },
                            self.type_to_string_depth(info.type_id, depth + 1)
                        )
                    })
                    .collect();
                if parts.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {} }}", parts.join("; "))
                }
            }
            TypeKind::Class(c) => c.name.clone(),
            TypeKind::Enum(e) => e.name.clone(),
        }
    }

    // ========================================================================
    // Assignability
    // ========================================================================

    /// Structural assignability from `source` into `target`.
    pub fn is_assignable(&mut self, source: TypeId, target: TypeId) -> bool {
        if source == target {
            return true;
        }
        if let Some(&cached) = self.assignability_cache.get(&(source, target)) {
            return cached;
        }
        // Assume success while recursing so circular member types terminate.
        self.assignability_cache.insert((source, target), true);
        let verdict = self.is_assignable_uncached(source, target);
        self.assignability_cache.insert((source, target), verdict);
        verdict
    }

    fn is_assignable_uncached(&mut self, source: TypeId, target: TypeId) -> bool {
        if self.is_any(source) || self.is_any(target) {
            return true;
        }
        if target == self.type_table.unknown_type {
            return true;
        }
        if source == self.type_table.never_type {
            return true;
        }

        let source_kind = self.type_table.kind(source).clone();
        let target_kind = self.type_table.kind(target).clone();

        // Union target: any arm accepts the source. A bare string may also
        // flow into a union made only of string literals.
        if let TypeKind::Union { types } = &target_kind {
            for arm in types {
                if self.is_assignable(source, *arm) {
                    return true;
                }
            }
            if source == self.type_table.string_type
                && types
                    .iter()
                    .all(|arm| matches!(self.type_table.kind(*arm), TypeKind::StringLiteral { .. }))
            {
                return true;
            }
            return false;
        }
        // Union source: every arm must flow into the target.
        if let TypeKind::Union { types } = &source_kind {
            return types.iter().all(|arm| {
                let arm = *arm;
                self.is_assignable(arm, target)
            });
        }
        if let TypeKind::Intersection { types } = &target_kind {
            return types.iter().all(|part| {
                let part = *part;
                self.is_assignable(source, part)
            });
        }
        if let TypeKind::Intersection { types } = &source_kind {
            return types.iter().any(|part| {
                let part = *part;
                self.is_assignable(part, target)
            });
        }

        match (&source_kind, &target_kind) {
            (TypeKind::StringLiteral { value: a }, TypeKind::StringLiteral { value: b }) => a == b,
            (TypeKind::NumberLiteral { value: a }, TypeKind::NumberLiteral { value: b }) => a == b,
            (TypeKind::BooleanLiteral { value: a }, TypeKind::BooleanLiteral { value: b }) => {
                a == b
            }
            (TypeKind::StringLiteral { .. }, _) => target == self.type_table.string_type,
            (TypeKind::NumberLiteral { .. }, _) => target == self.type_table.number_type,
            (TypeKind::BooleanLiteral { .. }, _) => target == self.type_table.boolean_type,

            (TypeKind::Array { element: se }, TypeKind::Array { element: te }) => {
                let (se, te) = (*se, *te);
                self.is_assignable(se, te)
            }
            (TypeKind::Tuple { elements: se }, TypeKind::Tuple { elements: te }) => {
                se.len() == te.len() && {
                    let pairs: Vec<(TypeId, TypeId)> =
                        se.iter().copied().zip(te.iter().copied()).collect();
                    pairs.into_iter().all(|(s, t)| self.is_assignable(s, t))
                }
            }
            (TypeKind::Function(ss), TypeKind::Function(ts)) => {
                // Return covariant, parameters contravariant; a parameter
                // count mismatch is tolerated (extra parameters go unused).
                let pairs: Vec<(TypeId, TypeId)> = ts
                    .parameters
                    .iter()
                    .zip(ss.parameters.iter())
                    .map(|(t, s)| (t.type_id, s.type_id))
                    .collect();
                if !pairs.into_iter().all(|(t, s)| self.is_assignable(t, s)) {
                    return false;
                }
                let (sr, tr) = (ss.return_type, ts.return_type);
                self.is_assignable(sr, tr)
            }
            (
                TypeKind::Interface { .. } | TypeKind::Class(_),
                TypeKind::Interface { members, .. },
            ) => self.satisfies_members(&source_kind, &members.clone()),
            (TypeKind::Interface { .. } | TypeKind::Class(_), TypeKind::Class(tc)) => {
                self.satisfies_members(&source_kind, &tc.instance_members.clone())
            }
            (TypeKind::Enum(se), TypeKind::Enum(te)) => se.name == te.name,
            _ => false,
        }
    }

    /// Every required member of the target map must be present in the
    /// source shape with an assignable type.
    fn satisfies_members(
        &mut self,
        source_kind: &TypeKind,
        target_members: &IndexMap<String, MemberInfo>,
    ) -> bool {
        for (name, target_info) in target_members {
            if target_info.optional {
                continue;
            }
            let source_member = match source_kind {
                TypeKind::Interface { members, .. } => members.get(name).cloned(),
                TypeKind::Class(c) => c.instance_members.get(name).cloned(),
                _ => None,
            };
            match source_member {
                Some(info) => {
                    if !self.is_assignable(info.type_id, target_info.type_id) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    // ========================================================================
    // Statement checking
    // ========================================================================

    fn check_statement(&mut self, statement: &Statement<'_>) {
        match statement {
            Statement::Variable(decl) => self.check_variable_declaration(decl),
            Statement::Function(decl) => self.check_function_declaration(decl),
            Statement::Interface(decl) => {
                if self.current != self.global {
                    self.collect_interface(decl);
                }
            }
            Statement::TypeAlias(decl) => {
                if self.current != self.global {
                    self.collect_type_alias(decl);
                }
            }
            Statement::Class(decl) => self.check_class_declaration(decl),
            Statement::Enum(decl) => {
                if self.current != self.global {
                    self.collect_enum(decl);
                }
                for member in decl.members {
                    if let Some(init) = member.initializer {
                        if !matches!(
                            init,
                            Expression::NumericLiteral(_) | Expression::StringLiteral(_)
                        ) {
                            self.check_expression(init);
                        }
                    }
                }
            }
            Statement::Return(ret) => self.check_return_statement(ret),
            Statement::If(stmt) => {
                self.check_expression(stmt.condition);
                self.check_statement(stmt.then_branch);
                if let Some(else_branch) = stmt.else_branch {
                    self.check_statement(else_branch);
                }
            }
            Statement::While(stmt) => {
                self.check_expression(stmt.condition);
                self.check_statement(stmt.body);
            }
            Statement::For(stmt) => {
                let saved = self.current;
                self.current = self.scopes.push(Some(saved));
                match &stmt.initializer {
                    Some(ForInit::Variable(decl)) => self.check_variable_declaration(decl),
                    Some(ForInit::Expression(expr)) => {
                        self.check_expression(expr);
                    }
                    None => {}
                }
                if let Some(condition) = stmt.condition {
                    self.check_expression(condition);
                }
                if let Some(update) = stmt.update {
                    self.check_expression(update);
                }
                self.check_statement(stmt.body);
                self.current = saved;
            }
            Statement::ForOf(stmt) => {
                let iterable_type = self.check_expression(stmt.iterable);
                let element_type = match self.type_table.kind(iterable_type) {
                    TypeKind::Array { element } => *element,
                    _ => self.type_table.any_type,
                };
                let saved = self.current;
                self.current = self.scopes.push(Some(saved));
                self.scopes.define_value(
                    self.current,
                    &stmt.binding,
                    ValueBinding {
                        type_id: element_type,
                        kind: BindingKind::Variable,
                        mutable: stmt.keyword != VarKeyword::Const,
                    },
                );
                self.check_statement(stmt.body);
                self.current = saved;
            }
            Statement::ForIn(stmt) => {
                self.check_expression(stmt.object);
                let saved = self.current;
                self.current = self.scopes.push(Some(saved));
                self.scopes.define_value(
                    self.current,
                    &stmt.binding,
                    ValueBinding {
                        type_id: self.type_table.string_type,
                        kind: BindingKind::Variable,
                        mutable: stmt.keyword != VarKeyword::Const,
                    },
                );
                self.check_statement(stmt.body);
                self.current = saved;
            }
            Statement::DoWhile(stmt) => {
                self.check_statement(stmt.body);
                self.check_expression(stmt.condition);
            }
            Statement::Switch(stmt) => {
                self.check_expression(stmt.discriminant);
                for case in stmt.cases {
                    if let Some(test) = case.test {
                        self.check_expression(test);
                    }
                    for inner in case.statements {
                        self.check_statement(inner);
                    }
                }
            }
            Statement::Throw(stmt) => {
                self.check_expression(stmt.expression);
            }
            Statement::Try(stmt) => {
                self.check_block(&stmt.block);
                if let Some(catch) = &stmt.catch {
                    let saved = self.current;
                    self.current = self.scopes.push(Some(saved));
                    if let Some(parameter) = &catch.parameter {
                        self.scopes.define_value(
                            self.current,
                            parameter,
                            ValueBinding {
                                type_id: self.type_table.any_type,
                                kind: BindingKind::Variable,
                                mutable: true,
                            },
                        );
                    }
                    for inner in catch.body.statements {
                        self.check_statement(inner);
                    }
                    self.current = saved;
                }
                if let Some(finally) = &stmt.finally {
                    self.check_block(finally);
                }
            }
            Statement::Expression(stmt) => {
                self.check_expression(stmt.expression);
            }
            Statement::Block(block) => self.check_block(block),
            Statement::Import(import) => self.check_import_declaration(import),
            Statement::Export(export) => match &export.kind {
                ExportKind::Declaration(inner) => self.check_statement(inner),
                ExportKind::Named(specifiers) => {
                    for specifier in *specifiers {
                        if self.scopes.lookup_value(self.current, &specifier.name).is_none()
                            && self.scopes.lookup_type(self.current, &specifier.name).is_none()
                        {
                            self.error(
                                &messages::CANNOT_FIND_NAME_0,
                                &[&specifier.name],
                                export.line,
                            );
                        }
                    }
                }
                ExportKind::Default(expression) => {
                    self.check_expression(expression);
                }
            },
            Statement::Break(_) | Statement::Continue(_) | Statement::Empty(_) => {}
        }
    }

    fn check_block(&mut self, block: &Block<'_>) {
        let saved = self.current;
        self.current = self.scopes.push(Some(saved));
        for statement in block.statements {
            self.check_statement(statement);
        }
        self.current = saved;
    }

    fn check_variable_declaration(&mut self, decl: &VariableDeclaration<'_>) {
        if self.scopes.has_local_value(self.current, &decl.name) {
            self.error(
                &messages::IDENTIFIER_0_HAS_ALREADY_BEEN_DECLARED,
                &[&decl.name],
                decl.line,
            );
        }
        let annotation = decl.type_annotation.map(|t| self.resolve_type(t));
        let variable_type = match (annotation, decl.initializer) {
            (Some(declared), Some(init)) => {
                let init_type = self.check_expression(init);
                if !self.is_assignable(init_type, declared) {
                    let source = self.type_to_string(init_type);
                    let target = self.type_to_string(declared);
                    self.error(
                        &messages::TYPE_0_IS_NOT_ASSIGNABLE_TO_TYPE_1,
                        &[&source, &target],
                        init.line(),
                    );
                }
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(init)) => {
                let init_type = self.check_expression(init);
                self.widen(init_type)
            }
            (None, None) => self.type_table.any_type,
        };
        self.scopes.define_value(
            self.current,
            &decl.name,
            ValueBinding {
                type_id: variable_type,
                kind: BindingKind::Variable,
                mutable: decl.keyword != VarKeyword::Const,
            },
        );
    }

    fn check_function_declaration(&mut self, decl: &FunctionDeclaration<'_>) {
        // Top-level signatures were collected in pass 4; nested declarations
        // bind here.
        if !self.scopes.has_local_value(self.current, &decl.name) {
            self.collect_function_signature(decl);
        }
        let declared_return = decl.return_type.map(|t| self.resolve_type(t));
        self.check_function_body(
            decl.parameters,
            decl.type_parameters,
            declared_return,
            &decl.body,
            None,
        );
    }

    fn check_class_declaration(&mut self, decl: &ClassDeclaration<'_>) {
        let class_type = if self.current == self.global {
            match self.scopes.lookup_type(self.current, &decl.name) {
                Some(id) => id,
                None => self.collect_class(decl),
            }
        } else {
            self.collect_class(decl)
        };
        self.check_class_members(decl, class_type);
    }

    fn check_class_members(&mut self, decl: &ClassDeclaration<'_>, class_type: TypeId) {
        for decorator in decl.decorators {
            self.check_expression(decorator.expression);
        }
        for member in decl.members {
            match member {
                ClassMember::Property(p) => {
                    for decorator in p.decorators {
                        self.check_expression(decorator.expression);
                    }
                    if let Some(init) = p.initializer {
                        let init_type = self.check_expression(init);
                        if let Some(annotation) = p.type_annotation {
                            let declared = self.resolve_type(annotation);
                            if !self.is_assignable(init_type, declared) {
                                let source = self.type_to_string(init_type);
                                let target = self.type_to_string(declared);
                                self.error(
                                    &messages::TYPE_0_IS_NOT_ASSIGNABLE_TO_TYPE_1,
                                    &[&source, &target],
                                    init.line(),
                                );
                            }
                        }
                    }
                }
                ClassMember::Method(m) => {
                    for decorator in m.decorators {
                        self.check_expression(decorator.expression);
                    }
                    if let Some(body) = &m.body {
                        let declared_return = m.return_type.map(|t| self.resolve_type(t));
                        self.check_function_body(
                            m.parameters,
                            m.type_parameters,
                            declared_return,
                            body,
                            Some(class_type),
                        );
                    }
                }
                ClassMember::Constructor(c) => {
                    self.check_function_body(c.parameters, None, None, &c.body, Some(class_type));
                }
            }
        }
    }

    fn check_import_declaration(&mut self, import: &ImportDeclaration<'_>) {
        // Module resolution is out of scope; imported names bind as `any`.
        let any = self.type_table.any_type;
        let mut bind = |scopes: &mut ScopeArena, env: EnvId, name: &str| {
            scopes.define_value(
                env,
                name,
                ValueBinding {
                    type_id: any,
                    kind: BindingKind::Variable,
                    mutable: false,
                },
            );
        };
        if let Some(name) = &import.default_import {
            bind(&mut self.scopes, self.current, name);
        }
        if let Some(name) = &import.namespace_import {
            bind(&mut self.scopes, self.current, name);
        }
        for specifier in import.named_imports {
            let local = specifier.alias.as_ref().unwrap_or(&specifier.name);
            bind(&mut self.scopes, self.current, local);
        }
    }

    fn check_return_statement(&mut self, ret: &ReturnStatement<'_>) {
        let actual = ret.expression.map(|e| self.check_expression(e));
        let Some(&expected) = self.return_stack.last() else {
            self.error(&messages::RETURN_OUTSIDE_FUNCTION, &[], ret.line);
            return;
        };
        let Some(expected) = expected else {
            return;
        };
        if self.is_any(expected) {
            return;
        }
        match actual {
            Some(actual_type) => {
                if !self.is_assignable(actual_type, expected) {
                    let source = self.type_to_string(actual_type);
                    let target = self.type_to_string(expected);
                    self.error(
                        &messages::TYPE_0_IS_NOT_ASSIGNABLE_TO_TYPE_1,
                        &[&source, &target],
                        ret.line,
                    );
                }
            }
            None => {
                let permits_bare_return = expected == self.type_table.void_type
                    || expected == self.type_table.undefined_type
                    || expected == self.type_table.unknown_type;
                if !permits_bare_return {
                    let target = self.type_to_string(expected);
                    self.error(
                        &messages::TYPE_0_IS_NOT_ASSIGNABLE_TO_TYPE_1,
                        &["void", &target],
                        ret.line,
                    );
                }
            }
        }
    }

    /// Check a function, method, or arrow body. The body environment parents
    /// to the global scope unless lexical scoping was requested.
    fn check_function_body(
        &mut self,
        parameters: &[Parameter<'_>],
        type_parameters: Option<&[TypeParameter<'_>]>,
        declared_return: Option<TypeId>,
        body: &Block<'_>,
        class_type: Option<TypeId>,
    ) {
        let parent = if self.options.lexical_function_scopes {
            self.current
        } else {
            self.global
        };
        let saved_env = self.current;
        let saved_class = self.current_class;
        self.current = self.scopes.push(Some(parent));
        if class_type.is_some() {
            self.current_class = class_type;
        }

        if let Some(type_parameters) = type_parameters {
            for parameter in type_parameters {
                let any = self.type_table.any_type;
                self.scopes.define_type(self.current, &parameter.name, any);
            }
        }
        for parameter in parameters {
            let type_id = match parameter.type_annotation {
                Some(annotation) => self.resolve_type(annotation),
                None => self.type_table.any_type,
            };
            if let Some(init) = parameter.initializer {
                let init_type = self.check_expression(init);
                if !self.is_assignable(init_type, type_id) {
                    let source = self.type_to_string(init_type);
                    let target = self.type_to_string(type_id);
                    self.error(
                        &messages::TYPE_0_IS_NOT_ASSIGNABLE_TO_TYPE_1,
                        &[&source, &target],
                        init.line(),
                    );
                }
            }
            self.scopes.define_value(
                self.current,
                &parameter.name,
                ValueBinding {
                    type_id,
                    kind: BindingKind::Parameter,
                    mutable: true,
                },
            );
        }

        self.return_stack.push(declared_return);
        for statement in body.statements {
            self.check_statement(statement);
        }
        self.return_stack.pop();

        self.current = saved_env;
        self.current_class = saved_class;
    }

    // ========================================================================
    // Expression checking
    // ========================================================================

    fn check_expression(&mut self, expression: &Expression<'_>) -> TypeId {
        match expression {
            Expression::NumericLiteral(n) => {
                self.type_table.add(TypeKind::NumberLiteral { value: n.value })
            }
            Expression::BigIntLiteral(_) => self.type_table.bigint_type,
            Expression::StringLiteral(s) => self.type_table.add(TypeKind::StringLiteral {
                value: s.value.clone(),
            }),
            Expression::BooleanLiteral(b) => {
                self.type_table.add(TypeKind::BooleanLiteral { value: b.value })
            }
            Expression::NullLiteral(_) => self.type_table.null_type,
            Expression::UndefinedLiteral(_) => self.type_table.undefined_type,
            Expression::Identifier(id) => match self.lookup_binding(&id.name, id.line) {
                Some(binding) => binding.type_id,
                None => self.type_table.any_type,
            },
            Expression::This(_) => self.current_class.unwrap_or(self.type_table.any_type),
            Expression::Super(_) => self.superclass_type().unwrap_or(self.type_table.any_type),
            Expression::Binary(b) => self.check_binary_expression(b),
            Expression::Logical(l) => {
                let left = self.check_expression(l.left);
                let right = self.check_expression(l.right);
                self.make_union(vec![left, right])
            }
            Expression::Unary(u) => self.check_unary_expression(u),
            Expression::Update(u) => {
                let operand_type = self.check_expression(u.operand);
                if !self.is_number_like(operand_type) && !self.is_any(operand_type) {
                    self.error(&messages::INCREMENT_DECREMENT_OPERAND_MUST_BE_NUMBER, &[], u.line);
                }
                self.type_table.number_type
            }
            Expression::Call(call) => self.check_call_expression(call),
            Expression::New(new) => self.check_new_expression(new),
            Expression::Member(member) => self.check_member_expression(member),
            Expression::Index(index) => self.check_index_expression(index),
            Expression::ObjectLiteral(object) => self.check_object_literal(object),
            Expression::ArrayLiteral(array) => self.check_array_literal(array),
            Expression::Arrow(arrow) => self.check_arrow_function(arrow),
            Expression::FunctionExpr(func) => self.check_function_expression(func),
            Expression::Conditional(cond) => {
                self.check_expression(cond.condition);
                let when_true = self.check_expression(cond.when_true);
                let when_false = self.check_expression(cond.when_false);
                self.make_union(vec![when_true, when_false])
            }
            Expression::Assignment(assignment) => self.check_assignment_expression(assignment),
            Expression::Spread(spread) => self.check_expression(spread.expression),
            Expression::Await(await_expr) => self.check_expression(await_expr.expression),
            Expression::Yield(yield_expr) => {
                if let Some(argument) = yield_expr.argument {
                    self.check_expression(argument);
                }
                self.type_table.any_type
            }
            Expression::Template(template) => {
                for part in template.expressions {
                    self.check_expression(part);
                }
                self.type_table.string_type
            }
            Expression::TaggedTemplate(tagged) => {
                self.check_expression(tagged.tag);
                for part in tagged.template.expressions {
                    self.check_expression(part);
                }
                self.type_table.any_type
            }
            Expression::TypeAssertion(assertion) => {
                self.check_expression(assertion.expression);
                self.resolve_type(assertion.type_node)
            }
            Expression::As(as_expr) => {
                self.check_expression(as_expr.expression);
                self.resolve_type(as_expr.type_node)
            }
            Expression::NonNull(non_null) => {
                let inner = self.check_expression(non_null.expression);
                self.strip_nullish(inner)
            }
            Expression::ClassExpr(class_expr) => {
                let class_type = self.build_class_type(class_expr.declaration);
                self.check_class_members(class_expr.declaration, class_type);
                class_type
            }
            Expression::Parenthesized(paren) => self.check_expression(paren.expression),
        }
    }

    fn lookup_binding(&mut self, name: &str, line: u32) -> Option<ValueBinding> {
        match self.scopes.lookup_value(self.current, name) {
            Some(binding) => Some(binding.clone()),
            None => {
                self.error(&messages::CANNOT_FIND_NAME_0, &[name], line);
                None
            }
        }
    }

    fn superclass_type(&self) -> Option<TypeId> {
        let class_type = self.current_class?;
        let TypeKind::Class(current) = self.type_table.kind(class_type) else {
            return None;
        };
        let super_name = current.superclass.as_ref()?;
        self.scopes.lookup_type(self.current, super_name)
    }

    /// Remove `null` and `undefined` arms from a union.
    fn strip_nullish(&mut self, type_id: TypeId) -> TypeId {
        let TypeKind::Union { types } = self.type_table.kind(type_id).clone() else {
            return type_id;
        };
        let filtered: Vec<TypeId> = types
            .into_iter()
            .filter(|&t| t != self.type_table.null_type && t != self.type_table.undefined_type)
            .collect();
        self.make_union(filtered)
    }

    fn check_binary_expression(&mut self, binary: &BinaryExpression<'_>) -> TypeId {
        let left = self.check_expression(binary.left);
        let right = self.check_expression(binary.right);
        use TokenKind::*;
        match binary.operator {
            PlusToken => {
                if self.is_string_like(left) || self.is_string_like(right) {
                    return self.type_table.string_type;
                }
                if !self.is_number_like(left) && !self.is_any(left) {
                    self.error(&messages::LEFT_SIDE_OF_ARITHMETIC_MUST_BE_NUMBER, &[], binary.line);
                }
                if !self.is_number_like(right) && !self.is_any(right) {
                    self.error(
                        &messages::RIGHT_SIDE_OF_ARITHMETIC_MUST_BE_NUMBER,
                        &[],
                        binary.line,
                    );
                }
                self.type_table.number_type
            }
            MinusToken | AsteriskToken | SlashToken | PercentToken | AsteriskAsteriskToken => {
                if !self.is_number_like(left) && !self.is_any(left) {
                    self.error(&messages::LEFT_SIDE_OF_ARITHMETIC_MUST_BE_NUMBER, &[], binary.line);
                }
                if !self.is_number_like(right) && !self.is_any(right) {
                    self.error(
                        &messages::RIGHT_SIDE_OF_ARITHMETIC_MUST_BE_NUMBER,
                        &[],
                        binary.line,
                    );
                }
                self.type_table.number_type
            }
            LessThanToken | GreaterThanToken | LessThanEqualsToken | GreaterThanEqualsToken
            | EqualsEqualsToken | ExclamationEqualsToken | EqualsEqualsEqualsToken
            | ExclamationEqualsEqualsToken | InstanceOfKeyword | InKeyword => {
                self.type_table.boolean_type
            }
            LessThanLessThanToken
            | GreaterThanGreaterThanToken
            | GreaterThanGreaterThanGreaterThanToken
            | AmpersandToken
            | BarToken
            | CaretToken => self.type_table.number_type,
            _ => self.type_table.any_type,
        }
    }

    fn check_unary_expression(&mut self, unary: &UnaryExpression<'_>) -> TypeId {
        self.check_expression(unary.operand);
        use TokenKind::*;
        match unary.operator {
            ExclamationToken | DeleteKeyword => self.type_table.boolean_type,
            MinusToken | PlusToken | TildeToken => self.type_table.number_type,
            TypeOfKeyword => self.type_table.string_type,
            _ => self.type_table.any_type,
        }
    }

    fn check_call_expression(&mut self, call: &CallExpression<'_>) -> TypeId {
        // `super(…)` dispatches to the superclass constructor.
        if matches!(call.callee, Expression::Super(_)) {
            let arguments = self.check_argument_types(call.arguments);
            if let Some(super_type) = self.superclass_type() {
                if let TypeKind::Class(super_class) = self.type_table.kind(super_type).clone() {
                    if let Some(ctor) = &super_class.constructor {
                        self.check_call_arguments(ctor, &arguments, call.line);
                    }
                }
            }
            return self.type_table.void_type;
        }

        let callee_type = self.check_expression(call.callee);
        let arguments = self.check_argument_types(call.arguments);

        match self.type_table.kind(callee_type).clone() {
            TypeKind::Function(signature) => {
                self.check_call_arguments(&signature, &arguments, call.line);
                signature.return_type
            }
            TypeKind::Intrinsic { name: "any" } => self.type_table.any_type,
            _ => {
                let rendered = self.type_to_string(callee_type);
                self.error(
                    &messages::THIS_EXPRESSION_IS_NOT_CALLABLE,
                    &[&rendered],
                    call.line,
                );
                self.type_table.any_type
            }
        }
    }

    /// Check every argument, remembering which were spread elements.
    fn check_argument_types(&mut self, arguments: &[Expression<'_>]) -> Vec<(TypeId, bool)> {
        arguments
            .iter()
            .map(|argument| match argument {
                Expression::Spread(spread) => (self.check_expression(spread.expression), true),
                _ => (self.check_expression(argument), false),
            })
            .collect()
    }

    fn check_call_arguments(
        &mut self,
        signature: &FunctionSignature,
        arguments: &[(TypeId, bool)],
        line: u32,
    ) {
        let required = signature.required_count();
        let total = signature.parameters.len();
        let count = arguments.len();

        if count < required {
            self.error(
                &messages::EXPECTED_AT_LEAST_0_ARGUMENTS_BUT_GOT_1,
                &[&required.to_string(), &count.to_string()],
                line,
            );
        } else if !signature.has_rest() && count > total {
            self.error(
                &messages::EXPECTED_AT_MOST_0_ARGUMENTS_BUT_GOT_1,
                &[&total.to_string(), &count.to_string()],
                line,
            );
        }

        // Spread arguments were checked on collection but are not matched
        // positionally.
        let positional = signature.positional_count().min(count);
        for i in 0..positional {
            let (argument_type, is_spread) = arguments[i];
            if is_spread {
                continue;
            }
            let parameter = &signature.parameters[i];
            if !self.is_assignable(argument_type, parameter.type_id) {
                let source = self.type_to_string(argument_type);
                let target = self.type_to_string(parameter.type_id);
                self.error(
                    &messages::ARGUMENT_OF_TYPE_0_IS_NOT_ASSIGNABLE_TO_PARAMETER_OF_TYPE_1,
                    &[&source, &target],
                    line,
                );
            }
        }
    }

    fn check_new_expression(&mut self, new: &NewExpression<'_>) -> TypeId {
        let callee_type = self.check_expression(new.callee);
        let arguments = self.check_argument_types(new.arguments);
        match self.type_table.kind(callee_type).clone() {
            TypeKind::Class(callee_class) => {
                if let Some(ctor) = &callee_class.constructor {
                    self.check_call_arguments(ctor, &arguments, new.line);
                }
                callee_type
            }
            TypeKind::Intrinsic { name: "any" } => self.type_table.any_type,
            _ => {
                let rendered = self.type_to_string(callee_type);
                self.error(
                    &messages::THIS_EXPRESSION_IS_NOT_CONSTRUCTABLE,
                    &[&rendered],
                    new.line,
                );
                self.type_table.any_type
            }
        }
    }

    fn check_member_expression(&mut self, member: &MemberExpression<'_>) -> TypeId {
        // Accessing through the class or enumeration *name* reads the
        // static side / the member table; anything else is instance access.
        if let Expression::Identifier(id) = member.object {
            let Some(binding) = self.lookup_binding(&id.name, id.line) else {
                return self.type_table.any_type;
            };
            match binding.kind {
                BindingKind::Enum => {
                    let TypeKind::Enum(enum_type) = self.type_table.kind(binding.type_id).clone()
                    else {
                        return self.type_table.any_type;
                    };
                    match enum_type.members.get(&member.property) {
                        Some(value) => {
                            if enum_type.is_const {
                                self.error(
                                    &messages::CONST_ENUM_MEMBER_NOT_INLINED,
                                    &[&enum_type.name, &member.property],
                                    member.line,
                                );
                            }
                            match value {
                                EnumMemberValue::Int(_) => self.type_table.number_type,
                                EnumMemberValue::Str(_) => self.type_table.string_type,
                            }
                        }
                        None => {
                            self.error(
                                &messages::PROPERTY_0_DOES_NOT_EXIST_ON_TYPE_1,
                                &[&member.property, &enum_type.name],
                                member.line,
                            );
                            self.type_table.any_type
                        }
                    }
                }
                BindingKind::Class => {
                    let TypeKind::Class(named_class) =
                        self.type_table.kind(binding.type_id).clone()
                    else {
                        return self.type_table.any_type;
                    };
                    match named_class.static_members.get(&member.property) {
                        Some(info) => info.type_id,
                        None => {
                            self.error(
                                &messages::PROPERTY_0_DOES_NOT_EXIST_ON_TYPE_1,
                                &[&member.property, &named_class.name],
                                member.line,
                            );
                            self.type_table.any_type
                        }
                    }
                }
                _ => self.member_type(binding.type_id, &member.property, member.line),
            }
        } else {
            let object_type = self.check_expression(member.object);
            self.member_type(object_type, &member.property, member.line)
        }
    }

    /// Instance member access on a value of the given type.
    fn member_type(&mut self, object_type: TypeId, property: &str, line: u32) -> TypeId {
        match self.type_table.kind(object_type).clone() {
            TypeKind::Intrinsic { name: "any" } => self.type_table.any_type,
            TypeKind::Intrinsic { name: "string" } | TypeKind::StringLiteral { .. } => {
                if property == "length" {
                    self.type_table.number_type
                } else if STRING_METHODS.contains(&property) {
                    self.type_table.any_type
                } else {
                    let rendered = self.type_to_string(object_type);
                    self.error(
                        &messages::PROPERTY_0_DOES_NOT_EXIST_ON_TYPE_1,
                        &[property, &rendered],
                        line,
                    );
                    self.type_table.any_type
                }
            }
            TypeKind::Array { .. } | TypeKind::Tuple { .. } => {
                if property == "length" {
                    self.type_table.number_type
                } else if ARRAY_METHODS.contains(&property) {
                    self.type_table.any_type
                } else {
                    let rendered = self.type_to_string(object_type);
                    self.error(
                        &messages::PROPERTY_0_DOES_NOT_EXIST_ON_TYPE_1,
                        &[property, &rendered],
                        line,
                    );
                    self.type_table.any_type
                }
            }
            TypeKind::Interface { members, index, name } => match members.get(property) {
                Some(info) => info.type_id,
                None => {
                    if let Some(index) = index {
                        return index.value_type;
                    }
                    let rendered = if name.is_empty() {
                        self.type_to_string(object_type)
                    } else {
                        name
                    };
                    self.error(
                        &messages::PROPERTY_0_DOES_NOT_EXIST_ON_TYPE_1,
                        &[property, &rendered],
                        line,
                    );
                    self.type_table.any_type
                }
            },
            TypeKind::Class(object_class) => match object_class.instance_members.get(property) {
                Some(info) => info.type_id,
                None => {
                    self.error(
                        &messages::PROPERTY_0_DOES_NOT_EXIST_ON_TYPE_1,
                        &[property, &object_class.name],
                        line,
                    );
                    self.type_table.any_type
                }
            },
            // Primitive wrappers, unions, functions and enum values are not
            // modeled member-by-member in this core.
            _ => self.type_table.any_type,
        }
    }

    fn check_index_expression(&mut self, index: &IndexExpression<'_>) -> TypeId {
        let object_type = self.check_expression(index.object);
        self.check_expression(index.index);
        match self.type_table.kind(object_type).clone() {
            TypeKind::Array { element } => element,
            TypeKind::Tuple { elements } => {
                if let Expression::NumericLiteral(n) = index.index {
                    if let Some(&element) = elements.get(n.value as usize) {
                        return element;
                    }
                }
                self.make_union(elements)
            }
            TypeKind::Interface { members, index: signature, .. } => {
                if let Expression::StringLiteral(s) = index.index {
                    if let Some(info) = members.get(&s.value) {
                        return info.type_id;
                    }
                }
                signature
                    .map(|i| i.value_type)
                    .unwrap_or(self.type_table.any_type)
            }
            TypeKind::Intrinsic { name: "string" } | TypeKind::StringLiteral { .. } => {
                self.type_table.string_type
            }
            _ => self.type_table.any_type,
        }
    }

    fn check_object_literal(&mut self, object: &ObjectLiteral<'_>) -> TypeId {
        let mut members: IndexMap<String, MemberInfo> = IndexMap::new();
        for property in object.properties {
            let value_type = match property.value {
                Some(value) => self.check_expression(value),
                // Shorthand `{ name }` reads the binding of the same name.
                None => match self.lookup_binding(&property.key, property.line) {
                    Some(binding) => binding.type_id,
                    None => self.type_table.any_type,
                },
            };
            members.insert(
                property.key.clone(),
                MemberInfo {
                    type_id: self.widen(value_type),
                    optional: false,
                    readonly: false,
                },
            );
        }
        self.type_table.add(TypeKind::Interface {
            name: String::new(),
            members,
            index: None,
        })
    }

    fn check_array_literal(&mut self, array: &ArrayLiteral<'_>) -> TypeId {
        if array.elements.is_empty() {
            let element = self.type_table.any_type;
            return self.type_table.add(TypeKind::Array { element });
        }
        let mut element_types = Vec::new();
        for element in array.elements {
            match element {
                Expression::Spread(spread) => {
                    let spread_type = self.check_expression(spread.expression);
                    match self.type_table.kind(spread_type) {
                        TypeKind::Array { element } => element_types.push(*element),
                        _ => element_types.push(self.type_table.any_type),
                    }
                }
                _ => element_types.push(self.check_expression(element)),
            }
        }
        let element = self.make_union(element_types);
        self.type_table.add(TypeKind::Array { element })
    }

    fn check_arrow_function(&mut self, arrow: &ArrowFunction<'_>) -> TypeId {
        let declared_return = arrow.return_type.map(|t| self.resolve_type(t));
        let return_type = match &arrow.body {
            ArrowBody::Block(block) => {
                self.check_function_body(arrow.parameters, None, declared_return, block, None);
                declared_return.unwrap_or(self.type_table.void_type)
            }
            ArrowBody::Expression(expression) => {
                // The expression body is checked in the function's own
                // environment; its type is the inferred return type.
                let parent = if self.options.lexical_function_scopes {
                    self.current
                } else {
                    self.global
                };
                let saved = self.current;
                self.current = self.scopes.push(Some(parent));
                for parameter in arrow.parameters {
                    let type_id = match parameter.type_annotation {
                        Some(annotation) => self.resolve_type(annotation),
                        None => self.type_table.any_type,
                    };
                    self.scopes.define_value(
                        self.current,
                        &parameter.name,
                        ValueBinding {
                            type_id,
                            kind: BindingKind::Parameter,
                            mutable: true,
                        },
                    );
                }
                let body_type = self.check_expression(expression);
                self.current = saved;
                let inferred = declared_return.unwrap_or(body_type);
                if let Some(declared) = declared_return {
                    if !self.is_assignable(body_type, declared) {
                        let source = self.type_to_string(body_type);
                        let target = self.type_to_string(declared);
                        self.error(
                            &messages::TYPE_0_IS_NOT_ASSIGNABLE_TO_TYPE_1,
                            &[&source, &target],
                            expression.line(),
                        );
                    }
                }
                inferred
            }
        };
        let signature = self.signature_from(arrow.parameters, None, return_type);
        self.type_table.add(TypeKind::Function(signature))
    }

    fn check_function_expression(&mut self, func: &FunctionExpression<'_>) -> TypeId {
        let declared_return = func.return_type.map(|t| self.resolve_type(t));
        self.check_function_body(func.parameters, None, declared_return, &func.body, None);
        let return_type = declared_return.unwrap_or(self.type_table.void_type);
        let signature = self.signature_from(func.parameters, None, return_type);
        self.type_table.add(TypeKind::Function(signature))
    }

    fn check_assignment_expression(&mut self, assignment: &AssignmentExpression<'_>) -> TypeId {
        let value_type = self.check_expression(assignment.value);
        let mut target = assignment.target;
        while let Expression::Parenthesized(paren) = target {
            target = paren.expression;
        }
        match target {
            Expression::Identifier(id) => {
                let Some(binding) = self.lookup_binding(&id.name, id.line) else {
                    return value_type;
                };
                if !binding.mutable {
                    self.error(
                        &messages::CANNOT_ASSIGN_TO_0_BECAUSE_IT_IS_A_CONSTANT,
                        &[&id.name],
                        assignment.line,
                    );
                }
                self.check_assignment_operator(
                    assignment.operator,
                    binding.type_id,
                    value_type,
                    assignment.line,
                );
            }
            Expression::Member(member) => {
                let object_type = match member.object {
                    Expression::This(_) => {
                        self.current_class.unwrap_or(self.type_table.any_type)
                    }
                    _ => self.check_expression(member.object),
                };
                let info = match self.type_table.kind(object_type).clone() {
                    TypeKind::Interface { members, .. } => members.get(&member.property).cloned(),
                    TypeKind::Class(object_class) => {
                        object_class.instance_members.get(&member.property).cloned()
                    }
                    _ => None,
                };
                match info {
                    Some(info) => {
                        if info.readonly {
                            self.error(
                                &messages::CANNOT_ASSIGN_TO_0_BECAUSE_IT_IS_A_READ_ONLY_PROPERTY,
                                &[&member.property],
                                assignment.line,
                            );
                        }
                        self.check_assignment_operator(
                            assignment.operator,
                            info.type_id,
                            value_type,
                            assignment.line,
                        );
                    }
                    None => {
                        // Missing members surface through the member check.
                        self.member_type(object_type, &member.property, member.line);
                    }
                }
            }
            Expression::Index(index) => {
                self.check_expression(index.object);
                self.check_expression(index.index);
            }
            _ => {}
        }
        value_type
    }

    fn check_assignment_operator(
        &mut self,
        operator: TokenKind,
        target_type: TypeId,
        value_type: TypeId,
        line: u32,
    ) {
        use TokenKind::*;
        match operator {
            EqualsToken => {
                if !self.is_assignable(value_type, target_type) {
                    let source = self.type_to_string(value_type);
                    let target = self.type_to_string(target_type);
                    self.error(
                        &messages::TYPE_0_IS_NOT_ASSIGNABLE_TO_TYPE_1,
                        &[&source, &target],
                        line,
                    );
                }
            }
            PlusEqualsToken => {
                if self.is_string_like(target_type) {
                    return;
                }
                if !self.is_number_like(target_type) && !self.is_any(target_type) {
                    self.error(&messages::LEFT_SIDE_OF_ARITHMETIC_MUST_BE_NUMBER, &[], line);
                }
                if !self.is_number_like(value_type)
                    && !self.is_any(value_type)
                    && !self.is_string_like(value_type)
                {
                    self.error(&messages::RIGHT_SIDE_OF_ARITHMETIC_MUST_BE_NUMBER, &[], line);
                }
            }
            MinusEqualsToken | AsteriskEqualsToken | AsteriskAsteriskEqualsToken
            | SlashEqualsToken | PercentEqualsToken | LessThanLessThanEqualsToken
            | GreaterThanGreaterThanEqualsToken | GreaterThanGreaterThanGreaterThanEqualsToken
            | AmpersandEqualsToken | BarEqualsToken | CaretEqualsToken => {
                if !self.is_number_like(target_type) && !self.is_any(target_type) {
                    self.error(&messages::LEFT_SIDE_OF_ARITHMETIC_MUST_BE_NUMBER, &[], line);
                }
                if !self.is_number_like(value_type) && !self.is_any(value_type) {
                    self.error(&messages::RIGHT_SIDE_OF_ARITHMETIC_MUST_BE_NUMBER, &[], line);
                }
            }
            // Logical assignments take any operand shapes.
            _ => {}
        }
    }
}

/// Unwrap `export <declaration>` for the collection passes.
fn as_declaration<'s, 'a>(statement: &'s Statement<'a>) -> &'s Statement<'a> {
    match statement {
        Statement::Export(export) => match &export.kind {
            ExportKind::Declaration(inner) => *inner,
            _ => statement,
        },
        _ => statement,
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
