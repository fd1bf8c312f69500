//! detype_checker: Multi-pass structural type checker.
//!
//! Checking happens in five passes so that the mutually recursive top-level
//! namespace resolves without order-dependent "not found" errors: type
//! aliases and enumerations first, then interfaces, then classes, then
//! function signatures, and finally every statement body. Types live in a
//! [`types::TypeTable`] addressed by `TypeId`; lexical environments live in
//! a parent-linked [`scope::ScopeArena`].

mod checker;
mod scope;
mod types;

pub use checker::{check, Checker, CheckerOptions};
pub use scope::{BindingKind, Environment, ScopeArena, ValueBinding};
pub use types::{
    ClassType, EnumMemberValue, EnumType, FunctionSignature, IndexInfo, MemberInfo,
    SignatureParameter, Type, TypeKind, TypeTable,
};
