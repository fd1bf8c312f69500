//! Lexical environments.
//!
//! An environment is a pair of mappings (value bindings and type bindings)
//! with a parent link. Environments live in a [`ScopeArena`] and are
//! addressed by `EnvId`, which lets a function body parent to the global
//! environment regardless of where the checker's cursor currently is.

use detype_ast::types::{EnvId, TypeId};
use rustc_hash::FxHashMap;

/// What kind of declaration produced a value binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Variable,
    Parameter,
    Function,
    Class,
    Enum,
}

#[derive(Debug, Clone)]
pub struct ValueBinding {
    pub type_id: TypeId,
    pub kind: BindingKind,
    pub mutable: bool,
}

#[derive(Debug, Default)]
pub struct Environment {
    values: FxHashMap<String, ValueBinding>,
    types: FxHashMap<String, TypeId>,
    parent: Option<EnvId>,
}

/// Arena of environments. Lookup walks the parent chain; definition only
/// touches the addressed environment.
#[derive(Debug, Default)]
pub struct ScopeArena {
    environments: Vec<Environment>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self {
            environments: Vec::new(),
        }
    }

    /// Create a new environment with the given parent.
    pub fn push(&mut self, parent: Option<EnvId>) -> EnvId {
        let id = EnvId(self.environments.len() as u32);
        self.environments.push(Environment {
            values: FxHashMap::default(),
            types: FxHashMap::default(),
            parent,
        });
        id
    }

    pub fn define_value(&mut self, env: EnvId, name: &str, binding: ValueBinding) {
        self.environments[env.index()]
            .values
            .insert(name.to_string(), binding);
    }

    pub fn define_type(&mut self, env: EnvId, name: &str, type_id: TypeId) {
        self.environments[env.index()]
            .types
            .insert(name.to_string(), type_id);
    }

    /// Whether `name` is bound as a value in this environment itself.
    pub fn has_local_value(&self, env: EnvId, name: &str) -> bool {
        self.environments[env.index()].values.contains_key(name)
    }

    /// Resolve a value binding, walking the parent chain.
    pub fn lookup_value(&self, env: EnvId, name: &str) -> Option<&ValueBinding> {
        let mut current = Some(env);
        while let Some(id) = current {
            let environment = &self.environments[id.index()];
            if let Some(binding) = environment.values.get(name) {
                return Some(binding);
            }
            current = environment.parent;
        }
        None
    }

    /// Resolve a type binding, walking the parent chain.
    pub fn lookup_type(&self, env: EnvId, name: &str) -> Option<TypeId> {
        let mut current = Some(env);
        while let Some(id) = current {
            let environment = &self.environments[id.index()];
            if let Some(&type_id) = environment.types.get(name) {
                return Some(type_id);
            }
            current = environment.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_parents() {
        let mut scopes = ScopeArena::new();
        let global = scopes.push(None);
        let child = scopes.push(Some(global));
        scopes.define_value(
            global,
            "x",
            ValueBinding {
                type_id: TypeId(3),
                kind: BindingKind::Variable,
                mutable: true,
            },
        );
        assert!(scopes.lookup_value(child, "x").is_some());
        assert!(!scopes.has_local_value(child, "x"));
        assert!(scopes.has_local_value(global, "x"));
    }

    #[test]
    fn test_define_shadows_parent() {
        let mut scopes = ScopeArena::new();
        let global = scopes.push(None);
        let child = scopes.push(Some(global));
        scopes.define_value(
            global,
            "x",
            ValueBinding {
                type_id: TypeId(3),
                kind: BindingKind::Variable,
                mutable: true,
            },
        );
        scopes.define_value(
            child,
            "x",
            ValueBinding {
                type_id: TypeId(2),
                kind: BindingKind::Variable,
                mutable: false,
            },
        );
        assert_eq!(scopes.lookup_value(child, "x").unwrap().type_id, TypeId(2));
        assert_eq!(scopes.lookup_value(global, "x").unwrap().type_id, TypeId(3));
    }
}
