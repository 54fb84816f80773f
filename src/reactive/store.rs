//! Scoped reactive store: scope arena, subscriptions, dirty tracking.
//!
//! Each bound subtree that declares state owns a scope. Lookup reads through
//! the parent chain; writes always land in the scope they are invoked on, so
//! a child can shadow a parent key but never mutate the parent's mapping.
//!
//! Mutation marks subscribed bindings dirty; the runtime drains the dirty set
//! in rounds (see `Runtime::flush`), which keeps notification synchronous,
//! re-entrant-safe, and exactly-once per binding per round.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use slotmap::{new_key_type, SlotMap};

use crate::bind::BindingId;
use crate::expr::Value;

new_key_type! {
    /// Unique identifier for a scope. Copy, generational.
    pub struct ScopeId;
}

struct ScopeState {
    values: BTreeMap<String, Value>,
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    /// key -> bindings that read it from this scope.
    subscribers: HashMap<String, BTreeSet<BindingId>>,
}

/// The scope arena plus the pending dirty-binding queue.
pub struct ScopeTree {
    scopes: SlotMap<ScopeId, ScopeState>,
    /// Reverse index for teardown: binding -> (scope, key) edges.
    edges: HashMap<BindingId, Vec<(ScopeId, String)>>,
    /// Bindings marked by `set`, in notification order, possibly duplicated.
    dirty: Vec<BindingId>,
}

impl ScopeTree {
    /// Create an empty scope tree.
    pub fn new() -> Self {
        Self {
            scopes: SlotMap::with_key(),
            edges: HashMap::new(),
            dirty: Vec::new(),
        }
    }

    /// Create a scope with the given initial values.
    ///
    /// With a parent, lookups read through to it; writes never do.
    pub fn create_scope(
        &mut self,
        parent: Option<ScopeId>,
        values: BTreeMap<String, Value>,
    ) -> ScopeId {
        let id = self.scopes.insert(ScopeState {
            values,
            parent,
            children: Vec::new(),
            subscribers: HashMap::new(),
        });
        if let Some(parent) = parent {
            if let Some(state) = self.scopes.get_mut(parent) {
                state.children.push(id);
            }
        }
        id
    }

    /// Remove a scope and all its descendant scopes.
    ///
    /// Subscriptions registered on the removed scopes are dropped.
    pub fn remove_scope(&mut self, id: ScopeId) {
        let Some(state) = self.scopes.get(id) else {
            return;
        };
        if let Some(parent) = state.parent {
            if let Some(parent_state) = self.scopes.get_mut(parent) {
                parent_state.children.retain(|&c| c != id);
            }
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(state) = self.scopes.remove(current) {
                stack.extend(state.children);
                for bindings in state.subscribers.into_values() {
                    for binding in bindings {
                        if let Some(edges) = self.edges.get_mut(&binding) {
                            edges.retain(|(s, _)| *s != current);
                        }
                    }
                }
            }
        }
    }

    /// Whether the scope exists.
    pub fn contains(&self, id: ScopeId) -> bool {
        self.scopes.contains_key(id)
    }

    /// The parent of a scope, if any.
    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes.get(id).and_then(|s| s.parent)
    }

    /// Look up a key through the scope chain, innermost first.
    pub fn get(&self, scope: ScopeId, key: &str) -> Option<Value> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let state = self.scopes.get(id)?;
            if let Some(value) = state.values.get(key) {
                return Some(value.clone());
            }
            current = state.parent;
        }
        None
    }

    /// Look up a key in this scope only, without read-through.
    pub fn get_local(&self, scope: ScopeId, key: &str) -> Option<Value> {
        self.scopes.get(scope)?.values.get(key).cloned()
    }

    /// Write a key into `scope` and mark subscribed bindings dirty.
    ///
    /// The write is always local: if the key lives in an ancestor, this
    /// creates a shadowing entry instead of mutating the ancestor. Bindings
    /// subscribed in `scope` and in descendant scopes are notified, but the
    /// walk stops at any child that shadows the key (its bindings resolve to
    /// the shadow value, which did not change).
    pub fn set(&mut self, scope: ScopeId, key: &str, value: Value) {
        let Some(state) = self.scopes.get_mut(scope) else {
            return;
        };
        state.values.insert(key.to_string(), value);
        self.mark_dirty(scope, key);
    }

    fn mark_dirty(&mut self, scope: ScopeId, key: &str) {
        let mut stack = vec![(scope, true)];
        while let Some((id, is_origin)) = stack.pop() {
            let Some(state) = self.scopes.get(id) else {
                continue;
            };
            // A descendant with its own entry shadows the written key.
            if !is_origin && state.values.contains_key(key) {
                continue;
            }
            if let Some(bindings) = state.subscribers.get(key) {
                self.dirty.extend(bindings.iter().copied());
            }
            for &child in &state.children {
                stack.push((child, false));
            }
        }
    }

    /// Subscribe a binding to mutations of `key` as seen from `scope`.
    pub fn subscribe(&mut self, scope: ScopeId, key: &str, binding: BindingId) {
        let Some(state) = self.scopes.get_mut(scope) else {
            return;
        };
        state
            .subscribers
            .entry(key.to_string())
            .or_default()
            .insert(binding);
        self.edges
            .entry(binding)
            .or_default()
            .push((scope, key.to_string()));
    }

    /// Drop every subscription held by a binding.
    pub fn unsubscribe(&mut self, binding: BindingId) {
        let Some(edges) = self.edges.remove(&binding) else {
            return;
        };
        for (scope, key) in edges {
            if let Some(state) = self.scopes.get_mut(scope) {
                if let Some(bindings) = state.subscribers.get_mut(&key) {
                    bindings.remove(&binding);
                }
            }
        }
    }

    /// Number of subscription edges held by a binding. Test/diagnostic aid.
    pub fn subscription_count(&self, binding: BindingId) -> usize {
        self.edges.get(&binding).map(Vec::len).unwrap_or(0)
    }

    /// Take the pending dirty bindings, deduplicated in notification order.
    ///
    /// Each binding appears at most once per take, which is what guarantees
    /// exactly-one re-evaluation per mutation within a flush round.
    pub fn take_dirty(&mut self) -> Vec<BindingId> {
        let mut seen = BTreeSet::new();
        self.dirty
            .drain(..)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Whether any binding is pending notification.
    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Number of live scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether there are no scopes.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
