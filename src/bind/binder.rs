//! The binder walks attached markup, compiles directives, and keeps the
//! live binding table.
//!
//! Binding is a single depth-first pass: `w-scope` elements open a nested
//! scope for their subtree, reactive directives become [`Binding`] entries
//! subscribed to the identifiers they read, and event directives become
//! [`Trigger`] entries the runtime consults on dispatch. The pass is
//! idempotent per node, so re-binding a subtree after a swap touches only
//! the freshly inserted nodes.

use slotmap::{new_key_type, SecondaryMap, SlotMap};
use tracing::warn;

use super::directive::{compile, Directive};
use crate::dom::{Dom, NodeId};
use crate::expr::{evaluate, EvalError, Expr, Value};
use crate::fetch::RequestDescriptor;
use crate::reactive::{ScopeId, ScopeTree};

new_key_type! {
    /// Stable handle for one reactive binding.
    pub struct BindingId;
}

/// One reactive directive bound to one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub node: NodeId,
    /// Scope the binding's expression resolves against.
    pub scope: ScopeId,
    pub kind: BindingKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    /// Keep the node's text content equal to the rendered expression.
    Text(Expr),
    /// Toggle the node's visibility on the expression's truthiness.
    Show(Expr),
}

/// One event directive bound to one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub event: String,
    pub action: TriggerAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerAction {
    /// Run a handler expression against the node's scope.
    Handler(Expr),
    /// Dispatch a server round-trip.
    Request(RequestDescriptor),
}

/// A directive that could not be compiled or applied; the node's other
/// directives stay live.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedBinding {
    pub node: NodeId,
    pub detail: String,
}

/// Live binding state for one document.
#[derive(Debug, Default)]
pub struct Binder {
    bindings: SlotMap<BindingId, Binding>,
    by_node: SecondaryMap<NodeId, Vec<BindingId>>,
    triggers: SecondaryMap<NodeId, Vec<Trigger>>,
    /// Scope each bound node's own expressions resolve against. Also the
    /// marker for "already bound".
    node_scope: SecondaryMap<NodeId, ScopeId>,
    /// Scope created by this node's `w-scope`, for teardown.
    owned_scope: SecondaryMap<NodeId, ScopeId>,
}

impl Binder {
    pub fn new() -> Self {
        Binder::default()
    }

    /// Bind every element from `root` down, resolving against `inherited`.
    ///
    /// Already-bound nodes are left untouched but still descended through,
    /// so calling this on a parent after a swap binds only the inserted
    /// children. Initial values for new reactive bindings are applied
    /// before returning.
    pub fn bind_subtree(
        &mut self,
        dom: &mut Dom,
        scopes: &mut ScopeTree,
        root: NodeId,
        inherited: ScopeId,
    ) -> Vec<SkippedBinding> {
        let mut skipped = Vec::new();
        let mut fresh = Vec::new();
        let mut stack = vec![(root, inherited)];

        while let Some((node, scope)) = stack.pop() {
            let child_scope = if let Some(&bound) = self.node_scope.get(node) {
                // Bound on a previous pass; its subtree scope is recorded.
                self.owned_scope.get(node).copied().unwrap_or(bound)
            } else {
                self.bind_node(dom, scopes, node, scope, &mut fresh, &mut skipped)
            };
            // Reverse so the stack pops children in document order.
            for &child in dom.children(node).iter().rev() {
                stack.push((child, child_scope));
            }
        }

        for id in fresh {
            self.apply_one(dom, scopes, id, &mut skipped);
        }
        skipped
    }

    /// Compile one element's directives. Returns the scope its children
    /// inherit.
    fn bind_node(
        &mut self,
        dom: &mut Dom,
        scopes: &mut ScopeTree,
        node: NodeId,
        inherited: ScopeId,
        fresh: &mut Vec<BindingId>,
        skipped: &mut Vec<SkippedBinding>,
    ) -> ScopeId {
        let Some(data) = dom.get(node) else {
            return inherited;
        };
        if data.is_text() {
            return inherited;
        }
        let (directives, errors) = compile(data.attributes());
        for error in errors {
            warn!(?node, %error, "directive skipped");
            skipped.push(SkippedBinding {
                node,
                detail: error.to_string(),
            });
        }

        // A scope declaration changes what the rest of the element sees,
        // so it is resolved before the other directives.
        let mut scope = inherited;
        for directive in &directives {
            if let Directive::Scope(expr) = directive {
                match declare_scope(expr, scopes, inherited) {
                    Ok(created) => {
                        self.owned_scope.insert(node, created);
                        scope = created;
                    }
                    Err(error) => {
                        warn!(?node, %error, "scope declaration skipped");
                        skipped.push(SkippedBinding {
                            node,
                            detail: error.to_string(),
                        });
                    }
                }
            }
        }
        self.node_scope.insert(node, scope);

        for directive in directives {
            match directive {
                Directive::Scope(_) => {}
                Directive::Text(expr) => {
                    fresh.push(self.insert_binding(scopes, node, scope, BindingKind::Text(expr)));
                }
                Directive::Show(expr) => {
                    fresh.push(self.insert_binding(scopes, node, scope, BindingKind::Show(expr)));
                }
                Directive::Handler { event, expr } => {
                    if let Some(entry) = self.triggers.entry(node) {
                        entry.or_default().push(Trigger {
                            event,
                            action: TriggerAction::Handler(expr),
                        });
                    }
                }
                Directive::Request(descriptor) => {
                    let event = descriptor.event.clone();
                    if let Some(entry) = self.triggers.entry(node) {
                        entry.or_default().push(Trigger {
                            event,
                            action: TriggerAction::Request(descriptor),
                        });
                    }
                }
            }
        }
        scope
    }

    fn insert_binding(
        &mut self,
        scopes: &mut ScopeTree,
        node: NodeId,
        scope: ScopeId,
        kind: BindingKind,
    ) -> BindingId {
        let reads = match &kind {
            BindingKind::Text(expr) | BindingKind::Show(expr) => expr.reads(),
        };
        let id = self.bindings.insert(Binding { node, scope, kind });
        for key in reads {
            scopes.subscribe(scope, &key, id);
        }
        if let Some(entry) = self.by_node.entry(node) {
            entry.or_default().push(id);
        }
        id
    }

    /// Re-apply a set of bindings, typically the store's dirty set.
    ///
    /// Bindings whose node has left the document are torn down instead of
    /// applied; evaluation failures are reported and leave the previous
    /// output in place.
    pub fn refresh(
        &mut self,
        dom: &mut Dom,
        scopes: &mut ScopeTree,
        ids: &[BindingId],
    ) -> Vec<SkippedBinding> {
        let mut skipped = Vec::new();
        for &id in ids {
            let Some(binding) = self.bindings.get(id) else {
                continue;
            };
            if !dom.is_attached(binding.node) {
                self.remove_binding(scopes, id);
                continue;
            }
            self.apply_one(dom, scopes, id, &mut skipped);
        }
        skipped
    }

    fn apply_one(
        &mut self,
        dom: &mut Dom,
        scopes: &mut ScopeTree,
        id: BindingId,
        skipped: &mut Vec<SkippedBinding>,
    ) {
        let Some(binding) = self.bindings.get(id) else {
            return;
        };
        let node = binding.node;
        let scope = binding.scope;
        let kind = binding.kind.clone();
        if !dom.is_attached(node) {
            return;
        }
        let result = match &kind {
            BindingKind::Text(expr) => evaluate(expr, scopes, scope).map(|value| {
                let removed = dom.set_text(node, &value.render());
                self.forget_nodes(scopes, &removed);
            }),
            BindingKind::Show(expr) => evaluate(expr, scopes, scope).map(|value| {
                if let Some(data) = dom.get_mut(node) {
                    data.visible = value.is_truthy();
                }
            }),
        };
        if let Err(error) = result {
            warn!(?node, %error, "binding evaluation failed");
            skipped.push(SkippedBinding {
                node,
                detail: error.to_string(),
            });
        }
    }

    /// Tear down everything bound to `nodes` (a removed subtree).
    ///
    /// Scopes owned by removed nodes are dropped; removing an ancestor's
    /// scope first is fine, descendants are checked before removal.
    pub fn unbind_nodes(&mut self, scopes: &mut ScopeTree, nodes: &[NodeId]) {
        self.forget_nodes(scopes, nodes);
        for &node in nodes {
            if let Some(scope) = self.owned_scope.remove(node) {
                if scopes.contains(scope) {
                    scopes.remove_scope(scope);
                }
            }
        }
    }

    /// Drop binding/trigger records for `nodes` without touching scopes.
    fn forget_nodes(&mut self, scopes: &mut ScopeTree, nodes: &[NodeId]) {
        for &node in nodes {
            if let Some(ids) = self.by_node.remove(node) {
                for id in ids {
                    scopes.unsubscribe(id);
                    self.bindings.remove(id);
                }
            }
            self.triggers.remove(node);
            self.node_scope.remove(node);
        }
    }

    fn remove_binding(&mut self, scopes: &mut ScopeTree, id: BindingId) {
        let Some(binding) = self.bindings.remove(id) else {
            return;
        };
        scopes.unsubscribe(id);
        if let Some(ids) = self.by_node.get_mut(binding.node) {
            ids.retain(|&other| other != id);
        }
    }

    /// Actions registered for `event` on `node`, in directive order.
    pub fn actions_for(&self, node: NodeId, event: &str) -> Vec<TriggerAction> {
        self.triggers
            .get(node)
            .map(|triggers| {
                triggers
                    .iter()
                    .filter(|trigger| trigger.event == event)
                    .map(|trigger| trigger.action.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The node's request descriptor, if it carries one. An element has at
    /// most one; conflicting methods are rejected at compile time.
    pub fn request_for(&self, node: NodeId) -> Option<&RequestDescriptor> {
        self.triggers.get(node)?.iter().find_map(|trigger| {
            match &trigger.action {
                TriggerAction::Request(descriptor) => Some(descriptor),
                TriggerAction::Handler(_) => None,
            }
        })
    }

    /// Scope the node's own expressions resolve against, if bound.
    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scope.get(node).copied()
    }

    pub fn is_bound(&self, node: NodeId) -> bool {
        self.node_scope.contains_key(node)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

/// Evaluate a `w-scope` expression and open the scope it declares.
fn declare_scope(
    expr: &Expr,
    scopes: &mut ScopeTree,
    parent: ScopeId,
) -> Result<ScopeId, EvalError> {
    let value = evaluate(expr, scopes, parent)?;
    let Value::Object(map) = value else {
        return Err(EvalError::TypeMismatch(format!(
            "scope declaration must be an object, got {}",
            value.type_name()
        )));
    };
    Ok(scopes.create_scope(Some(parent), map))
}
