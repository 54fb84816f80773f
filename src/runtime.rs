//! The runtime: document lifecycle, trigger dispatch, and the reactive
//! flush loop.
//!
//! State changes are synchronous; the only await point is resolving a
//! dispatched request. A trigger either runs handler expressions and
//! flushes, or stamps a [`PendingFetch`] the caller drives to completion
//! with [`Runtime::resolve`]. Everything that can go wrong inside a live
//! document is reported through the drainable event queue rather than by
//! failing the operation.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, warn};

use crate::bind::{Binder, SkippedBinding, TriggerAction};
use crate::dom::{Dom, NodeData, NodeId};
use crate::error::RuntimeError;
use crate::expr::{evaluate, execute, Value};
use crate::fetch::{
    ConcurrencyMode, DispatchOutcome, Dispatcher, FetchRequest, RequestDescriptor, SwapStrategy,
    Target, Transport,
};
use crate::markup::{instantiate, parse_fragment};
use crate::reactive::{ScopeId, ScopeTree};
use crate::swap::{swap, SwapError};

/// Tunables for one runtime instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Maximum reactive flush rounds per tick before giving up.
    pub reactivity_limit: usize,
    /// Wall-clock budget for one request, transport time included.
    pub request_timeout: Duration,
    pub concurrency: ConcurrencyMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            reactivity_limit: 100,
            request_timeout: Duration::from_secs(30),
            concurrency: ConcurrencyMode::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        RuntimeConfig::default()
    }

    pub fn with_reactivity_limit(mut self, limit: usize) -> Self {
        self.reactivity_limit = limit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency = mode;
        self
    }
}

/// Something that went wrong inside a live document, reported instead of
/// thrown. Drained with [`Runtime::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    /// A directive failed to compile, evaluate, or apply; its siblings
    /// stayed live.
    BindingSkipped { node: NodeId, detail: String },
    /// A dispatched request settled without a usable response.
    RequestFailed {
        node: NodeId,
        url: String,
        reason: FailureReason,
    },
    /// A response arrived but its swap could not be applied.
    SwapSkipped { node: NodeId, detail: String },
    /// The flush loop hit the round limit; remaining dirt was dropped.
    DepthExceeded { limit: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    Timeout,
    /// Non-success HTTP status.
    Status(u16),
    Transport(String),
}

/// What a trigger did.
#[derive(Debug, PartialEq)]
pub enum TriggerOutcome {
    /// Handler expressions ran; no request was involved.
    Handled,
    /// A request was stamped; drive it with [`Runtime::resolve`].
    Dispatched(PendingFetch),
    /// Dropped by the concurrency policy.
    Dropped,
    /// Remembered by the queue-latest policy.
    Queued,
    /// Nothing is bound to this event on this node.
    Ignored,
}

/// A dispatched request, self-contained: parameters were evaluated at
/// dispatch time and do not see later state changes.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFetch {
    pub node: NodeId,
    pub generation: u64,
    pub request: FetchRequest,
    pub target: Target,
    pub strategy: SwapStrategy,
}

/// How a resolved request ended.
#[derive(Debug, PartialEq)]
pub enum ResolveOutcome {
    /// The response body was swapped in and the insert was bound.
    Applied,
    /// The response was valid but not applied (stale generation or the
    /// target left the document).
    Discarded,
    /// The request settled without a usable response.
    Failed,
}

/// Result of [`Runtime::resolve`], including any queue-latest
/// re-dispatch.
#[derive(Debug, PartialEq)]
pub struct Resolution {
    pub outcome: ResolveOutcome,
    /// A queued trigger collapsed into this follow-up request; the caller
    /// drives it like any other.
    pub requeued: Option<PendingFetch>,
}

/// A mounted document and everything bound to it.
pub struct Runtime<T: Transport> {
    dom: Dom,
    scopes: ScopeTree,
    binder: Binder,
    dispatcher: Dispatcher,
    transport: T,
    config: RuntimeConfig,
    events: VecDeque<RuntimeEvent>,
    root: NodeId,
    root_scope: ScopeId,
}

impl<T: Transport> Runtime<T> {
    /// An empty document: a `body` root with an empty root scope.
    pub fn new(transport: T, config: RuntimeConfig) -> Self {
        let mut dom = Dom::new();
        let root = dom.insert(NodeData::element("body"));
        dom.set_root(root);
        let mut scopes = ScopeTree::new();
        let root_scope = scopes.create_scope(None, Default::default());
        let dispatcher = Dispatcher::new(config.concurrency);
        Runtime {
            dom,
            scopes,
            binder: Binder::new(),
            dispatcher,
            transport,
            config,
            events: VecDeque::new(),
            root,
            root_scope,
        }
    }

    /// Parse `html`, attach it under the root, and bind it.
    pub fn mount(&mut self, html: &str) -> Result<(), RuntimeError> {
        let fragment = parse_fragment(html)?;
        for node in &fragment.nodes {
            let index = self.dom.children(self.root).len();
            instantiate(&mut self.dom, self.root, index, node);
        }
        let skipped =
            self.binder
                .bind_subtree(&mut self.dom, &mut self.scopes, self.root, self.root_scope);
        self.report_skipped(skipped);
        self.flush()?;
        Ok(())
    }

    /// Fire `event` on `node`.
    ///
    /// Handler expressions run first, in directive order, and their writes
    /// are flushed before this returns. A request directive on the same
    /// event is then put to the concurrency policy.
    pub fn trigger(&mut self, node: NodeId, event: &str) -> TriggerOutcome {
        if !self.dom.is_attached(node) {
            return TriggerOutcome::Ignored;
        }
        let actions = self.binder.actions_for(node, event);
        if actions.is_empty() {
            return TriggerOutcome::Ignored;
        }
        let scope = self.binder.scope_of(node).unwrap_or(self.root_scope);

        let mut handled = false;
        let mut request: Option<RequestDescriptor> = None;
        for action in actions {
            match action {
                TriggerAction::Handler(expr) => {
                    handled = true;
                    if let Err(error) = execute(&expr, &mut self.scopes, scope) {
                        warn!(?node, %error, "handler failed");
                        self.events.push_back(RuntimeEvent::BindingSkipped {
                            node,
                            detail: error.to_string(),
                        });
                    }
                }
                TriggerAction::Request(descriptor) => {
                    // One request per element; keep the first.
                    request.get_or_insert(descriptor);
                }
            }
        }
        self.flush_reporting();

        let Some(descriptor) = request else {
            return TriggerOutcome::Handled;
        };
        let Some(fetch) = self.build_request(node, scope, &descriptor) else {
            // Parameter evaluation failed; reported already.
            return if handled {
                TriggerOutcome::Handled
            } else {
                TriggerOutcome::Ignored
            };
        };
        match self.dispatcher.begin(node) {
            DispatchOutcome::Dropped => TriggerOutcome::Dropped,
            DispatchOutcome::Queued => TriggerOutcome::Queued,
            DispatchOutcome::Dispatched(generation) => {
                debug!(?node, generation, method = fetch.method.as_str(), url = %fetch.url, "request dispatched");
                TriggerOutcome::Dispatched(PendingFetch {
                    node,
                    generation,
                    request: fetch,
                    target: descriptor.target.clone(),
                    strategy: descriptor.strategy,
                })
            }
        }
    }

    /// Drive a dispatched request to completion and apply its response.
    pub async fn resolve(&mut self, pending: PendingFetch) -> Resolution {
        let result = tokio::time::timeout(
            self.config.request_timeout,
            self.transport.fetch(&pending.request),
        )
        .await;
        let completion = self.dispatcher.complete(pending.node, pending.generation);
        let requeued = if completion.requeue {
            self.redispatch(pending.node)
        } else {
            None
        };

        if completion.stale {
            debug!(node = ?pending.node, generation = pending.generation, "stale response discarded");
            return Resolution {
                outcome: ResolveOutcome::Discarded,
                requeued,
            };
        }

        let response = match result {
            Err(_elapsed) => {
                self.report_failure(&pending, FailureReason::Timeout);
                return Resolution {
                    outcome: ResolveOutcome::Failed,
                    requeued,
                };
            }
            Ok(Err(error)) => {
                self.report_failure(&pending, FailureReason::Transport(error.to_string()));
                return Resolution {
                    outcome: ResolveOutcome::Failed,
                    requeued,
                };
            }
            Ok(Ok(response)) => response,
        };
        if !response.is_success() {
            self.report_failure(&pending, FailureReason::Status(response.status));
            return Resolution {
                outcome: ResolveOutcome::Failed,
                requeued,
            };
        }

        let outcome = self.apply_response(&pending, &response.body);
        Resolution { outcome, requeued }
    }

    /// Detach a subtree, tearing down its bindings, scopes, and any
    /// in-flight requests.
    pub fn remove(&mut self, node: NodeId) -> Vec<NodeId> {
        let removed = self.dom.remove(node);
        for &id in &removed {
            self.dispatcher.abort(id);
        }
        self.binder.unbind_nodes(&mut self.scopes, &removed);
        removed
    }

    /// Take every event reported since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<RuntimeEvent> {
        self.events.drain(..).collect()
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Serialized markup of the document body.
    pub fn html(&self) -> String {
        crate::markup::serialize_children(&self.dom, self.root)
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Evaluate the parameter expression and materialize the request.
    fn build_request(
        &mut self,
        node: NodeId,
        scope: ScopeId,
        descriptor: &RequestDescriptor,
    ) -> Option<FetchRequest> {
        let params = match &descriptor.params {
            None => Vec::new(),
            Some(expr) => match evaluate(expr, &self.scopes, scope) {
                Ok(Value::Object(map)) => map
                    .into_iter()
                    .map(|(key, value)| (key, value.render()))
                    .collect(),
                Ok(other) => {
                    self.events.push_back(RuntimeEvent::BindingSkipped {
                        node,
                        detail: format!(
                            "request parameters must be an object, got {}",
                            other.type_name()
                        ),
                    });
                    return None;
                }
                Err(error) => {
                    warn!(?node, %error, "request parameters failed");
                    self.events.push_back(RuntimeEvent::BindingSkipped {
                        node,
                        detail: error.to_string(),
                    });
                    return None;
                }
            },
        };
        Some(FetchRequest {
            method: descriptor.method,
            url: descriptor.url.clone(),
            params,
        })
    }

    /// Consume a queue-latest marker: stamp a fresh dispatch with freshly
    /// evaluated parameters.
    fn redispatch(&mut self, node: NodeId) -> Option<PendingFetch> {
        if !self.dom.is_attached(node) {
            return None;
        }
        let descriptor = self.binder.request_for(node)?.clone();
        let scope = self.binder.scope_of(node).unwrap_or(self.root_scope);
        let fetch = self.build_request(node, scope, &descriptor)?;
        match self.dispatcher.begin(node) {
            DispatchOutcome::Dispatched(generation) => Some(PendingFetch {
                node,
                generation,
                request: fetch,
                target: descriptor.target,
                strategy: descriptor.strategy,
            }),
            // The slot just settled, so this does not happen.
            DispatchOutcome::Dropped | DispatchOutcome::Queued => None,
        }
    }

    fn apply_response(&mut self, pending: &PendingFetch, body: &str) -> ResolveOutcome {
        let target = match &pending.target {
            Target::This => pending.node,
            Target::Id(id) => match self.dom.query_by_id(id) {
                Some(found) => found,
                None => {
                    self.events.push_back(RuntimeEvent::SwapSkipped {
                        node: pending.node,
                        detail: SwapError::TargetMissing.to_string(),
                    });
                    return ResolveOutcome::Discarded;
                }
            },
        };
        let outcome = match swap(&mut self.dom, target, pending.strategy, body) {
            Ok(outcome) => outcome,
            Err(error @ SwapError::TargetMissing) => {
                self.events.push_back(RuntimeEvent::SwapSkipped {
                    node: pending.node,
                    detail: error.to_string(),
                });
                return ResolveOutcome::Discarded;
            }
            Err(error) => {
                warn!(node = ?pending.node, %error, "swap failed");
                self.events.push_back(RuntimeEvent::SwapSkipped {
                    node: pending.node,
                    detail: error.to_string(),
                });
                return ResolveOutcome::Failed;
            }
        };

        for &id in &outcome.removed {
            self.dispatcher.abort(id);
        }
        self.binder.unbind_nodes(&mut self.scopes, &outcome.removed);

        for &inserted in &outcome.inserted {
            let inherited = self
                .dom
                .parent(inserted)
                .and_then(|parent| self.binder.scope_of(parent))
                .unwrap_or(self.root_scope);
            let skipped =
                self.binder
                    .bind_subtree(&mut self.dom, &mut self.scopes, inserted, inherited);
            self.report_skipped(skipped);
        }
        self.flush_reporting();
        ResolveOutcome::Applied
    }

    /// Re-apply dirty bindings until the store settles, bounded by the
    /// configured round limit. Past the limit the remaining dirt is
    /// dropped and the runtime stays usable.
    fn flush(&mut self) -> Result<(), RuntimeError> {
        self.flush_rounds(|_| {})
    }

    /// Flush at an observation point with no caller to hand an error to:
    /// a blown round limit becomes a [`RuntimeEvent::DepthExceeded`].
    fn flush_reporting(&mut self) {
        if let Err(RuntimeError::ReactivityDepthExceeded { limit }) = self.flush() {
            self.events.push_back(RuntimeEvent::DepthExceeded { limit });
        }
    }

    /// The flush loop itself. `after_round` observes the store between
    /// rounds; writes it makes count against the round limit like any
    /// other mid-flush mutation.
    fn flush_rounds(
        &mut self,
        mut after_round: impl FnMut(&mut ScopeTree),
    ) -> Result<(), RuntimeError> {
        let mut rounds = 0;
        while self.scopes.has_dirty() {
            if rounds >= self.config.reactivity_limit {
                warn!(limit = self.config.reactivity_limit, "reactive flush did not settle");
                self.scopes.take_dirty();
                return Err(RuntimeError::ReactivityDepthExceeded {
                    limit: self.config.reactivity_limit,
                });
            }
            let dirty = self.scopes.take_dirty();
            let skipped = self.binder.refresh(&mut self.dom, &mut self.scopes, &dirty);
            self.report_skipped(skipped);
            after_round(&mut self.scopes);
            rounds += 1;
        }
        Ok(())
    }

    fn report_skipped(&mut self, skipped: Vec<SkippedBinding>) {
        for skip in skipped {
            self.events.push_back(RuntimeEvent::BindingSkipped {
                node: skip.node,
                detail: skip.detail,
            });
        }
    }

    fn report_failure(&mut self, pending: &PendingFetch, reason: FailureReason) {
        warn!(node = ?pending.node, url = %pending.request.url, ?reason, "request failed");
        self.events.push_back(RuntimeEvent::RequestFailed {
            node: pending.node,
            url: pending.request.url.clone(),
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::serialize_children;
    use crate::testing::StaticTransport;

    fn mounted(config: RuntimeConfig) -> (Runtime<StaticTransport>, NodeId, ScopeId) {
        let mut app = Runtime::new(StaticTransport::new(), config);
        app.mount(r#"<div w-scope="{ n: 'a' }"><span w-text="n"></span></div>"#)
            .expect("fragment should mount");
        let span = app.dom.query_by_tag("span")[0];
        let scope = app.binder.scope_of(span).expect("span should be bound");
        (app, span, scope)
    }

    #[test]
    fn flush_round_limit_aborts_an_unsettling_store() {
        let (mut app, _span, scope) = mounted(RuntimeConfig::new().with_reactivity_limit(3));
        app.scopes.set(scope, "n", Value::Str("b".into()));
        let mut round = 0;
        let result = app.flush_rounds(|scopes| {
            round += 1;
            scopes.set(scope, "n", Value::Str(format!("b{round}")));
        });
        assert_eq!(
            result,
            Err(RuntimeError::ReactivityDepthExceeded { limit: 3 })
        );
        // The dirt was dropped; later flushes run normally.
        assert!(!app.scopes.has_dirty());
        app.scopes.set(scope, "n", Value::Str("c".into()));
        assert_eq!(app.flush(), Ok(()));
    }

    #[test]
    fn flush_settles_once_writes_stop() {
        let (mut app, span, scope) = mounted(RuntimeConfig::new().with_reactivity_limit(3));
        app.scopes.set(scope, "n", Value::Str("b".into()));
        let mut wrote = false;
        let result = app.flush_rounds(|scopes| {
            if !wrote {
                wrote = true;
                scopes.set(scope, "n", Value::Str("c".into()));
            }
        });
        assert_eq!(result, Ok(()));
        assert_eq!(serialize_children(&app.dom, span), "c");
    }

    #[test]
    fn exhausted_round_budget_is_reported_not_thrown() {
        let mut app = Runtime::new(
            StaticTransport::new(),
            RuntimeConfig::new().with_reactivity_limit(0),
        );
        app.mount(
            r#"<div w-scope="{ msg: 'hello' }"><span w-text="msg"></span><button w-on:click="msg = 'changed'">Go</button></div>"#,
        )
        .expect("fragment should mount");
        let span = app.dom.query_by_tag("span")[0];
        let button = app.dom.query_by_tag("button")[0];

        assert_eq!(app.trigger(button, "click"), TriggerOutcome::Handled);
        assert_eq!(
            app.drain_events(),
            vec![RuntimeEvent::DepthExceeded { limit: 0 }]
        );
        // The write never reached the binding, and the document keeps
        // answering triggers.
        assert_eq!(serialize_children(&app.dom, span), "hello");
        assert_eq!(app.trigger(button, "click"), TriggerOutcome::Handled);
    }
}
