//! Directive binding: the bridge from attributes to live behavior.
//!
//! - [`directive`] — recognition of `w-` attributes into [`Directive`]s.
//! - [`binder`] — the [`Binder`]: scope creation, binding subscriptions,
//!   trigger registration, initial application, and teardown.

pub mod binder;
pub mod directive;

pub use binder::{
    Binder, Binding, BindingId, BindingKind, SkippedBinding, Trigger, TriggerAction,
};
pub use directive::{compile, Directive, DirectiveError};
