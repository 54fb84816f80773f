//! # weft
//!
//! A headless hypermedia interaction runtime.
//!
//! weft drives server-rendered documents the way htmx and Alpine.js drive a
//! browser page, without a browser: declarative `w-` attributes in the markup
//! describe server round-trips whose response fragments are spliced back into
//! the document, and scoped reactive state that keeps text and visibility in
//! sync with it. The host supplies markup and events; weft owns the document,
//! the state, and the network lifecycle.
//!
//! ## Core Systems
//!
//! - **[`dom`]** — Slotmap-backed document arena with tree operations and queries
//! - **[`markup`]** — Fragment parsing and serialization
//! - **[`expr`]** — The closed expression language: lexer, parser, evaluator
//! - **[`reactive`]** — Scoped state with subscriptions and dirty tracking
//! - **[`bind`]** — Directive recognition and the live binding table
//! - **[`fetch`]** — Request descriptors, dispatch policy, transport seam
//! - **[`swap`]** — Splicing response fragments into the document
//! - **[`runtime`]** — The [`Runtime`](runtime::Runtime) tying everything together
//! - **[`testing`]** — Scripted transport for driving a runtime in tests

// Document
pub mod dom;
pub mod markup;

// State and expressions
pub mod expr;
pub mod reactive;

// Directives
pub mod bind;

// Network
pub mod fetch;
pub mod swap;

// Runtime
pub mod error;
pub mod runtime;

// Test support
pub mod testing;

pub use error::RuntimeError;
pub use runtime::{
    PendingFetch, Resolution, ResolveOutcome, Runtime, RuntimeConfig, RuntimeEvent, TriggerOutcome,
};
