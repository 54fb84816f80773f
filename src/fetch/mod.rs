//! Server round-trips: descriptors, dispatch policy, and the transport
//! seam.
//!
//! - [`descriptor`] — compiled request configuration per element.
//! - [`dispatcher`] — concurrency policy and generation-based staleness.
//! - [`transport`] — the [`Transport`] trait and the reqwest-backed
//!   [`HttpTransport`].

pub mod descriptor;
pub mod dispatcher;
pub mod transport;

pub use descriptor::{
    ConcurrencyMode, Method, RequestDescriptor, SwapStrategy, Target, UnknownSwapStrategy,
};
pub use dispatcher::{Completion, DispatchOutcome, Dispatcher};
pub use transport::{FetchRequest, FetchResponse, HttpTransport, Transport, TransportError};
