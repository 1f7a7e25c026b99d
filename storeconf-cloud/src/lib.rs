//! Remote resource gateway for storeconf.
//!
//! The sync engine never speaks HTTP directly. It consumes a
//! [`RemoteResourceGateway`], a single `call(method, path, body, headers)`
//! returning a status code and raw body, and interprets responses through
//! [`send`], which also races every call against a [`CancelSignal`].
//!
//! [`HttpGateway`] is a thin reqwest-backed implementation. It performs no
//! retries: multi-step writes are not idempotent without a precondition
//! check, so retry policy belongs to the caller.

mod cancel;
mod error;
mod gateway;
mod http;

pub use cancel::{CancelSignal, Canceller};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{
    encode_segment, send, send_json, GatewayRequest, Method, RawResponse, RemoteResourceGateway,
};
pub use http::{GatewayConfig, HttpGateway};
