//! Blocking HTTP access for the forge backend.
//!
//! Redirects are followed by [`HttpClient`] itself rather than by the
//! underlying transport, so the chain can be bounded, checked for cycles and
//! traced at debug level hop by hop.

mod client;
mod transport;

pub use client::{HttpClient, HttpClientConfig, HttpError, MAX_REDIRECTS};
pub use transport::{HttpResponse, ReqwestTransport, Transport};
