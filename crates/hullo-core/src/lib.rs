//! hullo-core: single-endpoint HTTP responder
//!
//! A small hyper-based HTTP/1.1 server that serves a fixed route table
//! built once at startup. Responses pass through a middleware chain;
//! the one middleware shipped here adds permissive cross-origin headers
//! and answers preflight requests.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod error;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

// Re-exports
pub use error::{Error, Result};
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder, StatusCode};
pub use router::Router;

// Middleware re-exports
pub use middleware::{Cors, CorsConfig, Middleware, MiddlewareChain};

pub use server::{ServerConfig, ServerState, StaticRoute};
pub use server::{bind_listener, from_hyper_request, serve, to_hyper_response};
