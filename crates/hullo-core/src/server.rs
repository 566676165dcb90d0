//! Native HTTP server implementation
//!
//! hyper-based HTTP/1.1 server with:
//! - Connection-per-task on the tokio runtime
//! - Per-method routing with responses rendered once at registration
//! - TCP_NODELAY for low latency

use crate::{Error, Method, MiddlewareChain, Middleware, Request, Response, ResponseBuilder, Router, StatusCode};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub hostname: String,
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            hostname: "0.0.0.0".to_string(),
            workers: num_cpus::get(),
        }
    }
}

impl ServerConfig {
    /// The socket address to bind
    pub fn addr(&self) -> crate::Result<SocketAddr> {
        format!("{}:{}", self.hostname, self.port)
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("{}:{}", self.hostname, self.port)))
    }
}

/// Static route configuration
#[derive(Clone)]
pub struct StaticRoute {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub content_type: String,
    pub body: String,
}

impl StaticRoute {
    /// A 200 text route
    pub fn get(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            status: StatusCode::OK,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: body.into(),
        }
    }

    /// Render the response this route always produces
    fn to_response(&self) -> Response {
        ResponseBuilder::new(self.status)
            .header("content-type", &self.content_type)
            .body(self.body.clone())
            .build()
    }
}

/// Server state shared across all connections
///
/// Routes map to handler IDs, with responses pre-rendered at registration
/// time. The table is written only before [`serve`] is called.
pub struct ServerState {
    /// Router using handler IDs
    router: RwLock<Router<u32>>,
    /// Static responses indexed by handler ID
    static_responses: RwLock<HashMap<u32, Response>>,
    /// Middleware chain run around every routed request
    middleware: MiddlewareChain,
    /// Next handler ID
    next_id: AtomicU32,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            router: RwLock::new(Router::new()),
            static_responses: RwLock::new(HashMap::new()),
            middleware: MiddlewareChain::new(),
            next_id: AtomicU32::new(0),
        }
    }

    /// Add a static route
    pub fn add_static(&self, route: StaticRoute) -> crate::Result<()> {
        let handler_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.router
            .write()
            .route(route.method, &route.path, handler_id)?;
        self.static_responses
            .write()
            .insert(handler_id, route.to_response());
        Ok(())
    }

    /// Append a middleware to the chain
    pub fn middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middleware.add(middleware);
    }

    /// Match and handle a request
    pub async fn handle(&self, mut req: Request) -> Response {
        // An early response (e.g. a CORS preflight) already carries its
        // headers and skips the after pass
        if let Some(res) = self.middleware.run_before(&mut req) {
            return res;
        }

        let matched = self
            .router
            .read()
            .match_route(req.method, &req.path)
            .copied();
        let mut res = match matched
            .and_then(|id| self.static_responses.read().get(&id).cloned())
        {
            Some(res) => res,
            None => Response::not_found(),
        };

        self.middleware.run_after(&req, &mut res);
        res
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the listening socket
///
/// SO_REUSEADDR lets a restart rebind through TIME_WAIT. SO_REUSEPORT is
/// not set: a second instance on the same port must fail at bind.
pub fn bind_listener(addr: &SocketAddr) -> std::io::Result<tokio::net::TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;

    // TCP_NODELAY - disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    let listener: std::net::TcpListener = socket.into();
    listener.set_nonblocking(true)?;
    tokio::net::TcpListener::from_std(listener)
}

/// Accept loop. Serves until the process is terminated.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: Arc<ServerState>,
) -> crate::Result<()> {
    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                log::warn!("accept error: {err}");
                continue;
            }
        };

        let state = state.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let state = state.clone();
                async move {
                    Ok::<_, std::convert::Infallible>(handle_request(&state, req).await)
                }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                // Normal connection teardown is only interesting when debugging
                log::debug!("connection error: {err}");
            }
        });
    }
}

async fn handle_request(
    state: &ServerState,
    req: hyper::Request<Incoming>,
) -> hyper::Response<Full<Bytes>> {
    let response = match from_hyper_request(req) {
        Ok(request) => state.handle(request).await,
        // Extension methods never match the fixed route table
        Err(_) => Response::not_found(),
    };
    to_hyper_response(response)
}

/// Convert hyper request to our Request type
///
/// The body is left unread: the route table is static and request bodies
/// have no effect on the response.
pub fn from_hyper_request(req: hyper::Request<Incoming>) -> crate::Result<Request> {
    let method = Method::from_str(req.method().as_str())?;
    let uri = req.uri();
    let path = uri.path().to_string();
    let query = uri.query().map(|s| s.to_string());

    let mut request = Request::new(method, path);
    request.query = query;

    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            request.headers.push((name.to_string(), v.to_string()));
        }
    }

    Ok(request)
}

/// Convert our Response to hyper Response
pub fn to_hyper_response(res: Response) -> hyper::Response<Full<Bytes>> {
    let mut builder = hyper::Response::builder().status(res.status.as_u16());

    for (name, value) in &res.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder.body(Full::new(res.body)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cors, RequestBuilder};

    const GREETING: &str = "Hello from the backend API!";

    fn responder() -> ServerState {
        let mut state = ServerState::new();
        state
            .add_static(StaticRoute::get("/", GREETING))
            .unwrap();
        state.middleware(Cors::permissive());
        state
    }

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.hostname, "0.0.0.0");
        assert_eq!(config.addr().unwrap().port(), 8080);

        let bad = ServerConfig {
            hostname: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(bad.addr(), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_static_route_render() {
        let route = StaticRoute::get("/", GREETING);
        let res = route.to_response();
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(res.body_string().as_deref(), Some(GREETING));
    }

    #[tokio::test]
    async fn test_handle_root() {
        let state = responder();
        let res = state
            .handle(RequestBuilder::new(Method::Get, "/").build())
            .await;

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body_string().as_deref(), Some(GREETING));
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn test_handle_ignores_query_and_body() {
        let state = responder();
        let res = state
            .handle(
                RequestBuilder::new(Method::Get, "/")
                    .query("probe=1")
                    .body("ignored")
                    .build(),
            )
            .await;

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body_string().as_deref(), Some(GREETING));
    }

    #[tokio::test]
    async fn test_handle_not_found_keeps_cors() {
        let state = responder();

        let res = state
            .handle(RequestBuilder::new(Method::Get, "/missing").build())
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));

        let res = state
            .handle(RequestBuilder::new(Method::Post, "/").build())
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn test_handle_is_idempotent() {
        let state = responder();
        let first = state
            .handle(RequestBuilder::new(Method::Get, "/").build())
            .await;
        let second = state
            .handle(RequestBuilder::new(Method::Get, "/").build())
            .await;

        assert_eq!(first.status, second.status);
        assert_eq!(first.body, second.body);
        assert_eq!(first.headers, second.headers);
    }

    #[tokio::test]
    async fn test_handle_preflight_skips_route() {
        let state = responder();
        let res = state
            .handle(
                RequestBuilder::new(Method::Options, "/")
                    .header("Origin", "http://example.com")
                    .header("Access-Control-Request-Method", "GET")
                    .build(),
            )
            .await;

        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert!(res.body.is_empty());
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));
        // Exactly once: the preflight response skips the after pass
        let acao = res
            .headers
            .iter()
            .filter(|(k, _)| k == "Access-Control-Allow-Origin")
            .count();
        assert_eq!(acao, 1);
    }
}
