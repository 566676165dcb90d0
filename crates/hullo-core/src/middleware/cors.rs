//! CORS (Cross-Origin Resource Sharing) middleware
//!
//! Answers preflight requests before they reach the router and adds the
//! allow-origin header to every other response. With the wildcard
//! configuration the header is added unconditionally, so responses are
//! readable cross-origin whether or not the request carried an Origin
//! header.

use super::Middleware;
use crate::{Method, Request, Response};
use smallvec::SmallVec;

/// CORS configuration
#[derive(Clone)]
pub struct CorsConfig {
    /// Allowed origins (empty = any origin)
    pub origins: SmallVec<[String; 4]>,
    /// Methods advertised on preflight
    pub methods: SmallVec<[Method; 8]>,
    /// Headers advertised on preflight
    pub headers: SmallVec<[String; 8]>,
    /// Preflight cache lifetime (seconds)
    pub max_age: u32,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: SmallVec::new(), // Empty = allow all
            methods: smallvec::smallvec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Patch,
                Method::Head,
                Method::Options,
            ],
            headers: smallvec::smallvec![
                "Content-Type".to_string(),
                "Authorization".to_string(),
                "X-Requested-With".to_string(),
            ],
            max_age: 86400, // 24 hours
        }
    }
}

impl CorsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.origins.push(origin.into());
        self
    }

    pub fn allow_method(mut self, method: Method) -> Self {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self
    }

    pub fn allow_header(mut self, header: impl Into<String>) -> Self {
        self.headers.push(header.into());
        self
    }

    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = seconds;
        self
    }
}

/// CORS middleware
pub struct Cors {
    config: CorsConfig,
}

impl Cors {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    /// Simple CORS - allow all origins
    pub fn permissive() -> Self {
        Self::new(CorsConfig::default())
    }

    /// The Access-Control-Allow-Origin value for this request, or None
    /// when the request origin is outside the allow-list.
    fn allow_origin_value(&self, req: &Request) -> Option<String> {
        if self.config.origins.is_empty() {
            return Some("*".to_string());
        }
        let origin = req.header("origin")?;
        self.config
            .origins
            .iter()
            .any(|o| o == origin || o == "*")
            .then(|| origin.to_string())
    }

    fn methods_string(&self) -> String {
        self.config
            .methods
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn headers_string(&self) -> String {
        self.config.headers.join(", ")
    }

    fn add_allow_origin(&self, res: &mut Response, origin: String) {
        // Echoed origins vary per request; wildcard does not
        if origin != "*" {
            res.headers.push(("Vary".to_string(), "Origin".to_string()));
        }
        res.headers
            .push(("Access-Control-Allow-Origin".to_string(), origin));
    }
}

impl Middleware for Cors {
    fn before(&self, req: &mut Request) -> Option<Response> {
        // Every OPTIONS request is answered as a preflight; the route
        // handler is never invoked
        if req.method != Method::Options {
            return None;
        }

        let mut res = Response::no_content();
        if let Some(origin) = self.allow_origin_value(req) {
            self.add_allow_origin(&mut res, origin);
            res.headers.push((
                "Access-Control-Allow-Methods".to_string(),
                self.methods_string(),
            ));
            if !self.config.headers.is_empty() {
                res.headers.push((
                    "Access-Control-Allow-Headers".to_string(),
                    self.headers_string(),
                ));
            }
            res.headers.push((
                "Access-Control-Max-Age".to_string(),
                self.config.max_age.to_string(),
            ));
        }
        Some(res)
    }

    fn after(&self, req: &Request, res: &mut Response) {
        if let Some(origin) = self.allow_origin_value(req) {
            self.add_allow_origin(res, origin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RequestBuilder, StatusCode};

    #[test]
    fn test_wildcard_without_origin_header() {
        let cors = Cors::permissive();
        let req = RequestBuilder::new(Method::Get, "/").build();
        let mut res = Response::ok();

        cors.after(&req, &mut res);
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));
        assert_eq!(res.header("vary"), None);
    }

    #[test]
    fn test_preflight() {
        let cors = Cors::permissive();
        let mut req = RequestBuilder::new(Method::Options, "/")
            .header("Origin", "http://example.com")
            .header("Access-Control-Request-Method", "GET")
            .build();

        let res = cors.before(&mut req).expect("preflight must short-circuit");
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert!(res.body.is_empty());
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));
        assert!(res
            .header("access-control-allow-methods")
            .unwrap()
            .contains("GET"));
        assert!(res
            .header("access-control-allow-headers")
            .unwrap()
            .contains("Content-Type"));
        assert_eq!(res.header("access-control-max-age"), Some("86400"));
    }

    #[test]
    fn test_non_options_passes_through() {
        let cors = Cors::permissive();
        let mut req = RequestBuilder::new(Method::Get, "/").build();
        assert!(cors.before(&mut req).is_none());
    }

    #[test]
    fn test_allow_list_echoes_origin() {
        let cors = Cors::new(CorsConfig::new().allow_origin("https://example.com"));

        let req = RequestBuilder::new(Method::Get, "/")
            .header("Origin", "https://example.com")
            .build();
        let mut res = Response::ok();
        cors.after(&req, &mut res);
        assert_eq!(
            res.header("access-control-allow-origin"),
            Some("https://example.com")
        );
        assert_eq!(res.header("vary"), Some("Origin"));

        let req = RequestBuilder::new(Method::Get, "/")
            .header("Origin", "https://other.com")
            .build();
        let mut res = Response::ok();
        cors.after(&req, &mut res);
        assert_eq!(res.header("access-control-allow-origin"), None);
    }

    #[test]
    fn test_config_builders() {
        let config = CorsConfig::new()
            .allow_method(Method::Get) // already present, not duplicated
            .allow_header("X-Trace-Id")
            .max_age(600);
        let cors = Cors::new(config);

        assert_eq!(
            cors.methods_string().matches("GET").count(),
            1
        );
        assert!(cors.headers_string().contains("X-Trace-Id"));
        assert_eq!(cors.config.max_age, 600);
    }
}
