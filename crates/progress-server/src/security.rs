use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// Header carrying the per-session token for non-browser clients.
pub const TOKEN_HEADER: &str = "x-progress-token";

const LOOPBACK_HOSTS: [&str; 3] = ["127.0.0.1", "localhost", "[::1]"];

/// Who may talk to the server: browsers on the served origin, or clients
/// holding the session token printed at startup.
#[derive(Debug, Clone)]
pub struct Perimeter {
    port: u16,
    token: String,
}

impl Perimeter {
    /// Fresh perimeter for `port` with a random session token.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            token: generate_token(),
        }
    }

    pub fn with_token(port: u16, token: impl Into<String>) -> Self {
        Self {
            port,
            token: token.into(),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The origin the UI is served from.
    pub fn origin(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        let origin = origin.to_ascii_lowercase();
        LOOPBACK_HOSTS
            .iter()
            .any(|h| origin == format!("http://{h}:{}", self.port))
    }

    /// A `Host` header naming anything but a loopback host on our port is a
    /// DNS-rebinding attempt.
    pub fn is_allowed_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let Some((name, port)) = host.rsplit_once(':') else {
            return false;
        };
        if name.contains(':') && !name.starts_with('[') {
            return false;
        }
        LOOPBACK_HOSTS.contains(&name) && port.parse::<u16>().ok() == Some(self.port)
    }

    pub fn is_valid_token(&self, presented: &str) -> bool {
        constant_time_eq(presented.as_bytes(), self.token.as_bytes())
    }

    /// Decide whether a request may proceed. Mutations need a matching
    /// origin or the session token; reads only fail on a foreign origin.
    pub fn check(&self, method: &Method, headers: &HeaderMap) -> Result<(), &'static str> {
        if let Some(host) = header_str(headers, "host") {
            if !self.is_allowed_host(host) {
                return Err("Invalid Host");
            }
        }

        let origin = header_str(headers, "origin");
        let origin_ok = origin.map(|o| self.is_allowed_origin(o));
        if origin_ok == Some(false) {
            return Err("Invalid Origin");
        }

        if is_mutating(method) {
            let token_ok = header_str(headers, TOKEN_HEADER)
                .map(|t| self.is_valid_token(t))
                .unwrap_or(false);
            if origin_ok != Some(true) && !token_ok {
                return Err("Invalid Origin");
            }
        }
        Ok(())
    }
}

fn is_mutating(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).map(|v| v.to_str().unwrap_or(""))
}

fn generate_token() -> String {
    use rand::{distributions::Alphanumeric, Rng};
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Axum middleware enforcing the [`Perimeter`] before any handler runs.
pub async fn perimeter_middleware(
    State(perimeter): State<Arc<Perimeter>>,
    req: Request,
    next: Next,
) -> Response {
    match perimeter.check(req.method(), req.headers()) {
        Ok(()) => next.run(req).await,
        Err(reason) => {
            tracing::warn!(
                method = %req.method(),
                path = %req.uri().path(),
                origin = ?req.headers().get("origin"),
                host = ?req.headers().get("host"),
                "{reason}"
            );
            AppError::forbidden(reason).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
