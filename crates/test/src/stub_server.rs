//! HTTP stub for exercising the REST client on the wire. Routes answer with
//! canned responses and every request is recorded.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tokio::runtime::Runtime;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
}

impl StubResponse {
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

impl IntoResponse for StubResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.body.is_empty() {
            return status.into_response();
        }
        (status, [(header::CONTENT_TYPE, "application/json")], self.body).into_response()
    }
}

type Routes = HashMap<(String, String), StubResponse>;

#[derive(Debug, Default)]
struct Shared {
    routes: Mutex<Routes>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Serves on its own runtime so blocking clients can call it from plain
/// `#[test]` functions. Dropping it stops the listener.
#[derive(Debug)]
pub struct StubServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    runtime: Option<Runtime>,
}

impl StubServer {
    pub fn start() -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("stub-server")
            .enable_io()
            .build()?;
        let listener = runtime.block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))?;
        let addr = listener.local_addr()?;

        let shared = Arc::new(Shared::default());
        let app = Router::new()
            .fallback(record_and_reply)
            .with_state(Arc::clone(&shared));
        runtime.spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                debug!(error = %err, "stub server stopped");
            }
        });

        Ok(Self {
            addr,
            shared,
            runtime: Some(runtime),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Registers (or replaces) the response for `method path`, where `path`
    /// includes any query string. Unrouted requests get a 404.
    pub fn route(&self, method: &str, path: &str, response: StubResponse) {
        lock(&self.shared.routes).insert((method.to_string(), path.to_string()), response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.shared.requests).clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(Duration::from_secs(1));
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn record_and_reply(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StubResponse {
    let path = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());
    let response = lock(&shared.routes)
        .get(&(method.to_string(), path.clone()))
        .cloned()
        .unwrap_or_else(|| StubResponse::json(404, &serde_json::json!({"detail": "Not found."})));

    debug!(%method, %path, status = response.status, "stub request");
    let headers = headers
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect();
    lock(&shared.requests).push(RecordedRequest {
        method: method.to_string(),
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });
    response
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn chunked_bodies_are_recorded_in_full() -> anyhow::Result<()> {
        let server = StubServer::start()?;
        server.route("POST", "/logs/", StubResponse::empty(201));

        let body = reqwest::blocking::Body::new(Cursor::new(br#"{"book":"1"}"#.to_vec()));
        let response = reqwest::blocking::Client::new()
            .post(server.url("/logs/"))
            .body(body)
            .send()?;
        assert_eq!(response.status().as_u16(), 201);

        let recorded = server.requests_to("POST", "/logs/");
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].header("transfer-encoding"), Some("chunked"));
        assert_eq!(recorded[0].json()?, serde_json::json!({"book": "1"}));
        Ok(())
    }

    #[test]
    fn kept_alive_connections_serve_every_request() -> anyhow::Result<()> {
        let server = StubServer::start()?;
        server.route("GET", "/logs/?page=2", StubResponse::json(200, &serde_json::json!([])));

        let client = reqwest::blocking::Client::new();
        for _ in 0..3 {
            let response = client.get(server.url("/logs/?page=2")).send()?;
            assert_eq!(response.status().as_u16(), 200);
            assert_eq!(response.text()?, "[]");
        }
        assert_eq!(client.get(server.url("/missing/")).send()?.status().as_u16(), 404);
        assert_eq!(server.requests_to("GET", "/logs/?page=2").len(), 3);
        Ok(())
    }
}
