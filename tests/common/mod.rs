#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{StatusCode, header},
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use protego::{App, Config, Store};

#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: serde_json::to_vec(&value).unwrap(),
        }
    }

    pub fn pdf(bytes: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: "application/pdf",
            body: bytes.to_vec(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Shared {
    replies: Mutex<HashMap<(String, String), Reply>>,
    hits: Mutex<Vec<Hit>>,
}

/// In-process stand-in for the scanner backend. Records every request and
/// answers from a table of canned replies (404 when nothing matches).
pub struct MockBackend {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let shared = Arc::new(Shared::default());
        let router = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&shared));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, shared }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn respond(&self, method: &str, path: &str, reply: Reply) {
        self.shared
            .replies
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), reply);
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.shared.hits.lock().unwrap().clone()
    }

    pub fn hits_for(&self, method: &str, path: &str) -> Vec<Hit> {
        self.hits()
            .into_iter()
            .filter(|h| h.method == method && h.path == path)
            .collect()
    }

    pub fn app(&self) -> App {
        self.app_with_store(Store::memory())
    }

    pub fn app_with_store(&self, store: Store) -> App {
        let config = Config {
            base_url: self.url(),
            timeout_secs: Some(5),
            storage_path: None,
        };
        App::with_store(&config, store).unwrap()
    }
}

async fn handle(State(shared): State<Arc<Shared>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();

    let hit = Hit {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(String::from),
        authorization: parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null),
    };

    let reply = shared
        .replies
        .lock()
        .unwrap()
        .get(&(hit.method.clone(), hit.path.clone()))
        .cloned()
        .unwrap_or_else(|| Reply::json(404, serde_json::json!({ "detail": "Not Found" })));

    shared.hits.lock().unwrap().push(hit);

    Response::builder()
        .status(StatusCode::from_u16(reply.status).unwrap())
        .header(header::CONTENT_TYPE, reply.content_type)
        .body(Body::from(reply.body))
        .unwrap()
}

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// HS256 token for user `sub` expiring `offset_secs` from now.
pub fn token(sub: &str, offset_secs: i64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: Utc::now().timestamp() + offset_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}
