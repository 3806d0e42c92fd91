//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; one task per connection. Every `GET` path
//! other than `/health` is treated as a location path and resolved.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, Instrument};

use crate::config::Args;
use crate::routes;
use crate::services::Resolver;
use crate::types::{ResolverError, Result};

/// Shared application state, read-only after start-up
pub struct AppState {
    pub args: Args,
    pub resolver: Resolver,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, resolver: Resolver) -> Self {
        Self {
            args,
            resolver,
            started_at: Instant::now(),
        }
    }
}

/// Run the HTTP server until the process exits
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;
    serve(listener, state).await
}

/// Serve connections from an already bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    info!("Resolver listening on {}", listener.local_addr()?);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = uuid::Uuid::new_v4();

    let span = tracing::info_span!("request", id = %request_id);
    async move {
        info!("[{}] {} {}", addr, method, path);

        let response = match (&method, path.as_str()) {
            (&Method::OPTIONS, _) => preflight_response(),
            (&Method::GET, "/health") => routes::handle_health(&state),
            (&Method::GET, _) => routes::handle_resolve(Arc::clone(&state), &path).await,
            _ => error_response(&ResolverError::MethodNotAllowed(method.to_string())),
        };

        Ok(response)
    }
    .instrument(span)
    .await
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// `{code, name, description}` error response
pub fn error_response(err: &ResolverError) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(&err.to_body()).unwrap_or_default();

    Response::builder()
        .status(err.status_code())
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// 200 response with a JSON body
pub fn json_response(value: &serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(value.to_string())))
        .unwrap()
}

/// 200 response passing an upstream body through
pub fn text_response(body: String, content_type: Option<&str>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type.unwrap_or("text/plain; charset=utf-8"))
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
