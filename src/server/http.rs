//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::Args;
use crate::fabric::HttpClientFactory;
use crate::network::{ConfigCache, HttpConfigSource};
use crate::registry::{self, ClientRegistry};
use crate::routes;
use crate::types::{BridgeError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Process-wide network configuration, fetched once
    pub config_cache: Arc<ConfigCache>,
    /// Credential -> fabric client map
    pub registry: Arc<ClientRegistry>,
}

impl AppState {
    /// Wire the HTTP config source and HTTP fabric transport from `args`.
    pub fn new(args: Args) -> Result<Self> {
        let source = HttpConfigSource::new(args.config_url.clone(), args.config_region.clone())?;
        debug!("Network configuration source: {}", source.url());
        let config_cache = Arc::new(ConfigCache::new(Arc::new(source)));

        let factory = HttpClientFactory::new(args.fabric_request_timeout())?;
        let registry = Arc::new(ClientRegistry::new(
            Arc::clone(&config_cache),
            Arc::new(factory),
            args.registry_config(),
        ));

        Ok(Self::with_parts(args, config_cache, registry))
    }

    /// Assemble state from already-built parts
    pub fn with_parts(
        args: Args,
        config_cache: Arc<ConfigCache>,
        registry: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            args,
            config_cache,
            registry,
        }
    }

    /// How long a client call waits for its callback
    pub fn invocation_timeout(&self) -> Duration {
        self.args.invocation_timeout()
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("fabric-bridge listening on {}", state.args.listen);

    // Start idle client reaper
    registry::spawn_cleanup_task(Arc::clone(&state.registry));
    info!(
        "Client registry enabled (max {} clients, idle ttl {}s)",
        state.registry.config().max_clients,
        state.registry.config().idle_ttl.as_secs()
    );

    // Warm the configuration so the first caller does not pay for it
    let config_cache = Arc::clone(&state.config_cache);
    tokio::spawn(async move { config_cache.prefetch().await });

    serve(listener, state).await
}

/// Accept connections on an already-bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
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

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
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

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let body = if method == Method::POST {
        match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                return Ok(routes::error_response(BridgeError::BadRequest(format!(
                    "failed to read request body: {e}"
                ))))
            }
        }
    } else {
        Bytes::new()
    };

    Ok(route(state, &method, &path, body).await)
}

/// Dispatch a request to its handler
async fn route(
    state: Arc<AppState>,
    method: &Method,
    path: &str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::POST, "/client") => routes::handle_client_call(state, body).await,
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => routes::health_check(state),
        (&Method::GET, "/version") => routes::version_info(),
        (&Method::OPTIONS, _) => preflight_response(),
        _ => not_found_response(path),
    }
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = routes::response_with(StatusCode::OK, None, Bytes::new());
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    response
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": {
            "status": 404,
            "message": format!("No route for {path}"),
        }
    });
    routes::json_response(StatusCode::NOT_FOUND, body.to_string())
}
