//! HTTP front of the asset server
//!
//! Besides `/assets/<name>` the listener answers `/health` and `/metrics`
//! so the bridge can be probed without a WebSocket client.

use std::convert::Infallible;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use atelier_protocol::{decode_asset_name, ASSET_ROUTE_PREFIX};

use super::{content_type_for_path, resolve, AssetLookup};
use crate::bridge::BridgeState;
use crate::observability::GaugeSnapshot;

/// Response body: either a small in-memory body or a streamed file
pub type AssetBody = UnsyncBoxBody<Bytes, io::Error>;

const ALLOWED_METHODS: &str = "GET, OPTIONS";

/// Serve HTTP on `listener` until the bridge shuts down
pub async fn run_asset_server(
    listener: TcpListener,
    state: Arc<BridgeState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("Asset server listening on http://{}{}", addr, ASSET_ROUTE_PREFIX);
    }

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                let (stream, remote_addr) = match accept_result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Asset server accept error: {}", e);
                        continue;
                    }
                };

                let io = TokioIo::new(stream);
                let state_clone = Arc::clone(&state);

                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state_clone);
                        async move { handle_request(req, state).await }
                    });

                    if let Err(e) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        // Clients dropping mid-response are routine
                        if !e.is_incomplete_message() {
                            debug!("Asset connection error from {}: {}", remote_addr, e);
                        }
                    }
                });
            }

            _ = shutdown_rx.recv() => {
                info!("Asset server shutting down");
                break;
            }
        }
    }
}

/// Answer one request; the request body is never read
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<BridgeState>,
) -> Result<Response<AssetBody>, Infallible> {
    let path = req.uri().path();

    let response = match (req.method(), path) {
        (&Method::OPTIONS, _) => empty(StatusCode::NO_CONTENT),
        (&Method::GET, "/health") => text(StatusCode::OK, "OK"),
        (&Method::GET, "/metrics") => serve_metrics(&state),
        (&Method::GET, p) if p.starts_with(ASSET_ROUTE_PREFIX) => {
            match decode_asset_name(&p[ASSET_ROUTE_PREFIX.len()..]) {
                Some(name) => serve_asset(&state, &name).await,
                None => {
                    state.metrics.record_asset_request(false);
                    text(StatusCode::BAD_REQUEST, "Bad Request")
                }
            }
        }
        (&Method::GET, _) => text(StatusCode::NOT_FOUND, "Not Found"),
        _ => {
            let mut response = text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
            response
        }
    };

    Ok(with_cors(response))
}

async fn serve_asset(state: &BridgeState, name: &str) -> Response<AssetBody> {
    let root = state.config.load().assets.root_dir();

    let (path, len) = match resolve(&root, name).await {
        AssetLookup::Found { path, len } => (path, len),
        AssetLookup::NotFound => {
            debug!("Asset {} not found", name);
            state.metrics.record_asset_request(false);
            return text(StatusCode::NOT_FOUND, "Not Found");
        }
        AssetLookup::Invalid => {
            warn!("Rejected asset name {:?}", name);
            state.metrics.record_asset_request(false);
            return text(StatusCode::BAD_REQUEST, "Bad Request");
        }
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            warn!("Failed to open asset {}: {}", path.display(), e);
            state.metrics.record_asset_request(false);
            return text(StatusCode::NOT_FOUND, "Not Found");
        }
    };

    state.metrics.record_asset_request(true);
    debug!("Serving {} ({} bytes)", path.display(), len);

    let body = StreamBody::new(ReaderStream::new(file).map_ok(Frame::data)).boxed_unsync();
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for_path(&path)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    response
}

fn serve_metrics(state: &BridgeState) -> Response<AssetBody> {
    let gauges = GaugeSnapshot {
        active_connections: state.registry.connection_count() as u64,
    };
    let mut response = full(StatusCode::OK, state.metrics.to_prometheus(&gauges));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    response
}

fn full(status: StatusCode, body: impl Into<Bytes>) -> Response<AssetBody> {
    let body = Full::new(body.into())
        .map_err(|never| match never {})
        .boxed_unsync();
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}

fn text(status: StatusCode, body: &'static str) -> Response<AssetBody> {
    let mut response = full(status, body);
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

fn empty(status: StatusCode) -> Response<AssetBody> {
    full(status, Bytes::new())
}

fn with_cors(mut response: Response<AssetBody>) -> Response<AssetBody> {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingsStore;
    use crate::tools::launcher::testing::FakeLauncher;
    use crate::tools::testing::{test_config, ImmediateScheduler};
    use std::sync::atomic::Ordering;
    use tempfile::{tempdir, TempDir};

    fn state() -> (TempDir, Arc<BridgeState>) {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let settings = Arc::new(SettingsStore::load(config.tools.settings_file()));
        let state = BridgeState::new(
            config,
            settings,
            Arc::new(FakeLauncher::new()),
            Arc::new(ImmediateScheduler),
        );
        (dir, Arc::new(state))
    }

    async fn get(state: &Arc<BridgeState>, method: Method, uri: &str) -> Response<AssetBody> {
        let req = Request::builder().method(method).uri(uri).body(()).unwrap();
        handle_request(req, Arc::clone(state)).await.unwrap()
    }

    async fn body_bytes(response: Response<AssetBody>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_serves_existing_asset() {
        let (dir, state) = state();
        std::fs::write(dir.path().join("assets").join("report.png"), b"\x89PNG data").unwrap();

        let response = get(&state, Method::GET, "/assets/report.png").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "9");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body_bytes(response).await.as_ref(), b"\x89PNG data");
        assert_eq!(state.metrics.asset_requests_total.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_unknown_extension_is_octet_stream() {
        let (dir, state) = state();
        std::fs::write(dir.path().join("assets").join("blob.bin"), b"xx").unwrap();

        let response = get(&state, Method::GET, "/assets/blob.bin").await;
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_missing_asset_is_404() {
        let (_dir, state) = state();
        let response = get(&state, Method::GET, "/assets/missing.xyz").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(state.metrics.asset_misses_total.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_traversal_never_serves_outside_root() {
        let (dir, state) = state();
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

        for uri in [
            "/assets/../secret.txt",
            "/assets/..%2Fsecret.txt",
            "/assets/sub/secret.txt",
            "/assets/",
        ] {
            let response = get(&state, Method::GET, uri).await;
            assert!(
                matches!(
                    response.status(),
                    StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND
                ),
                "{} answered {}",
                uri,
                response.status()
            );
            assert!(!body_bytes(response).await.starts_with(b"secret"));
        }
    }

    #[tokio::test]
    async fn test_encoded_names_are_decoded() {
        let (dir, state) = state();
        let assets = dir.path().join("assets");
        std::fs::write(assets.join("render 01.png"), b"space").unwrap();
        std::fs::write(assets.join("결과.png"), b"hangul").unwrap();

        for (name, expected) in [("render 01.png", &b"space"[..]), ("결과.png", &b"hangul"[..])] {
            let url = state.config.load().assets.asset_url(name);
            let uri: hyper::Uri = url.parse().unwrap();
            let response = get(&state, Method::GET, uri.path()).await;
            assert_eq!(response.status(), StatusCode::OK, "{}", url);
            assert_eq!(body_bytes(response).await.as_ref(), expected);
        }
    }

    #[tokio::test]
    async fn test_decoded_separator_is_rejected() {
        let (dir, state) = state();
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

        let response = get(&state, Method::GET, "/assets/..%2Fsecret.txt").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = get(&state, Method::GET, "/assets/%FF.png").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_options_preflight() {
        let (_dir, state) = state();
        let response = get(&state, Method::OPTIONS, "/assets/anything.png").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            ALLOWED_METHODS
        );
    }

    #[tokio::test]
    async fn test_other_methods_rejected() {
        let (_dir, state) = state();
        let response = get(&state, Method::POST, "/assets/report.png").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], ALLOWED_METHODS);
    }

    #[tokio::test]
    async fn test_health_and_unknown_routes() {
        let (_dir, state) = state();
        let response = get(&state, Method::GET, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await.as_ref(), b"OK");

        let response = get(&state, Method::GET, "/elsewhere").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let (_dir, state) = state();
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        state.registry.register(tx, None);

        let response = get(&state, Method::GET, "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_bytes(response).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("atelier_active_connections 1"));
    }
}
