//! Monitoring interface: an actix-web server exposing live telemetry and the
//! manual override endpoint.
//!
//! The server runs on a dedicated thread with its own actix system so the
//! capture loop's runtime never schedules HTTP work. Handlers only talk to
//! the [`TelemetryStore`].

mod control;

use std::{
    net::{SocketAddr, TcpListener},
    thread::JoinHandle,
};

use actix_web::{
    http::header,
    web::{self, Bytes},
    App, HttpResponse, HttpServer,
};
use image::{buffer::ConvertBuffer, codecs::jpeg::JpegEncoder, ColorType, ImageResult, RgbImage};
use linefollower_ops::TelemetryStore;
use linefollower_types::{config::NetworkConfig, LineFollowerError, Result};
use serde_json::json;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

pub use control::{parse_control_request, ControlRejection};

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Shared state behind every handler.
pub struct MonitorState {
    store: TelemetryStore,
    jpeg_quality: u8,
    max_speed: i32,
}

impl MonitorState {
    pub fn new(store: TelemetryStore, jpeg_quality: u8, max_speed: i32) -> Self {
        Self {
            store,
            jpeg_quality: jpeg_quality.clamp(1, 100),
            max_speed,
        }
    }
}

/// Register the monitoring routes. The caller provides `web::Data<MonitorState>`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index_route))
        .route("/frame", web::get().to(frame_handler))
        .route("/threshold", web::get().to(threshold_handler))
        .route("/metrics", web::get().to(metrics_handler))
        .route("/control", web::post().to(control_handler));
}

/// Handle for the monitor server thread.
pub struct MonitorServer {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MonitorServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signal the server to stop and block until the thread exits.
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        info!("Monitoring interface stopped");
    }
}

/// Bind the listener and spawn the server thread.
///
/// Binding happens on the calling thread so address errors surface here.
pub fn spawn_monitor_server(config: &NetworkConfig, state: MonitorState) -> Result<MonitorServer> {
    let listener = TcpListener::bind((config.bind_addr.as_str(), config.port)).map_err(|err| {
        network_error(format!(
            "failed to bind {}:{}: {err}",
            config.bind_addr, config.port
        ))
    })?;
    let local_addr = listener
        .local_addr()
        .map_err(|err| network_error(format!("failed to read bound address: {err}")))?;

    let data = web::Data::new(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = std::thread::Builder::new()
        .name("monitor-server".into())
        .spawn(move || {
            if let Err(err) = actix_web::rt::System::new().block_on(async move {
                let server = HttpServer::new(move || {
                    App::new()
                        .app_data(data.clone())
                        .configure(configure_routes)
                })
                .workers(2)
                .disable_signals()
                .listen(listener)?
                .run();

                let srv_handle = server.handle();
                actix_web::rt::spawn(async move {
                    let _ = shutdown_rx.await;
                    srv_handle.stop(true).await;
                });

                server.await
            }) {
                error!("Monitor server error: {err}");
            }
        })
        .map_err(|err| network_error(format!("failed to spawn monitor server thread: {err}")))?;

    info!("Monitoring interface listening on http://{local_addr}");
    Ok(MonitorServer {
        local_addr,
        shutdown: Some(shutdown_tx),
        handle: Some(handle),
    })
}

pub fn network_error(message: impl Into<String>) -> LineFollowerError {
    LineFollowerError::Network(message.into())
}

async fn index_route() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

async fn frame_handler(state: web::Data<MonitorState>) -> HttpResponse {
    let Some(frame) = state.store.debug_frame() else {
        return jpeg_response(Vec::new());
    };
    let quality = state.jpeg_quality;
    encode_response("debug frame", move || encode_jpeg(&frame, quality)).await
}

async fn threshold_handler(state: web::Data<MonitorState>) -> HttpResponse {
    let Some(mask) = state.store.mask() else {
        return jpeg_response(Vec::new());
    };
    let quality = state.jpeg_quality;
    encode_response("threshold mask", move || encode_jpeg(&mask.convert(), quality)).await
}

async fn metrics_handler(state: web::Data<MonitorState>) -> HttpResponse {
    HttpResponse::Ok().json(state.store.metrics())
}

async fn control_handler(state: web::Data<MonitorState>, body: Bytes) -> HttpResponse {
    match parse_control_request(&body, state.max_speed) {
        Ok(update) => {
            let applied = state.store.set_control_state(update);
            info!("Control mode set to {}", applied.mode);
            HttpResponse::Ok().json(json!({ "status": "ok" }))
        }
        Err(rejection) => {
            warn!("Rejected control request: {rejection}");
            HttpResponse::BadRequest().json(json!({
                "status": "error",
                "message": rejection.to_string(),
            }))
        }
    }
}

/// Encode off the async workers; the store guard is already released.
async fn encode_response<F>(what: &'static str, encode: F) -> HttpResponse
where
    F: FnOnce() -> ImageResult<Vec<u8>> + Send + 'static,
{
    match web::block(encode).await {
        Ok(Ok(jpeg)) => jpeg_response(jpeg),
        Ok(Err(err)) => {
            warn!("Failed to encode {what}: {err}");
            HttpResponse::InternalServerError().finish()
        }
        Err(err) => {
            warn!("Encoder task for {what} failed: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode(
        image.as_raw(),
        image.width(),
        image.height(),
        ColorType::Rgb8,
    )?;
    Ok(buf)
}

fn jpeg_response(body: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("image/jpeg")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .body(body)
}
