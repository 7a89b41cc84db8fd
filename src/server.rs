//! Web server for the texture mapping demo page and API

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use parking_lot::{Mutex, RwLock};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{Config, ShapeConfig};
use crate::corners::{CornerSet, Corners};
use crate::geometry::{Location, Point};
use crate::scene::{Scene, ShapeUpdate};
use crate::shape::{RenderOutcome, ShapeError};
use crate::texture::Texture;

/// Embedded static files for the web UI
#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

/// Largest accepted request body (data URL uploads)
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    /// Configuration as loaded (and updated by the API)
    pub config: Arc<RwLock<Config>>,
    /// Path to save configuration
    config_path: PathBuf,
    /// The shape being drawn
    scene: Mutex<Scene>,
}

impl AppState {
    pub fn new(config: Arc<RwLock<Config>>, config_path: PathBuf, scene: Scene) -> Self {
        Self {
            config,
            config_path,
            scene: Mutex::new(scene),
        }
    }

    /// Render the current frame as PNG
    pub fn render_png(&self) -> Result<(Vec<u8>, RenderOutcome)> {
        let (canvas, outcome) = self.scene.lock().render();
        Ok((canvas.encode_png()?, outcome))
    }

    /// Render the current frame in picking mode (PNG)
    pub fn render_pick_png(&self) -> Result<Vec<u8>> {
        let (canvas, _) = self.scene.lock().render_picking();
        canvas.encode_png()
    }

    /// Replace the grid mapping settings of both the live shape and the config.
    /// The scene lock is held across both so they cannot diverge.
    pub fn set_mapping(&self, mapping: ShapeConfig) -> Result<(), ShapeError> {
        let mut scene = self.scene.lock();
        scene.set_mapping(mapping)?;
        self.config.write().shape.mapping = mapping;
        Ok(())
    }

    /// Apply a shape update and mirror the persistent parts into the config
    pub fn update_shape(&self, update: ShapeUpdate) -> Result<(), ShapeError> {
        let mut scene = self.scene.lock();
        let attributes = update.attributes;
        scene.update_shape(update)?;

        let mut config = self.config.write();
        config.shape.boundary = scene.boundary().to_vec();
        if let Some(attributes) = attributes {
            config.shape.attributes = attributes;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save_config(&self) -> Result<()> {
        let config = self.config.read();
        config.save(&self.config_path)
    }
}

/// Run the web server
pub async fn run_server(addr: &str, state: Arc<AppState>) -> Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Static files and UI
        .route("/", get(index_handler))
        .route("/static/*path", get(static_handler))
        // API endpoints
        .route("/api/render", get(get_render))
        .route("/api/pick", get(get_pick))
        .route("/api/shape", get(get_shape).post(update_shape))
        .route("/api/texture", post(set_texture))
        .route("/api/texture/toggle", post(toggle_texture))
        .route("/api/config", get(get_config))
        .route("/api/config", post(set_config))
        .route("/api/config/save", post(save_config))
        .route("/api/info", get(get_info))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Serve the main index page
async fn index_handler() -> impl IntoResponse {
    match StaticAssets::get("index.html") {
        Some(content) => Html(content.data.to_vec()).into_response(),
        None => (StatusCode::NOT_FOUND, "Index not found").into_response(),
    }
}

/// Serve static files
async fn static_handler(Path(path): Path<String>) -> impl IntoResponse {
    let path = path.trim_start_matches('/');

    match StaticAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(axum::http::header::CONTENT_TYPE, mime.as_ref())],
                content.data.to_vec(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Render the current frame (PNG)
async fn get_render(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let result = tokio::task::spawn_blocking(move || state.render_png()).await;

    match result {
        Ok(Ok((png, outcome))) => {
            tracing::debug!("Served frame ({} bytes): {:?}", png.len(), outcome);
            ([(axum::http::header::CONTENT_TYPE, "image/png")], png).into_response()
        }
        Ok(Err(e)) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        Err(e) => {
            tracing::error!("Render task panicked: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Render failed").into_response()
        }
    }
}

/// Render the current frame in picking mode (PNG)
async fn get_pick(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let result = tokio::task::spawn_blocking(move || state.render_pick_png()).await;

    match result {
        Ok(Ok(png)) => ([(axum::http::header::CONTENT_TYPE, "image/png")], png).into_response(),
        Ok(Err(e)) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        Err(e) => {
            tracing::error!("Pick render task panicked: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Render failed").into_response()
        }
    }
}

/// API response for the shape state
#[derive(Serialize)]
struct ShapeResponse {
    has_texture: bool,
    textured: bool,
    config: ShapeConfig,
    state_key: String,
    corners_resolved: bool,
    corners: Vec<Point>,
    boundary: Vec<Location>,
}

/// Get current shape state
async fn get_shape(State(state): State<Arc<AppState>>) -> Json<ShapeResponse> {
    let mut scene = state.scene.lock();
    let (corners_resolved, corners) = match scene.corners() {
        Corners::Ordered(CornerSet(points)) => (true, points.to_vec()),
        Corners::Unresolved(points) => (false, points),
    };
    let has_texture = scene.has_texture();
    let boundary = scene.boundary().to_vec();
    let shape = scene.shape_mut();

    Json(ShapeResponse {
        has_texture,
        textured: shape.is_textured(),
        config: *shape.config(),
        state_key: shape.state_key().to_string(),
        corners_resolved,
        corners,
        boundary,
    })
}

/// Change the shape's boundary, attributes, highlight or interior inhibition
async fn update_shape(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ShapeUpdate>,
) -> impl IntoResponse {
    match state.update_shape(update) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            tracing::warn!("Rejected shape update: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Request to assign a texture
#[derive(Deserialize)]
struct SetTextureRequest {
    /// `data:image/...;base64,...`
    data_url: String,
}

#[derive(Serialize)]
struct TextureResponse {
    width: u32,
    height: u32,
}

/// Decode and assign a new texture
async fn set_texture(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetTextureRequest>,
) -> impl IntoResponse {
    let texture = match Texture::from_data_url(&req.data_url) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!("Rejected texture upload: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let response = TextureResponse {
        width: texture.width(),
        height: texture.height(),
    };
    tracing::info!("New texture {}x{}", response.width, response.height);
    state.scene.lock().set_texture(texture);

    Json(response).into_response()
}

#[derive(Serialize)]
struct ToggleResponse {
    has_texture: bool,
}

/// Show or hide the texture
async fn toggle_texture(State(state): State<Arc<AppState>>) -> Json<ToggleResponse> {
    let has_texture = state.scene.lock().toggle_texture();
    Json(ToggleResponse { has_texture })
}

/// Get the grid mapping settings
async fn get_config(State(state): State<Arc<AppState>>) -> Json<ShapeConfig> {
    Json(*state.scene.lock().shape().config())
}

/// Replace the grid mapping settings
async fn set_config(
    State(state): State<Arc<AppState>>,
    Json(mapping): Json<ShapeConfig>,
) -> impl IntoResponse {
    match state.set_mapping(mapping) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

/// Save configuration to file
async fn save_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.save_config() {
        Ok(_) => (StatusCode::OK, "Saved").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// System information response
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    width: u32,
    height: u32,
}

/// Get system information
async fn get_info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    let scene = state.scene.lock();

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        width: scene.viewport().width,
        height: scene.viewport().height,
    })
}
