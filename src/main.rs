//! quadtex - texture mapping onto screen-space quadrilaterals
//!
//! Projects a bitmap onto a convex quadrilateral by splitting the
//! quadrilateral into a grid of small cells and copying a scaled slice of a
//! downsampled copy of the bitmap into each one. A demo web page shows a
//! geographic shape with a texture that can be swapped and toggled.

mod canvas;
mod config;
mod corners;
mod geometry;
mod mapper;
mod projection;
mod scene;
mod scratch;
mod server;
mod shape;
mod surface;
mod texture;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::shape::RenderOutcome;
use crate::texture::Texture;

/// quadtex - grid-subdivided texture mapping demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "quadtex.toml")]
    config: PathBuf,

    /// Texture image (overrides the configured one)
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Render a single frame to this PNG file and exit
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Start with the texture hidden
    #[arg(long)]
    no_texture: bool,

    /// Grid step
    #[arg(long)]
    step: Option<u32>,

    /// Maximum working bitmap width
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum working bitmap height
    #[arg(long)]
    max_height: Option<u32>,

    /// Web server host
    #[arg(long)]
    host: Option<String>,

    /// Web server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("quadtex v{}", env!("CARGO_PKG_VERSION"));

    // Load or create configuration, CLI args as overrides
    let mut config = config::Config::load_or_create(&args.config)?;
    if let Some(step) = args.step {
        config.shape.mapping.step = step;
    }
    if let Some(w) = args.max_width {
        config.shape.mapping.max_image_width = w;
    }
    if let Some(h) = args.max_height {
        config.shape.mapping.max_image_height = h;
    }
    if let Some(image) = args.image.clone() {
        config.shape.image = Some(image);
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let texture = match &config.shape.image {
        Some(path) => {
            let texture = Texture::open(path)
                .with_context(|| format!("Failed to load texture from {:?}", path))?;
            info!("Loaded texture {:?} ({}x{})", path, texture.width(), texture.height());
            texture
        }
        None => scene::default_texture()?,
    };

    let mut scene = scene::Scene::from_config(&config, texture, !args.no_texture)?;

    if let Some(output) = &args.output {
        let (canvas, outcome) = scene.render();
        match outcome {
            RenderOutcome::Textured(stats) => info!(
                "Textured render: {}x{} working bitmap, {} cells, {} blits, {} culled",
                stats.working_width, stats.working_height, stats.cells, stats.blits, stats.culled
            ),
            other => info!("Render: {:?}", other),
        }
        canvas
            .into_image()
            .save(output)
            .with_context(|| format!("Failed to write frame to {:?}", output))?;
        info!("Wrote {:?}", output);
        return Ok(());
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(server::AppState::new(
        Arc::new(RwLock::new(config)),
        args.config.clone(),
        scene,
    ));

    info!("Starting web server at http://{}", addr);
    server::run_server(&addr, state).await
}
