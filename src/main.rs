mod adapters;
mod application;
mod config;
mod domain;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

use crate::adapters::{
    files::image_sequence::ImageSequenceSource,
    http::{renderer::DashboardRenderer, router, state::HttpState},
    onnx::{model_catalog::OnnxModelCatalog, yolo_engine::OnnxYoloEngine},
    render::headless::HeadlessRenderer,
    v4l2::capture::V4l2Capture,
    video::opencv_capture::VideoFileSource,
};
use crate::application::{
    cancel::CancelToken,
    ports::{FrameSourcePort, RendererPort},
    runner::{PipelineRunner, RunSummary},
    services::ProximityService,
};
use crate::config::SystemConfig;
use crate::domain::camera::{CameraId, CameraMode, FrameSize};
use crate::domain::model::ModelId;

#[derive(Parser, Debug, Clone)]
#[command(name = "vehicle-proximity", about = "Distancia monocular a vehículos y avisos de proximidad por carril")]
#[command(group(ArgGroup::new("input").required(true).args(["camera", "frames", "video"])))]
struct Args {
    /// Fichero YAML de configuración (zonas, umbrales, constantes). Sin él se usan los valores por defecto.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Modelo YOLO exportado a ONNX.
    #[arg(long, default_value = "models/yolov8n.onnx")]
    model: String,
    /// Dispositivo V4L2 (p. ej. /dev/video0).
    #[arg(long, value_name = "DEVICE")]
    camera: Option<String>,
    /// Directorio con una grabación exportada como imágenes.
    #[arg(long, value_name = "DIR")]
    frames: Option<PathBuf>,
    /// Fichero de vídeo (grabación de dashcam) o URL de stream (rtsp://, http://).
    #[arg(long, value_name = "PATH|URL")]
    video: Option<String>,
    #[arg(long, default_value = "MJPG")]
    fourcc: String,
    #[arg(long, default_value_t = 1920)]
    width: u32,
    #[arg(long, default_value_t = 1080)]
    height: u32,
    #[arg(long, default_value_t = 30)]
    fps: u32,
    /// Sin dashboard: solo logs.
    #[arg(long)]
    headless: bool,
    #[arg(long, default_value_t = 8090)]
    port: u16,
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,ort=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    info!("🚗 Vehicle proximity: arrancando...");

    // 2. Configuración estática: se valida entera antes de tocar hardware
    let config = match &args.config {
        Some(path) => SystemConfig::load(path)?,
        None => SystemConfig::default(),
    };
    let proximity = ProximityService::from_config(&config).context("configuración inválida")?;
    let annotator = config.annotator().context("configuración inválida")?;
    let confidence = config.confidence_threshold().context("configuración inválida")?;
    OnnxModelCatalog::new()
        .validate_model(&ModelId { name: "yolo".into(), onnx_path: args.model.clone() })
        .context("modelo inválido")?;
    info!(
        "✅ Configuración cargada: {} zonas, confianza {:.2}, umbrales {:?}",
        proximity.classifier().zones().len(),
        confidence,
        config.warning_distances()
    );

    // 3. Cancelación: Ctrl-C y (si hay dashboard) POST /api/stop
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("👋 Ctrl-C recibido, deteniendo...");
                cancel.cancel();
            }
        });
    }

    // 4. Renderizador
    let (tx, _) = broadcast::channel(16);
    let renderer: Box<dyn RendererPort + Send> = if args.headless {
        Box::new(HeadlessRenderer::new(cancel.clone()))
    } else {
        let state = HttpState { config: Arc::new(config.clone()), frames: tx.clone(), cancel: cancel.clone() };
        let app = router(state).fallback_service(ServeDir::new(&args.static_dir));
        let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("🚀 Dashboard en http://{}", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Servidor HTTP caído: {}", e);
            }
        });
        Box::new(DashboardRenderer::new(tx, proximity.classifier().zones().to_vec(), cancel.clone()))
    };

    // 5. El pipeline es síncrono: hilo bloqueante propio. Cámara y modelo se abren dentro.
    let worker_args = args.clone();
    let params = config.model.clone();
    let summary: RunSummary = tokio::task::spawn_blocking(move || -> anyhow::Result<RunSummary> {
        let mut renderer = renderer;
        let (detector, source) = assemble(
            renderer.as_mut(),
            || OnnxYoloEngine::load(&worker_args.model, params),
            || open_source(&worker_args),
        )?;
        let runner = PipelineRunner::new(proximity, annotator, confidence, source, Box::new(detector), renderer);
        Ok(runner.run()?)
    })
    .await
    .context("el hilo del pipeline terminó de forma inesperada")??;

    if summary.warnings > 0 {
        warn!("⚠️ {} avisos de proximidad en {} frames", summary.warnings, summary.frames);
    }
    info!("🏁 Pipeline detenido ({:?}) tras {} frames", summary.stop, summary.frames);
    Ok(())
}

/// Carga el detector y abre la fuente, en ese orden: si el modelo no carga la cámara no llega a abrirse.
/// Ante cualquier fallo el renderizador se libera antes de propagar el error.
fn assemble<D, S>(
    renderer: &mut dyn RendererPort,
    load_detector: impl FnOnce() -> anyhow::Result<D>,
    open_source: impl FnOnce() -> anyhow::Result<S>,
) -> anyhow::Result<(D, S)> {
    let outcome = load_detector().and_then(|detector| Ok((detector, open_source()?)));
    if outcome.is_err() {
        renderer.release();
    }
    outcome
}

fn open_source(args: &Args) -> anyhow::Result<Box<dyn FrameSourcePort>> {
    if let Some(dir) = &args.frames {
        return Ok(Box::new(ImageSequenceSource::open(dir)?));
    }
    if let Some(location) = &args.video {
        return Ok(Box::new(VideoFileSource::open(location)?));
    }
    let path = args.camera.clone().context("no se indicó --camera, --frames ni --video")?;
    let mode = CameraMode {
        format: args.fourcc.clone(),
        size: FrameSize { width: args.width, height: args.height },
        fps: args.fps,
    };
    let capture = V4l2Capture::open(&CameraId { path }, &mode).context("no se pudo abrir la cámara")?;
    Ok(Box::new(capture))
}
