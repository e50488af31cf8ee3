use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::{
    ports::{DetectorPort, FrameSourcePort, RendererPort},
    services::ProximityService,
};
use crate::domain::{
    annotation::FrameAnnotator,
    errors::DomainResult,
    stream::summarize_annotations,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// La fuente terminó (fin de fichero / secuencia).
    EndOfStream,
    /// La cámara se desconectó o dejó de entregar frames.
    SourceLost,
    /// Parada pedida por el usuario.
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub warnings: u64,
    pub stop: StopReason,
}

/// Bucle síncrono: adquirir → detectar → evaluar → anotar → renderizar.
/// Un frame se procesa completo antes de pedir el siguiente.
pub struct PipelineRunner {
    proximity: ProximityService,
    annotator: FrameAnnotator,
    confidence_threshold: f32,
    source: Box<dyn FrameSourcePort>,
    detector: Box<dyn DetectorPort>,
    renderer: Box<dyn RendererPort>,
}

impl PipelineRunner {
    pub fn new(
        proximity: ProximityService,
        annotator: FrameAnnotator,
        confidence_threshold: f32,
        source: Box<dyn FrameSourcePort>,
        detector: Box<dyn DetectorPort>,
        renderer: Box<dyn RendererPort>,
    ) -> Self {
        Self { proximity, annotator, confidence_threshold, source, detector, renderer }
    }

    /// Ejecuta hasta fin de stream, cancelación o error fatal.
    /// La fuente y el renderizador se liberan en todas las salidas.
    pub fn run(mut self) -> DomainResult<RunSummary> {
        let outcome = self.drive();
        self.source.release();
        self.renderer.release();
        outcome
    }

    fn drive(&mut self) -> DomainResult<RunSummary> {
        let mut frames = 0u64;
        let mut warnings = 0u64;

        let stop = loop {
            // ACQUIRE_FRAME
            let started_at = Instant::now();
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("📹 Fin del stream tras {} frames", frames);
                    break StopReason::EndOfStream;
                }
                Err(e) => {
                    warn!("📹 Fuente de vídeo perdida: {}", e);
                    break StopReason::SourceLost;
                }
            };

            // DETECT
            let t_infer = Instant::now();
            let detections = self.detector.detect(&frame, self.confidence_threshold)?;
            let infer_ms = t_infer.elapsed().as_secs_f32() * 1000.0;

            // PER-DETECTION PROCESS + ANNOTATE
            let assessments = self.proximity.assess_all(detections);
            let annotated = self.annotator.annotate(&assessments, started_at);

            // RENDER
            self.renderer.draw(&frame, &annotated)?;
            self.renderer.present()?;

            frames += 1;
            warnings += annotated.warnings() as u64;
            debug!(
                frame = frame.index,
                infer_ms,
                fps = annotated.fps,
                warnings = annotated.warnings(),
                "{}",
                summarize_annotations(&annotated.annotations)
            );

            if self.renderer.cancel_requested() {
                info!("🛑 Parada solicitada tras {} frames", frames);
                break StopReason::Cancelled;
            }
        };

        Ok(RunSummary { frames, warnings, stop })
    }
}
