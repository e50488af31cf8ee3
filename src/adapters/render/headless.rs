use tracing::{debug, info};

use crate::application::cancel::CancelToken;
use crate::application::ports::RendererPort;
use crate::domain::alert::AlertLevel;
use crate::domain::annotation::AnnotatedFrame;
use crate::domain::camera::Frame;
use crate::domain::errors::DomainResult;
use crate::domain::stream::summarize_annotations;

/// Renderizador sin display: solo registra las alertas. Nunca falla.
pub struct HeadlessRenderer {
    cancel: CancelToken,
    pending: Option<String>,
}

impl HeadlessRenderer {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel, pending: None }
    }
}

impl RendererPort for HeadlessRenderer {
    fn draw(&mut self, frame: &Frame, annotated: &AnnotatedFrame) -> DomainResult<()> {
        let warnings: Vec<String> = annotated
            .annotations
            .iter()
            .filter(|a| a.alert == AlertLevel::Warning)
            .map(|a| match a.zone {
                Some(zone) => format!("{} [{}]", a.label, zone),
                None => a.label.clone(),
            })
            .collect();

        if !warnings.is_empty() {
            info!(frame = frame.index, "⚠️ Vehículo demasiado cerca: {}", warnings.join(", "));
        }
        self.pending = Some(format!(
            "frame {} | fps {} | {}",
            frame.index,
            annotated.fps.map(|f| format!("{f:.1}")).unwrap_or_else(|| "--".into()),
            summarize_annotations(&annotated.annotations)
        ));
        Ok(())
    }

    fn present(&mut self) -> DomainResult<()> {
        if let Some(line) = self.pending.take() {
            debug!("{}", line);
        }
        Ok(())
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn release(&mut self) {
        self.pending = None;
    }
}
