use crate::domain::{
    annotation::AnnotatedFrame,
    camera::Frame,
    detection::Detection,
    errors::DomainResult,
};

/// Productor de frames (cámara V4L2, secuencia grabada...).
pub trait FrameSourcePort {
    /// `Ok(None)` marca el fin del stream; un `Err` indica que la fuente se ha perdido.
    fn next_frame(&mut self) -> DomainResult<Option<Frame>>;
    /// Libera el dispositivo. Debe ser idempotente.
    fn release(&mut self);
}

pub trait DetectorPort {
    /// Solo devuelve detecciones con `score >= confidence_threshold`.
    fn detect(&mut self, frame: &Frame, confidence_threshold: f32) -> DomainResult<Vec<Detection>>;
}

/// Consumidor de frames anotados; también es el origen de la señal de cancelación.
pub trait RendererPort {
    fn draw(&mut self, frame: &Frame, annotated: &AnnotatedFrame) -> DomainResult<()>;
    fn present(&mut self) -> DomainResult<()>;
    fn cancel_requested(&self) -> bool;
    fn release(&mut self);
}
