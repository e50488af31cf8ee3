use image::ExtendedColorType;
use tokio::sync::broadcast;

use crate::adapters::render::overlay::draw_overlay;
use crate::application::cancel::CancelToken;
use crate::application::ports::RendererPort;
use crate::domain::annotation::AnnotatedFrame;
use crate::domain::camera::Frame;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::stream::FrameMeta;
use crate::domain::zone::Zone;

pub type FrameSender = broadcast::Sender<(FrameMeta, Vec<u8>)>;

enum Pending {
    /// Nadie mirando: el frame no se codificó.
    Skipped,
    Ready(FrameMeta, Vec<u8>),
}

/// Renderizador para el dashboard web: dibuja el overlay, comprime a JPEG
/// y lo publica en el canal de difusión que consumen los WebSockets.
pub struct DashboardRenderer {
    tx: FrameSender,
    zones: Vec<Zone>,
    cancel: CancelToken,
    jpeg_quality: u8,
    pending: Option<Pending>,
}

impl DashboardRenderer {
    pub fn new(tx: FrameSender, zones: Vec<Zone>, cancel: CancelToken) -> Self {
        Self { tx, zones, cancel, jpeg_quality: 80, pending: None }
    }
}

impl RendererPort for DashboardRenderer {
    fn draw(&mut self, frame: &Frame, annotated: &AnnotatedFrame) -> DomainResult<()> {
        // sin clientes conectados no merece la pena dibujar ni comprimir
        if self.tx.receiver_count() == 0 {
            self.pending = Some(Pending::Skipped);
            return Ok(());
        }

        let mut canvas = frame.image.clone();
        draw_overlay(&mut canvas, &self.zones, annotated);

        let mut jpeg = Vec::new();
        let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality);
        enc.encode(canvas.as_raw(), canvas.width(), canvas.height(), ExtendedColorType::Rgb8)
            .map_err(|e| DomainError::RenderFailure(format!("JPEG: {e}")))?;

        let meta = FrameMeta {
            index: frame.index,
            width: canvas.width(),
            height: canvas.height(),
            fps: annotated.fps,
            warnings: annotated.warnings(),
            annotations: annotated.annotations.clone(),
        };
        self.pending = Some(Pending::Ready(meta, jpeg));
        Ok(())
    }

    fn present(&mut self) -> DomainResult<()> {
        match self.pending.take() {
            None => Err(DomainError::RenderFailure("present() sin draw() previo".into())),
            Some(Pending::Skipped) => Ok(()),
            Some(Pending::Ready(meta, jpeg)) => {
                // el cliente pudo desconectarse entre draw y present
                let _ = self.tx.send((meta, jpeg));
                Ok(())
            }
        }
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn release(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn empty() -> AnnotatedFrame {
        AnnotatedFrame { annotations: vec![], fps: Some(30.0) }
    }

    #[test]
    fn test_publishes_meta_and_jpeg() {
        let (tx, mut rx) = broadcast::channel(4);
        let mut renderer = DashboardRenderer::new(tx, vec![], CancelToken::new());
        let frame = Frame::new(7, RgbImage::new(16, 8));

        renderer.draw(&frame, &empty()).unwrap();
        renderer.present().unwrap();

        let (meta, jpeg) = rx.try_recv().unwrap();
        assert_eq!((meta.index, meta.width, meta.height), (7, 16, 8));
        assert_eq!(meta.fps, Some(30.0));
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_present_without_draw_fails() {
        let (tx, _rx) = broadcast::channel(4);
        let mut renderer = DashboardRenderer::new(tx, vec![], CancelToken::new());
        assert!(matches!(renderer.present(), Err(DomainError::RenderFailure(_))));
    }

    #[test]
    fn test_no_subscribers_is_fine() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        let mut renderer = DashboardRenderer::new(tx, vec![], CancelToken::new());
        renderer.draw(&Frame::new(1, RgbImage::new(4, 4)), &empty()).unwrap();
        assert!(matches!(renderer.pending, Some(Pending::Skipped)));
        assert!(renderer.present().is_ok());
        assert!(renderer.present().is_err());
    }

    #[test]
    fn test_encodes_once_a_client_subscribes() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        let mut renderer = DashboardRenderer::new(tx.clone(), vec![], CancelToken::new());
        let frame = Frame::new(1, RgbImage::new(4, 4));

        renderer.draw(&frame, &empty()).unwrap();
        renderer.present().unwrap();

        let mut rx = tx.subscribe();
        renderer.draw(&frame, &empty()).unwrap();
        assert!(matches!(renderer.pending, Some(Pending::Ready(..))));
        renderer.present().unwrap();
        assert_eq!(rx.try_recv().unwrap().0.index, 1);
    }
}
