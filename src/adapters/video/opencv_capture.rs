use anyhow::{anyhow, bail, Result};
use image::RgbImage;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst},
};
use tracing::{info, warn};

use crate::application::ports::FrameSourcePort;
use crate::domain::camera::Frame;
use crate::domain::errors::{DomainError, DomainResult};

/// Fuente de frames desde un fichero de vídeo (grabación de dashcam) o una URL de stream (RTSP/HTTP).
pub struct VideoFileSource {
    location: String,
    cap: Option<VideoCapture>,
    // en un stream remoto no hay fin de fichero: dejar de recibir es una desconexión
    remote: bool,
    next_index: u64,
}

impl VideoFileSource {
    pub fn open(location: &str) -> DomainResult<Self> {
        Self::try_open(location).map_err(|e| DomainError::SourceUnavailable(format!("{location}: {e:#}")))
    }

    fn try_open(location: &str) -> Result<Self> {
        if location.trim().is_empty() {
            bail!("ruta de vídeo vacía");
        }
        let cap = VideoCapture::from_file(location, videoio::CAP_ANY)?;
        if !cap.is_opened()? {
            bail!("no se pudo abrir el vídeo");
        }

        let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS)?;
        let total_frames = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT)? as i64;
        let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
        info!(
            "Vídeo abierto: {} {}x{} @ {:.1} FPS, {} frames",
            location, width, height, fps, total_frames
        );

        Ok(Self { location: location.to_string(), cap: Some(cap), remote: is_stream_url(location), next_index: 0 })
    }

    fn read_rgb(&mut self) -> Result<Option<RgbImage>> {
        let cap = self.cap.as_mut().ok_or_else(|| anyhow!("vídeo ya liberado"))?;

        let mut bgr = Mat::default();
        if !VideoCaptureTrait::read(cap, &mut bgr)? || bgr.empty() {
            return Ok(None);
        }

        // OpenCV entrega BGR
        let mut rgb = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let (w, h) = (rgb.cols() as u32, rgb.rows() as u32);
        let data = rgb.data_bytes()?.to_vec();
        RgbImage::from_raw(w, h, data)
            .map(Some)
            .ok_or_else(|| anyhow!("frame {}x{} con buffer de tamaño inesperado", w, h))
    }
}

fn is_stream_url(location: &str) -> bool {
    location.contains("://")
}

impl FrameSourcePort for VideoFileSource {
    fn next_frame(&mut self) -> DomainResult<Option<Frame>> {
        let rgb = self
            .read_rgb()
            .map_err(|e| DomainError::SourceUnavailable(format!("{}: {e:#}", self.location)))?;
        match rgb {
            Some(rgb) => {
                self.next_index += 1;
                Ok(Some(Frame::new(self.next_index, rgb)))
            }
            None if self.remote => Err(DomainError::SourceUnavailable(format!(
                "{}: el stream dejó de entregar frames",
                self.location
            ))),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        if let Some(mut cap) = self.cap.take() {
            if let Err(e) = cap.release() {
                warn!("Error liberando {}: {}", self.location, e);
            }
            info!("Vídeo liberado: {}", self.location);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, Size, CV_8UC3};
    use opencv::videoio::VideoWriter;

    fn write_clip(path: &str, frames: usize) {
        let fourcc = VideoWriter::fourcc('M', 'J', 'P', 'G').unwrap();
        let mut writer = VideoWriter::new(path, fourcc, 10.0, Size::new(32, 24), true).unwrap();
        assert!(writer.is_opened().unwrap());
        let frame = Mat::new_rows_cols_with_default(24, 32, CV_8UC3, Scalar::all(90.0)).unwrap();
        for _ in 0..frames {
            writer.write(&frame).unwrap();
        }
        writer.release().unwrap();
    }

    #[test]
    fn test_plays_clip_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashcam.avi");
        let path = path.to_str().unwrap();
        write_clip(path, 3);

        let mut source = VideoFileSource::open(path).unwrap();
        for expected in 1..=3 {
            let frame = source.next_frame().unwrap().unwrap();
            assert_eq!(frame.index, expected);
            assert_eq!(frame.image.dimensions(), (32, 24));
        }
        assert!(source.next_frame().unwrap().is_none());

        source.release();
        source.release();
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.mp4");
        assert!(matches!(
            VideoFileSource::open(missing.to_str().unwrap()),
            Err(DomainError::SourceUnavailable(_))
        ));
        assert!(VideoFileSource::open("  ").is_err());
    }

    #[test]
    fn test_urls_are_remote_streams() {
        assert!(is_stream_url("rtsp://192.168.1.20:554/live"));
        assert!(is_stream_url("http://cam.local/video.mjpg"));
        assert!(!is_stream_url("/data/dashcam/2024-05-01.mp4"));
    }
}
