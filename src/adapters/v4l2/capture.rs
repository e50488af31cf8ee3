use anyhow::{anyhow, Result};
use image::{ImageFormat, RgbImage};
use tracing::info;
use v4l::format::FourCC;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::Device;

use crate::application::ports::FrameSourcePort;
use crate::domain::camera::{CameraId, CameraMode, Frame, FrameSize};
use crate::domain::errors::{DomainError, DomainResult};

/// Fuente de frames en vivo usando V4L2 (webcam USB, cámara de salpicadero...).
pub struct V4l2Capture {
    camera: CameraId,
    stream: Option<Stream<'static>>,
    fourcc: FourCC,
    size: FrameSize,
    next_index: u64,
}

impl V4l2Capture {
    /// Abre el dispositivo de cámara y configura el formato y el flujo de memoria mapeada (MMAP).
    pub fn open(camera: &CameraId, mode: &CameraMode) -> Result<Self> {
        let dev = Device::with_path(&camera.path)?;

        // 1. Configurar Formato
        let mut fmt = dev.format()?;
        let b = mode.format.as_bytes();
        if b.len() != 4 {
            return Err(anyhow!("FourCC debe tener 4 caracteres"));
        }
        fmt.fourcc = FourCC::new(&[b[0], b[1], b[2], b[3]]);
        fmt.width = mode.size.width;
        fmt.height = mode.size.height;

        // Aplicar formato (el driver puede ajustar los valores a los más cercanos soportados)
        let actual_fmt = dev.set_format(&fmt)?;

        // 2. Configurar FPS (Frame Interval)
        let mut params = dev.params()?;
        params.interval.numerator = 1;
        params.interval.denominator = mode.fps;
        let _ = dev.set_params(&params);

        // 3. Inicializar Stream (MMAP). El stream comparte el handle del dispositivo.
        let stream = Stream::with_buffers(&dev, v4l::buffer::Type::VideoCapture, 4)?;

        info!(
            "Cámara abierta: {} {}x{} [{}] a {} FPS",
            camera.path, actual_fmt.width, actual_fmt.height, actual_fmt.fourcc, mode.fps
        );

        Ok(Self {
            camera: camera.clone(),
            stream: Some(stream),
            fourcc: actual_fmt.fourcc,
            size: FrameSize { width: actual_fmt.width, height: actual_fmt.height },
            next_index: 0,
        })
    }

    /// Captura el siguiente frame y lo decodifica a RGB.
    fn next_rgb(&mut self) -> Result<RgbImage> {
        let stream = self.stream.as_mut().ok_or_else(|| anyhow!("stream ya liberado"))?;
        let (data, _) = stream.next()?;
        let fcc_str = self.fourcc.str().map_err(|_| anyhow!("FourCC inválido"))?;

        match fcc_str {
            // MJPG es básicamente una secuencia de JPEGs
            "MJPG" => Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgb8()),
            "YUYV" => Ok(yuyv_to_rgb(data, self.size.width, self.size.height)),
            _ => Err(anyhow!("Formato de cámara {} no soportado por este pipeline", fcc_str)),
        }
    }
}

impl FrameSourcePort for V4l2Capture {
    fn next_frame(&mut self) -> DomainResult<Option<Frame>> {
        // una cámara en vivo no tiene fin de stream: cualquier fallo es una desconexión
        let rgb = self
            .next_rgb()
            .map_err(|e| DomainError::SourceUnavailable(format!("{}: {e:#}", self.camera.path)))?;
        self.next_index += 1;
        Ok(Some(Frame::new(self.next_index, rgb)))
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            info!("Cámara liberada: {}", self.camera.path);
        }
    }
}

/// Convierte un buffer YUYV (YUV 4:2:2) a una RgbImage de forma eficiente.
pub fn yuyv_to_rgb(yuyv: &[u8], w: u32, h: u32) -> RgbImage {
    let mut out = RgbImage::new(w, h);

    // Cada bloque de 4 bytes en YUYV define 2 píxeles: [Y0, U, Y1, V]
    // Píxel 1: (Y0, U, V) | Píxel 2: (Y1, U, V)
    for (i, chunk) in yuyv.chunks_exact(4).enumerate() {
        let y0 = chunk[0] as f32;
        let u  = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v  = chunk[3] as f32 - 128.0;

        let pixel_idx = i as u32 * 2;
        let x = pixel_idx % w;
        let y = pixel_idx / w;

        if y < h {
            out.put_pixel(x, y, image::Rgb(bt601(y0, u, v)));
            if x + 1 < w {
                out.put_pixel(x + 1, y, image::Rgb(bt601(y1, u, v)));
            }
        }
    }
    out
}

// Fórmulas de conversión estándar BT.601
fn bt601(y: f32, u: f32, v: f32) -> [u8; 3] {
    [
        (y + 1.402 * v).clamp(0.0, 255.0) as u8,
        (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8,
        (y + 1.772 * u).clamp(0.0, 255.0) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_grey_and_size() {
        // Y=128, U=V=128 → gris neutro
        let buf = [128u8, 128, 128, 128, 128, 128, 128, 128];
        let rgb = yuyv_to_rgb(&buf, 4, 1);
        assert_eq!(rgb.dimensions(), (4, 1));
        for p in rgb.pixels() {
            assert_eq!(p.0, [128, 128, 128]);
        }
    }

    #[test]
    fn test_yuyv_ignores_trailing_bytes() {
        let buf = [255u8, 128, 0, 128, 7, 7];
        let rgb = yuyv_to_rgb(&buf, 2, 1);
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
    }
}
