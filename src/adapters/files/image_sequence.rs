use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::application::ports::FrameSourcePort;
use crate::domain::camera::Frame;
use crate::domain::errors::{DomainError, DomainResult};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Reproduce una grabación exportada como secuencia de imágenes, en orden de nombre.
pub struct ImageSequenceSource {
    pending: VecDeque<PathBuf>,
    next_index: u64,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> DomainResult<Self> {
        if !dir.is_dir() {
            return Err(DomainError::SourceUnavailable(format!("{} no es un directorio", dir.display())));
        }

        let mut frames: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| is_image(p))
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(DomainError::SourceUnavailable(format!("no hay imágenes en {}", dir.display())));
        }

        info!("Secuencia abierta: {} frames en {}", frames.len(), dir.display());
        Ok(Self { pending: frames.into(), next_index: 0 })
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSourcePort for ImageSequenceSource {
    fn next_frame(&mut self) -> DomainResult<Option<Frame>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .map_err(|e| DomainError::SourceUnavailable(format!("{}: {e}", path.display())))?;
        self.next_index += 1;
        Ok(Some(Frame::new(self.next_index, image.to_rgb8())))
    }

    fn release(&mut self) {
        if !self.pending.is_empty() {
            warn!("Secuencia cerrada con {} frames sin procesar", self.pending.len());
        }
        self.pending.clear();
    }
}
