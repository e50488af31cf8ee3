use std::path::Path;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }

    /// Comprobación previa al arranque: el fichero debe existir y parecer un modelo ONNX.
    pub fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::Configuration("onnx_path vacío".into()));
        }
        let path = Path::new(&model.onnx_path);
        if !path.exists() {
            return Err(DomainError::NotFound(format!("modelo no encontrado: {}", model.onnx_path)));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("onnx") {
            return Err(DomainError::Configuration(format!("{} no es un fichero .onnx", model.onnx_path)));
        }
        Ok(())
    }
}
