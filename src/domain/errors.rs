use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No encontrado: {0}")]
    NotFound(String),
    #[error("Geometría inválida: {0}")]
    InvalidGeometry(String),
    #[error("Configuración inválida: {0}")]
    Configuration(String),
    #[error("Fuente de vídeo no disponible: {0}")]
    SourceUnavailable(String),
    #[error("Fallo del detector: {0}")]
    DetectionFailure(String),
    #[error("Fallo del renderizador: {0}")]
    RenderFailure(String),
}

impl DomainError {
    /// Geometry problems found while loading zones are startup configuration errors.
    pub fn into_configuration(self, context: &str) -> Self {
        match self {
            DomainError::InvalidGeometry(msg) => DomainError::Configuration(format!("{context}: {msg}")),
            other => other,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
