use std::sync::Arc;

use crate::adapters::http::renderer::FrameSender;
use crate::application::cancel::CancelToken;
use crate::config::SystemConfig;

/// Estado compartido para los manejadores HTTP de Axum.
#[derive(Clone)]
pub struct HttpState {
    /// Configuración activa (inmutable durante toda la ejecución).
    pub config: Arc<SystemConfig>,
    /// Canal donde el pipeline publica los frames renderizados.
    pub frames: FrameSender,
    /// Permite detener el pipeline desde el navegador.
    pub cancel: CancelToken,
}
