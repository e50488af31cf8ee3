use axum::extract::ws::{WebSocketUpgrade, WebSocket, Message};
use axum::extract::State;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;
use crate::adapters::http::state::HttpState;
use crate::domain::stream::WsFrameMetaMessage;

pub async fn ws_handler(ws: WebSocketUpgrade, State(st): State<HttpState>) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, st))
}

async fn handle_socket(mut socket: WebSocket, st: HttpState) {
    let mut rx = st.frames.subscribe();

    loop {
        let (meta, jpeg) = match rx.recv().await {
            Ok(payload) => payload,
            // cliente lento: se saltan frames en vez de cortar la conexión
            Err(RecvError::Lagged(skipped)) => {
                debug!("WebSocket retrasado, {} frames descartados", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let json = serde_json::to_string(&WsFrameMetaMessage { r#type: "frame".into(), meta }).unwrap_or_default();

        if socket.send(Message::Text(json)).await.is_err() { break; }
        if socket.send(Message::Binary(jpeg)).await.is_err() { break; }
    }
}
