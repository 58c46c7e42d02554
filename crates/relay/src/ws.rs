use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use stockcart_types::{ClientCommand, Frame, ServerError, ServerEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{ClientConnection, RelayState};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<RelayState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: RelayState) {
    let (mut sink, mut stream) = socket.split();
    let conn_id = Uuid::new_v4();

    // Everything for this socket (own replies and broadcasts) goes through one queue
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state.connections.insert(
        conn_id,
        ClientConnection {
            tx,
            connected_at: Instant::now(),
        },
    );
    info!(%conn_id, "client connected");

    let forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => handle_text(&state, &conn_id, text.as_str()),
            Message::Ping(_) => {
                // Pong is handled automatically by axum
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Cleanup
    let connected_for = state
        .connections
        .remove(&conn_id)
        .map(|(_, conn)| conn.connected_at.elapsed().as_secs())
        .unwrap_or_default();
    forward_task.abort();
    info!(%conn_id, connected_secs = connected_for, "client disconnected");
}

fn handle_text(state: &RelayState, conn_id: &Uuid, text: &str) {
    let command = Frame::parse(text).and_then(|frame| ClientCommand::from_frame(&frame));
    match command {
        Ok(Some(ClientCommand::AddItem(add))) => match state.add_item(&add.chave, add.id) {
            Ok(len) => {
                debug!(%conn_id, key = %add.chave, id = add.id, cart_len = len, "item added")
            }
            Err(rejected) => {
                warn!(
                    %conn_id,
                    key = %add.chave,
                    id = add.id,
                    reason = %rejected.0,
                    "add rejected"
                );
                state.send_to(conn_id, &ServerEvent::Error(ServerError::new(rejected.0)));
            }
        },
        Ok(None) => debug!(%conn_id, "ignoring unknown event"),
        Err(e) => {
            warn!(%conn_id, "malformed command: {e}");
            state.send_to(conn_id, &ServerEvent::Error(ServerError::new("Comando inválido")));
        }
    }
}
