//! WebSocket connection plumbing: one reader loop and one writer task per
//! client, with all protocol handling delegated to the session service.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    services::session_service,
    state::{SharedState, connections::ConnectionId},
};

/// Drive one WebSocket connection until the client goes away.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task: everything outbound funnels through the
    // unbounded channel, so broadcasts never block on a slow socket.
    let writer: JoinHandle<()> = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let connection_id = Uuid::new_v4();
    state.connections().register(connection_id, tx.clone());
    info!(connection = %connection_id, "websocket connected");

    while let Some(incoming) = stream.next().await {
        match incoming {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => dispatch_message(&state, connection_id, message).await,
                Err(err) => {
                    debug!(connection = %connection_id, error = %err, "malformed client message");
                    state.connections().send(
                        connection_id,
                        &ServerMessage::RoomError("Malformed message.".to_string()),
                    );
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(connection = %connection_id, error = %err, "websocket read error");
                break;
            }
        }
    }

    finalize(&state, connection_id, writer).await;
}

/// Route one parsed client message. Caller errors become private
/// `room:error` replies; nothing here mutates state on failure.
async fn dispatch_message(state: &SharedState, id: ConnectionId, message: ClientMessage) {
    let result = match message {
        ClientMessage::SetName { name } => session_service::set_name(state, id, name).await,
        ClientMessage::CreateRoom { game_type } => {
            session_service::create_room(state, id, game_type).await
        }
        ClientMessage::JoinRoom { room_code, name } => {
            session_service::join_room(state, id, room_code, name).await
        }
        ClientMessage::GetState => session_service::get_state(state, id).await,
        ClientMessage::StartGame {
            room_code,
            game_type,
            payload,
        } => session_service::start_game(state, id, room_code, game_type, payload).await,
        ClientMessage::GameEvent {
            room_code,
            event_name,
            payload,
        } => {
            session_service::game_event(state, id, room_code, &event_name, &payload).await;
            Ok(())
        }
    };

    if let Err(err) = result {
        debug!(connection = %id, error = %err, "rejected client request");
        state
            .connections()
            .send(id, &ServerMessage::RoomError(err.to_string()));
    }
}

async fn finalize(state: &SharedState, id: ConnectionId, writer: JoinHandle<()>) {
    session_service::disconnect(state, id).await;
    state.connections().unregister(id);
    writer.abort();
    info!(connection = %id, "websocket disconnected");
}
