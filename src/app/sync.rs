use crate::state;
use crate::sync::SessionReceiver;
use crate::types::sync::{ClientEvent, ServerEvent};

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};

pub(crate) async fn sync_upgrade(
    State(state): State<state::AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

/// One realtime session: frames from the client steer room membership and
/// publishes; frames relayed from the session's room flow back out. A
/// malformed frame is dropped, not fatal. Disconnect leaves the room.
async fn run_session(socket: WebSocket, state: state::AppState) {
    let session = state.rooms.session();
    let (mut sink, mut stream) = socket.split();
    let mut room: Option<SessionReceiver> = None;

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(frame))) => {
                        match serde_json::from_str::<ClientEvent>(&frame) {
                            Ok(ClientEvent::JoinRoom(user_id)) => {
                                room = Some(state.rooms.join(&user_id, session));
                            }
                            Ok(ClientEvent::NotebookChange(change)) => {
                                state.rooms.publish(session, ServerEvent::NotebookSync(change));
                            }
                            Ok(ClientEvent::NoteChange(change)) => {
                                state.rooms.publish(session, ServerEvent::NotesSync(change));
                            }
                            Err(err) => {
                                eprintln!("sync: dropping malformed frame: {err}");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        eprintln!("sync: socket error: {err}");
                        break;
                    }
                }
            }
            relayed = next_relayed(&mut room) => {
                match relayed {
                    Some(event) => {
                        let frame = match serde_json::to_string(&*event) {
                            Ok(frame) => frame,
                            Err(err) => {
                                eprintln!("sync: failed to encode event: {err}");
                                continue;
                            }
                        };
                        if sink.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        room = None;
                    }
                }
            }
        }
    }

    drop(room);
    state.rooms.leave(session);
}

async fn next_relayed(
    room: &mut Option<SessionReceiver>,
) -> Option<std::sync::Arc<ServerEvent>> {
    match room {
        Some(receiver) => receiver.next().await,
        None => std::future::pending().await,
    }
}
