/// WebSocket HTTP Handler
///
/// Xử lý HTTP upgrade và bridge hai chiều:
/// - Inbound:  Client → WebSocket → parse ClientFrame → Session actor
/// - Outbound: Hub/Session actor → mpsc channel → WebSocket → Client
use actix::{Actor, Addr};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_ws::Message;
use tokio::sync::mpsc;

use super::message::{ClientFrame, Outbound, ServerFrame};
use super::server::HubServer;
use super::session::{PongReceived, Services, WebSocketSession};

pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<HubServer>>,
    services: web::Data<Services>,
) -> Result<HttpResponse, Error> {
    tracing::debug!("WebSocket upgrade request từ {:?}", req.peer_addr());

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    // channel outbound: session actor → task bridge → WebSocket → client
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    let ws_actor = WebSocketSession::new(server.get_ref().clone(), tx, services);
    let addr = ws_actor.start();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                // === INBOUND: Client → Server ===
                msg = msg_stream.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let text_str = text.to_string();

                            match serde_json::from_str::<ClientFrame>(&text_str) {
                                Ok(frame) => {
                                    addr.do_send(frame);
                                }
                                Err(e) => {
                                    // type lạ / JSON hỏng: trả error frame,
                                    // không drop connection
                                    tracing::warn!(
                                        "Không thể parse client frame: {} - raw: {}",
                                        e,
                                        &text_str[..100.min(text_str.len())]
                                    );
                                    let err = ServerFrame::Error {
                                        message: "Unknown or malformed message type".to_string(),
                                    };
                                    if let Ok(json) = serde_json::to_string(&err) {
                                        if ws_session.text(json).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                            }
                        }

                        Some(Ok(Message::Ping(data))) => {
                            // trả pong cho ping mức transport từ client
                            if let Err(e) = ws_session.pong(&data).await {
                                tracing::error!("Không thể gửi pong: {}", e);
                                break;
                            }
                        }

                        Some(Ok(Message::Pong(_))) => {
                            // heartbeat response — reset liveness flag
                            addr.do_send(PongReceived);
                        }

                        Some(Ok(Message::Close(reason))) => {
                            tracing::info!("WebSocket close frame: {:?}", reason);
                            break;
                        }

                        Some(Ok(Message::Binary(_))) => {
                            tracing::warn!("Binary messages không được hỗ trợ");
                        }

                        Some(Ok(Message::Continuation(_) | Message::Nop)) => {}

                        Some(Err(e)) => {
                            tracing::error!("WebSocket protocol error: {}", e);
                            break;
                        }

                        // stream kết thúc (client disconnect)
                        None => break,
                    }
                }

                // === OUTBOUND: Server → Client ===
                Some(out) = rx.recv() => {
                    let result = match out {
                        Outbound::Frame(json) => ws_session.text(json).await,
                        Outbound::Ping => ws_session.ping(b"").await,
                    };
                    if result.is_err() {
                        tracing::error!("Không thể gửi message tới WebSocket client");
                        break;
                    }
                }
            }
        }

        let _ = ws_session.close(None).await;
        tracing::debug!("WebSocket message loop kết thúc");
    });

    tracing::info!("WebSocket connection established");
    Ok(response)
}
