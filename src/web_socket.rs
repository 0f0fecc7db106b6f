// src/web_socket.rs

use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::validate_jwt;
use crate::board_server::{BoardMessage, BoardServer, Connect, Disconnect, JoinTask, LeaveTask};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Frames the client sends to start or stop watching a task.
#[derive(Deserialize)]
struct RoomCommand {
    action: String,
    #[serde(rename = "taskId")]
    task_id: String,
}

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: String,
}

pub struct WsSession {
    pub user_id: String,
    pub hb: Instant,
    pub addr: Addr<BoardServer>,
}

impl WsSession {
    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                info!("WebSocket client heartbeat failed, disconnecting {}", act.user_id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
        self.addr.do_send(Connect {
            user_id: self.user_id.clone(),
            addr: ctx.address().recipient(),
        });
    }

    fn stopped(&mut self, ctx: &mut Self::Context) {
        self.addr.do_send(Disconnect {
            user_id: self.user_id.clone(),
            addr: ctx.address().recipient(),
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<RoomCommand>(&text) {
                Ok(command) => match command.action.as_str() {
                    "join-task" => self.addr.do_send(JoinTask {
                        user_id: self.user_id.clone(),
                        task_id: command.task_id,
                    }),
                    "leave-task" => self.addr.do_send(LeaveTask {
                        user_id: self.user_id.clone(),
                        task_id: command.task_id,
                    }),
                    other => warn!("Unknown WS action from {}: {}", self.user_id, other),
                },
                Err(e) => {
                    warn!("Failed to parse WS frame from {}: {}", self.user_id, e);
                }
            },
            Ok(ws::Message::Close(_)) => {
                ctx.stop();
            }
            Err(e) => {
                warn!("WebSocket error for {}: {}", self.user_id, e);
                ctx.stop();
            }
            _ => {}
        }
    }
}

impl Handler<BoardMessage> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: BoardMessage, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.text(msg.0);
    }
}

/// GET /ws?token=<jwt>
///
/// Browsers cannot set an Authorization header on a websocket upgrade, so
/// the token rides in the query string instead.
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
    query: web::Query<WsQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let claims = match validate_jwt(&query.token, &data.config.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(json!({ "message": "Invalid token" })))
        }
    };
    let session = WsSession {
        user_id: claims.sub,
        hb: Instant::now(),
        addr: data.board_server.clone(),
    };
    ws::start(session, &req, stream)
}
