//! WebSocket endpoint. One actor per connection; delivery notifications
//! reach the actor through the per-user connection registry.

use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::models::new_code;
use crate::security::jwt;
use crate::services::user_service::UserService;
use crate::state::AppState;
use crate::websocket::{ConnectionRegistry, SubscriberId};

/// How often the server pings, and how long a silent peer survives.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Delivery payload pushed into the socket.
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct TextMessage(String);

struct WsSession {
    user_code: String,
    session_key: String,
    subscriber_id: SubscriberId,
    registry: ConnectionRegistry,
    db: PgPool,
    hb: Instant,
}

impl WsSession {
    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!(user = %act.user_code, "websocket heartbeat failed, disconnecting");
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
        info!(user = %self.user_code, "websocket session started");
        self.hb(ctx);

        let db = self.db.clone();
        let user_code = self.user_code.clone();
        let session_key = self.session_key.clone();
        actix_rt::spawn(async move {
            if let Err(e) = UserService::set_current_session(&db, &user_code, &session_key).await {
                warn!(user = %user_code, error = %e, "failed to record session");
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(user = %self.user_code, "websocket session stopped");

        let registry = self.registry.clone();
        let db = self.db.clone();
        let user_code = self.user_code.clone();
        let session_key = self.session_key.clone();
        let subscriber_id = self.subscriber_id;
        actix_rt::spawn(async move {
            registry.remove_subscriber(&user_code, subscriber_id).await;
            if let Err(e) =
                UserService::clear_session_if_owned(&db, &user_code, &session_key).await
            {
                warn!(user = %user_code, error = %e, "failed to clear session");
            }
        });
    }
}

impl Handler<TextMessage> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: TextMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
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
            Ok(ws::Message::Text(text)) => {
                // The socket is a one-way delivery channel; inbound text is
                // not part of the protocol.
                debug!(user = %self.user_code, len = text.len(), "ignoring inbound text frame");
            }
            Ok(ws::Message::Binary(_)) => {
                warn!(user = %self.user_code, "binary frames not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                debug!(user = %self.user_code, ?reason, "websocket close received");
                ctx.stop();
            }
            _ => {}
        }
    }
}

fn bearer_token(params: &WsParams, req: &HttpRequest) -> Option<String> {
    params.token.clone().or_else(|| {
        req.headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    })
}

/// GET /ws?token=...
/// Upgrade to a WebSocket session. Browsers cannot set headers on the
/// upgrade request, so the token usually rides as a query parameter.
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let params = query.into_inner();

    let Some(token) = bearer_token(&params, &req) else {
        return Ok(HttpResponse::Unauthorized().finish());
    };
    let claims = match jwt::verify_token(&token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => {
            warn!("websocket connection rejected: invalid token");
            return Ok(HttpResponse::Unauthorized().finish());
        }
    };
    let user_code = claims.sub;

    let (subscriber_id, mut rx) = state.registry.add_subscriber(&user_code).await;

    let session = WsSession {
        user_code,
        session_key: new_code(),
        subscriber_id,
        registry: state.registry.clone(),
        db: state.db.clone(),
        hb: Instant::now(),
    };

    let (addr, resp) = ws::start_with_addr(session, &req, stream)?;

    // Bridge the registry receiver into the actor. The sender half dies
    // with the registry entry, which ends this task.
    actix_rt::spawn(async move {
        while let Some(payload) = rx.recv().await {
            addr.do_send(TextMessage(payload));
        }
    });

    Ok(resp)
}
