//! WebSocket 处理器
//!
//! 凭据以连接参数（`?token=`）而非请求头传入，在升级前完成校验：
//! 校验失败直接拒绝升级，不会创建任何会话、不产生任何事件。
//! 升级成功后，连接的整个生命周期由一个接收任务和一个发送任务驱动，
//! 任一方向结束都会触发完整、幂等的断开清理。

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use application::Identity;
use domain::ClientEvent;

use crate::{error::ApiError, state::AppState};

/// WebSocket连接查询参数
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: String,
}

pub async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let verify_timeout = Duration::from_secs(state.realtime.op_timeout_secs);
    let identity = match tokio::time::timeout(verify_timeout, state.verifier.verify(&query.token))
        .await
    {
        Ok(Ok(identity)) => identity,
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "WebSocket upgrade rejected: invalid token");
            return Err(ApiError::from(err));
        }
        Err(_) => {
            tracing::warn!("WebSocket upgrade rejected: credential verification timed out");
            return Err(ApiError::unauthorized("credential verification timed out"));
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, identity)))
}

async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    let (mailbox_tx, mut mailbox_rx) = mpsc::channel(state.realtime.mailbox_capacity);
    let session_id = state.coordinator.connect(identity, mailbox_tx).await;

    let (mut sender, mut receiver) = socket.split();

    // 发送任务：把信箱里的事件序列化后写入socket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = mailbox_rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to serialize websocket payload");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // 接收任务：解析客户端事件并路由给协调器
    let coordinator = state.coordinator.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                WsMessage::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(ClientEvent::Message { text }) => {
                        coordinator.post_message(session_id, text).await;
                    }
                    Ok(ClientEvent::GetHistory { limit }) => {
                        coordinator.request_history(session_id, limit).await;
                    }
                    Ok(ClientEvent::Typing { typing }) => {
                        coordinator.set_typing(session_id, typing).await;
                    }
                    Err(err) => {
                        tracing::debug!(session_id = %session_id, error = %err, "无法解析的客户端事件");
                    }
                },
                WsMessage::Close(_) => break,
                // Ping/Pong 由 axum 自动应答
                _ => {}
            }
        }
    });

    // 任一方向结束即视为断开
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    // 断开清理不可跳过，且对同一会话幂等
    state.coordinator.disconnect(session_id).await;
    tracing::info!(session_id = %session_id, "WebSocket连接已断开，会话已清理");
}
