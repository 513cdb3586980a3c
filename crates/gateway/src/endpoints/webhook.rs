//! # POST /webhook
//!
//! エンベロープ作成時に `eventNotification` で登録した通知先。
//! ベンダーはJSON形式の通知を送り、2xxを受け取るまで再送する。
//! 通知は記録するだけで、エンベロープの状態は保持しない。

use axum::http::StatusCode;
use axum::Json;
use esign_types::ConnectEvent;

use crate::error::GatewayError;

/// POST /webhook: 通知を記録して受領を返す。
pub async fn handle_webhook(Json(event): Json<ConnectEvent>) -> Result<StatusCode, GatewayError> {
    if event.event.trim().is_empty() {
        return Err(GatewayError::MissingParameter(
            "通知に `event` がありません".to_string(),
        ));
    }

    tracing::info!(
        event = %event.event,
        envelope_id = ?event.data.envelope_id,
        account_id = ?event.data.account_id,
        recipient_id = ?event.data.recipient_id,
        retry_count = ?event.retry_count,
        "Webhook通知を受信しました"
    );

    Ok(StatusCode::OK)
}
