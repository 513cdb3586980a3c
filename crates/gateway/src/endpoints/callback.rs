//! # GET /callback
//!
//! 署名画面から戻ってきた利用者を受ける。イベントを記録して返すだけで、
//! エンベロープの状態は変更しない。

use axum::extract::Query;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub event: Option<String>,
    #[serde(rename = "envelopeId")]
    pub envelope_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CallbackResponse {
    pub event: String,
    pub envelope_id: Option<String>,
}

/// GET /callback: 署名後の戻り先。
///
/// `event` はベンダーが付与する（`signing_complete`, `cancel`, `decline` 等）。
pub async fn handle_callback(
    Query(query): Query<CallbackQuery>,
) -> Result<Json<CallbackResponse>, GatewayError> {
    let event = query
        .event
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| {
            GatewayError::MissingParameter("`event` クエリパラメータが必要です".to_string())
        })?;

    tracing::info!(
        event = %event,
        envelope_id = ?query.envelope_id,
        "署名画面から戻りました"
    );

    Ok(Json(CallbackResponse {
        event,
        envelope_id: query.envelope_id,
    }))
}
