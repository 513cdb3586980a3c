//! # Gateway エラー型
//!
//! 全エンドポイントで共通のエラー型とHTTPステータスへの対応付け。

use axum::http::StatusCode;

use crate::storage::StorageError;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 必須パラメータの欠落（クライアントエラー）
    #[error("必須パラメータがありません: {0}")]
    MissingParameter(String),
    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// 文書が見つからない（レスポンスには詳細を含めない）
    #[error("Not Found")]
    NotFound,
    /// ストレージが文書を見つけられなかった。中身はログ専用。
    #[error("文書が見つかりません: {0}")]
    DocumentNotFound(String),
    /// 未登録のエンベロープ設定名
    #[error("エンベロープ設定がありません: {0}")]
    UnknownEnvelope(String),
    /// 設定の不備（署名ゾーン未定義等）
    #[error("設定エラー: {0}")]
    Configuration(String),
    /// ビルダーが必要な状態に達していない
    #[error("ビルダーの状態が不正です: {0}")]
    InvalidState(String),
    /// ストレージ操作に失敗
    #[error("ストレージ操作に失敗: {0}")]
    Storage(String),
    /// ベンダーAPI・認証サーバーの失敗
    #[error("ベンダーAPIの呼び出しに失敗: {0}")]
    Upstream(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<StorageError> for GatewayError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(msg) => GatewayError::DocumentNotFound(msg),
            StorageError::InvalidPath(msg) => GatewayError::BadRequest(msg),
            StorageError::Backend(msg) => GatewayError::Storage(msg),
        }
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingParameter(_) | GatewayError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::NotFound
            | GatewayError::DocumentNotFound(_)
            | GatewayError::UnknownEnvelope(_) => StatusCode::NOT_FOUND,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Configuration(_)
            | GatewayError::InvalidState(_)
            | GatewayError::Storage(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = match &self {
            // ストレージの生のエラーは返さない
            GatewayError::DocumentNotFound(_) => GatewayError::NotFound.to_string(),
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}
