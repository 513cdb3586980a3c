//! # ベンダー Envelopes API クライアント
//!
//! エンベロープ作成と受信者ビュー作成の2操作を抽象化する。
//! 本番実装は共有のreqwestクライアントを使い、呼び出しごとにベアラートークンを付ける。

use esign_types::{EnvelopeDefinition, EnvelopeSummary, RecipientViewRequest, ViewUrl};

use crate::error::GatewayError;

/// Envelopes APIの抽象インターフェース。
#[async_trait::async_trait]
pub trait EnvelopesApi: Send + Sync {
    /// エンベロープを作成する。
    async fn create_envelope(
        &self,
        account_id: &str,
        definition: &EnvelopeDefinition,
    ) -> Result<EnvelopeSummary, GatewayError>;

    /// 埋め込み署名用の受信者ビューを作成する。
    async fn create_recipient_view(
        &self,
        account_id: &str,
        envelope_id: &str,
        request: &RecipientViewRequest,
    ) -> Result<ViewUrl, GatewayError>;
}

/// REST APIを呼び出すEnvelopes API実装。
pub struct HttpEnvelopesApi {
    http_client: reqwest::Client,
    base_uri: String,
    token: String,
}

impl HttpEnvelopesApi {
    /// ベースURIとトークンに紐づくクライアントを作る。
    /// 接続プールは `http_client` のものを共有する。
    pub fn connect(http_client: reqwest::Client, base_uri: &str, token: &str) -> Self {
        Self {
            http_client,
            base_uri: base_uri.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn envelopes_url(&self, account_id: &str) -> String {
        format!("{}/v2.1/accounts/{account_id}/envelopes", self.base_uri)
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, GatewayError>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http_client
            .post(url)
            // bearer_auth はヘッダーを sensitive として扱う
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(format!("HTTP送信失敗: {e}")))?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| GatewayError::Upstream(format!("レスポンス読み取り失敗: {e}")))?;

        if !status.is_success() {
            return Err(GatewayError::Upstream(format!(
                "ベンダーAPIがエラーを返しました: HTTP {status} - {response_body}"
            )));
        }

        serde_json::from_str(&response_body)
            .map_err(|e| GatewayError::Upstream(format!("レスポンスのパースに失敗: {e}")))
    }
}

#[async_trait::async_trait]
impl EnvelopesApi for HttpEnvelopesApi {
    async fn create_envelope(
        &self,
        account_id: &str,
        definition: &EnvelopeDefinition,
    ) -> Result<EnvelopeSummary, GatewayError> {
        self.post_json(&self.envelopes_url(account_id), definition)
            .await
    }

    async fn create_recipient_view(
        &self,
        account_id: &str,
        envelope_id: &str,
        request: &RecipientViewRequest,
    ) -> Result<ViewUrl, GatewayError> {
        let url = format!(
            "{}/{envelope_id}/views/recipient",
            self.envelopes_url(account_id)
        );
        self.post_json(&url, request).await
    }
}
