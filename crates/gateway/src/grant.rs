//! # グラント（ベアラートークン）取得
//!
//! ベンダーAPIの認証に使うアクセストークンを取得する。
//! 本番実装はRS256で署名したJWTアサーションを認証サーバーでアクセストークンに交換する。

use std::time::{SystemTime, UNIX_EPOCH};

use esign_types::TokenResponse;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

use crate::config::EnvelopeSettings;
use crate::error::GatewayError;

/// JWT Bearerグラントの `grant_type`
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// 要求するスコープ
pub const JWT_SCOPE: &str = "signature impersonation";
/// アサーションの有効期間（秒）
pub const ASSERTION_TTL_SECS: u64 = 3600;

/// ベアラートークンの取得を抽象化するトレイト。
///
/// 取得したトークンは1回の外部呼び出しにだけ使い、保持しない。
#[async_trait::async_trait]
pub trait GrantProvider: Send + Sync {
    async fn grant(&self) -> Result<String, GatewayError>;
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
    scope: &'a str,
}

/// JWTアサーションをアクセストークンに交換するグラント。
pub struct JwtGrant {
    http_client: reqwest::Client,
    auth_uri: String,
    audience: String,
    integration_key: String,
    user_guid: String,
    encoding_key: EncodingKey,
}

impl JwtGrant {
    /// # 引数
    /// - `auth_uri`: 認証サーバー（例: "https://account-d.docusign.com"）
    /// - `private_key_pem`: RSA秘密鍵（PEM）
    pub fn new(
        http_client: reqwest::Client,
        auth_uri: &str,
        integration_key: &str,
        user_guid: &str,
        private_key_pem: &[u8],
    ) -> Result<Self, GatewayError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|e| GatewayError::Configuration(format!("RSA秘密鍵の読み込みに失敗: {e}")))?;
        let auth_uri = auth_uri.trim_end_matches('/').to_string();
        let audience = auth_uri
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .to_string();

        Ok(Self {
            http_client,
            auth_uri,
            audience,
            integration_key: integration_key.to_string(),
            user_guid: user_guid.to_string(),
            encoding_key,
        })
    }

    /// エンベロープ設定の `jwt` から構築する。秘密鍵ファイルはここで一度だけ読む。
    pub fn from_settings(
        settings: &EnvelopeSettings,
        http_client: reqwest::Client,
    ) -> anyhow::Result<Self> {
        let pem = std::fs::read(&settings.jwt.private_key).map_err(|e| {
            anyhow::anyhow!(
                "秘密鍵の読み込みに失敗 ({}): {e}",
                settings.jwt.private_key.display()
            )
        })?;
        Ok(Self::new(
            http_client,
            settings.auth_uri(),
            &settings.jwt.integration_key,
            &settings.jwt.user_guid,
            &pem,
        )?)
    }

    /// 指定時刻で署名したJWTアサーションを作る。
    pub(crate) fn assertion(&self, now: u64) -> Result<String, GatewayError> {
        let claims = AssertionClaims {
            iss: &self.integration_key,
            sub: &self.user_guid,
            aud: &self.audience,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
            scope: JWT_SCOPE,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| GatewayError::Internal(format!("JWTアサーションの署名に失敗: {e}")))
    }
}

#[async_trait::async_trait]
impl GrantProvider for JwtGrant {
    async fn grant(&self) -> Result<String, GatewayError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| GatewayError::Internal(format!("時刻取得失敗: {e}")))?
            .as_secs();
        let assertion = self.assertion(now)?;

        let url = format!("{}/oauth/token", self.auth_uri);
        let response = self
            .http_client
            .post(&url)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT_TYPE),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(format!("トークン交換の送信失敗: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Upstream(format!("トークン交換レスポンス読み取り失敗: {e}")))?;

        if !status.is_success() {
            return Err(GatewayError::Upstream(format!(
                "認証サーバーがエラーを返しました: HTTP {status} - {body}"
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Upstream(format!("トークンレスポンスのパースに失敗: {e}")))?;

        tracing::debug!(expires_in = ?token.expires_in, "アクセストークンを取得");
        Ok(token.access_token)
    }
}
