//! # 署名URLの決定
//!
//! - 埋め込みモード: 受信者ビューを作成し、そのURLへ利用者を送る
//! - リモートモード: ベンダーが署名者にメールを送るので、利用者はコールバックへ戻す

use std::sync::Arc;

use esign_types::RecipientViewRequest;

use super::{EnvelopeStep, StepContext};
use crate::config::EnvelopeSettings;
use crate::envelope::EnvelopeBuilder;
use crate::error::GatewayError;

fn require_envelope_id(builder: &EnvelopeBuilder) -> Result<String, GatewayError> {
    builder
        .envelope_id()
        .map(str::to_string)
        .ok_or_else(|| GatewayError::InvalidState("エンベロープIDがありません".to_string()))
}

pub struct CreateRecipientView {
    settings: Arc<EnvelopeSettings>,
}

impl CreateRecipientView {
    pub fn new(settings: Arc<EnvelopeSettings>) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl EnvelopeStep for CreateRecipientView {
    fn name(&self) -> &str {
        "create_recipient_view"
    }

    async fn run(
        &self,
        _context: &StepContext,
        builder: EnvelopeBuilder,
    ) -> Result<EnvelopeBuilder, GatewayError> {
        let envelope_id = require_envelope_id(&builder)?;
        let api = builder
            .envelopes_api()
            .cloned()
            .ok_or_else(|| GatewayError::InvalidState("APIクライアントがありません".to_string()))?;
        let client_user_id = builder.client_user_id().ok_or_else(|| {
            GatewayError::InvalidState("clientUserIdがありません".to_string())
        })?;

        let request = RecipientViewRequest {
            return_url: self.settings.callback_url.clone(),
            authentication_method: "none".to_string(),
            email: self.settings.default_signer_email.clone(),
            user_name: self.settings.default_signer_name.clone(),
            client_user_id: client_user_id.to_string(),
        };

        let view = api
            .create_recipient_view(builder.account_id(), &envelope_id, &request)
            .await?;
        Ok(builder.with_signing_url(&view.url))
    }
}

/// リモートモードでコールバックに渡すイベント名
pub const REMOTE_EVENT: &str = "sent";

pub struct RemoteSigning {
    settings: Arc<EnvelopeSettings>,
}

impl RemoteSigning {
    pub fn new(settings: Arc<EnvelopeSettings>) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl EnvelopeStep for RemoteSigning {
    fn name(&self) -> &str {
        "remote_signing"
    }

    async fn run(
        &self,
        _context: &StepContext,
        builder: EnvelopeBuilder,
    ) -> Result<EnvelopeBuilder, GatewayError> {
        let envelope_id = require_envelope_id(&builder)?;
        let mut url = reqwest::Url::parse(&self.settings.callback_url).map_err(|e| {
            GatewayError::Configuration(format!("callback_url が不正です: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("envelopeId", &envelope_id)
            .append_pair("event", REMOTE_EVENT);
        Ok(builder.with_signing_url(url.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SignMode;
    use crate::endpoints::test_helpers::test_settings;

    fn context() -> StepContext {
        StepContext {
            signature_name: "default".to_string(),
        }
    }

    #[tokio::test]
    async fn test_remote_signing_appends_envelope_id() {
        let step = RemoteSigning::new(Arc::new(test_settings("http://api", SignMode::Remote)));
        let builder = EnvelopeBuilder::new("default", "1", "http://api").with_envelope_id("E 1");

        let builder = step.run(&context(), builder).await.unwrap();
        assert_eq!(
            builder.signing_url(),
            Some("https://app.example/callback?envelopeId=E+1&event=sent")
        );
    }

    #[tokio::test]
    async fn test_recipient_view_requires_envelope() {
        let step = CreateRecipientView::new(Arc::new(test_settings("http://api", SignMode::Embedded)));
        let builder = EnvelopeBuilder::new("default", "1", "http://api");
        assert!(matches!(
            step.run(&context(), builder).await,
            Err(GatewayError::InvalidState(_))
        ));
    }
}
