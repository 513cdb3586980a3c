//! # エンベロープ定義の組み立て
//!
//! 既定の署名者1名に、署名ゾーンと同じ順序で署名欄を並べる。
//! 埋め込み署名では受信者ビュー作成に使う `clientUserId` をここで払い出す。
//! `webhook_url` が設定されていれば、エンベロープの状態変化を通知させる。

use std::sync::Arc;

use esign_types::{
    EnvelopeDefinition, EventNotification, Recipients, SignHereTab, Signer, Tabs,
};

use super::{EnvelopeStep, StepContext, DOCUMENT_ID, RECIPIENT_ID};
use crate::config::{EnvelopeSettings, SignMode};
use crate::envelope::EnvelopeBuilder;
use crate::error::GatewayError;

/// 作成と同時に送信する
const STATUS_SENT: &str = "sent";

/// Webhookで通知を受けるエンベロープイベント
pub const WEBHOOK_ENVELOPE_EVENTS: &[&str] = &["sent", "delivered", "completed", "declined", "voided"];

pub struct DefineEnvelope {
    settings: Arc<EnvelopeSettings>,
}

impl DefineEnvelope {
    pub fn new(settings: Arc<EnvelopeSettings>) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl EnvelopeStep for DefineEnvelope {
    fn name(&self) -> &str {
        "define_envelope"
    }

    async fn run(
        &self,
        _context: &StepContext,
        builder: EnvelopeBuilder,
    ) -> Result<EnvelopeBuilder, GatewayError> {
        let document = builder
            .document()
            .cloned()
            .ok_or_else(|| GatewayError::InvalidState("文書が読み込まれていません".to_string()))?;

        let sign_here_tabs = builder
            .signature_zones()
            .iter()
            .map(|zone| SignHereTab::from_zone(zone, DOCUMENT_ID, RECIPIENT_ID))
            .collect();

        let client_user_id = match self.settings.mode {
            SignMode::Embedded => Some(uuid::Uuid::new_v4().to_string()),
            SignMode::Remote => None,
        };

        let signer = Signer {
            email: self.settings.default_signer_email.clone(),
            name: self.settings.default_signer_name.clone(),
            recipient_id: RECIPIENT_ID.to_string(),
            routing_order: "1".to_string(),
            client_user_id: client_user_id.clone(),
            tabs: Tabs { sign_here_tabs },
        };

        let definition = EnvelopeDefinition {
            email_subject: self.settings.email_subject.clone(),
            documents: vec![document],
            recipients: Recipients {
                signers: vec![signer],
            },
            status: STATUS_SENT.to_string(),
            event_notification: self
                .settings
                .webhook_url
                .as_deref()
                .map(|url| EventNotification::json(url, WEBHOOK_ENVELOPE_EVENTS)),
        };

        let builder = builder.with_envelope_definition(definition);
        Ok(match client_user_id {
            Some(id) => builder.with_client_user_id(&id),
            None => builder,
        })
    }
}
