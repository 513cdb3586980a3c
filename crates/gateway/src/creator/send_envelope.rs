//! # エンベロープ送信
//!
//! 1. グラントプロバイダーからベアラートークンを取得
//! 2. APIベースURIに紐づく認証済みクライアントを構築し、ビルダーに設定
//! 3. before send envelope フックでビルダーを観察・差し替え
//! 4. エンベロープを作成し、返されたエンベロープIDをビルダーに設定
//!
//! 失敗は再試行せず、そのまま呼び出し元へ返す。

use std::sync::Arc;

use super::{EnvelopeStep, StepContext};
use crate::envelope::EnvelopeBuilder;
use crate::envelopes_api::HttpEnvelopesApi;
use crate::error::GatewayError;
use crate::grant::GrantProvider;
use crate::hooks::Hooks;

pub struct SendEnvelope {
    grant: Arc<dyn GrantProvider>,
    hooks: Arc<Hooks>,
    http_client: reqwest::Client,
}

impl SendEnvelope {
    pub fn new(
        grant: Arc<dyn GrantProvider>,
        hooks: Arc<Hooks>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            grant,
            hooks,
            http_client,
        }
    }
}

#[async_trait::async_trait]
impl EnvelopeStep for SendEnvelope {
    fn name(&self) -> &str {
        "send_envelope"
    }

    async fn run(
        &self,
        context: &StepContext,
        builder: EnvelopeBuilder,
    ) -> Result<EnvelopeBuilder, GatewayError> {
        // 別のエンベロープ設定向けのビルダーには触れない
        if context.signature_name != builder.name() {
            return Ok(builder);
        }

        let token = self.grant.grant().await?;
        let api = HttpEnvelopesApi::connect(self.http_client.clone(), builder.api_uri(), &token);
        let builder = builder.with_envelopes_api(Arc::new(api));

        let builder = self.hooks.run_pre_send(builder)?;

        let api = builder
            .envelopes_api()
            .cloned()
            .ok_or_else(|| GatewayError::InvalidState("APIクライアントがありません".to_string()))?;
        let definition = builder.envelope_definition().cloned().ok_or_else(|| {
            GatewayError::InvalidState("エンベロープ定義がありません".to_string())
        })?;

        let summary = api.create_envelope(builder.account_id(), &definition).await?;
        tracing::info!(
            envelope = %builder.name(),
            envelope_id = %summary.envelope_id,
            "エンベロープを作成しました"
        );

        Ok(builder.with_envelope_id(&summary.envelope_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    use esign_types::{
        EnvelopeDefinition, EnvelopeSummary, RecipientViewRequest, Recipients, ViewUrl,
    };

    use crate::endpoints::test_helpers::{start_mock_vendor, FailingGrant, StaticGrant};
    use crate::envelopes_api::EnvelopesApi;
    use crate::hooks::PreSendEnvelopeHook;

    fn context(name: &str) -> StepContext {
        StepContext {
            signature_name: name.to_string(),
        }
    }

    fn populated_builder(api_uri: &str) -> EnvelopeBuilder {
        EnvelopeBuilder::new("default", "1234567", api_uri)
            .with_file("doc.pdf")
            .add_signature_zone(1, 100, 200)
            .with_envelope_definition(EnvelopeDefinition {
                email_subject: "Please sign".to_string(),
                documents: vec![],
                recipients: Recipients::default(),
                status: "sent".to_string(),
                event_notification: None,
            })
    }

    /// トークンがベアラーヘッダーで送られ、エンベロープIDがビルダーに残る
    #[tokio::test]
    async fn test_sends_bearer_grant_and_stores_envelope_id() {
        let vendor = start_mock_vendor("envelopeId", "https://sign.example/envelopeId").await;
        let grant = StaticGrant::new("grant");
        let step = SendEnvelope::new(
            grant.clone(),
            Arc::new(Hooks::default()),
            reqwest::Client::new(),
        );

        let builder = step
            .run(&context("default"), populated_builder(&vendor.api_uri()))
            .await
            .unwrap();

        assert_eq!(builder.envelope_id(), Some("envelopeId"));
        assert!(builder.envelopes_api().is_some());
        assert_eq!(grant.calls.load(Ordering::SeqCst), 1);

        let calls = vendor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].authorization.as_deref(), Some("Bearer grant"));
        assert_eq!(calls[0].path, "/restapi/v2.1/accounts/1234567/envelopes");
    }

    /// 名前が一致しないビルダーには何もしない
    #[tokio::test]
    async fn test_other_envelope_name_is_a_no_op() {
        let vendor = start_mock_vendor("E1", "https://sign.example/E1").await;
        let grant = StaticGrant::new("grant");
        let step = SendEnvelope::new(
            grant.clone(),
            Arc::new(Hooks::default()),
            reqwest::Client::new(),
        );

        let before = populated_builder(&vendor.api_uri());
        let after = step.run(&context("other"), before.clone()).await.unwrap();

        assert_eq!(grant.calls.load(Ordering::SeqCst), 0);
        assert!(vendor.calls().is_empty());
        assert_eq!(format!("{after:?}"), format!("{before:?}"));
        assert!(after.envelopes_api().is_none());
    }

    #[tokio::test]
    async fn test_grant_failure_propagates() {
        let vendor = start_mock_vendor("E1", "https://sign.example/E1").await;
        let step = SendEnvelope::new(
            Arc::new(FailingGrant),
            Arc::new(Hooks::default()),
            reqwest::Client::new(),
        );

        let result = step
            .run(&context("default"), populated_builder(&vendor.api_uri()))
            .await;
        assert!(matches!(result, Err(GatewayError::Upstream(_))));
        assert!(vendor.calls().is_empty());
    }

    struct RecordingApi {
        accounts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl EnvelopesApi for RecordingApi {
        async fn create_envelope(
            &self,
            account_id: &str,
            _definition: &EnvelopeDefinition,
        ) -> Result<EnvelopeSummary, GatewayError> {
            self.accounts.lock().unwrap().push(account_id.to_string());
            Ok(EnvelopeSummary {
                envelope_id: "from-hook".to_string(),
                status: None,
                status_date_time: None,
                uri: None,
            })
        }

        async fn create_recipient_view(
            &self,
            _account_id: &str,
            _envelope_id: &str,
            _request: &RecipientViewRequest,
        ) -> Result<ViewUrl, GatewayError> {
            unreachable!("not used by send_envelope")
        }
    }

    struct SwapApi(Arc<RecordingApi>);

    impl PreSendEnvelopeHook for SwapApi {
        fn name(&self) -> &str {
            "swap_api"
        }

        fn before_send(&self, builder: EnvelopeBuilder) -> Result<EnvelopeBuilder, GatewayError> {
            assert!(builder.envelopes_api().is_some());
            Ok(builder.with_envelopes_api(self.0.clone()))
        }
    }

    /// before send envelope フックが差し替えたクライアントで作成される
    #[tokio::test]
    async fn test_pre_send_hook_can_replace_client() {
        let vendor = start_mock_vendor("E1", "https://sign.example/E1").await;
        let recording = Arc::new(RecordingApi {
            accounts: Mutex::new(Vec::new()),
        });
        let mut hooks = Hooks::default();
        hooks.register_pre_send(SwapApi(recording.clone()));
        let step = SendEnvelope::new(
            StaticGrant::new("grant"),
            Arc::new(hooks),
            reqwest::Client::new(),
        );

        let builder = step
            .run(&context("default"), populated_builder(&vendor.api_uri()))
            .await
            .unwrap();

        assert_eq!(builder.envelope_id(), Some("from-hook"));
        assert_eq!(*recording.accounts.lock().unwrap(), vec!["1234567"]);
        assert!(vendor.calls().is_empty());
    }
}
