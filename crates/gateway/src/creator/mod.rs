//! # エンベロープ作成パイプライン
//!
//! 登録順に `EnvelopeStep` を実行し、ビルダーを署名URLまで進める。
//!
//! ## 標準ステップ
//! 1. `CreateDocument`: ストレージから文書を読み込む
//! 2. `DefineEnvelope`: 署名者・署名欄・エンベロープ定義を組み立てる
//! 3. `SendEnvelope`: 認証し、ベンダーにエンベロープを作成させる
//! 4. `CreateRecipientView` / `RemoteSigning`: 利用者の遷移先URLを決める

pub mod create_document;
pub mod define_envelope;
pub mod recipient_view;
pub mod send_envelope;

pub use create_document::CreateDocument;
pub use define_envelope::DefineEnvelope;
pub use recipient_view::{CreateRecipientView, RemoteSigning};
pub use send_envelope::SendEnvelope;

use std::sync::Arc;

use crate::config::{EnvelopeSettings, SignMode};
use crate::envelope::EnvelopeBuilder;
use crate::error::GatewayError;
use crate::grant::GrantProvider;
use crate::hooks::Hooks;
use crate::storage::DocumentStorage;

/// エンベロープ内の文書ID（1文書のみ扱う）
pub const DOCUMENT_ID: &str = "1";
/// 署名者の受信者ID
pub const RECIPIENT_ID: &str = "1";

/// Base64エンジン（Standard）
pub(crate) fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// ステップに渡す実行コンテキスト。
#[derive(Debug, Clone)]
pub struct StepContext {
    /// 実行中のエンベロープ設定名
    pub signature_name: String,
}

/// パイプラインの1ステップ。ビルダーを受け取り、次のビルダーを返す。
#[async_trait::async_trait]
pub trait EnvelopeStep: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        context: &StepContext,
        builder: EnvelopeBuilder,
    ) -> Result<EnvelopeBuilder, GatewayError>;
}

/// エンベロープ設定1つ分の作成パイプライン。
pub struct EnvelopeCreator {
    name: String,
    steps: Vec<Box<dyn EnvelopeStep>>,
}

impl EnvelopeCreator {
    pub fn new(name: &str, steps: Vec<Box<dyn EnvelopeStep>>) -> Self {
        Self {
            name: name.to_string(),
            steps,
        }
    }

    /// 設定の `mode` に応じた標準ステップで組み立てる。
    pub fn standard(
        name: &str,
        settings: Arc<EnvelopeSettings>,
        storage: Arc<dyn DocumentStorage>,
        grant: Arc<dyn GrantProvider>,
        hooks: Arc<Hooks>,
        http_client: reqwest::Client,
    ) -> Self {
        let mut steps: Vec<Box<dyn EnvelopeStep>> = vec![
            Box::new(CreateDocument::new(storage)),
            Box::new(DefineEnvelope::new(settings.clone())),
            Box::new(SendEnvelope::new(grant, hooks, http_client)),
        ];
        match settings.mode {
            SignMode::Embedded => steps.push(Box::new(CreateRecipientView::new(settings))),
            SignMode::Remote => steps.push(Box::new(RemoteSigning::new(settings))),
        }
        Self::new(name, steps)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// エンベロープを作成し、署名URLが設定されたビルダーを返す。
    ///
    /// ファイルと署名ゾーンが揃っていなければ、外部呼び出しの前に失敗する。
    pub async fn create_envelope(
        &self,
        builder: EnvelopeBuilder,
    ) -> Result<EnvelopeBuilder, GatewayError> {
        builder.ensure_ready()?;

        let context = StepContext {
            signature_name: self.name().to_string(),
        };
        let mut builder = builder;
        for step in &self.steps {
            tracing::debug!(creator = %self.name(), step = step.name(), "ステップを実行");
            builder = step.run(&context, builder).await?;
        }

        if builder.signing_url().is_none() {
            return Err(GatewayError::InvalidState(
                "署名URLが決まりませんでした".to_string(),
            ));
        }
        Ok(builder)
    }
}
