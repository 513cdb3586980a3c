//! # エンベロープビルダー
//!
//! 1リクエスト分のエンベロープ作成状態。各ステップは現在のビルダーを受け取り、
//! 更新後のビルダーを返す。共有も永続化もせず、リダイレクト応答の後に破棄する。
//!
//! ## 署名リクエストの状態遷移
//! `Idle → PathValidated → PreSignNotified → FileSet → ZonesResolved →
//! ZonesApplied → EnvelopeCreated → Redirected`
//!
//! 遷移は一方向のみ。途中の失敗はエラーとしてその場で終端する。

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use esign_types::{Document, EnvelopeDefinition, SignatureZone};

use crate::config::EnvelopeSettings;
use crate::envelopes_api::EnvelopesApi;
use crate::error::GatewayError;

/// 署名リクエストの処理段階。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignStage {
    Idle,
    PathValidated,
    PreSignNotified,
    FileSet,
    ZonesResolved,
    ZonesApplied,
    EnvelopeCreated,
    Redirected,
}

impl SignStage {
    /// 次に許される段階。`Redirected` が終端。
    pub fn next(self) -> Option<SignStage> {
        match self {
            SignStage::Idle => Some(SignStage::PathValidated),
            SignStage::PathValidated => Some(SignStage::PreSignNotified),
            SignStage::PreSignNotified => Some(SignStage::FileSet),
            SignStage::FileSet => Some(SignStage::ZonesResolved),
            SignStage::ZonesResolved => Some(SignStage::ZonesApplied),
            SignStage::ZonesApplied => Some(SignStage::EnvelopeCreated),
            SignStage::EnvelopeCreated => Some(SignStage::Redirected),
            SignStage::Redirected => None,
        }
    }
}

/// エンベロープ作成に必要な状態の蓄積。
#[derive(Clone)]
pub struct EnvelopeBuilder {
    name: String,
    stage: SignStage,
    account_id: String,
    api_uri: String,
    file: Option<String>,
    document_name: Option<String>,
    signature_zones: Vec<SignatureZone>,
    document: Option<Document>,
    client_user_id: Option<String>,
    envelope_definition: Option<EnvelopeDefinition>,
    envelopes_api: Option<Arc<dyn EnvelopesApi>>,
    envelope_id: Option<String>,
    signing_url: Option<String>,
}

impl EnvelopeBuilder {
    pub fn new(name: &str, account_id: &str, api_uri: &str) -> Self {
        Self {
            name: name.to_string(),
            stage: SignStage::Idle,
            account_id: account_id.to_string(),
            api_uri: api_uri.to_string(),
            file: None,
            document_name: None,
            signature_zones: Vec::new(),
            document: None,
            client_user_id: None,
            envelope_definition: None,
            envelopes_api: None,
            envelope_id: None,
            signing_url: None,
        }
    }

    /// エンベロープ設定から空のビルダーを作る。
    pub fn for_settings(name: &str, settings: &EnvelopeSettings) -> Self {
        Self::new(name, &settings.account_id, settings.api_uri())
    }

    /// 次の段階へ進める。飛ばし・逆戻りは `InvalidState`。
    pub fn advance(mut self, stage: SignStage) -> Result<Self, GatewayError> {
        if self.stage.next() != Some(stage) {
            return Err(GatewayError::InvalidState(format!(
                "{:?} から {stage:?} へは遷移できません",
                self.stage
            )));
        }
        tracing::debug!(envelope = %self.name, from = ?self.stage, to = ?stage, "状態遷移");
        self.stage = stage;
        Ok(self)
    }

    pub fn with_file(mut self, path: &str) -> Self {
        self.file = Some(path.to_string());
        self
    }

    pub fn with_document_name(mut self, document_name: &str) -> Self {
        self.document_name = Some(document_name.to_string());
        self
    }

    pub fn add_signature_zone(
        mut self,
        page: u32,
        x_position: impl Into<f64>,
        y_position: impl Into<f64>,
    ) -> Self {
        self.signature_zones
            .push(SignatureZone::new(page, x_position, y_position));
        self
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_client_user_id(mut self, client_user_id: &str) -> Self {
        self.client_user_id = Some(client_user_id.to_string());
        self
    }

    pub fn with_envelope_definition(mut self, definition: EnvelopeDefinition) -> Self {
        self.envelope_definition = Some(definition);
        self
    }

    pub fn with_envelopes_api(mut self, api: Arc<dyn EnvelopesApi>) -> Self {
        self.envelopes_api = Some(api);
        self
    }

    pub fn with_envelope_id(mut self, envelope_id: &str) -> Self {
        self.envelope_id = Some(envelope_id.to_string());
        self
    }

    pub fn with_signing_url(mut self, url: &str) -> Self {
        self.signing_url = Some(url.to_string());
        self
    }

    /// エンベロープ設定名
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> SignStage {
        self.stage
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn api_uri(&self) -> &str {
        &self.api_uri
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// 署名ゾーン設定を引く文書名。
    /// 明示的に選ばれていなければファイル名の拡張子を除いた部分。
    pub fn document_name(&self) -> Option<String> {
        if let Some(name) = &self.document_name {
            return Some(name.clone());
        }
        self.file
            .as_deref()
            .and_then(|file| Path::new(file).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
    }

    pub fn signature_zones(&self) -> &[SignatureZone] {
        &self.signature_zones
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn client_user_id(&self) -> Option<&str> {
        self.client_user_id.as_deref()
    }

    pub fn envelope_definition(&self) -> Option<&EnvelopeDefinition> {
        self.envelope_definition.as_ref()
    }

    pub fn envelopes_api(&self) -> Option<&Arc<dyn EnvelopesApi>> {
        self.envelopes_api.as_ref()
    }

    pub fn envelope_id(&self) -> Option<&str> {
        self.envelope_id.as_deref()
    }

    pub fn signing_url(&self) -> Option<&str> {
        self.signing_url.as_deref()
    }

    /// エンベロープ作成を始められる状態か（ファイル設定済み、署名ゾーン1つ以上）。
    pub fn ensure_ready(&self) -> Result<(), GatewayError> {
        if self.file.is_none() {
            return Err(GatewayError::InvalidState(
                "ファイルが設定されていません".to_string(),
            ));
        }
        if self.signature_zones.is_empty() {
            return Err(GatewayError::InvalidState(
                "署名ゾーンが1つもありません".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for EnvelopeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeBuilder")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .field("account_id", &self.account_id)
            .field("api_uri", &self.api_uri)
            .field("file", &self.file)
            .field("document_name", &self.document_name)
            .field("signature_zones", &self.signature_zones)
            .field("envelopes_api", &self.envelopes_api.is_some())
            .field("envelope_id", &self.envelope_id)
            .field("signing_url", &self.signing_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::new("default", "1234567", "https://demo.docusign.net/restapi")
    }

    #[test]
    fn test_stages_advance_in_order() {
        let mut b = builder();
        let order = [
            SignStage::PathValidated,
            SignStage::PreSignNotified,
            SignStage::FileSet,
            SignStage::ZonesResolved,
            SignStage::ZonesApplied,
            SignStage::EnvelopeCreated,
            SignStage::Redirected,
        ];
        for stage in order {
            b = b.advance(stage).unwrap();
            assert_eq!(b.stage(), stage);
        }
        assert!(SignStage::Redirected.next().is_none());
    }

    #[test]
    fn test_stage_cannot_skip_or_loop() {
        let b = builder().advance(SignStage::PathValidated).unwrap();
        assert!(matches!(
            b.clone().advance(SignStage::FileSet),
            Err(GatewayError::InvalidState(_))
        ));
        assert!(matches!(
            b.advance(SignStage::PathValidated),
            Err(GatewayError::InvalidState(_))
        ));
    }

    #[test]
    fn test_zones_keep_insertion_order() {
        let b = builder()
            .add_signature_zone(2, 30, 40)
            .add_signature_zone(1, 10, 20);
        assert_eq!(
            b.signature_zones(),
            &[SignatureZone::new(2, 30, 40), SignatureZone::new(1, 10, 20)]
        );
    }

    #[test]
    fn test_document_name_defaults_to_file_stem() {
        let b = builder().with_file("contracts/lease.pdf");
        assert_eq!(b.document_name().as_deref(), Some("lease"));

        let b = b.with_document_name("rental");
        assert_eq!(b.document_name().as_deref(), Some("rental"));

        assert!(builder().document_name().is_none());
    }

    #[test]
    fn test_ensure_ready_requires_file_and_zone() {
        assert!(builder().ensure_ready().is_err());
        assert!(builder().with_file("doc.pdf").ensure_ready().is_err());
        assert!(builder().add_signature_zone(1, 1, 1).ensure_ready().is_err());
        assert!(builder()
            .with_file("doc.pdf")
            .add_signature_zone(1, 100, 200)
            .ensure_ready()
            .is_ok());
    }

    /// 更新は新しい値を返し、元の値は変わらない
    #[test]
    fn test_updates_do_not_touch_previous_value() {
        let before = builder().with_file("doc.pdf");
        let after = before.clone().with_envelope_id("E1");
        assert!(before.envelope_id().is_none());
        assert_eq!(after.envelope_id(), Some("E1"));
    }
}
