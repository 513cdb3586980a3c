//! # 文書の読み込み
//!
//! ビルダーのファイルをストレージから読み込み、Base64文書にする。
//! ストレージの「存在しない」は `DocumentNotFound` として呼び出し元へ返す。

use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use esign_types::Document;

use super::{b64, EnvelopeStep, StepContext, DOCUMENT_ID};
use crate::envelope::EnvelopeBuilder;
use crate::error::GatewayError;
use crate::storage::DocumentStorage;

/// 拡張子が無いファイルの扱い
const DEFAULT_EXTENSION: &str = "pdf";

pub struct CreateDocument {
    storage: Arc<dyn DocumentStorage>,
}

impl CreateDocument {
    pub fn new(storage: Arc<dyn DocumentStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait::async_trait]
impl EnvelopeStep for CreateDocument {
    fn name(&self) -> &str {
        "create_document"
    }

    async fn run(
        &self,
        _context: &StepContext,
        builder: EnvelopeBuilder,
    ) -> Result<EnvelopeBuilder, GatewayError> {
        let file = builder
            .file()
            .ok_or_else(|| GatewayError::InvalidState("ファイルが設定されていません".to_string()))?;

        let bytes = self.storage.read(file).await?;

        let path = Path::new(file);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string());
        let file_extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        tracing::debug!(file = %file, size = bytes.len(), "文書を読み込みました");

        let document = Document {
            document_base64: b64().encode(&bytes),
            name,
            file_extension,
            document_id: DOCUMENT_ID.to_string(),
        };
        Ok(builder.with_document(document))
    }
}
