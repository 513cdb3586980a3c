//! # 署名ゾーン抽出
//!
//! ビルダーで選ばれている文書に適用する署名ゾーンを決める。
//! 上書きが許可されている場合のみ、リクエストの `signatures` パラメータ
//! （JSON配列）を考慮する。

use std::sync::Arc;

use esign_types::{DocumentConfiguration, SignatureZone};

use crate::config::{EnvelopeSettings, OverrideMode};
use crate::envelope::EnvelopeBuilder;
use crate::error::GatewayError;

pub struct SignatureExtractor {
    documents: Arc<DocumentConfiguration>,
    overridable: bool,
    override_mode: OverrideMode,
}

impl SignatureExtractor {
    pub fn new(
        documents: DocumentConfiguration,
        overridable: bool,
        override_mode: OverrideMode,
    ) -> Self {
        Self {
            documents: Arc::new(documents),
            overridable,
            override_mode,
        }
    }

    pub fn from_settings(settings: &EnvelopeSettings) -> Self {
        Self::new(
            settings.signatures.clone(),
            settings.signatures_overridable,
            settings.signatures_override_mode,
        )
    }

    /// 署名ゾーンを返す。何も見つからなければ空。
    ///
    /// `requested` はリクエストの `signatures` パラメータ。上書き不可なら読まない。
    pub fn signatures(
        &self,
        builder: &EnvelopeBuilder,
        requested: Option<&str>,
    ) -> Result<Vec<SignatureZone>, GatewayError> {
        let configured = builder
            .document_name()
            .and_then(|name| self.documents.get(&name))
            .map(|document| document.signatures.clone())
            .unwrap_or_default();

        let requested = match requested {
            Some(raw) if self.overridable => parse_requested(raw)?,
            _ => return Ok(configured),
        };

        if requested.is_empty() {
            return Ok(configured);
        }

        Ok(match self.override_mode {
            OverrideMode::Replace => requested,
            OverrideMode::Merge => configured.into_iter().chain(requested).collect(),
        })
    }
}

fn parse_requested(raw: &str) -> Result<Vec<SignatureZone>, GatewayError> {
    let zones: Vec<SignatureZone> = serde_json::from_str(raw).map_err(|e| {
        GatewayError::BadRequest(format!("signatures パラメータのパースに失敗: {e}"))
    })?;
    if let Some(zone) = zones.iter().find(|zone| !zone.is_valid()) {
        return Err(GatewayError::BadRequest(format!(
            "ページは1以上、座標は0以上である必要があります: {zone:?}"
        )));
    }
    Ok(zones)
}
