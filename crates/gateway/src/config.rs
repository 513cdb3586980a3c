//! # Gateway設定・共有状態
//!
//! 設定ファイル（JSON）の読み込み・検証と、Gatewayの共有状態の定義。
//! 設定は起動時に一度だけ読み込み、以降は読み取り専用で共有する。

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use esign_types::DocumentConfiguration;
use serde::Deserialize;

use crate::creator::EnvelopeCreator;
use crate::error::GatewayError;
use crate::grant::JwtGrant;
use crate::hooks::{Hooks, SelectDocumentFromQuery};
use crate::signature::SignatureExtractor;
use crate::storage;

/// 本番APIのベースURI
pub const PRODUCTION_API_URI: &str = "https://www.docusign.net/restapi";
/// デモ環境APIのベースURI
pub const DEMO_API_URI: &str = "https://demo.docusign.net/restapi";
/// 本番認証サーバー
pub const PRODUCTION_AUTH_URI: &str = "https://account.docusign.com";
/// デモ環境認証サーバー
pub const DEMO_AUTH_URI: &str = "https://account-d.docusign.com";

/// 設定名を省略したリクエストが使うエンベロープ設定
pub const DEFAULT_ENVELOPE: &str = "default";

/// 署名の進め方。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignMode {
    /// 受信者ビューを作成し、利用者をその場で署名画面へリダイレクトする
    #[default]
    Embedded,
    /// ベンダーが署名者にメールを送り、利用者はコールバックへ戻る
    Remote,
}

/// リクエストで渡された署名ゾーンの扱い。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideMode {
    /// 設定のゾーンを捨て、リクエストのゾーンだけを使う
    #[default]
    Replace,
    /// 設定のゾーンの後ろにリクエストのゾーンを追加する
    Merge,
}

/// JWTグラント用の認証情報。
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// ベンダーが発行したRSA秘密鍵（PEM）のパス
    pub private_key: PathBuf,
    /// インテグレーションキー（JWTの `iss`）
    pub integration_key: String,
    /// 成り代わるユーザーのGUID（JWTの `sub`）
    pub user_guid: String,
}

/// S3互換ストレージの接続設定。
#[derive(Debug, Clone, Deserialize)]
pub struct S3Settings {
    pub bucket: String,
    #[serde(default = "default_s3_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub region: Option<String>,
    pub access_key: String,
    pub secret_key: String,
}

fn default_s3_endpoint() -> String {
    "http://localhost:9000".to_string()
}

/// 文書ストレージの選択。
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "adapter", rename_all = "lowercase")]
pub enum StorageSettings {
    Local { root: PathBuf },
    S3(S3Settings),
}

fn default_email_subject() -> String {
    "Please sign this document".to_string()
}

/// 1つのエンベロープ設定。
#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeSettings {
    /// デモ環境を使う（APIと認証サーバーの既定値が変わる）
    #[serde(default)]
    pub demo: bool,
    #[serde(default)]
    pub mode: SignMode,
    /// ベンダーのアカウントID
    pub account_id: String,
    /// 署名者の氏名
    pub default_signer_name: String,
    /// 署名者のメールアドレス
    pub default_signer_email: String,
    /// APIベースURI。省略時は `demo` に応じて決まる。
    #[serde(default)]
    pub api_uri: Option<String>,
    /// 認証サーバー。省略時は `demo` に応じて決まる。
    #[serde(default)]
    pub auth_uri: Option<String>,
    /// 署名後にベンダーが利用者を戻すURL
    pub callback_url: String,
    /// エンベロープの状態変化をベンダーが通知するURL（`POST /webhook` を指す）
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_email_subject")]
    pub email_subject: String,
    /// リクエストによる署名ゾーンの上書きを許可する
    #[serde(default)]
    pub signatures_overridable: bool,
    #[serde(default)]
    pub signatures_override_mode: OverrideMode,
    /// 文書名 → 署名ゾーン
    #[serde(default)]
    pub signatures: DocumentConfiguration,
    pub jwt: JwtSettings,
    pub storage: StorageSettings,
}

impl EnvelopeSettings {
    pub fn api_uri(&self) -> &str {
        match &self.api_uri {
            Some(uri) => uri.trim_end_matches('/'),
            None if self.demo => DEMO_API_URI,
            None => PRODUCTION_API_URI,
        }
    }

    pub fn auth_uri(&self) -> &str {
        match &self.auth_uri {
            Some(uri) => uri.trim_end_matches('/'),
            None if self.demo => DEMO_AUTH_URI,
            None => PRODUCTION_AUTH_URI,
        }
    }

    /// 設定値を検証する。起動時に一度だけ呼ぶ。
    pub fn validate(&self, name: &str) -> anyhow::Result<()> {
        let required = [
            ("account_id", &self.account_id),
            ("default_signer_name", &self.default_signer_name),
            ("callback_url", &self.callback_url),
            ("jwt.integration_key", &self.jwt.integration_key),
            ("jwt.user_guid", &self.jwt.user_guid),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("envelopes.{name}.{key} は空にできません");
            }
        }

        if !is_valid_email(&self.default_signer_email) {
            anyhow::bail!(
                "envelopes.{name}.default_signer_email が不正です: {}",
                self.default_signer_email
            );
        }

        if let Some(webhook_url) = &self.webhook_url {
            reqwest::Url::parse(webhook_url).map_err(|e| {
                anyhow::anyhow!("envelopes.{name}.webhook_url が不正です ({webhook_url}): {e}")
            })?;
        }

        for (document, zones) in &self.signatures {
            if let Some(zone) = zones.signatures.iter().find(|z| !z.is_valid()) {
                anyhow::bail!(
                    "envelopes.{name}.signatures.{document}: ページは1以上、座標は0以上である必要があります ({zone:?})"
                );
            }
        }

        Ok(())
    }
}

/// ローカル部とドメインを持つ最低限のメールアドレス形式か。
fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

/// 設定ファイル全体。
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// エンベロープ設定名 → 設定
    pub envelopes: BTreeMap<String, EnvelopeSettings>,
}

impl BridgeConfig {
    /// JSON文字列から読み込み、検証する。
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: BridgeConfig = serde_json::from_str(json)?;
        if config.envelopes.is_empty() {
            anyhow::bail!("envelopes に少なくとも1つの設定が必要です");
        }
        for (name, settings) in &config.envelopes {
            settings.validate(name)?;
        }
        Ok(config)
    }

    /// 設定ファイルを読み込む。
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("設定ファイルの読み込みに失敗 ({}): {e}", path.display())
        })?;
        Self::from_json(&json)
    }
}

/// 1つのエンベロープ設定に紐づく処理一式。
pub struct EnvelopeService {
    /// エンベロープ設定名
    pub name: String,
    pub settings: Arc<EnvelopeSettings>,
    pub extractor: SignatureExtractor,
    pub hooks: Arc<Hooks>,
    pub creator: EnvelopeCreator,
}

impl EnvelopeService {
    /// 設定から本番用の処理一式を組み立てる。
    pub fn from_settings(
        name: &str,
        settings: EnvelopeSettings,
        http_client: reqwest::Client,
    ) -> anyhow::Result<Self> {
        let settings = Arc::new(settings);
        let storage = storage::from_settings(&settings.storage)?;
        let grant = JwtGrant::from_settings(&settings, http_client.clone())?;

        let mut hooks = Hooks::default();
        hooks.register_pre_sign(SelectDocumentFromQuery);
        let hooks = Arc::new(hooks);

        let creator = EnvelopeCreator::standard(
            name,
            settings.clone(),
            storage,
            Arc::new(grant),
            hooks.clone(),
            http_client,
        );

        Ok(Self {
            name: name.to_string(),
            extractor: SignatureExtractor::from_settings(&settings),
            settings,
            hooks,
            creator,
        })
    }
}

/// Gatewayの共有状態。
pub struct GatewayState {
    /// エンベロープ設定名 → 処理一式
    pub envelopes: HashMap<String, EnvelopeService>,
}

impl GatewayState {
    pub fn new(services: impl IntoIterator<Item = EnvelopeService>) -> Self {
        Self {
            envelopes: services
                .into_iter()
                .map(|service| (service.name.clone(), service))
                .collect(),
        }
    }

    /// 設定名から処理一式を選ぶ。呼び出し前に一度だけ行う。
    pub fn envelope(&self, name: &str) -> Result<&EnvelopeService, GatewayError> {
        self.envelopes
            .get(name)
            .ok_or_else(|| GatewayError::UnknownEnvelope(name.to_string()))
    }
}
