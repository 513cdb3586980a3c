//! # esign-bridge 共有型定義
//!
//! 署名ゾーン設定と、電子署名ベンダーREST APIのリクエスト/レスポンス型を提供する。
//!
//! ## エンコーディング規則
//! - ベンダーAPIのJSONはcamelCase、数値もすべて文字列で送る
//! - 文書本体はBase64（Standard）でエンコードする
//! - 設定ファイル側の署名ゾーンはsnake_case（`x_position`, `y_position`）

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 署名ゾーン
// ---------------------------------------------------------------------------

fn default_page() -> u32 {
    1
}

/// 文書のページ上で署名マークを置く位置。
///
/// 静的設定の `signatures` か、上書きが許可されていればリクエストの
/// `signatures` クエリパラメータから与えられる。
///
/// 座標は小数も受け付ける。ベンダーへは `f64` の `Display` 表記で送るため、
/// 整数値は `100`、小数は `100.5` のようになる。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignatureZone {
    /// ページ番号（1始まり、省略時は1）
    #[serde(default = "default_page")]
    pub page: u32,
    /// X座標（左上隅）
    pub x_position: f64,
    /// Y座標（左上隅）
    pub y_position: f64,
}

impl SignatureZone {
    pub fn new(page: u32, x_position: impl Into<f64>, y_position: impl Into<f64>) -> Self {
        Self {
            page,
            x_position: x_position.into(),
            y_position: y_position.into(),
        }
    }

    /// ページが1以上で、座標が有限かつ非負か。
    pub fn is_valid(&self) -> bool {
        self.page >= 1
            && [self.x_position, self.y_position]
                .iter()
                .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// 1文書分の署名ゾーン設定。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSignatures {
    /// 文書に適用する署名ゾーン（順序を保持する）
    #[serde(default)]
    pub signatures: Vec<SignatureZone>,
}

/// 文書名 → 署名ゾーン一覧のマッピング。起動後は読み取り専用。
pub type DocumentConfiguration = BTreeMap<String, DocumentSignatures>;

// ---------------------------------------------------------------------------
// エンベロープ定義 (POST /v2.1/accounts/{accountId}/envelopes)
// ---------------------------------------------------------------------------

/// ベンダーに送信するエンベロープ定義。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeDefinition {
    /// 署名依頼メールの件名
    pub email_subject: String,
    /// 署名対象文書
    pub documents: Vec<Document>,
    /// 受信者
    pub recipients: Recipients,
    /// "sent" で即時送信、"created" で下書き
    pub status: String,
    /// Webhook（Connect）の通知先。未設定なら通知しない。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_notification: Option<EventNotification>,
}

/// エンベロープ単位のWebhook通知設定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNotification {
    /// 通知先URL
    pub url: String,
    pub logging_enabled: String,
    /// 2xxを返すまでベンダーが再送する
    pub require_acknowledgment: String,
    pub event_data: EventData,
    pub envelope_events: Vec<EnvelopeEvent>,
}

impl EventNotification {
    /// JSON形式（REST v2.1）で `events` を通知させる設定を作る。
    pub fn json(url: &str, events: &[&str]) -> Self {
        Self {
            url: url.to_string(),
            logging_enabled: "true".to_string(),
            require_acknowledgment: "true".to_string(),
            event_data: EventData {
                version: "restv2.1".to_string(),
                format: "json".to_string(),
            },
            envelope_events: events
                .iter()
                .map(|code| EnvelopeEvent {
                    envelope_event_status_code: code.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    pub version: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeEvent {
    pub envelope_event_status_code: String,
}

/// エンベロープに含める文書。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Base64エンコードされた文書本体
    pub document_base64: String,
    /// 表示名
    pub name: String,
    /// 拡張子（"pdf" 等）
    pub file_extension: String,
    /// エンベロープ内の文書ID
    pub document_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipients {
    pub signers: Vec<Signer>,
}

/// 署名者。埋め込み署名では `client_user_id` が必須。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signer {
    pub email: String,
    pub name: String,
    pub recipient_id: String,
    pub routing_order: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_user_id: Option<String>,
    pub tabs: Tabs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tabs {
    pub sign_here_tabs: Vec<SignHereTab>,
}

/// 署名欄。`SignatureZone` をベンダー形式に変換したもの。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignHereTab {
    pub document_id: String,
    pub recipient_id: String,
    pub page_number: String,
    pub x_position: String,
    pub y_position: String,
}

impl SignHereTab {
    /// 署名ゾーンから署名欄を作る。
    pub fn from_zone(zone: &SignatureZone, document_id: &str, recipient_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            recipient_id: recipient_id.to_string(),
            page_number: zone.page.to_string(),
            x_position: zone.x_position.to_string(),
            y_position: zone.y_position.to_string(),
        }
    }
}

/// エンベロープ作成のレスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeSummary {
    pub envelope_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

// ---------------------------------------------------------------------------
// 埋め込み署名 (POST .../envelopes/{envelopeId}/views/recipient)
// ---------------------------------------------------------------------------

/// 受信者ビュー（埋め込み署名画面）の作成リクエスト。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientViewRequest {
    /// 署名完了後にベンダーが利用者を戻すURL
    pub return_url: String,
    pub authentication_method: String,
    pub email: String,
    pub user_name: String,
    pub client_user_id: String,
}

/// 受信者ビューのレスポンス。`url` が署名画面。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewUrl {
    pub url: String,
}

// ---------------------------------------------------------------------------
// Webhook 通知 (Connect, JSON形式)
// ---------------------------------------------------------------------------

/// ベンダーからのWebhook通知本体。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectEvent {
    /// 例: "envelope-completed", "recipient-completed"
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_date_time: Option<String>,
    #[serde(default)]
    pub data: ConnectEventData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectEventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
}

// ---------------------------------------------------------------------------
// OAuth トークン交換 (POST /oauth/token)
// ---------------------------------------------------------------------------

/// JWTグラント交換のレスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
