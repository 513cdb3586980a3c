//! # エンドポイントテスト用共通ヘルパー
//!
//! モックベンダーAPI、メモリ上のストレージ、固定トークンのグラント、
//! ERRORログの計数レイヤー。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::Json;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use crate::config::{EnvelopeService, EnvelopeSettings, GatewayState, SignMode};
use crate::creator::EnvelopeCreator;
use crate::error::GatewayError;
use crate::grant::GrantProvider;
use crate::hooks::{Hooks, SelectDocumentFromQuery};
use crate::signature::SignatureExtractor;
use crate::storage::{DocumentStorage, StorageError};

/// ルーターをエフェメラルポートで起動し、ポート番号を返す。
pub async fn spawn_server(app: axum::Router) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    port
}

/// メモリ上の文書ストレージ。
#[derive(Default)]
pub struct MemoryStorage {
    documents: HashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn with_document(path: &str, bytes: &[u8]) -> Self {
        let mut documents = HashMap::new();
        documents.insert(path.to_string(), bytes.to_vec());
        Self { documents }
    }
}

#[async_trait::async_trait]
impl DocumentStorage for MemoryStorage {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("memory://{path}")))
    }
}

/// 固定トークンを返すグラント。呼び出し回数を数える。
pub struct StaticGrant {
    token: String,
    pub calls: AtomicUsize,
}

impl StaticGrant {
    pub fn new(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: token.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl GrantProvider for StaticGrant {
    async fn grant(&self) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.clone())
    }
}

/// 常に失敗するグラント。
pub struct FailingGrant;

#[async_trait::async_trait]
impl GrantProvider for FailingGrant {
    async fn grant(&self) -> Result<String, GatewayError> {
        Err(GatewayError::Upstream("認証サーバーに接続できません".to_string()))
    }
}

/// モックベンダーが受けたリクエスト。
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

pub struct MockVendor {
    port: u16,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockVendor {
    pub fn api_uri(&self) -> String {
        format!("http://127.0.0.1:{}/restapi", self.port)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

/// エンベロープ作成と受信者ビュー作成に応答するモックベンダーAPIを起動する。
pub async fn start_mock_vendor(envelope_id: &str, signing_url: &str) -> MockVendor {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();
    let envelope_id = envelope_id.to_string();
    let signing_url = signing_url.to_string();

    let app = axum::Router::new().fallback(
        move |uri: Uri, headers: HeaderMap, body: axum::body::Bytes| {
            let recorded = recorded.clone();
            let envelope_id = envelope_id.clone();
            let signing_url = signing_url.clone();
            async move {
                let path = uri.path().to_string();
                recorded.lock().unwrap().push(RecordedCall {
                    path: path.clone(),
                    authorization: headers
                        .get(AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                    body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
                });

                if path.ends_with("/views/recipient") {
                    (StatusCode::CREATED, Json(serde_json::json!({"url": signing_url})))
                } else if path.ends_with("/envelopes") {
                    (
                        StatusCode::CREATED,
                        Json(serde_json::json!({"envelopeId": envelope_id, "status": "sent"})),
                    )
                } else {
                    (
                        StatusCode::NOT_FOUND,
                        Json(serde_json::json!({"errorCode": "RESOURCE_NOT_FOUND"})),
                    )
                }
            }
        },
    );

    let port = spawn_server(app).await;
    MockVendor { port, calls }
}

/// テスト用エンベロープ設定。署名ゾーンは `doc` に `(1, 10, 20)` が1つ。
pub fn test_settings(api_uri: &str, mode: SignMode) -> EnvelopeSettings {
    let mut settings: EnvelopeSettings =
        serde_json::from_value(crate::config::tests::sample_settings_json()).unwrap();
    settings.api_uri = Some(api_uri.to_string());
    settings.mode = mode;
    settings
}

/// フェイクを差し込んだ処理一式を組み立てる。
pub fn test_service(
    name: &str,
    settings: EnvelopeSettings,
    storage: Arc<dyn DocumentStorage>,
    grant: Arc<dyn GrantProvider>,
) -> EnvelopeService {
    let settings = Arc::new(settings);
    let mut hooks = Hooks::default();
    hooks.register_pre_sign(SelectDocumentFromQuery);
    let hooks = Arc::new(hooks);

    EnvelopeService {
        name: name.to_string(),
        extractor: SignatureExtractor::from_settings(&settings),
        creator: EnvelopeCreator::standard(
            name,
            settings.clone(),
            storage,
            grant,
            hooks.clone(),
            reqwest::Client::new(),
        ),
        hooks,
        settings,
    }
}

pub fn test_state(services: Vec<EnvelopeService>) -> Arc<GatewayState> {
    Arc::new(GatewayState::new(services))
}

/// ERRORレベルのイベント数と、そのフィールド名を記録するレイヤー。
#[derive(Clone, Default)]
pub struct ErrorCounter {
    count: Arc<AtomicUsize>,
    fields: Arc<Mutex<Vec<String>>>,
}

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// 記録したERRORイベントのフィールド名（`message` を含む）
    pub fn field_names(&self) -> Vec<String> {
        self.fields.lock().unwrap().clone()
    }
}

struct FieldNames<'a>(&'a mut Vec<String>);

impl tracing::field::Visit for FieldNames<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, _value: &dyn std::fmt::Debug) {
        self.0.push(field.name().to_string());
    }
}

impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            self.count.fetch_add(1, Ordering::SeqCst);
            let mut fields = self.fields.lock().unwrap();
            event.record(&mut FieldNames(&mut fields));
        }
    }
}

/// 現在のスレッドにERROR計数サブスクライバーを設定する。
/// ガードを保持している間だけ有効。
pub fn capture_errors() -> (ErrorCounter, tracing::subscriber::DefaultGuard) {
    let counter = ErrorCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (counter, guard)
}
