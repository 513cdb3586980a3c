use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Redirect;
use tracing::Instrument;

use crate::config::{EnvelopeService, GatewayState, DEFAULT_ENVELOPE};
use crate::envelope::{EnvelopeBuilder, SignStage};
use crate::error::GatewayError;
use crate::hooks::SignRequest;

/// ANY /sign: `default` エンベロープ設定で署名フローへリダイレクトする。
pub async fn handle_sign(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Redirect, GatewayError> {
    let service = state.envelope(DEFAULT_ENVELOPE)?;
    redirect(service, SignRequest { method, uri, headers, query }).await
}

/// ANY /sign/{name}: 名前付きエンベロープ設定で署名フローへリダイレクトする。
pub async fn handle_sign_named(
    State(state): State<Arc<GatewayState>>,
    Path(name): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Redirect, GatewayError> {
    let service = state.envelope(&name)?;
    redirect(service, SignRequest { method, uri, headers, query }).await
}

async fn redirect(service: &EnvelopeService, request: SignRequest) -> Result<Redirect, GatewayError> {
    let user_agent = request
        .headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    let span = tracing::info_span!(
        "sign",
        request_id = %uuid::Uuid::new_v4(),
        envelope = %service.name,
        method = %request.method,
        path = %request.uri.path(),
        user_agent = %user_agent,
    );
    let builder = run_sign(service, &request).instrument(span).await?;
    let url = builder
        .signing_url()
        .ok_or_else(|| GatewayError::InvalidState("署名URLがありません".to_string()))?;
    // 307: 元のメソッドとボディを保ったままリダイレクトする
    Ok(Redirect::temporary(url))
}

/// 署名リクエストを1回分処理し、`Redirected` まで進んだビルダーを返す。
pub async fn run_sign(
    service: &EnvelopeService,
    request: &SignRequest,
) -> Result<EnvelopeBuilder, GatewayError> {
    let path = match request.query_param("path").map(str::trim) {
        Some(path) if !path.is_empty() => path.to_string(),
        _ => {
            return Err(GatewayError::MissingParameter(
                "`path` クエリパラメータを指定してください".to_string(),
            ))
        }
    };

    let builder = EnvelopeBuilder::for_settings(&service.name, &service.settings)
        .advance(SignStage::PathValidated)?;

    let builder = service
        .hooks
        .run_pre_sign(builder, request)?
        .advance(SignStage::PreSignNotified)?;

    let builder = builder.with_file(&path).advance(SignStage::FileSet)?;

    let signatures = service
        .extractor
        .signatures(&builder, request.query_param("signatures"))?;
    if signatures.is_empty() {
        return Err(GatewayError::Configuration(format!(
            "署名ゾーンが定義されていません。`signatures` 設定とクエリパラメータを確認してください (document: {})",
            builder.document_name().unwrap_or_default()
        )));
    }
    let mut builder = builder.advance(SignStage::ZonesResolved)?;

    for zone in &signatures {
        builder = builder.add_signature_zone(zone.page, zone.x_position, zone.y_position);
    }
    let builder = builder.advance(SignStage::ZonesApplied)?;

    let builder = match service.creator.create_envelope(builder).await {
        Ok(builder) => builder,
        Err(GatewayError::DocumentNotFound(message)) => {
            tracing::error!(detail = %message, "署名対象の文書が見つかりません");
            return Err(GatewayError::NotFound);
        }
        Err(e) => return Err(e),
    };

    builder
        .advance(SignStage::EnvelopeCreated)?
        .advance(SignStage::Redirected)
}
