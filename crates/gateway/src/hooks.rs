//! # フック
//!
//! 署名処理の途中でビルダーを観察・差し替えるための拡張点。
//!
//! - `PreSignHook`: ファイル設定の前。生のリクエストも受け取る。
//! - `PreSendEnvelopeHook`: ベンダーAPI呼び出しの直前。
//!
//! 各リストは登録順に実行し、前のフックが返したビルダーを次に渡す。

use std::collections::HashMap;

use axum::http::{HeaderMap, Method, Uri};

use crate::envelope::EnvelopeBuilder;
use crate::error::GatewayError;

/// フックに渡す受信リクエストの写し。
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
}

impl SignRequest {
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

pub trait PreSignHook: Send + Sync {
    fn name(&self) -> &str;

    fn before_sign(
        &self,
        builder: EnvelopeBuilder,
        request: &SignRequest,
    ) -> Result<EnvelopeBuilder, GatewayError>;
}

pub trait PreSendEnvelopeHook: Send + Sync {
    fn name(&self) -> &str;

    fn before_send(&self, builder: EnvelopeBuilder) -> Result<EnvelopeBuilder, GatewayError>;
}

/// 登録済みフック一覧。
#[derive(Default)]
pub struct Hooks {
    pre_sign: Vec<Box<dyn PreSignHook>>,
    pre_send: Vec<Box<dyn PreSendEnvelopeHook>>,
}

impl Hooks {
    pub fn register_pre_sign(&mut self, hook: impl PreSignHook + 'static) {
        self.pre_sign.push(Box::new(hook));
    }

    pub fn register_pre_send(&mut self, hook: impl PreSendEnvelopeHook + 'static) {
        self.pre_send.push(Box::new(hook));
    }

    pub fn run_pre_sign(
        &self,
        mut builder: EnvelopeBuilder,
        request: &SignRequest,
    ) -> Result<EnvelopeBuilder, GatewayError> {
        for hook in &self.pre_sign {
            tracing::debug!(hook = hook.name(), "before sign フックを実行");
            builder = hook.before_sign(builder, request)?;
        }
        Ok(builder)
    }

    pub fn run_pre_send(
        &self,
        mut builder: EnvelopeBuilder,
    ) -> Result<EnvelopeBuilder, GatewayError> {
        for hook in &self.pre_send {
            tracing::debug!(hook = hook.name(), "before send envelope フックを実行");
            builder = hook.before_send(builder)?;
        }
        Ok(builder)
    }
}

/// `document` クエリパラメータで署名ゾーン設定の文書を選ぶ。
///
/// アップロードされたファイル名が設定上の文書名と一致しない場合に使う。
pub struct SelectDocumentFromQuery;

impl PreSignHook for SelectDocumentFromQuery {
    fn name(&self) -> &str {
        "select_document_from_query"
    }

    fn before_sign(
        &self,
        builder: EnvelopeBuilder,
        request: &SignRequest,
    ) -> Result<EnvelopeBuilder, GatewayError> {
        match request.query_param("document").map(str::trim) {
            Some(document) if !document.is_empty() => Ok(builder.with_document_name(document)),
            _ => Ok(builder),
        }
    }
}
