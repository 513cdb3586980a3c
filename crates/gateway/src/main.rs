//! # e-Signature Gateway
//!
//! アプリケーションと電子署名ベンダー（DocuSign互換のeSignature REST API）の
//! 間に立つ薄い連携レイヤー。
//!
//! ## 役割
//! - 署名対象の文書をストレージから読み出し、エンベロープとして送信
//! - JWTグラントによるベンダーAPIの認証
//! - 署名画面（またはコールバック）への307リダイレクト
//!
//! ## API エンドポイント
//! - `ANY /sign`: `default` 設定で署名フローを開始
//! - `ANY /sign/{name}`: 名前付き設定で署名フローを開始
//! - `GET /callback`: 署名完了後の戻り先
//! - `POST /webhook`: エンベロープの状態変化通知

mod config;
mod creator;
mod endpoints;
mod envelope;
mod envelopes_api;
mod error;
mod grant;
mod hooks;
mod signature;
mod storage;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use config::{BridgeConfig, EnvelopeService, GatewayState};
use endpoints::{handle_callback, handle_sign, handle_sign_named, handle_webhook};

#[derive(Parser, Debug)]
#[command(author, version, about = "e-Signature gateway")]
struct Args {
    /// 設定ファイル（JSON）のパス
    #[arg(short, long, env = "ESIGN_CONFIG")]
    config: PathBuf,
    /// 待ち受けアドレス
    #[arg(short, long, env = "ESIGN_BIND", default_value = "0.0.0.0:3000")]
    bind: String,
}

/// ルーターを構築する。
pub(crate) fn router(state: Arc<GatewayState>) -> axum::Router {
    axum::Router::new()
        .route("/sign", axum::routing::any(handle_sign))
        .route("/sign/{name}", axum::routing::any(handle_sign_named))
        .route("/callback", axum::routing::get(handle_callback))
        .route("/webhook", axum::routing::post(handle_webhook))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = BridgeConfig::load(&args.config)?;

    let http_client = reqwest::Client::new();
    let mut services = Vec::with_capacity(config.envelopes.len());
    for (name, settings) in config.envelopes {
        tracing::info!(
            envelope = %name,
            mode = ?settings.mode,
            api_uri = %settings.api_uri(),
            "エンベロープ設定を読み込みました"
        );
        services.push(EnvelopeService::from_settings(
            &name,
            settings,
            http_client.clone(),
        )?);
    }
    let state = Arc::new(GatewayState::new(services));

    let app = router(state);

    tracing::info!("Gatewayを {} で起動します", args.bind);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
