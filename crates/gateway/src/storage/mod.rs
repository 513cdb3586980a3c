//! # 文書ストレージ
//!
//! 署名対象文書の取得を抽象化する。
//!
//! ## ストレージ実装
//! - `LocalStorage`: ローカルディレクトリから読み込む（開発・小規模運用向け）
//! - `S3Storage`: S3互換ストレージから読み込む（feature `vendor-aws`）

pub mod local;
#[cfg(feature = "vendor-aws")]
pub mod s3;

pub use local::LocalStorage;
#[cfg(feature = "vendor-aws")]
pub use s3::S3Storage;

use std::sync::Arc;

use crate::config::StorageSettings;

/// ストレージ操作のエラー型。
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 指定パスに文書が存在しない
    #[error("文書が存在しません: {0}")]
    NotFound(String),
    /// ルート外を指すパス等
    #[error("不正なパス: {0}")]
    InvalidPath(String),
    /// バックエンドの障害
    #[error("ストレージエラー: {0}")]
    Backend(String),
}

/// 文書ストレージの抽象インターフェース。
///
/// `path` はリクエストの `path` クエリパラメータをそのまま受け取る。
/// 解決方法（ディレクトリ、バケットキー等）は実装が決める。
#[async_trait::async_trait]
pub trait DocumentStorage: Send + Sync {
    /// 文書本体を読み込む。
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
}

/// 設定からストレージ実装を構築する。
pub fn from_settings(settings: &StorageSettings) -> anyhow::Result<Arc<dyn DocumentStorage>> {
    match settings {
        StorageSettings::Local { root } => {
            tracing::info!(root = %root.display(), "ローカルストレージを使用します");
            Ok(Arc::new(LocalStorage::new(root.clone())))
        }
        #[cfg(feature = "vendor-aws")]
        StorageSettings::S3(s3_settings) => {
            tracing::info!(bucket = %s3_settings.bucket, "S3互換ストレージを使用します");
            Ok(Arc::new(S3Storage::from_settings(s3_settings)?))
        }
        #[cfg(not(feature = "vendor-aws"))]
        StorageSettings::S3(_) => Err(anyhow::anyhow!(
            "S3ストレージを使うには feature `vendor-aws` を有効にしてください"
        )),
    }
}
