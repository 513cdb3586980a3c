//! # S3互換 文書ストレージ
//!
//! AWS S3, MinIO, Cloudflare R2 等のS3互換APIから文書を読み込む。
//! `path` はそのままオブジェクトキーとして扱う。

use super::{DocumentStorage, StorageError};
use crate::config::S3Settings;

/// S3互換ストレージによる文書ストレージ実装。
pub struct S3Storage {
    bucket: s3::Bucket,
}

impl S3Storage {
    pub fn new(bucket: s3::Bucket) -> Self {
        Self { bucket }
    }

    /// エンドポイントからリージョンを決める。
    /// AWSエンドポイント（s3.REGION.amazonaws.com）以外はus-east-1。
    fn detect_region(endpoint: &str) -> String {
        endpoint
            .find("s3.")
            .and_then(|start| {
                let rest = &endpoint[start + 3..];
                rest.find(".amazonaws.com").map(|end| rest[..end].to_string())
            })
            .unwrap_or_else(|| "us-east-1".to_string())
    }

    /// 設定からバケットを初期化する。
    pub fn from_settings(settings: &S3Settings) -> anyhow::Result<Self> {
        let region = s3::Region::Custom {
            region: settings
                .region
                .clone()
                .unwrap_or_else(|| Self::detect_region(&settings.endpoint)),
            endpoint: settings.endpoint.clone(),
        };

        let credentials = s3::creds::Credentials::new(
            Some(&settings.access_key),
            Some(&settings.secret_key),
            None,
            None,
            None,
        )?;

        let bucket = s3::Bucket::new(&settings.bucket, region, credentials)?.with_path_style();

        Ok(Self::new(*bucket))
    }
}

#[async_trait::async_trait]
impl DocumentStorage for S3Storage {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let key = path.trim_start_matches('/');
        if key.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        match self.bucket.get_object(key).await {
            Ok(response) => match response.status_code() {
                200..=299 => Ok(response.bytes().to_vec()),
                404 => Err(StorageError::NotFound(key.to_string())),
                status => Err(StorageError::Backend(format!(
                    "オブジェクト取得でHTTPエラー: ステータス {status} ({key})"
                ))),
            },
            Err(s3::error::S3Error::HttpFailWithBody(404, _)) => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Backend(format!(
                "オブジェクト取得に失敗 ({key}): {e}"
            ))),
        }
    }
}
