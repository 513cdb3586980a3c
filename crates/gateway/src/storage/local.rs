//! # ローカルディレクトリ ストレージ
//!
//! ルートディレクトリ配下の文書を読み込む。
//! ルート外を指すパス（絶対パス、`..`）は拒否する。

use std::path::{Component, Path, PathBuf};

use super::{DocumentStorage, StorageError};

/// ローカルディレクトリから文書を読み込むストレージ。
///
/// ディレクトリ構成: `{root}/{path}`
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// 新しいLocalStorageを作成する。
    ///
    /// # 引数
    /// - `root`: 文書が格納されているディレクトリ
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl DocumentStorage for LocalStorage {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full_path = self.resolve(path)?;
        tokio::fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(format!("{}", full_path.display()))
            } else {
                StorageError::Backend(format!("読み込みに失敗 ({}): {e}", full_path.display()))
            }
        })
    }
}
