// ==========================================
// 自治体排出量カルテ ETL - リポジトリ層エラー型
// ==========================================
// ツール: thiserror 派生マクロ
// ==========================================

use thiserror::Error;

/// リポジトリ層のエラー型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== データベース関連 =====
    #[error("レコードが見つかりません: {entity} (id={id})")]
    NotFound { entity: String, id: String },

    #[error("データベース接続失敗: {0}")]
    DatabaseConnectionError(String),

    #[error("データベースロック取得失敗: {0}")]
    LockError(String),

    #[error("データベーストランザクション失敗: {0}")]
    DatabaseTransactionError(String),

    #[error("データベースクエリ失敗: {0}")]
    DatabaseQueryError(String),

    #[error("一意制約違反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外部キー制約違反: {0}")]
    ForeignKeyViolation(String),

    // ===== 汎用 =====
    #[error("内部エラー: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// rusqlite::Error からの変換
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 型エイリアス
pub type RepositoryResult<T> = Result<T, RepositoryError>;
