// ==========================================
// 自治体排出量カルテ ETL - インポート層エラー型
// ==========================================
// ツール: thiserror 派生マクロ
// ==========================================

use thiserror::Error;

/// インポート層のエラー型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== ファイル関連 =====
    #[error("ファイルが存在しません: {0}")]
    FileNotFound(String),

    #[error("サポート外のファイル形式: {0}（.xlsx / .csv のみ対応）")]
    UnsupportedFormat(String),

    #[error("ファイル読み込み失敗: {0}")]
    FileReadError(String),

    #[error("Excel 解析失敗: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失敗: {0}")]
    CsvParseError(String),

    #[error("JSON 変換失敗: {0}")]
    JsonError(String),

    // ===== カルテレイアウト関連 =====
    #[error("{city_code} - シート '{sheet}' が見つかりません")]
    SheetNotFound { city_code: String, sheet: String },

    #[error("{0} - 排出量データ行が見つかりません")]
    NoEmissionRows(String),

    // ===== CSV カラム関連 =====
    #[error("必須カラムがありません: {0}")]
    MissingColumn(String),

    #[error("数値変換失敗 (行 {row}, カラム {column}): {value}")]
    NumberParseError {
        row: usize,
        column: String,
        value: String,
    },

    // ===== ダウンロード関連 =====
    #[error("ダウンロード失敗 ({city_code}): {message}")]
    DownloadError { city_code: String, message: String },

    #[error("HTTP エラー: {0}")]
    HttpError(String),

    // ===== 汎用 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// std::io::Error からの変換
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// csv::Error からの変換
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// calamine::XlsxError からの変換
impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// reqwest::Error からの変換
impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        ImportError::HttpError(err.to_string())
    }
}

// serde_json::Error からの変換
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::JsonError(err.to_string())
    }
}

/// Result 型エイリアス
pub type ImportResult<T> = Result<T, ImportError>;
