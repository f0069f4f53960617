// ==========================================
// 自治体排出量カルテ ETL - パイプライン設定
// ==========================================
// 職責: 年度・目標値・入出力パスの一元管理
// 方針: 既定値 + 環境変数オーバーライド（DB は持たない）
// ==========================================

use crate::kpi::{DEFAULT_BASE_YEAR, DEFAULT_TARGET_REDUCTION_RATE, DEFAULT_TARGET_YEAR};
use std::env;
use std::path::{Path, PathBuf};

/// カルテ Excel の配布 URL パターン（{city_code} を団体コードで置換）
pub const DEFAULT_DOWNLOAD_URL_TEMPLATE: &str =
    "https://policies.env.go.jp/policy/roadmap/local_keikaku/kuiki/files/tool/karte/xlsx/{city_code}.xlsx";

/// ダウンロード間隔（ミリ秒）サーバー負荷軽減のため
pub const DEFAULT_DOWNLOAD_INTERVAL_MS: u64 = 500;

/// データが存在する最新年度の既定値
pub const DEFAULT_LATEST_YEAR: i32 = 2022;

// ==========================================
// PipelineConfig - パイプライン設定
// ==========================================

/// パイプライン全体の設定
///
/// # 環境変数
/// - KARTE_DATA_DIR: データディレクトリ（既定: ./data）
/// - KARTE_DB_PATH: SQLite ファイルパス（既定: システムデータディレクトリ配下）
/// - KARTE_DOWNLOAD_URL: ダウンロード URL テンプレート
/// - KARTE_DOWNLOAD_INTERVAL_MS: ダウンロード間隔
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 基準年
    pub base_year: i32,
    /// 最新年
    pub latest_year: i32,
    /// 目標年
    pub target_year: i32,
    /// 目標削減率 [0,1]
    pub target_reduction_rate: f64,
    /// 都道府県コード
    pub prefecture_code: String,
    /// 都道府県名
    pub prefecture_name: String,
    /// 都道府県スラッグ
    pub prefecture_slug: String,
    /// データディレクトリ（raw / processed / レジストリ CSV の親）
    pub data_dir: PathBuf,
    /// SQLite ファイルパス
    pub db_path: PathBuf,
    /// ダウンロード URL テンプレート
    pub download_url_template: String,
    /// ダウンロード間隔（ミリ秒）
    pub download_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_year: DEFAULT_BASE_YEAR,
            latest_year: DEFAULT_LATEST_YEAR,
            target_year: DEFAULT_TARGET_YEAR,
            target_reduction_rate: DEFAULT_TARGET_REDUCTION_RATE,
            prefecture_code: "13".to_string(),
            prefecture_name: "東京都".to_string(),
            prefecture_slug: "tokyo".to_string(),
            data_dir: PathBuf::from("data"),
            db_path: default_db_path(),
            download_url_template: DEFAULT_DOWNLOAD_URL_TEMPLATE.to_string(),
            download_interval_ms: DEFAULT_DOWNLOAD_INTERVAL_MS,
        }
    }
}

impl PipelineConfig {
    /// 既定値に環境変数オーバーライドを適用した設定を返す
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = env::var("KARTE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(path) = env::var("KARTE_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Ok(url) = env::var("KARTE_DOWNLOAD_URL") {
            config.download_url_template = url;
        }
        if let Ok(interval) = env::var("KARTE_DOWNLOAD_INTERVAL_MS") {
            if let Ok(ms) = interval.parse::<u64>() {
                config.download_interval_ms = ms;
            }
        }

        config
    }

    /// ダウンロードした Excel の保存先ディレクトリ
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    /// パース結果 JSON の保存先ディレクトリ
    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    /// パース結果 JSON のファイルパス
    pub fn emissions_json_path(&self) -> PathBuf {
        self.processed_dir().join("emissions.json")
    }

    /// 自治体レジストリ CSV のファイルパス
    pub fn registry_csv_path(&self) -> PathBuf {
        self.data_dir.join("municipalities.csv")
    }

    /// 団体コードからダウンロード URL を組み立てる
    pub fn download_url(&self, city_code: &str) -> String {
        self.download_url_template.replace("{city_code}", city_code)
    }

    /// 団体コードから保存先 Excel ファイルパスを組み立てる
    pub fn excel_path(&self, city_code: &str) -> PathBuf {
        self.raw_dir().join(format!("{}.xlsx", city_code))
    }

    /// 都道府県情報を (コード, 名称, スラッグ) のタプルで返す
    pub fn prefecture(&self) -> (&str, &str, &str) {
        (
            &self.prefecture_code,
            &self.prefecture_name,
            &self.prefecture_slug,
        )
    }
}

/// 既定の SQLite ファイルパスを返す
///
/// システムのローカルデータディレクトリ配下、取得不能時はカレント配下
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("karte-etl").join("karte.db"))
        .unwrap_or_else(|| Path::new("data").join("karte.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_years_match_national_benchmark() {
        let config = PipelineConfig::default();
        assert_eq!(config.base_year, 2013);
        assert_eq!(config.target_year, 2030);
        assert_eq!(config.target_reduction_rate, 0.46);
    }

    #[test]
    fn test_download_url_substitutes_city_code() {
        let config = PipelineConfig::default();
        let url = config.download_url("13101");
        assert!(url.ends_with("/13101.xlsx"));
        assert!(!url.contains("{city_code}"));
    }

    #[test]
    fn test_paths_are_rooted_at_data_dir() {
        let mut config = PipelineConfig::default();
        config.data_dir = PathBuf::from("/tmp/karte");
        assert_eq!(config.excel_path("13101"), PathBuf::from("/tmp/karte/raw/13101.xlsx"));
        assert_eq!(
            config.emissions_json_path(),
            PathBuf::from("/tmp/karte/processed/emissions.json")
        );
    }
}
