// ==========================================
// 自治体排出量カルテ ETL - カルテ Excel ダウンローダ
// ==========================================
// 環境省の配布 URL から団体コードごとの Excel を逐次取得する。
// - 取得済みファイルはスキップ（再実行しても再取得しない）
// - サーバー負荷軽減のため各リクエスト間に待機を入れる
// - 1 件の失敗で全体は止めない（件数を集計して続行）
// ==========================================

use crate::config::PipelineConfig;
use crate::importer::error::{ImportError, ImportResult};
use reqwest::Client;
use std::fs;
use std::time::Duration;
use tokio::time::sleep;

/// HTTP タイムアウト（秒）
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// 1 件のダウンロード結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// 新規取得（バイト数）
    Downloaded(usize),
    /// 取得済みのためスキップ
    Skipped,
}

/// 一括ダウンロードの集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

// ==========================================
// KarteDownloader - 逐次ダウンローダ
// ==========================================
pub struct KarteDownloader {
    client: Client,
    config: PipelineConfig,
}

impl KarteDownloader {
    /// ダウンローダを作成する
    pub fn new(config: PipelineConfig) -> ImportResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, config })
    }

    /// 1 自治体分の Excel をダウンロードする
    ///
    /// # 引数
    /// - city_code: 団体コード（5桁）
    ///
    /// # 戻り値
    /// - Ok(Downloaded(n)): n バイト取得して保存
    /// - Ok(Skipped): 保存先に既にファイルがある
    /// - Err: HTTP エラー / 書き込み失敗
    pub async fn download_one(&self, city_code: &str) -> ImportResult<DownloadOutcome> {
        let output_path = self.config.excel_path(city_code);

        if output_path.exists() {
            return Ok(DownloadOutcome::Skipped);
        }

        let url = self.config.download_url(city_code);
        let response = self.client.get(&url).send().await?;

        let response = response
            .error_for_status()
            .map_err(|e| ImportError::DownloadError {
                city_code: city_code.to_string(),
                message: e.to_string(),
            })?;

        let bytes = response.bytes().await?;
        fs::write(&output_path, &bytes)?;

        Ok(DownloadOutcome::Downloaded(bytes.len()))
    }

    /// 全自治体の Excel を逐次ダウンロードする
    ///
    /// # 引数
    /// - city_codes: 団体コード列（レジストリ CSV の記載順）
    ///
    /// # 戻り値
    /// - 成功 / スキップ / 失敗の件数集計。個別の失敗は warn ログに出して続行する
    pub async fn download_all(&self, city_codes: &[String]) -> ImportResult<DownloadSummary> {
        fs::create_dir_all(self.config.raw_dir())?;

        let mut summary = DownloadSummary::default();
        let total = city_codes.len();

        for (i, city_code) in city_codes.iter().enumerate() {
            match self.download_one(city_code).await {
                Ok(DownloadOutcome::Downloaded(bytes)) => {
                    tracing::info!("[{}/{}] {} - 取得 ({} bytes)", i + 1, total, city_code, bytes);
                    summary.succeeded += 1;
                }
                Ok(DownloadOutcome::Skipped) => {
                    tracing::info!("[{}/{}] {} - 取得済みスキップ", i + 1, total, city_code);
                    summary.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!("[{}/{}] {} - 失敗: {}", i + 1, total, city_code, e);
                    summary.failed += 1;
                }
            }

            // 最後の 1 件の後は待機しない
            if i + 1 < total {
                sleep(Duration::from_millis(self.config.download_interval_ms)).await;
            }
        }

        Ok(summary)
    }
}
