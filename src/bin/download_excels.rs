// カルテ Excel を自治体ごとにダウンロードする開発用ユーティリティ
//
// Usage:
//   cargo run --bin download_excels -- [registry_csv]
//
// 取得済みファイルはスキップされるため、中断後の再実行は安全。

use karte_etl::config::PipelineConfig;
use karte_etl::downloader::KarteDownloader;
use karte_etl::importer::MunicipalityRegistry;
use karte_etl::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = PipelineConfig::from_env();
    let registry_path = std::env::args()
        .nth(1)
        .map(Into::into)
        .unwrap_or_else(|| config.registry_csv_path());

    let registry = MunicipalityRegistry::load(&registry_path)?;
    tracing::info!("対象自治体: {} 件", registry.len());

    let city_codes: Vec<String> = registry.iter().map(|e| e.city_code.clone()).collect();
    let downloader = KarteDownloader::new(config)?;
    let summary = downloader.download_all(&city_codes).await?;

    println!(
        "ダウンロード完了: 成功 {} / スキップ {} / 失敗 {}",
        summary.succeeded, summary.skipped, summary.failed
    );
    Ok(())
}
