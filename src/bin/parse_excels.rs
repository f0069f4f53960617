// ダウンロード済みカルテ Excel を一括パースして JSON に書き出す
//
// Usage:
//   cargo run --bin parse_excels -- [registry_csv] [output_json]
//
// 未ダウンロードやパース失敗の自治体は警告を出してスキップする。

use karte_etl::config::PipelineConfig;
use karte_etl::domain::MunicipalityEmissions;
use karte_etl::importer::{KarteExcelParser, MunicipalityRegistry};
use karte_etl::logging;
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = PipelineConfig::from_env();
    let mut args = std::env::args().skip(1);
    let registry_path = args
        .next()
        .map(Into::into)
        .unwrap_or_else(|| config.registry_csv_path());
    let output_path = args
        .next()
        .map(Into::into)
        .unwrap_or_else(|| config.emissions_json_path());

    let registry = MunicipalityRegistry::load(&registry_path)?;
    tracing::info!("対象自治体: {} 件", registry.len());

    let mut parsed: Vec<MunicipalityEmissions> = Vec::new();
    let mut failed = 0;
    for entry in &registry {
        let excel_path = config.excel_path(&entry.city_code);
        match KarteExcelParser::parse(&excel_path, &entry.city_code, &entry.name) {
            Ok(data) => parsed.push(data),
            Err(e) => {
                tracing::warn!("{} {} - パース失敗: {}", entry.city_code, entry.name, e);
                failed += 1;
            }
        }
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(&output_path)?;
    serde_json::to_writer_pretty(file, &parsed)?;

    println!(
        "パース完了: 成功 {} / 失敗 {} → {}",
        parsed.len(),
        failed,
        output_path.display()
    );
    Ok(())
}
