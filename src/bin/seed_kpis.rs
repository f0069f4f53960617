// パース済み排出量 JSON とレジストリ CSV からデータベースを一括投入する
//
// Usage:
//   cargo run --bin seed_kpis -- [db_path] [registry_csv] [emissions_json]
//
// upsert ベースのため再実行しても安全（人口・面積は上書きしない）。

use karte_etl::config::PipelineConfig;
use karte_etl::db::{init_schema, open_sqlite_connection, warn_on_schema_mismatch};
use karte_etl::domain::MunicipalityEmissions;
use karte_etl::importer::MunicipalityRegistry;
use karte_etl::logging;
use karte_etl::seeder::Seeder;
use std::fs;
use std::sync::{Arc, Mutex};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = PipelineConfig::from_env();
    let mut args = std::env::args().skip(1);
    let db_path = args.next().map(Into::into).unwrap_or(config.db_path.clone());
    let registry_path = args
        .next()
        .map(Into::into)
        .unwrap_or_else(|| config.registry_csv_path());
    let emissions_path = args
        .next()
        .map(Into::into)
        .unwrap_or_else(|| config.emissions_json_path());

    let registry = MunicipalityRegistry::load(&registry_path)?;
    let emissions_data: Vec<MunicipalityEmissions> =
        serde_json::from_reader(fs::File::open(&emissions_path)?)?;
    tracing::info!(
        "入力: 自治体 {} 件 / 排出量データ {} 自治体分",
        registry.len(),
        emissions_data.len()
    );

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    warn_on_schema_mismatch(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let seeder = Seeder::new(conn, config);
    let run = seeder.seed_all(&registry, &emissions_data)?;

    println!(
        "シード完了: run_id={} 自治体 {} / 排出量 {} / KPI {}",
        run.run_id, run.municipality_count, run.emission_count, run.kpi_count
    );
    Ok(())
}
