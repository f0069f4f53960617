// 人口・面積 CSV を自治体マスターへ反映する
//
// Usage:
//   cargo run --bin import_population -- <population_csv> [db_path]
//
// 反映後、一人あたり排出量も自動で再計算される。

use karte_etl::config::PipelineConfig;
use karte_etl::db::{open_sqlite_connection, warn_on_schema_mismatch};
use karte_etl::importer::PopulationCsv;
use karte_etl::logging;
use karte_etl::seeder::Seeder;
use std::sync::{Arc, Mutex};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = PipelineConfig::from_env();
    let mut args = std::env::args().skip(1);
    let csv_path = args
        .next()
        .ok_or("人口 CSV のパスを指定してください（例: data/population.csv）")?;
    let db_path = args.next().map(Into::into).unwrap_or(config.db_path.clone());

    let records = PopulationCsv::load(&csv_path)?;
    tracing::info!("人口 CSV を読み込み: {} 件", records.len());

    let conn = open_sqlite_connection(&db_path)?;
    warn_on_schema_mismatch(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let seeder = Seeder::new(conn, config);
    let (updated, missing) = seeder.import_population(&records)?;

    println!("人口投入完了: 更新 {} 件 / 未登録 {} 件", updated, missing);
    Ok(())
}
