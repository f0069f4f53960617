// 保存済みデータから KPI の派生値を再計算する
//
// Usage:
//   cargo run --bin recalc_kpis -- [db_path]
//
// 実行内容: 偏差値 → 一人あたり排出量 → 都道府県集計 KPI の順に更新。

use karte_etl::config::PipelineConfig;
use karte_etl::db::{open_sqlite_connection, warn_on_schema_mismatch};
use karte_etl::logging;
use karte_etl::seeder::Seeder;
use std::sync::{Arc, Mutex};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = PipelineConfig::from_env();
    let db_path = std::env::args()
        .nth(1)
        .map(Into::into)
        .unwrap_or(config.db_path.clone());

    let conn = open_sqlite_connection(&db_path)?;
    warn_on_schema_mismatch(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let seeder = Seeder::new(conn, config);

    let deviation_updated = seeder.recalc_deviation_scores()?;
    let (per_capita_updated, per_capita_skipped) = seeder.recalc_emission_per_capita()?;
    let pref = seeder.recalc_prefecture_kpi()?;

    println!(
        "再計算完了: 偏差値 {} 件 / 一人あたり {} 件（スキップ {}）/ 都道府県 {} ({})",
        deviation_updated,
        per_capita_updated,
        per_capita_skipped,
        pref.prefecture_name,
        pref.status
    );
    Ok(())
}
