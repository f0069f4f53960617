// ==========================================
// 自治体排出量カルテ ETL - SQLite 接続初期化
// ==========================================
// 目的:
// - すべての Connection::open で PRAGMA 挙動を統一する
// - busy_timeout を統一し、再実行時の偶発的な busy エラーを減らす
// - スキーマを一箇所に埋め込み、各スクリプトが同じ形で初期化できるようにする
// ==========================================

use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

/// 既定の busy_timeout（ミリ秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 現行コードが期待する schema_version
///
/// 自動マイグレーションは行わない。旧スキーマの DB 上で黙って動かないよう、
/// 各スクリプトの起動時に警告を出すための値
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 埋め込みスキーマ
///
/// すべて upsert 前提のため、主キー / UNIQUE 制約が ON CONFLICT の対象になる
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS municipalities (
    city_code           TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    prefecture_code     TEXT NOT NULL,
    prefecture_name     TEXT NOT NULL,
    prefecture_slug     TEXT NOT NULL,
    region              TEXT NOT NULL,
    population          INTEGER,
    area_km2            REAL,
    zero_carbon_declared INTEGER NOT NULL DEFAULT 0,
    zero_carbon_year    INTEGER
);

CREATE TABLE IF NOT EXISTS emissions (
    city_code    TEXT NOT NULL,
    fiscal_year  INTEGER NOT NULL,
    sector       TEXT NOT NULL,
    value_kt_co2 REAL NOT NULL,
    PRIMARY KEY (city_code, fiscal_year, sector)
);

CREATE TABLE IF NOT EXISTS municipality_kpis (
    city_code             TEXT PRIMARY KEY,
    base_year             INTEGER NOT NULL,
    latest_year           INTEGER NOT NULL,
    base_emission_kt      REAL NOT NULL,
    latest_emission_kt    REAL NOT NULL,
    reduction_rate        REAL NOT NULL,
    actual_pace           REAL NOT NULL,
    required_pace         REAL NOT NULL,
    pace_achievement_rate REAL NOT NULL,
    status                TEXT NOT NULL,
    shortfall_2030_kt     REAL NOT NULL,
    emission_per_capita   REAL,
    deviation_score       REAL,
    pref_rank             INTEGER
);

CREATE TABLE IF NOT EXISTS prefecture_kpis (
    prefecture_code       TEXT PRIMARY KEY,
    prefecture_name       TEXT NOT NULL,
    prefecture_slug       TEXT NOT NULL,
    latest_year           INTEGER NOT NULL,
    base_emission_mt      REAL NOT NULL,
    latest_emission_mt    REAL NOT NULL,
    reduction_rate        REAL NOT NULL,
    actual_pace           REAL NOT NULL,
    required_pace         REAL NOT NULL,
    pace_achievement_rate REAL NOT NULL,
    status                TEXT NOT NULL,
    shortfall_2030_mt     REAL NOT NULL,
    municipality_count    INTEGER NOT NULL,
    on_track_count        INTEGER NOT NULL,
    at_risk_count         INTEGER NOT NULL,
    off_track_count       INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS seed_runs (
    run_id             TEXT PRIMARY KEY,
    started_at         TEXT NOT NULL,
    finished_at        TEXT,
    municipality_count INTEGER NOT NULL DEFAULT 0,
    emission_count     INTEGER NOT NULL DEFAULT 0,
    kpi_count          INTEGER NOT NULL DEFAULT 0
);
"#;

/// SQLite 接続に統一 PRAGMA を適用する
///
/// foreign_keys / busy_timeout は接続ごとに設定が必要
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// SQLite 接続を開き、統一設定を適用する
pub fn open_sqlite_connection<P: AsRef<Path>>(db_path: P) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// スキーマを初期化する（冪等）
///
/// schema_version が未記録の場合のみ現行バージョンを記録する
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    if read_schema_version(conn)?.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
    }
    Ok(())
}

/// schema_version を読み取る（テーブル未作成なら None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// スキーマバージョンを検査し、期待と異なる場合は警告ログを出す
pub fn warn_on_schema_mismatch(conn: &Connection) -> rusqlite::Result<()> {
    match read_schema_version(conn)? {
        Some(v) if v != CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                "schema_version が一致しません: expected={}, actual={}",
                CURRENT_SCHEMA_VERSION,
                v
            );
        }
        None => {
            tracing::warn!("schema_version が未記録です（init_schema 未実行の可能性）");
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));

        // バージョン行が重複していないこと
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_read_schema_version_without_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
