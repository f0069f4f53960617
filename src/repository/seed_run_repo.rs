// ==========================================
// 自治体排出量カルテ ETL - シード実行監査リポジトリ
// ==========================================
// 職責: seed_runs テーブルへの記録（開始 / 完了）
// ==========================================

use crate::domain::SeedRun;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// 時刻の格納フォーマット
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// ==========================================
// SeedRunRepository - シード実行監査リポジトリ
// ==========================================
pub struct SeedRunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SeedRunRepository {
    /// 既存接続からリポジトリを作成する
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 実行開始を記録する
    pub fn insert_started(&self, run: &SeedRun) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO seed_runs (
                run_id, started_at, finished_at,
                municipality_count, emission_count, kpi_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                run.run_id.to_string(),
                run.started_at.format(TIMESTAMP_FORMAT).to_string(),
                run.finished_at.map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
                run.municipality_count,
                run.emission_count,
                run.kpi_count,
            ],
        )?;

        Ok(())
    }

    /// 実行完了を記録する（件数と終了時刻を更新）
    pub fn mark_finished(
        &self,
        run_id: Uuid,
        finished_at: NaiveDateTime,
        municipality_count: i32,
        emission_count: i32,
        kpi_count: i32,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let updated = conn.execute(
            r#"
            UPDATE seed_runs
            SET finished_at = ?2, municipality_count = ?3, emission_count = ?4, kpi_count = ?5
            WHERE run_id = ?1
            "#,
            params![
                run_id.to_string(),
                finished_at.format(TIMESTAMP_FORMAT).to_string(),
                municipality_count,
                emission_count,
                kpi_count,
            ],
        )?;

        Ok(updated > 0)
    }

    /// 実行 ID で 1 件取得する
    pub fn find_by_id(&self, run_id: Uuid) -> RepositoryResult<Option<SeedRun>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT run_id, started_at, finished_at,
                   municipality_count, emission_count, kpi_count
            FROM seed_runs
            WHERE run_id = ?1
            "#,
        )?;

        let run = stmt
            .query_row(params![run_id.to_string()], |row| {
                let run_id_str: String = row.get(0)?;
                let started_at_str: String = row.get(1)?;
                let finished_at_str: Option<String> = row.get(2)?;
                Ok(SeedRun {
                    run_id: Uuid::parse_str(&run_id_str).unwrap_or(Uuid::nil()),
                    started_at: NaiveDateTime::parse_from_str(&started_at_str, TIMESTAMP_FORMAT)
                        .unwrap_or_default(),
                    finished_at: finished_at_str
                        .and_then(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).ok()),
                    municipality_count: row.get(3)?,
                    emission_count: row.get(4)?,
                    kpi_count: row.get(5)?,
                })
            })
            .optional()?;

        Ok(run)
    }
}
