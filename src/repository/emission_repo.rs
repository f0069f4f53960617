// ==========================================
// 自治体排出量カルテ ETL - 排出量リポジトリ
// ==========================================
// 制約: Repository は業務ロジックを含まない
// ==========================================

use crate::domain::EmissionRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 一括 upsert のバッチサイズ（1 トランザクションあたり）
const BATCH_SIZE: usize = 1000;

// ==========================================
// EmissionRepository - 排出量リポジトリ
// ==========================================

/// 排出量リポジトリ
/// 職責: emissions テーブルの upsert / select
pub struct EmissionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EmissionRepository {
    /// 既存接続からリポジトリを作成する
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 排出量レコードを一括 upsert する（1000 件ずつのトランザクション）
    ///
    /// # 引数
    /// - records: 部門別・年度別レコード列
    ///
    /// # 戻り値
    /// - Ok(usize): 投入件数
    pub fn upsert_batch(&self, records: &[EmissionRecord]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;

        for chunk in records.chunks(BATCH_SIZE) {
            let tx = conn.transaction()?;
            for record in chunk {
                tx.execute(
                    r#"
                    INSERT INTO emissions (city_code, fiscal_year, sector, value_kt_co2)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(city_code, fiscal_year, sector) DO UPDATE SET
                        value_kt_co2 = excluded.value_kt_co2
                    "#,
                    params![
                        record.city_code,
                        record.fiscal_year,
                        record.sector,
                        record.value_kt_co2,
                    ],
                )?;
            }
            tx.commit()?;
        }

        Ok(records.len())
    }

    /// 団体コードで全レコードを取得する（年度・部門順）
    pub fn find_by_city(&self, city_code: &str) -> RepositoryResult<Vec<EmissionRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT city_code, fiscal_year, sector, value_kt_co2
            FROM emissions
            WHERE city_code = ?1
            ORDER BY fiscal_year, sector
            "#,
        )?;

        let records = stmt
            .query_map(params![city_code], |row| {
                Ok(EmissionRecord {
                    city_code: row.get(0)?,
                    fiscal_year: row.get(1)?,
                    sector: row.get(2)?,
                    value_kt_co2: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// 総レコード数を返す
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM emissions", [], |row| row.get(0))?;
        Ok(count)
    }
}
