// ==========================================
// 自治体排出量カルテ ETL - 自治体マスターリポジトリ
// ==========================================
// 制約: Repository は業務ロジックを含まない
// 制約: すべてのクエリはパラメータ化して SQL インジェクションを防ぐ
// ==========================================

use crate::domain::Municipality;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// MunicipalityRepository - 自治体マスターリポジトリ
// ==========================================

/// 自治体マスターリポジトリ
/// 職責: municipalities テーブルの upsert / select
pub struct MunicipalityRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MunicipalityRepository {
    /// 既存接続からリポジトリを作成する
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// データベース接続を取得する
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 自治体マスターを一括 upsert する
    ///
    /// # 引数
    /// - municipalities: 投入する自治体マスター列
    ///
    /// # 戻り値
    /// - Ok(usize): 投入件数
    pub fn upsert_batch(&self, municipalities: &[Municipality]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for muni in municipalities {
            tx.execute(
                r#"
                INSERT INTO municipalities (
                    city_code, name, prefecture_code, prefecture_name, prefecture_slug,
                    region, population, area_km2, zero_carbon_declared, zero_carbon_year
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(city_code) DO UPDATE SET
                    name = excluded.name,
                    prefecture_code = excluded.prefecture_code,
                    prefecture_name = excluded.prefecture_name,
                    prefecture_slug = excluded.prefecture_slug,
                    region = excluded.region,
                    zero_carbon_declared = excluded.zero_carbon_declared,
                    zero_carbon_year = excluded.zero_carbon_year
                "#,
                params![
                    muni.city_code,
                    muni.name,
                    muni.prefecture_code,
                    muni.prefecture_name,
                    muni.prefecture_slug,
                    muni.region,
                    muni.population,
                    muni.area_km2,
                    muni.zero_carbon_declared as i32,
                    muni.zero_carbon_year,
                ],
            )?;
        }

        tx.commit()?;
        Ok(municipalities.len())
    }

    /// 団体コードで 1 件取得する
    pub fn find_by_code(&self, city_code: &str) -> RepositoryResult<Option<Municipality>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT city_code, name, prefecture_code, prefecture_name, prefecture_slug,
                   region, population, area_km2, zero_carbon_declared, zero_carbon_year
            FROM municipalities
            WHERE city_code = ?1
            "#,
        )?;

        let muni = stmt
            .query_row(params![city_code], Self::map_row)
            .optional()?;

        Ok(muni)
    }

    /// 全件を団体コード順で取得する
    pub fn list_all(&self) -> RepositoryResult<Vec<Municipality>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT city_code, name, prefecture_code, prefecture_name, prefecture_slug,
                   region, population, area_km2, zero_carbon_declared, zero_carbon_year
            FROM municipalities
            ORDER BY city_code
            "#,
        )?;

        let municipalities = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(municipalities)
    }

    /// 人口・面積を更新する
    ///
    /// # 戻り値
    /// - Ok(true): 更新された / Ok(false): 対象レコードなし
    pub fn update_population_area(
        &self,
        city_code: &str,
        population: Option<i64>,
        area_km2: Option<f64>,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let updated = conn.execute(
            "UPDATE municipalities SET population = ?2, area_km2 = ?3 WHERE city_code = ?1",
            params![city_code, population, area_km2],
        )?;

        Ok(updated > 0)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Municipality> {
        Ok(Municipality {
            city_code: row.get(0)?,
            name: row.get(1)?,
            prefecture_code: row.get(2)?,
            prefecture_name: row.get(3)?,
            prefecture_slug: row.get(4)?,
            region: row.get(5)?,
            population: row.get(6)?,
            area_km2: row.get(7)?,
            zero_carbon_declared: row.get::<_, i32>(8)? != 0,
            zero_carbon_year: row.get(9)?,
        })
    }
}
