// ==========================================
// 自治体排出量カルテ ETL - KPI リポジトリ
// ==========================================
// 制約: Repository は業務ロジックを含まない（KPI の計算はシーダ層が行う）
// ==========================================

use crate::domain::types::Status;
use crate::domain::{MunicipalityKpi, PrefectureKpi};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// KpiRepository - 自治体 / 都道府県 KPI リポジトリ
// ==========================================

/// KPI リポジトリ
/// 職責: municipality_kpis / prefecture_kpis テーブルの upsert / select / 部分更新
pub struct KpiRepository {
    conn: Arc<Mutex<Connection>>,
}

impl KpiRepository {
    /// 既存接続からリポジトリを作成する
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 自治体 KPI を一括 upsert する
    pub fn upsert_batch(&self, kpis: &[MunicipalityKpi]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for kpi in kpis {
            tx.execute(
                r#"
                INSERT INTO municipality_kpis (
                    city_code, base_year, latest_year, base_emission_kt, latest_emission_kt,
                    reduction_rate, actual_pace, required_pace, pace_achievement_rate,
                    status, shortfall_2030_kt, emission_per_capita, deviation_score, pref_rank
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ON CONFLICT(city_code) DO UPDATE SET
                    base_year = excluded.base_year,
                    latest_year = excluded.latest_year,
                    base_emission_kt = excluded.base_emission_kt,
                    latest_emission_kt = excluded.latest_emission_kt,
                    reduction_rate = excluded.reduction_rate,
                    actual_pace = excluded.actual_pace,
                    required_pace = excluded.required_pace,
                    pace_achievement_rate = excluded.pace_achievement_rate,
                    status = excluded.status,
                    shortfall_2030_kt = excluded.shortfall_2030_kt,
                    emission_per_capita = excluded.emission_per_capita,
                    deviation_score = excluded.deviation_score,
                    pref_rank = excluded.pref_rank
                "#,
                params![
                    kpi.city_code,
                    kpi.base_year,
                    kpi.latest_year,
                    kpi.base_emission_kt,
                    kpi.latest_emission_kt,
                    kpi.reduction_rate,
                    kpi.actual_pace,
                    kpi.required_pace,
                    kpi.pace_achievement_rate,
                    kpi.status.to_db_str(),
                    kpi.shortfall_2030_kt,
                    kpi.emission_per_capita,
                    kpi.deviation_score,
                    kpi.pref_rank,
                ],
            )?;
        }

        tx.commit()?;
        Ok(kpis.len())
    }

    /// 団体コードで 1 件取得する
    pub fn find_by_city(&self, city_code: &str) -> RepositoryResult<Option<MunicipalityKpi>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE city_code = ?1",
            Self::SELECT_MUNICIPALITY_KPI
        ))?;

        let kpi = stmt
            .query_row(params![city_code], Self::map_municipality_row)
            .optional()?;

        Ok(kpi)
    }

    /// 全件を団体コード順で取得する
    pub fn list_all(&self) -> RepositoryResult<Vec<MunicipalityKpi>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY city_code",
            Self::SELECT_MUNICIPALITY_KPI
        ))?;

        let kpis = stmt
            .query_map([], Self::map_municipality_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(kpis)
    }

    /// 偏差値を更新する
    pub fn update_deviation_score(&self, city_code: &str, score: f64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE municipality_kpis SET deviation_score = ?2 WHERE city_code = ?1",
            params![city_code, score],
        )?;
        Ok(updated > 0)
    }

    /// 一人あたり排出量を更新する
    pub fn update_emission_per_capita(
        &self,
        city_code: &str,
        emission_per_capita: f64,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE municipality_kpis SET emission_per_capita = ?2 WHERE city_code = ?1",
            params![city_code, emission_per_capita],
        )?;
        Ok(updated > 0)
    }

    /// 都道府県内順位を更新する
    pub fn update_pref_rank(&self, city_code: &str, rank: i32) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE municipality_kpis SET pref_rank = ?2 WHERE city_code = ?1",
            params![city_code, rank],
        )?;
        Ok(updated > 0)
    }

    /// ステータス別の件数を返す (on-track, at-risk, off-track)
    pub fn status_counts(&self) -> RepositoryResult<(i32, i32, i32)> {
        let conn = self.get_conn()?;

        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM municipality_kpis GROUP BY status")?;

        let mut counts = (0, 0, 0);
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i32>(1)?))
        })?;

        for row in rows {
            let (status, count) = row?;
            match Status::from_str(&status) {
                Status::OnTrack => counts.0 = count,
                Status::AtRisk => counts.1 = count,
                Status::OffTrack => counts.2 = count,
            }
        }

        Ok(counts)
    }

    /// 都道府県 KPI を upsert する
    pub fn upsert_prefecture(&self, kpi: &PrefectureKpi) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO prefecture_kpis (
                prefecture_code, prefecture_name, prefecture_slug, latest_year,
                base_emission_mt, latest_emission_mt, reduction_rate, actual_pace,
                required_pace, pace_achievement_rate, status, shortfall_2030_mt,
                municipality_count, on_track_count, at_risk_count, off_track_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT(prefecture_code) DO UPDATE SET
                prefecture_name = excluded.prefecture_name,
                prefecture_slug = excluded.prefecture_slug,
                latest_year = excluded.latest_year,
                base_emission_mt = excluded.base_emission_mt,
                latest_emission_mt = excluded.latest_emission_mt,
                reduction_rate = excluded.reduction_rate,
                actual_pace = excluded.actual_pace,
                required_pace = excluded.required_pace,
                pace_achievement_rate = excluded.pace_achievement_rate,
                status = excluded.status,
                shortfall_2030_mt = excluded.shortfall_2030_mt,
                municipality_count = excluded.municipality_count,
                on_track_count = excluded.on_track_count,
                at_risk_count = excluded.at_risk_count,
                off_track_count = excluded.off_track_count
            "#,
            params![
                kpi.prefecture_code,
                kpi.prefecture_name,
                kpi.prefecture_slug,
                kpi.latest_year,
                kpi.base_emission_mt,
                kpi.latest_emission_mt,
                kpi.reduction_rate,
                kpi.actual_pace,
                kpi.required_pace,
                kpi.pace_achievement_rate,
                kpi.status.to_db_str(),
                kpi.shortfall_2030_mt,
                kpi.municipality_count,
                kpi.on_track_count,
                kpi.at_risk_count,
                kpi.off_track_count,
            ],
        )?;

        Ok(())
    }

    /// 都道府県 KPI を 1 件取得する
    pub fn find_prefecture(&self, prefecture_code: &str) -> RepositoryResult<Option<PrefectureKpi>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT prefecture_code, prefecture_name, prefecture_slug, latest_year,
                   base_emission_mt, latest_emission_mt, reduction_rate, actual_pace,
                   required_pace, pace_achievement_rate, status, shortfall_2030_mt,
                   municipality_count, on_track_count, at_risk_count, off_track_count
            FROM prefecture_kpis
            WHERE prefecture_code = ?1
            "#,
        )?;

        let kpi = stmt
            .query_row(params![prefecture_code], |row| {
                Ok(PrefectureKpi {
                    prefecture_code: row.get(0)?,
                    prefecture_name: row.get(1)?,
                    prefecture_slug: row.get(2)?,
                    latest_year: row.get(3)?,
                    base_emission_mt: row.get(4)?,
                    latest_emission_mt: row.get(5)?,
                    reduction_rate: row.get(6)?,
                    actual_pace: row.get(7)?,
                    required_pace: row.get(8)?,
                    pace_achievement_rate: row.get(9)?,
                    status: Status::from_str(&row.get::<_, String>(10)?),
                    shortfall_2030_mt: row.get(11)?,
                    municipality_count: row.get(12)?,
                    on_track_count: row.get(13)?,
                    at_risk_count: row.get(14)?,
                    off_track_count: row.get(15)?,
                })
            })
            .optional()?;

        Ok(kpi)
    }

    const SELECT_MUNICIPALITY_KPI: &'static str = r#"
        SELECT city_code, base_year, latest_year, base_emission_kt, latest_emission_kt,
               reduction_rate, actual_pace, required_pace, pace_achievement_rate,
               status, shortfall_2030_kt, emission_per_capita, deviation_score, pref_rank
        FROM municipality_kpis
        "#;

    fn map_municipality_row(row: &Row<'_>) -> rusqlite::Result<MunicipalityKpi> {
        Ok(MunicipalityKpi {
            city_code: row.get(0)?,
            base_year: row.get(1)?,
            latest_year: row.get(2)?,
            base_emission_kt: row.get(3)?,
            latest_emission_kt: row.get(4)?,
            reduction_rate: row.get(5)?,
            actual_pace: row.get(6)?,
            required_pace: row.get(7)?,
            pace_achievement_rate: row.get(8)?,
            status: Status::from_str(&row.get::<_, String>(9)?),
            shortfall_2030_kt: row.get(10)?,
            emission_per_capita: row.get(11)?,
            deviation_score: row.get(12)?,
            pref_rank: row.get(13)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::kpi::KpiEngine;

    fn setup_test_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn make_kpi(city_code: &str, base: f64, latest: f64) -> MunicipalityKpi {
        KpiEngine::build_scorecard(city_code, base, latest, 2013, 2022, 2030, 0.46, None)
    }

    #[test]
    fn test_upsert_and_roundtrip() {
        let repo = KpiRepository::from_connection(setup_test_db());

        let kpi = make_kpi("13101", 100.0, 80.0);
        repo.upsert_batch(std::slice::from_ref(&kpi)).unwrap();

        let found = repo.find_by_city("13101").unwrap().unwrap();
        assert_eq!(found, kpi);
    }

    #[test]
    fn test_upsert_replaces_on_reseed() {
        let repo = KpiRepository::from_connection(setup_test_db());

        repo.upsert_batch(&[make_kpi("13101", 100.0, 80.0)]).unwrap();
        repo.upsert_batch(&[make_kpi("13101", 100.0, 60.0)]).unwrap();

        let all = repo.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].latest_emission_kt, 60.0);
    }

    #[test]
    fn test_partial_updates() {
        let repo = KpiRepository::from_connection(setup_test_db());
        repo.upsert_batch(&[make_kpi("13101", 100.0, 80.0)]).unwrap();

        assert!(repo.update_deviation_score("13101", 55.5).unwrap());
        assert!(repo.update_emission_per_capita("13101", 1.333).unwrap());
        assert!(repo.update_pref_rank("13101", 3).unwrap());

        let found = repo.find_by_city("13101").unwrap().unwrap();
        assert_eq!(found.deviation_score, Some(55.5));
        assert_eq!(found.emission_per_capita, Some(1.333));
        assert_eq!(found.pref_rank, Some(3));

        // 存在しない団体コードは false
        assert!(!repo.update_deviation_score("99999", 50.0).unwrap());
    }

    #[test]
    fn test_status_counts() {
        let repo = KpiRepository::from_connection(setup_test_db());
        repo.upsert_batch(&[
            make_kpi("13101", 100.0, 40.0), // 大幅削減 → on-track
            make_kpi("13102", 100.0, 99.0), // ほぼ横ばい → off-track
            make_kpi("13103", 100.0, 98.0),
        ])
        .unwrap();

        let (on_track, at_risk, off_track) = repo.status_counts().unwrap();
        assert_eq!(on_track + at_risk + off_track, 3);
        assert_eq!(on_track, 1);
        assert_eq!(off_track, 2);
    }

    #[test]
    fn test_prefecture_roundtrip() {
        let repo = KpiRepository::from_connection(setup_test_db());

        let pref = PrefectureKpi {
            prefecture_code: "13".to_string(),
            prefecture_name: "東京都".to_string(),
            prefecture_slug: "tokyo".to_string(),
            latest_year: 2022,
            base_emission_mt: 60.12,
            latest_emission_mt: 52.4,
            reduction_rate: -12.84,
            actual_pace: 1.51,
            required_pace: 3.56,
            pace_achievement_rate: 42.4,
            status: Status::OffTrack,
            shortfall_2030_mt: 13.7,
            municipality_count: 62,
            on_track_count: 3,
            at_risk_count: 10,
            off_track_count: 49,
        };

        repo.upsert_prefecture(&pref).unwrap();
        let found = repo.find_prefecture("13").unwrap().unwrap();
        assert_eq!(found, pref);

        // upsert し直しても 1 件のまま
        repo.upsert_prefecture(&pref).unwrap();
        assert!(repo.find_prefecture("14").unwrap().is_none());
    }
}
