// ==========================================
// 自治体排出量カルテ ETL - シーダ層
// ==========================================
// 職責: KPI 算出と投入のオーケストレーション
// - パース済み排出量データ → 自治体 KPI（偏差値・順位を含む）→ 都道府県集計 KPI
// - 保存済みデータからの再計算ジョブ（偏差値 / 一人あたり排出量 / 都道府県集計）
// 制約: 計算式は KpiEngine に委譲し、ここでは式を持たない
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::{Municipality, MunicipalityEmissions, MunicipalityKpi, PrefectureKpi, SeedRun};
use crate::importer::{PopulationRecord, RegistryEntry};
use crate::kpi::KpiEngine;
use crate::repository::{
    EmissionRepository, KpiRepository, MunicipalityRepository, RepositoryResult,
    SeedRunRepository,
};
use chrono::Utc;
use rusqlite::Connection;
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// Seeder - シード / 再計算オーケストレータ
// ==========================================
pub struct Seeder {
    config: PipelineConfig,
    municipality_repo: MunicipalityRepository,
    emission_repo: EmissionRepository,
    kpi_repo: KpiRepository,
    seed_run_repo: SeedRunRepository,
}

impl Seeder {
    /// 既存接続からシーダを作成する
    pub fn new(conn: Arc<Mutex<Connection>>, config: PipelineConfig) -> Self {
        Self {
            config,
            municipality_repo: MunicipalityRepository::from_connection(conn.clone()),
            emission_repo: EmissionRepository::from_connection(conn.clone()),
            kpi_repo: KpiRepository::from_connection(conn.clone()),
            seed_run_repo: SeedRunRepository::from_connection(conn),
        }
    }

    /// レジストリとパース済み排出量データから全テーブルを投入する
    ///
    /// 手順:
    /// 1. seed_runs に開始を記録
    /// 2. 自治体マスターを upsert
    /// 3. 排出量レコードを upsert
    /// 4. 自治体 KPI を算出して upsert（偏差値・都道府県内順位を含む）
    /// 5. 都道府県集計 KPI を upsert
    /// 6. seed_runs に件数と完了を記録
    ///
    /// # 戻り値
    /// - Ok(SeedRun): 投入件数入りの実行記録
    pub fn seed_all(
        &self,
        registry: &[RegistryEntry],
        emissions_data: &[MunicipalityEmissions],
    ) -> RepositoryResult<SeedRun> {
        let mut run = SeedRun {
            run_id: Uuid::new_v4(),
            started_at: Utc::now().naive_utc(),
            finished_at: None,
            municipality_count: 0,
            emission_count: 0,
            kpi_count: 0,
        };
        self.seed_run_repo.insert_started(&run)?;
        tracing::info!("シード実行開始: run_id={}", run.run_id);

        run.municipality_count = self.seed_municipalities(registry)? as i32;
        run.emission_count = self.seed_emissions(emissions_data)? as i32;
        run.kpi_count = self.seed_municipality_kpis(emissions_data)? as i32;
        self.recalc_prefecture_kpi()?;

        run.finished_at = Some(Utc::now().naive_utc());
        self.seed_run_repo.mark_finished(
            run.run_id,
            run.finished_at.unwrap_or(run.started_at),
            run.municipality_count,
            run.emission_count,
            run.kpi_count,
        )?;
        tracing::info!(
            "シード実行完了: 自治体 {} 件 / 排出量 {} 件 / KPI {} 件",
            run.municipality_count,
            run.emission_count,
            run.kpi_count
        );

        Ok(run)
    }

    /// 自治体マスターを投入する
    fn seed_municipalities(&self, registry: &[RegistryEntry]) -> RepositoryResult<usize> {
        let municipalities: Vec<Municipality> = registry
            .iter()
            .map(|entry| {
                Municipality::from_registry(
                    &entry.city_code,
                    &entry.name,
                    &entry.region,
                    self.config.prefecture(),
                )
            })
            .collect();

        let count = self.municipality_repo.upsert_batch(&municipalities)?;
        tracing::info!("自治体マスターを投入: {} 件", count);
        Ok(count)
    }

    /// 排出量レコードを投入する
    fn seed_emissions(
        &self,
        emissions_data: &[MunicipalityEmissions],
    ) -> RepositoryResult<usize> {
        let records: Vec<_> = emissions_data
            .iter()
            .flat_map(|data| data.to_records())
            .collect();

        let count = self.emission_repo.upsert_batch(&records)?;
        tracing::info!("排出量データを投入: {} 件", count);
        Ok(count)
    }

    /// 自治体 KPI を算出して投入する
    ///
    /// 基準年または最新年の合計が 0 の自治体は KPI 対象外（コホートにも含めない）
    fn seed_municipality_kpis(
        &self,
        emissions_data: &[MunicipalityEmissions],
    ) -> RepositoryResult<usize> {
        let mut kpis: Vec<MunicipalityKpi> = Vec::new();

        for data in emissions_data {
            let base_emission = data.total_for_year(self.config.base_year);
            let latest_emission = data.total_for_year(self.config.latest_year);

            if base_emission == 0.0 || latest_emission == 0.0 {
                tracing::warn!(
                    "{} - 基準年または最新年のデータがないため KPI 対象外",
                    data.city_code
                );
                continue;
            }

            let population = self
                .municipality_repo
                .find_by_code(&data.city_code)?
                .and_then(|m| m.population);

            kpis.push(KpiEngine::build_scorecard(
                &data.city_code,
                base_emission,
                latest_emission,
                self.config.base_year,
                self.config.latest_year,
                self.config.target_year,
                self.config.target_reduction_rate,
                population,
            ));
        }

        // 偏差値: コホートは全対象自治体の削減率の絶対値
        let cohort: Vec<f64> = kpis.iter().map(|k| k.reduction_rate.abs()).collect();
        for kpi in &mut kpis {
            kpi.deviation_score =
                Some(KpiEngine::deviation_score(&cohort, kpi.reduction_rate.abs()));
        }

        // 都道府県内順位: ペース達成率の降順（1 = 最良）
        let mut order: Vec<usize> = (0..kpis.len()).collect();
        order.sort_by(|&a, &b| {
            kpis[b]
                .pace_achievement_rate
                .partial_cmp(&kpis[a].pace_achievement_rate)
                .unwrap_or(Ordering::Equal)
        });
        for (rank, &idx) in order.iter().enumerate() {
            kpis[idx].pref_rank = Some(rank as i32 + 1);
        }

        let count = self.kpi_repo.upsert_batch(&kpis)?;
        tracing::info!("自治体 KPI を投入: {} 件", count);
        Ok(count)
    }

    /// 保存済みの自治体 KPI から偏差値を再計算する
    ///
    /// # 戻り値
    /// - Ok(usize): 更新件数
    pub fn recalc_deviation_scores(&self) -> RepositoryResult<usize> {
        let kpis = self.kpi_repo.list_all()?;
        let cohort: Vec<f64> = kpis.iter().map(|k| k.reduction_rate.abs()).collect();

        let mut updated = 0;
        for kpi in &kpis {
            let score = KpiEngine::deviation_score(&cohort, kpi.reduction_rate.abs());
            if self.kpi_repo.update_deviation_score(&kpi.city_code, score)? {
                updated += 1;
            }
        }

        tracing::info!("偏差値を再計算: {} 件", updated);
        Ok(updated)
    }

    /// 保存済みの人口から一人あたり排出量を再計算する
    ///
    /// # 戻り値
    /// - Ok((updated, skipped)): 更新件数と人口未投入でスキップした件数
    pub fn recalc_emission_per_capita(&self) -> RepositoryResult<(usize, usize)> {
        let kpis = self.kpi_repo.list_all()?;

        let mut updated = 0;
        let mut skipped = 0;
        for kpi in &kpis {
            let population = self
                .municipality_repo
                .find_by_code(&kpi.city_code)?
                .and_then(|m| m.population);

            let Some(population) = population else {
                tracing::debug!("{} - 人口データなし（スキップ）", kpi.city_code);
                skipped += 1;
                continue;
            };

            let per_capita = KpiEngine::emission_per_capita(kpi.latest_emission_kt, population);
            if self
                .kpi_repo
                .update_emission_per_capita(&kpi.city_code, per_capita)?
            {
                updated += 1;
            }
        }

        tracing::info!("一人あたり排出量を再計算: 更新 {} 件 / スキップ {} 件", updated, skipped);
        Ok((updated, skipped))
    }

    /// 保存済みの自治体 KPI から都道府県集計 KPI を再計算する
    ///
    /// 排出量は 千t → 百万t（Mt）に換算して保持する
    pub fn recalc_prefecture_kpi(&self) -> RepositoryResult<PrefectureKpi> {
        let kpis = self.kpi_repo.list_all()?;

        let total_base: f64 = kpis.iter().map(|k| k.base_emission_kt).sum();
        let total_latest: f64 = kpis.iter().map(|k| k.latest_emission_kt).sum();

        let reduction_rate = KpiEngine::reduction_rate(total_base, total_latest);
        let actual_pace = KpiEngine::actual_pace(
            total_base,
            total_latest,
            self.config.base_year,
            self.config.latest_year,
        );
        let required_pace = KpiEngine::required_pace(
            total_base,
            self.config.target_reduction_rate,
            self.config.base_year,
            self.config.target_year,
        );
        let pace_achievement_rate = KpiEngine::pace_achievement_rate(actual_pace, required_pace);
        let shortfall_kt = KpiEngine::shortfall_2030(
            total_base,
            actual_pace,
            self.config.base_year,
            self.config.target_year,
            self.config.target_reduction_rate,
        );

        let (on_track, at_risk, off_track) = self.kpi_repo.status_counts()?;

        let pref = PrefectureKpi {
            prefecture_code: self.config.prefecture_code.clone(),
            prefecture_name: self.config.prefecture_name.clone(),
            prefecture_slug: self.config.prefecture_slug.clone(),
            latest_year: self.config.latest_year,
            base_emission_mt: round_mt(total_base),
            latest_emission_mt: round_mt(total_latest),
            reduction_rate,
            actual_pace,
            required_pace,
            pace_achievement_rate,
            status: KpiEngine::status(pace_achievement_rate),
            shortfall_2030_mt: round_mt(shortfall_kt),
            municipality_count: kpis.len() as i32,
            on_track_count: on_track,
            at_risk_count: at_risk,
            off_track_count: off_track,
        };

        self.kpi_repo.upsert_prefecture(&pref)?;
        tracing::info!(
            "都道府県集計 KPI を投入: {} (自治体 {} 件)",
            pref.prefecture_name,
            pref.municipality_count
        );
        Ok(pref)
    }

    /// 人口・面積を投入し、一人あたり排出量を更新する
    ///
    /// # 戻り値
    /// - Ok((updated, missing)): 更新件数とマスター不在でスキップした件数
    pub fn import_population(
        &self,
        records: &[PopulationRecord],
    ) -> RepositoryResult<(usize, usize)> {
        let mut updated = 0;
        let mut missing = 0;

        for record in records {
            let found = self.municipality_repo.update_population_area(
                &record.city_code,
                record.population,
                record.area_km2,
            )?;
            if !found {
                tracing::warn!("{} - 自治体マスター未登録（スキップ）", record.city_code);
                missing += 1;
                continue;
            }
            updated += 1;
        }

        // 人口が入ったので一人あたり排出量を追随させる
        self.recalc_emission_per_capita()?;

        tracing::info!("人口・面積を投入: 更新 {} 件 / 未登録 {} 件", updated, missing);
        Ok((updated, missing))
    }
}

/// 千t-CO₂ を 百万t-CO₂（Mt）に換算して小数第 2 位に丸める
fn round_mt(value_kt: f64) -> f64 {
    (value_kt / 1000.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::types::Status;
    use std::collections::BTreeMap;

    fn setup() -> (Arc<Mutex<Connection>>, Seeder) {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let seeder = Seeder::new(conn.clone(), PipelineConfig::default());
        (conn, seeder)
    }

    fn registry_entry(city_code: &str, name: &str) -> RegistryEntry {
        RegistryEntry {
            city_code: city_code.to_string(),
            name: name.to_string(),
            region: "特別区".to_string(),
        }
    }

    fn emissions(city_code: &str, base: f64, latest: f64) -> MunicipalityEmissions {
        MunicipalityEmissions {
            city_code: city_code.to_string(),
            city_name: city_code.to_string(),
            years: vec![2013, 2022],
            emissions: BTreeMap::from([(
                "家庭".to_string(),
                BTreeMap::from([(2013, base), (2022, latest)]),
            )]),
        }
    }

    #[test]
    fn test_seed_all_populates_all_tables() {
        let (conn, seeder) = setup();

        let registry = vec![
            registry_entry("13101", "千代田区"),
            registry_entry("13102", "中央区"),
            registry_entry("13103", "港区"),
        ];
        let data = vec![
            emissions("13101", 100.0, 50.0), // 大幅削減
            emissions("13102", 100.0, 90.0),
            emissions("13103", 100.0, 99.0), // ほぼ横ばい
        ];

        let run = seeder.seed_all(&registry, &data).unwrap();
        assert_eq!(run.municipality_count, 3);
        assert_eq!(run.emission_count, 6);
        assert_eq!(run.kpi_count, 3);
        assert!(run.finished_at.is_some());

        let kpi_repo = KpiRepository::from_connection(conn.clone());
        let kpis = kpi_repo.list_all().unwrap();
        assert_eq!(kpis.len(), 3);

        // 偏差値と順位が全件埋まっている
        assert!(kpis.iter().all(|k| k.deviation_score.is_some()));
        assert!(kpis.iter().all(|k| k.pref_rank.is_some()));

        // 最大削減の自治体が最上位・偏差値 50 超
        let best = kpis.iter().find(|k| k.city_code == "13101").unwrap();
        assert_eq!(best.pref_rank, Some(1));
        assert!(best.deviation_score.unwrap() > 50.0);
        let worst = kpis.iter().find(|k| k.city_code == "13103").unwrap();
        assert_eq!(worst.pref_rank, Some(3));
        assert!(worst.deviation_score.unwrap() < 50.0);

        // 都道府県集計 KPI が投入されている
        let pref = kpi_repo.find_prefecture("13").unwrap().unwrap();
        assert_eq!(pref.municipality_count, 3);
        assert_eq!(
            pref.on_track_count + pref.at_risk_count + pref.off_track_count,
            3
        );
        // 300 千t = 0.3 Mt
        assert_eq!(pref.base_emission_mt, 0.3);
    }

    #[test]
    fn test_seed_all_skips_zero_base_municipality() {
        let (conn, seeder) = setup();

        let registry = vec![
            registry_entry("13101", "千代田区"),
            registry_entry("13102", "中央区"),
        ];
        let data = vec![
            emissions("13101", 100.0, 80.0),
            emissions("13102", 0.0, 80.0), // 基準年データなし
        ];

        let run = seeder.seed_all(&registry, &data).unwrap();
        assert_eq!(run.kpi_count, 1);

        let kpi_repo = KpiRepository::from_connection(conn);
        assert!(kpi_repo.find_by_city("13102").unwrap().is_none());
    }

    #[test]
    fn test_seed_all_is_idempotent() {
        let (conn, seeder) = setup();

        let registry = vec![registry_entry("13101", "千代田区")];
        let data = vec![emissions("13101", 100.0, 80.0)];

        seeder.seed_all(&registry, &data).unwrap();
        let first = KpiRepository::from_connection(conn.clone())
            .find_by_city("13101")
            .unwrap()
            .unwrap();

        // 同一入力で再実行しても同一の KPI（純粋関数 + upsert）
        seeder.seed_all(&registry, &data).unwrap();
        let second = KpiRepository::from_connection(conn)
            .find_by_city("13101")
            .unwrap()
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_recalc_deviation_scores_matches_seed() {
        let (conn, seeder) = setup();

        let registry = vec![
            registry_entry("13101", "千代田区"),
            registry_entry("13102", "中央区"),
            registry_entry("13103", "港区"),
        ];
        let data = vec![
            emissions("13101", 100.0, 50.0),
            emissions("13102", 100.0, 90.0),
            emissions("13103", 100.0, 99.0),
        ];
        seeder.seed_all(&registry, &data).unwrap();

        let kpi_repo = KpiRepository::from_connection(conn);
        let before: Vec<_> = kpi_repo.list_all().unwrap();

        let updated = seeder.recalc_deviation_scores().unwrap();
        assert_eq!(updated, 3);

        // シード時と同じコホートなので再計算しても値は変わらない
        let after: Vec<_> = kpi_repo.list_all().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_import_population_refreshes_per_capita() {
        let (conn, seeder) = setup();

        let registry = vec![registry_entry("13101", "千代田区")];
        let data = vec![emissions("13101", 100.0, 80.0)];
        seeder.seed_all(&registry, &data).unwrap();

        let records = vec![
            PopulationRecord {
                city_code: "13101".to_string(),
                population: Some(80_000),
                area_km2: Some(11.66),
            },
            PopulationRecord {
                city_code: "99999".to_string(),
                population: Some(1),
                area_km2: None,
            },
        ];

        let (updated, missing) = seeder.import_population(&records).unwrap();
        assert_eq!(updated, 1);
        assert_eq!(missing, 1);

        // 80 千t / 80,000 人 = 1.000 t/人
        let kpi = KpiRepository::from_connection(conn)
            .find_by_city("13101")
            .unwrap()
            .unwrap();
        assert_eq!(kpi.emission_per_capita, Some(1.0));
    }

    #[test]
    fn test_recalc_prefecture_kpi_from_stored_kpis() {
        let (_conn, seeder) = setup();

        let registry = vec![
            registry_entry("13101", "千代田区"),
            registry_entry("13102", "中央区"),
        ];
        let data = vec![
            emissions("13101", 600.0, 400.0),
            emissions("13102", 400.0, 300.0),
        ];
        seeder.seed_all(&registry, &data).unwrap();

        let pref = seeder.recalc_prefecture_kpi().unwrap();

        // 合計 1000 千t → 1.0 Mt / 700 千t → 0.7 Mt
        assert_eq!(pref.base_emission_mt, 1.0);
        assert_eq!(pref.latest_emission_mt, 0.7);
        assert_eq!(pref.reduction_rate, -30.0);
        // 実ペース 33.33 / 必要ペース 27.06 → 達成率 100% 超
        assert_eq!(pref.status, Status::OnTrack);
    }
}
