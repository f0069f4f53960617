// ==========================================
// 自治体排出量カルテ ETL - KPI エンジン 純粋関数ライブラリ
// ==========================================
// 職責: 排出量実績から気候目標 KPI（削減率・ペース・不足量・偏差値・判定）を算出
// 制約: 無状態・副作用なし・I/O なし。同一入力は常にビット一致の同一出力
// 既定値ポリシー: 定義域外の入力は例外にせず中立値を返す
//   - 率・量系 → 0.0 / 偏差値 → 50.0
//   ダッシュボード側は常に表示可能な数値を受け取る前提のため、この表は変更不可
// ==========================================

use crate::domain::types::Status;
use crate::domain::MunicipalityKpi;

/// 国の政策ベンチマーク: 2013年度比 46% 削減
pub const DEFAULT_TARGET_REDUCTION_RATE: f64 = 0.46;
/// 既定の基準年
pub const DEFAULT_BASE_YEAR: i32 = 2013;
/// 既定の目標年
pub const DEFAULT_TARGET_YEAR: i32 = 2030;

/// 指定桁数への丸め
///
/// Python 実装の round()（偶数丸め）と違い f64::round（四捨五入）を使う。
/// Rust 側の再計算同士ではビット一致が保たれる。
fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

// ==========================================
// KpiEngine - 純粋関数ユーティリティ
// ==========================================
pub struct KpiEngine;

impl KpiEngine {
    /// 削減率を計算する（小数第 2 位）
    ///
    /// # 規則
    /// - ((latest − base) / base) × 100
    /// - base <= 0 → 既定値 0.0
    /// - 符号: 負 = 削減、正 = 増加
    ///
    /// # 引数
    /// - base_emission: 基準年排出量（千t-CO₂）
    /// - latest_emission: 最新年排出量（千t-CO₂）
    pub fn reduction_rate(base_emission: f64, latest_emission: f64) -> f64 {
        if base_emission <= 0.0 {
            return 0.0;
        }

        let rate = ((latest_emission - base_emission) / base_emission) * 100.0;
        round_to(rate, 2)
    }

    /// 実績ペース（年平均削減率）を計算する（小数第 2 位）
    ///
    /// # 規則
    /// - 年複利換算: (1 − (latest/base)^(1/years)) × 100
    /// - base <= 0 / latest <= 0 / years <= 0 → 既定値 0.0
    /// - 符号: 正 = 削減（reduction_rate とは逆の規約）
    ///
    /// # 引数
    /// - base_emission: 基準年排出量（千t-CO₂）
    /// - latest_emission: 最新年排出量（千t-CO₂）
    /// - base_year: 基準年
    /// - latest_year: 最新年
    pub fn actual_pace(
        base_emission: f64,
        latest_emission: f64,
        base_year: i32,
        latest_year: i32,
    ) -> f64 {
        if base_emission <= 0.0 || latest_emission <= 0.0 {
            return 0.0;
        }

        let years = latest_year - base_year;
        if years <= 0 {
            return 0.0;
        }

        let rate = (1.0 - (latest_emission / base_emission).powf(1.0 / years as f64)) * 100.0;
        round_to(rate, 2)
    }

    /// 必要ペース（目標年までに必要な年平均削減率）を計算する（小数第 2 位）
    ///
    /// # 規則
    /// - 目標排出量 = base × (1 − target_reduction_rate)
    /// - (1 − (target/base)^(1/years)) × 100
    /// - base <= 0 / years <= 0 → 既定値 0.0
    ///
    /// # 引数
    /// - base_emission: 基準年排出量（千t-CO₂）
    /// - target_reduction_rate: 目標削減率 [0,1]（既定 0.46 = 46% 削減）
    /// - base_year: 基準年（既定 2013）
    /// - target_year: 目標年（既定 2030）
    pub fn required_pace(
        base_emission: f64,
        target_reduction_rate: f64,
        base_year: i32,
        target_year: i32,
    ) -> f64 {
        if base_emission <= 0.0 {
            return 0.0;
        }

        let target_emission = base_emission * (1.0 - target_reduction_rate);
        let years = target_year - base_year;
        if years <= 0 {
            return 0.0;
        }

        let rate = (1.0 - (target_emission / base_emission).powf(1.0 / years as f64)) * 100.0;
        round_to(rate, 2)
    }

    /// ペース達成率を計算する（小数第 1 位）
    ///
    /// # 規則
    /// - (actual_pace / required_pace) × 100
    /// - required_pace <= 0 → 既定値 0.0（目標未定義ならゼロ除算せず達成なし扱い）
    pub fn pace_achievement_rate(actual_pace: f64, required_pace: f64) -> f64 {
        if required_pace <= 0.0 {
            return 0.0;
        }

        round_to(actual_pace / required_pace * 100.0, 1)
    }

    /// 目標年の予測不足量を計算する（小数第 1 位、千t-CO₂）
    ///
    /// # 規則
    /// - 予測 = base × (1 − actual_pace/100)^years（実績ペースが継続した場合）
    /// - 目標 = base × (1 − target_reduction_rate)
    /// - max(0, 予測 − 目標)。目標超過達成は負の余剰ではなく 0 に丸める
    /// - base <= 0 → 既定値 0.0
    pub fn shortfall_2030(
        base_emission: f64,
        actual_pace: f64,
        base_year: i32,
        target_year: i32,
        target_reduction_rate: f64,
    ) -> f64 {
        if base_emission <= 0.0 {
            return 0.0;
        }

        let target = base_emission * (1.0 - target_reduction_rate);
        let years = target_year - base_year;

        // 現在のペースで推移した場合の目標年排出量
        let forecast = base_emission * (1.0 - actual_pace / 100.0).powi(years);

        let shortfall = forecast - target;
        round_to(shortfall.max(0.0), 1)
    }

    /// 偏差値を計算する（平均50・標準偏差10、小数第 1 位）
    ///
    /// # 規則
    /// - 50 + 10 × (mean(cohort) − target_value) / stdev(cohort)
    /// - 標準偏差は母標準偏差（n で割る）
    /// - コホート件数 < 2 / 標準偏差 == 0 → 既定値 50.0
    ///
    /// # 前提条件（呼び出し側の契約・関数内では強制しない）
    /// - cohort_values / target_value には削減率の絶対値を渡すこと。
    ///   削減率は負が良い値のため、絶対値にした上で「平均より下 = 高偏差値」の
    ///   本式に通すと、コホート平均より大きく削減した自治体が 50 超になる
    pub fn deviation_score(cohort_values: &[f64], target_value: f64) -> f64 {
        if cohort_values.len() < 2 {
            return 50.0;
        }

        let n = cohort_values.len() as f64;
        let mean = cohort_values.iter().sum::<f64>() / n;
        let variance = cohort_values
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / n;
        let std = variance.sqrt();

        if std == 0.0 {
            return 50.0;
        }

        round_to(50.0 + 10.0 * (mean - target_value) / std, 1)
    }

    /// 進捗ステータスを判定する
    ///
    /// # 規則（全実数で定義される全域関数）
    /// - pace_achievement_rate >= 100 → on-track
    /// - 80 <= pace_achievement_rate < 100 → at-risk
    /// - それ未満 → off-track
    pub fn status(pace_achievement_rate: f64) -> Status {
        if pace_achievement_rate >= 100.0 {
            Status::OnTrack
        } else if pace_achievement_rate >= 80.0 {
            Status::AtRisk
        } else {
            Status::OffTrack
        }
    }

    /// 一人あたり排出量を計算する（小数第 3 位、t-CO₂/人）
    ///
    /// # 規則
    /// - (total_emission_kt × 1000) / population（千t → t に換算してから割る）
    /// - population <= 0 → 既定値 0.0
    pub fn emission_per_capita(total_emission_kt: f64, population: i64) -> f64 {
        if population <= 0 {
            return 0.0;
        }

        round_to(total_emission_kt * 1000.0 / population as f64, 3)
    }

    /// 1 自治体分のスコアカードを組み立てる
    ///
    /// 偏差値と順位はコホート確定後に埋めるため None で返す
    ///
    /// # 引数
    /// - city_code: 団体コード
    /// - base_emission_kt / latest_emission_kt: 全部門合計排出量（千t-CO₂）
    /// - base_year / latest_year / target_year: 基準年・最新年・目標年
    /// - target_reduction_rate: 目標削減率 [0,1]
    /// - population: 人口（未投入なら None）
    #[allow(clippy::too_many_arguments)]
    pub fn build_scorecard(
        city_code: &str,
        base_emission_kt: f64,
        latest_emission_kt: f64,
        base_year: i32,
        latest_year: i32,
        target_year: i32,
        target_reduction_rate: f64,
        population: Option<i64>,
    ) -> MunicipalityKpi {
        let reduction_rate = Self::reduction_rate(base_emission_kt, latest_emission_kt);
        let actual_pace =
            Self::actual_pace(base_emission_kt, latest_emission_kt, base_year, latest_year);
        let required_pace =
            Self::required_pace(base_emission_kt, target_reduction_rate, base_year, target_year);
        let pace_achievement_rate = Self::pace_achievement_rate(actual_pace, required_pace);
        let shortfall_2030_kt = Self::shortfall_2030(
            base_emission_kt,
            actual_pace,
            base_year,
            target_year,
            target_reduction_rate,
        );

        MunicipalityKpi {
            city_code: city_code.to_string(),
            base_year,
            latest_year,
            base_emission_kt,
            latest_emission_kt,
            reduction_rate,
            actual_pace,
            required_pace,
            pace_achievement_rate,
            status: Self::status(pace_achievement_rate),
            shortfall_2030_kt,
            emission_per_capita: population.map(|p| Self::emission_per_capita(latest_emission_kt, p)),
            deviation_score: None,
            pref_rank: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction_rate_basic() {
        // 100 → 54 で -46.00%
        assert_eq!(KpiEngine::reduction_rate(100.0, 54.0), -46.0);
        // 増加は正
        assert_eq!(KpiEngine::reduction_rate(100.0, 110.0), 10.0);
    }

    #[test]
    fn test_reduction_rate_no_change_is_zero() {
        assert_eq!(KpiEngine::reduction_rate(123.45, 123.45), 0.0);
    }

    #[test]
    fn test_reduction_rate_nonpositive_base_defaults_to_zero() {
        assert_eq!(KpiEngine::reduction_rate(0.0, 100.0), 0.0);
        assert_eq!(KpiEngine::reduction_rate(-1.0, 100.0), 0.0);
    }

    #[test]
    fn test_actual_pace_no_change_is_zero() {
        assert_eq!(KpiEngine::actual_pace(200.0, 200.0, 2013, 2022), 0.0);
    }

    #[test]
    fn test_actual_pace_halving_over_one_year() {
        // 1 年で半減 → (1 − 0.5) × 100 = 50.00%/年
        assert_eq!(KpiEngine::actual_pace(100.0, 50.0, 2020, 2021), 50.0);
    }

    #[test]
    fn test_actual_pace_degenerate_inputs() {
        assert_eq!(KpiEngine::actual_pace(0.0, 50.0, 2013, 2022), 0.0);
        assert_eq!(KpiEngine::actual_pace(100.0, 0.0, 2013, 2022), 0.0);
        // 年数 0 以下はゼロ除算せず既定値
        assert_eq!(KpiEngine::actual_pace(100.0, 50.0, 2022, 2022), 0.0);
        assert_eq!(KpiEngine::actual_pace(100.0, 50.0, 2022, 2013), 0.0);
    }

    #[test]
    fn test_required_pace_national_benchmark_regression() {
        // 回帰固定値: base=100, 46%削減, 2013→2030 (17年)
        // (1 − 0.54^(1/17)) × 100 = 3.5597... → 3.56
        let rate = KpiEngine::required_pace(100.0, 0.46, 2013, 2030);
        assert_eq!(rate, 3.56);
        assert!((rate - 3.55).abs() <= 0.01);
    }

    #[test]
    fn test_required_pace_degenerate_inputs() {
        assert_eq!(KpiEngine::required_pace(0.0, 0.46, 2013, 2030), 0.0);
        assert_eq!(KpiEngine::required_pace(100.0, 0.46, 2030, 2030), 0.0);
    }

    #[test]
    fn test_pace_achievement_rate_guards_divide_by_zero() {
        assert_eq!(KpiEngine::pace_achievement_rate(3.0, 0.0), 0.0);
        assert_eq!(KpiEngine::pace_achievement_rate(3.0, -1.0), 0.0);
    }

    #[test]
    fn test_pace_achievement_rate_rounds_to_one_decimal() {
        // 2.0 / 3.0 × 100 = 66.666... → 66.7
        assert_eq!(KpiEngine::pace_achievement_rate(2.0, 3.0), 66.7);
    }

    #[test]
    fn test_shortfall_positive_when_pace_insufficient() {
        // 年 1% 削減では 46% 削減に届かない: 100×0.99^17 − 54 ≈ 30.3
        let shortfall = KpiEngine::shortfall_2030(100.0, 1.0, 2013, 2030, 0.46);
        assert_eq!(shortfall, 30.3);
    }

    #[test]
    fn test_shortfall_clamped_at_zero_when_target_beaten() {
        // 年 10% 削減なら目標超過達成 → 負の余剰ではなく 0
        assert_eq!(KpiEngine::shortfall_2030(100.0, 10.0, 2013, 2030, 0.46), 0.0);
        // 極端なペースでも決して負にならない
        for pace in [-50.0, 0.0, 3.55, 50.0, 99.0, 150.0] {
            assert!(KpiEngine::shortfall_2030(100.0, pace, 2013, 2030, 0.46) >= 0.0);
        }
    }

    #[test]
    fn test_shortfall_nonpositive_base_defaults_to_zero() {
        assert_eq!(KpiEngine::shortfall_2030(0.0, 1.0, 2013, 2030, 0.46), 0.0);
    }

    #[test]
    fn test_deviation_score_small_cohort_is_neutral() {
        assert_eq!(KpiEngine::deviation_score(&[10.0], 10.0), 50.0);
        assert_eq!(KpiEngine::deviation_score(&[], 10.0), 50.0);
    }

    #[test]
    fn test_deviation_score_zero_stdev_is_neutral() {
        assert_eq!(KpiEngine::deviation_score(&[5.0, 5.0, 5.0], 5.0), 50.0);
    }

    #[test]
    fn test_deviation_score_below_mean_scores_above_fifty() {
        // 平均 20、母標準偏差 sqrt(200/3)。target=10（平均より小）→ 50 超
        let score = KpiEngine::deviation_score(&[10.0, 20.0, 30.0], 10.0);
        assert_eq!(score, 62.2);
        // 平均より大きい値は 50 未満（対称）
        assert_eq!(KpiEngine::deviation_score(&[10.0, 20.0, 30.0], 30.0), 37.8);
    }

    #[test]
    fn test_status_boundaries_exact() {
        assert_eq!(KpiEngine::status(100.0), Status::OnTrack);
        assert_eq!(KpiEngine::status(99.999), Status::AtRisk);
        assert_eq!(KpiEngine::status(80.0), Status::AtRisk);
        assert_eq!(KpiEngine::status(79.999), Status::OffTrack);
        assert_eq!(KpiEngine::status(-10.0), Status::OffTrack);
        assert_eq!(KpiEngine::status(250.0), Status::OnTrack);
    }

    #[test]
    fn test_emission_per_capita() {
        // 100 千t = 100,000 t / 100,000 人 = 1.000 t/人
        assert_eq!(KpiEngine::emission_per_capita(100.0, 100_000), 1.0);
        assert_eq!(KpiEngine::emission_per_capita(100.0, 0), 0.0);
        assert_eq!(KpiEngine::emission_per_capita(100.0, -5), 0.0);
        // 丸めは小数第 3 位
        assert_eq!(KpiEngine::emission_per_capita(123.456, 100_000), 1.235);
    }

    #[test]
    fn test_idempotence_bit_identical_outputs() {
        // 再計算スクリプトは同一データに繰り返し走るため、ビット一致が必須
        let a = KpiEngine::actual_pace(812.34, 633.21, 2013, 2022);
        let b = KpiEngine::actual_pace(812.34, 633.21, 2013, 2022);
        assert_eq!(a.to_bits(), b.to_bits());

        let c = KpiEngine::deviation_score(&[1.5, 2.5, 9.0], 2.5);
        let d = KpiEngine::deviation_score(&[1.5, 2.5, 9.0], 2.5);
        assert_eq!(c.to_bits(), d.to_bits());
    }

    #[test]
    fn test_build_scorecard_assembles_consistent_record() {
        let kpi = KpiEngine::build_scorecard(
            "13101",
            100.0,
            80.0,
            2013,
            2022,
            2030,
            0.46,
            Some(60_000),
        );

        assert_eq!(kpi.city_code, "13101");
        assert_eq!(kpi.reduction_rate, -20.0);
        assert_eq!(kpi.actual_pace, KpiEngine::actual_pace(100.0, 80.0, 2013, 2022));
        assert_eq!(
            kpi.pace_achievement_rate,
            KpiEngine::pace_achievement_rate(kpi.actual_pace, kpi.required_pace)
        );
        assert_eq!(kpi.status, KpiEngine::status(kpi.pace_achievement_rate));
        // 80 千t / 60,000 人 = 1.333 t/人
        assert_eq!(kpi.emission_per_capita, Some(1.333));
        assert_eq!(kpi.deviation_score, None);
        assert_eq!(kpi.pref_rank, None);
    }

    #[test]
    fn test_build_scorecard_without_population() {
        let kpi =
            KpiEngine::build_scorecard("13102", 100.0, 80.0, 2013, 2022, 2030, 0.46, None);
        assert_eq!(kpi.emission_per_capita, None);
    }
}
