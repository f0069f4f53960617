// ==========================================
// 自治体排出量カルテ ETL - KPI エンティティ
// ==========================================
// KPI エンジンの出力をそのまま格納する派生レコード。
// 丸め桁数は KPI エンジン側で確定済み（再計算でビット一致する）。
// ==========================================

use crate::domain::types::Status;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 自治体 KPI（スコアカード）
///
/// municipality_kpis テーブルの 1 行。入力（排出量・人口）の純粋関数であり、
/// 再計算のたびに作り直す。ID や更新履歴は持たない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalityKpi {
    /// 団体コード
    pub city_code: String,
    /// 基準年
    pub base_year: i32,
    /// 最新年
    pub latest_year: i32,
    /// 基準年排出量（千t-CO₂）
    pub base_emission_kt: f64,
    /// 最新年排出量（千t-CO₂）
    pub latest_emission_kt: f64,
    /// 削減率（%）負 = 削減
    pub reduction_rate: f64,
    /// 実績ペース（%/年）正 = 削減
    pub actual_pace: f64,
    /// 必要ペース（%/年）
    pub required_pace: f64,
    /// ペース達成率（%）
    pub pace_achievement_rate: f64,
    /// 進捗ステータス
    pub status: Status,
    /// 2030年予測不足量（千t-CO₂、0 以上）
    pub shortfall_2030_kt: f64,
    /// 一人あたり排出量（t-CO₂/人）人口未投入時は None
    pub emission_per_capita: Option<f64>,
    /// 偏差値（平均50、同規模コホート内）コホート確定前は None
    pub deviation_score: Option<f64>,
    /// 都道府県内順位（ペース達成率降順、1 = 最良）
    pub pref_rank: Option<i32>,
}

/// 都道府県集計 KPI
///
/// 全自治体の排出量合計に対して同じ計算式を適用したもの。
/// 排出量は 千t → 百万t（Mt）に換算して保持する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefectureKpi {
    pub prefecture_code: String,
    pub prefecture_name: String,
    pub prefecture_slug: String,
    pub latest_year: i32,
    /// 基準年排出量（百万t-CO₂）
    pub base_emission_mt: f64,
    /// 最新年排出量（百万t-CO₂）
    pub latest_emission_mt: f64,
    pub reduction_rate: f64,
    pub actual_pace: f64,
    pub required_pace: f64,
    pub pace_achievement_rate: f64,
    pub status: Status,
    /// 2030年予測不足量（百万t-CO₂）
    pub shortfall_2030_mt: f64,
    /// 集計対象の自治体数
    pub municipality_count: i32,
    pub on_track_count: i32,
    pub at_risk_count: i32,
    pub off_track_count: i32,
}

/// シード実行の監査レコード（seed_runs テーブル）
///
/// 何度でも再実行されるスクリプト群の「いつ・何件投入したか」を残す
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRun {
    /// 実行 ID
    pub run_id: Uuid,
    /// 開始時刻（UTC）
    pub started_at: NaiveDateTime,
    /// 終了時刻（UTC）実行中は None
    pub finished_at: Option<NaiveDateTime>,
    /// 投入した自治体マスター件数
    pub municipality_count: i32,
    /// 投入した排出量レコード件数
    pub emission_count: i32,
    /// 投入した KPI 件数
    pub kpi_count: i32,
}
