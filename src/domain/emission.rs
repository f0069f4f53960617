// ==========================================
// 自治体排出量カルテ ETL - 排出量エンティティ
// ==========================================
// 単位: 千t-CO₂（カルテの原単位をそのまま保持する）
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 部門別・年度別の排出量 1 レコード（emissions テーブルの 1 行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
    /// 団体コード
    pub city_code: String,
    /// 年度（西暦）
    pub fiscal_year: i32,
    /// 部門名（製造業 / 家庭 / 旅客 など）
    pub sector: String,
    /// 排出量（千t-CO₂）
    pub value_kt_co2: f64,
}

/// カルテ Excel 1 ファイル分のパース結果
///
/// emissions は 部門名 → (年度 → 排出量) の二段マップ。
/// JSON 化した際に順序が安定するよう BTreeMap を使う。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalityEmissions {
    /// 団体コード
    pub city_code: String,
    /// 自治体名
    pub city_name: String,
    /// データが存在する年度（昇順）
    pub years: Vec<i32>,
    /// 部門別・年度別排出量（千t-CO₂）
    pub emissions: BTreeMap<String, BTreeMap<i32, f64>>,
}

impl MunicipalityEmissions {
    /// 指定年度の全部門合計排出量を計算する（小数第 2 位に丸め）
    ///
    /// # 引数
    /// - year: 対象年度
    ///
    /// # 戻り値
    /// - 合計排出量（千t-CO₂）。該当年度のデータがない部門は無視する
    pub fn total_for_year(&self, year: i32) -> f64 {
        let total: f64 = self
            .emissions
            .values()
            .filter_map(|yearly| yearly.get(&year))
            .sum();
        (total * 100.0).round() / 100.0
    }

    /// 部門別・年度別レコードのフラットな列へ展開する
    pub fn to_records(&self) -> Vec<EmissionRecord> {
        let mut records = Vec::new();
        for (sector, yearly) in &self.emissions {
            for (&year, &value) in yearly {
                records.push(EmissionRecord {
                    city_code: self.city_code.clone(),
                    fiscal_year: year,
                    sector: sector.clone(),
                    value_kt_co2: value,
                });
            }
        }
        records
    }
}
