// ==========================================
// 自治体排出量カルテ ETL - 自治体マスター
// ==========================================
// 団体コード（5桁）をキーとする自治体の基本情報
// ==========================================

use serde::{Deserialize, Serialize};

/// 自治体マスター
///
/// 人口・面積は統計局データの投入後に埋まる（投入前は None）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Municipality {
    /// 団体コード（5桁、例: "13101"）
    pub city_code: String,
    /// 自治体名
    pub name: String,
    /// 都道府県コード（2桁）
    pub prefecture_code: String,
    /// 都道府県名
    pub prefecture_name: String,
    /// 都道府県スラッグ（URL 用、例: "tokyo"）
    pub prefecture_slug: String,
    /// 地域区分（特別区 / 多摩地域 など）
    pub region: String,
    /// 人口
    pub population: Option<i64>,
    /// 面積（km²）
    pub area_km2: Option<f64>,
    /// ゼロカーボンシティ宣言済みか
    pub zero_carbon_declared: bool,
    /// 宣言した年
    pub zero_carbon_year: Option<i32>,
}

impl Municipality {
    /// レジストリ CSV の 1 行から自治体マスターを組み立てる
    ///
    /// # 引数
    /// - city_code: 団体コード
    /// - name: 自治体名
    /// - region: 地域区分
    /// - prefecture: 都道府県情報（コード, 名称, スラッグ）
    pub fn from_registry(
        city_code: &str,
        name: &str,
        region: &str,
        prefecture: (&str, &str, &str),
    ) -> Self {
        Self {
            city_code: city_code.to_string(),
            name: name.to_string(),
            prefecture_code: prefecture.0.to_string(),
            prefecture_name: prefecture.1.to_string(),
            prefecture_slug: prefecture.2.to_string(),
            region: region.to_string(),
            population: None,
            area_km2: None,
            zero_carbon_declared: false,
            zero_carbon_year: None,
        }
    }
}
