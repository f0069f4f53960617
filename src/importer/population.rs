// ==========================================
// 自治体排出量カルテ ETL - 人口・面積 CSV
// ==========================================
// 入力形式: city_code,population,area_km2 のヘッダ付き CSV
// （統計局「統計でみる市区町村のすがた」から抽出済みのもの）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// 人口・面積 CSV の 1 行
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRecord {
    /// 団体コード（5桁）
    pub city_code: String,
    /// 人口
    pub population: Option<i64>,
    /// 面積（km²）
    pub area_km2: Option<f64>,
}

// ==========================================
// PopulationCsv - 人口・面積ローダ
// ==========================================
pub struct PopulationCsv;

impl PopulationCsv {
    /// 人口・面積 CSV を読み込む
    ///
    /// # 引数
    /// - path: CSV ファイルパス
    ///
    /// # 戻り値
    /// - Ok(Vec<PopulationRecord>): 団体コードが 5 桁数字の行のみ
    /// - Err: ファイル不在 / 必須カラム欠落 / 数値変換失敗
    pub fn load<P: AsRef<Path>>(path: P) -> ImportResult<Vec<PopulationRecord>> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers = reader.headers()?.clone();
        let col_city_code = headers
            .iter()
            .position(|h| h.trim() == "city_code")
            .ok_or_else(|| ImportError::MissingColumn("city_code".to_string()))?;
        let col_population = headers
            .iter()
            .position(|h| h.trim() == "population")
            .ok_or_else(|| ImportError::MissingColumn("population".to_string()))?;
        // 面積カラムは任意
        let col_area = headers.iter().position(|h| h.trim() == "area_km2");

        let mut records = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;

            let city_code = record.get(col_city_code).unwrap_or("").trim().to_string();
            // 統計票由来の小計行などを除くため、5 桁数字のみ採用
            if city_code.len() != 5 || !city_code.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }

            let population =
                parse_optional_i64(record.get(col_population), row_idx, "population")?;
            let area_km2 = match col_area {
                Some(col) => parse_optional_f64(record.get(col), row_idx, "area_km2")?,
                None => None,
            };

            records.push(PopulationRecord {
                city_code,
                population,
                area_km2,
            });
        }

        Ok(records)
    }
}

/// 空欄は None、それ以外は桁区切りカンマを除去してから整数として解釈する
fn parse_optional_i64(value: Option<&str>, row: usize, column: &str) -> ImportResult<Option<i64>> {
    let value = value.unwrap_or("").trim().replace(',', "");
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| ImportError::NumberParseError {
            row,
            column: column.to_string(),
            value,
        })
}

fn parse_optional_f64(value: Option<&str>, row: usize, column: &str) -> ImportResult<Option<f64>> {
    let value = value.unwrap_or("").trim().replace(',', "");
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ImportError::NumberParseError {
            row,
            column: column.to_string(),
            value,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_population_csv() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "city_code,population,area_km2").unwrap();
        writeln!(temp_file, "13101,\"66,680\",11.66").unwrap();
        writeln!(temp_file, "13201,579355,186.38").unwrap();

        let records = PopulationCsv::load(temp_file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].city_code, "13101");
        assert_eq!(records[0].population, Some(66_680));
        assert_eq!(records[0].area_km2, Some(11.66));
    }

    #[test]
    fn test_load_skips_non_city_code_rows() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "city_code,population,area_km2").unwrap();
        writeln!(temp_file, "合計,14000000,2194.05").unwrap();
        writeln!(temp_file, "13101,66680,11.66").unwrap();

        let records = PopulationCsv::load(temp_file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].city_code, "13101");
    }

    #[test]
    fn test_load_empty_cells_become_none() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "city_code,population,area_km2").unwrap();
        writeln!(temp_file, "13101,,").unwrap();

        let records = PopulationCsv::load(temp_file.path()).unwrap();
        assert_eq!(records[0].population, None);
        assert_eq!(records[0].area_km2, None);
    }

    #[test]
    fn test_load_invalid_number_fails() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "city_code,population").unwrap();
        writeln!(temp_file, "13101,abc").unwrap();

        let result = PopulationCsv::load(temp_file.path());
        assert!(matches!(
            result,
            Err(ImportError::NumberParseError { column, .. }) if column == "population"
        ));
    }
}
