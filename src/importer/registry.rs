// ==========================================
// 自治体排出量カルテ ETL - 自治体レジストリ CSV
// ==========================================
// 入力形式: city_code,name,region のヘッダ付き CSV
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// レジストリ CSV の 1 行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// 団体コード（5桁）
    pub city_code: String,
    /// 自治体名
    pub name: String,
    /// 地域区分
    pub region: String,
}

// ==========================================
// MunicipalityRegistry - レジストリローダ
// ==========================================
pub struct MunicipalityRegistry;

impl MunicipalityRegistry {
    /// レジストリ CSV を読み込む
    ///
    /// # 引数
    /// - path: CSV ファイルパス
    ///
    /// # 戻り値
    /// - Ok(Vec<RegistryEntry>): ファイル記載順のエントリ列
    /// - Err: ファイル不在 / 必須カラム欠落 / CSV 解析失敗
    pub fn load<P: AsRef<Path>>(path: P) -> ImportResult<Vec<RegistryEntry>> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        // ヘッダからカラム位置を解決
        let headers = reader.headers()?.clone();
        let col_city_code = Self::find_column(&headers, "city_code")?;
        let col_name = Self::find_column(&headers, "name")?;
        let col_region = Self::find_column(&headers, "region")?;

        let mut entries = Vec::new();
        for result in reader.records() {
            let record = result?;

            let city_code = record.get(col_city_code).unwrap_or("").trim().to_string();
            let name = record.get(col_name).unwrap_or("").trim().to_string();
            let region = record.get(col_region).unwrap_or("").trim().to_string();

            // 完全な空行はスキップ
            if city_code.is_empty() && name.is_empty() && region.is_empty() {
                continue;
            }

            entries.push(RegistryEntry {
                city_code,
                name,
                region,
            });
        }

        Ok(entries)
    }

    fn find_column(headers: &csv::StringRecord, name: &str) -> ImportResult<usize> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ImportError::MissingColumn(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_registry() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "city_code,name,region").unwrap();
        writeln!(temp_file, "13101,千代田区,特別区").unwrap();
        writeln!(temp_file, "13201,八王子市,多摩地域").unwrap();

        let entries = MunicipalityRegistry::load(temp_file.path()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].city_code, "13101");
        assert_eq!(entries[0].name, "千代田区");
        assert_eq!(entries[1].region, "多摩地域");
    }

    #[test]
    fn test_load_skips_empty_rows() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "city_code,name,region").unwrap();
        writeln!(temp_file, "13101,千代田区,特別区").unwrap();
        writeln!(temp_file, ",,").unwrap();
        writeln!(temp_file, "13102,中央区,特別区").unwrap();

        let entries = MunicipalityRegistry::load(temp_file.path()).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_load_missing_column_fails() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "city_code,name").unwrap();
        writeln!(temp_file, "13101,千代田区").unwrap();

        let result = MunicipalityRegistry::load(temp_file.path());
        assert!(matches!(result, Err(ImportError::MissingColumn(c)) if c == "region"));
    }

    #[test]
    fn test_load_file_not_found() {
        let result = MunicipalityRegistry::load("no_such_registry.csv");
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }
}
