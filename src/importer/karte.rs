// ==========================================
// 自治体排出量カルテ ETL - カルテ Excel パーサ
// ==========================================
// 入力: 環境省「自治体排出量カルテ」({city_code}.xlsx)
// レイアウト（固定）:
// - シート「データシート1」
// - 8行目がヘッダ、9行目以降がデータ
// - 5列目: 西暦 / 7列目: 団体コード / 10〜19列目: 部門別排出量（千t-CO₂）
// ==========================================

use crate::domain::MunicipalityEmissions;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// カルテのデータシート名
pub const SHEET_NAME: &str = "データシート1";

// 以下はすべて 0 ベースの行・列インデックス
const HEADER_ROW: u32 = 7; // 8行目
const DATA_START_ROW: u32 = 8; // 9行目
const COL_YEAR: u32 = 4; // 5列目: 西暦
const COL_CITY_CODE: u32 = 6; // 7列目: 団体コード
const COL_DATA_START: u32 = 9; // 10列目: 排出量データ開始（製造業から）
const SECTOR_COL_COUNT: u32 = 10; // 10〜19列目のみが排出量データ

// ==========================================
// KarteExcelParser - カルテ Excel パーサ
// ==========================================
pub struct KarteExcelParser;

impl KarteExcelParser {
    /// カルテ Excel 1 ファイルをパースして排出量データを抽出する
    ///
    /// # 引数
    /// - file_path: Excel ファイルパス
    /// - city_code: 団体コード（この値と一致する行のみ抽出）
    /// - city_name: 自治体名
    ///
    /// # 戻り値
    /// - Ok(MunicipalityEmissions): 部門別・年度別排出量
    /// - Err: ファイル不在 / シート不在 / データ行なし / 解析失敗
    pub fn parse<P: AsRef<Path>>(
        file_path: P,
        city_code: &str,
        city_name: &str,
    ) -> ImportResult<MunicipalityEmissions> {
        let path = file_path.as_ref();

        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext != "xlsx" {
            return Err(ImportError::UnsupportedFormat(ext.to_string()));
        }

        let mut workbook: Xlsx<_> = open_workbook(path)?;

        if !workbook.sheet_names().iter().any(|s| s == SHEET_NAME) {
            return Err(ImportError::SheetNotFound {
                city_code: city_code.to_string(),
                sheet: SHEET_NAME.to_string(),
            });
        }

        let range = workbook.worksheet_range(SHEET_NAME)?;

        // ヘッダ行から部門名を取得（排出量データの 10 列のみ）
        let mut sectors: Vec<(u32, String)> = Vec::new();
        for col in COL_DATA_START..COL_DATA_START + SECTOR_COL_COUNT {
            if let Some(header) = range.get_value((HEADER_ROW, col)) {
                let raw = cell_to_string(header);
                if !raw.is_empty() {
                    sectors.push((col, normalize_sector(&raw)));
                }
            }
        }

        // データ行を走査して、団体コードが一致する行のみ取り込む
        let mut emissions: BTreeMap<String, BTreeMap<i32, f64>> = BTreeMap::new();
        let mut years_set: BTreeSet<i32> = BTreeSet::new();

        let end_row = range.end().map(|(row, _)| row).unwrap_or(0);
        for row in DATA_START_ROW..=end_row {
            let row_city_code = range
                .get_value((row, COL_CITY_CODE))
                .map(cell_to_string)
                .unwrap_or_default();
            if row_city_code != city_code {
                continue;
            }

            let year = match range.get_value((row, COL_YEAR)).and_then(cell_to_f64) {
                Some(y) => y as i32,
                None => continue,
            };
            years_set.insert(year);

            for (col, sector_name) in &sectors {
                if let Some(value) = range.get_value((row, *col)).and_then(cell_to_f64) {
                    emissions
                        .entry(sector_name.clone())
                        .or_default()
                        .insert(year, value);
                }
            }
        }

        if years_set.is_empty() {
            return Err(ImportError::NoEmissionRows(city_code.to_string()));
        }

        Ok(MunicipalityEmissions {
            city_code: city_code.to_string(),
            city_name: city_name.to_string(),
            years: years_set.into_iter().collect(),
            emissions,
        })
    }
}

/// ヘッダの生文字列を正規部門名に変換する
///
/// "aa_製造業部門" → "製造業" のように接頭辞・「部門」を除去した上で、
/// カルテの表記ゆれを簡易マッピングで吸収する
pub(crate) fn normalize_sector(raw: &str) -> String {
    let name = raw.replace("aa_", "").replace("部門", "");

    if name.contains("製造") {
        "製造業".to_string()
    } else if name.contains("建設") || name.contains("鉱業") {
        "建設業".to_string()
    } else if name.contains("農林") || name.contains("農業") {
        "農林水産業".to_string()
    } else if name.contains("業務") {
        "業務その他".to_string()
    } else if name.contains("家庭") {
        "家庭".to_string()
    } else if name.contains("旅客") || name.contains("自動車") {
        "旅客".to_string()
    } else if name.contains("貨物") {
        "貨物".to_string()
    } else if name.contains("鉄道") {
        "鉄道".to_string()
    } else if name.contains("船舶") {
        "船舶".to_string()
    } else if name.contains("廃棄") {
        "廃棄物".to_string()
    } else {
        name
    }
}

/// セル値を文字列化する（団体コード比較用）
///
/// 団体コードは数値セルで入っていることがあるため、整数値は小数点なしで整形する
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        _ => String::new(),
    }
}

/// セル値を f64 化する（年度・排出量用）
fn cell_to_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_not_found() {
        let result = KarteExcelParser::parse("no_such_karte.xlsx", "13101", "千代田区");
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_rejects_unsupported_extension() {
        // 拡張子チェックは存在チェックの後
        let temp_file = tempfile::Builder::new()
            .suffix(".xls")
            .tempfile()
            .unwrap();
        let result = KarteExcelParser::parse(temp_file.path(), "13101", "千代田区");
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_normalize_sector_strips_prefix_and_suffix() {
        assert_eq!(normalize_sector("aa_製造業部門"), "製造業");
        assert_eq!(normalize_sector("家庭部門"), "家庭");
    }

    #[test]
    fn test_normalize_sector_maps_variants() {
        assert_eq!(normalize_sector("建設業・鉱業"), "建設業");
        assert_eq!(normalize_sector("農林水産業"), "農林水産業");
        assert_eq!(normalize_sector("業務その他"), "業務その他");
        assert_eq!(normalize_sector("自動車（旅客）"), "旅客");
        // 「自動車」を含む表記は貨物判定より先に旅客へ寄せる
        assert_eq!(normalize_sector("貨物自動車"), "旅客");
        assert_eq!(normalize_sector("貨物"), "貨物");
    }

    #[test]
    fn test_normalize_sector_passthrough_for_unknown() {
        assert_eq!(normalize_sector("aa_エネルギー転換"), "エネルギー転換");
    }

    #[test]
    fn test_cell_to_string_formats_numeric_city_code() {
        assert_eq!(cell_to_string(&Data::Float(13101.0)), "13101");
        assert_eq!(cell_to_string(&Data::String(" 13101 ".to_string())), "13101");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn test_cell_to_f64_variants() {
        assert_eq!(cell_to_f64(&Data::Float(12.5)), Some(12.5));
        assert_eq!(cell_to_f64(&Data::Int(7)), Some(7.0));
        assert_eq!(cell_to_f64(&Data::String("3.25".to_string())), Some(3.25));
        assert_eq!(cell_to_f64(&Data::String("n/a".to_string())), None);
        assert_eq!(cell_to_f64(&Data::Empty), None);
    }
}
