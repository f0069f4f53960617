// ==========================================
// 自治体排出量カルテ ETL - インポート層
// ==========================================
// 職責: 外部データ（Excel / CSV）を読み込み、内部データを生成する
// ==========================================

// モジュール宣言
pub mod error;
pub mod karte;
pub mod population;
pub mod registry;

// コア型の再エクスポート
pub use error::{ImportError, ImportResult};
pub use karte::KarteExcelParser;
pub use population::{PopulationCsv, PopulationRecord};
pub use registry::{MunicipalityRegistry, RegistryEntry};
