// ==========================================
// 自治体排出量カルテ ETL - ドメインモデル層
// ==========================================
// 職責: エンティティ・型の定義
// 制約: データアクセスロジック・計算ロジックを含まない
// ==========================================

pub mod emission;
pub mod kpi;
pub mod municipality;
pub mod types;

// コア型の再エクスポート
pub use emission::{EmissionRecord, MunicipalityEmissions};
pub use kpi::{MunicipalityKpi, PrefectureKpi, SeedRun};
pub use municipality::Municipality;
pub use types::Status;
