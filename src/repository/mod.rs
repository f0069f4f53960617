// ==========================================
// 自治体排出量カルテ ETL - リポジトリ層
// ==========================================
// 職責: データアクセスインターフェースの提供、データベース詳細の隠蔽
// 制約: すべてのクエリはパラメータ化し SQL インジェクションを防ぐ
// 制約: 業務ロジック（KPI 計算・コホート構成）は含まない
// ==========================================

pub mod emission_repo;
pub mod error;
pub mod kpi_repo;
pub mod municipality_repo;
pub mod seed_run_repo;

// コアリポジトリの再エクスポート
pub use emission_repo::EmissionRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use kpi_repo::KpiRepository;
pub use municipality_repo::MunicipalityRepository;
pub use seed_run_repo::SeedRunRepository;
