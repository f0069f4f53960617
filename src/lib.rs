// ==========================================
// 自治体排出量カルテ ETL - コアライブラリ
// ==========================================
// 対象データ: 環境省「自治体排出量カルテ」Excel ファイル
// 技術スタック: Rust + SQLite
// 実行形態: 手動起動のバッチスクリプト群（常駐サービスなし）
// ==========================================

// ==========================================
// モジュール宣言
// ==========================================

// ドメイン層 - エンティティと型
pub mod domain;

// KPI エンジン - 純粋関数による気候目標KPI算出
pub mod kpi;

// インポート層 - 外部データの読み込み
pub mod importer;

// ダウンローダ - カルテ Excel の一括取得
pub mod downloader;

// リポジトリ層 - データアクセス
pub mod repository;

// シーダ層 - KPI 算出と投入のオーケストレーション
pub mod seeder;

// 設定層 - パイプライン設定
pub mod config;

// データベース基盤（接続初期化 / PRAGMA / スキーマ統一）
pub mod db;

// ログシステム
pub mod logging;

// ==========================================
// コア型の再エクスポート
// ==========================================

// ドメイン型
pub use domain::types::Status;

// ドメインエンティティ
pub use domain::{
    EmissionRecord, Municipality, MunicipalityEmissions, MunicipalityKpi, PrefectureKpi, SeedRun,
};

// KPI エンジン
pub use kpi::KpiEngine;

// 設定
pub use config::PipelineConfig;

/// クレートバージョン
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
