// ==========================================
// 自治体排出量カルテ ETL - ドメイン型定義
// ==========================================
// シリアライズ形式: kebab-case（データベース / JSON と一致）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 進捗ステータス (Status)
// ==========================================
// ペース達成率から導出される三段階判定
// 閾値: >=100 on-track / >=80 at-risk / それ未満 off-track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    OnTrack,  // 目標ペース達成
    AtRisk,   // 達成ペースに届かない恐れ
    OffTrack, // 目標ペースから大きく乖離
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::OnTrack => write!(f, "on-track"),
            Status::AtRisk => write!(f, "at-risk"),
            Status::OffTrack => write!(f, "off-track"),
        }
    }
}

impl Status {
    /// 文字列からステータスを解析する
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "on-track" => Status::OnTrack,
            "at-risk" => Status::AtRisk,
            _ => Status::OffTrack, // デフォルト値
        }
    }

    /// データベース格納用の文字列に変換する
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Status::OnTrack => "on-track",
            Status::AtRisk => "at-risk",
            Status::OffTrack => "off-track",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for s in [Status::OnTrack, Status::AtRisk, Status::OffTrack] {
            assert_eq!(Status::from_str(s.to_db_str()), s);
        }
    }

    #[test]
    fn test_status_unknown_defaults_to_off_track() {
        assert_eq!(Status::from_str("unknown"), Status::OffTrack);
    }
}
