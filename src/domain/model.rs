//! 诊断域模型：节点元数据、写入验证条目与结果分类。
//!
//! 约束：
//! - 每个表项在一次运行中恰好产生一条 `WriteOutcome`，输出顺序与表顺序一致
//! - `Mismatch` 是分类结果而不是错误：回读成功但超出容差时仍然正常推进
//! - 结果仅用于本次运行的控制台展示，不做持久化

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 节点展示用元数据（探索器一行输出所需的三元组）。
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub node_id: String,
    pub browse_name: String,
    pub display_name: String,
}

/// 写入验证表项：点位路径（`Parent.Child`）与测试值。
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VariableSpec {
    pub path: String,
    pub test_value: f64,
}

impl VariableSpec {
    pub fn new(path: &str, test_value: f64) -> Self {
        Self {
            path: path.to_string(),
            test_value,
        }
    }

    /// 子节点限定名：取路径最后一段并加命名空间前缀，如 `TT_11006.SetHH` -> `1:SetHH`。
    /// 无点号时整个路径视为子节点名。
    pub fn child_alias(&self, namespace: u16) -> String {
        let leaf = self.path.rsplit('.').next().unwrap_or(self.path.as_str());
        format!("{namespace}:{leaf}")
    }
}

/// 单个点位的写入验证分类。
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum WriteQuality {
    Verified,
    Mismatch,
    ResolveError,
    ReadError,
    WriteError,
}

/// 单个点位的写入验证结果。
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    pub path: String,
    /// 写入前回读到的旧值（读取失败时为 None，不影响后续步骤）
    pub prior: Option<f64>,
    pub written: f64,
    /// 写入并等待 settle 后回读到的值
    pub observed: Option<f64>,
    pub quality: WriteQuality,
    pub error_message: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u32,
}

impl WriteOutcome {
    pub fn verified(&self) -> bool {
        self.quality == WriteQuality::Verified
    }
}

/// 一次验证运行的汇总计数。
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyStats {
    pub total: u32,
    pub verified: u32,
    pub mismatch: u32,
    pub resolve_error: u32,
    pub read_error: u32,
    pub write_error: u32,
}

impl VerifyStats {
    pub fn from_outcomes(outcomes: &[WriteOutcome]) -> Self {
        let mut stats = VerifyStats {
            total: 0,
            verified: 0,
            mismatch: 0,
            resolve_error: 0,
            read_error: 0,
            write_error: 0,
        };

        for outcome in outcomes {
            stats.total += 1;
            match outcome.quality {
                WriteQuality::Verified => stats.verified += 1,
                WriteQuality::Mismatch => stats.mismatch += 1,
                WriteQuality::ResolveError => stats.resolve_error += 1,
                WriteQuality::ReadError => stats.read_error += 1,
                WriteQuality::WriteError => stats.write_error += 1,
            }
        }

        stats
    }

    pub fn all_verified(&self) -> bool {
        self.total > 0 && self.verified == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(quality: WriteQuality) -> WriteOutcome {
        WriteOutcome {
            path: "TT_11006.SetHH".to_string(),
            prior: None,
            written: 200.0,
            observed: None,
            quality,
            error_message: String::new(),
            timestamp: Utc::now(),
            duration_ms: 0,
        }
    }

    #[test]
    fn child_alias_uses_last_segment_with_namespace() {
        let spec = VariableSpec::new("TT_11006.SetHH", 200.0);
        assert_eq!(spec.child_alias(1), "1:SetHH");

        let bare = VariableSpec::new("SIM_Value", 75.0);
        assert_eq!(bare.child_alias(2), "2:SIM_Value");
    }

    #[test]
    fn stats_count_each_quality_once() {
        let outcomes = vec![
            outcome(WriteQuality::Verified),
            outcome(WriteQuality::Mismatch),
            outcome(WriteQuality::ResolveError),
            outcome(WriteQuality::Verified),
        ];
        let stats = VerifyStats::from_outcomes(&outcomes);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.verified, 2);
        assert_eq!(stats.mismatch, 1);
        assert_eq!(stats.resolve_error, 1);
        assert_eq!(stats.read_error, 0);
        assert!(!stats.all_verified());
    }

    #[test]
    fn all_verified_requires_nonempty_run() {
        let stats = VerifyStats::from_outcomes(&[]);
        assert!(!stats.all_verified());

        let stats = VerifyStats::from_outcomes(&[outcome(WriteQuality::Verified)]);
        assert!(stats.all_verified());
    }
}
