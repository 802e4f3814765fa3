//! 诊断运行配置：集中管理内置默认值，支持 JSON 覆盖文件。
//! 说明：默认值即可直接对本地网关跑一次快速诊断，不需要任何命令行参数；
//! 覆盖文件按字段合并（缺省字段回落到默认值）。

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::model::VariableSpec;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagConfig {
    /// 网关端点
    pub endpoint_url: String,
    /// 探索入口：Root 下的限定路径
    pub entry_path: String,
    /// 探索过滤：显示名包含该子串的子节点才进入递归
    pub target_substring: String,
    /// 递归深度上限（相对起点，level 从 0 开始）
    pub max_depth: u32,
    /// 验证父节点：Objects 下的限定路径
    pub parent_path: String,
    /// 子节点别名使用的命名空间索引
    pub namespace: u16,
    /// 写后回读前的等待时间。服务器端应用写入是异步的，立即回读不可靠。
    pub settle_ms: u64,
    /// 验证用绝对容差
    pub tolerance: f64,
    /// 写入验证表
    pub variables: Vec<VariableSpec>,
    /// 末尾整表回读的点位名（仅展示，不参与验证）
    pub readback: Vec<String>,
}

impl Default for DiagConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "opc.tcp://localhost:4840".to_string(),
            entry_path: "0:Objects".to_string(),
            target_substring: "TT_11006".to_string(),
            max_depth: 3,
            parent_path: "1:TT_11006".to_string(),
            namespace: 1,
            settle_ms: 500,
            tolerance: 0.01,
            variables: vec![
                VariableSpec::new("TT_11006.SetHH", 200.0),
                VariableSpec::new("TT_11006.SetH", 150.0),
                VariableSpec::new("TT_11006.SetL", 50.0),
                VariableSpec::new("TT_11006.SetLL", 25.0),
                VariableSpec::new("TT_11006.SIM_Value", 75.0),
            ],
            readback: [
                "Input", "SetHH", "SetH", "SetL", "SetLL", "SIM_Value", "PV", "min", "max",
                "percent",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl DiagConfig {
    /// 从 JSON 覆盖文件加载；文件不存在时返回默认配置。
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read diag config from: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse diag config JSON from: {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builtin_diagnostic_table() {
        let config = DiagConfig::default();
        assert_eq!(config.endpoint_url, "opc.tcp://localhost:4840");
        assert_eq!(config.entry_path, "0:Objects");
        assert_eq!(config.parent_path, "1:TT_11006");
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.settle_ms, 500);
        assert_eq!(config.tolerance, 0.01);
        assert_eq!(config.variables.len(), 5);
        assert_eq!(config.variables[0], VariableSpec::new("TT_11006.SetHH", 200.0));
        assert_eq!(config.readback.len(), 10);
        assert_eq!(config.readback[0], "Input");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = DiagConfig::load_from_file(Path::new("no-such-diag-config.json")).unwrap();
        assert_eq!(config, DiagConfig::default());
    }

    #[test]
    fn partial_override_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.json");
        fs::write(
            &path,
            r#"{"endpointUrl":"opc.tcp://10.0.0.5:4840","settleMs":100}"#,
        )
        .unwrap();

        let config = DiagConfig::load_from_file(&path).unwrap();
        assert_eq!(config.endpoint_url, "opc.tcp://10.0.0.5:4840");
        assert_eq!(config.settle_ms, 100);
        assert_eq!(config.variables, DiagConfig::default().variables);
    }

    #[test]
    fn invalid_json_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.json");
        fs::write(&path, "not json").unwrap();

        let err = DiagConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("diag.json"));
    }
}
