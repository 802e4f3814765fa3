//! OPC-UA 网关诊断工具核心库。
//! 职责：地址空间探索（带深度上限的递归遍历）与写入验证（写后回读 + 容差比较）。
//! Non-goals: 订阅/事件、安全策略协商、多服务器发现（由上层或其他工具处理）。

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::mock::MockSession;
pub use adapters::opcua_client::OpcUaSession;
pub use application::explorer::Explorer;
pub use application::run_with_session;
pub use application::verify::WriteVerifier;
pub use config::DiagConfig;
pub use domain::model::{NodeInfo, VariableSpec, VerifyStats, WriteOutcome, WriteQuality};
pub use ports::session::{SessionError, TypedValue, UaNode, UaSession};
