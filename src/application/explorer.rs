//! 地址空间探索器：带深度上限的递归遍历，按显示名子串过滤入口。
//!
//! 约束（执行要求）：
//! - 超过 `max_depth` 的节点一律不访问（level 从 0 开始计）
//! - 单个节点/子树的失败只打印诊断行，不中断兄弟与祖先的遍历
//! - 地址空间可能含回边：递归前按 NodeId 做访问守卫，重复节点静默跳过

use std::collections::HashSet;
use std::io::Write;

use anyhow::{Context, Result};
use log::debug;

use crate::config::DiagConfig;
use crate::domain::model::NodeInfo;
use crate::ports::session::{UaNode, UaSession};

pub struct Explorer<'a, S: UaSession> {
    session: &'a S,
    config: &'a DiagConfig,
}

impl<'a, S: UaSession> Explorer<'a, S> {
    pub fn new(session: &'a S, config: &'a DiagConfig) -> Self {
        Self { session, config }
    }

    /// 顶层驱动：Root -> 入口节点 -> 枚举子节点，显示名命中子串的进入递归。
    /// 只有入口解析/枚举失败才向上传播；单个子节点的失败打印后跳过。
    pub fn run<W: Write>(&self, out: &mut W) -> Result<()> {
        let root = self
            .session
            .root_node()
            .context("root folder unavailable")?;
        let entry = root
            .child(&self.config.entry_path)
            .with_context(|| format!("entry path {} unresolved", self.config.entry_path))?;
        let children = entry
            .children()
            .with_context(|| format!("cannot enumerate {}", self.config.entry_path))?;

        writeln!(
            out,
            "scanning {} for '{}'",
            self.config.entry_path, self.config.target_substring
        )?;

        for child in &children {
            let display_name = match child.display_name() {
                Ok(name) => name,
                Err(err) => {
                    // 单个子节点读不出显示名：跳过它，不影响其余子节点
                    writeln!(out, "[skip] {}: {err}", child.node_id())?;
                    continue;
                }
            };
            if !display_name.contains(&self.config.target_substring) {
                continue;
            }

            writeln!(out)?;
            writeln!(out, "[hit] {display_name}")?;
            let mut visited = HashSet::new();
            self.explore(out, child, 0, &mut visited)?;
        }

        Ok(())
    }

    /// 递归打印一个子树。返回的 Err 只来自输出流本身；
    /// 会话层失败全部转成 `[fail]` 诊断行并就地停住当前子树。
    pub fn explore<W: Write>(
        &self,
        out: &mut W,
        node: &S::Node,
        level: u32,
        visited: &mut HashSet<String>,
    ) -> Result<()> {
        let node_id = node.node_id();
        if !visited.insert(node_id.clone()) {
            debug!("skip revisited node {node_id}");
            return Ok(());
        }

        let indent = "  ".repeat(level as usize);
        let metadata = node.display_name().and_then(|display_name| {
            node.browse_name().map(|browse_name| NodeInfo {
                node_id: node_id.clone(),
                browse_name,
                display_name,
            })
        });
        let info = match metadata {
            Ok(info) => info,
            Err(err) => {
                writeln!(out, "{indent}[fail] {node_id}: {err}")?;
                return Ok(());
            }
        };

        writeln!(
            out,
            "{indent}{} (BrowseName: {}, NodeId: {})",
            info.display_name, info.browse_name, info.node_id
        )?;

        if level < self.config.max_depth {
            match node.children() {
                Ok(children) => {
                    for child in &children {
                        self.explore(out, child, level + 1, visited)?;
                    }
                }
                Err(err) => {
                    writeln!(out, "{indent}  [fail] children of {}: {err}", info.display_name)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::adapters::mock::MockSession;

    fn run_explorer(session: &MockSession) -> String {
        let config = DiagConfig::default();
        let mut out = Vec::new();
        Explorer::new(session, &config).run(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    /// Objects 下挂一个命中过滤子串的入口节点，返回其编号。
    fn hit_node(session: &MockSession) -> usize {
        session.add_node(session.objects_id(), "1:TT_11006", "TT_11006")
    }

    #[test]
    fn nodes_past_the_depth_bound_are_never_visited() {
        let session = MockSession::new();
        let tt = hit_node(&session);
        let d1 = session.add_node(tt, "1:D1", "D1");
        let d2 = session.add_node(d1, "1:D2", "D2");
        let d3 = session.add_node(d2, "1:D3", "D3");
        session.add_node(d3, "1:D4", "D4");

        let output = run_explorer(&session);
        assert!(output.contains("D3 (BrowseName: 1:D3"));
        assert!(!output.contains("D4"));
    }

    #[test]
    fn children_without_the_substring_are_not_explored() {
        let session = MockSession::new();
        hit_node(&session);
        let other = session.add_node(session.objects_id(), "1:PT_11007", "PT_11007");
        session.add_node(other, "1:Hidden", "Hidden");

        let output = run_explorer(&session);
        assert!(output.contains("[hit] TT_11006"));
        assert!(!output.contains("PT_11007 (BrowseName:"));
        assert!(!output.contains("Hidden"));
    }

    #[test]
    fn metadata_failure_stops_only_that_subtree() {
        let session = MockSession::new();
        let tt = hit_node(&session);
        let broken = session.add_node(tt, "1:Broken", "Broken");
        session.add_node(broken, "1:Unreachable", "Unreachable");
        session.add_node(tt, "1:Sibling", "Sibling");
        session.fail_metadata(broken);

        let output = run_explorer(&session);
        assert!(output.contains("[fail]"));
        assert!(!output.contains("Unreachable"));
        assert!(output.contains("Sibling (BrowseName: 1:Sibling"));
    }

    #[test]
    fn children_failure_is_reported_after_the_node_line() {
        let session = MockSession::new();
        let tt = hit_node(&session);
        session.fail_children(tt);

        let output = run_explorer(&session);
        let node_line = output.find("TT_11006 (BrowseName:").unwrap();
        let fail_line = output.find("[fail] children of TT_11006").unwrap();
        assert!(node_line < fail_line);
    }

    #[test]
    fn back_edges_do_not_produce_duplicate_visits() {
        let session = MockSession::new();
        let tt = hit_node(&session);
        let d1 = session.add_node(tt, "1:D1", "D1");
        session.add_edge(d1, tt);

        let output = run_explorer(&session);
        assert_eq!(output.matches("TT_11006 (BrowseName:").count(), 1);
        assert_eq!(output.matches("D1 (BrowseName:").count(), 1);
    }

    #[test]
    fn unreadable_direct_child_is_skipped_not_fatal() {
        let session = MockSession::new();
        let broken = session.add_node(session.objects_id(), "1:Broken", "Broken");
        session.fail_metadata(broken);
        hit_node(&session);

        let output = run_explorer(&session);
        assert!(output.contains("[skip]"));
        assert!(output.contains("[hit] TT_11006"));
    }

    #[test]
    fn line_format_shows_display_browse_and_node_id() {
        let session = MockSession::new();
        hit_node(&session);

        let output = run_explorer(&session);
        assert!(output.contains("TT_11006 (BrowseName: 1:TT_11006, NodeId: ns=1;i="));
    }
}
