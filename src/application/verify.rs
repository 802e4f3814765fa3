//! 写入验证器：对固定点位表做“写入 -> 等待 -> 回读 -> 容差比较”。
//!
//! 约束（执行要求）：
//! - 每个点位严格串行走状态机：解析 -> 写前读 -> 写入 -> settle -> 回读 -> 比较
//! - 任一步失败只影响当前点位，循环推进到下一个（advance-on-failure）
//! - 写前读失败仅损失一条遥测，照常写入
//! - 容差不命中是分类结果（Mismatch），不是错误
//! - 表循环结束后对 readback 点位做一次整表回读展示，逐点隔离错误

use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use log::warn;

use crate::config::DiagConfig;
use crate::domain::model::{VariableSpec, VerifyStats, WriteOutcome, WriteQuality};
use crate::ports::session::{TypedValue, UaNode, UaSession};

pub struct WriteVerifier<'a, S: UaSession> {
    session: &'a S,
    config: &'a DiagConfig,
}

impl<'a, S: UaSession> WriteVerifier<'a, S> {
    pub fn new(session: &'a S, config: &'a DiagConfig) -> Self {
        Self { session, config }
    }

    /// 执行整张验证表并打印结果；返回逐点结果与汇总。
    /// 只有 Objects 容器不可用（连接级失败）才向上传播。
    pub fn run<W: Write>(&self, out: &mut W) -> Result<(Vec<WriteOutcome>, VerifyStats)> {
        let objects = self
            .session
            .objects_node()
            .context("objects folder unavailable")?;
        let parent = objects.child(&self.config.parent_path);

        let mut outcomes = Vec::with_capacity(self.config.variables.len());
        match &parent {
            Ok(parent_node) => {
                writeln!(out, "parent {} resolved", self.config.parent_path)?;
                for spec in &self.config.variables {
                    let outcome = self.verify_one(out, parent_node, spec)?;
                    outcomes.push(outcome);
                }
            }
            Err(err) => {
                // 父节点都找不到：整表标记 ResolveError，但运行继续走完
                writeln!(
                    out,
                    "[fail] parent {} unresolved: {err}",
                    self.config.parent_path
                )?;
                let now = Utc::now();
                for spec in &self.config.variables {
                    outcomes.push(WriteOutcome {
                        path: spec.path.clone(),
                        prior: None,
                        written: spec.test_value,
                        observed: None,
                        quality: WriteQuality::ResolveError,
                        error_message: err.to_string(),
                        timestamp: now,
                        duration_ms: 0,
                    });
                }
            }
        }

        writeln!(out)?;
        writeln!(out, "final readback:")?;
        match &parent {
            Ok(parent_node) => {
                for name in &self.config.readback {
                    let alias = format!("{}:{name}", self.config.namespace);
                    match parent_node.child(&alias).and_then(|node| node.read_value()) {
                        Ok(value) => writeln!(out, "  {name}: {value}")?,
                        Err(err) => writeln!(out, "  {name}: [fail] {err}")?,
                    }
                }
            }
            Err(_) => writeln!(out, "  [skip] parent unresolved")?,
        }

        let stats = VerifyStats::from_outcomes(&outcomes);
        writeln!(out)?;
        writeln!(
            out,
            "summary: total={} verified={} mismatch={} resolveError={} readError={} writeError={}",
            stats.total,
            stats.verified,
            stats.mismatch,
            stats.resolve_error,
            stats.read_error,
            stats.write_error
        )?;
        if !stats.all_verified() {
            warn!(
                "write verification incomplete: {}/{} verified",
                stats.verified, stats.total
            );
        }

        Ok((outcomes, stats))
    }

    /// 单点状态机。返回的 Err 只来自输出流；会话层失败都折进 outcome。
    fn verify_one<W: Write>(
        &self,
        out: &mut W,
        parent: &S::Node,
        spec: &VariableSpec,
    ) -> Result<WriteOutcome> {
        let started = Instant::now();
        let mut outcome = WriteOutcome {
            path: spec.path.clone(),
            prior: None,
            written: spec.test_value,
            observed: None,
            quality: WriteQuality::Verified,
            error_message: String::new(),
            timestamp: Utc::now(),
            duration_ms: 0,
        };

        writeln!(out)?;
        writeln!(out, "[write] {} = {:?}", spec.path, spec.test_value)?;

        let alias = spec.child_alias(self.config.namespace);
        let node = match parent.child(&alias) {
            Ok(node) => node,
            Err(err) => {
                writeln!(out, "  [fail] {} unresolved: {err}", spec.path)?;
                outcome.quality = WriteQuality::ResolveError;
                outcome.error_message = err.to_string();
                outcome.duration_ms = elapsed_ms(&started);
                return Ok(outcome);
            }
        };

        match node.read_value() {
            Ok(value) => {
                writeln!(out, "  prior: {value}")?;
                outcome.prior = value.as_f64();
            }
            Err(err) => {
                // 写前读失败只是少一条遥测，照常写入
                writeln!(out, "  prior: [fail] {err}")?;
            }
        }

        if let Err(err) = node.write_value(TypedValue::float(spec.test_value)) {
            writeln!(out, "  [fail] {} write: {err}", spec.path)?;
            outcome.quality = WriteQuality::WriteError;
            outcome.error_message = err.to_string();
            outcome.duration_ms = elapsed_ms(&started);
            return Ok(outcome);
        }

        // 服务器端应用写入是异步的，必须等 settle 再回读
        thread::sleep(Duration::from_millis(self.config.settle_ms));

        let observed = match node.read_value() {
            Ok(value) => {
                writeln!(out, "  after: {value}")?;
                value.as_f64()
            }
            Err(err) => {
                writeln!(out, "  [fail] {} read-after: {err}", spec.path)?;
                outcome.quality = WriteQuality::ReadError;
                outcome.error_message = err.to_string();
                outcome.duration_ms = elapsed_ms(&started);
                return Ok(outcome);
            }
        };
        let observed = match observed {
            Some(value) => value,
            None => {
                writeln!(out, "  [fail] {} read-after: non-numeric value", spec.path)?;
                outcome.quality = WriteQuality::ReadError;
                outcome.error_message = "non-numeric value".to_string();
                outcome.duration_ms = elapsed_ms(&started);
                return Ok(outcome);
            }
        };

        outcome.observed = Some(observed);
        if (observed - spec.test_value).abs() < self.config.tolerance {
            writeln!(
                out,
                "  [ok] {} verified: wrote {:?}, read {:?}",
                spec.path, spec.test_value, observed
            )?;
            outcome.quality = WriteQuality::Verified;
        } else {
            writeln!(
                out,
                "  [fail] {} mismatch: expected {:?}, got {:?}",
                spec.path, spec.test_value, observed
            )?;
            outcome.quality = WriteQuality::Mismatch;
        }
        outcome.duration_ms = elapsed_ms(&started);
        Ok(outcome)
    }
}

fn elapsed_ms(started: &Instant) -> u32 {
    started.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}
