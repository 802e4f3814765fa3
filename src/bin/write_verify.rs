//! 写入验证入口：对内置点位表做写后回读验证并打印逐点结果。
//! 用法：`write_verify [config.json]`。
//! 退出码只反映连接生命周期：连接/顶层失败为 1，逐点验证失败不改变退出码。

use std::env;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use opcua_diag::{run_with_session, DiagConfig, OpcUaSession, WriteVerifier};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => DiagConfig::load_from_file(Path::new(path))?,
        None => DiagConfig::default(),
    };

    let mut out = io::stdout().lock();
    writeln!(out, "OPC-UA write verification")?;
    writeln!(out, "{}", "=".repeat(50))?;

    let session = OpcUaSession::connect(&config.endpoint_url)
        .with_context(|| format!("connect failed: {}", config.endpoint_url))?;
    writeln!(out, "connected to {}", config.endpoint_url)?;

    let result = run_with_session(session, |session| {
        WriteVerifier::new(session, &config).run(&mut out)
    });
    writeln!(out, "disconnected")?;

    let (_outcomes, _stats) = result?;
    Ok(())
}
