//! 地址空间探索入口：连接网关，打印命中子串的子树。
//! 用法：`explore_server [config.json]`，无参数时使用内置默认配置。

use std::env;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use opcua_diag::{run_with_session, DiagConfig, Explorer, OpcUaSession};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => DiagConfig::load_from_file(Path::new(path))?,
        None => DiagConfig::default(),
    };

    let mut out = io::stdout().lock();
    writeln!(out, "OPC-UA address space explorer")?;
    writeln!(out, "{}", "=".repeat(50))?;

    let session = OpcUaSession::connect(&config.endpoint_url)
        .with_context(|| format!("connect failed: {}", config.endpoint_url))?;
    writeln!(out, "connected to {}", config.endpoint_url)?;

    let result = run_with_session(session, |session| {
        Explorer::new(session, &config).run(&mut out)
    });
    writeln!(out, "disconnected")?;
    result
}
