//! Scout - AI 日程助理
//!
//! 入口：初始化日志、加载配置、构建生成网关与 SQLite 存储，
//! 然后跑一个逐行读 stdin 的会话循环。待确认冲突槽只活在本次会话内。

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use scout::config::load_config;
use scout::llm::build_gateway_from_config;
use scout::store::SqliteStore;
use scout::{PendingConflict, ScheduleAssistant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 单机会话只有一个本地用户
const LOCAL_USER_ID: i64 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).context("Failed to load configuration")?;

    let gateway = Arc::new(build_gateway_from_config(&cfg));
    if gateway.provider_names().is_empty() {
        tracing::warn!("no generation providers configured, pattern fallback only");
    }

    let store = Arc::new(
        SqliteStore::open(&cfg.store.path)
            .with_context(|| format!("Failed to open event store at {:?}", cfg.store.path))?,
    );

    let assistant = ScheduleAssistant::new(gateway, store, cfg.assistant.lookahead_days);

    println!("Scout schedule assistant. Type a message, or \"quit\" to exit.");

    let stdin = std::io::stdin();
    let mut pending: Option<PendingConflict> = None;
    let mut line = String::new();

    loop {
        print!("> ");
        std::io::stdout().flush().context("stdout flush failed")?;

        line.clear();
        if stdin.lock().read_line(&mut line).context("stdin read failed")? == 0 {
            break;
        }

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("quit") || message.eq_ignore_ascii_case("exit") {
            break;
        }

        let outcome = assistant
            .process_message(LOCAL_USER_ID, message, &mut pending)
            .await;
        println!("{}", outcome.message);
    }

    Ok(())
}
