//! 启动虚拟机并等待任务完成
//!
//! ```text
//! PVE_HOST=pve1.example.com PVE_USER=root@pam PVE_PASSWORD=... \
//!     cargo run -p pve-client --example wait_task -- pve1 100
//! ```
//!
//! 设置 `PVE_CONFIG` 时从 TOML 文件读取连接配置, 否则使用 `PVE_HOST` 和默认值。

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pve_client::{Params, PveClient, PveConfig, WaitOptions};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let node = args.next().context("用法: wait_task <node> <vmid>")?;
    let vmid: u32 = args
        .next()
        .context("用法: wait_task <node> <vmid>")?
        .parse()
        .context("vmid 必须是整数")?;

    let config = match std::env::var("PVE_CONFIG") {
        Ok(path) => PveConfig::load(&path)?,
        Err(_) => PveConfig::new(std::env::var("PVE_HOST").context("缺少 PVE_HOST")?),
    };
    let client = PveClient::new(config)?;

    let user = std::env::var("PVE_USER").unwrap_or_else(|_| "root@pam".to_string());
    let password = std::env::var("PVE_PASSWORD").context("缺少 PVE_PASSWORD")?;
    if !client.login(&user, &password).await? {
        bail!("登录失败: {}", user);
    }

    let version = client.version().info().await?;
    info!("PVE 版本: {} ({})", version.version, version.release);

    let result = client.node(&node).qemu(vmid).start(&Params::new()).await?;
    if !result.is_ok() {
        bail!("启动失败 [{}]: {}", result.status_code(), result.get_error());
    }
    let upid = result.upid()?;
    info!("启动任务: {}", upid);

    let finished = client
        .wait_for_result(&result, WaitOptions::from_millis(1000, 60_000))
        .await?;
    if !finished {
        bail!("等待任务超时: {}", upid);
    }

    let exit = client.get_exit_status_task(&upid.node, upid.as_str()).await?;
    info!("任务结束: {:?}", exit);
    Ok(())
}
