//! 异步任务跟踪
//!
//! 启动/停止/克隆等操作在 PVE 中是异步执行的, 接口只返回一个 UPID。
//! 这里提供 UPID 解析以及基于轮询的等待。

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::PveClient;
use crate::error::{PveError, Result};
use crate::models::TaskStatus;
use crate::result::PveResult;

/// 默认轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 默认等待超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// 超时小于轮询间隔时追加的余量
const TIMEOUT_MARGIN: Duration = Duration::from_millis(5_000);

/// 任务唯一标识
///
/// 格式: `UPID:{node}:{pid}:{pstart}:{starttime}:{type}:{id}:{user}:`,
/// 其中 pid / pstart / starttime 为十六进制。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upid {
    pub node: String,
    pub pid: u32,
    pub pstart: u64,
    pub starttime: DateTime<Utc>,
    pub task_type: String,
    pub id: String,
    pub user: String,
    raw: String,
}

impl Upid {
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Upid {
    type Err = PveError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PveError::InvalidUpid(s.to_string());

        let rest = s.strip_prefix("UPID:").ok_or_else(invalid)?;
        let parts: Vec<&str> = rest.splitn(7, ':').collect();
        if parts.len() != 7 {
            return Err(invalid());
        }

        let node = parts[0];
        if node.is_empty() {
            return Err(invalid());
        }
        let pid = u32::from_str_radix(parts[1], 16).map_err(|_| invalid())?;
        let pstart = u64::from_str_radix(parts[2], 16).map_err(|_| invalid())?;
        let secs = i64::from_str_radix(parts[3], 16).map_err(|_| invalid())?;
        let starttime = Utc.timestamp_opt(secs, 0).single().ok_or_else(invalid)?;
        let user = parts[6].strip_suffix(':').unwrap_or(parts[6]);

        Ok(Self {
            node: node.to_string(),
            pid,
            pstart,
            starttime,
            task_type: parts[4].to_string(),
            id: parts[5].to_string(),
            user: user.to_string(),
            raw: s.to_string(),
        })
    }
}

impl fmt::Display for Upid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// 轮询参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl WaitOptions {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// 以毫秒指定参数
    pub fn from_millis(poll_interval_ms: u64, timeout_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(poll_interval_ms),
            Duration::from_millis(timeout_ms),
        )
    }

    /// 修正参数: 间隔为 0 时使用默认间隔; 超时小于间隔时提升为 间隔 + 5 秒,
    /// 保证至少完成一次轮询
    pub fn normalized(self) -> Self {
        let poll_interval = if self.poll_interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            self.poll_interval
        };
        let timeout = if self.timeout < poll_interval {
            poll_interval + TIMEOUT_MARGIN
        } else {
            self.timeout
        };
        Self {
            poll_interval,
            timeout,
        }
    }
}

/// 等待结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskWait {
    /// 任务已不在运行
    Completed,
    /// 超时时任务仍在运行
    TimedOut,
    /// 调用方取消了等待
    Cancelled,
}

impl TaskWait {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl PveClient {
    /// 读取任务状态
    pub async fn read_task_status(&self, node: &str, upid: &str) -> Result<PveResult> {
        self.node(node).tasks().status(upid).await
    }

    /// 读取任务状态并解码为 [`TaskStatus`]
    pub async fn task_status(&self, node: &str, upid: &str) -> Result<TaskStatus> {
        self.node(node).tasks().status_typed(upid).await
    }

    /// 任务状态字段是否为 `running`
    ///
    /// 状态读取失败 (票据过期、节点不可达等) 返回 [`PveError::ApiError`],
    /// 不会被当作任务已结束。
    pub async fn task_is_running(&self, node: &str, upid: &str) -> Result<bool> {
        let result = self.read_task_status(node, upid).await?;
        if !result.is_ok() {
            warn!(
                "读取任务状态失败: {} [{}] {}",
                upid,
                result.status_code(),
                result.get_error()
            );
        }
        let status = result.ensure_ok()?.get_str("status")?.to_string();
        Ok(status == "running")
    }

    /// 任务退出状态, 成功时为 `OK`; 任务仍在运行时为 `None`
    pub async fn get_exit_status_task(&self, node: &str, upid: &str) -> Result<Option<String>> {
        let result = self.read_task_status(node, upid).await?.ensure_ok()?;
        Ok(result
            .data()
            .get("exitstatus")
            .and_then(|s| s.as_str())
            .map(str::to_string))
    }

    /// 等待任务结束, 返回任务是否在超时前结束
    ///
    /// 超时不会返回错误; 传输层错误和状态读取失败返回 `Err`。
    pub async fn wait_for_task_to_finish(
        &self,
        node: &str,
        upid: &str,
        options: WaitOptions,
    ) -> Result<bool> {
        let outcome = self
            .wait_for_task(node, upid, options, &CancellationToken::new())
            .await?;
        Ok(outcome.is_completed())
    }

    /// 可取消的任务等待
    ///
    /// 只在状态查询和两次查询之间的休眠处挂起, 取消令牌触发后立即返回
    /// [`TaskWait::Cancelled`]。
    pub async fn wait_for_task(
        &self,
        node: &str,
        upid: &str,
        options: WaitOptions,
        cancel: &CancellationToken,
    ) -> Result<TaskWait> {
        let options = options.normalized();
        info!(
            "等待任务完成: {} (间隔 {:?}, 超时 {:?})",
            upid, options.poll_interval, options.timeout
        );

        let started = Instant::now();
        let mut polls = 0u32;
        loop {
            let running = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(TaskWait::Cancelled),
                running = self.task_is_running(node, upid) => running?,
            };
            polls += 1;

            if !running {
                info!("任务已结束: {} (轮询 {} 次)", upid, polls);
                return Ok(TaskWait::Completed);
            }

            let elapsed = started.elapsed();
            if elapsed >= options.timeout {
                warn!("等待任务超时: {} (已等待 {:?})", upid, elapsed);
                return Ok(TaskWait::TimedOut);
            }

            debug!("任务仍在运行: {} (第 {} 次轮询)", upid, polls);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(TaskWait::Cancelled),
                _ = sleep(options.poll_interval) => {}
            }
        }
    }

    /// 等待异步操作返回的任务
    ///
    /// 从 `data` 中取出 UPID, 节点名从 UPID 中解析。操作本身失败时没有任务可等, 返回 `false`。
    pub async fn wait_for_result(&self, result: &PveResult, options: WaitOptions) -> Result<bool> {
        if !result.is_ok() {
            warn!(
                "操作失败, 无任务可等待: [{}] {}",
                result.status_code(),
                result.get_error()
            );
            return Ok(false);
        }
        let upid = result.upid()?;
        self.wait_for_task_to_finish(&upid.node, upid.as_str(), options)
            .await
    }
}
