//! Proxmox VE REST API 客户端
//!
//! 提供与 PVE `/api2/json` 接口交互的客户端实现。
//!
//! # 功能
//!
//! - **参数编码** (`Params`): 省略未设置的值, 布尔值编码为 `0`/`1`, 展开 `net0`/`net1` 等索引参数
//! - **认证** (`PveClient::login`): 票据登录 (CSRF 令牌 + `PVEAuthCookie`)、两步验证、API Token
//! - **请求执行** (`PveClient::execute`): 返回统一的 `PveResult`, 传输错误单独返回 `Err`
//! - **任务轮询** (`PveClient::wait_for_task_to_finish`): 等待异步任务结束, 支持超时与取消
//! - **常用接口**: 版本、访问控制、集群、节点、任务、虚拟机、容器、存储
//!
//! # 示例
//!
//! ```ignore
//! use pve_client::{PveClient, PveConfig, Params, WaitOptions};
//!
//! let client = PveClient::new(PveConfig::new("pve1.example.com"))?;
//! if !client.login("root@pam", "password").await? {
//!     anyhow::bail!("登录失败");
//! }
//!
//! // 启动虚拟机并等待任务完成
//! let result = client.node("pve1").qemu(100).start(&Params::new()).await?;
//! let finished = client.wait_for_result(&result, WaitOptions::default()).await?;
//!
//! // 创建快照
//! client.node("pve1").qemu(100).create_snapshot("before-upgrade", None, Some(false)).await?;
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod params;
pub mod result;
pub mod session;
pub mod task;

pub use client::PveClient;
pub use config::{PveConfig, ResponseType, Scheme, TlsPolicy};
pub use error::{PveError, Result};
pub use params::{ParamValue, Params};
pub use result::{to_json, PveResult};
pub use session::{Credentials, Session};
pub use task::{TaskWait, Upid, WaitOptions};

// 导出 API 模块
pub use api::{
    AccessApi, ClusterApi, LxcApi, NodeApi, NodesApi, QemuApi, StorageApi, TasksApi, VersionApi,
};

// 导出数据模型
pub use models::{
    CloneVmParams, ClusterResource, CreateLxcParams, CreateVmParams, NodeListItem, TaskStatus,
    VersionInfo,
};

// 取消令牌
pub use tokio_util::sync::CancellationToken;
