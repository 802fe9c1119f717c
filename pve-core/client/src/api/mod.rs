//! PVE API 模块
//!
//! 按资源路径组织的接口封装, 每个方法只负责拼接路径和参数, 然后交给
//! [`PveClient::execute`](crate::PveClient::execute)。这里只覆盖常用路由,
//! 完整的路由表应根据 PVE 的 API schema 生成:
//! - 版本信息 (VersionApi)
//! - 访问控制 (AccessApi)
//! - 集群 (ClusterApi)
//! - 节点 (NodesApi / NodeApi)
//! - 任务 (TasksApi)
//! - QEMU 虚拟机 (QemuApi)
//! - LXC 容器 (LxcApi)
//! - 存储 (StorageApi)

use std::borrow::Cow;

pub mod access;
pub mod cluster;
pub mod lxc;
pub mod nodes;
pub mod qemu;
pub mod storage;
pub mod tasks;
pub mod version;

pub use access::AccessApi;
pub use cluster::ClusterApi;
pub use lxc::LxcApi;
pub use nodes::{NodeApi, NodesApi};
pub use qemu::QemuApi;
pub use storage::StorageApi;
pub use tasks::TasksApi;
pub use version::VersionApi;

/// 对路径参数做百分号编码
pub(crate) fn segment(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}
