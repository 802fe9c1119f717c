//! QEMU 虚拟机 API
//!
//! 提供虚拟机管理功能，包括：
//! - 配置查询与修改
//! - 电源操作：启动、关闭、停止、重启、挂起、恢复
//! - 克隆与删除
//! - 快照管理
//!
//! 除配置查询外的操作都在服务端异步执行, 返回的 `data` 为任务 UPID,
//! 可交给 [`PveClient::wait_for_result`](crate::PveClient::wait_for_result) 等待完成。

use tracing::info;

use crate::api::{segment, NodeApi};
use crate::client::PveClient;
use crate::error::Result;
use crate::models::CloneVmParams;
use crate::params::Params;
use crate::result::PveResult;

/// QEMU 虚拟机 API
pub struct QemuApi<'a> {
    client: &'a PveClient,
    base: String,
    vmid: u32,
}

impl<'a> QemuApi<'a> {
    pub(crate) fn new(client: &'a PveClient, node: &NodeApi<'_>, vmid: u32) -> Self {
        Self {
            client,
            base: node.path(&format!("/qemu/{}", vmid)),
            vmid,
        }
    }

    pub fn vmid(&self) -> u32 {
        self.vmid
    }

    fn path(&self, suffix: &str) -> String {
        format!("{}{}", self.base, suffix)
    }

    // ============================================
    // 配置
    // ============================================

    /// 查询虚拟机配置
    pub async fn config(&self, current: Option<bool>) -> Result<PveResult> {
        let params = Params::new().with("current", current);
        self.client.get(&self.path("/config"), &params).await
    }

    /// 同步修改配置 (PUT)
    pub async fn update_config(&self, params: &Params) -> Result<PveResult> {
        info!("修改虚拟机配置: {}", self.vmid);
        self.client.set(&self.path("/config"), params).await
    }

    /// 异步修改配置 (POST), 返回任务 UPID
    pub async fn update_config_async(&self, params: &Params) -> Result<PveResult> {
        info!("异步修改虚拟机配置: {}", self.vmid);
        self.client.create(&self.path("/config"), params).await
    }

    /// 待生效的配置变更
    pub async fn pending(&self) -> Result<PveResult> {
        self.client.get(&self.path("/pending"), &Params::new()).await
    }

    // ============================================
    // 电源操作
    // ============================================

    /// 当前运行状态
    pub async fn current_status(&self) -> Result<PveResult> {
        self.client.get(&self.path("/status/current"), &Params::new()).await
    }

    /// 启动虚拟机
    ///
    /// 常用参数: `timeout`, `skiplock`, `migratedfrom`, `targetstorage`
    pub async fn start(&self, params: &Params) -> Result<PveResult> {
        info!("启动虚拟机: {}", self.vmid);
        self.client.create(&self.path("/status/start"), params).await
    }

    /// 强制停止虚拟机
    pub async fn stop(&self, params: &Params) -> Result<PveResult> {
        info!("停止虚拟机: {}", self.vmid);
        self.client.create(&self.path("/status/stop"), params).await
    }

    /// 正常关闭虚拟机
    ///
    /// # Arguments
    /// * `force_stop` - 超时后是否强制停止
    /// * `timeout` - 等待秒数
    pub async fn shutdown(
        &self,
        force_stop: Option<bool>,
        timeout: Option<u32>,
    ) -> Result<PveResult> {
        info!("关闭虚拟机: {}", self.vmid);
        let params = Params::new()
            .with("forceStop", force_stop)
            .with("timeout", timeout);
        self.client.create(&self.path("/status/shutdown"), &params).await
    }

    /// 重启虚拟机
    pub async fn reboot(&self, timeout: Option<u32>) -> Result<PveResult> {
        info!("重启虚拟机: {}", self.vmid);
        let params = Params::new().with("timeout", timeout);
        self.client.create(&self.path("/status/reboot"), &params).await
    }

    /// 硬重置虚拟机
    pub async fn reset(&self) -> Result<PveResult> {
        info!("重置虚拟机: {}", self.vmid);
        self.client.create(&self.path("/status/reset"), &Params::new()).await
    }

    /// 挂起虚拟机, `todisk` 为真时休眠到磁盘
    pub async fn suspend(&self, todisk: Option<bool>) -> Result<PveResult> {
        info!("挂起虚拟机: {}", self.vmid);
        let params = Params::new().with("todisk", todisk);
        self.client.create(&self.path("/status/suspend"), &params).await
    }

    /// 恢复挂起的虚拟机
    pub async fn resume(&self) -> Result<PveResult> {
        info!("恢复虚拟机: {}", self.vmid);
        self.client.create(&self.path("/status/resume"), &Params::new()).await
    }

    // ============================================
    // 克隆 / 删除
    // ============================================

    /// 克隆虚拟机
    pub async fn clone_vm(&self, req: &CloneVmParams) -> Result<PveResult> {
        info!("克隆虚拟机: {} -> {}", self.vmid, req.newid);
        self.client.create(&self.path("/clone"), &req.to_params()).await
    }

    /// 删除虚拟机
    pub async fn destroy(
        &self,
        purge: Option<bool>,
        destroy_unreferenced_disks: Option<bool>,
    ) -> Result<PveResult> {
        info!("删除虚拟机: {}", self.vmid);
        let params = Params::new()
            .with("purge", purge)
            .with("destroy-unreferenced-disks", destroy_unreferenced_disks);
        self.client.delete(&self.base, &params).await
    }

    // ============================================
    // 快照
    // ============================================

    /// 快照列表
    pub async fn snapshots(&self) -> Result<PveResult> {
        self.client.get(&self.path("/snapshot"), &Params::new()).await
    }

    /// 创建快照
    ///
    /// # Arguments
    /// * `name` - 快照名称
    /// * `description` - 快照描述 (可选)
    /// * `vmstate` - 是否保存内存状态
    pub async fn create_snapshot(
        &self,
        name: &str,
        description: Option<&str>,
        vmstate: Option<bool>,
    ) -> Result<PveResult> {
        info!("创建虚拟机快照: {} -> {}", self.vmid, name);
        let params = Params::new()
            .with("snapname", name)
            .with("description", description)
            .with("vmstate", vmstate);
        self.client.create(&self.path("/snapshot"), &params).await
    }

    /// 回滚到快照
    pub async fn rollback(&self, name: &str) -> Result<PveResult> {
        info!("回滚虚拟机快照: {} -> {}", self.vmid, name);
        self.client
            .create(&self.path(&format!("/snapshot/{}/rollback", segment(name))), &Params::new())
            .await
    }

    /// 删除快照
    pub async fn delete_snapshot(&self, name: &str, force: Option<bool>) -> Result<PveResult> {
        info!("删除虚拟机快照: {} -> {}", self.vmid, name);
        let params = Params::new().with("force", force);
        self.client
            .delete(&self.path(&format!("/snapshot/{}", segment(name))), &params)
            .await
    }
}
