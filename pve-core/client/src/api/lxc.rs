//! LXC 容器 API

use tracing::info;

use crate::api::{segment, NodeApi};
use crate::client::PveClient;
use crate::error::Result;
use crate::params::Params;
use crate::result::PveResult;

/// LXC 容器 API
pub struct LxcApi<'a> {
    client: &'a PveClient,
    base: String,
    vmid: u32,
}

impl<'a> LxcApi<'a> {
    pub(crate) fn new(client: &'a PveClient, node: &NodeApi<'_>, vmid: u32) -> Self {
        Self {
            client,
            base: node.path(&format!("/lxc/{}", vmid)),
            vmid,
        }
    }

    pub fn vmid(&self) -> u32 {
        self.vmid
    }

    fn path(&self, suffix: &str) -> String {
        format!("{}{}", self.base, suffix)
    }

    /// 查询容器配置
    pub async fn config(&self) -> Result<PveResult> {
        self.client.get(&self.path("/config"), &Params::new()).await
    }

    /// 修改容器配置
    pub async fn update_config(&self, params: &Params) -> Result<PveResult> {
        info!("修改容器配置: {}", self.vmid);
        self.client.set(&self.path("/config"), params).await
    }

    /// 当前运行状态
    pub async fn current_status(&self) -> Result<PveResult> {
        self.client.get(&self.path("/status/current"), &Params::new()).await
    }

    /// 启动容器
    pub async fn start(&self) -> Result<PveResult> {
        info!("启动容器: {}", self.vmid);
        self.client.create(&self.path("/status/start"), &Params::new()).await
    }

    /// 强制停止容器
    pub async fn stop(&self) -> Result<PveResult> {
        info!("停止容器: {}", self.vmid);
        self.client.create(&self.path("/status/stop"), &Params::new()).await
    }

    /// 正常关闭容器
    pub async fn shutdown(
        &self,
        force_stop: Option<bool>,
        timeout: Option<u32>,
    ) -> Result<PveResult> {
        info!("关闭容器: {}", self.vmid);
        let params = Params::new()
            .with("forceStop", force_stop)
            .with("timeout", timeout);
        self.client.create(&self.path("/status/shutdown"), &params).await
    }

    /// 重启容器
    pub async fn reboot(&self) -> Result<PveResult> {
        info!("重启容器: {}", self.vmid);
        self.client.create(&self.path("/status/reboot"), &Params::new()).await
    }

    /// 删除容器
    pub async fn destroy(&self, purge: Option<bool>, force: Option<bool>) -> Result<PveResult> {
        info!("删除容器: {}", self.vmid);
        let params = Params::new().with("purge", purge).with("force", force);
        self.client.delete(&self.base, &params).await
    }

    /// 快照列表
    pub async fn snapshots(&self) -> Result<PveResult> {
        self.client.get(&self.path("/snapshot"), &Params::new()).await
    }

    /// 创建快照
    pub async fn create_snapshot(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<PveResult> {
        info!("创建容器快照: {} -> {}", self.vmid, name);
        let params = Params::new()
            .with("snapname", name)
            .with("description", description);
        self.client.create(&self.path("/snapshot"), &params).await
    }

    /// 回滚到快照
    pub async fn rollback(&self, name: &str) -> Result<PveResult> {
        info!("回滚容器快照: {} -> {}", self.vmid, name);
        self.client
            .create(&self.path(&format!("/snapshot/{}/rollback", segment(name))), &Params::new())
            .await
    }
}
