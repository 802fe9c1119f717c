//! 节点 API

use tracing::info;

use crate::api::{segment, LxcApi, QemuApi, StorageApi, TasksApi};
use crate::client::PveClient;
use crate::error::Result;
use crate::models::{CreateLxcParams, CreateVmParams, NodeListItem};
use crate::params::Params;
use crate::result::PveResult;

/// 节点列表 API
pub struct NodesApi<'a> {
    client: &'a PveClient,
}

impl<'a> NodesApi<'a> {
    pub(crate) fn new(client: &'a PveClient) -> Self {
        Self { client }
    }

    /// 查询节点列表
    pub async fn list(&self) -> Result<PveResult> {
        self.client.get("/nodes", &Params::new()).await
    }

    /// 查询节点列表并解码
    pub async fn list_items(&self) -> Result<Vec<NodeListItem>> {
        self.list().await?.ensure_ok()?.data_as()
    }
}

/// 单个节点 API
pub struct NodeApi<'a> {
    client: &'a PveClient,
    node: String,
}

impl<'a> NodeApi<'a> {
    pub(crate) fn new(client: &'a PveClient, node: &str) -> Self {
        Self {
            client,
            node: node.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.node
    }

    /// 节点资源路径, 例如 `/nodes/pve1/qemu`
    pub(crate) fn path(&self, suffix: &str) -> String {
        format!("/nodes/{}{}", segment(&self.node), suffix)
    }

    /// 节点状态
    pub async fn status(&self) -> Result<PveResult> {
        self.client.get(&self.path("/status"), &Params::new()).await
    }

    /// 节点上的 PVE 版本
    pub async fn version(&self) -> Result<PveResult> {
        self.client.get(&self.path("/version"), &Params::new()).await
    }

    /// 节点 RRD 数据
    ///
    /// # Arguments
    /// * `timeframe` - `hour` / `day` / `week` / `month` / `year`
    /// * `cf` - 聚合方式 `AVERAGE` / `MAX`
    pub async fn rrddata(&self, timeframe: &str, cf: Option<&str>) -> Result<PveResult> {
        let params = Params::new().with("timeframe", timeframe).with("cf", cf);
        self.client.get(&self.path("/rrddata"), &params).await
    }

    /// 节点 RRD 图表, 需要以 `ResponseType::Png` 创建客户端
    pub async fn rrd(&self, ds: &str, timeframe: &str, cf: Option<&str>) -> Result<PveResult> {
        let params = Params::new()
            .with("ds", ds)
            .with("timeframe", timeframe)
            .with("cf", cf);
        self.client.get(&self.path("/rrd"), &params).await
    }

    /// 虚拟机列表
    pub async fn qemu_list(&self, full: Option<bool>) -> Result<PveResult> {
        let params = Params::new().with("full", full);
        self.client.get(&self.path("/qemu"), &params).await
    }

    /// 创建虚拟机, 返回任务 UPID
    pub async fn create_qemu(&self, req: &CreateVmParams) -> Result<PveResult> {
        info!("创建虚拟机: {}/{}", self.node, req.vmid);
        self.client.create(&self.path("/qemu"), &req.to_params()).await
    }

    /// 容器列表
    pub async fn lxc_list(&self) -> Result<PveResult> {
        self.client.get(&self.path("/lxc"), &Params::new()).await
    }

    /// 创建容器, 返回任务 UPID
    pub async fn create_lxc(&self, req: &CreateLxcParams) -> Result<PveResult> {
        info!("创建容器: {}/{}", self.node, req.vmid);
        self.client.create(&self.path("/lxc"), &req.to_params()).await
    }

    /// 存储列表
    pub async fn storage_list(
        &self,
        content: Option<&str>,
        enabled: Option<bool>,
    ) -> Result<PveResult> {
        let params = Params::new().with("content", content).with("enabled", enabled);
        self.client.get(&self.path("/storage"), &params).await
    }

    /// 获取任务 API
    pub fn tasks(&self) -> TasksApi<'a> {
        TasksApi::new(self.client, self)
    }

    /// 获取虚拟机 API
    pub fn qemu(&self, vmid: u32) -> QemuApi<'a> {
        QemuApi::new(self.client, self, vmid)
    }

    /// 获取容器 API
    pub fn lxc(&self, vmid: u32) -> LxcApi<'a> {
        LxcApi::new(self.client, self, vmid)
    }

    /// 获取存储 API
    pub fn storage(&self, storage: &str) -> StorageApi<'a> {
        StorageApi::new(self.client, self, storage)
    }
}
