//! 集群 API

use crate::client::PveClient;
use crate::error::Result;
use crate::models::ClusterResource;
use crate::params::Params;
use crate::result::PveResult;

/// 集群 API
pub struct ClusterApi<'a> {
    client: &'a PveClient,
}

impl<'a> ClusterApi<'a> {
    pub(crate) fn new(client: &'a PveClient) -> Self {
        Self { client }
    }

    /// 集群状态
    pub async fn status(&self) -> Result<PveResult> {
        self.client.get("/cluster/status", &Params::new()).await
    }

    /// 集群资源, `resource_type` 可以是 `vm` / `storage` / `node` / `sdn`
    pub async fn resources(&self, resource_type: Option<&str>) -> Result<PveResult> {
        let params = Params::new().with("type", resource_type);
        self.client.get("/cluster/resources", &params).await
    }

    /// 集群资源并解码
    pub async fn resource_list(&self, resource_type: Option<&str>) -> Result<Vec<ClusterResource>> {
        self.resources(resource_type).await?.ensure_ok()?.data_as()
    }

    /// 最近的集群任务
    pub async fn tasks(&self) -> Result<PveResult> {
        self.client.get("/cluster/tasks", &Params::new()).await
    }

    /// 获取下一个可用的 VMID; 指定 `vmid` 时检查它是否可用
    pub async fn next_id(&self, vmid: Option<u32>) -> Result<PveResult> {
        let params = Params::new().with("vmid", vmid);
        self.client.get("/cluster/nextid", &params).await
    }
}
