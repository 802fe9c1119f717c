//! 节点任务 API

use tracing::info;

use crate::api::{segment, NodeApi};
use crate::client::PveClient;
use crate::error::Result;
use crate::models::TaskStatus;
use crate::params::Params;
use crate::result::PveResult;

/// 节点任务 API
pub struct TasksApi<'a> {
    client: &'a PveClient,
    base: String,
}

impl<'a> TasksApi<'a> {
    pub(crate) fn new(client: &'a PveClient, node: &NodeApi<'_>) -> Self {
        Self {
            client,
            base: node.path("/tasks"),
        }
    }

    fn path(&self, upid: &str, suffix: &str) -> String {
        format!("{}/{}{}", self.base, segment(upid), suffix)
    }

    /// 查询节点任务列表
    ///
    /// 常用参数: `start`, `limit`, `vmid`, `typefilter`, `errors`, `source`
    pub async fn list(&self, params: &Params) -> Result<PveResult> {
        self.client.get(&self.base, params).await
    }

    /// 查询任务状态
    pub async fn status(&self, upid: &str) -> Result<PveResult> {
        self.client.get(&self.path(upid, "/status"), &Params::new()).await
    }

    /// 查询任务状态并解码
    pub async fn status_typed(&self, upid: &str) -> Result<TaskStatus> {
        self.status(upid).await?.ensure_ok()?.data_as()
    }

    /// 读取任务日志
    pub async fn log(
        &self,
        upid: &str,
        start: Option<u32>,
        limit: Option<u32>,
    ) -> Result<PveResult> {
        let params = Params::new().with("start", start).with("limit", limit);
        self.client.get(&self.path(upid, "/log"), &params).await
    }

    /// 停止任务
    pub async fn stop(&self, upid: &str) -> Result<PveResult> {
        info!("停止任务: {}", upid);
        self.client.delete(&self.path(upid, ""), &Params::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_paths() {
        let client = PveClient::with_host("pve1").unwrap();
        let node = client.node("pve1");
        let tasks = node.tasks();
        assert_eq!(tasks.base, "/nodes/pve1/tasks");
        assert_eq!(
            tasks.path("UPID:pve1:1:2:3:qmstart:100:root@pam:", "/status"),
            "/nodes/pve1/tasks/UPID%3Apve1%3A1%3A2%3A3%3Aqmstart%3A100%3Aroot%40pam%3A/status"
        );
    }
}
