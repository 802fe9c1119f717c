//! 节点存储 API

use tracing::info;

use crate::api::{segment, NodeApi};
use crate::client::PveClient;
use crate::error::Result;
use crate::params::Params;
use crate::result::PveResult;

/// 节点存储 API
pub struct StorageApi<'a> {
    client: &'a PveClient,
    base: String,
}

impl<'a> StorageApi<'a> {
    pub(crate) fn new(client: &'a PveClient, node: &NodeApi<'_>, storage: &str) -> Self {
        Self {
            client,
            base: node.path(&format!("/storage/{}", segment(storage))),
        }
    }

    fn path(&self, suffix: &str) -> String {
        format!("{}{}", self.base, suffix)
    }

    /// 存储状态
    pub async fn status(&self) -> Result<PveResult> {
        self.client.get(&self.path("/status"), &Params::new()).await
    }

    /// 存储内容, `content` 可以是 `images` / `iso` / `vztmpl` / `backup`
    pub async fn content(&self, content: Option<&str>, vmid: Option<u32>) -> Result<PveResult> {
        let params = Params::new().with("content", content).with("vmid", vmid);
        self.client.get(&self.path("/content"), &params).await
    }

    /// 分配磁盘镜像
    pub async fn allocate(
        &self,
        vmid: u32,
        filename: &str,
        size: &str,
        format: Option<&str>,
    ) -> Result<PveResult> {
        info!("分配磁盘镜像: {} ({})", filename, size);
        let params = Params::new()
            .with("vmid", vmid)
            .with("filename", filename)
            .with("size", size)
            .with("format", format);
        self.client.create(&self.path("/content"), &params).await
    }

    /// 删除卷, `volume` 为卷 ID, 例如 `local-lvm:vm-100-disk-0`
    pub async fn delete_volume(&self, volume: &str) -> Result<PveResult> {
        info!("删除存储卷: {}", volume);
        self.client
            .delete(&self.path(&format!("/content/{}", segment(volume))), &Params::new())
            .await
    }
}
