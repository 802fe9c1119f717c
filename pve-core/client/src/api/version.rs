//! 版本信息 API

use crate::client::PveClient;
use crate::error::Result;
use crate::models::VersionInfo;
use crate::params::Params;
use crate::result::PveResult;

/// 版本信息 API
pub struct VersionApi<'a> {
    client: &'a PveClient,
}

impl<'a> VersionApi<'a> {
    pub(crate) fn new(client: &'a PveClient) -> Self {
        Self { client }
    }

    /// 查询 API 版本
    pub async fn get(&self) -> Result<PveResult> {
        self.client.get("/version", &Params::new()).await
    }

    /// 查询 API 版本并解码
    pub async fn info(&self) -> Result<VersionInfo> {
        self.get().await?.ensure_ok()?.data_as()
    }
}
