//! 访问控制 API
//!
//! 登录本身由 [`PveClient::login`](crate::PveClient::login) 完成, 这里是其余的查询接口。

use tracing::info;

use crate::api::segment;
use crate::client::PveClient;
use crate::error::Result;
use crate::params::Params;
use crate::result::PveResult;

/// 访问控制 API
pub struct AccessApi<'a> {
    client: &'a PveClient,
}

impl<'a> AccessApi<'a> {
    pub(crate) fn new(client: &'a PveClient) -> Self {
        Self { client }
    }

    /// 查询用户列表
    pub async fn users(&self, enabled: Option<bool>) -> Result<PveResult> {
        let params = Params::new().with("enabled", enabled);
        self.client.get("/access/users", &params).await
    }

    /// 查询认证域列表
    pub async fn domains(&self) -> Result<PveResult> {
        self.client.get("/access/domains", &Params::new()).await
    }

    /// 查询当前用户 (或指定路径) 的权限
    pub async fn permissions(&self, path: Option<&str>) -> Result<PveResult> {
        let params = Params::new().with("path", path);
        self.client.get("/access/permissions", &params).await
    }

    /// 修改用户密码
    pub async fn change_password(&self, userid: &str, password: &str) -> Result<PveResult> {
        info!("修改用户密码: {}", userid);
        let params = Params::new().with("userid", userid).with("password", password);
        self.client.set("/access/password", &params).await
    }

    /// 查询用户的 API Token
    pub async fn user_tokens(&self, userid: &str) -> Result<PveResult> {
        self.client
            .get(&format!("/access/users/{}/token", segment(userid)), &Params::new())
            .await
    }
}
