//! PVE 客户端核心实现

use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use hyper::ext::ReasonPhrase;
use reqwest::{Certificate, Client, Method, Response};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::{AccessApi, ClusterApi, NodeApi, NodesApi, VersionApi};
use crate::config::{PveConfig, ResponseType, TlsPolicy};
use crate::error::{PveError, Result};
use crate::params::Params;
use crate::result::PveResult;
use crate::session::{split_username, CredentialStore, Credentials, Session};

/// PVE 客户端
///
/// 一个客户端对应一个目标主机, 可以在多个任务之间共享 (`Arc<PveClient>`)。
pub struct PveClient {
    /// API 基础 URL
    base_url: String,

    /// HTTP 客户端
    http_client: Client,

    /// 当前凭据
    credentials: CredentialStore,

    /// 配置
    config: PveConfig,
}

impl PveClient {
    /// 创建新的 PVE 客户端
    pub fn new(config: PveConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder()
            .timeout(config.request_timeout_duration())
            .connect_timeout(config.connect_timeout_duration());

        match &config.tls {
            TlsPolicy::System => {}
            TlsPolicy::CustomCa { path } => {
                let pem = std::fs::read(path).map_err(|e| {
                    PveError::ConfigError(format!("读取 CA 证书失败 {:?}: {}", path, e))
                })?;
                let cert = Certificate::from_pem(&pem).map_err(|e| {
                    PveError::ConfigError(format!("解析 CA 证书失败 {:?}: {}", path, e))
                })?;
                builder = builder.add_root_certificate(cert);
            }
            TlsPolicy::AcceptInvalid => {
                warn!("已关闭 TLS 证书校验: {}", config.host);
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        let http_client = builder
            .build()
            .map_err(|e| PveError::ConfigError(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            base_url: config.base_url(),
            http_client,
            credentials: CredentialStore::new(),
            config,
        })
    }

    /// 使用默认配置连接指定主机
    pub fn with_host(host: &str) -> Result<Self> {
        Self::new(PveConfig::new(host))
    }

    /// 获取客户端配置
    pub fn config(&self) -> &PveConfig {
        &self.config
    }

    /// 获取基础 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 登录, 用户名可以是 `user@realm`, 不带域时使用 `pam`
    pub async fn login(&self, username: &str, password: &str) -> Result<bool> {
        let (user, realm) = split_username(username);
        self.login_with_otp(user, password, realm, None).await
    }

    /// 指定认证域登录
    pub async fn login_with_realm(
        &self,
        username: &str,
        password: &str,
        realm: &str,
    ) -> Result<bool> {
        self.login_with_otp(username, password, realm, None).await
    }

    /// 认证登录
    ///
    /// 成功时整体替换当前会话; 失败时返回 `Ok(false)`, 原有会话保持不变。
    /// 开启了两步验证的账户需要提供 `otp`。
    pub async fn login_with_otp(
        &self,
        username: &str,
        password: &str,
        realm: &str,
        otp: Option<&str>,
    ) -> Result<bool> {
        if username.is_empty() {
            return Err(PveError::AuthError("用户名不能为空".to_string()));
        }
        info!("PVE 客户端登录: {}@{}", username, realm);

        let params = Params::new()
            .with("username", username)
            .with("password", password)
            .with("realm", realm)
            .with("otp", otp);
        let result = self.send(Method::POST, "/access/ticket", &params, None).await?;

        if !result.is_ok() {
            warn!(
                "PVE 登录失败: {}@{} [{}] {}",
                username,
                realm,
                result.status_code(),
                result.get_error()
            );
            return Ok(false);
        }

        let data = result.data();
        let need_tfa = data
            .get("NeedTFA")
            .map_or(false, |v| v.as_i64() == Some(1) || v.as_bool() == Some(true));
        let data = if need_tfa {
            let Some(otp) = otp else {
                warn!("账户需要两步验证, 但未提供 OTP: {}@{}", username, realm);
                return Ok(false);
            };
            let Some(challenge) = data.get("ticket").and_then(|t| t.as_str()) else {
                return Ok(false);
            };
            let params = Params::new()
                .with("username", format!("{}@{}", username, realm))
                .with("tfa-challenge", challenge)
                .with("password", format!("totp:{}", otp));
            let second = self.send(Method::POST, "/access/ticket", &params, None).await?;
            if !second.is_ok() {
                warn!("PVE 两步验证失败: {}@{}", username, realm);
                return Ok(false);
            }
            second.data().clone()
        } else {
            data.clone()
        };

        let Some(session) = Session::from_ticket_data(&data) else {
            warn!("登录响应缺少 ticket 或 CSRFPreventionToken");
            return Ok(false);
        };
        self.credentials.replace(Credentials::Ticket(session)).await;

        info!("PVE 客户端登录成功: {}@{}", username, realm);
        Ok(true)
    }

    /// 使用 API Token 认证, 格式 `USER@REALM!TOKENID=SECRET`
    pub async fn set_api_token(&self, token: &str) {
        info!("PVE 客户端切换为 API Token 认证");
        self.credentials
            .replace(Credentials::ApiToken(token.to_string()))
            .await;
    }

    /// 注销登出
    pub async fn logout(&self) {
        info!("PVE 客户端登出");
        self.credentials.clear().await;
    }

    /// 当前票据会话的快照
    pub async fn session(&self) -> Option<Session> {
        match self.credentials.current().await.as_deref() {
            Some(Credentials::Ticket(session)) => Some(session.clone()),
            _ => None,
        }
    }

    /// 是否持有任何凭据
    pub async fn is_authenticated(&self) -> bool {
        self.credentials.current().await.is_some()
    }

    /// 获取版本 API
    pub fn version(&self) -> VersionApi<'_> {
        VersionApi::new(self)
    }

    /// 获取访问控制 API
    pub fn access(&self) -> AccessApi<'_> {
        AccessApi::new(self)
    }

    /// 获取集群 API
    pub fn cluster(&self) -> ClusterApi<'_> {
        ClusterApi::new(self)
    }

    /// 获取节点列表 API
    pub fn nodes(&self) -> NodesApi<'_> {
        NodesApi::new(self)
    }

    /// 获取单个节点 API
    pub fn node(&self, node: &str) -> NodeApi<'_> {
        NodeApi::new(self, node)
    }

    /// 发送 GET 请求, 参数放在查询字符串中
    pub async fn get(&self, path: &str, params: &Params) -> Result<PveResult> {
        self.execute(Method::GET, path, params).await
    }

    /// 发送 POST 请求
    pub async fn create(&self, path: &str, params: &Params) -> Result<PveResult> {
        self.execute(Method::POST, path, params).await
    }

    /// 发送 PUT 请求
    pub async fn set(&self, path: &str, params: &Params) -> Result<PveResult> {
        self.execute(Method::PUT, path, params).await
    }

    /// 发送 DELETE 请求
    pub async fn delete(&self, path: &str, params: &Params) -> Result<PveResult> {
        self.execute(Method::DELETE, path, params).await
    }

    /// 发送请求
    ///
    /// `path` 为已插入路径参数的资源路径, 例如 `/nodes/pve1/qemu/100/status/start`。
    /// 无法到达服务器时返回 `Err`; 服务器返回的任何响应 (包括 4xx/5xx) 都是 `Ok(PveResult)`。
    pub async fn execute(&self, method: Method, path: &str, params: &Params) -> Result<PveResult> {
        let credentials = self.credentials.current().await;
        self.send(method, path, params, credentials.as_deref()).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &Params,
        credentials: Option<&Credentials>,
    ) -> Result<PveResult> {
        let mut url = format!("{}{}", self.base_url, path);

        let mut request = if method == Method::GET {
            if !params.is_empty() {
                url.push('?');
                url.push_str(&params.to_query_string());
            }
            self.http_client.request(method.clone(), &url)
        } else {
            let request = self.http_client.request(method.clone(), &url);
            if params.is_empty() {
                request
            } else {
                request
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(params.to_form_body())
            }
        };
        debug!("PVE API 请求: {} {}", method, url);

        if let Some(credentials) = credentials {
            request = credentials.apply(request);
        }

        let response = request.send().await?;
        let status = response.status();
        let reason = reason_phrase(&response);
        let body = response.bytes().await?;

        if !status.is_success() {
            warn!("PVE API 请求失败: {} {} - {} {}", method, path, status.as_u16(), reason);
        }

        let decoded = match self.config.response_type {
            ResponseType::Png if status.is_success() => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&body);
                json!({ "data": format!("data:image/png;base64,{}", encoded) })
            }
            _ => PveResult::decode_body(&body),
        };

        Ok(PveResult::new(decoded, status.as_u16(), reason))
    }
}

/// 服务端返回的状态原因短语, 例如 `500 VM 100 not running`
///
/// hyper 只在短语与标准短语不同时保存它, 其余情况使用标准短语。
fn reason_phrase(response: &Response) -> String {
    match response.extensions().get::<ReasonPhrase>() {
        Some(phrase) => String::from_utf8_lossy(phrase.as_bytes()).into_owned(),
        None => response
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Scheme;
    use std::path::PathBuf;

    #[test]
    fn test_pve_client_creation() {
        let client = PveClient::with_host("192.168.1.11");
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), "https://192.168.1.11:8006/api2/json");
    }

    #[test]
    fn test_client_with_http_scheme() {
        let config = PveConfig::new("127.0.0.1").port(18006).scheme(Scheme::Http);
        let client = PveClient::new(config).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:18006/api2/json");
    }

    #[test]
    fn test_client_rejects_missing_ca_file() {
        let config = PveConfig::new("pve1").tls(TlsPolicy::CustomCa {
            path: PathBuf::from("/nonexistent/pve-root-ca.pem"),
        });
        assert!(matches!(PveClient::new(config), Err(PveError::ConfigError(_))));
    }

    #[test]
    fn test_client_rejects_empty_host() {
        assert!(matches!(PveClient::with_host(""), Err(PveError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_no_credentials_before_login() {
        let client = PveClient::with_host("pve1").unwrap();
        assert!(!client.is_authenticated().await);
        assert!(client.session().await.is_none());

        client.set_api_token("root@pam!ci=secret").await;
        assert!(client.is_authenticated().await);
        assert!(client.session().await.is_none());

        client.logout().await;
        assert!(!client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_empty_username_is_rejected() {
        let client = PveClient::with_host("pve1").unwrap();
        assert!(matches!(
            client.login("", "secret").await,
            Err(PveError::AuthError(_))
        ));
    }
}
