//! 认证会话管理
//!
//! 登录成功后得到 CSRF 令牌和认证票据 (`PVEAuthCookie`), 两者总是作为一个
//! 不可变的 [`Session`] 整体替换, 并发请求只会看到完整的旧会话、完整的新会话或没有会话。

use std::fmt;
use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::RequestBuilder;
use serde_json::Value;
use tokio::sync::RwLock;

/// 默认认证域
pub const DEFAULT_REALM: &str = "pam";

/// CSRF 令牌请求头
pub const CSRF_HEADER: &str = "CSRFPreventionToken";

/// 认证票据 Cookie 名
pub const AUTH_COOKIE: &str = "PVEAuthCookie";

/// 一次成功登录得到的会话
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    username: String,
    csrf_token: String,
    ticket: String,
}

impl Session {
    pub fn new(
        username: impl Into<String>,
        csrf_token: impl Into<String>,
        ticket: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            csrf_token: csrf_token.into(),
            ticket: ticket.into(),
        }
    }

    /// 从 `/access/ticket` 响应的 `data` 中提取会话
    ///
    /// 令牌和票据必须同时存在, 否则返回 `None`。
    pub fn from_ticket_data(data: &Value) -> Option<Self> {
        let csrf_token = data.get("CSRFPreventionToken")?.as_str()?;
        let ticket = data.get("ticket")?.as_str()?;
        let username = data.get("username").and_then(Value::as_str).unwrap_or_default();
        Some(Self::new(username, csrf_token, ticket))
    }

    /// 登录用户 (`user@realm`)
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn ticket(&self) -> &str {
        &self.ticket
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("csrf_token", &"***")
            .field("ticket", &"***")
            .finish()
    }
}

/// 当前生效的凭据
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// 票据认证 (CSRF 令牌 + Cookie)
    Ticket(Session),
    /// API Token 认证, 格式 `USER@REALM!TOKENID=SECRET`
    ApiToken(String),
}

impl Credentials {
    /// 把凭据附加到请求上
    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Ticket(session) => request
                .header(CSRF_HEADER, session.csrf_token())
                .header(COOKIE, format!("{}={}", AUTH_COOKIE, session.ticket())),
            Self::ApiToken(token) => {
                request.header(AUTHORIZATION, format!("PVEAPIToken={}", token))
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ticket(session) => f.debug_tuple("Ticket").field(session).finish(),
            Self::ApiToken(token) => {
                let id = token.split('=').next().unwrap_or_default();
                f.debug_tuple("ApiToken").field(&format!("{}=***", id)).finish()
            }
        }
    }
}

/// 凭据存储
///
/// 单写多读: 只有登录/登出/设置 Token 会写入, 每次写入都替换整个 `Arc`。
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<Arc<Credentials>>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前凭据快照
    pub async fn current(&self) -> Option<Arc<Credentials>> {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, credentials: Credentials) {
        *self.inner.write().await = Some(Arc::new(credentials));
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

/// 拆分 `user@realm` 形式的用户名, 没有 `@` 时使用默认域 `pam`
pub fn split_username(username: &str) -> (&str, &str) {
    match username.split_once('@') {
        Some((user, realm)) if !realm.is_empty() => (user, realm),
        Some((user, _)) => (user, DEFAULT_REALM),
        None => (username, DEFAULT_REALM),
    }
}
