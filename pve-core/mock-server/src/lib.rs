//! PVE API 模拟服务
//!
//! 只模拟客户端运行时会用到的部分接口:
//! - `POST /access/ticket`: 票据登录, 支持两步验证
//! - `GET /nodes/{node}/tasks/{upid}/status`: 前 N 次返回 `running`, 之后返回 `stopped`
//! - `POST /nodes/{node}/qemu/{vmid}/status/start`: 返回任务 UPID
//! - `ANY /echo`: 原样返回收到的参数和认证头
//! - `/errors/soft`, `/errors/hard`, `/empty`: 错误信封与空响应
//!
//! 除登录、echo 和错误路由外, 其余接口都要求有效的票据或 API Token,
//! 非 GET 请求还要求匹配的 CSRF 令牌。

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 伪造的 PNG 内容
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nmock-rrd";

/// 模拟服务配置
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// 完整用户名 `user@realm`
    pub userid: String,
    pub password: String,

    /// 设置后账户开启两步验证
    pub otp: Option<String>,

    /// 可用的 API Token (`USER@REALM!TOKENID=SECRET`)
    pub api_token: Option<String>,

    /// 任务状态前多少次查询返回 `running`
    pub running_polls: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            userid: "root@pam".to_string(),
            password: "secret".to_string(),
            otp: None,
            api_token: None,
            running_polls: 0,
        }
    }
}

impl MockConfig {
    /// 任务永远处于运行状态
    pub fn always_running(mut self) -> Self {
        self.running_polls = usize::MAX;
        self
    }

    pub fn running_polls(mut self, n: usize) -> Self {
        self.running_polls = n;
        self
    }

    pub fn otp(mut self, otp: &str) -> Self {
        self.otp = Some(otp.to_string());
        self
    }

    pub fn api_token(mut self, token: &str) -> Self {
        self.api_token = Some(token.to_string());
        self
    }
}

/// 模拟服务状态
#[derive(Debug, Default)]
pub struct MockState {
    config: MockConfig,

    /// 已签发的票据 -> CSRF 令牌
    tickets: Mutex<HashMap<String, String>>,

    /// 成功登录次数
    logins: AtomicUsize,

    /// 任务状态查询次数
    status_polls: AtomicUsize,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn status_polls(&self) -> usize {
        self.status_polls.load(Ordering::SeqCst)
    }

    /// 作废所有已签发的票据, 模拟票据过期
    pub fn revoke_tickets(&self) {
        if let Ok(mut tickets) = self.tickets.lock() {
            tickets.clear();
        }
    }

    /// 签发一对新的票据和 CSRF 令牌, 两者带相同的序号
    fn issue_ticket(&self, userid: &str) -> (String, String) {
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        let ticket = format!("PVE:{}:{:08X}::mock", userid, n);
        let csrf = format!("{:08X}:mock-csrf", n);
        if let Ok(mut tickets) = self.tickets.lock() {
            tickets.insert(ticket.clone(), csrf.clone());
        }
        (ticket, csrf)
    }

    /// 校验请求的认证信息
    fn authorized(&self, method: &Method, headers: &HeaderMap) -> bool {
        if let Some(auth) = header_str(headers, header::AUTHORIZATION.as_str()) {
            return self
                .config
                .api_token
                .as_ref()
                .map_or(false, |expected| auth == format!("PVEAPIToken={}", expected));
        }

        let Some(ticket) = auth_cookie(headers) else {
            return false;
        };
        let Ok(tickets) = self.tickets.lock() else {
            return false;
        };
        let Some(csrf) = tickets.get(&ticket) else {
            return false;
        };
        method == Method::GET || header_str(headers, "CSRFPreventionToken") == Some(csrf.as_str())
    }
}

/// 构建路由
pub fn app(state: Arc<MockState>) -> Router {
    let api = Router::new()
        .route("/access/ticket", post(create_ticket))
        .route("/version", get(version))
        .route("/nodes", get(list_nodes))
        .route("/nodes/:node/tasks/:upid/status", get(task_status))
        .route("/nodes/:node/qemu/:vmid/status/start", post(start_vm))
        .route("/echo", any(echo))
        .route("/errors/soft", get(soft_error))
        .route("/errors/hard", get(hard_error))
        .route("/empty", get(empty));

    let png = Router::new().route("/nodes/:node/rrd", get(rrd_png));

    Router::new()
        .nest("/api2/json", api)
        .nest("/api2/png", png)
        .with_state(state)
}

/// 在指定监听器上运行
pub async fn run(listener: TcpListener, state: Arc<MockState>) -> std::io::Result<()> {
    axum::serve(listener, app(state)).await
}

/// 后台运行的模拟服务, drop 时停止
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// 在 `127.0.0.1` 的随机端口启动
    pub async fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(MockState::new(config));

        let server_state = state.clone();
        let handle = tokio::spawn(async move {
            let _ = run(listener, server_state).await;
        });
        info!("PVE 模拟服务已启动: {}", addr);

        Ok(Self { addr, state, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn state(&self) -> &MockState {
        &self.state
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ============================================
// 处理函数
// ============================================

async fn create_ticket(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let config = &state.config;

    // 两步验证的第二步
    if let Some(challenge) = form.get("tfa-challenge") {
        let expected = config.otp.as_deref().map(|otp| format!("totp:{}", otp));
        let valid = challenge.ends_with(":tfa")
            && form.get("username") == Some(&config.userid)
            && form.get("password") == expected.as_ref();
        if !valid {
            return unauthorized();
        }
        return ticket_response(&state, &config.userid);
    }

    let userid = match (form.get("username"), form.get("realm")) {
        (Some(user), Some(realm)) => format!("{}@{}", user, realm),
        (Some(user), None) => user.clone(),
        _ => return unauthorized(),
    };
    if userid != config.userid || form.get("password") != Some(&config.password) {
        debug!("模拟登录失败: {}", userid);
        return unauthorized();
    }

    match &config.otp {
        Some(_) => Json(json!({
            "data": {
                "username": userid,
                "ticket": format!("PVE:{}:00000000::tfa", userid),
                "NeedTFA": 1,
            }
        }))
        .into_response(),
        None => ticket_response(&state, &userid),
    }
}

async fn version(
    State(state): State<Arc<MockState>>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&method, &headers) {
        return unauthorized();
    }
    Json(json!({
        "data": { "version": "8.1.4", "release": "8.1", "repoid": "ec5affc9e41f1d79" }
    }))
    .into_response()
}

async fn list_nodes(
    State(state): State<Arc<MockState>>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&method, &headers) {
        return unauthorized();
    }
    Json(json!({
        "data": [
            {
                "node": "pve1",
                "status": "online",
                "cpu": 0.05,
                "maxcpu": 8,
                "mem": 4096,
                "maxmem": 16384,
                "uptime": 3600,
            },
            { "node": "pve2", "status": "offline" },
        ]
    }))
    .into_response()
}

async fn task_status(
    State(state): State<Arc<MockState>>,
    Path((node, upid)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&method, &headers) {
        return unauthorized();
    }
    let poll = state.status_polls.fetch_add(1, Ordering::SeqCst) + 1;
    let running = poll <= state.config.running_polls;
    debug!("模拟任务状态查询 #{}: {} running={}", poll, upid, running);

    let mut data = json!({
        "upid": upid,
        "node": node,
        "status": if running { "running" } else { "stopped" },
        "type": "qmstart",
        "pid": 1234,
        "starttime": 1705095875,
    });
    if !running {
        data["exitstatus"] = json!("OK");
    }
    Json(json!({ "data": data })).into_response()
}

async fn start_vm(
    State(state): State<Arc<MockState>>,
    Path((node, vmid)): Path<(String, u32)>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&method, &headers) {
        return unauthorized();
    }
    let upid = format!("UPID:{}:00001234:00005678:65A1B2C3:qmstart:{}:root@pam:", node, vmid);
    Json(json!({ "data": upid })).into_response()
}

/// 原样返回收到的参数和认证头
async fn echo(
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> Json<Value> {
    let query = query.unwrap_or_default();
    Json(json!({
        "data": {
            "method": method.as_str(),
            "query": decode_pairs(&query),
            "body": decode_pairs(&body),
            "content_type": header_str(&headers, header::CONTENT_TYPE.as_str()),
            "csrf": header_str(&headers, "CSRFPreventionToken"),
            "cookie": auth_cookie(&headers),
            "authorization": header_str(&headers, header::AUTHORIZATION.as_str()),
        }
    }))
}

async fn soft_error() -> Json<Value> {
    Json(json!({ "errors": { "foo": "bad" } }))
}

async fn hard_error() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "errors": { "vmid": "invalid format - value does not look like a valid VM ID" },
            "data": null,
        })),
    )
        .into_response()
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn rrd_png(Path(_node): Path<String>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], Bytes::from_static(PNG_BYTES)).into_response()
}

// ============================================
// 辅助函数
// ============================================

fn ticket_response(state: &MockState, userid: &str) -> Response {
    let (ticket, csrf) = state.issue_ticket(userid);
    Json(json!({
        "data": {
            "username": userid,
            "ticket": ticket,
            "CSRFPreventionToken": csrf,
        }
    }))
    .into_response()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "data": null }))).into_response()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// 从 Cookie 头中取出 `PVEAuthCookie`
fn auth_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| pair.trim().strip_prefix("PVEAuthCookie=").map(str::to_string))
}

/// 解码 `a=1&b=2` 形式的参数, 保持顺序
fn decode_pairs(raw: &str) -> Value {
    let map: Map<String, Value> = url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_ticket_pairs() {
        let state = MockState::new(MockConfig::default());
        let (ticket, csrf) = state.issue_ticket("root@pam");
        assert_eq!(ticket, "PVE:root@pam:00000001::mock");
        assert_eq!(csrf, "00000001:mock-csrf");
        assert_eq!(state.logins(), 1);
    }

    #[test]
    fn test_authorized_requires_csrf_for_writes() {
        let state = MockState::new(MockConfig::default());
        let (ticket, csrf) = state.issue_ticket("root@pam");

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, format!("PVEAuthCookie={}", ticket).parse().unwrap());
        assert!(state.authorized(&Method::GET, &headers));
        assert!(!state.authorized(&Method::POST, &headers));

        headers.insert("csrfpreventiontoken", csrf.parse().unwrap());
        assert!(state.authorized(&Method::POST, &headers));
    }

    #[test]
    fn test_decode_pairs() {
        let value = decode_pairs("a=1&b=x%20y&c=p+q");
        assert_eq!(value, json!({ "a": "1", "b": "x y", "c": "p q" }));
        assert_eq!(decode_pairs(""), json!({}));
    }
}
