//! 认证与会话测试

mod common;

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use pve_client::{Params, PveClient};
use pve_mock_server::MockConfig;

use common::{setup, PASSWORD, USERID};

/// 从 echo 响应中取出认证头
fn echoed(data: &Value, key: &str) -> Option<String> {
    data[key].as_str().map(str::to_string)
}

#[tokio::test]
async fn test_no_auth_headers_before_login() {
    let (_server, client) = setup(MockConfig::default()).await;

    let result = client.create("/echo", &Params::new().with("a", 1)).await.unwrap();
    let data = result.data();
    assert_eq!(echoed(data, "csrf"), None);
    assert_eq!(echoed(data, "cookie"), None);
    assert_eq!(echoed(data, "authorization"), None);
}

#[tokio::test]
async fn test_auth_headers_after_login() {
    let (server, client) = setup(MockConfig::default()).await;

    assert!(client.login(USERID, PASSWORD).await.unwrap());
    assert_eq!(server.state().logins(), 1);

    let session = client.session().await.unwrap();
    assert_eq!(session.username(), USERID);
    assert_eq!(session.ticket(), "PVE:root@pam:00000001::mock");
    assert_eq!(session.csrf_token(), "00000001:mock-csrf");

    for result in [
        client.get("/echo", &Params::new()).await.unwrap(),
        client.create("/echo", &Params::new()).await.unwrap(),
    ] {
        let data = result.data();
        assert_eq!(echoed(data, "csrf").as_deref(), Some(session.csrf_token()));
        assert_eq!(echoed(data, "cookie").as_deref(), Some(session.ticket()));
    }

    // 受保护的接口
    let version = client.version().info().await.unwrap();
    assert_eq!(version.release, "8.1");
    let nodes = client.nodes().list_items().await.unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].node, "pve1");
}

#[tokio::test]
async fn test_login_forms_are_equivalent() {
    let (server, client) = setup(MockConfig::default()).await;

    assert!(client.login("root@pam", PASSWORD).await.unwrap());
    assert!(client.login_with_realm("root", PASSWORD, "pam").await.unwrap());
    // 不带域时默认 pam
    assert!(client.login("root", PASSWORD).await.unwrap());
    assert_eq!(server.state().logins(), 3);

    // 每次登录都整体替换会话
    let session = client.session().await.unwrap();
    assert_eq!(session.csrf_token(), "00000003:mock-csrf");

    assert!(!client.login("root@pve", PASSWORD).await.unwrap());
}

#[tokio::test]
async fn test_failed_login_keeps_previous_session() {
    let (_server, client) = setup(MockConfig::default()).await;

    assert!(client.login(USERID, PASSWORD).await.unwrap());
    let before = client.session().await.unwrap();

    assert!(!client.login(USERID, "wrong").await.unwrap());
    assert_eq!(client.session().await, Some(before.clone()));

    let result = client.get("/echo", &Params::new()).await.unwrap();
    assert_eq!(echoed(result.data(), "cookie").as_deref(), Some(before.ticket()));
}

#[tokio::test]
async fn test_failed_first_login_leaves_no_session() {
    let (_server, client) = setup(MockConfig::default()).await;

    assert!(!client.login(USERID, "wrong").await.unwrap());
    assert!(!client.is_authenticated().await);
}

#[tokio::test]
async fn test_two_factor_login() {
    let (server, client) = setup(MockConfig::default().otp("123456")).await;

    // 缺少 OTP
    assert!(!client.login(USERID, PASSWORD).await.unwrap());
    assert!(client.session().await.is_none());

    // 错误的 OTP
    assert!(!client
        .login_with_otp("root", PASSWORD, "pam", Some("000000"))
        .await
        .unwrap());

    assert!(client
        .login_with_otp("root", PASSWORD, "pam", Some("123456"))
        .await
        .unwrap());
    assert_eq!(server.state().logins(), 1);
    assert!(client.version().info().await.is_ok());
}

#[tokio::test]
async fn test_api_token_header() {
    let token = "root@pam!ci=0b5e4f6a-6f8c-4b8e-9f3e-2d1c0a9b8e7f";
    let (_server, client) = setup(MockConfig::default().api_token(token)).await;

    client.set_api_token(token).await;
    assert!(client.is_authenticated().await);

    let result = client.create("/echo", &Params::new()).await.unwrap();
    let data = result.data();
    assert_eq!(
        echoed(data, "authorization"),
        Some(format!("PVEAPIToken={}", token))
    );
    assert_eq!(echoed(data, "csrf"), None);
    assert_eq!(echoed(data, "cookie"), None);

    let version = client.version().get().await.unwrap();
    assert!(version.is_ok());

    client.logout().await;
    let version = client.version().get().await.unwrap();
    assert_eq!(version.status_code(), 401);
}

#[tokio::test]
async fn test_concurrent_requests_see_consistent_session() {
    let (_server, client) = setup(MockConfig::default()).await;
    let client = Arc::new(client);
    assert!(client.login(USERID, PASSWORD).await.unwrap());

    let relogin = {
        let client = client.clone();
        tokio::spawn(async move {
            for _ in 0..10 {
                assert!(client.login(USERID, PASSWORD).await.unwrap());
            }
        })
    };

    let requests = (0..50).map(|i| {
        let client = client.clone();
        async move { client.create("/echo", &Params::new().with("i", i)).await }
    });
    let results = join_all(requests).await;
    relogin.await.unwrap();

    for result in results {
        let result = result.unwrap();
        let data = result.data();
        let csrf = echoed(data, "csrf").unwrap();
        let cookie = echoed(data, "cookie").unwrap();

        // 票据与令牌带相同的序号
        let serial = csrf.split(':').next().unwrap();
        assert_eq!(cookie, format!("PVE:root@pam:{}::mock", serial));
    }
}
