//! 集成测试公共工具

#![allow(dead_code)]

use pve_client::{PveClient, PveConfig, Scheme};
use pve_mock_server::{MockConfig, MockServer};

pub const USERID: &str = "root@pam";
pub const PASSWORD: &str = "secret";

/// 启动模拟服务并创建指向它的客户端
pub async fn setup(config: MockConfig) -> (MockServer, PveClient) {
    let server = MockServer::start(config).await.expect("启动模拟服务失败");
    let client = client_for(&server);
    (server, client)
}

pub fn client_for(server: &MockServer) -> PveClient {
    PveClient::new(config_for(server)).expect("创建客户端失败")
}

pub fn config_for(server: &MockServer) -> PveConfig {
    PveConfig::new("127.0.0.1")
        .port(server.port())
        .scheme(Scheme::Http)
}

/// 启动一个只返回固定原始响应的 TCP 服务, 用于构造自定义状态行
pub async fn spawn_raw_http(response: &'static str) -> u16 {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("绑定端口失败");
    let port = listener.local_addr().expect("读取端口失败").port();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            // 读到请求头结束即可, 测试请求不带请求体
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    port
}
