//! 任务轮询测试

mod common;

use std::time::{Duration, Instant};

use pve_client::{CancellationToken, Params, PveError, TaskWait, Upid, WaitOptions};
use pve_mock_server::MockConfig;

use common::{setup, PASSWORD, USERID};

const UPID: &str = "UPID:pve1:00001234:00005678:65A1B2C3:qmstart:100:root@pam:";

#[tokio::test]
async fn test_wait_polls_until_stopped() {
    let (server, client) = setup(MockConfig::default().running_polls(3)).await;
    assert!(client.login(USERID, PASSWORD).await.unwrap());

    let finished = client
        .wait_for_task_to_finish("pve1", UPID, WaitOptions::from_millis(20, 5000))
        .await
        .unwrap();

    assert!(finished);
    // 3 次 running + 1 次 stopped
    assert_eq!(server.state().status_polls(), 4);
    assert_eq!(
        client.get_exit_status_task("pve1", UPID).await.unwrap().as_deref(),
        Some("OK")
    );
}

#[tokio::test]
async fn test_wait_returns_immediately_for_finished_task() {
    let (server, client) = setup(MockConfig::default()).await;
    assert!(client.login(USERID, PASSWORD).await.unwrap());

    let started = Instant::now();
    let finished = client
        .wait_for_task_to_finish("pve1", UPID, WaitOptions::default())
        .await
        .unwrap();

    assert!(finished);
    assert_eq!(server.state().status_polls(), 1);
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_wait_times_out() {
    let (_server, client) = setup(MockConfig::default().always_running()).await;
    assert!(client.login(USERID, PASSWORD).await.unwrap());

    let started = Instant::now();
    let finished = client
        .wait_for_task_to_finish("pve1", UPID, WaitOptions::from_millis(500, 1000))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(!finished);
    assert!(elapsed >= Duration::from_millis(1000), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1500), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_wait_can_be_cancelled() {
    let (_server, client) = setup(MockConfig::default().always_running()).await;
    assert!(client.login(USERID, PASSWORD).await.unwrap());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = client
        .wait_for_task("pve1", UPID, WaitOptions::from_millis(100, 10_000), &cancel)
        .await
        .unwrap();

    assert_eq!(outcome, TaskWait::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_task_status_while_running() {
    let (_server, client) = setup(MockConfig::default().running_polls(1)).await;
    assert!(client.login(USERID, PASSWORD).await.unwrap());

    let status = client.task_status("pve1", UPID).await.unwrap();
    assert!(status.is_running());
    assert_eq!(status.exitstatus, None);

    assert!(!client.task_is_running("pve1", UPID).await.unwrap());
}

#[tokio::test]
async fn test_wait_for_start_result() {
    let (server, client) = setup(MockConfig::default().running_polls(2)).await;
    assert!(client.login(USERID, PASSWORD).await.unwrap());

    let result = client.node("pve1").qemu(100).start(&Params::new()).await.unwrap();
    assert!(result.is_ok());

    let upid: Upid = result.upid().unwrap();
    assert_eq!(upid.node, "pve1");
    assert_eq!(upid.task_type, "qmstart");
    assert_eq!(upid.id, "100");
    assert_eq!(upid.user, "root@pam");

    let finished = client
        .wait_for_result(&result, WaitOptions::from_millis(20, 5000))
        .await
        .unwrap();
    assert!(finished);
    assert_eq!(server.state().status_polls(), 3);
}

#[tokio::test]
async fn test_wait_for_failed_result() {
    let (server, client) = setup(MockConfig::default()).await;

    // 未登录, 启动请求被拒绝
    let result = client.node("pve1").qemu(100).start(&Params::new()).await.unwrap();
    assert_eq!(result.status_code(), 401);

    let finished = client
        .wait_for_result(&result, WaitOptions::default())
        .await
        .unwrap();
    assert!(!finished);
    assert_eq!(server.state().status_polls(), 0);
}

#[tokio::test]
async fn test_unreadable_status_is_not_completion() {
    let (server, client) = setup(MockConfig::default().always_running()).await;

    // 未登录, 状态读取返回 401
    let outcome = client
        .wait_for_task_to_finish("pve1", UPID, WaitOptions::from_millis(50, 1000))
        .await;
    assert!(matches!(outcome, Err(PveError::ApiError(401, _))), "{:?}", outcome);
    assert_eq!(server.state().status_polls(), 0);

    assert!(matches!(
        client.task_is_running("pve1", UPID).await,
        Err(PveError::ApiError(401, _))
    ));
    assert!(matches!(
        client.get_exit_status_task("pve1", UPID).await,
        Err(PveError::ApiError(401, _))
    ));
}

#[tokio::test]
async fn test_ticket_expiring_during_wait() {
    let (server, client) = setup(MockConfig::default().always_running()).await;
    assert!(client.login(USERID, PASSWORD).await.unwrap());

    let (outcome, _) = tokio::join!(
        client.wait_for_task_to_finish("pve1", UPID, WaitOptions::from_millis(50, 5000)),
        async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            server.state().revoke_tickets();
        }
    );

    assert!(matches!(outcome, Err(PveError::ApiError(401, _))), "{:?}", outcome);
    assert!(server.state().status_polls() >= 1);
}
