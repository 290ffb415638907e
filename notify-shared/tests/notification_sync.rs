use std::time::Duration;

use notify_shared::{
    AuthError, DispatchResult, FetchError, NotificationFilter, SyncConfig, SyncController, SyncError,
    SyncErrorKind, SyncState,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_INFO_PATH: &str = "/uPortal/api/v5-1/userinfo";
const NOTIFICATIONS_PATH: &str = "/NotificationPortlet/api/v2/notifications";

fn config_for(server: &MockServer) -> SyncConfig {
    SyncConfig::new(
        &format!("{}{}", server.uri(), USER_INFO_PATH),
        &format!("{}{}", server.uri(), NOTIFICATIONS_PATH),
    )
    .expect("valid mock server urls")
}

async fn mount_token(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(USER_INFO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(token))
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_unread_count_counts_missing_read_attribute() {
    let server = MockServer::start().await;
    mount_token(&server, "T1", 1).await;
    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .and(header("Authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "attributes": {"READ": ["true"]}},
            {"id": 2, "attributes": {}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let controller = SyncController::new(&config_for(&server)).unwrap();
    controller.refresh().await.unwrap();

    assert_eq!(controller.state(), SyncState::Ready);
    assert_eq!(controller.unread_count().await, 1);
    let unread: Vec<String> = controller.store().unread().await.into_iter().map(|n| n.id).collect();
    assert_eq!(unread, vec!["2".to_string()]);
}

#[tokio::test]
async fn test_unauthorized_fetch_refreshes_token_and_retries_once() {
    let server = MockServer::start().await;
    mount_token(&server, "T1", 1).await;
    mount_token(&server, "T2", 1).await;

    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .and(header("Authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .and(header("Authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "a", "title": "Registration opens", "url": "/reg"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let controller = SyncController::new(&config_for(&server)).unwrap();
    controller.refresh().await.unwrap();

    assert_eq!(controller.all().await.len(), 1);
    // Call counts are verified by the mocks' expectations when the server drops.
}

#[tokio::test]
async fn test_repeated_rejection_surfaces_auth_error() {
    let server = MockServer::start().await;
    mount_token(&server, "T1", 2).await;
    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let controller = SyncController::new(&config_for(&server)).unwrap();
    let result = controller.refresh().await;

    assert_eq!(result, Err(SyncError::Auth(AuthError::CredentialRejected)));
    assert_eq!(controller.state(), SyncState::Error(SyncErrorKind::Auth));
}

#[tokio::test]
async fn test_identity_failure_never_reaches_notification_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_INFO_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let controller = SyncController::new(&config_for(&server)).unwrap();

    assert_eq!(
        controller.refresh().await,
        Err(SyncError::Auth(AuthError::IdentityRejected(403)))
    );
    assert_eq!(controller.state(), SyncState::Error(SyncErrorKind::Auth));
}

#[tokio::test]
async fn test_malformed_payload_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    mount_token(&server, "T1", 1).await;
    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 7, "title": "Kept"}])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"broken\":"))
        .expect(1)
        .mount(&server)
        .await;

    let controller = SyncController::new(&config_for(&server)).unwrap();
    controller.refresh().await.unwrap();
    let result = controller.refresh().await;

    assert!(matches!(result, Err(SyncError::Fetch(FetchError::MalformedPayload(_)))));
    assert_eq!(controller.state(), SyncState::Error(SyncErrorKind::Fetch));
    let kept = controller.all().await;
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].title, "Kept");
}

#[tokio::test]
async fn test_expired_token_is_requested_again_before_fetching() {
    let server = MockServer::start().await;
    mount_token(&server, "T1", 1).await;
    mount_token(&server, "T2", 1).await;
    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .and(header("Authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .and(header("Authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server).with_token_ttl(Duration::from_millis(300));
    let controller = SyncController::new(&config).unwrap();

    controller.refresh().await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    controller.refresh().await.unwrap();

    assert_eq!(controller.state(), SyncState::Ready);
}

#[tokio::test]
async fn test_filter_is_sent_as_query_parameters() {
    let server = MockServer::start().await;
    mount_token(&server, "T1", 1).await;
    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .and(query_param("days", "1"))
        .and(query_param("refresh", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .and(query_param("days", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let controller = SyncController::new(&config_for(&server)).unwrap();
    controller.refresh().await.unwrap();
    controller.set_filter(NotificationFilter { days: Some(30) }).await.unwrap();

    assert_eq!(controller.all().await.len(), 1);
}

#[tokio::test]
async fn test_mark_read_action_posts_and_flips_only_that_notification() {
    let server = MockServer::start().await;
    mount_token(&server, "T1", 1).await;
    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "n1", "url": "/p/grades", "attributes": {"READ": ["false"]},
             "availableActions": [{"id": "MarkAsReadAndRedirectAction", "apiUrl": "/x"}]},
            {"id": "n2", "url": "/p/library", "attributes": {"READ": ["false"]}}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/x"))
        .and(header("Authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let controller = SyncController::new(&config_for(&server)).unwrap();
    controller.refresh().await.unwrap();
    let before = controller.all().await;

    let result = controller.invoke(&before[0]).await.unwrap();

    assert_eq!(
        result,
        DispatchResult::Navigated {
            id: "n1".to_string(),
            url: "/p/grades".to_string()
        }
    );
    let after = controller.all().await;
    assert!(after[0].is_read);
    assert_eq!(after[1], before[1]);
    assert_eq!(controller.unread_count().await, 1);
}

#[tokio::test]
async fn test_failed_mark_read_leaves_state_untouched() {
    let server = MockServer::start().await;
    mount_token(&server, "T1", 1).await;
    Mock::given(method("GET"))
        .and(path(NOTIFICATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "n1", "url": "/p/grades",
             "availableActions": [{"id": "MarkAsReadAndRedirectAction", "apiUrl": "/x"}]}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let controller = SyncController::new(&config_for(&server)).unwrap();
    controller.refresh().await.unwrap();
    let before = controller.all().await;

    let result = controller.invoke(&before[0]).await;

    assert_eq!(result, Err(notify_shared::ActionError::Status(502)));
    assert_eq!(controller.all().await, before);
    assert_eq!(controller.state(), SyncState::Ready);
}
