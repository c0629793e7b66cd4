//! FeiShu robot against a mock webhook

use crate::integration::mock_server::{MockServerFixture, FEISHU_PATH};
use mockito::Matcher;
use robot_webhook::telemetry::InMemoryDeliverySink;
use robot_webhook::{Error, FeiShuRobot, RobotConfig, RobotMessage};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

const OK: &str = r#"{"code":0,"msg":"success","data":{}}"#;

fn robot(fixture: &MockServerFixture, secret: &str) -> FeiShuRobot {
    FeiShuRobot::with_transport(
        RobotConfig::new(fixture.feishu_webhook())
            .with_secret(secret)
            .with_flush_interval(Duration::from_secs(60)),
        fixture.transport(),
    )
    .expect("robot")
}

#[tokio::test]
async fn test_send_text_signs_in_body() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_post(
            FEISHU_PATH,
            Matcher::Any,
            Matcher::AllOf(vec![
                Matcher::PartialJson(json!({
                    "msg_type": "text",
                    "content": {"text": "Hello world!"},
                })),
                Matcher::Regex(r#""timestamp":"\d{10}""#.into()),
                Matcher::Regex(r#""sign":"[A-Za-z0-9+/=]{44}""#.into()),
            ]),
            200,
            OK,
        )
        .await;

    assert_ok!(robot(&fixture, "fssecret").send_text("Hello world!").await);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_api_error_code_is_surfaced() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_post(
            FEISHU_PATH,
            Matcher::Any,
            Matcher::Any,
            200,
            r#"{"code":19021,"msg":"sign match fail or timestamp is not within one hour from current time"}"#,
        )
        .await;

    match robot(&fixture, "stale").send_text("hi").await {
        Err(Error::Api { code, .. }) => assert_eq!(code, 19021),
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_legacy_status_code_is_checked() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_post(
            FEISHU_PATH,
            Matcher::Any,
            Matcher::Any,
            200,
            r#"{"StatusCode":9499,"StatusMessage":"Bad Request"}"#,
        )
        .await;

    let err = robot(&fixture, "").send_text("hi").await.unwrap_err();
    assert!(err.is_rejected());
}

#[tokio::test]
async fn test_digest_goes_out_as_post() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_post(
            FEISHU_PATH,
            Matcher::Any,
            Matcher::PartialJson(json!({
                "msg_type": "post",
                "content": {"post": {"zh_cn": {
                    "title": "nightly: 2",
                    "content": [
                        [{"tag": "text", "text": "backup ok"}],
                        [{"tag": "text", "text": "## Deploy\napi v2"}],
                    ],
                }}},
            })),
            200,
            OK,
        )
        .await;

    let sink = Arc::new(InMemoryDeliverySink::new(8));
    let robot = robot(&fixture, "fssecret")
        .with_sink(sink.clone())
        .with_title_formatter(|m| format!("nightly: {}", m.len()));

    let handle = robot.listen();
    robot.push("backup ok");
    robot.push(RobotMessage::markdown("Deploy", "api v2"));
    handle.stop().await;

    mock.assert_async().await;
    assert!(sink.failures().is_empty());
    assert_eq!(sink.len(), 1);
}
