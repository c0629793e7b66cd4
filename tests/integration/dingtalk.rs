//! DingTalk robot against a mock webhook

use crate::integration::mock_server::{MockServerFixture, DINGTALK_PATH};
use mockito::Matcher;
use robot_webhook::telemetry::{
    CompositeDeliverySink, DeliveryEvent, DeliverySink, InMemoryDeliverySink, NoopDeliverySink,
};
use robot_webhook::{At, DingTalkRobot, Error, RobotConfig, RobotMessage};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const OK: &str = r#"{"errcode":0,"errmsg":"ok"}"#;

fn signed_query() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("access_token".into(), "abc".into()),
        Matcher::Regex(r"timestamp=\d{13}".into()),
        Matcher::Regex(r"sign=[A-Za-z0-9%]+".into()),
    ])
}

fn robot(fixture: &MockServerFixture, config: RobotConfig) -> DingTalkRobot {
    DingTalkRobot::with_transport(config, fixture.transport()).expect("robot")
}

#[tokio::test]
async fn test_send_text_is_signed() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_post(
            DINGTALK_PATH,
            signed_query(),
            Matcher::PartialJson(json!({
                "msgtype": "text",
                "text": {"content": "service started"},
                "at": {"atMobiles": ["13800000000"]},
            })),
            200,
            OK,
        )
        .await;

    let robot = robot(
        &fixture,
        RobotConfig::new(fixture.dingtalk_webhook()).with_secret("SECsecret"),
    )
    .with_at(At::mobiles(["13800000000"]));

    assert_ok!(robot.send("service started").await);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unsigned_robot_sends_bare_query() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_post(
            DINGTALK_PATH,
            Matcher::Exact("access_token=abc".into()),
            Matcher::PartialJson(json!({"msgtype": "link"})),
            200,
            OK,
        )
        .await;

    let robot = robot(&fixture, RobotConfig::new(fixture.dingtalk_webhook()));
    assert_ok!(
        robot
            .send(RobotMessage::link("Report", "weekly", "https://r/1"))
            .await
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_api_error_code_is_surfaced() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_post(
            DINGTALK_PATH,
            Matcher::Any,
            Matcher::Any,
            200,
            r#"{"errcode":310000,"errmsg":"sign not match"}"#,
        )
        .await;

    let robot = robot(
        &fixture,
        RobotConfig::new(fixture.dingtalk_webhook()).with_secret("wrong"),
    );
    match robot.send("hi").await {
        Err(Error::Api { code, message }) => {
            assert_eq!(code, 310000);
            assert_eq!(message, "sign not match");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_failure_is_remote_error() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_post(DINGTALK_PATH, Matcher::Any, Matcher::Any, 500, "oops")
        .await;

    let robot = robot(&fixture, RobotConfig::new(fixture.dingtalk_webhook()));
    let err = assert_err!(robot.send("hi").await);
    assert!(matches!(err, Error::Remote { status: 500, .. }));
}

#[tokio::test]
async fn test_digest_is_sent_on_stop() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_post(
            DINGTALK_PATH,
            signed_query(),
            Matcher::PartialJson(json!({
                "msgtype": "markdown",
                "markdown": {
                    "title": "3 messages",
                    "text": "A\n## Deploy\napi v2\n{\"job\":\"backup\"}\n",
                },
            })),
            200,
            OK,
        )
        .await;

    let sink = Arc::new(InMemoryDeliverySink::new(16));
    let robot = robot(
        &fixture,
        RobotConfig::new(fixture.dingtalk_webhook())
            .with_secret("SECsecret")
            .with_flush_interval(Duration::from_secs(60)),
    )
    .with_sink(sink.clone());

    let handle = robot.listen();
    robot.push("A");
    robot.push(RobotMessage::markdown("Deploy", "api v2"));
    robot.push(json!({"job": "backup"}));
    handle.stop().await;

    mock.assert_async().await;
    let events = sink.get_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], DeliveryEvent::Flushed(e) if e.count == 3));
}

#[tokio::test]
async fn test_failed_digest_is_reported_not_raised() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_post(DINGTALK_PATH, Matcher::Any, Matcher::Any, 502, "bad gateway")
        .await;

    let sink = Arc::new(InMemoryDeliverySink::new(16));
    let robot = robot(
        &fixture,
        RobotConfig::new(fixture.dingtalk_webhook()).with_title("ops"),
    )
    .with_sink(sink.clone());

    let handle = robot.listen();
    robot.push("lost");
    handle.stop().await;

    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].count, 1);
    assert!(failures[0].error.contains("502"));
    assert!(robot.collector().is_empty());
}

#[tokio::test]
async fn test_listening_twice_sends_one_digest_to_every_sink() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_post(
            DINGTALK_PATH,
            Matcher::Any,
            Matcher::PartialJson(json!({
                "msgtype": "markdown",
                "markdown": {"title": "2 messages", "text": "disk full\ndisk still full\n"},
            })),
            200,
            OK,
        )
        .await;

    let audit = Arc::new(InMemoryDeliverySink::new(16));
    let fanout = Arc::new(
        CompositeDeliverySink::new()
            .add_sink(audit.clone())
            .add_sink(Arc::new(NoopDeliverySink)),
    );
    let robot = robot(
        &fixture,
        RobotConfig::new(fixture.dingtalk_webhook()).with_flush_interval(Duration::from_secs(60)),
    )
    .with_sink(fanout.clone());

    let first = robot.listen();
    let second = robot.clone().listen();
    robot.push("disk full");
    robot.push("disk still full");
    first.stop().await;
    second.stop().await;

    mock.assert_async().await;
    let events = audit.get_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], DeliveryEvent::Flushed(e) if e.count == 2));
    assert_ok!(fanout.close().await);
}
