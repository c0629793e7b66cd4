//! Mock robot endpoint for integration tests

use mockito::{Matcher, Mock, Server, ServerGuard};
use robot_webhook::transport::HttpTransport;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DINGTALK_PATH: &str = "/robot/send";
pub const FEISHU_PATH: &str = "/open-apis/bot/v2/hook/abc";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        init_tracing();
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    pub fn dingtalk_webhook(&self) -> String {
        format!("{}{}?access_token=abc", self.base_url, DINGTALK_PATH)
    }

    pub fn feishu_webhook(&self) -> String {
        format!("{}{}", self.base_url, FEISHU_PATH)
    }

    /// Transport that ignores proxy settings from the environment.
    pub fn transport(&self) -> HttpTransport {
        HttpTransport::with_client(
            reqwest::Client::builder()
                .no_proxy()
                .build()
                .expect("reqwest client"),
        )
    }

    /// Expect one POST at `path` whose query and body match, answering
    /// with `status` and `reply`.
    pub async fn mock_post(
        &self,
        path: &str,
        query: Matcher,
        body: Matcher,
        status: usize,
        reply: &str,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", path)
            .match_query(query)
            .match_body(body)
            .match_header("content-type", "application/json")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(reply)
            .expect(1)
            .create_async()
            .await
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
