//! Notifier Service クライアント
//!
//! ダイジェスト送信は Notifier Service の `board-summary` イベントとして
//! 委譲する。Notifier は配信失敗を HTTP 200 + `success: false` で返すため、
//! ステータスコードと `success` フラグの両方を検査する
//! （失敗時はウォーターマークを前進させてはならない）。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ClientError;

/// Notifier Service クライアントトレイト
#[async_trait]
pub trait NotifierClient: Send + Sync {
    /// `board-summary` イベントをディスパッチする
    ///
    /// Notifier が送信失敗（degraded）を報告した場合は
    /// [`ClientError::Rejected`] を返す。
    async fn send_board_summary(
        &self,
        event_data: Map<String, Value>,
    ) -> Result<(), ClientError>;
}

/// ディスパッチリクエスト（Notifier のワイヤ形式）
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotifyRequest {
    event_type: &'static str,
    event_data: Map<String, Value>,
}

/// ディスパッチレスポンス（必要なフィールドだけ取り出す）
#[derive(Debug, Deserialize)]
struct NotifyResponse {
    success: bool,
    error:   Option<String>,
}

/// reqwest ベースの Notifier Service クライアント
#[derive(Clone)]
pub struct HttpNotifierClient {
    base_url: String,
    client:   reqwest::Client,
}

impl HttpNotifierClient {
    /// 新しいクライアントを作成する
    ///
    /// # 引数
    ///
    /// - `base_url`: Notifier Service のベース URL（例: `http://localhost:3100`)
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client:   reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotifierClient for HttpNotifierClient {
    async fn send_board_summary(
        &self,
        event_data: Map<String, Value>,
    ) -> Result<(), ClientError> {
        let url = format!("{}/", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&NotifyRequest {
                event_type: "board-summary",
                event_data,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus { status, body });
        }

        let body: NotifyResponse = response.json().await?;
        if !body.success {
            return Err(ClientError::Rejected(
                body.error.unwrap_or_else(|| "原因不明".to_string()),
            ));
        }

        Ok(())
    }
}
