//! トランポリン自己呼び出しクライアント
//!
//! フルページを処理した後、同じ関数を新しい HTTP 呼び出しとして起動し、
//! プロセス内ループなしでページングを継続する。呼び出しは同期的で、
//! 次ページの結果（JSON）はこの呼び出しのレスポンスに埋め込まれる。

use async_trait::async_trait;
use ekklesia_domain::digest::BatchCursor;
use serde::Serialize;

use super::ClientError;
use crate::usecase::batch::BatchReport;

/// バッチ自己呼び出しトレイト
#[async_trait]
pub trait BatchInvoker: Send + Sync {
    /// 次ページのバッチを起動し、その結果を返す
    async fn invoke_next(&self, cursor: &BatchCursor) -> Result<BatchReport, ClientError>;
}

/// 自己呼び出しリクエスト（ワイヤ形式）
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchRunRequest {
    offset:     i64,
    iteration:  u32,
    start_time: i64,
}

/// reqwest ベースのトランポリン実装
#[derive(Clone)]
pub struct HttpBatchInvoker {
    self_url: String,
    client:   reqwest::Client,
}

impl HttpBatchInvoker {
    /// 新しいトランポリンを作成する
    ///
    /// # 引数
    ///
    /// - `self_url`: この Digest Service 自身のベース URL
    pub fn new(self_url: &str) -> Self {
        Self {
            self_url: self_url.trim_end_matches('/').to_string(),
            client:   reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BatchInvoker for HttpBatchInvoker {
    async fn invoke_next(&self, cursor: &BatchCursor) -> Result<BatchReport, ClientError> {
        let url = format!("{}/", self.self_url);
        let response = self
            .client
            .post(&url)
            .json(&BatchRunRequest {
                offset:     cursor.offset,
                iteration:  cursor.iteration,
                start_time: cursor.start_time_ms,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus { status, body });
        }

        Ok(response.json::<BatchReport>().await?)
    }
}
