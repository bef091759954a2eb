//! # DeliveryLogRepository
//!
//! 配信ログの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **fire-and-forget ログ**: 送信成功・失敗どちらも記録する
//! - **ログ記録の失敗は握りつぶす**: 呼び出し側（ディスパッチユースケース）は
//!   insert の失敗をログ出力のみで処理し、ディスパッチ結果には影響させない

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ekklesia_domain::{delivery::DeliveryLogId, event::EventType};
use sqlx::PgPool;

use crate::error::InfraError;

/// 配信ログ（リポジトリ INSERT 用データ型）
#[derive(Debug, Clone)]
pub struct DeliveryLog {
    pub id: DeliveryLogId,
    pub event_type: EventType,
    pub recipient_emails: Vec<String>,
    pub cc_emails: Vec<String>,
    pub subject: String,
    pub template_id: String,
    pub status: String,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// 配信ログリポジトリトレイト
#[async_trait]
pub trait DeliveryLogRepository: Send + Sync {
    /// 配信ログを挿入する
    async fn insert(&self, log: &DeliveryLog) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の DeliveryLogRepository
#[derive(Debug, Clone)]
pub struct PostgresDeliveryLogRepository {
    pool: PgPool,
}

impl PostgresDeliveryLogRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryLogRepository for PostgresDeliveryLogRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn insert(&self, log: &DeliveryLog) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO delivery_logs (
                id, event_type, recipient_emails, cc_emails,
                subject, template_id, status, error_message, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(log.id.as_uuid())
        .bind(log.event_type.to_string())
        .bind(&log.recipient_emails)
        .bind(&log.cc_emails)
        .bind(&log.subject)
        .bind(&log.template_id)
        .bind(&log.status)
        .bind(&log.error_message)
        .bind(log.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresDeliveryLogRepository>();
    }
}
