//! # WatermarkRepository
//!
//! メンバー × 掲示板ごとの最終通知時刻（ウォーターマーク）を永続化する
//! リポジトリ。
//!
//! ## ライフサイクル
//!
//! - 最初の通知まで行は存在しない
//! - ダイジェスト送信成功後に upsert で作成または前進する
//! - このサブシステムからは削除しない

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ekklesia_domain::{digest::BoardId, member::MemberId};
use sqlx::PgPool;

use crate::error::InfraError;

/// ウォーターマークリポジトリトレイト
#[async_trait]
pub trait WatermarkRepository: Send + Sync {
    /// メンバー × 掲示板の最終通知時刻を取得する
    ///
    /// 一度も通知されていない場合は `Ok(None)` を返す。
    async fn find(
        &self,
        member_id: &MemberId,
        board_id: &BoardId,
    ) -> Result<Option<DateTime<Utc>>, InfraError>;

    /// 最終通知時刻を作成または上書きする
    ///
    /// ダイジェスト送信が成功した掲示板に対してのみ呼び出すこと。
    async fn upsert(
        &self,
        member_id: &MemberId,
        board_id: &BoardId,
        last_notified_at: DateTime<Utc>,
    ) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の WatermarkRepository
#[derive(Debug, Clone)]
pub struct PostgresWatermarkRepository {
    pool: PgPool,
}

impl PostgresWatermarkRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatermarkRepository for PostgresWatermarkRepository {
    async fn find(
        &self,
        member_id: &MemberId,
        board_id: &BoardId,
    ) -> Result<Option<DateTime<Utc>>, InfraError> {
        let row: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT last_notified_at
            FROM board_watermarks
            WHERE member_id = $1 AND board_id = $2
            "#,
        )
        .bind(member_id.as_uuid())
        .bind(board_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn upsert(
        &self,
        member_id: &MemberId,
        board_id: &BoardId,
        last_notified_at: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO board_watermarks (member_id, board_id, last_notified_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (member_id, board_id)
            DO UPDATE SET last_notified_at = EXCLUDED.last_notified_at
            "#,
        )
        .bind(member_id.as_uuid())
        .bind(board_id.as_uuid())
        .bind(last_notified_at)
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
        assert_send_sync::<PostgresWatermarkRepository>();
    }
}
