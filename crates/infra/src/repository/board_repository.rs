//! # BoardRepository
//!
//! 掲示板の列挙とアクティビティ集計クエリを担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **アーカイブ除外**: 掲示板・スレッドともにアーカイブ済みは集計対象外
//! - **削除済みメッセージ除外**: `deleted` フラグの立った行は数えない
//! - **ウィンドウはパラメータ**: 24 時間クランプの計算はドメイン層
//!   （`activity_window_start`）が行い、ここでは境界時刻を受け取るだけ

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ekklesia_domain::digest::{Board, BoardId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// 掲示板リポジトリトレイト
#[async_trait]
pub trait BoardRepository: Send + Sync {
    /// アーカイブされていない掲示板をすべて取得する
    ///
    /// 返却順序は保証しない（呼び出し側は順序に依存しないこと）。
    async fn find_active_boards(&self) -> Result<Vec<Board>, InfraError>;

    /// ウィンドウ開始以降に作成されたメッセージ数を数える
    ///
    /// 対象: 掲示板内のアーカイブされていないスレッドに属する、
    /// 削除されていないメッセージ。
    async fn count_messages_since(
        &self,
        board_id: &BoardId,
        since: DateTime<Utc>,
    ) -> Result<i64, InfraError>;

    /// ウィンドウ開始以降の返信メッセージ数を数える
    ///
    /// [`count_messages_since`](Self::count_messages_since) の条件に加え、
    /// 返信先参照（`reply_to`）を持つものだけを数える。
    async fn count_replies_since(
        &self,
        board_id: &BoardId,
        since: DateTime<Utc>,
    ) -> Result<i64, InfraError>;

    /// ウィンドウ開始以降に作成されたスレッド数を数える
    async fn count_threads_since(
        &self,
        board_id: &BoardId,
        since: DateTime<Utc>,
    ) -> Result<i64, InfraError>;
}

/// boards テーブルの行表現
#[derive(Debug, sqlx::FromRow)]
struct BoardRow {
    id:   Uuid,
    name: String,
}

/// PostgreSQL 実装の BoardRepository
#[derive(Debug, Clone)]
pub struct PostgresBoardRepository {
    pool: PgPool,
}

impl PostgresBoardRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BoardRepository for PostgresBoardRepository {
    async fn find_active_boards(&self) -> Result<Vec<Board>, InfraError> {
        let rows = sqlx::query_as::<_, BoardRow>(
            r#"
            SELECT id, name
            FROM boards
            WHERE NOT archived
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Board {
                id:   BoardId::from_uuid(row.id),
                name: row.name,
            })
            .collect())
    }

    async fn count_messages_since(
        &self,
        board_id: &BoardId,
        since: DateTime<Utc>,
    ) -> Result<i64, InfraError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages msg
            INNER JOIN threads t ON t.id = msg.thread_id
            WHERE t.board_id = $1
              AND NOT t.archived
              AND NOT msg.deleted
              AND msg.created_at > $2
            "#,
        )
        .bind(board_id.as_uuid())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_replies_since(
        &self,
        board_id: &BoardId,
        since: DateTime<Utc>,
    ) -> Result<i64, InfraError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages msg
            INNER JOIN threads t ON t.id = msg.thread_id
            WHERE t.board_id = $1
              AND NOT t.archived
              AND NOT msg.deleted
              AND msg.reply_to IS NOT NULL
              AND msg.created_at > $2
            "#,
        )
        .bind(board_id.as_uuid())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_threads_since(
        &self,
        board_id: &BoardId,
        since: DateTime<Utc>,
    ) -> Result<i64, InfraError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM threads
            WHERE board_id = $1
              AND NOT archived
              AND created_at > $2
            "#,
        )
        .bind(board_id.as_uuid())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresBoardRepository>();
    }
}
