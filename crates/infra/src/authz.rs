//! # 掲示板アクセス判定
//!
//! メンバーが掲示板を閲覧できるかどうかの認可チェックを提供する。
//!
//! ## 設計方針
//!
//! - **fail-closed**: 呼び出し側はチェックのエラーをアクセス拒否として扱う
//!   （ダイジェスト集計では当該掲示板をスキップする）
//! - **メンバーシップベース**: board_members テーブルの行の有無で判定する

use async_trait::async_trait;
use ekklesia_domain::{digest::BoardId, member::MemberId};
use sqlx::PgPool;

use crate::error::InfraError;

/// 掲示板アクセス判定トレイト
#[async_trait]
pub trait BoardAccessChecker: Send + Sync {
    /// メンバーが掲示板にアクセスできるかを返す
    async fn has_access(&self, board_id: &BoardId, member_id: &MemberId)
    -> Result<bool, InfraError>;
}

/// PostgreSQL 実装の BoardAccessChecker
#[derive(Debug, Clone)]
pub struct PostgresBoardAccessChecker {
    pool: PgPool,
}

impl PostgresBoardAccessChecker {
    /// 新しいチェッカーインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BoardAccessChecker for PostgresBoardAccessChecker {
    async fn has_access(
        &self,
        board_id: &BoardId,
        member_id: &MemberId,
    ) -> Result<bool, InfraError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM board_members
                WHERE board_id = $1 AND member_id = $2
            )
            "#,
        )
        .bind(board_id.as_uuid())
        .bind(member_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresBoardAccessChecker>();
    }
}
