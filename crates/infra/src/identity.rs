//! # ベアラートークン検証
//!
//! Redis に保存された認証トークンを解決し、アカウント ID を取得する。
//! テストモード送信の管理者チェックでのみ使用される。
//!
//! ## Redis キー設計
//!
//! | キー | 値 | TTL |
//! |-----|-----|-----|
//! | `auth_token:{token}` | アカウント ID（UUID 文字列） | 認証基盤が発行時に設定 |

use async_trait::async_trait;
use ekklesia_domain::member::AccountId;
use redis::{AsyncCommands, aio::ConnectionManager};
use uuid::Uuid;

use crate::error::InfraError;

/// Redis 接続マネージャを作成する
///
/// 起動時に一度だけ呼び出し、以後は clone して使い回す
/// （`ConnectionManager` は内部で再接続を管理する）。
pub async fn create_connection_manager(
    redis_url: &str,
) -> Result<ConnectionManager, redis::RedisError> {
    let client = redis::Client::open(redis_url)?;
    ConnectionManager::new(client).await
}

/// ベアラートークン検証トレイト
///
/// トークン文字列を認証済みアカウント ID に解決する。
/// 未知・期限切れのトークンは `Ok(None)` を返す（エラーではない）。
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// トークンを検証し、対応するアカウント ID を返す
    async fn verify(&self, token: &str) -> Result<Option<AccountId>, InfraError>;
}

/// Redis を使用したトークン検証
pub struct RedisTokenVerifier {
    conn: ConnectionManager,
}

impl RedisTokenVerifier {
    /// 新しいトークン検証インスタンスを作成する
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn key(token: &str) -> String {
        format!("auth_token:{token}")
    }
}

#[async_trait]
impl TokenVerifier for RedisTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Option<AccountId>, InfraError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(Self::key(token)).await?;

        let Some(value) = value else {
            return Ok(None);
        };

        let uuid = Uuid::parse_str(&value).map_err(|e| {
            InfraError::unexpected(format!("トークンに対応するアカウント ID が不正: {e}"))
        })?;

        Ok(Some(AccountId::from_uuid(uuid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RedisTokenVerifier>();
    }

    #[test]
    fn キーはプレフィックス付きで構築される() {
        assert_eq!(RedisTokenVerifier::key("abc123"), "auth_token:abc123");
    }
}
