//! # Digest Service 設定
//!
//! 環境変数から Digest Batcher の設定を読み込む。

use std::env;

/// Digest Service の設定
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// データベース接続 URL
    pub database_url: String,
    /// Notifier Service のベース URL（board-summary イベントの送信先）
    pub notifier_url: String,
    /// 自分自身のベース URL（トランポリン自己呼び出し先）
    pub self_url: String,
    /// メール内リンクのベース URL（フロントエンド）
    pub view_base_url: String,
}

impl DigestConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, env::VarError> {
        let port: u16 = env::var("DIGEST_PORT")
            .expect("DIGEST_PORT が設定されていません")
            .parse()
            .expect("DIGEST_PORT は有効なポート番号である必要があります");

        Ok(Self {
            host: env::var("DIGEST_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL が設定されていません"),
            notifier_url: env::var("NOTIFIER_URL")
                .expect("NOTIFIER_URL が設定されていません"),
            self_url: env::var("DIGEST_SELF_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            view_base_url: env::var("DIGEST_VIEW_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        })
    }
}
