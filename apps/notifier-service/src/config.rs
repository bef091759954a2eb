//! # Notifier Service 設定
//!
//! 環境変数から Notifier Service の設定を読み込む。

use std::env;

/// Notifier Service の設定
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// データベース接続 URL
    pub database_url: String,
    /// Redis 接続 URL（テストモードのトークン検証用）
    pub redis_url: String,
    /// 配信設定
    pub delivery: DeliveryConfig,
}

/// 配信機能の設定
///
/// `DELIVERY_BACKEND` 環境変数で送信バックエンドを切り替える:
/// - `provider`: ホスト型テンプレート API 経由で送信（本番）
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// 送信バックエンド（"provider" | "noop"）
    pub backend:          String,
    /// プロバイダ API のベース URL（backend=provider の場合に使用）
    pub provider_url:     String,
    /// プロバイダ API キー（backend=provider の場合に使用）
    pub provider_api_key: String,
    /// 送信元メールアドレス
    pub from_address:     String,
}

impl NotifierConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            host: env::var("NOTIFIER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("NOTIFIER_PORT")
                .expect("NOTIFIER_PORT が設定されていません")
                .parse()
                .expect("NOTIFIER_PORT は有効なポート番号である必要があります"),
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL が設定されていません"),
            redis_url: env::var("REDIS_URL").expect("REDIS_URL が設定されていません"),
            delivery: DeliveryConfig::from_env(),
        })
    }
}

impl DeliveryConfig {
    /// 環境変数から配信設定を読み込む
    fn from_env() -> Self {
        Self {
            backend:          env::var("DELIVERY_BACKEND").unwrap_or_else(|_| "noop".to_string()),
            provider_url:     env::var("DELIVERY_PROVIDER_URL")
                .unwrap_or_else(|_| "https://api.mail.example.com".to_string()),
            provider_api_key: env::var("DELIVERY_PROVIDER_API_KEY").unwrap_or_default(),
            from_address:     env::var("DELIVERY_FROM_ADDRESS")
                .unwrap_or_else(|_| "noreply@ekklesia.example.com".to_string()),
        }
    }
}
