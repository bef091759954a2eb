//! # 配信プロバイダクライアント
//!
//! テンプレートメールの送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `DeliverySender` trait でメール送信を抽象化
//! - **2 つの実装**: Provider（ホスト型テンプレート API、本番用）、
//!   Noop（テスト・通知無効化時用）
//! - **環境変数切替**: `DELIVERY_BACKEND` でランタイム選択

mod noop;
mod provider;

use async_trait::async_trait;
use ekklesia_domain::delivery::{DeliveryError, TemplatedEmail};
pub use noop::NoopDeliverySender;
pub use provider::HttpDeliverySender;

/// メール送信トレイト
///
/// 配信基盤の中核。テンプレートメール送信の具体的な方法を抽象化する。
/// 1 回の呼び出しで to と cc をまとめた 1 通の送信を行う。
#[async_trait]
pub trait DeliverySender: Send + Sync {
    /// テンプレートメールを送信する
    async fn send(&self, email: &TemplatedEmail) -> Result<(), DeliveryError>;
}
