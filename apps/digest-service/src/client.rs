//! # 内部サービスクライアント
//!
//! Digest Batcher が行う 2 種類の外向き HTTP 呼び出しを trait で抽象化する:
//!
//! - [`NotifierClient`] - Notifier Service への `board-summary` イベント送信
//! - [`BatchInvoker`] - 次ページ処理のための自己呼び出し（トランポリン）
//!
//! どちらも本番実装は reqwest ベース。テストではインメモリのスタブに
//! 差し替える。

pub mod notifier;
pub mod trampoline;

use axum::http::StatusCode;
pub use notifier::{HttpNotifierClient, NotifierClient};
use thiserror::Error;
pub use trampoline::{BatchInvoker, HttpBatchInvoker};

/// 内部サービス呼び出しのエラー
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP リクエストの失敗（接続・タイムアウトなど）
    #[error("HTTP リクエスト失敗: {0}")]
    Http(#[from] reqwest::Error),

    /// 想定外のステータスコード
    #[error("想定外のステータス: {status} {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// 呼び出し先が処理失敗を報告（HTTP 200 + success: false）
    #[error("呼び出し先が失敗を報告: {0}")]
    Rejected(String),
}
