//! # Digest Service エラー定義
//!
//! バッチ処理中のエラーを表現する。
//!
//! ## トランスポートとの関係
//!
//! Digest Batcher はスケジューラから呼び出されるため、未処理エラーも
//! HTTP エラーステータスにはせず、`200 { success: false, error }` として
//! 返す（リトライストームの防止）。このエラー型は `IntoResponse` を
//! 実装せず、ハンドラがレスポンス本文に変換する。

use thiserror::Error;

use crate::client::ClientError;

/// Digest Service で発生するエラー
#[derive(Debug, Error)]
pub enum DigestError {
    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(#[from] ekklesia_infra::InfraError),

    /// 内部サービス呼び出しの失敗（Notifier・自己呼び出し）
    #[error("内部サービス呼び出しに失敗: {0}")]
    Client(#[from] ClientError),

    /// ダイジェスト HTML のレンダリング失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    Template(String),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}
