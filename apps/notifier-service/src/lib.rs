//! # Notifier Service ライブラリ
//!
//! Notifier Service のユースケースとハンドラを公開する。
//! 統合テストから内部モジュールへアクセスするために使用する。

pub mod error;
pub mod handler;
pub mod usecase;
