//! # Digest Service ライブラリ
//!
//! Digest Batcher のユースケース・クライアント・ハンドラを公開する。
//! 統合テストから内部モジュールへアクセスするために使用する。

pub mod client;
pub mod error;
pub mod handler;
pub mod usecase;
