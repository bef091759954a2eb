//! # ユースケース層
//!
//! Digest Batcher のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリは型パラメータ、外部コラボレータ
//!   （アクセスチェッカー・Notifier クライアント・トランポリン・時計）は
//!   `Arc<dyn Trait>` で注入
//! - **エラーの局所化**: 掲示板単位・メンバー単位の失敗はログして継続し、
//!   1 件の不良データがページ全体を止めないようにする
//!
//! ## モジュール構成
//!
//! - [`batch`] - ページング・終了条件・メンバー処理・トランポリン
//! - [`summary`] - tera によるダイジェスト HTML 断片のレンダリング

pub mod batch;
pub mod summary;

pub use batch::{BATCH_SIZE, BatchReport, DigestBatchUseCaseImpl, MAX_ITERATIONS};
pub use summary::SummaryRenderer;
