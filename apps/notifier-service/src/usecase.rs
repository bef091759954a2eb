//! # ユースケース層
//!
//! Notifier Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリは型パラメータ、配信センダーと配信ログは
//!   `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//!
//! ## モジュール構成
//!
//! - [`dispatch`] - イベントディスパッチ（検証 → 宛先解決 → 変数展開 → 送信）
//! - [`recipients`] - 配信ルールの実行（宛先・CC の解決）

pub mod dispatch;
pub mod recipients;

pub use dispatch::{DispatchInput, DispatchOutcome, DispatchUseCaseImpl};
pub use recipients::{RecipientResolver, ResolveError};
