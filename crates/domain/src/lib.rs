//! # Ekklesia ドメイン層
//!
//! 通知ディスパッチとダイジェスト集計のドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **純粋なロジックのみ**: データベースや外部サービスへの依存を持たない
//! - **テーブル駆動のイベント定義**: イベント種別 → 配信ルールの対応を
//!   [`event::EventRouting`] に集約し、分岐の漏れをコンパイル時に検出する
//! - **値オブジェクト**: メールアドレスや ID は Newtype で型安全にする
//!
//! ## モジュール構成
//!
//! - [`event`] - 通知イベントと配信ルールのレジストリ
//! - [`member`] - メンバー、役職、受信者
//! - [`variables`] - テンプレート変数のフラット化
//! - [`delivery`] - 配信プロバイダへ渡すメール表現
//! - [`digest`] - 掲示板アクティビティとバッチカーソル
//! - [`clock`] - 時刻プロバイダ抽象

#[macro_use]
mod macros;

pub mod clock;
pub mod delivery;
pub mod digest;
pub mod error;
pub mod event;
pub mod member;
pub mod variables;

pub use error::DomainError;
