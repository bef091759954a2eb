//! # Ekklesia インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プール管理
//! - **リポジトリ実装**: メンバー・掲示板・ウォーターマーク・配信ログの永続化
//! - **配信プロバイダクライアント**: ホスト型テンプレートメール API との通信
//! - **認証トークン検証**: Redis に保存されたベアラートークンの解決
//! - **掲示板アクセス判定**: メンバーの掲示板閲覧権限チェック
//!
//! ## 依存関係
//!
//! ```text
//! apps → infra → domain
//!           ↘
//!            shared
//! ```
//!
//! インフラ層は `domain` に依存する。
//! ドメイン層はインフラ層に依存しない（依存性逆転の原則）。
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL データベース接続管理
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - リポジトリ実装
//! - [`delivery`] - 配信プロバイダクライアント
//! - [`identity`] - ベアラートークン検証
//! - [`authz`] - 掲示板アクセス判定

pub mod authz;
pub mod db;
pub mod delivery;
pub mod error;
pub mod identity;
pub mod repository;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use authz::BoardAccessChecker;
pub use delivery::DeliverySender;
pub use error::InfraError;
pub use identity::TokenVerifier;
