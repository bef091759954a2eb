//! # リポジトリ実装
//!
//! ドメインモデルの永続化と検索を担当するリポジトリを提供する。
//!
//! ## 設計方針
//!
//! - **依存性逆転**: trait を定義し、ユースケース層は trait 経由で利用する
//! - **データベース抽象化**: sqlx を使用し、PostgreSQL 固有の処理をカプセル化
//! - **テスタビリティ**: trait 経由でモック可能な設計

pub mod board_repository;
pub mod delivery_log_repository;
pub mod member_repository;
pub mod watermark_repository;

pub use board_repository::{BoardRepository, PostgresBoardRepository};
pub use delivery_log_repository::{
    DeliveryLog,
    DeliveryLogRepository,
    PostgresDeliveryLogRepository,
};
pub use member_repository::{MemberRepository, PostgresMemberRepository};
pub use watermark_repository::{PostgresWatermarkRepository, WatermarkRepository};
