//! # ビジネスイベントログの構造化ヘルパー
//!
//! 通知の送信結果やダイジェストバッチの進捗を `jq` で効率的に調査できるよう、
//! ログフィールドの命名規約とヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"`
//! マーカーが自動付与され、
//! `jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`event.action`）を使用する。tracing の
//! `$($field:ident).+` パターンでサポートされ、JSON 出力でフラットなキーになる。

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.result`: 結果（[`event::result`] の定数を使用）
///
/// ## 推奨フィールド
///
/// - `event.entity_type`: エンティティ種別（[`event::entity_type`] の定数を使用）
/// - `event.entity_id`: エンティティ ID
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const NOTIFICATION: &str = "notification";
        pub const DIGEST: &str = "digest";
    }

    /// イベントアクション
    pub mod action {
        // 通知ディスパッチ
        pub const DISPATCH_SENT: &str = "dispatch.sent";
        pub const DISPATCH_FAILED: &str = "dispatch.failed";
        pub const DISPATCH_NO_RECIPIENTS: &str = "dispatch.no_recipients";

        // ダイジェストバッチ
        pub const DIGEST_SENT: &str = "digest.sent";
        pub const DIGEST_MEMBER_SKIPPED: &str = "digest.member_skipped";
        pub const BATCH_PAGE_COMPLETED: &str = "digest.batch_page_completed";
        pub const BATCH_TERMINATED: &str = "digest.batch_terminated";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const DELIVERY_LOG: &str = "delivery_log";
        pub const MEMBER: &str = "member";
        pub const BOARD: &str = "board";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}
