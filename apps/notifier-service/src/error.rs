//! # Notifier Service エラー定義
//!
//! HTTP エラーステータスを伴うエラーと、そのレスポンス変換を定義する。
//!
//! ## 非ブロッキングポリシーとの関係
//!
//! ここで定義するのは「HTTP エラーとして返すべき」失敗だけ
//! （バリデーション・未知イベント種別・テストモードの認証認可）。
//! 宛先解決や配信の失敗は HTTP エラーにせず、
//! `DispatchOutcome::Degraded` として HTTP 200 の本文に埋め込む
//! （通知の失敗が呼び出し元の業務処理を失敗させてはならない）。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// エラーレスポンス（RFC 7807 Problem Details）
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
}

/// Notifier Service で発生するエラー
#[derive(Debug, Error)]
pub enum NotifierError {
    /// 不正なリクエスト（JSON 不正、必須フィールド欠落）
    #[error("不正なリクエスト: {0}")]
    Validation(String),

    /// 未知のイベント種別（テンプレート対応が存在しない）
    #[error("未知のイベント種別: {0}")]
    UnknownEventType(String),

    /// 認証エラー（テストモードでトークンが欠落・無効）
    #[error("認証に失敗しました: {0}")]
    Unauthorized(String),

    /// 認可エラー（認証済みだが管理者ではない）
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl IntoResponse for NotifierError {
    fn into_response(self) -> Response {
        let (status, error_type, title, detail) = match &self {
            NotifierError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "https://ekklesia.example.com/errors/bad-request",
                "Bad Request",
                msg.clone(),
            ),
            NotifierError::UnknownEventType(event_type) => (
                StatusCode::BAD_REQUEST,
                "https://ekklesia.example.com/errors/unknown-event-type",
                "Unknown Event Type",
                format!("未知のイベント種別です: {event_type}"),
            ),
            NotifierError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                "https://ekklesia.example.com/errors/unauthorized",
                "Unauthorized",
                msg.clone(),
            ),
            NotifierError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                "https://ekklesia.example.com/errors/forbidden",
                "Forbidden",
                msg.clone(),
            ),
            NotifierError::Internal(msg) => {
                tracing::error!("内部エラー: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "https://ekklesia.example.com/errors/internal-error",
                    "Internal Server Error",
                    "内部エラーが発生しました".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error_type: error_type.to_string(),
                title: title.to_string(),
                status: status.as_u16(),
                detail,
            }),
        )
            .into_response()
    }
}
