//! # イベントディスパッチハンドラ
//!
//! `POST /` でイベントを受け取り、ディスパッチユースケースに委譲する。
//!
//! ## レスポンスポリシー
//!
//! - 送信成功・宛先なし・配信失敗（degraded）はすべて HTTP 200 で返す
//!   （`success` フィールドで区別する）
//! - HTTP エラーステータスになるのはバリデーション・未知イベント種別・
//!   テストモードの認証認可の失敗だけ

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header},
};
use ekklesia_infra::{TokenVerifier, repository::MemberRepository};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::NotifierError,
    usecase::{DispatchInput, DispatchOutcome, DispatchUseCaseImpl},
};

/// ディスパッチハンドラの状態
pub struct NotifierState<MR, TV> {
    pub usecase: DispatchUseCaseImpl<MR, TV>,
}

/// ディスパッチリクエスト
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub event_type:     Option<String>,
    pub event_data:     Option<Map<String, Value>>,
    #[serde(default)]
    pub test_mode:      bool,
    pub test_recipient: Option<String>,
}

/// ディスパッチレスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// イベントディスパッチエンドポイント
///
/// `POST /` に対応する。Authorization ヘッダはテストモードの場合のみ必須。
pub async fn dispatch_event<MR, TV>(
    State(state): State<Arc<NotifierState<MR, TV>>>,
    headers: HeaderMap,
    payload: Result<Json<NotifyRequest>, JsonRejection>,
) -> Result<Json<DispatchResponse>, NotifierError>
where
    MR: MemberRepository + 'static,
    TV: TokenVerifier + 'static,
{
    let Json(request) = payload
        .map_err(|e| NotifierError::Validation(format!("リクエストボディが不正です: {e}")))?;

    let event_type = request
        .event_type
        .ok_or_else(|| NotifierError::Validation("eventType は必須です".to_string()))?;

    let bearer_token = extract_bearer(&headers);

    let input = DispatchInput {
        event_type,
        event_data: request.event_data,
        test_mode: request.test_mode,
        test_recipient: request.test_recipient,
        bearer_token,
    };

    let outcome = state.usecase.dispatch(input).await?;

    let response = match outcome {
        DispatchOutcome::Sent { to, cc } => DispatchResponse {
            success: true,
            message: "通知を送信しました".to_string(),
            recipients: Some(to),
            cc: Some(cc),
            error: None,
        },
        DispatchOutcome::NoRecipients => DispatchResponse {
            success: true,
            message: "宛先が存在しないため送信をスキップしました".to_string(),
            recipients: None,
            cc: None,
            error: None,
        },
        DispatchOutcome::Degraded { reason } => DispatchResponse {
            success: false,
            message: "通知の送信に失敗しました".to_string(),
            recipients: None,
            cc: None,
            error: Some(reason),
        },
    };

    Ok(Json(response))
}

/// Authorization ヘッダからベアラートークンを取り出す
fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_tokenの抽出が正しい() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(extract_bearer(&headers), Some("abc123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc123".parse().unwrap());
        assert_eq!(extract_bearer(&headers), None);

        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }

    #[test]
    fn リクエストのcamelcaseフィールドがデシリアライズされる() {
        let json = r#"{
            "eventType": "donation",
            "eventData": {"amount": "50.00"},
            "testMode": true,
            "testRecipient": "a@b.com"
        }"#;

        let request: NotifyRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.event_type.as_deref(), Some("donation"));
        assert!(request.test_mode);
        assert_eq!(request.test_recipient.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_modeの既定値はfalseになる() {
        let request: NotifyRequest =
            serde_json::from_str(r#"{"eventType": "donation"}"#).unwrap();
        assert!(!request.test_mode);
    }
}
