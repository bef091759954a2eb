//! # バッチ実行ハンドラ
//!
//! `POST /` でバッチカーソルを受け取り、バッチユースケースに委譲する。
//!
//! ## レスポンスポリシー
//!
//! 未処理エラーも HTTP エラーステータスにはせず、
//! `200 { success: false, error }` として返す。スケジューラが HTTP エラーを
//! 見てリトライストームを起こすのを防ぐ。失敗時にカーソルは前進しない
//! （再実行は offset 0 から、または手動カーソル指定で行う）。

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::Utc;
use ekklesia_domain::digest::BatchCursor;
use ekklesia_infra::repository::{BoardRepository, MemberRepository, WatermarkRepository};
use serde::Deserialize;

use crate::usecase::{BatchReport, DigestBatchUseCaseImpl};

/// バッチハンドラの状態
pub struct DigestState<MR, BR, WR> {
    pub usecase: DigestBatchUseCaseImpl<MR, BR, WR>,
}

/// バッチ実行リクエスト
///
/// ボディは省略可能。全フィールドにデフォルトがある
/// （offset=0, iteration=0, startTime=現在時刻）。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchRunRequest {
    pub offset:     Option<i64>,
    pub iteration:  Option<u32>,
    pub start_time: Option<i64>,
}

/// バッチ実行エンドポイント
///
/// `POST /` に対応する。スケジューラまたはトランポリン自己呼び出しから
/// 起動される。
pub async fn run_batch<MR, BR, WR>(
    State(state): State<Arc<DigestState<MR, BR, WR>>>,
    payload: Option<Json<BatchRunRequest>>,
) -> Json<BatchReport>
where
    MR: MemberRepository + 'static,
    BR: BoardRepository + 'static,
    WR: WatermarkRepository + 'static,
{
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let cursor = BatchCursor {
        offset:        request.offset.unwrap_or(0),
        iteration:     request.iteration.unwrap_or(0),
        start_time_ms: request
            .start_time
            .unwrap_or_else(|| Utc::now().timestamp_millis()),
    };

    match state.usecase.run_batch(cursor).await {
        Ok(report) => Json(report),
        Err(e) => {
            tracing::error!(error = %e, "バッチ処理が異常終了しました");
            Json(BatchReport::failure(cursor.offset, e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn リクエストのcamelcaseフィールドがデシリアライズされる() {
        let json = r#"{"offset": 10, "iteration": 1, "startTime": 1700000000000}"#;
        let request: BatchRunRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.offset, Some(10));
        assert_eq!(request.iteration, Some(1));
        assert_eq!(request.start_time, Some(1_700_000_000_000));
    }

    #[test]
    fn 空ボディはすべてデフォルトになる() {
        let request: BatchRunRequest = serde_json::from_str("{}").unwrap();

        assert_eq!(request.offset, None);
        assert_eq!(request.iteration, None);
        assert_eq!(request.start_time, None);
    }
}
