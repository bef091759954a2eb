//! # バッチページングユースケース
//!
//! メンバーをページ単位で走査し、掲示板アクティビティのあるメンバーに
//! ダイジェスト通知を発火させ、ウォーターマークを前進させる。
//! フルページを処理したら自己呼び出し（トランポリン）で次ページに続く。
//!
//! ## 終了条件
//!
//! 1. イテレーション上限（[`MAX_ITERATIONS`]）到達 — 暴走防止の安全弁
//! 2. 実行時間上限（[`MAX_EXECUTION_TIME_MS`]）超過 — 同上
//! 3. ページが空 — 全メンバー処理済み
//! 4. ページが `BATCH_SIZE` 未満 — 最終ページ
//!
//! 上限チェックは一切のクエリ発行より前に行う。
//!
//! ## エラーの扱い
//!
//! - 掲示板単位の失敗（アクセスチェック・集計クエリ）: ログして当該掲示板を
//!   スキップ
//! - メンバー単位の失敗（Notifier 呼び出し・レンダリング）: ログして当該
//!   メンバーをスキップ、ウォーターマークは前進させない
//! - ページ単位の失敗（ページ取得・トランポリン）: 呼び出し元へ伝播し、
//!   ハンドラが `success: false` 応答に変換する（カーソルは前進しない）
//!
//! ## 整合性の注意
//!
//! 送信 → ウォーターマーク upsert はトランザクションで括られない。
//! 送信後・upsert 前のクラッシュは次回実行での重複通知になる
//! （at-least-once を許容する設計）。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ekklesia_domain::{
    clock::Clock,
    digest::{BatchCursor, Board, BoardActivity, activity_window_start},
    member::Member,
};
use ekklesia_infra::{
    BoardAccessChecker,
    repository::{BoardRepository, MemberRepository, WatermarkRepository},
};
use ekklesia_shared::{event_log::event, log_business_event};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::summary::SummaryRenderer;
use crate::{
    client::{BatchInvoker, NotifierClient},
    error::DigestError,
};

/// 1 ページあたりのメンバー数
pub const BATCH_SIZE: i64 = 10;

/// 自己呼び出しの上限回数
pub const MAX_ITERATIONS: u32 = 100;

/// チェーン全体の実行時間上限（ミリ秒）
pub const MAX_EXECUTION_TIME_MS: i64 = 5 * 60 * 1000;

/// バッチ実行結果
///
/// ワイヤ形式（camelCase JSON）を兼ねる。トランポリンで起動した次ページの
/// 結果は `next_batch` に再帰的に埋め込まれる。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub success: bool,
    pub message: String,
    pub processed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_batch: Option<Box<BatchReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchReport {
    /// 正常終了の結果を作成する
    pub fn done(processed: i64, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            processed,
            next_batch: None,
            error: None,
        }
    }

    /// 異常終了の結果を作成する
    pub fn failure(processed: i64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: "バッチ処理が異常終了しました".to_string(),
            processed,
            next_batch: None,
            error: Some(error.into()),
        }
    }
}

/// ダイジェストバッチユースケース
pub struct DigestBatchUseCaseImpl<MR, BR, WR> {
    member_repo:     MR,
    board_repo:      BR,
    watermark_repo:  WR,
    access_checker:  Arc<dyn BoardAccessChecker>,
    notifier_client: Arc<dyn NotifierClient>,
    invoker:         Arc<dyn BatchInvoker>,
    clock:           Arc<dyn Clock>,
    renderer:        SummaryRenderer,
    view_base_url:   String,
}

impl<MR, BR, WR> DigestBatchUseCaseImpl<MR, BR, WR>
where
    MR: MemberRepository,
    BR: BoardRepository,
    WR: WatermarkRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        member_repo: MR,
        board_repo: BR,
        watermark_repo: WR,
        access_checker: Arc<dyn BoardAccessChecker>,
        notifier_client: Arc<dyn NotifierClient>,
        invoker: Arc<dyn BatchInvoker>,
        clock: Arc<dyn Clock>,
        renderer: SummaryRenderer,
        view_base_url: String,
    ) -> Self {
        Self {
            member_repo,
            board_repo,
            watermark_repo,
            access_checker,
            notifier_client,
            invoker,
            clock,
            renderer,
            view_base_url: view_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 1 ページ分のバッチを実行する
    pub async fn run_batch(&self, cursor: BatchCursor) -> Result<BatchReport, DigestError> {
        // 終了条件はクエリを発行する前に評価する
        if cursor.iteration >= MAX_ITERATIONS {
            log_business_event!(
                event.category = event::category::DIGEST,
                event.action = event::action::BATCH_TERMINATED,
                event.result = event::result::SUCCESS,
                batch.iteration = cursor.iteration,
                batch.offset = cursor.offset,
                "イテレーション上限に達したため停止"
            );
            return Ok(BatchReport::done(
                cursor.offset,
                "イテレーション上限に達したため停止しました",
            ));
        }

        let now = self.clock.now();
        if cursor.elapsed_ms(now) >= MAX_EXECUTION_TIME_MS {
            log_business_event!(
                event.category = event::category::DIGEST,
                event.action = event::action::BATCH_TERMINATED,
                event.result = event::result::SUCCESS,
                batch.iteration = cursor.iteration,
                batch.offset = cursor.offset,
                "実行時間上限に達したため停止"
            );
            return Ok(BatchReport::done(
                cursor.offset,
                "実行時間上限に達したため停止しました",
            ));
        }

        let members = self
            .member_repo
            .find_notifiable_page(cursor.offset, BATCH_SIZE)
            .await?;

        if members.is_empty() {
            return Ok(BatchReport::done(
                cursor.offset,
                "全メンバーの処理が完了しました",
            ));
        }

        let page_len = members.len() as i64;

        // メンバーは ID 昇順に逐次処理する。1 メンバーの失敗はページを止めない
        for member in &members {
            if let Err(e) = self.process_member(member, now).await {
                tracing::warn!(
                    member_id = %member.id(),
                    error = %e,
                    "メンバーの処理に失敗したためスキップします"
                );
                log_business_event!(
                    event.category = event::category::DIGEST,
                    event.action = event::action::DIGEST_MEMBER_SKIPPED,
                    event.entity_type = event::entity_type::MEMBER,
                    event.entity_id = %member.id(),
                    event.result = event::result::FAILURE,
                    error = %e,
                    "ダイジェスト送信をスキップ"
                );
            }
        }

        log_business_event!(
            event.category = event::category::DIGEST,
            event.action = event::action::BATCH_PAGE_COMPLETED,
            event.result = event::result::SUCCESS,
            batch.offset = cursor.offset,
            batch.page_len = page_len,
            "ページ処理完了"
        );

        if page_len == BATCH_SIZE {
            // フルページ: まだ残りがある可能性があるため、自己呼び出しで続行し
            // 次ページの結果をこの応答に埋め込む
            let next = self.invoker.invoke_next(&cursor.next_page(BATCH_SIZE)).await?;
            Ok(BatchReport {
                success: true,
                message: "ページを処理し、次のバッチを起動しました".to_string(),
                processed: cursor.offset + page_len,
                next_batch: Some(Box::new(next)),
                error: None,
            })
        } else {
            Ok(BatchReport::done(
                cursor.offset + page_len,
                "最終ページを処理しました",
            ))
        }
    }

    /// 1 メンバーのダイジェストを処理する
    ///
    /// アクティビティのある掲示板が 1 つもなければ何もしない。
    /// 送信成功が確認できた場合のみ、対象掲示板のウォーターマークを
    /// `now` に前進させる。
    async fn process_member(
        &self,
        member: &Member,
        now: DateTime<Utc>,
    ) -> Result<(), DigestError> {
        let boards = self.board_repo.find_active_boards().await?;

        let mut activities = Vec::new();
        for board in &boards {
            match self.scan_board(member, board, now).await {
                Ok(Some(activity)) => activities.push(activity),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        board_id = %board.id,
                        member_id = %member.id(),
                        error = %e,
                        "掲示板の集計に失敗したためスキップします"
                    );
                }
            }
        }

        if activities.is_empty() {
            return Ok(());
        }

        let view_url = format!("{}/boards", self.view_base_url);
        let summary_html =
            self.renderer
                .render(&member.display_name(), &activities, &view_url)?;
        let event_data = Self::board_summary_event_data(member, &activities, &summary_html, &view_url)?;

        // 送信失敗時はここで return し、ウォーターマークは前進しない
        self.notifier_client.send_board_summary(event_data).await?;

        log_business_event!(
            event.category = event::category::DIGEST,
            event.action = event::action::DIGEST_SENT,
            event.entity_type = event::entity_type::MEMBER,
            event.entity_id = %member.id(),
            event.result = event::result::SUCCESS,
            digest.board_count = activities.len(),
            "ダイジェストを送信"
        );

        for activity in &activities {
            if let Err(e) = self
                .watermark_repo
                .upsert(member.id(), &activity.board_id, now)
                .await
            {
                // 送信済みのため、upsert の失敗でバッチは止めない
                // （次回実行での重複通知として許容する）
                tracing::error!(
                    member_id = %member.id(),
                    board_id = %activity.board_id,
                    error = %e,
                    "ウォーターマークの更新に失敗"
                );
            }
        }

        Ok(())
    }

    /// 1 掲示板のアクティビティを集計する
    ///
    /// アクセス不可（チェックのエラー含む）またはカウントがすべて 0 の場合は
    /// `None` を返す。
    async fn scan_board(
        &self,
        member: &Member,
        board: &Board,
        now: DateTime<Utc>,
    ) -> Result<Option<BoardActivity>, DigestError> {
        let allowed = match self
            .access_checker
            .has_access(&board.id, member.id())
            .await
        {
            Ok(allowed) => allowed,
            Err(e) => {
                // チェックの失敗はアクセス拒否として扱う
                tracing::warn!(
                    board_id = %board.id,
                    member_id = %member.id(),
                    error = %e,
                    "アクセスチェックに失敗したため拒否として扱います"
                );
                false
            }
        };

        if !allowed {
            return Ok(None);
        }

        let last_notified_at = self.watermark_repo.find(member.id(), &board.id).await?;
        let window_start = activity_window_start(last_notified_at, now);

        let message_count = self
            .board_repo
            .count_messages_since(&board.id, window_start)
            .await?;
        let reply_count = self
            .board_repo
            .count_replies_since(&board.id, window_start)
            .await?;
        let thread_count = self
            .board_repo
            .count_threads_since(&board.id, window_start)
            .await?;

        let activity = BoardActivity {
            board_id: board.id,
            board_name: board.name.clone(),
            message_count,
            reply_count,
            thread_count,
        };

        Ok(activity.has_activity().then_some(activity))
    }

    /// `board-summary` イベントのイベントデータを組み立てる
    fn board_summary_event_data(
        member: &Member,
        activities: &[BoardActivity],
        summary_html: &str,
        view_url: &str,
    ) -> Result<Map<String, Value>, DigestError> {
        let email = member.email().ok_or_else(|| {
            DigestError::Internal("配信対象メンバーにメールアドレスがありません".to_string())
        })?;

        let mut data = Map::new();
        data.insert("member_id".to_string(), Value::String(member.id().to_string()));
        data.insert(
            "member_name".to_string(),
            Value::String(member.display_name()),
        );
        data.insert(
            "member_email".to_string(),
            Value::String(email.as_str().to_string()),
        );
        data.insert(
            "summary_html".to_string(),
            Value::String(summary_html.to_string()),
        );
        data.insert("view_url".to_string(), Value::String(view_url.to_string()));
        data.insert(
            "boards".to_string(),
            serde_json::to_value(activities)
                .map_err(|e| DigestError::Internal(e.to_string()))?,
        );

        Ok(data)
    }
}
