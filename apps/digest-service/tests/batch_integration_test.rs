//! バッチページングユースケースの統合テスト
//!
//! インメモリモックで終了条件・ウィンドウクランプ・ウォーターマーク前進・
//! トランポリン継続を検証する。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ekklesia_digest_service::{
    client::{BatchInvoker, ClientError, NotifierClient},
    usecase::{BATCH_SIZE, BatchReport, DigestBatchUseCaseImpl, MAX_ITERATIONS, SummaryRenderer},
};
use ekklesia_domain::{
    clock::FixedClock,
    digest::{BatchCursor, Board, BoardId},
    member::{AccountId, Email, Member, MemberId},
};
use ekklesia_infra::mock::{
    MockBoardAccessChecker,
    MockBoardRepository,
    MockMemberRepository,
    MockWatermarkRepository,
};
use pretty_assertions::assert_eq;
use serde_json::{Map, Value};

// ===== テスト用クライアントスタブ =====

#[derive(Clone, Default)]
struct RecordingNotifierClient {
    calls: Arc<Mutex<Vec<Map<String, Value>>>>,
    fail:  Arc<Mutex<bool>>,
}

impl RecordingNotifierClient {
    fn calls(&self) -> Vec<Map<String, Value>> {
        self.calls.lock().unwrap().clone()
    }

    fn fail_all(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

#[async_trait]
impl NotifierClient for RecordingNotifierClient {
    async fn send_board_summary(
        &self,
        event_data: Map<String, Value>,
    ) -> Result<(), ClientError> {
        if *self.fail.lock().unwrap() {
            return Err(ClientError::Rejected("送信失敗".to_string()));
        }
        self.calls.lock().unwrap().push(event_data);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingInvoker {
    calls: Arc<Mutex<Vec<BatchCursor>>>,
}

impl RecordingInvoker {
    fn calls(&self) -> Vec<BatchCursor> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchInvoker for RecordingInvoker {
    async fn invoke_next(&self, cursor: &BatchCursor) -> Result<BatchReport, ClientError> {
        self.calls.lock().unwrap().push(*cursor);
        Ok(BatchReport::done(cursor.offset, "次ページ完了"))
    }
}

// ===== セットアップ =====

struct Setup {
    member_repo:    MockMemberRepository,
    board_repo:     MockBoardRepository,
    watermark_repo: MockWatermarkRepository,
    access:         MockBoardAccessChecker,
    notifier:       RecordingNotifierClient,
    invoker:        RecordingInvoker,
    now:            DateTime<Utc>,
}

impl Setup {
    fn new() -> Self {
        Self {
            member_repo:    MockMemberRepository::new(),
            board_repo:     MockBoardRepository::new(),
            watermark_repo: MockWatermarkRepository::new(),
            access:         MockBoardAccessChecker::new(),
            notifier:       RecordingNotifierClient::default(),
            invoker:        RecordingInvoker::default(),
            now:            Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
        }
    }

    fn usecase(
        &self,
    ) -> DigestBatchUseCaseImpl<MockMemberRepository, MockBoardRepository, MockWatermarkRepository>
    {
        DigestBatchUseCaseImpl::new(
            self.member_repo.clone(),
            self.board_repo.clone(),
            self.watermark_repo.clone(),
            Arc::new(self.access.clone()),
            Arc::new(self.notifier.clone()),
            Arc::new(self.invoker.clone()),
            Arc::new(FixedClock::new(self.now)),
            SummaryRenderer::new().unwrap(),
            "http://localhost:5173".to_string(),
        )
    }

    fn add_member(&self, email: &str) -> Member {
        let member = Member::from_db(
            MemberId::new(),
            Some(AccountId::new()),
            Some(Email::new(email).unwrap()),
            Some("テスト会員".to_string()),
            false,
        );
        self.member_repo.add_member(member.clone());
        member
    }

    fn add_board(&self, name: &str) -> Board {
        let board = Board {
            id:   BoardId::new(),
            name: name.to_string(),
        };
        self.board_repo.add_board(board.clone());
        board
    }

    fn start_cursor(&self) -> BatchCursor {
        BatchCursor::start(self.now)
    }

    fn hours_ago(&self, hours: i64) -> DateTime<Utc> {
        self.now - Duration::hours(hours)
    }
}

// ===== 終了条件 =====

#[tokio::test]
async fn イテレーション上限ではクエリを発行せず即座に停止する() {
    let setup = Setup::new();
    // クエリが発行されたら失敗するように仕込む
    setup.member_repo.fail_with("ここでクエリが発行されてはならない");

    let cursor = BatchCursor {
        offset:        50,
        iteration:     MAX_ITERATIONS,
        start_time_ms: setup.now.timestamp_millis(),
    };

    let report = setup.usecase().run_batch(cursor).await.unwrap();

    assert!(report.success);
    assert_eq!(report.processed, 50);
    assert!(report.message.contains("イテレーション上限"));
}

#[tokio::test]
async fn 実行時間上限では即座に停止する() {
    let setup = Setup::new();
    setup.member_repo.fail_with("ここでクエリが発行されてはならない");

    let cursor = BatchCursor {
        offset:        20,
        iteration:     3,
        start_time_ms: (setup.now - Duration::minutes(5)).timestamp_millis(),
    };

    let report = setup.usecase().run_batch(cursor).await.unwrap();

    assert!(report.success);
    assert_eq!(report.processed, 20);
    assert!(report.message.contains("実行時間上限"));
}

#[tokio::test]
async fn 空ページでは全メンバー処理済みとして終了する() {
    let setup = Setup::new();

    let report = setup.usecase().run_batch(setup.start_cursor()).await.unwrap();

    assert!(report.success);
    assert_eq!(report.processed, 0);
    assert!(report.next_batch.is_none());
}

// ===== アクティビティ集計とウォーターマーク =====

#[tokio::test]
async fn アクティビティのある掲示板のみダイジェストに含まれる() {
    let setup = Setup::new();
    let member = setup.add_member("member@example.com");
    let active_board = setup.add_board("総合");
    let quiet_board = setup.add_board("お知らせ");
    setup.access.allow(active_board.id, *member.id());
    setup.access.allow(quiet_board.id, *member.id());
    setup
        .board_repo
        .add_message(active_board.id, setup.hours_ago(2), false);

    let report = setup.usecase().run_batch(setup.start_cursor()).await.unwrap();

    assert!(report.success);
    assert_eq!(report.processed, 1);

    let calls = setup.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].get("member_email").and_then(Value::as_str),
        Some("member@example.com")
    );
    let boards = calls[0].get("boards").and_then(Value::as_array).unwrap();
    assert_eq!(boards.len(), 1, "アクティビティゼロの掲示板は含まれない");

    // 送信成功した掲示板のみウォーターマークが now に前進する
    let entries = setup.watermark_repo.entries();
    assert_eq!(entries.get(&(*member.id(), active_board.id)), Some(&setup.now));
    assert!(!entries.contains_key(&(*member.id(), quiet_board.id)));
}

#[tokio::test]
async fn 古いウォーターマークでもウィンドウは24時間に切り詰められる() {
    let setup = Setup::new();
    let member = setup.add_member("member@example.com");
    let board = setup.add_board("総合");
    setup.access.allow(board.id, *member.id());
    // 最終通知は 72 時間前だが、30 時間前のメッセージは
    // 24 時間ウィンドウの外なので数えない
    setup
        .watermark_repo
        .set(*member.id(), board.id, setup.hours_ago(72));
    setup.board_repo.add_message(board.id, setup.hours_ago(30), false);

    setup.usecase().run_batch(setup.start_cursor()).await.unwrap();

    assert!(setup.notifier.calls().is_empty());
}

#[tokio::test]
async fn 新しいウォーターマーク以前のメッセージは数えない() {
    let setup = Setup::new();
    let member = setup.add_member("member@example.com");
    let board = setup.add_board("総合");
    setup.access.allow(board.id, *member.id());
    setup
        .watermark_repo
        .set(*member.id(), board.id, setup.hours_ago(6));
    // 12 時間前（通知済みウィンドウ内）と 3 時間前（未通知）
    setup.board_repo.add_message(board.id, setup.hours_ago(12), false);
    setup.board_repo.add_message(board.id, setup.hours_ago(3), true);

    setup.usecase().run_batch(setup.start_cursor()).await.unwrap();

    let calls = setup.notifier.calls();
    assert_eq!(calls.len(), 1);
    let boards = calls[0].get("boards").and_then(Value::as_array).unwrap();
    assert_eq!(boards[0].get("message_count").and_then(Value::as_i64), Some(1));
    assert_eq!(boards[0].get("reply_count").and_then(Value::as_i64), Some(1));
}

#[tokio::test]
async fn スレッド作成のみでもダイジェスト対象になる() {
    let setup = Setup::new();
    let member = setup.add_member("member@example.com");
    let board = setup.add_board("総合");
    setup.access.allow(board.id, *member.id());
    setup.board_repo.add_thread(board.id, setup.hours_ago(1));

    setup.usecase().run_batch(setup.start_cursor()).await.unwrap();

    let calls = setup.notifier.calls();
    assert_eq!(calls.len(), 1);
    let boards = calls[0].get("boards").and_then(Value::as_array).unwrap();
    assert_eq!(boards[0].get("thread_count").and_then(Value::as_i64), Some(1));
    assert_eq!(boards[0].get("message_count").and_then(Value::as_i64), Some(0));
}

// ===== アクセス制御 =====

#[tokio::test]
async fn アクセス権のない掲示板はアクティビティがあってもスキップされる() {
    let setup = Setup::new();
    setup.add_member("member@example.com");
    let board = setup.add_board("役員会");
    // allow を呼ばない = アクセス不可
    setup.board_repo.add_message(board.id, setup.hours_ago(1), false);

    setup.usecase().run_batch(setup.start_cursor()).await.unwrap();

    assert!(setup.notifier.calls().is_empty());
}

#[tokio::test]
async fn アクセスチェックのエラーは拒否として扱われページは完走する() {
    let setup = Setup::new();
    let member1 = setup.add_member("member1@example.com");
    let member2 = setup.add_member("member2@example.com");
    let board = setup.add_board("総合");
    setup.board_repo.add_message(board.id, setup.hours_ago(1), false);

    // member1 はチェック自体がエラー、member2 は正常にアクセス可
    setup.access.error_on(board.id, *member1.id());
    setup.access.allow(board.id, *member2.id());

    let report = setup.usecase().run_batch(setup.start_cursor()).await.unwrap();

    assert!(report.success, "1 件のチェック失敗でページは失敗しない");
    assert_eq!(report.processed, 2);

    let calls = setup.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].get("member_email").and_then(Value::as_str),
        Some("member2@example.com")
    );
}

#[tokio::test]
async fn 送信後の再実行では通知済みウィンドウのメッセージを再通知しない() {
    let setup = Setup::new();
    let member = setup.add_member("member@example.com");
    let board = setup.add_board("総合");
    setup.access.allow(board.id, *member.id());
    setup.board_repo.add_message(board.id, setup.hours_ago(2), false);

    let usecase = setup.usecase();
    usecase.run_batch(setup.start_cursor()).await.unwrap();
    assert_eq!(setup.notifier.calls().len(), 1);

    // ウォーターマークが now に前進しているため、同じメッセージは再通知されない
    usecase.run_batch(setup.start_cursor()).await.unwrap();
    assert_eq!(setup.notifier.calls().len(), 1);
}

// ===== 送信失敗 =====

#[tokio::test]
async fn 送信失敗時はウォーターマークが前進せずバッチは継続する() {
    let setup = Setup::new();
    let member = setup.add_member("member@example.com");
    let board = setup.add_board("総合");
    setup.access.allow(board.id, *member.id());
    setup.board_repo.add_message(board.id, setup.hours_ago(1), false);
    setup.notifier.fail_all();

    let report = setup.usecase().run_batch(setup.start_cursor()).await.unwrap();

    assert!(report.success, "メンバー単位の失敗はバッチを止めない");
    assert!(
        setup.watermark_repo.entries().is_empty(),
        "送信が確認できなければウォーターマークは前進しない"
    );
}

// ===== トランポリン =====

#[tokio::test]
async fn フルページ処理後は次ページの自己呼び出しが行われる() {
    let setup = Setup::new();
    for i in 0..BATCH_SIZE {
        setup.add_member(&format!("member{i}@example.com"));
    }

    let cursor = setup.start_cursor();
    let report = setup.usecase().run_batch(cursor).await.unwrap();

    assert_eq!(report.processed, BATCH_SIZE);
    assert!(report.next_batch.is_some(), "次ページの結果が埋め込まれる");

    let calls = setup.invoker.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].offset, BATCH_SIZE);
    assert_eq!(calls[0].iteration, 1);
    assert_eq!(calls[0].start_time_ms, cursor.start_time_ms);
}

#[tokio::test]
async fn 最終ページでは自己呼び出しを行わない() {
    let setup = Setup::new();
    setup.add_member("member1@example.com");
    setup.add_member("member2@example.com");
    setup.add_member("member3@example.com");

    let report = setup.usecase().run_batch(setup.start_cursor()).await.unwrap();

    assert_eq!(report.processed, 3);
    assert!(report.next_batch.is_none());
    assert!(setup.invoker.calls().is_empty());
}

// ===== ワイヤ形式 =====

#[test]
fn バッチ結果はcamelcaseで再帰的にシリアライズされる() {
    let report = BatchReport {
        success: true,
        message: "ページを処理し、次のバッチを起動しました".to_string(),
        processed: 10,
        next_batch: Some(Box::new(BatchReport::done(13, "最終ページを処理しました"))),
        error: None,
    };

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value.get("processed").and_then(Value::as_i64), Some(10));
    let next = value.get("nextBatch").unwrap();
    assert_eq!(next.get("processed").and_then(Value::as_i64), Some(13));
    assert!(value.get("error").is_none());
}
