//! # ダイジェスト
//!
//! 掲示板アクティビティの集計とバッチカーソルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 補足 |
//! |---|------------|------|
//! | [`BoardActivity`] | 掲示板アクティビティ | 1 メンバー × 1 掲示板の集計結果。永続化しない |
//! | [`BatchCursor`] | バッチカーソル | 自己再呼び出し間で受け渡す進捗。永続化しない |
//!
//! ウォーターマーク（メンバー × 掲示板ごとの最終通知時刻）はインフラ層の
//! リポジトリで永続化され、ここでは [`activity_window_start`] の入力として
//! のみ現れる。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// 掲示板 ID
    pub struct BoardId;
}

/// 集計ウィンドウの下限（時間）
///
/// 一度も通知されていないメンバーや、長期間通知されていないメンバーでも、
/// ウィンドウは最大 24 時間に切り詰められる。
pub const ACTIVITY_WINDOW_HOURS: i64 = 24;

/// 掲示板
#[derive(Debug, Clone)]
pub struct Board {
    pub id:   BoardId,
    pub name: String,
}

/// 掲示板アクティビティ（1 メンバー × 1 掲示板の集計スナップショット）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardActivity {
    pub board_id:      BoardId,
    pub board_name:    String,
    pub message_count: i64,
    pub reply_count:   i64,
    pub thread_count:  i64,
}

impl BoardActivity {
    /// いずれかのカウントが正ならアクティビティありとみなす
    ///
    /// ダイジェストには `has_activity()` が真の掲示板のみ含める。
    pub fn has_activity(&self) -> bool {
        self.message_count > 0 || self.reply_count > 0 || self.thread_count > 0
    }
}

/// アクティビティウィンドウの開始時刻を計算する
///
/// 最終通知時刻（ウォーターマーク）と「現在 − 24 時間」の遅い方を返す。
/// ウォーターマークが存在しない、あるいは 24 時間より古い場合でも、
/// ウィンドウは 24 時間に切り詰められる。
pub fn activity_window_start(
    last_notified_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let floor = now - Duration::hours(ACTIVITY_WINDOW_HOURS);
    match last_notified_at {
        Some(last) => last.max(floor),
        None => floor,
    }
}

/// バッチカーソル
///
/// 自己再呼び出し（トランポリン）間で受け渡される進捗情報。
/// 永続化されないため、実行チェーンが途中で停止した場合の再開手段はない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCursor {
    /// 次に処理するメンバーページの開始オフセット
    pub offset:        i64,
    /// 自己再呼び出しの回数
    pub iteration:     u32,
    /// チェーン全体の開始時刻（エポックミリ秒）
    pub start_time_ms: i64,
}

impl BatchCursor {
    /// チェーンの先頭カーソルを作成する
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            offset:        0,
            iteration:     0,
            start_time_ms: now.timestamp_millis(),
        }
    }

    /// 次ページのカーソルを作成する
    ///
    /// `start_time_ms` はチェーン全体の実行時間上限の判定に使うため、
    /// 先頭の値を引き継ぐ。
    pub fn next_page(&self, batch_size: i64) -> Self {
        Self {
            offset:        self.offset + batch_size,
            iteration:     self.iteration + 1,
            start_time_ms: self.start_time_ms,
        }
    }

    /// チェーン開始からの経過ミリ秒を返す
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis() - self.start_time_ms
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn make_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn make_activity(message: i64, reply: i64, thread: i64) -> BoardActivity {
        BoardActivity {
            board_id:      BoardId::new(),
            board_name:    "総合".to_string(),
            message_count: message,
            reply_count:   reply,
            thread_count:  thread,
        }
    }

    #[test]
    fn いずれかのカウントが正ならアクティビティありと判定する() {
        assert!(make_activity(1, 0, 0).has_activity());
        assert!(make_activity(0, 1, 0).has_activity());
        assert!(make_activity(0, 0, 1).has_activity());
        assert!(!make_activity(0, 0, 0).has_activity());
    }

    #[test]
    fn ウォーターマークなしではウィンドウは24時間前になる() {
        let now = make_now();
        let start = activity_window_start(None, now);

        assert_eq!(start, now - Duration::hours(24));
    }

    #[test]
    fn 古いウォーターマークは24時間に切り詰められる() {
        let now = make_now();
        let stale = now - Duration::hours(72);
        let start = activity_window_start(Some(stale), now);

        assert_eq!(start, now - Duration::hours(24));
    }

    #[test]
    fn 新しいウォーターマークはそのまま使われる() {
        let now = make_now();
        let recent = now - Duration::hours(6);
        let start = activity_window_start(Some(recent), now);

        assert_eq!(start, recent);
    }

    #[test]
    fn next_pageはオフセットとイテレーションを進め開始時刻を引き継ぐ() {
        let cursor = BatchCursor::start(make_now());
        let next = cursor.next_page(10);

        assert_eq!(next.offset, 10);
        assert_eq!(next.iteration, 1);
        assert_eq!(next.start_time_ms, cursor.start_time_ms);
    }

    #[test]
    fn elapsed_msはチェーン開始からの経過時間を返す() {
        let now = make_now();
        let cursor = BatchCursor::start(now);
        let later = now + Duration::minutes(3);

        assert_eq!(cursor.elapsed_ms(later), 3 * 60 * 1000);
    }
}
