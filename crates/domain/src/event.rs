//! # 通知イベント
//!
//! ビジネスイベント（献金、参加申請など）と、その配信ルールを定義する。
//!
//! ## 設計方針
//!
//! - **enum によるイベント種別**: ワイヤ上の kebab-case 文字列と 1:1 対応し、
//!   未知の文字列はパース時点で弾く
//! - **テーブル駆動の配信ルール**: イベント種別 → 宛先ルール・CC ルール・
//!   テンプレート ID・件名の対応を [`EventType::routing`] に集約する。
//!   match が全バリアントを網羅するため、ルール漏れはコンパイルエラーになる
//! - **テンプレート ID は全域関数**: すべてのイベント種別がちょうど 1 つの
//!   テンプレート ID を持つ

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::IntoStaticStr;

use crate::{
    error::DomainError,
    member::{Email, Role},
};

/// 通知イベント種別
///
/// HTTP リクエストの `eventType` フィールドに kebab-case で指定される値。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    /// 部署への参加申請 → 当該部署のリードに通知
    DepartmentJoinRequest,
    /// ミニストリーへの参加申請 → 当該ミニストリーのリードに通知
    MinistryJoinRequest,
    /// 提案 → 長老に通知
    Suggestion,
    /// サポート依頼 → 長老に通知
    SupportRequest,
    /// 献金 → 長老に通知、使徒に CC
    Donation,
    /// 問い合わせフォーム送信 → 執事に通知
    ContactSubmission,
    /// 祈祷課題 → "Intercession" 部署のリードに通知
    PrayerRequest,
    /// 証の投稿申請 → "Moderation" 部署のリードに通知
    TestimonyRequest,
    /// 週次ダイジェスト → 長老・使徒に直接通知（CC なし）
    WeeklyDigest,
    /// 掲示板アクティビティ集計 → イベントデータ内のメンバー本人に通知
    BoardSummary,
}

/// 一次宛先（to）の解決ルール
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientRule {
    /// イベントデータの `department_id` が指す部署のリード全員
    DepartmentLeads,
    /// イベントデータの `ministry_id` が指すミニストリーのリード全員
    MinistryLeads,
    /// 指定した役職を持つメンバー全員
    RoleHolders(Role),
    /// 名前が完全一致する部署のリード全員
    NamedDepartmentLeads(&'static str),
    /// 指定した役職のいずれかを持つメンバー全員（役職の和集合）
    RoleHoldersAny(&'static [Role]),
    /// イベントデータの `member_email` / `member_name` が指す本人
    EventRecipient,
}

/// CC 宛先の解決ルール
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcRule {
    /// 長老と使徒の和集合
    LeadershipUnion,
    /// 使徒のみ
    ApostlesOnly,
    /// CC なし
    None,
}

/// イベント種別ごとの配信ルール
///
/// [`EventType::routing`] が返すレコード。宛先解決・CC 解決・
/// テンプレート選択・件名生成はすべてこのテーブルを参照する。
#[derive(Debug, Clone, Copy)]
pub struct EventRouting {
    pub to:          RecipientRule,
    pub cc:          CcRule,
    pub template_id: &'static str,
    pub subject:     &'static str,
}

impl EventType {
    /// イベント種別に対応する配信ルールを返す
    ///
    /// 全バリアントを網羅する全域関数。テンプレート ID はイベント種別の
    /// kebab-case 文字列と一致する。
    pub fn routing(&self) -> EventRouting {
        match self {
            Self::DepartmentJoinRequest => EventRouting {
                to:          RecipientRule::DepartmentLeads,
                cc:          CcRule::LeadershipUnion,
                template_id: "department-join-request",
                subject:     "New Department Join Request",
            },
            Self::MinistryJoinRequest => EventRouting {
                to:          RecipientRule::MinistryLeads,
                cc:          CcRule::LeadershipUnion,
                template_id: "ministry-join-request",
                subject:     "New Ministry Join Request",
            },
            Self::Suggestion => EventRouting {
                to:          RecipientRule::RoleHolders(Role::Elder),
                cc:          CcRule::LeadershipUnion,
                template_id: "suggestion",
                subject:     "New Suggestion",
            },
            Self::SupportRequest => EventRouting {
                to:          RecipientRule::RoleHolders(Role::Elder),
                cc:          CcRule::LeadershipUnion,
                template_id: "support-request",
                subject:     "New Support Request",
            },
            Self::Donation => EventRouting {
                to:          RecipientRule::RoleHolders(Role::Elder),
                cc:          CcRule::ApostlesOnly,
                template_id: "donation",
                subject:     "New Donation",
            },
            Self::ContactSubmission => EventRouting {
                to:          RecipientRule::RoleHolders(Role::Deacon),
                cc:          CcRule::LeadershipUnion,
                template_id: "contact-submission",
                subject:     "New Contact Submission",
            },
            Self::PrayerRequest => EventRouting {
                to:          RecipientRule::NamedDepartmentLeads("Intercession"),
                cc:          CcRule::LeadershipUnion,
                template_id: "prayer-request",
                subject:     "New Prayer Request",
            },
            Self::TestimonyRequest => EventRouting {
                to:          RecipientRule::NamedDepartmentLeads("Moderation"),
                cc:          CcRule::LeadershipUnion,
                template_id: "testimony-request",
                subject:     "New Testimony Request",
            },
            Self::WeeklyDigest => EventRouting {
                to:          RecipientRule::RoleHoldersAny(&[Role::Elder, Role::Apostle]),
                cc:          CcRule::None,
                template_id: "weekly-digest",
                subject:     "Weekly Digest",
            },
            Self::BoardSummary => EventRouting {
                to:          RecipientRule::EventRecipient,
                cc:          CcRule::None,
                template_id: "board-summary",
                subject:     "Board Activity Summary",
            },
        }
    }
}

/// 通知イベント
///
/// 1 回のディスパッチ呼び出しを表す一時オブジェクト。永続化されない。
///
/// テストモードの場合は宛先解決をスキップし、`test_recipient` のみに
/// 送信する（件名に `[TEST] ` プレフィックスが付く）。
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    event_type:     EventType,
    event_data:     Map<String, Value>,
    test_mode:      bool,
    test_recipient: Option<Email>,
}

impl NotificationEvent {
    /// 通知イベントを作成する
    ///
    /// `event_data` が空の場合はバリデーションエラーを返す。
    pub fn new(
        event_type: EventType,
        event_data: Map<String, Value>,
        test_mode: bool,
        test_recipient: Option<Email>,
    ) -> Result<Self, DomainError> {
        if event_data.is_empty() {
            return Err(DomainError::Validation(
                "eventData は空にできません".to_string(),
            ));
        }

        Ok(Self {
            event_type,
            event_data,
            test_mode,
            test_recipient,
        })
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn event_data(&self) -> &Map<String, Value> {
        &self.event_data
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn test_recipient(&self) -> Option<&Email> {
        self.test_recipient.as_ref()
    }

    /// イベントデータから文字列値を取り出す
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.event_data.get(key).and_then(Value::as_str)
    }

    /// 件名を生成する（テストモードでは `[TEST] ` プレフィックス付き）
    pub fn subject(&self) -> String {
        let base = self.event_type.routing().subject;
        if self.test_mode {
            format!("[TEST] {base}")
        } else {
            base.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_event_typeの文字列変換が正しい() {
        assert_eq!(
            EventType::DepartmentJoinRequest.to_string(),
            "department-join-request"
        );
        assert_eq!(EventType::Donation.to_string(), "donation");
        assert_eq!(EventType::WeeklyDigest.to_string(), "weekly-digest");

        assert_eq!(
            EventType::from_str("prayer-request").unwrap(),
            EventType::PrayerRequest
        );
        assert!(EventType::from_str("unknown-kind").is_err());
        assert!(EventType::from_str("Donation").is_err());
    }

    #[test]
    fn すべてのイベント種別がテンプレートidを持ち種別文字列と一致する() {
        for event_type in EventType::iter() {
            let routing = event_type.routing();
            assert_eq!(
                routing.template_id,
                event_type.to_string(),
                "テンプレート ID は kebab-case の種別文字列と一致すること"
            );
            assert!(!routing.subject.is_empty());
        }
    }

    #[test]
    fn 献金は長老宛てで使徒のみにccする() {
        let routing = EventType::Donation.routing();
        assert_eq!(routing.to, RecipientRule::RoleHolders(Role::Elder));
        assert_eq!(routing.cc, CcRule::ApostlesOnly);
    }

    #[test]
    fn 週次ダイジェストは長老と使徒に直接送信しccしない() {
        let routing = EventType::WeeklyDigest.routing();
        assert_eq!(
            routing.to,
            RecipientRule::RoleHoldersAny(&[Role::Elder, Role::Apostle])
        );
        assert_eq!(routing.cc, CcRule::None);
    }

    #[test]
    fn 祈祷課題と証はそれぞれ固定名の部署リードに届く() {
        assert_eq!(
            EventType::PrayerRequest.routing().to,
            RecipientRule::NamedDepartmentLeads("Intercession")
        );
        assert_eq!(
            EventType::TestimonyRequest.routing().to,
            RecipientRule::NamedDepartmentLeads("Moderation")
        );
    }

    fn make_data() -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("amount".to_string(), json!("50.00"));
        data
    }

    #[test]
    fn 空のイベントデータは拒否される() {
        let result = NotificationEvent::new(EventType::Donation, Map::new(), false, None);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn 件名はテストモードでプレフィックスが付く() {
        let normal =
            NotificationEvent::new(EventType::Donation, make_data(), false, None).unwrap();
        assert_eq!(normal.subject(), "New Donation");

        let test = NotificationEvent::new(
            EventType::Donation,
            make_data(),
            true,
            Some(Email::new("admin@example.com").unwrap()),
        )
        .unwrap();
        assert_eq!(test.subject(), "[TEST] New Donation");
    }
}
