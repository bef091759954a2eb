//! # ディスパッチユースケース
//!
//! 検証 → （テストモード認可 | 宛先解決）→ テンプレート選択 →
//! 変数フラット化 → 送信 → 配信ログ記録、の一連のフローを統合する。
//!
//! ## 非ブロッキングポリシー
//!
//! 宛先解決と配信の失敗は [`DispatchOutcome::Degraded`] として返し、
//! HTTP エラーにはしない。通知を発火させた業務処理（献金登録、参加申請など）が
//! メール失敗を理由にロールバックされてはならないため。
//! HTTP エラーになるのはバリデーション・未知イベント種別・
//! テストモードの認証認可だけ。

use std::{str::FromStr, sync::Arc};

use chrono::Utc;
use ekklesia_domain::{
    delivery::{DeliveryLogId, TemplatedEmail},
    event::{EventType, NotificationEvent},
    member::{Email, Recipient},
    variables::{flatten_variables, remap_reserved},
};
use ekklesia_infra::{
    DeliverySender,
    TokenVerifier,
    repository::{DeliveryLog, DeliveryLogRepository, MemberRepository},
};
use ekklesia_shared::{event_log::event, log_business_event};
use serde_json::{Map, Value};

use super::recipients::RecipientResolver;
use crate::error::NotifierError;

/// ディスパッチ入力
///
/// HTTP ハンドラがリクエストボディと Authorization ヘッダから組み立てる。
#[derive(Debug)]
pub struct DispatchInput {
    pub event_type:     String,
    pub event_data:     Option<Map<String, Value>>,
    pub test_mode:      bool,
    pub test_recipient: Option<String>,
    pub bearer_token:   Option<String>,
}

/// ディスパッチ結果
///
/// 3 つの終端状態。いずれも HTTP 200 で返る。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 送信成功
    Sent { to: Vec<String>, cc: Vec<String> },
    /// 宛先なしの明示的な no-op（プロバイダは呼ばれない）
    NoRecipients,
    /// 宛先解決または配信の失敗（ログ済み、呼び出し元の業務処理は継続）
    Degraded { reason: String },
}

/// ディスパッチユースケース
///
/// リポジトリは型パラメータ、配信センダーと配信ログは `Arc<dyn Trait>` で注入する
/// （配信バックエンドは環境変数でランタイム選択されるため）。
pub struct DispatchUseCaseImpl<MR, TV> {
    member_repo:       MR,
    token_verifier:    TV,
    sender:            Arc<dyn DeliverySender>,
    delivery_log_repo: Arc<dyn DeliveryLogRepository>,
    from_address:      String,
}

impl<MR, TV> DispatchUseCaseImpl<MR, TV>
where
    MR: MemberRepository,
    TV: TokenVerifier,
{
    pub fn new(
        member_repo: MR,
        token_verifier: TV,
        sender: Arc<dyn DeliverySender>,
        delivery_log_repo: Arc<dyn DeliveryLogRepository>,
        from_address: String,
    ) -> Self {
        Self {
            member_repo,
            token_verifier,
            sender,
            delivery_log_repo,
            from_address,
        }
    }

    /// イベントをディスパッチする
    pub async fn dispatch(&self, input: DispatchInput) -> Result<DispatchOutcome, NotifierError> {
        // 1. 検証: イベント種別は既知の集合に含まれること
        let event_type = EventType::from_str(&input.event_type)
            .map_err(|_| NotifierError::UnknownEventType(input.event_type.clone()))?;

        let event_data = input
            .event_data
            .ok_or_else(|| NotifierError::Validation("eventData は必須です".to_string()))?;

        // 2. 宛先の決定
        let (notification, to, cc) = if input.test_mode {
            // 認可が先、宛先の検証はその後（人間が結果を待っている）
            self.authorize_test_sender(input.bearer_token.as_deref())
                .await?;

            let raw = input.test_recipient.as_deref().ok_or_else(|| {
                NotifierError::Validation(
                    "テストモードでは testRecipient が必須です".to_string(),
                )
            })?;
            let email =
                Email::new(raw).map_err(|e| NotifierError::Validation(e.to_string()))?;

            let notification =
                NotificationEvent::new(event_type, event_data, true, Some(email.clone()))
                    .map_err(|e| NotifierError::Validation(e.to_string()))?;

            (
                notification,
                vec![Recipient { email, name: None }],
                Vec::new(),
            )
        } else {
            let notification = NotificationEvent::new(event_type, event_data, false, None)
                .map_err(|e| NotifierError::Validation(e.to_string()))?;

            let resolver = RecipientResolver::new(&self.member_repo);
            let to = match resolver.resolve_to(&notification).await {
                Ok(to) => to,
                Err(e) => return Ok(self.degraded(&notification, e.to_string()).await),
            };

            if to.is_empty() {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::DISPATCH_NO_RECIPIENTS,
                    event.result = event::result::SUCCESS,
                    notification.event_type = %notification.event_type(),
                    "宛先が存在しないため送信をスキップ"
                );
                return Ok(DispatchOutcome::NoRecipients);
            }

            let cc = match resolver.resolve_cc(&notification).await {
                Ok(cc) => cc,
                Err(e) => return Ok(self.degraded(&notification, e.to_string()).await),
            };
            (notification, to, cc)
        };

        // 3. テンプレート選択と変数フラット化
        let routing = notification.event_type().routing();
        let mut variables = flatten_variables(notification.event_data());
        remap_reserved(&mut variables, notification.event_type());

        let email = TemplatedEmail {
            from: self.from_address.clone(),
            to,
            cc,
            subject: notification.subject(),
            template_id: routing.template_id.to_string(),
            variables,
        };

        // 4. 送信（1 呼び出し = 1 通）と配信ログ記録
        match self.sender.send(&email).await {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::DISPATCH_SENT,
                    event.entity_type = event::entity_type::DELIVERY_LOG,
                    event.result = event::result::SUCCESS,
                    notification.event_type = %notification.event_type(),
                    notification.recipient_count = email.to.len(),
                    "通知メール送信成功"
                );
                self.record_log(&email, notification.event_type(), "sent", None)
                    .await;
                Ok(DispatchOutcome::Sent {
                    to: email.to.iter().map(|r| r.email.to_string()).collect(),
                    cc: email.cc.iter().map(|r| r.email.to_string()).collect(),
                })
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::DISPATCH_FAILED,
                    event.entity_type = event::entity_type::DELIVERY_LOG,
                    event.result = event::result::FAILURE,
                    notification.event_type = %notification.event_type(),
                    error = %e,
                    "通知メール送信失敗"
                );
                self.record_log(
                    &email,
                    notification.event_type(),
                    "failed",
                    Some(e.to_string()),
                )
                .await;
                Ok(DispatchOutcome::Degraded {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// テストモードの送信者を認可する
    ///
    /// ベアラートークン → アカウント → 管理者フラグの順に検証する。
    /// テストモードは人間が結果を待っているため、ここでの失敗は
    /// 実際の HTTP エラーステータスとして返す。
    async fn authorize_test_sender(&self, token: Option<&str>) -> Result<(), NotifierError> {
        let token = token.ok_or_else(|| {
            NotifierError::Unauthorized("Authorization ヘッダが必要です".to_string())
        })?;

        let account_id = self
            .token_verifier
            .verify(token)
            .await
            .map_err(|e| NotifierError::Internal(e.to_string()))?
            .ok_or_else(|| NotifierError::Unauthorized("トークンが無効です".to_string()))?;

        let member = self
            .member_repo
            .find_by_account(&account_id)
            .await
            .map_err(|e| NotifierError::Internal(e.to_string()))?
            .ok_or_else(|| {
                NotifierError::Forbidden("アカウントに対応するメンバーが存在しません".to_string())
            })?;

        if !member.is_admin() {
            return Err(NotifierError::Forbidden(
                "テスト送信には管理者権限が必要です".to_string(),
            ));
        }

        Ok(())
    }

    /// 宛先解決の失敗を degraded 結果に変換する
    async fn degraded(
        &self,
        notification: &NotificationEvent,
        reason: String,
    ) -> DispatchOutcome {
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::DISPATCH_FAILED,
            event.result = event::result::FAILURE,
            notification.event_type = %notification.event_type(),
            error = %reason,
            "宛先解決に失敗"
        );
        DispatchOutcome::Degraded { reason }
    }

    /// 配信ログを記録する（fire-and-forget）
    ///
    /// ログ記録の失敗はディスパッチ結果に影響させない。
    async fn record_log(
        &self,
        email: &TemplatedEmail,
        event_type: EventType,
        status: &str,
        error_message: Option<String>,
    ) {
        let log = DeliveryLog {
            id: DeliveryLogId::new(),
            event_type,
            recipient_emails: email.to.iter().map(|r| r.email.to_string()).collect(),
            cc_emails: email.cc.iter().map(|r| r.email.to_string()).collect(),
            subject: email.subject.clone(),
            template_id: email.template_id.clone(),
            status: status.to_string(),
            error_message,
            sent_at: Utc::now(),
        };

        if let Err(e) = self.delivery_log_repo.insert(&log).await {
            tracing::error!(
                error = %e,
                "配信ログの記録に失敗"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use ekklesia_domain::member::{AccountId, Member, MemberId, Role};
    use ekklesia_infra::mock::{
        MockDeliveryLogRepository,
        MockDeliverySender,
        MockMemberRepository,
        MockTokenVerifier,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn make_usecase(
        member_repo: MockMemberRepository,
        sender: MockDeliverySender,
        log_repo: MockDeliveryLogRepository,
        token_verifier: MockTokenVerifier,
    ) -> DispatchUseCaseImpl<MockMemberRepository, MockTokenVerifier> {
        DispatchUseCaseImpl::new(
            member_repo,
            token_verifier,
            Arc::new(sender),
            Arc::new(log_repo),
            "noreply@ekklesia.example.com".to_string(),
        )
    }

    fn make_member(email: &str, is_admin: bool) -> Member {
        Member::from_db(
            MemberId::new(),
            Some(AccountId::new()),
            Some(Email::new(email).unwrap()),
            None,
            is_admin,
        )
    }

    fn donation_input() -> DispatchInput {
        DispatchInput {
            event_type:     "donation".to_string(),
            event_data:     Some(
                json!({"amount": "50.00", "donor_name": "Jane"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
            test_mode:      false,
            test_recipient: None,
            bearer_token:   None,
        }
    }

    #[tokio::test]
    async fn 未知のイベント種別は400相当のエラーになる() {
        let usecase = make_usecase(
            MockMemberRepository::new(),
            MockDeliverySender::new(),
            MockDeliveryLogRepository::new(),
            MockTokenVerifier::new(),
        );

        let input = DispatchInput {
            event_type: "unknown-kind".to_string(),
            ..donation_input()
        };

        let result = usecase.dispatch(input).await;
        assert!(matches!(result, Err(NotifierError::UnknownEventType(_))));
    }

    #[tokio::test]
    async fn イベントデータ欠落はバリデーションエラーになる() {
        let usecase = make_usecase(
            MockMemberRepository::new(),
            MockDeliverySender::new(),
            MockDeliveryLogRepository::new(),
            MockTokenVerifier::new(),
        );

        let input = DispatchInput {
            event_data: None,
            ..donation_input()
        };

        let result = usecase.dispatch(input).await;
        assert!(matches!(result, Err(NotifierError::Validation(_))));
    }

    #[tokio::test]
    async fn 宛先なしはプロバイダを呼ばずに成功する() {
        let sender = MockDeliverySender::new();
        let usecase = make_usecase(
            MockMemberRepository::new(),
            sender.clone(),
            MockDeliveryLogRepository::new(),
            MockTokenVerifier::new(),
        );

        let outcome = usecase.dispatch(donation_input()).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::NoRecipients);
        assert!(sender.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn 配信失敗はdegradedになり配信ログにfailedが記録される() {
        let member_repo = MockMemberRepository::new();
        let elder = make_member("elder@example.com", false);
        member_repo.grant_role(*elder.id(), Role::Elder);
        member_repo.add_member(elder);

        let sender = MockDeliverySender::new();
        sender.fail_with("プロバイダがリクエストを拒否: 503");
        let log_repo = MockDeliveryLogRepository::new();

        let usecase = make_usecase(
            member_repo,
            sender,
            log_repo.clone(),
            MockTokenVerifier::new(),
        );

        let outcome = usecase.dispatch(donation_input()).await.unwrap();

        assert!(matches!(
            outcome,
            DispatchOutcome::Degraded { ref reason } if reason.contains("503")
        ));
        let logs = log_repo.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, "failed");
        assert!(logs[0].error_message.is_some());
    }

    #[tokio::test]
    async fn 宛先解決の失敗はdegradedになる() {
        let member_repo = MockMemberRepository::new();
        member_repo.fail_with("接続失敗");

        let usecase = make_usecase(
            member_repo,
            MockDeliverySender::new(),
            MockDeliveryLogRepository::new(),
            MockTokenVerifier::new(),
        );

        let outcome = usecase.dispatch(donation_input()).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Degraded { .. }));
    }
}
