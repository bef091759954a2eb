//! # 宛先解決
//!
//! イベント種別ごとの配信ルール（[`RecipientRule`] / [`CcRule`]）を
//! メンバーリポジトリに対して実行し、宛先・CC の受信者リストを組み立てる。
//!
//! ## 設計方針
//!
//! - **ルールはドメイン層のテーブル**: どのイベントが誰に届くかは
//!   `EventType::routing()` が決め、ここはルールの実行だけを行う
//! - **重複排除しない**: 複数の役職・リード関係に該当するメンバーは
//!   そのまま複数回返る
//! - **読み取り専用**: 副作用を持たない

use ekklesia_domain::{
    event::{CcRule, NotificationEvent, RecipientRule},
    member::{DepartmentId, Email, Member, MinistryId, Recipient, Role},
};
use ekklesia_infra::{InfraError, repository::MemberRepository};
use thiserror::Error;
use uuid::Uuid;

/// 宛先解決エラー
///
/// 非ブロッキングポリシーにより、このエラーは HTTP エラーにはならず
/// degraded 応答の理由文字列として報告される。
#[derive(Debug, Error)]
pub enum ResolveError {
    /// イベントデータに識別フィールドがない
    #[error("イベントデータに {0} がありません")]
    MissingField(&'static str),

    /// 識別子のパースに失敗
    #[error("識別子が不正です: {0}")]
    InvalidIdentifier(String),

    /// リポジトリクエリの失敗
    #[error(transparent)]
    Repository(#[from] InfraError),
}

/// 宛先リゾルバ
///
/// メンバーリポジトリへの読み取りクエリだけで受信者を導出する。
pub struct RecipientResolver<'a, MR> {
    member_repo: &'a MR,
}

impl<'a, MR: MemberRepository> RecipientResolver<'a, MR> {
    pub fn new(member_repo: &'a MR) -> Self {
        Self { member_repo }
    }

    /// 一次宛先（to）を解決する
    pub async fn resolve_to(
        &self,
        event: &NotificationEvent,
    ) -> Result<Vec<Recipient>, ResolveError> {
        self.resolve_rule(event.event_type().routing().to, event)
            .await
    }

    /// CC 宛先を解決する
    pub async fn resolve_cc(
        &self,
        event: &NotificationEvent,
    ) -> Result<Vec<Recipient>, ResolveError> {
        let recipients = match event.event_type().routing().cc {
            CcRule::LeadershipUnion => {
                self.members_to_recipients(
                    self.member_repo
                        .find_by_roles(&[Role::Elder, Role::Apostle])
                        .await?,
                )
            }
            CcRule::ApostlesOnly => self.members_to_recipients(
                self.member_repo.find_by_roles(&[Role::Apostle]).await?,
            ),
            CcRule::None => Vec::new(),
        };

        Ok(recipients)
    }

    async fn resolve_rule(
        &self,
        rule: RecipientRule,
        event: &NotificationEvent,
    ) -> Result<Vec<Recipient>, ResolveError> {
        let recipients = match rule {
            RecipientRule::DepartmentLeads => {
                let id = Self::parse_id(event, "department_id")?;
                self.members_to_recipients(
                    self.member_repo
                        .find_department_leads(&DepartmentId::from_uuid(id))
                        .await?,
                )
            }
            RecipientRule::MinistryLeads => {
                let id = Self::parse_id(event, "ministry_id")?;
                self.members_to_recipients(
                    self.member_repo
                        .find_ministry_leads(&MinistryId::from_uuid(id))
                        .await?,
                )
            }
            RecipientRule::RoleHolders(role) => self.members_to_recipients(
                self.member_repo.find_by_roles(&[role]).await?,
            ),
            RecipientRule::NamedDepartmentLeads(name) => self.members_to_recipients(
                self.member_repo.find_department_leads_by_name(name).await?,
            ),
            RecipientRule::RoleHoldersAny(roles) => self.members_to_recipients(
                self.member_repo.find_by_roles(roles).await?,
            ),
            RecipientRule::EventRecipient => {
                let raw = event
                    .data_str("member_email")
                    .ok_or(ResolveError::MissingField("member_email"))?;
                let email = Email::new(raw)
                    .map_err(|e| ResolveError::InvalidIdentifier(e.to_string()))?;
                vec![Recipient {
                    email,
                    name: event.data_str("member_name").map(ToString::to_string),
                }]
            }
        };

        Ok(recipients)
    }

    fn parse_id(event: &NotificationEvent, field: &'static str) -> Result<Uuid, ResolveError> {
        let raw = event.data_str(field).ok_or(ResolveError::MissingField(field))?;
        Uuid::parse_str(raw).map_err(|e| ResolveError::InvalidIdentifier(format!("{field}: {e}")))
    }

    fn members_to_recipients(&self, members: Vec<Member>) -> Vec<Recipient> {
        members.into_iter().filter_map(|m| m.as_recipient()).collect()
    }
}
