//! # テスト用モックリポジトリ
//!
//! ユースケーステストで使用するインメモリモック実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! ekklesia-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! 配信センダーとアクセスチェッカーには失敗注入用のトグルがある
//! （配信失敗時の degraded 応答や、アクセスチェックのエラーを
//! 拒否として扱う仕様のテストに使用する）。

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ekklesia_domain::{
    delivery::{DeliveryError, TemplatedEmail},
    digest::{Board, BoardId},
    member::{AccountId, DepartmentId, Member, MemberId, MinistryId, Role},
};

use crate::{
    authz::BoardAccessChecker,
    delivery::DeliverySender,
    error::InfraError,
    identity::TokenVerifier,
    repository::{
        BoardRepository,
        DeliveryLog,
        DeliveryLogRepository,
        MemberRepository,
        WatermarkRepository,
    },
};

// ===== MockMemberRepository =====

/// テスト用のモック MemberRepository
///
/// メンバー・役職・リード関係をインメモリで保持する。
/// `fail_with` でクエリ失敗を注入できる。
#[derive(Clone, Default)]
pub struct MockMemberRepository {
    members:          Arc<Mutex<Vec<Member>>>,
    roles:            Arc<Mutex<Vec<(MemberId, Role)>>>,
    department_leads: Arc<Mutex<Vec<(DepartmentId, String, MemberId)>>>,
    ministry_leads:   Arc<Mutex<Vec<(MinistryId, MemberId)>>>,
    fail:             Arc<Mutex<Option<String>>>,
}

impl MockMemberRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, member: Member) {
        self.members.lock().unwrap().push(member);
    }

    pub fn grant_role(&self, member_id: MemberId, role: Role) {
        self.roles.lock().unwrap().push((member_id, role));
    }

    pub fn add_department_lead(
        &self,
        department_id: DepartmentId,
        department_name: &str,
        member_id: MemberId,
    ) {
        self.department_leads.lock().unwrap().push((
            department_id,
            department_name.to_string(),
            member_id,
        ));
    }

    pub fn add_ministry_lead(&self, ministry_id: MinistryId, member_id: MemberId) {
        self.ministry_leads
            .lock()
            .unwrap()
            .push((ministry_id, member_id));
    }

    /// 以後のすべてのクエリを失敗させる
    pub fn fail_with(&self, message: &str) {
        *self.fail.lock().unwrap() = Some(message.to_string());
    }

    fn check_fail(&self) -> Result<(), InfraError> {
        match self.fail.lock().unwrap().as_ref() {
            Some(msg) => Err(InfraError::unexpected(msg.clone())),
            None => Ok(()),
        }
    }

    fn find_member(&self, id: &MemberId) -> Option<Member> {
        self.members
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id() == id)
            .cloned()
    }

    fn with_email(members: Vec<Member>) -> Vec<Member> {
        members.into_iter().filter(|m| m.email().is_some()).collect()
    }
}

#[async_trait]
impl MemberRepository for MockMemberRepository {
    async fn find_department_leads(
        &self,
        department_id: &DepartmentId,
    ) -> Result<Vec<Member>, InfraError> {
        self.check_fail()?;
        let ids: Vec<MemberId> = self
            .department_leads
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _, _)| id == department_id)
            .map(|(_, _, member_id)| *member_id)
            .collect();
        Ok(Self::with_email(
            ids.iter().filter_map(|id| self.find_member(id)).collect(),
        ))
    }

    async fn find_department_leads_by_name(&self, name: &str) -> Result<Vec<Member>, InfraError> {
        self.check_fail()?;
        let ids: Vec<MemberId> = self
            .department_leads
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, dept_name, _)| dept_name == name)
            .map(|(_, _, member_id)| *member_id)
            .collect();
        Ok(Self::with_email(
            ids.iter().filter_map(|id| self.find_member(id)).collect(),
        ))
    }

    async fn find_ministry_leads(
        &self,
        ministry_id: &MinistryId,
    ) -> Result<Vec<Member>, InfraError> {
        self.check_fail()?;
        let ids: Vec<MemberId> = self
            .ministry_leads
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == ministry_id)
            .map(|(_, member_id)| *member_id)
            .collect();
        Ok(Self::with_email(
            ids.iter().filter_map(|id| self.find_member(id)).collect(),
        ))
    }

    async fn find_by_roles(&self, roles: &[Role]) -> Result<Vec<Member>, InfraError> {
        self.check_fail()?;
        let grants = self.roles.lock().unwrap();
        let mut result = Vec::new();
        // 役職ごとの重複はそのまま返す（Postgres 実装と同じ契約）
        for (member_id, role) in grants.iter() {
            if roles.contains(role) {
                if let Some(member) = self.find_member(member_id) {
                    result.push(member);
                }
            }
        }
        Ok(Self::with_email(result))
    }

    async fn find_notifiable_page(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Member>, InfraError> {
        self.check_fail()?;
        let mut eligible: Vec<Member> = self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.account_id().is_some() && m.email().is_some())
            .cloned()
            .collect();
        eligible.sort_by_key(|m| *m.id().as_uuid());

        Ok(eligible
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<Member>, InfraError> {
        self.check_fail()?;
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.account_id() == Some(account_id))
            .cloned())
    }
}

// ===== MockBoardRepository =====

/// テスト用のモック BoardRepository
///
/// メッセージ・スレッドを作成時刻付きで保持し、ウィンドウ境界より
/// 新しいものだけを数える（Postgres 実装と同じ契約）。
#[derive(Clone, Default)]
pub struct MockBoardRepository {
    boards:   Arc<Mutex<Vec<(Board, bool)>>>,
    messages: Arc<Mutex<Vec<(BoardId, DateTime<Utc>, bool)>>>,
    threads:  Arc<Mutex<Vec<(BoardId, DateTime<Utc>)>>>,
}

impl MockBoardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_board(&self, board: Board) {
        self.boards.lock().unwrap().push((board, false));
    }

    pub fn add_archived_board(&self, board: Board) {
        self.boards.lock().unwrap().push((board, true));
    }

    /// メッセージを追加する（`is_reply` で返信かどうかを指定）
    pub fn add_message(&self, board_id: BoardId, created_at: DateTime<Utc>, is_reply: bool) {
        self.messages
            .lock()
            .unwrap()
            .push((board_id, created_at, is_reply));
    }

    pub fn add_thread(&self, board_id: BoardId, created_at: DateTime<Utc>) {
        self.threads.lock().unwrap().push((board_id, created_at));
    }
}

#[async_trait]
impl BoardRepository for MockBoardRepository {
    async fn find_active_boards(&self) -> Result<Vec<Board>, InfraError> {
        Ok(self
            .boards
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, archived)| !archived)
            .map(|(board, _)| board.clone())
            .collect())
    }

    async fn count_messages_since(
        &self,
        board_id: &BoardId,
        since: DateTime<Utc>,
    ) -> Result<i64, InfraError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, created_at, _)| id == board_id && *created_at > since)
            .count() as i64)
    }

    async fn count_replies_since(
        &self,
        board_id: &BoardId,
        since: DateTime<Utc>,
    ) -> Result<i64, InfraError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, created_at, is_reply)| {
                id == board_id && *created_at > since && *is_reply
            })
            .count() as i64)
    }

    async fn count_threads_since(
        &self,
        board_id: &BoardId,
        since: DateTime<Utc>,
    ) -> Result<i64, InfraError> {
        Ok(self
            .threads
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, created_at)| id == board_id && *created_at > since)
            .count() as i64)
    }
}

// ===== MockWatermarkRepository =====

/// テスト用のモック WatermarkRepository
#[derive(Clone, Default)]
pub struct MockWatermarkRepository {
    watermarks: Arc<Mutex<HashMap<(MemberId, BoardId), DateTime<Utc>>>>,
}

impl MockWatermarkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存のウォーターマークを直接設定する（テストの前提条件用）
    pub fn set(&self, member_id: MemberId, board_id: BoardId, at: DateTime<Utc>) {
        self.watermarks
            .lock()
            .unwrap()
            .insert((member_id, board_id), at);
    }

    /// 保持しているウォーターマークのスナップショットを返す
    pub fn entries(&self) -> HashMap<(MemberId, BoardId), DateTime<Utc>> {
        self.watermarks.lock().unwrap().clone()
    }
}

#[async_trait]
impl WatermarkRepository for MockWatermarkRepository {
    async fn find(
        &self,
        member_id: &MemberId,
        board_id: &BoardId,
    ) -> Result<Option<DateTime<Utc>>, InfraError> {
        Ok(self
            .watermarks
            .lock()
            .unwrap()
            .get(&(*member_id, *board_id))
            .copied())
    }

    async fn upsert(
        &self,
        member_id: &MemberId,
        board_id: &BoardId,
        last_notified_at: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        self.watermarks
            .lock()
            .unwrap()
            .insert((*member_id, *board_id), last_notified_at);
        Ok(())
    }
}

// ===== MockDeliveryLogRepository =====

/// テスト用のモック DeliveryLogRepository
#[derive(Clone, Default)]
pub struct MockDeliveryLogRepository {
    logs: Arc<Mutex<Vec<DeliveryLog>>>,
}

impl MockDeliveryLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録されたログのスナップショットを返す
    pub fn logs(&self) -> Vec<DeliveryLog> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryLogRepository for MockDeliveryLogRepository {
    async fn insert(&self, log: &DeliveryLog) -> Result<(), InfraError> {
        self.logs.lock().unwrap().push(log.clone());
        Ok(())
    }
}

// ===== MockDeliverySender =====

/// テスト用のモック DeliverySender
///
/// 送信されたメールを記録する。`fail_with` で送信失敗を注入できる。
#[derive(Clone, Default)]
pub struct MockDeliverySender {
    sent: Arc<Mutex<Vec<TemplatedEmail>>>,
    fail: Arc<Mutex<Option<String>>>,
}

impl MockDeliverySender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以後のすべての送信を失敗させる
    pub fn fail_with(&self, message: &str) {
        *self.fail.lock().unwrap() = Some(message.to_string());
    }

    /// 送信されたメールのスナップショットを返す
    pub fn sent_emails(&self) -> Vec<TemplatedEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliverySender for MockDeliverySender {
    async fn send(&self, email: &TemplatedEmail) -> Result<(), DeliveryError> {
        if let Some(msg) = self.fail.lock().unwrap().as_ref() {
            return Err(DeliveryError::SendFailed(msg.clone()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ===== MockBoardAccessChecker =====

/// テスト用のモック BoardAccessChecker
///
/// 明示的に許可したペアのみアクセス可能。`error_on` でチェック自体の
/// 失敗を注入できる（呼び出し側は拒否として扱う契約）。
#[derive(Clone, Default)]
pub struct MockBoardAccessChecker {
    allowed:  Arc<Mutex<HashSet<(BoardId, MemberId)>>>,
    erroring: Arc<Mutex<HashSet<(BoardId, MemberId)>>>,
}

impl MockBoardAccessChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&self, board_id: BoardId, member_id: MemberId) {
        self.allowed.lock().unwrap().insert((board_id, member_id));
    }

    /// 指定ペアのチェックをエラーにする
    pub fn error_on(&self, board_id: BoardId, member_id: MemberId) {
        self.erroring.lock().unwrap().insert((board_id, member_id));
    }
}

#[async_trait]
impl BoardAccessChecker for MockBoardAccessChecker {
    async fn has_access(
        &self,
        board_id: &BoardId,
        member_id: &MemberId,
    ) -> Result<bool, InfraError> {
        if self
            .erroring
            .lock()
            .unwrap()
            .contains(&(*board_id, *member_id))
        {
            return Err(InfraError::unexpected("アクセスチェック失敗"));
        }
        Ok(self
            .allowed
            .lock()
            .unwrap()
            .contains(&(*board_id, *member_id)))
    }
}

// ===== MockTokenVerifier =====

/// テスト用のモック TokenVerifier
#[derive(Clone, Default)]
pub struct MockTokenVerifier {
    tokens: Arc<Mutex<HashMap<String, AccountId>>>,
}

impl MockTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// トークンとアカウント ID の対応を登録する
    pub fn register(&self, token: &str, account_id: AccountId) {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), account_id);
    }
}

#[async_trait]
impl TokenVerifier for MockTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Option<AccountId>, InfraError> {
        Ok(self.tokens.lock().unwrap().get(token).copied())
    }
}
