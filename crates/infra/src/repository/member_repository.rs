//! # MemberRepository
//!
//! メンバー情報の検索を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **受信者検索はメールアドレス必須**: 配信ルールに使う検索
//!   （リード・役職）は NULL・空文字のメールアドレスを SQL 側で除外する
//! - **重複排除しない**: 複数の役職に該当するメンバーは複数行返る
//!   （受信者解決の契約どおり、そのままプロバイダへ渡される）
//! - **安定したページング**: ダイジェスト対象のページングはメンバー ID 順

use async_trait::async_trait;
use ekklesia_domain::member::{
    AccountId,
    DepartmentId,
    Email,
    Member,
    MemberId,
    MinistryId,
    Role,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// メンバーリポジトリトレイト
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// 部署のリード全員を取得する（メールアドレス必須）
    async fn find_department_leads(
        &self,
        department_id: &DepartmentId,
    ) -> Result<Vec<Member>, InfraError>;

    /// 名前が完全一致する部署のリード全員を取得する
    ///
    /// 祈祷課題（"Intercession"）と証（"Moderation"）の固定ルールで使用する。
    async fn find_department_leads_by_name(&self, name: &str) -> Result<Vec<Member>, InfraError>;

    /// ミニストリーのリード全員を取得する（メールアドレス必須）
    async fn find_ministry_leads(
        &self,
        ministry_id: &MinistryId,
    ) -> Result<Vec<Member>, InfraError>;

    /// 指定した役職のいずれかを持つメンバー全員を取得する
    ///
    /// 複数の役職に該当するメンバーは役職ごとに 1 行ずつ返る（重複排除しない）。
    async fn find_by_roles(&self, roles: &[Role]) -> Result<Vec<Member>, InfraError>;

    /// ダイジェスト配信対象のメンバーを 1 ページ分取得する
    ///
    /// 対象条件: 認証アカウントが紐付いている AND メールアドレスを持つ。
    /// メンバー ID 昇順で `offset` から最大 `limit` 件を返す。
    async fn find_notifiable_page(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Member>, InfraError>;

    /// 認証アカウント ID でメンバーを検索する
    ///
    /// テストモード送信の管理者チェックで使用する。
    async fn find_by_account(&self, account_id: &AccountId)
    -> Result<Option<Member>, InfraError>;
}

/// members テーブルの行表現
#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id:         Uuid,
    account_id: Option<Uuid>,
    email:      Option<String>,
    name:       Option<String>,
    is_admin:   bool,
}

impl MemberRow {
    fn into_member(self) -> Result<Member, InfraError> {
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .map(Email::new)
            .transpose()
            .map_err(|e| InfraError::unexpected(e.to_string()))?;

        Ok(Member::from_db(
            MemberId::from_uuid(self.id),
            self.account_id.map(AccountId::from_uuid),
            email,
            self.name,
            self.is_admin,
        ))
    }
}

fn rows_into_members(rows: Vec<MemberRow>) -> Result<Vec<Member>, InfraError> {
    rows.into_iter().map(MemberRow::into_member).collect()
}

/// PostgreSQL 実装の MemberRepository
#[derive(Debug, Clone)]
pub struct PostgresMemberRepository {
    pool: PgPool,
}

impl PostgresMemberRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberRepository for PostgresMemberRepository {
    async fn find_department_leads(
        &self,
        department_id: &DepartmentId,
    ) -> Result<Vec<Member>, InfraError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT m.id, m.account_id, m.email, m.name, m.is_admin
            FROM members m
            INNER JOIN department_members dm ON dm.member_id = m.id
            WHERE dm.department_id = $1
              AND dm.is_lead
              AND m.email IS NOT NULL AND m.email <> ''
            ORDER BY m.id
            "#,
        )
        .bind(department_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows_into_members(rows)
    }

    async fn find_department_leads_by_name(&self, name: &str) -> Result<Vec<Member>, InfraError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT m.id, m.account_id, m.email, m.name, m.is_admin
            FROM members m
            INNER JOIN department_members dm ON dm.member_id = m.id
            INNER JOIN departments d ON d.id = dm.department_id
            WHERE d.name = $1
              AND dm.is_lead
              AND m.email IS NOT NULL AND m.email <> ''
            ORDER BY m.id
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        rows_into_members(rows)
    }

    async fn find_ministry_leads(
        &self,
        ministry_id: &MinistryId,
    ) -> Result<Vec<Member>, InfraError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT m.id, m.account_id, m.email, m.name, m.is_admin
            FROM members m
            INNER JOIN ministry_members mm ON mm.member_id = m.id
            WHERE mm.ministry_id = $1
              AND mm.is_lead
              AND m.email IS NOT NULL AND m.email <> ''
            ORDER BY m.id
            "#,
        )
        .bind(ministry_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows_into_members(rows)
    }

    async fn find_by_roles(&self, roles: &[Role]) -> Result<Vec<Member>, InfraError> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let role_names: Vec<String> = roles.iter().map(ToString::to_string).collect();

        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT m.id, m.account_id, m.email, m.name, m.is_admin
            FROM members m
            INNER JOIN member_roles mr ON mr.member_id = m.id
            INNER JOIN roles r ON r.id = mr.role_id
            WHERE r.name = ANY($1)
              AND m.email IS NOT NULL AND m.email <> ''
            ORDER BY m.id
            "#,
        )
        .bind(&role_names)
        .fetch_all(&self.pool)
        .await?;

        rows_into_members(rows)
    }

    async fn find_notifiable_page(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Member>, InfraError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT id, account_id, email, name, is_admin
            FROM members
            WHERE account_id IS NOT NULL
              AND email IS NOT NULL AND email <> ''
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows_into_members(rows)
    }

    async fn find_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<Member>, InfraError> {
        let row = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT id, account_id, email, name, is_admin
            FROM members
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(MemberRow::into_member).transpose()
    }
}
