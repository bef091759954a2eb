//! # メンバー
//!
//! 教会メンバーと役職・所属に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 補足 |
//! |---|------------|------|
//! | [`Member`] | メンバー | 通知対象。ログインアカウントとの紐付けは任意 |
//! | [`Role`] | 役職 | Elder（長老）、Apostle（使徒）、Deacon（執事） |
//! | [`Recipient`] | 受信者 | メンバーから導出される送信先。永続化しない |
//!
//! ## 設計方針
//!
//! - **受信者は導出値**: `Recipient` はロール・リード検索の結果から都度組み立てる
//! - **メールアドレス必須**: メールを持たないメンバーは受信者になれない
//!   （[`Member::as_recipient`] が `None` を返す）

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::error::DomainError;

define_uuid_id! {
    /// メンバー ID（一意識別子）
    pub struct MemberId;
}

define_uuid_id! {
    /// 認証アカウント ID
    ///
    /// 外部認証基盤が発行するアカウントの識別子。
    /// メンバーとの紐付けは任意（未リンクのメンバーも存在する）。
    pub struct AccountId;
}

define_uuid_id! {
    /// 部署 ID
    pub struct DepartmentId;
}

define_uuid_id! {
    /// ミニストリー ID
    pub struct MinistryId;
}

/// 役職
///
/// roles テーブルの `name` カラムに格納される値と 1:1 対応する。
/// 配信ルール（[`crate::event::RecipientRule`]）の検索キーとして使用する。
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
)]
pub enum Role {
    /// 長老: 提案・サポート依頼・献金などの一次通知先
    Elder,
    /// 使徒: リーダーシップ層への CC 先（献金では唯一の CC 先）
    Apostle,
    /// 執事: 問い合わせフォーム送信の一次通知先
    Deacon,
}

/// メールアドレス
///
/// trim + 空チェック + `@` を含むこと + 254 文字以内を検証する Newtype。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// バリデーション付きでメールアドレスを作成する
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }

        if !value.contains('@') {
            return Err(DomainError::Validation(format!(
                "メールアドレスの形式が不正です: {value}"
            )));
        }

        if value.chars().count() > 254 {
            return Err(DomainError::Validation(
                "メールアドレスは 254 文字以内である必要があります".to_string(),
            ));
        }

        Ok(Self(value))
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所有権を持つ文字列に変換する
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// メンバー
///
/// members テーブルの行に対応する。メールアドレスと認証アカウントは
/// どちらも任意で、両方を持つメンバーのみがダイジェスト配信の対象になる。
#[derive(Debug, Clone)]
pub struct Member {
    id:         MemberId,
    account_id: Option<AccountId>,
    email:      Option<Email>,
    name:       Option<String>,
    is_admin:   bool,
}

impl Member {
    /// データベースの行からメンバーを復元する
    pub fn from_db(
        id: MemberId,
        account_id: Option<AccountId>,
        email: Option<Email>,
        name: Option<String>,
        is_admin: bool,
    ) -> Self {
        Self {
            id,
            account_id,
            email,
            name,
            is_admin,
        }
    }

    pub fn id(&self) -> &MemberId {
        &self.id
    }

    pub fn account_id(&self) -> Option<&AccountId> {
        self.account_id.as_ref()
    }

    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// 表示名を返す（名前が未設定ならメールアドレスで代替）
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.email.as_ref().map(|e| e.as_str().to_string()))
            .unwrap_or_default()
    }

    /// 受信者に変換する
    ///
    /// メールアドレスを持たないメンバーは受信者になれないため `None` を返す。
    /// 名前はベストエフォートで引き継ぐ。
    pub fn as_recipient(&self) -> Option<Recipient> {
        self.email.clone().map(|email| Recipient {
            email,
            name: self.name.clone(),
        })
    }
}

/// 受信者
///
/// 配信プロバイダへ渡す宛先。永続化されず、解決のたびに導出される。
/// 同一メールアドレスの重複排除は行わない（複数の役職に該当する場合は
/// そのまま複数回渡される）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub email: Email,
    pub name:  Option<String>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_roleの文字列変換が正しい() {
        assert_eq!(Role::Elder.to_string(), "Elder");
        assert_eq!(Role::Apostle.to_string(), "Apostle");
        assert_eq!(Role::Deacon.to_string(), "Deacon");

        assert_eq!(Role::from_str("Elder").unwrap(), Role::Elder);
        assert!(Role::from_str("elder").is_err());
    }

    #[rstest]
    #[case("alice@example.com")]
    #[case("  bob@example.com  ")]
    fn 有効なメールアドレスを受け付ける(#[case] input: &str) {
        let email = Email::new(input).unwrap();
        assert_eq!(email.as_str(), input.trim());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("no-at-mark")]
    fn 不正なメールアドレスを拒否する(#[case] input: &str) {
        assert!(Email::new(input).is_err());
    }

    #[test]
    fn メールアドレスの長さ上限を超えると拒否する() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(Email::new(long).is_err());
    }

    fn make_member(email: Option<&str>, name: Option<&str>) -> Member {
        Member::from_db(
            MemberId::new(),
            Some(AccountId::new()),
            email.map(|e| Email::new(e).unwrap()),
            name.map(ToString::to_string),
            false,
        )
    }

    #[test]
    fn as_recipientはメールアドレスを持つメンバーのみ変換する() {
        let with_email = make_member(Some("a@example.com"), Some("山田太郎"));
        let recipient = with_email.as_recipient().unwrap();
        assert_eq!(recipient.email.as_str(), "a@example.com");
        assert_eq!(recipient.name.as_deref(), Some("山田太郎"));

        let without_email = make_member(None, Some("山田太郎"));
        assert!(without_email.as_recipient().is_none());
    }

    #[test]
    fn display_nameは名前がなければメールアドレスで代替する() {
        let named = make_member(Some("a@example.com"), Some("山田太郎"));
        assert_eq!(named.display_name(), "山田太郎");

        let unnamed = make_member(Some("a@example.com"), None);
        assert_eq!(unnamed.display_name(), "a@example.com");
    }
}
