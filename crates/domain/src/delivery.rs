//! # 配信
//!
//! 配信プロバイダへ渡すメール表現を定義する。
//!
//! ## 設計方針
//!
//! - **テンプレートはプロバイダ側でホストされる**: 本文はここでは組み立てず、
//!   テンプレート ID と変数マップを渡す
//! - **1 呼び出し = 1 通**: to と cc をまとめた 1 回の送信として扱う
//! - **fire-and-forget**: 送信失敗はディスパッチ結果に埋め込まれ、
//!   呼び出し元の業務処理を失敗させない

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::member::Recipient;

define_uuid_id! {
    /// 配信ログ ID（一意識別子）
    ///
    /// delivery_logs テーブルの主キー。UUID v7 を使用。
    pub struct DeliveryLogId;
}

/// 配信エラー
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// プロバイダへの送信に失敗
    ///
    /// トランスポートエラーとプロバイダによる拒否の両方を含む。
    /// メッセージにはプロバイダのエラーテキストをそのまま保持する。
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),
}

/// テンプレートメール
///
/// 配信プロバイダの send API に渡されるペイロード。
#[derive(Debug, Clone)]
pub struct TemplatedEmail {
    /// 送信元メールアドレス
    pub from:        String,
    /// 一次宛先
    pub to:          Vec<Recipient>,
    /// CC 宛先
    pub cc:          Vec<Recipient>,
    /// 件名
    pub subject:     String,
    /// プロバイダ側でホストされるテンプレートの ID
    pub template_id: String,
    /// テンプレート変数（UPPER_SNAKE_CASE キー）
    pub variables:   BTreeMap<String, Value>,
}
