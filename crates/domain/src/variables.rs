//! # テンプレート変数のフラット化
//!
//! イベントデータ（ネストした JSON マップ）を、配信プロバイダの
//! テンプレート変数（UPPER_SNAKE_CASE のフラットなマップ）に変換する。
//!
//! ## 変換規則
//!
//! - キーは大文字化し、ネストしたマップは親子キーをアンダースコアで結合する
//!   （`{donor: {name: "x"}}` → `DONOR_NAME: "x"`）
//! - 文字列・数値はそのまま保持する
//! - `null` は脱落する
//! - 配列などその他の値は JSON 文字列化して保持する
//! - フラットな入力に対しては冪等（`flatten(flatten(x)) == flatten(x)`）
//!
//! ## 予約キーの付け替え
//!
//! プロバイダ予約変数 `EMAIL` と衝突するキーは、イベント種別に応じて
//! `CONTACT_EMAIL`（問い合わせフォーム）または `SUBMITTER_EMAIL`（その他）に
//! 改名してから送信する。

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::event::EventType;

/// 配信プロバイダが予約している変数名
pub const RESERVED_EMAIL_KEY: &str = "EMAIL";

/// イベントデータをテンプレート変数にフラット化する
pub fn flatten_variables(data: &Map<String, Value>) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    flatten_into(None, data, &mut out);
    out
}

fn flatten_into(prefix: Option<&str>, data: &Map<String, Value>, out: &mut BTreeMap<String, Value>) {
    for (key, value) in data {
        let flat_key = match prefix {
            Some(prefix) => format!("{prefix}_{key}").to_uppercase(),
            None => key.to_uppercase(),
        };

        match value {
            Value::Null => {}
            Value::Object(nested) => flatten_into(Some(&flat_key), nested, out),
            Value::String(_) | Value::Number(_) => {
                out.insert(flat_key, value.clone());
            }
            other => {
                out.insert(flat_key, Value::String(other.to_string()));
            }
        }
    }
}

/// 予約キーと衝突する変数をイベント種別に応じて改名する
///
/// `EMAIL` キーが存在する場合のみ改名が発生する。改名先のキーが
/// 既に存在していた場合は上書きする。
pub fn remap_reserved(variables: &mut BTreeMap<String, Value>, event_type: EventType) {
    if let Some(value) = variables.remove(RESERVED_EMAIL_KEY) {
        let renamed = match event_type {
            EventType::ContactSubmission => "CONTACT_EMAIL",
            _ => "SUBMITTER_EMAIL",
        };
        variables.insert(renamed.to_string(), value);
    }
}
