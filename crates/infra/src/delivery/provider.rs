//! ホスト型テンプレート API への配信実装
//!
//! 配信プロバイダの HTTP API を使用してメールを送信する。
//! テンプレート本文はプロバイダ側でホストされ、テンプレート ID と
//! 変数マップを渡すだけで 1 通が送信される。本番環境で使用する。

use std::collections::BTreeMap;

use async_trait::async_trait;
use ekklesia_domain::{
    delivery::{DeliveryError, TemplatedEmail},
    member::Recipient,
};
use serde::Serialize;
use serde_json::Value;

use super::DeliverySender;

/// ホスト型テンプレート API の配信実装
///
/// `reqwest::Client` をラップし、プロバイダの `/v1/email` エンドポイントに
/// JSON を POST する。
pub struct HttpDeliverySender {
    client:   reqwest::Client,
    base_url: String,
    api_key:  String,
}

/// プロバイダ API のリクエストペイロード
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from:     Address<'a>,
    to:       Vec<Address<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc:       Vec<Address<'a>>,
    subject:  &'a str,
    template: TemplateRef<'a>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name:  Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TemplateRef<'a> {
    id:        &'a str,
    variables: &'a BTreeMap<String, Value>,
}

impl<'a> Address<'a> {
    fn from_recipient(recipient: &'a Recipient) -> Self {
        Self {
            email: recipient.email.as_str(),
            name:  recipient.name.as_deref(),
        }
    }
}

impl HttpDeliverySender {
    /// 新しいプロバイダ送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `base_url`: プロバイダ API のベース URL
    /// - `api_key`: プロバイダが発行した API キー（Bearer 認証）
    pub fn new(base_url: &str, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl DeliverySender for HttpDeliverySender {
    async fn send(&self, email: &TemplatedEmail) -> Result<(), DeliveryError> {
        let payload = SendRequest {
            from:     Address {
                email: &email.from,
                name:  None,
            },
            to:       email.to.iter().map(Address::from_recipient).collect(),
            cc:       email.cc.iter().map(Address::from_recipient).collect(),
            subject:  &email.subject,
            template: TemplateRef {
                id:        &email.template_id,
                variables: &email.variables,
            },
        };

        let url = format!("{}/v1/email", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::SendFailed(format!("プロバイダへの接続失敗: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::SendFailed(format!(
                "プロバイダがリクエストを拒否: {status} {body}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ekklesia_domain::member::Email;
    use serde_json::json;

    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpDeliverySender>();
    }

    #[test]
    fn リクエストペイロードのjson形状が正しい() {
        let to = Recipient {
            email: Email::new("elder@example.com").unwrap(),
            name:  Some("長老".to_string()),
        };
        let mut variables = BTreeMap::new();
        variables.insert("AMOUNT".to_string(), json!("50.00"));

        let payload = SendRequest {
            from:     Address {
                email: "noreply@ekklesia.example.com",
                name:  None,
            },
            to:       vec![Address::from_recipient(&to)],
            cc:       Vec::new(),
            subject:  "New Donation",
            template: TemplateRef {
                id: "donation",
                variables: &variables,
            },
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "from": { "email": "noreply@ekklesia.example.com" },
                "to": [{ "email": "elder@example.com", "name": "長老" }],
                "subject": "New Donation",
                "template": { "id": "donation", "variables": { "AMOUNT": "50.00" } },
            })
        );
    }
}
