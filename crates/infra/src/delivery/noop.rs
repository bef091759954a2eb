//! Noop 配信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! テスト環境や通知無効化時に使用する。

use async_trait::async_trait;
use ekklesia_domain::delivery::{DeliveryError, TemplatedEmail};

use super::DeliverySender;

/// Noop 配信（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopDeliverySender;

#[async_trait]
impl DeliverySender for NoopDeliverySender {
    async fn send(&self, email: &TemplatedEmail) -> Result<(), DeliveryError> {
        tracing::info!(
            to_count = email.to.len(),
            cc_count = email.cc.len(),
            subject = %email.subject,
            template_id = %email.template_id,
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[tokio::test]
    async fn sendがエラーを返さない() {
        let sender = NoopDeliverySender;
        let email = TemplatedEmail {
            from:        "noreply@ekklesia.example.com".to_string(),
            to:          Vec::new(),
            cc:          Vec::new(),
            subject:     "テスト件名".to_string(),
            template_id: "donation".to_string(),
            variables:   BTreeMap::new(),
        };

        let result = sender.send(&email).await;
        assert!(result.is_ok());
    }
}
