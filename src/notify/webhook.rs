use async_trait::async_trait;
use tracing::warn;

use super::{Notification, Notifier};

const COLOR_SUCCESS: u32 = 0x00ff00;
const COLOR_INFO: u32 = 0x0099ff;
const COLOR_FAILURE: u32 = 0xff5555;

/// Posts notifications as Discord-style embeds
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }

    async fn post_embed(&self, payload: serde_json::Value) {
        if let Err(e) = self.client.post(&self.webhook_url).json(&payload).send().await {
            warn!("[Webhook] Failed to send webhook: {}", e);
        }
    }
}

pub(crate) fn embed_for(notification: &Notification) -> serde_json::Value {
    let color = match notification {
        Notification::BidPlaced { .. } => COLOR_SUCCESS,
        Notification::Bidding { .. } => COLOR_INFO,
        _ => COLOR_FAILURE,
    };

    let mut fields = Vec::new();
    match notification {
        Notification::Bidding { id, item_name, price }
        | Notification::BidPlaced { id, item_name, price, .. } => {
            fields.push(serde_json::json!({"name": "Item", "value": item_name, "inline": true}));
            fields.push(serde_json::json!({"name": "Auction", "value": id.to_string(), "inline": true}));
            fields.push(serde_json::json!({"name": "Price", "value": format!("{} ISK", price), "inline": true}));
        }
        Notification::BidFailed { id, item_name, .. } => {
            fields.push(serde_json::json!({"name": "Item", "value": item_name, "inline": true}));
            fields.push(serde_json::json!({"name": "Auction", "value": id.to_string(), "inline": true}));
        }
        Notification::NetworkError { .. } | Notification::CredentialExpired => {}
    }

    serde_json::json!({
        "embeds": [{
            "title": notification.title(),
            "description": notification.description(),
            "color": color,
            "fields": fields
        }]
    })
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) {
        self.post_embed(embed_for(notification)).await;
    }
}
