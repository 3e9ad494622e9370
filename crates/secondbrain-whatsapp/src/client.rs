//! WhatsApp Business Cloud API client, grounded on
//! `assistant.whatsapp.client.WhatsAppClient` (`send_text`/`_send_message`
//! and `download_media`).

use secondbrain_core::config::WhatsappConfig;

use crate::error::WhatsappError;

const API_VERSION: &str = "v18.0";
const MAX_MESSAGE_LENGTH: usize = 4096;

pub struct WhatsappClient {
    http: reqwest::Client,
    base_url: String,
    media_base_url: String,
    access_token: String,
}

impl WhatsappClient {
    pub fn new(config: &WhatsappConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("https://graph.facebook.com/{API_VERSION}/{}", config.phone_number_id),
            media_base_url: format!("https://graph.facebook.com/{API_VERSION}"),
            access_token: config.access_token.clone(),
        }
    }

    pub async fn send_text(&self, to: &str, text: &str) -> Result<(), WhatsappError> {
        let truncated;
        let body = if text.len() > MAX_MESSAGE_LENGTH {
            truncated = format!("{}...", &text[..MAX_MESSAGE_LENGTH - 3]);
            &truncated
        } else {
            text
        };

        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": { "preview_url": false, "body": body },
        });

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(WhatsappError::Api { status, body });
        }

        Ok(())
    }

    /// Two-step media download: resolve the media id to a signed URL, then
    /// fetch the content from it.
    pub async fn download_media(&self, media_id: &str) -> Result<Vec<u8>, WhatsappError> {
        let meta: serde_json::Value = self
            .http
            .get(format!("{}/{media_id}", self.media_base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let url = meta
            .get("url")
            .and_then(|u| u.as_str())
            .ok_or_else(|| WhatsappError::Parse("media metadata missing url".to_string()))?;

        let bytes = self.http.get(url).bearer_auth(&self.access_token).send().await?.error_for_status()?.bytes().await?;

        Ok(bytes.to_vec())
    }
}
