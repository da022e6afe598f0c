use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use super::ScorePublisher;
use crate::config::ApiConfig;

pub struct FavroClient {
    base_url: String,
    auth_header: String,
    organization_id: String,
    client: reqwest::Client,
}

/// Writes RICE scores into one numeric custom field.
pub struct FavroPublisher {
    client: FavroClient,
    score_field_id: String,
}

impl FavroClient {
    pub fn new(api: &ApiConfig) -> Self {
        let creds = format!("{}:{}", api.email, api.token);
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        Self {
            base_url: api.server_url.clone(),
            auth_header: format!("Basic {encoded}"),
            organization_id: api.organization_id.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Client that writes scores into `score_field_id`.
    pub fn publisher(api: &ApiConfig, score_field_id: &str) -> FavroPublisher {
        FavroPublisher {
            client: Self::new(api),
            score_field_id: score_field_id.to_string(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .header("organizationId", &self.organization_id)
    }

    /// First page of the organization's custom fields, as returned by Favro.
    pub async fn list_custom_fields(&self) -> Result<Value> {
        let resp = self
            .request(reqwest::Method::GET, "customfields")
            .send()
            .await
            .context("Favro customfields request failed")?
            .error_for_status()
            .context("Favro rejected customfields request")?;

        resp.json().await.context("Failed to parse Favro customfields response")
    }

    pub async fn get_custom_field(&self, custom_field_id: &str) -> Result<CustomField> {
        let path = format!("customfields/{}", urlencoding::encode(custom_field_id));
        let resp = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .with_context(|| format!("Favro request for custom field {custom_field_id} failed"))?
            .error_for_status()
            .with_context(|| format!("Favro rejected request for custom field {custom_field_id}"))?;

        resp.json()
            .await
            .with_context(|| format!("Failed to parse custom field {custom_field_id}"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub custom_field_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub custom_field_items: Vec<CustomFieldItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldItem {
    pub custom_field_item_id: String,
    #[serde(default)]
    pub name: String,
}

#[async_trait]
impl ScorePublisher for FavroPublisher {
    fn name(&self) -> &str {
        "Favro"
    }

    async fn update_score(&self, card_id: &str, score: f64) -> Result<()> {
        let path = format!("cards/{}", urlencoding::encode(card_id));
        let resp = self
            .client
            .request(reqwest::Method::PUT, &path)
            .json(&json!({
                "customFields": [{
                    "customFieldId": self.score_field_id,
                    "total": score,
                }]
            }))
            .send()
            .await
            .context("Favro card update request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Favro card update returned {status}: {body}");
        }
        Ok(())
    }
}
