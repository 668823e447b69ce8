use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::ServiceError;
use crate::model::SyncUser;

pub const USER_CREATED: &str = "user.created";

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: JsonValue,
}

#[derive(Debug, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub id: Option<String>,
    pub email_address: String,
}

#[derive(Debug, Deserialize)]
pub struct UserCreated {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserCreated {
    pub fn from_event(event: WebhookEvent) -> Result<Self, ServiceError> {
        serde_json::from_value(event.data)
            .map_err(|e| ServiceError::BadRequest(format!("malformed {} payload: {}", USER_CREATED, e)))
    }

    fn primary_email(&self) -> Option<&str> {
        let primary = self.primary_email_address_id.as_deref().and_then(|primary| {
            self.email_addresses
                .iter()
                .find(|address| address.id.as_deref() == Some(primary))
        });

        primary
            .or_else(|| self.email_addresses.first())
            .map(|address| address.email_address.as_str())
    }

    pub fn into_sync_user(self) -> Result<SyncUser, ServiceError> {
        let email = self
            .primary_email()
            .ok_or_else(|| ServiceError::BadRequest(format!("user {} has no email address", self.id)))?
            .to_string();

        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string();

        Ok(SyncUser {
            user_id: self.id,
            email,
            name,
        })
    }
}
