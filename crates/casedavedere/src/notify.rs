//! Email notification through the Gmail REST API.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub const SUBJECT: &str = "CaseDaVedere";

const GMAIL_API: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to read credentials {path}: {source}")]
    ReadCredentials { path: PathBuf, source: io::Error },
    #[error("Failed to write credentials {path}: {source}")]
    WriteCredentials { path: PathBuf, source: io::Error },
    #[error("Invalid credentials {path}: {source}")]
    InvalidCredentials {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Gmail API returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("No recipients configured")]
    NoRecipients,
}

/// An OAuth authorized-user token file, as written by Google's client libraries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub token: Option<String>,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self, NotifyError> {
        let content = fs::read_to_string(path).map_err(|source| NotifyError::ReadCredentials {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| NotifyError::InvalidCredentials {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), NotifyError> {
        let content =
            serde_json::to_string(self).map_err(|source| NotifyError::InvalidCredentials {
                path: path.to_path_buf(),
                source,
            })?;
        fs::write(path, content).map_err(|source| NotifyError::WriteCredentials {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (None, _) => true,
            (Some(_), Some(expiry)) => expiry <= now + Duration::seconds(EXPIRY_MARGIN_SECS),
            (Some(_), None) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    email_address: String,
}

#[derive(Debug, Serialize)]
struct RawMessage<'a> {
    raw: &'a str,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

fn wrap_lines(text: &str, width: usize) -> String {
    text.as_bytes()
        .chunks(width)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// An HTML email encoded for the `raw` field of `messages.send`.
pub fn compose_message(sender: &str, recipients: &[String], subject: &str, html: &str) -> String {
    let body = wrap_lines(&STANDARD.encode(html.as_bytes()), 76);
    let message = format!(
        "Content-Type: text/html; charset=\"utf-8\"\r\n\
         MIME-Version: 1.0\r\n\
         Content-Transfer-Encoding: base64\r\n\
         to: {}\r\n\
         from: {}\r\n\
         subject: {}\r\n\
         \r\n\
         {}\r\n",
        recipients.join(","),
        sender,
        subject,
        body
    );
    URL_SAFE.encode(message.as_bytes())
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Api { status, body })
}

pub struct GmailClient {
    client: Client,
    credentials: Credentials,
    credentials_path: PathBuf,
}

impl GmailClient {
    pub fn from_token_file(path: &Path) -> Result<Self, NotifyError> {
        let credentials = Credentials::load(path)?;
        let client = Client::builder()
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            credentials,
            credentials_path: path.to_path_buf(),
        })
    }

    /// A valid access token, refreshed and written back to disk when expired.
    async fn access_token(&mut self) -> Result<String, NotifyError> {
        let now = Utc::now();
        if let Some(token) = &self.credentials.token
            && !self.credentials.needs_refresh(now)
        {
            return Ok(token.clone());
        }

        log::info!("Refreshing Gmail access token");

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
        ];
        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&form)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;
        let refreshed: TokenResponse = check(response).await?.json().await?;

        self.credentials.token = Some(refreshed.access_token.clone());
        self.credentials.expiry = refreshed
            .expires_in
            .map(|secs| now + Duration::seconds(secs));
        self.credentials.save(&self.credentials_path)?;

        Ok(refreshed.access_token)
    }

    /// The address of the authorized account.
    pub async fn sender_address(&mut self) -> Result<String, NotifyError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(format!("{GMAIL_API}/profile"))
            .bearer_auth(token)
            .send()
            .await?;
        let profile: Profile = check(response).await?.json().await?;
        Ok(profile.email_address)
    }

    /// Sends one HTML email from the authorized account. Returns the message id.
    pub async fn send_html(
        &mut self,
        recipients: &[String],
        subject: &str,
        html: &str,
    ) -> Result<String, NotifyError> {
        if recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        let sender = self.sender_address().await?;
        let raw = compose_message(&sender, recipients, subject, html);
        let token = self.access_token().await?;

        let response = self
            .client
            .post(format!("{GMAIL_API}/messages/send"))
            .bearer_auth(token)
            .json(&RawMessage { raw: &raw })
            .send()
            .await?;
        let sent: SentMessage = check(response).await?.json().await?;

        log::info!("Sent email {} to {} recipient(s)", sent.id, recipients.len());
        Ok(sent.id)
    }
}

/// Emails `html` to `recipients` with the credentials stored at `token_path`.
pub async fn send_report(
    token_path: &Path,
    recipients: &[String],
    html: &str,
) -> Result<(), NotifyError> {
    let mut gmail = GmailClient::from_token_file(token_path)?;
    gmail.send_html(recipients, SUBJECT, html).await?;
    Ok(())
}
