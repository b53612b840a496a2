//! Client-credentials bearer token for the catalog API, kept in SQLite so
//! a restart doesn't cost a refresh.

use std::fmt;

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{AppErr, AppResult};

#[derive(Clone)]
pub struct Credentials {
    pub client_id:     String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[derive(Deserialize)]
struct Grant {
    access_token: String,
    expires_in:   i64,
}

pub async fn init_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS token (
            access_token TEXT    NOT NULL,
            expires_on   INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub struct TokenCache {
    pool:         SqlitePool,
    http:         Client,
    accounts_url: String,
    credentials:  Option<Credentials>,
    refresh:      Mutex<()>,   // one refresh at a time
}

impl TokenCache {
    pub fn new(
        pool: SqlitePool,
        http: Client,
        accounts_url: String,
        credentials: Option<Credentials>,
    ) -> Self {
        Self { pool, http, accounts_url, credentials, refresh: Mutex::new(()) }
    }

    /// Stored token if still valid, otherwise a fresh one from the accounts service.
    pub async fn access_token(&self) -> AppResult<String> {
        let _guard = self.refresh.lock().await;
        let now = Utc::now().timestamp();
        if let Some(token) = self.stored(now).await? {
            return Ok(token);
        }

        let creds = self
            .credentials
            .as_ref()
            .ok_or_else(|| AppErr::Unavailable("catalog credentials not configured".into()))?;
        let resp = self
            .http
            .post(&self.accounts_url)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AppErr::Upstream { status, body });
        }

        let grant: Grant = resp.json().await?;
        self.store(&grant.access_token, now + grant.expires_in).await?;
        info!(expires_in = grant.expires_in, "catalog token refreshed");
        Ok(grant.access_token)
    }

    async fn stored(&self, now: i64) -> AppResult<Option<String>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT access_token, expires_on FROM token LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.filter(|(_, exp)| *exp > now).map(|(token, _)| token))
    }

    /// Replace the single row.
    async fn store(&self, token: &str, expires_on: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM token").execute(&mut *tx).await?;
        sqlx::query("INSERT INTO token (access_token, expires_on) VALUES (?, ?)")
            .bind(token)
            .bind(expires_on)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
