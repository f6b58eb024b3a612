//! Shared HTTP client for the hosted backend.
//!
//! One `reqwest::Client` for every adapter. Holds the live session so table and
//! storage requests carry the user's access token (anon key otherwise).

use crate::domain::{DomainError, Session};
use reqwest::{Client, Method, RequestBuilder, Response};
use std::sync::{Mutex, MutexGuard};

pub struct SupabaseClient {
    http: Client,
    base_url: String,
    anon_key: String,
    session: Mutex<Option<Session>>,
}

impl SupabaseClient {
    /// `base_url` is the project URL, e.g. `https://xyz.supabase.co`.
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session: Mutex::new(None),
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn session(&self) -> Option<Session> {
        self.lock_session().clone()
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self.lock_session() = session;
    }

    /// Clear the session only if its access token is `access_token`.
    pub fn clear_session_if(&self, access_token: &str) -> bool {
        let mut session = self.lock_session();
        if session.as_ref().map(|s| s.access_token.as_str()) != Some(access_token) {
            return false;
        }
        *session = None;
        true
    }

    /// Request with `apikey` and bearer headers set.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self
            .lock_session()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone());
        self.request_as(method, path, &bearer)
    }

    /// Request on behalf of a specific access token.
    pub fn request_as(&self, method: Method, path: &str, bearer: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }
}

/// Send and turn transport failures and non-2xx statuses into `DomainError`.
pub(crate) async fn send(
    req: RequestBuilder,
    err: fn(String) -> DomainError,
) -> Result<Response, DomainError> {
    let res = req
        .send()
        .await
        .map_err(|e| err(format!("request failed: {}", e)))?;
    if !res.status().is_success() {
        let status = res.status();
        let text = res.text().await.unwrap_or_else(|_| "unknown".to_string());
        return Err(err(format!("{}: {}", status, text)));
    }
    Ok(res)
}

/// Decode a JSON body.
pub(crate) async fn json<T: serde::de::DeserializeOwned>(
    res: Response,
    err: fn(String) -> DomainError,
) -> Result<T, DomainError> {
    res.json::<T>()
        .await
        .map_err(|e| err(format!("invalid response body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    #[test]
    fn base_url_is_normalised_and_session_is_held() {
        let c = SupabaseClient::new("https://x.supabase.co/", "anon");
        assert_eq!(c.url("/rest/v1/projects"), "https://x.supabase.co/rest/v1/projects");
        assert!(c.session().is_none());
        c.set_session(Some(Session {
            access_token: "a".into(),
            refresh_token: "r".into(),
            user_id: UserId::new("u1"),
            email: None,
            expires_at: None,
        }));
        assert_eq!(c.session().map(|s| s.user_id), Some(UserId::new("u1")));

        assert!(!c.clear_session_if("other"));
        assert!(c.session().is_some());
        assert!(c.clear_session_if("a"));
        assert!(c.session().is_none());
    }
}
