//! Shared plumbing for the outbound HTTP clients.

use casino_lobby_engine::Error as LobbyError;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Error type for calls to upstream services.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

impl From<Error> for LobbyError {
    fn from(err: Error) -> Self {
        match err {
            Error::FailedWithBody { status, body } if status == reqwest::StatusCode::CONFLICT => {
                LobbyError::Conflict(body)
            }
            Error::FailedWithBody { status, body }
                if status == reqwest::StatusCode::BAD_REQUEST =>
            {
                LobbyError::Invalid(body)
            }
            other => LobbyError::unavailable(other),
        }
    }
}

/// A JSON-over-HTTP service rooted at `base_url`.
#[derive(Clone, Debug)]
pub struct Upstream {
    http: reqwest::Client,
    base_url: Url,
}

impl Upstream {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let mut base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidScheme(scheme.to_string())),
        }
        // `Url::join` replaces the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, Error> {
        let response = self.http.get(self.url(path)?).query(params).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let response = self.http.post(self.url(path)?).json(body).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// POSTs `body` and ignores the response payload.
    pub async fn post(&self, path: &str, body: &(impl Serialize + ?Sized)) -> Result<(), Error> {
        let response = self.http.post(self.url(path)?).json(body).send().await?;
        check(response).await?;
        Ok(())
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::FailedWithBody { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_schemes() {
        let err = Upstream::new("ftp://example.com", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidScheme(_)));
        assert_eq!(
            err.to_string(),
            "invalid URL scheme: ftp (expected http or https)"
        );
    }

    #[test]
    fn test_joins_relative_to_base_path() {
        let upstream = Upstream::new("http://cms.local:3001/base", Duration::from_secs(1)).unwrap();
        assert_eq!(
            upstream.url("/api/games").unwrap().as_str(),
            "http://cms.local:3001/base/api/games"
        );
        let bare = Upstream::new("http://cms.local:3001", Duration::from_secs(1)).unwrap();
        assert_eq!(
            bare.url("api/games").unwrap().as_str(),
            "http://cms.local:3001/api/games"
        );
    }

    #[test]
    fn test_status_mapping() {
        let conflict = Error::FailedWithBody {
            status: reqwest::StatusCode::CONFLICT,
            body: "duplicate".to_string(),
        };
        assert_eq!(
            LobbyError::from(conflict),
            LobbyError::Conflict("duplicate".to_string())
        );
        let outage = Error::FailedWithBody {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        assert!(LobbyError::from(outage).is_unavailable());
    }
}
