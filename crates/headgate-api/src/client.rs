// Backend HTTP client
//
// Wraps `reqwest::Client` with base-URL construction and response
// decoding. Endpoint groups (auth, devices) are implemented as inherent
// methods via separate files to keep this module focused on transport
// mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Error body shape the backend uses for rejections: `{"message": "..."}`.
/// Some deployments return a bare string instead, so both are handled.
#[derive(serde::Deserialize)]
struct BackendError {
    message: Option<String>,
}

/// Raw HTTP client for the irrigation backend.
///
/// The backend has no session tokens or cookies. Identity travels in
/// each request (user name in the path or body), so the client itself
/// is freely cloneable and shareable.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `https://backend.example.com/api`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The underlying HTTP client (for auth flows that need direct access).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build a full URL for an endpoint path: `{base}/{path}`.
    ///
    /// The backend mixes PascalCase and kebab-case route names, so paths
    /// are passed through verbatim.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/{path}");
        Url::parse(&full).map_err(Error::InvalidUrl)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON response.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;

        self.parse_json(resp).await
    }

    /// Send a POST request, checking status but discarding the response
    /// body. Used for the write endpoints, whose success payloads carry
    /// nothing the client needs.
    pub(crate) async fn post_ok(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<(), Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "request rejected: unknown or unauthorized account".into(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| preview(&body).to_owned()),
            });
        }
        Ok(())
    }

    /// Decode a JSON response, mapping non-success statuses to errors.
    async fn parse_json<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "request rejected: unknown or unauthorized account".into(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| preview(&body).to_owned()),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })
    }
}

/// Extract the `message` field from a backend error body, falling back
/// to the raw body when it is a bare non-empty string.
pub(crate) fn error_message(body: &str) -> Option<String> {
    if let Ok(err) = serde_json::from_str::<BackendError>(body) {
        if let Some(message) = err.message {
            return Some(message);
        }
    }
    if let Ok(serde_json::Value::String(s)) = serde_json::from_str(body) {
        return Some(s);
    }
    None
}

/// Clamp a body to a loggable preview without splitting a UTF-8 char.
pub(crate) fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn error_message_reads_message_field() {
        assert_eq!(
            error_message(r#"{"message": "User already exists"}"#).as_deref(),
            Some("User already exists")
        );
    }

    #[test]
    fn error_message_accepts_bare_string_body() {
        assert_eq!(
            error_message(r#""Something went wrong""#).as_deref(),
            Some("Something went wrong")
        );
    }

    #[test]
    fn error_message_rejects_other_shapes() {
        assert!(error_message("<html>502</html>").is_none());
        assert!(error_message(r#"{"error": "nope"}"#).is_none());
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        let p = preview(&body);
        assert!(p.len() <= 200);
        assert!(body.starts_with(p));
    }
}
