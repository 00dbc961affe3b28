// Authentication endpoints
//
// The backend has no sessions or tokens. A successful login only
// proves the credentials; afterwards the user name itself is the
// identity every other endpoint takes.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::client::{ApiClient, error_message};
use crate::error::Error;
use crate::types::RegisterRequest;

impl ApiClient {
    /// Verify account credentials.
    ///
    /// `POST /Auth/Login` with `{userName, password}`. A rejected login
    /// (4xx) maps to [`Error::Authentication`] carrying the backend's
    /// message when one is present; 5xx maps to [`Error::Api`].
    pub async fn login(&self, user_name: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.endpoint_url("Auth/Login")?;

        debug!("logging in at {}", url);

        let body = json!({
            "userName": user_name,
            "password": password.expose_secret(),
        });

        let resp = self
            .http()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: error_message(&body)
                    .unwrap_or_else(|| format!("invalid credentials (HTTP {status})")),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body)
                    .unwrap_or_else(|| format!("login failed (HTTP {status})")),
            });
        }

        debug!("login successful");
        Ok(())
    }

    /// Create a new account bound to a first controller IMEI.
    ///
    /// `POST /Auth/Register`. The backend rejects duplicates and bad
    /// fields with a 4xx and a `{message}` body, surfaced as
    /// [`Error::Registration`]. Registration never logs the account in;
    /// callers go through [`ApiClient::login`] afterwards. The request
    /// is sent exactly once, so a transport error leaves the outcome
    /// unknown rather than retried.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), Error> {
        let url = self.endpoint_url("Auth/Register")?;

        debug!(user_name = %request.user_name, "registering account");

        let resp = self
            .http()
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Registration {
                status: status.as_u16(),
                message: error_message(&body)
                    .unwrap_or_else(|| format!("registration rejected (HTTP {status})")),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body)
                    .unwrap_or_else(|| format!("registration failed (HTTP {status})")),
            });
        }

        debug!("registration accepted");
        Ok(())
    }
}
