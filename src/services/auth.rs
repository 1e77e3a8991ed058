use reqwest::Method;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::models::{Ack, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::session::SessionManager;

const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
const REGISTER_FAILED: &str = "Registration failed";
const LOGOUT_FAILED: &str = "Logout request failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    /// Whether the backend acknowledged the logout.
    pub notified: bool,
    pub message: String,
}

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    session: SessionManager,
}

impl AuthService {
    pub fn new(api: ApiClient, session: SessionManager) -> Self {
        Self { api, session }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        require_fields(username, password)?;

        let response: Option<LoginResponse> = self
            .api
            .post_json("/login", &LoginRequest { username, password }, LOGIN_FAILED)
            .await?;

        let token = response
            .and_then(|r| r.access_token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::malformed("Invalid response from server"))?;

        self.session.login(&token)?;
        info!(username, "logged in");
        Ok(token)
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<RegisterResponse> {
        require_fields(username, password)?;

        let body = RegisterRequest {
            username,
            password,
            role: role.unwrap_or_default(),
        };
        let response: Option<RegisterResponse> = self
            .api
            .post_json("/register", &body, REGISTER_FAILED)
            .await?;

        info!(username, "registered");
        Ok(response.unwrap_or_default())
    }

    /// Signs out locally first, then tells the backend. The backend call is
    /// best effort; its failure is reported but never undoes the local logout.
    pub async fn logout(&self) -> LogoutOutcome {
        let token = self.session.token();

        if let Err(e) = self.session.logout() {
            warn!(error = %e, "could not clear stored credential");
        }

        let mut request = self.api.request(Method::POST, "/logout");
        if let Some(token) = &token {
            request = request.query(&[("token", token.as_str())]);
        }

        let result = match self.api.send(request, LOGOUT_FAILED).await {
            Ok(response) => crate::http::read_json::<Ack>(response).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(ack) => LogoutOutcome {
                notified: true,
                message: ack
                    .and_then(|a| a.msg)
                    .unwrap_or_else(|| "Logout successful".to_string()),
            },
            Err(e) => {
                warn!(error = %e, "logout API call failed");
                LogoutOutcome {
                    notified: false,
                    message: "Logged out (but server request failed)".to_string(),
                }
            }
        }
    }
}

fn require_fields(username: &str, password: &str) -> Result<()> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(Error::validation("Username and password are required"));
    }
    Ok(())
}
