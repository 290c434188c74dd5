//! Security middleware: actor resolution and anti-forgery action tokens.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::AppState;
use crate::models::Actor;

/// Header carrying the anti-forgery token on mutating requests.
pub const ACTION_TOKEN_HEADER: &str = "x-action-token";

/// Fixed action names that tokens are bound to. A token issued for one
/// action never validates another.
pub mod actions {
    pub const MANAGE_LISTS: &str = "manage-lists";
    pub const COMPANY_DETAILS: &str = "company-details";
    pub const IMPORT_COMPANIES: &str = "import-companies";

    pub const ALL: &[&str] = &[MANAGE_LISTS, COMPANY_DETAILS, IMPORT_COMPANIES];
}

/// Security configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Require a Bearer token resolving to a stored actor
    /// (from COMPANY_DIRECTORY_REQUIRE_AUTH). When off, every request
    /// runs as the implicit local admin.
    pub require_auth: bool,
    /// Secret that action tokens are derived from
    /// (from COMPANY_DIRECTORY_FORGERY_SECRET; random per process when
    /// unset, so tokens expire with the server session).
    pub forgery_secret: String,
}

impl SecurityConfig {
    /// Load security configuration from environment variables.
    pub fn from_env() -> Self {
        let require_auth = std::env::var("COMPANY_DIRECTORY_REQUIRE_AUTH")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let forgery_secret = std::env::var("COMPANY_DIRECTORY_FORGERY_SECRET")
            .unwrap_or_else(|_| Uuid::new_v4().to_string());

        Self {
            require_auth,
            forgery_secret,
        }
    }

    /// Create a config with no authentication (for local development/testing).
    pub fn disabled() -> Self {
        Self {
            require_auth: false,
            forgery_secret: Uuid::new_v4().to_string(),
        }
    }

    /// Create a config with actor authentication enabled (for testing).
    pub fn with_auth(secret: impl Into<String>) -> Self {
        Self {
            require_auth: true,
            forgery_secret: secret.into(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Resolve the calling actor and stash it in request extensions.
///
/// With auth disabled every request is the local admin. Otherwise the
/// Bearer token must resolve to a stored actor; anything else is 401.
pub async fn resolve_actor(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let actor = if !state.security.require_auth {
        Actor::local_admin()
    } else {
        let auth_header = request
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(header) if header.starts_with("Bearer ") => {
                let token = &header[7..];
                match state.db.find_actor_by_token(token) {
                    Ok(Some(actor)) => actor,
                    Ok(None) => {
                        tracing::warn!("Unknown bearer token");
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Err(e) => {
                        tracing::error!("Actor lookup failed: {e:#}");
                        return Err(StatusCode::INTERNAL_SERVER_ERROR);
                    }
                }
            }
            Some(_) => {
                tracing::warn!("Invalid Authorization header format");
                return Err(StatusCode::UNAUTHORIZED);
            }
            None => {
                tracing::warn!("Missing Authorization header");
                return Err(StatusCode::UNAUTHORIZED);
            }
        }
    };

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Derive the anti-forgery token for an actor and action name.
pub fn issue_action_token(secret: &str, actor: &Actor, action: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b"\0");
    hasher.update(actor.id.to_le_bytes());
    hasher.update(b"\0");
    hasher.update(action.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a presented token against the expected one for this actor/action.
pub fn verify_action_token(secret: &str, actor: &Actor, action: &str, presented: &str) -> bool {
    !presented.is_empty() && issue_action_token(secret, actor, action) == presented
}
