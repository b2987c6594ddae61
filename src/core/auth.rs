//! Auth - Verifica del bearer token e identità del chiamante
//!
//! L'emissione dei token è responsabilità di un collaboratore esterno:
//! qui i claims (id, nome, ruolo) vengono solo verificati e resi
//! disponibili agli handler tramite Extension.

use crate::core::{AppError, AppState};
use crate::entities::UserRole;
use axum::{body::Body, extract::Request, extract::State, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

// struct che codifica il contenuto del token jwt
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize,
    pub iat: usize,
    pub id: i64,
    pub name: String,
    pub role: UserRole,
}

/// Identità autenticata del chiamante, derivata dai claims del token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub name: String,
    pub role: UserRole,
}

#[instrument(skip(secret), fields(id = %id))]
pub fn encode_jwt(
    id: i64,
    name: String,
    role: UserRole,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expire = Duration::hours(24);
    let claims = Claims {
        exp: (now + expire).timestamp() as usize,
        iat: now.timestamp() as usize,
        id,
        name,
        role,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(
    jwt_token: &str,
    secret: &str,
) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    decode(
        jwt_token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let auth_header = match req.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::forbidden("Invalid authorization header")
        })?,
        None => {
            warn!("Missing authorization header");
            return Err(AppError::forbidden(
                "Please add the bearer token to the header",
            ));
        }
    };

    let token = match auth_header.strip_prefix("Bearer ") {
        Some(token) => token,
        None => {
            warn!("Authorization header without bearer scheme");
            return Err(AppError::forbidden("Expected a bearer token"));
        }
    };

    let token_data = match decode_jwt(token, &state.jwt_secret) {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to decode JWT token: {:?}", e);
            return Err(AppError::unauthorized("Unable to decode token"));
        }
    };

    let current_user = AuthUser {
        user_id: token_data.claims.id,
        name: token_data.claims.name,
        role: token_data.claims.role,
    };
    debug!(user_id = current_user.user_id, "User authenticated");

    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}
