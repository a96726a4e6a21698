// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use axum::{
    Json, RequestPartsExt,
    extract::{FromRef, FromRequestParts, State},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiJson, AppState};
use crate::commands::users;
use crate::config::Config;
use crate::error::{CostError, Result};
use crate::models::User;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Claims {
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret_key: String,
    pub access_token_expire_in_minute: i64,
}

impl From<&Config> for JwtConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            secret_key: cfg.jwt_secret.clone(),
            access_token_expire_in_minute: cfg.access_token_expire_in_minute,
        }
    }
}

#[tracing::instrument(name = "create_token", skip(cfg), err)]
pub fn create_token(cfg: &JwtConfig, user_id: i64) -> Result<String> {
    let now = Utc::now();
    let exp = now + Duration::minutes(cfg.access_token_expire_in_minute);
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };
    let key = EncodingKey::from_secret(cfg.secret_key.as_bytes());
    Ok(encode(&Header::new(Algorithm::HS256), &claims, &key)?)
}

#[tracing::instrument(name = "verify_token", skip(cfg, token), err)]
pub fn verify_token(cfg: &JwtConfig, token: &str) -> Result<Claims> {
    let key = DecodingKey::from_secret(cfg.secret_key.as_bytes());
    decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
        .map(|d| d.claims)
        .map_err(|e| CostError::Auth(format!("invalid or expired token: {e}")))
}

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
    JwtConfig: FromRef<S>,
{
    type Rejection = CostError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| CostError::Auth("missing bearer token".to_string()))?;
        let cfg = JwtConfig::from_ref(state);
        verify_token(&cfg, bearer.token())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginIn {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginOut {
    pub token: String,
    pub user: User,
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginIn>,
) -> Result<Json<LoginOut>> {
    let user = state
        .with_conn(move |c| users::authenticate(c, &body.email, &body.password))
        .await?;
    let token = create_token(&state.jwt, user.id)?;
    info!(user_id = user.id, "user logged in");
    Ok(Json(LoginOut { token, user }))
}

pub async fn profile(claims: Claims, State(state): State<AppState>) -> Result<Json<User>> {
    let user = state
        .with_conn(move |c| users::get_user(c, claims.sub))
        .await
        .map_err(|e| match e {
            // token for a user that no longer exists
            CostError::NotFound { .. } => CostError::Auth("unknown user".to_string()),
            other => other,
        })?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> JwtConfig {
        JwtConfig {
            secret_key: "test-secret".to_string(),
            access_token_expire_in_minute: 5,
        }
    }

    #[test]
    fn token_round_trips_subject() {
        let token = create_token(&cfg(), 17).unwrap();
        assert_eq!(verify_token(&cfg(), &token).unwrap().sub, 17);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = create_token(&cfg(), 17).unwrap();
        let other = JwtConfig {
            secret_key: "other".to_string(),
            ..cfg()
        };
        let err = verify_token(&other, &token).unwrap_err();
        assert!(matches!(err, CostError::Auth(_)));
    }
}
