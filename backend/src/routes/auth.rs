use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
};
use axum_extra::{headers::Cookie, typed_header::TypedHeader};
use chrono::{DateTime, Duration, Utc};
use diesel::{pg::PgConnection, prelude::*};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::extract::Json;
use crate::{
    auth::{jwt::TokenSubject, password, AuthenticatedUser},
    error::{AppError, AppResult},
    models::{NewRefreshToken, RefreshToken, User},
    schema::{refresh_tokens, users},
    state::AppState,
};

const REFRESH_COOKIE_NAME: &str = "refresh_token";
const CLEARED_COOKIE_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
    pub box_id: String,
    pub display_name: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<SessionResponse>)> {
    let mut conn = state.db()?;

    let user: User = users::table
        .filter(users::username.eq(payload.username.trim()))
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::unauthorized)?;

    let valid = password::verify_password(&payload.password, &user.password_hash)
        .map_err(|_| AppError::unauthorized())?;
    if !valid {
        warn!(username = %user.username, "rejected login");
        return Err(AppError::unauthorized());
    }

    let session = start_session(&state, &mut conn, &user)?;
    info!(user_id = %user.id, "signed in");
    Ok(session)
}

/// Trades a live refresh cookie for a new access token and a rotated cookie.
pub async fn refresh(
    State(state): State<AppState>,
    jar: Option<TypedHeader<Cookie>>,
) -> AppResult<(HeaderMap, Json<SessionResponse>)> {
    let presented = jar
        .as_ref()
        .and_then(|TypedHeader(cookies)| cookies.get(REFRESH_COOKIE_NAME))
        .ok_or_else(AppError::unauthorized)?;
    let token_hash = hash_refresh_token(presented);

    let mut conn = state.db()?;

    conn.transaction::<_, AppError, _>(|conn| {
        let now = Utc::now().naive_utc();
        let stored: RefreshToken = refresh_tokens::table
            .filter(refresh_tokens::token_hash.eq(&token_hash))
            .filter(refresh_tokens::revoked_at.is_null())
            .filter(refresh_tokens::expires_at.gt(now))
            .first(conn)
            .optional()?
            .ok_or_else(AppError::unauthorized)?;

        revoke_sessions(conn, stored.user_id, Some(&token_hash))?;

        let user: User = users::table.find(stored.user_id).first(conn)?;
        start_session(&state, conn, &user)
    })
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    jar: Option<TypedHeader<Cookie>>,
) -> AppResult<(HeaderMap, StatusCode)> {
    let presented = jar
        .as_ref()
        .and_then(|TypedHeader(cookies)| cookies.get(REFRESH_COOKIE_NAME))
        .map(hash_refresh_token);

    let mut conn = state.db()?;
    // Without a matching cookie every session of the user ends.
    let revoked = match presented.as_deref() {
        Some(token_hash) => revoke_sessions(&mut conn, user.user_id, Some(token_hash))?,
        None => 0,
    };
    if revoked == 0 {
        revoke_sessions(&mut conn, user.user_id, None)?;
    }
    info!(user_id = %user.user_id, "signed out");

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, refresh_cookie(&state, None)?);
    Ok((headers, StatusCode::NO_CONTENT))
}

pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<MeResponse>> {
    let mut conn = state.db()?;
    let record: User = users::table.find(user.user_id).first(&mut conn)?;

    Ok(Json(MeResponse {
        user_id: record.id,
        username: record.username,
        role: record.role,
        box_id: record.box_id,
        display_name: record.display_name,
    }))
}

fn start_session(
    state: &AppState,
    conn: &mut PgConnection,
    user: &User,
) -> AppResult<(HeaderMap, Json<SessionResponse>)> {
    let access_token = state.jwt.generate_token(TokenSubject {
        user_id: user.id,
        username: &user.username,
        role: &user.role,
        box_id: &user.box_id,
    })?;

    let now = Utc::now();
    let refresh_value = generate_refresh_token();
    let expires_at = now + Duration::days(state.config.refresh_token_expiry_days);

    diesel::insert_into(refresh_tokens::table)
        .values(&NewRefreshToken {
            id: Uuid::new_v4(),
            user_id: user.id,
            token_hash: hash_refresh_token(&refresh_value),
            issued_at: now.naive_utc(),
            expires_at: expires_at.naive_utc(),
        })
        .execute(conn)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        refresh_cookie(state, Some((&refresh_value, expires_at)))?,
    );

    Ok((
        headers,
        Json(SessionResponse {
            access_token,
            token_type: "Bearer",
            expires_in: state.config.jwt_expiry_minutes * 60,
        }),
    ))
}

/// Ends live sessions of `user_id`: the one behind `token_hash`, or all of them.
fn revoke_sessions(
    conn: &mut PgConnection,
    user_id: Uuid,
    token_hash: Option<&str>,
) -> QueryResult<usize> {
    let now = Utc::now().naive_utc();
    let live = refresh_tokens::table
        .filter(refresh_tokens::user_id.eq(user_id))
        .filter(refresh_tokens::revoked_at.is_null());
    let changes = (
        refresh_tokens::revoked_at.eq(now),
        refresh_tokens::updated_at.eq(now),
    );

    match token_hash {
        Some(token_hash) => diesel::update(live.filter(refresh_tokens::token_hash.eq(token_hash)))
            .set(changes)
            .execute(conn),
        None => diesel::update(live).set(changes).execute(conn),
    }
}

fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// `Set-Cookie` value for a new refresh token, or one that clears it.
fn refresh_cookie(
    state: &AppState,
    token: Option<(&str, DateTime<Utc>)>,
) -> AppResult<HeaderValue> {
    let mut parts = match token {
        Some((value, expires_at)) => vec![
            format!("{REFRESH_COOKIE_NAME}={value}"),
            format!(
                "Max-Age={}",
                Duration::days(state.config.refresh_token_expiry_days).num_seconds()
            ),
            format!("Expires={}", expires_at.to_rfc2822()),
        ],
        None => vec![
            format!("{REFRESH_COOKIE_NAME}="),
            "Max-Age=0".to_string(),
            format!("Expires={CLEARED_COOKIE_EXPIRES}"),
        ],
    };
    parts.extend(["Path=/", "HttpOnly", "SameSite=Strict"].map(String::from));
    if state.config.refresh_cookie_secure {
        parts.push("Secure".to_string());
    }
    if let Some(domain) = &state.config.refresh_cookie_domain {
        parts.push(format!("Domain={domain}"));
    }

    HeaderValue::from_str(&parts.join("; "))
        .map_err(|err| AppError::internal(format!("invalid refresh cookie: {err}")))
}
