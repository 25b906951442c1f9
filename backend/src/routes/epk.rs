use axum::extract::State;
use diesel::{pg::PgConnection, prelude::*, result::DatabaseErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::domain::epk::{
    normalize_genres, slugify, validate_email, validate_links, EpkValidationError,
};
use crate::extract::{Json, Path};
use crate::models::{EpkProfile, NewEpkProfile};
use crate::schema::epk_profiles;
use crate::state::AppState;
use crate::utils::time::{now_naive, to_iso};
use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
};

#[derive(Deserialize)]
pub struct UpsertEpkRequest {
    pub artist_name: String,
    pub slug: Option<String>,
    pub tagline: Option<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub location: Option<String>,
    pub contact_email: Option<String>,
    #[serde(default)]
    pub links: Map<String, Value>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Serialize)]
pub struct EpkResponse {
    pub id: Uuid,
    pub slug: String,
    pub artist_name: String,
    pub tagline: Option<String>,
    pub bio: String,
    pub genres: Value,
    pub location: Option<String>,
    pub contact_email: Option<String>,
    pub links: Value,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub async fn get_own_epk(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<EpkResponse>> {
    let mut conn = state.db()?;
    let profile = find_profile(&mut conn, user.user_id)?.ok_or_else(AppError::not_found)?;
    Ok(Json(to_epk_response(profile)))
}

pub async fn upsert_epk(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<UpsertEpkRequest>,
) -> AppResult<Json<EpkResponse>> {
    let artist_name = payload.artist_name.trim().to_string();
    if artist_name.is_empty() {
        return Err(EpkValidationError::EmptyArtistName.into());
    }
    let slug = match payload.slug.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(requested) => slugify(requested)?,
        None => slugify(&artist_name)?,
    };
    let contact_email = optional_text(payload.contact_email.as_deref())
        .map(validate_email)
        .transpose()?;
    let genres = normalize_genres(&payload.genres)?;
    let links = validate_links(&payload.links)?;

    let profile = NewEpkProfile {
        id: Uuid::new_v4(),
        owner_id: user.user_id,
        slug,
        artist_name,
        tagline: optional_text(payload.tagline.as_deref()).map(str::to_string),
        bio: payload.bio.trim().to_string(),
        genres: Value::from(genres),
        location: optional_text(payload.location.as_deref()).map(str::to_string),
        contact_email,
        links: Value::Object(links),
        is_published: payload.is_published,
    };

    let mut conn = state.db()?;

    let result = diesel::insert_into(epk_profiles::table)
        .values(&profile)
        .on_conflict(epk_profiles::owner_id)
        .do_update()
        .set((
            epk_profiles::slug.eq(&profile.slug),
            epk_profiles::artist_name.eq(&profile.artist_name),
            epk_profiles::tagline.eq(&profile.tagline),
            epk_profiles::bio.eq(&profile.bio),
            epk_profiles::genres.eq(&profile.genres),
            epk_profiles::location.eq(&profile.location),
            epk_profiles::contact_email.eq(&profile.contact_email),
            epk_profiles::links.eq(&profile.links),
            epk_profiles::is_published.eq(profile.is_published),
            epk_profiles::updated_at.eq(now_naive()),
        ))
        .execute(&mut conn);

    match result {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(AppError::conflict("that EPK slug is already taken"));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let saved = find_profile(&mut conn, user.user_id)?.ok_or_else(AppError::not_found)?;
    info!(slug = %saved.slug, published = saved.is_published, "saved epk");
    Ok(Json(to_epk_response(saved)))
}

pub async fn get_public_epk(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<EpkResponse>> {
    let mut conn = state.db()?;
    let profile: EpkProfile = epk_profiles::table
        .filter(epk_profiles::slug.eq(slug.trim().to_ascii_lowercase()))
        .filter(epk_profiles::is_published.eq(true))
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    Ok(Json(to_epk_response(profile)))
}

fn find_profile(conn: &mut PgConnection, owner_id: Uuid) -> QueryResult<Option<EpkProfile>> {
    epk_profiles::table
        .filter(epk_profiles::owner_id.eq(owner_id))
        .first(conn)
        .optional()
}

fn optional_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn to_epk_response(profile: EpkProfile) -> EpkResponse {
    EpkResponse {
        id: profile.id,
        slug: profile.slug,
        artist_name: profile.artist_name,
        tagline: profile.tagline,
        bio: profile.bio,
        genres: profile.genres,
        location: profile.location,
        contact_email: profile.contact_email,
        links: profile.links,
        is_published: profile.is_published,
        created_at: to_iso(profile.created_at),
        updated_at: to_iso(profile.updated_at),
    }
}
