use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDateTime;
use diesel::{dsl::max, pg::PgConnection, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::domain::notes::{
    next_sort_order, normalize_note_title, normalize_tags, plan_reorder, NoteCategory,
};
use crate::extract::{Json, Path, Query};
use crate::models::{CreativeNote, NewCreativeNote};
use crate::schema::creative_notes;
use crate::state::AppState;
use crate::utils::json::{classify_nullable, NullableValue};
use crate::utils::time::{now_naive, to_iso};
use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
};

#[derive(AsChangeset)]
#[diesel(table_name = creative_notes)]
struct UpdateNoteChangeset<'a> {
    title: Option<&'a str>,
    content: Option<&'a str>,
    category: Option<Option<&'a str>>,
    tags: Option<Value>,
    is_pinned: Option<bool>,
    updated_at: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct NoteListQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub pinned: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
}

#[derive(Deserialize)]
pub struct ReorderNotesRequest {
    pub ordered_ids: Vec<Uuid>,
}

#[derive(Serialize)]
pub struct NoteResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub sort_order: i32,
    pub created_at: String,
    pub updated_at: String,
}

pub async fn list_notes(
    State(state): State<AppState>,
    Query(params): Query<NoteListQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<NoteResponse>>> {
    let mut conn = state.db()?;

    let mut query = creative_notes::table
        .filter(creative_notes::owner_id.eq(user.user_id))
        .into_boxed();
    if let Some(category) = params.category.as_deref().filter(|c| !c.trim().is_empty()) {
        let category: NoteCategory = category.parse()?;
        query = query.filter(creative_notes::category.eq(category.as_str()));
    }
    if let Some(pinned) = params.pinned {
        query = query.filter(creative_notes::is_pinned.eq(pinned));
    }

    let rows: Vec<CreativeNote> = query
        .order((
            creative_notes::is_pinned.desc(),
            creative_notes::sort_order.asc(),
            creative_notes::created_at.desc(),
        ))
        .load(&mut conn)?;

    let tag = params
        .tag
        .as_deref()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty());

    let notes = rows
        .into_iter()
        .map(to_note_response)
        .filter(|note| tag.as_ref().map_or(true, |tag| note.tags.contains(tag)))
        .collect();

    Ok(Json(notes))
}

pub async fn create_note(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateNoteRequest>,
) -> AppResult<(StatusCode, Json<NoteResponse>)> {
    let title = normalize_note_title(&payload.title)?;
    let tags = normalize_tags(&payload.tags)?;
    let category = payload
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(str::parse::<NoteCategory>)
        .transpose()?;

    let mut conn = state.db()?;

    let note = conn.transaction::<CreativeNote, AppError, _>(|conn| {
        let current_max: Option<i32> = creative_notes::table
            .filter(creative_notes::owner_id.eq(user.user_id))
            .select(max(creative_notes::sort_order))
            .first(conn)?;

        let new_note = NewCreativeNote {
            id: Uuid::new_v4(),
            owner_id: user.user_id,
            title,
            content: payload.content,
            category: category.map(|c| c.as_str().to_string()),
            tags: Value::from(tags),
            is_pinned: payload.is_pinned,
            sort_order: next_sort_order(current_max),
        };
        diesel::insert_into(creative_notes::table)
            .values(&new_note)
            .execute(conn)?;

        Ok(creative_notes::table.find(new_note.id).first(conn)?)
    })?;

    Ok((StatusCode::CREATED, Json(to_note_response(note))))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> AppResult<Json<NoteResponse>> {
    let mut conn = state.db()?;
    let existing = find_owned_note(&mut conn, user.user_id, note_id)?;

    let title = match classify_nullable(body.get("title")).map_err(AppError::bad_request)? {
        NullableValue::Omitted => None,
        NullableValue::Null => return Err(AppError::bad_request("title cannot be null")),
        NullableValue::String(value) => Some(normalize_note_title(&value)?),
    };
    let content = match classify_nullable(body.get("content")).map_err(AppError::bad_request)? {
        NullableValue::Omitted => None,
        NullableValue::Null => Some(String::new()),
        NullableValue::String(value) => Some(value),
    };
    let category = match classify_nullable(body.get("category")).map_err(AppError::bad_request)? {
        NullableValue::Omitted => None,
        NullableValue::Null => Some(None),
        NullableValue::String(value) if value.trim().is_empty() => Some(None),
        NullableValue::String(value) => Some(Some(value.parse::<NoteCategory>()?.as_str())),
    };
    let tags = match body.get("tags") {
        None => None,
        Some(Value::Null) => Some(Vec::new()),
        Some(value) => {
            let raw: Vec<String> = serde_json::from_value(value.clone())
                .map_err(|_| AppError::bad_request("tags must be an array of strings"))?;
            Some(normalize_tags(&raw)?)
        }
    };
    let is_pinned = match body.get("is_pinned") {
        None => None,
        Some(Value::Bool(pinned)) => Some(*pinned),
        Some(_) => return Err(AppError::bad_request("is_pinned must be a boolean")),
    };

    if title.is_none()
        && content.is_none()
        && category.is_none()
        && tags.is_none()
        && is_pinned.is_none()
    {
        return Ok(Json(to_note_response(existing)));
    }

    let changeset = UpdateNoteChangeset {
        title: title.as_deref(),
        content: content.as_deref(),
        category,
        tags: tags.map(Value::from),
        is_pinned,
        updated_at: now_naive(),
    };
    diesel::update(creative_notes::table.find(note_id))
        .set(&changeset)
        .execute(&mut conn)?;

    let updated: CreativeNote = creative_notes::table.find(note_id).first(&mut conn)?;
    Ok(Json(to_note_response(updated)))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;
    find_owned_note(&mut conn, user.user_id, note_id)?;
    diesel::delete(creative_notes::table.find(note_id)).execute(&mut conn)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_notes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ReorderNotesRequest>,
) -> AppResult<Json<Vec<NoteResponse>>> {
    let mut conn = state.db()?;

    let ordered = conn.transaction::<Vec<CreativeNote>, AppError, _>(|conn| {
        let existing: Vec<(Uuid, i32)> = creative_notes::table
            .filter(creative_notes::owner_id.eq(user.user_id))
            .order((
                creative_notes::sort_order.asc(),
                creative_notes::created_at.desc(),
            ))
            .select((creative_notes::id, creative_notes::sort_order))
            .load(conn)?;

        let updates = plan_reorder(&existing, &payload.ordered_ids)?;
        let now = now_naive();
        for (id, position) in &updates {
            diesel::update(creative_notes::table.find(*id))
                .set((
                    creative_notes::sort_order.eq(*position),
                    creative_notes::updated_at.eq(now),
                ))
                .execute(conn)?;
        }

        info!(
            reordered = payload.ordered_ids.len(),
            changed = updates.len(),
            "reordered notes"
        );

        Ok(creative_notes::table
            .filter(creative_notes::owner_id.eq(user.user_id))
            .order((
                creative_notes::sort_order.asc(),
                creative_notes::created_at.desc(),
            ))
            .load(conn)?)
    })?;

    Ok(Json(ordered.into_iter().map(to_note_response).collect()))
}

fn find_owned_note(
    conn: &mut PgConnection,
    owner_id: Uuid,
    note_id: Uuid,
) -> AppResult<CreativeNote> {
    creative_notes::table
        .find(note_id)
        .filter(creative_notes::owner_id.eq(owner_id))
        .first(conn)
        .optional()?
        .ok_or_else(AppError::not_found)
}

fn to_note_response(note: CreativeNote) -> NoteResponse {
    let tags = note
        .tags
        .as_array()
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    NoteResponse {
        id: note.id,
        title: note.title,
        content: note.content,
        category: note.category,
        tags,
        is_pinned: note.is_pinned,
        sort_order: note.sort_order,
        created_at: to_iso(note.created_at),
        updated_at: to_iso(note.updated_at),
    }
}
