use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use diesel::{dsl::exists, pg::PgConnection, prelude::*, QueryResult};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::domain::box_id;
use crate::domain::collaboration::{
    display_status, expiry_after_days, transition, CollaborationRole, CollaborationStatus,
    DisplayStatus, InvitationAction, ProjectAccess,
};
use crate::extract::{Json, Path, Query};
use crate::models::{Collaboration, NewCollaboration, Project, User};
use crate::schema::{collaborations, projects, users};
use crate::state::AppState;
use crate::utils::time::{now_naive, to_iso};
use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
};

use super::users::{to_user_summary, UserSummary};

#[derive(Deserialize)]
pub struct CreateCollaborationRequest {
    pub box_id: String,
    pub role: String,
    pub project_id: Option<Uuid>,
    pub message: Option<String>,
    pub expires_in_days: Option<i64>,
}

#[derive(Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Received,
    Sent,
}

#[derive(Deserialize)]
pub struct CollaborationListQuery {
    #[serde(default)]
    pub direction: Direction,
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct CollaborationResponse {
    pub id: Uuid,
    pub owner: UserSummary,
    pub collaborator: UserSummary,
    pub project_id: Option<Uuid>,
    pub project_title: Option<String>,
    pub role: String,
    pub status: String,
    pub display_status: DisplayStatus,
    pub message: Option<String>,
    pub expires_at: Option<String>,
    pub responded_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub async fn create_collaboration(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCollaborationRequest>,
) -> AppResult<(StatusCode, Json<CollaborationResponse>)> {
    let box_id = box_id::normalize(&payload.box_id)?;
    if box_id == user.box_id {
        return Err(AppError::bad_request("you cannot invite yourself"));
    }
    let role: CollaborationRole = payload.role.trim().parse()?;
    let now = now_naive();
    let expires_at = expiry_after_days(
        now,
        payload
            .expires_in_days
            .unwrap_or(state.config.invitation_expiry_days),
    )?;
    let message = payload
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    let mut conn = state.db()?;

    let created = conn.transaction::<Collaboration, AppError, _>(|conn| {
        let collaborator: User = users::table
            .filter(users::box_id.eq(&box_id))
            .first(conn)
            .optional()?
            .ok_or_else(AppError::not_found)?;
        if collaborator.id == user.user_id {
            return Err(AppError::bad_request("you cannot invite yourself"));
        }

        if let Some(project_id) = payload.project_id {
            let owned: bool = diesel::select(exists(
                projects::table
                    .filter(projects::id.eq(project_id))
                    .filter(projects::owner_id.eq(user.user_id)),
            ))
            .get_result(conn)?;
            if !owned {
                return Err(AppError::bad_request("project does not exist"));
            }
        }

        let duplicate = collaborations::table
            .filter(collaborations::owner_id.eq(user.user_id))
            .filter(collaborations::collaborator_id.eq(collaborator.id))
            .filter(collaborations::status.eq(CollaborationStatus::Pending.as_str()))
            .select(collaborations::project_id)
            .load::<Option<Uuid>>(conn)?
            .into_iter()
            .any(|project_id| project_id == payload.project_id);
        if duplicate {
            return Err(AppError::conflict(
                "a pending invitation already exists for this collaborator",
            ));
        }

        let new_collaboration = NewCollaboration {
            id: Uuid::new_v4(),
            owner_id: user.user_id,
            collaborator_id: collaborator.id,
            project_id: payload.project_id,
            role: role.as_str().to_string(),
            status: CollaborationStatus::Pending.as_str().to_string(),
            message,
            expires_at,
        };

        diesel::insert_into(collaborations::table)
            .values(&new_collaboration)
            .execute(conn)?;

        Ok(collaborations::table
            .find(new_collaboration.id)
            .first(conn)?)
    })?;

    info!(
        collaboration_id = %created.id,
        owner_id = %created.owner_id,
        collaborator_id = %created.collaborator_id,
        role = %created.role,
        "created collaboration invitation"
    );

    let mut responses = build_responses(&mut conn, vec![created])?;
    let response = responses
        .pop()
        .ok_or_else(|| AppError::internal("collaboration vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_collaborations(
    State(state): State<AppState>,
    Query(params): Query<CollaborationListQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<CollaborationResponse>>> {
    let mut conn = state.db()?;

    let mut query = collaborations::table.into_boxed();
    query = match params.direction {
        Direction::Sent => query.filter(collaborations::owner_id.eq(user.user_id)),
        Direction::Received => query.filter(collaborations::collaborator_id.eq(user.user_id)),
    };
    if let Some(status) = params.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let status: CollaborationStatus = status.parse()?;
        query = query.filter(collaborations::status.eq(status.as_str()));
    }

    let rows: Vec<Collaboration> = query
        .order((collaborations::created_at.desc(), collaborations::id.asc()))
        .load(&mut conn)?;

    Ok(Json(build_responses(&mut conn, rows)?))
}

pub async fn accept_collaboration(
    State(state): State<AppState>,
    Path(collaboration_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<CollaborationResponse>> {
    respond(state, collaboration_id, user, InvitationAction::Accept).await
}

pub async fn reject_collaboration(
    State(state): State<AppState>,
    Path(collaboration_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<CollaborationResponse>> {
    respond(state, collaboration_id, user, InvitationAction::Reject).await
}

async fn respond(
    state: AppState,
    collaboration_id: Uuid,
    user: AuthenticatedUser,
    action: InvitationAction,
) -> AppResult<Json<CollaborationResponse>> {
    let mut conn = state.db()?;

    let updated = conn.transaction::<Collaboration, AppError, _>(|conn| {
        let invitation: Collaboration = collaborations::table
            .find(collaboration_id)
            .first(conn)
            .optional()?
            .ok_or_else(AppError::not_found)?;

        if invitation.collaborator_id != user.user_id {
            return Err(AppError::forbidden(
                "only the invited collaborator can respond",
            ));
        }

        let current: CollaborationStatus = invitation.status.parse()?;
        let now = now_naive();
        let next = transition(current, action, invitation.expires_at, now)?;

        // Only flips a row that is still in `current`.
        let changed = diesel::update(
            collaborations::table
                .filter(collaborations::id.eq(collaboration_id))
                .filter(collaborations::status.eq(current.as_str())),
        )
        .set((
            collaborations::status.eq(next.as_str()),
            collaborations::responded_at.eq(Some(now)),
            collaborations::updated_at.eq(now),
        ))
        .execute(conn)?;

        let reloaded: Collaboration = collaborations::table.find(collaboration_id).first(conn)?;
        if changed == 0 {
            let stored: CollaborationStatus = reloaded.status.parse()?;
            return Err(AppError::conflict(format!(
                "invitation has already been {stored}"
            )));
        }
        Ok(reloaded)
    })?;

    info!(
        collaboration_id = %collaboration_id,
        status = %updated.status,
        "collaboration invitation answered"
    );

    let mut responses = build_responses(&mut conn, vec![updated])?;
    let response = responses.pop().ok_or_else(AppError::not_found)?;
    Ok(Json(response))
}

pub async fn delete_collaboration(
    State(state): State<AppState>,
    Path(collaboration_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.db()?;

    let invitation: Collaboration = collaborations::table
        .find(collaboration_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    if invitation.owner_id != user.user_id {
        return Err(AppError::forbidden("only the owner can revoke an invitation"));
    }

    diesel::delete(collaborations::table.find(collaboration_id)).execute(&mut conn)?;
    info!(collaboration_id = %collaboration_id, "revoked collaboration");

    Ok(StatusCode::NO_CONTENT)
}

/// The caller's strongest accepted role on `project`, if any. An invitation
/// without a project covers every project of its owner.
pub(crate) fn resolve_project_access(
    conn: &mut PgConnection,
    user_id: Uuid,
    project: &Project,
) -> QueryResult<Option<ProjectAccess>> {
    let roles: Vec<String> = collaborations::table
        .filter(collaborations::owner_id.eq(project.owner_id))
        .filter(collaborations::collaborator_id.eq(user_id))
        .filter(collaborations::status.eq(CollaborationStatus::Accepted.as_str()))
        .filter(
            collaborations::project_id
                .eq(project.id)
                .or(collaborations::project_id.is_null()),
        )
        .select(collaborations::role)
        .load(conn)?;

    Ok(ProjectAccess::from_roles(
        roles.iter().filter_map(|role| role.parse().ok()),
    ))
}

fn build_responses(
    conn: &mut PgConnection,
    rows: Vec<Collaboration>,
) -> AppResult<Vec<CollaborationResponse>> {
    let mut user_ids: Vec<Uuid> = rows
        .iter()
        .flat_map(|c| [c.owner_id, c.collaborator_id])
        .collect();
    user_ids.sort();
    user_ids.dedup();
    let project_ids: Vec<Uuid> = rows.iter().filter_map(|c| c.project_id).collect();

    let people: HashMap<Uuid, User> = users::table
        .filter(users::id.eq_any(&user_ids))
        .load::<User>(conn)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let titles: HashMap<Uuid, String> = projects::table
        .filter(projects::id.eq_any(&project_ids))
        .select((projects::id, projects::title))
        .load::<(Uuid, String)>(conn)?
        .into_iter()
        .collect();

    let now = now_naive();
    rows.into_iter()
        .map(|c| {
            let owner = people.get(&c.owner_id).ok_or_else(AppError::not_found)?;
            let collaborator = people
                .get(&c.collaborator_id)
                .ok_or_else(AppError::not_found)?;
            let status: CollaborationStatus = c.status.parse()?;

            Ok(CollaborationResponse {
                id: c.id,
                owner: to_user_summary(owner),
                collaborator: to_user_summary(collaborator),
                project_id: c.project_id,
                project_title: c.project_id.and_then(|id| titles.get(&id).cloned()),
                role: c.role,
                status: c.status,
                display_status: display_status(status, c.expires_at, now),
                message: c.message,
                expires_at: c.expires_at.map(to_iso),
                responded_at: c.responded_at.map(to_iso),
                created_at: to_iso(c.created_at),
                updated_at: to_iso(c.updated_at),
            })
        })
        .collect()
}
