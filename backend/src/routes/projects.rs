use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use diesel::{pg::PgConnection, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::domain::collaboration::{
    CollaborationRole, CollaborationStatus, Permission, ProjectAccess,
};
use crate::domain::moves::{plan_move, DropTarget, MoveError, MovePlan};
use crate::domain::projects::{
    normalize_metadata, normalize_title, title_search_pattern, ProjectStatus, ProjectType,
};
use crate::extract::{Json, Path, Query};
use crate::models::{Collaboration, NewProject, Project};
use crate::schema::{collaborations, projects};
use crate::state::AppState;
use crate::utils::time::{now_naive, to_iso};
use crate::workspace::{ensure_current_year_folder, find_owned_folder};
use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
};

use super::collaborations::resolve_project_access;

#[derive(Deserialize)]
pub struct ProjectListQuery {
    pub folder_id: Option<Uuid>,
    pub status: Option<String>,
    pub query: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    pub project_type: String,
    pub status: Option<String>,
    pub metadata: Option<Value>,
    pub folder_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateProjectRequest {
    pub title: String,
    pub project_type: String,
    pub status: String,
    pub metadata: Option<Value>,
}

#[derive(Deserialize)]
pub struct DeleteProjectQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Deserialize)]
pub struct MoveProjectRequest {
    pub folder_id: Option<Uuid>,
    pub target: Option<DropTarget>,
    pub expected_folder_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct BulkMoveRequest {
    pub project_ids: Vec<Uuid>,
    pub folder_id: Uuid,
}

#[derive(Serialize, Clone)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub folder_id: Uuid,
    pub title: String,
    pub project_type: String,
    pub status: String,
    pub metadata: Value,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct ProjectDetailResponse {
    pub project: ProjectResponse,
    pub access: &'static str,
}

#[derive(Serialize)]
pub struct SharedProjectResponse {
    #[serde(flatten)]
    pub project: ProjectResponse,
    pub role: CollaborationRole,
}

#[derive(Serialize)]
pub struct MoveProjectResponse {
    pub project: ProjectResponse,
    pub moved: bool,
    pub from_folder_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct BulkMoveResponse {
    pub updated: usize,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Query(params): Query<ProjectListQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ProjectResponse>>> {
    let mut conn = state.db()?;

    let mut query = projects::table
        .filter(projects::owner_id.eq(user.user_id))
        .into_boxed();

    if let Some(folder_id) = params.folder_id {
        query = query.filter(projects::folder_id.eq(folder_id));
    }
    if let Some(status) = params.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let status: ProjectStatus = status.parse()?;
        query = query.filter(projects::status.eq(status.as_str()));
    }
    if let Some(pattern) = params.query.as_deref().and_then(title_search_pattern) {
        query = query.filter(projects::title.ilike(pattern));
    }

    let rows: Vec<Project> = query
        .order((projects::updated_at.desc(), projects::id.asc()))
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(to_project_response).collect()))
}

/// Projects other owners have shared with the caller through accepted invitations.
pub async fn list_shared_projects(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<SharedProjectResponse>>> {
    let mut conn = state.db()?;

    let accepted: Vec<Collaboration> = collaborations::table
        .filter(collaborations::collaborator_id.eq(user.user_id))
        .filter(collaborations::status.eq(CollaborationStatus::Accepted.as_str()))
        .load(&mut conn)?;
    if accepted.is_empty() {
        return Ok(Json(vec![]));
    }

    let whole_owners: Vec<Uuid> = accepted
        .iter()
        .filter(|c| c.project_id.is_none())
        .map(|c| c.owner_id)
        .collect();
    let single_projects: Vec<Uuid> = accepted.iter().filter_map(|c| c.project_id).collect();

    let rows: Vec<Project> = projects::table
        .filter(
            projects::id
                .eq_any(&single_projects)
                .or(projects::owner_id.eq_any(&whole_owners)),
        )
        .order((projects::updated_at.desc(), projects::id.asc()))
        .load(&mut conn)?;

    let mut response = Vec::with_capacity(rows.len());
    for project in rows {
        let roles = accepted
            .iter()
            .filter(|c| c.owner_id == project.owner_id)
            .filter(|c| c.project_id.map_or(true, |id| id == project.id))
            .filter_map(|c| c.role.parse::<CollaborationRole>().ok());
        if let Some(role) = roles.max() {
            response.push(SharedProjectResponse {
                project: to_project_response(project),
                role,
            });
        }
    }

    Ok(Json(response))
}

pub async fn create_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<ProjectResponse>)> {
    let title = normalize_title(&payload.title)?;
    let project_type: ProjectType = payload.project_type.trim().parse()?;
    let status = match payload.status.as_deref() {
        Some(status) => status.trim().parse()?,
        None => ProjectStatus::default(),
    };
    let metadata = normalize_metadata(payload.metadata)?;

    let mut conn = state.db()?;

    let folder_id = match payload.folder_id {
        Some(folder_id) => {
            find_owned_folder(&mut conn, user.user_id, folder_id)?
                .ok_or_else(|| AppError::bad_request("folder does not exist"))?
                .id
        }
        None => ensure_current_year_folder(&mut conn, user.user_id)?.id,
    };

    let new_project = NewProject {
        id: Uuid::new_v4(),
        owner_id: user.user_id,
        folder_id,
        title,
        project_type: project_type.as_str().to_string(),
        status: status.as_str().to_string(),
        metadata,
    };
    diesel::insert_into(projects::table)
        .values(&new_project)
        .execute(&mut conn)?;

    let project: Project = projects::table.find(new_project.id).first(&mut conn)?;
    info!(project_id = %project.id, folder_id = %project.folder_id, "created project");

    Ok((StatusCode::CREATED, Json(to_project_response(project))))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<ProjectDetailResponse>> {
    let mut conn = state.db()?;
    let (project, access) = load_accessible_project(&mut conn, user.user_id, project_id)?;

    Ok(Json(ProjectDetailResponse {
        project: to_project_response(project),
        access: access.label(),
    }))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateProjectRequest>,
) -> AppResult<Json<ProjectDetailResponse>> {
    let title = normalize_title(&payload.title)?;
    let project_type: ProjectType = payload.project_type.trim().parse()?;
    let status: ProjectStatus = payload.status.trim().parse()?;
    let metadata = normalize_metadata(payload.metadata)?;

    let mut conn = state.db()?;
    let (project, access) = load_accessible_project(&mut conn, user.user_id, project_id)?;

    if !access.allows(Permission::Edit) {
        return Err(AppError::forbidden("viewers cannot edit projects"));
    }
    let publishing_changed = (project.status == ProjectStatus::Published.as_str())
        != (status == ProjectStatus::Published);
    if publishing_changed && !access.allows(Permission::Publish) {
        return Err(AppError::forbidden(
            "only approvers can publish or unpublish projects",
        ));
    }

    diesel::update(projects::table.find(project_id))
        .set((
            projects::title.eq(&title),
            projects::project_type.eq(project_type.as_str()),
            projects::status.eq(status.as_str()),
            projects::metadata.eq(&metadata),
            projects::updated_at.eq(now_naive()),
        ))
        .execute(&mut conn)?;

    let project: Project = projects::table.find(project_id).first(&mut conn)?;
    Ok(Json(ProjectDetailResponse {
        project: to_project_response(project),
        access: access.label(),
    }))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(params): Query<DeleteProjectQuery>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    if !params.confirm {
        return Err(AppError::bad_request(
            "deleting a project requires confirm=true",
        ));
    }

    let mut conn = state.db()?;
    let (_, access) = load_accessible_project(&mut conn, user.user_id, project_id)?;
    if !access.is_owner() {
        return Err(AppError::forbidden("only the owner can delete a project"));
    }

    diesel::delete(projects::table.find(project_id)).execute(&mut conn)?;
    info!(project_id = %project_id, "deleted project");

    Ok(StatusCode::NO_CONTENT)
}

/// Handles a project being dropped somewhere in the desktop view.
pub async fn move_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<MoveProjectRequest>,
) -> AppResult<Json<MoveProjectResponse>> {
    let target = match (payload.folder_id, payload.target) {
        (Some(folder_id), None) => DropTarget::Folder(folder_id),
        (None, Some(target)) => target,
        _ => {
            return Err(AppError::bad_request(
                "exactly one of folder_id and target is required",
            ))
        }
    };

    let mut conn = state.db()?;

    let (project, from_folder_id) =
        conn.transaction::<(Project, Option<Uuid>), AppError, _>(|conn| {
            let (project, access) = load_accessible_project(conn, user.user_id, project_id)?;
            if !access.is_owner() {
                return Err(AppError::forbidden("only the owner can move a project"));
            }

            let (from, to) = match plan_move(project.folder_id, target, payload.expected_folder_id)?
            {
                MovePlan::Unchanged => return Ok((project, None)),
                MovePlan::Move { from, to } => (from, to),
            };

            find_owned_folder(conn, user.user_id, to)?
                .ok_or_else(|| AppError::bad_request("target folder does not exist"))?;

            let now = now_naive();
            let row = projects::table.filter(projects::id.eq(project_id));
            let updated = if payload.expected_folder_id.is_some() {
                diesel::update(row.filter(projects::folder_id.eq(from)))
                    .set((projects::folder_id.eq(to), projects::updated_at.eq(now)))
                    .execute(conn)?
            } else {
                diesel::update(row)
                    .set((projects::folder_id.eq(to), projects::updated_at.eq(now)))
                    .execute(conn)?
            };

            let project: Project = projects::table.find(project_id).first(conn)?;
            if updated == 0 {
                return Err(MoveError::StaleOrigin {
                    expected: from,
                    current: project.folder_id,
                }
                .into());
            }

            Ok((project, Some(from)))
        })?;

    if let Some(from) = from_folder_id {
        info!(
            project_id = %project_id,
            from_folder_id = %from,
            to_folder_id = %project.folder_id,
            "moved project"
        );
    }

    Ok(Json(MoveProjectResponse {
        project: to_project_response(project),
        moved: from_folder_id.is_some(),
        from_folder_id,
    }))
}

pub async fn bulk_move_projects(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<BulkMoveRequest>,
) -> AppResult<(StatusCode, Json<BulkMoveResponse>)> {
    let BulkMoveRequest {
        mut project_ids,
        folder_id,
    } = payload;

    if project_ids.is_empty() {
        return Err(AppError::bad_request("project_ids must not be empty"));
    }

    project_ids.sort();
    project_ids.dedup();

    let mut conn = state.db()?;

    let updated = conn.transaction::<usize, AppError, _>(|conn| {
        find_owned_folder(conn, user.user_id, folder_id)?
            .ok_or_else(|| AppError::bad_request("target folder does not exist"))?;

        let owned: i64 = projects::table
            .filter(projects::id.eq_any(&project_ids))
            .filter(projects::owner_id.eq(user.user_id))
            .count()
            .get_result(conn)?;
        if owned as usize != project_ids.len() {
            return Err(AppError::bad_request(
                "one or more projects do not exist or are inaccessible",
            ));
        }

        Ok(diesel::update(projects::table.filter(projects::id.eq_any(&project_ids)))
            .set((
                projects::folder_id.eq(folder_id),
                projects::updated_at.eq(now_naive()),
            ))
            .execute(conn)?)
    })?;

    info!(folder_id = %folder_id, updated, "bulk moved projects");

    Ok((StatusCode::OK, Json(BulkMoveResponse { updated })))
}

/// Loads a project the caller owns or collaborates on. Anything else is reported
/// as missing.
fn load_accessible_project(
    conn: &mut PgConnection,
    user_id: Uuid,
    project_id: Uuid,
) -> AppResult<(Project, ProjectAccess)> {
    let project: Project = projects::table
        .find(project_id)
        .first(conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    if project.owner_id == user_id {
        return Ok((project, ProjectAccess::Owner));
    }

    let access = resolve_project_access(conn, user_id, &project)?.ok_or_else(AppError::not_found)?;
    Ok((project, access))
}

pub(crate) fn to_project_response(project: Project) -> ProjectResponse {
    ProjectResponse {
        id: project.id,
        owner_id: project.owner_id,
        folder_id: project.folder_id,
        title: project.title,
        project_type: project.project_type,
        status: project.status,
        metadata: project.metadata,
        created_at: to_iso(project.created_at),
        updated_at: to_iso(project.updated_at),
    }
}
