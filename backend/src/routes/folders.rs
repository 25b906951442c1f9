use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
};
use diesel::{dsl::count_star, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::domain::folders::{
    ensure_deletable, ensure_movable, ensure_renamable, normalize_folder_name,
    unique_sibling_name, FolderKind, FolderRuleError, FolderTree,
};
use crate::extract::{Json, Path};
use crate::models::{Folder, NewFolder, Project};
use crate::schema::{folders, projects};
use crate::state::AppState;
use crate::utils::time::{now_naive, to_iso};
use crate::workspace::{
    build_tree, ensure_current_year_folder, ensure_root_folder, find_owned_folder, kind_of,
    load_folders,
};
use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
};

use super::projects::{to_project_response, ProjectResponse};

#[derive(Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct EnsureFolderPathRequest {
    pub parent_id: Option<Uuid>,
    pub segments: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateFolderRequest {
    pub parent_id: Option<Uuid>,
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct FolderResponse {
    pub folder: FolderInfo,
}

#[derive(Serialize)]
pub struct FolderContentsResponse {
    pub folder: FolderInfo,
    pub subfolders: Vec<FolderInfo>,
    pub projects: Vec<ProjectResponse>,
}

#[derive(Serialize)]
pub struct FolderTreeResponse {
    pub root: FolderTreeNode,
}

#[derive(Serialize)]
pub struct FolderTreeNode {
    #[serde(flatten)]
    pub folder: FolderInfo,
    pub project_count: i64,
    pub children: Vec<FolderTreeNode>,
}

#[derive(Serialize)]
pub struct DeleteFolderResponse {
    pub parent_id: Uuid,
    pub reparented_folders: usize,
    pub reparented_projects: usize,
}

#[derive(Serialize)]
pub struct FolderInfo {
    pub id: Uuid,
    pub name: String,
    pub kind: FolderKind,
    pub year: Option<i32>,
    pub parent_id: Option<Uuid>,
    pub path: String,
    pub created_at: String,
    pub updated_at: String,
}

pub async fn get_folder_tree(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<FolderTreeResponse>> {
    let mut conn = state.db()?;

    let root = ensure_root_folder(&mut conn, user.user_id)?;
    ensure_current_year_folder(&mut conn, user.user_id)?;

    let all_folders = load_folders(&mut conn, user.user_id)?;
    let counts: HashMap<Uuid, i64> = projects::table
        .filter(projects::owner_id.eq(user.user_id))
        .group_by(projects::folder_id)
        .select((projects::folder_id, count_star()))
        .load::<(Uuid, i64)>(&mut conn)?
        .into_iter()
        .collect();

    let tree = build_tree(&all_folders);
    let by_id: HashMap<Uuid, &Folder> = all_folders.iter().map(|f| (f.id, f)).collect();
    let root_node = build_tree_node(&tree, &by_id, &counts, root.id)
        .ok_or_else(|| AppError::internal("root folder missing from tree"))?;

    Ok(Json(FolderTreeResponse { root: root_node }))
}

fn build_tree_node(
    tree: &FolderTree,
    by_id: &HashMap<Uuid, &Folder>,
    counts: &HashMap<Uuid, i64>,
    id: Uuid,
) -> Option<FolderTreeNode> {
    let folder = by_id.get(&id)?;
    let children = tree
        .children_of(Some(id))
        .iter()
        .filter_map(|child| build_tree_node(tree, by_id, counts, *child))
        .collect();

    Some(FolderTreeNode {
        folder: folder_to_info(tree, folder),
        project_count: counts.get(&id).copied().unwrap_or(0),
        children,
    })
}

pub async fn list_folder_contents(
    State(state): State<AppState>,
    Path(folder_identifier): Path<String>,
    user: AuthenticatedUser,
) -> AppResult<Json<FolderContentsResponse>> {
    let mut conn = state.db()?;

    let folder = if folder_identifier.eq_ignore_ascii_case("root") {
        ensure_root_folder(&mut conn, user.user_id)?
    } else {
        let folder_id = Uuid::parse_str(&folder_identifier)
            .map_err(|_| AppError::bad_request("folder identifier must be 'root' or a UUID"))?;
        find_owned_folder(&mut conn, user.user_id, folder_id)?.ok_or_else(AppError::not_found)?
    };

    let all_folders = load_folders(&mut conn, user.user_id)?;
    let tree = build_tree(&all_folders);
    let by_id: HashMap<Uuid, &Folder> = all_folders.iter().map(|f| (f.id, f)).collect();

    let subfolders = tree
        .children_of(Some(folder.id))
        .iter()
        .filter_map(|id| by_id.get(id))
        .map(|child| folder_to_info(&tree, child))
        .collect();

    let folder_projects: Vec<Project> = projects::table
        .filter(projects::owner_id.eq(user.user_id))
        .filter(projects::folder_id.eq(folder.id))
        .order(projects::updated_at.desc())
        .load(&mut conn)?;

    Ok(Json(FolderContentsResponse {
        folder: folder_to_info(&tree, &folder),
        subfolders,
        projects: folder_projects.into_iter().map(to_project_response).collect(),
    }))
}

pub async fn create_folder(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateFolderRequest>,
) -> AppResult<Json<FolderResponse>> {
    let name = normalize_folder_name(&payload.name)?;
    let mut conn = state.db()?;

    let folder = conn.transaction::<Folder, AppError, _>(|conn| {
        let parent = match payload.parent_id {
            Some(parent_id) => find_owned_folder(conn, user.user_id, parent_id)?
                .ok_or_else(|| AppError::bad_request("parent folder does not exist"))?,
            None => ensure_root_folder(conn, user.user_id)?,
        };

        let tree = build_tree(&load_folders(conn, user.user_id)?);
        if tree.sibling_names(Some(parent.id), None).contains(&name) {
            return Err(FolderRuleError::NameConflict.into());
        }

        let new_folder = NewFolder {
            id: Uuid::new_v4(),
            owner_id: user.user_id,
            name,
            parent_id: Some(parent.id),
            kind: FolderKind::Custom.as_str().to_string(),
            year: None,
        };
        diesel::insert_into(folders::table)
            .values(&new_folder)
            .execute(conn)?;

        Ok(folders::table.find(new_folder.id).first(conn)?)
    })?;

    let tree = build_tree(&load_folders(&mut conn, user.user_id)?);
    Ok(Json(FolderResponse {
        folder: folder_to_info(&tree, &folder),
    }))
}

pub async fn ensure_folder_path(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<EnsureFolderPathRequest>,
) -> AppResult<Json<FolderResponse>> {
    if payload.segments.is_empty() {
        return Err(AppError::bad_request("segments must not be empty"));
    }
    let names = payload
        .segments
        .iter()
        .map(|segment| normalize_folder_name(segment))
        .collect::<Result<Vec<_>, _>>()?;

    let mut conn = state.db()?;

    let target_folder = conn.transaction::<Folder, AppError, _>(|conn| {
        let mut current_parent = match payload.parent_id {
            Some(parent_id) => {
                find_owned_folder(conn, user.user_id, parent_id)?
                    .ok_or_else(|| AppError::bad_request("parent folder does not exist"))?
                    .id
            }
            None => ensure_root_folder(conn, user.user_id)?.id,
        };
        let mut last_folder: Option<Folder> = None;

        for name in &names {
            let existing: Option<Folder> = folders::table
                .filter(folders::owner_id.eq(user.user_id))
                .filter(folders::parent_id.eq(Some(current_parent)))
                .filter(folders::name.eq(name))
                .first(conn)
                .optional()?;

            let folder = if let Some(folder) = existing {
                folder
            } else {
                let new_folder = NewFolder {
                    id: Uuid::new_v4(),
                    owner_id: user.user_id,
                    name: name.clone(),
                    parent_id: Some(current_parent),
                    kind: FolderKind::Custom.as_str().to_string(),
                    year: None,
                };

                diesel::insert_into(folders::table)
                    .values(&new_folder)
                    .execute(conn)?;

                folders::table.find(new_folder.id).first(conn)?
            };

            current_parent = folder.id;
            last_folder = Some(folder);
        }

        last_folder.ok_or_else(|| AppError::internal("failed to resolve folder path"))
    })?;

    let tree = build_tree(&load_folders(&mut conn, user.user_id)?);
    Ok(Json(FolderResponse {
        folder: folder_to_info(&tree, &target_folder),
    }))
}

pub async fn update_folder(
    State(state): State<AppState>,
    Path(folder_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateFolderRequest>,
) -> AppResult<Json<FolderResponse>> {
    let mut conn = state.db()?;

    let updated = conn.transaction::<Folder, AppError, _>(|conn| {
        let folder = find_owned_folder(conn, user.user_id, folder_id)?
            .ok_or_else(AppError::not_found)?;
        let kind = kind_of(&folder);
        let tree = build_tree(&load_folders(conn, user.user_id)?);

        let mut next_parent = folder.parent_id;
        if let Some(parent_id) = payload.parent_id {
            if Some(parent_id) != folder.parent_id {
                ensure_movable(kind)?;
                find_owned_folder(conn, user.user_id, parent_id)?
                    .ok_or_else(|| AppError::bad_request("parent folder does not exist"))?;
                tree.check_reparent(folder_id, parent_id)?;
                next_parent = Some(parent_id);
            }
        }

        let mut next_name = folder.name.clone();
        if let Some(name) = payload.name.as_deref() {
            let name = normalize_folder_name(name)?;
            if name != folder.name {
                ensure_renamable(kind)?;
                next_name = name;
            }
        }

        if next_parent == folder.parent_id && next_name == folder.name {
            return Ok(folder);
        }

        if tree
            .sibling_names(next_parent, Some(folder_id))
            .contains(&next_name)
        {
            return Err(FolderRuleError::NameConflict.into());
        }

        diesel::update(folders::table.find(folder_id))
            .set((
                folders::parent_id.eq(next_parent),
                folders::name.eq(&next_name),
                folders::updated_at.eq(now_naive()),
            ))
            .execute(conn)?;

        Ok(folders::table.find(folder_id).first(conn)?)
    })?;

    let tree = build_tree(&load_folders(&mut conn, user.user_id)?);
    Ok(Json(FolderResponse {
        folder: folder_to_info(&tree, &updated),
    }))
}

/// Deletes a custom folder, handing its subfolders and projects to its parent.
pub async fn delete_folder(
    State(state): State<AppState>,
    Path(folder_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<(StatusCode, Json<DeleteFolderResponse>)> {
    let mut conn = state.db()?;

    let response = conn.transaction::<DeleteFolderResponse, AppError, _>(|conn| {
        let folder = find_owned_folder(conn, user.user_id, folder_id)?
            .ok_or_else(AppError::not_found)?;
        ensure_deletable(kind_of(&folder))?;
        let parent_id = folder
            .parent_id
            .ok_or_else(|| AppError::internal("custom folder without parent"))?;

        let tree = build_tree(&load_folders(conn, user.user_id)?);
        let mut taken = tree.sibling_names(Some(parent_id), Some(folder_id));
        let now = now_naive();

        let child_ids = tree.children_of(Some(folder_id)).to_vec();
        for child_id in &child_ids {
            let Some(child) = tree.get(*child_id) else {
                continue;
            };
            let name = unique_sibling_name(&child.name, &taken);
            taken.insert(name.clone());
            diesel::update(folders::table.find(child_id))
                .set((
                    folders::parent_id.eq(Some(parent_id)),
                    folders::name.eq(&name),
                    folders::updated_at.eq(now),
                ))
                .execute(conn)?;
        }

        let reparented_projects = diesel::update(
            projects::table
                .filter(projects::owner_id.eq(user.user_id))
                .filter(projects::folder_id.eq(folder_id)),
        )
        .set((
            projects::folder_id.eq(parent_id),
            projects::updated_at.eq(now),
        ))
        .execute(conn)?;

        diesel::delete(folders::table.find(folder_id)).execute(conn)?;

        Ok(DeleteFolderResponse {
            parent_id,
            reparented_folders: child_ids.len(),
            reparented_projects,
        })
    })?;

    info!(
        folder_id = %folder_id,
        parent_id = %response.parent_id,
        reparented_folders = response.reparented_folders,
        reparented_projects = response.reparented_projects,
        "deleted folder"
    );

    Ok((StatusCode::OK, Json(response)))
}

pub(crate) fn folder_to_info(tree: &FolderTree, folder: &Folder) -> FolderInfo {
    FolderInfo {
        id: folder.id,
        name: folder.name.clone(),
        kind: kind_of(folder),
        year: folder.year,
        parent_id: folder.parent_id,
        path: tree
            .path_of(folder.id)
            .unwrap_or_else(|| format!("/{}", folder.name)),
        created_at: to_iso(folder.created_at),
        updated_at: to_iso(folder.updated_at),
    }
}
