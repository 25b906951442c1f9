mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, read_json, TestApp};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize, Clone)]
struct ProjectResponse {
    id: Uuid,
    folder_id: Uuid,
    title: String,
    project_type: String,
    status: String,
}

#[derive(Deserialize)]
struct MoveResponse {
    project: ProjectResponse,
    moved: bool,
    from_folder_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct BulkMoveResponse {
    updated: usize,
}

#[derive(Deserialize)]
struct FolderResponse {
    folder: FolderInfo,
}

#[derive(Deserialize)]
struct FolderInfo {
    id: Uuid,
    kind: String,
}

#[derive(Deserialize)]
struct FolderContents {
    projects: Vec<ProjectResponse>,
}

#[derive(Deserialize)]
struct TreeResponse {
    root: TreeNode,
}

#[derive(Deserialize)]
struct TreeNode {
    #[serde(flatten)]
    folder: FolderInfo,
    children: Vec<TreeNode>,
}

#[derive(Serialize)]
struct CreateProject<'a> {
    title: &'a str,
    project_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_id: Option<Uuid>,
}

async fn create_project(
    app: &TestApp,
    token: &str,
    title: &str,
    folder_id: Option<Uuid>,
) -> Result<ProjectResponse> {
    let response = app
        .post_json(
            "/api/projects",
            &CreateProject {
                title,
                project_type: "single",
                folder_id,
            },
            Some(token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

async fn create_folder(app: &TestApp, token: &str, name: &str) -> Result<Uuid> {
    let response = app
        .post_json("/api/folders", &json!({ "name": name }), Some(token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let created: FolderResponse = read_json(response).await?;
    Ok(created.folder.id)
}

async fn listed_in_folder(app: &TestApp, token: &str, folder_id: Uuid) -> Result<Vec<Uuid>> {
    let listed: Vec<ProjectResponse> = read_json(
        app.get(&format!("/api/projects?folder_id={folder_id}"), Some(token))
            .await?,
    )
    .await?;
    let contents: FolderContents = read_json(
        app.get(&format!("/api/folders/{folder_id}/contents"), Some(token))
            .await?,
    )
    .await?;
    let mut from_contents: Vec<Uuid> = contents.projects.iter().map(|p| p.id).collect();
    let mut ids: Vec<Uuid> = listed.iter().map(|p| p.id).collect();
    from_contents.sort();
    ids.sort();
    assert_eq!(ids, from_contents, "listing and folder contents agree");
    Ok(ids)
}

async fn year_folder_id(app: &TestApp, token: &str) -> Result<Uuid> {
    let tree: TreeResponse = read_json(app.get("/api/folders/tree", Some(token)).await?).await?;
    let year = tree
        .root
        .children
        .iter()
        .find(|child| child.folder.kind == "year")
        .expect("current year folder");
    Ok(year.folder.id)
}

#[tokio::test]
async fn new_projects_land_in_the_current_year() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, token) = app.signed_in("year-artist").await?;

    let project = create_project(&app, &token, "  First Light ", None).await?;
    assert_eq!(project.title, "First Light");
    assert_eq!(project.project_type, "single");
    assert_eq!(project.status, "concept");
    assert_eq!(project.folder_id, year_folder_id(&app, &token).await?);

    let invalid_type = app
        .post_json(
            "/api/projects",
            &CreateProject {
                title: "Odd",
                project_type: "symphony",
                folder_id: None,
            },
            Some(&token),
        )
        .await?;
    assert_eq!(invalid_type.status(), StatusCode::BAD_REQUEST);

    let (_, other_token) = app.signed_in("year-other").await?;
    let foreign_folder = app
        .post_json(
            "/api/projects",
            &CreateProject {
                title: "Trespass",
                project_type: "ep",
                folder_id: Some(project.folder_id),
            },
            Some(&other_token),
        )
        .await?;
    assert_eq!(foreign_folder.status(), StatusCode::BAD_REQUEST);

    let hidden = app
        .get(&format!("/api/projects/{}", project.id), Some(&other_token))
        .await?;
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn drag_and_drop_moves_between_folders() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, token) = app.signed_in("mover").await?;
    let (_, neighbour_token) = app.signed_in("mover-neighbour").await?;

    let project = create_project(&app, &token, "Drifting", None).await?;
    let origin = project.folder_id;
    let singles = create_folder(&app, &token, "Singles").await?;
    let archive = create_folder(&app, &token, "Archive").await?;
    let path = format!("/api/projects/{}/folder", project.id);

    let moved = app
        .patch_json(
            &path,
            &json!({
                "target": { "type": "folder", "id": singles },
                "expected_folder_id": origin,
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(moved.status(), StatusCode::OK);
    let moved: MoveResponse = read_json(moved).await?;
    assert!(moved.moved);
    assert_eq!(moved.from_folder_id, Some(origin));
    assert_eq!(moved.project.folder_id, singles);
    assert!(listed_in_folder(&app, &token, singles).await?.contains(&project.id));
    assert!(!listed_in_folder(&app, &token, origin).await?.contains(&project.id));

    let same_folder: MoveResponse = read_json(
        app.patch_json(&path, &json!({ "folder_id": singles }), Some(&token))
            .await?,
    )
    .await?;
    assert!(!same_folder.moved);
    assert_eq!(same_folder.from_folder_id, None);

    // The client still believes the project sits in its original folder.
    let stale = app
        .patch_json(
            &path,
            &json!({ "folder_id": archive, "expected_folder_id": origin }),
            Some(&token),
        )
        .await?;
    assert_eq!(stale.status(), StatusCode::CONFLICT);

    let onto_desktop = app
        .patch_json(&path, &json!({ "target": { "type": "desktop" } }), Some(&token))
        .await?;
    assert_eq!(onto_desktop.status(), StatusCode::BAD_REQUEST);

    let onto_project = app
        .patch_json(
            &path,
            &json!({ "target": { "type": "project", "id": project.id } }),
            Some(&token),
        )
        .await?;
    assert_eq!(onto_project.status(), StatusCode::BAD_REQUEST);

    let ambiguous = app
        .patch_json(
            &path,
            &json!({ "folder_id": archive, "target": { "type": "folder", "id": archive } }),
            Some(&token),
        )
        .await?;
    assert_eq!(ambiguous.status(), StatusCode::BAD_REQUEST);

    let missing_folder = app
        .patch_json(&path, &json!({ "folder_id": Uuid::new_v4() }), Some(&token))
        .await?;
    assert_eq!(missing_folder.status(), StatusCode::BAD_REQUEST);

    let neighbours_folder = create_folder(&app, &neighbour_token, "Not Yours").await?;
    let onto_foreign = app
        .patch_json(
            &path,
            &json!({ "target": { "type": "folder", "id": neighbours_folder } }),
            Some(&token),
        )
        .await?;
    assert_eq!(onto_foreign.status(), StatusCode::BAD_REQUEST);
    assert!(listed_in_folder(&app, &neighbour_token, neighbours_folder)
        .await?
        .is_empty());

    let current: serde_json::Value =
        read_json(app.get(&format!("/api/projects/{}", project.id), Some(&token)).await?).await?;
    assert_eq!(current["project"]["folder_id"], json!(singles));
    assert_eq!(current["access"], json!("owner"));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn bulk_move_and_search() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, token) = app.signed_in("bulk-artist").await?;
    let (_, other_token) = app.signed_in("bulk-other").await?;

    let first = create_project(&app, &token, "Summer 100% Mix", None).await?;
    let second = create_project(&app, &token, "Winter Tape", None).await?;
    let foreign = create_project(&app, &other_token, "Not Mine", None).await?;
    let target = create_folder(&app, &token, "Mixtapes").await?;

    let rejected = app
        .post_json(
            "/api/projects/bulk/move",
            &json!({ "project_ids": [first.id, foreign.id], "folder_id": target }),
            Some(&token),
        )
        .await?;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let moved = app
        .post_json(
            "/api/projects/bulk/move",
            &json!({ "project_ids": [first.id, second.id, first.id], "folder_id": target }),
            Some(&token),
        )
        .await?;
    assert_eq!(moved.status(), StatusCode::OK);
    let moved: BulkMoveResponse = read_json(moved).await?;
    assert_eq!(moved.updated, 2);

    let in_folder: Vec<ProjectResponse> = read_json(
        app.get(&format!("/api/projects?folder_id={target}"), Some(&token))
            .await?,
    )
    .await?;
    assert_eq!(in_folder.len(), 2);

    let percent: Vec<ProjectResponse> =
        read_json(app.get("/api/projects?query=100%25", Some(&token)).await?).await?;
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].id, first.id);

    let tape: Vec<ProjectResponse> =
        read_json(app.get("/api/projects?query=TAPE", Some(&token)).await?).await?;
    assert_eq!(tape.len(), 1);
    assert_eq!(tape[0].id, second.id);

    let bad_status = app
        .get("/api/projects?status=archived", Some(&token))
        .await?;
    assert_eq!(bad_status.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn deleting_requires_confirmation() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, token) = app.signed_in("deleter").await?;
    let project = create_project(&app, &token, "Scrapped", None).await?;
    let path = format!("/api/projects/{}", project.id);

    let unconfirmed = app.delete(&path, Some(&token)).await?;
    assert_eq!(unconfirmed.status(), StatusCode::BAD_REQUEST);

    let confirmed = app
        .delete(&format!("{path}?confirm=true"), Some(&token))
        .await?;
    assert_eq!(confirmed.status(), StatusCode::NO_CONTENT);

    let gone = app.get(&path, Some(&token)).await?;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn malformed_requests_answer_with_a_json_message() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, token) = app.signed_in("sloppy-client").await?;

    let missing_title = app
        .post_json("/api/projects", &json!({ "project_type": "single" }), Some(&token))
        .await?;
    assert_eq!(missing_title.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = read_json(missing_title).await?;
    assert!(body["message"].as_str().is_some_and(|m| m.contains("title")));

    let bad_id = app.get("/api/projects/not-a-uuid", Some(&token)).await?;
    assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = read_json(bad_id).await?;
    assert!(body["message"].is_string());

    let bad_filter = app
        .get("/api/projects?folder_id=nowhere", Some(&token))
        .await?;
    assert_eq!(bad_filter.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = read_json(bad_filter).await?;
    assert!(body["message"].is_string());

    app.cleanup().await?;
    Ok(())
}
