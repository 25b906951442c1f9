mod common;

use anyhow::Result;
use axum::http::StatusCode;
use backend::schema::collaborations;
use chrono::{Duration, Utc};
use common::{acquire_db_lock, read_json, TestApp};
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
struct Invitation {
    id: Uuid,
    owner: Person,
    collaborator: Person,
    project_id: Option<Uuid>,
    project_title: Option<String>,
    role: String,
    status: String,
    display_status: String,
    expires_at: Option<String>,
}

#[derive(Deserialize)]
struct Person {
    id: Uuid,
    box_id: String,
}

#[derive(Deserialize)]
struct Project {
    id: Uuid,
}

#[derive(Deserialize)]
struct SharedProject {
    id: Uuid,
    role: String,
}

#[derive(Deserialize)]
struct ProjectDetail {
    access: String,
}

async fn create_project(app: &TestApp, token: &str, title: &str) -> Result<Project> {
    let response = app
        .post_json(
            "/api/projects",
            &json!({ "title": title, "project_type": "album" }),
            Some(token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

#[tokio::test]
async fn invite_by_box_id_and_share_a_project() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (owner, owner_token) = app.signed_in("label-owner").await?;
    let (guest, guest_token) = app.signed_in("session-guest").await?;
    let (_, stranger_token) = app.signed_in("stranger").await?;

    let project = create_project(&app, &owner_token, "Debut LP").await?;

    let lookup = app
        .get(
            &format!("/api/users/lookup/{}", guest.box_id.to_lowercase()),
            Some(&owner_token),
        )
        .await?;
    assert_eq!(lookup.status(), StatusCode::OK);
    let found: Person = read_json(lookup).await?;
    assert_eq!(found.id, guest.id);

    let malformed = app
        .get("/api/users/lookup/BOX-0", Some(&owner_token))
        .await?;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let invite = json!({
        "box_id": guest.box_id.to_lowercase(),
        "role": "editor",
        "project_id": project.id,
        "message": "  Want to co-write?  ",
    });
    let created = app
        .post_json("/api/collaborations", &invite, Some(&owner_token))
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Invitation = read_json(created).await?;
    assert_eq!(created.owner.id, owner.id);
    assert_eq!(created.collaborator.box_id, guest.box_id);
    assert_eq!(created.project_id, Some(project.id));
    assert_eq!(created.project_title.as_deref(), Some("Debut LP"));
    assert_eq!(created.role, "editor");
    assert_eq!(created.status, "pending");
    assert_eq!(created.display_status, "pending");
    assert!(created.expires_at.is_some());

    let duplicate = app
        .post_json("/api/collaborations", &invite, Some(&owner_token))
        .await?;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let self_invite = app
        .post_json(
            "/api/collaborations",
            &json!({ "box_id": owner.box_id, "role": "viewer" }),
            Some(&owner_token),
        )
        .await?;
    assert_eq!(self_invite.status(), StatusCode::BAD_REQUEST);

    let bad_role = app
        .post_json(
            "/api/collaborations",
            &json!({ "box_id": guest.box_id, "role": "owner" }),
            Some(&owner_token),
        )
        .await?;
    assert_eq!(bad_role.status(), StatusCode::BAD_REQUEST);

    let before_accept = app
        .get(&format!("/api/projects/{}", project.id), Some(&guest_token))
        .await?;
    assert_eq!(before_accept.status(), StatusCode::NOT_FOUND);

    let received: Vec<Invitation> =
        read_json(app.get("/api/collaborations", Some(&guest_token)).await?).await?;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].id, created.id);

    let accept_path = format!("/api/collaborations/{}/accept", created.id);
    let hijack = app
        .post_json(&accept_path, &json!({}), Some(&stranger_token))
        .await?;
    assert_eq!(hijack.status(), StatusCode::FORBIDDEN);

    let accepted = app
        .post_json(&accept_path, &json!({}), Some(&guest_token))
        .await?;
    assert_eq!(accepted.status(), StatusCode::OK);
    let accepted: Invitation = read_json(accepted).await?;
    assert_eq!(accepted.status, "accepted");
    assert_eq!(accepted.display_status, "accepted");

    let reject_after_accept = app
        .post_json(
            &format!("/api/collaborations/{}/reject", created.id),
            &json!({}),
            Some(&guest_token),
        )
        .await?;
    assert_eq!(reject_after_accept.status(), StatusCode::CONFLICT);

    let detail: ProjectDetail = read_json(
        app.get(&format!("/api/projects/{}", project.id), Some(&guest_token))
            .await?,
    )
    .await?;
    assert_eq!(detail.access, "editor");

    let shared: Vec<SharedProject> =
        read_json(app.get("/api/projects/shared", Some(&guest_token)).await?).await?;
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].id, project.id);
    assert_eq!(shared[0].role, "editor");

    let project_path = format!("/api/projects/{}", project.id);
    let publish = app
        .put_json(
            &project_path,
            &json!({ "title": "Debut LP", "project_type": "album", "status": "published" }),
            Some(&guest_token),
        )
        .await?;
    assert_eq!(publish.status(), StatusCode::FORBIDDEN);

    let edit = app
        .put_json(
            &project_path,
            &json!({ "title": "Debut LP (Deluxe)", "project_type": "album", "status": "review" }),
            Some(&guest_token),
        )
        .await?;
    assert_eq!(edit.status(), StatusCode::OK);

    let delete_as_guest = app
        .delete(&format!("{project_path}?confirm=true"), Some(&guest_token))
        .await?;
    assert_eq!(delete_as_guest.status(), StatusCode::FORBIDDEN);

    let revoke_path = format!("/api/collaborations/{}", created.id);
    let revoke_as_guest = app.delete(&revoke_path, Some(&guest_token)).await?;
    assert_eq!(revoke_as_guest.status(), StatusCode::FORBIDDEN);

    let sent: Vec<Invitation> = read_json(
        app.get("/api/collaborations?direction=sent", Some(&owner_token))
            .await?,
    )
    .await?;
    assert_eq!(sent.len(), 1);

    let revoked = app.delete(&revoke_path, Some(&owner_token)).await?;
    assert_eq!(revoked.status(), StatusCode::NO_CONTENT);

    let after_revoke = app.get(&project_path, Some(&guest_token)).await?;
    assert_eq!(after_revoke.status(), StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn expired_invitations_display_as_expired() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, owner_token) = app.signed_in("expiry-owner").await?;
    let (guest, guest_token) = app.signed_in("expiry-guest").await?;

    let created: Invitation = read_json(
        app.post_json(
            "/api/collaborations",
            &json!({ "box_id": guest.box_id, "role": "approver", "expires_in_days": 3 }),
            Some(&owner_token),
        )
        .await?,
    )
    .await?;
    assert_eq!(created.project_id, None);

    let id = created.id;
    app.with_conn(move |conn| {
        let past = Utc::now().naive_utc() - Duration::days(1);
        diesel::update(collaborations::table.find(id))
            .set(collaborations::expires_at.eq(Some(past)))
            .execute(conn)?;
        Ok(())
    })
    .await?;

    let pending: Vec<Invitation> = read_json(
        app.get("/api/collaborations?status=pending", Some(&guest_token))
            .await?,
    )
    .await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, "pending");
    assert_eq!(pending[0].display_status, "expired");

    let accept = app
        .post_json(
            &format!("/api/collaborations/{id}/accept"),
            &json!({}),
            Some(&guest_token),
        )
        .await?;
    assert_eq!(accept.status(), StatusCode::GONE);

    let reject = app
        .post_json(
            &format!("/api/collaborations/{id}/reject"),
            &json!({}),
            Some(&guest_token),
        )
        .await?;
    assert_eq!(reject.status(), StatusCode::OK);
    let rejected: Invitation = read_json(reject).await?;
    assert_eq!(rejected.status, "rejected");
    assert_eq!(rejected.display_status, "rejected");

    let no_expiry: Invitation = read_json(
        app.post_json(
            "/api/collaborations",
            &json!({ "box_id": guest.box_id, "role": "viewer", "expires_in_days": 0 }),
            Some(&owner_token),
        )
        .await?,
    )
    .await?;
    assert!(no_expiry.expires_at.is_none());

    app.cleanup().await?;
    Ok(())
}
