mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, read_json, TestApp};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
struct Note {
    id: Uuid,
    title: String,
    category: Option<String>,
    tags: Vec<String>,
    is_pinned: bool,
    sort_order: i32,
}

async fn create_note(app: &TestApp, token: &str, body: serde_json::Value) -> Result<Note> {
    let response = app.post_json("/api/notes", &body, Some(token)).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

#[tokio::test]
async fn notes_append_and_patch() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, token) = app.signed_in("songwriter").await?;

    let hook = create_note(
        &app,
        &token,
        json!({ "title": "Chorus hook", "category": "lyric", "tags": [" Hook ", "hook", "Summer"] }),
    )
    .await?;
    assert_eq!(hook.sort_order, 0);
    assert_eq!(hook.tags, vec!["hook".to_string(), "summer".to_string()]);
    assert_eq!(hook.category.as_deref(), Some("lyric"));

    let riff = create_note(&app, &token, json!({ "title": "Bass riff", "category": "melody" })).await?;
    assert_eq!(riff.sort_order, 1);

    let unknown_category = app
        .post_json(
            "/api/notes",
            &json!({ "title": "Groceries", "category": "recipe" }),
            Some(&token),
        )
        .await?;
    assert_eq!(unknown_category.status(), StatusCode::BAD_REQUEST);

    let path = format!("/api/notes/{}", hook.id);
    let patched = app
        .patch_json(
            &path,
            &json!({ "category": null, "is_pinned": true }),
            Some(&token),
        )
        .await?;
    assert_eq!(patched.status(), StatusCode::OK);
    let patched: Note = read_json(patched).await?;
    assert_eq!(patched.title, "Chorus hook");
    assert_eq!(patched.category, None);
    assert!(patched.is_pinned);
    assert_eq!(patched.tags.len(), 2);

    let null_title = app
        .patch_json(&path, &json!({ "title": null }), Some(&token))
        .await?;
    assert_eq!(null_title.status(), StatusCode::BAD_REQUEST);

    let listed: Vec<Note> = read_json(app.get("/api/notes", Some(&token)).await?).await?;
    assert_eq!(listed[0].id, hook.id, "pinned notes come first");
    assert_eq!(listed[1].id, riff.id);

    let tagged: Vec<Note> =
        read_json(app.get("/api/notes?tag=SUMMER", Some(&token)).await?).await?;
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].id, hook.id);

    let melodies: Vec<Note> =
        read_json(app.get("/api/notes?category=melody", Some(&token)).await?).await?;
    assert_eq!(melodies.len(), 1);
    assert_eq!(melodies[0].id, riff.id);

    let (_, other_token) = app.signed_in("note-snoop").await?;
    let snoop = app.delete(&path, Some(&other_token)).await?;
    assert_eq!(snoop.status(), StatusCode::NOT_FOUND);

    let deleted = app.delete(&path, Some(&token)).await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn reorder_produces_dense_positions() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (_, token) = app.signed_in("arranger").await?;

    let mut ids = Vec::new();
    for title in ["Intro", "Verse", "Bridge", "Outro"] {
        ids.push(create_note(&app, &token, json!({ "title": title })).await?.id);
    }

    let reordered = app
        .post_json(
            "/api/notes/reorder",
            &json!({ "ordered_ids": [ids[3], ids[1]] }),
            Some(&token),
        )
        .await?;
    assert_eq!(reordered.status(), StatusCode::OK);
    let reordered: Vec<Note> = read_json(reordered).await?;

    let order: Vec<Uuid> = reordered.iter().map(|note| note.id).collect();
    assert_eq!(order, vec![ids[3], ids[1], ids[0], ids[2]]);
    let positions: Vec<i32> = reordered.iter().map(|note| note.sort_order).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);

    let duplicate = app
        .post_json(
            "/api/notes/reorder",
            &json!({ "ordered_ids": [ids[0], ids[0]] }),
            Some(&token),
        )
        .await?;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    let (_, other_token) = app.signed_in("arranger-other").await?;
    let foreign = app
        .post_json(
            "/api/notes/reorder",
            &json!({ "ordered_ids": [ids[0]] }),
            Some(&other_token),
        )
        .await?;
    assert_eq!(foreign.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}
