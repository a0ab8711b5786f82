mod helpers;

use clipdesk_core::models::{AssetSearch, ListAssetsQuery, SearchField, SortOrder};
use clipdesk_core::AssetEditForm;
use helpers::*;
use mockito::Matcher;
use serde_json::json;

fn asset_json(id: u64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "upload_id": format!("up_{}", id),
        "asset_id": format!("as_{}", id),
        "playback_id": format!("pb_{}", id),
        "signed": false,
        "isReady": true,
        "duration": 12.5,
        "createdAt": "2024-05-01T08:00:00.000Z",
        "asset_data": {
            "aspect_ratio": "16:9",
            "tracks": [
                {"id": "t1", "type": "text", "text_type": "subtitles", "status": "ready",
                 "language_code": "en", "name": "English"}
            ]
        }
    })
}

#[tokio::test]
async fn test_list_assets_sends_paging_sort_and_search() {
    let mut server = mockito::Server::new_async().await;
    let list = server
        .mock("GET", path("/mux-asset").as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("start".into(), "20".into()),
            Matcher::UrlEncoded("limit".into(), "10".into()),
            Matcher::UrlEncoded("sort".into(), "title:asc".into()),
            Matcher::UrlEncoded("field".into(), "title".into()),
            Matcher::UrlEncoded("value".into(), "launch day".into()),
        ]))
        .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "items": [asset_json(1, "Launch day")], "totalCount": 21 }).to_string())
        .create_async()
        .await;

    let api = client(&server);
    let page = api
        .list_assets(&ListAssetsQuery {
            start: 20,
            limit: 10,
            sort: SortOrder::TitleAsc,
            search: Some(AssetSearch {
                field: SearchField::Title,
                value: "launch day".to_string(),
            }),
        })
        .await
        .unwrap();

    assert_eq!(page.total_count, 21);
    assert_eq!(page.items[0].title.as_deref(), Some("Launch day"));
    list.assert_async().await;
}

#[tokio::test]
async fn test_get_asset_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _get = server
        .mock("GET", path("/mux-asset/99").as_str())
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":null,"error":{"status":404,"message":"Not Found"}}"#)
        .create_async()
        .await;

    let api = client(&server);
    let err = api.get_asset(99).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.failure_message(), "Not Found");
}

#[tokio::test]
async fn test_update_sends_only_touched_title() {
    let mut server = mockito::Server::new_async().await;
    let get = server
        .mock("GET", path("/mux-asset/4").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(asset_json(4, "Old").to_string())
        .create_async()
        .await;
    let put = server
        .mock("PUT", path("/mux-asset/4").as_str())
        .match_body(Matcher::Json(json!({ "title": "New title" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(asset_json(4, "New title").to_string())
        .expect(1)
        .create_async()
        .await;

    let api = client(&server);
    let asset = api.get_asset(4).await.unwrap();
    let mut form = AssetEditForm::from_asset(&asset);
    form.set_title("New title");

    let updated = api.update_asset(&form.changes().unwrap()).await.unwrap();
    assert_eq!(updated.and_then(|a| a.title).as_deref(), Some("New title"));
    get.assert_async().await;
    put.assert_async().await;
}

#[tokio::test]
async fn test_update_without_changes_sends_nothing() {
    let mut server = mockito::Server::new_async().await;
    let put = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let api = client(&server);
    let asset = serde_json::from_value(asset_json(5, "Same")).unwrap();
    let form = AssetEditForm::from_asset(&asset);

    assert!(api.update_asset(&form.changes().unwrap()).await.unwrap().is_none());
    put.assert_async().await;
}

#[tokio::test]
async fn test_update_embeds_new_caption_file() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let vtt_path = dir.path().join("fr.vtt");
    std::fs::write(&vtt_path, "WEBVTT\n").unwrap();
    let vtt = clipdesk_core::models::FileHandle::from_path(&vtt_path)
        .unwrap()
        .with_content_type("text/vtt");

    let put = server
        .mock("PUT", path("/mux-asset/6").as_str())
        .match_body(Matcher::PartialJson(json!({
            "custom_text_tracks": [
                {"language_code": "en", "name": "English", "closed_captions": false,
                 "stored_track_id": "t1"},
                {"language_code": "fr", "name": "Français", "closed_captions": false,
                 "file": {"contents": "WEBVTT\n", "type": "text/vtt", "name": "fr.vtt", "size": 7}}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(asset_json(6, "Captions").to_string())
        .expect(1)
        .create_async()
        .await;

    let api = client(&server);
    let asset = serde_json::from_value(asset_json(6, "Captions")).unwrap();
    let mut form = AssetEditForm::from_asset(&asset);
    form.custom_text_tracks.push(clipdesk_core::models::TextTrackDraft {
        language_code: "fr".to_string(),
        name: "Français".to_string(),
        file: Some(vtt),
        ..Default::default()
    });

    let changes = form.changes().unwrap();
    assert!(changes.title.is_none());
    api.update_asset(&changes).await.unwrap();
    put.assert_async().await;
}

#[tokio::test]
async fn test_delete_asset_sends_identifiers() {
    let mut server = mockito::Server::new_async().await;
    let delete = server
        .mock("DELETE", path("/deleteMuxAsset").as_str())
        .match_body(Matcher::Json(json!({
            "id": 8,
            "asset_id": "as_8",
            "upload_id": "up_8",
            "delete_on_mux": true
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true,"deleted_on_mux":true}"#)
        .expect(1)
        .create_async()
        .await;

    let api = client(&server);
    let asset = serde_json::from_value(asset_json(8, "Gone")).unwrap();
    api.delete_asset(&asset).await.unwrap();
    delete.assert_async().await;
}

#[tokio::test]
async fn test_delete_failure_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _delete = server
        .mock("DELETE", path("/deleteMuxAsset").as_str())
        .with_status(500)
        .with_body("Mux API error")
        .create_async()
        .await;

    let api = client(&server);
    let asset = serde_json::from_value(asset_json(9, "Stuck")).unwrap();
    let err = api.delete_asset(&asset).await.unwrap_err();
    assert_eq!(err.failure_message(), "Mux API error");
}
