mod helpers;

use clipdesk_api_client::{ChunkedTransfer, StartError, TransferOptions};
use clipdesk_core::{SessionError, SessionEvent, SessionState, UploadError, UploadSession};
use helpers::*;
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const RANGES: [(&str, usize); 3] = [
    ("bytes 0-262143/600000", 308),
    ("bytes 262144-524287/600000", 308),
    ("bytes 524288-599999/600000", 200),
];

async fn chunk_mocks(server: &mut mockito::Server, route: &str) -> Vec<mockito::Mock> {
    let mut chunks = Vec::new();
    for (range, status) in RANGES {
        chunks.push(
            server
                .mock("PUT", route)
                .match_header("content-range", range)
                .match_header("content-type", "video/mp4")
                .with_status(status)
                .expect(1)
                .create_async()
                .await,
        );
    }
    chunks
}

async fn submit_mock(server: &mut mockito::Server, response: serde_json::Value) -> mockito::Mock {
    server
        .mock("POST", path("/uploads").as_str())
        .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(response.to_string())
        .create_async()
        .await
}

#[tokio::test]
async fn test_file_upload_runs_through_all_chunks() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "clip.mp4", 600_000);
    let target = format!("{}/upload/abc", server.url());

    let submit = server
        .mock("POST", path("/uploads").as_str())
        .match_body(Matcher::PartialJson(json!({
            "title": "Launch",
            "upload_type": "file",
            "signed": false,
            "encoding_tier": "baseline",
            "text_tracks_type": "none"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "url": target }).to_string())
        .create_async()
        .await;

    let chunks = chunk_mocks(&mut server, "/upload/abc").await;

    let mut uploader = uploader(&server);
    let handle = uploader.start(&file_form("Launch", file)).await.unwrap();
    let mut updates = handle.subscribe();
    let first = updates.borrow_and_update().clone();
    let observer = tokio::spawn(async move {
        let mut seen = vec![first];
        while updates.changed().await.is_ok() {
            seen.push(updates.borrow_and_update().clone());
        }
        seen
    });

    let final_state = handle.wait().await.unwrap();
    assert_eq!(final_state, SessionState::Complete);
    assert_eq!(handle.state().percent(), None);

    // The watch channel may coalesce updates, so intermediate states can be skipped
    // but never invented or reordered.
    let seen = observer.await.unwrap();
    assert_eq!(seen.first(), Some(&SessionState::InFlight(0)));
    assert_eq!(seen.last(), Some(&SessionState::Complete));
    let percents: Vec<u8> = seen.iter().filter_map(SessionState::percent).collect();
    let mut expected = [0u8, 43, 87, 100].into_iter();
    assert!(percents.iter().all(|p| expected.any(|e| e == *p)));

    submit.assert_async().await;
    for chunk in chunks {
        chunk.assert_async().await;
    }
}

#[tokio::test]
async fn test_chunk_acknowledgements_give_exact_state_sequence() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "clip.mp4", 600_000);
    let chunks = chunk_mocks(&mut server, "/upload/seq").await;

    let transfer = ChunkedTransfer::new(
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap(),
        format!("{}/upload/seq", server.url()),
        file,
        TransferOptions {
            chunk_size: CHUNK,
            max_attempts: 1,
            retry_delay: Duration::from_millis(10),
        },
    );
    let (events_tx, mut events_rx) = mpsc::channel::<SessionEvent>(16);
    transfer.run(events_tx, CancellationToken::new()).await;

    let mut session = UploadSession::new();
    session.begin_transfer(()).unwrap();
    let mut seen = vec![session.state().clone()];
    while let Some(event) = events_rx.recv().await {
        session.apply(&event);
        if seen.last() != Some(session.state()) {
            seen.push(session.state().clone());
        }
    }

    assert_eq!(
        seen,
        vec![
            SessionState::InFlight(0),
            SessionState::InFlight(43),
            SessionState::InFlight(87),
            SessionState::InFlight(100),
            SessionState::Complete,
        ]
    );
    for chunk in chunks {
        chunk.assert_async().await;
    }
}

#[tokio::test]
async fn test_fatal_chunk_status_fails_session() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "clip.mp4", 1000);
    let target = format!("{}/upload/x", server.url());
    let _submit = submit_mock(&mut server, json!({ "url": target })).await;
    let put = server
        .mock("PUT", "/upload/x")
        .with_status(403)
        .expect(1)
        .create_async()
        .await;

    let mut uploader = uploader(&server);
    let handle = uploader.start(&file_form("Clip", file)).await.unwrap();
    let state = handle.wait().await.unwrap();

    assert_eq!(
        state,
        SessionState::Failed("Server responded with 403. Stopping upload.".to_string())
    );
    put.assert_async().await;
}

#[tokio::test]
async fn test_temporary_status_is_retried_until_attempts_run_out() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "clip.mp4", 1000);
    let target = format!("{}/upload/y", server.url());
    let _submit = submit_mock(&mut server, json!({ "url": target })).await;
    let put = server
        .mock("PUT", "/upload/y")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let mut uploader = uploader(&server);
    let handle = uploader.start(&file_form("Clip", file)).await.unwrap();
    let state = handle.wait().await.unwrap();

    assert_eq!(
        state,
        SessionState::Failed("Chunk 0 failed after 2 attempts: server responded with 503".to_string())
    );
    put.assert_async().await;
}

#[tokio::test]
async fn test_remote_url_completes_without_progress() {
    let mut server = mockito::Server::new_async().await;
    let submit = server
        .mock("POST", path("/uploads").as_str())
        .match_body(Matcher::PartialJson(json!({
            "upload_type": "url",
            "url": "https://cdn.example.com/talk.mp4"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": 12, "upload_id": "up_12" }).to_string())
        .create_async()
        .await;

    let mut uploader = uploader(&server);
    let handle = uploader
        .start(&url_form("Talk", "https://cdn.example.com/talk.mp4"))
        .await
        .unwrap();

    assert_eq!(handle.state(), SessionState::Complete);
    assert_eq!(handle.state().percent(), None);
    assert_eq!(handle.wait().await.unwrap(), SessionState::Complete);
    submit.assert_async().await;
}

#[tokio::test]
async fn test_empty_title_fails_before_any_request() {
    let mut server = mockito::Server::new_async().await;
    let submit = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let mut uploader = uploader(&server);
    let err = uploader
        .start(&url_form("", "https://cdn.example.com/talk.mp4"))
        .await
        .unwrap_err();

    match err {
        StartError::Upload(UploadError::FieldValidation(errors)) => {
            assert_eq!(errors.get("title"), Some("No title specified"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(uploader.current().is_none());
    submit.assert_async().await;
}

#[tokio::test]
async fn test_host_validation_rejection_is_a_field_error() {
    let mut server = mockito::Server::new_async().await;
    let _submit = submit_mock(
        &mut server,
        json!({ "statusCode": 400, "data": { "errors": { "url": "Url is not reachable" } } }),
    )
    .await;

    let mut uploader = uploader(&server);
    let err = uploader
        .start(&url_form("Talk", "https://cdn.example.com/missing.mp4"))
        .await
        .unwrap_err();

    let StartError::Upload(upload) = err else {
        panic!("expected an upload error");
    };
    assert_eq!(
        upload.field_errors().and_then(|e| e.get("url")),
        Some("Url is not reachable")
    );
}

#[tokio::test]
async fn test_submit_failure_uses_provider_message() {
    let mut server = mockito::Server::new_async().await;
    let _submit = server
        .mock("POST", path("/uploads").as_str())
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":null,"error":{"status":500,"message":"Mux is unavailable"}}"#)
        .create_async()
        .await;

    let mut uploader = uploader(&server);
    let handle = uploader
        .start(&url_form("Talk", "https://cdn.example.com/talk.mp4"))
        .await
        .unwrap();

    assert_eq!(
        handle.state(),
        SessionState::Failed("Mux is unavailable".to_string())
    );
}

#[tokio::test]
async fn test_submit_failure_without_message_is_unknown() {
    let mut server = mockito::Server::new_async().await;
    let _submit = server
        .mock("POST", path("/uploads").as_str())
        .with_status(502)
        .create_async()
        .await;

    let mut uploader = uploader(&server);
    let handle = uploader
        .start(&url_form("Talk", "https://cdn.example.com/talk.mp4"))
        .await
        .unwrap();

    assert_eq!(
        handle.state(),
        SessionState::Failed("Unknown error encountered".to_string())
    );
}

#[tokio::test]
async fn test_abort_while_in_flight_then_abort_again() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "clip.mp4", 1000);
    let target = format!("{}/upload/z", server.url());
    let _submit = submit_mock(&mut server, json!({ "url": target })).await;
    let put = server
        .mock("PUT", "/upload/z")
        .with_status(503)
        .expect_at_most(1)
        .create_async()
        .await;

    let mut uploader = slow_retry_uploader(&server);
    let handle = uploader.start(&file_form("Clip", file)).await.unwrap();
    assert!(handle.state().is_in_flight());

    handle.abort().await.unwrap();
    assert_eq!(handle.state(), SessionState::Aborted);
    assert_eq!(handle.wait().await.unwrap(), SessionState::Aborted);

    let second = handle.abort().await.unwrap_err();
    assert_eq!(
        second,
        SessionError::NotInFlight {
            state: "aborted".to_string()
        }
    );
    assert_eq!(handle.state(), SessionState::Aborted);
    put.assert_async().await;
}

#[tokio::test]
async fn test_only_one_session_in_flight() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "clip.mp4", 1000);
    let target = format!("{}/upload/w", server.url());
    let _submit = submit_mock(&mut server, json!({ "url": target })).await;
    let _put = server
        .mock("PUT", "/upload/w")
        .with_status(503)
        .create_async()
        .await;

    let mut uploader = slow_retry_uploader(&server);
    let first = uploader
        .start(&file_form("Clip", file.clone()))
        .await
        .unwrap();

    let err = uploader.start(&file_form("Clip", file)).await.unwrap_err();
    assert_eq!(err, StartError::Session(SessionError::AlreadyInFlight));

    uploader.reset().await;
    assert!(uploader.current().is_none());
    assert_eq!(first.wait().await.unwrap(), SessionState::Aborted);

    let handle = uploader
        .start(&url_form("Next", "https://cdn.example.com/next.mp4"))
        .await
        .unwrap();
    assert_eq!(handle.state(), SessionState::Complete);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abort_is_visible_once_it_returns() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "clip.mp4", 1000);
    let target = format!("{}/upload/v", server.url());
    let _submit = submit_mock(&mut server, json!({ "url": target })).await;
    let _put = server
        .mock("PUT", "/upload/v")
        .with_status(503)
        .create_async()
        .await;

    let mut uploader = slow_retry_uploader(&server);
    for _ in 0..50 {
        // A fresh start right after an abort must not see the old session in flight.
        let handle = uploader
            .start(&file_form("Clip", file.clone()))
            .await
            .unwrap();
        handle.abort().await.unwrap();
        assert_eq!(handle.state(), SessionState::Aborted);
    }
}
