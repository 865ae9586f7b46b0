//! Wire-level tests for HttpDownloadService against a mock HTTP server
//!
//! These pin down the endpoint layout, the tagged-union payload parsing, and
//! the mapping of transport/5xx/malformed responses onto lifecycle errors.

use chatvault_media::api::client::DownloadService;
use chatvault_media::api::types::{DownloadStatusResponse, StartDownloadResponse};
use chatvault_media::{DownloadConfig, HttpDownloadService, MediaItemKey, VaultError};
use httpmock::prelude::*;
use serde_json::json;

fn service_for(server: &MockServer) -> HttpDownloadService {
    let config = DownloadConfig::new(server.base_url());
    HttpDownloadService::new(&config).unwrap()
}

const KEY: MediaItemKey = MediaItemKey {
    group_id: 17,
    message_id: 20488,
};

#[tokio::test]
async fn request_download_parses_already_downloaded() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/download/20488");
            then.status(200).json_body(json!({
                "status": "already_downloaded",
                "download_url": "/media/photos/42.jpg"
            }));
        })
        .await;

    let service = service_for(&server);
    let response = service.request_download(&KEY).await.unwrap();

    mock.assert_async().await;
    assert_eq!(
        response,
        StartDownloadResponse::AlreadyDownloaded {
            download_url: "/media/photos/42.jpg".to_string()
        }
    );
}

#[tokio::test]
async fn request_download_parses_download_started() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/download/20488");
            then.status(200).json_body(json!({"status": "download_started"}));
        })
        .await;

    let service = service_for(&server);
    let response = service.request_download(&KEY).await.unwrap();
    assert_eq!(response, StartDownloadResponse::DownloadStarted);
}

#[tokio::test]
async fn server_error_on_request_maps_to_request_failed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/download/20488");
            then.status(503);
        })
        .await;

    let service = service_for(&server);
    let err = service.request_download(&KEY).await.unwrap_err();

    match err {
        VaultError::RequestFailed { status_code, .. } => assert_eq!(status_code, Some(503)),
        other => panic!("expected RequestFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn download_status_parses_progress_payload() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/download-status/20488");
            then.status(200).json_body(json!({
                "status": "downloading",
                "progress": 45.5,
                "downloaded_size": 455000,
                "total_size": 1000000,
                "download_speed": 125000.0,
                "estimated_time_remaining": 4
            }));
        })
        .await;

    let service = service_for(&server);
    let response = service.download_status(&KEY).await.unwrap();

    match response {
        DownloadStatusResponse::Downloading {
            progress,
            downloaded_size,
            total_size,
            download_speed,
            estimated_time_remaining,
        } => {
            assert_eq!(progress, 45.5);
            assert_eq!(downloaded_size, Some(455_000));
            assert_eq!(total_size, Some(1_000_000));
            assert_eq!(download_speed, Some(125_000.0));
            assert_eq!(estimated_time_remaining, Some(4));
        }
        other => panic!("expected Downloading, got {:?}", other),
    }
}

#[tokio::test]
async fn unknown_status_payload_maps_to_poll_failed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/download-status/20488");
            then.status(200).json_body(json!({"status": "paused", "progress": 10.0}));
        })
        .await;

    let service = service_for(&server);
    let err = service.download_status(&KEY).await.unwrap_err();

    match err {
        VaultError::PollFailed { message, .. } => {
            assert!(message.contains("unexpected payload"), "got: {}", message);
        }
        other => panic!("expected PollFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn server_error_on_poll_maps_to_poll_failed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/download-status/20488");
            then.status(500);
        })
        .await;

    let service = service_for(&server);
    let err = service.download_status(&KEY).await.unwrap_err();

    match err {
        VaultError::PollFailed { status_code, .. } => assert_eq!(status_code, Some(500)),
        other => panic!("expected PollFailed, got {:?}", other),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn cancel_download_round_trips() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/cancel-download/20488");
            then.status(200).json_body(json!({"status": "cancelled"}));
        })
        .await;

    let service = service_for(&server);
    let response = service.cancel_download(&KEY).await.unwrap();

    mock.assert_async().await;
    assert!(response.is_cancelled());
}

#[tokio::test]
async fn cancel_download_passes_other_answers_through() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/cancel-download/20488");
            then.status(200).json_body(json!({"status": "not_active"}));
        })
        .await;

    let service = service_for(&server);
    let response = service.cancel_download(&KEY).await.unwrap();
    assert!(!response.is_cancelled());
    assert_eq!(response.status, "not_active");
}

#[tokio::test]
async fn unreachable_service_maps_to_transport_errors() {
    // nothing listens on this port
    let config = DownloadConfig::new("http://127.0.0.1:9");
    let service = HttpDownloadService::new(&config).unwrap();

    match service.request_download(&KEY).await.unwrap_err() {
        VaultError::RequestFailed { status_code, .. } => assert_eq!(status_code, None),
        other => panic!("expected RequestFailed, got {:?}", other),
    }

    match service.download_status(&KEY).await.unwrap_err() {
        VaultError::PollFailed { status_code, .. } => assert_eq!(status_code, None),
        other => panic!("expected PollFailed, got {:?}", other),
    }
}
