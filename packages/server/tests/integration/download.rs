use crate::common::{TestApp, random_bytes, routes};

mod download {
    use super::*;

    #[tokio::test]
    async fn download_returns_identical_bytes() {
        let app = TestApp::spawn().await;
        let bytes = random_bytes(1000);
        let project = app.upload_zip("Calculator", bytes.clone()).await;
        let file_id = project["fileId"].as_str().unwrap();

        let res = app.get_raw(&routes::download(file_id)).await;

        assert_eq!(res.status().as_u16(), 200);
        let headers = res.headers().clone();
        assert_eq!(headers["content-type"], "application/zip");
        assert_eq!(headers["content-length"], "1000");
        let disposition = headers["content-disposition"].to_str().unwrap();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("filename=\"Calculator.zip\""));

        let body = res.bytes().await.unwrap();
        assert_eq!(body.as_ref(), bytes.as_slice());
    }

    #[tokio::test]
    async fn download_spans_many_chunks() {
        let app = TestApp::spawn().await;
        // Not a multiple of the test chunk size, so the last chunk is short.
        let bytes = random_bytes(10 * 256 + 17);
        let project = app.upload_zip("Large", bytes.clone()).await;

        let res = app
            .get_raw(&routes::download(project["fileId"].as_str().unwrap()))
            .await;

        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(res.bytes().await.unwrap().as_ref(), bytes.as_slice());
    }

    #[tokio::test]
    async fn empty_archive_downloads_as_empty_body() {
        let app = TestApp::spawn().await;
        let project = app.upload_zip("Empty", Vec::new()).await;

        let res = app
            .get_raw(&routes::download(project["fileId"].as_str().unwrap()))
            .await;

        assert_eq!(res.status().as_u16(), 200);
        assert!(res.bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&routes::download(&uuid::Uuid::now_v7().to_string()))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::download("not-an-id")).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "MALFORMED_ID");
    }

    #[tokio::test]
    async fn blob_without_project_is_not_found() {
        let app = TestApp::spawn().await;
        let blob = app
            .blobs
            .put("orphan.zip", Some("application/zip"), b"PK\x03\x04")
            .await
            .unwrap();

        let res = app.get(&routes::download(&blob.id.to_string())).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let app = TestApp::spawn_in_memory().await;
        let bytes = random_bytes(3 * 256 + 1);
        let project = app.upload_zip("In memory", bytes.clone()).await;

        let res = app
            .get_raw(&routes::download(project["fileId"].as_str().unwrap()))
            .await;

        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(res.bytes().await.unwrap().as_ref(), bytes.as_slice());
        assert_eq!(app.blob_count().await, 1);
    }

    #[tokio::test]
    async fn unreadable_descriptor_is_stream_error() {
        let app = TestApp::spawn().await;
        let project = app.upload_zip("Broken", random_bytes(600)).await;
        let file_id = project["fileId"].as_str().unwrap();
        std::fs::write(app.blob_dir(file_id).join("files.json"), b"{not json").unwrap();

        let res = app.get(&routes::download(file_id)).await;

        assert_eq!(res.status, 500);
        assert_eq!(res.code(), "STREAM_ERROR");
        assert!(!res.text.contains("not json"));
    }

    #[tokio::test]
    async fn missing_chunk_cuts_body_short() {
        let app = TestApp::spawn().await;
        let bytes = random_bytes(3 * 256);
        let project = app.upload_zip("Truncated", bytes.clone()).await;
        let file_id = project["fileId"].as_str().unwrap();
        std::fs::remove_file(app.blob_dir(file_id).join("chunk.00000001")).unwrap();

        let res = app.get_raw(&routes::download(file_id)).await;

        // Headers are already committed when the chunk turns out missing.
        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(res.headers()["content-length"], "768");
        if let Ok(body) = res.bytes().await {
            assert!(body.len() < bytes.len());
        }
    }
}
