use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::common::{FailingProjectStore, TestApp, UploadForm, random_bytes, routes};

mod upload_success {
    use super::*;

    #[tokio::test]
    async fn upload_creates_project_with_parsed_price() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(
                UploadForm::new("Calculator", "A simple calculator", "9.99")
                    .file("calc.zip", random_bytes(1000)),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "File uploaded and saved");
        let project = &res.body["project"];
        assert_eq!(project["title"], "Calculator");
        assert_eq!(project["description"], "A simple calculator");
        assert_eq!(project["price"].as_f64(), Some(9.99));
        assert!(project["id"].as_str().is_some());
        assert!(project["fileId"].as_str().is_some());
        assert!(project["createdAt"].as_str().is_some());
        assert_eq!(app.project_count().await, 1);
        assert_eq!(app.blob_count().await, 1);
    }

    #[tokio::test]
    async fn upload_accepts_uppercase_extension() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(UploadForm::new("Shout", "", "1").file("ARCHIVE.ZIP", b"PK".to_vec()))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn long_title_is_accepted() {
        let app = TestApp::spawn().await;
        let title = "x".repeat(300);

        let res = app
            .upload(UploadForm::new(&title, "", "1").file("t.zip", random_bytes(10)))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["project"]["title"].as_str().unwrap(), title);
    }

    #[tokio::test]
    async fn non_numeric_price_is_stored_as_null() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(UploadForm::new("Free", "", "free").file("free.zip", random_bytes(10)))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["project"]["price"].is_null());
    }

    #[tokio::test]
    async fn file_field_may_precede_text_fields() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(
                UploadForm::new("Early file", "file first", "3")
                    .file("early.zip", random_bytes(700))
                    .file_first(),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["project"]["title"], "Early file");
        assert_eq!(res.body["project"]["price"].as_f64(), Some(3.0));
    }

    #[tokio::test]
    async fn concurrent_uploads_get_distinct_ids() {
        let app = TestApp::spawn().await;

        let (a, b) = tokio::join!(
            app.upload(UploadForm::new("A", "", "1").file("a.zip", random_bytes(900))),
            app.upload(UploadForm::new("B", "", "2").file("b.zip", random_bytes(900))),
        );

        assert_eq!(a.status, 200, "{}", a.text);
        assert_eq!(b.status, 200, "{}", b.text);
        assert_ne!(a.body["project"]["id"], b.body["project"]["id"]);
        assert_ne!(a.body["project"]["fileId"], b.body["project"]["fileId"]);
        assert_eq!(app.project_count().await, 2);
        assert_eq!(app.blob_count().await, 2);
    }
}

mod upload_rejection {
    use super::*;

    #[tokio::test]
    async fn non_zip_file_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(UploadForm::new("Notes", "", "1").file("notes.txt", b"hello".to_vec()))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "Only .zip files allowed");
        assert_eq!(res.code(), "INVALID_FILE_TYPE");
        assert_eq!(app.project_count().await, 0);
        assert_eq!(app.blob_count().await, 0);
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.upload(UploadForm::new("Nothing", "", "1")).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "Only .zip files allowed");
        assert_eq!(app.project_count().await, 0);
    }

    #[tokio::test]
    async fn blank_title_is_rejected_and_blob_removed() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(UploadForm::new("   ", "", "1").file("blank.zip", random_bytes(500)))
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.code(), "VALIDATION_ERROR");
        assert_eq!(app.project_count().await, 0);
        assert_eq!(app.blob_count().await, 0);
    }

    #[tokio::test]
    async fn blank_title_before_file_stores_nothing() {
        // Without compensation a blob stored before the check would remain.
        let app = TestApp::spawn_with(|c| c.storage.compensate_orphans = false, None).await;

        let res = app
            .upload(UploadForm::new("", "", "1").file("early.zip", random_bytes(900)))
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.code(), "VALIDATION_ERROR");
        assert_eq!(app.blob_count().await, 0);
        assert_eq!(app.staging_count(), 0);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn_with(|c| c.storage.max_blob_size = 1024, None).await;

        let res = app
            .upload(UploadForm::new("Big", "", "1").file("big.zip", random_bytes(4096)))
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.code(), "VALIDATION_ERROR");
        assert_eq!(app.blob_count().await, 0);
    }
}

mod upload_compensation {
    use super::*;

    #[tokio::test]
    async fn metadata_failure_removes_stored_blob() {
        let app = TestApp::spawn_with(|_| {}, Some(Arc::new(FailingProjectStore))).await;

        let res = app
            .upload(UploadForm::new("Doomed", "", "1").file("doomed.zip", random_bytes(800)))
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.code(), "METADATA_SAVE_FAILED");
        assert!(!res.text.contains("database unavailable"));
        assert_eq!(app.blob_count().await, 0);
    }

    #[tokio::test]
    async fn metadata_failure_keeps_blob_without_compensation() {
        let app = TestApp::spawn_with(
            |c| c.storage.compensate_orphans = false,
            Some(Arc::new(FailingProjectStore)),
        )
        .await;

        let res = app
            .upload(UploadForm::new("Kept", "", "1").file("kept.zip", random_bytes(800)))
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.code(), "METADATA_SAVE_FAILED");
        assert_eq!(app.blob_count().await, 1);
    }

    #[tokio::test]
    async fn rejected_upload_leaves_listing_unchanged() {
        let app = TestApp::spawn().await;
        app.upload_zip("Existing", random_bytes(100)).await;

        let res = app
            .upload(UploadForm::new("Bad", "", "1").file("bad.rar", random_bytes(100)))
            .await;
        assert_eq!(res.status, 400);

        let list = app.get(routes::PROJECTS).await;
        assert_eq!(list.status, 200);
        assert_eq!(list.body.as_array().unwrap().len(), 1);
    }
}

mod upload_timeout {
    use super::*;

    const BOUNDARY: &str = "zipvault-test-boundary";

    /// Send the head of a multipart upload and a few file bytes, then stall
    /// without closing the connection. Returns whatever the server answers.
    async fn stalled_upload(app: &TestApp) -> String {
        let parts = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             Slow\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"slow.zip\"\r\n\
             Content-Type: application/zip\r\n\r\n"
        );
        let content_length = parts.len() + 1024 * 1024;
        let head = format!(
            "POST {} HTTP/1.1\r\n\
             Host: {}\r\n\
             Content-Type: multipart/form-data; boundary={BOUNDARY}\r\n\
             Content-Length: {content_length}\r\n\r\n",
            routes::UPLOAD,
            app.addr
        );

        let mut stream = TcpStream::connect(app.addr).await.unwrap();
        stream.write_all(head.as_bytes()).await.unwrap();
        stream.write_all(parts.as_bytes()).await.unwrap();
        stream.write_all(&random_bytes(600)).await.unwrap();
        stream.flush().await.unwrap();

        let mut response = Vec::new();
        let mut buf = [0u8; 4096];
        let read = async {
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        response.extend_from_slice(&buf[..n]);
                        if String::from_utf8_lossy(&response).contains("UPLOAD_FAILED") {
                            break;
                        }
                    }
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(10), read)
            .await
            .expect("server should answer a stalled upload");

        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn stalled_upload_times_out_and_leaves_nothing() {
        let app = TestApp::spawn_with(|c| c.storage.write_timeout_secs = Some(1), None).await;

        let response = stalled_upload(&app).await;

        assert!(response.starts_with("HTTP/1.1 500"), "{response}");
        assert!(response.contains("UPLOAD_FAILED"), "{response}");
        assert_eq!(app.blob_count().await, 0);
        assert_eq!(app.staging_count(), 0);
        assert_eq!(app.project_count().await, 0);
    }
}
