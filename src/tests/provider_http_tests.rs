#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode, Uri},
        response::{IntoResponse, Response},
        Json, Router,
    };
    use serde_json::json;

    use crate::config::AppConfig;
    use crate::provider::{DriveProvider, EntryKind, FailureKind, HttpDriveClient};

    #[derive(Debug, Clone)]
    struct Seen {
        path: String,
        query: HashMap<String, String>,
        auth: Option<String>,
    }

    type Log = Arc<Mutex<Vec<Seen>>>;

    fn ok(result: serde_json::Value) -> Response {
        Json(json!({
            "header": { "isSuccessful": true, "resultCode": 0, "resultMessage": "" },
            "result": result,
        }))
        .into_response()
    }

    // Stand-in for the remote drive API under /drive/v1
    async fn fake_api(State(log): State<Log>, uri: Uri, headers: HeaderMap) -> Response {
        let query: HashMap<String, String> = uri
            .query()
            .map(|q| {
                q.split('&')
                    .filter_map(|kv| kv.split_once('='))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
        log.lock().unwrap().push(Seen { path: uri.path().to_string(), query: query.clone(), auth: auth.clone() });

        if auth.as_deref() != Some("dooray-api good-token") {
            return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
        }

        let path = uri.path().trim_start_matches("/drive/v1");
        match path {
            "/drives" => ok(json!([{ "id": "D1", "name": "Private" }])),
            "/drives/D1/files" => match (query.get("type").map(String::as_str), query.get("parentId")) {
                (Some("folder"), None) => ok(json!([{ "id": "A", "name": "Folder A", "hasFolders": false }])),
                (None, Some(parent)) if parent == "A" => ok(json!([
                    { "id": "f1", "name": "notes.txt", "type": "file" },
                    { "id": "X", "name": "Nested", "type": "folder" },
                ])),
                _ => ok(json!(null)),
            },
            "/drives/BAD/files" => (StatusCode::OK, "<html>not json</html>").into_response(),
            "/drives/REJ/files" => Json(json!({
                "header": { "isSuccessful": false, "resultCode": -100, "resultMessage": "drive is locked" },
                "result": null,
            }))
            .into_response(),
            "/drives/ODD/files" => ok(json!([{ "id": "s1", "name": "link", "type": "shortcut" }])),
            "/drives/ARR/files" => Json(json!([1, 2, 3])).into_response(),
            "/drives/BIG/files" => {
                let folders: Vec<_> =
                    (0..200).map(|i| json!({ "id": format!("F{}", i), "name": "padding", "hasFolders": false })).collect();
                ok(json!(folders))
            }
            _ => (StatusCode::NOT_FOUND, "no such endpoint").into_response(),
        }
    }

    async fn start_fake_api() -> (HttpDriveClient, Log) {
        start_fake_api_with(AppConfig::default().provider.max_response_bytes).await
    }

    async fn start_fake_api_with(max_response_bytes: usize) -> (HttpDriveClient, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(fake_api).with_state(log.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut cfg = AppConfig::default().provider;
        cfg.base_url = format!("http://{}/drive/v1", addr);
        cfg.max_response_bytes = max_response_bytes;
        (HttpDriveClient::new(&cfg).unwrap(), log)
    }

    #[tokio::test]
    async fn test_list_drives_sends_auth_and_type() {
        let (client, log) = start_fake_api().await;
        let drives = client.list_drives("good-token").await.unwrap();
        assert_eq!(drives.len(), 1);
        assert_eq!(drives[0].id, "D1");
        assert_eq!(drives[0].name, "Private");

        let seen = log.lock().unwrap()[0].clone();
        assert_eq!(seen.path, "/drive/v1/drives");
        assert_eq!(seen.query.get("type").map(String::as_str), Some("private"));
        assert_eq!(seen.auth.as_deref(), Some("dooray-api good-token"));
    }

    #[tokio::test]
    async fn test_root_folders_have_no_parent_param() {
        let (client, log) = start_fake_api().await;
        let folders = client.list_folders("good-token", "D1", None).await.unwrap();
        assert_eq!(folders.len(), 1);
        assert!(!folders[0].has_folders);

        let seen = log.lock().unwrap()[0].clone();
        assert_eq!(seen.query.get("type").map(String::as_str), Some("folder"));
        assert!(!seen.query.contains_key("parentId"));
    }

    #[tokio::test]
    async fn test_null_result_is_empty_listing() {
        let (client, _) = start_fake_api().await;
        let folders = client.list_folders("good-token", "D1", Some("A")).await.unwrap();
        assert!(folders.is_empty());
    }

    #[tokio::test]
    async fn test_children_keep_entry_kinds() {
        let (client, _) = start_fake_api().await;
        let entries = client.list_children("good-token", "D1", "A").await.unwrap();
        let kinds: Vec<EntryKind> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntryKind::File, EntryKind::Folder]);
    }

    #[tokio::test]
    async fn test_unauthorized_is_status_failure() {
        let (client, _) = start_fake_api().await;
        let err = client.list_drives("bad-token").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Status);
        assert_eq!(err.status, Some(401));
        assert!(err.is_auth_failure());
        assert_eq!(err.message, "invalid token");
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_failure() {
        let (client, _) = start_fake_api().await;
        let err = client.list_children("good-token", "BAD", "A").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Decode);
        assert_eq!(err.status, None);
    }

    #[tokio::test]
    async fn test_non_object_body_is_decode_failure() {
        let (client, _) = start_fake_api().await;
        let err = client.list_children("good-token", "ARR", "A").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Decode);
        assert!(err.message.contains("an array"));
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_is_rejected() {
        let (client, _) = start_fake_api().await;
        let err = client.list_folders("good-token", "REJ", None).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Rejected);
        assert!(err.message.contains("drive is locked"));
    }

    #[tokio::test]
    async fn test_unknown_entry_type_is_decode_failure() {
        let (client, _) = start_fake_api().await;
        let err = client.list_children("good-token", "ODD", "root").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Decode);
    }

    #[tokio::test]
    async fn test_get_json_returns_raw_object() {
        let (client, _) = start_fake_api().await;
        let body = client.get_json(&["drives"], &[("type", "private")], "good-token").await.unwrap();
        assert_eq!(body["header"]["isSuccessful"], json!(true));
        assert!(body["result"].is_array());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_failure() {
        let mut cfg = AppConfig::default().provider;
        // port 9 (discard) is closed on test hosts
        cfg.base_url = "http://127.0.0.1:9/drive/v1".to_string();
        let client = HttpDriveClient::new(&cfg).unwrap();
        let err = client.list_drives("good-token").await.unwrap_err();
        assert!(matches!(err.kind, FailureKind::Transport | FailureKind::Timeout));
    }

    #[tokio::test]
    async fn test_oversized_body_is_decode_failure() {
        let (client, _) = start_fake_api_with(1024).await;
        let err = client.list_folders("good-token", "BIG", None).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Decode);
        assert!(err.to_string().contains("exceeds 1024 bytes"));

        // same listing fits under the default cap
        let (client, _) = start_fake_api().await;
        assert_eq!(client.list_folders("good-token", "BIG", None).await.unwrap().len(), 200);
    }
}
