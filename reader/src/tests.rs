#[cfg(test)]
mod tests {
    use crate::router;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::DateTime;
    use postwatch_core::Record;
    use std::env;
    use store::RecordStore;
    use tower::ServiceExt;

    fn test_store() -> RecordStore {
        RecordStore::new(
            env::temp_dir()
                .join(format!("test_reader_{}", uuid::Uuid::new_v4()))
                .join("tweets.bin"),
        )
    }

    fn record(id: &str) -> Record {
        let time = DateTime::parse_from_rfc3339("2020-08-20T10:00:00+00:00").unwrap();
        Record::new(id, time, format!("post {id}"), "thegrugq")
    }

    async fn get_root(store: RecordStore) -> (StatusCode, serde_json::Value) {
        let response = router(store)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_missing_store_lists_nothing() {
        let (status, body) = get_root(test_store()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_lists_records_in_store_order() {
        let store = test_store();
        store
            .append_all(&[record("a"), record("b"), record("c")])
            .await
            .unwrap();

        let (status, body) = get_root(store).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(body[0]["handle"], "thegrugq");
        assert_eq!(body[0]["message"], "post a");
    }

    #[tokio::test]
    async fn test_sees_records_appended_after_start() {
        let store = test_store();
        let app = router(store.clone());
        store.append(&record("late")).await.unwrap();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_store_is_server_error() {
        // A directory where the file should be cannot be read as a store
        let dir = env::temp_dir().join(format!("test_reader_{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let (status, body) = get_root(RecordStore::new(dir)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["code"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let response = router(test_store())
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
