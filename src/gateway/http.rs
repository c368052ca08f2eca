//! HTTP client for the scores API
//!
//! Production implementation of [`ScoresApi`] over reqwest. Uses a shared
//! `reqwest::Client` for connection pooling; the base URL is configurable so
//! tests can point it at a local mock server.

use crate::gateway::remote::{ApiRequest, Page, PageCursor, RemoteError, ScoresApi};
use async_trait::async_trait;
use serde_json::Value;

/// Query parameter name carrying the pagination cursor.
const CURSOR_PARAM: &str = "cursor";

/// reqwest-backed scores API client.
pub struct HttpScoresApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScoresApi {
    /// Create a client against `base_url` (no trailing slash required).
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }
}

#[async_trait]
impl ScoresApi for HttpScoresApi {
    async fn invoke(
        &self,
        request: &ApiRequest,
        cursor: Option<&PageCursor>,
    ) -> Result<Page, RemoteError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut query = request.params.clone();
        if let Some(cursor) = cursor {
            query.push((CURSOR_PARAM.to_string(), cursor.clone()));
        }

        tracing::debug!(
            path = %request.path,
            has_cursor = cursor.is_some(),
            "calling scores API"
        );

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("failed to send request: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            tracing::error!(
                status = status.as_u16(),
                body = %body,
                "scores API returned error status"
            );
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(format!("failed to read response body: {e}")))?;

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| RemoteError::Decode(format!("{e} - body: {body}")))?;

        Ok(page_from_value(value))
    }
}

/// Normalize a response body into a [`Page`].
///
/// Collection responses are objects with an `items` array plus paging
/// fields; anything else is a single resource and becomes a one-item page.
fn page_from_value(value: Value) -> Page {
    match value {
        Value::Object(ref obj) if obj.contains_key("items") => Page {
            items: obj
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            total: obj.get("total").and_then(Value::as_u64),
            next_cursor: obj
                .get("cursor")
                .and_then(Value::as_str)
                .map(str::to_string),
            error: obj.get("error").and_then(Value::as_str).map(str::to_string),
        },
        other => Page {
            items: vec![other],
            total: None,
            next_cursor: None,
            error: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    fn api_for(server: &Server) -> HttpScoresApi {
        HttpScoresApi::new(reqwest::Client::new(), server.url())
    }

    #[tokio::test]
    #[serial]
    async fn single_resource_becomes_one_item_page() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/players/7/tracks/42/best")
            .with_status(200)
            .with_body(r#"{"rank": "S", "score": 973210}"#)
            .create_async()
            .await;

        let api = api_for(&server);
        let page = api
            .invoke(&ApiRequest::best_score(7, 42), None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0]["rank"], "S");
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn not_found_is_a_typed_outcome() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/players/7/tracks/42/best")
            .with_status(404)
            .with_body(r#"{"error": "no such score"}"#)
            .create_async()
            .await;

        let api = api_for(&server);
        let err = api
            .invoke(&ApiRequest::best_score(7, 42), None)
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, RemoteError::NotFound));
    }

    #[tokio::test]
    #[serial]
    async fn server_error_propagates_status_and_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/players/7")
            .with_status(500)
            .with_body("internal failure")
            .create_async()
            .await;

        let api = api_for(&server);
        let err = api.invoke(&ApiRequest::player(7), None).await.unwrap_err();

        mock.assert_async().await;
        match err {
            RemoteError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal failure");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    #[serial]
    async fn invalid_json_is_a_decode_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/players/7")
            .with_status(200)
            .with_body("this is not JSON")
            .create_async()
            .await;

        let api = api_for(&server);
        let err = api.invoke(&ApiRequest::player(7), None).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, RemoteError::Decode(_)));
    }

    #[tokio::test]
    #[serial]
    async fn collection_page_parses_cursor_and_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/tracks/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "ranked<2019".into()),
                Matcher::UrlEncoded("cursor".into(), "abc".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{
                    "items": [{"id": 1}, {"id": 2}],
                    "total": 90,
                    "cursor": "def",
                    "error": null
                }"#,
            )
            .create_async()
            .await;

        let api = api_for(&server);
        let cursor = "abc".to_string();
        let page = api
            .invoke(&ApiRequest::track_search("ranked<2019"), Some(&cursor))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, Some(90));
        assert_eq!(page.next_cursor.as_deref(), Some("def"));
        assert!(page.error.is_none());
    }
}
