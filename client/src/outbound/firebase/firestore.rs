//! Reqwest-backed Firestore document store.
//!
//! Reads use the document `GET` endpoint and batches use `documents:commit`,
//! which the backend applies atomically. Requests carry the project API key
//! and, when a session exists, the caller's ID token. A request refused with
//! `401` is retried once after the token source refreshes its ID token.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};

use super::dto::{
    CommitRequestDto, DocumentBodyDto, DocumentDto, ErrorEnvelopeDto, FieldTransformDto, WriteDto,
    encode_fields,
};
use super::{TokenSource, body_preview};
use crate::domain::ports::{
    Document, DocumentPath, DocumentStore, DocumentStoreError, DocumentWrite,
};

/// Public Firestore REST endpoint.
pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";

const DATABASE: &str = "(default)";

/// Document store speaking the Firestore v1 REST protocol.
pub struct FirestoreDocumentStore {
    client: Client,
    endpoint: Url,
    project_id: String,
    api_key: String,
    tokens: Option<Arc<dyn TokenSource>>,
}

impl FirestoreDocumentStore {
    /// Build a store for `project_id` rooted at `endpoint`.
    pub fn new(
        client: Client,
        endpoint: Url,
        project_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint,
            project_id: project_id.into(),
            api_key: api_key.into(),
            tokens: None,
        }
    }

    /// Authenticate requests with ID tokens from `tokens`.
    #[must_use]
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    fn document_name(&self, path: &DocumentPath) -> String {
        format!(
            "projects/{}/databases/{DATABASE}/documents/{}/{}",
            self.project_id,
            path.collection.as_str(),
            path.id.as_ref()
        )
    }

    fn url(&self, tail: &[&str]) -> Result<Url, DocumentStoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DocumentStoreError::query(format!("endpoint {} cannot carry a path", self.endpoint))
            })?
            .pop_if_empty()
            .extend(["v1", "projects", self.project_id.as_str(), "databases", DATABASE])
            .extend(tail);
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn send<F>(&self, build: F) -> Result<Response, DocumentStoreError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let Some(tokens) = self.tokens.as_ref() else {
            return build().send().await.map_err(map_transport_error);
        };
        let Some(token) = tokens.id_token() else {
            return build().send().await.map_err(map_transport_error);
        };

        let response = build()
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_transport_error)?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        match tokens.refresh_id_token().await {
            Some(fresh) => build()
                .bearer_auth(fresh)
                .send()
                .await
                .map_err(map_transport_error),
            None => Ok(response),
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreDocumentStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, DocumentStoreError> {
        let url = self.url(&["documents", path.collection.as_str(), path.id.as_ref()])?;
        let response = self.send(|| self.client.get(url.clone())).await?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let document: DocumentDto = serde_json::from_slice(body.as_ref()).map_err(|error| {
            DocumentStoreError::decode(format!("invalid Firestore document JSON: {error}"))
        })?;
        let fields = document
            .into_plain_fields()
            .map_err(DocumentStoreError::decode)?;
        Ok(Some(Document {
            path: path.clone(),
            fields,
        }))
    }

    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), DocumentStoreError> {
        let request = CommitRequestDto {
            writes: writes
                .into_iter()
                .map(|write| WriteDto {
                    update: DocumentBodyDto {
                        name: self.document_name(&write.path),
                        fields: encode_fields(&write.fields),
                    },
                    update_transforms: write
                        .server_timestamps
                        .into_iter()
                        .map(FieldTransformDto::request_time)
                        .collect(),
                })
                .collect(),
        };
        let url = self.url(&["documents:commit"])?;
        let response = self
            .send(|| self.client.post(url.clone()).json(&request))
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }
}

fn map_transport_error(error: reqwest::Error) -> DocumentStoreError {
    DocumentStoreError::connection(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> DocumentStoreError {
    let reason = ErrorEnvelopeDto::reason(body).unwrap_or_else(|| body_preview(body));
    let message = if reason.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {reason}", status.as_u16())
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DocumentStoreError::permission_denied(message)
        }
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            DocumentStoreError::connection(message)
        }
        _ if status.is_server_error() => DocumentStoreError::connection(message),
        _ => DocumentStoreError::query(message),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the Firestore adapter against a local mock server.
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::domain::{Collection, UserId};
    use rstest::rstest;
    use serde_json::{Map, json};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOC_PATH: &str = "/v1/projects/care-demo/databases/(default)/documents/users/u-1";
    const COMMIT_PATH: &str = "/v1/projects/care-demo/databases/(default)/documents:commit";

    struct StaticToken;

    #[async_trait]
    impl TokenSource for StaticToken {
        fn id_token(&self) -> Option<String> {
            Some("id-token-1".to_owned())
        }

        async fn refresh_id_token(&self) -> Option<String> {
            None
        }
    }

    /// Hands out `id-token-1` until refreshed, then `id-token-2`.
    #[derive(Default)]
    struct RotatingToken {
        refreshed: AtomicBool,
    }

    #[async_trait]
    impl TokenSource for RotatingToken {
        fn id_token(&self) -> Option<String> {
            let token = if self.refreshed.load(Ordering::SeqCst) {
                "id-token-2"
            } else {
                "id-token-1"
            };
            Some(token.to_owned())
        }

        async fn refresh_id_token(&self) -> Option<String> {
            self.refreshed.store(true, Ordering::SeqCst);
            self.id_token()
        }
    }

    fn store(server: &MockServer) -> FirestoreDocumentStore {
        let endpoint = Url::parse(&server.uri()).expect("mock server url");
        FirestoreDocumentStore::new(Client::new(), endpoint, "care-demo", "web-key")
    }

    fn users_path() -> DocumentPath {
        DocumentPath::new(Collection::Users, UserId::new("u-1").expect("valid id"))
    }

    #[tokio::test]
    async fn get_decodes_document_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DOC_PATH))
            .and(query_param("key", "web-key"))
            .and(header("authorization", "Bearer id-token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/care-demo/databases/(default)/documents/users/u-1",
                "fields": {
                    "email": { "stringValue": "ada@example.com" },
                    "userType": { "stringValue": "patient" }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let document = store(&server)
            .with_token_source(Arc::new(StaticToken))
            .get(&users_path())
            .await
            .expect("get succeeds")
            .expect("document exists");
        assert_eq!(document.fields["userType"], json!("patient"));
        assert_eq!(document.path, users_path());
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_the_request_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DOC_PATH))
            .and(header("authorization", "Bearer id-token-1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "code": 401, "status": "UNAUTHENTICATED" }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(DOC_PATH))
            .and(header("authorization", "Bearer id-token-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fields": { "userType": { "stringValue": "caretaker" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let document = store(&server)
            .with_token_source(Arc::new(RotatingToken::default()))
            .get(&users_path())
            .await
            .expect("get succeeds after refresh")
            .expect("document exists");
        assert_eq!(document.fields["userType"], json!("caretaker"));
    }

    #[tokio::test]
    async fn unauthorised_without_a_fresh_token_is_permission_denied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DOC_PATH))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let error = store(&server)
            .with_token_source(Arc::new(StaticToken))
            .get(&users_path())
            .await
            .expect_err("get must fail");
        assert!(matches!(error, DocumentStoreError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn get_maps_not_found_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DOC_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": 404, "message": "Document not found", "status": "NOT_FOUND" }
            })))
            .mount(&server)
            .await;

        let fetched = store(&server).get(&users_path()).await.expect("get succeeds");
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn commit_sends_one_batch_with_server_timestamps() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMMIT_PATH))
            .and(query_param("key", "web-key"))
            .and(body_partial_json(json!({
                "writes": [
                    {
                        "update": {
                            "name": "projects/care-demo/databases/(default)/documents/users/u-1",
                            "fields": { "email": { "stringValue": "ada@example.com" } }
                        },
                        "updateTransforms": [
                            { "fieldPath": "createdAt", "setToServerValue": "REQUEST_TIME" }
                        ]
                    }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "writeResults": [{}],
                "commitTime": "2026-03-01T09:30:00.000000Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut fields = Map::new();
        fields.insert("email".to_owned(), json!("ada@example.com"));
        store(&server)
            .commit(vec![
                DocumentWrite::set(users_path(), fields).with_server_timestamp("createdAt"),
            ])
            .await
            .expect("commit succeeds");
    }

    #[tokio::test]
    async fn undecodable_document_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DOC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let error = store(&server)
            .get(&users_path())
            .await
            .expect_err("decode must fail");
        assert!(matches!(error, DocumentStoreError::Decode { .. }));
    }

    #[rstest]
    #[case::unauthorised(StatusCode::UNAUTHORIZED, "PermissionDenied")]
    #[case::forbidden(StatusCode::FORBIDDEN, "PermissionDenied")]
    #[case::throttled(StatusCode::TOO_MANY_REQUESTS, "Connection")]
    #[case::unavailable(StatusCode::SERVICE_UNAVAILABLE, "Connection")]
    #[case::bad_request(StatusCode::BAD_REQUEST, "Query")]
    fn maps_http_statuses_to_port_errors(#[case] status: StatusCode, #[case] expected: &str) {
        let error = map_status_error(status, br#"{"error":{"message":"denied"}}"#);
        let matched = match expected {
            "PermissionDenied" => matches!(error, DocumentStoreError::PermissionDenied { .. }),
            "Connection" => matches!(error, DocumentStoreError::Connection { .. }),
            "Query" => matches!(error, DocumentStoreError::Query { .. }),
            _ => panic!("unsupported test expectation: {expected}"),
        };
        assert!(matched, "{status} mapped to {error:?}");
        assert!(error.to_string().contains("denied"));
    }
}
