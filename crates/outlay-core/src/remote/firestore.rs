//! Firestore REST client for the per-user expense collection.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{ExpenseDocument, RemoteError, RemoteResult, RemoteStore};
use crate::identity::UserIdentity;
use crate::models::RemoteId;
use crate::util::{compact_text, is_http_url, normalize_text_option};

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const LIST_PAGE_SIZE: u32 = 300;
const HTTP_TIMEOUT_SECS: u64 = 15;
const GENERATED_ID_LEN: usize = 20;

/// Connection settings for a Firestore project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirestoreConfig {
    pub project_id: String,
    /// REST root, overridable to point at the emulator
    pub base_url: String,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> RemoteResult<Self> {
        let project_id = normalize_text_option(Some(project_id.into())).ok_or_else(|| {
            RemoteError::InvalidConfiguration("project id must not be empty".to_string())
        })?;
        Ok(Self {
            project_id,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Use a different REST root, e.g. `http://localhost:8080/v1` for the emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> RemoteResult<Self> {
        let base_url = normalize_text_option(Some(base_url.into())).ok_or_else(|| {
            RemoteError::InvalidConfiguration("base url must not be empty".to_string())
        })?;
        if !is_http_url(&base_url) {
            return Err(RemoteError::InvalidConfiguration(
                "base url must include http:// or https://".to_string(),
            ));
        }
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    fn collection_url(&self, user: &UserIdentity) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/users/{}/expenses",
            self.base_url,
            urlencoding::encode(&self.project_id),
            urlencoding::encode(user.user_id())
        )
    }

    fn document_url(&self, user: &UserIdentity, remote_id: &RemoteId) -> String {
        format!(
            "{}/{}",
            self.collection_url(user),
            urlencoding::encode(remote_id.as_str())
        )
    }
}

/// [`RemoteStore`] backed by the Firestore REST API.
#[derive(Clone)]
pub struct FirestoreRemoteStore {
    config: FirestoreConfig,
    client: Client,
}

impl FirestoreRemoteStore {
    pub fn new(config: FirestoreConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self { config, client })
    }

    fn authorized(request: RequestBuilder, user: &UserIdentity) -> RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        match user.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(request: RequestBuilder) -> RemoteResult<reqwest::Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(parse_api_error(&body)));
        }
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message: parse_api_error(&body),
        })
    }
}

#[async_trait]
impl RemoteStore for FirestoreRemoteStore {
    async fn fetch_all(
        &self,
        user: &UserIdentity,
    ) -> RemoteResult<Vec<(RemoteId, ExpenseDocument)>> {
        let url = self.config.collection_url(user);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", LIST_PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let request = Self::authorized(self.client.get(&url).query(&query), user);
            let page = Self::send(request)
                .await?
                .json::<ListDocumentsResponse>()
                .await?;

            for document in page.documents {
                documents.push(document.into_expense()?);
            }

            match normalize_text_option(page.next_page_token) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(
            "Fetched {} remote expenses for user {}",
            documents.len(),
            user.user_id()
        );
        Ok(documents)
    }

    async fn create(
        &self,
        user: &UserIdentity,
        document: &ExpenseDocument,
    ) -> RemoteResult<RemoteId> {
        let remote_id = generate_document_id();
        let body = FirestoreDocument::from_expense(&document.clone().with_id(&remote_id));

        let request = Self::authorized(
            self.client
                .post(self.config.collection_url(user))
                .query(&[("documentId", remote_id.as_str())])
                .json(&body),
            user,
        );
        Self::send(request).await?;

        tracing::debug!("Created remote expense {}", remote_id);
        Ok(remote_id)
    }

    async fn update(
        &self,
        user: &UserIdentity,
        remote_id: &RemoteId,
        document: &ExpenseDocument,
    ) -> RemoteResult<()> {
        let body = FirestoreDocument::from_expense(&document.clone().with_id(remote_id));
        let request = Self::authorized(
            self.client
                .patch(self.config.document_url(user, remote_id))
                .query(&[("currentDocument.exists", "true")])
                .json(&body),
            user,
        );
        Self::send(request).await?;
        Ok(())
    }

    async fn delete_by_id(&self, user: &UserIdentity, remote_id: &RemoteId) -> RemoteResult<()> {
        let request = Self::authorized(
            self.client.delete(self.config.document_url(user, remote_id)),
            user,
        );
        Self::send(request).await?;
        Ok(())
    }
}

fn generate_document_id() -> RemoteId {
    let raw = Uuid::new_v4().simple().to_string();
    RemoteId::new(raw.chars().take(GENERATED_ID_LEN).collect::<String>())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FirestoreDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    /// Typed values such as `{"stringValue": "..."}`; int64 travels as a string
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

impl FirestoreDocument {
    fn from_expense(document: &ExpenseDocument) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), json!({ "stringValue": document.id }));
        fields.insert("title".to_string(), json!({ "stringValue": document.title }));
        fields.insert("amount".to_string(), json!({ "doubleValue": document.amount }));
        fields.insert(
            "date".to_string(),
            json!({ "integerValue": document.date.to_string() }),
        );
        fields.insert(
            "category".to_string(),
            json!({ "stringValue": document.category }),
        );
        Self { name: None, fields }
    }

    fn string_field(&self, field: &str) -> Option<String> {
        self.fields
            .get(field)?
            .get("stringValue")?
            .as_str()
            .map(ToString::to_string)
    }

    fn f64_field(&self, field: &str) -> Option<f64> {
        let value = self.fields.get(field)?;
        if let Some(double) = value.get("doubleValue").and_then(Value::as_f64) {
            return Some(double);
        }
        value.get("integerValue")?.as_str()?.parse::<f64>().ok()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn i64_field(&self, field: &str) -> Option<i64> {
        let value = self.fields.get(field)?;
        if let Some(integer) = value.get("integerValue").and_then(Value::as_str) {
            return integer.parse::<i64>().ok();
        }
        let double = value.get("doubleValue")?.as_f64()?;
        double.is_finite().then(|| double.round() as i64)
    }

    fn into_expense(self) -> RemoteResult<(RemoteId, ExpenseDocument)> {
        let name = self.name.as_deref().ok_or_else(|| {
            RemoteError::InvalidPayload("document is missing its resource name".to_string())
        })?;
        let key = name
            .rsplit('/')
            .next()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| RemoteError::InvalidPayload(format!("bad document name '{name}'")))?;
        let remote_id = RemoteId::new(key);

        let document = ExpenseDocument {
            id: self
                .string_field("id")
                .unwrap_or_else(|| key.to_string()),
            title: self.string_field("title").unwrap_or_default(),
            amount: self.f64_field("amount").unwrap_or_default(),
            date: self.i64_field("date").unwrap_or_default(),
            category: self.string_field("category").unwrap_or_default(),
        };

        Ok((remote_id, document))
    }
}

#[derive(Debug, Deserialize)]
struct FirestoreErrorResponse {
    error: Option<FirestoreErrorBody>,
}

#[derive(Debug, Deserialize)]
struct FirestoreErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn parse_api_error(body: &str) -> String {
    if let Ok(FirestoreErrorResponse { error: Some(error) }) =
        serde_json::from_str::<FirestoreErrorResponse>(body)
    {
        match (error.status, error.message) {
            (Some(status), Some(message)) => return format!("{status}: {}", message.trim()),
            (None, Some(message)) => return message.trim().to_string(),
            (Some(status), None) => return status,
            (None, None) => {}
        }
    }

    let compacted = compact_text(body);
    if compacted.is_empty() {
        "empty response body".to_string()
    } else {
        compacted
    }
}
