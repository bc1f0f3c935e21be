use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::GcpConfig;
use crate::firestore::query::StructuredQuery;
use crate::firestore::value::{fields_from_wire, fields_to_wire, FirestoreValue};
use crate::firestore::write::Write;
use crate::firestore::FirestoreError;
use crate::gcp::{ServiceAccountTokens, FIRESTORE_SCOPE};

/// A document fetched from the store: database-relative path plus decoded
/// fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub name: String,
    pub fields: BTreeMap<String, FirestoreValue>,
}

impl Document {
    /// Trailing path segment: the document id.
    pub fn doc_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn field(&self, name: &str) -> Option<&FirestoreValue> {
        self.fields.get(name)
    }

    fn from_wire(raw: &Value) -> Result<Self, FirestoreError> {
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| FirestoreError::Decode("document without a name".to_string()))?;
        let fields = raw
            .get("fields")
            .map(fields_from_wire)
            .unwrap_or_default();
        Ok(Document {
            name: name.to_string(),
            fields,
        })
    }
}

#[derive(Debug, Clone)]
pub enum BatchGetResult {
    Found(Document),
    Missing(String),
}

/// Narrow interface to the document store. The REST implementation talks to
/// Firestore; tests substitute an in-memory implementation.
#[async_trait]
pub trait FirestoreClient: Send + Sync {
    /// Fetch one document, optionally restricted to a field mask.
    /// A missing document is `Ok(None)`, not an error.
    async fn get(
        &self,
        path: &str,
        field_mask: Option<&[&str]>,
    ) -> Result<Option<Document>, FirestoreError>;

    /// Fetch several documents in one round trip. Results come back in
    /// request order; absent documents are reported, not skipped.
    async fn batch_get(
        &self,
        paths: &[String],
        field_mask: Option<&[&str]>,
    ) -> Result<Vec<BatchGetResult>, FirestoreError>;

    /// Run a structured query against a collection under `parent`
    /// (empty string for root collections).
    async fn run_query(
        &self,
        parent: &str,
        query: StructuredQuery,
    ) -> Result<Vec<Document>, FirestoreError>;

    /// Server-side count aggregation, optionally capped at `up_to`.
    async fn count(
        &self,
        parent: &str,
        query: StructuredQuery,
        up_to: Option<i64>,
    ) -> Result<i64, FirestoreError>;

    /// Create a document with the given id; fails if it already exists.
    async fn create_document(
        &self,
        collection_path: &str,
        document_id: &str,
        fields: BTreeMap<String, FirestoreValue>,
    ) -> Result<Document, FirestoreError>;

    /// Apply a set of writes atomically: all succeed or none do.
    async fn batch_write(&self, writes: Vec<Write>) -> Result<(), FirestoreError>;

    /// Start a transaction; reads through it see a consistent snapshot and
    /// the commit fails if the read set was concurrently invalidated.
    async fn begin_transaction(&self) -> Result<String, FirestoreError>;

    async fn get_with_transaction(
        &self,
        path: &str,
        transaction: &str,
    ) -> Result<Option<Document>, FirestoreError>;

    async fn commit(&self, transaction: String, writes: Vec<Write>)
        -> Result<(), FirestoreError>;
}

/// REST implementation over `firestore.googleapis.com` (or the emulator).
pub struct RestFirestoreClient {
    http: reqwest::Client,
    tokens: Arc<ServiceAccountTokens>,
    base_url: String,
    /// `projects/{p}/databases/(default)/documents`
    root: String,
}

impl RestFirestoreClient {
    pub fn new(gcp: &GcpConfig, tokens: Arc<ServiceAccountTokens>) -> Self {
        let base_url = if gcp.use_emulator {
            format!("{}/v1", gcp.firestore_emulator_host.trim_end_matches('/'))
        } else {
            "https://firestore.googleapis.com/v1".to_string()
        };
        Self {
            http: reqwest::Client::new(),
            tokens,
            base_url,
            root: format!("projects/{}/databases/(default)/documents", gcp.project_id),
        }
    }

    async fn bearer(&self) -> Result<String, FirestoreError> {
        self.tokens
            .bearer(FIRESTORE_SCOPE)
            .await
            .map_err(|e| FirestoreError::Token(e.to_string()))
    }

    fn doc_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.root, path)
    }

    fn rpc_url(&self, method: &str) -> String {
        format!("{}/{}:{}", self.base_url, self.root, method)
    }

    fn query_url(&self, parent: &str, method: &str) -> String {
        if parent.is_empty() {
            self.rpc_url(method)
        } else {
            format!("{}/{}/{}:{}", self.base_url, self.root, parent, method)
        }
    }

    async fn decode_or_error(&self, resp: reqwest::Response) -> Result<Value, FirestoreError> {
        let status = resp.status();
        let body: Value = resp.json().await?;
        if status.is_success() {
            return Ok(body);
        }
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        Err(FirestoreError::Status {
            code: status.as_u16(),
            message,
        })
    }

    async fn post_rpc(&self, url: &str, body: Value) -> Result<Value, FirestoreError> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        self.decode_or_error(resp).await
    }

    fn mask_params(field_mask: Option<&[&str]>) -> Vec<(String, String)> {
        field_mask
            .unwrap_or_default()
            .iter()
            .map(|f| ("mask.fieldPaths".to_string(), f.to_string()))
            .collect()
    }

    /// Strip the resource prefix so documents carry database-relative paths.
    fn relative_name(&self, name: &str) -> String {
        name.strip_prefix(&format!("{}/", self.root))
            .unwrap_or(name)
            .to_string()
    }

    fn decode_document(&self, raw: &Value) -> Result<Document, FirestoreError> {
        let mut doc = Document::from_wire(raw)?;
        doc.name = self.relative_name(&doc.name);
        Ok(doc)
    }
}

#[async_trait]
impl FirestoreClient for RestFirestoreClient {
    async fn get(
        &self,
        path: &str,
        field_mask: Option<&[&str]>,
    ) -> Result<Option<Document>, FirestoreError> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .get(self.doc_url(path))
            .bearer_auth(token)
            .query(&Self::mask_params(field_mask))
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = self.decode_or_error(resp).await?;
        Ok(Some(self.decode_document(&body)?))
    }

    async fn batch_get(
        &self,
        paths: &[String],
        field_mask: Option<&[&str]>,
    ) -> Result<Vec<BatchGetResult>, FirestoreError> {
        let full_names: Vec<String> = paths
            .iter()
            .map(|p| format!("{}/{}", self.root, p))
            .collect();
        let mut body = json!({ "documents": full_names });
        if let Some(mask) = field_mask {
            body["mask"] = json!({ "fieldPaths": mask });
        }
        let response = self.post_rpc(&self.rpc_url("batchGet"), body).await?;
        let items = response
            .as_array()
            .ok_or_else(|| FirestoreError::Decode("batchGet: expected an array".to_string()))?;

        // responses can arrive in any order; re-align with the request
        let mut found: BTreeMap<String, Document> = BTreeMap::new();
        let mut missing: Vec<String> = Vec::new();
        for item in items {
            if let Some(raw) = item.get("found") {
                let doc = self.decode_document(raw)?;
                found.insert(doc.name.clone(), doc);
            } else if let Some(name) = item.get("missing").and_then(Value::as_str) {
                missing.push(self.relative_name(name));
            }
        }
        Ok(paths
            .iter()
            .map(|p| match found.remove(p) {
                Some(doc) => BatchGetResult::Found(doc),
                None => BatchGetResult::Missing(p.clone()),
            })
            .collect())
    }

    async fn run_query(
        &self,
        parent: &str,
        query: StructuredQuery,
    ) -> Result<Vec<Document>, FirestoreError> {
        let response = self
            .post_rpc(
                &self.query_url(parent, "runQuery"),
                json!({ "structuredQuery": query.to_wire() }),
            )
            .await?;
        let items = response
            .as_array()
            .ok_or_else(|| FirestoreError::Decode("runQuery: expected an array".to_string()))?;
        items
            .iter()
            .filter_map(|item| item.get("document"))
            .map(|raw| self.decode_document(raw))
            .collect()
    }

    async fn count(
        &self,
        parent: &str,
        query: StructuredQuery,
        up_to: Option<i64>,
    ) -> Result<i64, FirestoreError> {
        let response = self
            .post_rpc(
                &self.query_url(parent, "runAggregationQuery"),
                query.to_count_wire(up_to),
            )
            .await?;
        let raw = &response[0]["result"]["aggregateFields"]["count"];
        match FirestoreValue::from_wire(raw) {
            FirestoreValue::Integer(n) => Ok(n),
            other => Err(FirestoreError::Decode(format!(
                "aggregation count: expected integer, got {:?}",
                other
            ))),
        }
    }

    async fn create_document(
        &self,
        collection_path: &str,
        document_id: &str,
        fields: BTreeMap<String, FirestoreValue>,
    ) -> Result<Document, FirestoreError> {
        let token = self.bearer().await?;
        let url = format!("{}/{}/{}", self.base_url, self.root, collection_path);
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[("documentId", document_id)])
            .json(&json!({ "fields": fields_to_wire(&fields) }))
            .send()
            .await?;
        let body = self.decode_or_error(resp).await?;
        self.decode_document(&body)
    }

    async fn batch_write(&self, writes: Vec<Write>) -> Result<(), FirestoreError> {
        // documents:commit without a transaction applies all writes
        // atomically, unlike documents:batchWrite
        let wire: Vec<Value> = writes.iter().map(|w| w.to_wire(&self.root)).collect();
        self.post_rpc(&self.rpc_url("commit"), json!({ "writes": wire }))
            .await?;
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<String, FirestoreError> {
        let response = self
            .post_rpc(&self.rpc_url("beginTransaction"), json!({}))
            .await?;
        response["transaction"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| FirestoreError::Decode("beginTransaction: missing token".to_string()))
    }

    async fn get_with_transaction(
        &self,
        path: &str,
        transaction: &str,
    ) -> Result<Option<Document>, FirestoreError> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .get(self.doc_url(path))
            .bearer_auth(token)
            .query(&[("transaction", transaction)])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = self.decode_or_error(resp).await?;
        Ok(Some(self.decode_document(&body)?))
    }

    async fn commit(
        &self,
        transaction: String,
        writes: Vec<Write>,
    ) -> Result<(), FirestoreError> {
        let wire: Vec<Value> = writes.iter().map(|w| w.to_wire(&self.root)).collect();
        self.post_rpc(
            &self.rpc_url("commit"),
            json!({ "transaction": transaction, "writes": wire }),
        )
        .await?;
        Ok(())
    }
}
