//! Shared test fixtures: in-memory implementations of the two external
//! collaborators, plus claim and document builders.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use clubhub_api::auth::{ClaimsUpdate, OfficerPermission, Role, UserClaims};
use clubhub_api::firestore::{
    BatchGetResult, Document, FieldTransform, FirestoreClient, FirestoreError, FirestoreValue,
    Filter, Precondition, StructuredQuery, Write,
};
use clubhub_api::identity::{IdentityClient, IdentityError, UserRecord};
use clubhub_api::middleware::AuthUser;
use clubhub_api::services::{AttendanceService, MembershipService, SchoolService};

type Fields = BTreeMap<String, FirestoreValue>;

// ---------------------------------------------------------------------------
// In-memory document store

#[derive(Default)]
pub struct MemoryFirestore {
    docs: Mutex<BTreeMap<String, Fields>>,
    txn_counter: AtomicU64,
}

impl MemoryFirestore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn insert_doc(&self, path: &str, fields: Fields) {
        self.docs.lock().await.insert(path.to_string(), fields);
    }

    pub async fn doc(&self, path: &str) -> Option<Fields> {
        self.docs.lock().await.get(path).cloned()
    }

    /// One field of one document, for assertions.
    pub async fn field(&self, path: &str, name: &str) -> Option<FirestoreValue> {
        self.doc(path).await.and_then(|fields| fields.get(name).cloned())
    }

    fn collection_members(
        docs: &BTreeMap<String, Fields>,
        parent: &str,
        collection: &str,
    ) -> Vec<(String, Fields)> {
        let prefix = if parent.is_empty() {
            format!("{}/", collection)
        } else {
            format!("{}/{}/", parent, collection)
        };
        docs.iter()
            .filter(|(path, _)| {
                path.starts_with(&prefix) && !path[prefix.len()..].contains('/')
            })
            .map(|(path, fields)| (path.clone(), fields.clone()))
            .collect()
    }

    fn matches(fields: &Fields, filter: &Filter) -> bool {
        match filter {
            Filter::Equal(field, value) => fields.get(field) == Some(value),
            Filter::GreaterThanOrEqual(field, value) => fields
                .get(field)
                .and_then(|actual| value_cmp(actual, value))
                .map(|ord| ord != std::cmp::Ordering::Less)
                .unwrap_or(false),
            Filter::LessThanOrEqual(field, value) => fields
                .get(field)
                .and_then(|actual| value_cmp(actual, value))
                .map(|ord| ord != std::cmp::Ordering::Greater)
                .unwrap_or(false),
            Filter::ArrayContains(field, value) => fields
                .get(field)
                .and_then(FirestoreValue::as_array)
                .map(|items| items.contains(value))
                .unwrap_or(false),
            Filter::And(filters) => filters.iter().all(|f| Self::matches(fields, f)),
        }
    }

    fn query_docs(
        docs: &BTreeMap<String, Fields>,
        parent: &str,
        query: &StructuredQuery,
    ) -> Vec<(String, Fields)> {
        Self::collection_members(docs, parent, &query.collection)
            .into_iter()
            .filter(|(_, fields)| {
                query
                    .filter
                    .as_ref()
                    .map(|f| Self::matches(fields, f))
                    .unwrap_or(true)
            })
            .collect()
    }

    fn apply_transform(fields: &mut Fields, transform: &FieldTransform) {
        match transform {
            FieldTransform::ArrayUnion {
                field_path,
                elements,
            } => {
                let entry = fields
                    .entry(field_path.clone())
                    .or_insert_with(|| FirestoreValue::Array(Vec::new()));
                if let FirestoreValue::Array(items) = entry {
                    for element in elements {
                        if !items.contains(element) {
                            items.push(element.clone());
                        }
                    }
                }
            }
            FieldTransform::ArrayRemove {
                field_path,
                elements,
            } => {
                if let Some(FirestoreValue::Array(items)) = fields.get_mut(field_path) {
                    items.retain(|item| !elements.contains(item));
                }
            }
            FieldTransform::Increment { field_path, amount } => {
                let current = fields
                    .get(field_path)
                    .and_then(FirestoreValue::as_i64)
                    .unwrap_or(0);
                fields.insert(
                    field_path.clone(),
                    FirestoreValue::Integer(current + amount),
                );
            }
        }
    }

    fn apply_writes(
        docs: &mut BTreeMap<String, Fields>,
        writes: &[Write],
    ) -> Result<(), FirestoreError> {
        // validate preconditions before touching anything - the batch is
        // atomic
        for write in writes {
            if let Write::Update {
                document,
                precondition: Some(Precondition::Exists(expected)),
                ..
            } = write
            {
                if docs.contains_key(document) != *expected {
                    return Err(FirestoreError::Status {
                        code: 409,
                        message: format!("precondition failed for {}", document),
                    });
                }
            }
        }

        for write in writes {
            match write {
                Write::Transform {
                    document,
                    transforms,
                } => {
                    let fields = docs.entry(document.clone()).or_default();
                    for transform in transforms {
                        Self::apply_transform(fields, transform);
                    }
                }
                Write::Update {
                    document,
                    fields,
                    update_mask,
                    update_transforms,
                    ..
                } => {
                    let entry = docs.entry(document.clone()).or_default();
                    match update_mask {
                        Some(mask) => {
                            for field in mask {
                                match fields.get(field) {
                                    Some(value) => {
                                        entry.insert(field.clone(), value.clone());
                                    }
                                    None => {
                                        entry.remove(field);
                                    }
                                }
                            }
                        }
                        None => *entry = fields.clone(),
                    }
                    for transform in update_transforms {
                        Self::apply_transform(entry, transform);
                    }
                }
            }
        }
        Ok(())
    }
}

fn value_cmp(a: &FirestoreValue, b: &FirestoreValue) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (FirestoreValue::String(x), FirestoreValue::String(y)) => Some(x.cmp(y)),
        (FirestoreValue::Integer(x), FirestoreValue::Integer(y)) => Some(x.cmp(y)),
        (FirestoreValue::Timestamp(x), FirestoreValue::Timestamp(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[async_trait]
impl FirestoreClient for MemoryFirestore {
    async fn get(
        &self,
        path: &str,
        _field_mask: Option<&[&str]>,
    ) -> Result<Option<Document>, FirestoreError> {
        Ok(self.docs.lock().await.get(path).map(|fields| Document {
            name: path.to_string(),
            fields: fields.clone(),
        }))
    }

    async fn batch_get(
        &self,
        paths: &[String],
        _field_mask: Option<&[&str]>,
    ) -> Result<Vec<BatchGetResult>, FirestoreError> {
        let docs = self.docs.lock().await;
        Ok(paths
            .iter()
            .map(|path| match docs.get(path) {
                Some(fields) => BatchGetResult::Found(Document {
                    name: path.clone(),
                    fields: fields.clone(),
                }),
                None => BatchGetResult::Missing(path.clone()),
            })
            .collect())
    }

    async fn run_query(
        &self,
        parent: &str,
        query: StructuredQuery,
    ) -> Result<Vec<Document>, FirestoreError> {
        let docs = self.docs.lock().await;
        Ok(Self::query_docs(&docs, parent, &query)
            .into_iter()
            .map(|(name, fields)| Document { name, fields })
            .collect())
    }

    async fn count(
        &self,
        parent: &str,
        query: StructuredQuery,
        up_to: Option<i64>,
    ) -> Result<i64, FirestoreError> {
        let docs = self.docs.lock().await;
        let count = Self::query_docs(&docs, parent, &query).len() as i64;
        Ok(match up_to {
            Some(cap) => count.min(cap),
            None => count,
        })
    }

    async fn create_document(
        &self,
        collection_path: &str,
        document_id: &str,
        fields: Fields,
    ) -> Result<Document, FirestoreError> {
        let path = format!("{}/{}", collection_path, document_id);
        let mut docs = self.docs.lock().await;
        if docs.contains_key(&path) {
            return Err(FirestoreError::Status {
                code: 409,
                message: format!("document already exists: {}", path),
            });
        }
        docs.insert(path.clone(), fields.clone());
        Ok(Document { name: path, fields })
    }

    async fn batch_write(&self, writes: Vec<Write>) -> Result<(), FirestoreError> {
        let mut docs = self.docs.lock().await;
        Self::apply_writes(&mut docs, &writes)
    }

    async fn begin_transaction(&self) -> Result<String, FirestoreError> {
        let id = self.txn_counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("txn-{}", id))
    }

    async fn get_with_transaction(
        &self,
        path: &str,
        _transaction: &str,
    ) -> Result<Option<Document>, FirestoreError> {
        self.get(path, None).await
    }

    async fn commit(
        &self,
        _transaction: String,
        writes: Vec<Write>,
    ) -> Result<(), FirestoreError> {
        let mut docs = self.docs.lock().await;
        Self::apply_writes(&mut docs, &writes)
    }
}

// ---------------------------------------------------------------------------
// In-memory identity provider

#[derive(Default)]
pub struct MemoryIdentity {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl MemoryIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn add_user(&self, record: UserRecord) {
        self.users
            .lock()
            .await
            .insert(record.user_id.clone(), record);
    }

    /// Current stored claims, for assertions.
    pub async fn claims_of(&self, user_id: &str) -> UserClaims {
        self.users
            .lock()
            .await
            .get(user_id)
            .map(|u| u.claims.clone())
            .expect("unknown test user")
    }
}

#[async_trait]
impl IdentityClient for MemoryIdentity {
    async fn verify_bearer_token(&self, token: &str) -> Result<UserRecord, IdentityError> {
        // test tokens are just user ids
        self.users
            .lock()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| IdentityError::InvalidToken("unknown account".to_string()))
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Option<UserRecord>, IdentityError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn lookup_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserRecord>, IdentityError> {
        let users = self.users.lock().await;
        Ok(emails
            .iter()
            .filter_map(|email| users.values().find(|u| &u.email == email).cloned())
            .collect())
    }

    async fn update_claims(
        &self,
        user_id: &str,
        prior: &UserClaims,
        update: &ClaimsUpdate,
    ) -> Result<UserClaims, IdentityError> {
        // mirrors the real provider: the full merged object replaces the
        // stored attributes wholesale
        let merged = update.merged(prior);
        let mut users = self.users.lock().await;
        let record = users.get_mut(user_id).ok_or_else(|| IdentityError::Status {
            code: 404,
            message: format!("no account {}", user_id),
        })?;
        record.claims = merged.clone();
        Ok(merged)
    }
}

// ---------------------------------------------------------------------------
// Builders

pub struct TestEnv {
    pub firestore: Arc<MemoryFirestore>,
    pub identity: Arc<MemoryIdentity>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            firestore: MemoryFirestore::new(),
            identity: MemoryIdentity::new(),
        }
    }

    pub fn membership(&self) -> MembershipService {
        MembershipService::new(self.firestore.clone(), self.identity.clone())
    }

    pub fn attendance(&self) -> AttendanceService {
        AttendanceService::new(self.firestore.clone())
    }

    pub fn school(&self) -> SchoolService {
        SchoolService::new(self.firestore.clone(), self.identity.clone())
    }
}

pub fn user_record(user_id: &str, email: &str, claims: UserClaims) -> UserRecord {
    UserRecord {
        user_id: user_id.to_string(),
        email: email.to_string(),
        email_verified: true,
        display_name: None,
        photo_url: None,
        claims,
    }
}

pub fn auth_user(record: &UserRecord) -> AuthUser {
    AuthUser {
        user_id: record.user_id.clone(),
        email: record.email.clone(),
        email_verified: record.email_verified,
        claims: record.claims.clone(),
    }
}

/// Caller context with claims re-read from the identity store, the way a
/// fresh request would see them.
pub async fn fresh_auth(identity: &MemoryIdentity, record: &UserRecord) -> AuthUser {
    let mut user = auth_user(record);
    user.claims = identity.claims_of(&record.user_id).await;
    user
}

pub fn member_claims(school: &str, clubs: &[&str]) -> UserClaims {
    UserClaims {
        school: Some(school.to_string()),
        member_of: clubs.iter().map(|c| c.to_string()).collect(),
        ..UserClaims::default()
    }
}

pub fn officer_claims(school: &str, club: &str, permissions: OfficerPermission) -> UserClaims {
    let mut claims = member_claims(school, &[club]);
    claims.officer_of.insert(club.to_string(), permissions);
    claims
}

pub fn admin_claims(school: &str, role: Role) -> UserClaims {
    UserClaims {
        school: Some(school.to_string()),
        role,
        ..UserClaims::default()
    }
}

// ---------------------------------------------------------------------------
// Document seeds

fn officer_entry_value(name: &str, permissions: OfficerPermission) -> FirestoreValue {
    FirestoreValue::Map(BTreeMap::from([
        ("name".to_string(), FirestoreValue::from(name)),
        ("role".to_string(), FirestoreValue::from("Officer")),
        (
            "permissions".to_string(),
            FirestoreValue::Integer(permissions.bits() as i64),
        ),
    ]))
}

/// Seed a club's public and private documents.
pub async fn seed_club(
    firestore: &MemoryFirestore,
    school: &str,
    club: &str,
    signup_type: i64,
    officers: &[(&str, OfficerPermission)],
    members: &[&str],
) {
    let officer_map: BTreeMap<String, FirestoreValue> = officers
        .iter()
        .map(|(email, permissions)| {
            (email.to_string(), officer_entry_value(email, *permissions))
        })
        .collect();

    firestore
        .insert_doc(
            &format!("schools/{}/clubs/{}", school, club),
            BTreeMap::from([
                ("name".to_string(), FirestoreValue::from(club)),
                (
                    "signup".to_string(),
                    FirestoreValue::Map(BTreeMap::from([(
                        "type".to_string(),
                        FirestoreValue::Integer(signup_type),
                    )])),
                ),
                ("officers".to_string(), FirestoreValue::Map(officer_map)),
                (
                    "numMembers".to_string(),
                    FirestoreValue::Integer(members.len() as i64),
                ),
            ]),
        )
        .await;

    firestore
        .insert_doc(
            &format!("schools/{}/clubs_private/{}", school, club),
            BTreeMap::from([
                (
                    "members".to_string(),
                    FirestoreValue::string_array(members.iter().copied()),
                ),
                ("totalAttendance".to_string(), FirestoreValue::Integer(0)),
            ]),
        )
        .await;
}

/// Seed a school document.
pub async fn seed_school(
    firestore: &MemoryFirestore,
    school_id: &str,
    name: &str,
    domain_restriction: Option<&[&str]>,
    owner: &str,
    admins: &[&str],
    members: &[&str],
) {
    let mut fields = BTreeMap::from([
        ("name".to_string(), FirestoreValue::from(name)),
        (
            "nameLowercase".to_string(),
            FirestoreValue::from(name.to_lowercase()),
        ),
        (
            "website".to_string(),
            FirestoreValue::from(format!("https://{}.example.com/", school_id)),
        ),
        ("owner".to_string(), FirestoreValue::from(owner)),
        (
            "admins".to_string(),
            FirestoreValue::string_array(admins.iter().copied()),
        ),
        (
            "members".to_string(),
            FirestoreValue::string_array(members.iter().copied()),
        ),
    ]);
    if let Some(domains) = domain_restriction {
        fields.insert(
            "domainRestriction".to_string(),
            FirestoreValue::string_array(domains.iter().copied()),
        );
    }
    firestore
        .insert_doc(&format!("schools/{}", school_id), fields)
        .await;
}

/// Seed a meeting attendance document.
pub async fn seed_attendance(
    firestore: &MemoryFirestore,
    school: &str,
    club: &str,
    meeting: &str,
    code: &str,
    present: &[&str],
) {
    firestore
        .insert_doc(
            &format!(
                "schools/{}/clubs/{}/meeting_attendance/{}",
                school, club, meeting
            ),
            BTreeMap::from([
                ("code".to_string(), FirestoreValue::from(code)),
                (
                    "membersPresent".to_string(),
                    FirestoreValue::string_array(present.iter().copied()),
                ),
            ]),
        )
        .await;
}
