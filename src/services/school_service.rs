//! School lifecycle: creation, joining, admin management, search.

use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::auth::{guard, ClaimsUpdate, Role};
use crate::error::ApiError;
use crate::firestore::{
    paths, FieldTransform, Filter, FirestoreClient, FirestoreValue, StructuredQuery, Write,
};
use crate::identity::{IdentityClient, UserRecord};
use crate::middleware::AuthUser;
use crate::types::SchoolSummary;

const OWNER_GATE_MESSAGE: &str = "You must be the school owner to modify school admins";

pub struct SchoolService {
    firestore: Arc<dyn FirestoreClient>,
    identity: Arc<dyn IdentityClient>,
}

impl SchoolService {
    pub fn new(firestore: Arc<dyn FirestoreClient>, identity: Arc<dyn IdentityClient>) -> Self {
        Self {
            firestore,
            identity,
        }
    }

    /// Create a school and make the caller its owner.
    ///
    /// The website is canonicalized before both the uniqueness check and
    /// storage, so spelling variants of the same URL cannot create
    /// duplicate schools. Uniqueness is a capped count aggregation - the
    /// store has no native unique constraint to lean on.
    pub async fn create(
        &self,
        actor: &AuthUser,
        name: &str,
        domain_restriction: Option<Vec<String>>,
        website: &str,
    ) -> Result<String, ApiError> {
        // one school per account
        if actor.claims.school.is_some() {
            return Err(ApiError::forbidden("You are already a member of a school"));
        }

        let canonical = Url::parse(website)
            .map_err(|_| ApiError::bad_request("Invalid website URL"))?
            .to_string();

        let existing = self
            .firestore
            .count(
                "",
                StructuredQuery::new(paths::SCHOOLS)
                    .filter(Filter::equal("website", canonical.as_str())),
                Some(1),
            )
            .await?;
        if existing > 0 {
            return Err(ApiError::conflict(
                "A school with this website already exists",
            ));
        }

        let school_id = Uuid::new_v4().simple().to_string();
        let mut fields = BTreeMap::from([
            ("name".to_string(), FirestoreValue::from(name)),
            (
                "nameLowercase".to_string(),
                FirestoreValue::from(name.to_lowercase()),
            ),
            ("website".to_string(), FirestoreValue::from(canonical)),
            ("owner".to_string(), FirestoreValue::from(actor.email.as_str())),
            ("admins".to_string(), FirestoreValue::Array(Vec::new())),
            ("members".to_string(), FirestoreValue::Array(Vec::new())),
        ]);
        if let Some(domains) = domain_restriction {
            fields.insert(
                "domainRestriction".to_string(),
                FirestoreValue::string_array(domains),
            );
        }
        self.firestore
            .create_document(paths::SCHOOLS, &school_id, fields)
            .await?;

        self.identity
            .update_claims(
                &actor.user_id,
                &actor.claims,
                &ClaimsUpdate::school(school_id.as_str()).with_role(Role::Owner),
            )
            .await?;

        Ok(school_id)
    }

    /// Join an existing school, subject to its email-domain allow list.
    /// The members union is idempotent, so a retried join is harmless.
    pub async fn join(&self, actor: &AuthUser, school_id: &str) -> Result<(), ApiError> {
        let school = self
            .firestore
            .get(&paths::school(school_id), None)
            .await?
            .ok_or_else(|| ApiError::not_found("School not found"))?;

        if let Some(domains) = school
            .field("domainRestriction")
            .and_then(FirestoreValue::as_array)
        {
            let domain = actor.email_domain().unwrap_or_default();
            if !domains.iter().any(|d| d.as_str() == Some(domain)) {
                return Err(ApiError::forbidden(format!(
                    "You are not allowed to join this school ({} is not an allowed email domain)",
                    domain
                )));
            }
        }

        self.firestore
            .batch_write(vec![Write::transform(
                paths::school(school_id),
                vec![FieldTransform::array_union(
                    "members",
                    vec![FirestoreValue::from(actor.email.as_str())],
                )],
            )])
            .await?;

        self.identity
            .update_claims(&actor.user_id, &actor.claims, &ClaimsUpdate::school(school_id))
            .await?;

        Ok(())
    }

    /// Prefix search over school names, restricted to schools whose domain
    /// allow list admits the caller's email domain.
    pub async fn search(&self, actor: &AuthUser, query: &str) -> Result<Vec<SchoolSummary>, ApiError> {
        let needle = query.to_lowercase();
        let docs = self
            .firestore
            .run_query(
                "",
                StructuredQuery::new(paths::SCHOOLS)
                    .select(["name", "domainRestriction", "website"])
                    .filter(Filter::prefix("nameLowercase", &needle)),
            )
            .await?;

        let domain = actor.email_domain().unwrap_or_default();
        Ok(docs
            .into_iter()
            .filter(|doc| {
                match doc
                    .field("domainRestriction")
                    .and_then(FirestoreValue::as_array)
                {
                    Some(domains) => domains.iter().any(|d| d.as_str() == Some(domain)),
                    None => true,
                }
            })
            .map(|doc| SchoolSummary {
                id: doc.doc_id().to_string(),
                name: doc
                    .field("name")
                    .and_then(FirestoreValue::as_str)
                    .unwrap_or_default()
                    .to_string(),
                website: doc
                    .field("website")
                    .and_then(FirestoreValue::as_str)
                    .map(str::to_string),
            })
            .collect())
    }

    /// Resolve an admin-operation target. Unknown accounts and accounts in
    /// another school are both NOT_FOUND, so school rosters cannot be
    /// enumerated by probing.
    async fn resolve_school_member(
        &self,
        actor: &AuthUser,
        email: &str,
    ) -> Result<UserRecord, ApiError> {
        let school = actor.school()?;
        match self.identity.lookup_by_email(email).await? {
            Some(user) if user.claims.school.as_deref() == Some(school) => Ok(user),
            _ => Err(ApiError::not_found("This user does not exist")),
        }
    }

    pub async fn add_admin(&self, actor: &AuthUser, admin_email: &str) -> Result<(), ApiError> {
        guard::require_owner(&actor.claims, OWNER_GATE_MESSAGE)?;
        let school = actor.school()?;
        let target = self.resolve_school_member(actor, admin_email).await?;

        self.identity
            .update_claims(&target.user_id, &target.claims, &ClaimsUpdate::role(Role::Admin))
            .await?;
        self.firestore
            .batch_write(vec![Write::transform(
                paths::school(school),
                vec![FieldTransform::array_union(
                    "admins",
                    vec![FirestoreValue::from(admin_email)],
                )],
            )])
            .await?;
        Ok(())
    }

    pub async fn remove_admin(&self, actor: &AuthUser, admin_email: &str) -> Result<(), ApiError> {
        guard::require_owner(&actor.claims, OWNER_GATE_MESSAGE)?;
        let school = actor.school()?;
        let target = self.resolve_school_member(actor, admin_email).await?;

        self.identity
            .update_claims(&target.user_id, &target.claims, &ClaimsUpdate::role(Role::None))
            .await?;
        self.firestore
            .batch_write(vec![Write::transform(
                paths::school(school),
                vec![FieldTransform::array_remove(
                    "admins",
                    vec![FirestoreValue::from(admin_email)],
                )],
            )])
            .await?;
        Ok(())
    }

    /// Hand the school to another member. The new owner's role is set
    /// first, then the old owner demotes to admin; the `owner` scalar and
    /// both `admins` array edits land in one atomic write so the document
    /// never shows a half-swapped state.
    pub async fn transfer_ownership(
        &self,
        actor: &AuthUser,
        admin_email: &str,
    ) -> Result<(), ApiError> {
        guard::require_owner(&actor.claims, OWNER_GATE_MESSAGE)?;
        let school = actor.school()?;
        let target = self.resolve_school_member(actor, admin_email).await?;

        self.identity
            .update_claims(&target.user_id, &target.claims, &ClaimsUpdate::role(Role::Owner))
            .await?;
        self.identity
            .update_claims(&actor.user_id, &actor.claims, &ClaimsUpdate::role(Role::Admin))
            .await?;

        self.firestore
            .batch_write(vec![Write::update_masked(
                paths::school(school),
                BTreeMap::from([(
                    "owner".to_string(),
                    FirestoreValue::from(admin_email),
                )]),
                vec!["owner".to_string()],
                vec![
                    FieldTransform::array_remove(
                        "admins",
                        vec![FirestoreValue::from(admin_email)],
                    ),
                    FieldTransform::array_union(
                        "admins",
                        vec![FirestoreValue::from(actor.email.as_str())],
                    ),
                ],
            )])
            .await?;
        Ok(())
    }
}
