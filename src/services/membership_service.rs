//! Club membership coordination: joins, removals, officer list updates.
//!
//! Membership state lives in three places that do not share a transaction
//! coordinator: custom claims on the identity provider, the private member
//! list, and the public `numMembers` counter. Every method here checks all
//! preconditions before its first write and then issues writes in a fixed
//! order; the ordering rules are documented per method.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::auth::{guard, ClaimsUpdate, OfficerPermission, UserClaims};
use crate::error::ApiError;
use crate::firestore::{paths, FieldTransform, FirestoreClient, FirestoreValue, Write};
use crate::identity::{IdentityClient, UserRecord};
use crate::middleware::AuthUser;
use crate::types::{officers_to_value, ClubSignupType, OfficerEntry};

pub struct MembershipService {
    firestore: Arc<dyn FirestoreClient>,
    identity: Arc<dyn IdentityClient>,
}

/// The account a membership operation acts on: the caller, or the member an
/// officer named.
struct Target {
    user_id: String,
    email: String,
    claims: UserClaims,
}

impl From<&AuthUser> for Target {
    fn from(user: &AuthUser) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            claims: user.claims.clone(),
        }
    }
}

impl From<UserRecord> for Target {
    fn from(record: UserRecord) -> Self {
        Self {
            user_id: record.user_id,
            email: record.email,
            claims: record.claims,
        }
    }
}

impl MembershipService {
    pub fn new(firestore: Arc<dyn FirestoreClient>, identity: Arc<dyn IdentityClient>) -> Self {
        Self {
            firestore,
            identity,
        }
    }

    /// Resolve the member an officer is acting on. Accounts in another
    /// school report as nonexistent so membership cannot be probed across
    /// tenants.
    async fn resolve_member(&self, school: &str, email: &str) -> Result<UserRecord, ApiError> {
        match self.identity.lookup_by_email(email).await? {
            Some(user) if user.claims.school.as_deref() == Some(school) => Ok(user),
            _ => Err(ApiError::bad_request("This user does not exist")),
        }
    }

    /// Add a member to a club.
    ///
    /// Without `member_email` the caller joins themselves, which requires
    /// the club's signup to be open - officers and admins included. With
    /// `member_email` an officer holding the Members capability adds
    /// someone else, bypassing the signup gate.
    ///
    /// Write order: claims first, then one atomic batch updating the member
    /// list and the `numMembers` counter. If the batch fails the target is
    /// over-claimed until retry; read paths re-check the authoritative
    /// lists, and the conflict guard makes the retry safe.
    pub async fn add_member(
        &self,
        actor: &AuthUser,
        club_id: &str,
        member_email: Option<&str>,
    ) -> Result<(), ApiError> {
        let school = actor.school()?;

        let target = match member_email {
            Some(email) => {
                guard::require_officer_permission(
                    &actor.claims,
                    club_id,
                    OfficerPermission::MEMBERS,
                    "You do not have permission to manage this club's members",
                )?;
                Target::from(self.resolve_member(school, email).await?)
            }
            None => {
                let club = self
                    .firestore
                    .get(&paths::club(school, club_id), Some(&["signup"]))
                    .await?
                    .ok_or_else(|| ApiError::not_found("Club not found"))?;
                let signup = club
                    .field("signup")
                    .and_then(FirestoreValue::as_map)
                    .and_then(|signup| signup.get("type"))
                    .and_then(FirestoreValue::as_i64)
                    .and_then(ClubSignupType::from_i64);
                if signup != Some(ClubSignupType::Open) {
                    return Err(ApiError::forbidden("You must apply to join this club"));
                }
                Target::from(actor)
            }
        };

        // adding is deliberately not idempotent so double submissions are
        // visible to the caller
        if target.claims.is_member_of(club_id) {
            return Err(ApiError::conflict("User is already a member of this club"));
        }

        let mut member_of = target.claims.member_of.clone();
        member_of.push(club_id.to_string());
        self.identity
            .update_claims(
                &target.user_id,
                &target.claims,
                &ClaimsUpdate::member_of(member_of),
            )
            .await?;

        self.firestore
            .batch_write(vec![
                Write::transform(
                    paths::club_private(school, club_id),
                    vec![FieldTransform::array_union(
                        "members",
                        vec![FirestoreValue::from(target.email.as_str())],
                    )],
                ),
                Write::transform(
                    paths::club(school, club_id),
                    vec![FieldTransform::increment("numMembers", 1)],
                ),
            ])
            .await?;

        Ok(())
    }

    /// Remove a member from a club (self, or by an officer holding the
    /// Members capability - no signup gate on the way out).
    ///
    /// Write order is the inverse of `add_member`: documents first, claims
    /// after the documents are confirmed consistent. A failed claims update
    /// leaves the user under-permissioned, never over-permissioned.
    pub async fn remove_member(
        &self,
        actor: &AuthUser,
        club_id: &str,
        member_email: Option<&str>,
    ) -> Result<(), ApiError> {
        let school = actor.school()?;

        let target = match member_email {
            Some(email) => {
                guard::require_officer_permission(
                    &actor.claims,
                    club_id,
                    OfficerPermission::MEMBERS,
                    "You do not have permission to manage this club's members",
                )?;
                Target::from(self.resolve_member(school, email).await?)
            }
            None => Target::from(actor),
        };

        if !target.claims.is_member_of(club_id) {
            return Err(ApiError::bad_request("User is not a member of this club"));
        }

        let was_officer = target.claims.officer_of.contains_key(club_id);
        if was_officer {
            self.remove_officer_entry(school, club_id, &target.email)
                .await?;
        } else {
            self.firestore
                .batch_write(vec![
                    Write::transform(
                        paths::club_private(school, club_id),
                        vec![FieldTransform::array_remove(
                            "members",
                            vec![FirestoreValue::from(target.email.as_str())],
                        )],
                    ),
                    Write::transform(
                        paths::club(school, club_id),
                        vec![FieldTransform::increment("numMembers", -1)],
                    ),
                ])
                .await?;
        }

        let mut member_of = target.claims.member_of.clone();
        member_of.retain(|club| club != club_id);
        let mut update = ClaimsUpdate::member_of(member_of);
        if was_officer {
            let mut officer_of = target.claims.officer_of.clone();
            officer_of.remove(club_id);
            update = update.with_officer_of(officer_of);
        }
        self.identity
            .update_claims(&target.user_id, &target.claims, &update)
            .await?;

        Ok(())
    }

    /// Drop a member who also holds an officer entry. The officer map edit
    /// is read-modify-write, so it runs in a store transaction to stay
    /// correct against concurrent officer updates; the map rewrite, the
    /// counter decrement and the member-list removal commit together.
    async fn remove_officer_entry(
        &self,
        school: &str,
        club_id: &str,
        email: &str,
    ) -> Result<(), ApiError> {
        let txn = self.firestore.begin_transaction().await?;
        let club = self
            .firestore
            .get_with_transaction(&paths::club(school, club_id), &txn)
            .await?
            .ok_or_else(|| ApiError::not_found("Club not found"))?;

        let mut officers = club
            .field("officers")
            .and_then(FirestoreValue::as_map)
            .cloned()
            .unwrap_or_default();
        officers.remove(email);

        self.firestore
            .commit(
                txn,
                vec![
                    Write::update_masked(
                        paths::club(school, club_id),
                        BTreeMap::from([(
                            "officers".to_string(),
                            FirestoreValue::Map(officers),
                        )]),
                        vec!["officers".to_string()],
                        vec![FieldTransform::increment("numMembers", -1)],
                    ),
                    Write::transform(
                        paths::club_private(school, club_id),
                        vec![FieldTransform::array_remove(
                            "members",
                            vec![FirestoreValue::from(email)],
                        )],
                    ),
                ],
            )
            .await?;
        Ok(())
    }

    /// Replace a club's officer list.
    ///
    /// The desired map is filtered against reality: entries whose account
    /// does not exist, sits in another school, or is not a club member are
    /// dropped with a diagnostic rather than failing the whole update, so
    /// departed officers cannot wedge the list. Claims updates go out one
    /// per affected user; the stored map is overwritten last.
    pub async fn update_officers(
        &self,
        actor: &AuthUser,
        club_id: &str,
        desired: BTreeMap<String, OfficerEntry>,
    ) -> Result<(), ApiError> {
        let school = actor.school()?;
        guard::require_officer_permission(
            &actor.claims,
            club_id,
            OfficerPermission::OFFICERS,
            "You do not have permission to manage this club's officers",
        )?;

        // a club must never end up with nobody able to manage officers
        if !desired
            .values()
            .any(|officer| officer.permissions.allows(OfficerPermission::OFFICERS))
        {
            return Err(ApiError::bad_request(
                "At least one officer must hold the Officers permission",
            ));
        }

        let club = self
            .firestore
            .get(&paths::club(school, club_id), Some(&["officers"]))
            .await?
            .ok_or_else(|| ApiError::not_found("Club not found"))?;
        let mut all_emails: Vec<String> = club
            .field("officers")
            .and_then(FirestoreValue::as_map)
            .map(|officers| officers.keys().cloned().collect())
            .unwrap_or_default();
        for email in desired.keys() {
            if !all_emails.contains(email) {
                all_emails.push(email.clone());
            }
        }

        let users = self.identity.lookup_by_emails(&all_emails).await?;
        let by_email: HashMap<&str, &UserRecord> =
            users.iter().map(|u| (u.email.as_str(), u)).collect();

        let mut desired = desired;
        let mut updates = Vec::new();
        for email in &all_emails {
            let Some(user) = by_email.get(email.as_str()) else {
                if desired.remove(email).is_some() {
                    tracing::warn!(email, "dropping officer: account not found");
                }
                continue;
            };
            if user.claims.school.as_deref() != Some(school)
                || !user.claims.is_member_of(club_id)
            {
                if desired.remove(email).is_some() {
                    tracing::warn!(email, "dropping officer: not a member of this club");
                }
                continue;
            }

            let mut officer_of = user.claims.officer_of.clone();
            match desired.get(email) {
                Some(entry) => {
                    officer_of.insert(club_id.to_string(), entry.permissions);
                }
                None => {
                    officer_of.remove(club_id);
                }
            }
            if officer_of == user.claims.officer_of {
                continue;
            }
            updates.push((
                user.user_id.clone(),
                user.claims.clone(),
                ClaimsUpdate::officer_of(officer_of),
            ));
        }

        // one merge update per user; a failure partway leaves a subset
        // applied and skips the doc overwrite below
        futures::future::try_join_all(updates.into_iter().map(
            |(user_id, prior, patch)| {
                let identity = self.identity.clone();
                async move { identity.update_claims(&user_id, &prior, &patch).await }
            },
        ))
        .await?;

        self.firestore
            .batch_write(vec![Write::update_masked(
                paths::club(school, club_id),
                BTreeMap::from([("officers".to_string(), officers_to_value(&desired))]),
                vec!["officers".to_string()],
                Vec::new(),
            )])
            .await?;

        Ok(())
    }
}
