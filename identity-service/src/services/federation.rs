//! Federated identity: assertion verification and just-in-time account
//! provisioning.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::GoogleConfig;
use crate::models::Account;
use crate::services::store::{AccountStore, StoreError};
use crate::services::ServiceError;

/// Identity facts extracted from a verified external assertion.
#[derive(Debug, Clone)]
pub struct VerifiedAssertion {
    /// Stable subject identifier at the provider.
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Validates externally-issued identity assertions.
///
/// The provider's verification is the authentication event; no password is
/// ever involved on this path.
#[async_trait]
pub trait AssertionVerifier: Send + Sync {
    async fn verify_assertion(&self, assertion: &str) -> Result<VerifiedAssertion, ServiceError>;
}

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Verifies Google ID tokens through the provider's tokeninfo endpoint.
pub struct GoogleAssertionVerifier {
    http: reqwest::Client,
    client_id: String,
}

// tokeninfo reports booleans and numbers as strings
#[derive(Debug, Deserialize)]
struct GoogleTokenInfo {
    sub: String,
    aud: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
}

impl GoogleAssertionVerifier {
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: config.client_id.clone(),
        }
    }
}

#[async_trait]
impl AssertionVerifier for GoogleAssertionVerifier {
    async fn verify_assertion(&self, assertion: &str) -> Result<VerifiedAssertion, ServiceError> {
        let res = self
            .http
            .get(TOKENINFO_URL)
            .query(&[("id_token", assertion)])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to reach identity provider");
                ServiceError::AssertionInvalid
            })?;

        if !res.status().is_success() {
            tracing::debug!(status = %res.status(), "Identity provider rejected assertion");
            return Err(ServiceError::AssertionInvalid);
        }

        let info: GoogleTokenInfo = res.json().await.map_err(|e| {
            tracing::warn!(error = %e, "Malformed tokeninfo response");
            ServiceError::AssertionInvalid
        })?;

        if info.aud != self.client_id {
            tracing::warn!("Assertion audience mismatch");
            return Err(ServiceError::AssertionInvalid);
        }

        let email_verified = info.email_verified.as_deref() == Some("true");

        Ok(VerifiedAssertion {
            subject: info.sub,
            email: info.email.filter(|_| email_verified),
            display_name: info.name,
        })
    }
}

/// Resolves verified external subjects to accounts, creating one exactly
/// once on first contact.
#[derive(Clone)]
pub struct IdentityProvisioner {
    store: Arc<dyn AccountStore>,
}

impl IdentityProvisioner {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Look up the account for an external subject, provisioning it when
    /// absent. Concurrent first logins are idempotent: the loser of the
    /// insert race re-reads the winner's row.
    pub async fn resolve_or_provision(
        &self,
        assertion: &VerifiedAssertion,
    ) -> Result<Account, ServiceError> {
        if let Some(existing) = self.store.find_by_external_subject(&assertion.subject).await? {
            return Ok(existing);
        }

        let account = Account::new_federated(
            assertion.subject.clone(),
            assertion.email.clone(),
            assertion.display_name.clone(),
        );

        match self.store.insert_account(&account).await {
            Ok(()) => {
                tracing::info!(
                    account_id = %account.account_id,
                    "Provisioned account for external subject"
                );
                Ok(account)
            }
            Err(StoreError::Duplicate) => {
                match self.store.find_by_external_subject(&assertion.subject).await? {
                    // A concurrent first login won the race on the subject.
                    Some(existing) => Ok(existing),
                    // The collision was on the email claim, not the subject.
                    None => Err(ServiceError::DuplicateIdentity("email")),
                }
            }
            Err(StoreError::Backend(e)) => Err(ServiceError::ProvisioningFailed(e)),
        }
    }
}

/// Fixed-table verifier for tests: maps raw assertion strings to verified
/// identities, everything else is invalid.
#[derive(Default)]
pub struct StaticAssertionVerifier {
    assertions: HashMap<String, VerifiedAssertion>,
}

impl StaticAssertionVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assertion(mut self, raw: &str, verified: VerifiedAssertion) -> Self {
        self.assertions.insert(raw.to_string(), verified);
        self
    }
}

#[async_trait]
impl AssertionVerifier for StaticAssertionVerifier {
    async fn verify_assertion(&self, assertion: &str) -> Result<VerifiedAssertion, ServiceError> {
        self.assertions
            .get(assertion)
            .cloned()
            .ok_or(ServiceError::AssertionInvalid)
    }
}
