//! Authorization gate
//!
//! Only members of one configured team may launch workflows. A failed
//! membership lookup is an error, never a silent "no".

use anyhow::Result;
use std::sync::Arc;

use crate::repository::MembershipChecker;

#[derive(Clone)]
pub struct AuthorizationGate {
    checker: Arc<dyn MembershipChecker>,
    allowed_team: String,
}

impl AuthorizationGate {
    pub fn new(checker: Arc<dyn MembershipChecker>, allowed_team: impl Into<String>) -> Self {
        Self {
            checker,
            allowed_team: allowed_team.into(),
        }
    }

    pub fn allowed_team(&self) -> &str {
        &self.allowed_team
    }

    /// Check whether `login` belongs to the allowed team of `org`
    pub async fn is_authorized(&self, org: &str, login: &str) -> Result<bool> {
        let authorized = self
            .checker
            .is_team_member(org, &self.allowed_team, login)
            .await?;

        tracing::debug!(
            "Membership of {} in {}/{}: {}",
            login,
            org,
            self.allowed_team,
            authorized
        );
        Ok(authorized)
    }
}
