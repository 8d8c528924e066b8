//! Scope → claims release rules (OpenID Connect Core, section 5.4).

use crate::claims::{AccessGrant, Claims, TokenError};
use std::collections::HashMap;

const PROFILE_CLAIMS: &[&str] = &[
    "name",
    "family_name",
    "given_name",
    "middle_name",
    "nickname",
    "preferred_username",
    "profile",
    "picture",
    "website",
    "gender",
    "birthdate",
    "zoneinfo",
    "locale",
    "updated_at",
];
const EMAIL_CLAIMS: &[&str] = &["email", "email_verified"];
const ADDRESS_CLAIMS: &[&str] = &["address"];
const PHONE_CLAIMS: &[&str] = &["phone_number", "phone_number_verified"];

#[derive(Clone, Debug, Default)]
pub struct ScopePolicy {
    custom: HashMap<String, Vec<String>>,
}

impl ScopePolicy {
    #[must_use]
    pub fn new(custom: HashMap<String, Vec<String>>) -> Self {
        Self { custom }
    }

    fn standard(scope: &str) -> &'static [&'static str] {
        match scope {
            "profile" => PROFILE_CLAIMS,
            "email" => EMAIL_CLAIMS,
            "address" => ADDRESS_CLAIMS,
            "phone" => PHONE_CLAIMS,
            _ => &[],
        }
    }

    fn allows(&self, grant: &AccessGrant, claim: &str) -> bool {
        grant.scopes.iter().any(|scope| {
            Self::standard(scope).contains(&claim)
                || self
                    .custom
                    .get(scope)
                    .is_some_and(|claims| claims.iter().any(|c| c == claim))
        })
    }

    /// Keep the claims the grant's scopes allow; `sub` always comes from the grant.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` if the grant lacks the `openid` scope.
    pub fn release(&self, grant: &AccessGrant, claims: &Claims) -> Result<Claims, TokenError> {
        if !grant.has_scope("openid") {
            return Err(TokenError::Invalid(
                "openid scope is required for userinfo".to_string(),
            ));
        }

        let mut released: Claims = claims
            .iter()
            .filter(|(name, _)| self.allows(grant, name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        released.insert("sub".to_string(), grant.subject.clone().into());

        Ok(released)
    }
}
