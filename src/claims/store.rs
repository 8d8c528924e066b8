use crate::claims::{Claims, ScopePolicy, SetupError, TokenError};
use async_trait::async_trait;
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path, sync::Arc};

/// Source of the claims released for a subject.
#[async_trait]
pub trait ClaimsStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `TokenError::UnknownSubject` when nothing is known about `subject`.
    async fn claims(&self, subject: &str) -> Result<Claims, TokenError>;
}

/// Subject → claims table held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryClaimsStore {
    subjects: Arc<HashMap<String, Claims>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClaimsFile {
    #[serde(default)]
    scopes: HashMap<String, Vec<String>>,
    subjects: HashMap<String, Claims>,
}

impl MemoryClaimsStore {
    #[must_use]
    pub fn new(subjects: HashMap<String, Claims>) -> Self {
        Self {
            subjects: Arc::new(subjects),
        }
    }

    /// Load subjects and custom scopes from one JSON file:
    /// `{"scopes": {"siret": ["siret"]}, "subjects": {"etudiant1": {...}}}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<(Self, ScopePolicy), SetupError> {
        let payload = fs::read_to_string(path).map_err(|source| SetupError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file: ClaimsFile =
            serde_json::from_str(&payload).map_err(|source| SetupError::Json {
                path: path.display().to_string(),
                source,
            })?;

        Ok((Self::new(file.subjects), ScopePolicy::new(file.scopes)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

#[async_trait]
impl ClaimsStore for MemoryClaimsStore {
    async fn claims(&self, subject: &str) -> Result<Claims, TokenError> {
        self.subjects
            .get(subject)
            .cloned()
            .ok_or(TokenError::UnknownSubject)
    }
}
