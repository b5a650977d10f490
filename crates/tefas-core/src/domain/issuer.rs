use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Portfolio management company that founds and runs funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    code: String,
    name: String,
}

impl Issuer {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into().trim().to_owned();
        let name = name.into().trim().to_owned();
        if code.is_empty() {
            return Err(ValidationError::EmptyIssuerCode);
        }
        if name.is_empty() {
            return Err(ValidationError::EmptyIssuerName);
        }
        Ok(Self { code, name })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Read-only snapshot of the issuers known to the source, keyed by code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuerDirectory {
    by_code: BTreeMap<String, Issuer>,
}

impl IssuerDirectory {
    pub fn new(issuers: impl IntoIterator<Item = Issuer>) -> Self {
        Self {
            by_code: issuers
                .into_iter()
                .map(|issuer| (issuer.code.clone(), issuer))
                .collect(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&Issuer> {
        self.by_code.get(code.trim())
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}
