//! The immutable, variable-substituted request.

use serde::{Deserialize, Serialize};
use std::ops::Deref;

use super::RequestDraft;

/// A draft after placeholder substitution.
///
/// Only the variable resolver builds values of this type; fields are read
/// through `Deref` and cannot be mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedRequest(RequestDraft);

impl ResolvedRequest {
    /// Wraps an already substituted draft.
    #[must_use]
    pub const fn from_substituted(draft: RequestDraft) -> Self {
        Self(draft)
    }

    /// Borrows the substituted fields as a draft.
    #[must_use]
    pub const fn as_draft(&self) -> &RequestDraft {
        &self.0
    }

    /// Returns the substituted fields as a draft, e.g. to resolve again.
    #[must_use]
    pub fn into_draft(self) -> RequestDraft {
        self.0
    }
}

impl Deref for ResolvedRequest {
    type Target = RequestDraft;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
