//! Result of one dispatch.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::NormalizedResponse;

/// What a send produced: a response, or the aborted sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The send finished, successfully or not.
    Completed(Box<NormalizedResponse>),
    /// The send was cancelled while in flight.
    Aborted,
}

impl DispatchOutcome {
    /// Wraps a finished response.
    #[must_use]
    pub fn completed(response: NormalizedResponse) -> Self {
        Self::Completed(Box::new(response))
    }

    /// Returns true for the aborted sentinel.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Borrows the response of a completed send.
    #[must_use]
    pub fn response(&self) -> Option<&NormalizedResponse> {
        match self {
            Self::Completed(response) => Some(response),
            Self::Aborted => None,
        }
    }

    /// Returns the response to display: the real one, or the cancelled rendering.
    #[must_use]
    pub fn into_display_response(self) -> NormalizedResponse {
        match self {
            Self::Completed(response) => *response,
            Self::Aborted => NormalizedResponse::cancelled(),
        }
    }
}

impl Serialize for DispatchOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Completed(response) => response.serialize(serializer),
            Self::Aborted => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("aborted", &true)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_aborted_serializes_as_sentinel() {
        assert_eq!(
            serde_json::to_value(DispatchOutcome::Aborted).unwrap(),
            json!({"aborted": true})
        );
        assert!(DispatchOutcome::Aborted.response().is_none());
    }

    #[test]
    fn test_aborted_displays_as_cancelled() {
        let response = DispatchOutcome::Aborted.into_display_response();
        assert_eq!(response.status_text, "Cancelled");
    }
}
