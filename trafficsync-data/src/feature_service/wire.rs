//! Feature-service REST response types.
//!
//! Feature services answer most failures with HTTP 200 and an `error`
//! envelope, so every response is first tried as [`ErrorEnvelope`].
//!
//! See: <https://developers.arcgis.com/rest/services-reference/enterprise/apply-edits-feature-service-layer/>

use serde::Deserialize;
use trafficsync_core::{EditOutcome, RemoteError, RemoteObjectId};

/// Error payload embedded in a response body.
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Vec<String>,
}

impl ServiceError {
    pub(crate) fn into_remote_error(self) -> RemoteError {
        let message = if self.details.is_empty() {
            self.message
        } else {
            format!("{} ({})", self.message, self.details.join("; "))
        };
        RemoteError::Service {
            code: self.code,
            message,
        }
    }
}

/// `{"error": {...}}` body.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ServiceError,
}

/// Either a service error or the expected payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Failure(ErrorEnvelope),
    Success(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_result(self) -> Result<T, RemoteError> {
        match self {
            Self::Failure(envelope) => Err(envelope.error.into_remote_error()),
            Self::Success(payload) => Ok(payload),
        }
    }
}

/// Response of `query` with `returnIdsOnly=true`.
///
/// `objectIdFieldName` is always present in a genuine answer, so a body
/// without it is rejected instead of read as an empty layer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryIdsResponse {
    pub object_id_field_name: String,
    /// `null` when the layer holds no matching features.
    #[serde(default)]
    pub object_ids: Option<Vec<i64>>,
}

impl QueryIdsResponse {
    pub(crate) fn into_ids(self) -> Vec<RemoteObjectId> {
        self.object_ids
            .unwrap_or_default()
            .into_iter()
            .map(RemoteObjectId::from_raw)
            .collect()
    }
}

/// Which edit list an `applyEdits` call submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditList {
    Adds,
    Deletes,
}

impl EditList {
    /// Form field carrying the submitted edits.
    pub(crate) const fn form_field(self) -> &'static str {
        match self {
            Self::Adds => "adds",
            Self::Deletes => "deletes",
        }
    }

    /// Response member reporting the outcome of those edits.
    pub(crate) const fn result_field(self) -> &'static str {
        match self {
            Self::Adds => "addResults",
            Self::Deletes => "deleteResults",
        }
    }
}

/// Response of `applyEdits`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApplyEditsResponse {
    #[serde(default)]
    pub add_results: Option<Vec<EditResultWire>>,
    #[serde(default)]
    pub delete_results: Option<Vec<EditResultWire>>,
}

impl ApplyEditsResponse {
    /// Outcomes for the submitted list, or `None` when the service did not
    /// report them.
    pub(crate) fn results_for(self, list: EditList) -> Option<Vec<EditResultWire>> {
        match list {
            EditList::Adds => self.add_results,
            EditList::Deletes => self.delete_results,
        }
    }
}

/// Error attached to a single rejected edit.
#[derive(Debug, Deserialize)]
pub(crate) struct EditErrorWire {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub description: String,
}

/// One entry of `addResults` or `deleteResults`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EditResultWire {
    #[serde(default)]
    pub object_id: Option<i64>,
    pub success: bool,
    #[serde(default)]
    pub error: Option<EditErrorWire>,
}

impl From<EditResultWire> for EditOutcome {
    fn from(wire: EditResultWire) -> Self {
        let object_id = wire.object_id.map(RemoteObjectId::from_raw);
        match (wire.success, object_id) {
            (true, Some(id)) => Self::accepted(id),
            (true, None) => Self {
                object_id: None,
                success: true,
                error: None,
            },
            (false, _) => {
                let reason = wire.error.map_or_else(
                    || "rejected without a reason".to_owned(),
                    |error| format!("{} (code {})", error.description, error.code),
                );
                Self::rejected(object_id, reason)
            }
        }
    }
}

/// Response of the OAuth2 token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}
