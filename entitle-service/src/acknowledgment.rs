//! Registration responses and the acknowledgment round.
//!
//! Replacing a live record can take capabilities away. Before such a write
//! the service asks every dependent what would be lost; if anyone answers,
//! the caller gets the messages back and must resubmit with acknowledgment.

use crate::dependent::Dependent;
use entitle_license::EntitlementRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Key under which the service's own messages are reported.
pub const LICENSE_ACK_KEY: &str = "license";

/// Reported when the new record was issued before the installed one.
pub const OLDER_LICENSE_MESSAGE: &str =
    "The new license is older than the currently installed license. \
     Are you sure you want to override the current license?";

/// Header of a `NeedsAcknowledgment` response.
pub const ACKNOWLEDGMENT_HEADER: &str =
    "This license update requires acknowledgment. Read the following messages \
     and submit the license again with acknowledgment set:";

/// Outcome of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    /// Stored.
    Valid,
    /// Bad signature, trial record, or not yet issued.
    Invalid,
    /// Already past its expiry date.
    Expired,
    /// Replacing the current record needs the caller's acknowledgment.
    NeedsAcknowledgment,
}

/// What `register` returns to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub status: RegistrationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub acknowledgments: BTreeMap<String, Vec<String>>,
}

impl RegistrationResponse {
    /// A response carrying only a status.
    pub fn status(status: RegistrationStatus) -> Self {
        Self {
            status,
            header: None,
            acknowledgments: BTreeMap::new(),
        }
    }

    /// A `NeedsAcknowledgment` response listing `acknowledgments`.
    pub fn needs_acknowledgment(acknowledgments: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            status: RegistrationStatus::NeedsAcknowledgment,
            header: Some(ACKNOWLEDGMENT_HEADER.to_string()),
            acknowledgments,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.status == RegistrationStatus::Valid
    }
}

/// Collects everything the caller must acknowledge before `new` replaces
/// `current`. Empty when the replacement is harmless.
pub fn collect_acknowledgments(
    dependents: &[Arc<dyn Dependent>],
    current: &EntitlementRecord,
    new: &EntitlementRecord,
) -> BTreeMap<String, Vec<String>> {
    let mut acknowledgments = BTreeMap::new();

    if !current.auto_generated() && current.issue_date() > new.issue_date() {
        acknowledgments.insert(
            LICENSE_ACK_KEY.to_string(),
            vec![OLDER_LICENSE_MESSAGE.to_string()],
        );
    }

    for dependent in dependents {
        let messages = dependent.acknowledgment_messages(current, new);
        if !messages.is_empty() {
            acknowledgments
                .entry(dependent.id().to_string())
                .or_insert_with(Vec::new)
                .extend(messages);
        }
    }
    acknowledgments
}
