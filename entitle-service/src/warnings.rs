//! Expiration warning text.

use crate::dependent::Dependent;
use entitle_license::EntitlementRecord;
use entitle_types::Timestamp;
use std::fmt::Write;
use std::sync::Arc;

/// Composes the expiration warning for `record` at `now`.
///
/// Lists each dependent with non-empty expiration messages. Returns `None`
/// when no dependent has anything to say.
pub fn compose_expiration_warning(
    record: &EntitlementRecord,
    now: Timestamp,
    dependents: &[Arc<dyn Dependent>],
) -> Option<String> {
    let sections: Vec<(String, Vec<String>)> = dependents
        .iter()
        .map(|d| (d.id().to_string(), d.expiration_messages()))
        .filter(|(_, messages)| !messages.is_empty())
        .collect();
    if sections.is_empty() {
        return None;
    }

    let tense = if now < record.expiry_date() {
        "will expire"
    } else {
        "expired"
    };
    let mut text = format!(
        "License [{}] {tense} on [{}]. If you have a new license, please register it.\n\
         The following features operate with reduced functionality once the license expires:",
        record.id(),
        record.expiry_date()
    );
    for (id, messages) in sections {
        let _ = write!(text, "\n# {id}");
        for message in messages {
            let _ = write!(text, "\n  - {message}");
        }
    }
    Some(text)
}
