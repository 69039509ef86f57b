//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::TimeDelta;
use entitle_crypto::{generate_random_key, EnvelopeKey, IssuerSigningKey};
use entitle_license::{
    sign_trial, EntitlementRecord, OperationMode, RecordSpec, Verifier,
};
use entitle_types::Timestamp;

/// Returns a deterministic issuer key from a fixed seed.
pub fn test_issuer() -> IssuerSigningKey {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    IssuerSigningKey::from_bytes(&seed)
}

/// Returns a verifier paired with the test issuer and the given envelope key.
pub fn test_verifier(envelope_key: &EnvelopeKey) -> Verifier {
    Verifier::new(test_issuer().verifying_key(), envelope_key.clone())
}

/// Fixed reference instant (2024-01-01T00:00:00Z).
pub fn t0() -> Timestamp {
    Timestamp::from_millis(1_704_067_200_000)
}

/// A gold record valid for `days` starting at `issue`.
pub fn issued_record(issue: Timestamp, days: i64) -> EntitlementRecord {
    RecordSpec::new("acme", issue, issue + TimeDelta::days(days), 10, OperationMode::Gold)
        .unwrap()
        .sign(&test_issuer())
        .unwrap()
}

/// A trial record valid for 30 days from `issue`, sealed with a fresh key.
pub fn trial_record(issue: Timestamp) -> (EntitlementRecord, EnvelopeKey) {
    let key = generate_random_key();
    let spec = RecordSpec::trial("cluster", issue, issue + TimeDelta::days(30), 1000).unwrap();
    (sign_trial(spec, &key).unwrap(), key)
}
