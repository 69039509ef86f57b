//! Record signature verification.

use crate::envelope::open_trial_envelope;
use crate::error::{LicenseError, LicenseResult};
use crate::record::EntitlementRecord;
use base64::{engine::general_purpose::STANDARD, Engine};
use entitle_crypto::{EnvelopeKey, IssuerSignature, IssuerVerifyingKey};
use tracing::debug;

/// Checks record signatures against the issuer key and the cluster envelope
/// key.
#[derive(Debug, Clone)]
pub struct Verifier {
    issuer_key: IssuerVerifyingKey,
    envelope_key: EnvelopeKey,
}

impl Verifier {
    pub fn new(issuer_key: IssuerVerifyingKey, envelope_key: EnvelopeKey) -> Self {
        Self {
            issuer_key,
            envelope_key,
        }
    }

    /// Returns true if the record's signature is authentic.
    ///
    /// Never fails: malformed signatures are simply invalid.
    #[must_use]
    pub fn verify(&self, record: &EntitlementRecord) -> bool {
        match self.check(record) {
            Ok(()) => true,
            Err(e) => {
                debug!(record_id = %record.id(), error = %e, "record failed verification");
                false
            }
        }
    }

    /// Like `verify`, but reports why a record was rejected.
    pub fn check(&self, record: &EntitlementRecord) -> LicenseResult<()> {
        if record.auto_generated() {
            self.check_trial_envelope(record)
        } else {
            self.check_issuer_signature(record)
        }
    }

    fn check_issuer_signature(&self, record: &EntitlementRecord) -> LicenseResult<()> {
        let sig_bytes = STANDARD
            .decode(record.signature())
            .map_err(|_| LicenseError::InvalidSignature)?;
        let signature = IssuerSignature::from_slice(&sig_bytes)?;
        let payload = record.spec().signing_payload(record.version())?;
        self.issuer_key
            .verify(&payload, &signature)
            .map_err(|_| LicenseError::InvalidSignature)
    }

    fn check_trial_envelope(&self, record: &EntitlementRecord) -> LicenseResult<()> {
        let (version, spec) = open_trial_envelope(record.signature(), &self.envelope_key)?;
        let sealed = spec.into_record(version, record.signature())?;
        if &sealed != record {
            return Err(LicenseError::InvalidEnvelope(
                "record does not match its sealed copy".to_string(),
            ));
        }
        Ok(())
    }
}
