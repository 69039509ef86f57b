//! The entitlement record and the value held by the store.
//!
//! A record is immutable once built. Replacing an entitlement means swapping
//! the whole record in the store, never editing fields in place.
//!
//! Wire layout (JSON, camelCase):
//! `id, version, issuedTo, issueDate, expiryDate, maxUnits, operationMode,
//! autoGenerated, signature`, with dates as epoch milliseconds.

use crate::error::{LicenseError, LicenseResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use entitle_crypto::IssuerSigningKey;
use entitle_types::{RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Record format version written by this crate.
pub const CURRENT_VERSION: i32 = 1;

/// The tier an entitlement unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    /// Self-generated trial.
    Trial,
    /// Free tier.
    Basic,
    Standard,
    Gold,
    Platinum,
    Enterprise,
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Trial => "trial",
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
            Self::Enterprise => "enterprise",
        };
        f.write_str(name)
    }
}

/// The signed content of a record: every field except the format version and
/// the signature itself.
///
/// This is what the trial envelope seals, so it must serialize identically on
/// every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSpec {
    pub id: RecordId,
    pub issued_to: String,
    pub issue_date: Timestamp,
    pub expiry_date: Timestamp,
    pub max_units: u32,
    pub operation_mode: OperationMode,
    pub auto_generated: bool,
}

impl RecordSpec {
    /// Creates the spec of a vendor-issued record with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDates` if `issue_date > expiry_date`.
    pub fn new(
        issued_to: impl Into<String>,
        issue_date: Timestamp,
        expiry_date: Timestamp,
        max_units: u32,
        operation_mode: OperationMode,
    ) -> LicenseResult<Self> {
        let spec = Self {
            id: RecordId::new(),
            issued_to: issued_to.into(),
            issue_date,
            expiry_date,
            max_units,
            operation_mode,
            auto_generated: false,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Creates the spec of a self-generated trial record.
    pub fn trial(
        issued_to: impl Into<String>,
        issue_date: Timestamp,
        expiry_date: Timestamp,
        max_units: u32,
    ) -> LicenseResult<Self> {
        let spec = Self {
            id: RecordId::new(),
            issued_to: issued_to.into(),
            issue_date,
            expiry_date,
            max_units,
            operation_mode: OperationMode::Trial,
            auto_generated: true,
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> LicenseResult<()> {
        if self.issue_date > self.expiry_date {
            return Err(LicenseError::InvalidDates {
                issue: self.issue_date,
                expiry: self.expiry_date,
            });
        }
        Ok(())
    }

    /// Canonical bytes covered by the issuer signature.
    pub fn signing_payload(&self, version: i32) -> LicenseResult<Vec<u8>> {
        #[derive(Serialize)]
        struct Payload<'a> {
            version: i32,
            #[serde(flatten)]
            spec: &'a RecordSpec,
        }
        Ok(serde_json::to_vec(&Payload { version, spec: self })?)
    }

    /// Signs the spec with the issuer key, producing a vendor-issued record.
    pub fn sign(self, key: &IssuerSigningKey) -> LicenseResult<EntitlementRecord> {
        if self.auto_generated {
            return Err(LicenseError::KindMismatch(
                "auto-generated records are sealed, not signed".to_string(),
            ));
        }
        let payload = self.signing_payload(CURRENT_VERSION)?;
        let signature = STANDARD.encode(key.sign(&payload).to_bytes());
        self.into_record(CURRENT_VERSION, signature)
    }

    /// Attaches a version and signature without checking either.
    ///
    /// Verification is the `Verifier`'s job; this only enforces the date
    /// invariant.
    pub fn into_record(
        self,
        version: i32,
        signature: impl Into<String>,
    ) -> LicenseResult<EntitlementRecord> {
        self.validate()?;
        Ok(EntitlementRecord {
            spec: self,
            version,
            signature: signature.into(),
        })
    }
}

/// An immutable, signed entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RecordDocument", try_from = "RecordDocument")]
pub struct EntitlementRecord {
    spec: RecordSpec,
    version: i32,
    signature: String,
}

impl EntitlementRecord {
    #[must_use]
    pub fn id(&self) -> RecordId {
        self.spec.id
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub fn issued_to(&self) -> &str {
        &self.spec.issued_to
    }

    #[must_use]
    pub fn issue_date(&self) -> Timestamp {
        self.spec.issue_date
    }

    #[must_use]
    pub fn expiry_date(&self) -> Timestamp {
        self.spec.expiry_date
    }

    #[must_use]
    pub fn max_units(&self) -> u32 {
        self.spec.max_units
    }

    #[must_use]
    pub fn operation_mode(&self) -> OperationMode {
        self.spec.operation_mode
    }

    /// True for records produced by the trial issuer.
    #[must_use]
    pub fn auto_generated(&self) -> bool {
        self.spec.auto_generated
    }

    /// The signature: base64 Ed25519 for issued records, base64 envelope for
    /// trial records.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The signed content.
    #[must_use]
    pub fn spec(&self) -> &RecordSpec {
        &self.spec
    }

    /// Serializes to the JSON wire document.
    pub fn to_json(&self) -> LicenseResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses the JSON wire document.
    pub fn from_json(json: &str) -> LicenseResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for EntitlementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] issued to {} ({} units, {} to {})",
            self.spec.id,
            self.spec.operation_mode,
            self.spec.issued_to,
            self.spec.max_units,
            self.spec.issue_date,
            self.spec.expiry_date
        )
    }
}

/// Flat wire form of a record.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordDocument {
    id: RecordId,
    version: i32,
    issued_to: String,
    issue_date: Timestamp,
    expiry_date: Timestamp,
    max_units: u32,
    operation_mode: OperationMode,
    auto_generated: bool,
    signature: String,
}

impl From<EntitlementRecord> for RecordDocument {
    fn from(record: EntitlementRecord) -> Self {
        let EntitlementRecord {
            spec,
            version,
            signature,
        } = record;
        Self {
            id: spec.id,
            version,
            issued_to: spec.issued_to,
            issue_date: spec.issue_date,
            expiry_date: spec.expiry_date,
            max_units: spec.max_units,
            operation_mode: spec.operation_mode,
            auto_generated: spec.auto_generated,
            signature,
        }
    }
}

impl TryFrom<RecordDocument> for EntitlementRecord {
    type Error = LicenseError;

    fn try_from(doc: RecordDocument) -> Result<Self, Self::Error> {
        let spec = RecordSpec {
            id: doc.id,
            issued_to: doc.issued_to,
            issue_date: doc.issue_date,
            expiry_date: doc.expiry_date,
            max_units: doc.max_units,
            operation_mode: doc.operation_mode,
            auto_generated: doc.auto_generated,
        };
        spec.into_record(doc.version, doc.signature)
    }
}

/// The value held by the replicated store.
///
/// Lifecycle: `Absent` at bootstrap, `Record` after a registration or trial
/// issuance, `Tombstone` after removal. Never returns to `Absent`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoredEntitlement {
    /// Nothing was ever stored. A trial may be issued.
    #[default]
    Absent,
    /// A live record.
    Record(Arc<EntitlementRecord>),
    /// Explicitly deleted. A trial is never issued over this.
    Tombstone,
}

impl StoredEntitlement {
    /// Wraps a record.
    pub fn record_of(record: EntitlementRecord) -> Self {
        Self::Record(Arc::new(record))
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Self::Tombstone)
    }

    /// The live record, if any.
    #[must_use]
    pub fn record(&self) -> Option<&Arc<EntitlementRecord>> {
        match self {
            Self::Record(record) => Some(record),
            Self::Absent | Self::Tombstone => None,
        }
    }
}
