//! Configuration and wiring for the entitlement node.

use anyhow::{Context, Result};
use entitle_crypto::{EnvelopeKey, IssuerVerifyingKey, KdfParams, Salt};
use entitle_license::{EntitlementRecord, LifecycleState};
use entitle_service::{Dependent, DependentResult, LicensingConfig, LicensingService};
use entitle_store::MemoryStore;
use serde::Deserialize;
use std::{fs, path::Path, sync::Arc};
use tracing::{info, warn};

/// On-disk node configuration (TOML).
///
/// ```toml
/// cluster_secret = "shared by every node"
/// issuer_public_key = "base64 Ed25519 public key"
/// leader = true
///
/// [licensing]
/// trial_duration_secs = 2592000
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Secret every node derives the trial envelope key from.
    pub cluster_secret: String,
    /// Base64 of the vendor's Ed25519 verifying key.
    pub issuer_public_key: String,
    /// Whether this node acts as the elected writer.
    #[serde(default = "default_leader")]
    pub leader: bool,
    /// Use cheap key derivation (local demos only).
    #[serde(default)]
    pub fast_kdf: bool,
    #[serde(default)]
    pub licensing: LicensingConfig,
}

fn default_leader() -> bool {
    true
}

impl NodeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse node config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading config from {:?}", path);
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Derives the cluster envelope key from the shared secret.
    pub fn envelope_key(&self) -> Result<EnvelopeKey> {
        let params = if self.fast_kdf {
            KdfParams::fast()
        } else {
            KdfParams::default()
        };
        EnvelopeKey::derive(&self.cluster_secret, &Salt::DEFAULT, &params)
            .context("Failed to derive envelope key from cluster secret")
    }

    pub fn issuer_key(&self) -> Result<IssuerVerifyingKey> {
        IssuerVerifyingKey::from_base64(&self.issuer_public_key)
            .context("Invalid issuer_public_key")
    }
}

/// A dependent that reports every entitlement change in the log.
pub struct LoggingDependent {
    id: String,
}

impl LoggingDependent {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Dependent for LoggingDependent {
    fn id(&self) -> &str {
        &self.id
    }

    fn on_change(
        &self,
        record: Option<&EntitlementRecord>,
        state: LifecycleState,
    ) -> DependentResult<()> {
        match record {
            Some(record) => info!(dependent = %self.id, %state, "Entitlement: {}", record),
            None => warn!(dependent = %self.id, %state, "No entitlement installed"),
        }
        Ok(())
    }

    fn expiration_messages(&self) -> Vec<String> {
        vec![format!("{} stops accepting new work", self.id)]
    }
}

/// A single-node store and a service wired to it.
pub struct Node {
    pub store: Arc<MemoryStore>,
    pub service: Arc<LicensingService>,
}

impl Node {
    pub fn build(config: &NodeConfig) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        store.set_leader(config.leader);

        let service = LicensingService::builder(
            store.clone(),
            config.issuer_key()?,
            config.envelope_key()?,
        )
        .config(config.licensing.clone())
        .dependent(Arc::new(LoggingDependent::new("node")))
        .build();

        Ok(Self { store, service })
    }
}

/// Reads a license document (JSON) from disk.
pub fn read_license(path: &Path) -> Result<EntitlementRecord> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read license file {}", path.display()))?;
    EntitlementRecord::from_json(&text).context("Failed to decode license")
}
