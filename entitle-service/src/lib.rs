//! Entitlement lifecycle orchestration.
//!
//! Ties the pieces together for one cluster-wide entitlement:
//!
//! - **Registration**: verify, run the acknowledgment round, compare-and-swap
//! - **Trial issuance**: exactly one self-generated record per cluster
//!   lifetime, decided by the store's compare-and-swap
//! - **Dependents**: components told about every record or state change,
//!   once per change
//! - **Scheduling**: an `expiry` job per lifecycle boundary and one job per
//!   expiration warning policy
//!
//! # Example
//!
//! ```no_run
//! use entitle_crypto::{generate_random_key, IssuerKeyPair};
//! use entitle_service::LicensingService;
//! use entitle_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> entitle_service::ServiceResult<()> {
//! let issuer = IssuerKeyPair::generate();
//! let service = LicensingService::builder(
//!     Arc::new(MemoryStore::new()),
//!     issuer.verifying_key,
//!     generate_random_key(),
//! )
//! .build();
//!
//! service.init().await?;
//! println!("state: {}", service.current_state());
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod acknowledgment;
mod config;
mod dependent;
mod error;
mod service;
mod trial;
mod warnings;

pub use acknowledgment::{
    collect_acknowledgments, RegistrationResponse, RegistrationStatus, ACKNOWLEDGMENT_HEADER,
    LICENSE_ACK_KEY, OLDER_LICENSE_MESSAGE,
};
pub use config::{
    LicensingConfig, DEFAULT_TRIAL_DURATION_SECS, DEFAULT_TRIAL_ISSUED_TO,
    DEFAULT_TRIAL_MAX_UNITS,
};
pub use dependent::Dependent;
pub use error::{DependentError, DependentResult, ServiceError, ServiceResult};
pub use service::{LicensingService, LicensingServiceBuilder, RemoveOutcome, EXPIRY_JOB};
pub use trial::{TrialIssuer, TrialOutcome};
pub use warnings::compose_expiration_warning;
