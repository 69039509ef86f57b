//! Components whose behavior depends on the installed entitlement.

use crate::error::DependentResult;
use entitle_license::{EntitlementRecord, LifecycleState};

/// A component that reacts to entitlement changes.
///
/// Callbacks run synchronously on service tasks and must not block for long.
/// The service never holds its own locks while calling into a dependent.
pub trait Dependent: Send + Sync {
    /// Stable identifier, used as the key of acknowledgment messages.
    fn id(&self) -> &str;

    /// Called when the installed record or the derived state changes.
    ///
    /// `record` is `None` when nothing is installed (absent or removed).
    fn on_change(
        &self,
        record: Option<&EntitlementRecord>,
        state: LifecycleState,
    ) -> DependentResult<()>;

    /// Lines describing what stops working once the entitlement expires.
    fn expiration_messages(&self) -> Vec<String> {
        Vec::new()
    }

    /// Lines describing what replacing `current` with `new` would take away.
    /// A non-empty answer makes registration require acknowledgment.
    fn acknowledgment_messages(
        &self,
        _current: &EntitlementRecord,
        _new: &EntitlementRecord,
    ) -> Vec<String> {
        Vec::new()
    }
}
