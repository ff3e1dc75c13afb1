//! The `AccountLookup` and `LinkWriter` traits define the interface for
//! all directory backends (GraphQL, management API, in-memory, test).

use async_trait::async_trait;
use lb_domain::error::Result;

use crate::types::AccountRecord;

/// Read side of the account directory.
///
/// Both lookups are side-effect free. "No such account" is `Ok(None)`;
/// every transport, auth or decode failure is `Err`, so callers can never
/// mistake an unreachable directory for an unlinked account.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    /// Fetch the account with the given primary-provider user id.
    async fn find_by_internal_id(&self, user_id: &str) -> Result<Option<AccountRecord>>;

    /// Fetch the account currently linked to the given chat-platform id.
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<AccountRecord>>;
}

/// Write side: records `user_id <-> external_id`.
///
/// Implementations must be atomic from the caller's view and accept a
/// repeated write of the same pair without producing a second record.
#[async_trait]
pub trait LinkWriter: Send + Sync {
    /// Short backend name for logs (`graphql`, `management`, `memory`).
    fn backend(&self) -> &'static str;

    async fn write(&self, user_id: &str, external_id: &str) -> Result<()>;
}
