//! `lb-directory`: account directory clients for LinkBridge.
//!
//! Provides the [`AccountLookup`] and [`LinkWriter`] traits, a GraphQL
//! implementation of both ([`GraphQlDirectory`]), a writer that stores the
//! link on the identity provider's management API
//! ([`ManagementApiWriter`]), and an [`InMemoryDirectory`] for development.
//!
//! # Backend selection
//!
//! Use [`create_directory`] to build the right pair based on the
//! `directory.backend` config field:
//!
//! | Backend      | Lookup              | Writer                 |
//! |--------------|---------------------|------------------------|
//! | `graphql`    | `GraphQlDirectory`  | `GraphQlDirectory`     |
//! | `management` | `GraphQlDirectory`  | `ManagementApiWriter`  |
//! | `memory`     | `InMemoryDirectory` | `InMemoryDirectory`    |

pub mod graphql;
pub mod management;
pub mod memory;
pub mod provider;
pub mod token;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use graphql::{from_reqwest, GraphQlDirectory};
pub use management::ManagementApiWriter;
pub use memory::InMemoryDirectory;
pub use provider::{AccountLookup, LinkWriter};
pub use token::ServiceTokenSigner;
pub use types::AccountRecord;

use std::sync::Arc;

use lb_domain::config::{DirectoryBackend, DirectoryConfig, ProviderSecrets};
use lb_domain::error::Result;

/// The lookup/writer pair the link flow runs against.
#[derive(Clone)]
pub struct Directory {
    pub lookup: Arc<dyn AccountLookup>,
    pub writer: Arc<dyn LinkWriter>,
}

/// Create the [`Directory`] for the configured backend.
pub fn create_directory(cfg: &DirectoryConfig, secrets: &ProviderSecrets) -> Result<Directory> {
    match cfg.backend {
        DirectoryBackend::Graphql => {
            let client = Arc::new(GraphQlDirectory::new(cfg, &secrets.gql_account_secret)?);
            tracing::info!(url = %cfg.graphql_url, "links written through account service");
            Ok(Directory {
                lookup: client.clone(),
                writer: client,
            })
        }
        DirectoryBackend::Management => {
            let lookup = Arc::new(GraphQlDirectory::new(cfg, &secrets.gql_account_secret)?);
            let writer = Arc::new(ManagementApiWriter::new(cfg, &secrets.primary)?);
            tracing::info!(
                url = %cfg.graphql_url,
                domain = %secrets.primary.domain,
                "links written through management API"
            );
            Ok(Directory { lookup, writer })
        }
        DirectoryBackend::Memory => {
            let dir = Arc::new(InMemoryDirectory::open());
            tracing::warn!("using in-memory directory; links are lost on restart");
            Ok(Directory {
                lookup: dir.clone(),
                writer: dir,
            })
        }
    }
}
