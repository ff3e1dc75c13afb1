//! In-process directory for local development and tests.
//!
//! Enforces the one-to-one invariant itself: a write that would give an
//! account a second chat id, or a chat id a second account, is rejected
//! with [`Error::Conflict`]. Rewriting an existing pair is a no-op.

use std::collections::HashMap;

use async_trait::async_trait;
use lb_domain::error::{Error, Result};
use parking_lot::RwLock;

use crate::provider::{AccountLookup, LinkWriter};
use crate::types::AccountRecord;

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    accounts: RwLock<HashMap<String, AccountRecord>>,
    /// When set, any user id is treated as an existing unlinked account.
    open_enrollment: bool,
}

impl InMemoryDirectory {
    /// A directory that only knows the accounts inserted into it.
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory where every primary user implicitly has an account.
    pub fn open() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            open_enrollment: true,
        }
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = AccountRecord>) -> Self {
        let dir = Self::new();
        for account in accounts {
            dir.insert(account);
        }
        dir
    }

    pub fn insert(&self, account: AccountRecord) {
        self.accounts.write().insert(account.id.clone(), account);
    }

    pub fn get(&self, user_id: &str) -> Option<AccountRecord> {
        self.accounts.read().get(user_id).cloned()
    }

    /// Number of accounts holding a link.
    pub fn link_count(&self) -> usize {
        self.accounts
            .read()
            .values()
            .filter(|a| a.linked_external_id().is_some())
            .count()
    }
}

#[async_trait]
impl AccountLookup for InMemoryDirectory {
    async fn find_by_internal_id(&self, user_id: &str) -> Result<Option<AccountRecord>> {
        let found = self.get(user_id);
        if found.is_none() && self.open_enrollment {
            return Ok(Some(AccountRecord::unlinked(user_id)));
        }
        Ok(found)
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<AccountRecord>> {
        Ok(self
            .accounts
            .read()
            .values()
            .find(|a| a.linked_external_id() == Some(external_id))
            .cloned())
    }
}

#[async_trait]
impl LinkWriter for InMemoryDirectory {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn write(&self, user_id: &str, external_id: &str) -> Result<()> {
        let mut accounts = self.accounts.write();

        if let Some(holder) = accounts
            .values()
            .find(|a| a.linked_external_id() == Some(external_id) && a.id != user_id)
        {
            return Err(Error::Conflict(format!(
                "{external_id} is already linked to {}",
                holder.id
            )));
        }

        if !accounts.contains_key(user_id) {
            if !self.open_enrollment {
                return Err(Error::Directory(format!("no account {user_id}")));
            }
            accounts.insert(user_id.to_owned(), AccountRecord::unlinked(user_id));
        }

        let account = accounts
            .get_mut(user_id)
            .ok_or_else(|| Error::Directory(format!("no account {user_id}")))?;
        match account.linked_external_id() {
            Some(existing) if existing == external_id => Ok(()),
            Some(existing) => Err(Error::Conflict(format!(
                "{user_id} is already linked to {existing}"
            ))),
            None => {
                account.discord_id = Some(external_id.to_owned());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repeated_write_of_same_pair_is_idempotent() {
        let dir = InMemoryDirectory::with_accounts([AccountRecord::unlinked("u1")]);
        dir.write("u1", "d1").await.unwrap();
        dir.write("u1", "d1").await.unwrap();

        assert_eq!(dir.link_count(), 1);
        let rec = dir.find_by_external_id("d1").await.unwrap().unwrap();
        assert_eq!(rec.id, "u1");
    }

    #[tokio::test]
    async fn second_chat_id_for_account_is_rejected() {
        let dir = InMemoryDirectory::with_accounts([AccountRecord::unlinked("u1")]);
        dir.write("u1", "d1").await.unwrap();
        let err = dir.write("u1", "d2").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(dir.get("u1").unwrap().linked_external_id(), Some("d1"));
    }

    #[tokio::test]
    async fn chat_id_cannot_move_to_another_account() {
        let dir = InMemoryDirectory::with_accounts([
            AccountRecord::unlinked("u1"),
            AccountRecord::unlinked("u2"),
        ]);
        dir.write("u1", "d1").await.unwrap();
        let err = dir.write("u2", "d1").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(dir.get("u2").unwrap().linked_external_id().is_none());
    }

    #[tokio::test]
    async fn unknown_account_is_absent_not_error() {
        let dir = InMemoryDirectory::new();
        assert!(dir.find_by_internal_id("ghost").await.unwrap().is_none());
        assert!(dir.write("ghost", "d1").await.is_err());
    }

    #[tokio::test]
    async fn open_directory_enrolls_on_write_only() {
        let dir = InMemoryDirectory::open();
        let rec = dir.find_by_internal_id("u9").await.unwrap().unwrap();
        assert!(rec.linked_external_id().is_none());
        assert!(dir.get("u9").is_none(), "lookup must not create records");

        dir.write("u9", "d9").await.unwrap();
        assert_eq!(dir.get("u9").unwrap().linked_external_id(), Some("d9"));
    }
}
