//! Ownership registry: single owner per file, contributor sets, and advisory
//! locks.
//!
//! The three facets are independent. The registry does not require the lock
//! holder to be the owner; coupling the two is a caller-level policy.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::errors::OwnershipError;

/// Per-path ownership state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRecord {
    pub owner: Option<String>,
    /// Providers who touched the file but do not own it. Never contains the owner.
    pub contributors: BTreeSet<String>,
    pub lock_holder: Option<String>,
}

/// Not synchronized on its own; the tracker serializes access.
#[derive(Debug, Default)]
pub struct OwnershipRegistry {
    files: HashMap<String, FileRecord>,
}

impl OwnershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Ownership
    // -----------------------------------------------------------------------

    /// Set the owner of an unowned file.
    pub fn assign_owner(&mut self, path: &str, provider: &str) -> Result<(), OwnershipError> {
        let record = self.files.entry(path.to_string()).or_default();
        if let Some(owner) = &record.owner {
            warn!(path, provider, owner = %owner, "owner assignment rejected");
            return Err(OwnershipError::AlreadyOwned {
                path: path.to_string(),
                owner: owner.clone(),
            });
        }
        record.contributors.remove(provider);
        record.owner = Some(provider.to_string());
        info!(path, provider, "owner assigned");
        Ok(())
    }

    /// Move ownership to `new_owner`; the previous owner becomes a contributor.
    pub fn transfer_ownership(
        &mut self,
        path: &str,
        new_owner: &str,
    ) -> Result<(), OwnershipError> {
        let record = self
            .files
            .get_mut(path)
            .filter(|r| r.owner.is_some())
            .ok_or_else(|| OwnershipError::NotFound(path.to_string()))?;

        let previous = record.owner.replace(new_owner.to_string());
        record.contributors.remove(new_owner);
        if let Some(previous) = previous.filter(|p| p != new_owner) {
            info!(path, from = %previous, to = new_owner, "ownership transferred");
            record.contributors.insert(previous);
        }
        Ok(())
    }

    pub fn owner(&self, path: &str) -> Option<String> {
        self.files.get(path).and_then(|r| r.owner.clone())
    }

    /// Paths owned by `provider`, sorted.
    pub fn owned_files(&self, provider: &str) -> Vec<String> {
        let mut paths: Vec<String> = self
            .files
            .iter()
            .filter(|(_, r)| r.owner.as_deref() == Some(provider))
            .map(|(p, _)| p.clone())
            .collect();
        paths.sort();
        paths
    }

    // -----------------------------------------------------------------------
    // Contribution
    // -----------------------------------------------------------------------

    /// Add `provider` to the contributor set. Returns `false` when the
    /// provider owns the file or is already a contributor.
    pub fn add_contributor(&mut self, path: &str, provider: &str) -> bool {
        let record = self.files.entry(path.to_string()).or_default();
        if record.owner.as_deref() == Some(provider) {
            return false;
        }
        let added = record.contributors.insert(provider.to_string());
        if added {
            debug!(path, provider, "contributor added");
        }
        added
    }

    pub fn contributors(&self, path: &str) -> Vec<String> {
        self.files
            .get(path)
            .map(|r| r.contributors.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Authorship bookkeeping for a tracked operation: the first writer of an
    /// unowned file becomes its owner, everyone after that a contributor.
    pub fn note_author(&mut self, path: &str, provider: &str) {
        let record = self.files.entry(path.to_string()).or_default();
        match &record.owner {
            None => {
                record.contributors.remove(provider);
                record.owner = Some(provider.to_string());
                info!(path, provider, "owner assigned");
            }
            Some(owner) if owner != provider => {
                if record.contributors.insert(provider.to_string()) {
                    debug!(path, provider, "contributor added");
                }
            }
            Some(_) => {}
        }
    }

    // -----------------------------------------------------------------------
    // Locking
    // -----------------------------------------------------------------------

    /// Take the advisory lock. Never waits: a held lock is an immediate error,
    /// even when the caller already holds it.
    pub fn lock_file(&mut self, path: &str, provider: &str) -> Result<(), OwnershipError> {
        let record = self.files.entry(path.to_string()).or_default();
        if let Some(holder) = &record.lock_holder {
            debug!(path, provider, holder = %holder, "lock denied");
            return Err(OwnershipError::Locked {
                path: path.to_string(),
                holder: holder.clone(),
            });
        }
        record.lock_holder = Some(provider.to_string());
        info!(path, provider, "lock acquired");
        Ok(())
    }

    /// Release the lock. Only the current holder may do so.
    pub fn unlock_file(&mut self, path: &str, provider: &str) -> Result<(), OwnershipError> {
        let Some(record) = self.files.get_mut(path) else {
            return Err(OwnershipError::NotLocked(path.to_string()));
        };

        match record.lock_holder.clone() {
            None => Err(OwnershipError::NotLocked(path.to_string())),
            Some(holder) if holder == provider => {
                record.lock_holder = None;
                info!(path, provider, "lock released");
                Ok(())
            }
            Some(holder) => {
                warn!(path, provider, holder = %holder, "unlock by non-holder rejected");
                Err(OwnershipError::WrongOwner {
                    path: path.to_string(),
                    holder,
                    provider: provider.to_string(),
                })
            }
        }
    }

    pub fn lock_holder(&self, path: &str) -> Option<String> {
        self.files.get(path).and_then(|r| r.lock_holder.clone())
    }

    pub fn is_locked(&self, path: &str) -> bool {
        self.files
            .get(path)
            .is_some_and(|r| r.lock_holder.is_some())
    }

    /// `(path, holder)` pairs for every locked file, sorted by path.
    pub fn locked_files(&self) -> Vec<(String, String)> {
        let mut locked: Vec<(String, String)> = self
            .files
            .iter()
            .filter_map(|(p, r)| r.lock_holder.clone().map(|h| (p.clone(), h)))
            .collect();
        locked.sort();
        locked
    }

    // -----------------------------------------------------------------------
    // Misc
    // -----------------------------------------------------------------------

    pub fn record(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    pub fn owned_count(&self) -> usize {
        self.files.values().filter(|r| r.owner.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_owner_once() {
        let mut reg = OwnershipRegistry::new();
        reg.assign_owner("a.rs", "p1").unwrap();
        let err = reg.assign_owner("a.rs", "p2").unwrap_err();
        assert_eq!(
            err,
            OwnershipError::AlreadyOwned {
                path: "a.rs".into(),
                owner: "p1".into()
            }
        );
        assert_eq!(reg.owner("a.rs").as_deref(), Some("p1"));
    }

    #[test]
    fn test_transfer_ownership() {
        let mut reg = OwnershipRegistry::new();
        reg.assign_owner("a.rs", "A").unwrap();
        reg.add_contributor("a.rs", "B");
        reg.transfer_ownership("a.rs", "B").unwrap();
        assert_eq!(reg.owner("a.rs").as_deref(), Some("B"));
        assert_eq!(reg.contributors("a.rs"), vec!["A".to_string()]);
    }

    #[test]
    fn test_transfer_without_owner() {
        let mut reg = OwnershipRegistry::new();
        assert_eq!(
            reg.transfer_ownership("a.rs", "B"),
            Err(OwnershipError::NotFound("a.rs".into()))
        );
        reg.add_contributor("a.rs", "C");
        assert!(reg.transfer_ownership("a.rs", "B").is_err());
    }

    #[test]
    fn test_owner_is_never_contributor() {
        let mut reg = OwnershipRegistry::new();
        reg.assign_owner("a.rs", "p1").unwrap();
        assert!(!reg.add_contributor("a.rs", "p1"));
        assert!(reg.add_contributor("a.rs", "p2"));
        assert!(!reg.add_contributor("a.rs", "p2"));
        assert_eq!(reg.contributors("a.rs"), vec!["p2".to_string()]);
    }

    #[test]
    fn test_note_author() {
        let mut reg = OwnershipRegistry::new();
        reg.note_author("a.rs", "p1");
        reg.note_author("a.rs", "p2");
        reg.note_author("a.rs", "p1");
        assert_eq!(reg.owner("a.rs").as_deref(), Some("p1"));
        assert_eq!(reg.contributors("a.rs"), vec!["p2".to_string()]);
        assert_eq!(reg.owned_files("p1"), vec!["a.rs".to_string()]);
        assert!(reg.owned_files("p2").is_empty());
    }

    #[test]
    fn test_lock_lifecycle() {
        let mut reg = OwnershipRegistry::new();
        reg.lock_file("f", "p1").unwrap();
        assert!(reg.is_locked("f"));
        assert_eq!(reg.lock_holder("f").as_deref(), Some("p1"));
        assert!(matches!(
            reg.lock_file("f", "p2"),
            Err(OwnershipError::Locked { .. })
        ));
        assert!(matches!(
            reg.lock_file("f", "p1"),
            Err(OwnershipError::Locked { .. })
        ));
        assert!(matches!(
            reg.unlock_file("f", "p2"),
            Err(OwnershipError::WrongOwner { .. })
        ));
        reg.unlock_file("f", "p1").unwrap();
        assert_eq!(
            reg.unlock_file("f", "p1"),
            Err(OwnershipError::NotLocked("f".into()))
        );
        reg.lock_file("f", "p2").unwrap();
        assert_eq!(reg.locked_files(), vec![("f".into(), "p2".into())]);
    }

    #[test]
    fn test_unlock_unknown_path() {
        let mut reg = OwnershipRegistry::new();
        assert_eq!(
            reg.unlock_file("nope", "p1"),
            Err(OwnershipError::NotLocked("nope".into()))
        );
    }

    #[test]
    fn test_lock_independent_of_owner() {
        let mut reg = OwnershipRegistry::new();
        reg.assign_owner("f", "A").unwrap();
        reg.lock_file("f", "B").unwrap();
        assert_eq!(reg.owner("f").as_deref(), Some("A"));
        assert_eq!(reg.lock_holder("f").as_deref(), Some("B"));
    }
}
