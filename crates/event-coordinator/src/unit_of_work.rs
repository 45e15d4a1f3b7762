use mapping_rules::UserId;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// A level change held until the unit of work is flushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLevelChange {
    pub user_id: UserId,
    pub new_level_id: i64,
    pub new_level_name: String,
    pub old_level_names: String,
}

/// Transient state for one logical host operation.
///
/// Created by [`EventCoordinator::begin`](crate::EventCoordinator::begin)
/// and consumed by [`EventCoordinator::flush`](crate::EventCoordinator::flush),
/// so nothing in here can outlive the operation or be flushed twice.
#[derive(Debug)]
pub struct UnitOfWork {
    id: Uuid,
    old_levels: HashMap<UserId, Vec<String>>,
    pending: Vec<PendingLevelChange>,
    checkout_users: HashSet<UserId>,
}

impl UnitOfWork {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            old_levels: HashMap::new(),
            pending: Vec::new(),
            checkout_users: HashSet::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Replace the cached pre-change level names for `user_id`.
    pub(crate) fn capture_old_levels(&mut self, user_id: UserId, names: Vec<String>) {
        self.old_levels.insert(user_id, names);
    }

    /// Cached level names joined with `", "`, empty when nothing was captured.
    pub fn old_level_names(&self, user_id: UserId) -> String {
        self.old_levels
            .get(&user_id)
            .map(|names| names.join(", "))
            .unwrap_or_default()
    }

    pub(crate) fn mark_checkout(&mut self, user_id: UserId) {
        self.checkout_users.insert(user_id);
    }

    pub fn checked_out(&self, user_id: UserId) -> bool {
        self.checkout_users.contains(&user_id)
    }

    pub(crate) fn defer(&mut self, change: PendingLevelChange) {
        self.pending.push(change);
    }

    pub fn pending(&self) -> &[PendingLevelChange] {
        &self.pending
    }

    pub(crate) fn into_parts(self) -> (Vec<PendingLevelChange>, HashSet<UserId>) {
        (self.pending, self.checkout_users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_old_levels_overwritten() {
        let mut uow = UnitOfWork::new();
        assert_eq!(uow.old_level_names(1), "");

        uow.capture_old_levels(1, vec!["Bronze".into(), "Silver".into()]);
        assert_eq!(uow.old_level_names(1), "Bronze, Silver");

        uow.capture_old_levels(1, vec!["Gold".into()]);
        assert_eq!(uow.old_level_names(1), "Gold");
    }

    #[test]
    fn test_units_are_independent() {
        let mut first = UnitOfWork::new();
        first.mark_checkout(7);
        let second = UnitOfWork::new();

        assert_ne!(first.id(), second.id());
        assert!(first.checked_out(7));
        assert!(!second.checked_out(7));
    }
}
