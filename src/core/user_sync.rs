use crate::domain::model::{ChangeEvent, UserRecord, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Upper bound on remembered deletes. The oldest are evicted first.
pub const MAX_TOMBSTONES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Updated,
    Deleted,
    /// Older than what is already known, or a delete for an unknown id.
    Ignored,
}

/// Folds a change event into a user list, last write wins.
///
/// Inserts and updates are both upserts. When the incoming record carries
/// `updated_at` and the known state is newer, the event is ignored, so
/// replays and reordered deliveries settle on the same result. Events
/// without timestamps apply in arrival order.
///
/// Only timestamped deletes leave a tombstone; at most [`MAX_TOMBSTONES`]
/// are kept.
pub fn apply_change(
    users: &mut Vec<UserRecord>,
    tombstones: &mut HashMap<String, DateTime<Utc>>,
    event: ChangeEvent,
) -> ApplyOutcome {
    match event {
        ChangeEvent::Inserted { new } | ChangeEvent::Updated { new } => {
            if let Some(deleted_at) = tombstones.get(&new.id) {
                if matches!(new.updated_at, Some(updated) if updated <= *deleted_at) {
                    return ApplyOutcome::Ignored;
                }
            }
            tombstones.remove(&new.id);

            match users.iter_mut().find(|u| u.id == new.id) {
                Some(existing) => {
                    if is_stale(new.updated_at, existing.updated_at) {
                        return ApplyOutcome::Ignored;
                    }
                    *existing = new;
                    ApplyOutcome::Updated
                }
                None => {
                    users.push(new);
                    ApplyOutcome::Inserted
                }
            }
        }
        ChangeEvent::Deleted { id, at } => {
            let position = users.iter().position(|u| u.id == id);
            if let Some(index) = position {
                if is_stale(at, users[index].updated_at) {
                    return ApplyOutcome::Ignored;
                }
                users.remove(index);
            }
            if let Some(deleted_at) = at {
                tombstones.insert(id, deleted_at);
                evict_oldest_tombstones(tombstones);
            }
            if position.is_some() {
                ApplyOutcome::Deleted
            } else {
                ApplyOutcome::Ignored
            }
        }
    }
}

fn evict_oldest_tombstones(tombstones: &mut HashMap<String, DateTime<Utc>>) {
    while tombstones.len() > MAX_TOMBSTONES {
        let oldest = tombstones
            .iter()
            .min_by_key(|(_, deleted_at)| **deleted_at)
            .map(|(id, _)| id.clone());
        match oldest {
            Some(id) => {
                tombstones.remove(&id);
            }
            None => break,
        }
    }
}

fn is_stale(incoming: Option<DateTime<Utc>>, known: Option<DateTime<Utc>>) -> bool {
    matches!((incoming, known), (Some(incoming), Some(known)) if incoming < known)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserFilter {
    /// Case-insensitive match on name or email.
    pub query: String,
    pub role: Option<UserRole>,
    pub active_only: bool,
}

impl UserFilter {
    pub fn matches(&self, user: &UserRecord) -> bool {
        if self.active_only && !user.active {
            return false;
        }
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        let query = self.query.trim().to_lowercase();
        query.is_empty()
            || user.email.to_lowercase().contains(&query)
            || user.full_name.to_lowercase().contains(&query)
    }
}

/// Admin panel user list kept in sync with the backend change feed.
/// Filter and selection survive every applied event.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<UserRecord>,
    tombstones: HashMap<String, DateTime<Utc>>,
    filter: UserFilter,
    selected: BTreeSet<String>,
}

impl UserDirectory {
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self {
            users,
            ..Self::default()
        }
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn apply(&mut self, event: ChangeEvent) -> ApplyOutcome {
        let id = event.record_id().to_string();
        let outcome = apply_change(&mut self.users, &mut self.tombstones, event);

        if outcome == ApplyOutcome::Deleted {
            self.selected.remove(&id);
        }
        tracing::debug!("User change {:?} for {}", outcome, id);
        outcome
    }

    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    pub fn apply_all<I: IntoIterator<Item = ChangeEvent>>(&mut self, events: I) {
        for event in events {
            self.apply(event);
        }
    }

    pub fn filter(&self) -> &UserFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: UserFilter) {
        self.filter = filter;
    }

    pub fn visible(&self) -> Vec<&UserRecord> {
        self.users.iter().filter(|u| self.filter.matches(u)).collect()
    }

    /// Returns false for ids not in the list.
    pub fn select(&mut self, id: &str) -> bool {
        if self.users.iter().any(|u| u.id == id) {
            self.selected.insert(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn deselect(&mut self, id: &str) {
        self.selected.remove(id);
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, minute, 0).unwrap()
    }

    fn user(id: &str, name: &str, updated: Option<DateTime<Utc>>) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            email: format!("{}@fazenda.com.br", id),
            full_name: name.to_string(),
            role: UserRole::Producer,
            active: true,
            updated_at: updated,
        }
    }

    #[test]
    fn test_insert_update_delete() {
        let mut dir = UserDirectory::default();

        assert_eq!(
            dir.apply(ChangeEvent::Inserted { new: user("u1", "Ana", None) }),
            ApplyOutcome::Inserted
        );
        assert_eq!(
            dir.apply(ChangeEvent::Updated { new: user("u1", "Ana Paula", None) }),
            ApplyOutcome::Updated
        );
        assert_eq!(dir.users()[0].full_name, "Ana Paula");

        assert_eq!(
            dir.apply(ChangeEvent::Deleted { id: "u1".to_string(), at: None }),
            ApplyOutcome::Deleted
        );
        assert!(dir.users().is_empty());
    }

    #[test]
    fn test_update_for_unknown_id_upserts() {
        let mut dir = UserDirectory::default();
        assert_eq!(
            dir.apply(ChangeEvent::Updated { new: user("u9", "Bruno", None) }),
            ApplyOutcome::Inserted
        );
        assert_eq!(dir.users().len(), 1);
    }

    #[test]
    fn test_duplicate_insert_is_idempotent() {
        let mut dir = UserDirectory::default();
        let event = ChangeEvent::Inserted { new: user("u1", "Ana", Some(at(1))) };
        dir.apply(event.clone());
        dir.apply(event);
        assert_eq!(dir.users().len(), 1);
    }

    #[test]
    fn test_out_of_order_updates_keep_newest() {
        let mut dir = UserDirectory::new(vec![user("u1", "v1", Some(at(1)))]);

        dir.apply(ChangeEvent::Updated { new: user("u1", "v3", Some(at(3))) });
        assert_eq!(
            dir.apply(ChangeEvent::Updated { new: user("u1", "v2", Some(at(2))) }),
            ApplyOutcome::Ignored
        );
        assert_eq!(dir.users()[0].full_name, "v3");
    }

    #[test]
    fn test_late_insert_after_delete_is_ignored() {
        let mut dir = UserDirectory::default();
        assert_eq!(
            dir.apply(ChangeEvent::Deleted { id: "u1".to_string(), at: Some(at(5)) }),
            ApplyOutcome::Ignored
        );
        assert_eq!(
            dir.apply(ChangeEvent::Inserted { new: user("u1", "Ana", Some(at(4))) }),
            ApplyOutcome::Ignored
        );
        assert!(dir.users().is_empty());

        // A genuinely newer insert revives the id.
        assert_eq!(
            dir.apply(ChangeEvent::Inserted { new: user("u1", "Ana", Some(at(6))) }),
            ApplyOutcome::Inserted
        );
    }

    #[test]
    fn test_stale_delete_is_ignored() {
        let mut dir = UserDirectory::new(vec![user("u1", "Ana", Some(at(10)))]);
        dir.select("u1");

        assert_eq!(
            dir.apply(ChangeEvent::Deleted { id: "u1".to_string(), at: Some(at(5)) }),
            ApplyOutcome::Ignored
        );
        assert_eq!(dir.users().len(), 1);
        assert!(dir.selected().contains("u1"));
        assert_eq!(dir.tombstone_count(), 0);
    }

    #[test]
    fn test_untimed_delete_leaves_no_tombstone() {
        let mut dir = UserDirectory::new(vec![user("u1", "Ana", None)]);
        dir.apply(ChangeEvent::Deleted { id: "u1".to_string(), at: None });
        assert_eq!(dir.tombstone_count(), 0);
    }

    #[test]
    fn test_tombstones_are_capped_oldest_first() {
        let mut dir = UserDirectory::default();
        let total = MAX_TOMBSTONES + 10;
        for i in 0..total {
            let deleted_at = Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap();
            dir.apply(ChangeEvent::Deleted { id: format!("u{}", i), at: Some(deleted_at) });
        }
        assert_eq!(dir.tombstone_count(), MAX_TOMBSTONES);

        // The newest delete still guards against a late insert.
        let newest = total - 1;
        let late = Utc.timestamp_opt(1_700_000_000 + newest as i64 - 1, 0).unwrap();
        let late_insert = ChangeEvent::Inserted {
            new: user(&format!("u{}", newest), "Ana", Some(late)),
        };
        assert_eq!(dir.apply(late_insert), ApplyOutcome::Ignored);

        // The oldest was evicted, so the same late insert goes through.
        let early = Utc.timestamp_opt(1_699_999_999, 0).unwrap();
        assert_eq!(
            dir.apply(ChangeEvent::Inserted { new: user("u0", "Bruno", Some(early)) }),
            ApplyOutcome::Inserted
        );
    }

    #[test]
    fn test_filter_and_selection_survive_events() {
        let mut dir = UserDirectory::new(vec![
            user("u1", "Ana", None),
            user("u2", "Bruno", None),
            user("u3", "Carla", None),
        ]);
        dir.set_filter(UserFilter {
            query: "an".to_string(),
            ..UserFilter::default()
        });
        assert!(dir.select("u1"));
        assert!(dir.select("u2"));
        assert!(!dir.select("nope"));

        dir.apply(ChangeEvent::Inserted { new: user("u4", "Fernanda", None) });
        dir.apply(ChangeEvent::Deleted { id: "u2".to_string(), at: None });

        assert_eq!(dir.filter().query, "an");
        let visible: Vec<&str> = dir.visible().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(visible, vec!["u1", "u4"]);
        assert_eq!(dir.selected().iter().collect::<Vec<_>>(), vec!["u1"]);
    }

    #[test]
    fn test_filter_by_role_and_active() {
        let mut admin = user("u1", "Ana", None);
        admin.role = UserRole::Admin;
        let mut inactive = user("u2", "Bruno", None);
        inactive.active = false;

        let filter = UserFilter {
            query: String::new(),
            role: Some(UserRole::Admin),
            active_only: true,
        };
        assert!(filter.matches(&admin));
        assert!(!filter.matches(&inactive));
    }
}
