use std::collections::HashSet;

use shared::domain::{Entity, Patchable};

/// In-memory view of one entity kind.
///
/// `related` carries derived collections for kinds that have them (project
/// members, chat threads); it is `()` otherwise. Transitions never fail: an
/// identifier that is not held makes `patch_by_id` and `remove_by_id` no-ops.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState<E, R = ()> {
    pub items: Vec<E>,
    pub current: Option<E>,
    pub loading: bool,
    pub error: Option<String>,
    pub related: R,
}

impl<E, R: Default> Default for EntityState<E, R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current: None,
            loading: false,
            error: None,
            related: R::default(),
        }
    }
}

impl<E: Entity, R> EntityState<E, R> {
    /// Total replacement after a list fetch. Later duplicates of an identifier
    /// are dropped.
    pub fn replace_all(&mut self, mut items: Vec<E>) {
        let mut seen = HashSet::with_capacity(items.len());
        items.retain(|item| seen.insert(item.id().clone()));
        self.items = items;
    }

    pub fn set_current(&mut self, item: Option<E>) {
        self.current = item;
    }

    /// Adds a created record at the end. A record whose identifier is already
    /// held replaces the held one in place.
    pub fn append(&mut self, item: E) {
        match self.position(item.id()) {
            Some(index) => self.items[index] = item,
            None => self.items.push(item),
        }
    }

    /// Drops the matching record and clears `current` if it was the one.
    /// Returns whether anything changed.
    pub fn remove_by_id(&mut self, id: &E::Id) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        let mut changed = self.items.len() != before;
        if self.current.as_ref().is_some_and(|item| item.id() == id) {
            self.current = None;
            changed = true;
        }
        changed
    }

    pub fn find(&self, id: &E::Id) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    fn position(&self, id: &E::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }
}

impl<E: Patchable, R> EntityState<E, R> {
    /// Shallow-merges `patch` into the matching record and into `current`
    /// when it holds the same identifier. Returns whether anything changed.
    pub fn patch_by_id(&mut self, id: &E::Id, patch: E::Patch) -> bool {
        let mut changed = false;
        if let Some(current) = self.current.as_mut().filter(|item| item.id() == id) {
            current.merge(patch.clone());
            changed = true;
        }
        if let Some(index) = self.position(id) {
            self.items[index].merge(patch);
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use shared::domain::{Task, TaskId, TaskPatch, TaskStatus};

    use super::*;

    fn task(id: &str, title: &str) -> Task {
        serde_json::from_value(serde_json::json!({ "id": id, "title": title })).expect("task")
    }

    #[test]
    fn replace_all_discards_prior_contents() {
        let mut state = EntityState::<Task>::default();
        state.append(task("t0", "old"));
        state.replace_all(vec![task("t1", "a"), task("t2", "b"), task("t1", "dup")]);
        let ids: Vec<_> = state.items.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
        assert_eq!(state.items[0].title, "a");
    }

    #[test]
    fn replace_all_dedupes_large_lists_in_order() {
        let mut state = EntityState::<Task>::default();
        let items: Vec<Task> = (0..5_000)
            .map(|n| task(&format!("t{}", n % 2_500), &format!("copy {}", n / 2_500)))
            .collect();
        state.replace_all(items);
        assert_eq!(state.items.len(), 2_500);
        assert_eq!(state.items[0].id.as_str(), "t0");
        assert_eq!(state.items[2_499].id.as_str(), "t2499");
        assert!(state.items.iter().all(|t| t.title == "copy 0"));
    }

    #[test]
    fn append_keeps_one_record_per_id() {
        let mut state = EntityState::<Task>::default();
        state.append(task("t1", "first"));
        state.append(task("t2", "second"));
        state.append(task("t1", "again"));
        assert_eq!(state.items.len(), 2);
        assert_eq!(state.items[0].title, "again");
    }

    #[test]
    fn patch_by_id_updates_list_and_current() {
        let mut state = EntityState::<Task>::default();
        state.replace_all(vec![task("t1", "T1")]);
        state.set_current(Some(task("t1", "T1")));
        let changed = state.patch_by_id(
            &TaskId::from("t1"),
            TaskPatch {
                status: Some(TaskStatus::Done),
                ..TaskPatch::default()
            },
        );
        assert!(changed);
        assert_eq!(state.items[0].status, TaskStatus::Done);
        assert_eq!(state.items[0].title, "T1");
        assert_eq!(state.current.as_ref().map(|t| t.status), Some(TaskStatus::Done));
    }

    #[test]
    fn unknown_ids_leave_state_untouched() {
        let mut state = EntityState::<Task>::default();
        state.replace_all(vec![task("t1", "T1")]);
        state.set_current(Some(task("t1", "T1")));
        let before = state.clone();

        assert!(!state.patch_by_id(&TaskId::from("nope"), TaskPatch::default()));
        assert!(!state.remove_by_id(&TaskId::from("nope")));
        assert_eq!(state, before);
    }

    #[test]
    fn remove_by_id_clears_matching_current() {
        let mut state = EntityState::<Task>::default();
        state.replace_all(vec![task("t1", "T1"), task("t2", "T2")]);
        state.set_current(Some(task("t1", "T1")));
        assert!(state.remove_by_id(&TaskId::from("t1")));
        assert!(state.current.is_none());
        assert_eq!(state.items.len(), 1);

        state.set_current(Some(task("t2", "T2")));
        state.remove_by_id(&TaskId::from("t9"));
        assert!(state.current.is_some());
    }

    #[test]
    fn flags_are_independent_of_items() {
        let mut state = EntityState::<Task>::default();
        state.set_loading(true);
        state.set_error(Some("boom".into()));
        state.replace_all(vec![task("t1", "T1")]);
        assert!(state.loading);
        assert_eq!(state.error.as_deref(), Some("boom"));
    }
}
