use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::filter::{FilterCriteria, filter_tasks};
use crate::reconcile::Decision;
use crate::task::Task;

/// Outcome of applying a [`Decision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Inserted(Uuid),
    Updated(Uuid),
    Unchanged,
    Missing(Uuid),
}

/// In-memory state: the task collection and the active criteria.
///
/// The collection is replaced wholesale on every change, so a slice
/// borrowed from [`TodoStore::todo_list`] is always a complete snapshot.
#[derive(Debug, Clone, Default)]
pub struct TodoStore {
    todo_list: Vec<Task>,
    filter_status: FilterCriteria,
    revision: u64,
}

impl TodoStore {
    pub fn new(filter_status: FilterCriteria) -> Self {
        Self {
            todo_list: Vec::new(),
            filter_status,
            revision: 0,
        }
    }

    pub fn todo_list(&self) -> &[Task] {
        &self.todo_list
    }

    pub fn filter_status(&self) -> &FilterCriteria {
        &self.filter_status
    }

    /// Bumped on every change to the tasks or the criteria.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn find(&self, id: Uuid) -> Option<&Task> {
        self.todo_list.iter().find(|task| task.id == id)
    }

    pub fn visible(&self) -> Vec<Task> {
        filter_tasks(&self.todo_list, &self.filter_status)
    }

    #[tracing::instrument(skip(self, decision))]
    pub fn dispatch(&mut self, decision: Decision) -> Applied {
        match decision {
            Decision::Insert(task) => {
                let id = task.id;
                let mut next = Vec::with_capacity(self.todo_list.len() + 1);
                next.extend(self.todo_list.iter().cloned());
                next.push(task);
                self.replace(next);
                info!(%id, total = self.todo_list.len(), "task added");
                Applied::Inserted(id)
            }
            Decision::Update(task) => {
                let id = task.id;
                if self.find(id).is_none() {
                    warn!(%id, "update for unknown task ignored");
                    return Applied::Missing(id);
                }
                let next = self
                    .todo_list
                    .iter()
                    .map(|existing| {
                        if existing.id == id {
                            task.clone()
                        } else {
                            existing.clone()
                        }
                    })
                    .collect();
                self.replace(next);
                info!(%id, "task updated");
                Applied::Updated(id)
            }
            Decision::NoOp => {
                debug!("no-op decision; store untouched");
                Applied::Unchanged
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn set_filter_status(&mut self, criteria: FilterCriteria) {
        if self.filter_status == criteria {
            return;
        }
        self.filter_status = criteria;
        self.revision += 1;
        debug!(revision = self.revision, "filter criteria changed");
    }

    fn replace(&mut self, next: Vec<Task>) {
        self.todo_list = next;
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::{Applied, TodoStore};
    use crate::filter::{FilterCriteria, SortBy, StatusFilter};
    use crate::reconcile::Decision;
    use crate::task::{Priority, Status, Task};

    fn task(n: u128, status: Status) -> Task {
        Task::new(
            Uuid::from_u128(n),
            format!("task {n}"),
            status,
            Priority::Medium,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, n as u32, 0)
                .single()
                .expect("valid time"),
        )
    }

    #[test]
    fn insert_then_update_replaces_in_place() {
        let mut store = TodoStore::default();
        assert_eq!(
            store.dispatch(Decision::Insert(task(1, Status::Incomplete))),
            Applied::Inserted(Uuid::from_u128(1))
        );
        store.dispatch(Decision::Insert(task(2, Status::Incomplete)));

        let mut changed = task(1, Status::Complete);
        changed.title = "renamed".to_string();
        assert_eq!(
            store.dispatch(Decision::Update(changed)),
            Applied::Updated(Uuid::from_u128(1))
        );

        let titles: Vec<_> = store.todo_list().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["renamed", "task 2"]);
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn noop_and_unknown_updates_leave_store_alone() {
        let mut store = TodoStore::default();
        store.dispatch(Decision::Insert(task(1, Status::Incomplete)));
        let revision = store.revision();

        assert_eq!(store.dispatch(Decision::NoOp), Applied::Unchanged);
        assert_eq!(
            store.dispatch(Decision::Update(task(9, Status::Complete))),
            Applied::Missing(Uuid::from_u128(9))
        );
        assert_eq!(store.revision(), revision);
        assert_eq!(store.todo_list().len(), 1);
    }

    #[test]
    fn visible_applies_current_criteria() {
        let mut store = TodoStore::default();
        store.dispatch(Decision::Insert(task(1, Status::Incomplete)));
        store.dispatch(Decision::Insert(task(2, Status::Complete)));
        store.dispatch(Decision::Insert(task(3, Status::Incomplete)));

        store.set_filter_status(FilterCriteria {
            status: StatusFilter::Incomplete,
            sort_by: SortBy::DateNewest,
            ..FilterCriteria::default()
        });
        let ids: Vec<_> = store.visible().iter().map(|t| t.id.as_u128()).collect();
        assert_eq!(ids, vec![3, 1]);
    }
}
