//! Turns a submitted task form into an add/update decision.
//!
//! Nothing here touches the store; callers hand the [`Decision`] to
//! [`crate::store::TodoStore::dispatch`].

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::task::{Priority, Status, Task};

/// Source of fresh task identifiers.
pub trait IdGenerator {
    fn next_id(&mut self) -> Uuid;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4;

impl IdGenerator for UuidV4 {
    fn next_id(&mut self) -> Uuid {
        Uuid::new_v4()
    }
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub title: String,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new()
    }
}

impl FormState {
    /// Blank form shown when adding a task.
    pub fn new() -> Self {
        Self {
            title: String::new(),
            status: Some(Status::Incomplete),
            priority: Some(Priority::Low),
            due_date: None,
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            status: Some(task.status),
            priority: Some(task.priority),
            due_date: task.due_date,
        }
    }

    /// The due date field is only offered while the task is incomplete.
    pub fn shows_due_date(&self) -> bool {
        self.status == Some(Status::Incomplete)
    }

    pub fn due_date_passed(&self, now: DateTime<Utc>) -> bool {
        self.shows_due_date() && self.due_date.map(|due| due < now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum SubmitMode<'a> {
    Add,
    Update(&'a Task),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Insert(Task),
    Update(Task),
    NoOp,
}

/// Returns `None` when the form is missing a title, status or priority;
/// the form should stay open and nothing is dispatched.
#[instrument(skip(form, ids, clock))]
pub fn submit<I, C>(
    mode: SubmitMode<'_>,
    form: &FormState,
    ids: &mut I,
    clock: &C,
) -> Option<Decision>
where
    I: IdGenerator + ?Sized,
    C: Clock + ?Sized,
{
    let (Some(status), Some(priority)) = (form.status, form.priority) else {
        debug!("form is missing status or priority; discarding submission");
        return None;
    };
    if form.title.is_empty() {
        debug!("form is missing a title; discarding submission");
        return None;
    }

    let due_date = match status {
        Status::Incomplete => Some(form.due_date),
        Status::Complete => None,
    };

    match mode {
        SubmitMode::Add => {
            let mut task = Task::new(
                ids.next_id(),
                form.title.clone(),
                status,
                priority,
                clock.now(),
            );
            task.due_date = due_date.flatten();
            debug!(id = %task.id, "prepared insert");
            Some(Decision::Insert(task))
        }
        SubmitMode::Update(existing) => {
            let unchanged = existing.title == form.title
                && existing.status == status
                && existing.priority == priority
                && existing.due_date == form.due_date;
            if unchanged {
                debug!(id = %existing.id, "form matches task; nothing to update");
                return Some(Decision::NoOp);
            }

            let mut merged = existing.clone();
            merged.title = form.title.clone();
            merged.status = status;
            merged.priority = priority;
            if let Some(due) = due_date {
                merged.due_date = due;
            }
            debug!(id = %merged.id, "prepared update");
            Some(Decision::Update(merged))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::{Clock, Decision, FormState, IdGenerator, SubmitMode, submit};
    use crate::task::{Priority, Status, Task};

    struct Sequential(u128);

    impl IdGenerator for Sequential {
        fn next_id(&mut self) -> Uuid {
            self.0 += 1;
            Uuid::from_u128(self.0)
        }
    }

    struct Fixed(DateTime<Utc>);

    impl Clock for Fixed {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 8, 30, 0)
            .single()
            .expect("valid now")
    }

    fn existing() -> Task {
        Task::new(
            Uuid::from_u128(99),
            "x".to_string(),
            Status::Incomplete,
            Priority::Low,
            now() - Duration::days(3),
        )
    }

    #[test]
    fn add_assigns_id_and_creation_time() {
        let mut ids = Sequential(0);
        let clock = Fixed(now());
        let form = FormState {
            title: "buy milk".to_string(),
            ..FormState::new()
        };

        let Some(Decision::Insert(task)) = submit(SubmitMode::Add, &form, &mut ids, &clock) else {
            panic!("expected an insert decision");
        };
        assert_eq!(task.id, Uuid::from_u128(1));
        assert_eq!(task.created_at, now());
        assert_eq!(task.status, Status::Incomplete);
        assert_eq!(task.priority, Priority::Low);
    }

    #[test]
    fn add_twice_yields_distinct_ids() {
        let mut ids = super::UuidV4;
        let clock = super::SystemClock;
        let form = FormState {
            title: "same title".to_string(),
            ..FormState::new()
        };

        let first = submit(SubmitMode::Add, &form, &mut ids, &clock);
        let second = submit(SubmitMode::Add, &form, &mut ids, &clock);
        match (first, second) {
            (Some(Decision::Insert(a)), Some(Decision::Insert(b))) => assert_ne!(a.id, b.id),
            other => panic!("expected two inserts, got {other:?}"),
        }
    }

    #[test]
    fn add_complete_drops_stale_due_date() {
        let mut ids = Sequential(0);
        let clock = Fixed(now());
        let form = FormState {
            title: "file taxes".to_string(),
            status: Some(Status::Complete),
            priority: Some(Priority::High),
            due_date: Some(now() + Duration::days(2)),
        };

        let Some(Decision::Insert(task)) = submit(SubmitMode::Add, &form, &mut ids, &clock) else {
            panic!("expected an insert decision");
        };
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn invalid_form_is_discarded_without_consuming_ids() {
        let mut ids = Sequential(0);
        let clock = Fixed(now());

        let blank = FormState::new();
        assert_eq!(submit(SubmitMode::Add, &blank, &mut ids, &clock), None);

        let no_priority = FormState {
            title: "walk dog".to_string(),
            priority: None,
            ..FormState::new()
        };
        assert_eq!(submit(SubmitMode::Add, &no_priority, &mut ids, &clock), None);

        let no_status = FormState {
            title: "walk dog".to_string(),
            status: None,
            ..FormState::new()
        };
        let task = existing();
        assert_eq!(
            submit(SubmitMode::Update(&task), &no_status, &mut ids, &clock),
            None
        );
        assert_eq!(ids.0, 0);
    }

    #[test]
    fn identical_update_is_noop() {
        let mut ids = Sequential(0);
        let clock = Fixed(now());
        let mut task = existing();
        task.due_date = Some(now() + Duration::days(1));
        let form = FormState::from_task(&task);

        assert_eq!(
            submit(SubmitMode::Update(&task), &form, &mut ids, &clock),
            Some(Decision::NoOp)
        );
    }

    #[test]
    fn status_change_produces_update() {
        let mut ids = Sequential(0);
        let clock = Fixed(now());
        let task = existing();
        let form = FormState {
            title: "x".to_string(),
            status: Some(Status::Complete),
            priority: Some(Priority::Low),
            due_date: None,
        };

        let Some(Decision::Update(merged)) =
            submit(SubmitMode::Update(&task), &form, &mut ids, &clock)
        else {
            panic!("expected an update decision");
        };
        assert_eq!(merged.id, task.id);
        assert_eq!(merged.created_at, task.created_at);
        assert_eq!(merged.status, Status::Complete);
    }

    #[test]
    fn completing_keeps_existing_due_date() {
        let mut ids = Sequential(0);
        let clock = Fixed(now());
        let due = now() + Duration::days(5);
        let mut task = existing();
        task.due_date = Some(due);

        let form = FormState {
            status: Some(Status::Complete),
            due_date: None,
            ..FormState::from_task(&task)
        };
        let Some(Decision::Update(merged)) =
            submit(SubmitMode::Update(&task), &form, &mut ids, &clock)
        else {
            panic!("expected an update decision");
        };
        assert_eq!(merged.due_date, Some(due));
    }

    #[test]
    fn clearing_due_date_on_incomplete_task_updates() {
        let mut ids = Sequential(0);
        let clock = Fixed(now());
        let mut task = existing();
        task.due_date = Some(now() + Duration::days(5));

        let form = FormState {
            due_date: None,
            ..FormState::from_task(&task)
        };
        let Some(Decision::Update(merged)) =
            submit(SubmitMode::Update(&task), &form, &mut ids, &clock)
        else {
            panic!("expected an update decision");
        };
        assert_eq!(merged.due_date, None);
    }

    #[test]
    fn due_date_warning_needs_incomplete_past_date() {
        let mut form = FormState {
            title: "renew passport".to_string(),
            due_date: Some(now() - Duration::hours(1)),
            ..FormState::new()
        };
        assert!(form.due_date_passed(now()));

        form.status = Some(Status::Complete);
        assert!(!form.due_date_passed(now()));
        assert!(!form.shows_due_date());

        form.status = Some(Status::Incomplete);
        form.due_date = Some(now() + Duration::hours(1));
        assert!(!form.due_date_passed(now()));
    }
}
