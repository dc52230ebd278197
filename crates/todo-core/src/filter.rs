use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::{
  debug,
  trace
};

use crate::task::{
  Priority,
  Status,
  Task
};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum StatusFilter {
  #[default]
  All,
  Incomplete,
  Complete
}

impl StatusFilter {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::All => "all",
      | Self::Incomplete => "incomplete",
      | Self::Complete => "complete"
    }
  }

  fn accepts(
    self,
    status: Status
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Incomplete => {
        status == Status::Incomplete
      }
      | Self::Complete => {
        status == Status::Complete
      }
    }
  }
}

impl FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(Self::All),
      | "incomplete" => {
        Ok(Self::Incomplete)
      }
      | "complete" => Ok(Self::Complete),
      | _ => Err(anyhow!(
        "invalid status filter '{s}': \
         must be all, incomplete, or \
         complete"
      ))
    }
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum PriorityFilter {
  #[default]
  All,
  Low,
  Medium,
  High
}

impl PriorityFilter {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::All => "all",
      | Self::Low => "low",
      | Self::Medium => "medium",
      | Self::High => "high"
    }
  }

  fn accepts(
    self,
    priority: Priority
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Low => {
        priority == Priority::Low
      }
      | Self::Medium => {
        priority == Priority::Medium
      }
      | Self::High => {
        priority == Priority::High
      }
    }
  }
}

impl FromStr for PriorityFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(Self::All),
      | "low" => Ok(Self::Low),
      | "medium" => Ok(Self::Medium),
      | "high" => Ok(Self::High),
      | _ => Err(anyhow!(
        "invalid priority filter '{s}': \
         must be all, low, medium, or \
         high"
      ))
    }
  }
}

impl fmt::Display for PriorityFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum SortBy {
  DateNewest,
  DateOldest,
  Priority,
  #[default]
  None
}

impl SortBy {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::DateNewest => "date-newest",
      | Self::DateOldest => "date-oldest",
      | Self::Priority => "priority",
      | Self::None => "none"
    }
  }

  /// Unknown keys fall back to
  /// `SortBy::None` (input order).
  pub fn from_key(key: &str) -> Self {
    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "date-newest" => {
        Self::DateNewest
      }
      | "date-oldest" => {
        Self::DateOldest
      }
      | "priority" => Self::Priority,
      | "none" => Self::None,
      | other => {
        debug!(
          sort_by = %other,
          "unrecognized sort key; \
           keeping input order"
        );
        Self::None
      }
    }
  }
}

impl fmt::Display for SortBy {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub struct FilterCriteria {
  pub status:   StatusFilter,
  pub priority: PriorityFilter,
  pub sort_by:  SortBy
}

impl FilterCriteria {
  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    self.status.accepts(task.status)
      && self
        .priority
        .accepts(task.priority)
  }
}

#[tracing::instrument(skip(tasks))]
pub fn filter_tasks(
  tasks: &[Task],
  criteria: &FilterCriteria
) -> Vec<Task> {
  let mut visible: Vec<Task> = tasks
    .iter()
    .filter(|task| {
      criteria.matches(task)
    })
    .cloned()
    .collect();

  // sort_by_key is stable, so ties
  // keep their input order.
  match criteria.sort_by {
    | SortBy::DateNewest => {
      visible.sort_by_key(|task| {
        std::cmp::Reverse(
          task.created_at
        )
      })
    }
    | SortBy::DateOldest => {
      visible.sort_by_key(|task| {
        task.created_at
      })
    }
    | SortBy::Priority => {
      visible.sort_by_key(|task| {
        task.priority.rank()
      })
    }
    | SortBy::None => {}
  }

  trace!(
    total = tasks.len(),
    visible = visible.len(),
    "filtered tasks"
  );
  visible
}
