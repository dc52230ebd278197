use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    List,
    Calendar,
}

impl ViewMode {
    pub fn all() -> [Self; 2] {
        [Self::List, Self::Calendar]
    }

    pub fn as_key(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Calendar => "calendar",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::List => "List",
            Self::Calendar => "Calendar",
        }
    }
}

impl FromStr for ViewMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(Self::List),
            "calendar" => Ok(Self::Calendar),
            _ => Err(anyhow!("invalid view '{s}': must be list or calendar")),
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

thread_local! {
    static ACTIVE_VIEW: RefCell<Option<ViewMode>> = const { RefCell::new(None) };
}

/// Scope guard that provides a view mode to the current thread.
///
/// Scopes nest: dropping an inner provider restores the mode of the
/// enclosing one. Outside any scope, [`current_view`] and [`set_view`]
/// return an error.
#[must_use = "the view scope closes as soon as the provider is dropped"]
#[derive(Debug)]
pub struct ViewProvider {
    previous: Option<ViewMode>,
    _not_send: PhantomData<*const ()>,
}

impl ViewProvider {
    pub fn enter() -> Self {
        let previous = ACTIVE_VIEW.with(|slot| slot.replace(Some(ViewMode::List)));
        debug!(nested = previous.is_some(), "entered view scope");
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ViewProvider {
    fn drop(&mut self) {
        ACTIVE_VIEW.with(|slot| {
            slot.replace(self.previous);
        });
    }
}

pub fn current_view() -> anyhow::Result<ViewMode> {
    ACTIVE_VIEW
        .with(|slot| *slot.borrow())
        .ok_or_else(outside_scope)
}

pub fn set_view(view: ViewMode) -> anyhow::Result<()> {
    ACTIVE_VIEW.with(|slot| {
        let mut slot = slot.borrow_mut();
        match slot.as_mut() {
            Some(current) => {
                debug!(from = %current, to = %view, "switching view");
                *current = view;
                Ok(())
            }
            None => Err(outside_scope()),
        }
    })
}

fn outside_scope() -> anyhow::Error {
    anyhow!("view mode accessed outside of a ViewProvider scope")
}

#[cfg(test)]
mod tests {
    use super::{ViewMode, ViewProvider, current_view, set_view};

    #[test]
    fn access_outside_scope_fails() {
        let err = current_view().expect_err("no provider");
        assert!(err.to_string().contains("outside of a ViewProvider"));
        assert!(set_view(ViewMode::Calendar).is_err());
    }

    #[test]
    fn scope_starts_in_list_and_toggles() {
        let _provider = ViewProvider::enter();
        assert_eq!(current_view().expect("in scope"), ViewMode::List);

        set_view(ViewMode::Calendar).expect("set calendar");
        assert_eq!(current_view().expect("in scope"), ViewMode::Calendar);

        set_view(ViewMode::Calendar).expect("set calendar again");
        assert_eq!(current_view().expect("in scope"), ViewMode::Calendar);

        set_view(ViewMode::List).expect("set list");
        assert_eq!(current_view().expect("in scope"), ViewMode::List);
    }

    #[test]
    fn nested_scope_restores_outer_mode() {
        let outer = ViewProvider::enter();
        set_view(ViewMode::Calendar).expect("set calendar");
        {
            let _inner = ViewProvider::enter();
            assert_eq!(current_view().expect("inner"), ViewMode::List);
        }
        assert_eq!(current_view().expect("outer"), ViewMode::Calendar);

        drop(outer);
        assert!(current_view().is_err());
    }

    #[test]
    fn parses_view_keys() {
        assert_eq!("Calendar".parse::<ViewMode>().expect("parse"), ViewMode::Calendar);
        assert!("board".parse::<ViewMode>().is_err());
    }
}
