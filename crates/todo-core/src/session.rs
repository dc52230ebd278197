//! Interactive shell: reads one command per line, drives the reconciler
//! and the store, and renders the visible tasks.

use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use chrono_tz::Tz;
use clap::{CommandFactory, Parser};
use tracing::{debug, info, instrument, warn};

use crate::cli::{SessionCommand, SessionLine};
use crate::config::Config;
use crate::datetime::parse_due_input;
use crate::filter::{FilterCriteria, SortBy};
use crate::reconcile::{Clock, Decision, FormState, IdGenerator, SubmitMode, submit};
use crate::render::Renderer;
use crate::store::{Applied, TodoStore};
use crate::task::{Priority, Status, Task};
use crate::view::{self, ViewMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Field overrides typed on an `add` or `edit` line.
#[derive(Debug, Default)]
struct FormInput {
    title: Option<String>,
    status: Option<Status>,
    priority: Option<Priority>,
    due: Option<String>,
}

pub struct Session<W, I, C> {
    store: TodoStore,
    renderer: Renderer,
    tz: Tz,
    ids: I,
    clock: C,
    out: W,
}

impl<W, I, C> Session<W, I, C>
where
    W: Write,
    I: IdGenerator,
    C: Clock,
{
    pub fn new(cfg: &Config, out: W, ids: I, clock: C) -> anyhow::Result<Self> {
        let criteria = cfg.filter_criteria()?;
        let tz = cfg.timezone()?;
        let renderer = Renderer::new(cfg, tz);
        info!(?criteria, timezone = %tz, "session ready");

        Ok(Self {
            store: TodoStore::new(criteria),
            renderer,
            tz,
            ids,
            clock,
            out,
        })
    }

    pub fn store(&self) -> &TodoStore {
        &self.store
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs lines from `input` until EOF or `quit`.
    #[instrument(skip_all)]
    pub fn run<R: BufRead>(&mut self, input: R, prompt: bool) -> anyhow::Result<()> {
        if prompt {
            self.write_prompt()?;
        }
        for line in input.lines() {
            let line = line.context("failed to read command line")?;
            if self.execute_line(&line)? == Flow::Quit {
                return Ok(());
            }
            if prompt {
                self.write_prompt()?;
            }
        }
        Ok(())
    }

    /// Executes one line. Bad input is reported on the output and the
    /// session continues; only I/O failures and a missing view scope
    /// are returned as errors.
    pub fn execute_line(&mut self, line: &str) -> anyhow::Result<Flow> {
        let Some(words) = shlex::split(line) else {
            self.renderer
                .print_error(&mut self.out, &anyhow!("unbalanced quotes in: {line}"))?;
            return Ok(Flow::Continue);
        };
        if words.is_empty() {
            return Ok(Flow::Continue);
        }
        self.execute_words(words)
    }

    pub fn execute_words(&mut self, words: Vec<String>) -> anyhow::Result<Flow> {
        let view = view::current_view()?;

        let command = match SessionLine::try_parse_from(&words) {
            Ok(parsed) => parsed.command,
            Err(err) => {
                write!(self.out, "{err}")?;
                return Ok(Flow::Continue);
            }
        };
        debug!(?command, "dispatching session command");

        match self.execute(command, view) {
            Ok(flow) => Ok(flow),
            Err(err) => {
                warn!(error = %err, "command failed");
                self.renderer.print_error(&mut self.out, &err)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn execute(&mut self, command: SessionCommand, view: ViewMode) -> anyhow::Result<Flow> {
        match command {
            SessionCommand::Add {
                title,
                status,
                priority,
                due,
            } => self.cmd_add(FormInput {
                title: Some(title.join(" ")),
                status,
                priority,
                due,
            })?,
            SessionCommand::Edit {
                index,
                title,
                status,
                priority,
                due,
            } => self.cmd_edit(
                index,
                FormInput {
                    title,
                    status,
                    priority,
                    due,
                },
            )?,
            SessionCommand::Show { index } => {
                let task = self.visible_at(index)?;
                self.renderer.print_task_info(&mut self.out, &task)?;
            }
            SessionCommand::List => self.cmd_list(view)?,
            SessionCommand::Filter { assignments } => self.cmd_filter(&assignments)?,
            SessionCommand::View { mode } => self.cmd_view(view, mode)?,
            SessionCommand::Export => {
                let visible = self.store.visible();
                let json = serde_json::to_string_pretty(&visible)
                    .context("failed to serialize visible tasks")?;
                writeln!(self.out, "{json}")?;
            }
            SessionCommand::Help => {
                let help = SessionLine::command().render_long_help();
                write!(self.out, "{help}")?;
            }
            SessionCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    #[instrument(skip(self, input))]
    fn cmd_add(&mut self, input: FormInput) -> anyhow::Result<()> {
        let form = self.fill_form(FormState::new(), input)?;
        self.submit_form(SubmitMode::Add, &form, "Add")
    }

    #[instrument(skip(self, input))]
    fn cmd_edit(&mut self, index: usize, input: FormInput) -> anyhow::Result<()> {
        let task = self.visible_at(index)?;
        let form = self.fill_form(FormState::from_task(&task), input)?;
        self.submit_form(SubmitMode::Update(&task), &form, "Update")
    }

    fn submit_form(
        &mut self,
        mode: SubmitMode<'_>,
        form: &FormState,
        heading: &str,
    ) -> anyhow::Result<()> {
        let now = self.clock.now();
        self.renderer.print_form(&mut self.out, heading, form, now)?;

        let Some(decision) = submit(mode, form, &mut self.ids, &self.clock) else {
            writeln!(self.out, "Title is required.")?;
            return Ok(());
        };

        let title = match &decision {
            Decision::Insert(task) | Decision::Update(task) => task.title.clone(),
            Decision::NoOp => String::new(),
        };
        match self.store.dispatch(decision) {
            Applied::Inserted(_) => writeln!(self.out, "Added \"{title}\".")?,
            Applied::Updated(_) => writeln!(self.out, "Updated \"{title}\".")?,
            Applied::Unchanged => writeln!(self.out, "No changes.")?,
            Applied::Missing(id) => return Err(anyhow!("task {id} no longer exists")),
        }
        Ok(())
    }

    fn fill_form(&self, mut form: FormState, input: FormInput) -> anyhow::Result<FormState> {
        if let Some(title) = input.title {
            form.title = title;
        }
        if let Some(status) = input.status {
            form.status = Some(status);
        }
        if let Some(priority) = input.priority {
            form.priority = Some(priority);
        }
        if let Some(raw) = input.due {
            form.due_date = parse_due_input(&raw, self.clock.now(), self.tz)?;
        }
        Ok(form)
    }

    fn cmd_list(&mut self, view: ViewMode) -> anyhow::Result<()> {
        let visible = self.store.visible();
        self.renderer
            .print_tasks(&mut self.out, view, &visible, self.clock.now())
    }

    #[instrument(skip(self))]
    fn cmd_filter(&mut self, assignments: &[String]) -> anyhow::Result<()> {
        let mut criteria: FilterCriteria = *self.store.filter_status();
        for assignment in assignments {
            let (key, value) = assignment
                .split_once('=')
                .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {assignment}"))?;
            match key.trim() {
                "status" => criteria.status = value.parse()?,
                "priority" => criteria.priority = value.parse()?,
                "sort" | "sortBy" => criteria.sort_by = SortBy::from_key(value),
                other => {
                    return Err(anyhow!(
                        "unknown filter key '{other}': use status, priority, or sort"
                    ));
                }
            }
        }

        self.store.set_filter_status(criteria);
        self.renderer
            .print_criteria(&mut self.out, self.store.filter_status())
    }

    fn cmd_view(&mut self, current: ViewMode, requested: Option<ViewMode>) -> anyhow::Result<()> {
        let Some(next) = requested else {
            let line = ViewMode::all()
                .iter()
                .map(|mode| {
                    if *mode == current {
                        format!("[{}]", mode.label())
                    } else {
                        mode.label().to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(self.out, "{line}")?;
            return Ok(());
        };

        view::set_view(next)?;
        writeln!(self.out, "View: {}", next.label())?;
        Ok(())
    }

    fn visible_at(&self, index: usize) -> anyhow::Result<Task> {
        let visible = self.store.visible();
        index
            .checked_sub(1)
            .and_then(|idx| visible.get(idx).cloned())
            .ok_or_else(|| {
                anyhow!(
                    "no task at position {index} ({} visible)",
                    visible.len()
                )
            })
    }

    fn write_prompt(&mut self) -> anyhow::Result<()> {
        write!(self.out, "todo> ")?;
        self.out.flush()?;
        Ok(())
    }
}
