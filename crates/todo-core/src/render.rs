use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::{format_date, to_local_date};
use crate::filter::FilterCriteria;
use crate::reconcile::FormState;
use crate::task::{Status, Task};
use crate::view::ViewMode;

pub const EMPTY_LIST_MESSAGE: &str = "No tasks found.";
pub const OVERDUE_WARNING: &str = "The due date has passed. Make sure to update your task!";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    tz: Tz,
}

impl Renderer {
    /// `color` defaults to on; callers writing to a non-terminal turn it off
    /// through the config before building the renderer.
    pub fn new(cfg: &Config, tz: Tz) -> Self {
        Self {
            color: cfg.get_bool("color").unwrap_or(true),
            tz,
        }
    }

    /// Renders `tasks` (already filtered and sorted) in the given view.
    /// Positions printed next to each task are 1-based indexes into `tasks`.
    #[tracing::instrument(skip(self, out, tasks, now))]
    pub fn print_tasks<W: Write>(
        &self,
        out: &mut W,
        view: ViewMode,
        tasks: &[Task],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "{EMPTY_LIST_MESSAGE}")?;
            return Ok(());
        }

        match view {
            ViewMode::List => self.print_task_table(out, tasks, now),
            ViewMode::Calendar => self.print_calendar(out, tasks, now),
        }
    }

    fn print_task_table<W: Write>(
        &self,
        out: &mut W,
        tasks: &[Task],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "#".to_string(),
            "Title".to_string(),
            "Status".to_string(),
            "Priority".to_string(),
            "Due".to_string(),
            "Created".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for (idx, task) in tasks.iter().enumerate() {
            let position = self.paint(&(idx + 1).to_string(), "33");
            rows.push(vec![
                position,
                task.title.clone(),
                task.status.label().to_string(),
                task.priority.label().to_string(),
                self.due_cell(task, now),
                format_date(task.created_at, self.tz),
            ]);
        }

        write_table(out, headers, rows)?;
        Ok(())
    }

    fn print_calendar<W: Write>(
        &self,
        out: &mut W,
        tasks: &[Task],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut by_day: BTreeMap<NaiveDate, Vec<(usize, &Task)>> = BTreeMap::new();
        let mut undated = Vec::new();

        for (idx, task) in tasks.iter().enumerate() {
            match (task.status, task.due_date) {
                (Status::Incomplete, Some(due)) => by_day
                    .entry(to_local_date(due, self.tz))
                    .or_default()
                    .push((idx + 1, task)),
                _ => undated.push((idx + 1, task)),
            }
        }

        let today = to_local_date(now, self.tz);
        for (day, entries) in &by_day {
            let heading = day.format("%Y-%m-%d %a").to_string();
            let heading = if *day < today {
                self.paint(&heading, "31")
            } else {
                heading
            };
            writeln!(out, "{heading}")?;
            for (position, task) in entries {
                self.print_calendar_entry(out, *position, task)?;
            }
        }

        if !undated.is_empty() {
            writeln!(out, "No due date")?;
            for (position, task) in undated {
                self.print_calendar_entry(out, position, task)?;
            }
        }

        Ok(())
    }

    fn print_calendar_entry<W: Write>(
        &self,
        out: &mut W,
        position: usize,
        task: &Task,
    ) -> anyhow::Result<()> {
        let marker = match task.status {
            Status::Incomplete => " ",
            Status::Complete => "x",
        };
        writeln!(
            out,
            "  [{marker}] {} {} ({})",
            self.paint(&position.to_string(), "33"),
            task.title,
            task.priority.label()
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, out, task))]
    pub fn print_task_info<W: Write>(&self, out: &mut W, task: &Task) -> anyhow::Result<()> {
        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        writeln!(out, "status    {}", task.status.label())?;
        writeln!(out, "priority  {}", task.priority.label())?;
        if task.status == Status::Incomplete
            && let Some(due) = task.due_date
        {
            writeln!(out, "due       {}", format_date(due, self.tz))?;
        }
        writeln!(out, "created   {}", task.created_at.to_rfc3339())?;
        Ok(())
    }

    /// Header and warnings shown above a submitted form.
    pub fn print_form<W: Write>(
        &self,
        out: &mut W,
        heading: &str,
        form: &FormState,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if form.due_date_passed(now) {
            writeln!(out, "{}", self.paint(OVERDUE_WARNING, "33"))?;
        }
        writeln!(out, "{heading} TODO")?;
        Ok(())
    }

    pub fn print_criteria<W: Write>(
        &self,
        out: &mut W,
        criteria: &FilterCriteria,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "status={} priority={} sort={}",
            criteria.status, criteria.priority, criteria.sort_by
        )?;
        Ok(())
    }

    pub fn print_error<W: Write>(&self, out: &mut W, err: &anyhow::Error) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&format!("error: {err:#}"), "31"))?;
        Ok(())
    }

    fn due_cell(&self, task: &Task, now: DateTime<Utc>) -> String {
        // Complete tasks keep their due date but do not show it.
        let Some(due) = task.due_date.filter(|_| task.status == Status::Incomplete) else {
            return String::new();
        };
        let text = format_date(due, self.tz);
        if task.is_overdue(now) {
            self.paint(&text, "31")
        } else {
            text
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| format!("{header:width$}"))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", header_line.trim_end())?;

    let rule = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{rule}")?;

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                format!("{cell}{}", " ".repeat(width.saturating_sub(visible_width)))
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
