//! Serialized operator output, progress bars, status tables and summaries.
//!
//! Per-repository work may run on several threads, so every message goes
//! through a [`Reporter`] into one [`OutputSink`] consumer thread that owns
//! the terminal. Tables and summaries are built as strings and sent the same
//! way.

use crate::config::Config;
use crate::constants::PROGRESS_TICK_MS;
use crate::repo::{RepoStatus, RepositoryRecord};
use crate::sync::{ActionOutcome, ActionResult};
use colored::{ColoredString, Colorize};
use crossbeam_channel::{Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use std::thread::JoinHandle;
use std::time::Duration;

/// Severity of an operator-facing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Trace,
    Info,
    /// Context the operator needs to answer a prompt; shown even when quiet.
    Notice,
    Success,
    Warning,
    Error,
}

enum Message {
    Line(Level, String),
    Flush(Sender<()>),
    Close,
}

/// Cheap, clonable handle for sending lines to the sink.
#[derive(Clone)]
pub struct Reporter {
    tx: Sender<Message>,
}

impl Reporter {
    pub fn send(&self, level: Level, text: impl Into<String>) {
        // A closed sink means the run is shutting down; dropping the line is fine.
        let _ = self.tx.send(Message::Line(level, text.into()));
    }

    pub fn trace(&self, text: impl Into<String>) {
        self.send(Level::Trace, text);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.send(Level::Info, text);
    }

    pub fn notice(&self, text: impl Into<String>) {
        self.send(Level::Notice, text);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.send(Level::Success, text);
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.send(Level::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.send(Level::Error, text);
    }

    /// Blocks until every line sent before this call has been written.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if self.tx.send(Message::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

/// The single consumer that owns operator output.
pub struct OutputSink {
    reporter: Reporter,
    handle: JoinHandle<Vec<(Level, String)>>,
}

impl OutputSink {
    /// Starts a sink that writes colored lines to the terminal.
    #[must_use]
    pub fn spawn(config: &Config) -> Self {
        let config = *config;
        Self::start(move |level, text| write_line(&config, level, text), false)
    }

    /// Starts a sink that only records lines; [`OutputSink::finish`] returns them.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::start(|_, _| {}, true)
    }

    fn start<W>(write: W, record: bool) -> Self
    where
        W: Fn(Level, &str) + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = std::thread::spawn(move || consume(&rx, write, record));
        Self {
            reporter: Reporter { tx },
            handle,
        }
    }

    #[must_use]
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Writes every pending line, stops the consumer and returns recorded lines.
    pub fn finish(self) -> Vec<(Level, String)> {
        let _ = self.reporter.tx.send(Message::Close);
        self.handle.join().unwrap_or_default()
    }
}

fn consume<W>(rx: &Receiver<Message>, write: W, record: bool) -> Vec<(Level, String)>
where
    W: Fn(Level, &str),
{
    let mut recorded = Vec::new();
    for message in rx {
        match message {
            Message::Line(level, text) => {
                write(level, &text);
                if record {
                    recorded.push((level, text));
                }
            }
            Message::Flush(ack) => {
                let _ = ack.send(());
            }
            Message::Close => break,
        }
    }
    recorded
}

fn write_line(config: &Config, level: Level, text: &str) {
    if !is_visible(config, level) {
        return;
    }
    match level {
        Level::Trace => eprintln!("  {}", text.dimmed()),
        Level::Info | Level::Notice => println!("{text}"),
        Level::Success => println!("{}", text.green()),
        Level::Warning => eprintln!("{}", text.yellow()),
        Level::Error => eprintln!("{}", text.red()),
    }
}

/// Whether a line at `level` reaches the terminal under `config`.
fn is_visible(config: &Config, level: Level) -> bool {
    match level {
        Level::Trace => config.is_verbose(),
        Level::Info | Level::Success => !config.is_quiet(),
        Level::Notice | Level::Warning | Level::Error => true,
    }
}

/// Progress bar shown during a classification pass.
/// Hidden in quiet or verbose mode.
#[must_use]
pub fn create_classify_progress(total: usize, config: &Config) -> ProgressBar {
    if config.is_quiet() || config.is_verbose() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos}/{len} checked {spinner:.cyan} {msg}")
    {
        bar.set_style(style.progress_chars("█░"));
    }
    bar.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));
    bar
}

/// Operator-facing label of a status.
#[must_use]
pub fn status_label(status: RepoStatus) -> &'static str {
    match status {
        RepoStatus::NotPresent => "NOT PRESENT",
        RepoStatus::Synchronized => "SYNCHRONIZED",
        RepoStatus::OutOfDate => "OUT OF DATE",
        RepoStatus::Obsolete => "OBSOLETE",
        RepoStatus::Modified => "MODIFIED",
        RepoStatus::Conflict => "CONFLICT",
        RepoStatus::Desynchronized => "DESYNCHRONIZED",
    }
}

fn colorize_status(status: RepoStatus, text: &str) -> ColoredString {
    match status {
        RepoStatus::NotPresent => text.bright_black(),
        RepoStatus::Synchronized => text.green(),
        RepoStatus::OutOfDate | RepoStatus::Modified => text.yellow(),
        RepoStatus::Obsolete => text.magenta(),
        RepoStatus::Conflict | RepoStatus::Desynchronized => text.red(),
    }
}

/// Renders records as a table sorted case-insensitively by name.
#[must_use]
pub fn format_status_table(title: &str, records: &[RepositoryRecord]) -> String {
    let mut rows: Vec<&RepositoryRecord> = records.iter().collect();
    rows.sort_by_key(|r| r.name.to_lowercase());

    let name_width = column_width("Repository", rows.iter().map(|r| r.name.as_str()));
    let branch_width = column_width("Branch", rows.iter().map(|r| r.branch.as_str()));
    let status_width = column_width(
        "Status",
        rows.iter().map(|r| status_label(r.status)),
    );

    let mut out = format!("\n{}\n", title.cyan().bold());
    out.push_str(&format!(
        "  {}  {}  {}  {}\n",
        format!("{:<name_width$}", "Repository").bold(),
        format!("{:<branch_width$}", "Branch").bold(),
        format!("{:<status_width$}", "Status").bold(),
        "Submodules".bold(),
    ));
    out.push_str(&format!(
        "  {}\n",
        "━".repeat(name_width + branch_width + status_width + 16).dimmed()
    ));
    for record in rows {
        let status = format!("{:<status_width$}", status_label(record.status));
        let submodules = if record.has_submodules {
            "Yes".green()
        } else {
            "(none)".bright_black()
        };
        out.push_str(&format!(
            "  {}  {:<branch_width$}  {}  {}\n",
            format!("{:<name_width$}", record.name).white().bold(),
            record.branch,
            colorize_status(record.status, &status).bold(),
            submodules,
        ));
    }
    out
}

fn column_width<'a>(header: &str, cells: impl Iterator<Item = &'a str>) -> usize {
    cells
        .map(|c| c.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0)
}

/// Lists the members of a phase before its confirmation prompt.
#[must_use]
pub fn format_phase_members(heading: &str, members: &[&RepositoryRecord]) -> String {
    let mut out = format!("\n{}\n", heading.bold());
    for record in members {
        let name = colorize_status(record.status, &record.name);
        out.push_str(&format!("  {} ({})\n", name, status_label(record.status)));
    }
    out.trim_end().to_string()
}

pub fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f32())
}

fn format_section(title: &str) -> String {
    let line = "=".repeat(50).cyan().dimmed();
    let padding = 50usize.saturating_sub(title.len()) / 2;
    let centered = format!("{:>width$}", title, width = padding + title.len());
    format!("\n{}\n{}\n{}\n", line, centered.cyan().bold(), line)
}

/// Summary of every per-repository action taken during reconciliation.
#[must_use]
pub fn format_action_summary(results: &[ActionResult], duration: Duration) -> String {
    let mut out = format_section("Summary");
    let (failures, successes): (Vec<_>, Vec<_>) = results
        .iter()
        .partition(|r| matches!(r.outcome, ActionOutcome::Failed { .. }));

    if !successes.is_empty() {
        out.push_str(&format!(
            "{}\n",
            format!("Completed ({}):", successes.len()).green().bold()
        ));
        for result in &successes {
            out.push_str(&format!(
                "  {} {} {} in {}\n",
                "OK".green().bold(),
                result.name.white(),
                result.outcome.to_string().cyan(),
                format_duration(result.duration).dimmed(),
            ));
        }
        out.push('\n');
    }

    if !failures.is_empty() {
        out.push_str(&format!(
            "{}\n",
            format!("Failed ({}):", failures.len()).red().bold()
        ));
        for result in &failures {
            out.push_str(&format!(
                "  {} {} {} in {}\n",
                "FAIL".red().bold(),
                result.name.white(),
                result.outcome.to_string().red(),
                format_duration(result.duration).dimmed(),
            ));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "{}: {}/{} actions in {}",
        "Total".white().bold(),
        successes.len(),
        results.len(),
        format_duration(duration)
    ));
    out
}

/// One-line summary for quiet mode.
#[must_use]
pub fn format_quiet_summary(results: &[ActionResult]) -> String {
    let failed = results
        .iter()
        .filter(|r| matches!(r.outcome, ActionOutcome::Failed { .. }))
        .count();
    format!(
        "{}/{} repository actions succeeded",
        results.len() - failed,
        results.len()
    )
}
