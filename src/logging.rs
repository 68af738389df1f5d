//! Logging to the terminal with colors, mirrored to `output.log` and `errors.log`

use crate::error::DomainError;
use anyhow::{anyhow, Result};
use std::fs::{File, OpenOptions};
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::sync::{LazyLock, Mutex, OnceLock};

const DEFAULT: &str = "\x1b[0m";
const FG_BLUE: &str = "\x1b[34m";
const FG_GREEN: &str = "\x1b[32m";
const FG_RED: &str = "\x1b[31m";
const FG_YELLOW: &str = "\x1b[33m";
const INVERSE: &str = "\x1b[47m\x1b[30m";

pub enum Color {
    Default,
    Stamp,
    Success,
    Log,
    Warn,
    Error,
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Only print colors when printing to a terminal
        //
        // This won't change during the program's execution, so we can cache it.
        static STDOUT_IS_TERMINAL: LazyLock<bool> =
            LazyLock::new(|| std::io::stdout().is_terminal());

        if !*STDOUT_IS_TERMINAL {
            return Ok(());
        }

        write!(
            f,
            "{}",
            match self {
                Color::Default => DEFAULT,
                Color::Stamp => INVERSE,
                Color::Success => FG_GREEN,
                Color::Log => FG_BLUE,
                Color::Warn => FG_YELLOW,
                Color::Error => FG_RED,
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Log,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Success => "✔ SUCCESS",
            Level::Log => "🔎 LOG",
            Level::Warn => "⚡ WARN",
            Level::Error => "💢 ERROR",
        }
    }

    fn color(self) -> Color {
        match self {
            Level::Success => Color::Success,
            Level::Log => Color::Log,
            Level::Warn => Color::Warn,
            Level::Error => Color::Error,
        }
    }
}

/// Part of the bot a line comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    CommandManager,
    InteractionManager,
    EventManager,
    InteractionEvent,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            Section::CommandManager => "[Command manager]",
            Section::InteractionManager => "[Interaction manager]",
            Section::EventManager => "[Event manager]",
            Section::InteractionEvent => "[Interaction event]",
        })
    }
}

struct Sinks {
    output: File,
    errors: File,
}

static SINKS: OnceLock<Mutex<Sinks>> = OnceLock::new();

/// Opens the log files under `dir`, creating it if needed.  Until this is called only the
/// terminal gets written.
pub fn init(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        anyhow!(
            "Could not create log directory `{}`: {}",
            dir.to_string_lossy(),
            e
        )
    })?;

    let open = |name: &str| {
        let path = dir.join(name);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| anyhow!("Could not open `{}`: {}", path.to_string_lossy(), e))
    };

    let sinks = Sinks {
        output: open("output.log")?,
        errors: open("errors.log")?,
    };

    SINKS
        .set(Mutex::new(sinks))
        .map_err(|_| anyhow!("Logging is already initialized"))
}

/// Renders a log line, with or without terminal colors
pub fn format_line(level: Level, section: Option<Section>, content: &str, colored: bool) -> String {
    let stamp = chrono::Local::now().format("%H:%M:%S");
    let section = match section {
        Some(section) => format!("{} :: ", section),
        None => String::new(),
    };

    if colored {
        format!(
            "{}[{}]{} {}{}{} {}{}",
            Color::Stamp,
            stamp,
            Color::Default,
            level.color(),
            level.tag(),
            Color::Default,
            section,
            content
        )
    } else {
        format!("[{}] {} {}{}", stamp, level.tag(), section, content)
    }
}

#[cfg(test)]
use std::cell::RefCell;

#[cfg(test)]
thread_local! {
    static CAPTURED: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Starts keeping the plain lines written from this thread
#[cfg(test)]
pub fn capture() {
    CAPTURED.with(|captured| *captured.borrow_mut() = Some(Vec::new()));
}

/// Lines kept since `capture`, which stops keeping them
#[cfg(test)]
pub fn captured() -> Vec<String> {
    CAPTURED.with(|captured| captured.borrow_mut().take().unwrap_or_default())
}

/// Write a line to the terminal and to `output.log`
pub fn write(level: Level, section: Option<Section>, content: &str) {
    println!("{}", format_line(level, section, content, true));

    #[cfg(test)]
    CAPTURED.with(|captured| {
        if let Some(lines) = captured.borrow_mut().as_mut() {
            lines.push(format_line(level, section, content, false));
        }
    });

    if let Some(sinks) = SINKS.get() {
        if let Ok(mut sinks) = sinks.lock() {
            let _ = writeln!(
                sinks.output,
                "{}",
                format_line(level, section, content, false)
            );
        }
    }
}

/// Write the full error chain to `errors.log`
fn trace(err: &anyhow::Error) {
    if let Some(sinks) = SINKS.get() {
        if let Ok(mut sinks) = sinks.lock() {
            let _ = writeln!(sinks.errors, "{:?}", err);
        }
    }
}

pub fn blank() {
    println!();
    if let Some(sinks) = SINKS.get() {
        if let Ok(mut sinks) = sinks.lock() {
            let _ = writeln!(sinks.output);
        }
    }
}

pub fn warn(err: &anyhow::Error, section: Option<Section>) {
    write(Level::Warn, section, &err.to_string());
    trace(err);
}

pub fn error(err: &anyhow::Error, section: Option<Section>) {
    write(Level::Error, section, &format!("{:#}", err));
    trace(err);
}

/// Sorts a batch for reporting: domain errors first, most severe first, then the rest in their
/// original order.
pub fn order(errors: Vec<anyhow::Error>) -> Vec<anyhow::Error> {
    let (mut domain, other): (Vec<_>, Vec<_>) = errors
        .into_iter()
        .partition(|e| e.downcast_ref::<DomainError>().is_some());

    // Stable, so equal severities keep discovery order
    domain.sort_by_key(|e| {
        std::cmp::Reverse(e.downcast_ref::<DomainError>().map(|d| d.severity))
    });

    domain.into_iter().chain(other).collect()
}

/// Logs every error of a batch
pub fn report(errors: Vec<anyhow::Error>, section: Section) {
    for err in order(errors) {
        match err.downcast_ref::<DomainError>() {
            Some(domain) if domain.severity == crate::error::Severity::Warn => {
                warn(&err, Some(section))
            }
            Some(_) => error(&err, Some(section)),
            None => error(&err, None),
        }
    }
}

/// `[####------]`
pub fn progress_bar(value: usize, total: usize, size: usize) -> String {
    let filled = match total {
        0 => size,
        _ => (value * size).div_ceil(total).min(size),
    };
    format!("[{}{}]", "#".repeat(filled), "-".repeat(size - filled))
}

#[macro_export]
macro_rules! log_success {
    // Case: Only format string, no arguments
    ($fmtstr:expr) => {{
        $crate::logging::write($crate::logging::Level::Success, None, &format!($fmtstr))
    }};

    // Case: Format string with arguments, with optional trailing comma
    ($fmtstr:expr, $($args:expr),* $(,)?) => {{
        $crate::logging::write(
            $crate::logging::Level::Success,
            None,
            &format!($fmtstr, $($args),*),
        )
    }};
}

#[macro_export]
macro_rules! log_info {
    // Case: Section and format string, no arguments
    ($section:expr; $fmtstr:expr) => {{
        $crate::logging::write($crate::logging::Level::Log, Some($section), &format!($fmtstr))
    }};

    // Case: Section and format string with arguments, with optional trailing comma
    ($section:expr; $fmtstr:expr, $($args:expr),* $(,)?) => {{
        $crate::logging::write(
            $crate::logging::Level::Log,
            Some($section),
            &format!($fmtstr, $($args),*),
        )
    }};

    // Case: Only format string, no arguments
    ($fmtstr:expr) => {{
        $crate::logging::write($crate::logging::Level::Log, None, &format!($fmtstr))
    }};

    // Case: Format string with arguments, with optional trailing comma
    ($fmtstr:expr, $($args:expr),* $(,)?) => {{
        $crate::logging::write(
            $crate::logging::Level::Log,
            None,
            &format!($fmtstr, $($args),*),
        )
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Code, DomainError};

    #[test]
    fn plain_line_layout() {
        let line = format_line(Level::Warn, Some(Section::EventManager), "oops", false);
        // [HH:MM:SS]
        assert_eq!(line.as_bytes()[0], b'[');
        assert_eq!(line.as_bytes()[9], b']');
        assert!(line.ends_with("⚡ WARN [Event manager] :: oops"));
    }

    #[test]
    fn plain_line_without_section() {
        let line = format_line(Level::Success, None, "online", false);
        assert!(line.ends_with("✔ SUCCESS online"));
    }

    #[test]
    fn batch_order_puts_errors_before_warnings_before_others() {
        let errors = vec![
            anyhow!("generic"),
            DomainError::warn(Code::NameDuplicated, "a").into(),
            DomainError::error(Code::HandlerUnknown, "b").into(),
            DomainError::warn(Code::GuildIdInvalid, "c").into(),
        ];

        let ordered: Vec<String> = order(errors).iter().map(|e| e.to_string()).collect();
        assert_eq!(
            ordered,
            vec![
                "handler is not registered (b)",
                "name is already used in this scope (a)",
                "guild folder name is not a guild id (c)",
                "generic",
            ]
        );
    }

    #[test]
    fn capture_keeps_plain_lines() {
        capture();
        write(Level::Log, Some(Section::CommandManager), "loaded");
        let lines = captured();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("🔎 LOG [Command manager] :: loaded"));

        write(Level::Log, None, "not kept");
        assert!(captured().is_empty());
    }

    #[test]
    fn progress() {
        assert_eq!(progress_bar(0, 4, 4), "[----]");
        assert_eq!(progress_bar(1, 3, 10), "[####------]");
        assert_eq!(progress_bar(3, 3, 10), "[##########]");
        assert_eq!(progress_bar(0, 0, 2), "[##]");
    }
}
