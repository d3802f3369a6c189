//! Tracing wiring: a terse console format plus a plain-text run log.
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write as _};
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing::field::{Field, Visit};

use super::utils::{line_stamp, log_file_path, run_stamp, strip_ansi};

/// Events on this target are rendered as phase banners.
pub(super) const STAGE_TARGET: &str = "devsetup::stage";

/// Message text plus any structured fields, rendered as `key=value`.
#[derive(Default)]
struct Rendered {
    message: String,
    fields: String,
}

impl Rendered {
    fn of(event: &tracing::Event<'_>) -> Self {
        let mut r = Self::default();
        event.record(&mut r);
        r
    }

    fn text(&self) -> String {
        if self.fields.is_empty() {
            self.message.clone()
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for Rendered {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.message);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

/// One line of the run log.
fn file_line(level: Level, stage: bool, msg: &str, stamp: &str) -> String {
    if stage && level == Level::INFO {
        format!("{stamp} === {msg} ===")
    } else {
        format!("{stamp} {:<5} {msg}", level.as_str())
    }
}

/// One line of console output, coloured.
fn console_line(level: Level, stage: bool, msg: &str) -> String {
    match level {
        Level::ERROR => format!("\x1b[31merror:\x1b[0m {msg}"),
        Level::WARN => format!("\x1b[33mwarning:\x1b[0m {msg}"),
        Level::INFO if stage => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
        Level::INFO => format!("    {msg}"),
        _ => format!("\x1b[2m    {msg}\x1b[0m"),
    }
}

/// Layer appending every event to a per-command log file.
#[derive(Debug)]
pub(super) struct FileLayer {
    sink: Mutex<LineWriter<File>>,
}

impl FileLayer {
    /// Log file for `command` in the cache directory.
    pub(super) fn new(command: &str) -> Option<Self> {
        Self::at(&log_file_path(command)?)
    }

    /// Start a fresh log at `path`.
    pub(super) fn at(path: &Path) -> Option<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .ok()?;
        let mut sink = LineWriter::new(file);
        writeln!(
            sink,
            "# devsetup {} run started {}",
            crate::commands::program_version(),
            run_stamp()
        )
        .ok()?;
        Some(Self {
            sink: Mutex::new(sink),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let meta = event.metadata();
        let text = Rendered::of(event).text();
        let line = file_line(
            *meta.level(),
            meta.target() == STAGE_TARGET,
            &strip_ansi(&text),
            &line_stamp(),
        );
        if let Ok(mut sink) = self.sink.lock() {
            let _ = writeln!(sink, "{line}");
        }
    }
}

struct ConsoleFormat;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormat
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let line = console_line(
            *meta.level(),
            meta.target() == STAGE_TARGET,
            &Rendered::of(event).text(),
        );
        if writer.has_ansi_escapes() {
            writeln!(writer, "{line}")
        } else {
            writeln!(writer, "{}", strip_ansi(&line))
        }
    }
}

/// Install the global subscriber for one invocation of `command`.
///
/// Warnings and errors go to stderr, everything else to stdout. The log
/// file receives debug output even when the console does not.
pub fn init_subscriber(verbose: bool, command: &str) {
    use std::io::IsTerminal as _;
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};
    use tracing_subscriber::util::SubscriberInitExt as _;

    let ansi = std::io::stdout().is_terminal();
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));
    let console = tracing_subscriber::fmt::layer()
        .with_ansi(ansi)
        .event_format(ConsoleFormat)
        .with_writer(writer)
        .with_filter(if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        });
    let file = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    let _ = tracing_subscriber::registry().with(console).with(file).try_init();
}
