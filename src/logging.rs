//! Console log lines of the form `[YYYY-MM-DD HH:MM:SS] message`.

use chrono::Local;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Event formatter producing one bracketed-timestamp line per event.
pub struct TimestampedLine;

impl<S, N> FormatEvent<S, N> for TimestampedLine
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "[{}] ", Local::now().format(TIMESTAMP_FORMAT))?;
        match *event.metadata().level() {
            Level::INFO => {}
            level => write!(writer, "{level}: ")?,
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default `info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .event_format(TimestampedLine)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("a global tracing subscriber was already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn lines_carry_bracketed_timestamp() {
        let sink = Captured::default();
        let writer = sink.clone();
        let subscriber = FmtSubscriber::builder()
            .event_format(TimestampedLine)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Cleaning data...");
            tracing::warn!("no data returned for ZZZZ");
        });

        let out = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        // "[2024-01-05 09:30:00] " is 22 characters.
        let (stamp, message) = lines[0].split_at(22);
        assert!(stamp.starts_with('[') && stamp.ends_with("] "));
        assert!(chrono::NaiveDateTime::parse_from_str(&stamp[1..20], TIMESTAMP_FORMAT).is_ok());
        assert_eq!(message, "Cleaning data...");
        assert!(lines[1].ends_with("WARN: no data returned for ZZZZ"));
    }
}
