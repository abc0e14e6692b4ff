#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

// Lets `#[test]` expansions (`::tessel_testhelpers::enter`) resolve in this crate's own tests.
extern crate self as tessel_testhelpers;

pub use tessel_testhelpers_macros::test;

use std::sync::Once;
use std::time::Instant;

use color_backtrace::{BacktracePrinter, Verbosity};
use termcolor::{ColorChoice, StandardStream};
use tracing::Level;
use tracing::span::EnteredSpan;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::time::Uptime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the tracing filter, e.g. `tessel_format=debug`.
pub const LOG_ENV: &str = "TESSEL_LOG";

/// Levels used when [`LOG_ENV`] is unset. Other crates log at `warn`.
const ENGINE_LEVELS: &[(&str, Level)] = &[
    ("tessel_format", Level::TRACE),
    ("tessel_json", Level::TRACE),
    ("tessel_core", Level::DEBUG),
    ("tessel_path", Level::DEBUG),
];

/// Frames from these crates are hidden from panic backtraces.
const RUNTIME_CRATES: &[&str] = &["std", "core", "alloc", "test", "__"];

static INIT: Once = Once::new();

/// The target filter for test output: [`LOG_ENV`] when it parses, otherwise
/// the engine crates at their default levels.
pub fn log_filter() -> Targets {
    match std::env::var(LOG_ENV) {
        Ok(spec) => spec.parse().unwrap_or_else(|err| {
            eprintln!("ignoring {LOG_ENV}={spec:?}: {err}");
            default_filter()
        }),
        Err(_) => default_filter(),
    }
}

fn default_filter() -> Targets {
    Targets::new()
        .with_targets(ENGINE_LEVELS.iter().copied())
        .with_default(Level::WARN)
}

fn is_runtime_frame(name: Option<&str>) -> bool {
    let Some(name) = name else {
        return false;
    };
    let path = name.trim_start_matches('<');
    RUNTIME_CRATES.iter().any(|krate| {
        path.strip_prefix(krate)
            .is_some_and(|rest| rest.starts_with("::") || krate.starts_with("__"))
    })
}

fn install() {
    BacktracePrinter::new()
        .verbosity(Verbosity::Medium)
        .add_frame_filter(Box::new(|frames| {
            frames.retain(|frame| !is_runtime_frame(frame.name.as_deref()));
        }))
        .install(Box::new(StandardStream::stderr(ColorChoice::Auto)));

    let layer = tracing_subscriber::fmt::layer()
        .with_timer(Uptime::default())
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_test_writer()
        .compact();
    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(log_filter())
        .try_init();
}

/// Install the tracing subscriber and the panic backtrace printer.
///
/// Only the first call in a process does anything.
pub fn setup() {
    INIT.call_once(install);
}

/// Run [`setup`] and open a span named after the test.
///
/// Every event the test emits is nested under the span. When the guard
/// drops, the test's duration is logged, at `error` if it is unwinding.
pub fn enter(test: &'static str) -> TestGuard {
    setup();
    TestGuard {
        test,
        started: Instant::now(),
        _span: tracing::info_span!("test", name = test).entered(),
    }
}

/// Returned by [`enter`]; keeps the test's span open.
#[must_use = "the span closes when the guard is dropped"]
pub struct TestGuard {
    test: &'static str,
    started: Instant,
    _span: EnteredSpan,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        if std::thread::panicking() {
            tracing::error!(test = self.test, ?elapsed, "failed");
        } else {
            tracing::debug!(test = self.test, ?elapsed, "passed");
        }
    }
}
