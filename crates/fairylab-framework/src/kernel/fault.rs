//! Failure capture for plugin code.
//!
//! Hook errors keep their `source()` chain and caught panics keep the panic
//! location and, when `RUST_BACKTRACE` is set, a backtrace. Both end up as
//! structured fields on the log line that disables the plugin.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

static PANIC_HOOK: Once = Once::new();

thread_local! {
    static LAST_PANIC: RefCell<Option<Captured>> = const { RefCell::new(None) };
}

struct Captured {
    location: Option<String>,
    backtrace: Backtrace,
}

/// A panic caught by [`catch`].
#[derive(Debug, Clone)]
pub struct PanicReport {
    pub message: String,
    /// `file:line:column` of the panic, if the hook saw it.
    pub location: Option<String>,
    /// Only captured when `RUST_BACKTRACE` is set.
    pub backtrace: Option<String>,
}

impl fmt::Display for PanicReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {}", self.message, location),
            None => f.write_str(&self.message),
        }
    }
}

/// Installs a process-wide panic hook that records where each panic happened
/// for the panicking thread, then runs the previous hook.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
            let captured = Captured {
                location,
                backtrace: Backtrace::capture(),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(captured));
            previous(info);
        }));
    });
}

/// Runs `f`, turning a panic into a [`PanicReport`].
pub fn catch<T>(f: impl FnOnce() -> T) -> Result<T, PanicReport> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take());
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let captured = LAST_PANIC.with(|slot| slot.borrow_mut().take());
        let (location, backtrace) = match captured {
            Some(c) => {
                let backtrace = (c.backtrace.status() == BacktraceStatus::Captured)
                    .then(|| c.backtrace.to_string());
                (c.location, backtrace)
            }
            None => (None, None),
        };
        PanicReport {
            message: panic_message(payload.as_ref()),
            location,
            backtrace,
        }
    })
}

/// The messages of every error below `err` in its `source()` chain.
pub fn causes(err: &dyn Error) -> Vec<String> {
    std::iter::successors(err.source(), |&e| e.source())
        .map(ToString::to_string)
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InstallError;
    use fairylab_core::PluginError;
    use std::io;

    #[test]
    fn test_causes_follow_source_chain() {
        let err = InstallError::Construct {
            name: "scoreboard".into(),
            source: PluginError::Io(io::Error::new(io::ErrorKind::NotFound, "scores.json missing")),
        };
        assert_eq!(
            causes(&err),
            vec!["I/O error: scores.json missing", "scores.json missing"]
        );
        assert!(causes(&PluginError::failed("flat")).is_empty());
    }

    #[test]
    fn test_catch_reports_panic_location() {
        install_panic_hook();
        let report = catch(|| -> u32 { panic!("tick exploded") }).unwrap_err();

        assert_eq!(report.message, "tick exploded");
        let location = report.location.as_deref().unwrap();
        assert!(location.contains("fault.rs"), "{location}");
        assert!(report.to_string().starts_with("tick exploded at "));
    }

    #[test]
    fn test_catch_passes_values_through() {
        assert_eq!(catch(|| 7).unwrap(), 7);

        let report = catch::<()>(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(report.message, "unknown panic payload");
    }
}
