#![forbid(unsafe_code)]

//! Subscriber setup for the demo binary.
//!
//! `FSCROLL_LOG` takes precedence over `RUST_LOG`; both accept `EnvFilter`
//! directives. `FSCROLL_LOG_JSON=1` switches to one JSON object per event.
//! Logs go to stderr so stdout stays reserved for step lines.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "warn,fscroll_engine=info,fscroll_runtime=info";

/// Pick the filter directive from the given environment lookup.
pub fn filter_directive<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("FSCROLL_LOG")
        .or_else(|| lookup("RUST_LOG"))
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

/// Whether JSON output was requested.
pub fn json_requested<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup("FSCROLL_LOG_JSON").is_some_and(|value| matches!(value.trim(), "1" | "true"))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init() {
    let lookup = |key: &str| std::env::var(key).ok();
    let directive = filter_directive(lookup);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("fscroll-demo: ignoring invalid log filter {directive:?}: {e}");
        EnvFilter::new(DEFAULT_DIRECTIVE)
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = if json_requested(lookup) {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        tracing::debug!("subscriber already installed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn fscroll_log_wins_over_rust_log() {
        let lookup = env(&[("FSCROLL_LOG", "debug"), ("RUST_LOG", "trace")]);
        assert_eq!(filter_directive(lookup), "debug");
    }

    #[test]
    fn rust_log_is_the_fallback() {
        assert_eq!(filter_directive(env(&[("RUST_LOG", "trace")])), "trace");
        assert_eq!(filter_directive(env(&[])), DEFAULT_DIRECTIVE);
        assert_eq!(filter_directive(env(&[("FSCROLL_LOG", "  ")])), DEFAULT_DIRECTIVE);
    }

    #[test]
    fn json_flag() {
        assert!(json_requested(env(&[("FSCROLL_LOG_JSON", "1")])));
        assert!(!json_requested(env(&[("FSCROLL_LOG_JSON", "0")])));
        assert!(!json_requested(env(&[])));
    }

    #[test]
    fn default_directive_parses() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVE).is_ok());
    }
}
