#![forbid(unsafe_code)]

//! Command-line argument parsing for the demo.
//!
//! Supports environment variable overrides via the `FSCROLL_DEMO_*` prefix;
//! explicit flags win over the environment.

use std::env;
use std::path::PathBuf;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
FrankenScroll demo: scripted scroll session over a synthetic image feed

USAGE:
    fscroll-demo [OPTIONS]

OPTIONS:
    --steps=N            Scroll steps downward (default: 60)
    --step=PX            Distance per step (default: 90)
    --viewport=PX        Viewport height (default: 600)
    --latency-ms=N       Synthetic fetch latency (default: 15)
    --jump=PAGE          Jump to PAGE after scrolling back to the top
    --config=PATH        JSON configuration file
    --json               Print step lines as JSON
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    FSCROLL_CONFIG            JSON configuration file (same as --config)
    FSCROLL_ITEMS_PER_PAGE    Page size when no file is given
    FSCROLL_MAX_LIVE_ITEMS    Live window size when no file is given
    FSCROLL_ITEM_HEIGHT       Item height when no file is given
    FSCROLL_DEMO_STEPS        Override --steps
    FSCROLL_DEMO_LATENCY_MS   Override --latency-ms
    FSCROLL_LOG / RUST_LOG    Log filter directives
    FSCROLL_LOG_JSON          Set to 1 for JSON logs";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    /// Number of downward scroll steps.
    pub steps: usize,
    /// Distance scrolled per step.
    pub step: f64,
    /// Viewport height.
    pub viewport: f64,
    /// Synthetic fetch latency in milliseconds.
    pub latency_ms: u64,
    /// Page to jump to at the end.
    pub jump: Option<usize>,
    /// Configuration file.
    pub config: Option<PathBuf>,
    /// Emit JSON step lines.
    pub json: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            steps: 60,
            step: 90.0,
            viewport: 600.0,
            latency_ms: 15,
            jump: None,
            config: None,
            json: false,
        }
    }
}

/// What the caller should do after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// Run the session.
    Run(Opts),
    /// Print help and exit.
    Help,
    /// Print the version and exit.
    Version,
}

impl Opts {
    /// Parse process arguments and environment, exiting on `--help`,
    /// `--version`, or invalid input.
    pub fn parse() -> Self {
        let args = env::args().skip(1);
        match Self::parse_from(args, |key| env::var(key).ok()) {
            Ok(Parsed::Run(opts)) => opts,
            Ok(Parsed::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Parsed::Version) => {
                println!("fscroll-demo {VERSION}");
                process::exit(0);
            }
            Err(msg) => {
                eprintln!("{msg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Parse `args` with `lookup` standing in for the environment.
    pub fn parse_from<I, F>(args: I, lookup: F) -> Result<Parsed, String>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        // Apply environment variable defaults first
        if let Some(val) = lookup("FSCROLL_DEMO_STEPS")
            && let Ok(n) = val.parse()
        {
            opts.steps = n;
        }
        if let Some(val) = lookup("FSCROLL_DEMO_LATENCY_MS")
            && let Ok(n) = val.parse()
        {
            opts.latency_ms = n;
        }
        if let Some(val) = lookup("FSCROLL_CONFIG")
            && !val.trim().is_empty()
        {
            opts.config = Some(PathBuf::from(val));
        }

        for arg in args {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Parsed::Help),
                "--version" | "-V" => return Ok(Parsed::Version),
                "--json" => opts.json = true,
                other => {
                    if let Some(val) = other.strip_prefix("--steps=") {
                        opts.steps = parse_value("--steps", val)?;
                    } else if let Some(val) = other.strip_prefix("--step=") {
                        opts.step = parse_value("--step", val)?;
                    } else if let Some(val) = other.strip_prefix("--viewport=") {
                        opts.viewport = parse_value("--viewport", val)?;
                    } else if let Some(val) = other.strip_prefix("--latency-ms=") {
                        opts.latency_ms = parse_value("--latency-ms", val)?;
                    } else if let Some(val) = other.strip_prefix("--jump=") {
                        opts.jump = Some(parse_value("--jump", val)?);
                    } else if let Some(val) = other.strip_prefix("--config=") {
                        opts.config = Some(PathBuf::from(val));
                    } else {
                        return Err(format!("Unknown argument: {other}"));
                    }
                }
            }
        }

        if !(opts.step.is_finite() && opts.step > 0.0) {
            return Err(format!("Invalid --step value: {}", opts.step));
        }
        if !(opts.viewport.is_finite() && opts.viewport > 0.0) {
            return Err(format!("Invalid --viewport value: {}", opts.viewport));
        }
        Ok(Parsed::Run(opts))
    }
}

fn parse_value<T: std::str::FromStr>(flag: &str, val: &str) -> Result<T, String> {
    val.parse()
        .map_err(|_| format!("Invalid {flag} value: {val}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Parsed, String> {
        Opts::parse_from(args.iter().map(|s| (*s).to_string()), |_| None)
    }

    #[test]
    fn default_opts() {
        assert_eq!(parse(&[]).unwrap(), Parsed::Run(Opts::default()));
    }

    #[test]
    fn flags_override_environment() {
        let lookup = |key: &str| match key {
            "FSCROLL_DEMO_STEPS" => Some("12".to_string()),
            "FSCROLL_CONFIG" => Some("/etc/fscroll.json".to_string()),
            _ => None,
        };
        let parsed = Opts::parse_from(
            ["--steps=30", "--jump=4", "--json"].map(String::from),
            lookup,
        )
        .unwrap();
        let Parsed::Run(opts) = parsed else {
            panic!("expected run");
        };
        assert_eq!(opts.steps, 30);
        assert_eq!(opts.jump, Some(4));
        assert!(opts.json);
        assert_eq!(opts.config, Some(PathBuf::from("/etc/fscroll.json")));
    }

    #[test]
    fn help_and_version() {
        assert_eq!(parse(&["--help"]).unwrap(), Parsed::Help);
        assert_eq!(parse(&["-V"]).unwrap(), Parsed::Version);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            parse(&["--steps=many"]).unwrap_err(),
            "Invalid --steps value: many"
        );
        assert!(parse(&["--step=0"]).is_err());
        assert!(parse(&["--bogus"]).unwrap_err().contains("Unknown argument"));
    }

    #[test]
    fn help_text_lists_environment() {
        assert!(HELP_TEXT.contains("FSCROLL_CONFIG"));
        assert!(HELP_TEXT.contains("FSCROLL_LOG_JSON"));
        assert!(!VERSION.is_empty());
    }
}
