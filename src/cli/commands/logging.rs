use clap::{Arg, ArgAction, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is what `-v` counts up to.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts `SCHOLARSTREAM_LOG_LEVEL` as either an index into [`LEVELS`] or a
/// level name, case-insensitive.
fn parse_verbosity(raw: &str) -> Result<u8, String> {
    let raw = raw.trim();
    if let Ok(index) = raw.parse::<u8>() {
        return if usize::from(index) < LEVELS.len() {
            Ok(index)
        } else {
            Err(format!("log level {index} is out of range 0-{}", LEVELS.len() - 1))
        };
    }

    LEVELS
        .iter()
        .position(|level| level.eq_ignore_ascii_case(raw))
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("unknown log level {raw:?}, expected one of {}", LEVELS.join(", ")))
}

#[must_use]
pub fn verbosity_parser() -> ValueParser {
    ValueParser::from(parse_verbosity)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log verbosity, repeat to raise: error, warn, info, debug, trace (default: error)")
            .env("SCHOLARSTREAM_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(verbosity_parser()),
    )
}

#[cfg(test)]
mod tests {
    use super::parse_verbosity;

    #[test]
    fn names_and_indexes() {
        assert_eq!(parse_verbosity("error"), Ok(0));
        assert_eq!(parse_verbosity("DEBUG"), Ok(3));
        assert_eq!(parse_verbosity(" Trace "), Ok(4));
        assert_eq!(parse_verbosity("2"), Ok(2));
    }

    #[test]
    fn rejects_unknown_levels() {
        let err = parse_verbosity("5").unwrap_err();
        assert!(err.contains("out of range 0-4"));

        let err = parse_verbosity("verbose").unwrap_err();
        assert!(err.contains("expected one of error, warn, info, debug, trace"));
    }
}
