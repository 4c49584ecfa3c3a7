#![allow(non_snake_case)]

use super::*;
use test_case::test_case;

#[test_case("trace", LogLevel::Trace)]
#[test_case("debug", LogLevel::Debug)]
#[test_case("info", LogLevel::Info)]
#[test_case("warn", LogLevel::Warn)]
#[test_case("warning", LogLevel::Warn)]
#[test_case("error", LogLevel::Error)]
#[test_case("off", LogLevel::Off)]
#[test_case("INFO", LogLevel::Info)]
#[test_case(" Debug ", LogLevel::Debug)]
fn LogLevel___from_str___parses(input: &str, expected: LogLevel) {
    assert_eq!(input.parse::<LogLevel>().unwrap(), expected);
}

#[test_case("")]
#[test_case("verbose")]
#[test_case("3")]
fn LogLevel___from_str___rejects_unknown(input: &str) {
    let err = input.parse::<LogLevel>().unwrap_err();

    assert_eq!(err, ParseLevelError(input.to_string()));
    assert!(err.to_string().contains("unknown log level"));
}

#[test_case(LogLevel::Trace, LevelFilter::TRACE)]
#[test_case(LogLevel::Debug, LevelFilter::DEBUG)]
#[test_case(LogLevel::Info, LevelFilter::INFO)]
#[test_case(LogLevel::Warn, LevelFilter::WARN)]
#[test_case(LogLevel::Error, LevelFilter::ERROR)]
#[test_case(LogLevel::Off, LevelFilter::OFF)]
fn LogLevel___to_filter___matches_tracing(level: LogLevel, expected: LevelFilter) {
    assert_eq!(level.to_filter(), expected);
}

#[test_case(LogLevel::Info, 0, LogLevel::Info)]
#[test_case(LogLevel::Info, 1, LogLevel::Debug)]
#[test_case(LogLevel::Info, 2, LogLevel::Trace)]
#[test_case(LogLevel::Info, 9, LogLevel::Trace)]
#[test_case(LogLevel::Error, 1, LogLevel::Warn)]
fn LogLevel___more_verbose___steps_down(level: LogLevel, steps: u8, expected: LogLevel) {
    assert_eq!(level.more_verbose(steps), expected);
}

#[test]
fn LogLevel___display___round_trips() {
    for level in [LogLevel::Trace, LogLevel::Warn, LogLevel::Off] {
        assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), level);
    }
}

#[test]
fn LogLevel___default___is_info() {
    assert_eq!(LogLevel::default(), LogLevel::Info);
}
