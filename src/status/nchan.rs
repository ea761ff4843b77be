//! Parser for the Nchan `nchan_stub_status` page.
//!
//! The page is 13 stat lines followed by a version line and a final newline.
//! Each stat line is a fixed sentence ending in one numeric token; the two
//! shared-memory lines suffix the value with a `K` unit marker. Values are
//! assigned to fields purely by line position.

use super::{parse_value, split_line, ParseError};

/// Nchan stub_status metrics, one snapshot per collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StubStats {
    pub messages: StubMessages,
    /// Shared memory used, in kibibytes as reported.
    pub shared_memory_used: i64,
    /// Shared memory limit, in kibibytes as reported.
    pub shared_memory_limit: i64,
    pub channels: i64,
    pub subscribers: i64,
    pub redis: StubRedis,
    pub interprocess: StubInterprocess,
}

/// Message-related metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StubMessages {
    pub total_published: i64,
    pub stored: i64,
}

/// Redis-related metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StubRedis {
    pub pending_commands: i64,
    pub connected_servers: i64,
}

/// Interprocess-alert metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StubInterprocess {
    pub alerts_in_transit: i64,
    pub queued_alerts: i64,
    pub total_alerts_received: i64,
    pub total_send_delay: i64,
    pub total_receive_delay: i64,
}

/// Number of stat lines carrying values.
const STAT_LINES: usize = 13;

/// Splitting the page on `\n` yields the stat lines, the version line, and
/// the empty slice after the final newline.
const REPORT_PARTS: usize = STAT_LINES + 2;

/// Grammar of one stat line: its field label for diagnostics, the exact
/// token count after a single-space split, and whether the value token
/// carries a `K` kibibyte marker.
struct LineSpec {
    field: &'static str,
    tokens: usize,
    kibibytes: bool,
}

#[rustfmt::skip]
const LINE_SPECS: [LineSpec; STAT_LINES] = [
    LineSpec { field: "total published messages", tokens: 4, kibibytes: false },
    LineSpec { field: "stored messages", tokens: 3, kibibytes: false },
    LineSpec { field: "shared memory used", tokens: 4, kibibytes: true },
    LineSpec { field: "shared memory limit", tokens: 4, kibibytes: true },
    LineSpec { field: "channels", tokens: 2, kibibytes: false },
    LineSpec { field: "subscribers", tokens: 2, kibibytes: false },
    LineSpec { field: "redis pending commands", tokens: 4, kibibytes: false },
    LineSpec { field: "redis connected servers", tokens: 4, kibibytes: false },
    LineSpec { field: "interprocess alerts received", tokens: 5, kibibytes: false },
    LineSpec { field: "interprocess alerts in transit", tokens: 5, kibibytes: false },
    LineSpec { field: "interprocess queued alerts", tokens: 4, kibibytes: false },
    LineSpec { field: "interprocess send delay", tokens: 5, kibibytes: false },
    LineSpec { field: "interprocess receive delay", tokens: 5, kibibytes: false },
];

/// Parses a raw `nchan_stub_status` page into [`StubStats`].
///
/// Fails atomically on any deviation from the fixed format; the returned
/// record is always fully populated.
pub fn parse_stub_stats(data: &[u8]) -> Result<StubStats, ParseError> {
    let text = String::from_utf8_lossy(data);

    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() != REPORT_PARTS {
        return Err(ParseError::LineCount {
            expected: REPORT_PARTS,
            found: lines.len(),
        });
    }

    let mut values = [0i64; STAT_LINES];
    for (value, (spec, line)) in values.iter_mut().zip(LINE_SPECS.iter().zip(&lines)) {
        let tokens = split_line(line, spec.field, spec.tokens)?;

        // The value is always the last token.
        let token = tokens[spec.tokens - 1];
        *value = if spec.kibibytes {
            parse_value(spec.field, &token.replacen('K', "", 1))?
        } else {
            parse_value(spec.field, token)?
        };
    }

    Ok(StubStats {
        messages: StubMessages {
            total_published: values[0],
            stored: values[1],
        },
        shared_memory_used: values[2],
        shared_memory_limit: values[3],
        channels: values[4],
        subscribers: values[5],
        redis: StubRedis {
            pending_commands: values[6],
            connected_servers: values[7],
        },
        interprocess: StubInterprocess {
            total_alerts_received: values[8],
            alerts_in_transit: values[9],
            queued_alerts: values[10],
            total_send_delay: values[11],
            total_receive_delay: values[12],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "total published messages: 123\n\
                          stored messages: 54353\n\
                          shared memory used: 12K\n\
                          shared memory limit: 1048576K\n\
                          channels: 34\n\
                          subscribers: 5434535\n\
                          redis pending commands: 48\n\
                          redis connected servers: 65\n\
                          total interprocess alerts received: 43\n\
                          interprocess alerts in transit: 654\n\
                          interprocess queued alerts: 765\n\
                          total interprocess send delay: 534\n\
                          total interprocess receive delay: 46\n\
                          nchan version: 1.1.5\n";

    #[test]
    fn test_parse_reference_report() {
        let stats = parse_stub_stats(REPORT.as_bytes()).expect("reference report");

        assert_eq!(stats.messages.total_published, 123);
        assert_eq!(stats.messages.stored, 54353);
        assert_eq!(stats.shared_memory_used, 12);
        assert_eq!(stats.shared_memory_limit, 1048576);
        assert_eq!(stats.channels, 34);
        assert_eq!(stats.subscribers, 5434535);
        assert_eq!(stats.redis.pending_commands, 48);
        assert_eq!(stats.redis.connected_servers, 65);
        assert_eq!(stats.interprocess.total_alerts_received, 43);
        assert_eq!(stats.interprocess.alerts_in_transit, 654);
        assert_eq!(stats.interprocess.queued_alerts, 765);
        assert_eq!(stats.interprocess.total_send_delay, 534);
        assert_eq!(stats.interprocess.total_receive_delay, 46);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = parse_stub_stats(REPORT.as_bytes()).expect("first parse");
        let second = parse_stub_stats(REPORT.as_bytes()).expect("second parse");
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_tolerates_surrounding_whitespace() {
        let padded = REPORT
            .lines()
            .map(|l| format!("  {l}  "))
            .collect::<Vec<_>>()
            .join("\n")
            + "\n";
        let stats = parse_stub_stats(padded.as_bytes()).expect("padded report");
        assert_eq!(stats.channels, 34);
        assert_eq!(stats.subscribers, 5434535);
    }

    #[test]
    fn test_parse_rejects_wrong_line_count() {
        let err = parse_stub_stats(b"invalid-stats").unwrap_err();
        assert_eq!(
            err,
            ParseError::LineCount {
                expected: 15,
                found: 1,
            }
        );
    }

    #[test]
    fn test_parse_rejects_extra_line() {
        let extra = format!("{REPORT}one line too many\n");
        let err = parse_stub_stats(extra.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            ParseError::LineCount {
                expected: 15,
                found: 16,
            }
        );
    }

    #[test]
    fn test_parse_rejects_missing_final_newline() {
        let truncated = REPORT.trim_end_matches('\n');
        let err = parse_stub_stats(truncated.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            ParseError::LineCount {
                expected: 15,
                found: 14,
            }
        );
    }

    #[test]
    fn test_parse_rejects_doubled_space() {
        let mangled = REPORT.replacen("channels: 34", "channels:  34", 1);
        let err = parse_stub_stats(mangled.as_bytes()).unwrap_err();
        match err {
            ParseError::TokenCount {
                field,
                expected,
                found,
                ..
            } => {
                assert_eq!(field, "channels");
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_non_numeric_value() {
        let mangled = REPORT.replacen("subscribers: 5434535", "subscribers: many", 1);
        let err = parse_stub_stats(mangled.as_bytes()).unwrap_err();
        match err {
            ParseError::InvalidValue { field, token, .. } => {
                assert_eq!(field, "subscribers");
                assert_eq!(token, "many");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_identifies_failing_interprocess_line() {
        let mangled = REPORT.replacen(
            "total interprocess send delay: 534",
            "total interprocess send delay happened: 534",
            1,
        );
        let err = parse_stub_stats(mangled.as_bytes()).unwrap_err();
        match err {
            ParseError::TokenCount { field, found, .. } => {
                assert_eq!(field, "interprocess send delay");
                assert_eq!(found, 6);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_strips_only_first_kilobyte_marker() {
        // The unit strip removes the first K; anything left still fails the
        // integer conversion.
        let mangled = REPORT.replacen("shared memory used: 12K", "shared memory used: 12KK", 1);
        let err = parse_stub_stats(mangled.as_bytes()).unwrap_err();
        match err {
            ParseError::InvalidValue { field, token, .. } => {
                assert_eq!(field, "shared memory used");
                assert_eq!(token, "12K");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_version_line_is_ignored() {
        let other_version = REPORT.replacen("nchan version: 1.1.5", "nchan version: 9.9.9", 1);
        let a = parse_stub_stats(REPORT.as_bytes()).expect("reference report");
        let b = parse_stub_stats(other_version.as_bytes()).expect("other version");
        assert_eq!(a, b);
    }
}
