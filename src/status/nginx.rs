//! Parser for the NGINX `stub_status` page.
//!
//! The page is three value-carrying lines plus a header line:
//!
//! ```text
//! Active connections: 291
//! server accepts handled requests
//!  16630948 16630948 31070465
//! Reading: 6 Writing: 179 Waiting: 106
//! ```

use super::{parse_value, split_line, ParseError};

/// NGINX stub_status metrics, one snapshot per collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NginxStats {
    pub connections: NginxConnections,
    pub requests: i64,
}

/// Connection-related metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NginxConnections {
    pub active: i64,
    pub accepted: i64,
    pub handled: i64,
    pub reading: i64,
    pub writing: i64,
    pub waiting: i64,
}

/// Splitting the page on `\n` yields the four report lines and the empty
/// slice after the final newline.
const REPORT_PARTS: usize = 5;

/// Parses a raw `stub_status` page into [`NginxStats`].
pub fn parse_stub_stats(data: &[u8]) -> Result<NginxStats, ParseError> {
    let text = String::from_utf8_lossy(data);

    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() != REPORT_PARTS {
        return Err(ParseError::LineCount {
            expected: REPORT_PARTS,
            found: lines.len(),
        });
    }

    let tokens = split_line(lines[0], "active connections", 3)?;
    let active = parse_value("active connections", tokens[2])?;

    // lines[1] is the "server accepts handled requests" header.
    let tokens = split_line(lines[2], "server requests", 3)?;
    let accepted = parse_value("accepted connections", tokens[0])?;
    let handled = parse_value("handled connections", tokens[1])?;
    let requests = parse_value("total requests", tokens[2])?;

    let tokens = split_line(lines[3], "connection states", 6)?;
    let reading = parse_value("reading connections", tokens[1])?;
    let writing = parse_value("writing connections", tokens[3])?;
    let waiting = parse_value("waiting connections", tokens[5])?;

    Ok(NginxStats {
        connections: NginxConnections {
            active,
            accepted,
            handled,
            reading,
            writing,
            waiting,
        },
        requests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "Active connections: 291 \n\
                          server accepts handled requests\n \
                          16630948 16630948 31070465 \n\
                          Reading: 6 Writing: 179 Waiting: 106 \n";

    #[test]
    fn test_parse_reference_report() {
        let stats = parse_stub_stats(REPORT.as_bytes()).expect("reference report");

        assert_eq!(stats.connections.active, 291);
        assert_eq!(stats.connections.accepted, 16630948);
        assert_eq!(stats.connections.handled, 16630948);
        assert_eq!(stats.connections.reading, 6);
        assert_eq!(stats.connections.writing, 179);
        assert_eq!(stats.connections.waiting, 106);
        assert_eq!(stats.requests, 31070465);
    }

    #[test]
    fn test_parse_rejects_wrong_line_count() {
        let err = parse_stub_stats(b"invalid-stats").unwrap_err();
        assert_eq!(
            err,
            ParseError::LineCount {
                expected: 5,
                found: 1,
            }
        );
    }

    #[test]
    fn test_parse_rejects_non_numeric_active_connections() {
        let mangled = REPORT.replacen("291", "lots", 1);
        let err = parse_stub_stats(mangled.as_bytes()).unwrap_err();
        match err {
            ParseError::InvalidValue { field, token, .. } => {
                assert_eq!(field, "active connections");
                assert_eq!(token, "lots");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_short_state_line() {
        let mangled = REPORT.replacen("Reading: 6 Writing: 179 Waiting: 106", "Reading: 6", 1);
        let err = parse_stub_stats(mangled.as_bytes()).unwrap_err();
        match err {
            ParseError::TokenCount {
                field,
                expected,
                found,
                ..
            } => {
                assert_eq!(field, "connection states");
                assert_eq!(expected, 6);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
