//! Heuristic detection oracles
//!
//! Each predicate is a substring heuristic calibrated to a known test application.
//! The doc comment on each one names its false-positive/negative risk.

use regex::Regex;
use std::sync::OnceLock;

/// Database error signatures: (pattern, engine)
const SQL_ERROR_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)you have an error in your sql", "MySQL"),
    (r"(?i)error in your sql", "MySQL"),
    (r"(?i)sql syntax", "Generic SQL"),
    (r"(?i)warning: mysql", "MySQL"),
    (r"(?i)mysql_fetch", "MySQL"),
    (r"(?i)mysql_num_rows", "MySQL"),
    (r"(?i)unclosed quotation mark", "MSSQL"),
    (r"(?i)ora-\d{5}", "Oracle"),
    (r"(?i)sqlstate\[", "Generic SQL (PDO)"),
];

/// Client-side sinks that move attacker-influenced data into executable context
pub const DOM_SINKS: &[&str] = &["document.write", "innerhtml", "location.hash"];

/// Signature of a leaked `/etc/passwd`
const SYSTEM_FILE_SIGNATURE: &str = "root:x:";

fn sql_error_regexes() -> &'static [(Regex, &'static str)] {
    static REGEXES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        SQL_ERROR_PATTERNS
            .iter()
            .filter_map(|(p, db)| Regex::new(p).ok().map(|re| (re, *db)))
            .collect()
    })
}

/// Returns the database engine whose error text appears in `body`.
///
/// False positive on pages that document SQL errors; false negative when the target
/// suppresses error output (blind injection).
pub fn sql_error_signature(body: &str) -> Option<&'static str> {
    sql_error_regexes()
        .iter()
        .find(|(re, _)| re.is_match(body))
        .map(|(_, db)| *db)
}

/// True when `payload` appears verbatim (unescaped) in `body`.
///
/// False negative when the target transforms the payload (case, encoding) yet still
/// executes it.
pub fn reflects(body: &str, payload: &str) -> bool {
    !payload.is_empty() && body.contains(payload)
}

/// Case-insensitive count of `marker` in `body`. Zero for an empty marker.
///
/// Over-counts when the marker text also appears outside result rows.
pub fn count_row_markers(body: &str, marker: &str) -> usize {
    if marker.is_empty() {
        return 0;
    }
    body.to_lowercase().matches(&marker.to_lowercase()).count()
}

/// Relative content-length change against the baseline, or `None` for an empty baseline
pub fn length_delta(baseline_len: usize, len: usize) -> Option<f64> {
    if baseline_len == 0 {
        return None;
    }
    Some((len as f64 - baseline_len as f64).abs() / baseline_len as f64)
}

/// True when the length changed by strictly more than `ratio`.
///
/// Dynamic content (timestamps, ads) can push benign pages over the threshold.
pub fn length_delta_exceeds(baseline_len: usize, len: usize, ratio: f64) -> bool {
    length_delta(baseline_len, len).is_some_and(|delta| delta > ratio)
}

/// Dangerous DOM sinks present in the lowercased page source.
///
/// A static proxy: a sink in dead code or with a constant argument still matches.
pub fn find_dom_sinks(body: &str) -> Vec<&'static str> {
    let lower = body.to_lowercase();
    DOM_SINKS
        .iter()
        .copied()
        .filter(|sink| lower.contains(sink))
        .collect()
}

/// First private-data label shown in `body`, if any.
///
/// Cannot tell whose record is displayed; any record view matches.
pub fn private_data_marker<'m>(body: &str, markers: &[&'m str]) -> Option<&'m str> {
    markers.iter().copied().find(|m| body.contains(m))
}

/// True when the response carries a sensitive system file
pub fn exposes_system_file(body: &str) -> bool {
    body.contains(SYSTEM_FILE_SIGNATURE)
}

/// True when the page asks the visitor to log in.
///
/// Case-sensitive on "Login" so a "Logout" link on an authorized page does not count.
/// False negative when the login form is labelled differently (e.g. "Sign in").
pub fn shows_login_prompt(body: &str) -> bool {
    body.contains("Login")
}
