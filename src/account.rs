//! Account identifier rules.
//!
//! A requested local name is combined with the faucet's fixed suffix to
//! form the full account id. Validation is a plain byte scan over the
//! label grammar rather than a regex, so the accepted language is spelled
//! out in code: dot-separated labels, each one or more `[a-z0-9]` groups
//! joined by single `-` or `_` separators.

/// Shortest full account id the ledger accepts.
pub const MIN_ACCOUNT_ID_LEN: usize = 2;

/// Longest full account id the ledger accepts.
pub const MAX_ACCOUNT_ID_LEN: usize = 64;

/// Checks whether `candidate + suffix` forms a valid account id.
///
/// The candidate itself may not contain `.` — sub-accounts are not part of
/// this flow. Assumes the caller has already lower-cased the input and
/// stripped characters outside `[a-z0-9\-_.]` (see
/// [`sanitize_requested_name`]).
pub fn is_valid_account_id(candidate: &str, suffix: &str) -> bool {
    if candidate.contains('.') {
        return false;
    }
    let len = candidate.len() + suffix.len();
    if !(MIN_ACCOUNT_ID_LEN..=MAX_ACCOUNT_ID_LEN).contains(&len) {
        return false;
    }
    let full = [candidate, suffix].concat();
    full.split('.').all(is_valid_label)
}

/// One dot-separated label: `[a-z0-9]` groups joined by single `-`/`_`,
/// never leading, trailing, or doubled separators.
fn is_valid_label(label: &str) -> bool {
    if label.is_empty() {
        return false;
    }
    // Treat the label boundary as a separator to reject a leading one.
    let mut after_separator = true;
    for &byte in label.as_bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' => after_separator = false,
            b'-' | b'_' => {
                if after_separator {
                    return false;
                }
                after_separator = true;
            }
            _ => return false,
        }
    }
    !after_separator
}

/// Normalizes raw user input the way the account form does: lower-case,
/// then drop anything outside `[a-z0-9\-_.]`.
pub fn sanitize_requested_name(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_' | '.'))
        .collect()
}
