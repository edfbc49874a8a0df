//! Selector text parser.
//!
//! One argument is a whitespace-separated list of groups (unioned); a group
//! is a comma-separated list of criteria (intersected):
//!
//! ```text
//! argument   := group (whitespace group)*
//! group      := criterion ("," criterion)*
//! criterion  := "@"? ([depth] "+")? (method ":")? value ("+" [depth])?
//! ```
//!
//! Positions reported in errors are byte offsets into the argument.

use crate::criterion::{Criterion, Hops, Method};
use crate::{Result, SelectorError};

/// Parse one `--select` / `--exclude` argument into intersection groups.
///
/// # Errors
///
/// Returns [`SelectorError::Syntax`] naming the first malformed token.
pub fn parse_argument(argument: &str) -> Result<Vec<Vec<Criterion>>> {
    let mut groups = Vec::new();
    let mut cursor = 0;

    for chunk in argument.split_whitespace() {
        // split_whitespace yields subslices, so the offset can be recovered
        let offset = argument[cursor..]
            .find(chunk)
            .map_or(cursor, |found| cursor + found);
        cursor = offset + chunk.len();
        groups.push(parse_group(argument, offset, chunk)?);
    }

    if groups.is_empty() {
        return Err(SelectorError::syntax(argument, 0, argument, "empty selector"));
    }
    Ok(groups)
}

/// Parse a comma-separated group starting at `offset` within `argument`.
fn parse_group(argument: &str, offset: usize, group: &str) -> Result<Vec<Criterion>> {
    let mut criteria = Vec::new();
    let mut start = 0;

    for raw in group.split(',') {
        criteria.push(parse_criterion(argument, offset + start, raw)?);
        start += raw.len() + 1;
    }

    Ok(criteria)
}

/// Parse one criterion located at `offset` within `argument`.
pub(crate) fn parse_criterion(argument: &str, offset: usize, raw: &str) -> Result<Criterion> {
    let error = |at: usize, token: &str, reason: &str| {
        SelectorError::syntax(argument, offset + at, token, reason)
    };

    if raw.is_empty() {
        return Err(error(0, raw, "empty criterion"));
    }

    let full_closure = raw.starts_with('@');
    let mut start = usize::from(full_closure);
    let mut end = raw.len();

    // Leading `N+` / `+`
    let lead_digits = raw[start..].bytes().take_while(u8::is_ascii_digit).count();
    let ancestors = if raw[start + lead_digits..].starts_with('+') {
        let hops = parse_hops(&raw[start..start + lead_digits])
            .ok_or_else(|| error(start, &raw[start..start + lead_digits], "invalid depth"))?;
        start += lead_digits + 1;
        Some(hops)
    } else {
        None
    };

    // Trailing `+N` / `+`
    let trail_digits = raw[start..]
        .bytes()
        .rev()
        .take_while(u8::is_ascii_digit)
        .count();
    let plus = end - trail_digits;
    let descendants = if plus > start && raw.as_bytes()[plus - 1] == b'+' {
        let hops = parse_hops(&raw[plus..end])
            .ok_or_else(|| error(plus, &raw[plus..end], "invalid depth"))?;
        end = plus - 1;
        Some(hops)
    } else {
        None
    };

    if full_closure && (ancestors.is_some() || descendants.is_some()) {
        return Err(error(0, raw, "'@' cannot be combined with '+'"));
    }

    let body = &raw[start..end];
    if body.is_empty() {
        return Err(error(start, raw, "missing node selector value"));
    }
    if let Some(bad) = body.find(['+', '@']) {
        return Err(error(
            start + bad,
            &body[bad..=bad],
            "unexpected qualifier inside a value",
        ));
    }

    let (method, value) = match body.split_once(':') {
        Some((prefix, value)) => {
            let token = if prefix.is_empty() { body } else { prefix };
            let method =
                Method::from_prefix(prefix).map_err(|reason| error(start, token, reason))?;
            if value.is_empty() {
                return Err(error(start, body, "empty value"));
            }
            (method, value)
        }
        None if body == "*" => (Method::Wildcard, body),
        None => (Method::Name, body),
    };

    Ok(Criterion {
        method,
        value: value.to_string(),
        ancestors,
        descendants,
        full_closure,
    })
}

/// `""` means unbounded; digits give a hop limit.
fn parse_hops(digits: &str) -> Option<Hops> {
    if digits.is_empty() {
        return Some(Hops::Unbounded);
    }
    digits.parse().ok().map(Hops::AtMost)
}
