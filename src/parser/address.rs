//! RFC 5322 §3.4 address-list parsing.
//!
//! Tolerant of real-world input: quoted names with commas, comments,
//! groups, missing closing brackets, `;` used as a list separator. Whatever
//! can be recovered is returned; nothing here fails.

use crate::model::address::Address;

/// Parse an address list, leaving display names exactly as written
/// (quotes and escapes resolved, encoded-words untouched).
///
/// Groups (`Team: a@x.com, b@y.com;`) are expanded into their members; the
/// group label itself is dropped.
///
/// A quote that is never closed would swallow the rest of the list, so the
/// list is scanned again with that quote removed.
pub fn parse_address_list(raw: &str) -> Vec<Address> {
    let mut input = raw.to_string();
    loop {
        match scan(&input) {
            Ok(results) => return results,
            Err(open_quote) => {
                input.remove(open_quote);
            }
        }
    }
}

/// One pass over the list. Fails with the byte position of the opening
/// quote if a quoted string is still open at the end.
fn scan(raw: &str) -> Result<Vec<Address>, usize> {
    let mut results = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut open_quote = 0usize;
    let mut escaped = false;
    let mut comment_depth = 0usize;
    let mut in_angle = false;
    let mut in_group = false;

    for (pos, ch) in raw.char_indices() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes || comment_depth > 0 => {
                escaped = true;
                current.push(ch);
            }
            '"' if comment_depth == 0 => {
                if !in_quotes {
                    open_quote = pos;
                }
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '(' if !in_quotes => {
                comment_depth += 1;
                current.push(ch);
            }
            ')' if !in_quotes && comment_depth > 0 => {
                comment_depth -= 1;
                current.push(ch);
            }
            _ if in_quotes || comment_depth > 0 => current.push(ch),
            '<' => {
                in_angle = true;
                current.push(ch);
            }
            '>' => {
                in_angle = false;
                current.push(ch);
            }
            _ if in_angle => current.push(ch),
            ':' if !in_group => {
                // Everything so far was the group label.
                in_group = true;
                current.clear();
            }
            ',' => flush(&mut current, &mut results),
            ';' => {
                flush(&mut current, &mut results);
                in_group = false;
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err(open_quote);
    }
    flush(&mut current, &mut results);

    Ok(results)
}

fn flush(current: &mut String, results: &mut Vec<Address>) {
    if let Some(addr) = parse_mailbox(current) {
        results.push(addr);
    }
    current.clear();
}

/// Parse a single `name <addr>`, `<addr>`, `addr (name)` or bare `addr`.
fn parse_mailbox(item: &str) -> Option<Address> {
    let (text, comment) = strip_comments(item);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(open) = find_unquoted(text, '<') {
        let after = &text[open + 1..];
        let inner = match after.find('>') {
            Some(end) => &after[..end],
            None => after,
        };
        let addr = strip_route(inner.trim());
        let mut name = phrase(&text[..open]);
        if name.is_empty() {
            name = comment.unwrap_or_default();
        }
        if addr.is_empty() && name.is_empty() {
            return None;
        }
        return Some(Address::new(name, addr));
    }

    let addr: String = text.split_whitespace().collect();
    Some(Address::new(comment.unwrap_or_default(), &addr))
}

/// Remove `( … )` comments outside quoted strings. The text of the first
/// top-level comment is returned alongside.
fn strip_comments(s: &str) -> (String, Option<String>) {
    let mut out = String::with_capacity(s.len());
    let mut first_comment: Option<String> = None;
    let mut comment = String::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if depth > 0 {
                comment.push(ch);
            } else {
                out.push(ch);
            }
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                escaped = true;
                out.push(ch);
            }
            '\\' if depth > 0 => escaped = true,
            '"' if depth == 0 => {
                in_quotes = !in_quotes;
                out.push(ch);
            }
            '(' if !in_quotes => {
                if depth > 0 {
                    comment.push(ch);
                }
                depth += 1;
            }
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let text = comment.trim().to_string();
                    if first_comment.is_none() && !text.is_empty() {
                        first_comment = Some(text);
                    }
                    comment.clear();
                    out.push(' ');
                } else {
                    comment.push(ch);
                }
            }
            c if depth > 0 => comment.push(c),
            c => out.push(c),
        }
    }

    (out, first_comment)
}

/// Byte index of the first `ch` outside a quoted string.
fn find_unquoted(s: &str, target: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == target && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// Drop an obsolete source route: `@relay1,@relay2:user@host` → `user@host`.
fn strip_route(addr: &str) -> &str {
    if addr.starts_with('@') {
        if let Some((_, rest)) = addr.rsplit_once(':') {
            return rest.trim();
        }
    }
    addr
}

/// Turn a display-name phrase into plain text: quotes removed, escapes
/// resolved, runs of unquoted whitespace collapsed to one space.
fn phrase(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_quotes = false;
    let mut escaped = false;
    let mut pending_space = false;

    for ch in s.trim().chars() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => pending_space = true,
            c => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }

    out
}
