//! Distinguished name helpers.
//!
//! Group membership values come back from the directory with whatever
//! casing and spacing the server stores. Canonical form upper-cases the
//! attribute types and drops whitespace around separators. Attribute values
//! keep their case.
//!
//! Group map keys are compared verbatim, so a key only matches when it is
//! itself in canonical form. Pass keys through [`canonicalize_dn`] before
//! handing the map to the authenticator.

/// Canonicalizes a distinguished name.
///
/// Escaped characters (`\,`, `\+`, `\=` and hex pairs) are copied through
/// untouched. A value that does not parse as a DN is returned trimmed.
#[must_use]
pub fn canonicalize_dn(dn: &str) -> String {
    let Some(components) = split_rdns(dn) else {
        return dn.trim().to_string();
    };

    let mut canonical = String::with_capacity(dn.len());
    for (separator, attr, value) in components {
        if let Some(separator) = separator {
            canonical.push(separator);
        }
        canonical.push_str(&attr.to_ascii_uppercase());
        canonical.push('=');
        canonical.push_str(&value);
    }
    canonical
}

/// Builds the default search base for a realm: `EXAMPLE.COM` becomes
/// `DC=example,DC=com`.
#[must_use]
pub fn realm_base_dn(realm: &str) -> String {
    realm
        .split('.')
        .filter(|label| !label.is_empty())
        .map(|label| format!("DC={}", label.to_ascii_lowercase()))
        .collect::<Vec<_>>()
        .join(",")
}

// Splits on unescaped commas and plus signs, remembering which separator
// preceded each component so multi-valued RDNs stay intact.
fn split_rdns(dn: &str) -> Option<Vec<(Option<char>, String, String)>> {
    let trimmed = dn.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut components = Vec::new();
    let mut current = String::new();
    let mut separator = None;
    let mut chars = trimmed.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                current.push(chars.next()?);
            }
            ',' | '+' => {
                let (attr, value) = split_component(&current)?;
                components.push((separator, attr, value));
                separator = Some(c);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    let (attr, value) = split_component(&current)?;
    components.push((separator, attr, value));

    Some(components)
}

fn split_component(component: &str) -> Option<(String, String)> {
    let (attr, value) = component.split_once('=')?;
    let attr = attr.trim();
    if attr.is_empty() || attr.contains(char::is_whitespace) {
        return None;
    }
    Some((attr.to_string(), trim_value(value)))
}

// Leading and trailing spaces are insignificant unless escaped. A trailing
// space is escaped only when an odd number of backslashes precedes it.
fn trim_value(value: &str) -> String {
    let start = value.trim_start();
    let mut end = start.trim_end().to_string();
    let backslashes = end.chars().rev().take_while(|&c| c == '\\').count();
    if start.len() > end.len() && backslashes % 2 == 1 {
        end.push(' ');
    }
    end
}
