//! Version parsing and constraint normalisation
//!
//! Poetry writes constraints with its own operators (`^1.2`, `~1.2`, bare `1.2.3`).
//! Package metadata needs PEP 440 specifier sets, so every clause is rendered
//! into lower/upper bounds:
//!
//! - `^1.2.3` -> `>=1.2.3,<2.0.0`
//! - `~1.2.3` -> `>=1.2.3,<1.3.0`
//! - `~=1.2.3` -> `>=1.2.3,<1.3.0`
//! - `=1.2.3`, `1.2.3` -> `==1.2.3`
//!
//! Anything that cannot be interpreted is passed through untouched.

use std::fmt;

/// A parsed release version (`[N!]N(.N)*[suffix]`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    text: String,
    epoch: Option<u64>,
    release: Vec<u64>,
    suffix: String,
}

impl Version {
    /// Parse a version, returning `None` if it has no numeric release segment.
    pub fn parse(text: &str) -> Option<Version> {
        let text = text.trim();
        let body = text
            .strip_prefix('v')
            .or_else(|| text.strip_prefix('V'))
            .unwrap_or(text);

        let (epoch, body) = match body.split_once('!') {
            Some((epoch, rest)) => (Some(epoch.parse().ok()?), rest),
            None => (None, body),
        };

        let bytes = body.as_bytes();
        let mut release = Vec::new();
        let mut pos = 0;
        loop {
            let start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if start == pos {
                return None;
            }
            release.push(body[start..pos].parse().ok()?);

            // Continue only on a dot followed by another number
            if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
                pos += 1;
            } else {
                break;
            }
        }

        let suffix = body[pos..].to_string();
        if suffix.contains('*') || suffix.contains(char::is_whitespace) {
            return None;
        }

        Some(Version {
            text: text.to_string(),
            epoch,
            release,
            suffix,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn is_prerelease(&self) -> bool {
        let suffix = self.suffix.to_ascii_lowercase();
        let suffix = suffix.split('+').next().unwrap_or_default();
        ["a", "b", "c", "rc", "alpha", "beta", "pre", "preview", "dev"]
            .iter()
            .any(|tag| suffix.trim_start_matches(['.', '-', '_']).starts_with(tag))
    }

    /// `1.2.3` -> `2.0.0`
    ///
    /// The upper bounds return `None` when the bumped component overflows.
    pub fn next_major(&self) -> Option<String> {
        self.bump(0)
    }

    /// `1.2.3` -> `1.3.0`, `1` -> `2`
    pub fn next_minor(&self) -> Option<String> {
        if self.release.len() < 2 {
            self.next_major()
        } else {
            self.bump(1)
        }
    }

    /// Upper bound of a PEP 440 compatible release clause (`~=`)
    ///
    /// `1.2.3` -> `1.3.0`, `1.2` -> `2.0`
    pub fn compatible_upper(&self) -> Option<String> {
        if self.release.len() < 2 {
            self.next_major()
        } else {
            self.bump(self.release.len() - 2)
        }
    }

    /// Upper bound of a caret clause (`^`)
    ///
    /// Bumps the first non-zero component: `1.2.3` -> `2.0.0`, `0.2.3` -> `0.3.0`,
    /// `0.0.3` -> `0.0.4`, `0.0` -> `0.1`.
    pub fn caret_upper(&self) -> Option<String> {
        let index = self
            .release
            .iter()
            .position(|&n| n != 0)
            .unwrap_or(self.release.len() - 1);
        self.bump(index)
    }

    /// Increment the component at `index`, zero everything after it and keep the
    /// number of components.
    fn bump(&self, index: usize) -> Option<String> {
        let mut parts: Vec<u64> = self.release.iter().take(index + 1).copied().collect();
        parts.resize(index + 1, 0);
        parts[index] = parts[index].checked_add(1)?;
        parts.resize(self.release.len().max(index + 1), 0);

        let release = parts
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".");
        Some(match self.epoch {
            Some(epoch) => format!("{}!{}", epoch, release),
            None => release,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Operators recognised at the start of a constraint clause, longest first
const OPERATORS: [&str; 10] = ["~=", "==", "!=", ">=", "<=", "^", "~", ">", "<", "="];

/// Render a poetry constraint as a PEP 440 specifier set.
///
/// Returns an empty string for "any version" (`*` or empty input) and the
/// trimmed input when any clause cannot be interpreted.
pub fn normalize_constraint(constraint: &str) -> String {
    let constraint = constraint.trim();
    if constraint.is_empty() || constraint == "*" {
        return String::new();
    }
    if constraint.contains('|') {
        return constraint.to_string();
    }

    let mut specifiers = Vec::new();
    for clause in constraint.split(',') {
        match normalize_clause(clause.trim()) {
            Some(mut parts) => specifiers.append(&mut parts),
            None => return constraint.to_string(),
        }
    }
    specifiers.join(",")
}

fn normalize_clause(clause: &str) -> Option<Vec<String>> {
    if clause == "*" {
        return Some(Vec::new());
    }

    let (op, version) = OPERATORS
        .iter()
        .find_map(|op| clause.strip_prefix(op).map(|rest| (*op, rest.trim())))
        .unwrap_or(("", clause));
    if version.is_empty() {
        return None;
    }

    let specifiers = match op {
        "^" | "~" | "~=" => {
            let parsed = Version::parse(version)?;
            let upper = match op {
                "^" => parsed.caret_upper(),
                "~" => parsed.next_minor(),
                _ => parsed.compatible_upper(),
            }?;
            vec![format!(">={}", version), format!("<{}", upper)]
        }
        "" | "=" | "==" => {
            if !is_version_or_wildcard(version) {
                return None;
            }
            vec![format!("=={}", version)]
        }
        _ => vec![format!("{}{}", op, version)],
    };
    Some(specifiers)
}

fn is_version_or_wildcard(version: &str) -> bool {
    match version.strip_suffix(".*") {
        Some(prefix) => Version::parse(prefix).is_some(),
        None => Version::parse(version).is_some(),
    }
}
