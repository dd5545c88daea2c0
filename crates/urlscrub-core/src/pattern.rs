//! Rule pattern compilation.
//!
//! Each rule category in a ClearURLs-style document is a raw regular
//! expression that means something different depending on where it is used.
//! `PatternKind` captures that and `Pattern::compile` wraps the raw text
//! accordingly.

use regex::{Captures, Regex};

/// How a raw rule string is wrapped before compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Must match at the start of the subject (`urlPattern`, `exceptions`).
    Anchored,
    /// Names a query field; matches `boundary name [=value]` (`rules`, `referralMarketing`).
    QueryField,
    /// Used as-is, matched anywhere (`rawRules`, body-redirect rules).
    Raw,
    /// Extends to end of subject so a substitution replaces the whole tail (`redirections`).
    Redirection,
}

/// A compiled rule pattern that remembers its source text.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    kind: PatternKind,
    regex: Regex,
}

/// Field boundaries that may precede a query parameter name.
const FIELD_BOUNDARY: &str = r"(%26|&|%23|#|\?|^)";

/// Separator between a query parameter name and its value.
const VALUE_PART: &str = r"(?:(?:=|%3[Dd])[^&#]*)?";

impl Pattern {
    pub fn compile(source: &str, kind: PatternKind) -> Result<Self, regex::Error> {
        let wrapped = match kind {
            PatternKind::Anchored => format!("^(?:{})", source),
            PatternKind::QueryField => format!("{}(?:{}){}", FIELD_BOUNDARY, source, VALUE_PART),
            PatternKind::Raw => source.to_string(),
            PatternKind::Redirection => format!("(?:{}).*", source),
        };
        let regex = Regex::new(&wrapped)?;
        Ok(Self {
            source: source.to_string(),
            kind,
            regex,
        })
    }

    /// The rule text as written in the document.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, subject: &str) -> bool {
        self.regex.is_match(subject)
    }

    /// Number of explicit capture groups in the raw rule.
    pub fn capture_groups(&self) -> usize {
        let implicit = usize::from(self.kind == PatternKind::QueryField);
        self.regex.captures_len().saturating_sub(1 + implicit)
    }

    /// Replaces every match with the rule's first capture group (redirection rules).
    pub fn substitute_first_group(&self, subject: &str) -> String {
        self.regex
            .replace_all(subject, |caps: &Captures<'_>| {
                caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default()
            })
            .into_owned()
    }

    /// Removes every matching query field, keeping the boundary that preceded it.
    ///
    /// A match only counts when the field name ends at a field boundary, so a
    /// rule for `utm` leaves `utmost=1` alone.
    pub fn strip_fields(&self, subject: &str) -> String {
        self.regex
            .replace_all(subject, |caps: &Captures<'_>| {
                let whole = match caps.get(0) {
                    Some(m) => m,
                    None => return String::new(),
                };
                let rest = &subject[whole.end()..];
                let at_boundary = rest.is_empty()
                    || rest.starts_with('&')
                    || rest.starts_with('#')
                    || starts_with_ignore_case(rest, "%26")
                    || starts_with_ignore_case(rest, "%23");
                if at_boundary {
                    caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default()
                } else {
                    whole.as_str().to_string()
                }
            })
            .into_owned()
    }

    /// Deletes every match (raw rules).
    pub fn strip_all(&self, subject: &str) -> String {
        self.regex.replace_all(subject, "").into_owned()
    }

    /// First capture group of the first match (body-redirect rules).
    pub fn first_group<'h>(&self, haystack: &'h str) -> Option<&'h str> {
        self.regex
            .captures(haystack)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
