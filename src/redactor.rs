/*!
 * Redaction of sensitive substrings in scanned file contents
 *
 * Patterns form a closed set applied in declaration order. Assignment-style
 * patterns (`key = value`) only replace the value, so the keyword and any
 * quoting around it stay in place.
 */

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use strum::{EnumIter, IntoEnumIterator};

use crate::error::{ContextError, Result};
use crate::types::{FileEntry, ScanResult};

/// Sentinel that replaces every match
pub const REPLACEMENT: &str = "***REDACTED***";

/// Registered redaction patterns, in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum RedactionPattern {
    ApiKey,
    Secret,
    Password,
    Email,
    Ipv4,
    PrivateKey,
    AwsKey,
    ConnectionString,
}

struct CompiledPattern {
    regex: Regex,
    /// Replace only capture group 1 instead of the whole match
    value_only: bool,
}

static API_KEY: Lazy<CompiledPattern> = Lazy::new(|| {
    value_pattern(r#"(?i)(?:api[_-]?key|apikey|access[_-]?key)\s*[=:]\s*["']?([a-zA-Z0-9_\-]{16,})["']?"#)
});
static SECRET: Lazy<CompiledPattern> = Lazy::new(|| {
    value_pattern(r#"(?i)(?:secret|token|bearer)\s*[=:]\s*["']?([a-zA-Z0-9_\-]{16,})["']?"#)
});
static PASSWORD: Lazy<CompiledPattern> = Lazy::new(|| {
    value_pattern(r#"(?i)(?:password|passwd|pwd)\s*[=:]\s*["']?([^\s"']{4,})["']?"#)
});
static EMAIL: Lazy<CompiledPattern> =
    Lazy::new(|| whole_pattern(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}"));
static IPV4: Lazy<CompiledPattern> = Lazy::new(|| whole_pattern(r"\b(?:\d{1,3}\.){3}\d{1,3}\b"));
static PRIVATE_KEY: Lazy<CompiledPattern> =
    Lazy::new(|| whole_pattern(r"-----BEGIN\s+(?:RSA\s+)?PRIVATE\s+KEY-----"));
static AWS_KEY: Lazy<CompiledPattern> = Lazy::new(|| whole_pattern(r"AKIA[0-9A-Z]{16}"));
static CONNECTION_STRING: Lazy<CompiledPattern> = Lazy::new(|| {
    whole_pattern(r#"(?i)(?:mongodb|postgres|postgresql|mysql|redis)://[^\s"']+"#)
});

// The expressions are literals checked by the tests below
fn value_pattern(expr: &str) -> CompiledPattern {
    CompiledPattern {
        regex: Regex::new(expr).expect("valid redaction regex"),
        value_only: true,
    }
}

fn whole_pattern(expr: &str) -> CompiledPattern {
    CompiledPattern {
        regex: Regex::new(expr).expect("valid redaction regex"),
        value_only: false,
    }
}

impl RedactionPattern {
    /// Human readable name, as shown in findings
    pub fn name(&self) -> &'static str {
        match self {
            Self::ApiKey => "API Key",
            Self::Secret => "Secret",
            Self::Password => "Password",
            Self::Email => "Email",
            Self::Ipv4 => "IPv4",
            Self::PrivateKey => "Private Key",
            Self::AwsKey => "AWS Key",
            Self::ConnectionString => "Connection String",
        }
    }

    /// All patterns in registry order
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    fn compiled(&self) -> &'static CompiledPattern {
        match self {
            Self::ApiKey => &*API_KEY,
            Self::Secret => &*SECRET,
            Self::Password => &*PASSWORD,
            Self::Email => &*EMAIL,
            Self::Ipv4 => &*IPV4,
            Self::PrivateKey => &*PRIVATE_KEY,
            Self::AwsKey => &*AWS_KEY,
            Self::ConnectionString => &*CONNECTION_STRING,
        }
    }

    /// Replace every match in `text`, returning the new text and the number
    /// of replacements made
    fn apply(&self, text: &str) -> (String, usize) {
        let compiled = self.compiled();
        let mut count = 0;

        let replaced = compiled.regex.replace_all(text, |caps: &Captures| {
            let whole = &caps[0];
            if !compiled.value_only {
                count += 1;
                return REPLACEMENT.to_string();
            }

            let (Some(all), Some(value)) = (caps.get(0), caps.get(1)) else {
                return whole.to_string();
            };
            // Already redacted on a previous pass
            if value.as_str() == REPLACEMENT {
                return whole.to_string();
            }
            count += 1;
            format!(
                "{}{}{}",
                &text[all.start()..value.start()],
                REPLACEMENT,
                &text[value.end()..all.end()]
            )
        });

        (replaced.into_owned(), count)
    }
}

impl fmt::Display for RedactionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RedactionPattern {
    type Err = ContextError;

    /// Accepts the display name or a compact form, ignoring case, spaces,
    /// dashes and underscores ("API Key", "api_key", "apikey")
    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize(s);
        Self::iter()
            .find(|p| normalize(p.name()) == wanted)
            .ok_or_else(|| ContextError::UnknownPattern(s.to_string()))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Number of matches of one pattern in one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub pattern: RedactionPattern,
    pub count: usize,
}

/// All matches found in one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionFinding {
    /// Relative path of the file
    pub file_path: String,
    /// Non-zero match counts in registry order
    pub matches: Vec<PatternMatch>,
}

/// Applies a fixed set of enabled patterns to scan results
#[derive(Debug, Clone)]
pub struct Redactor {
    enabled: BTreeSet<RedactionPattern>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Redactor {
    /// Create a redactor; an empty selection enables every pattern
    pub fn new(patterns: impl IntoIterator<Item = RedactionPattern>) -> Self {
        let mut enabled: BTreeSet<RedactionPattern> = patterns.into_iter().collect();
        if enabled.is_empty() {
            enabled = RedactionPattern::iter().collect();
        }
        Self { enabled }
    }

    /// Create a redactor from pattern names, failing on the first unknown one
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let patterns = names
            .iter()
            .map(|n| n.as_ref().parse::<RedactionPattern>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(patterns))
    }

    /// Enabled patterns in registry order
    pub fn patterns(&self) -> Vec<RedactionPattern> {
        self.enabled.iter().copied().collect()
    }

    /// Redact one piece of text
    pub fn redact_content(&self, content: &str) -> (String, Vec<PatternMatch>) {
        let mut redacted = content.to_string();
        let mut matches = Vec::new();

        for pattern in &self.enabled {
            let (next, count) = pattern.apply(&redacted);
            if count > 0 {
                matches.push(PatternMatch {
                    pattern: *pattern,
                    count,
                });
                redacted = next;
            }
        }

        (redacted, matches)
    }

    /// Redact every file of `scan`, leaving the input untouched
    pub fn redact(&self, scan: &ScanResult) -> (ScanResult, Vec<RedactionFinding>) {
        let mut findings = Vec::new();
        let files = scan
            .files
            .iter()
            .map(|file| {
                let (content, matches) = self.redact_content(&file.content);
                if !matches.is_empty() {
                    findings.push(RedactionFinding {
                        file_path: file.path.clone(),
                        matches,
                    });
                }
                FileEntry {
                    path: file.path.clone(),
                    encoding: file.encoding.clone(),
                    content,
                }
            })
            .collect();

        let redacted = ScanResult {
            root: scan.root.clone(),
            structure: scan.structure.clone(),
            files,
            skipped: scan.skipped.clone(),
            errors: scan.errors.clone(),
        };

        (redacted, findings)
    }
}
