//! Free-text template substitution and channel escaping.
//!
//! Channel payload structure is built from typed records (see the adapter
//! modules); only the small free-text fields go through `{{name}}`
//! substitution, so malformed template input can never produce invalid
//! JSON/HTML for a channel.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::message::AlertMessage;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("valid token pattern"));

/// At most this many failure lines are carried into a message.
pub const MAX_FAILURE_LINES: usize = 3;

/// Named variables available to a template, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars(Vec<(String, String)>);

impl TemplateVars {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set a variable, replacing any previous value for the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Replace `{{name}}` tokens from `vars`.
///
/// Total: unknown tokens stay literal, so a template typo degrades the
/// message cosmetically instead of failing the delivery.
#[must_use]
pub fn substitute(template: &str, vars: &TemplateVars) -> String {
    TOKEN_PATTERN
        .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Escape Telegram Markdown control characters in user-supplied text.
#[must_use]
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape the characters Slack treats as control sequences.
#[must_use]
pub fn escape_slack(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text for embedding in an HTML email body.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Per-dispatch context injected into every channel render.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Signed report URL, present when the token service is configured.
    pub signed_url: Option<String>,
    /// Human-readable breach lines, truncated to [`MAX_FAILURE_LINES`].
    pub failures: Vec<String>,
}

impl RenderContext {
    #[must_use]
    pub fn new(signed_url: Option<String>, mut failures: Vec<String>) -> Self {
        failures.truncate(MAX_FAILURE_LINES);
        Self {
            signed_url,
            failures,
        }
    }

    /// Base variable set shared by all channel templates.
    #[must_use]
    pub fn vars(&self, message: &AlertMessage) -> TemplateVars {
        let mut vars = TemplateVars::new();
        vars.set("title", message.title.clone());
        vars.set("severity", message.severity.as_str());
        vars.set(
            "timestamp",
            message
                .timestamp
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
        );
        vars.set("reportId", message.report_id.clone());
        vars.set("signedUrl", self.signed_url.clone().unwrap_or_default());
        vars.set("failures", self.failures.join("; "));
        vars
    }
}
