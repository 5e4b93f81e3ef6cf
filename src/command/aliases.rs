// ABOUTME: Legacy command phrases rewritten to canonical slash commands.
// ABOUTME: Matches only at the start of a comment, on a word boundary.

use crate::config::AliasConfig;

/// Phrases carried over from the previous bot.
const BUILTIN_ALIASES: [(&str, &str); 4] = [
    ("digger plan", "/plan"),
    ("digger apply", "/apply"),
    ("atlantis plan", "/plan"),
    ("atlantis apply", "/apply"),
];

/// Immutable phrase → command table, longest phrase first.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: Vec<(String, String)>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl AliasTable {
    pub fn new(extra: &[AliasConfig]) -> Self {
        let mut entries: Vec<(String, String)> = BUILTIN_ALIASES
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .chain(
                extra
                    .iter()
                    .map(|a| (normalize(&a.phrase), normalize(&a.command))),
            )
            .filter(|(p, _)| !p.is_empty())
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { entries }
    }

    /// Rewrite a leading alias phrase. `text` must already be normalized.
    pub fn apply(&self, text: &str) -> String {
        for (phrase, command) in &self.entries {
            if let Some(rest) = text.strip_prefix(phrase.as_str())
                && (rest.is_empty() || rest.starts_with(char::is_whitespace))
            {
                return format!("{command}{rest}");
            }
        }
        text.to_string()
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
