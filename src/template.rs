// src/template.rs
// Named-placeholder rendering for server configuration templates

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::HarnessError;

/// Placeholder for the port the server listens on.
pub const DEFAULT_PORT: &str = "default-port";
/// Placeholder for the sentinel route block injected into every case config.
pub const TEST_INFO: &str = "test-info";
/// Placeholder for the served-content root used by file-serving cases.
pub const TEST_DIR: &str = "test-dir";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"%%([A-Za-z0-9_-]+)%%").expect("placeholder pattern"))
}

/// Immutable configuration text containing `%%name%%` placeholders.
///
/// The grammar of the text itself is opaque to the harness; only the
/// placeholders are interpreted.
#[derive(Debug, Clone)]
pub struct ConfigTemplate {
    text: String,
}

impl ConfigTemplate {
    pub fn new(text: &str) -> Self {
        ConfigTemplate {
            text: text.to_string(),
        }
    }

    /// Names of every placeholder referenced by this template.
    pub fn placeholders(&self) -> Vec<String> {
        placeholder_pattern()
            .captures_iter(&self.text)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Substitute every placeholder with its binding.
    ///
    /// A placeholder without a binding is an error, never a silent
    /// pass-through; unused bindings are fine.
    pub fn render(&self, bindings: &Bindings) -> Result<String, HarnessError> {
        for name in self.placeholders() {
            if !bindings.contains(&name) {
                return Err(HarnessError::UnresolvedPlaceholder(name));
            }
        }

        let rendered = placeholder_pattern().replace_all(&self.text, |caps: &regex::Captures| {
            // Presence was checked above; an empty fallback is unreachable.
            bindings.get(&caps[1]).unwrap_or_default().to_string()
        });

        Ok(rendered.into_owned())
    }
}

/// Placeholder name to replacement text.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings {
            values: HashMap::new(),
        }
    }

    pub fn bind(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}
