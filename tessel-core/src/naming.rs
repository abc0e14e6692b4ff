//! Property naming strategies.
//!
//! A strategy maps a logical property name to the name used on the wire. The
//! registry applies it once per slot when a schema is registered and builds
//! the reverse lookup from the same names, so decoding never has to invert a
//! strategy at run time.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Built-in naming strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStrategy {
    /// The logical name unchanged.
    #[default]
    Identity,
    /// `fooBar`
    LowerCamelCase,
    /// `FooBar`
    UpperCamelCase,
    /// `Foo Bar`
    UpperCamelCaseWithSpaces,
    /// `foo_bar`
    SnakeCase,
    /// `foo-bar`
    KebabCase,
    /// `foo.bar`
    LowerDotCase,
    /// `foobar`
    LowerCase,
}

impl NamingStrategy {
    /// Every built-in strategy, in declaration order.
    pub const ALL: [NamingStrategy; 8] = [
        NamingStrategy::Identity,
        NamingStrategy::LowerCamelCase,
        NamingStrategy::UpperCamelCase,
        NamingStrategy::UpperCamelCaseWithSpaces,
        NamingStrategy::SnakeCase,
        NamingStrategy::KebabCase,
        NamingStrategy::LowerDotCase,
        NamingStrategy::LowerCase,
    ];

    /// Parse a strategy from its configuration name (`SNAKE_CASE`, `kebab-case`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "identity" => Some(NamingStrategy::Identity),
            "lowercamelcase" | "camelcase" => Some(NamingStrategy::LowerCamelCase),
            "uppercamelcase" | "pascalcase" => Some(NamingStrategy::UpperCamelCase),
            "uppercamelcasewithspaces" => Some(NamingStrategy::UpperCamelCaseWithSpaces),
            "snakecase" => Some(NamingStrategy::SnakeCase),
            "kebabcase" => Some(NamingStrategy::KebabCase),
            "lowerdotcase" => Some(NamingStrategy::LowerDotCase),
            "lowercase" => Some(NamingStrategy::LowerCase),
            _ => None,
        }
    }

    /// Translate a logical name into its wire name.
    pub fn apply(&self, name: &str) -> String {
        let words = split_into_words(name);

        match self {
            NamingStrategy::Identity => name.to_string(),
            NamingStrategy::LowerCamelCase => {
                let mut result = String::new();
                for (i, word) in words.iter().enumerate() {
                    if i == 0 {
                        result.push_str(&word.to_lowercase());
                    } else {
                        push_capitalized(&mut result, word);
                    }
                }
                result
            }
            NamingStrategy::UpperCamelCase => {
                let mut result = String::new();
                for word in &words {
                    push_capitalized(&mut result, word);
                }
                result
            }
            NamingStrategy::UpperCamelCaseWithSpaces => {
                let mut result = String::new();
                for (i, word) in words.iter().enumerate() {
                    if i > 0 {
                        result.push(' ');
                    }
                    push_capitalized(&mut result, word);
                }
                result
            }
            NamingStrategy::SnakeCase => join_lower(&words, "_"),
            NamingStrategy::KebabCase => join_lower(&words, "-"),
            NamingStrategy::LowerDotCase => join_lower(&words, "."),
            NamingStrategy::LowerCase => join_lower(&words, ""),
        }
    }
}

fn push_capitalized(out: &mut String, word: &str) {
    let mut chars = word.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(&chars.as_str().to_lowercase());
    }
}

fn join_lower(words: &[String], sep: &str) -> String {
    words
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Split an identifier into words.
///
/// Separators (`_`, `-`, `.`, space) end a word, and so does a lowercase or
/// digit followed by an uppercase letter. Runs of capitals stay together
/// except for the last one when it starts a new word (`HTTPServer` splits into
/// `HTTP` and `Server`).
fn split_into_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = name.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        if matches!(ch, '_' | '-' | '.' | ' ') {
            if !current.is_empty() {
                words.push(core::mem::take(&mut current));
            }
            continue;
        }
        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(core::mem::take(&mut current));
            }
        }
        current.push(ch);
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_testhelpers::test;

    #[test]
    fn applies_each_strategy() {
        let cases = [
            (NamingStrategy::Identity, "preferredName"),
            (NamingStrategy::LowerCamelCase, "preferredName"),
            (NamingStrategy::UpperCamelCase, "PreferredName"),
            (NamingStrategy::UpperCamelCaseWithSpaces, "Preferred Name"),
            (NamingStrategy::SnakeCase, "preferred_name"),
            (NamingStrategy::KebabCase, "preferred-name"),
            (NamingStrategy::LowerDotCase, "preferred.name"),
            (NamingStrategy::LowerCase, "preferredname"),
        ];
        for (strategy, expected) in cases {
            assert_eq!(strategy.apply("preferredName"), expected, "{strategy:?}");
        }
    }

    #[test]
    fn snake_input_converts_to_camel() {
        assert_eq!(NamingStrategy::LowerCamelCase.apply("first_name"), "firstName");
        assert_eq!(NamingStrategy::UpperCamelCase.apply("first_name"), "FirstName");
    }

    #[test]
    fn acronyms_split_before_next_word() {
        assert_eq!(NamingStrategy::SnakeCase.apply("HTTPServer"), "http_server");
        assert_eq!(NamingStrategy::KebabCase.apply("userID"), "user-id");
        assert_eq!(NamingStrategy::SnakeCase.apply("line2Total"), "line2_total");
    }

    #[test]
    fn parse_accepts_config_spellings() {
        assert_eq!(
            NamingStrategy::parse("SNAKE_CASE"),
            Some(NamingStrategy::SnakeCase)
        );
        assert_eq!(
            NamingStrategy::parse("kebab-case"),
            Some(NamingStrategy::KebabCase)
        );
        assert_eq!(
            NamingStrategy::parse("LOWER_DOT_CASE"),
            Some(NamingStrategy::LowerDotCase)
        );
        assert_eq!(NamingStrategy::parse("shouting"), None);
    }
}
