//! Canned conversational responses.
//!
//! Greetings, identity questions, date/time, and thanks are answered
//! directly without reaching any capability handler. Predicates stay
//! narrow on purpose: a long message that merely opens with "hi" still
//! belongs to a real handler.

use chrono::{Local, Utc};
use regex_lite::Regex;

pub struct SmallTalk {
    greeting: Regex,
    identity: Regex,
    time: Regex,
    date: Regex,
    thanks: Regex,
}

impl SmallTalk {
    pub fn new() -> Self {
        Self {
            greeting: Regex::new(r"(?i)\b(hi|hello|hey|good morning|good afternoon|good evening)\b")
                .unwrap(),
            identity: Regex::new(r"(?i)\b(who are you|what are you|your name)\b").unwrap(),
            time: Regex::new(r"(?i)\b(what time|time is it)\b").unwrap(),
            date: Regex::new(r"(?i)\b(what('s| is) the date|today'?s date|what day is)\b").unwrap(),
            thanks: Regex::new(r"(?i)\b(thanks|thank you|thx)\b").unwrap(),
        }
    }

    /// A canned reply, or `None` when the message needs a real handler.
    pub fn respond(&self, message: &str) -> Option<String> {
        let trimmed = message.trim();
        let words = trimmed.split_whitespace().count();

        if words <= 3 && self.greeting.is_match(trimmed) {
            return Some(
                "Hello! I can look up clients, log trades, send emails, schedule meetings, \
                 check quotes, and search the knowledge base. What do you need?"
                    .into(),
            );
        }

        if self.identity.is_match(trimmed) {
            return Some(
                "I'm Blotter, your trade-ledger assistant. Ask me about clients, trades, \
                 emails, meetings, quotes, or firm policy."
                    .into(),
            );
        }

        if self.time.is_match(trimmed) {
            return Some(format!(
                "It's currently {} (UTC {}).",
                Local::now().format("%H:%M"),
                Utc::now().format("%H:%M")
            ));
        }

        if self.date.is_match(trimmed) {
            return Some(format!("Today is {}.", Local::now().format("%A, %B %-d, %Y")));
        }

        if words <= 5 && self.thanks.is_match(trimmed) {
            return Some("You're welcome! Anything else?".into());
        }

        None
    }
}

impl Default for SmallTalk {
    fn default() -> Self {
        Self::new()
    }
}
