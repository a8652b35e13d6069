//! Rule-based command resolution
//!
//! The fallback behind the context-aware resolver: a small set of compiled
//! patterns mapped to canned response pools. Deliberately shallow; anything
//! smarter belongs behind the `ContextResolver` collaborator.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::phrasing::PhraseBook;

struct CommandRule {
    name: &'static str,
    pattern: Regex,
    responses: &'static [&'static str],
}

static RULES: Lazy<Vec<CommandRule>> = Lazy::new(|| {
    vec![
        CommandRule {
            name: "greeting",
            pattern: Regex::new(r"(?i)\b(hello|hi there|hey|good (morning|afternoon|evening))\b")
                .expect("greeting pattern"),
            responses: &[
                "Hello! I'm listening whenever you're ready.",
                "Hi! Go ahead when you're ready.",
            ],
        },
        CommandRule {
            name: "help",
            pattern: Regex::new(r"(?i)\b(help|what can you do|how does this work)\b")
                .expect("help pattern"),
            responses: &[
                "You can ask me questions and I'll answer from what I know. \
                 I also keep track of whose turn it is to speak.",
                "Ask me anything; I'll coordinate the conversation and answer \
                 what I can.",
            ],
        },
        CommandRule {
            name: "repeat_last",
            pattern: Regex::new(r"(?i)\b(say that again|repeat that|come again|pardon)\b")
                .expect("repeat pattern"),
            responses: &["I haven't said anything yet in this session."],
        },
        CommandRule {
            name: "thanks",
            pattern: Regex::new(r"(?i)\b(thank you|thanks|appreciated)\b").expect("thanks pattern"),
            responses: &["You're welcome!", "Happy to help."],
        },
        CommandRule {
            name: "farewell",
            pattern: Regex::new(r"(?i)\b(goodbye|good bye|bye|that's all)\b")
                .expect("farewell pattern"),
            responses: &[
                "Goodbye! Ending the conversation whenever you're ready.",
                "Thanks everyone, talk soon.",
            ],
        },
    ]
});

static DEFAULT_RESPONSES: &[&str] = &[
    "I don't have a good answer for that yet, could you rephrase?",
    "I'm not sure about that one. Try asking another way?",
    "That's outside what I can answer right now.",
];

/// Result of rule-based resolution
#[derive(Debug, Clone)]
pub struct RuleMatch {
    /// Name of the rule that fired, if any
    pub rule: Option<&'static str>,
    /// Response text
    pub text: String,
}

/// Matches transcripts against compiled command rules
#[derive(Debug, Default)]
pub struct RuleBasedResolver;

impl RuleBasedResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a response for the query
    ///
    /// `last_response` feeds the repeat rule; phrasing picks among each
    /// rule's response pool.
    pub fn resolve(
        &self,
        query: &str,
        last_response: Option<&str>,
        phrasing: &PhraseBook,
    ) -> RuleMatch {
        for rule in RULES.iter() {
            if rule.pattern.is_match(query) {
                let text = if rule.name == "repeat_last" {
                    match last_response {
                        Some(last) => format!("I said: {}", last),
                        None => phrasing.pick(rule.responses).to_string(),
                    }
                } else {
                    phrasing.pick(rule.responses).to_string()
                };

                tracing::debug!(rule = rule.name, "rule-based resolver matched");
                return RuleMatch {
                    rule: Some(rule.name),
                    text,
                };
            }
        }

        RuleMatch {
            rule: None,
            text: phrasing.pick(DEFAULT_RESPONSES).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrasing() -> PhraseBook {
        PhraseBook::seeded(11)
    }

    #[test]
    fn test_greeting_rule() {
        let resolver = RuleBasedResolver::new();
        let result = resolver.resolve("hello everyone", None, &phrasing());
        assert_eq!(result.rule, Some("greeting"));
        assert!(!result.text.is_empty());
    }

    #[test]
    fn test_repeat_uses_last_response() {
        let resolver = RuleBasedResolver::new();

        let with_last = resolver.resolve(
            "could you say that again",
            Some("the branch opens at nine"),
            &phrasing(),
        );
        assert_eq!(with_last.rule, Some("repeat_last"));
        assert!(with_last.text.contains("the branch opens at nine"));

        let without = resolver.resolve("say that again", None, &phrasing());
        assert!(without.text.contains("haven't said anything"));
    }

    #[test]
    fn test_unmatched_falls_to_default() {
        let resolver = RuleBasedResolver::new();
        let result = resolver.resolve("zorble the frobnicator", None, &phrasing());
        assert!(result.rule.is_none());
        assert!(!result.text.is_empty());
    }

    #[test]
    fn test_deterministic_under_seed() {
        let resolver = RuleBasedResolver::new();
        let a = resolver.resolve("hello", None, &PhraseBook::seeded(5));
        let b = resolver.resolve("hello", None, &PhraseBook::seeded(5));
        assert_eq!(a.text, b.text);
    }
}
