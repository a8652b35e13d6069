//! Conversation-pattern analysis
//!
//! Placeholder linguistics: keyword and punctuation checks stand in for a
//! real NLP layer, the same way the acoustic features stand in for real
//! biometrics.

use once_cell::sync::Lazy;

/// Leading words that mark an utterance as a question without "?"
static INTERROGATIVES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "what", "why", "how", "when", "where", "who", "which", "whose", "can", "could", "would",
        "will", "should", "shall", "do", "does", "did", "is", "are", "am", "was", "were",
    ]
});

/// Phrases that signal the conversation is wrapping up
static FAREWELLS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "goodbye",
        "good bye",
        "bye bye",
        "that's all",
        "that is all",
        "see you later",
        "talk to you later",
        "we're done",
        "thanks, that's everything",
    ]
});

/// Whether the input reads as a question
pub fn is_question(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.contains('?') {
        return true;
    }
    let first = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_ascii_lowercase();
    INTERROGATIVES.contains(&first.as_str())
}

/// Whether the input signals the end of the conversation
pub fn is_farewell(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    FAREWELLS.iter().any(|phrase| lowered.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_mark() {
        assert!(is_question("what is the refund policy?"));
        assert!(is_question("refund policy?"));
    }

    #[test]
    fn test_leading_interrogative() {
        assert!(is_question("when does the branch open"));
        assert!(is_question("Could someone check the balance"));
        assert!(!is_question("the branch opens at nine"));
    }

    #[test]
    fn test_empty_is_not_question() {
        assert!(!is_question(""));
        assert!(!is_question("   "));
    }

    #[test]
    fn test_farewell_phrases() {
        assert!(is_farewell("okay goodbye everyone"));
        assert!(is_farewell("That's all for today"));
        assert!(!is_farewell("tell me about the policy"));
    }
}
