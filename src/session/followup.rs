//! Vague follow-up rewriting
//!
//! A question like "name another" only makes sense next to the question before
//! it. When a trigger phrase appears anywhere in the new question
//! (case-insensitive) and a previous question exists, the two are joined as
//! `"<previous>. <current>"`. This is plain substring matching: "more" also
//! fires on "tell me more about the price", and paraphrases that avoid every
//! phrase are not caught.

use std::borrow::Cow;

/// Trigger phrases, checked in order
pub const DEFAULT_PHRASES: &[&str] = &[
    "another",
    "name another",
    "more",
    "next",
    "again",
    "show me another",
    "give me more",
    "say that again",
    "repeat it",
];

#[derive(Debug, Clone)]
pub struct FollowUpPolicy {
    phrases: Vec<String>,
}

impl Default for FollowUpPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PHRASES.iter().copied())
    }
}

impl FollowUpPolicy {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// First trigger phrase contained in `question`
    pub fn matched_phrase(&self, question: &str) -> Option<&str> {
        let lowered = question.to_lowercase();
        self.phrases
            .iter()
            .find(|phrase| lowered.contains(phrase.as_str()))
            .map(String::as_str)
    }

    pub fn is_vague(&self, question: &str) -> bool {
        self.matched_phrase(question).is_some()
    }

    /// Question to send downstream given the session's previous question
    pub fn rewrite<'a>(&self, previous: Option<&str>, question: &'a str) -> Cow<'a, str> {
        match previous.map(str::trim).filter(|p| !p.is_empty()) {
            Some(previous) if self.is_vague(question) => {
                Cow::Owned(format!("{}. {}", previous, question))
            }
            _ => Cow::Borrowed(question),
        }
    }
}
