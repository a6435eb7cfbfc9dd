//! Offline keyword-lexicon classifier.

use super::{Classification, ClassifierTask, TextClassifier};
use crate::error::BiasError;
use async_trait::async_trait;
use std::collections::HashSet;

const TOXIC_TERMS: &[&str] = &[
    "hate", "kill", "violence", "threat", "slur", "idiot", "stupid", "moron", "dumb",
    "worthless", "disgusting", "pathetic", "loser", "trash", "scum", "die",
];

const POSITIVE_TERMS: &[&str] = &[
    "good", "great", "excellent", "love", "happy", "wonderful", "amazing", "best", "nice",
    "helpful", "fantastic", "pleased", "enjoy",
];

const NEGATIVE_TERMS: &[&str] = &[
    "bad", "terrible", "awful", "hate", "sad", "worst", "poor", "horrible", "angry",
    "disappointed", "broken", "useless", "annoying",
];

/// Keyword lexicon classifier for the toxicity or sentiment family.
pub struct LexiconClassifier {
    task: ClassifierTask,
}

impl LexiconClassifier {
    pub fn new(task: ClassifierTask) -> Self {
        Self { task }
    }

    fn tokens(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    fn distinct_hits(tokens: &[String], lexicon: &[&str]) -> usize {
        tokens
            .iter()
            .filter(|t| lexicon.contains(&t.as_str()))
            .collect::<HashSet<_>>()
            .len()
    }

    fn toxicity(&self, tokens: &[String]) -> Classification {
        match Self::distinct_hits(tokens, TOXIC_TERMS) {
            0 => Classification::new("non-toxic", 0.95),
            hits => Classification::new("toxic", (0.6 + 0.1 * hits as f64).min(0.99)),
        }
    }

    fn sentiment(&self, tokens: &[String]) -> Classification {
        let pos = Self::distinct_hits(tokens, POSITIVE_TERMS);
        let neg = Self::distinct_hits(tokens, NEGATIVE_TERMS);
        let margin = pos.abs_diff(neg) as f64;
        let confidence = (0.5 + 0.15 * margin).min(0.99);
        if pos > neg {
            Classification::new("positive", confidence)
        } else if neg > pos {
            Classification::new("negative", confidence)
        } else {
            Classification::new("neutral", 0.6)
        }
    }
}

#[async_trait]
impl TextClassifier for LexiconClassifier {
    fn name(&self) -> &str {
        match self.task {
            ClassifierTask::Toxicity => "lexicon-toxicity",
            ClassifierTask::Sentiment => "lexicon-sentiment",
        }
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn classify(&self, text: &str) -> Result<Classification, BiasError> {
        let tokens = Self::tokens(text);
        Ok(match self.task {
            ClassifierTask::Toxicity => self.toxicity(&tokens),
            ClassifierTask::Sentiment => self.sentiment(&tokens),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_toxicity_lexicon() {
        let c = LexiconClassifier::new(ClassifierTask::Toxicity);
        let toxic = c.classify("You are an idiot and I hate this").await.unwrap();
        assert_eq!(toxic.label, "toxic");
        assert!(toxic.is_toxic(0.6));

        let clean = c.classify("The skill tree is well balanced").await.unwrap();
        assert_eq!(clean.label, "non-toxic");
    }

    #[tokio::test]
    async fn test_sentiment_lexicon() {
        let c = LexiconClassifier::new(ClassifierTask::Sentiment);
        assert_eq!(
            c.classify("What a great, wonderful day").await.unwrap().label,
            "positive"
        );
        assert_eq!(
            c.classify("Awful service, worst ever").await.unwrap().label,
            "negative"
        );
        assert_eq!(c.classify("The meeting is at noon").await.unwrap().label, "neutral");
    }
}
