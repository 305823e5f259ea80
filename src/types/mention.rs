//! Spans and mentions decoded from BIO layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use super::tags::{CorefMarker, EntityType, SrlRole};
use super::token::SentenceId;

/// A contiguous run of tokens within one sentence.
///
/// Half-open over token indices: `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Sentence containing the span.
    pub sentence: SentenceId,
    /// First token index.
    pub start: u32,
    /// One past the last token index.
    pub end: u32,
}

impl Span {
    /// Create a span.
    pub fn new(sentence: SentenceId, start: u32, end: u32) -> Self {
        Self { sentence, start, end }
    }

    /// Number of token positions covered.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span is empty.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether a token index falls inside the span.
    pub fn contains(&self, index: u32) -> bool {
        self.start <= index && index < self.end
    }

    /// Covered token indices.
    pub fn indices(&self) -> Range<u32> {
        self.start..self.end
    }

    /// Whether two spans share a token.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.sentence == other.sentence && self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}[{}..{})", self.sentence, self.start, self.end)
    }
}

/// Annotation layer a mention was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum Layer {
    /// Named-entity column.
    Entity,
    /// SRL column (one predicate frame).
    Srl {
        /// Column number among the SRL columns.
        column: usize,
    },
    /// Coreference column.
    Coreference {
        /// Column number among the coreference columns.
        column: usize,
    },
}

/// Decoded label of a mention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MentionLabel {
    /// Named-entity type.
    Entity(EntityType),
    /// Semantic role in an SRL frame.
    Argument(SrlRole),
    /// Coreference marker.
    Coreference(CorefMarker),
}

/// A span with its layer and decoded label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mention {
    /// Covered tokens.
    pub span: Span,
    /// Source layer.
    pub layer: Layer,
    /// Decoded label.
    pub label: MentionLabel,
}

impl Mention {
    /// Entity type, for entity mentions.
    pub fn entity(&self) -> Option<&EntityType> {
        match &self.label {
            MentionLabel::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// SRL role, for argument mentions.
    pub fn role(&self) -> Option<&SrlRole> {
        match &self.label {
            MentionLabel::Argument(role) => Some(role),
            _ => None,
        }
    }

    /// Coreference marker, for coreference mentions.
    pub fn marker(&self) -> Option<&CorefMarker> {
        match &self.label {
            MentionLabel::Coreference(marker) => Some(marker),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_bounds() {
        let s = SentenceId::new(1);
        let span = Span::new(s, 3, 6);
        assert_eq!(span.len(), 3);
        assert!(span.contains(3));
        assert!(!span.contains(6));
        assert!(span.overlaps(&Span::new(s, 5, 9)));
        assert!(!span.overlaps(&Span::new(s, 6, 9)));
        assert!(!span.overlaps(&Span::new(SentenceId::new(2), 3, 6)));
        assert_eq!(span.to_string(), "s1[3..6)");
    }
}
