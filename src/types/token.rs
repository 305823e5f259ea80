//! Token and sentence types for annotation tables.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::tags::normalize_dependency;

/// Identifier of a sentence within a document.
///
/// Ordered numerically so that sentence maps iterate in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SentenceId(u32);

impl SentenceId {
    /// Create a new SentenceId.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the numeric value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SentenceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Coarse part-of-speech class derived from the UPOS column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PosClass {
    /// Common noun.
    Noun,
    /// Proper noun.
    ProperNoun,
    /// Pronoun.
    Pronoun,
    /// Main verb.
    Verb,
    /// Auxiliary verb.
    Auxiliary,
    /// Adjective.
    Adjective,
    /// Adverb.
    Adverb,
    /// Preposition or postposition.
    Adposition,
    /// Determiner.
    Determiner,
    /// Cardinal number.
    Numeral,
    /// Particle.
    Particle,
    /// Coordinating conjunction.
    CoordinatingConjunction,
    /// Subordinating conjunction.
    SubordinatingConjunction,
    /// Interjection.
    Interjection,
    /// Punctuation.
    Punctuation,
    /// Symbol.
    Symbol,
    /// Anything else (`X`, unknown tags).
    Other,
}

impl PosClass {
    /// Classify a UPOS tag. Unknown tags map to `Other`.
    pub fn from_upos(upos: &str) -> Self {
        match upos.to_ascii_uppercase().as_str() {
            "NOUN" => Self::Noun,
            "PROPN" => Self::ProperNoun,
            "PRON" => Self::Pronoun,
            "VERB" => Self::Verb,
            "AUX" => Self::Auxiliary,
            "ADJ" => Self::Adjective,
            "ADV" => Self::Adverb,
            "ADP" => Self::Adposition,
            "DET" => Self::Determiner,
            "NUM" => Self::Numeral,
            "PART" => Self::Particle,
            "CCONJ" | "CONJ" => Self::CoordinatingConjunction,
            "SCONJ" => Self::SubordinatingConjunction,
            "INTJ" => Self::Interjection,
            "PUNCT" => Self::Punctuation,
            "SYM" => Self::Symbol,
            _ => Self::Other,
        }
    }

    /// Whether this class heads verbal material.
    pub fn is_verbal(&self) -> bool {
        matches!(self, Self::Verb | Self::Auxiliary)
    }

    /// Whether this class heads nominal material.
    pub fn is_nominal(&self) -> bool {
        matches!(self, Self::Noun | Self::ProperNoun | Self::Pronoun | Self::Numeral)
    }
}

/// One row of the annotation table.
///
/// Optional layers are `None` when the column is absent or holds a
/// placeholder; they are never empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Sentence the token belongs to.
    pub sentence: SentenceId,
    /// 0-based index within the sentence.
    pub index: u32,
    /// Surface form.
    pub word: String,
    /// Whether whitespace follows the token.
    pub space_after: bool,
    /// Lemma.
    pub lemma: Option<String>,
    /// Universal POS tag.
    pub upos: String,
    /// Language-specific POS tag.
    pub xpos: String,
    /// Dependency label as written in the table.
    pub dep: String,
    /// Index of the head token; equal to `index` for the root.
    pub head: u32,
    /// Named-entity BIO tag.
    pub ner: Option<String>,
    /// Predicate sense id (e.g. `know.01`).
    pub predicate_sense: Option<String>,
    /// SRL BIO tags, one per SRL column.
    pub srl: Vec<Option<String>>,
    /// Coreference BIO tags, one per coreference column.
    pub coref: Vec<Option<String>>,
    /// Word sense id (e.g. `plan.n.01`).
    pub word_sense: Option<String>,
}

impl Token {
    /// Create a token carrying only the mandatory layers.
    pub fn new(
        sentence: SentenceId,
        index: u32,
        word: impl Into<String>,
        upos: impl Into<String>,
        xpos: impl Into<String>,
        dep: impl Into<String>,
        head: u32,
    ) -> Self {
        Self {
            sentence,
            index,
            word: word.into(),
            space_after: true,
            lemma: None,
            upos: upos.into(),
            xpos: xpos.into(),
            dep: dep.into(),
            head,
            ner: None,
            predicate_sense: None,
            srl: Vec::new(),
            coref: Vec::new(),
            word_sense: None,
        }
    }

    /// Set the whitespace flag.
    pub fn with_space_after(mut self, space_after: bool) -> Self {
        self.space_after = space_after;
        self
    }

    /// Set the lemma.
    pub fn with_lemma(mut self, lemma: impl Into<String>) -> Self {
        self.lemma = Some(lemma.into());
        self
    }

    /// Set the NER tag.
    pub fn with_ner(mut self, tag: impl Into<String>) -> Self {
        self.ner = Some(tag.into());
        self
    }

    /// Set the predicate sense.
    pub fn with_predicate_sense(mut self, sense: impl Into<String>) -> Self {
        self.predicate_sense = Some(sense.into());
        self
    }

    /// Set the SRL columns.
    pub fn with_srl(mut self, tags: Vec<Option<String>>) -> Self {
        self.srl = tags;
        self
    }

    /// Set the coreference columns.
    pub fn with_coref(mut self, tags: Vec<Option<String>>) -> Self {
        self.coref = tags;
        self
    }

    /// Set the word sense.
    pub fn with_word_sense(mut self, sense: impl Into<String>) -> Self {
        self.word_sense = Some(sense.into());
        self
    }

    /// Whether this token is its own head.
    pub fn is_root(&self) -> bool {
        self.head == self.index
    }

    /// Coarse POS class.
    pub fn pos(&self) -> PosClass {
        PosClass::from_upos(&self.upos)
    }

    /// Dependency label normalized to the composer's label set.
    pub fn relation(&self) -> String {
        normalize_dependency(&self.dep)
    }

    /// Whether this token is punctuation.
    pub fn is_punct(&self) -> bool {
        self.pos() == PosClass::Punctuation || self.relation() == "punct"
    }
}

/// A sentence of the annotation table, tokens sorted by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// Sentence identifier.
    pub id: SentenceId,
    /// Tokens in index order.
    pub tokens: Vec<Token>,
}

impl Sentence {
    /// Create a sentence, sorting tokens by index.
    pub fn new(id: SentenceId, mut tokens: Vec<Token>) -> Self {
        tokens.sort_by_key(|t| t.index);
        Self { id, tokens }
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the sentence has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Position of the token with the given index.
    pub fn position(&self, index: u32) -> Option<usize> {
        self.tokens.binary_search_by_key(&index, |t| t.index).ok()
    }

    /// Token with the given index.
    pub fn token(&self, index: u32) -> Option<&Token> {
        self.position(index).map(|pos| &self.tokens[pos])
    }

    /// Surface text rebuilt from words and whitespace flags.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for token in &self.tokens {
            text.push_str(&token.word);
            if token.space_after {
                text.push(' ');
            }
        }
        text.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_text_respects_space_flags() {
        let s = SentenceId::new(0);
        let sentence = Sentence::new(
            s,
            vec![
                Token::new(s, 1, "IBM", "PROPN", "NNP", "poss", 2).with_space_after(false),
                Token::new(s, 2, "'s", "PART", "POS", "case", 1),
                Token::new(s, 0, "Ask", "VERB", "VB", "ROOT", 0),
            ],
        );
        assert_eq!(sentence.tokens[0].word, "Ask");
        assert_eq!(sentence.text(), "Ask IBM's");
    }

    #[test]
    fn test_position_lookup_with_gap() {
        let s = SentenceId::new(3);
        let sentence = Sentence::new(
            s,
            vec![
                Token::new(s, 0, "a", "DET", "DT", "det", 2),
                Token::new(s, 2, "dog", "NOUN", "NN", "ROOT", 2),
            ],
        );
        assert_eq!(sentence.position(2), Some(1));
        assert_eq!(sentence.position(1), None);
        assert!(sentence.token(2).is_some_and(|t| t.is_root()));
    }

    #[test]
    fn test_pos_class() {
        assert_eq!(PosClass::from_upos("propn"), PosClass::ProperNoun);
        assert_eq!(PosClass::from_upos("XYZ"), PosClass::Other);
        assert!(PosClass::Auxiliary.is_verbal());
        assert!(PosClass::Pronoun.is_nominal());
    }
}
