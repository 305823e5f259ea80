//! Span aggregation: decoding BIO layers into mentions.
//!
//! Each layer (the NER column, every SRL column, every coreference column)
//! is scanned independently, so spans of different layers may overlap
//! freely. Within one layer:
//!
//! - `B-x` opens a span labelled `x`
//! - `I-x` extends the open span when it is also labelled `x`
//! - anything else closes the open span before acting
//!
//! An `I-x` with no compatible open span is an orphan: it is reported and
//! then opens a span as if it were `B-x`, so the annotation is kept and the
//! sentence is marked degraded.

use thiserror::Error;
use tracing::trace;

use crate::types::{
    BioPrefix, BioTag, CorefMarker, Diagnostic, DiagnosticKind, EntityType, Layer, Mention,
    MentionLabel, Sentence, SentenceId, Span, SrlRole, Token,
};

/// Recoverable errors raised while decoding a layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    /// Inside tag without a compatible open span.
    #[error("orphan tag {tag:?} at token {token} of sentence {sentence} ({layer:?})")]
    OrphanSpanTag {
        /// Sentence of the tag.
        sentence: SentenceId,
        /// Token carrying the tag.
        token: u32,
        /// Layer of the tag.
        layer: Layer,
        /// Raw tag.
        tag: String,
    },
}

impl SpanError {
    /// Layer the tag was read from.
    pub fn layer(&self) -> &Layer {
        match self {
            Self::OrphanSpanTag { layer, .. } => layer,
        }
    }
}

impl From<&SpanError> for Diagnostic {
    fn from(err: &SpanError) -> Self {
        match err {
            SpanError::OrphanSpanTag {
                sentence,
                token,
                layer,
                tag,
            } => Diagnostic::new(
                DiagnosticKind::OrphanSpanTag {
                    sentence: *sentence,
                    token: *token,
                    layer: *layer,
                    tag: tag.clone(),
                },
                err.to_string(),
            ),
        }
    }
}

/// One SRL column: a predicate and its argument spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrlFrame {
    /// Column number among the SRL columns.
    pub column: usize,
    /// Predicate token, from the `V` span.
    pub predicate: Option<u32>,
    /// Argument mentions (the `V` span excluded).
    pub arguments: Vec<Mention>,
}

/// All mentions of one sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentenceMentions {
    /// Named-entity mentions.
    pub entities: Vec<Mention>,
    /// SRL frames in column order.
    pub frames: Vec<SrlFrame>,
    /// Coreference mentions, by column then position.
    pub coreference: Vec<Mention>,
    /// Orphan tags found while decoding.
    pub errors: Vec<SpanError>,
}

impl SentenceMentions {
    /// Whether any layer needed a local correction.
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Entity type of the entity span covering a token.
    pub fn entity_at(&self, token: u32) -> Option<&EntityType> {
        self.entities
            .iter()
            .find(|m| m.span.contains(token))
            .and_then(Mention::entity)
    }
}

/// Decode every BIO layer of a sentence.
pub fn aggregate(sentence: &Sentence) -> SentenceMentions {
    let mut out = SentenceMentions::default();

    out.entities = decode_layer(
        sentence,
        Layer::Entity,
        |t| t.ner.as_deref(),
        |label| Some(MentionLabel::Entity(EntityType::from_label(label))),
        &mut out.errors,
    );

    let srl_columns = sentence.tokens.iter().map(|t| t.srl.len()).max().unwrap_or(0);
    for column in 0..srl_columns {
        let mentions = decode_layer(
            sentence,
            Layer::Srl { column },
            |t| t.srl.get(column).and_then(|v| v.as_deref()),
            |label| SrlRole::parse(label).map(MentionLabel::Argument),
            &mut out.errors,
        );
        let (verbs, arguments): (Vec<Mention>, Vec<Mention>) = mentions
            .into_iter()
            .partition(|m| m.role().is_some_and(SrlRole::is_predicate));
        let predicate = verbs.first().and_then(|v| span_root(sentence, &v.span));
        out.frames.push(SrlFrame {
            column,
            predicate,
            arguments,
        });
    }

    let coref_columns = sentence.tokens.iter().map(|t| t.coref.len()).max().unwrap_or(0);
    for column in 0..coref_columns {
        let mentions = decode_layer(
            sentence,
            Layer::Coreference { column },
            |t| t.coref.get(column).and_then(|v| v.as_deref()),
            |label| CorefMarker::parse(label).map(MentionLabel::Coreference),
            &mut out.errors,
        );
        out.coreference.extend(mentions);
    }

    out
}

/// Root of a span: the first token whose head lies outside the span or
/// which is its own head.
pub fn span_root(sentence: &Sentence, span: &Span) -> Option<u32> {
    sentence
        .tokens
        .iter()
        .filter(|t| span.contains(t.index))
        .find(|t| t.is_root() || !span.contains(t.head))
        .map(|t| t.index)
}

struct OpenSpan {
    start: u32,
    last: u32,
    label: String,
}

fn decode_layer<'s>(
    sentence: &'s Sentence,
    layer: Layer,
    value: impl Fn(&'s Token) -> Option<&'s str>,
    decode: impl Fn(&str) -> Option<MentionLabel>,
    errors: &mut Vec<SpanError>,
) -> Vec<Mention> {
    let mut mentions = Vec::new();
    let mut open: Option<OpenSpan> = None;

    let close = |open: &mut Option<OpenSpan>, mentions: &mut Vec<Mention>| {
        if let Some(span) = open.take() {
            match decode(&span.label) {
                Some(label) => mentions.push(Mention {
                    span: Span::new(sentence.id, span.start, span.last + 1),
                    layer,
                    label,
                }),
                None => trace!(label = %span.label, ?layer, "Dropping span with unknown label"),
            }
        }
    };

    for token in &sentence.tokens {
        let tag = value(token).and_then(BioTag::parse);
        match tag {
            Some(tag)
                if tag.prefix == BioPrefix::Inside
                    && open.as_ref().is_some_and(|o| o.label == tag.label) =>
            {
                if let Some(o) = open.as_mut() {
                    o.last = token.index;
                }
            }
            Some(tag) => {
                close(&mut open, &mut mentions);
                if tag.prefix == BioPrefix::Inside {
                    errors.push(SpanError::OrphanSpanTag {
                        sentence: sentence.id,
                        token: token.index,
                        layer,
                        tag: format!("I-{}", tag.label),
                    });
                }
                open = Some(OpenSpan {
                    start: token.index,
                    last: token.index,
                    label: tag.label,
                });
            }
            None => close(&mut open, &mut mentions),
        }
    }
    close(&mut open, &mut mentions);
    mentions
}
