//! Coreference resolution across sentences.
//!
//! Mentions are grouped by chain id over the whole document. Each mention
//! is aligned with the composed element that covers exactly its composed
//! tokens (tokens the composer dropped, such as punctuation, are ignored).
//! A mention with no such element is reported and left out of its chain.
//!
//! ## Canonical Mention
//!
//! The canonical mention of a chain is the one whose head atom is richest:
//!
//! | Head atom | Richness |
//! |-----------|----------|
//! | Any atom with an entity type | 4 |
//! | Proper noun concept (`Cp`) | 3 |
//! | Other concept | 2 |
//! | Pronoun concept (`Ci`, `Cw`) | 1 |
//! | Anything else | 0 |
//!
//! Ties go to the first mention in document order. All other mentions
//! become aliases. Sentence hyperedges are never rewritten.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

use crate::spans::{span_root, SentenceMentions};
use crate::types::{
    Atom, AtomType, ChainId, CorefMarker, Diagnostic, DiagnosticKind, Hyperedge, MarkerKind,
    Sentence, SentenceId, Span,
};

/// Coreference errors. All are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorefError {
    /// A mention aligns with no composed element.
    #[error("mention {span} of chain {chain} is unresolved: {reason}")]
    UnresolvedChain {
        /// Chain of the mention.
        chain: ChainId,
        /// Mention span.
        span: Span,
        /// Why alignment failed.
        reason: String,
    },
}

impl From<&CorefError> for Diagnostic {
    fn from(err: &CorefError) -> Self {
        let kind = match err {
            CorefError::UnresolvedChain { chain, span, reason } => DiagnosticKind::UnresolvedChain {
                chain: *chain,
                span: *span,
                reason: reason.clone(),
            },
        };
        Diagnostic::new(kind, err.to_string())
    }
}

/// A coreference mention waiting for alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorefMention {
    /// Chain and marker kind.
    pub marker: CorefMarker,
    /// Mention span.
    pub span: Span,
    /// Syntactic root of the span, used to pick the head atom.
    pub root_token: Option<u32>,
}

/// Collect the coreference mentions of one sentence.
pub fn collect_mentions(sentence: &Sentence, mentions: &SentenceMentions) -> Vec<CorefMention> {
    mentions
        .coreference
        .iter()
        .filter_map(|m| {
            m.marker().map(|marker| CorefMention {
                marker: *marker,
                span: m.span,
                root_token: span_root(sentence, &m.span),
            })
        })
        .collect()
}

/// Where an aligned mention lives in the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MentionLocation {
    /// Sentence of the mention.
    pub sentence: SentenceId,
    /// Child path of the aligned element; empty for the sentence root.
    pub path: Vec<u32>,
    /// Mention span.
    pub span: Span,
    /// How the annotator marked the mention.
    pub kind: MarkerKind,
}

/// A resolved chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedChain {
    /// Canonical mention.
    pub canonical: MentionLocation,
    /// Other mentions, in document order.
    pub aliases: Vec<MentionLocation>,
}

/// Result of resolving a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorefResolution {
    /// Chains with at least one aligned mention.
    pub chains: BTreeMap<ChainId, ResolvedChain>,
    /// Mentions that could not be aligned.
    pub errors: Vec<CorefError>,
}

/// Resolve coreference chains against composed sentence roots.
///
/// `mentions` arrive in document order, which ranks their sentences
/// independently of sentence ids. Sentences missing from `roots` were
/// skipped; their mentions are unresolved.
pub fn resolve(mentions: &[CorefMention], roots: &BTreeMap<SentenceId, &Hyperedge>) -> CorefResolution {
    let mut resolution = CorefResolution::default();
    let mut rank: BTreeMap<SentenceId, usize> = BTreeMap::new();
    for mention in mentions {
        let next = rank.len();
        rank.entry(mention.span.sentence).or_insert(next);
    }
    let mut aligned: BTreeMap<ChainId, Vec<(MentionLocation, u8)>> = BTreeMap::new();

    for mention in mentions {
        let chain = mention.marker.chain;
        match align(mention, roots) {
            Ok((location, richness)) => aligned.entry(chain).or_default().push((location, richness)),
            Err(reason) => resolution.errors.push(CorefError::UnresolvedChain {
                chain,
                span: mention.span,
                reason: reason.to_string(),
            }),
        }
    }

    for (chain, mut locations) in aligned {
        locations.sort_by_key(|(l, _)| (rank.get(&l.sentence).copied(), l.span.start, l.span.end));
        let mut seen = BTreeSet::new();
        locations.retain(|(l, _)| seen.insert((l.sentence, l.path.clone())));

        let mut best = 0;
        for (i, (_, richness)) in locations.iter().enumerate() {
            if *richness > locations[best].1 {
                best = i;
            }
        }
        let (canonical, _) = locations.remove(best);
        let aliases: Vec<MentionLocation> = locations.into_iter().map(|(l, _)| l).collect();
        debug!(chain = %chain, canonical = %canonical.span, aliases = aliases.len(), "chain resolved");
        resolution.chains.insert(chain, ResolvedChain { canonical, aliases });
    }

    resolution
}

fn align(
    mention: &CorefMention,
    roots: &BTreeMap<SentenceId, &Hyperedge>,
) -> Result<(MentionLocation, u8), &'static str> {
    let span = mention.span;
    let root = roots.get(&span.sentence).ok_or("sentence has no hyperedge")?;
    let target: BTreeSet<u32> = root
        .tokens()
        .into_iter()
        .filter(|t| span.contains(*t))
        .collect();
    if target.is_empty() {
        return Err("mention covers no composed token");
    }
    let path = root
        .find_by_tokens(&target)
        .ok_or("no element covers exactly the mention")?;

    let head = match root.get(&path) {
        Some(element) => mention
            .root_token
            .and_then(|t| element.atom_for_token(t))
            .or_else(|| element.atoms().into_iter().find(|a| a.token().is_some())),
        None => mention
            .root_token
            .and_then(|t| root.atoms().into_iter().find(|a| a.token() == Some(t))),
    };

    let location = MentionLocation {
        sentence: span.sentence,
        path,
        span,
        kind: mention.marker.kind,
    };
    Ok((location, richness(head)))
}

/// Richness of a mention's head atom.
pub fn richness(atom: Option<&Atom>) -> u8 {
    match atom {
        Some(a) if a.entity().is_some() => 4,
        Some(a) if a.atom_type() == AtomType::Concept => match a.subtype() {
            "p" => 3,
            "i" | "w" => 1,
            _ => 2,
        },
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;
    use crate::policy::CompilePolicy;
    use crate::spans::aggregate;
    use crate::tree::DependencyTree;
    use crate::types::Token;

    fn tok(s: u32, i: u32, word: &str, upos: &str, xpos: &str, dep: &str, head: u32) -> Token {
        Token::new(SentenceId::new(s), i, word, upos, xpos, dep, head)
    }

    fn coref(tag: &str) -> Vec<Option<String>> {
        vec![Some(tag.to_string())]
    }

    fn compile(sentences: &[Sentence]) -> (Vec<Hyperedge>, Vec<CorefMention>) {
        let policy = CompilePolicy::default();
        let mut roots = Vec::new();
        let mut mentions = Vec::new();
        for sentence in sentences {
            let tree = DependencyTree::build(sentence).unwrap();
            let layers = aggregate(sentence);
            roots.push(compose(sentence, &tree, &layers, &policy));
            mentions.extend(collect_mentions(sentence, &layers));
        }
        (roots, mentions)
    }

    fn root_map(roots: &[Hyperedge]) -> BTreeMap<SentenceId, &Hyperedge> {
        roots
            .iter()
            .enumerate()
            .map(|(i, r)| (SentenceId::new(i as u32), r))
            .collect()
    }

    fn two_sentences() -> Vec<Sentence> {
        vec![
            Sentence::new(
                SentenceId::new(0),
                vec![
                    tok(0, 0, "He", "PRON", "PRP", "nsubj", 1).with_coref(coref("B-REF1")),
                    tok(0, 1, "left", "VERB", "VBD", "root", 1),
                ],
            ),
            Sentence::new(
                SentenceId::new(1),
                vec![
                    tok(1, 0, "Patrick", "PROPN", "NNP", "nsubj", 1)
                        .with_ner("B-PERSON")
                        .with_coref(coref("B-MAIN1")),
                    tok(1, 1, "slept", "VERB", "VBD", "root", 1),
                ],
            ),
        ]
    }

    #[test]
    fn test_richest_mention_is_canonical() {
        let (roots, mentions) = compile(&two_sentences());
        let resolution = resolve(&mentions, &root_map(&roots));
        assert!(resolution.errors.is_empty());

        let chain = &resolution.chains[&ChainId::new(1)];
        assert_eq!(chain.canonical.sentence, SentenceId::new(1));
        assert_eq!(chain.canonical.path, vec![1]);
        assert_eq!(chain.canonical.kind, MarkerKind::Main);
        assert_eq!(chain.aliases.len(), 1);
        assert_eq!(chain.aliases[0].sentence, SentenceId::new(0));
    }

    #[test]
    fn test_ties_go_to_first_occurrence() {
        let sentences = vec![
            Sentence::new(
                SentenceId::new(0),
                vec![
                    tok(0, 0, "it", "PRON", "PRP", "nsubj", 1).with_coref(coref("B-2")),
                    tok(0, 1, "fell", "VERB", "VBD", "root", 1),
                ],
            ),
            Sentence::new(
                SentenceId::new(1),
                vec![
                    tok(1, 0, "it", "PRON", "PRP", "nsubj", 1).with_coref(coref("B-2")),
                    tok(1, 1, "broke", "VERB", "VBD", "root", 1),
                ],
            ),
        ];
        let (roots, mentions) = compile(&sentences);
        let resolution = resolve(&mentions, &root_map(&roots));
        let chain = &resolution.chains[&ChainId::new(2)];
        assert_eq!(chain.canonical.sentence, SentenceId::new(0));
        assert_eq!(chain.aliases[0].sentence, SentenceId::new(1));
    }

    #[test]
    fn test_ties_follow_document_order_not_sentence_ids() {
        let sentences = vec![
            Sentence::new(
                SentenceId::new(5),
                vec![
                    tok(5, 0, "it", "PRON", "PRP", "nsubj", 1).with_coref(coref("B-REF1")),
                    tok(5, 1, "fell", "VERB", "VBD", "root", 1),
                ],
            ),
            Sentence::new(
                SentenceId::new(2),
                vec![
                    tok(2, 0, "it", "PRON", "PRP", "nsubj", 1).with_coref(coref("B-REF1")),
                    tok(2, 1, "broke", "VERB", "VBD", "root", 1),
                ],
            ),
        ];
        let (roots, mentions) = compile(&sentences);
        let map: BTreeMap<SentenceId, &Hyperedge> = sentences.iter().map(|s| s.id).zip(roots.iter()).collect();
        let resolution = resolve(&mentions, &map);
        let chain = &resolution.chains[&ChainId::new(1)];
        assert_eq!(chain.canonical.sentence, SentenceId::new(5));
        assert_eq!(chain.aliases.len(), 1);
        assert_eq!(chain.aliases[0].sentence, SentenceId::new(2));
    }

    #[test]
    fn test_misaligned_mention_is_dropped() {
        // "the big" is not a constituent of (the/Md.< (big/Ma.< dog/Cc..s))
        let sentence = Sentence::new(
            SentenceId::new(0),
            vec![
                tok(0, 0, "the", "DET", "DT", "det", 2).with_coref(coref("B-3")),
                tok(0, 1, "big", "ADJ", "JJ", "amod", 2).with_coref(coref("I-3")),
                tok(0, 2, "dog", "NOUN", "NN", "nsubj", 3),
                tok(0, 3, "barks", "VERB", "VBZ", "root", 3),
            ],
        );
        let (roots, mentions) = compile(&[sentence]);
        let resolution = resolve(&mentions, &root_map(&roots));
        assert!(resolution.chains.is_empty());
        assert_eq!(resolution.errors.len(), 1);
        let diagnostic = Diagnostic::from(&resolution.errors[0]);
        assert_eq!(diagnostic.kind.code(), "unresolved_chain");
    }

    #[test]
    fn test_skipped_sentence_mentions_are_unresolved() {
        let (roots, mentions) = compile(&two_sentences());
        let only_first: BTreeMap<SentenceId, &Hyperedge> =
            root_map(&roots).into_iter().take(1).collect();
        let resolution = resolve(&mentions, &only_first);
        assert_eq!(resolution.errors.len(), 1);
        let chain = &resolution.chains[&ChainId::new(1)];
        assert_eq!(chain.canonical.sentence, SentenceId::new(0));
        assert!(chain.aliases.is_empty());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let (roots, mentions) = compile(&two_sentences());
        let before: Vec<String> = roots.iter().map(|r| r.to_string()).collect();
        let first = resolve(&mentions, &root_map(&roots));
        let second = resolve(&mentions, &root_map(&roots));
        assert_eq!(first, second);
        let after: Vec<String> = roots.iter().map(|r| r.to_string()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_richness_order() {
        let entity = Atom::new("ibm", AtomType::Concept)
            .with_subtype("p")
            .with_entity(Some(crate::types::EntityType::Organization));
        let proper = Atom::new("ibm", AtomType::Concept).with_subtype("p");
        let common = Atom::new("plans", AtomType::Concept).with_subtype("c");
        let pronoun = Atom::new("them", AtomType::Concept).with_subtype("i");
        let verb = Atom::new("knew", AtomType::Predicate);
        let scores: Vec<u8> = [&entity, &proper, &common, &pronoun, &verb]
            .iter()
            .map(|a| richness(Some(*a)))
            .collect();
        assert_eq!(scores, vec![4, 3, 2, 1, 0]);
        assert_eq!(richness(None), 0);
    }
}
