//! Document hypergraph assembly.
//!
//! ## Element Identity
//!
//! Every hyperedge and atom of the document gets an [`ElementId`]: its
//! sentence id plus its child path from the sentence root (`s3.1.0`). Ids
//! depend only on structure, never on labels, so the same composition
//! always yields the same ids. The [`ElementRegistry`] lists every id in
//! pre-order with a registry hash for integrity checks.
//!
//! ## Aliasing
//!
//! Coreference is recorded as a map from chain to canonical id and alias
//! ids. Stored roots are never rewritten; [`DocumentHypergraph::linked_root`]
//! builds a separate view in which each alias is joined to a copy of its
//! canonical element:
//!
//! ```text
//! (left/P.s.<f (+/Jc.rm.rp he/Ci patrick/Cp..s.p))
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::canonical::canonical_hash_hex;
use crate::coref::CorefResolution;
use crate::types::{Atom, AtomType, ChainId, EdgeType, Element, Hyperedge, SentenceId};
use crate::SEMHYP_SCHEMA_VERSION;

/// Element id parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid element id: {0}")]
pub struct ElementIdError(String);

/// Stable address of a hyperedge or atom: sentence plus child path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ElementId {
    /// Sentence of the element.
    pub sentence: SentenceId,
    /// Child path from the sentence root; empty for the root.
    pub path: Vec<u32>,
}

impl ElementId {
    /// Create a new ElementId.
    pub fn new(sentence: SentenceId, path: Vec<u32>) -> Self {
        Self { sentence, path }
    }

    /// Id of a sentence root.
    pub fn root(sentence: SentenceId) -> Self {
        Self::new(sentence, Vec::new())
    }

    /// Whether this id addresses a sentence root.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.sentence)?;
        for step in &self.path {
            write!(f, ".{}", step)?;
        }
        Ok(())
    }
}

impl FromStr for ElementId {
    type Err = ElementIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ElementIdError(s.to_string());
        let rest = s.strip_prefix('s').ok_or_else(invalid)?;
        let mut parts = rest.split('.');
        let sentence = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let path = parts
            .map(|p| p.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(SentenceId::new(sentence), path))
    }
}

impl From<ElementId> for String {
    fn from(id: ElementId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for ElementId {
    type Error = ElementIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Borrowed view of an addressed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementRef<'a> {
    /// A hyperedge (including sentence roots).
    Edge(&'a Hyperedge),
    /// An atom.
    Atom(&'a Atom),
}

impl ElementRef<'_> {
    /// Owned copy as an [`Element`].
    pub fn to_element(&self) -> Element {
        match self {
            Self::Edge(edge) => Element::Edge((*edge).clone()),
            Self::Atom(atom) => Element::Atom((*atom).clone()),
        }
    }

    fn atoms(&self) -> Vec<&Atom> {
        match self {
            Self::Edge(edge) => edge.atoms(),
            Self::Atom(atom) => vec![*atom],
        }
    }
}

impl fmt::Display for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edge(edge) => edge.fmt(f),
            Self::Atom(atom) => atom.fmt(f),
        }
    }
}

/// One registered element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Element id.
    pub id: ElementId,
    /// Edge type; `None` for atoms.
    pub edge_type: Option<EdgeType>,
    /// Atom label; `None` for edges.
    pub label: Option<String>,
    /// Token indices covered by the element.
    pub tokens: Vec<u32>,
}

/// Registry of every element in a document, in id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRegistry {
    /// Entries sorted by id (sentence, then pre-order).
    pub entries: Vec<RegistryEntry>,
    /// Hash of the registry for integrity verification.
    pub registry_hash: String,
}

impl ElementRegistry {
    /// Create a new registry from entries.
    pub fn new(mut entries: Vec<RegistryEntry>) -> Self {
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        let registry_hash = canonical_hash_hex(&entries);
        Self {
            entries,
            registry_hash,
        }
    }

    /// Get entry by element id.
    pub fn get(&self, id: &ElementId) -> Option<&RegistryEntry> {
        self.entries
            .binary_search_by(|e| e.id.cmp(id))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Number of registered elements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Composed hyperedge of one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceHypergraph {
    /// Sentence id.
    pub sentence: SentenceId,
    /// Surface text of the sentence.
    pub text: String,
    /// Root hyperedge.
    pub root: Hyperedge,
}

/// A coreference chain over element ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityChain {
    /// Canonical element.
    pub canonical: ElementId,
    /// Elements referring to the canonical one, in document order.
    pub aliases: Vec<ElementId>,
}

/// The compiled document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHypergraph {
    /// Output schema version.
    pub schema_version: String,
    /// Composed sentences in document order. Skipped sentences are absent.
    pub sentences: Vec<SentenceHypergraph>,
    /// Coreference chains.
    pub chains: BTreeMap<ChainId, EntityChain>,
    /// Every element id of the document.
    pub registry: ElementRegistry,
    /// xxh64 over the canonical JSON of sentences and chains.
    pub fingerprint: String,
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    schema_version: &'a str,
    sentences: &'a [SentenceHypergraph],
    chains: &'a BTreeMap<ChainId, EntityChain>,
}

impl DocumentHypergraph {
    /// Assemble composed sentences and resolved chains.
    pub fn assemble(sentences: Vec<SentenceHypergraph>, resolution: &CorefResolution) -> Self {
        let chains: BTreeMap<ChainId, EntityChain> = resolution
            .chains
            .iter()
            .map(|(chain, resolved)| {
                let canonical = ElementId::new(resolved.canonical.sentence, resolved.canonical.path.clone());
                let aliases = resolved
                    .aliases
                    .iter()
                    .map(|a| ElementId::new(a.sentence, a.path.clone()))
                    .collect();
                (*chain, EntityChain { canonical, aliases })
            })
            .collect();

        let mut entries = Vec::new();
        for sentence in &sentences {
            for coverage in sentence.root.coverage() {
                let atom = sentence.root.get(&coverage.path).and_then(Element::as_atom);
                let edge_type = match sentence.root.get(&coverage.path) {
                    None => Some(sentence.root.edge_type()),
                    Some(Element::Edge(edge)) => Some(edge.edge_type()),
                    Some(Element::Atom(_)) => None,
                };
                entries.push(RegistryEntry {
                    id: ElementId::new(sentence.sentence, coverage.path),
                    edge_type,
                    label: atom.map(|a| a.label().to_string()),
                    tokens: coverage.tokens.into_iter().collect(),
                });
            }
        }
        let registry = ElementRegistry::new(entries);

        let schema_version = SEMHYP_SCHEMA_VERSION.to_string();
        let fingerprint = canonical_hash_hex(&FingerprintInput {
            schema_version: &schema_version,
            sentences: &sentences,
            chains: &chains,
        });

        Self {
            schema_version,
            sentences,
            chains,
            registry,
            fingerprint,
        }
    }

    /// Composed sentence by id.
    pub fn sentence(&self, id: SentenceId) -> Option<&SentenceHypergraph> {
        self.sentences.iter().find(|s| s.sentence == id)
    }

    /// Element addressed by an id.
    pub fn element(&self, id: &ElementId) -> Option<ElementRef<'_>> {
        let root = &self.sentence(id.sentence)?.root;
        if id.is_root() {
            return Some(ElementRef::Edge(root));
        }
        match root.get(&id.path)? {
            Element::Edge(edge) => Some(ElementRef::Edge(edge)),
            Element::Atom(atom) => Some(ElementRef::Atom(atom)),
        }
    }

    /// Chain an element belongs to, as canonical or alias.
    pub fn chain_of(&self, id: &ElementId) -> Option<ChainId> {
        self.chains
            .iter()
            .find(|(_, c)| &c.canonical == id || c.aliases.contains(id))
            .map(|(chain, _)| *chain)
    }

    /// Canonical element of an alias; `None` for non-aliases.
    pub fn alias_target(&self, id: &ElementId) -> Option<&ElementId> {
        self.chains
            .values()
            .find(|c| c.aliases.contains(id))
            .map(|c| &c.canonical)
    }

    /// Root of a sentence with every alias joined to its canonical element
    /// by a `+/Jc` coreference connector. Aliases whose text equals the
    /// canonical text are left as they are.
    pub fn linked_root(&self, sentence: SentenceId) -> Option<Hyperedge> {
        let root = &self.sentence(sentence)?.root;
        let links: BTreeMap<&[u32], Element> = self
            .chains
            .values()
            .flat_map(|c| c.aliases.iter().map(move |a| (a, &c.canonical)))
            .filter(|(alias, _)| alias.sentence == sentence)
            .filter_map(|(alias, canonical)| {
                let alias_ref = self.element(alias)?;
                let canonical_ref = self.element(canonical)?;
                if surface(&alias_ref) == surface(&canonical_ref) {
                    return None;
                }
                let connector = Atom::connector("+", AtomType::Conjunction, "c", "rm")
                    .with_morph(format!("{}{}", coref_code(&alias_ref), coref_code(&canonical_ref)));
                let linked = Hyperedge::new(
                    EdgeType::Conjunction,
                    vec![Element::Atom(connector), alias_ref.to_element(), canonical_ref.to_element()],
                );
                Some((alias.path.as_slice(), Element::Edge(linked)))
            })
            .collect();

        if let Some(Element::Edge(whole)) = links.get([].as_slice()) {
            return Some(whole.clone());
        }
        let mut path = Vec::new();
        Some(relink(root, &mut path, &links))
    }
}

fn relink(edge: &Hyperedge, path: &mut Vec<u32>, links: &BTreeMap<&[u32], Element>) -> Hyperedge {
    let elements = edge
        .elements()
        .iter()
        .enumerate()
        .map(|(i, element)| {
            path.push(i as u32);
            let out = match (links.get(path.as_slice()), element) {
                (Some(linked), _) => linked.clone(),
                (None, Element::Edge(child)) => Element::Edge(relink(child, path, links)),
                (None, atom) => atom.clone(),
            };
            path.pop();
            out
        })
        .collect();
    Hyperedge::new(edge.edge_type(), elements)
}

/// Lowercased labels of an element's token atoms.
fn surface(element: &ElementRef<'_>) -> Vec<String> {
    element
        .atoms()
        .into_iter()
        .filter(|a| !a.is_synthetic())
        .map(|a| a.label().to_lowercase())
        .collect()
}

/// Mention type code: `p`roper, p`r`onoun, `c`ommon, `?` otherwise.
fn coref_code(element: &ElementRef<'_>) -> char {
    let head = element
        .atoms()
        .into_iter()
        .find(|a| a.atom_type() == AtomType::Concept);
    match head.map(Atom::subtype) {
        Some("p") => 'p',
        Some("i") | Some("w") => 'r',
        Some("c") => 'c',
        _ => '?',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;
    use crate::coref::{collect_mentions, resolve};
    use crate::policy::CompilePolicy;
    use crate::spans::aggregate;
    use crate::tree::DependencyTree;
    use crate::types::{Sentence, Token};

    fn tok(s: u32, i: u32, word: &str, upos: &str, xpos: &str, dep: &str, head: u32) -> Token {
        Token::new(SentenceId::new(s), i, word, upos, xpos, dep, head)
    }

    fn document() -> DocumentHypergraph {
        let sentences = vec![
            Sentence::new(
                SentenceId::new(0),
                vec![
                    tok(0, 0, "He", "PRON", "PRP", "nsubj", 1).with_coref(vec![Some("B-REF1".into())]),
                    tok(0, 1, "left", "VERB", "VBD", "root", 1),
                ],
            ),
            Sentence::new(
                SentenceId::new(1),
                vec![
                    tok(1, 0, "Patrick", "PROPN", "NNP", "nsubj", 1)
                        .with_ner("B-PERSON")
                        .with_coref(vec![Some("B-MAIN1".into())]),
                    tok(1, 1, "slept", "VERB", "VBD", "root", 1),
                ],
            ),
        ];
        let policy = CompilePolicy::default();
        let mut composed = Vec::new();
        let mut mentions = Vec::new();
        for sentence in &sentences {
            let tree = DependencyTree::build(sentence).unwrap();
            let layers = aggregate(sentence);
            mentions.extend(collect_mentions(sentence, &layers));
            composed.push(SentenceHypergraph {
                sentence: sentence.id,
                text: sentence.text(),
                root: compose(sentence, &tree, &layers, &policy),
            });
        }
        let roots = composed.iter().map(|s| (s.sentence, &s.root)).collect();
        let resolution = resolve(&mentions, &roots);
        DocumentHypergraph::assemble(composed, &resolution)
    }

    #[test]
    fn test_element_id_parse_and_display() {
        let id: ElementId = "s3.1.0".parse().unwrap();
        assert_eq!(id, ElementId::new(SentenceId::new(3), vec![1, 0]));
        assert_eq!(id.to_string(), "s3.1.0");
        assert!("s0".parse::<ElementId>().unwrap().is_root());
        assert!("x1".parse::<ElementId>().is_err());
        assert!("s1.a".parse::<ElementId>().is_err());

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"s3.1.0\"");
        let back: ElementId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_registry_lists_every_element() {
        let doc = document();
        // each sentence: root, predicate atom, subject atom
        assert_eq!(doc.registry.len(), 6);
        let entry = doc.registry.get(&"s1.1".parse().unwrap()).unwrap();
        assert_eq!(entry.label.as_deref(), Some("patrick"));
        assert_eq!(entry.tokens, vec![0]);
        let root = doc.registry.get(&ElementId::root(SentenceId::new(0))).unwrap();
        assert_eq!(root.edge_type, Some(EdgeType::Relation));
    }

    #[test]
    fn test_element_lookup_and_chains() {
        let doc = document();
        let he: ElementId = "s0.1".parse().unwrap();
        let patrick: ElementId = "s1.1".parse().unwrap();

        assert_eq!(doc.element(&he).unwrap().to_string(), "he/Ci");
        assert_eq!(doc.chain_of(&he), Some(ChainId::new(1)));
        assert_eq!(doc.chain_of(&patrick), Some(ChainId::new(1)));
        assert_eq!(doc.alias_target(&he), Some(&patrick));
        assert_eq!(doc.alias_target(&patrick), None);
        assert!(doc.element(&"s7".parse().unwrap()).is_none());
    }

    #[test]
    fn test_linked_root_joins_aliases() {
        let doc = document();
        let linked = doc.linked_root(SentenceId::new(0)).unwrap();
        assert_eq!(
            linked.to_string(),
            "(left/P.s.<f (+/Jc.rm.rp he/Ci patrick/Cp..s.p))"
        );
        // stored roots are untouched
        assert_eq!(doc.sentences[0].root.to_string(), "(left/P.s.<f he/Ci)");
        // sentences without aliases link to themselves
        assert_eq!(doc.linked_root(SentenceId::new(1)).unwrap(), doc.sentences[1].root);
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = document();
        let b = document();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.registry.registry_hash, b.registry.registry_hash);
        assert_eq!(a.fingerprint.len(), 16);
    }

    #[test]
    fn test_serde_roundtrip() {
        let doc = document();
        let json = serde_json::to_string(&doc).unwrap();
        let back: DocumentHypergraph = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, back);
    }
}
