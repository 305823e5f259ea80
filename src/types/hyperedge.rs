//! Typed hyperedges and atoms.
//!
//! A hyperedge is an ordered sequence of elements, each either an [`Atom`]
//! or a nested [`Hyperedge`]. The first element is the connector; the rest
//! are its arguments.
//!
//! ## Notation
//!
//! Hyperedges render in the SemHyP text notation:
//!
//! ```text
//! (knew/Pd.sx:01.<f patrick/Cp..s.p (about/T ('s/Bp ibm/Cp..s.o plans/Cc..p)))
//! ```
//!
//! Atoms render as `label/<type><subtype>.<roles>.<morph>.<entity>` with
//! trailing empty parts dropped. Reserved characters in labels are
//! percent-encoded.
//!
//! ## Immutability
//!
//! Hyperedges are built only by the composer and the assembler's linked
//! view. There are no public mutators; the edge type is fixed by the rule
//! that created the edge.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::tags::EntityType;

/// Characters escaped in atom labels, `%` first.
const LABEL_ENCODING: &[(char, &str)] = &[
    ('%', "%25"),
    ('/', "%2f"),
    (' ', "%20"),
    ('(', "%28"),
    (')', "%29"),
    ('.', "%2e"),
    ('*', "%2a"),
    ('&', "%26"),
    ('@', "%40"),
    ('\n', "%0a"),
    ('\r', "%0d"),
];

/// Percent-encode reserved characters of an atom label.
pub fn encode_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        match LABEL_ENCODING.iter().find(|(reserved, _)| *reserved == c) {
            Some((_, code)) => out.push_str(code),
            None => out.push(c),
        }
    }
    out
}

/// Main type of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AtomType {
    /// Concept (`C`).
    Concept,
    /// Predicate (`P`).
    Predicate,
    /// Modifier (`M`).
    Modifier,
    /// Builder (`B`).
    Builder,
    /// Trigger (`T`).
    Trigger,
    /// Conjunction (`J`).
    Conjunction,
}

impl AtomType {
    /// Notation code.
    pub fn code(&self) -> char {
        match self {
            Self::Concept => 'C',
            Self::Predicate => 'P',
            Self::Modifier => 'M',
            Self::Builder => 'B',
            Self::Trigger => 'T',
            Self::Conjunction => 'J',
        }
    }

    /// Parse a notation code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'C' => Some(Self::Concept),
            'P' => Some(Self::Predicate),
            'M' => Some(Self::Modifier),
            'B' => Some(Self::Builder),
            'T' => Some(Self::Trigger),
            'J' => Some(Self::Conjunction),
            _ => None,
        }
    }
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Type of a hyperedge, fixed by the composition rule that built it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Generic grouping of a concept with attached material.
    Concept,
    /// Predicate with its arguments.
    Relation,
    /// Modifier applied to a head.
    Modifier,
    /// Determiner, case or trigger specifying a head.
    Specifier,
    /// Coordination or clause linking.
    Conjunction,
    /// Concept built from concepts (compounds, appositions).
    Builder,
}

impl EdgeType {
    /// Notation code of the edge type.
    pub fn code(&self) -> char {
        match self {
            Self::Concept => 'C',
            Self::Relation => 'R',
            Self::Modifier => 'M',
            Self::Specifier => 'S',
            Self::Conjunction => 'J',
            Self::Builder => 'B',
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Concept => "concept",
            Self::Relation => "relation",
            Self::Modifier => "modifier",
            Self::Specifier => "specifier",
            Self::Conjunction => "conjunction",
            Self::Builder => "builder",
        };
        write!(f, "{}", name)
    }
}

/// A typed leaf of the hypergraph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    label: String,
    atom_type: AtomType,
    subtype: String,
    roles: Option<String>,
    morph: Option<String>,
    entity: Option<EntityType>,
    word_sense: Option<String>,
    predicate_sense: Option<String>,
    token: Option<u32>,
}

impl Atom {
    pub(crate) fn new(label: impl Into<String>, atom_type: AtomType) -> Self {
        Self {
            label: label.into(),
            atom_type,
            subtype: String::new(),
            roles: None,
            morph: None,
            entity: None,
            word_sense: None,
            predicate_sense: None,
            token: None,
        }
    }

    /// Synthetic connector with no originating token (`+/B.ma`, `:/J`).
    pub(crate) fn connector(label: &str, atom_type: AtomType, subtype: &str, roles: &str) -> Self {
        let atom = Self::new(label, atom_type).with_subtype(subtype);
        if roles.is_empty() {
            atom
        } else {
            atom.with_roles(roles)
        }
    }

    pub(crate) fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = subtype.into();
        self
    }

    pub(crate) fn with_roles(mut self, roles: impl Into<String>) -> Self {
        let roles = roles.into();
        self.roles = (!roles.is_empty()).then_some(roles);
        self
    }

    pub(crate) fn with_morph(mut self, morph: impl Into<String>) -> Self {
        let morph = morph.into();
        self.morph = (!morph.is_empty()).then_some(morph);
        self
    }

    pub(crate) fn with_entity(mut self, entity: Option<EntityType>) -> Self {
        self.entity = entity;
        self
    }

    pub(crate) fn with_word_sense(mut self, sense: Option<String>) -> Self {
        self.word_sense = sense;
        self
    }

    pub(crate) fn with_predicate_sense(mut self, sense: Option<String>) -> Self {
        self.predicate_sense = sense;
        self
    }

    pub(crate) fn with_token(mut self, token: u32) -> Self {
        self.token = Some(token);
        self
    }

    /// Label (unencoded).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Main type.
    pub fn atom_type(&self) -> AtomType {
        self.atom_type
    }

    /// Subtype code (`p` in `Cp`); empty when none.
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Full type code: main type plus subtype (`Cp`, `Pd`, `B`).
    pub fn type_code(&self) -> String {
        format!("{}{}", self.atom_type.code(), self.subtype)
    }

    /// Argument roles (`so` or `so:01`).
    pub fn roles(&self) -> Option<&str> {
        self.roles.as_deref()
    }

    /// Dependency roles and, when present, SRL roles.
    pub fn argument_roles(&self) -> Option<(&str, Option<&str>)> {
        self.roles.as_deref().map(|roles| match roles.split_once(':') {
            Some((deps, srl)) => (deps, Some(srl)),
            None => (roles, None),
        })
    }

    /// Morphology code.
    pub fn morph(&self) -> Option<&str> {
        self.morph.as_deref()
    }

    /// Named-entity type.
    pub fn entity(&self) -> Option<&EntityType> {
        self.entity.as_ref()
    }

    /// Word sense id.
    pub fn word_sense(&self) -> Option<&str> {
        self.word_sense.as_deref()
    }

    /// Predicate sense id.
    pub fn predicate_sense(&self) -> Option<&str> {
        self.predicate_sense.as_deref()
    }

    /// Originating token index; `None` for synthetic connectors.
    pub fn token(&self) -> Option<u32> {
        self.token
    }

    /// Whether the atom was introduced by a composition rule.
    pub fn is_synthetic(&self) -> bool {
        self.token.is_none()
    }

    /// Copy keeping only label, type and token.
    pub fn simplified(&self) -> Atom {
        Atom {
            label: self.label.clone(),
            atom_type: self.atom_type,
            subtype: String::new(),
            roles: None,
            morph: None,
            entity: None,
            word_sense: None,
            predicate_sense: None,
            token: self.token,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", encode_label(&self.label), self.type_code())?;
        let parts = [
            self.roles.as_deref().unwrap_or(""),
            self.morph.as_deref().unwrap_or(""),
            self.entity.as_ref().map(|e| e.code()).unwrap_or(""),
        ];
        let used = parts.iter().rposition(|p| !p.is_empty()).map_or(0, |i| i + 1);
        for part in &parts[..used] {
            write!(f, ".{}", part)?;
        }
        Ok(())
    }
}

/// An element of a hyperedge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// Leaf atom.
    Atom(Atom),
    /// Nested hyperedge.
    Edge(Hyperedge),
}

impl Element {
    /// Whether this is an atom.
    pub fn is_atom(&self) -> bool {
        matches!(self, Self::Atom(_))
    }

    /// The atom, if this is one.
    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Self::Atom(atom) => Some(atom),
            Self::Edge(_) => None,
        }
    }

    /// The hyperedge, if this is one.
    pub fn as_edge(&self) -> Option<&Hyperedge> {
        match self {
            Self::Atom(_) => None,
            Self::Edge(edge) => Some(edge),
        }
    }

    /// Token indices of all atoms under this element.
    pub fn tokens(&self) -> BTreeSet<u32> {
        let mut tokens = BTreeSet::new();
        self.collect_tokens(&mut tokens);
        tokens
    }

    fn collect_tokens(&self, tokens: &mut BTreeSet<u32>) {
        match self {
            Self::Atom(atom) => {
                if let Some(t) = atom.token {
                    tokens.insert(t);
                }
            }
            Self::Edge(edge) => {
                for element in &edge.elements {
                    element.collect_tokens(tokens);
                }
            }
        }
    }

    /// All atoms in pre-order.
    pub fn atoms(&self) -> Vec<&Atom> {
        let mut atoms = Vec::new();
        self.collect_atoms(&mut atoms);
        atoms
    }

    fn collect_atoms<'a>(&'a self, atoms: &mut Vec<&'a Atom>) {
        match self {
            Self::Atom(atom) => atoms.push(atom),
            Self::Edge(edge) => {
                for element in &edge.elements {
                    element.collect_atoms(atoms);
                }
            }
        }
    }

    /// Atom originating from the given token, if any.
    pub fn atom_for_token(&self, token: u32) -> Option<&Atom> {
        self.atoms().into_iter().find(|a| a.token == Some(token))
    }

    /// Element at a child path; the empty path is `self`.
    pub fn get(&self, path: &[u32]) -> Option<&Element> {
        let mut current = self;
        for &step in path {
            current = current.as_edge()?.elements.get(step as usize)?;
        }
        Some(current)
    }

    /// Copy with atoms reduced to label and type.
    pub fn simplified(&self) -> Element {
        match self {
            Self::Atom(atom) => Self::Atom(atom.simplified()),
            Self::Edge(edge) => Self::Edge(edge.simplified()),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(atom) => atom.fmt(f),
            Self::Edge(edge) => edge.fmt(f),
        }
    }
}

impl From<Atom> for Element {
    fn from(atom: Atom) -> Self {
        Self::Atom(atom)
    }
}

impl From<Hyperedge> for Element {
    fn from(edge: Hyperedge) -> Self {
        Self::Edge(edge)
    }
}

/// Token coverage of one element, addressed by its child path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coverage {
    /// Child path from the root.
    pub path: Vec<u32>,
    /// Token indices under the element.
    pub tokens: BTreeSet<u32>,
}

/// A typed, ordered hyperedge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hyperedge {
    edge_type: EdgeType,
    elements: Vec<Element>,
}

impl Hyperedge {
    pub(crate) fn new(edge_type: EdgeType, elements: Vec<Element>) -> Self {
        debug_assert!(!elements.is_empty(), "hyperedge without elements");
        Self { edge_type, elements }
    }

    /// Edge type.
    pub fn edge_type(&self) -> EdgeType {
        self.edge_type
    }

    /// Ordered elements.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the edge has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// First element.
    pub fn connector(&self) -> Option<&Element> {
        self.elements.first()
    }

    pub(crate) fn into_elements(self) -> Vec<Element> {
        self.elements
    }

    /// Elements after the connector.
    pub fn arguments(&self) -> &[Element] {
        self.elements.get(1..).unwrap_or(&[])
    }

    /// Token indices of all atoms.
    pub fn tokens(&self) -> BTreeSet<u32> {
        let mut tokens = BTreeSet::new();
        for element in &self.elements {
            element.collect_tokens(&mut tokens);
        }
        tokens
    }

    /// All atoms in pre-order.
    pub fn atoms(&self) -> Vec<&Atom> {
        let mut atoms = Vec::new();
        for element in &self.elements {
            element.collect_atoms(&mut atoms);
        }
        atoms
    }

    /// Element at a child path. The empty path addresses no element; use
    /// the edge itself.
    pub fn get(&self, path: &[u32]) -> Option<&Element> {
        let (first, rest) = path.split_first()?;
        self.elements.get(*first as usize)?.get(rest)
    }

    /// Token coverage of this edge and every element below it, in pre-order.
    pub fn coverage(&self) -> Vec<Coverage> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        Self::cover_edge(self, &mut path, &mut out);
        out
    }

    fn cover_edge(edge: &Hyperedge, path: &mut Vec<u32>, out: &mut Vec<Coverage>) -> BTreeSet<u32> {
        let slot = out.len();
        out.push(Coverage {
            path: path.clone(),
            tokens: BTreeSet::new(),
        });
        let mut tokens = BTreeSet::new();
        for (i, element) in edge.elements.iter().enumerate() {
            path.push(i as u32);
            match element {
                Element::Atom(atom) => {
                    let mut own = BTreeSet::new();
                    if let Some(t) = atom.token {
                        own.insert(t);
                    }
                    tokens.extend(own.iter().copied());
                    out.push(Coverage {
                        path: path.clone(),
                        tokens: own,
                    });
                }
                Element::Edge(child) => {
                    tokens.extend(Self::cover_edge(child, path, out));
                }
            }
            path.pop();
        }
        out[slot].tokens = tokens.clone();
        tokens
    }

    /// Path of the outermost element covering exactly `tokens`, searching
    /// in pre-order. The root matches with the empty path.
    pub fn find_by_tokens(&self, tokens: &BTreeSet<u32>) -> Option<Vec<u32>> {
        self.coverage()
            .into_iter()
            .find(|c| &c.tokens == tokens)
            .map(|c| c.path)
    }

    /// Copy with atoms reduced to label and type.
    pub fn simplified(&self) -> Hyperedge {
        Hyperedge {
            edge_type: self.edge_type,
            elements: self.elements.iter().map(Element::simplified).collect(),
        }
    }
}

impl fmt::Display for Hyperedge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", element)?;
        }
        write!(f, ")")
    }
}
