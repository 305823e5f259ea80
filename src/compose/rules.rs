//! Composition rules: how a child attaches to its head.
//!
//! [`classify`] decides the attachment of one child from its relation, its
//! SRL binding and the head's type. The constructors below build the
//! corresponding typed hyperedge. The connector always comes first:
//!
//! | Attachment | Shape |
//! |------------|-------|
//! | Modifier | `(child head)` or, between two concepts, `(+/B.ma head child)` |
//! | Specifier | `(child head)` |
//! | Possessor | `('s owner head)` when case-marked, else `(child head)` |
//! | Compound | `(+/B.am child head)` |
//! | Apposition | `(+/Ba.ma head child)` |
//! | RelativeClause | `(+/Jr.ma head clause)` |
//! | Complement | `(+/Br.am head clause)` |
//! | NominalPreposition | `(of head object)` |
//! | Object | `(trigger object)` |
//! | Marker | `(marker clause)` |

use crate::types::{Atom, AtomType, EdgeType, Element, EntityType, Hyperedge, SrlRole};

/// How a child attaches to its head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Attachment {
    /// Argument of a relation.
    Argument(ArgumentSlot),
    /// Modifier folded onto the head; `leading` forces `(child head)`.
    Modifier { prior: i32, leading: bool },
    /// Determiner, predeterminer or case marker.
    Specifier { prior: i32 },
    /// Possessive determiner or possessor.
    Possessor,
    /// Compound modifier.
    Compound,
    /// Apposition.
    Apposition,
    /// Relative or adnominal clause.
    RelativeClause,
    /// Clausal complement of a non-predicate head.
    Complement,
    /// Preposition attached to a non-verbal head.
    NominalPreposition,
    /// Object of a trigger or nominal preposition.
    Object,
    /// Subordinating marker.
    Marker,
    /// Coordinating conjunction.
    Coordinator,
    /// Further conjunct.
    Conjunct,
    /// Copula of a non-verbal predicate.
    Copula,
    /// Anything else, appended in surface order.
    Generic,
}

impl Attachment {
    /// Whether this attachment folds onto the head before relations are built.
    pub fn prior(&self) -> Option<i32> {
        match self {
            Self::Modifier { prior, .. } | Self::Specifier { prior } => Some(*prior),
            Self::Compound => Some(5),
            _ => None,
        }
    }
}

/// Argument position within a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ArgumentSlot {
    /// Core slot (ARG0, ARG1, ...); `None` places the argument in the tail.
    pub slot: Option<u8>,
    /// Dependency role code.
    pub dep_role: char,
    /// SRL role bound to the argument span.
    pub srl: Option<SrlRole>,
}

/// What classification needs to know about one child.
pub(crate) struct ChildContext<'a> {
    pub relation: &'a str,
    pub head_type: AtomType,
    /// Whether the head builds a relation (predicate or copula construction).
    pub relational: bool,
    /// Whether the head is verbal.
    pub head_verbal: bool,
    pub negation: bool,
    pub srl: Option<&'a SrlRole>,
}

/// Relations that never take an SRL argument slot.
const NON_ARGUMENT_RELATIONS: &[&str] = &[
    "case", "det", "predet", "amod", "nummod", "nmod", "quantmod", "compound", "aux", "auxpass",
    "prt", "neg", "cc", "preconj", "conj", "mark", "cop", "dep", "meta", "punct",
];

/// Relations that are arguments of any relational head.
const CORE_RELATIONS: &[&str] = &[
    "nsubj", "nsubjpass", "csubj", "csubjpass", "dobj", "dative", "oprd", "acomp", "attr", "expl",
    "parataxis", "intj", "agent", "ccomp", "xcomp", "advcl",
];

/// Relations that are arguments only of verbal heads.
const ADVERBIAL_RELATIONS: &[&str] = &["advmod", "prep", "npadvmod", "obl"];

/// Decide how a child attaches to its head.
pub(crate) fn classify(ctx: &ChildContext<'_>) -> Attachment {
    let rel = ctx.relation;
    match rel {
        "cc" | "preconj" => return Attachment::Coordinator,
        "conj" => return Attachment::Conjunct,
        "cop" if ctx.head_type != AtomType::Predicate => return Attachment::Copula,
        "mark" => return Attachment::Marker,
        "case" => return Attachment::Specifier { prior: 0 },
        "det" => return Attachment::Specifier { prior: 4 },
        "predet" => return Attachment::Specifier { prior: 1 },
        "poss" => return Attachment::Possessor,
        "compound" => return Attachment::Compound,
        "appos" => return Attachment::Apposition,
        "acl" | "relcl" => return Attachment::RelativeClause,
        "pobj" | "pcomp" if matches!(ctx.head_type, AtomType::Trigger | AtomType::Builder) => {
            return Attachment::Object
        }
        _ => {}
    }

    if ctx.relational {
        if let Some(role) = ctx.srl.filter(|r| !r.is_predicate()) {
            if !NON_ARGUMENT_RELATIONS.contains(&rel) {
                return Attachment::Argument(ArgumentSlot {
                    slot: role.slot(),
                    dep_role: dep_role(rel),
                    srl: Some(role.clone()),
                });
            }
        }
        let adverbial = ctx.head_verbal && ADVERBIAL_RELATIONS.contains(&rel) && !ctx.negation;
        if CORE_RELATIONS.contains(&rel) || adverbial {
            return Attachment::Argument(ArgumentSlot {
                slot: dependency_slot(rel),
                dep_role: dep_role(rel),
                srl: None,
            });
        }
    }

    match rel {
        "nmod" => Attachment::Modifier { prior: 5, leading: false },
        "amod" | "advmod" | "nummod" if !ctx.negation => Attachment::Modifier { prior: 4, leading: false },
        "advmod" => Attachment::Modifier { prior: 2, leading: true },
        "quantmod" => Attachment::Modifier { prior: 3, leading: false },
        "npadvmod" => Attachment::Modifier { prior: 0, leading: false },
        "prt" => Attachment::Modifier { prior: 3, leading: true },
        "aux" | "auxpass" | "neg" => Attachment::Modifier { prior: 2, leading: true },
        "ccomp" | "xcomp" | "advcl" | "csubj" if !ctx.relational => Attachment::Complement,
        "prep" | "obl" if !ctx.relational || !ctx.head_verbal => Attachment::NominalPreposition,
        _ => Attachment::Generic,
    }
}

/// Core slot implied by a dependency relation when no SRL role is bound.
pub(crate) fn dependency_slot(relation: &str) -> Option<u8> {
    match relation {
        "nsubj" | "csubj" | "agent" => Some(0),
        "nsubjpass" | "csubjpass" | "dobj" | "attr" | "acomp" | "oprd" | "ccomp" | "xcomp" => Some(1),
        "dative" => Some(2),
        _ => None,
    }
}

/// Dependency role code recorded on the predicate.
pub(crate) fn dep_role(relation: &str) -> char {
    match relation {
        "nsubj" | "csubj" => 's',
        "nsubjpass" | "csubjpass" => 'p',
        "expl" => 'e',
        "agent" => 'a',
        "acomp" | "attr" => 'c',
        "dobj" | "pobj" | "prt" | "oprd" => 'o',
        "dative" => 'i',
        "advcl" | "prep" | "npadvmod" | "advmod" | "obl" => 'x',
        "parataxis" => 't',
        "intj" => 'j',
        "xcomp" | "ccomp" => 'r',
        _ => '?',
    }
}

/// Entity shared by two tokens, carried by the synthetic connector joining them.
pub(crate) fn shared_entity(a: Option<&EntityType>, b: Option<&EntityType>) -> Option<EntityType> {
    match (a, b) {
        (Some(a), Some(b)) if a == b => Some(a.clone()),
        _ => None,
    }
}

fn edge(edge_type: EdgeType, elements: Vec<Element>) -> Element {
    Element::Edge(Hyperedge::new(edge_type, elements))
}

fn connector(label: &str, atom_type: AtomType, subtype: &str, roles: &str, entity: Option<EntityType>) -> Element {
    Element::Atom(Atom::connector(label, atom_type, subtype, roles).with_entity(entity))
}

/// Modifier rule. Two concepts are joined by a builder in surface order.
pub(crate) fn modify(
    head: Element,
    head_type: AtomType,
    head_first: bool,
    child: Element,
    child_type: AtomType,
    leading: bool,
    entity: Option<EntityType>,
) -> Element {
    if leading {
        return edge(EdgeType::Modifier, vec![child, head]);
    }
    match (head_type, child_type) {
        (AtomType::Concept, AtomType::Concept) if head_first => edge(
            EdgeType::Builder,
            vec![connector("+", AtomType::Builder, "", "ma", entity), head, child],
        ),
        (AtomType::Concept, AtomType::Concept) => edge(
            EdgeType::Builder,
            vec![connector("+", AtomType::Builder, "", "am", entity), child, head],
        ),
        (AtomType::Concept, _) => edge(EdgeType::Modifier, vec![child, head]),
        (_, AtomType::Concept) => edge(EdgeType::Modifier, vec![head, child]),
        _ if head_first => edge(EdgeType::Modifier, vec![head, child]),
        _ => edge(EdgeType::Modifier, vec![child, head]),
    }
}

/// Specifier rule: `(child head)`. A possessive case marker builds.
pub(crate) fn specify(head: Element, child: Element, child_type: AtomType) -> Element {
    let edge_type = if child_type == AtomType::Builder {
        EdgeType::Builder
    } else {
        EdgeType::Specifier
    };
    edge(edge_type, vec![child, head])
}

/// Possessor rule. A case-marked possessor `('s ibm)` absorbs the head.
pub(crate) fn possess(head: Element, child: Element, case_marked: bool) -> Element {
    match child {
        Element::Edge(owner) if case_marked => {
            let mut elements = owner.into_elements();
            elements.push(head);
            edge(EdgeType::Builder, elements)
        }
        child => edge(EdgeType::Specifier, vec![child, head]),
    }
}

/// Compound rule.
pub(crate) fn compound(head: Element, child: Element, child_first: bool, entity: Option<EntityType>) -> Element {
    if child_first {
        edge(
            EdgeType::Builder,
            vec![connector("+", AtomType::Builder, "", "am", entity), child, head],
        )
    } else {
        edge(
            EdgeType::Builder,
            vec![connector("+", AtomType::Builder, "", "ma", entity), head, child],
        )
    }
}

/// Apposition rule; `punct` codes the separator (`c`omma, `b`racket, `q`uote, `n`one).
pub(crate) fn apposition(head: Element, child: Element, punct: &str, entity: Option<EntityType>) -> Element {
    let conn = Atom::connector("+", AtomType::Builder, "a", "ma")
        .with_morph(punct)
        .with_entity(entity);
    edge(EdgeType::Builder, vec![Element::Atom(conn), head, child])
}

/// Relative clause rule.
pub(crate) fn relative_clause(head: Element, clause: Element, entity: Option<EntityType>) -> Element {
    edge(
        EdgeType::Conjunction,
        vec![connector("+", AtomType::Conjunction, "r", "ma", entity), head, clause],
    )
}

/// Clausal complement of a non-predicate head.
pub(crate) fn complement(head: Element, clause: Element, entity: Option<EntityType>) -> Element {
    edge(
        EdgeType::Builder,
        vec![connector("+", AtomType::Builder, "r", "am", entity), head, clause],
    )
}

/// Nominal preposition rule: `(of berlin)` under `city` becomes
/// `(of city berlin)`. Returns the head back when the child is not a
/// preposition with an object.
pub(crate) fn nominal_preposition(head: Element, child: Element) -> Result<Element, (Element, Element)> {
    match child {
        Element::Edge(prep)
            if prep.len() >= 2
                && prep
                    .connector()
                    .and_then(Element::as_atom)
                    .is_some_and(|a| matches!(a.atom_type(), AtomType::Trigger | AtomType::Builder)) =>
        {
            let mut elements = prep.into_elements();
            elements.insert(1, head);
            Ok(edge(EdgeType::Builder, elements))
        }
        child => Err((head, child)),
    }
}

/// Object rule: `(trigger object)`.
pub(crate) fn object(head: Element, head_type: AtomType, child: Element) -> Element {
    let edge_type = if head_type == AtomType::Builder {
        EdgeType::Builder
    } else {
        EdgeType::Specifier
    };
    edge(edge_type, vec![head, child])
}

/// Marker rule: `(because clause)`.
pub(crate) fn mark(head: Element, marker: Element) -> Element {
    edge(EdgeType::Specifier, vec![marker, head])
}

/// Generic grouping of a head with unclassified children.
pub(crate) fn group(head: Element, rest: Vec<Element>) -> Element {
    let mut elements = Vec::with_capacity(rest.len() + 1);
    elements.push(head);
    elements.extend(rest);
    edge(EdgeType::Concept, elements)
}

/// Relation rule: connector, then arguments in their final order.
pub(crate) fn relation(connector: Element, arguments: Vec<Element>) -> Element {
    let mut elements = Vec::with_capacity(arguments.len() + 1);
    elements.push(connector);
    elements.extend(arguments);
    edge(EdgeType::Relation, elements)
}

/// Conjunction rule: connector, then conjuncts in surface order.
pub(crate) fn coordinate(connector: Element, members: Vec<Element>) -> Element {
    let mut elements = Vec::with_capacity(members.len() + 1);
    elements.push(connector);
    elements.extend(members);
    edge(EdgeType::Conjunction, elements)
}

/// Synthetic coordinator used when conjuncts have no explicit one.
pub(crate) fn implicit_coordinator(entity: Option<EntityType>) -> Element {
    connector(":", AtomType::Conjunction, "", "", entity)
}

/// Coordinator applied to a single clause (`but` without a second conjunct).
pub(crate) fn coordinate_single(head: Element, coordinator: Element) -> Element {
    edge(EdgeType::Conjunction, vec![coordinator, head])
}

/// Single-element relation for a predicate used without arguments.
pub(crate) fn bare_relation(predicate: Element) -> Element {
    edge(EdgeType::Relation, vec![predicate])
}
