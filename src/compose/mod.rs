//! Hyperedge composition.
//!
//! The composer walks a validated dependency tree bottom-up. Every node
//! first becomes a typed atom; its children's composed units are then
//! folded onto it in a fixed order:
//!
//! 1. Modifiers, specifiers and compounds, by priority then distance
//! 2. Possessors, appositions, clauses and prepositional attachments, in
//!    surface order
//! 3. Arguments and unclassified children into a relation (or a concept
//!    grouping for non-relational heads)
//! 4. Subordinating markers
//! 5. Coordination with the node's conjuncts
//!
//! Argument order is canonical: core arguments by slot (SRL role first,
//! dependency relation otherwise), then the remaining arguments in surface
//! order. The same tree, layers and policy always yield the same edge.

mod rules;
mod typing;

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::policy::CompilePolicy;
use crate::spans::{span_root, SentenceMentions};
use crate::tree::{DependencyTree, NodeId};
use crate::types::{Atom, AtomType, EdgeType, Element, EntityType, Hyperedge, Sentence, SrlRole, Token};
use rules::{Attachment, ChildContext};
use typing::{is_negation, type_leaf, LeafContext};

/// Compose the hyperedge of one sentence.
pub fn compose(
    sentence: &Sentence,
    tree: &DependencyTree,
    mentions: &SentenceMentions,
    policy: &CompilePolicy,
) -> Hyperedge {
    Composer::new(sentence, tree, mentions, policy).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Leaf,
    Modified,
    CaseMarked,
    Grouped,
    Relation,
    Coordination,
}

/// Composed subtree waiting to be attached to its head.
#[derive(Debug)]
struct Unit {
    element: Element,
    head_type: AtomType,
    shape: Shape,
    position: u32,
    /// Coordinators not yet consumed by a coordination.
    coordinators: Vec<Unit>,
}

impl Unit {
    fn is_bare_predicate(&self) -> bool {
        self.head_type == AtomType::Predicate && matches!(self.shape, Shape::Leaf | Shape::Modified)
    }

    /// Wrap pending coordinators around the unit: `(but clause)`.
    fn settle(mut self) -> Self {
        let coordinators = std::mem::take(&mut self.coordinators);
        if coordinators.is_empty() {
            return self;
        }
        let (head_type, position) = (self.head_type, self.position);
        let mut element = self.wrap_bare();
        for coordinator in coordinators {
            element = rules::coordinate_single(element, coordinator.into_argument());
        }
        Unit {
            element,
            head_type,
            shape: Shape::Grouped,
            position,
            coordinators: Vec::new(),
        }
    }

    fn wrap_bare(self) -> Element {
        if self.is_bare_predicate() {
            rules::bare_relation(self.element)
        } else {
            self.element
        }
    }

    /// Element used as an argument or conjunct.
    fn into_argument(self) -> Element {
        self.settle().wrap_bare()
    }
}

/// Relation argument before the connector exists.
struct Argument {
    slot: Option<u8>,
    position: u32,
    dep: char,
    srl: Option<char>,
    /// `None` stands for the head itself in a copula construction.
    unit: Option<Unit>,
}

struct Composer<'a> {
    sentence: &'a Sentence,
    tree: &'a DependencyTree,
    mentions: &'a SentenceMentions,
    policy: &'a CompilePolicy,
    relations: Vec<String>,
    /// SRL role of a child span, keyed by (predicate node, child node).
    bindings: BTreeMap<(NodeId, NodeId), &'a SrlRole>,
    frame_predicates: BTreeSet<NodeId>,
}

impl<'a> Composer<'a> {
    fn new(
        sentence: &'a Sentence,
        tree: &'a DependencyTree,
        mentions: &'a SentenceMentions,
        policy: &'a CompilePolicy,
    ) -> Self {
        let relations: Vec<String> = sentence.tokens.iter().map(Token::relation).collect();
        let mut bindings = BTreeMap::new();
        let mut frame_predicates = BTreeSet::new();

        if policy.use_srl {
            for frame in &mentions.frames {
                let declared = frame.predicate.and_then(|t| tree.node_of(t));
                if let Some(p) = declared {
                    frame_predicates.insert(p);
                }
                // arguments of a copula attach to its head
                let predicate = declared.map(|p| match relations[p].as_str() {
                    "cop" => tree.head(p).unwrap_or(p),
                    _ => p,
                });
                for argument in &frame.arguments {
                    let Some(role) = argument.role() else { continue };
                    let Some(node) = span_root(sentence, &argument.span).and_then(|t| tree.node_of(t)) else {
                        continue;
                    };
                    let Some(head) = tree.head(node) else { continue };
                    if predicate.is_some_and(|p| p != head) {
                        trace!(
                            sentence = %sentence.id,
                            column = frame.column,
                            span = %argument.span,
                            "SRL span is not a direct dependent of its predicate"
                        );
                        continue;
                    }
                    bindings.entry((head, node)).or_insert(role);
                }
            }
        }

        Self {
            sentence,
            tree,
            mentions,
            policy,
            relations,
            bindings,
            frame_predicates,
        }
    }

    fn run(self) -> Hyperedge {
        let root = self.tree.root();
        let mut units: Vec<Option<Unit>> = (0..self.tree.len()).map(|_| None).collect();
        for node in self.tree.post_order() {
            if node == root || self.skipped(node) {
                continue;
            }
            let unit = self.compose_node(node, &mut units);
            units[node] = Some(unit);
        }

        let unit = self.compose_node(root, &mut units);
        let head_type = unit.head_type;
        match unit.into_argument() {
            Element::Edge(edge) => edge,
            Element::Atom(atom) => {
                let edge_type = if head_type == AtomType::Predicate {
                    EdgeType::Relation
                } else {
                    EdgeType::Concept
                };
                Hyperedge::new(edge_type, vec![Element::Atom(atom)])
            }
        }
    }

    /// Punctuation leaves are dropped unless the policy keeps them.
    fn skipped(&self, node: NodeId) -> bool {
        !self.policy.keep_punctuation
            && self.sentence.tokens[node].is_punct()
            && self.tree.children(node).is_empty()
    }

    fn entity(&self, index: u32) -> Option<&'a EntityType> {
        if self.policy.use_entities {
            self.mentions.entity_at(index)
        } else {
            None
        }
    }

    fn compose_node(&self, node: NodeId, units: &mut [Option<Unit>]) -> Unit {
        let token = &self.sentence.tokens[node];
        let children: Vec<(NodeId, Unit)> = self
            .tree
            .children(node)
            .iter()
            .filter_map(|&c| units[c].take().map(|u| (c, u)))
            .collect();

        let atom = self.type_node(node);
        let head_type = atom.atom_type();
        let has_copula = head_type != AtomType::Predicate
            && children.iter().any(|(c, _)| self.relations[*c] == "cop");
        let relational = head_type == AtomType::Predicate || has_copula;

        let mut folds: Vec<(i32, Attachment, Unit)> = Vec::new();
        let mut late: Vec<(NodeId, Attachment, Unit)> = Vec::new();
        let mut arguments: Vec<Argument> = Vec::new();
        let mut generics: Vec<Unit> = Vec::new();
        let mut markers: Vec<Unit> = Vec::new();
        let mut coordinators: Vec<Unit> = Vec::new();
        let mut conjuncts: Vec<Unit> = Vec::new();
        let mut copula: Option<Unit> = None;

        for (child, unit) in children {
            let ctx = ChildContext {
                relation: &self.relations[child],
                head_type,
                relational,
                head_verbal: head_type == AtomType::Predicate,
                negation: is_negation(&self.sentence.tokens[child]),
                srl: self.bindings.get(&(node, child)).copied(),
            };
            let attachment = rules::classify(&ctx);
            let unit = match attachment {
                Attachment::Conjunct => unit,
                _ => unit.settle(),
            };
            match attachment {
                Attachment::Argument(slot) => arguments.push(Argument {
                    slot: slot.slot,
                    position: unit.position,
                    dep: slot.dep_role,
                    srl: slot.srl.as_ref().map(SrlRole::code),
                    unit: Some(unit),
                }),
                Attachment::Coordinator => coordinators.push(unit),
                Attachment::Conjunct => conjuncts.push(unit),
                Attachment::Marker => markers.push(unit),
                Attachment::Copula if copula.is_none() => copula = Some(unit),
                Attachment::Copula | Attachment::Generic => generics.push(unit),
                other => match other.prior() {
                    Some(prior) => folds.push((prior, other, unit)),
                    None => late.push((child, other, unit)),
                },
            }
        }

        // Argument order and roles are fixed before folding so the
        // predicate atom carries its roles.
        if relational {
            for unit in generics.drain(..) {
                arguments.push(Argument {
                    slot: None,
                    position: unit.position,
                    dep: '?',
                    srl: None,
                    unit: Some(unit),
                });
            }
            if copula.is_some() {
                arguments.push(Argument {
                    slot: Some(1),
                    position: token.index,
                    dep: 'c',
                    srl: None,
                    unit: None,
                });
            }
            arguments.sort_by_key(|a| (a.slot.is_none(), a.slot, a.position));
        }
        let roles = role_string(&arguments);
        let atom = if head_type == AtomType::Predicate && copula.is_none() {
            atom.with_roles(roles.clone())
        } else {
            atom
        };

        let mut core = Element::Atom(atom);
        let mut shape = Shape::Leaf;
        let head_entity = self.entity(token.index);

        folds.sort_by_key(|(prior, _, unit)| {
            (Reverse(*prior), unit.position.abs_diff(token.index), unit.position)
        });
        for (prior, attachment, unit) in folds {
            let case_marker = prior == 0 && matches!(attachment, Attachment::Specifier { .. });
            let shared = rules::shared_entity(head_entity, self.entity(unit.position));
            core = match attachment {
                Attachment::Modifier { leading, .. } => rules::modify(
                    core,
                    head_type,
                    token.index < unit.position,
                    unit.element,
                    unit.head_type,
                    leading,
                    shared,
                ),
                Attachment::Specifier { .. } => rules::specify(core, unit.element, unit.head_type),
                _ => rules::compound(core, unit.element, unit.position < token.index, shared),
            };
            shape = if case_marker {
                Shape::CaseMarked
            } else {
                Shape::Modified
            };
        }

        for (child, attachment, unit) in late {
            let shared = rules::shared_entity(head_entity, self.entity(unit.position));
            core = match attachment {
                Attachment::Possessor => {
                    let case_marked = unit.shape == Shape::CaseMarked;
                    rules::possess(core, unit.element, case_marked)
                }
                Attachment::Apposition => {
                    let punct = self.apposition_punct(node, child);
                    rules::apposition(core, unit.into_argument(), punct, shared)
                }
                Attachment::RelativeClause => rules::relative_clause(core, unit.into_argument(), shared),
                Attachment::Complement => rules::complement(core, unit.into_argument(), shared),
                Attachment::NominalPreposition => match rules::nominal_preposition(core, unit.element) {
                    Ok(built) => built,
                    Err((head, child)) => rules::group(head, vec![child]),
                },
                Attachment::Object => rules::object(core, head_type, unit.into_argument()),
                _ => rules::group(core, vec![unit.into_argument()]),
            };
            shape = Shape::Grouped;
        }

        if !arguments.is_empty() {
            core = match copula {
                Some(cop) => {
                    let mut head = Some(core);
                    let args = arguments
                        .into_iter()
                        .filter_map(|a| match a.unit {
                            Some(unit) => Some(unit.into_argument()),
                            None => head.take(),
                        })
                        .collect();
                    rules::relation(with_roles(cop.element, &roles), args)
                }
                None => {
                    let args = arguments
                        .into_iter()
                        .filter_map(|a| a.unit.map(Unit::into_argument))
                        .collect();
                    rules::relation(core, args)
                }
            };
            shape = Shape::Relation;
        } else if !generics.is_empty() {
            core = rules::group(core, generics.into_iter().map(Unit::into_argument).collect());
            shape = Shape::Grouped;
        }

        let mut unit = Unit {
            element: core,
            head_type,
            shape,
            position: token.index,
            coordinators: Vec::new(),
        };

        for marker in markers {
            let element = rules::mark(unit.wrap_bare(), marker.into_argument());
            unit = Unit {
                element,
                head_type,
                shape: Shape::Grouped,
                position: token.index,
                coordinators: Vec::new(),
            };
        }

        for conjunct in &mut conjuncts {
            coordinators.append(&mut conjunct.coordinators);
        }
        if conjuncts.is_empty() {
            unit.coordinators = coordinators;
            return unit;
        }
        self.coordinate(unit, conjuncts, coordinators)
    }

    /// Join a head with its conjuncts. Nested coordinations are flattened;
    /// the first explicit coordinator becomes the connector.
    fn coordinate(&self, head: Unit, conjuncts: Vec<Unit>, coordinators: Vec<Unit>) -> Unit {
        let head_type = head.head_type;
        let position = head.position;
        let mut links: Vec<(u32, Element)> = coordinators
            .into_iter()
            .map(|c| (c.position, c.into_argument()))
            .collect();

        let mut members: Vec<(u32, Element)> = Vec::new();
        let head_element = head.into_argument();
        members.push((anchor(&head_element, position), head_element));

        for conjunct in conjuncts {
            let conjunct_position = conjunct.position;
            match conjunct.element {
                Element::Edge(edge) if conjunct.shape == Shape::Coordination => {
                    let mut elements = edge.into_elements().into_iter();
                    if let Some(connector) = elements.next() {
                        if let Some(&first) = connector.tokens().first() {
                            links.push((first, connector));
                        }
                    }
                    for element in elements {
                        members.push((anchor(&element, conjunct_position), element));
                    }
                }
                element => {
                    let unit = Unit { element, ..conjunct };
                    let element = unit.into_argument();
                    members.push((anchor(&element, conjunct_position), element));
                }
            }
        }
        members.sort_by_key(|(anchor, _)| *anchor);
        links.sort_by_key(|(position, _)| *position);

        let mut links = links.into_iter();
        let connector = match links.next() {
            Some((_, connector)) => connector,
            None => rules::implicit_coordinator(self.common_entity(&members)),
        };
        let dropped = links.count();
        if dropped > 0 {
            trace!(sentence = %self.sentence.id, dropped, "extra coordinators dropped");
        }

        Unit {
            element: rules::coordinate(connector, members.into_iter().map(|(_, e)| e).collect()),
            head_type,
            shape: Shape::Coordination,
            position,
            coordinators: Vec::new(),
        }
    }

    /// Entity shared by every conjunct's anchor token.
    fn common_entity(&self, members: &[(u32, Element)]) -> Option<EntityType> {
        let mut anchors = members.iter().map(|(anchor, _)| self.entity(*anchor));
        let first = anchors.next().flatten()?;
        anchors
            .all(|e| e == Some(first))
            .then(|| first.clone())
    }

    fn type_node(&self, node: NodeId) -> Atom {
        let sentence = self.sentence;
        let token = &sentence.tokens[node];
        let anchor = self.typing_anchor(node);
        let head = self.tree.head(anchor);
        let final_punct = match self.relations[node].as_str() {
            "cop" => self.tree.head(node).and_then(|h| self.final_punct(h)),
            _ => self.final_punct(node),
        };
        let ctx = LeafContext {
            token,
            relation: &self.relations[anchor],
            head: head.map(|h| &sentence.tokens[h]),
            head_relation: head.map(|h| self.relations[h].as_str()),
            final_punct,
            entity: self.mentions.entity_at(token.index),
            role_under_head: self
                .tree
                .head(node)
                .and_then(|h| self.bindings.get(&(h, node)).copied()),
            frame_predicate: self.frame_predicates.contains(&node),
        };
        type_leaf(&ctx, self.policy)
    }

    /// Node whose relation and head type a token. A conjunct with the same
    /// XPOS as its first conjunct is typed in that conjunct's position.
    fn typing_anchor(&self, node: NodeId) -> NodeId {
        if self.relations[node] != "conj" {
            return node;
        }
        let mut first = node;
        while self.relations[first] == "conj" {
            match self.tree.head(first) {
                Some(head) => first = head,
                None => break,
            }
        }
        if self.sentence.tokens[first].xpos == self.sentence.tokens[node].xpos {
            first
        } else {
            node
        }
    }

    /// Last sentence-level punctuation among a node's right children.
    fn final_punct(&self, node: NodeId) -> Option<&'a str> {
        let sentence = self.sentence;
        let index = sentence.tokens[node].index;
        self.tree
            .children(node)
            .iter()
            .rev()
            .map(|&c| &sentence.tokens[c])
            .filter(|t| t.index > index && t.is_punct())
            .map(|t| t.word.as_str())
            .find(|w| matches!(*w, "." | "," | ";" | ":" | "?" | "!"))
    }

    /// Separator between a head and its apposition.
    fn apposition_punct(&self, head: NodeId, child: NodeId) -> &'static str {
        let (from, to) = if head < child { (head, child) } else { (child, head) };
        self.sentence.tokens[from + 1..to]
            .iter()
            .filter(|t| t.is_punct())
            .find_map(|t| match t.word.as_str() {
                "," => Some("c"),
                "(" | ")" | "[" | "]" | "-LRB-" | "-RRB-" => Some("b"),
                "\"" | "'" | "``" | "''" | "“" | "”" => Some("q"),
                _ => None,
            })
            .unwrap_or("n")
    }
}

/// Leftmost token of an element, or the fallback for token-less elements.
fn anchor(element: &Element, fallback: u32) -> u32 {
    element.tokens().first().copied().unwrap_or(fallback)
}

fn with_roles(element: Element, roles: &str) -> Element {
    match element {
        Element::Atom(atom) => Element::Atom(atom.with_roles(roles)),
        edge => edge,
    }
}

/// Dependency role codes, then SRL codes after `:` when any argument has one.
fn role_string(arguments: &[Argument]) -> String {
    let mut roles: String = arguments.iter().map(|a| a.dep).collect();
    if arguments.iter().any(|a| a.srl.is_some()) {
        roles.push(':');
        roles.extend(arguments.iter().map(|a| a.srl.unwrap_or('-')));
    }
    roles
}
