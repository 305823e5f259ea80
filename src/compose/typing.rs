//! Leaf typing: one atom per token.
//!
//! The atom type comes from the token's part of speech, refined by its
//! dependency relation (a `det` becomes `Md`, an `aux` becomes `Mv`, a
//! nominal preposition becomes `Br`). Optional layers then refine it:
//! entity membership attaches an entity type, a predicate sense or an SRL
//! `V` tag upgrades the token to a predicate, and a word sense rides along
//! as metadata.
//!
//! Concepts and modifiers that attach tightly to their head (determiners,
//! auxiliaries, compounds, nominal adverbs) carry a directional role: `<`
//! before the head, `>` after it.

use std::cmp::Ordering;

use crate::policy::{CompilePolicy, LabelSource};
use crate::types::{Atom, AtomType, EntityType, PosClass, SrlArgument, SrlRole, Token};

/// Everything typing needs to know about one token.
pub(crate) struct LeafContext<'a> {
    pub token: &'a Token,
    /// Normalized relation used for typing. For a conjunct sharing its
    /// first conjunct's XPOS this is the first conjunct's relation.
    pub relation: &'a str,
    /// Head used for typing, `None` at the root.
    pub head: Option<&'a Token>,
    /// Normalized relation of that head.
    pub head_relation: Option<&'a str>,
    /// Last punctuation token among the predicate's right children.
    pub final_punct: Option<&'a str>,
    /// Entity type of the entity span covering the token.
    pub entity: Option<&'a EntityType>,
    /// SRL role of the span this token roots, relative to its head.
    pub role_under_head: Option<&'a SrlRole>,
    /// Whether an SRL frame names this token as its predicate.
    pub frame_predicate: bool,
}

/// Type a token into an atom. Argument roles are added later by the
/// relation rule.
pub(crate) fn type_leaf(ctx: &LeafContext<'_>, policy: &CompilePolicy) -> Atom {
    let token = ctx.token;
    let (mut atom_type, mut subtype, mut roles) = base_type(ctx);

    let has_sense = policy.use_srl && token.predicate_sense.is_some();
    let is_auxiliary = matches!(ctx.relation, "aux" | "auxpass");
    if (has_sense || (policy.use_srl && ctx.frame_predicate))
        && atom_type != AtomType::Predicate
        && !is_auxiliary
    {
        atom_type = AtomType::Predicate;
        subtype = predicate_subtype(ctx.final_punct).to_string();
        roles = "";
    }

    let roles = match atom_type {
        AtomType::Concept | AtomType::Modifier if roles.is_empty() => direction(ctx),
        _ => roles,
    };

    let morph = match atom_type {
        AtomType::Predicate => verb_features(&token.xpos),
        AtomType::Concept | AtomType::Modifier => concept_features(&token.xpos).to_string(),
        _ => String::new(),
    };

    let entity = if policy.use_entities {
        ctx.entity.cloned()
    } else {
        None
    };

    Atom::new(label(token, policy.label_source), atom_type)
        .with_subtype(subtype)
        .with_roles(roles)
        .with_morph(morph)
        .with_entity(entity)
        .with_word_sense(token.word_sense.clone())
        .with_predicate_sense(if policy.use_srl {
            token.predicate_sense.clone()
        } else {
            None
        })
        .with_token(token.index)
}

fn label(token: &Token, source: LabelSource) -> String {
    match source {
        LabelSource::Surface => token.word.to_lowercase(),
        LabelSource::Lemma => token
            .lemma
            .clone()
            .unwrap_or_else(|| token.word.to_lowercase()),
        LabelSource::Sense => token
            .word_sense
            .clone()
            .unwrap_or_else(|| token.word.to_lowercase()),
    }
}

/// Type, subtype and fixed roles from relation and part of speech.
fn base_type(ctx: &LeafContext<'_>) -> (AtomType, String, &'static str) {
    use AtomType::*;

    let token = ctx.token;
    let xpos = token.xpos.as_str();
    let pos = token.pos();
    let head_verbal = ctx.head.is_some_and(|h| h.pos().is_verbal() || h.xpos == "MD");
    let trigger = || (Trigger, trigger_subtype(ctx.role_under_head).to_string(), "");
    let typed = |t: AtomType, s: &str| (t, s.to_string(), "");

    match ctx.relation {
        "amod" => match xpos {
            "JJR" => return typed(Modifier, "c"),
            "JJS" => return typed(Modifier, "s"),
            _ => return typed(Modifier, "a"),
        },
        "nummod" => return typed(Modifier, "#"),
        "nmod" if !pos.is_nominal() => return typed(Modifier, ""),
        "det" => return typed(Modifier, if xpos == "WDT" { "w" } else { "d" }),
        "neg" => return typed(Modifier, "n"),
        "aux" | "auxpass" => {
            let sub = match xpos {
                "TO" => "i",
                "MD" => "m",
                _ => "v",
            };
            return typed(Modifier, sub);
        }
        "advmod" if is_negation(token) => return typed(Modifier, "n"),
        "advmod" => return typed(Modifier, adverb_subtype(xpos)),
        "predet" | "quantmod" => return typed(Modifier, ""),
        "prt" => return (Modifier, "l".to_string(), "r"),
        "expl" => return typed(Modifier, "e"),
        "npadvmod" if matches!(ctx.head_relation, Some("mark" | "prep")) => {
            return typed(Modifier, "")
        }
        "cc" | "preconj" => return typed(Conjunction, ""),
        "poss" => match xpos {
            "PRP$" | "WP$" => return typed(Modifier, "p"),
            "PRP" => return typed(Concept, "i"),
            _ if !matches!(pos, PosClass::Noun | PosClass::ProperNoun) => {
                return typed(Modifier, "p")
            }
            _ => {}
        },
        "case" => {
            return if pos == PosClass::Particle || xpos == "POS" {
                typed(Builder, "p")
            } else {
                trigger()
            }
        }
        "agent" | "mark" => return trigger(),
        "prep" => {
            let nominal_head = !head_verbal && ctx.head_relation != Some("prep");
            return if nominal_head { typed(Builder, "r") } else { trigger() };
        }
        "acomp" => return typed(Concept, "a"),
        "cop" => return typed(Predicate, predicate_subtype(ctx.final_punct)),
        _ => {}
    }

    match pos {
        PosClass::Noun => typed(Concept, "c"),
        PosClass::ProperNoun => typed(Concept, "p"),
        PosClass::Pronoun => typed(Concept, if xpos.starts_with('W') { "w" } else { "i" }),
        PosClass::Numeral => typed(Concept, "#"),
        PosClass::Determiner => typed(Concept, "d"),
        PosClass::Adjective => typed(Modifier, ""),
        PosClass::Adposition | PosClass::SubordinatingConjunction => trigger(),
        PosClass::CoordinatingConjunction => typed(Conjunction, ""),
        PosClass::Verb | PosClass::Auxiliary => typed(Predicate, predicate_subtype(ctx.final_punct)),
        _ if xpos == "MD" => typed(Predicate, predicate_subtype(ctx.final_punct)),
        _ => typed(Concept, ""),
    }
}

/// Directional role of a dependent bound tightly to its head.
fn direction(ctx: &LeafContext<'_>) -> &'static str {
    let token = ctx.token;
    let Some(head) = ctx.head else { return "" };
    let relation = token.relation();
    // a conjunct typed in its first conjunct's position has no head of its own here
    if relation != ctx.relation {
        return "";
    }
    let head_verbal = head.pos().is_verbal() || head.xpos == "MD";
    let tight = matches!(
        relation.as_str(),
        "case" | "det" | "predet" | "amod" | "nummod" | "nmod" | "quantmod" | "compound" | "aux" | "auxpass"
            | "prt" | "neg"
    );
    let bound = (tight && ctx.head_relation != Some("prep"))
        || (matches!(relation.as_str(), "advmod" | "npadvmod") && !head_verbal)
        || (token.upos == "X" && head.upos == "X");
    if !bound {
        return "";
    }
    match token.index.cmp(&head.index) {
        Ordering::Less => "<",
        Ordering::Greater => ">",
        Ordering::Equal => "",
    }
}

pub(crate) fn is_negation(token: &Token) -> bool {
    matches!(token.word.to_lowercase().as_str(), "not" | "n't" | "never")
}

fn adverb_subtype(xpos: &str) -> &'static str {
    match xpos {
        "RBR" => "=",
        "RBS" => "^",
        "WRB" => "w",
        _ => "",
    }
}

/// Trigger subtype from the adjunct role of the span it introduces.
fn trigger_subtype(role: Option<&SrlRole>) -> &'static str {
    match role.map(|r| &r.argument) {
        Some(SrlArgument::Adjunct(kind)) if kind == "TMP" => "t",
        Some(SrlArgument::Adjunct(kind)) if kind == "LOC" => "l",
        _ => "",
    }
}

/// Predicate subtype from sentence-final punctuation.
pub(crate) fn predicate_subtype(final_punct: Option<&str>) -> &'static str {
    match final_punct {
        Some("?") => "?",
        Some("!") => "!",
        Some(p) if p.len() == 1 && ".,;:".contains(p) => "d",
        _ => "",
    }
}

/// Verb morphology from the Penn XPOS: tense, form, aspect, person, number.
fn verb_features(xpos: &str) -> String {
    let (tense, form, aspect, person, number) = match xpos {
        "VB" => ('-', 'i', '-', '-', '-'),
        "VBD" => ('<', 'f', '-', '-', '-'),
        "VBG" => ('|', 'p', 'g', '-', '-'),
        "VBN" => ('<', 'p', 'f', '-', '-'),
        "VBP" => ('|', 'f', '-', '-', '-'),
        "VBZ" => ('|', 'f', '-', '3', 's'),
        _ => ('-', '-', '-', '-', '-'),
    };
    // tense, form, aspect, mood, person, number, verb type
    let features: String = [tense, form, aspect, '-', person, number, '-'].iter().collect();
    features.trim_end_matches('-').to_string()
}

/// Noun number from the Penn XPOS.
fn concept_features(xpos: &str) -> &'static str {
    if !xpos.starts_with("NN") {
        ""
    } else if xpos.ends_with('S') {
        "p"
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SentenceId;

    fn token(word: &str, upos: &str, xpos: &str, dep: &str) -> Token {
        Token::new(SentenceId::new(0), 0, word, upos, xpos, dep, 1)
    }

    fn atom_for(tok: &Token, head: Option<&Token>, policy: &CompilePolicy) -> Atom {
        let relation = tok.relation();
        let head_relation = head.map(|h| h.relation());
        let ctx = LeafContext {
            token: tok,
            relation: &relation,
            head,
            head_relation: head_relation.as_deref(),
            final_punct: Some("."),
            entity: None,
            role_under_head: None,
            frame_predicate: false,
        };
        type_leaf(&ctx, policy)
    }

    #[test]
    fn test_relation_refines_pos() {
        let policy = CompilePolicy::default();
        let verb = token("knew", "VERB", "VBD", "ROOT");
        let noun = token("plans", "NOUN", "NNS", "pobj");

        assert_eq!(atom_for(&token("the", "DET", "DT", "det"), Some(&noun), &policy).to_string(), "the/Md");
        assert_eq!(atom_for(&token("did", "AUX", "VBD", "aux"), Some(&verb), &policy).to_string(), "did/Mv");
        assert_eq!(atom_for(&token("to", "PART", "TO", "aux"), Some(&verb), &policy).to_string(), "to/Mi");
        assert_eq!(atom_for(&token("'s", "PART", "POS", "case"), Some(&noun), &policy).to_string(), "'s/Bp");
        assert_eq!(atom_for(&token("of", "ADP", "IN", "prep"), Some(&noun), &policy).to_string(), "of/Br");
        assert_eq!(atom_for(&token("about", "ADP", "IN", "prep"), Some(&verb), &policy).to_string(), "about/T");
        assert_eq!(atom_for(&token("but", "CCONJ", "CC", "cc"), Some(&verb), &policy).to_string(), "but/J");
        assert_eq!(atom_for(&token("not", "PART", "RB", "neg"), Some(&verb), &policy).to_string(), "not/Mn");
    }

    #[test]
    fn test_pos_fallbacks_and_morphology() {
        let policy = CompilePolicy::default();
        assert_eq!(atom_for(&token("IBM", "PROPN", "NNP", "poss"), None, &policy).to_string(), "ibm/Cp..s");
        assert_eq!(atom_for(&token("plans", "NOUN", "NNS", "pobj"), None, &policy).to_string(), "plans/Cc..p");
        assert_eq!(atom_for(&token("he", "PRON", "PRP", "nsubj"), None, &policy).to_string(), "he/Ci");
        assert_eq!(atom_for(&token("who", "PRON", "WP", "nsubj"), None, &policy).to_string(), "who/Cw");
        assert_eq!(atom_for(&token("knew", "VERB", "VBD", "ROOT"), None, &policy).to_string(), "knew/Pd..<f");
        assert_eq!(atom_for(&token("talk", "VERB", "VB", "conj"), None, &policy).to_string(), "talk/Pd..-i");
        assert_eq!(atom_for(&token("runs", "VERB", "VBZ", "ROOT"), None, &policy).to_string(), "runs/Pd..|f--3s");
    }

    #[test]
    fn test_predicate_sense_upgrades_but_not_auxiliaries() {
        let policy = CompilePolicy::default();
        let noun = token("plan", "NOUN", "NN", "dobj").with_predicate_sense("plan.01");
        assert_eq!(atom_for(&noun, None, &policy).atom_type(), AtomType::Predicate);

        let aux = token("has", "AUX", "VBZ", "aux").with_predicate_sense("have.01");
        assert_eq!(atom_for(&aux, None, &policy).atom_type(), AtomType::Modifier);

        let no_srl = CompilePolicy {
            use_srl: false,
            ..CompilePolicy::default()
        };
        let atom = atom_for(&noun, None, &no_srl);
        assert_eq!(atom.atom_type(), AtomType::Concept);
        assert!(atom.predicate_sense().is_none());
    }

    #[test]
    fn test_label_sources() {
        let tok = token("Plans", "NOUN", "NNS", "dobj")
            .with_lemma("plan")
            .with_word_sense("plan.n.01");
        let mut policy = CompilePolicy::default();
        assert_eq!(atom_for(&tok, None, &policy).label(), "plans");
        policy.label_source = LabelSource::Lemma;
        assert_eq!(atom_for(&tok, None, &policy).label(), "plan");
        policy.label_source = LabelSource::Sense;
        let atom = atom_for(&tok, None, &policy);
        assert_eq!(atom.label(), "plan.n.01");
        assert_eq!(atom.word_sense(), Some("plan.n.01"));
    }

    #[test]
    fn test_directional_roles() {
        let policy = CompilePolicy::default();
        let at = |i: u32, word: &str, upos: &str, xpos: &str, dep: &str, head: u32| {
            Token::new(SentenceId::new(0), i, word, upos, xpos, dep, head)
        };
        let dog = at(2, "dog", "NOUN", "NN", "dobj", 1);
        let saw = at(1, "saw", "VERB", "VBD", "ROOT", 1);

        let the = at(1, "the", "DET", "DT", "det", 2);
        assert_eq!(atom_for(&the, Some(&dog), &policy).to_string(), "the/Md.<");
        let here = at(3, "here", "ADV", "RB", "advmod", 2);
        assert_eq!(atom_for(&here, Some(&dog), &policy).to_string(), "here/M.>");
        let city = at(1, "city", "NOUN", "NN", "compound", 2);
        assert_eq!(atom_for(&city, Some(&dog), &policy).to_string(), "city/Cc.<.s");

        // adverbs of verbs and dependents of prepositional heads stay unmarked
        let quickly = at(0, "quickly", "ADV", "RB", "advmod", 1);
        assert_eq!(atom_for(&quickly, Some(&saw), &policy).to_string(), "quickly/M");
        let object = at(2, "plans", "NOUN", "NNS", "prep", 1);
        assert_eq!(atom_for(&the, Some(&object), &policy).to_string(), "the/Md");
        // arguments never carry one
        let subject = at(0, "dogs", "NOUN", "NNS", "nsubj", 1);
        assert_eq!(atom_for(&subject, Some(&saw), &policy).to_string(), "dogs/Cc..p");
    }

    #[test]
    fn test_predicate_subtype() {
        assert_eq!(predicate_subtype(Some("?")), "?");
        assert_eq!(predicate_subtype(Some("!")), "!");
        assert_eq!(predicate_subtype(Some(".")), "d");
        assert_eq!(predicate_subtype(None), "");
    }
}
