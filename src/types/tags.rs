//! Tag vocabularies for the optional annotation layers.
//!
//! ## Layers
//!
//! | Layer | Tag shape | Decoded as |
//! |-------|-----------|------------|
//! | NER | `B-PERSON`, `I-ORG` | [`EntityType`] |
//! | SRL | `B-ARG0`, `I-ARGM-TMP`, `B-R-ARG1`, `B-V` | [`SrlRole`] |
//! | Coreference | `B-MAIN1`, `I-REF1` | [`CorefMarker`] |
//!
//! All layers share the BIO prefix handled by [`BioTag`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder values meaning "no annotation".
pub const PLACEHOLDERS: &[&str] = &["", "-", "_", "O"];

/// Whether a raw column value is a placeholder.
pub fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS.contains(&value.trim())
}

/// Position of a token within a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BioPrefix {
    /// First token of a span.
    Begin,
    /// Continuation token.
    Inside,
}

/// A decoded BIO tag: prefix plus layer-specific label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BioTag {
    /// Begin or inside.
    pub prefix: BioPrefix,
    /// Label after the prefix (`PERSON`, `ARG0`, `MAIN1`).
    pub label: String,
}

impl BioTag {
    /// Parse a raw tag. Placeholders and unprefixed labels are outside tags
    /// and yield `None`.
    ///
    /// `S-`/`U-` (single) prefixes read as `B-`; `E-`/`L-` (end) read as `I-`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if is_placeholder(raw) {
            return None;
        }
        let (prefix, label) = raw.split_once('-')?;
        let prefix = match prefix {
            "B" | "S" | "U" => BioPrefix::Begin,
            "I" | "E" | "L" => BioPrefix::Inside,
            _ => return None,
        };
        if label.is_empty() {
            return None;
        }
        Some(Self {
            prefix,
            label: label.to_string(),
        })
    }

    /// Whether this tag opens a span.
    pub fn is_begin(&self) -> bool {
        self.prefix == BioPrefix::Begin
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Named entities
// ─────────────────────────────────────────────────────────────────────────────

/// Named-entity type (OntoNotes inventory plus CoNLL aliases).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// Cardinal number.
    Cardinal,
    /// Date.
    Date,
    /// Named event.
    Event,
    /// Facility.
    Facility,
    /// Geo-political entity.
    Gpe,
    /// Language.
    Language,
    /// Law.
    Law,
    /// Location.
    Location,
    /// Money.
    Money,
    /// Nationality, religious or political group.
    Norp,
    /// Ordinal.
    Ordinal,
    /// Organization.
    Organization,
    /// Percentage.
    Percent,
    /// Person.
    Person,
    /// Product.
    Product,
    /// Quantity.
    Quantity,
    /// Time.
    Time,
    /// Work of art.
    WorkOfArt,
    /// Any other label, kept verbatim.
    Other(String),
}

impl EntityType {
    /// Decode a NER label.
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "CARDINAL" => Self::Cardinal,
            "DATE" => Self::Date,
            "EVENT" => Self::Event,
            "FAC" => Self::Facility,
            "GPE" => Self::Gpe,
            "LANGUAGE" => Self::Language,
            "LAW" => Self::Law,
            "LOC" => Self::Location,
            "MONEY" => Self::Money,
            "NORP" => Self::Norp,
            "ORDINAL" => Self::Ordinal,
            "ORG" => Self::Organization,
            "PERCENT" => Self::Percent,
            "PERSON" | "PER" => Self::Person,
            "PRODUCT" => Self::Product,
            "QUANTITY" => Self::Quantity,
            "TIME" => Self::Time,
            "WORK_OF_ART" => Self::WorkOfArt,
            other => Self::Other(other.to_string()),
        }
    }

    /// Single-character code used in atom notation.
    pub fn code(&self) -> &str {
        match self {
            Self::Cardinal => "c",
            Self::Date => "d",
            Self::Event => "e",
            Self::Facility => "f",
            Self::Gpe => "g",
            Self::Language => "u",
            Self::Law => "w",
            Self::Location => "l",
            Self::Money => "$",
            Self::Norp => "n",
            Self::Ordinal => "#",
            Self::Organization => "o",
            Self::Percent => "%",
            Self::Person => "p",
            Self::Product => "r",
            Self::Quantity => "q",
            Self::Time => "t",
            Self::WorkOfArt => "a",
            Self::Other(_) => "x",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Cardinal => "CARDINAL",
            Self::Date => "DATE",
            Self::Event => "EVENT",
            Self::Facility => "FAC",
            Self::Gpe => "GPE",
            Self::Language => "LANGUAGE",
            Self::Law => "LAW",
            Self::Location => "LOC",
            Self::Money => "MONEY",
            Self::Norp => "NORP",
            Self::Ordinal => "ORDINAL",
            Self::Organization => "ORG",
            Self::Percent => "PERCENT",
            Self::Person => "PERSON",
            Self::Product => "PRODUCT",
            Self::Quantity => "QUANTITY",
            Self::Time => "TIME",
            Self::WorkOfArt => "WORK_OF_ART",
            Self::Other(label) => label,
        };
        write!(f, "{}", label)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Semantic roles
// ─────────────────────────────────────────────────────────────────────────────

/// Argument category of an SRL label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SrlArgument {
    /// The frame's predicate (`V`).
    Predicate,
    /// Numbered core argument (`ARG0`..`ARG6`, also `ARGA`).
    Core(u8),
    /// Adjunct (`ARGM-TMP` keeps `TMP`).
    Adjunct(String),
}

/// A decoded SRL label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SrlRole {
    /// Argument category.
    pub argument: SrlArgument,
    /// `R-` reference prefix.
    pub reference: bool,
    /// `C-` continuation prefix.
    pub continuation: bool,
}

impl SrlRole {
    /// Parse a label without its BIO prefix (`ARG0`, `R-ARG1`, `ARGM-LOC`, `V`).
    pub fn parse(label: &str) -> Option<Self> {
        let mut rest = label.trim();
        let mut reference = false;
        let mut continuation = false;
        if let Some(stripped) = rest.strip_prefix("R-") {
            reference = true;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("C-") {
            continuation = true;
            rest = stripped;
        }

        let argument = if rest == "V" {
            SrlArgument::Predicate
        } else if let Some(adjunct) = rest.strip_prefix("ARGM-") {
            SrlArgument::Adjunct(adjunct.to_string())
        } else if let Some(core) = rest.strip_prefix("ARG") {
            let head = core.split('-').next().unwrap_or(core);
            match head {
                "A" => SrlArgument::Core(0),
                digits => SrlArgument::Core(digits.parse().ok()?),
            }
        } else {
            return None;
        };

        Some(Self {
            argument,
            reference,
            continuation,
        })
    }

    /// Whether this label marks the predicate itself.
    pub fn is_predicate(&self) -> bool {
        self.argument == SrlArgument::Predicate
    }

    /// Core argument slot, if numbered.
    pub fn slot(&self) -> Option<u8> {
        match self.argument {
            SrlArgument::Core(n) => Some(n),
            _ => None,
        }
    }

    /// Single-character role code used in predicate roles.
    pub fn code(&self) -> char {
        match &self.argument {
            SrlArgument::Predicate => 'v',
            SrlArgument::Core(n) => char::from_digit(u32::from(*n), 10).unwrap_or('?'),
            SrlArgument::Adjunct(kind) => match kind.as_str() {
                "ADJ" => 'a',
                "ADV" => 'r',
                "CAU" => 'c',
                "COM" => 'o',
                "DIR" => 'd',
                "DIS" => 's',
                "EXT" => 'e',
                "GOL" => 'g',
                "LOC" => 'l',
                "LVB" => 'b',
                "MNR" => 'm',
                "MOD" => 'f',
                "NEG" => 'n',
                "PNC" => 'p',
                "PRD" => 'h',
                "PRP" => 'i',
                "PRR" => 'k',
                "TMP" => 't',
                _ => '?',
            },
        }
    }
}

impl fmt::Display for SrlRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reference {
            write!(f, "R-")?;
        }
        if self.continuation {
            write!(f, "C-")?;
        }
        match &self.argument {
            SrlArgument::Predicate => write!(f, "V"),
            SrlArgument::Core(n) => write!(f, "ARG{}", n),
            SrlArgument::Adjunct(kind) => write!(f, "ARGM-{}", kind),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Coreference
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier of a coreference chain within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(u32);

impl ChainId {
    /// Create a new ChainId.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the numeric value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the annotator marked a coreference mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    /// `MAIN<n>`: annotator's main mention.
    Main,
    /// `REF<n>` or bare `<n>`: a reference to the chain.
    Reference,
}

/// A decoded coreference label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorefMarker {
    /// Main or reference.
    pub kind: MarkerKind,
    /// Chain this mention belongs to.
    pub chain: ChainId,
}

impl CorefMarker {
    /// Parse a label without its BIO prefix (`MAIN1`, `REF12`, `7`).
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        let (kind, digits) = if let Some(rest) = label.strip_prefix("MAIN") {
            (MarkerKind::Main, rest)
        } else if let Some(rest) = label.strip_prefix("REF") {
            (MarkerKind::Reference, rest)
        } else {
            (MarkerKind::Reference, label)
        };
        let chain = digits.parse().ok().map(ChainId::new)?;
        Some(Self { kind, chain })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dependency labels
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize a dependency label to the ClearNLP-style inventory the
/// composer works with. Universal Dependencies labels are mapped onto their
/// closest counterpart; unknown subtypes fall back to the base label.
pub fn normalize_dependency(label: &str) -> String {
    let label = label.trim().to_ascii_lowercase();
    let mapped = match label.as_str() {
        "root" => "root",
        "obj" => "dobj",
        "iobj" => "dative",
        "nsubj:pass" => "nsubjpass",
        "csubj:pass" => "csubjpass",
        "aux:pass" => "auxpass",
        "nmod:poss" => "poss",
        "compound:prt" => "prt",
        "acl:relcl" => "relcl",
        "obl:agent" => "agent",
        "det:predet" => "predet",
        "flat" | "flat:name" | "fixed" => "compound",
        "nmod:tmod" | "nmod:npmod" | "obl:tmod" | "obl:npmod" => "npadvmod",
        "nummod:gov" => "nummod",
        other => other.split(':').next().unwrap_or(other),
    };
    mapped.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bio_parse() {
        let tag = BioTag::parse("B-PERSON").unwrap();
        assert!(tag.is_begin());
        assert_eq!(tag.label, "PERSON");

        let tag = BioTag::parse("I-ARGM-TMP").unwrap();
        assert_eq!(tag.prefix, BioPrefix::Inside);
        assert_eq!(tag.label, "ARGM-TMP");

        assert!(BioTag::parse("O").is_none());
        assert!(BioTag::parse("_").is_none());
        assert!(BioTag::parse("PERSON").is_none());
        assert!(BioTag::parse("B-").is_none());
    }

    #[test]
    fn test_srl_role_parse() {
        let role = SrlRole::parse("ARG0").unwrap();
        assert_eq!(role.slot(), Some(0));
        assert_eq!(role.code(), '0');

        let role = SrlRole::parse("R-ARG1").unwrap();
        assert!(role.reference);
        assert_eq!(role.slot(), Some(1));

        let role = SrlRole::parse("ARGM-TMP").unwrap();
        assert_eq!(role.code(), 't');
        assert_eq!(role.slot(), None);

        assert!(SrlRole::parse("V").unwrap().is_predicate());
        assert!(SrlRole::parse("NOPE").is_none());
        assert_eq!(SrlRole::parse("C-ARGM-LOC").unwrap().to_string(), "C-ARGM-LOC");
    }

    #[test]
    fn test_coref_marker_parse() {
        let m = CorefMarker::parse("MAIN12").unwrap();
        assert_eq!(m.kind, MarkerKind::Main);
        assert_eq!(m.chain, ChainId::new(12));
        assert_eq!(CorefMarker::parse("REF3").unwrap().kind, MarkerKind::Reference);
        assert_eq!(CorefMarker::parse("4").unwrap().chain, ChainId::new(4));
        assert!(CorefMarker::parse("MAIN").is_none());
    }

    #[test]
    fn test_entity_codes() {
        assert_eq!(EntityType::from_label("PER"), EntityType::Person);
        assert_eq!(EntityType::from_label("ORG").code(), "o");
        assert_eq!(EntityType::from_label("MISC").to_string(), "MISC");
    }

    #[test]
    fn test_normalize_dependency() {
        assert_eq!(normalize_dependency("obj"), "dobj");
        assert_eq!(normalize_dependency("nsubj:pass"), "nsubjpass");
        assert_eq!(normalize_dependency("ROOT"), "root");
        assert_eq!(normalize_dependency("obl:arg"), "obl");
        assert_eq!(normalize_dependency("nsubj"), "nsubj");
    }
}
