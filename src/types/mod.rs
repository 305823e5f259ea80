//! Core types for the hypergraph compiler.

pub mod token;
pub mod tags;
pub mod mention;
pub mod hyperedge;
pub mod report;

pub use token::{SentenceId, Sentence, Token, PosClass};
pub use tags::{
    BioTag, BioPrefix, EntityType, SrlRole, SrlArgument, ChainId, CorefMarker, MarkerKind,
    normalize_dependency, is_placeholder,
};
pub use mention::{Span, Layer, Mention, MentionLabel};
pub use hyperedge::{Atom, AtomType, EdgeType, Element, Hyperedge, Coverage, encode_label};
pub use report::{
    Severity, DiagnosticKind, Diagnostic, SentenceStatus, SentenceOutcome, DocumentReport,
};
