//! # semhyp-kernel
//!
//! Deterministic compilation of multi-layer linguistic annotations into
//! semantic hypergraphs.
//!
//! The kernel answers one question:
//!
//! > Given a token table with dependency, entity, SRL and coreference
//! > layers, what is **the** hypergraph of each sentence?
//!
//! ## Core Contract
//!
//! 1. Parse the annotation table, dropping malformed rows with a diagnostic
//! 2. Compose one typed hyperedge per sentence from its dependency tree,
//!    using the optional layers for typing and argument order
//! 3. Link coreferent elements across sentences without rewriting them
//! 4. Export a stable, serializable document with a fingerprint
//!
//! ## Architecture
//!
//! ```text
//! AnnotationTable → spans → DependencyTree → compose → SentenceHypergraph
//!                                                         ↓
//!                          DocumentHypergraph ← assemble ← coref
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same table + same policy → identical hypergraph and fingerprint
//! - Argument ordering is canonical (slot, then surface position)
//! - Element ids depend on structure only (sentence id + child path)
//!
//! ## Example
//!
//! ```rust
//! use semhyp_kernel::{CompilePolicy, HypergraphCompiler};
//!
//! let table = "0\t0\tDogs\t+\tdog\tNOUN\tNNS\tnsubj\t1\n0\t1\tbark\t-\tbark\tVERB\tVBP\tROOT\t1\n";
//! let document = HypergraphCompiler::new(CompilePolicy::default()).compile_str(table);
//! assert_eq!(document.hypergraph.sentences[0].root.to_string(), "(bark/P.s.|f dogs/Cc..p)");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod table;
pub mod spans;
pub mod tree;
pub mod compose;
pub mod coref;
pub mod assembler;
pub mod policy;
pub mod compiler;
pub mod cache;
pub mod canonical;
pub mod canonical_content;

// Re-exports
pub use types::{
    Atom, AtomType, EdgeType, Element, Hyperedge, Sentence, SentenceId, Token, Span, Layer, ChainId,
    Diagnostic, DiagnosticKind, Severity, SentenceStatus, SentenceOutcome, DocumentReport,
};
pub use table::{AnnotationTable, TableError};
pub use spans::{aggregate, SentenceMentions, SpanError, SrlFrame};
pub use tree::{DependencyTree, NodeId, TreeError};
pub use compose::compose;
pub use coref::{CorefError, CorefMention, CorefResolution, MentionLocation, ResolvedChain};
pub use assembler::{
    DocumentHypergraph, ElementId, ElementIdError, ElementRef, ElementRegistry, EntityChain,
    RegistryEntry, SentenceHypergraph,
};
pub use policy::{CompilePolicy, LabelSource, LabelSourceError};
pub use compiler::{CompiledDocument, HypergraphCompiler, SentenceResult};
pub use cache::{CacheConfig, CacheStats, DocumentCache};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use canonical_content::{
    normalize_source, canonical_source, compute_source_hash, verify_source_hash,
    CANONICAL_SOURCE_VERSION,
};

/// Schema version of the serialized document hypergraph.
/// Increment on breaking changes to any output type.
pub const SEMHYP_SCHEMA_VERSION: &str = "semhyp_document_v1";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "compile_policy_v1";
