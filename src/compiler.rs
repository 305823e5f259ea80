//! Document compilation driver.
//!
//! Runs every sentence through the pipeline and assembles the document:
//!
//! ```text
//! table row → spans → tree → compose      (per sentence, independent)
//!                                ↓
//!                      coref → assemble   (after every sentence)
//! ```
//!
//! With the `parallel` feature sentences compile on the rayon pool; results
//! are collected in document order, so the output does not depend on
//! scheduling. A failing sentence is skipped and reported, never fatal.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, info_span};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::assembler::{DocumentHypergraph, SentenceHypergraph};
use crate::cache::{CacheConfig, CacheStats, DocumentCache};
use crate::canonical_content::{compute_source_hash, normalize_source};
use crate::compose::compose;
use crate::coref::{collect_mentions, resolve, CorefMention, CorefResolution};
use crate::policy::CompilePolicy;
use crate::spans::aggregate;
use crate::table::AnnotationTable;
use crate::tree::DependencyTree;
use crate::types::{
    Diagnostic, DocumentReport, Hyperedge, Layer, Sentence, SentenceId, SentenceOutcome, SentenceStatus,
};

/// A compiled document and its report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledDocument {
    /// The document hypergraph.
    pub hypergraph: DocumentHypergraph,
    /// Diagnostics and per-sentence outcomes.
    pub report: DocumentReport,
}

impl CompiledDocument {
    /// Whether any sentence was skipped.
    pub fn has_skipped(&self) -> bool {
        self.report
            .sentences
            .iter()
            .any(|o| o.status == SentenceStatus::Skipped)
    }
}

/// Result of compiling one sentence.
#[derive(Debug, Clone)]
pub struct SentenceResult {
    /// Status and token count.
    pub outcome: SentenceOutcome,
    /// Composed hypergraph; `None` when the sentence was skipped.
    pub hypergraph: Option<SentenceHypergraph>,
    /// Diagnostics raised by the sentence, in pipeline order.
    pub diagnostics: Vec<Diagnostic>,
    /// Coreference mentions, empty unless the policy resolves chains.
    pub mentions: Vec<CorefMention>,
}

/// Compiles annotation tables into document hypergraphs.
#[derive(Debug)]
pub struct HypergraphCompiler {
    policy: CompilePolicy,
    cache: Option<DocumentCache>,
}

impl HypergraphCompiler {
    /// Create a compiler without a document cache.
    pub fn new(policy: CompilePolicy) -> Self {
        Self { policy, cache: None }
    }

    /// Create a compiler with a document cache used by
    /// [`compile_cached`](Self::compile_cached).
    pub fn with_cache(policy: CompilePolicy, config: CacheConfig) -> Self {
        Self {
            policy,
            cache: Some(DocumentCache::new(config)),
        }
    }

    /// The policy in use.
    pub fn policy(&self) -> &CompilePolicy {
        &self.policy
    }

    /// Cache statistics; `None` without an enabled cache.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().and_then(DocumentCache::stats)
    }

    /// Compile source text.
    ///
    /// The canonical form of the source is parsed, so every input sharing a
    /// source hash compiles to the same document.
    pub fn compile_str(&self, source: &str) -> CompiledDocument {
        let canonical = normalize_source(source);
        let table = AnnotationTable::parse(&canonical);
        let mut document = self.compile_table(&table);
        document.report.source_hash = Some(compute_source_hash(&canonical));
        document
    }

    /// Compile source text, serving repeated inputs from the cache.
    ///
    /// Behaves like [`compile_str`](Self::compile_str) when the compiler
    /// has no cache.
    pub fn compile_cached(&self, source: &str) -> Arc<CompiledDocument> {
        let Some(cache) = &self.cache else {
            return Arc::new(self.compile_str(source));
        };
        let source_hash = compute_source_hash(source);
        let params_hash = self.policy.params_hash();
        if let Some(document) = cache.get(&source_hash, &params_hash) {
            debug!(source_hash = %source_hash, "Serving compiled document from cache");
            return document;
        }
        let document = Arc::new(self.compile_str(source));
        cache.insert(&source_hash, &params_hash, Arc::clone(&document));
        document
    }

    /// Compile a parsed table.
    pub fn compile_table(&self, table: &AnnotationTable) -> CompiledDocument {
        let started_at = Utc::now();
        let span = info_span!("compile_document", sentences = table.len());
        let _guard = span.enter();

        let mut diagnostics: Vec<Diagnostic> = table.errors().iter().map(Diagnostic::from).collect();
        let results = self.compile_sentences(table.sentences());

        let mut outcomes = Vec::with_capacity(results.len());
        let mut composed = Vec::with_capacity(results.len());
        let mut mentions = Vec::new();
        for result in results {
            outcomes.push(result.outcome);
            diagnostics.extend(result.diagnostics);
            mentions.extend(result.mentions);
            composed.extend(result.hypergraph);
        }

        let resolution = if self.policy.use_coreference {
            let roots: BTreeMap<SentenceId, &Hyperedge> = composed.iter().map(|s| (s.sentence, &s.root)).collect();
            resolve(&mentions, &roots)
        } else {
            CorefResolution::default()
        };
        diagnostics.extend(resolution.errors.iter().map(Diagnostic::from));

        let hypergraph = DocumentHypergraph::assemble(composed, &resolution);

        for diagnostic in &diagnostics {
            diagnostic.log();
        }
        let skipped = outcomes.iter().filter(|o| o.status == SentenceStatus::Skipped).count();
        info!(
            sentences = outcomes.len(),
            skipped,
            chains = hypergraph.chains.len(),
            elements = hypergraph.registry.len(),
            diagnostics = diagnostics.len(),
            fingerprint = %hypergraph.fingerprint,
            "Compiled document"
        );

        CompiledDocument {
            hypergraph,
            report: DocumentReport {
                source_hash: None,
                policy_params_hash: self.policy.params_hash(),
                started_at,
                finished_at: Utc::now(),
                sentences: outcomes,
                diagnostics,
            },
        }
    }

    #[cfg(feature = "parallel")]
    fn compile_sentences(&self, sentences: &[Sentence]) -> Vec<SentenceResult> {
        sentences.par_iter().map(|s| self.compile_sentence(s)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn compile_sentences(&self, sentences: &[Sentence]) -> Vec<SentenceResult> {
        sentences.iter().map(|s| self.compile_sentence(s)).collect()
    }

    /// Compile one sentence.
    ///
    /// Orphan tags in layers the policy ignores neither degrade the
    /// sentence nor produce diagnostics.
    pub fn compile_sentence(&self, sentence: &Sentence) -> SentenceResult {
        let layers = aggregate(sentence);
        let mut diagnostics: Vec<Diagnostic> = layers
            .errors
            .iter()
            .filter(|e| self.uses_layer(e.layer()))
            .map(Diagnostic::from)
            .collect();
        let degraded = !diagnostics.is_empty();

        let mentions = if self.policy.use_coreference {
            collect_mentions(sentence, &layers)
        } else {
            Vec::new()
        };

        let (status, hypergraph) = match DependencyTree::build(sentence) {
            Ok(tree) => {
                let root = compose(sentence, &tree, &layers, &self.policy);
                debug!(sentence = %sentence.id, edge = %root, "Composed sentence");
                let status = if degraded {
                    SentenceStatus::Degraded
                } else {
                    SentenceStatus::Composed
                };
                let hypergraph = SentenceHypergraph {
                    sentence: sentence.id,
                    text: sentence.text(),
                    root,
                };
                (status, Some(hypergraph))
            }
            Err(err) => {
                debug!(sentence = %sentence.id, error = %err, "Skipping sentence");
                diagnostics.push(Diagnostic::from(&err));
                (SentenceStatus::Skipped, None)
            }
        };

        SentenceResult {
            outcome: SentenceOutcome {
                sentence: sentence.id,
                status,
                tokens: sentence.len(),
            },
            hypergraph,
            diagnostics,
            mentions,
        }
    }

    fn uses_layer(&self, layer: &Layer) -> bool {
        match layer {
            Layer::Entity => self.policy.use_entities,
            Layer::Srl { .. } => self.policy.use_srl,
            Layer::Coreference { .. } => self.policy.use_coreference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiagnosticKind, Token};

    fn tok(s: u32, i: u32, word: &str, upos: &str, xpos: &str, dep: &str, head: u32) -> Token {
        Token::new(SentenceId::new(s), i, word, upos, xpos, dep, head)
    }

    const TWO_SENTENCES: &str = "\
0\t0\tHe\t+\the\tPRON\tPRP\tnsubj\t1\t-\t_\t-\tB-REF1
0\t1\tleft\t-\tleave\tVERB\tVBD\tROOT\t1\t-\t_\t-\t_
1\t0\tPatrick\t+\tPatrick\tPROPN\tNNP\tnsubj\t1\tB-PERSON\t_\t-\tB-MAIN1
1\t1\tslept\t-\tsleep\tVERB\tVBD\tROOT\t1\t-\t_\t-\t_
";

    #[test]
    fn test_compile_two_sentences() {
        let compiler = HypergraphCompiler::new(CompilePolicy::default());
        let document = compiler.compile_str(TWO_SENTENCES);

        assert_eq!(document.hypergraph.sentences.len(), 2);
        assert_eq!(document.report.sentences.len(), 2);
        assert!(document.report.is_clean());
        assert!(!document.has_skipped());
        assert_eq!(document.report.source_hash.as_deref().map(str::len), Some(64));
        assert_eq!(document.report.policy_params_hash, compiler.policy().params_hash());
        assert_eq!(document.hypergraph.chains.len(), 1);
    }

    #[test]
    fn test_coreference_disabled() {
        let compiler = HypergraphCompiler::new(CompilePolicy {
            use_coreference: false,
            ..CompilePolicy::default()
        });
        let document = compiler.compile_str(TWO_SENTENCES);
        assert!(document.hypergraph.chains.is_empty());
        assert_eq!(document.hypergraph.sentences.len(), 2);
    }

    #[test]
    fn test_cyclic_sentence_is_skipped() {
        let sentences = vec![
            Sentence::new(
                SentenceId::new(0),
                vec![tok(0, 0, "Stop", "VERB", "VB", "ROOT", 0)],
            ),
            Sentence::new(
                SentenceId::new(1),
                vec![
                    tok(1, 0, "a", "DET", "DT", "det", 1),
                    tok(1, 1, "b", "NOUN", "NN", "dep", 0),
                    tok(1, 2, "c", "VERB", "VB", "ROOT", 2),
                ],
            ),
        ];
        let table = AnnotationTable::from_sentences(sentences);
        let document = HypergraphCompiler::new(CompilePolicy::default()).compile_table(&table);

        assert_eq!(document.report.skipped(), vec![SentenceId::new(1)]);
        assert_eq!(document.report.count("cyclic_dependency"), 1);
        assert_eq!(document.hypergraph.sentences.len(), 1);
        assert!(document.has_skipped());
    }

    #[test]
    fn test_orphan_tag_degrades_sentence() {
        let sentence = Sentence::new(
            SentenceId::new(0),
            vec![
                tok(0, 0, "IBM", "PROPN", "NNP", "nsubj", 1).with_ner("I-ORG"),
                tok(0, 1, "grew", "VERB", "VBD", "ROOT", 1),
            ],
        );
        let result = HypergraphCompiler::new(CompilePolicy::default()).compile_sentence(&sentence);
        assert_eq!(result.outcome.status, SentenceStatus::Degraded);
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.hypergraph.is_some());

        let structural = HypergraphCompiler::new(CompilePolicy::structural()).compile_sentence(&sentence);
        assert_eq!(structural.outcome.status, SentenceStatus::Composed);
        assert!(structural.diagnostics.is_empty());
    }

    #[test]
    fn test_malformed_rows_are_reported_first() {
        let source = "0\tx\n0\t0\tGo\t-\tgo\tVERB\tVB\tROOT\t0\n";
        let document = HypergraphCompiler::new(CompilePolicy::default()).compile_str(source);
        assert_eq!(document.report.count("malformed_row"), 1);
        assert_eq!(document.report.diagnostics[0].kind.code(), "malformed_row");
        assert_eq!(document.hypergraph.sentences.len(), 1);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let compiler = HypergraphCompiler::new(CompilePolicy::default());
        let first = compiler.compile_str(TWO_SENTENCES);
        for _ in 0..10 {
            let again = compiler.compile_str(TWO_SENTENCES);
            assert_eq!(again.hypergraph, first.hypergraph);
            assert_eq!(again.report.diagnostics, first.report.diagnostics);
        }
    }

    #[test]
    fn test_compile_cached_hits() {
        let compiler = HypergraphCompiler::with_cache(CompilePolicy::default(), CacheConfig::default());
        let first = compiler.compile_cached(TWO_SENTENCES);
        let second = compiler.compile_cached(TWO_SENTENCES);
        assert!(Arc::ptr_eq(&first, &second));

        let stats = compiler.cache_stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.len, 1);
    }

    #[test]
    fn test_sources_sharing_a_hash_compile_alike() {
        let compiler = HypergraphCompiler::with_cache(CompilePolicy::default(), CacheConfig::default());
        let lone_cr = TWO_SENTENCES.replace('\n', "\r");

        let direct = compiler.compile_str(&lone_cr);
        assert_eq!(direct.hypergraph.sentences.len(), 2);
        assert!(direct.report.is_clean());

        let warm = compiler.compile_cached(TWO_SENTENCES);
        let served = compiler.compile_cached(&lone_cr);
        assert!(Arc::ptr_eq(&warm, &served));
        assert_eq!(served.hypergraph, direct.hypergraph);
        assert_eq!(served.report.source_hash, direct.report.source_hash);
    }

    #[test]
    fn test_row_numbers_survive_leading_blank_lines() {
        let compiler = HypergraphCompiler::with_cache(CompilePolicy::default(), CacheConfig::default());
        compiler.compile_cached("0\tx\n");
        let document = compiler.compile_cached("\n\n\n0\tx\n");

        assert_eq!(document.report.count("malformed_row"), 1);
        match &document.report.diagnostics[0].kind {
            DiagnosticKind::MalformedRow { line, .. } => assert_eq!(*line, 4),
            other => panic!("unexpected diagnostic {:?}", other),
        }
        assert_eq!(compiler.cache_stats().unwrap().misses, 2);
    }

    #[test]
    fn test_compile_cached_without_cache() {
        let compiler = HypergraphCompiler::new(CompilePolicy::default());
        let document = compiler.compile_cached(TWO_SENTENCES);
        assert_eq!(document.hypergraph.sentences.len(), 2);
        assert!(compiler.cache_stats().is_none());
    }
}
