//! Diagnostics and per-document compilation reports.
//!
//! ## Purpose
//!
//! Compilation never aborts a document because of one bad row or sentence.
//! Every recoverable or fatal condition is recorded here instead, so callers
//! can tell a clean document from a degraded one.
//!
//! ## Diagnostic Kinds
//!
//! | Kind | Severity | Effect |
//! |------|----------|--------|
//! | MalformedRow | ROW_DROPPED | Row ignored, sentence continues |
//! | OrphanSpanTag | RECOVERABLE | Span opened as if `B-`, sentence degraded |
//! | CyclicDependency | SENTENCE_SKIPPED | No hyperedge for the sentence |
//! | MultipleRoots | SENTENCE_SKIPPED | No hyperedge for the sentence |
//! | MissingRoot | SENTENCE_SKIPPED | No hyperedge for the sentence |
//! | DanglingHead | SENTENCE_SKIPPED | No hyperedge for the sentence |
//! | UnresolvedChain | RECOVERABLE | Mention dropped from its chain |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::mention::{Layer, Span};
use super::tags::ChainId;
use super::token::SentenceId;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Output produced with a local correction.
    Recoverable,
    /// One input row was discarded.
    RowDropped,
    /// A whole sentence produced no hyperedge.
    SentenceSkipped,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "RECOVERABLE"),
            Self::RowDropped => write!(f, "ROW_DROPPED"),
            Self::SentenceSkipped => write!(f, "SENTENCE_SKIPPED"),
        }
    }
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A table row could not be parsed.
    MalformedRow {
        /// 1-based line number in the source.
        line: usize,
        /// Why the row was rejected.
        reason: String,
    },
    /// An inside tag without a compatible open span.
    OrphanSpanTag {
        /// Sentence of the tag.
        sentence: SentenceId,
        /// Token carrying the tag.
        token: u32,
        /// Layer of the tag.
        layer: Layer,
        /// The raw tag.
        tag: String,
    },
    /// A head chain that never reaches the root.
    CyclicDependency {
        /// Sentence of the cycle.
        sentence: SentenceId,
        /// A token on the cycle.
        token: u32,
    },
    /// More than one self-headed token.
    MultipleRoots {
        /// Sentence with the extra roots.
        sentence: SentenceId,
        /// All self-headed tokens.
        roots: Vec<u32>,
    },
    /// No self-headed token.
    MissingRoot {
        /// Sentence without a root.
        sentence: SentenceId,
    },
    /// A head index with no token (its row was dropped).
    DanglingHead {
        /// Sentence of the token.
        sentence: SentenceId,
        /// Token whose head is missing.
        token: u32,
        /// The missing head index.
        head: u32,
    },
    /// A coreference mention that aligns with no composed element.
    UnresolvedChain {
        /// Chain of the mention.
        chain: ChainId,
        /// Mention span.
        span: Span,
        /// Why alignment failed.
        reason: String,
    },
}

impl DiagnosticKind {
    /// Severity implied by the kind.
    pub fn severity(&self) -> Severity {
        match self {
            Self::MalformedRow { .. } => Severity::RowDropped,
            Self::OrphanSpanTag { .. } | Self::UnresolvedChain { .. } => Severity::Recoverable,
            Self::CyclicDependency { .. }
            | Self::MultipleRoots { .. }
            | Self::MissingRoot { .. }
            | Self::DanglingHead { .. } => Severity::SentenceSkipped,
        }
    }

    /// Stable short code for filtering and counting.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedRow { .. } => "malformed_row",
            Self::OrphanSpanTag { .. } => "orphan_span_tag",
            Self::CyclicDependency { .. } => "cyclic_dependency",
            Self::MultipleRoots { .. } => "multiple_roots",
            Self::MissingRoot { .. } => "missing_root",
            Self::DanglingHead { .. } => "dangling_head",
            Self::UnresolvedChain { .. } => "unresolved_chain",
        }
    }

    /// Sentence the diagnostic refers to, when known.
    pub fn sentence(&self) -> Option<SentenceId> {
        match self {
            Self::MalformedRow { .. } => None,
            Self::OrphanSpanTag { sentence, .. }
            | Self::CyclicDependency { sentence, .. }
            | Self::MultipleRoots { sentence, .. }
            | Self::MissingRoot { sentence }
            | Self::DanglingHead { sentence, .. } => Some(*sentence),
            Self::UnresolvedChain { span, .. } => Some(span.sentence),
        }
    }
}

/// A recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What happened.
    pub kind: DiagnosticKind,
    /// How bad it is.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic; severity follows from the kind.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        let severity = kind.severity();
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }

    /// Log this diagnostic as a structured event.
    pub fn log(&self) {
        tracing::warn!(
            code = %self.kind.code(),
            severity = %self.severity,
            sentence = ?self.kind.sentence().map(|s| s.as_u32()),
            "{}",
            self.message
        );
    }
}

/// Outcome of one sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentenceStatus {
    /// Composed with no recoverable issues.
    Composed,
    /// Composed after local corrections.
    Degraded,
    /// No hyperedge produced.
    Skipped,
}

/// Per-sentence entry of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceOutcome {
    /// Sentence id.
    pub sentence: SentenceId,
    /// Status.
    pub status: SentenceStatus,
    /// Number of tokens read for the sentence.
    pub tokens: usize,
}

/// Report of one document compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// SHA-256 of the normalized source, when compiled from text.
    pub source_hash: Option<String>,
    /// Params hash of the policy used.
    pub policy_params_hash: String,
    /// When compilation started.
    pub started_at: DateTime<Utc>,
    /// When compilation finished.
    pub finished_at: DateTime<Utc>,
    /// Per-sentence outcomes in document order.
    pub sentences: Vec<SentenceOutcome>,
    /// All diagnostics, table rows first, then sentences in order, then
    /// coreference.
    pub diagnostics: Vec<Diagnostic>,
}

impl DocumentReport {
    /// Sentences that produced no hyperedge.
    pub fn skipped(&self) -> Vec<SentenceId> {
        self.with_status(SentenceStatus::Skipped)
    }

    /// Sentences composed after local corrections.
    pub fn degraded(&self) -> Vec<SentenceId> {
        self.with_status(SentenceStatus::Degraded)
    }

    fn with_status(&self, status: SentenceStatus) -> Vec<SentenceId> {
        self.sentences
            .iter()
            .filter(|o| o.status == status)
            .map(|o| o.sentence)
            .collect()
    }

    /// Whether no diagnostic was recorded.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of diagnostics with the given code.
    pub fn count(&self, code: &str) -> usize {
        self.diagnostics.iter().filter(|d| d.kind.code() == code).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_by_kind() {
        let s = SentenceId::new(0);
        assert_eq!(
            DiagnosticKind::MissingRoot { sentence: s }.severity(),
            Severity::SentenceSkipped
        );
        assert_eq!(
            DiagnosticKind::MalformedRow { line: 3, reason: "x".into() }.severity(),
            Severity::RowDropped
        );
        let orphan = DiagnosticKind::OrphanSpanTag {
            sentence: s,
            token: 2,
            layer: Layer::Entity,
            tag: "I-ORG".into(),
        };
        assert_eq!(orphan.severity(), Severity::Recoverable);
        assert_eq!(orphan.sentence(), Some(s));
    }

    #[test]
    fn test_diagnostic_serialization_is_tagged() {
        let d = Diagnostic::new(DiagnosticKind::MissingRoot { sentence: SentenceId::new(4) }, "no root");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"]["type"], "missing_root");
        assert_eq!(json["severity"], "SENTENCE_SKIPPED");
    }

    #[test]
    fn test_report_queries() {
        let now = Utc::now();
        let report = DocumentReport {
            source_hash: None,
            policy_params_hash: "0".into(),
            started_at: now,
            finished_at: now,
            sentences: vec![
                SentenceOutcome { sentence: SentenceId::new(0), status: SentenceStatus::Composed, tokens: 3 },
                SentenceOutcome { sentence: SentenceId::new(1), status: SentenceStatus::Skipped, tokens: 2 },
                SentenceOutcome { sentence: SentenceId::new(2), status: SentenceStatus::Degraded, tokens: 5 },
            ],
            diagnostics: vec![Diagnostic::new(
                DiagnosticKind::MissingRoot { sentence: SentenceId::new(1) },
                "no root",
            )],
        };
        assert_eq!(report.skipped(), vec![SentenceId::new(1)]);
        assert_eq!(report.degraded(), vec![SentenceId::new(2)]);
        assert_eq!(report.count("missing_root"), 1);
        assert!(!report.is_clean());
    }
}
