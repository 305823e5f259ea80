//! Annotation table: parsing the token-per-line column format.
//!
//! ## Row Format
//!
//! ```text
//! sent  tok  word  ws  lemma  UPOS  XPOS  dep  head  [optional columns...]
//! ```
//!
//! Columns 1-4 and 6-9 are required. Columns are separated by tabs, or by
//! runs of spaces when a line has no tab. Blank lines and `#` comment lines
//! are ignored.
//!
//! ## Optional Columns
//!
//! Optional columns after the head are classified per sentence by the
//! shape of their values rather than by position:
//!
//! | Kind | Example |
//! |------|---------|
//! | NER | `B-PERSON`, `I-ORG` |
//! | Predicate sense | `know.01` |
//! | SRL frame | `B-ARG0`, `I-ARGM-TMP`, `B-V` |
//! | Coreference | `B-MAIN1`, `I-REF2` |
//! | Word sense | `plan.n.01` |
//!
//! A bare `B`/`I` column directly followed by a `MAIN<n>`/`REF<n>` column is
//! read as one coreference column. This accepts the fixed 17-column layout
//! as well as exports with one SRL column per predicate and one coreference
//! column per chain.
//!
//! ## Errors
//!
//! A row that cannot be read is dropped with [`TableError::MalformedRow`];
//! the rest of its sentence is kept.

use regex_lite::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use crate::types::{is_placeholder, Diagnostic, DiagnosticKind, Sentence, SentenceId, Token};

/// Number of required leading columns.
pub const REQUIRED_COLUMNS: usize = 9;

/// Errors raised while reading table rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// A row was rejected and dropped.
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow {
        /// 1-based line number.
        line: usize,
        /// Why the row was rejected.
        reason: String,
    },
}

impl TableError {
    fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            line,
            reason: reason.into(),
        }
    }
}

impl From<&TableError> for Diagnostic {
    fn from(err: &TableError) -> Self {
        match err {
            TableError::MalformedRow { line, reason } => Diagnostic::new(
                DiagnosticKind::MalformedRow {
                    line: *line,
                    reason: reason.clone(),
                },
                err.to_string(),
            ),
        }
    }
}

/// Kind of an optional column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Named-entity BIO tags.
    Entity,
    /// Predicate sense ids.
    PredicateSense,
    /// One SRL frame.
    Srl,
    /// Coreference BIO tags with chain markers.
    Coreference,
    /// Bare BIO prefixes, fused with a following marker column.
    CorefPrefix,
    /// Bare chain markers.
    CorefMarker,
    /// Word sense ids.
    WordSense,
    /// No annotated value.
    Empty,
    /// Values of no known shape.
    Unknown,
}

struct ColumnClassifier {
    entity: Regex,
    srl: Regex,
    coref: Regex,
    prefix: Regex,
    marker: Regex,
    word_sense: Regex,
    predicate_sense: Regex,
    /// Any uppercase BIO label; entity types outside the known inventory.
    open_entity: Regex,
}

impl ColumnClassifier {
    fn get() -> &'static ColumnClassifier {
        static CLASSIFIER: OnceLock<ColumnClassifier> = OnceLock::new();
        CLASSIFIER.get_or_init(|| {
            let compile = |pattern: &str| Regex::new(pattern).expect("valid column pattern");
            ColumnClassifier {
                entity: compile(
                    r"^[BIESLU]-(CARDINAL|DATE|EVENT|FAC|GPE|LANGUAGE|LAW|LOC|MONEY|NORP|ORDINAL|ORG|PERCENT|PERSON|PRODUCT|QUANTITY|TIME|WORK_OF_ART|PER|MISC)$",
                ),
                srl: compile(r"^[BIESLU]-([RC]-)?(V|ARG[0-9A](-[A-Z]+)?|ARGM-[A-Z]+)$"),
                coref: compile(r"^[BIESLU]-(MAIN|REF)\d+$"),
                prefix: compile(r"^[BIESLU]$"),
                marker: compile(r"^(MAIN|REF)\d+$"),
                word_sense: compile(r"^\S+\.[a-z]\.\d{2}$"),
                predicate_sense: compile(r"^\S+\.\d{2}$"),
                open_entity: compile(r"^[BIESLU]-[A-Z][A-Z_]*$"),
            }
        })
    }

    fn classify_value(&self, value: &str) -> Option<ColumnKind> {
        if self.coref.is_match(value) {
            Some(ColumnKind::Coreference)
        } else if self.entity.is_match(value) {
            Some(ColumnKind::Entity)
        } else if self.srl.is_match(value) {
            Some(ColumnKind::Srl)
        } else if self.prefix.is_match(value) {
            Some(ColumnKind::CorefPrefix)
        } else if self.marker.is_match(value) {
            Some(ColumnKind::CorefMarker)
        } else if self.word_sense.is_match(value) {
            Some(ColumnKind::WordSense)
        } else if self.predicate_sense.is_match(value) {
            Some(ColumnKind::PredicateSense)
        } else {
            None
        }
    }

    /// Kind of one column: the first annotated value of a known shape decides.
    /// A column of BIO labels outside every known inventory holds entities.
    fn classify_column<'a>(&self, values: impl Iterator<Item = &'a str>) -> ColumnKind {
        let mut annotated = false;
        let mut open_entities = true;
        for value in values {
            if is_placeholder(value) {
                continue;
            }
            annotated = true;
            if let Some(kind) = self.classify_value(value) {
                return kind;
            }
            open_entities &= self.open_entity.is_match(value);
        }
        match (annotated, open_entities) {
            (false, _) => ColumnKind::Empty,
            (true, true) => ColumnKind::Entity,
            (true, false) => ColumnKind::Unknown,
        }
    }
}

/// One row that passed the required-column checks.
struct RawRow {
    line: usize,
    token: Token,
    tail: Vec<String>,
}

/// Validated tokens grouped by sentence.
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    sentences: Vec<Sentence>,
    errors: Vec<TableError>,
}

impl AnnotationTable {
    /// Parse a whole document.
    pub fn parse(source: &str) -> Self {
        Self::from_rows(source.lines())
    }

    /// Parse rows, one token per row.
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut errors = Vec::new();
        let mut order: Vec<SentenceId> = Vec::new();
        let mut groups: BTreeMap<SentenceId, Vec<RawRow>> = BTreeMap::new();

        for (i, row) in rows.into_iter().enumerate() {
            let line = i + 1;
            let text = row.as_ref().trim_end_matches(['\n', '\r']);
            if text.trim().is_empty() || text.trim_start().starts_with('#') {
                continue;
            }
            match parse_row(line, text) {
                Ok(raw) => {
                    let group = groups.entry(raw.token.sentence).or_insert_with(|| {
                        order.push(raw.token.sentence);
                        Vec::new()
                    });
                    if group.iter().any(|r| r.token.index == raw.token.index) {
                        errors.push(TableError::malformed(
                            line,
                            format!(
                                "duplicate token index {} in sentence {}",
                                raw.token.index, raw.token.sentence
                            ),
                        ));
                    } else {
                        group.push(raw);
                    }
                }
                Err(err) => errors.push(err),
            }
        }

        let mut sentences = Vec::with_capacity(order.len());
        for id in order {
            let rows = groups.remove(&id).unwrap_or_default();
            if let Some(sentence) = build_sentence(id, rows, &mut errors) {
                sentences.push(sentence);
            }
        }

        errors.sort_by_key(|TableError::MalformedRow { line, .. }| *line);
        debug!(
            sentences = sentences.len(),
            dropped_rows = errors.len(),
            "Parsed annotation table"
        );
        Self { sentences, errors }
    }

    /// Build a table from already-constructed sentences.
    pub fn from_sentences(sentences: Vec<Sentence>) -> Self {
        Self {
            sentences,
            errors: Vec::new(),
        }
    }

    /// Sentences in first-appearance order.
    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// Rejected rows, by line.
    pub fn errors(&self) -> &[TableError] {
        &self.errors
    }

    /// Split into sentences and errors.
    pub fn into_parts(self) -> (Vec<Sentence>, Vec<TableError>) {
        (self.sentences, self.errors)
    }

    /// Number of sentences.
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    /// Whether the table has no sentences.
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Total number of tokens.
    pub fn token_count(&self) -> usize {
        self.sentences.iter().map(Sentence::len).sum()
    }
}

fn split_columns(text: &str) -> Vec<&str> {
    if text.contains('\t') {
        text.split('\t').map(str::trim).collect()
    } else {
        text.split_whitespace().collect()
    }
}

fn parse_row(line: usize, text: &str) -> Result<RawRow, TableError> {
    let cols = split_columns(text);
    if cols.len() < REQUIRED_COLUMNS {
        return Err(TableError::malformed(
            line,
            format!("expected at least {} columns, found {}", REQUIRED_COLUMNS, cols.len()),
        ));
    }

    let int = |idx: usize, name: &str| -> Result<u32, TableError> {
        cols[idx]
            .parse::<u32>()
            .map_err(|_| TableError::malformed(line, format!("{} is not an integer: {:?}", name, cols[idx])))
    };
    let required = |idx: usize, name: &str| -> Result<String, TableError> {
        let value = cols[idx];
        if value.is_empty() {
            Err(TableError::malformed(line, format!("missing {}", name)))
        } else {
            Ok(value.to_string())
        }
    };

    let sentence = SentenceId::new(int(0, "sentence id")?);
    let index = int(1, "token index")?;
    let word = required(2, "word")?;
    let space_after = match cols[3] {
        "+" | "_" => true,
        "-" => false,
        other => {
            return Err(TableError::malformed(
                line,
                format!("whitespace flag must be '+' or '-', found {:?}", other),
            ))
        }
    };
    let lemma = (!is_placeholder(cols[4])).then(|| cols[4].to_string());
    let upos = required(5, "UPOS")?;
    let xpos = required(6, "XPOS")?;
    let dep = required(7, "dependency label")?;
    let head = int(8, "head index")?;

    let mut token = Token::new(sentence, index, word, upos, xpos, dep, head).with_space_after(space_after);
    token.lemma = lemma;

    Ok(RawRow {
        line,
        token,
        tail: cols[REQUIRED_COLUMNS..].iter().map(|s| s.to_string()).collect(),
    })
}

/// Validate heads, classify optional columns and assemble one sentence.
fn build_sentence(id: SentenceId, rows: Vec<RawRow>, errors: &mut Vec<TableError>) -> Option<Sentence> {
    let max_index = rows.iter().map(|r| r.token.index).max()?;
    let (rows, out_of_range): (Vec<RawRow>, Vec<RawRow>) =
        rows.into_iter().partition(|r| r.token.head <= max_index);
    for row in out_of_range {
        errors.push(TableError::malformed(
            row.line,
            format!(
                "head {} out of range for sentence {} (last index {})",
                row.token.head, id, max_index
            ),
        ));
    }
    if rows.is_empty() {
        return None;
    }

    let width = rows.iter().map(|r| r.tail.len()).max().unwrap_or(0);
    let classifier = ColumnClassifier::get();
    let kinds: Vec<ColumnKind> = (0..width)
        .map(|col| {
            classifier.classify_column(rows.iter().map(|r| r.tail.get(col).map(String::as_str).unwrap_or("")))
        })
        .collect();
    for (col, kind) in kinds.iter().enumerate() {
        if *kind == ColumnKind::Unknown {
            debug!(
                sentence = %id,
                column = REQUIRED_COLUMNS + col + 1,
                "Ignoring annotation column of unknown shape"
            );
        }
    }

    let tokens = rows
        .into_iter()
        .map(|row| apply_columns(row.token, &row.tail, &kinds))
        .collect();
    Some(Sentence::new(id, tokens))
}

fn apply_columns(mut token: Token, tail: &[String], kinds: &[ColumnKind]) -> Token {
    let value = |col: usize| -> Option<String> {
        tail.get(col)
            .map(|v| v.trim())
            .filter(|v| !is_placeholder(v))
            .map(str::to_string)
    };

    let mut col = 0;
    while col < kinds.len() {
        match kinds[col] {
            ColumnKind::Entity => {
                if token.ner.is_none() {
                    token.ner = value(col);
                }
            }
            ColumnKind::PredicateSense => {
                if token.predicate_sense.is_none() {
                    token.predicate_sense = value(col);
                }
            }
            ColumnKind::WordSense => {
                if token.word_sense.is_none() {
                    token.word_sense = value(col);
                }
            }
            ColumnKind::Srl => token.srl.push(value(col)),
            ColumnKind::Coreference => token.coref.push(value(col)),
            ColumnKind::CorefPrefix if kinds.get(col + 1) == Some(&ColumnKind::CorefMarker) => {
                let fused = match (value(col), value(col + 1)) {
                    (Some(prefix), Some(marker)) => Some(format!("{}-{}", prefix, marker)),
                    _ => None,
                };
                token.coref.push(fused);
                col += 1;
            }
            ColumnKind::CorefPrefix
            | ColumnKind::CorefMarker
            | ColumnKind::Empty
            | ColumnKind::Unknown => {}
        }
        col += 1;
    }
    token
}
