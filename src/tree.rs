//! Dependency tree construction and validation.
//!
//! Nodes live in an arena indexed by their position in the sentence, with
//! head and child links stored as positions. Children keep surface order.
//! All traversals are iterative so deep trees cannot exhaust the stack.
//!
//! ## Validation
//!
//! A sentence yields a tree only if:
//!
//! 1. Every head refers to a token of the sentence (`DanglingHead`)
//! 2. Exactly one token is its own head (`MissingRoot`, `MultipleRoots`)
//! 3. Every head chain reaches that root (`CyclicDependency`)

use thiserror::Error;

use crate::types::{Diagnostic, DiagnosticKind, Sentence, SentenceId};

/// Fatal per-sentence tree errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// No token is its own head.
    #[error("sentence {sentence} has no root")]
    MissingRoot {
        /// Sentence id.
        sentence: SentenceId,
    },
    /// More than one token is its own head.
    #[error("sentence {sentence} has multiple roots: {roots:?}")]
    MultipleRoots {
        /// Sentence id.
        sentence: SentenceId,
        /// All self-headed tokens.
        roots: Vec<u32>,
    },
    /// A head chain loops without reaching the root.
    #[error("sentence {sentence} has a dependency cycle through token {token}")]
    CyclicDependency {
        /// Sentence id.
        sentence: SentenceId,
        /// A token on the cycle.
        token: u32,
    },
    /// A head refers to a token that is not in the sentence.
    #[error("token {token} of sentence {sentence} has missing head {head}")]
    DanglingHead {
        /// Sentence id.
        sentence: SentenceId,
        /// Token with the missing head.
        token: u32,
        /// Missing head index.
        head: u32,
    },
}

impl From<&TreeError> for Diagnostic {
    fn from(err: &TreeError) -> Self {
        let kind = match err {
            TreeError::MissingRoot { sentence } => DiagnosticKind::MissingRoot { sentence: *sentence },
            TreeError::MultipleRoots { sentence, roots } => DiagnosticKind::MultipleRoots {
                sentence: *sentence,
                roots: roots.clone(),
            },
            TreeError::CyclicDependency { sentence, token } => DiagnosticKind::CyclicDependency {
                sentence: *sentence,
                token: *token,
            },
            TreeError::DanglingHead { sentence, token, head } => DiagnosticKind::DanglingHead {
                sentence: *sentence,
                token: *token,
                head: *head,
            },
        };
        Diagnostic::new(kind, err.to_string())
    }
}

/// Position of a node in the arena (same as the token's position in the sentence).
pub type NodeId = usize;

#[derive(Debug, Clone)]
struct Node {
    token: u32,
    head: Option<NodeId>,
    children: Vec<NodeId>,
    depth: u32,
}

/// A validated dependency tree over one sentence.
#[derive(Debug, Clone)]
pub struct DependencyTree {
    sentence: SentenceId,
    nodes: Vec<Node>,
    root: NodeId,
}

impl DependencyTree {
    /// Build and validate the tree of a sentence.
    pub fn build(sentence: &Sentence) -> Result<Self, TreeError> {
        let id = sentence.id;
        let mut heads = Vec::with_capacity(sentence.len());
        for token in &sentence.tokens {
            let head = sentence.position(token.head).ok_or(TreeError::DanglingHead {
                sentence: id,
                token: token.index,
                head: token.head,
            })?;
            heads.push(head);
        }

        let roots: Vec<NodeId> = (0..heads.len()).filter(|&pos| heads[pos] == pos).collect();
        let root = match roots.as_slice() {
            [] => return Err(TreeError::MissingRoot { sentence: id }),
            [root] => *root,
            _ => {
                return Err(TreeError::MultipleRoots {
                    sentence: id,
                    roots: roots.iter().map(|&pos| sentence.tokens[pos].index).collect(),
                })
            }
        };

        if let Some(pos) = find_cycle(&heads, root) {
            return Err(TreeError::CyclicDependency {
                sentence: id,
                token: sentence.tokens[pos].index,
            });
        }

        let mut nodes: Vec<Node> = sentence
            .tokens
            .iter()
            .zip(&heads)
            .enumerate()
            .map(|(pos, (token, &head))| Node {
                token: token.index,
                head: (pos != root).then_some(head),
                children: Vec::new(),
                depth: 0,
            })
            .collect();
        for pos in 0..nodes.len() {
            if let Some(head) = nodes[pos].head {
                nodes[head].children.push(pos);
            }
        }

        let mut stack = vec![root];
        while let Some(pos) = stack.pop() {
            let depth = nodes[pos].depth;
            let children = nodes[pos].children.clone();
            for child in children {
                nodes[child].depth = depth + 1;
                stack.push(child);
            }
        }

        Ok(Self {
            sentence: id,
            nodes,
            root,
        })
    }

    /// Sentence the tree belongs to.
    pub fn sentence(&self) -> SentenceId {
        self.sentence
    }

    /// Root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty (never true for a built tree).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Token index of a node.
    pub fn token(&self, node: NodeId) -> u32 {
        self.nodes[node].token
    }

    /// Node of a token index.
    pub fn node_of(&self, token: u32) -> Option<NodeId> {
        self.nodes.binary_search_by_key(&token, |n| n.token).ok()
    }

    /// Head of a node; `None` for the root.
    pub fn head(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].head
    }

    /// Children in surface order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node].children
    }

    /// Distance from the root.
    pub fn depth(&self, node: NodeId) -> u32 {
        self.nodes[node].depth
    }

    /// All nodes, children before their head, siblings in surface order.
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, usize)> = vec![(self.root, 0)];
        while let Some((node, next)) = stack.pop() {
            match self.nodes[node].children.get(next) {
                Some(&child) => {
                    stack.push((node, next + 1));
                    stack.push((child, 0));
                }
                None => order.push(node),
            }
        }
        order
    }

    /// Token indices of the subtree rooted at a node, sorted.
    pub fn subtree(&self, node: NodeId) -> Vec<u32> {
        let mut tokens = Vec::new();
        let mut stack = vec![node];
        while let Some(pos) = stack.pop() {
            tokens.push(self.nodes[pos].token);
            stack.extend(self.nodes[pos].children.iter().copied());
        }
        tokens.sort_unstable();
        tokens
    }

    /// Whether `ancestor` dominates `node` (a node dominates itself).
    pub fn dominates(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(pos) = current {
            if pos == ancestor {
                return true;
            }
            current = self.nodes[pos].head;
        }
        false
    }
}

/// First node on a head chain that never reaches `root`.
fn find_cycle(heads: &[NodeId], root: NodeId) -> Option<NodeId> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        OnPath,
        Reaches,
    }

    let mut state = vec![State::Unvisited; heads.len()];
    state[root] = State::Reaches;

    for start in 0..heads.len() {
        let mut path = Vec::new();
        let mut pos = start;
        loop {
            match state[pos] {
                State::Reaches => break,
                State::OnPath => return Some(pos),
                State::Unvisited => {
                    state[pos] = State::OnPath;
                    path.push(pos);
                    pos = heads[pos];
                }
            }
        }
        for p in path {
            state[p] = State::Reaches;
        }
    }
    None
}
