//! Prefix-tree multiset of words.
//!
//! Every [`Node`] keeps its [`Edge`]s sorted by byte value, so a pre-order walk visits words
//! in lexicographic order without a separate sort.  Each edge owns its child node and the
//! multiset owns the root, giving a single-owner tree that is torn down iteratively.
//!
//! ```text
//! a, a, at, ban
//!
//! |
//! a,2----b,0
//! |      |
//! t,1    a,0
//!        |
//!        n,1
//! ```

use std::io::{self, Write};
use std::mem;

/// One byte at one level of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    symbol: u8,
    count: u64,
    child: Node,
}

impl Edge {
    fn new(symbol: u8) -> Self {
        Self {
            symbol,
            count: 0,
            child: Node::default(),
        }
    }

    /// Byte labelling this edge.
    #[must_use]
    pub fn symbol(&self) -> u8 {
        self.symbol
    }

    /// Number of words ending exactly at this edge; `0` marks a pure prefix.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Node holding the continuations of this prefix.
    #[must_use]
    pub fn child(&self) -> &Node {
        &self.child
    }
}

/// Ordered set of edges sharing a common prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    edges: Vec<Edge>,
}

impl Node {
    /// Edges of this node in ascending byte order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns true when no word continues past this node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Finds the edge labelled `symbol`, if present.
    #[must_use]
    pub fn lookup_edge(&self, symbol: u8) -> Option<&Edge> {
        self.position(symbol).ok().map(|index| &self.edges[index])
    }

    fn position(&self, symbol: u8) -> std::result::Result<usize, usize> {
        self.edges.binary_search_by_key(&symbol, |edge| edge.symbol)
    }

    fn edge_or_insert(&mut self, symbol: u8) -> &mut Edge {
        let index = match self.position(symbol) {
            Ok(index) => index,
            Err(index) => {
                self.edges.insert(index, Edge::new(symbol));
                index
            }
        };
        &mut self.edges[index]
    }
}

/// Multiset of words stored as a prefix tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMultiset {
    root: Node,
}

impl PrefixMultiset {
    /// Creates an empty multiset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root node of the tree.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Returns true when no word has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Adds one occurrence of `word`. Empty words are ignored.
    pub fn insert(&mut self, word: &[u8]) {
        let Some((&last, head)) = word.split_last() else {
            return;
        };
        let mut node = &mut self.root;
        for &symbol in head {
            node = &mut node.edge_or_insert(symbol).child;
        }
        node.edge_or_insert(last).count += 1;
    }

    /// Multiplicity of `word`, `0` when absent.
    #[must_use]
    pub fn get(&self, word: &[u8]) -> u64 {
        let Some((&last, head)) = word.split_last() else {
            return 0;
        };
        let mut node = &self.root;
        for &symbol in head {
            match node.lookup_edge(symbol) {
                Some(edge) => node = &edge.child,
                None => return 0,
            }
        }
        node.lookup_edge(last).map_or(0, Edge::count)
    }

    /// Adds every count of `other` into `self`, leaving `other` untouched.
    pub fn merge(&mut self, other: &PrefixMultiset) {
        let mut pending = vec![(&mut self.root, &other.root)];
        while let Some((into, from)) = pending.pop() {
            for edge in &from.edges {
                into.edge_or_insert(edge.symbol).count += edge.count;
            }
            // `into` now holds a superset of `from`'s symbols, both sorted.
            let mut sources = from.edges.iter().peekable();
            for target in into.edges.iter_mut() {
                if let Some(source) = sources.next_if(|source| source.symbol == target.symbol) {
                    if !source.child.is_empty() {
                        pending.push((&mut target.child, &source.child));
                    }
                }
            }
        }
    }

    /// Adds every count of `other` into `self`, consuming `other`.
    ///
    /// Subtrees absent from `self` are moved over rather than copied.
    pub fn absorb(&mut self, mut other: PrefixMultiset) {
        let mut pending = vec![(&mut self.root, mem::take(&mut other.root))];
        while let Some((into, from)) = pending.pop() {
            let mut shared = Vec::new();
            for mut edge in from.edges {
                match into.position(edge.symbol) {
                    Ok(index) => {
                        into.edges[index].count += edge.count;
                        if !edge.child.is_empty() {
                            shared.push((edge.symbol, mem::take(&mut edge.child)));
                        }
                    }
                    Err(index) => into.edges.insert(index, edge),
                }
            }
            let mut shared = shared.into_iter().peekable();
            for target in into.edges.iter_mut() {
                if shared.peek().is_none() {
                    break;
                }
                if let Some((_, child)) = shared.next_if(|(symbol, _)| *symbol == target.symbol) {
                    pending.push((&mut target.child, child));
                }
            }
        }
    }

    /// Ordered iterator over `(word, count)` pairs.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: vec![self.root.edges.iter()],
            prefix: Vec::new(),
        }
    }

    /// Number of distinct words.
    #[must_use]
    pub fn distinct_words(&self) -> usize {
        let mut distinct = 0;
        self.for_each_edge(|edge| distinct += usize::from(edge.count > 0));
        distinct
    }

    /// Sum of all multiplicities.
    #[must_use]
    pub fn total_words(&self) -> u64 {
        let mut total = 0;
        self.for_each_edge(|edge| total += edge.count);
        total
    }

    /// Writes one `word=count` line per distinct word in lexicographic order.
    pub fn write_report<W: Write>(&self, mut out: W) -> io::Result<()> {
        for (word, count) in self.iter() {
            writeln!(out, "{word}={count}")?;
        }
        out.flush()
    }

    /// Releases every node. Clearing an empty multiset is a no-op.
    pub fn clear(&mut self) {
        let mut pending = mem::take(&mut self.root.edges);
        while let Some(mut edge) = pending.pop() {
            pending.append(&mut edge.child.edges);
        }
    }

    fn for_each_edge<F>(&self, mut f: F)
    where
        F: FnMut(&Edge),
    {
        let mut pending = vec![&self.root];
        while let Some(node) = pending.pop() {
            for edge in &node.edges {
                f(edge);
                pending.push(&edge.child);
            }
        }
    }
}

impl Drop for PrefixMultiset {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<'a> IntoIterator for &'a PrefixMultiset {
    type Item = (String, u64);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Depth-first, lexicographically ordered walk produced by [`PrefixMultiset::iter`].
#[derive(Debug)]
pub struct Iter<'a> {
    stack: Vec<std::slice::Iter<'a, Edge>>,
    prefix: Vec<u8>,
}

impl Iterator for Iter<'_> {
    type Item = (String, u64);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let depth = self.stack.len();
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(edge) => {
                    self.prefix.truncate(depth - 1);
                    self.prefix.push(edge.symbol);
                    if !edge.child.is_empty() {
                        self.stack.push(edge.child.edges.iter());
                    }
                    if edge.count > 0 {
                        let word = self.prefix.iter().map(|&byte| char::from(byte)).collect();
                        return Some((word, edge.count));
                    }
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
