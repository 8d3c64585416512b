//! Tab-completion over the union of builtin names and executables on PATH.
//!
//! The expensive part, scanning PATH directories, is memoized per prefix in a
//! bounded cache with insertion-order eviction. A companion prefix → tab-count
//! map implements the readline-style two-tab disambiguation: first tab rings
//! the bell, second tab at the same prefix lists the candidates.

use crate::builtin::BUILTINS;
use crate::env::Environment;
use crate::external;
use std::collections::{HashMap, VecDeque};

/// Default number of prefix scans kept in the cache.
pub const CACHE_CAPACITY: usize = 20;

/// Bounded mapping from prefix string to a sorted candidate list.
pub(crate) struct CompletionCache {
    entries: HashMap<String, Vec<String>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl CompletionCache {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, prefix: &str) -> Option<&[String]> {
        self.entries.get(prefix).map(Vec::as_slice)
    }

    fn insert(&mut self, prefix: String, matches: Vec<String>) {
        if self.entries.contains_key(&prefix) {
            self.entries.insert(prefix, matches);
            return;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(prefix.clone());
        self.entries.insert(prefix, matches);
    }
}

/// What the editor should do in response to a tab press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// No candidate matches: ring the bell, leave the buffer alone.
    NoMatch,
    /// Exactly one candidate: insert the remainder, then a trailing space.
    Single { suffix: String },
    /// Several candidates share an extension beyond the prefix: insert it,
    /// no trailing space.
    Extend { suffix: String },
    /// Several candidates, no shared extension, first tab: ring the bell.
    Pending,
    /// Second tab at the same prefix: list the candidates and redraw.
    Candidates(Vec<String>),
}

/// Completion engine state owned by the editor loop.
pub struct Completer {
    cache: CompletionCache,
    tab_counts: HashMap<String, u32>,
}

impl Completer {
    pub fn new() -> Self {
        Self {
            cache: CompletionCache::with_capacity(CACHE_CAPACITY),
            tab_counts: HashMap::new(),
        }
    }

    /// Called by the editor on every non-tab keystroke: any edit changes the
    /// prefix, which invalidates recorded tab presses.
    pub fn note_input(&mut self) {
        self.tab_counts.clear();
    }

    /// Compute the outcome of one tab press for `prefix = buffer[0..cursor]`.
    pub fn complete(&mut self, prefix: &str, env: &Environment) -> Completion {
        let candidates = self.candidates(prefix, env);
        match candidates.len() {
            0 => {
                self.tab_counts.clear();
                Completion::NoMatch
            }
            1 => {
                self.tab_counts.clear();
                Completion::Single {
                    suffix: candidates[0][prefix.len()..].to_string(),
                }
            }
            _ => {
                let lcp = longest_common_prefix(&candidates);
                if lcp.len() > prefix.len() {
                    self.tab_counts.clear();
                    return Completion::Extend {
                        suffix: lcp[prefix.len()..].to_string(),
                    };
                }
                let count = self.tab_counts.entry(prefix.to_string()).or_insert(0);
                *count += 1;
                if *count >= 2 {
                    self.tab_counts.clear();
                    Completion::Candidates(candidates)
                } else {
                    Completion::Pending
                }
            }
        }
    }

    /// Union of builtin names and cached executable scans, sorted, deduplicated.
    fn candidates(&mut self, prefix: &str, env: &Environment) -> Vec<String> {
        let mut out: Vec<String> = BUILTINS
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| name.to_string())
            .collect();

        match self.cache.get(prefix) {
            Some(hit) => out.extend_from_slice(hit),
            None => {
                let scanned = external::find_matches(env, prefix);
                out.extend_from_slice(&scanned);
                self.cache.insert(prefix.to_string(), scanned);
            }
        }

        out.sort();
        out.dedup();
        out
    }
}

impl Default for Completer {
    fn default() -> Self {
        Self::new()
    }
}

/// The longest string that is a prefix of every candidate. With a single
/// candidate the result is that candidate itself.
fn longest_common_prefix(candidates: &[String]) -> String {
    let Some(first) = candidates.first() else {
        return String::new();
    };
    let mut end = first.len();
    for candidate in &candidates[1..] {
        end = end.min(common_prefix_len(first, candidate));
    }
    first[..end].to_string()
}

/// Length in bytes of the common prefix of two strings, always landing on a
/// character boundary.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()))
}
