//! Range-restricted scan with pluggable basename matching.

use crate::error::IndexError;
use crate::index::{FsIndex, NODE_SIZE};
use regex::bytes::{Regex, RegexBuilder};

/// Basename predicate applied during a scan.
#[derive(Debug, Clone)]
pub enum NameMatcher {
    /// Case-insensitive substring over raw bytes.
    Substring(Vec<u8>),
    /// Case-insensitive, dot-matches-all regular expression.
    Pattern(Box<Regex>),
    /// Matches every entry.
    All,
}

impl NameMatcher {
    /// Substring matcher; the empty keyword matches everything.
    pub fn substring(keyword: &str) -> NameMatcher {
        if keyword.is_empty() {
            return NameMatcher::All;
        }
        NameMatcher::Substring(keyword.as_bytes().to_ascii_lowercase())
    }

    /// Compile `pattern` case-insensitively with `.` matching newlines.
    pub fn regex(pattern: &str) -> Result<NameMatcher, IndexError> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;
        Ok(NameMatcher::Pattern(Box::new(re)))
    }

    pub fn matches(&self, name: &[u8]) -> bool {
        match self {
            NameMatcher::All => true,
            NameMatcher::Substring(needle) => {
                name.len() >= needle.len()
                    && name.windows(needle.len()).any(|w| w.eq_ignore_ascii_case(needle))
            }
            NameMatcher::Pattern(re) => re.is_match(name),
        }
    }
}

/// A resumable pre-order scan over one subtree.
///
/// The cursor borrows the index, so emitted paths can never outlive the
/// region they were reconstructed from. Chunked calls bound the working
/// set and give the caller a cancellation point between chunks.
pub struct Scan<'a> {
    index: &'a FsIndex,
    next: u32,
    end: u32,
    /// Open directories above the cursor: (subtree end, prefix length
    /// before that directory's name was appended).
    stack: Vec<(u32, usize)>,
    prefix: Vec<u8>,
}

impl FsIndex {
    /// Locate `path` and return a scan over its subtree, or `None` when
    /// the path is not present. A scan positioned on a non-directory is
    /// already exhausted.
    pub fn scan(&self, path: &str) -> Option<Scan<'_>> {
        let node = self.find(path)?;
        let (next, end) = if self.is_dir(node) {
            (self.children_begin(node), self.subtree_end(node))
        } else {
            (0, 0)
        };
        let mut prefix = path.trim_end_matches('/').as_bytes().to_vec();
        prefix.push(b'/');
        Some(Scan {
            index: self,
            next,
            end,
            stack: Vec::new(),
            prefix,
        })
    }

    /// Run a scan to completion and collect every match.
    pub fn search_all(&self, path: &str, matcher: &NameMatcher) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(mut scan) = self.scan(path) {
            while !scan.next_chunk(matcher, 1024, &mut out) {}
        }
        out
    }
}

impl<'a> Scan<'a> {
    /// Append up to `cap` matching absolute paths to `out`. Returns true
    /// once the range is exhausted; call again to resume otherwise.
    pub fn next_chunk(&mut self, matcher: &NameMatcher, cap: usize, out: &mut Vec<String>) -> bool {
        let mut emitted = 0;
        while self.next < self.end && emitted < cap {
            let off = self.next;
            while let Some(&(end, prefix_len)) = self.stack.last() {
                if end <= off {
                    self.stack.pop();
                    self.prefix.truncate(prefix_len);
                } else {
                    break;
                }
            }
            let name = self.index.name(off);
            if matcher.matches(name) {
                let mut path = self.prefix.clone();
                path.extend_from_slice(name);
                out.push(String::from_utf8_lossy(&path).into_owned());
                emitted += 1;
            }
            if self.index.is_dir(off) {
                self.stack.push((self.index.subtree_end(off), self.prefix.len()));
                self.prefix.extend_from_slice(name);
                self.prefix.push(b'/');
            }
            self.next = off + NODE_SIZE;
        }
        self.next >= self.end
    }

    /// True once the range is exhausted.
    pub fn is_done(&self) -> bool {
        self.next >= self.end
    }
}
