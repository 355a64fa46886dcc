//! Deduplication and next-level frontier building
//!
//! Every URL that enters the crawl goes through [`Frontier::admit`] (or
//! [`Frontier::seed`]), which adds it to the visited set and to the next BFS
//! level in one step. Membership is exact string equality; no normalization
//! is applied.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Visited set plus the level being built from admitted children
#[derive(Debug)]
pub struct Frontier {
    visited: HashSet<String>,
    next_level: Vec<String>,
    max_url_number: usize,
    closed: bool,
}

impl Frontier {
    pub fn new(max_url_number: usize) -> Self {
        Self {
            visited: HashSet::new(),
            next_level: Vec::new(),
            max_url_number,
            closed: false,
        }
    }

    /// Admits the seed URL; equivalent to admitting a single candidate
    pub fn seed(&mut self, url: &str) -> bool {
        self.admit([url]) == 1
    }

    /// Admits candidates in the order given and returns how many were admitted
    ///
    /// A candidate is skipped if it was already visited. Once the visited set
    /// holds `max_url_number` URLs, the remaining candidates are dropped.
    pub fn admit<I, S>(&mut self, candidates: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.closed {
            return 0;
        }

        let mut admitted = 0;
        for candidate in candidates {
            if self.is_full() {
                break;
            }

            let candidate = candidate.as_ref();
            if self.contains(candidate) {
                continue;
            }

            self.visited.insert(candidate.to_string());
            self.next_level.push(candidate.to_string());
            admitted += 1;
        }

        admitted
    }

    /// Hands over the admitted level, leaving an empty one behind
    pub fn take_next_level(&mut self) -> Vec<String> {
        std::mem::take(&mut self.next_level)
    }

    /// Clears both sets and refuses every later admission
    pub fn close(&mut self) {
        self.closed = true;
        self.visited.clear();
        self.next_level.clear();
    }

    pub fn is_full(&self) -> bool {
        self.visited.len() >= self.max_url_number
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }
}

/// Cloneable handle to a [`Frontier`] shared by concurrent workers
///
/// Each call takes the lock once, so a whole batch of candidates is admitted
/// inside a single critical section.
#[derive(Debug, Clone)]
pub struct SharedFrontier {
    inner: Arc<Mutex<Frontier>>,
}

impl SharedFrontier {
    pub fn new(max_url_number: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Frontier::new(max_url_number))),
        }
    }

    pub fn seed(&self, url: &str) -> bool {
        self.inner.lock().seed(url)
    }

    pub fn admit<S: AsRef<str>>(&self, candidates: &[S]) -> usize {
        self.inner.lock().admit(candidates)
    }

    pub fn take_next_level(&self) -> Vec<String> {
        self.inner.lock().take_next_level()
    }

    pub fn close(&self) {
        self.inner.lock().close();
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock().is_full()
    }

    pub fn visited_len(&self) -> usize {
        self.inner.lock().visited_len()
    }

    /// Copy of the visited set, sorted
    pub fn visited_snapshot(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.inner.lock().visited().iter().cloned().collect();
        urls.sort();
        urls
    }
}
