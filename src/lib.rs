use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::iter;
use std::path::Path;

use once_cell::sync::OnceCell;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smartstring::alias::String;
use thiserror::Error;

#[cfg(feature = "test-cases")]
pub mod test_cases;

/// Immutable word-frequency table backing segmentation
///
/// Holds every known word with its observed frequency, plus one zero-frequency
/// placeholder for each proper prefix of a known word. The placeholders let the
/// candidate scan stop as soon as a prefix lookup misses, since no longer word
/// can exist past a missing prefix.
#[cfg_attr(feature = "with-serde", derive(Deserialize, Serialize))]
#[derive(Debug)]
pub struct FreqDict {
    freq: HashMap<String, u64>,
    total: u64,
}

impl FreqDict {
    /// Load a dictionary from the file at `path`
    ///
    /// The expected format is one entry per line: the word, a single space, and
    /// an integer frequency. Any further space-separated fields on the line are
    /// ignored.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DictError> {
        Self::read(BufReader::new(File::open(path)?))
    }

    /// Parse a dictionary from any buffered reader
    pub fn read(reader: impl BufRead) -> Result<Self, DictError> {
        let mut dict = Self {
            freq: HashMap::default(),
            total: 0,
        };

        for (i, ln) in reader.lines().enumerate() {
            let ln = ln?;
            let ln = ln.trim();
            let mut fields = ln.split(' ');
            let parsed = match (fields.next(), fields.next()) {
                (Some(word), Some(freq)) => parse_freq(freq).map(|freq| (word, freq)),
                _ => None,
            };

            match parsed {
                Some((word, freq)) => dict.insert(word, freq),
                None => {
                    return Err(DictError::Parse {
                        line: i + 1,
                        content: ln.into(),
                    })
                }
            }
        }

        Ok(dict)
    }

    /// Create `FreqDict` from `(word, frequency)` pairs
    ///
    /// Note: the `String` type used in this API is defined in the `smartstring`
    /// crate. Any `&str` or `String` can be converted into the `String` used
    /// here by calling `into()` on it.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut dict = Self {
            freq: HashMap::default(),
            total: 0,
        };

        for (word, freq) in entries {
            dict.insert(&word, freq);
        }

        dict
    }

    fn insert(&mut self, word: &str, freq: u64) {
        self.freq.insert(word.into(), freq);
        self.total += freq;

        // Register every proper prefix, by codepoint, so the candidate scan can
        // distinguish "prefix of a longer word" from "unknown". Placeholders
        // carry frequency zero and stay out of `total`.
        for (i, _) in word.char_indices().skip(1) {
            self.freq.entry(word[..i].into()).or_insert(0);
        }
    }

    /// Look up `word` in the table
    ///
    /// `None` means the word is entirely unknown; `Some(0)` means it only
    /// occurs as a prefix of longer words; `Some(n)` with `n > 0` is a real
    /// dictionary word.
    pub fn lookup(&self, word: &str) -> Option<u64> {
        self.freq.get(word).copied()
    }

    /// Summed frequency of all explicit dictionary entries
    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Parse an integer frequency field, accepting `0x`/`0o`/`0b` radix prefixes
fn parse_freq(s: &str) -> Option<u64> {
    let (digits, radix) = match s.get(..2) {
        Some("0x") | Some("0X") => (&s[2..], 16),
        Some("0o") | Some("0O") => (&s[2..], 8),
        Some("0b") | Some("0B") => (&s[2..], 2),
        _ => (s, 10),
    };
    u64::from_str_radix(digits, radix).ok()
}

/// Segments text into dictionary words by maximum path probability
#[cfg_attr(feature = "with-serde", derive(Deserialize, Serialize))]
pub struct Segmenter {
    dict: FreqDict,
}

impl Segmenter {
    /// Create a `Segmenter` from an already built table
    pub fn new(dict: FreqDict) -> Self {
        Self { dict }
    }

    /// Create a `Segmenter` by loading the dictionary file at `path`
    pub fn from_dict_path(path: impl AsRef<Path>) -> Result<Self, DictError> {
        Ok(Self::new(FreqDict::load(path)?))
    }

    /// Access the underlying frequency table
    pub fn dict(&self) -> &FreqDict {
        &self.dict
    }

    /// Segment `text`, yielding its words front to back
    ///
    /// The candidate graph and best route are computed here; the returned
    /// iterator walks the route lazily and borrows only the input text, so it
    /// may be consumed (or dropped early) independently of `self`. Runs of
    /// single Latin letters and ASCII digits are merged into one token each.
    pub fn cut<'a>(&self, text: &'a str) -> Cut<'a> {
        let offsets = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(iter::once(text.len()))
            .collect::<Vec<_>>();
        let dag = self.dag(text, &offsets);
        let route = self.route(text, &offsets, &dag);
        Cut {
            text,
            offsets,
            route,
            pos: 0,
            run: None,
        }
    }

    /// Build the word-candidate graph over `text`
    ///
    /// `dag[k]` lists every end position (inclusive, codepoint index) such that
    /// `text[k..=end]` is a dictionary word. The scan stops at the first table
    /// miss: prefix closure guarantees nothing longer can match. A start with
    /// no known word falls back to the single character at `k`, treated
    /// downstream as an unknown one-character word.
    fn dag(&self, text: &str, offsets: &[usize]) -> Vec<Vec<usize>> {
        let n = offsets.len() - 1;
        let mut dag = Vec::with_capacity(n);
        for k in 0..n {
            let mut ends = Vec::new();
            for i in k..n {
                match self.dict.lookup(&text[offsets[k]..offsets[i + 1]]) {
                    Some(freq) => {
                        if freq > 0 {
                            ends.push(i);
                        }
                    }
                    None => break,
                }
            }
            if ends.is_empty() {
                ends.push(k);
            }
            dag.push(ends);
        }
        dag
    }

    /// Solve for the maximum log-probability path through the graph
    ///
    /// Backward dynamic program: the score of a suffix starting at `idx`
    /// depends only on positions past `idx`, so one right-to-left sweep
    /// suffices. Each word contributes `ln(freq) - ln(total)`; unknown words
    /// score with frequency one. Returns the chosen end position per start.
    fn route(&self, text: &str, offsets: &[usize], dag: &[Vec<usize>]) -> Vec<usize> {
        let n = offsets.len() - 1;
        let log_total = (self.dict.total() as f64).ln();
        let mut best = vec![0.0; n + 1];
        let mut ends = vec![0; n];

        for idx in (0..n).rev() {
            let mut best_score = f64::NEG_INFINITY;
            let mut best_end = idx;
            for &x in &dag[idx] {
                let word = &text[offsets[idx]..offsets[x + 1]];
                let freq = self.dict.lookup(word).unwrap_or(1) as f64;
                let score = freq.ln() - log_total + best[x + 1];
                // Candidates come in ascending end order, so `>=` resolves
                // equal scores toward the longer word.
                if score >= best_score {
                    best_score = score;
                    best_end = x;
                }
            }
            best[idx] = best_score;
            ends[idx] = best_end;
        }

        ends
    }
}

/// Lazy token iterator returned by [`Segmenter::cut`]
///
/// One-shot walk over the best route. Dropping it before exhaustion abandons
/// the remaining tokens; no state outlives the iterator.
pub struct Cut<'a> {
    text: &'a str,
    offsets: Vec<usize>,
    route: Vec<usize>,
    pos: usize,
    run: Option<usize>,
}

impl<'a> Iterator for Cut<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let n = self.offsets.len() - 1;
        while self.pos < n {
            let next = self.route[self.pos] + 1;
            let word = &self.text[self.offsets[self.pos]..self.offsets[next]];
            if next == self.pos + 1 && word.as_bytes()[0].is_ascii_alphanumeric() {
                // Single Latin letter or digit: extend the current run instead
                // of emitting.
                if self.run.is_none() {
                    self.run = Some(self.pos);
                }
                self.pos = next;
                continue;
            }

            if let Some(start) = self.run.take() {
                // Flush the pending run first; the cursor stays put so the
                // current word comes out on the following call.
                return Some(&self.text[self.offsets[start]..self.offsets[self.pos]]);
            }

            self.pos = next;
            return Some(word);
        }

        let start = self.run.take()?;
        Some(&self.text[self.offsets[start]..self.offsets[n]])
    }
}

/// Default dictionary path used by the top-level [`cut`] function
pub const DEFAULT_DICT: &str = "dict.txt";

static DEFAULT: OnceCell<Segmenter> = OnceCell::new();

/// Segment `text` with a process-wide segmenter loaded from [`DEFAULT_DICT`]
///
/// The dictionary is loaded on first use, at most once even under concurrent
/// callers. A failed load is returned to the caller and attempted again on the
/// next call.
pub fn cut(text: &str) -> Result<Cut<'_>, DictError> {
    let segmenter = DEFAULT.get_or_try_init(|| Segmenter::from_dict_path(DEFAULT_DICT))?;
    Ok(segmenter.cut(text))
}

#[derive(Debug, Error)]
pub enum DictError {
    #[error("failed to read dictionary: {0}")]
    Read(#[from] io::Error),
    #[error("invalid dictionary entry at line {line}: {content:?}")]
    Parse { line: usize, content: String },
}

type HashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;

#[cfg(test)]
pub mod tests {
    use super::*;

    fn dict(entries: &[(&str, u64)]) -> FreqDict {
        FreqDict::from_entries(entries.iter().map(|&(w, f)| (w.into(), f)))
    }

    fn words(segmenter: &Segmenter, text: &str) -> Vec<std::string::String> {
        segmenter.cut(text).map(|w| w.to_owned()).collect()
    }

    #[test]
    fn parse_basic() {
        let dict = FreqDict::read("好 123\n朋友 45 n\n".as_bytes()).unwrap();
        assert_eq!(dict.lookup("好"), Some(123));
        assert_eq!(dict.lookup("朋友"), Some(45));
        assert_eq!(dict.total(), 168);
    }

    #[test]
    fn parse_radix_prefixes() {
        let dict = FreqDict::read("一 0x10\n二 0o10\n三 0b10\n".as_bytes()).unwrap();
        assert_eq!(dict.lookup("一"), Some(16));
        assert_eq!(dict.lookup("二"), Some(8));
        assert_eq!(dict.lookup("三"), Some(2));
        assert_eq!(dict.total(), 26);
    }

    #[test]
    fn parse_error_cites_line() {
        let err = FreqDict::read("好 123\nbadword notanumber\n".as_bytes()).unwrap_err();
        match err {
            DictError::Parse { line, content } => {
                assert_eq!(line, 2);
                assert_eq!(content, "badword notanumber");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn parse_error_on_missing_frequency() {
        let err = FreqDict::read("好\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DictError::Parse { line: 1, .. }));
    }

    #[test]
    fn load_error_on_missing_file() {
        let err = FreqDict::load("no-such-dictionary.txt").unwrap_err();
        assert!(matches!(err, DictError::Read(_)));
    }

    #[test]
    fn prefix_closure() {
        let dict = dict(&[("清华大学", 2053), ("中国", 597)]);
        assert_eq!(dict.lookup("清"), Some(0));
        assert_eq!(dict.lookup("清华"), Some(0));
        assert_eq!(dict.lookup("清华大"), Some(0));
        assert_eq!(dict.lookup("中"), Some(0));
        assert_eq!(dict.lookup("学"), None);
    }

    #[test]
    fn placeholders_stay_out_of_total() {
        let dict = dict(&[("清华大学", 2053)]);
        assert_eq!(dict.total(), 2053);
    }

    #[test]
    fn explicit_entry_overwrites_placeholder() {
        let dict = dict(&[("清华大学", 2053), ("清华", 1164)]);
        assert_eq!(dict.lookup("清华"), Some(1164));
        assert_eq!(dict.total(), 2053 + 1164);
    }

    #[test]
    fn prefers_frequent_split() {
        let segmenter = Segmenter::new(dict(&[
            ("南京", 10000),
            ("市长", 3000),
            ("南京市", 1500),
            ("长江", 800),
            ("大桥", 900),
            ("长江大桥", 400),
            ("江", 300),
            ("长", 500),
            ("市", 600),
        ]));
        assert_eq!(words(&segmenter, "南京市长江大桥"), ["南京市", "长江大桥"]);
    }

    #[test]
    fn unknown_chars_fall_back_to_singles() {
        let segmenter = Segmenter::new(dict(&[("好", 100)]));
        assert_eq!(words(&segmenter, "好吗"), ["好", "吗"]);
    }

    #[test]
    fn empty_dict_still_covers_input() {
        let segmenter = Segmenter::new(FreqDict::read("".as_bytes()).unwrap());
        assert_eq!(words(&segmenter, "天地"), ["天", "地"]);
        assert_eq!(words(&segmenter, "ab1"), ["ab1"]);
    }

    #[test]
    fn latin_runs_merge() {
        let segmenter = Segmenter::new(dict(&[("好", 100)]));
        assert_eq!(words(&segmenter, "abc123"), ["abc123"]);
        assert_eq!(words(&segmenter, "好abc好"), ["好", "abc", "好"]);
        assert_eq!(words(&segmenter, "abc好123"), ["abc", "好", "123"]);
    }

    #[test]
    fn dictionary_latin_word_breaks_a_run() {
        // "ok" is a known two-character word, so it is emitted on its own and
        // splits the surrounding single-character runs.
        let segmenter = Segmenter::new(dict(&[("ok", 100)]));
        assert_eq!(words(&segmenter, "xok7"), ["x", "ok", "7"]);
    }

    #[test]
    fn trailing_run_is_flushed() {
        let segmenter = Segmenter::new(dict(&[("好", 100)]));
        assert_eq!(words(&segmenter, "好42"), ["好", "42"]);
    }

    #[test]
    fn empty_input() {
        let segmenter = Segmenter::new(dict(&[("好", 100)]));
        assert_eq!(segmenter.cut("").count(), 0);
    }

    #[test]
    fn tokens_cover_input() {
        let segmenter = Segmenter::new(dict(&[("清华大学", 2053), ("北京", 34488)]));
        for text in &["北京清华大学", "x北京y", "", "朝辞白帝彩云间", "a1北"] {
            let joined = segmenter.cut(text).collect::<std::string::String>();
            assert_eq!(&joined, text);
        }
    }

    #[test]
    fn cut_is_deterministic() {
        let segmenter = Segmenter::new(dict(&[("北京", 34488), ("北", 17573), ("京", 2562)]));
        let first = words(&segmenter, "北京x北京");
        let second = words(&segmenter, "北京x北京");
        assert_eq!(first, second);
    }

    #[test]
    fn early_drop_is_clean() {
        let segmenter = Segmenter::new(dict(&[("北京", 34488)]));
        let mut cut = segmenter.cut("北京北京北京");
        assert_eq!(cut.next(), Some("北京"));
        drop(cut);
    }
}
