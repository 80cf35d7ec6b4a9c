//! Rule table loading and sharing.
//!
//! A [`RuleStore`] owns the active rule table. Loading parses the whole
//! resource first, compiles every record, drops the ones that do not
//! compile, and only then swaps the new table in. Readers take a
//! [`RuleSet`] snapshot, which stays valid and unchanged for as long as they
//! hold it, whatever reloads happen in the meantime.

use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::matcher::Matcher;
use crate::options::MatchMode;
use crate::rule::{Rule, RuleRecord};

/// Outcome of a successful load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records found in the resource.
    pub records: usize,
    /// Rules installed.
    pub installed: usize,
    /// Records dropped because they did not compile.
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct RuleSetInner {
    rules: Vec<Rule>,
    matcher: Matcher,
}

/// Immutable snapshot of a rule table.
///
/// Cheap to clone. Rules keep the order they had in the resource.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    inner: Arc<RuleSetInner>,
}

impl RuleSet {
    /// Builds a snapshot from compiled rules.
    #[must_use]
    pub fn new(rules: Vec<Rule>, mode: MatchMode) -> Self {
        let matcher = Matcher::build(&rules, mode);
        Self {
            inner: Arc::new(RuleSetInner { rules, matcher }),
        }
    }

    /// Rules in table order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.inner.rules
    }

    /// Matching mode in effect for this snapshot.
    #[must_use]
    pub fn match_mode(&self) -> MatchMode {
        self.inner.matcher.mode()
    }

    /// First rule whose pattern occurs in `url`.
    #[must_use]
    pub fn find(&self, url: &str) -> Option<&Rule> {
        self.inner.matcher.find(&self.inner.rules, url)
    }

    /// Like [`find`](Self::find), but the result keeps the snapshot alive.
    #[must_use]
    pub fn find_owned(&self, url: &str) -> Option<MatchedRule> {
        self.inner
            .matcher
            .position(&self.inner.rules, url)
            .map(|index| MatchedRule {
                set: self.clone(),
                index,
            })
    }
}

impl Deref for RuleSet {
    type Target = [Rule];

    fn deref(&self) -> &[Rule] {
        self.rules()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules().iter()
    }
}

/// A matched rule together with the snapshot it came from.
#[derive(Debug, Clone)]
pub struct MatchedRule {
    set: RuleSet,
    index: usize,
}

impl MatchedRule {
    /// Position of the rule in its table.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Deref for MatchedRule {
    type Target = Rule;

    fn deref(&self) -> &Rule {
        &self.set.rules()[self.index]
    }
}

/// Owner of the active rule table.
///
/// Any number of threads may match against the store while another thread
/// reloads it; loads are serialized among themselves.
#[derive(Debug, Default)]
pub struct RuleStore {
    active: RwLock<RuleSet>,
    loading: Mutex<()>,
    mode: MatchMode,
}

impl RuleStore {
    /// Empty store. Every match misses until a table is loaded.
    #[must_use]
    pub fn new(mode: MatchMode) -> Self {
        Self {
            active: RwLock::new(RuleSet::new(Vec::new(), mode)),
            loading: Mutex::new(()),
            mode,
        }
    }

    /// Store loaded from a JSON stream.
    pub fn from_reader<R: Read>(reader: R, mode: MatchMode) -> Result<Self, LoadError> {
        let store = Self::new(mode);
        store.load(reader)?;
        Ok(store)
    }

    /// Store loaded from a JSON file.
    pub fn from_path(path: impl AsRef<Path>, mode: MatchMode) -> Result<Self, LoadError> {
        let store = Self::new(mode);
        store.load_from_path(path)?;
        Ok(store)
    }

    /// Store loaded from an in-memory JSON document.
    pub fn from_json(json: &str, mode: MatchMode) -> Result<Self, LoadError> {
        let store = Self::new(mode);
        store.load_slice(json.as_bytes())?;
        Ok(store)
    }

    /// Matching mode used for loaded tables.
    #[must_use]
    pub fn match_mode(&self) -> MatchMode {
        self.mode
    }

    /// Reads the whole stream and installs the rules it holds.
    ///
    /// See [`load_slice`](Self::load_slice).
    pub fn load<R: Read>(&self, mut reader: R) -> Result<LoadReport, LoadError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map_err(LoadError::Read)?;
        self.load_slice(&buf)
    }

    /// Opens `path` and installs the rules it holds.
    pub fn load_from_path(&self, path: impl AsRef<Path>) -> Result<LoadReport, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading rules");
        self.load(file)
    }

    /// Parses a JSON array of rule records and installs the compilable ones.
    ///
    /// A resource that is not a well-formed array fails with
    /// [`LoadError::Malformed`] and leaves the current table in place.
    /// Records with an empty or invalid URL pattern, or an empty XPath, are
    /// logged and skipped.
    pub fn load_slice(&self, bytes: &[u8]) -> Result<LoadReport, LoadError> {
        let _loading = self.loading.lock();
        let records: Vec<RuleRecord> = serde_json::from_slice(bytes)?;
        let (set, report) = compile(records, self.mode);
        *self.active.write() = set;
        info!(
            installed = report.installed,
            skipped = report.skipped,
            "rule table installed"
        );
        Ok(report)
    }

    /// Snapshot of the active table.
    #[must_use]
    pub fn dump(&self) -> RuleSet {
        self.active.read().clone()
    }

    /// Number of active rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.read().rules().len()
    }

    /// Whether no rules are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First active rule whose pattern occurs in `url`.
    #[must_use]
    pub fn find(&self, url: &str) -> Option<MatchedRule> {
        self.dump().find_owned(url)
    }
}

fn compile(records: Vec<RuleRecord>, mode: MatchMode) -> (RuleSet, LoadReport) {
    let total = records.len();
    let mut rules = Vec::with_capacity(total);
    for record in records {
        let name = record.name.clone();
        match Rule::compile(record) {
            Ok(rule) => rules.push(rule),
            Err(reason) => warn!(rule = %name, %reason, "ignoring rule"),
        }
    }
    let report = LoadReport {
        records: total,
        installed: rules.len(),
        skipped: total - rules.len(),
    };
    (RuleSet::new(rules, mode), report)
}
