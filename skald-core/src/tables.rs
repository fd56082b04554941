//! Compile-wide tables: concepts, things and aliases per package, plus
//! the runtime helpers and native imports already emitted.
//!
//! A single-file compile owns its tables. A package compile shares one
//! set between worker threads behind a mutex, and each worker holds the
//! lock for as long as it compiles.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::MutexGuard;

use crate::backend::{Backend, Helper};
use crate::concept::Concept;
use crate::lexer::Token;
use crate::types::ThingDef;

/// Everything declared by one package. The root package is named `""`.
#[derive(Debug, Default)]
pub struct PackageTable {
    pub concepts: HashMap<String, Concept>,
    pub things: HashMap<String, Arc<ThingDef>>,
    pub aliases: HashMap<String, Vec<Token>>,
}

#[derive(Debug, Default)]
pub struct Tables {
    packages: HashMap<String, PackageTable>,
    helpers: HashSet<(Backend, Helper)>,
    imports: BTreeSet<(Backend, String)>,
}

impl Tables {
    pub fn package(&self, name: &str) -> Option<&PackageTable> {
        self.packages.get(name)
    }

    pub fn package_mut(&mut self, name: &str) -> &mut PackageTable {
        self.packages.entry(name.to_string()).or_default()
    }

    /// Registers an imported package. `false` when it was seen before.
    pub fn begin_package(&mut self, name: &str) -> bool {
        if self.packages.contains_key(name) {
            return false;
        }
        self.packages.insert(name.to_string(), PackageTable::default());
        true
    }

    pub fn has_package(&self, name: &str) -> bool {
        !name.is_empty() && self.packages.contains_key(name)
    }

    pub fn concept(&self, package: &str, name: &str) -> Option<&Concept> {
        self.package(package)?.concepts.get(name)
    }

    pub fn concept_mut(&mut self, package: &str, name: &str) -> Option<&mut Concept> {
        self.packages.get_mut(package)?.concepts.get_mut(name)
    }

    pub fn thing(&self, package: &str, name: &str) -> Option<Arc<ThingDef>> {
        self.package(package)?.things.get(name).cloned()
    }

    pub fn alias(&self, package: &str, name: &str) -> Option<Vec<Token>> {
        self.package(package)?.aliases.get(name).cloned()
    }

    /// Marks `helper` as emitted for `backend`. `true` the first time.
    pub fn mark_helper(&mut self, backend: Backend, helper: Helper) -> bool {
        self.helpers.insert((backend, helper))
    }

    pub fn add_import(&mut self, backend: Backend, package: &str) {
        self.imports.insert((backend, package.to_string()));
    }

    /// Native imports for `backend`, sorted.
    pub fn imports(&self, backend: Backend) -> impl Iterator<Item = &str> {
        self.imports
            .iter()
            .filter(move |(b, _)| *b == backend)
            .map(|(_, package)| package.as_str())
    }
}

/// The tables a compiler works on: its own, or the locked shared set.
#[derive(Debug)]
pub(crate) enum TablesRef<'a> {
    Owned(Box<Tables>),
    Shared(MutexGuard<'a, Tables>),
}

impl TablesRef<'_> {
    /// Runs `f` with the shared lock released so other workers can make
    /// progress. Owned tables have no lock to release.
    pub(crate) fn unlocked<U>(&mut self, f: impl FnOnce() -> U) -> U {
        match self {
            TablesRef::Owned(_) => f(),
            TablesRef::Shared(guard) => MutexGuard::unlocked(guard, f),
        }
    }
}

impl Deref for TablesRef<'_> {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        match self {
            TablesRef::Owned(tables) => tables,
            TablesRef::Shared(guard) => guard,
        }
    }
}

impl DerefMut for TablesRef<'_> {
    fn deref_mut(&mut self) -> &mut Tables {
        match self {
            TablesRef::Owned(tables) => tables,
            TablesRef::Shared(guard) => guard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn helpers_are_marked_once_per_backend() {
        let mut tables = Tables::default();
        assert!(tables.mark_helper(Backend::Go, Helper::Wrap));
        assert!(!tables.mark_helper(Backend::Go, Helper::Wrap));
        assert!(tables.mark_helper(Backend::Js, Helper::Wrap));
    }

    #[test]
    fn imports_are_sorted_and_deduplicated() {
        let mut tables = Tables::default();
        tables.add_import(Backend::Go, "strconv");
        tables.add_import(Backend::Go, "fmt");
        tables.add_import(Backend::Go, "fmt");
        tables.add_import(Backend::Js, "ignored");
        let go: Vec<&str> = tables.imports(Backend::Go).collect();
        assert_eq!(go, ["fmt", "strconv"]);
    }

    #[test]
    fn packages_begin_once() {
        let mut tables = Tables::default();
        assert!(tables.begin_package("geometry"));
        assert!(!tables.begin_package("geometry"));
        assert!(tables.has_package("geometry"));
        assert!(!tables.has_package(""));
    }

    #[test]
    fn shared_tables_unlock_while_parked() {
        let shared = Mutex::new(Tables::default());
        let mut tables = TablesRef::Shared(shared.lock());
        let relocked = tables.unlocked(|| shared.try_lock().is_some());
        assert!(relocked);
        assert!(shared.try_lock().is_none());
    }
}
