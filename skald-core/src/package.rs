//! Compiling a directory of source files as one program.
//!
//! Every `.sk` file of the directory is compiled on a thread of its
//! own against one set of shared [`Tables`]. Workers first declare
//! their concepts, then meet at a barrier so that every file can call
//! concepts of every other file. The file holding `main` additionally
//! waits at the [`Rendezvous`] until all of its siblings are done, so
//! its entry block sees every thing and alias they define.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crossbeam::sync::WaitGroup;
use parking_lot::{Condvar, Mutex};
use tracing::debug;
use walkdir::WalkDir;

use crate::buffer::Buffer;
use crate::compiler::{CompileOptions, Compiler, Output, materialize};
use crate::error::{CoreError, Result};
use crate::span::SourceFile;
use crate::tables::Tables;

/// File extension of source files.
pub const SOURCE_EXTENSION: &str = "sk";

#[derive(Debug)]
struct Gate {
    /// Workers that have not finished yet.
    outstanding: usize,
    entry_claimed: bool,
    cancelled: bool,
}

/// Where the entry file waits for the rest of its package.
#[derive(Debug)]
pub(crate) struct Rendezvous {
    gate: Mutex<Gate>,
    changed: Condvar,
}

impl Rendezvous {
    pub(crate) fn new(members: usize) -> Self {
        Self {
            gate: Mutex::new(Gate {
                outstanding: members,
                entry_claimed: false,
                cancelled: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// True for the first caller only.
    pub(crate) fn claim_entry(&self) -> bool {
        let mut gate = self.gate.lock();
        !std::mem::replace(&mut gate.entry_claimed, true)
    }

    /// Blocks until the caller is the last worker still running. False
    /// when released by cancellation instead.
    pub(crate) fn wait_for_siblings(&self) -> bool {
        let mut gate = self.gate.lock();
        while gate.outstanding > 1 && !gate.cancelled {
            self.changed.wait(&mut gate);
        }
        !gate.cancelled
    }

    pub(crate) fn arrive(&self) {
        let mut gate = self.gate.lock();
        gate.outstanding = gate.outstanding.saturating_sub(1);
        self.changed.notify_all();
    }

    pub(crate) fn cancel(&self) {
        self.gate.lock().cancelled = true;
        self.changed.notify_all();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.gate.lock().cancelled
    }
}

/// Marks a worker as finished when dropped, and cancels the package if
/// the worker is unwinding.
struct Arrival<'g>(&'g Rendezvous);

impl Drop for Arrival<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.cancel();
        }
        self.0.arrive();
    }
}

/// Compile every source file directly inside `dir` into one program.
pub fn compile_package(dir: impl AsRef<Path>, options: &CompileOptions) -> Result<Output> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(CoreError::MissingSource(dir.to_path_buf()));
    }
    let files = source_files(dir)?;
    if files.is_empty() {
        return Err(CoreError::EmptyPackage {
            dir: dir.to_path_buf(),
            extension: SOURCE_EXTENSION,
        });
    }
    debug!(dir = %dir.display(), files = files.len(), "compiling package");

    let tables = Mutex::new(Tables::default());
    let gate = Rendezvous::new(files.len());
    let buffers = Mutex::new(Vec::with_capacity(files.len()));
    let failure: Mutex<Option<CoreError>> = Mutex::new(None);
    let declared = WaitGroup::new();

    let finished = crossbeam::scope(|s| {
        for path in &files {
            let declared = declared.clone();
            let (tables, gate, buffers, failure) = (&tables, &gate, &buffers, &failure);
            s.spawn(move |_| {
                let _arrival = Arrival(gate);
                match compile_member(path, options, tables, gate, declared) {
                    Ok(buffer) => {
                        debug!(file = %path.display(), "member compiled");
                        buffers.lock().push(buffer);
                    }
                    Err(error) => {
                        debug!(file = %path.display(), %error, "member failed");
                        gate.cancel();
                        if !matches!(error, CoreError::Cancelled(_)) {
                            failure.lock().get_or_insert(error);
                        }
                    }
                }
            });
        }
        drop(declared);
    });
    if finished.is_err() {
        return Err(CoreError::TaskPanicked);
    }
    if let Some(error) = failure.into_inner() {
        return Err(error);
    }

    let mut merged = Buffer::new(options.targets);
    for buffer in buffers.into_inner() {
        merged.append(&buffer);
    }
    Ok(materialize(merged, &tables.into_inner(), options.targets))
}

fn source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension() == Some(OsStr::new(SOURCE_EXTENSION)) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// One worker: declare, wait for every sibling to declare, then compile.
fn compile_member(
    path: &Path,
    options: &CompileOptions,
    tables: &Mutex<Tables>,
    gate: &Rendezvous,
    declared: WaitGroup,
) -> Result<Buffer> {
    let text = fs::read_to_string(path)?;
    let file = SourceFile::new(path.display().to_string(), text);
    let mut compiler = Compiler::shared(options.clone(), tables.lock(), gate);
    let tokens = compiler.open_unit(&file, "")?;
    let declarations = compiler.declare(&tokens);
    compiler.park(|| declared.wait());
    declarations?;
    compiler.compile_statements()?;
    compiler.close_unit()?;
    Ok(compiler.into_buffer())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::backend::Backend;
    use crate::error::ErrorKind;

    fn package(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, text) in files {
            fs::write(dir.path().join(name), text).unwrap();
        }
        dir
    }

    #[test]
    fn entry_is_claimed_once() {
        let gate = Rendezvous::new(2);
        assert!(gate.claim_entry());
        assert!(!gate.claim_entry());
    }

    #[test]
    fn entry_waits_for_siblings() {
        let gate = Arc::new(Rendezvous::new(2));
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait_for_siblings())
        };
        gate.arrive();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn cancel_releases_the_entry() {
        let gate = Arc::new(Rendezvous::new(3));
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait_for_siblings())
        };
        gate.cancel();
        assert!(!waiter.join().unwrap());
        assert!(gate.is_cancelled());
    }

    #[test]
    fn entry_sees_the_whole_package() {
        let dir = package(&[
            ("main.sk", "main {\n\tprint(double(21))\n\tp = Point()\n\tprint(p.x)\n}\n"),
            ("shapes.sk", "thing Point {\n\tx = 1\n}\n"),
            ("util.sk", "double(n): return n * 2\n"),
            ("notes.txt", "not source\n"),
        ]);
        let output = compile_package(dir.path(), &CompileOptions::default()).unwrap();
        let program = output.program(Backend::Go).unwrap();
        assert!(program.contains("func double(n int) int {"));
        assert!(program.contains("type Point struct {\n\tx int\n}"));
        assert!(program.contains("\t\tfmt.Println(double(21))\n"));
        assert!(program.contains("\t\tvar p = new_Point()\n"));
        let head = program.find("type Point").unwrap();
        let entry = program.find("func main() {").unwrap();
        assert!(head < entry);
    }

    #[test]
    fn failing_member_fails_the_package() {
        let dir = package(&[
            ("main.sk", "main {\n\tprint(1)\n}\n"),
            ("broken.sk", "x = nowhere\n"),
        ]);
        let error = compile_package(dir.path(), &CompileOptions::default()).unwrap_err();
        assert_eq!(
            error.kind(),
            Some(&ErrorKind::UndefinedName("nowhere".to_string()))
        );
    }

    #[test]
    fn only_one_file_may_hold_main() {
        let dir = package(&[
            ("a.sk", "main {\n\tprint(1)\n}\n"),
            ("b.sk", "main {\n\tprint(2)\n}\n"),
        ]);
        let error = compile_package(dir.path(), &CompileOptions::default()).unwrap_err();
        assert!(error.to_string().contains("main is defined in more than one file"));
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = package(&[("readme.md", "# nothing\n")]);
        let error = compile_package(dir.path(), &CompileOptions::default()).unwrap_err();
        assert!(matches!(error, CoreError::EmptyPackage { .. }));
        let error = compile_package(dir.path().join("missing"), &CompileOptions::default())
            .unwrap_err();
        assert!(matches!(error, CoreError::MissingSource(_)));
    }
}
