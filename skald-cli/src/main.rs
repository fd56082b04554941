use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use skald_core::{
    Backend, CompileOptions, Output, Targets, compile_file, compile_package, compile_source,
};
use tracing::{debug, info};

mod logger;

/// Compile Skald programs to Go and JavaScript.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        help = "Source file, or a directory compiled as one package (stdin when absent)"
    )]
    input: Option<PathBuf>,

    #[arg(short, long, help = "Output path (stdout when absent)")]
    output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory imports are resolved against (defaults to the input's directory)"
    )]
    root: Option<PathBuf>,

    #[arg(
        long,
        value_name = "BACKEND",
        value_delimiter = ',',
        default_value = "go",
        help = "Backends to emit: go, js"
    )]
    emit: Vec<Backend>,

    #[arg(long, help = "Run the generated Go program with `go run`")]
    run: bool,

    #[arg(short, long, action = ArgAction::Count, help = "More log output (repeatable)")]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let targets: Targets = cli.emit.iter().copied().collect();
    let root = cli
        .root
        .clone()
        .unwrap_or_else(|| default_root(cli.input.as_deref()));
    debug!(root = %root.display(), "import root");
    let options = CompileOptions { targets, root };

    let output = compile(cli.input.as_deref(), &options)?;

    match &cli.output {
        Some(path) => write_outputs(path, &output, targets)?,
        None => {
            let mut stdout = io::stdout().lock();
            for backend in targets.iter() {
                output.write_to(backend, &mut stdout)?;
            }
            stdout.flush()?;
        }
    }

    if cli.run {
        run_go(&output)?;
    }
    Ok(())
}

fn default_root(input: Option<&Path>) -> PathBuf {
    match input {
        Some(path) if path.is_dir() => path.to_path_buf(),
        Some(path) => path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        None => PathBuf::from("."),
    }
}

fn compile(input: Option<&Path>, options: &CompileOptions) -> Result<Output> {
    match input {
        Some(path) if path.is_dir() => compile_package(path, options)
            .with_context(|| format!("failed to compile package {}", path.display())),
        Some(path) => compile_file(path, options)
            .with_context(|| format!("failed to compile {}", path.display())),
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("failed to read stdin")?;
            compile_source("<stdin>", &source, options).context("failed to compile stdin")
        }
    }
}

/// One backend writes to `path` itself; several get one file each,
/// named by the backend's extension.
fn write_outputs(path: &Path, output: &Output, targets: Targets) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    let several = targets.iter().count() > 1;
    for (backend, program) in output.programs() {
        let target = if several {
            path.with_extension(backend.extension())
        } else {
            path.to_path_buf()
        };
        fs::write(&target, program)
            .with_context(|| format!("failed to write output file {}", target.display()))?;
        info!(%backend, path = %target.display(), "wrote program");
    }
    Ok(())
}

fn run_go(output: &Output) -> Result<()> {
    let Some(program) = output.program(Backend::Go) else {
        bail!("--run needs the go backend");
    };
    let dir = tempfile::tempdir().context("failed to create a build directory")?;
    let path = dir.path().join("main.go");
    fs::write(&path, program).context("failed to write the go program")?;
    let status = Command::new("go")
        .arg("run")
        .arg(&path)
        .status()
        .context("failed to start `go run`; is Go installed?")?;
    if !status.success() {
        bail!("go run exited with {status}");
    }
    Ok(())
}
