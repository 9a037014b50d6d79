use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::PathBuf;
use thaw::ir::TargetDesc;
use thaw::parser::parse_document;
use thaw::{printer, reconstruct, ReconstructOptions};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// thaw — reconstructs serialized IR documents into one graph.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input documents (.json), merged in the order given
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Module name (default: the first document's `module` field)
    #[arg(short = 'o')]
    module_name: Option<String>,

    /// Turn all internal continuations into ordinary ones
    #[arg(long)]
    remove_interns: bool,

    /// Keep a specific intern by name; implies --remove-interns
    #[arg(long = "keep-intern", value_name = "NAME")]
    keep_interns: Vec<String>,

    /// Print the aliases in the scope of the given continuation
    #[arg(short, long, value_name = "ALIAS")]
    scope: Option<String>,

    /// Initial host triple
    #[arg(long)]
    host_triple: Option<String>,

    /// Initial host cpu
    #[arg(long)]
    host_cpu: Option<String>,

    /// Initial host attributes
    #[arg(long)]
    host_attr: Option<String>,

    /// Write the textual IR dump to stdout, or to PATH with --emit-ir=PATH
    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "-"
    )]
    emit_ir: Option<PathBuf>,

    /// Log level; overrides RUST_LOG
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

impl Cli {
    fn options(&self) -> ReconstructOptions {
        ReconstructOptions {
            module_name: self.module_name.clone(),
            remove_interns: self.remove_interns,
            keep_interns: self.keep_interns.iter().cloned().collect(),
            target: TargetDesc {
                triple: self.host_triple.clone(),
                cpu: self.host_cpu.clone(),
                attrs: self.host_attr.clone(),
            },
            scope: self.scope.clone(),
        }
    }
}

fn init_logging(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let mut documents = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        eprintln!("thaw: reading {}", path.display());
        let text =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let label = path.display().to_string();
        let doc = parse_document(&label, &text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        documents.push(doc);
    }

    eprintln!("thaw: reconstructing {} document(s)", documents.len());
    let result = reconstruct(&documents, &cli.options()).context("reconstruction failed")?;

    for scope in &result.scopes {
        println!("scope of {} in {}:", cli.scope.as_deref().unwrap_or_default(), scope.document);
        for alias in &scope.aliases {
            println!("  {}", alias);
        }
    }

    if let Some(path) = &cli.emit_ir {
        let dump = printer::print_world(result.session.world());
        if path.as_os_str() == "-" {
            print!("{}", dump);
        } else {
            fs::write(path, &dump).with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("thaw: wrote {}", path.display());
        }
    }

    let warnings = result.session.diagnostics().len();
    eprintln!(
        "thaw: module {} complete ({} types, {} defs, {} warning(s))",
        result.module_name,
        result.session.world().num_types(),
        result.session.world().num_defs(),
        warnings
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["thaw", "a.json"]);
        assert_eq!(cli.files, vec![PathBuf::from("a.json")]);
        assert!(cli.module_name.is_none());
        assert!(cli.emit_ir.is_none());
        assert!(!cli.options().intern_policy().removes_interns());
    }

    #[test]
    fn cli_requires_a_file() {
        assert!(Cli::try_parse_from(["thaw"]).is_err());
    }

    #[test]
    fn cli_keep_intern_is_repeatable() {
        let cli = Cli::parse_from([
            "thaw",
            "a.json",
            "b.json",
            "--keep-intern",
            "f",
            "--keep-intern",
            "g",
        ]);
        assert_eq!(cli.files.len(), 2);
        let policy = cli.options().intern_policy();
        assert!(policy.removes_interns());
        assert_eq!(policy.kept().len(), 2);
    }

    #[test]
    fn cli_emit_ir_without_path_means_stdout() {
        let cli = Cli::parse_from(["thaw", "a.json", "--emit-ir"]);
        assert_eq!(cli.emit_ir, Some(PathBuf::from("-")));

        let cli = Cli::parse_from(["thaw", "a.json", "--emit-ir=out.ir"]);
        assert_eq!(cli.emit_ir, Some(PathBuf::from("out.ir")));
    }

    #[test]
    fn cli_emit_ir_leaves_following_inputs_alone() {
        let cli = Cli::parse_from(["thaw", "--emit-ir", "a.json", "b.json"]);
        assert_eq!(cli.emit_ir, Some(PathBuf::from("-")));
        assert_eq!(
            cli.files,
            vec![PathBuf::from("a.json"), PathBuf::from("b.json")]
        );
    }

    #[test]
    fn cli_target_and_log_level() {
        let cli = Cli::parse_from([
            "thaw",
            "a.json",
            "-o",
            "demo",
            "--host-cpu",
            "znver3",
            "--log-level",
            "debug",
        ]);
        let options = cli.options();
        assert_eq!(options.module_name.as_deref(), Some("demo"));
        assert_eq!(options.target.cpu.as_deref(), Some("znver3"));
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
    }
}
