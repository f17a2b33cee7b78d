use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use snafu::{ResultExt, Snafu};
use stackcc::{CompileError, Dialect, codegen, dump, parser, tokenizer};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stackcc")]
#[command(about = "Compile a tiny C-like language to x86-64 assembly")]
struct Args {
  /// Program text. Read from --file or stdin when omitted.
  source: Option<String>,
  /// Read the program from this file.
  #[arg(short, long, conflicts_with = "source")]
  file: Option<PathBuf>,
  /// Output assembly file. Writes to stdout if omitted.
  #[arg(short, long)]
  output: Option<PathBuf>,
  /// Top-level shape of the program.
  #[arg(short, long, value_enum, default_value_t = DialectArg::Func)]
  dialect: DialectArg,
  /// Write the token stream to this file.
  #[arg(long)]
  dump_tokens: Option<PathBuf>,
  /// Write the syntax tree to this file.
  #[arg(long)]
  dump_ast: Option<PathBuf>,
  /// Log pipeline stages to stderr (RUST_LOG takes precedence).
  #[arg(short, long)]
  verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DialectArg {
  /// A single expression.
  Expr,
  /// Statements forming the body of main.
  Stmt,
  /// Function definitions.
  Func,
}

impl From<DialectArg> for Dialect {
  fn from(arg: DialectArg) -> Self {
    match arg {
      DialectArg::Expr => Dialect::Expression,
      DialectArg::Stmt => Dialect::Statements,
      DialectArg::Func => Dialect::Functions,
    }
  }
}

#[derive(Debug, Snafu)]
enum DriverError {
  #[snafu(display("cannot read {}: {source}", path.display()))]
  ReadSource { path: PathBuf, source: io::Error },

  #[snafu(display("cannot read program from stdin: {source}"))]
  ReadStdin { source: io::Error },

  #[snafu(display("cannot write {}: {source}", path.display()))]
  WriteFile { path: PathBuf, source: io::Error },

  #[snafu(display("cannot write assembly to stdout: {source}"))]
  WriteStdout { source: io::Error },

  #[snafu(context(false), display("{source}"))]
  Compile { source: CompileError },
}

fn main() {
  let args = Args::parse();
  init_tracing(args.verbose);

  if let Err(err) = run(&args) {
    eprintln!("{err}");
    process::exit(1);
  }
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(io::stderr)
    .init();
}

fn run(args: &Args) -> Result<(), DriverError> {
  let source = read_source(args)?;
  let dialect = Dialect::from(args.dialect);
  info!(?dialect, bytes = source.len(), "compiling");

  let tokens = tokenizer::tokenize(&source)?;
  if let Some(path) = &args.dump_tokens {
    write_file(path, &dump::tokens(&tokens))?;
  }

  let program = parser::parse(tokens, &source, dialect)?;
  if let Some(path) = &args.dump_ast {
    write_file(path, &dump::program(&program))?;
  }

  let asm = codegen::generate(&program)?;
  match &args.output {
    Some(path) => write_file(path, &asm),
    None => io::stdout()
      .lock()
      .write_all(asm.as_bytes())
      .context(WriteStdoutSnafu),
  }
}

fn read_source(args: &Args) -> Result<String, DriverError> {
  if let Some(source) = &args.source {
    return Ok(source.clone());
  }
  if let Some(path) = &args.file {
    return fs::read_to_string(path).context(ReadSourceSnafu { path });
  }
  let mut source = String::new();
  io::stdin()
    .read_to_string(&mut source)
    .context(ReadStdinSnafu)?;
  Ok(source)
}

fn write_file(path: &Path, contents: &str) -> Result<(), DriverError> {
  debug!(path = %path.display(), "writing");
  fs::write(path, contents).context(WriteFileSnafu { path })
}
