//! assert-introspect CLI

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use assert_introspect::error::{report_error, report_warning};
use assert_introspect::interp::{self, Value};
use assert_introspect::{CompileError, Config, RewriteReport, Rewriter, TranslationUnit};

#[derive(Parser)]
#[command(
    name = "assert-introspect",
    version,
    about = "Rewrite C assertions to report the values behind a failure"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: Options,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

/// Overrides for `introspect.toml`
#[derive(Args)]
struct Options {
    /// Configuration file (default: introspect.toml next to the input)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Plain reports without ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Only rewrite assertions in this function (repeatable)
    #[arg(long = "function", global = true)]
    functions: Vec<String>,

    /// Capacity of each generated repr buffer
    #[arg(long, global = true)]
    buffer_size: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite assertions and print the resulting C
    Rewrite {
        /// Source file to rewrite
        file: PathBuf,
        /// Write the output here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rewrite, then interpret a function call
    Run {
        /// Source file to run
        file: PathBuf,
        /// Function to call
        #[arg(long, default_value = "main")]
        call: String,
        /// Integer argument (repeatable, in order)
        #[arg(long = "arg", allow_negative_numbers = true)]
        args: Vec<i64>,
        /// Run the assertions as written
        #[arg(long)]
        no_rewrite: bool,
    },
    /// Report which assertions can be rewritten
    Check {
        /// Source file to check
        file: PathBuf,
    },
    /// Parse and dump the syntax tree as JSON (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Command::Rewrite { file, output } => rewrite_file(file, output.as_deref(), &cli.options),
        Command::Run {
            file,
            call,
            args,
            no_rewrite,
        } => run_file(file, call, args, *no_rewrite, &cli.options),
        Command::Check { file } => check_file(file, &cli.options),
        Command::Parse { file } => parse_file(file),
        Command::Tokens { file } => tokenize_file(file),
    };

    match result {
        Ok(status) => std::process::exit(status),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

type CliResult = Result<i32, Box<dyn std::error::Error>>;

/// Configuration file values with command-line overrides applied
fn load_config(file: &Path, options: &Options) -> Result<Config, CompileError> {
    let dir = file.parent().unwrap_or_else(|| Path::new("."));
    let mut config = Config::discover(options.config.as_deref(), dir)?;
    if options.no_color {
        config.rewrite.color = false;
    }
    if !options.functions.is_empty() {
        config.rewrite.functions = options.functions.clone();
    }
    if let Some(size) = options.buffer_size {
        config.rewrite.buffer_size = size;
    }
    config.validate()?;
    Ok(config)
}

/// Front end; errors are rendered against the source before returning
fn compile_file(path: &Path) -> Result<(String, String, TranslationUnit), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();
    match assert_introspect::compile(&filename, &source) {
        Ok(unit) => Ok((filename, source, unit)),
        Err(e) => {
            report_error(&filename, &source, &e);
            Err(e.into())
        }
    }
}

fn rewrite_unit(filename: &str, source: &str, unit: &mut TranslationUnit, config: &Config) -> RewriteReport {
    let report = Rewriter::new(config).run(unit);
    for diagnostic in &report.diagnostics {
        report_warning(filename, source, diagnostic.span, &diagnostic.message());
    }
    report
}

fn rewrite_file(path: &Path, output: Option<&Path>, options: &Options) -> CliResult {
    let config = load_config(path, options)?;
    let (filename, source, mut unit) = compile_file(path)?;
    rewrite_unit(&filename, &source, &mut unit, &config);

    let text = assert_introspect::emit_c(&unit);
    match output {
        Some(out) => std::fs::write(out, text)?,
        None => print!("{text}"),
    }
    Ok(0)
}

fn run_file(path: &Path, call: &str, args: &[i64], no_rewrite: bool, options: &Options) -> CliResult {
    let config = load_config(path, options)?;
    let (filename, source, mut unit) = compile_file(path)?;
    if !no_rewrite {
        rewrite_unit(&filename, &source, &mut unit, &config);
    }

    let args: Vec<Value> = args.iter().map(|n| Value::Int(i128::from(*n))).collect();
    let execution = interp::run(&unit, call, &args)?;
    print!("{}", execution.stdout);
    eprint!("{}", execution.stderr);
    tracing::debug!(outcome = ?execution.outcome, "call finished");
    Ok(execution.outcome.status())
}

fn check_file(path: &Path, options: &Options) -> CliResult {
    let config = load_config(path, options)?;
    let (filename, source, mut unit) = compile_file(path)?;
    let report = rewrite_unit(&filename, &source, &mut unit, &config);

    let skipped = report.diagnostics.len();
    println!(
        "{filename}: {} assertion(s) rewritten, {skipped} left unchanged",
        report.rewritten
    );
    Ok(if report.is_clean() { 0 } else { 1 })
}

fn parse_file(path: &Path) -> CliResult {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let tokens = assert_introspect::lexer::tokenize(&source)?;
    let ast = assert_introspect::parser::parse(&filename, &source, tokens)?;

    println!("{}", serde_json::to_string_pretty(&ast)?);
    Ok(0)
}

fn tokenize_file(path: &Path) -> CliResult {
    let source = std::fs::read_to_string(path)?;

    let tokens = assert_introspect::lexer::tokenize(&source)?;
    for (tok, span) in &tokens {
        println!("{:?} @ {}..{}", tok, span.start, span.end);
    }

    Ok(0)
}
