use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox::error::Diagnostics;
use rox::interpreter::{Interpreter, MAX_CALL_DEPTH};
use rox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print one JSON object per token
        #[arg(long)]
        json: bool,
    },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Reads and runs Lox one line at a time (the default)
    Repl,
}

/// Source file contents, memory-mapped.
enum Source {
    Mapped(Mmap),
    Empty,
}

impl Source {
    fn bytes(&self) -> &[u8] {
        match self {
            Source::Mapped(map) => &map[..],
            Source::Empty => &[],
        }
    }

    fn text(&self) -> Result<&str> {
        std::str::from_utf8(self.bytes()).context("Source is not valid UTF-8")
    }
}

/// Maps the contents of a file into memory.
fn read_file(filename: &Path) -> Result<Source> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    if len == 0 {
        return Ok(Source::Empty);
    }

    // SAFETY: the mapping is read-only and lives no longer than this run;
    // the file is not expected to change underneath the interpreter.
    let map = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", map.len(), filename);

    Ok(Source::Mapped(map))
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report(diagnostics: &Diagnostics) {
    for error in diagnostics {
        debug!("Diagnostic: {}", error);
        eprintln!("{}", error);
    }
}

fn tokenize(filename: &Path, json: bool) -> Result<i32> {
    let source = read_file(filename)?;
    let mut tokenized = true;

    for token in Scanner::new(source.text()?) {
        match token {
            Ok(token) if json => println!("{}", serde_json::to_string(&token)?),

            Ok(token) => println!("{}", token),

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    Ok(if tokenized { 0 } else { 65 })
}

fn run_file(filename: &Path) -> Result<i32> {
    let source = read_file(filename)?;
    let text = source.text()?;

    let mut interpreter = Interpreter::new();
    let diagnostics = rox::run(&mut interpreter, text);

    report(&diagnostics);

    Ok(diagnostics.exit_code())
}

fn run_prompt() -> Result<i32> {
    // Functions defined on one line are called from later ones, so every
    // line must outlive the session: lines are leaked.
    let mut interpreter: Interpreter<'static> = Interpreter::new();
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        line.clear();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if read == 0 {
            break;
        }

        let source: &'static str = Box::leak(line.clone().into_boxed_str());
        let diagnostics = rox::run(&mut interpreter, source);

        report(&diagnostics);
    }

    Ok(0)
}

/// Stack for the thread that evaluates programs, sized so that
/// `MAX_CALL_DEPTH` nested Lox calls fit.
const EVAL_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Runs `job` on a thread with an `EVAL_STACK_SIZE` stack.
fn with_eval_stack<F>(job: F) -> Result<i32>
where
    F: FnOnce() -> Result<i32> + Send + 'static,
{
    debug!(
        "Spawning evaluator thread ({} bytes of stack, {} nested calls)",
        EVAL_STACK_SIZE, MAX_CALL_DEPTH
    );

    thread::Builder::new()
        .name("evaluator".into())
        .stack_size(EVAL_STACK_SIZE)
        .spawn(job)
        .context("Failed to spawn evaluator thread")?
        .join()
        .map_err(|_| anyhow!("Evaluator thread panicked"))?
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let code = match args.commands {
        Some(Commands::Tokenize { filename, json }) => tokenize(&filename, json)?,
        Some(Commands::Run { filename }) => with_eval_stack(move || run_file(&filename))?,
        Some(Commands::Repl) | None => with_eval_stack(run_prompt)?,
    };

    info!("Exiting with code {}", code);

    std::process::exit(code);
}
