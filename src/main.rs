use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use std::{
    fs,
    io::{self, BufRead, Read, Write},
    path::PathBuf,
};
use toy_lang::{
    Outcome, Session, Value,
    cli::{self, CheckFormat, CheckOptions, CheckResult, CliError, RunReport},
    output,
};

#[derive(ClapParser)]
#[command(name = "toy")]
#[command(about = "Toy - a tiny expression language with user-defined operators")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a program (interactive prompt if stdin is a terminal)
    Run {
        /// Source file (reads stdin if not provided)
        file: Option<PathBuf>,
    },

    /// Lower a program and print its IR without running it
    Check {
        /// Source file (reads stdin if not provided)
        file: Option<PathBuf>,

        /// Output format for the IR
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Only validate syntax, don't lower
        #[arg(long)]
        syntax_only: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run { file }) => run(file),
        None => run(None),
        Some(Commands::Check {
            file,
            format,
            syntax_only,
        }) => run_check(file, format, syntax_only),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_source(file: Option<PathBuf>) -> Result<String, CliError> {
    match file {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn run(file: Option<PathBuf>) -> Result<(), CliError> {
    let mut session = Session::default();

    if file.is_none() && atty::is(atty::Stream::Stdin) {
        return repl(&mut session);
    }

    let source = read_source(file)?;
    let report = cli::execute_run(&mut session, &source);
    print_report(&report)?;

    match report.failures() {
        0 => Ok(()),
        n => Err(CliError::ItemsFailed(n)),
    }
}

fn repl(session: &mut Session) -> Result<(), CliError> {
    let stdin = io::stdin();
    let mut line = String::new();
    let mut pending = String::new();

    loop {
        eprint!("{}", if pending.is_empty() { "ready> " } else { "...> " });
        io::stderr().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            eprintln!();
            if !pending.is_empty() {
                print_report(&cli::execute_run(session, &pending))?;
            }
            return Ok(());
        }

        // A blank line forces whatever is pending to run
        let blank = line.trim().is_empty();
        pending.push_str(&line);
        if !blank && session.is_incomplete(&pending) {
            continue;
        }

        let report = cli::execute_run(session, &pending);
        pending.clear();
        print_report(&report)?;
    }
}

fn print_report(report: &RunReport) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    for entry in &report.entries {
        stdout.write_all(entry.output.as_bytes())?;
        for warning in &entry.warnings {
            eprintln!("Warning: {}", warning);
        }
        match &entry.outcome {
            Outcome::Defined(name) => eprintln!("Read function definition: {}", name),
            Outcome::Declared(name) => eprintln!("Read extern: {}", name),
            Outcome::Evaluated(value) => writeln!(stdout, "Evaluated to {}", Value::Number(*value))?,
            Outcome::Lowered(_) => {}
            Outcome::Failed(e) => eprintln!("{}", e),
        }
    }
    stdout.flush()?;
    Ok(())
}

fn run_check(file: Option<PathBuf>, format: Format, syntax_only: bool) -> Result<(), CliError> {
    let options = CheckOptions {
        source: read_source(file)?,
        format: match format {
            Format::Text => CheckFormat::Text,
            Format::Json => CheckFormat::Json,
        },
        syntax_only,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid { items } => println!("Syntax is valid ({} items)", items),
        CheckResult::Lowered { modules, warnings } => {
            for warning in &warnings {
                eprintln!("Warning: {}", warning);
            }
            match options.format {
                CheckFormat::Text => {
                    for module in &modules {
                        print!("{}", module);
                    }
                }
                CheckFormat::Json => {
                    let json: Vec<_> = modules.iter().map(output::module_to_json).collect();
                    println!("{:#}", serde_json::Value::Array(json));
                }
            }
        }
    }
    Ok(())
}
