use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use snapsequence_core::{apply_plan_with_options, plan_folder, ApplyOptions, RenamePlan};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "snapsequence")]
#[command(about = "Rename photos in a folder sequentially (01.jpg, 02.jpg, etc.)")]
struct Cli {
    /// Path to folder containing images
    folder: PathBuf,
    /// Rename without asking for confirmation
    #[arg(long, default_value_t = false)]
    yes: bool,
    /// Restore original names if any rename fails part way through
    #[arg(long, default_value_t = false)]
    rollback_on_failure: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Renamed(usize),
    Cancelled,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout().lock();
    match run(&cli, &mut input, &mut output) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::OFF,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run<R: BufRead, W: Write>(cli: &Cli, input: &mut R, output: &mut W) -> Result<Outcome> {
    let plan = plan_folder(&cli.folder)?;

    match cli.output {
        OutputFormat::Json => {
            writeln!(output, "{}", serde_json::to_string_pretty(&plan)?)?;
        }
        OutputFormat::Table => {
            print_table(&plan, output)?;
        }
    }

    if !cli.yes && !confirm(input, output)? {
        writeln!(output, "Operation cancelled")?;
        return Ok(Outcome::Cancelled);
    }

    let options = ApplyOptions {
        rollback_on_failure: cli.rollback_on_failure,
    };
    let result = apply_plan_with_options(&plan, &options).map_err(|err| {
        let context = if err.is_validation() {
            "Nothing was renamed"
        } else {
            "Rename operation failed"
        };
        anyhow::Error::new(err).context(context)
    })?;
    writeln!(output, "\nSuccess! Renamed {} file(s)", result.renamed)?;
    Ok(Outcome::Renamed(result.renamed))
}

fn print_table<W: Write>(plan: &RenamePlan, output: &mut W) -> io::Result<()> {
    let rule = "-".repeat(50);
    writeln!(output, "\nPreview of changes:")?;
    writeln!(output, "{rule}")?;
    for candidate in &plan.candidates {
        writeln!(
            output,
            "  {} -> {}",
            candidate.original_name(),
            candidate.target_name()
        )?;
    }
    writeln!(output, "{rule}")?;
    writeln!(output, "Total: {} file(s) to rename\n", plan.len())?;
    Ok(())
}

/// Asks until the answer is yes or no. End of input declines.
fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<bool> {
    loop {
        write!(output, "Proceed with rename? (y/n): ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please enter 'y' or 'n'")?,
        }
    }
}
