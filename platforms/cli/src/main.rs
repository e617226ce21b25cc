use beaver::{
    encode_compact, encode_table, encode_tape, CancelToken, Finish, Limits, MachineCatalog, MachineLoader,
    Outcome, Rejection, SearchConfig, SearchDriver, SearchReport, TransitionTable, TuringMachine,
};
use clap::Parser;
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// The transition table file (.tm); read from stdin when piped and omitted
    #[clap(short = 'm', long)]
    machine: Option<PathBuf>,

    /// Use a built-in machine instead of a file (bb1 .. bb5)
    #[clap(long, conflicts_with = "machine")]
    builtin: Option<String>,

    /// The initial tape file (.tape); defaults to a blank tape
    #[clap(short = 't', long)]
    tape: Option<PathBuf>,

    /// Search for busy beavers, starting from the given table
    #[clap(short = 's', long)]
    search: bool,

    /// Start the search from the first table of this shape, e.g. 5x2 (states x symbols)
    #[clap(long, value_parser = parse_shape, requires = "search")]
    shape: Option<(usize, u16)>,

    /// Start the search from this table index of the shape, e.g. one logged by a previous run
    #[clap(long, requires = "shape")]
    index: Option<u128>,

    /// Print each step of the execution
    #[clap(short = 'd', long)]
    debug: bool,

    /// Verbose: print the table before running, save the final tape to out.tape, log progress
    #[clap(short = 'V', long)]
    verbose: bool,

    /// Print the result as JSON
    #[clap(long)]
    json: bool,

    /// Search configuration file (TOML)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Maximum number of steps per run
    #[clap(long)]
    max_steps: Option<u64>,

    /// Maximum tape length, in cells
    #[clap(long)]
    max_tape_len: Option<usize>,

    /// Directory for checkpoint and best-score files
    #[clap(long)]
    output_dir: Option<PathBuf>,

    /// List the built-in machines and exit
    #[clap(long)]
    list: bool,
}

/// The result of a single run, as printed with `--json`.
#[derive(Serialize)]
struct RunSummary {
    outcome: Outcome,
    steps: u64,
    marks: usize,
    state: usize,
    head: i64,
    tape_len: usize,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = execute(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Installs the stderr subscriber. `RUST_LOG` wins over the verbosity flag.
fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).compact())
        .init();
}

fn execute(cli: &Cli) -> Result<(), String> {
    if cli.list {
        return list_machines(cli.json);
    }

    if cli.search {
        search(cli)
    } else {
        simulate(cli)
    }
}

fn list_machines(json: bool) -> Result<(), String> {
    let infos = (0..MachineCatalog::count())
        .map(MachineCatalog::info)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    if json {
        println!("{}", to_json(&infos)?);
        return Ok(());
    }

    for info in infos {
        println!(
            "{:<4} {} states, {} symbols, {} marks in {} steps  {}",
            info.name,
            info.num_states,
            info.num_symbols,
            info.score,
            info.steps,
            info.compact.unwrap_or_default()
        );
    }
    Ok(())
}

/// Resolves the table from `--builtin`, `-m` or piped stdin, in that order.
fn load_table(cli: &Cli) -> Result<Option<TransitionTable>, String> {
    if let Some(name) = &cli.builtin {
        let machine = MachineCatalog::by_name(name).map_err(|e| e.to_string())?;
        return Ok(Some(machine.table.clone()));
    }

    if let Some(path) = &cli.machine {
        return MachineLoader::load_table(path)
            .map(Some)
            .map_err(|e| e.to_string());
    }

    if !atty::is(atty::Stream::Stdin) {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return MachineLoader::load_table_from_string(&content)
            .map(Some)
            .map_err(|e| e.to_string());
    }

    Ok(None)
}

fn simulate(cli: &Cli) -> Result<(), String> {
    let table = load_table(cli)?
        .ok_or_else(|| "No machine given: use -m <file>, --builtin <name> or pipe a table".to_string())?;

    let (tape, state) = match &cli.tape {
        Some(path) => MachineLoader::load_tape(path, &table).map_err(|e| e.to_string())?,
        None => (Default::default(), 0),
    };

    let defaults = Limits::default();
    let limits = Limits::new(
        cli.max_steps.unwrap_or(defaults.max_steps),
        cli.max_tape_len.unwrap_or(defaults.max_tape_len),
    );

    if cli.verbose {
        print!("{}", encode_table(&table, "input"));
        if let Ok(compact) = encode_compact(&table) {
            println!("# {}", compact);
        }
        println!();
        print!("{}", encode_tape(&tape, state));
        println!();
    }

    let mut machine = TuringMachine::with_tape(table, tape, state);
    let outcome = if cli.debug {
        trace(&mut machine, &limits)
    } else {
        machine.run(&limits)
    };

    let summary = RunSummary {
        outcome,
        steps: machine.step_count(),
        marks: machine.score(),
        state: machine.state(),
        head: machine.tape().head(),
        tape_len: machine.tape().len(),
    };

    if cli.json {
        println!("{}", to_json(&summary)?);
    } else {
        print_summary(&summary);
    }

    if cli.verbose {
        let path = Path::new("out.tape");
        MachineLoader::save_tape(path, machine.tape(), machine.state())
            .map_err(|e| e.to_string())?;
        println!("Final tape written to {}", path.display());
    }

    Ok(())
}

/// Runs one step at a time, printing the configuration before each step.
fn trace(machine: &mut TuringMachine, limits: &Limits) -> Outcome {
    loop {
        println!(
            "Step: {}, State: {}, Head: {}, Symbol: {}",
            machine.step_count(),
            machine.state(),
            machine.tape().head(),
            machine.symbol()
        );

        let single = Limits {
            max_steps: (machine.step_count() + 1).min(limits.max_steps),
            ..*limits
        };
        match machine.run(&single) {
            Outcome::StepLimitExceeded if machine.step_count() < limits.max_steps => continue,
            outcome => return outcome,
        }
    }
}

fn print_summary(summary: &RunSummary) {
    match summary.outcome {
        Outcome::Halted(steps) => println!("Halted after {} steps", steps),
        Outcome::StepLimitExceeded => {
            println!("Step limit reached after {} steps", summary.steps)
        }
        Outcome::TapeLimitExceeded => println!(
            "Tape limit reached after {} steps ({} cells)",
            summary.steps, summary.tape_len
        ),
        Outcome::BlankLoop => println!("Blank loop detected after {} steps", summary.steps),
        Outcome::Interrupted => println!("Interrupted after {} steps", summary.steps),
    }
    println!("Marks: {}", summary.marks);
    println!("State: {}, Head: {}", summary.state, summary.head);
}

fn search(cli: &Cli) -> Result<(), String> {
    let mut config = match &cli.config {
        Some(path) => SearchConfig::load(path).map_err(|e| e.to_string())?,
        None => SearchConfig::default(),
    };
    if let Some(max_steps) = cli.max_steps {
        config.max_steps = max_steps;
    }
    if let Some(max_tape_len) = cli.max_tape_len {
        config.max_tape_len = max_tape_len;
    }
    if let Some(output_dir) = &cli.output_dir {
        config.output_dir = output_dir.clone();
    }

    let table = match cli.shape {
        Some(shape) => starting_table(shape, cli.index)?,
        None => load_table(cli)?.ok_or_else(|| {
            "No starting table: use -m <file>, --builtin <name> or --shape SxC".to_string()
        })?,
    };

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| format!("Failed to install Ctrl-C handler: {}", e))?;

    let report = SearchDriver::new(config, cancel)
        .run(table)
        .map_err(|e| e.to_string())?;

    if cli.json {
        println!("{}", to_json(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// The first table of a shape, or the table at `index` in its enumeration order.
fn starting_table(
    (num_states, num_symbols): (usize, u16),
    index: Option<u128>,
) -> Result<TransitionTable, String> {
    let charset_max = (num_symbols - 1) as u8;
    let first = TransitionTable::new(num_states, charset_max);

    let Some(index) = index else {
        return Ok(first);
    };
    if let Some(size) = first.space_size() {
        if index >= size {
            return Err(format!(
                "Index {} is out of range: a {}x{} search has {} tables",
                index, num_states, num_symbols, size
            ));
        }
    }
    Ok(TransitionTable::from_index(num_states, charset_max, index))
}

fn print_report(report: &SearchReport) {
    println!(
        "Searched {}-state {}-symbol tables from {:014}",
        report.num_states, report.num_symbols, report.start_index
    );
    println!(
        "Examined {}, simulated {} (halted {}, step limit {}, tape limit {}, blank loop {})",
        report.tables_examined,
        report.tables_simulated,
        report.halted,
        report.step_limited,
        report.tape_limited,
        report.blank_loops
    );
    for reason in Rejection::ALL {
        let count = report.rejections.get(&reason).copied().unwrap_or(0);
        println!("  weeded [{}] {:?}: {}", reason.code(), reason, count);
    }
    match report.best_index {
        Some(index) => println!("Best score {} (table {:014})", report.best_score, index),
        None => println!("No table reached score {}", report.best_score),
    }
    match (report.finish, report.resume_index) {
        (Finish::Cancelled, Some(index)) => {
            println!("Interrupted; resume from interrupt.tm (table {:014})", index)
        }
        _ => println!("Search space exhausted"),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to encode JSON: {}", e))
}

/// Parses a `<states>x<symbols>` shape such as `5x2`.
fn parse_shape(value: &str) -> Result<(usize, u16), String> {
    let (states, symbols) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("Expected <states>x<symbols>, got '{}'", value))?;
    let states: usize = states
        .trim()
        .parse()
        .map_err(|_| format!("Invalid state count '{}'", states))?;
    let symbols: u16 = symbols
        .trim()
        .parse()
        .map_err(|_| format!("Invalid symbol count '{}'", symbols))?;

    if states == 0 || !(1..=256).contains(&symbols) {
        return Err(format!("Shape {} is out of range", value));
    }
    Ok((states, symbols))
}
