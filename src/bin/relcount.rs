//! Binary entry point for the degree cache CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sombra_relcount::{
    cli::import::{import_edges, parse_property_arg, CliError, EdgeImportConfig, ImportedGraph},
    logging::init_logging,
    DegreeCacheConfig, DegreeCacheOptions, DegreeCountModule, DegreeCounter,
    DetachedEdgeDescription, Direction, PropertyPredicate,
};

#[derive(Parser, Debug)]
#[command(
    name = "relcount",
    version,
    about = "Degree counts over a CSV edge list, cached or scanned",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        default_value = "warn",
        env = "RELCOUNT_LOG",
        help = "Log filter directive"
    )]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count the edges of a vertex matching a description
    Count(CountCmd),
    /// Print the cached degree entries of a vertex
    Inspect(InspectCmd),
}

#[derive(Args, Debug)]
struct GraphArgs {
    #[arg(value_name = "CSV", help = "Edge list with start, end and type columns")]
    edges: PathBuf,

    #[arg(long, default_value = "start", help = "Start vertex column name")]
    start_column: String,

    #[arg(long, default_value = "end", help = "End vertex column name")]
    end_column: String,

    #[arg(long, help = "Constant edge type if the file has no type column")]
    edge_type: Option<String>,

    #[arg(long, value_name = "FILE", help = "TOML cache configuration")]
    config: Option<PathBuf>,

    #[arg(long, help = "External id of the vertex")]
    vertex: String,
}

#[derive(Args, Debug)]
struct CountCmd {
    #[command(flatten)]
    graph: GraphArgs,

    #[arg(long = "type", value_name = "TYPE", help = "Edge type to count")]
    query_type: String,

    #[arg(long, value_enum, default_value_t = DirectionArg::Both, help = "Edge direction")]
    direction: DirectionArg,

    #[arg(long = "prop", value_name = "KEY=VALUE", help = "Required property value")]
    props: Vec<String>,

    #[arg(long = "any", value_name = "KEY", help = "Property left unconstrained")]
    any: Vec<String>,

    #[arg(
        long = "undefined",
        value_name = "KEY",
        help = "Property that must be absent"
    )]
    undefined: Vec<String>,

    #[arg(long, help = "Leave unmentioned properties unconstrained")]
    wildcard: bool,

    #[arg(long, value_enum, default_value_t = CounterArg::Fallback, help = "Counting strategy")]
    counter: CounterArg,
}

#[derive(Args, Debug)]
struct InspectCmd {
    #[command(flatten)]
    graph: GraphArgs,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum DirectionArg {
    Out,
    In,
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Out => Direction::Outgoing,
            DirectionArg::In => Direction::Incoming,
            DirectionArg::Both => Direction::Both,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
enum CounterArg {
    Naive,
    Cached,
    Fallback,
}

#[derive(Serialize)]
struct CountReport {
    vertex: String,
    query: String,
    counter: CounterArg,
    degree: i64,
}

#[derive(Serialize)]
struct EntryReport {
    description: String,
    degree: i64,
}

#[derive(Serialize)]
struct InspectReport {
    vertex: String,
    module: String,
    entries: Vec<EntryReport>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Command::Count(cmd) => {
            let (mut imported, module) = load(&cmd.graph)?;
            let vertex = imported.vertex(&cmd.graph.vertex)?;
            module.commit(&mut imported.graph)?;
            let query = build_query(&cmd)?;
            let degree = match cmd.counter {
                CounterArg::Naive => module.naive_counter().count(&imported.graph, vertex, &query)?,
                CounterArg::Cached => module.cached_counter().count(&imported.graph, vertex, &query)?,
                CounterArg::Fallback => {
                    module.fallback_counter().count(&imported.graph, vertex, &query)?
                }
            };
            let report = CountReport {
                vertex: cmd.graph.vertex.clone(),
                query: query.to_string(),
                counter: cmd.counter,
                degree,
            };
            emit(cli.format, &report, || println!("{}", report.degree))?;
        }
        Command::Inspect(cmd) => {
            let (mut imported, module) = load(&cmd.graph)?;
            let vertex = imported.vertex(&cmd.graph.vertex)?;
            module.commit(&mut imported.graph)?;
            let entries = module.cache().read_entries(&imported.graph, vertex)?;
            let report = InspectReport {
                vertex: cmd.graph.vertex.clone(),
                module: module.id().to_string(),
                entries: entries
                    .into_iter()
                    .map(|(description, degree)| EntryReport {
                        description: description.to_string(),
                        degree,
                    })
                    .collect(),
            };
            emit(cli.format, &report, || {
                for entry in &report.entries {
                    println!("{}\t{}", entry.description, entry.degree);
                }
            })?;
        }
    }
    Ok(())
}

fn load(args: &GraphArgs) -> Result<(ImportedGraph, DegreeCountModule), CliError> {
    let options = match &args.config {
        Some(path) => DegreeCacheConfig::load(path)?.into_options()?,
        None => DegreeCacheOptions::new(),
    };
    let module = DegreeCountModule::new(options)?;

    let mut cfg = EdgeImportConfig::new(&args.edges);
    cfg.start_column = args.start_column.clone();
    cfg.end_column = args.end_column.clone();
    cfg.static_type = args.edge_type.clone();
    let imported = import_edges(&cfg)?;
    Ok((imported, module))
}

fn build_query(cmd: &CountCmd) -> Result<DetachedEdgeDescription, CliError> {
    let direction = Direction::from(cmd.direction);
    let mut query = if cmd.wildcard {
        DetachedEdgeDescription::wildcard(cmd.query_type.clone(), direction)
    } else {
        DetachedEdgeDescription::literal(cmd.query_type.clone(), direction)
    };
    for raw in &cmd.props {
        let (key, value) = parse_property_arg(raw)?;
        query = query.with(key, PropertyPredicate::EqualTo(value));
    }
    for key in &cmd.any {
        query = query.with(key.clone(), PropertyPredicate::Any);
    }
    for key in &cmd.undefined {
        query = query.with(key.clone(), PropertyPredicate::Undefined);
    }
    Ok(query)
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}
