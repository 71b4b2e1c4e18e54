//! Pointnest - inspect nested point-feature tables in netCDF files.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pointnest::nested::CoordVarExtractor;
use pointnest::{
    resolve_nested_tables, ConventionConfig, ConventionSet, FeatureRow, NestedTable, NetcdfStore,
    StationField, TableGraph,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "pointnest")]
#[command(about = "Resolve nested point-feature tables in netCDF files", long_about = None)]
struct Args {
    /// Path to the NetCDF file to open
    file: PathBuf,

    #[command(subcommand)]
    command: Command,

    /// Load conventions from a TOML file of [[convention]] tables
    #[arg(long, global = true)]
    conventions: Option<PathBuf>,

    /// Use a built-in convention
    #[arg(long, value_enum, global = true)]
    preset: Option<Preset>,

    #[command(flatten)]
    inline: InlineConvention,

    /// Enable logging to specified file
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    /// Log more detail (to stderr unless --log is given)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the table forest
    Tables,
    /// List resolved features
    Features,
    /// Print the rows of one feature
    Dump {
        /// Index of the feature, as listed by `features`
        #[arg(long, default_value_t = 0)]
        feature: usize,
        /// Maximum number of rows to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Preset {
    /// station/record dimensions with firstChild, nextChild, numChildren, ...
    Linked,
}

/// A single convention given on the command line.
#[derive(clap::Args, Debug, Default)]
struct InlineConvention {
    /// Parent variable holding the first child row
    #[arg(long, global = true)]
    first_child: Option<String>,
    /// Child variable holding the next row
    #[arg(long, global = true)]
    next_child: Option<String>,
    /// Parent variable holding the last child row
    #[arg(long, global = true)]
    last_child: Option<String>,
    /// Child variable holding the previous row
    #[arg(long, global = true)]
    prev_child: Option<String>,
    /// Parent variable holding the number of child rows
    #[arg(long, global = true)]
    num_children: Option<String>,
    /// Child variable holding the parent row index
    #[arg(long, global = true)]
    parent_index: Option<String>,
    /// Parent dimension
    #[arg(long, global = true)]
    station_dim: Option<String>,
    /// Child dimension
    #[arg(long, global = true)]
    obs_dim: Option<String>,
    /// Station description variable
    #[arg(long, global = true)]
    station_desc: Option<String>,
    /// Station WMO id variable
    #[arg(long, global = true)]
    wmo_id: Option<String>,
    /// Station altitude variable
    #[arg(long, global = true)]
    station_alt: Option<String>,
}

impl InlineConvention {
    fn to_config(&self) -> Option<ConventionConfig> {
        let config = ConventionConfig {
            name: Some("command line".to_string()),
            first_child: self.first_child.clone(),
            next_child: self.next_child.clone(),
            last_child: self.last_child.clone(),
            prev_child: self.prev_child.clone(),
            num_children: self.num_children.clone(),
            parent_index: self.parent_index.clone(),
            station_dim: self.station_dim.clone(),
            obs_dim: self.obs_dim.clone(),
            station_desc: self.station_desc.clone(),
            wmo_id: self.wmo_id.clone(),
            station_alt: self.station_alt.clone(),
        };
        let empty = ConventionConfig {
            name: config.name.clone(),
            ..ConventionConfig::default()
        };
        (config != empty).then_some(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    if !args.file.exists() {
        bail!("Path not found: {}", args.file.display());
    }

    let conventions = conventions(&args)?;
    let store = NetcdfStore::open(&args.file)?;
    let graph = TableGraph::build(&store, &conventions)
        .with_context(|| format!("Failed to resolve tables in {}", args.file.display()))?;

    match args.command {
        Command::Tables => print!("{}", graph.describe()),
        Command::Features => {
            for (i, feature) in resolve_nested_tables(&graph)?.iter().enumerate() {
                println!("[{}] {}", i, summary(feature));
            }
        },
        Command::Dump { feature, limit } => {
            let features = resolve_nested_tables(&graph)?;
            let Some(nested) = features.get(feature) else {
                bail!("No feature {} ({} found)", feature, features.len());
            };
            dump(nested, &store, limit)?;
        },
    }

    tracing::info!("Pointnest exited");
    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    let level = if args.verbose { "trace" } else { "debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Some(log_path) = &args.log {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        tracing::info!("Starting Pointnest");
    } else if args.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

fn conventions(args: &Args) -> Result<Vec<ConventionConfig>> {
    let mut list = Vec::new();
    if let Some(path) = &args.conventions {
        let set = ConventionSet::load(path)
            .with_context(|| format!("Failed to load conventions from {}", path.display()))?;
        list.extend(set.conventions);
    }
    if let Some(Preset::Linked) = args.preset {
        list.push(ConventionConfig::linked_station_obs());
    }
    list.extend(args.inline.to_config());
    Ok(list)
}

fn summary(nested: &NestedTable<'_>) -> String {
    let graph = nested.graph();
    let place = |e: &CoordVarExtractor| {
        format!("{}@{}", e.name(), graph.table(e.table()).name())
    };
    let mut text = format!(
        "{} {} depth={} time={} lat={} lon={}",
        graph.table(nested.leaf()).name(),
        nested.feature_type(),
        nested.depth(),
        place(nested.time()),
        place(nested.lat()),
        place(nested.lon()),
    );
    if let Some(height) = nested.height() {
        text.push_str(&format!(" height={}", place(height)));
    }
    if let Some(id) = nested.feature_id() {
        text.push_str(&format!(" id={}", place(id)));
    }
    for (field, key) in [
        (StationField::Desc, "desc"),
        (StationField::WmoId, "wmo"),
        (StationField::Alt, "alt"),
    ] {
        if let Some(e) = nested.station_field(field) {
            text.push_str(&format!(" {}={}", key, place(e)));
        }
    }
    if let Some(units) = nested.time().units() {
        text.push_str(&format!(" time_units=\"{}\"", units));
    }
    let extra: Vec<&str> = nested
        .extra_axes()
        .into_iter()
        .map(|a| a.variable.name.as_str())
        .collect();
    if !extra.is_empty() {
        text.push_str(&format!(" extra={}", extra.join(",")));
    }
    text
}

fn dump(nested: &NestedTable<'_>, store: &NetcdfStore, limit: usize) -> Result<()> {
    println!("id\ttime\tlat\tlon\theight");
    for row in nested.rows(store)?.take(limit) {
        println!("{}", format_row(nested, &row?)?);
    }
    Ok(())
}

// Missing values print as "-".
fn format_row(nested: &NestedTable<'_>, row: &FeatureRow<'_>) -> Result<String> {
    let dash = || "-".to_string();
    let coord = |e: &CoordVarExtractor| -> Result<String> {
        let value = e.value_f64(row.rows())?;
        Ok(if e.is_missing_value(value) {
            dash()
        } else {
            value.to_string()
        })
    };
    let id = if row.is_feature_missing()? {
        dash()
    } else {
        row.feature_id()?.unwrap_or_else(dash)
    };
    let height = row.height()?.map_or_else(dash, |h| h.to_string());
    Ok(format!(
        "{}\t{}\t{}\t{}\t{}",
        id,
        coord(nested.time())?,
        coord(nested.lat())?,
        coord(nested.lon())?,
        height
    ))
}
