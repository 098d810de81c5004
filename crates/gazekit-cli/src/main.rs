#![allow(
    clippy::needless_pass_by_value, // clap requires owned values
    clippy::fn_params_excessive_bools, // CLI commands have many boolean flags
)]

//! gazekit CLI - eye-tracking datasets, archives and AOI mapping

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::{AoiConfig, Config};
use gazekit_archive::{extract_archive, list_contents, ExtractOptions};
use gazekit_core::{
    write_csv, AoiColumns, CsvOptions, EventFrame, EventMapping, LocationSource, TextStimulus,
};
use gazekit_dataset::{scan_dataset, ContentType, Dataset, DatasetDefinition, DownloadOptions};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const DEFAULT_ROOT: &str = "data";

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    /// Errors only
    Quiet,
    Normal,
    /// Debug logging
    Verbose,
}

impl Verbosity {
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "info",
            Self::Verbose => "debug",
        }
    }

    const fn should_show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }
}

#[derive(Parser, Debug)]
#[command(name = "gazekit")]
#[command(version)]
#[command(about = "Eye-tracking datasets, archives and AOI mapping", long_about = None)]
struct Args {
    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download a dataset described by a YAML definition
    #[command(long_about = "Download every resource of a dataset definition into \
                      <ROOT>/<NAME>/downloads, verify MD5 checksums and extract \
                      archives into raw/, precomputed_events/ and \
                      precomputed_reading_measures/.\n\
                      \n\
                      Examples:\n\
                        gazekit download GazeBase.yaml\n\
                        gazekit download GazeBase.yaml --root /data --remove-finished")]
    Download {
        /// Dataset definition (YAML)
        #[arg(value_name = "DEFINITION")]
        definition: PathBuf,

        /// Dataset root directory (default: data, or from config)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Only download, do not extract
        #[arg(long)]
        no_extract: bool,

        /// Delete archives once they are extracted
        #[arg(long)]
        remove_finished: bool,
    },

    /// Extract an archive (zip, tar, tar.gz, tar.bz2, gz, bz2)
    Extract {
        /// Archive to extract
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Destination directory
        #[arg(value_name = "DEST", required_unless_present = "list")]
        destination: Option<PathBuf>,

        /// Do not extract archives found inside the archive
        #[arg(long)]
        no_recursive: bool,

        /// Keep a single top-level directory instead of collapsing it
        #[arg(long)]
        keep_top_level: bool,

        /// Delete archives once they are extracted
        #[arg(long)]
        remove_finished: bool,

        /// Overwrite files that already exist with the same size
        #[arg(long)]
        no_resume: bool,

        /// List archive entries instead of extracting
        #[arg(long)]
        list: bool,
    },

    /// Scan a downloaded dataset and print its file information as CSV
    Scan {
        /// Dataset definition (YAML)
        #[arg(value_name = "DEFINITION")]
        definition: PathBuf,

        /// Dataset root directory (default: data, or from config)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Content type to print
        #[arg(long, default_value = "gaze")]
        content: ContentType,
    },

    /// Label events with the AOIs they fall into
    #[command(long_about = "Label each event with the AOI rectangle that contains its \
                      location. One output column is written per --aoi-column, \
                      named after that column; events outside every AOI get an \
                      empty label.\n\
                      \n\
                      Examples:\n\
                        gazekit map-aois --events fixations.csv --aois text_aoi.csv \\\n\
                          --aoi-column word --width width --height height\n\
                        gazekit map-aois --events fixations.csv --aois text_aoi.csv \\\n\
                          --aoi-column char --end-x bottom_right_x --end-y bottom_right_y \\\n\
                          --page page --event-page page_id -o mapped.csv")]
    MapAois(MapAoisArgs),

    /// Display the effective configuration
    Config {
        /// Output as JSON instead of TOML
        #[arg(long)]
        json: bool,

        /// Show the configuration file locations instead
        #[arg(long)]
        paths: bool,
    },
}

#[derive(clap::Args, Debug)]
struct MapAoisArgs {
    /// Event table (CSV with name, onset, offset)
    #[arg(long, value_name = "CSV")]
    events: PathBuf,

    /// AOI table (CSV)
    #[arg(long, value_name = "CSV")]
    aois: PathBuf,

    /// AOI label column, repeatable
    #[arg(long = "aoi-column", value_name = "COL", required = true)]
    aoi_columns: Vec<String>,

    /// AOI column with the left edge (default: top_left_x)
    #[arg(long, value_name = "COL")]
    start_x: Option<String>,

    /// AOI column with the top edge (default: top_left_y)
    #[arg(long, value_name = "COL")]
    start_y: Option<String>,

    #[arg(long, value_name = "COL")]
    width: Option<String>,

    #[arg(long, value_name = "COL")]
    height: Option<String>,

    #[arg(long, value_name = "COL")]
    end_x: Option<String>,

    #[arg(long, value_name = "COL")]
    end_y: Option<String>,

    /// AOI column with the page of each AOI
    #[arg(long, value_name = "COL")]
    page: Option<String>,

    /// Event column with the page of each event
    #[arg(long, value_name = "COL")]
    event_page: Option<String>,

    /// Event columns with the x and y location (default: location_x/location_y)
    #[arg(long, value_names = ["X", "Y"], num_args = 2)]
    location: Option<Vec<String>>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,
}

fn init_logging(verbosity: Verbosity) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(verbosity.log_filter()),
    )
    .target(env_logger::Target::Stderr)
    .init();
}

fn main() {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);
    init_logging(verbosity);

    let config = Config::discover();
    log::debug!("Effective configuration: {config:?}");

    if let Err(e) = run(args.command, &config, verbosity) {
        eprintln!("{} {e:#}", "Error:".red().bold());
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &Config, verbosity: Verbosity) -> Result<()> {
    match command {
        Commands::Download {
            definition,
            root,
            no_extract,
            remove_finished,
        } => download_command(&definition, root, no_extract, remove_finished, config, verbosity),
        Commands::Extract {
            archive,
            destination,
            no_recursive,
            keep_top_level,
            remove_finished,
            no_resume,
            list,
        } => {
            if list {
                return list_command(&archive);
            }
            let destination = destination.context("DEST is required unless --list is given")?;
            let options = ExtractOptions {
                recursive: !no_recursive,
                remove_finished,
                remove_top_level: !keep_top_level,
                resume: !no_resume,
            };
            extract_command(&archive, &destination, &options, verbosity)
        }
        Commands::Scan {
            definition,
            root,
            content,
        } => scan_command(&definition, root, content, config),
        Commands::MapAois(args) => {
            map_aois_command(args, &config.aoi.clone().unwrap_or_default(), verbosity)
        }
        Commands::Config { json, paths } => config_command(config, json, paths),
    }
}

fn load_definition(path: &Path) -> Result<DatasetDefinition> {
    DatasetDefinition::from_yaml(path)
        .with_context(|| format!("Failed to load dataset definition: {}", path.display()))
}

fn dataset_root(root: Option<PathBuf>, config: &Config) -> PathBuf {
    root.or_else(|| config.dataset.as_ref().and_then(|d| d.root.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT))
}

fn download_command(
    definition: &Path,
    root: Option<PathBuf>,
    no_extract: bool,
    remove_finished: bool,
    config: &Config,
    verbosity: Verbosity,
) -> Result<()> {
    let definition = load_definition(definition)?;
    let defaults = config.dataset.clone().unwrap_or_default();
    let options = DownloadOptions {
        extract: !no_extract && defaults.extract.unwrap_or(true),
        remove_finished: remove_finished || defaults.remove_finished.unwrap_or(false),
        resume: defaults.resume.unwrap_or(true),
    };

    let dataset = Dataset::new(definition, dataset_root(root, config));
    dataset
        .download(&options)
        .with_context(|| format!("Failed to download {}", dataset.definition().name))?;

    if verbosity.should_show_output() {
        eprintln!(
            "{} {} in {}",
            "Downloaded".green().bold(),
            dataset.definition().name,
            dataset.paths().dataset().display()
        );
    }
    Ok(())
}

fn extract_command(
    archive: &Path,
    destination: &Path,
    options: &ExtractOptions,
    verbosity: Verbosity,
) -> Result<()> {
    let files = extract_archive(archive, destination, options)
        .with_context(|| format!("Failed to extract {}", archive.display()))?;

    if verbosity.should_show_output() {
        eprintln!(
            "{} {} files to {}",
            "Extracted".green().bold(),
            files.len(),
            destination.display()
        );
    }
    Ok(())
}

fn list_command(archive: &Path) -> Result<()> {
    let entries = list_contents(archive)
        .with_context(|| format!("Failed to list {}", archive.display()))?;

    let mut out = io::stdout().lock();
    for entry in entries {
        match entry.size {
            Some(size) => writeln!(out, "{}\t{size}", entry.name)?,
            None => writeln!(out, "{}\t-", entry.name)?,
        }
    }
    Ok(())
}

fn scan_command(
    definition: &Path,
    root: Option<PathBuf>,
    content: ContentType,
    config: &Config,
) -> Result<()> {
    let definition = load_definition(definition)?;
    let dataset = Dataset::new(definition, dataset_root(root, config));
    let fileinfo = scan_dataset(dataset.definition(), dataset.paths())
        .with_context(|| format!("Failed to scan {}", dataset.paths().dataset().display()))?;

    let frame = fileinfo
        .get(&content)
        .with_context(|| format!("Dataset has no {content} files"))?;
    write_csv(frame, io::stdout().lock())?;
    Ok(())
}

/// Command-line columns first, then config, then the conventional names.
fn aoi_columns(args: &MapAoisArgs, defaults: &AoiConfig) -> AoiColumns {
    fn pick(arg: Option<&String>, default: Option<&String>) -> Option<String> {
        arg.or(default).cloned()
    }

    let start_x = pick(args.start_x.as_ref(), defaults.start_x.as_ref())
        .unwrap_or_else(|| "top_left_x".to_string());
    let start_y = pick(args.start_y.as_ref(), defaults.start_y.as_ref())
        .unwrap_or_else(|| "top_left_y".to_string());

    AoiColumns {
        aoi_columns: args.aoi_columns.clone(),
        start_x_column: start_x,
        start_y_column: start_y,
        width_column: pick(args.width.as_ref(), defaults.width.as_ref()),
        height_column: pick(args.height.as_ref(), defaults.height.as_ref()),
        end_x_column: pick(args.end_x.as_ref(), defaults.end_x.as_ref()),
        end_y_column: pick(args.end_y.as_ref(), defaults.end_y.as_ref()),
        page_column: pick(args.page.as_ref(), defaults.page.as_ref()),
    }
}

fn map_aois_command(args: MapAoisArgs, defaults: &AoiConfig, verbosity: Verbosity) -> Result<()> {
    let columns = aoi_columns(&args, defaults);
    let stimulus = TextStimulus::from_file(&args.aois, columns, &CsvOptions::default())
        .with_context(|| format!("Failed to load AOIs from {}", args.aois.display()))?;
    let mut events = EventFrame::from_csv(&args.events, &CsvOptions::default())
        .with_context(|| format!("Failed to load events from {}", args.events.display()))?;

    let location = match args.location.as_deref() {
        Some([x, y]) => LocationSource::columns(x, y),
        _ => LocationSource::Auto,
    };
    let mut mapping = EventMapping {
        location,
        page_column: None,
    };
    if let Some(page) = args.event_page.as_ref().or(defaults.event_page.as_ref()) {
        mapping = mapping.with_page(page);
    }

    events.map_to_aois(&stimulus, &mapping)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_csv(events.frame(), BufWriter::new(file))?;
            if verbosity.should_show_output() {
                eprintln!(
                    "{} {} events to {}",
                    "Mapped".green().bold(),
                    events.height(),
                    path.display()
                );
            }
        }
        None => write_csv(events.frame(), io::stdout().lock())?,
    }
    Ok(())
}

fn config_command(config: &Config, json: bool, paths: bool) -> Result<()> {
    if paths {
        let user = Config::user_config_path()
            .map_or_else(|| "(no home directory)".to_string(), |p| p.display().to_string());
        println!("user:    {user}");
        println!("project: {}", Config::project_config_path().display());
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}
