//! HarnessKit CLI - wiring-harness normalization and editing from the command line.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use harnesskit::document::update_section_text;
use harnesskit::{
    get_all_examples, find_example, to_yaml, CableFragment, ConnectionFragment, ConnectorFragment,
    Fragment, HarnessCore, MateArrow, MateFragment, NormalizeOptions, PinRef, PrepareOptions,
    PreparedDocument,
};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "harnesskit")]
#[command(about = "Wiring-harness YAML normalization tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Log what normalization does (to stderr)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a harness file into the form the diagram engine accepts
    Normalize {
        /// Path to .yml or .yaml harness file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: OutputFormat,

        /// Write the result here instead of stdout
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Leave cable `label` attributes where they are
        #[arg(long)]
        keep_labels: bool,

        /// Do not expand `<<: *template` merge keys
        #[arg(long)]
        no_merge_keys: bool,
    },

    /// Normalize all harness files in a directory and summarize the changes
    Project {
        /// Path to project directory
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: ReportFormat,

        /// Leave cable `label` attributes where they are
        #[arg(long)]
        keep_labels: bool,

        /// Do not expand `<<: *template` merge keys
        #[arg(long)]
        no_merge_keys: bool,
    },

    /// List bundled example harnesses (with section sizes under --verbose)
    Examples,

    /// Print a bundled example harness
    Example {
        /// Example name (case-insensitive)
        name: String,
    },

    /// Add a connector, cable, connection or mate to a harness file
    Add {
        #[command(subcommand)]
        fragment: AddCommand,
    },
}

#[derive(Subcommand)]
enum AddCommand {
    /// Add (or replace) a connector
    Connector {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Designator, e.g. X1
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        connector_type: Option<String>,
        #[arg(long)]
        subtype: Option<String>,
        #[arg(long)]
        manufacturer: Option<String>,
        #[arg(long)]
        mpn: Option<String>,
        #[arg(long)]
        pn: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Pin number (repeatable)
        #[arg(long = "pin")]
        pins: Vec<String>,
        /// Pin label (repeatable)
        #[arg(long = "pinlabel")]
        pinlabels: Vec<String>,
    },

    /// Add (or replace) a cable
    Cable {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Designator, e.g. W1
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        cable_type: Option<String>,
        #[arg(long)]
        manufacturer: Option<String>,
        #[arg(long)]
        mpn: Option<String>,
        #[arg(long)]
        pn: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        gauge: Option<f64>,
        /// e.g. mm2 or awg
        #[arg(long)]
        gauge_unit: Option<String>,
        /// Length in metres
        #[arg(long)]
        length: Option<f64>,
        /// Wire colour code (repeatable)
        #[arg(long = "color")]
        colors: Vec<String>,
        #[arg(long)]
        wirecount: Option<usize>,
        #[arg(long)]
        shield: bool,
    },

    /// Append a pin-to-pin connection
    Connection {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Start pin, DESIGNATOR:PIN
        #[arg(long)]
        from: PinRef,
        /// Cable wire in between, DESIGNATOR:WIRE
        #[arg(long)]
        via: Option<PinRef>,
        /// End pin, DESIGNATOR:PIN
        #[arg(long)]
        to: PinRef,
    },

    /// Append a mate between two connectors
    Mate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// One of ==>, <==, <==>, ==, -->, <--, <-->, --
        #[arg(long, default_value = "==>", allow_hyphen_values = true)]
        arrow: MateArrow,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// YAML, ready for the diagram engine
    Yaml,
    /// JSON
    Json,
}

#[derive(Clone, ValueEnum)]
enum ReportFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripts
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Normalize {
            file,
            format,
            output,
            keep_labels,
            no_merge_keys,
        } => handle_normalize(
            &file,
            format,
            output.as_deref(),
            prepare_options(keep_labels, no_merge_keys),
        ),
        Commands::Project {
            dir,
            format,
            keep_labels,
            no_merge_keys,
        } => handle_project(&dir, format, prepare_options(keep_labels, no_merge_keys)),
        Commands::Examples => {
            handle_examples(cli.verbose);
            0
        }
        Commands::Example { name } => handle_example(&name),
        Commands::Add { fragment } => handle_add(fragment),
    };

    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn prepare_options(keep_labels: bool, no_merge_keys: bool) -> PrepareOptions {
    PrepareOptions {
        expand_merge_keys: !no_merge_keys,
        normalize: NormalizeOptions {
            relocate_cable_labels: !keep_labels,
        },
    }
}

fn handle_normalize(
    file: &Path,
    format: OutputFormat,
    output: Option<&Path>,
    options: PrepareOptions,
) -> i32 {
    let prepared = match HarnessCore::prepare_file(file, &options) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let rendered = match format {
        OutputFormat::Yaml => to_yaml(&prepared.document).map_err(|e| e.to_string()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&prepared.document).map_err(|e| e.to_string())
        }
    };
    let rendered = match rendered {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, rendered) {
                eprintln!("Error: failed to write {}: {}", path.display(), e);
                return 1;
            }
            tracing::info!("Wrote {}", path.display());
        }
        None => print!("{}", ensure_newline(rendered)),
    }
    0
}

fn ensure_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn handle_project(dir: &Path, format: ReportFormat, options: PrepareOptions) -> i32 {
    match HarnessCore::prepare_project(dir, &options) {
        Ok(results) => {
            match format {
                ReportFormat::Human => output_human(&results),
                ReportFormat::Json => output_json(&results),
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn display_file(prepared: &PreparedDocument) -> String {
    prepared
        .file
        .as_ref()
        .map(|f| f.display().to_string())
        .unwrap_or_else(|| "<text>".to_string())
}

fn output_human(results: &[PreparedDocument]) {
    if results.is_empty() {
        println!("No harness files found");
        return;
    }

    for result in results {
        println!("\nFile: {}", display_file(result));
        println!("{}", "─".repeat(60));

        if !result.changed() {
            println!("  Already canonical ({} connections)", result.connection_count());
            continue;
        }

        let report = &result.report;
        println!("  Fan-outs expanded:   {} ({} chains)", report.fan_outs_expanded, report.branches_emitted);
        println!("  Direct links:        {}", report.direct_links);
        println!("  Pin refs resolved:   {}", report.shorthand_resolved);
        println!("  Empty entries:       {}", report.empty_dropped);
        println!("  Labels moved:        {}", report.labels_relocated);
        if report.passed_through > 0 {
            println!("  Left unchanged:      {}", report.passed_through);
        }
        println!("  Connections:         {}", result.connection_count());
    }

    let changed = results.iter().filter(|r| r.changed()).count();
    println!("\n  Summary: {} of {} files need normalization", changed, results.len());
}

fn output_json(results: &[PreparedDocument]) {
    let output = serde_json::json!({
        "results": results.iter().map(|r| {
            serde_json::json!({
                "file": display_file(r),
                "changed": r.changed(),
                "connections": r.connection_count(),
                "report": r.report,
            })
        }).collect::<Vec<_>>(),
        "summary": {
            "total_files": results.len(),
            "changed_files": results.iter().filter(|r| r.changed()).count(),
        }
    });
    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn handle_examples(verbose: bool) {
    println!("Bundled examples:\n");

    for example in get_all_examples() {
        println!("  {}", example.name);
        if verbose {
            match example.document() {
                Ok(doc) => {
                    let size = |key: &str| {
                        doc.get(key)
                            .map(|v| {
                                v.as_mapping()
                                    .map(|m| m.len())
                                    .or_else(|| v.as_sequence().map(Vec::len))
                                    .unwrap_or(0)
                            })
                            .unwrap_or(0)
                    };
                    println!(
                        "    {} connectors, {} cables, {} connections",
                        size("connectors"),
                        size("cables"),
                        size("connections")
                    );
                }
                Err(e) => println!("    (failed to parse: {})", e),
            }
        }
    }
}

fn handle_example(name: &str) -> i32 {
    match find_example(name) {
        Some(example) => {
            print!("{}", ensure_newline(example.source));
            0
        }
        None => {
            eprintln!("Error: no example named '{}'", name);
            eprintln!("Run `harnesskit examples` to list them.");
            1
        }
    }
}

fn handle_add(command: AddCommand) -> i32 {
    match add_fragment(command) {
        Ok(path) => {
            println!("Updated {}", path.display());
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn add_fragment(command: AddCommand) -> anyhow::Result<PathBuf> {
    let (file, fragment): (PathBuf, Box<dyn Fragment>) = match command {
        AddCommand::Connector {
            file,
            name,
            connector_type,
            subtype,
            manufacturer,
            mpn,
            pn,
            category,
            pins,
            pinlabels,
        } => (
            file,
            Box::new(ConnectorFragment {
                designator: name,
                connector_type,
                subtype,
                manufacturer,
                mpn,
                pn,
                category,
                pins,
                pinlabels,
            }),
        ),
        AddCommand::Cable {
            file,
            name,
            cable_type,
            manufacturer,
            mpn,
            pn,
            category,
            gauge,
            gauge_unit,
            length,
            colors,
            wirecount,
            shield,
        } => (
            file,
            Box::new(CableFragment {
                designator: name,
                cable_type,
                manufacturer,
                mpn,
                pn,
                category,
                gauge,
                gauge_unit,
                length,
                colors,
                wirecount,
                shield,
            }),
        ),
        AddCommand::Connection { file, from, via, to } => {
            (file, Box::new(ConnectionFragment { from, via, to }))
        }
        AddCommand::Mate {
            file,
            from,
            to,
            arrow,
        } => (file, Box::new(MateFragment { from, arrow, to })),
    };

    let text = if file.exists() {
        std::fs::read_to_string(&file)
            .with_context(|| format!("failed to read {}", file.display()))?
    } else {
        String::new()
    };

    let value = fragment.to_value()?;
    let section = fragment.section();
    let updated = update_section_text(&text, section, value)
        .with_context(|| format!("cannot update {} in {}", section, file.display()))?;
    std::fs::write(&file, updated).with_context(|| format!("failed to write {}", file.display()))?;

    tracing::info!("Added {} entry to {}", section, file.display());
    Ok(file)
}
