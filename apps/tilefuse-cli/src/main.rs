use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tilefuse_merge::{
    CombineOptions, DEFAULT_GEOMETRIC_ERROR, MergeOptions, MisorderPolicy, combine_tilesets,
    inspect_file, merge_tilesets,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tilefuse-cli",
    about = "Assemble generated tileset fragments into one aggregate tileset"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reference every fragment as a direct child of one flat root
    Combine {
        /// Directory whose subdirectories hold the fragment tilesets
        input: PathBuf,
        /// Output path, defaults to tileset.json inside the input directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Error metric of the aggregate root
        #[arg(short, long, default_value_t = DEFAULT_GEOMETRIC_ERROR)]
        base_error: f64,
    },
    /// Merge fragments into one tileset, nested by containment when extent samples exist
    Merge {
        /// Directory whose subdirectories hold the fragment tilesets
        input: PathBuf,
        /// Output path, defaults to tileset.json inside the input directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Error metric of the aggregate root, halved when a hierarchy is built
        #[arg(short, long, default_value_t = DEFAULT_GEOMETRIC_ERROR)]
        base_error: f64,
        /// What to do with fragments that defeat the containment ordering
        #[arg(long, value_enum, default_value = "promote")]
        misorder: MisorderArg,
    },
    /// Print a structural summary of an aggregate tileset
    Inspect {
        /// Path of the tileset to summarize
        tileset: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MisorderArg {
    /// Keep misordered fragments reachable as extra roots
    Promote,
    /// Leave misordered fragments out of the aggregate
    Drop,
}

impl From<MisorderArg> for MisorderPolicy {
    fn from(arg: MisorderArg) -> Self {
        match arg {
            MisorderArg::Promote => MisorderPolicy::PromoteRoot,
            MisorderArg::Drop => MisorderPolicy::Drop,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Combine {
            input,
            output,
            base_error,
        } => {
            let mut options = CombineOptions::new(input);
            options.output = output;
            options.base_error = base_error;
            let summary = combine_tilesets(&options)?;
            println!(
                "Combined {} fragments into {} ({} skipped)",
                summary.children,
                summary.output.display(),
                summary.skipped
            );
            print_region(summary.region);
        }
        Commands::Merge {
            input,
            output,
            base_error,
            misorder,
        } => {
            let mut options = MergeOptions::new(input);
            options.output = output;
            options.base_error = base_error;
            options.misorder = misorder.into();
            let summary = merge_tilesets(&options)?;
            println!(
                "Merged {} fragments into {} ({} skipped)",
                summary.fragments,
                summary.output.display(),
                summary.skipped
            );
            println!(
                "Mode: {}, roots={}, extent files deleted={}",
                if summary.lod { "LOD hierarchy" } else { "flat" },
                summary.roots,
                summary.deleted_extent_files
            );
            if summary.dropped > 0 {
                println!(
                    "Warning: {} fragment(s) left unreachable by the misorder policy",
                    summary.dropped
                );
            }
        }
        Commands::Inspect { tileset } => {
            let summary = inspect_file(&tileset)?;
            println!("{}: {summary}", tileset.display());
            if let Some(region) = summary.region {
                print_region(region);
            }
        }
    }

    Ok(())
}

fn print_region(region: [f64; 6]) {
    let [west, south, east, north, min_height, max_height] = region;
    println!(
        "Region: [{west:.6}, {south:.6}] to [{east:.6}, {north:.6}], heights {min_height:.1}..{max_height:.1}"
    );
}
