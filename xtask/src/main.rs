use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for tilefuse")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Generate a demo fragment tree for manual aggregation runs
    Fixture {
        /// Directory to create the fragments in
        #[arg(short, long, default_value = "demo-fragments")]
        out: PathBuf,
        /// Nesting levels of the containment chain
        #[arg(short, long, default_value = "3")]
        levels: usize,
        /// Leaf fragments per side of the finest grid
        #[arg(short, long, default_value = "2")]
        grid: usize,
        /// Skip extent-sample files so the aggregation stays flat
        #[arg(long)]
        no_extents: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_doc()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Doc => run_doc()?,
        Commands::Build => run_build()?,
        Commands::Fixture {
            out,
            levels,
            grid,
            no_extents,
        } => run_fixture(&out, levels, grid, no_extents)?,
    }

    Ok(())
}

fn run_fmt() -> Result<()> {
    println!("==> Running cargo fmt --check");
    let status = Command::new("cargo")
        .args(["fmt", "--all", "--", "--check"])
        .status()?;
    if !status.success() {
        anyhow::bail!("cargo fmt check failed");
    }
    Ok(())
}

fn run_clippy() -> Result<()> {
    println!("==> Running cargo clippy");
    let status = Command::new("cargo")
        .args([
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ])
        .status()?;
    if !status.success() {
        anyhow::bail!("cargo clippy failed");
    }
    Ok(())
}

fn run_tests() -> Result<()> {
    println!("==> Running cargo test");
    let status = Command::new("cargo")
        .args(["test", "--workspace"])
        .status()?;
    if !status.success() {
        anyhow::bail!("cargo test failed");
    }
    Ok(())
}

fn run_doc() -> Result<()> {
    println!("==> Running cargo doc");
    let status = Command::new("cargo")
        .args(["doc", "--workspace", "--no-deps"])
        .status()?;
    if !status.success() {
        anyhow::bail!("cargo doc failed");
    }
    Ok(())
}

fn run_build() -> Result<()> {
    println!("==> Running cargo build");
    let status = Command::new("cargo")
        .args(["build", "--workspace"])
        .status()?;
    if !status.success() {
        anyhow::bail!("cargo build failed");
    }
    Ok(())
}

/// Write a tree of fragment descriptions shaped like real generator output:
/// a chain of nested coarse fragments plus a grid of disjoint leaves tiling
/// the innermost one. With extent samples present, merging the tree yields a
/// full containment hierarchy.
fn run_fixture(out: &Path, levels: usize, grid: usize, no_extents: bool) -> Result<()> {
    anyhow::ensure!(levels >= 1, "need at least one chain level");
    anyhow::ensure!(grid >= 1, "need at least a 1x1 leaf grid");

    let center = (0.858, 0.524);
    let mut written = 0usize;

    // Nested chain, coarsest first. Rank shrinks toward the innermost box.
    for level in 0..levels {
        let rank = (levels - level) as f64;
        let half = rank * 8.0;
        let spread = rank * 1.0e-4;
        let extent = (!no_extents).then_some(([-half, 0.0, -half], [half, 6.0 + half, half]));
        write_fixture_fragment(
            &out.join(format!("level_{level}")),
            region_around(center, spread, 0.0, 60.0),
            120.0 * rank,
            extent,
        )?;
        written += 1;
    }

    // Disjoint leaves tiling the innermost chain box, with a margin so each
    // leaf is strictly contained.
    let innermost = 8.0;
    let cell = 2.0 * innermost / grid as f64;
    let margin = cell / 8.0;
    let leaf_spread = 1.0e-4 / grid as f64;
    for gx in 0..grid {
        for gz in 0..grid {
            let x0 = -innermost + gx as f64 * cell;
            let z0 = -innermost + gz as f64 * cell;
            let extent = (!no_extents).then_some((
                [x0 + margin, 0.0, z0 + margin],
                [x0 + cell - margin, 4.0, z0 + cell - margin],
            ));
            let west = center.0 - 1.0e-4 + gx as f64 * 2.0 * leaf_spread;
            let south = center.1 - 1.0e-4 + gz as f64 * 2.0 * leaf_spread;
            let region = [
                west,
                south,
                west + 2.0 * leaf_spread,
                south + 2.0 * leaf_spread,
                0.0,
                30.0,
            ];
            write_fixture_fragment(&out.join(format!("leaf_{gx}_{gz}")), region, 40.0, extent)?;
            written += 1;
        }
    }

    println!(
        "==> Wrote {written} fragment descriptions under {}",
        out.display()
    );
    println!("    cargo run -p tilefuse-cli -- merge {}", out.display());
    Ok(())
}

fn region_around(center: (f64, f64), spread: f64, min_height: f64, max_height: f64) -> [f64; 6] {
    [
        center.0 - spread,
        center.1 - spread,
        center.0 + spread,
        center.1 + spread,
        min_height,
        max_height,
    ]
}

fn write_fixture_fragment(
    dir: &Path,
    region: [f64; 6],
    error: f64,
    extent: Option<([f64; 3], [f64; 3])>,
) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let doc = serde_json::json!({
        "asset": { "version": "0.0" },
        "geometricError": error,
        "root": {
            "boundingVolume": { "region": region },
            "geometricError": error,
            "refine": "ADD",
            "content": { "url": "model.b3dm" }
        }
    });
    std::fs::write(dir.join("tileset.json"), serde_json::to_string_pretty(&doc)?)?;

    if let Some((min, max)) = extent {
        // Two sample pairs splitting the box down the x axis, plus a feature
        // array the aggregator ignores.
        let mid = (min[0] + max[0]) / 2.0;
        let table = serde_json::json!({
            "batchId": [0, 1],
            "minPoint": [min, [mid, min[1], min[2]]],
            "maxPoint": [[mid, max[1], max[2]], max],
        });
        std::fs::write(
            dir.join("model_batchTable.json"),
            serde_json::to_string(&table)?,
        )?;
    }
    Ok(())
}
