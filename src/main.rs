use anyhow::Context;
use clap::Parser;
use fixturekit::{init_logging, load_stl, make_fixture_plan, plan_summary, Mesh, PlannerConfig};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fixturekit", version)]
#[command(about = "Plan vice setups and machining features for a part", long_about = None)]
struct Cli {
    /// Part mesh (.stl)
    part: PathBuf,
    /// Stock mesh (.stl); defaults to the part's bounding box
    stock: Option<PathBuf>,
    /// Planner configuration (.json or .toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log filter such as `debug` or `fixturekit_features=trace`; overrides RUST_LOG
    #[arg(short, long)]
    log_level: Option<String>,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PlannerConfig> {
    let config = match path {
        Some(path) => PlannerConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PlannerConfig::load_or_default(&fixturekit::default_config_path()?)?,
    };
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;
    info!("FixtureKit {} built {}", fixturekit::VERSION, fixturekit::BUILD_DATE);

    let config = load_config(cli.config.as_deref())?;

    let part = load_stl(&cli.part).with_context(|| format!("reading part {}", cli.part.display()))?;
    let stock = match &cli.stock {
        Some(path) => load_stl(path).with_context(|| format!("reading stock {}", path.display()))?,
        None => {
            let bounds = part.bounds();
            Mesh::cuboid(bounds.min, bounds.max)
        }
    };
    info!(
        "Part has {} faces, stock has {} faces",
        part.face_count(),
        stock.face_count()
    );

    let plan = make_fixture_plan(&part, &stock, &config.plan_options())?;
    print!("{}", plan_summary(&plan));
    Ok(())
}
