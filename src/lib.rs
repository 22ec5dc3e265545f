//! # FixtureKit
//!
//! Fixture and feature planning for multi-setup CNC milling of
//! triangulated parts:
//! - Ray-based millability of every mesh face along a tool axis
//! - Recursive decomposition of stock minus part into a feature tree
//! - Redundancy elimination between opposite decompositions
//! - Vice orientations and a greedy setup covering
//!
//! ## Architecture
//!
//! FixtureKit is organized as a workspace with multiple crates:
//!
//! 1. **fixturekit-core** - Mesh and surface model, errors, tolerances
//! 2. **fixturekit-geometry** - Planar frames, polygons, 2D booleans, ray casting
//! 3. **fixturekit-features** - Millability, feature decomposition and selection
//! 4. **fixturekit-fixtures** - Vices, tools, orientations, covering, fixture plans
//! 5. **fixturekit-settings** - Planner configuration persistence
//! 6. **fixturekit** - Main binary that integrates all crates

pub mod report;
pub mod stl;

pub use fixturekit_core::{
    connected_components, planar_surfaces, Aabb, Error, FaceIndex, GeometryError, Mesh, PlanError, PlanResult,
    Result, Surface, Tolerances, VoxelPart,
};

pub use fixturekit_features::{
    build_feature_decomposition, is_millable, millable_faces, select_top_and_bottom_features, Feature,
    FeatureDecomposer, FeatureDecomposition, FeatureSelector, MillabilityAnalyzer, PocketKind,
};

pub use fixturekit_fixtures::{
    all_stable_orientations, make_fixture_plan, pick_orientations, pick_tool, ClampOrientation, Fixture,
    FixturePlan, FixtureSetup, PlanOptions, Pocket, Tool, Vice, ViceSetup,
};

pub use fixturekit_settings::{default_config_path, PlannerConfig, SettingsError};

pub use report::plan_summary;
pub use stl::{load_stl, read_stl, save_stl, write_stl};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = env!("FIXTUREKIT_BUILD_DATE");

/// Initialize logging with tracing
///
/// Logs go to stderr so the plan summary on stdout stays clean. An
/// explicit `level` filter wins; otherwise the level is taken from
/// `RUST_LOG` with `info` as the floor.
pub fn init_logging(level: Option<&str>) -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
