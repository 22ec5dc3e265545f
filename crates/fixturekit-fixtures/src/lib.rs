//! # FixtureKit Fixtures
//!
//! Vice seating and setup planning.
//!
//! Enumerates the ways a part can be clamped, covers the surfaces that
//! need cutting with as few fixtures as the greedy cover finds, and
//! assembles the per-setup pockets into a [`FixturePlan`].

pub mod covering;
pub mod orientation;
pub mod plan;
pub mod tool;
pub mod vice;

pub use covering::{millable_sets, pick_orientations, Assignment};
pub use orientation::{all_stable_orientations, stable_orientations_with, ClampOrientation, Fixture};
pub use plan::{make_fixture_plan, FixturePlan, FixtureSetup, PlanOptions, Pocket};
pub use tool::{pick_tool, Tool};
pub use vice::{Vice, ViceSetup};
