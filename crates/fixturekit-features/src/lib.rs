//! # FixtureKit Features
//!
//! Millability analysis and volumetric feature decomposition.
//!
//! A part is compared with its stock along a machining direction and the
//! removed material is broken into nested prismatic features. Opposing
//! decompositions can be reconciled with [`FeatureSelector`] so material
//! reachable from both sides is only cut once.

pub mod decomposer;
pub mod decomposition;
pub mod millability;
pub mod pocket;
pub mod selector;

pub use decomposer::{build_feature_decomposition, FeatureDecomposer, StockOutline, SurfaceLevel};
pub use decomposition::{Feature, FeatureDecomposition, NodePath};
pub use millability::{is_millable, millable_faces, MillabilityAnalyzer};
pub use pocket::PocketKind;
pub use selector::{select_top_and_bottom_features, FeatureSelector};
