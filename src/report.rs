//! Human-readable plan summaries.

use fixturekit_fixtures::FixturePlan;
use std::fmt::Write;

/// Render a plan as plain text, one block per setup
pub fn plan_summary(plan: &FixturePlan<'_>) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "{} setup(s), {} surface(s), removed volume {:.4}",
        plan.len(),
        plan.surfaces().len(),
        plan.removed_volume()
    ).ok();

    for (i, setup) in plan.iter().enumerate() {
        let n = setup.fixture().top_normal();
        let plate = match setup.fixture().vice().plate() {
            Some(height) => format!("{height:.3} parallels"),
            None => "no parallels".to_string(),
        };
        writeln!(
            out,
            "Setup {}: top ({:.3}, {:.3}, {:.3}), {}, {} surface(s), {} pocket(s)",
            i + 1,
            n.x,
            n.y,
            n.z,
            plate,
            setup.surfaces().len(),
            setup.pockets().len()
        ).ok();
        for pocket in setup.pockets() {
            let feature = pocket.feature();
            let tool = pocket.tool().map_or_else(|| "no tool".to_string(), |t| t.to_string());
            writeln!(
                out,
                "  {:<8} area {:.4} depth {:.4} {}",
                pocket.kind(),
                feature.footprint_area(),
                feature.depth(),
                tool
            ).ok();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixturekit_core::Mesh;
    use fixturekit_fixtures::{make_fixture_plan, PlanOptions};
    use nalgebra::Point3;

    #[test]
    fn test_summary_lists_setups_and_pockets() {
        let part = Mesh::cuboid(Point3::origin(), Point3::new(4.0, 4.0, 2.0));
        let stock = Mesh::cuboid(Point3::origin(), Point3::new(4.0, 4.0, 2.5));
        let plan = make_fixture_plan(&part, &stock, &PlanOptions::default()).unwrap();
        let text = plan_summary(&plan);
        assert!(text.starts_with("1 setup(s)"));
        assert!(text.contains("Setup 1: top"));
        assert!(text.contains("1 pocket(s)"));
        assert!(text.contains("face"));
        assert!(text.contains("1/2 flat end mill"));
    }

    #[test]
    fn test_empty_plan() {
        let part = Mesh::cuboid(Point3::origin(), Point3::new(2.0, 2.0, 2.0));
        let plan = make_fixture_plan(&part, &part, &PlanOptions::default()).unwrap();
        assert!(plan_summary(&plan).starts_with("0 setup(s)"));
    }
}
