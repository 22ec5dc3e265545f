//! Recursive decomposition of stock-minus-part into a feature tree.
//!
//! Working along a direction `n`, the stock's silhouette is intersected
//! level by level with the part's upward-facing millable faces. Every
//! level that removes area from the current region closes a feature
//! spanning from the current depth down to that level; whatever is left
//! when the levels run out becomes a through feature down to the stock
//! base.

use crate::decomposition::{Feature, FeatureDecomposition};
use crate::millability::MillabilityAnalyzer;
use fixturekit_core::{Aabb, FaceIndex, GeometryError, Mesh, PlanResult, Tolerances};
use fixturekit_geometry::{
    boundary_polygons, convex_hull, total_area, CsgKernel, PlanarFrame, Polygon, Polygon2, PolygonKernel,
};
use nalgebra::{Point2, Vector3};
use tracing::{debug, info};

/// Part faces at one distance along the decomposition direction
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceLevel {
    pub depth: f64,
    pub polygons: Vec<Polygon2>,
}

/// Silhouette of the stock along a direction
#[derive(Debug, Clone, PartialEq)]
pub struct StockOutline {
    pub polygon: Polygon2,
    /// Distance of the entry plane, just inside the stock's far face.
    pub entry_depth: f64,
    /// Distance of the stock's near face.
    pub base_depth: f64,
}

struct Pass<'a> {
    frame: PlanarFrame,
    levels: &'a [SurfaceLevel],
    base_depth: f64,
}

/// Builds feature decompositions with a polygon kernel
#[derive(Debug, Clone)]
pub struct FeatureDecomposer<K: PolygonKernel = CsgKernel> {
    kernel: K,
    tolerances: Tolerances,
}

impl FeatureDecomposer<CsgKernel> {
    pub fn new(tolerances: Tolerances) -> Self {
        Self {
            kernel: CsgKernel::from_tolerances(&tolerances),
            tolerances,
        }
    }
}

impl<K: PolygonKernel> FeatureDecomposer<K> {
    pub fn with_kernel(kernel: K, tolerances: Tolerances) -> Self {
        Self { kernel, tolerances }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Decompose the material between `stock` and `part` along `direction`
    pub fn decompose(&self, stock: &Mesh, part: &Mesh, direction: &Vector3<f64>) -> PlanResult<FeatureDecomposition> {
        let frame = PlanarFrame::new(direction)?;
        let outline = self.stock_outline(stock, &frame)?;
        let tops = self.stock_tops(stock, &outline, None, &frame)?;
        self.decompose_tops(&tops, outline.base_depth, part, frame)
    }

    /// Like [`decompose`](Self::decompose), with the stock cut down to `bounds` first
    ///
    /// Another setup that faces the part flush along an axis leaves no stock
    /// beyond the part there; `bounds` carries those limits.
    pub fn decompose_within(
        &self,
        stock: &Mesh,
        bounds: &Aabb,
        part: &Mesh,
        direction: &Vector3<f64>,
    ) -> PlanResult<FeatureDecomposition> {
        let frame = PlanarFrame::new(direction)?;
        let Some((window, box_low, box_high)) = self.window(bounds, &frame) else {
            return Ok(FeatureDecomposition::new());
        };
        match self.clip_outline(self.stock_outline(stock, &frame)?, &window, box_low, box_high)? {
            Some(outline) => {
                let tops = self.stock_tops(stock, &outline, Some(&window), &frame)?;
                self.decompose_tops(&tops, outline.base_depth, part, frame)
            }
            None => {
                debug!("Stock is empty inside {:?}..{:?}", bounds.min, bounds.max);
                Ok(FeatureDecomposition::new())
            }
        }
    }

    fn decompose_tops(
        &self,
        tops: &[SurfaceLevel],
        base_depth: f64,
        part: &Mesh,
        frame: PlanarFrame,
    ) -> PlanResult<FeatureDecomposition> {
        let levels = self.surface_levels(part, &frame)?;
        debug!(
            "{} stock tops from {:.4}, base {:.4}, {} part levels",
            tops.len(),
            tops.first().map_or(base_depth, |t| t.depth),
            base_depth,
            levels.len()
        );

        let pass = Pass {
            frame,
            levels: &levels,
            base_depth,
        };
        let tolerance = self.tolerances.no_change_area;
        let mut root = FeatureDecomposition::new();
        for top in tops {
            for region in &top.polygons {
                let first = root.children().len();
                self.decompose_volume(&pass, region.clone(), top.depth, 0, &mut root)?;
                // Features spanning a whole stock top are open to the outside.
                let region_area = region.outer_area();
                for child in &mut root.children_mut()[first..] {
                    child.for_each_feature_mut(&mut |feature| {
                        if (feature.base().outer_area() - region_area).abs() <= tolerance {
                            feature.set_closed(false);
                        }
                    });
                }
            }
        }
        root.validate(&frame.normal(), &self.tolerances)?;

        info!(
            "Decomposed along ({:.3}, {:.3}, {:.3}): {} features, volume {:.4}",
            frame.normal().x,
            frame.normal().y,
            frame.normal().z,
            root.len(),
            root.removed_volume()
        );
        Ok(root)
    }

    /// Convex silhouette of the stock with its entry and base depths
    pub fn stock_outline(&self, stock: &Mesh, frame: &PlanarFrame) -> PlanResult<StockOutline> {
        let projected: Vec<Point2<f64>> = stock.vertices().iter().map(|v| frame.project(v)).collect();
        let hull = convex_hull(&projected)?;
        let (base_depth, max_depth) = stock.extent_along(&frame.normal());
        Ok(StockOutline {
            polygon: Polygon2::new(hull, Vec::new())?,
            entry_depth: max_depth - self.tolerances.entry_epsilon,
            base_depth,
        })
    }

    /// Where the material starts along the frame normal, farthest first.
    ///
    /// The stock's own upward faces are used when together they cover its
    /// silhouette, so stepped stock and already-cut blanks are followed.
    /// Otherwise (a bar lying on its side, say) the outline at the entry
    /// plane stands in for them.
    pub fn stock_tops(
        &self,
        stock: &Mesh,
        outline: &StockOutline,
        window: Option<&Polygon2>,
        frame: &PlanarFrame,
    ) -> PlanResult<Vec<SurfaceLevel>> {
        let fallback = vec![SurfaceLevel {
            depth: outline.entry_depth,
            polygons: vec![outline.polygon.clone()],
        }];
        let silhouette = self.stock_outline(stock, frame)?.polygon.area();
        let faces = self.surface_levels(stock, frame)?;
        let covered: f64 = faces.iter().map(|level| total_area(&level.polygons)).sum();
        if (covered - silhouette).abs() > self.tolerances.no_change_area {
            debug!("Stock tops cover {:.4} of {:.4}, using the outline", covered, silhouette);
            return Ok(fallback);
        }

        let mut tops = Vec::with_capacity(faces.len());
        for level in faces {
            let depth = (level.depth - self.tolerances.entry_epsilon).min(outline.entry_depth);
            if depth - outline.base_depth <= self.tolerances.distance {
                continue;
            }
            let polygons = match window {
                Some(window) => self.clip_to_window(level.polygons, window)?,
                None => level.polygons,
            };
            if !polygons.is_empty() {
                tops.push(SurfaceLevel { depth, polygons });
            }
        }
        Ok(tops)
    }

    /// Stock silhouette clipped to `bounds`, or `None` when nothing is left
    pub fn clipped_outline(&self, stock: &Mesh, bounds: &Aabb, frame: &PlanarFrame) -> PlanResult<Option<StockOutline>> {
        let Some((window, box_low, box_high)) = self.window(bounds, frame) else {
            return Ok(None);
        };
        self.clip_outline(self.stock_outline(stock, frame)?, &window, box_low, box_high)
    }

    /// Footprint of `bounds` in the frame with its depth range
    fn window(&self, bounds: &Aabb, frame: &PlanarFrame) -> Option<(Polygon2, f64, f64)> {
        let n = frame.normal();
        let corners = bounds.corners();
        let (low, high) = corners
            .iter()
            .map(|c| c.coords.dot(&n))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| (lo.min(d), hi.max(d)));
        let projected: Vec<Point2<f64>> = corners.iter().map(|c| frame.project(c)).collect();
        let hull = convex_hull(&projected).ok()?;
        let window = Polygon2::new(hull, Vec::new()).ok()?;
        Some((window, low, high))
    }

    fn clip_outline(
        &self,
        outline: StockOutline,
        window: &Polygon2,
        box_low: f64,
        box_high: f64,
    ) -> PlanResult<Option<StockOutline>> {
        let base_depth = outline.base_depth.max(box_low);
        let entry_depth = outline.entry_depth.min(box_high - self.tolerances.entry_epsilon);
        if entry_depth - base_depth <= self.tolerances.distance {
            return Ok(None);
        }

        let mut clipped = self.clip_to_window(vec![outline.polygon], window)?;
        match clipped.len() {
            0 => Ok(None),
            1 => Ok(Some(StockOutline {
                polygon: clipped.remove(0),
                entry_depth,
                base_depth,
            })),
            found => Err(GeometryError::UnexpectedPolygonCount { expected: 1, found }.into()),
        }
    }

    /// Parts of `polygons` inside the convex `window`, dropping slivers
    fn clip_to_window(&self, polygons: Vec<Polygon2>, window: &Polygon2) -> PlanResult<Vec<Polygon2>> {
        let tolerance = self.tolerances.distance;
        let mut clipped = Vec::with_capacity(polygons.len());
        for polygon in polygons {
            if polygon.outer().iter().all(|p| convex_contains(window.outer(), p, tolerance)) {
                clipped.push(polygon);
            } else if polygon.holes().is_empty()
                && is_convex(polygon.outer(), tolerance)
                && window.outer().iter().all(|p| convex_contains(polygon.outer(), p, tolerance))
            {
                clipped.push(window.clone());
            } else {
                clipped.extend(
                    self.kernel
                        .intersection(std::slice::from_ref(&polygon), std::slice::from_ref(window))?,
                );
            }
        }
        clipped.retain(|p| p.area() > self.tolerances.no_change_area);
        Ok(clipped)
    }

    /// Millable faces looking along the direction, grouped by depth, farthest first
    pub fn surface_levels(&self, part: &Mesh, frame: &PlanarFrame) -> PlanResult<Vec<SurfaceLevel>> {
        let n = frame.normal();
        let cos = self.tolerances.cos_angle();
        let analyzer = MillabilityAnalyzer::new(part, self.tolerances);
        let mut faces: Vec<(FaceIndex, f64)> = analyzer
            .millable_faces(&n)
            .into_iter()
            .filter(|&f| part.normal(f).dot(&n) >= cos)
            .map(|f| (f, frame.depth(&part.centroid(f))))
            .collect();
        faces.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut bands: Vec<Vec<(FaceIndex, f64)>> = Vec::new();
        for entry in faces {
            match bands.last_mut() {
                Some(band) if band[0].1 - entry.1 <= self.tolerances.distance => band.push(entry),
                _ => bands.push(vec![entry]),
            }
        }

        bands
            .into_iter()
            .map(|band| -> PlanResult<SurfaceLevel> {
                let depth = band.iter().map(|(_, d)| d).sum::<f64>() / band.len() as f64;
                let mut indices: Vec<FaceIndex> = band.into_iter().map(|(f, _)| f).collect();
                indices.sort_unstable();
                Ok(SurfaceLevel {
                    depth,
                    polygons: boundary_polygons(part, &indices, frame)?,
                })
            })
            .collect()
    }

    fn decompose_volume(
        &self,
        pass: &Pass<'_>,
        current: Polygon2,
        depth: f64,
        level: usize,
        parent: &mut FeatureDecomposition,
    ) -> PlanResult<()> {
        let Some(next) = pass.levels.get(level) else {
            let through_depth = depth - pass.base_depth;
            if through_depth > self.tolerances.distance {
                let base = Polygon::from_planar(&pass.frame, &current, pass.base_depth);
                parent.add_child(FeatureDecomposition::leaf(Feature::new(base, through_depth, true, true)?));
            }
            return Ok(());
        };

        let remaining = self.kernel.difference(std::slice::from_ref(&current), &next.polygons)?;

        if next.depth > depth - self.tolerances.distance {
            for polygon in remaining {
                self.decompose_volume(pass, polygon, depth, level + 1, parent)?;
            }
            return Ok(());
        }

        let removed = current.area() - total_area(&remaining);
        if removed.abs() <= self.tolerances.no_change_area {
            return self.decompose_volume(pass, current, depth, level + 1, parent);
        }

        let base = Polygon::from_planar(&pass.frame, &current, next.depth);
        let feature = Feature::new(base, depth - next.depth, true, false)?;
        let node = parent.add_child(FeatureDecomposition::leaf(feature));
        for polygon in remaining {
            self.decompose_volume(pass, polygon, next.depth, level + 1, node)?;
        }
        Ok(())
    }
}

/// Whether `p` lies inside or within `tolerance` of a counter-clockwise convex ring
fn convex_contains(ring: &[Point2<f64>], p: &Point2<f64>, tolerance: f64) -> bool {
    (0..ring.len()).all(|i| {
        let (a, b) = (ring[i], ring[(i + 1) % ring.len()]);
        let edge = b - a;
        edge.perp(&(p - a)) >= -tolerance * edge.norm()
    })
}

fn is_convex(ring: &[Point2<f64>], tolerance: f64) -> bool {
    let n = ring.len();
    (0..n).all(|i| {
        let (a, b, c) = (ring[i], ring[(i + 1) % n], ring[(i + 2) % n]);
        (b - a).perp(&(c - b)) >= -tolerance
    })
}

/// Decompose with the default kernel and tolerances
pub fn build_feature_decomposition(
    stock: &Mesh,
    part: &Mesh,
    direction: &Vector3<f64>,
) -> PlanResult<FeatureDecomposition> {
    FeatureDecomposer::new(Tolerances::default()).decompose(stock, part, direction)
}
