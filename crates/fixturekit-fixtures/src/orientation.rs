//! Ways of seating a part in a vice.
//!
//! A clamp orientation names the two surfaces held by the jaws and the
//! surface resting on the vice floor. The tool approaches from the
//! opposite of the floor normal.

use crate::vice::Vice;
use fixturekit_core::{Mesh, Surface, Tolerances};
use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3};
use tracing::debug;

/// Jaw and floor surfaces of one seating
#[derive(Debug, Clone, PartialEq)]
pub struct ClampOrientation<'m> {
    left: Surface<'m>,
    right: Surface<'m>,
    bottom: Surface<'m>,
    indices: [usize; 3],
}

impl<'m> ClampOrientation<'m> {
    /// Check the jaw faces are antiparallel and the floor orthogonal to both.
    ///
    /// `indices` are the positions of `left`, `right` and `bottom` in the
    /// surface list they came from.
    pub fn new(
        left: Surface<'m>,
        right: Surface<'m>,
        bottom: Surface<'m>,
        indices: [usize; 3],
        tolerances: &Tolerances,
    ) -> Option<Self> {
        let (l, r, b) = (left.normal(), right.normal(), bottom.normal());
        let sin = tolerances.sin_angle();
        let valid = l.dot(&r) <= -tolerances.cos_angle() && b.dot(&l).abs() <= sin && b.dot(&r).abs() <= sin;
        valid.then_some(Self {
            left,
            right,
            bottom,
            indices,
        })
    }

    pub fn left(&self) -> &Surface<'m> {
        &self.left
    }

    pub fn right(&self) -> &Surface<'m> {
        &self.right
    }

    pub fn bottom(&self) -> &Surface<'m> {
        &self.bottom
    }

    /// Surface list positions of left, right and bottom
    pub fn surface_indices(&self) -> [usize; 3] {
        self.indices
    }

    /// Direction the tool comes from
    pub fn top_normal(&self) -> Vector3<f64> {
        -self.bottom.normal()
    }

    pub fn clamp_axis(&self) -> Vector3<f64> {
        self.left.normal()
    }

    pub fn contact_area(&self) -> f64 {
        self.left.area() + self.right.area()
    }

    /// Distance between the jaw planes
    pub fn span(&self) -> f64 {
        self.left.plane_offset() + self.right.plane_offset()
    }

    /// Part extent along the top normal
    pub fn part_height(&self) -> f64 {
        let (lo, hi) = self.left.mesh().extent_along(&self.top_normal());
        hi - lo
    }

    /// Rotation taking the clamp axis to +X and the top normal to +Z
    pub fn rotation(&self) -> Rotation3<f64> {
        let z = self.top_normal().normalize();
        let c = self.clamp_axis();
        let x = (c - z * c.dot(&z)).normalize();
        let y = z.cross(&x);
        Rotation3::from_matrix_unchecked(Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]))
    }
}

/// Every distinct seating of the part, one per top normal.
///
/// Only planar outer surfaces take part. Triples whose jaw span exceeds
/// the vice opening are dropped. Among seatings sharing a top normal the
/// one with the largest jaw contact area is kept, the first enumerated on
/// ties, at the position of the first seating found for that normal.
pub fn stable_orientations_with<'m>(
    surfaces: &[Surface<'m>],
    vice: &Vice,
    tolerances: &Tolerances,
) -> Vec<ClampOrientation<'m>> {
    let candidates: Vec<usize> = surfaces
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_planar(tolerances.angle_deg) && s.is_outer(tolerances.distance))
        .map(|(i, _)| i)
        .collect();

    let cos = tolerances.cos_angle();
    let mut out: Vec<ClampOrientation<'m>> = Vec::new();
    let mut enumerated = 0usize;
    for &l in &candidates {
        for &r in &candidates {
            if r == l {
                continue;
            }
            for &b in &candidates {
                if b == l || b == r {
                    continue;
                }
                let Some(orientation) = ClampOrientation::new(
                    surfaces[l].clone(),
                    surfaces[r].clone(),
                    surfaces[b].clone(),
                    [l, r, b],
                    tolerances,
                ) else {
                    continue;
                };
                enumerated += 1;
                if !vice.fits_opening(orientation.span(), tolerances.distance) {
                    continue;
                }
                let top = orientation.top_normal();
                match out.iter_mut().find(|o| o.top_normal().dot(&top) >= cos) {
                    Some(existing) => {
                        if orientation.contact_area() > existing.contact_area() + tolerances.no_change_area {
                            *existing = orientation;
                        }
                    }
                    None => out.push(orientation),
                }
            }
        }
    }
    debug!(
        "{} outer surfaces give {} clamp triples, {} distinct orientations",
        candidates.len(),
        enumerated,
        out.len()
    );
    out
}

/// Distinct seatings with default tolerances
pub fn all_stable_orientations<'m>(surfaces: &[Surface<'m>], vice: &Vice) -> Vec<ClampOrientation<'m>> {
    stable_orientations_with(surfaces, vice, &Tolerances::default())
}

/// A seating together with the vice configuration holding it
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture<'m> {
    orientation: ClampOrientation<'m>,
    vice: Vice,
}

impl<'m> Fixture<'m> {
    pub fn new(orientation: ClampOrientation<'m>, vice: Vice) -> Self {
        Self { orientation, vice }
    }

    pub fn orientation(&self) -> &ClampOrientation<'m> {
        &self.orientation
    }

    pub fn vice(&self) -> &Vice {
        &self.vice
    }

    pub fn top_normal(&self) -> Vector3<f64> {
        self.orientation.top_normal()
    }

    /// Rigid transform into the vice frame: top normal up, clamp axis
    /// along +X, part centred between the jaws and resting on the plate.
    pub fn part_transform(&self, part: &Mesh) -> Matrix4<f64> {
        let rotation = self.orientation.rotation().to_homogeneous();
        let rotated = part.transformed(&rotation);
        let bounds = rotated.bounds();
        let center = bounds.center();
        let shift = Vector3::new(-center.x, -center.y, self.vice.part_floor() - bounds.min.z);
        Matrix4::new_translation(&shift) * rotation
    }

    /// The surface lies in a jaw plane below the jaw top
    pub fn is_jaw_occluded(&self, surface: &Surface<'_>, tolerances: &Tolerances) -> bool {
        let jaws = [self.orientation.left(), self.orientation.right()];
        let in_jaw_plane = jaws
            .iter()
            .any(|jaw| surface.is_coplanar_with(jaw, tolerances.angle_deg, tolerances.distance));
        if !in_jaw_plane {
            return false;
        }
        let top = self.top_normal();
        let (part_min, _) = surface.mesh().extent_along(&top);
        let (surface_min, _) = surface.extent_along(&top);
        surface_min < part_min + self.vice.grip_depth() - tolerances.distance
    }
}
