//! Table geometry: cushion segments, pocket zones and the table bounds.
//!
//! The cushions form a closed, counter-clockwise chain around the playing
//! surface. Each cushion's normal faces the playing surface, so a ball centre
//! is on the table when its signed distance to every cushion line is at
//! least its radius. Pocket zones are circles overlapping the corners and the
//! middle of the long rails; a slow ball whose centre enters one drops.
//!
//! ```text
//!  (0,W) P3 ─────────── P5 ─────────── P2 (L,W)
//!    │                  c2                  │
//!    │ c3                                c1 │
//!    │                  c0                  │
//!  (0,0) P0 ─────────── P4 ─────────── P1 (L,0)
//! ```
//!
//! Geometry is immutable once built; a new table is built when the cushion
//! restitution changes.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{constants, CushionId, PocketId, Vec2};

/// Shared-endpoint tolerance when validating the cushion chain (m)
const JOINT_TOLERANCE: f64 = 1e-9;

// =============================================================================
// Table description
// =============================================================================

/// Dimensions of a rectangular pocket table.
///
/// Defaults describe a nine-foot table (2.7m x 1.35m playing surface).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableSpec {
    pub length: f64,
    pub width: f64,
    pub corner_pocket_radius: f64,
    /// Distance of corner pocket centres in from both rails
    pub corner_pocket_inset: f64,
    pub side_pocket_radius: f64,
}

impl TableSpec {
    pub fn nine_foot() -> Self {
        Self {
            length: 2.7,
            width: 1.35,
            corner_pocket_radius: 0.06,
            corner_pocket_inset: 0.04,
            side_pocket_radius: 0.055,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("length", self.length),
            ("width", self.width),
            ("corner_pocket_radius", self.corner_pocket_radius),
            ("side_pocket_radius", self.side_pocket_radius),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    value,
                    reason: "must be a finite length greater than zero",
                });
            }
        }
        let inset = self.corner_pocket_inset;
        if !inset.is_finite() || inset < 0.0 || inset * 2.0 >= self.width.min(self.length) {
            return Err(ConfigError::Invalid {
                field: "corner_pocket_inset",
                value: inset,
                reason: "must be non-negative and less than half the table width",
            });
        }
        Ok(())
    }
}

impl Default for TableSpec {
    fn default() -> Self {
        Self::nine_foot()
    }
}

// =============================================================================
// Cushions and pockets
// =============================================================================

/// A straight cushion segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cushion {
    pub id: CushionId,
    pub start: Vec2,
    pub end: Vec2,
    /// Unit normal facing the playing surface
    pub normal: Vec2,
    pub restitution: f64,
}

impl Cushion {
    /// Segment from `start` to `end` of a counter-clockwise boundary.
    ///
    /// The id is assigned when the segment joins a [`TableGeometry`].
    pub fn new(start: Vec2, end: Vec2, restitution: f64) -> Self {
        Self {
            id: CushionId(0),
            start,
            end,
            normal: (end - start).perp().normalized(),
            restitution,
        }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).magnitude()
    }

    /// Distance of `point` from the cushion line, positive on the table side.
    pub fn signed_distance(&self, point: Vec2) -> f64 {
        (point - self.start).dot(&self.normal)
    }

    /// Position of the projection of `point` along the segment, measured from `start`.
    pub fn along(&self, point: Vec2) -> f64 {
        (point - self.start).dot(&(self.end - self.start).normalized())
    }

    /// Closest point on the segment to `point`.
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let t = self.along(point).clamp(0.0, self.length());
        self.start + (self.end - self.start).normalized() * t
    }
}

/// A circular capture region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pocket {
    pub id: PocketId,
    pub center: Vec2,
    pub capture_radius: f64,
}

impl Pocket {
    pub fn new(center: Vec2, capture_radius: f64) -> Self {
        Self {
            id: PocketId(0),
            center,
            capture_radius,
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        (point - self.center).magnitude_squared() < self.capture_radius * self.capture_radius
    }
}

/// Axis-aligned bounding rectangle of the cushion chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
}

// =============================================================================
// Table Geometry
// =============================================================================

/// Validated, immutable table geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGeometry {
    cushions: Vec<Cushion>,
    pockets: Vec<Pocket>,
    bounds: Bounds,
}

impl TableGeometry {
    /// Build from an explicit cushion chain and pocket set.
    ///
    /// Ids are reassigned from the order given. Fails unless the cushions
    /// form a closed, convex, counter-clockwise boundary with normals facing
    /// inward.
    pub fn new(mut cushions: Vec<Cushion>, mut pockets: Vec<Pocket>) -> Result<Self, ConfigError> {
        if cushions.len() < 3 {
            return Err(ConfigError::OpenBoundary(format!(
                "need at least 3 cushions, got {}",
                cushions.len()
            )));
        }

        for (i, cushion) in cushions.iter_mut().enumerate() {
            cushion.id = CushionId(i);
            if !cushion.start.is_finite() || !cushion.end.is_finite() {
                return Err(ConfigError::OpenBoundary(format!("cushion {} is not finite", i)));
            }
            if cushion.length() < constants::EPSILON {
                return Err(ConfigError::OpenBoundary(format!("cushion {} has zero length", i)));
            }
            if !(0.0..=1.0).contains(&cushion.restitution) {
                return Err(ConfigError::Invalid {
                    field: "cushion_restitution",
                    value: cushion.restitution,
                    reason: "must lie in [0, 1]",
                });
            }
            let inward = (cushion.end - cushion.start).perp().normalized();
            if (cushion.normal.magnitude() - 1.0).abs() > 1e-6 || cushion.normal.dot(&inward) < 1.0 - 1e-6 {
                return Err(ConfigError::OpenBoundary(format!(
                    "cushion {} normal does not face the playing surface",
                    i
                )));
            }
        }

        let n = cushions.len();
        for i in 0..n {
            let here = &cushions[i];
            let next = &cushions[(i + 1) % n];
            if (here.end - next.start).magnitude() > JOINT_TOLERANCE {
                return Err(ConfigError::OpenBoundary(format!(
                    "cushion {} ends at ({}, {}) but cushion {} starts at ({}, {})",
                    i,
                    here.end.x,
                    here.end.y,
                    (i + 1) % n,
                    next.start.x,
                    next.start.y
                )));
            }
        }

        // Shoelace: positive for a counter-clockwise chain
        let twice_area: f64 = cushions.iter().map(|c| c.start.cross(&c.end)).sum();
        if twice_area <= 0.0 {
            return Err(ConfigError::OpenBoundary(
                "cushions must run counter-clockwise".to_string(),
            ));
        }

        // Containment tests measure against every cushion line, so the
        // boundary may not turn right anywhere.
        for i in 0..n {
            let here = &cushions[i];
            let next = &cushions[(i + 1) % n];
            let turn = (here.end - here.start).cross(&(next.end - next.start));
            if turn < -constants::EPSILON {
                return Err(ConfigError::OpenBoundary(format!(
                    "boundary is not convex at the joint of cushions {} and {}",
                    i,
                    (i + 1) % n
                )));
            }
        }

        for (i, pocket) in pockets.iter_mut().enumerate() {
            pocket.id = PocketId(i);
            if !pocket.center.is_finite() || !(pocket.capture_radius > 0.0) {
                return Err(ConfigError::Invalid {
                    field: "pocket capture_radius",
                    value: pocket.capture_radius,
                    reason: "must be greater than zero",
                });
            }
        }

        let mut min = cushions[0].start;
        let mut max = cushions[0].start;
        for cushion in &cushions {
            min.x = min.x.min(cushion.start.x);
            min.y = min.y.min(cushion.start.y);
            max.x = max.x.max(cushion.start.x);
            max.y = max.y.max(cushion.start.y);
        }

        Ok(Self {
            cushions,
            pockets,
            bounds: Bounds { min, max },
        })
    }

    /// Closed polygon through `vertices` (counter-clockwise), one cushion per edge.
    pub fn from_polygon(
        vertices: &[Vec2],
        cushion_restitution: f64,
        pockets: Vec<Pocket>,
    ) -> Result<Self, ConfigError> {
        let n = vertices.len();
        let cushions = (0..n)
            .map(|i| Cushion::new(vertices[i], vertices[(i + 1) % n], cushion_restitution))
            .collect();
        Self::new(cushions, pockets)
    }

    /// Rectangular table with four corner pockets and two side pockets.
    pub fn from_spec(spec: &TableSpec, cushion_restitution: f64) -> Result<Self, ConfigError> {
        spec.validate()?;
        let (l, w) = (spec.length, spec.width);
        let inset = spec.corner_pocket_inset;
        let vertices = [
            Vec2::new(0.0, 0.0),
            Vec2::new(l, 0.0),
            Vec2::new(l, w),
            Vec2::new(0.0, w),
        ];
        let corner = spec.corner_pocket_radius;
        let side = spec.side_pocket_radius;
        let pockets = vec![
            Pocket::new(Vec2::new(inset, inset), corner),
            Pocket::new(Vec2::new(l - inset, inset), corner),
            Pocket::new(Vec2::new(l - inset, w - inset), corner),
            Pocket::new(Vec2::new(inset, w - inset), corner),
            Pocket::new(Vec2::new(l / 2.0, 0.0), side),
            Pocket::new(Vec2::new(l / 2.0, w), side),
        ];
        Self::from_polygon(&vertices, cushion_restitution, pockets)
    }

    /// Same boundary and pockets with every cushion set to `restitution`.
    pub fn with_restitution(&self, restitution: f64) -> Result<Self, ConfigError> {
        let cushions = self
            .cushions
            .iter()
            .map(|c| Cushion { restitution, ..*c })
            .collect();
        Self::new(cushions, self.pockets.clone())
    }

    pub fn cushions(&self) -> &[Cushion] {
        &self.cushions
    }

    pub fn pockets(&self) -> &[Pocket] {
        &self.pockets
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn cushion(&self, id: CushionId) -> Option<&Cushion> {
        self.cushions.get(id.0)
    }

    pub fn pocket(&self, id: PocketId) -> Option<&Pocket> {
        self.pockets.get(id.0)
    }

    /// Closest cushion to a ball and the gap between the ball surface and it.
    ///
    /// The gap is negative when the ball overlaps the cushion.
    pub fn nearest_cushion(&self, position: Vec2, radius: f64) -> Option<(&Cushion, f64)> {
        let mut nearest: Option<(&Cushion, f64)> = None;
        for cushion in &self.cushions {
            let gap = (position - cushion.closest_point(position)).magnitude() - radius;
            let gap = if cushion.signed_distance(position) < 0.0 {
                // Centre is past the cushion line
                -gap - 2.0 * radius
            } else {
                gap
            };
            match nearest {
                Some((_, best)) if best <= gap => {}
                _ => nearest = Some((cushion, gap)),
            }
        }
        nearest
    }

    /// The pocket whose capture zone contains `position`, if any.
    pub fn pocket_containing(&self, position: Vec2) -> Option<&Pocket> {
        self.pockets.iter().find(|p| p.contains(position))
    }

    /// Correction that returns a ball centre inside every cushion line.
    ///
    /// Returns the corrected position and the largest overshoot when the
    /// centre has crossed the inset boundary by more than `tolerance`.
    pub fn containment_correction(
        &self,
        position: Vec2,
        radius: f64,
        tolerance: f64,
    ) -> Option<(Vec2, f64)> {
        let mut corrected = position;
        let mut overshoot = 0.0_f64;
        for cushion in &self.cushions {
            let depth = radius - cushion.signed_distance(corrected);
            if depth > tolerance {
                corrected += cushion.normal * depth;
                overshoot = overshoot.max(depth);
            }
        }
        (overshoot > 0.0).then_some((corrected, overshoot))
    }

    /// Whether a ball of `radius` centred at `position` sits fully on the table.
    pub fn fits(&self, position: Vec2, radius: f64) -> bool {
        self.cushions
            .iter()
            .all(|c| c.signed_distance(position) >= radius - JOINT_TOLERANCE)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn standard() -> TableGeometry {
        TableGeometry::from_spec(&TableSpec::nine_foot(), 0.7).unwrap()
    }

    #[test]
    fn test_standard_table_layout() {
        let table = standard();
        assert_eq!(table.cushions().len(), 4);
        assert_eq!(table.pockets().len(), 6);
        assert_eq!(table.bounds().size(), Vec2::new(2.7, 1.35));

        // Normals face the playing surface
        let centre = Vec2::new(1.35, 0.675);
        for cushion in table.cushions() {
            assert!(cushion.signed_distance(centre) > 0.0);
            assert_relative_eq!(cushion.normal.magnitude(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_nearest_cushion() {
        let table = standard();
        let (cushion, gap) = table.nearest_cushion(Vec2::new(1.0, 0.1), 0.0286).unwrap();
        // Bottom rail (y = 0)
        assert_eq!(cushion.id, CushionId(0));
        assert_relative_eq!(gap, 0.1 - 0.0286, epsilon = 1e-12);

        let (cushion, gap) = table.nearest_cushion(Vec2::new(2.69, 0.7), 0.0286).unwrap();
        assert_eq!(cushion.id, CushionId(1));
        assert!(gap < 0.0, "Ball overlapping the rail should report a negative gap");
    }

    #[test]
    fn test_pocket_containing() {
        let table = standard();
        let corner = table.pocket_containing(Vec2::new(0.03, 0.03)).unwrap();
        assert_eq!(corner.id, PocketId(0));

        let side = table.pocket_containing(Vec2::new(1.35, 1.32)).unwrap();
        assert_eq!(side.id, PocketId(5));

        assert!(table.pocket_containing(Vec2::new(1.35, 0.675)).is_none());
    }

    #[test]
    fn test_open_boundary_rejected() {
        let cushions = vec![
            Cushion::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), 0.7),
            Cushion::new(Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), 0.7),
            Cushion::new(Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0), 0.7),
            // Gap: should end at the origin
            Cushion::new(Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.2), 0.7),
        ];
        let result = TableGeometry::new(cushions, vec![]);
        assert!(matches!(result, Err(ConfigError::OpenBoundary(_))));
    }

    #[test]
    fn test_clockwise_boundary_rejected() {
        let vertices = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
        ];
        let result = TableGeometry::from_polygon(&vertices, 0.7, vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_concave_boundary_rejected() {
        // L-shape: counter-clockwise, closed, but turns right at (1, 1)
        let vertices = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let result = TableGeometry::from_polygon(&vertices, 0.7, vec![]);
        assert!(matches!(result, Err(ConfigError::OpenBoundary(_))));

        // A straight run split into two cushions is still convex
        let split = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        assert!(TableGeometry::from_polygon(&split, 0.7, vec![]).is_ok());
    }

    #[test]
    fn test_invalid_spec_rejected() {
        let spec = TableSpec {
            width: -1.0,
            ..TableSpec::nine_foot()
        };
        assert!(TableGeometry::from_spec(&spec, 0.7).is_err());
        assert!(TableGeometry::from_spec(&TableSpec::nine_foot(), 1.5).is_err());
    }

    #[test]
    fn test_containment_correction() {
        let table = standard();
        let radius = 0.0286;

        // Inside: nothing to do
        assert!(table
            .containment_correction(Vec2::new(1.0, 0.5), radius, 1e-6)
            .is_none());

        // Escaped past the head rail
        let (fixed, overshoot) = table
            .containment_correction(Vec2::new(2.75, 0.5), radius, 1e-6)
            .unwrap();
        assert_relative_eq!(fixed.x, 2.7 - radius, epsilon = 1e-12);
        assert_relative_eq!(overshoot, 0.05 + radius, epsilon = 1e-12);
        assert!(table.fits(fixed, radius));
    }

    #[test]
    fn test_with_restitution() {
        let table = standard().with_restitution(0.9).unwrap();
        assert!(table.cushions().iter().all(|c| c.restitution == 0.9));
        assert_eq!(table.pockets(), standard().pockets());
        assert!(standard().with_restitution(-0.1).is_err());
    }

    #[test]
    fn test_triangle_table() {
        let vertices = [Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(1.0, 2.0)];
        let table = TableGeometry::from_polygon(&vertices, 0.8, vec![]).unwrap();
        assert_eq!(table.cushions().len(), 3);
        assert!(table.fits(Vec2::new(1.0, 0.5), 0.1));
    }
}
