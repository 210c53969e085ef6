//! Straight wall obstacles.

use crate::{Point, Vector};

fn unit_or_keep(v: Vector) -> Vector {
    v.normalize().unwrap_or(v)
}

fn assert_wall_geometry(sp: Point, ep: Point, normal: Vector) {
    let d = ep - sp;
    debug_assert!(d.length() > 0.0, "wall endpoints must differ");
    debug_assert!(normal.length() > 0.0, "wall normal must be non-zero");
    debug_assert!(
        normal.dot(&d).abs() < 1e-9 * normal.length() * d.length(),
        "wall normal must be orthogonal to the wall"
    );
}

/// Wall treated as an infinite line for the collision solve.
///
/// The normal points into the billiard interior.
#[derive(Debug, Clone, PartialEq)]
pub struct InfiniteWall {
    pub sp: Point,
    pub ep: Point,
    /// Unit normal, pointing into the interior.
    pub normal: Vector,
    pub name: String,
}

impl InfiniteWall {
    pub fn new(sp: Point, ep: Point, normal: Vector, name: &str) -> Self {
        assert_wall_geometry(sp, ep, normal);
        Self {
            sp,
            ep,
            normal: unit_or_keep(normal),
            name: name.to_string(),
        }
    }
}

/// Wall restricted to its segment; collisions outside `[sp, ep]` are ignored.
///
/// `isdoor` marks the wall as an escape boundary for downstream
/// escape-time analysis; the collision kernel treats it like any wall.
#[derive(Debug, Clone, PartialEq)]
pub struct FiniteWall {
    pub sp: Point,
    pub ep: Point,
    pub normal: Vector,
    pub isdoor: bool,
    pub name: String,
}

impl FiniteWall {
    pub fn new(sp: Point, ep: Point, normal: Vector, name: &str) -> Self {
        assert_wall_geometry(sp, ep, normal);
        Self {
            sp,
            ep,
            normal: unit_or_keep(normal),
            isdoor: false,
            name: name.to_string(),
        }
    }

    pub fn door(sp: Point, ep: Point, normal: Vector, name: &str) -> Self {
        Self {
            isdoor: true,
            ..Self::new(sp, ep, normal, name)
        }
    }
}

/// Wall that teleports the particle by its (non-unit) normal on collision.
///
/// The length of `normal` equals the translation of the periodic cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicWall {
    pub sp: Point,
    pub ep: Point,
    /// Cell translation; points into the interior.
    pub normal: Vector,
    pub name: String,
}

impl PeriodicWall {
    pub fn new(sp: Point, ep: Point, normal: Vector, name: &str) -> Self {
        assert_wall_geometry(sp, ep, normal);
        Self {
            sp,
            ep,
            normal,
            name: name.to_string(),
        }
    }
}

/// Wall reflecting into a uniformly random direction about its normal.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomWall {
    pub sp: Point,
    pub ep: Point,
    pub normal: Vector,
    pub name: String,
}

impl RandomWall {
    pub fn new(sp: Point, ep: Point, normal: Vector, name: &str) -> Self {
        assert_wall_geometry(sp, ep, normal);
        Self {
            sp,
            ep,
            normal: unit_or_keep(normal),
            name: name.to_string(),
        }
    }
}

/// Ray-splittable wall. `pflag` records which side the particle currently
/// occupies; the stored normal points toward the `pflag == true` side.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitterWall {
    pub sp: Point,
    pub ep: Point,
    pub normal: Vector,
    pub pflag: bool,
    pub name: String,
}

impl SplitterWall {
    pub fn new(sp: Point, ep: Point, normal: Vector, name: &str) -> Self {
        assert_wall_geometry(sp, ep, normal);
        Self {
            sp,
            ep,
            normal: unit_or_keep(normal),
            pflag: true,
            name: name.to_string(),
        }
    }

    /// Normal pointing toward the particle's current side.
    pub fn oriented_normal(&self) -> Vector {
        if self.pflag { self.normal } else { -self.normal }
    }
}
