//! Obstacle catalog.
//!
//! Every obstacle kind answers three geometric questions: the unit normal
//! at a boundary point, the signed distance of a position (positive on the
//! side the particle is supposed to be), and, through the collision
//! solvers in `sim::collisions`, the time until a particle hits it.

pub mod disks;
pub mod walls;

pub use disks::{Antidot, Disk, RandomDisk, Semicircle};
pub use walls::{FiniteWall, InfiniteWall, PeriodicWall, RandomWall, SplitterWall};

use crate::{Point, Vector};

#[derive(Debug, Clone, PartialEq)]
pub enum Obstacle {
    InfiniteWall(InfiniteWall),
    FiniteWall(FiniteWall),
    PeriodicWall(PeriodicWall),
    RandomWall(RandomWall),
    SplitterWall(SplitterWall),
    Disk(Disk),
    RandomDisk(RandomDisk),
    Antidot(Antidot),
    Semicircle(Semicircle),
}

impl Obstacle {
    pub fn name(&self) -> &str {
        match self {
            Obstacle::InfiniteWall(o) => &o.name,
            Obstacle::FiniteWall(o) => &o.name,
            Obstacle::PeriodicWall(o) => &o.name,
            Obstacle::RandomWall(o) => &o.name,
            Obstacle::SplitterWall(o) => &o.name,
            Obstacle::Disk(o) => &o.name,
            Obstacle::RandomDisk(o) => &o.name,
            Obstacle::Antidot(o) => &o.name,
            Obstacle::Semicircle(o) => &o.name,
        }
    }

    /// Unit normal at `pos`, pointing toward the side where the particle
    /// currently belongs (the `pflag == true` side for splittable kinds).
    pub fn normal_at(&self, pos: Point) -> Vector {
        match self {
            Obstacle::InfiniteWall(w) => w.normal,
            Obstacle::FiniteWall(w) => w.normal,
            Obstacle::RandomWall(w) => w.normal,
            Obstacle::PeriodicWall(w) => w.normal.normalize().unwrap_or(w.normal),
            Obstacle::SplitterWall(w) => w.oriented_normal(),
            Obstacle::Disk(d) => radial_normal(pos, d.center),
            Obstacle::RandomDisk(d) => radial_normal(pos, d.center),
            Obstacle::Antidot(a) => {
                let n = radial_normal(pos, a.center);
                if a.pflag { n } else { -n }
            }
            // The particle lives inside the arc, so the normal points
            // from the boundary toward the center.
            Obstacle::Semicircle(s) => -radial_normal(pos, s.center),
        }
    }

    /// Signed distance of `pos` from the obstacle boundary.
    ///
    /// Positive means "correct side" for standard obstacles. For
    /// `PeriodicWall` positive means "not yet crossed"; the relocation
    /// sign convention accounts for the difference.
    pub fn distance(&self, pos: Point) -> f64 {
        match self {
            Obstacle::InfiniteWall(w) => (pos - w.sp).dot(&w.normal),
            Obstacle::RandomWall(w) => (pos - w.sp).dot(&w.normal),
            Obstacle::PeriodicWall(w) => {
                let n = w.normal.normalize().unwrap_or(w.normal);
                (pos - w.sp).dot(&n)
            }
            Obstacle::FiniteWall(w) => finite_wall_distance(pos, w),
            Obstacle::SplitterWall(w) => (pos - w.sp).dot(&w.oriented_normal()),
            Obstacle::Disk(d) => pos.distance_to(&d.center) - d.radius,
            Obstacle::RandomDisk(d) => pos.distance_to(&d.center) - d.radius,
            Obstacle::Antidot(a) => {
                let d = pos.distance_to(&a.center) - a.radius;
                if a.pflag { d } else { -d }
            }
            Obstacle::Semicircle(s) => {
                let v = pos - s.center;
                if v.dot(&s.facedir) <= 0.0 {
                    s.radius - v.length()
                } else {
                    // Behind the diameter: distance to the nearer arc end.
                    let (e1, e2) = s.arc_ends();
                    pos.distance_to(&e1).min(pos.distance_to(&e2))
                }
            }
        }
    }

    /// Relocation sign: +1 for periodic walls (nudge past the wall),
    /// -1 otherwise (nudge back outside).
    pub fn timeprec_sign(&self) -> f64 {
        if self.is_periodic() { 1.0 } else { -1.0 }
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self, Obstacle::PeriodicWall(_))
    }

    pub fn is_random(&self) -> bool {
        matches!(self, Obstacle::RandomWall(_) | Obstacle::RandomDisk(_))
    }

    pub fn is_raysplittable(&self) -> bool {
        matches!(self, Obstacle::SplitterWall(_) | Obstacle::Antidot(_))
    }

    pub fn is_door(&self) -> bool {
        matches!(self, Obstacle::FiniteWall(w) if w.isdoor)
    }

    /// Propagation flag of ray-splittable kinds; `None` otherwise.
    pub fn pflag(&self) -> Option<bool> {
        match self {
            Obstacle::SplitterWall(w) => Some(w.pflag),
            Obstacle::Antidot(a) => Some(a.pflag),
            _ => None,
        }
    }

    /// Sets the propagation flag; no-op for kinds without one.
    pub fn set_pflag(&mut self, value: bool) {
        match self {
            Obstacle::SplitterWall(w) => w.pflag = value,
            Obstacle::Antidot(a) => a.pflag = value,
            _ => {}
        }
    }
}

fn radial_normal(pos: Point, center: Point) -> Vector {
    (pos - center).normalize().unwrap_or(Vector::new(1.0, 0.0))
}

/// Signed line distance within the segment's range, distance to the
/// nearer endpoint outside of it (keeps relocation honest near corners
/// of non-convex assemblies).
fn finite_wall_distance(pos: Point, w: &FiniteWall) -> f64 {
    let d = w.ep - w.sp;
    if (w.ep - pos).dot(&d) <= 0.0 {
        return pos.distance_to(&w.ep);
    }
    if (pos - w.sp).dot(&d) <= 0.0 {
        return pos.distance_to(&w.sp);
    }
    (pos - w.sp).dot(&w.normal)
}
