//! Collision-time solvers for every particle/obstacle pairing.
//!
//! All solvers return the non-negative time until the next contact, or
//! `f64::INFINITY` when the particle never reaches the obstacle. Straight
//! motion reduces to line/quadratic solves; magnetic motion intersects
//! the particle's cyclotron circle with the obstacle geometry and
//! converts the hit to a time via the traversal angle (`realangle`).

use std::f64::consts::{PI, SQRT_2};

use crate::obstacle::{Obstacle, Semicircle};
use crate::particle::{MagneticParticle, Particle, StraightParticle};
use crate::sim::precision::distancecheck;
use crate::{Point, Vector};

/// Solutions below this time are the tail of the previous contact.
const T_EPS: f64 = 1e-12;

/// Time until the particle hits the obstacle, or infinity.
pub fn collision_time(p: &Particle, o: &Obstacle) -> f64 {
    match p {
        Particle::Straight(p) => straight_time(p, o),
        Particle::Magnetic(p) => magnetic_time(p, o),
    }
}

fn straight_time(p: &StraightParticle, o: &Obstacle) -> f64 {
    match o {
        Obstacle::InfiniteWall(w) => line_time(p, w.sp, w.normal),
        Obstacle::RandomWall(w) => line_time(p, w.sp, w.normal),
        Obstacle::PeriodicWall(w) => {
            line_time(p, w.sp, w.normal.normalize().unwrap_or(w.normal))
        }
        Obstacle::FiniteWall(w) => segment_time(p, w.sp, w.ep, w.normal),
        Obstacle::SplitterWall(w) => segment_time(p, w.sp, w.ep, w.oriented_normal()),
        Obstacle::Disk(d) => disk_time(p, d.center, d.radius),
        Obstacle::RandomDisk(d) => disk_time(p, d.center, d.radius),
        Obstacle::Antidot(a) => antidot_time(p, a.center, a.radius),
        Obstacle::Semicircle(s) => semicircle_time(p, s),
    }
}

/// Straight particle against an infinite line with inward normal `n`.
fn line_time(p: &StraightParticle, sp: Point, n: Vector) -> f64 {
    let posdot = (sp - p.pos).dot(&n);
    if posdot >= 0.0 {
        // On or past the wall already.
        return f64::INFINITY;
    }
    let vdot = p.vel.dot(&n);
    if vdot >= 0.0 {
        // Not approaching.
        return f64::INFINITY;
    }
    posdot / vdot
}

/// As `line_time`, but the hit must fall within the segment.
fn segment_time(p: &StraightParticle, sp: Point, ep: Point, n: Vector) -> f64 {
    let t = line_time(p, sp, n);
    if !t.is_finite() {
        return f64::INFINITY;
    }
    let hit = p.pos + p.vel * t;
    let d = ep - sp;
    let u = (hit - sp).dot(&d) / d.dot(&d);
    if (0.0..=1.0).contains(&u) {
        t
    } else {
        f64::INFINITY
    }
}

/// Straight particle against a disk boundary, hit from outside.
fn disk_time(p: &StraightParticle, center: Point, radius: f64) -> f64 {
    let dc = p.pos - center;
    let b = p.vel.dot(&dc);
    if b >= 0.0 {
        // Moving away from the disk.
        return f64::INFINITY;
    }
    let c = dc.dot(&dc) - radius * radius;
    let disc = b * b - c;
    if disc <= 0.0 {
        return f64::INFINITY;
    }
    let t = -b - disc.sqrt();
    if t > T_EPS { t } else { f64::INFINITY }
}

/// Antidot boundary, hit from whichever side the particle is on.
fn antidot_time(p: &StraightParticle, center: Point, radius: f64) -> f64 {
    let dc = p.pos - center;
    let b = p.vel.dot(&dc);
    let c = dc.dot(&dc) - radius * radius;
    let disc = b * b - c;
    if disc <= 0.0 {
        return f64::INFINITY;
    }
    let t = if c >= 0.0 {
        if b >= 0.0 {
            return f64::INFINITY;
        }
        -b - disc.sqrt()
    } else {
        // Inside: the exit point.
        -b + disc.sqrt()
    };
    if t > T_EPS { t } else { f64::INFINITY }
}

/// Disk solve restricted to the semicircle's active half.
fn semicircle_time(p: &StraightParticle, s: &Semicircle) -> f64 {
    let dc = p.pos - s.center;
    let b = p.vel.dot(&dc);
    let c = dc.dot(&dc) - s.radius * s.radius;
    let disc = b * b - c;
    if disc <= 0.0 {
        return f64::INFINITY;
    }
    let sq = disc.sqrt();
    for t in [-b - sq, -b + sq] {
        if t <= T_EPS {
            continue;
        }
        let hit = p.pos + p.vel * t;
        if (hit - s.center).dot(&s.facedir) < 0.0 {
            return t;
        }
    }
    f64::INFINITY
}

fn magnetic_time(p: &MagneticParticle, o: &Obstacle) -> f64 {
    match o {
        Obstacle::InfiniteWall(w) => magnetic_line_time(p, o, w.sp, w.ep, false),
        Obstacle::RandomWall(w) => magnetic_line_time(p, o, w.sp, w.ep, false),
        Obstacle::PeriodicWall(w) => magnetic_line_time(p, o, w.sp, w.ep, false),
        Obstacle::FiniteWall(w) => magnetic_line_time(p, o, w.sp, w.ep, true),
        Obstacle::SplitterWall(w) => magnetic_line_time(p, o, w.sp, w.ep, true),
        Obstacle::Disk(d) => magnetic_circle_time(p, o, d.center, d.radius, None),
        Obstacle::RandomDisk(d) => magnetic_circle_time(p, o, d.center, d.radius, None),
        Obstacle::Antidot(a) => magnetic_circle_time(p, o, a.center, a.radius, None),
        Obstacle::Semicircle(s) => magnetic_circle_time(p, o, s.center, s.radius, Some(s.facedir)),
    }
}

/// Cyclotron circle against the wall's line. With `bounded` the hit must
/// fall within the segment parameter range.
fn magnetic_line_time(
    p: &MagneticParticle,
    o: &Obstacle,
    sp: Point,
    ep: Point,
    bounded: bool,
) -> f64 {
    let rc = p.radius();
    let d = ep - sp;
    let f = sp - p.center;
    let a = d.dot(&d);
    let b = 2.0 * d.dot(&f);
    let c = f.dot(&f) - rc * rc;
    let disc = b * b - 4.0 * a * c;
    if disc <= 0.0 {
        // The line misses (or is tangent to) the cyclotron circle.
        return f64::INFINITY;
    }
    let sq = disc.sqrt();
    let mut theta = f64::INFINITY;
    for u in [(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)] {
        if bounded && !(0.0..=1.0).contains(&u) {
            continue;
        }
        let th = realangle(p, o, sp + d * u);
        if th < theta {
            theta = th;
        }
    }
    theta * rc
}

/// Cyclotron circle against a circular boundary, optionally restricted to
/// the active half of a semicircle.
fn magnetic_circle_time(
    p: &MagneticParticle,
    o: &Obstacle,
    center: Point,
    radius: f64,
    facedir: Option<Vector>,
) -> f64 {
    let rc = p.radius();
    let dv = center - p.center;
    let d = dv.length();
    if d >= rc + radius || d <= (rc - radius).abs() {
        // Separate, contained or tangent: no crossing.
        return f64::INFINITY;
    }
    let a = (rc * rc - radius * radius + d * d) / (2.0 * d);
    let h = (rc * rc - a * a).max(0.0).sqrt();
    let u = dv * (1.0 / d);
    let base = p.center + u * a;
    let offset = u.perp() * h;
    let mut theta = f64::INFINITY;
    for hit in [base + offset, base + -offset] {
        if let Some(fd) = facedir
            && (hit - center).dot(&fd) >= 0.0
        {
            continue;
        }
        let th = realangle(p, o, hit);
        if th < theta {
            theta = th;
        }
    }
    theta * rc
}

/// Angle traversed along the cyclotron circle from the current position
/// to the intersection point `hit`, in the direction of motion.
///
/// Returns a value in `[0, 2pi)`, or infinity when the point is the
/// contact the particle is just leaving.
fn realangle(p: &MagneticParticle, o: &Obstacle, hit: Point) -> f64 {
    let pr = p.radius();
    let pi_v = hit - p.pos;
    let d2 = pi_v.dot(&pi_v);
    if d2 <= distancecheck() && p.vel.dot(&o.normal_at(p.pos)) >= 0.0 {
        // Departing from this very obstacle.
        return f64::INFINITY;
    }
    let mut d2r = d2 / (2.0 * pr * pr);
    if d2r > 2.0 {
        d2r = 2.0;
    }
    let mut theta = if d2r < 1e-3 {
        acos1mx(d2r)
    } else {
        (1.0 - d2r).acos()
    };
    let pc = p.center - p.pos;
    if pi_v.cross(&pc) * p.omega < 0.0 {
        theta = 2.0 * PI - theta;
    }
    theta
}

/// acos(1 - x) for small x, where the direct form loses precision.
fn acos1mx(x: f64) -> f64 {
    (2.0 * x).sqrt() + x.sqrt().powi(3) / (6.0 * SQRT_2)
}
