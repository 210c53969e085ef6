//! Billiard container: an ordered collection of obstacles.

use std::ops::Index;

use crate::Particle;
use crate::obstacle::{Disk, FiniteWall, InfiniteWall, Obstacle, PeriodicWall, Semicircle};
use crate::sim::collisions::collision_time;
use crate::{Point, Vector};

/// Ordered sequence of obstacles. Indices are stable for the lifetime of
/// a simulation; ray-splitters reference obstacles by index.
#[derive(Debug, Clone, PartialEq)]
pub struct Billiard {
    obstacles: Vec<Obstacle>,
}

impl Billiard {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Obstacle> {
        self.obstacles.iter()
    }

    /// Indexed mutable access, used by ray-splitting to flip `pflag`s.
    pub fn obstacle_mut(&mut self, i: usize) -> &mut Obstacle {
        &mut self.obstacles[i]
    }

    /// Sets every ray-splittable obstacle's `pflag` back to `true`.
    pub fn reset_flags(&mut self) {
        for o in &mut self.obstacles {
            o.set_pflag(true);
        }
    }

    /// Finds the earliest collision of the particle over all obstacles.
    ///
    /// Returns `(obstacle_index, time)` for the smallest finite collision
    /// time (ties go to the lowest index), or `None` if the particle
    /// never collides. Does not mutate anything.
    pub fn next_collision(&self, p: &Particle) -> Option<(usize, f64)> {
        let mut closest: Option<(usize, f64)> = None;
        for (idx, obst) in self.obstacles.iter().enumerate() {
            let t = collision_time(p, obst);
            if !t.is_finite() {
                continue;
            }
            match closest {
                None => closest = Some((idx, t)),
                Some((_, best_t)) if t < best_t => closest = Some((idx, t)),
                _ => {}
            }
        }
        closest
    }

    /// Axis-aligned rectangle `[0, x] x [0, y]` of infinite walls.
    pub fn rectangle(x: f64, y: f64) -> Self {
        debug_assert!(x > 0.0 && y > 0.0);
        let (p00, p10) = (Point::new(0.0, 0.0), Point::new(x, 0.0));
        let (p01, p11) = (Point::new(0.0, y), Point::new(x, y));
        Self::new(vec![
            Obstacle::InfiniteWall(InfiniteWall::new(p00, p01, Vector::new(1.0, 0.0), "left wall")),
            Obstacle::InfiniteWall(InfiniteWall::new(
                p10,
                p11,
                Vector::new(-1.0, 0.0),
                "right wall",
            )),
            Obstacle::InfiniteWall(InfiniteWall::new(
                p00,
                p10,
                Vector::new(0.0, 1.0),
                "bottom wall",
            )),
            Obstacle::InfiniteWall(InfiniteWall::new(p01, p11, Vector::new(0.0, -1.0), "top wall")),
        ])
    }

    /// Rectangle of periodic walls; each normal carries the cell
    /// translation applied on crossing.
    pub fn periodic_rectangle(x: f64, y: f64) -> Self {
        debug_assert!(x > 0.0 && y > 0.0);
        let (p00, p10) = (Point::new(0.0, 0.0), Point::new(x, 0.0));
        let (p01, p11) = (Point::new(0.0, y), Point::new(x, y));
        Self::new(vec![
            Obstacle::PeriodicWall(PeriodicWall::new(p00, p01, Vector::new(x, 0.0), "left wall")),
            Obstacle::PeriodicWall(PeriodicWall::new(p10, p11, Vector::new(-x, 0.0), "right wall")),
            Obstacle::PeriodicWall(PeriodicWall::new(p00, p10, Vector::new(0.0, y), "bottom wall")),
            Obstacle::PeriodicWall(PeriodicWall::new(p01, p11, Vector::new(0.0, -y), "top wall")),
        ])
    }

    /// Sinai billiard: rectangle with a disk at its center.
    pub fn sinai(x: f64, y: f64, radius: f64) -> Self {
        let mut bd = Self::rectangle(x, y);
        bd.obstacles.push(Obstacle::Disk(Disk::new(
            Point::new(x / 2.0, y / 2.0),
            radius,
            "disk",
        )));
        bd
    }

    /// Mushroom billiard: a rectangular stem below a semicircular cap.
    ///
    /// The stem is centered at x = 0, spans `y in [0, stem_length]`, and
    /// the cap of radius `cap_radius` sits on top of it.
    pub fn mushroom(stem_length: f64, stem_width: f64, cap_radius: f64) -> Self {
        debug_assert!(stem_length > 0.0 && stem_width > 0.0);
        debug_assert!(
            stem_width / 2.0 < cap_radius,
            "the cap must be wider than the stem"
        );
        let (hw, sl, cr) = (stem_width / 2.0, stem_length, cap_radius);
        Self::new(vec![
            Obstacle::FiniteWall(FiniteWall::new(
                Point::new(-hw, 0.0),
                Point::new(hw, 0.0),
                Vector::new(0.0, 1.0),
                "stem floor",
            )),
            Obstacle::FiniteWall(FiniteWall::new(
                Point::new(-hw, 0.0),
                Point::new(-hw, sl),
                Vector::new(1.0, 0.0),
                "stem left",
            )),
            Obstacle::FiniteWall(FiniteWall::new(
                Point::new(hw, 0.0),
                Point::new(hw, sl),
                Vector::new(-1.0, 0.0),
                "stem right",
            )),
            Obstacle::FiniteWall(FiniteWall::new(
                Point::new(-cr, sl),
                Point::new(-hw, sl),
                Vector::new(0.0, 1.0),
                "cap shelf left",
            )),
            Obstacle::FiniteWall(FiniteWall::new(
                Point::new(hw, sl),
                Point::new(cr, sl),
                Vector::new(0.0, 1.0),
                "cap shelf right",
            )),
            Obstacle::Semicircle(Semicircle::new(
                Point::new(0.0, sl),
                cr,
                Vector::new(0.0, -1.0),
                "cap",
            )),
        ])
    }
}

impl Index<usize> for Billiard {
    type Output = Obstacle;
    fn index(&self, i: usize) -> &Obstacle {
        &self.obstacles[i]
    }
}

impl<'a> IntoIterator for &'a Billiard {
    type Item = &'a Obstacle;
    type IntoIter = std::slice::Iter<'a, Obstacle>;
    fn into_iter(self) -> Self::IntoIter {
        self.obstacles.iter()
    }
}
