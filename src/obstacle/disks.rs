//! Circular obstacles: disks, antidots and semicircles.

use crate::{Point, Vector};

/// Solid disk; particles collide with its boundary from outside.
#[derive(Debug, Clone, PartialEq)]
pub struct Disk {
    pub center: Point,
    pub radius: f64,
    pub name: String,
}

impl Disk {
    pub fn new(center: Point, radius: f64, name: &str) -> Self {
        debug_assert!(radius > 0.0, "disk radius must be positive");
        Self {
            center,
            radius,
            name: name.to_string(),
        }
    }
}

/// Disk reflecting into a uniformly random direction about its normal.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomDisk {
    pub center: Point,
    pub radius: f64,
    pub name: String,
}

impl RandomDisk {
    pub fn new(center: Point, radius: f64, name: &str) -> Self {
        debug_assert!(radius > 0.0, "disk radius must be positive");
        Self {
            center,
            radius,
            name: name.to_string(),
        }
    }
}

/// Ray-splittable disk. The signed distance and the normal flip with
/// `pflag`, which records whether the particle is outside (`true`) or
/// inside (`false`).
#[derive(Debug, Clone, PartialEq)]
pub struct Antidot {
    pub center: Point,
    pub radius: f64,
    pub pflag: bool,
    pub name: String,
}

impl Antidot {
    pub fn new(center: Point, radius: f64, name: &str) -> Self {
        debug_assert!(radius > 0.0, "antidot radius must be positive");
        Self {
            center,
            radius,
            pflag: true,
            name: name.to_string(),
        }
    }
}

/// Half circle; the active arc is the half where
/// `dot(p - center, facedir) < 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Semicircle {
    pub center: Point,
    pub radius: f64,
    /// Unit vector pointing away from the active half.
    pub facedir: Vector,
    pub name: String,
}

impl Semicircle {
    pub fn new(center: Point, radius: f64, facedir: Vector, name: &str) -> Self {
        debug_assert!(radius > 0.0, "semicircle radius must be positive");
        debug_assert!(facedir.length() > 0.0, "facedir must be non-zero");
        Self {
            center,
            radius,
            facedir: facedir.normalize().unwrap_or(facedir),
            name: name.to_string(),
        }
    }

    /// Endpoints of the active arc, on the diameter orthogonal to `facedir`.
    pub fn arc_ends(&self) -> (Point, Point) {
        let along = self.facedir.perp() * self.radius;
        (self.center + along, self.center + -along)
    }
}
