//! Moving point particles: straight-line and magnetic (cyclotron) motion.

use crate::{Point, Vector};

/// Particle moving on straight lines between collisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraightParticle {
    pub pos: Point,
    /// Unit velocity direction.
    pub vel: Vector,
    /// Accumulated periodic-cell offset; `pos + current_cell` is the
    /// position in the unfolded plane.
    pub current_cell: Vector,
}

/// Particle moving on circular arcs with signed cyclotron frequency `omega`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagneticParticle {
    pub pos: Point,
    /// Unit velocity direction.
    pub vel: Vector,
    pub current_cell: Vector,
    /// Signed cyclotron frequency; `omega > 0` turns counterclockwise.
    pub omega: f64,
    /// Cached cyclotron center, kept in sync by the bounce loop.
    pub center: Point,
}

impl MagneticParticle {
    /// Cyclotron radius, `1/|omega|`.
    pub fn radius(&self) -> f64 {
        1.0 / self.omega.abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Particle {
    Straight(StraightParticle),
    Magnetic(MagneticParticle),
}

impl Particle {
    /// Straight particle at `pos` moving at angle `phi`.
    pub fn from_angle(pos: Point, phi: f64) -> Self {
        Self::Straight(StraightParticle {
            pos,
            vel: Vector::from_angle(phi),
            current_cell: Vector::new(0.0, 0.0),
        })
    }

    /// Magnetic particle at `pos` moving at angle `phi` with cyclotron
    /// frequency `omega`.
    pub fn magnetic(pos: Point, phi: f64, omega: f64) -> Self {
        debug_assert!(omega != 0.0, "magnetic particle needs omega != 0");
        let vel = Vector::from_angle(phi);
        Self::Magnetic(MagneticParticle {
            pos,
            vel,
            current_cell: Vector::new(0.0, 0.0),
            omega,
            center: find_cyclotron(pos, vel, omega),
        })
    }

    pub fn pos(&self) -> Point {
        match self {
            Particle::Straight(p) => p.pos,
            Particle::Magnetic(p) => p.pos,
        }
    }

    pub fn vel(&self) -> Vector {
        match self {
            Particle::Straight(p) => p.vel,
            Particle::Magnetic(p) => p.vel,
        }
    }

    pub fn set_vel(&mut self, vel: Vector) {
        match self {
            Particle::Straight(p) => p.vel = vel,
            Particle::Magnetic(p) => p.vel = vel,
        }
    }

    pub fn current_cell(&self) -> Vector {
        match self {
            Particle::Straight(p) => p.current_cell,
            Particle::Magnetic(p) => p.current_cell,
        }
    }

    /// Cyclotron frequency; 0 for straight particles.
    pub fn omega(&self) -> f64 {
        match self {
            Particle::Straight(_) => 0.0,
            Particle::Magnetic(p) => p.omega,
        }
    }

    pub fn is_magnetic(&self) -> bool {
        matches!(self, Particle::Magnetic(_))
    }

    /// Angle of the velocity direction, atan2(vy, vx).
    pub fn angle_of_velocity(&self) -> f64 {
        self.vel().angle()
    }

    /// Position after moving for `dt`, without mutating the particle.
    pub fn propagate_pos(&self, dt: f64) -> Point {
        match self {
            Particle::Straight(p) => p.pos + p.vel * dt,
            Particle::Magnetic(p) => {
                let phi0 = p.vel.angle();
                let phi = p.omega * dt + phi0;
                p.pos
                    + Vector::new(
                        (phi.sin() - phi0.sin()) / p.omega,
                        (-phi.cos() + phi0.cos()) / p.omega,
                    )
            }
        }
    }

    /// Moves the particle forward by `dt` along its trajectory.
    pub fn propagate(&mut self, dt: f64) {
        match self {
            Particle::Straight(p) => p.pos = p.pos + p.vel * dt,
            Particle::Magnetic(p) => {
                let phi0 = p.vel.angle();
                let phi = p.omega * dt + phi0;
                p.pos = p.pos
                    + Vector::new(
                        (phi.sin() - phi0.sin()) / p.omega,
                        (-phi.cos() + phi0.cos()) / p.omega,
                    );
                p.vel = Vector::from_angle(phi);
            }
        }
    }

    /// Fast propagation path when the destination is already known:
    /// sets the position directly and advances only the velocity phase.
    pub fn propagate_to(&mut self, pos: Point, dt: f64) {
        match self {
            Particle::Straight(p) => p.pos = pos,
            Particle::Magnetic(p) => {
                let phi0 = p.vel.angle();
                p.pos = pos;
                p.vel = Vector::from_angle(p.omega * dt + phi0);
            }
        }
    }

    /// Recomputes the cached cyclotron center from the current state.
    pub fn refresh_cyclotron(&mut self) {
        if let Particle::Magnetic(p) = self {
            p.center = find_cyclotron(p.pos, p.vel, p.omega);
        }
    }
}

/// Center of the circular trajectory: `pos + (1/omega) * perp(vel)`.
pub fn find_cyclotron(pos: Point, vel: Vector, omega: f64) -> Point {
    pos + vel.perp() * (1.0 / omega)
}
