//! Post-collision velocity updates for non-splitting obstacles.

use std::f64::consts::{FRAC_PI_2, PI};

use rand::Rng;

use crate::Particle;
use crate::Vector;
use crate::obstacle::{Obstacle, PeriodicWall};

/// Mirror reflection across the obstacle normal at the collision point.
pub fn specular(p: &mut Particle, o: &Obstacle) {
    let normal = o.normal_at(p.pos());
    let dot = p.vel().dot(&normal);
    p.set_vel(p.vel() - 2.0 * dot * normal);
}

/// Reflection into a uniformly random direction within 0.95 * (-pi/2, pi/2)
/// of the normal. The 0.95 factor keeps the output away from grazing
/// directions numerically indistinguishable from +-pi/2.
pub fn random_specular(p: &mut Particle, o: &Obstacle, rng: &mut impl Rng) {
    let normal = o.normal_at(p.pos());
    let phi = normal.angle() + 0.95 * (rng.gen_range(0.0..1.0) * PI - FRAC_PI_2);
    p.set_vel(Vector::from_angle(phi));
}

/// Periodic transition: teleport by the wall's translation vector and
/// book the opposite shift on the cell accumulator. The magnetic variant
/// carries the cyclotron center along.
pub fn periodicity(p: &mut Particle, w: &PeriodicWall) {
    match p {
        Particle::Straight(p) => {
            p.pos = p.pos + w.normal;
            p.current_cell = p.current_cell - w.normal;
        }
        Particle::Magnetic(p) => {
            p.pos = p.pos + w.normal;
            p.current_cell = p.current_cell - w.normal;
            p.center = p.center + w.normal;
        }
    }
}

/// Dispatches the velocity update for a resolved collision.
pub fn resolve(p: &mut Particle, o: &Obstacle, rng: &mut impl Rng) {
    match o {
        Obstacle::PeriodicWall(w) => periodicity(p, w),
        _ if o.is_random() => random_specular(p, o, rng),
        _ => specular(p, o),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use crate::obstacle::{InfiniteWall, RandomWall};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn right_wall() -> Obstacle {
        Obstacle::InfiniteWall(InfiniteWall::new(
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Vector::new(-1.0, 0.0),
            "right",
        ))
    }

    #[test]
    fn test_specular_head_on() {
        let mut p = Particle::from_angle(Point::new(1.0, 0.5), 0.0);
        specular(&mut p, &right_wall());
        assert!(p.vel().is_close(&Vector::new(-1.0, 0.0)));
    }

    #[test]
    fn test_specular_preserves_speed() {
        let mut p = Particle::from_angle(Point::new(1.0, 0.5), 0.3);
        specular(&mut p, &right_wall());
        assert!((p.vel().length() - 1.0).abs() < 10.0 * f64::EPSILON);
        // Tangential component unchanged, normal component flipped.
        assert!((p.vel().dy - (0.3_f64).sin()).abs() < 1e-15);
        assert!((p.vel().dx + (0.3_f64).cos()).abs() < 1e-15);
    }

    #[test]
    fn test_random_specular_stays_off_grazing() {
        let w = Obstacle::RandomWall(RandomWall::new(
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Vector::new(-1.0, 0.0),
            "rough",
        ));
        let mut rng = Pcg64::seed_from_u64(7);
        for _ in 0..200 {
            let mut p = Particle::from_angle(Point::new(1.0, 0.5), 0.1);
            random_specular(&mut p, &w, &mut rng);
            let n = w.normal_at(p.pos());
            let away = p.vel().dot(&n);
            assert!(away > 0.0, "must leave the wall");
            // cos(0.95 * pi/2) lower bound on the normal component.
            assert!(away >= (0.95 * FRAC_PI_2).cos() - 1e-12);
            assert!((p.vel().length() - 1.0).abs() < 1e-14);
        }
    }

    #[test]
    fn test_periodicity_bookkeeping() {
        let w = PeriodicWall::new(
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Vector::new(-1.0, 0.0),
            "right",
        );
        let mut p = Particle::from_angle(Point::new(1.0, 0.4), 0.0);
        let unfolded = p.pos() + p.current_cell();
        periodicity(&mut p, &w);
        assert!(p.pos().is_close(&Point::new(0.0, 0.4)));
        assert!((p.pos() + p.current_cell()).is_close(&unfolded));
    }

    #[test]
    fn test_periodicity_shifts_magnetic_center() {
        let w = PeriodicWall::new(
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Vector::new(-1.0, 0.0),
            "right",
        );
        let mut p = Particle::magnetic(Point::new(1.0, 0.4), 0.0, 2.0);
        let center0 = match p {
            Particle::Magnetic(m) => m.center,
            _ => unreachable!(),
        };
        periodicity(&mut p, &w);
        match p {
            Particle::Magnetic(m) => {
                assert!(m.center.is_close(&(center0 + w.normal)));
            }
            _ => unreachable!(),
        }
    }
}
