//! Evolution driver: the bounce loop and the recorded event stream.

use std::f64::consts::PI;

use anyhow::{Result, bail};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rayon::prelude::*;

use crate::billiard::Billiard;
use crate::sim::raysplit::{
    RaySplitter, is_transmitted, raysplit_indices, resolve_raysplit, validate_raysplitters,
};
use crate::sim::relocate::{relocate, relocate_rayspl};
use crate::sim::resolve::resolve;
use crate::{Particle, Point, Vector};

/// Termination predicate of an evolution run: a number of collisions or
/// an amount of simulated time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvolveTarget {
    Collisions(usize),
    Time(f64),
}

impl From<usize> for EvolveTarget {
    fn from(n: usize) -> Self {
        EvolveTarget::Collisions(n)
    }
}

impl From<f64> for EvolveTarget {
    fn from(t: f64) -> Self {
        EvolveTarget::Time(t)
    }
}

/// How an evolution run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The collision/time target was reached.
    Completed,
    /// No collision ahead; a final event with `t = inf` was recorded.
    Escaped,
    /// Magnetic particle completed a Larmor period meeting only periodic
    /// walls; a final event with `t = inf` was recorded.
    Pinned,
}

/// Time-ordered collision events of one evolution run.
///
/// Entry 0 is the initial state at `t = 0`; positions are unfolded
/// (`pos + current_cell`). `omegas` is present for magnetic particles.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeseries {
    /// Time elapsed since the previous recorded event.
    pub t: Vec<f64>,
    pub pos: Vec<Point>,
    pub vel: Vec<Vector>,
    pub omegas: Option<Vec<f64>>,
    pub termination: Termination,
}

impl Timeseries {
    fn start(p: &Particle) -> Self {
        Self {
            t: vec![0.0],
            pos: vec![p.pos() + p.current_cell()],
            vel: vec![p.vel()],
            omegas: p.is_magnetic().then(|| vec![p.omega()]),
            termination: Termination::Completed,
        }
    }

    fn record(&mut self, t: f64, p: &Particle) {
        self.t.push(t);
        self.pos.push(p.pos() + p.current_cell());
        self.vel.push(p.vel());
        if let Some(omegas) = self.omegas.as_mut() {
            omegas.push(p.omega());
        }
    }
}

/// Performs a single collision step: finds the nearest obstacle,
/// relocates onto it and resolves the collision.
///
/// Returns the obstacle index and the (corrected) time of flight, or
/// `None` when no collision lies ahead. The cyclotron center cache is
/// refreshed before returning.
pub fn bounce(p: &mut Particle, bd: &Billiard, rng: &mut impl Rng) -> Option<(usize, f64)> {
    let (i, tmin) = bd.next_collision(p)?;
    let tmin = relocate(p, &bd[i], tmin);
    resolve(p, &bd[i], rng);
    p.refresh_cyclotron();
    Some((i, tmin))
}

/// Single collision step with ray-splitting active.
///
/// `raysidx` is the obstacle-to-splitter table from `raysplit_indices`;
/// obstacles without a splitter behave exactly as in `bounce`.
pub fn bounce_raysplit(
    p: &mut Particle,
    bd: &mut Billiard,
    raysidx: &[Option<usize>],
    splitters: &[RaySplitter],
    rng: &mut impl Rng,
) -> Option<(usize, f64)> {
    let (i, mut tmin) = bd.next_collision(p)?;
    match raysidx.get(i).copied().flatten() {
        Some(si) => {
            let rs = &splitters[si];
            p.propagate(tmin);
            let trans = is_transmitted(p, &bd[i], rs, rng);
            let dt = relocate_rayspl(p, &bd[i], trans);
            resolve_raysplit(p, bd, i, trans, rs);
            tmin += dt;
        }
        None => {
            tmin = relocate(p, &bd[i], tmin);
            resolve(p, &bd[i], rng);
        }
    }
    p.refresh_cyclotron();
    Some((i, tmin))
}

fn check_target(target: EvolveTarget) -> Result<()> {
    match target {
        EvolveTarget::Collisions(0) => bail!("the evolution target must be at least 1 collision"),
        EvolveTarget::Time(t) if t <= 0.0 => {
            bail!("the evolution time target must be positive, got {t}")
        }
        _ => Ok(()),
    }
}

/// Larmor period at the particle's current frequency; infinite for
/// straight particles (`omega = 0`), so the pinned check never fires.
fn larmor_period(p: &Particle) -> f64 {
    2.0 * PI / p.omega().abs()
}

/// Evolves the particle in place until the target is reached (or the
/// particle escapes / gets pinned), recording one event per collision
/// with a non-periodic obstacle.
pub fn evolve_mut(
    p: &mut Particle,
    bd: &Billiard,
    target: impl Into<EvolveTarget>,
    rng: &mut impl Rng,
) -> Result<Timeseries> {
    let target = target.into();
    check_target(target)?;
    let (limit, count_time) = match target {
        EvolveTarget::Collisions(n) => (n as f64, false),
        EvolveTarget::Time(t) => (t, true),
    };
    let mut ts = Timeseries::start(p);
    let mut count = 0.0;
    let mut t_acc = 0.0;
    while count < limit {
        let Some((i, tmin)) = bounce(p, bd, rng) else {
            ts.record(f64::INFINITY, p);
            ts.termination = Termination::Escaped;
            break;
        };
        t_acc += tmin;
        if bd[i].is_periodic() {
            if t_acc >= larmor_period(p) {
                ts.record(f64::INFINITY, p);
                ts.termination = Termination::Pinned;
                break;
            }
            continue;
        }
        ts.record(t_acc, p);
        count += if count_time { t_acc } else { 1.0 };
        t_acc = 0.0;
    }
    Ok(ts)
}

/// As `evolve_mut`, with ray-splitting active for the given splitters.
/// The billiard is mutated in place (propagation flags).
pub fn evolve_raysplit_mut(
    p: &mut Particle,
    bd: &mut Billiard,
    target: impl Into<EvolveTarget>,
    splitters: &[RaySplitter],
    rng: &mut impl Rng,
) -> Result<Timeseries> {
    let target = target.into();
    check_target(target)?;
    validate_raysplitters(splitters, bd)?;
    let raysidx = raysplit_indices(bd, splitters);
    let (limit, count_time) = match target {
        EvolveTarget::Collisions(n) => (n as f64, false),
        EvolveTarget::Time(t) => (t, true),
    };
    let mut ts = Timeseries::start(p);
    let mut count = 0.0;
    let mut t_acc = 0.0;
    while count < limit {
        let Some((i, tmin)) = bounce_raysplit(p, bd, &raysidx, splitters, rng) else {
            ts.record(f64::INFINITY, p);
            ts.termination = Termination::Escaped;
            break;
        };
        t_acc += tmin;
        if bd[i].is_periodic() {
            if t_acc >= larmor_period(p) {
                ts.record(f64::INFINITY, p);
                ts.termination = Termination::Pinned;
                break;
            }
            continue;
        }
        ts.record(t_acc, p);
        count += if count_time { t_acc } else { 1.0 };
        t_acc = 0.0;
    }
    Ok(ts)
}

/// Evolves a copy of the particle with a generator seeded from entropy.
pub fn evolve(p: &Particle, bd: &Billiard, target: impl Into<EvolveTarget>) -> Result<Timeseries> {
    evolve_seeded(p, bd, target, rand::thread_rng().r#gen())
}

/// Evolves a copy of the particle; a fixed seed reproduces the orbit.
pub fn evolve_seeded(
    p: &Particle,
    bd: &Billiard,
    target: impl Into<EvolveTarget>,
    seed: u64,
) -> Result<Timeseries> {
    let mut p = *p;
    evolve_mut(&mut p, bd, target, &mut Pcg64::seed_from_u64(seed))
}

/// Ray-splitting evolution of a copy of the particle, entropy-seeded.
pub fn evolve_raysplit(
    p: &Particle,
    bd: &mut Billiard,
    target: impl Into<EvolveTarget>,
    splitters: &[RaySplitter],
) -> Result<Timeseries> {
    evolve_raysplit_seeded(p, bd, target, splitters, rand::thread_rng().r#gen())
}

/// Ray-splitting evolution of a copy of the particle with a fixed seed.
pub fn evolve_raysplit_seeded(
    p: &Particle,
    bd: &mut Billiard,
    target: impl Into<EvolveTarget>,
    splitters: &[RaySplitter],
    seed: u64,
) -> Result<Timeseries> {
    let mut p = *p;
    evolve_raysplit_mut(&mut p, bd, target, splitters, &mut Pcg64::seed_from_u64(seed))
}

/// Evolves many particles in parallel. Each run owns its own billiard
/// clone (propagation flags are simulation state) and a generator seeded
/// deterministically from `seed` and the particle index.
pub fn evolve_ensemble(
    particles: &[Particle],
    bd: &Billiard,
    target: impl Into<EvolveTarget>,
    seed: u64,
) -> Result<Vec<Timeseries>> {
    let target = target.into();
    check_target(target)?;
    particles
        .par_iter()
        .enumerate()
        .map(|(k, p)| {
            let mut p = *p;
            let bd = bd.clone();
            let mut rng = Pcg64::seed_from_u64(seed.wrapping_add(k as u64));
            evolve_mut(&mut p, &bd, target, &mut rng)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::{Antidot, Disk, Obstacle};
    use crate::sim::raysplit::RaySplitter;

    #[test]
    fn test_evolve_rejects_bad_targets() {
        let bd = Billiard::rectangle(1.0, 1.0);
        let p = Particle::from_angle(Point::new(0.5, 0.5), 0.1);
        assert!(evolve_seeded(&p, &bd, 0_usize, 1).is_err());
        assert!(evolve_seeded(&p, &bd, -1.0, 1).is_err());
        assert!(evolve_seeded(&p, &bd, 0.0, 1).is_err());
    }

    #[test]
    fn test_square_orbit_events() {
        let bd = Billiard::rectangle(1.0, 1.0);
        let p = Particle::from_angle(Point::new(0.5, 0.5), 0.0);
        let ts = evolve_seeded(&p, &bd, 4_usize, 1).unwrap();
        assert_eq!(ts.termination, Termination::Completed);
        assert_eq!(ts.t.len(), 5);
        // First flight: half a side; then full sides wall to wall.
        assert!((ts.t[1] - 0.5).abs() < 1e-9);
        for k in 2..5 {
            assert!((ts.t[k] - 1.0).abs() < 1e-9, "t[{k}] = {}", ts.t[k]);
        }
        // Velocities alternate between -x and +x.
        assert!(ts.vel[1].is_close(&Vector::new(-1.0, 0.0)));
        assert!(ts.vel[2].is_close(&Vector::new(1.0, 0.0)));
        assert!(ts.omegas.is_none());
    }

    #[test]
    fn test_time_target_counts_time() {
        let bd = Billiard::rectangle(1.0, 1.0);
        let p = Particle::from_angle(Point::new(0.5, 0.5), 0.0);
        let ts = evolve_seeded(&p, &bd, 3.0, 1).unwrap();
        let total: f64 = ts.t.iter().sum();
        assert!(total >= 3.0, "accumulated {total}");
        assert!(ts.t.len() < 10, "time target must not run forever");
    }

    #[test]
    fn test_escape_records_infinite_event() {
        let bd = Billiard::new(vec![Obstacle::Disk(Disk::new(
            Point::new(0.0, 0.0),
            0.5,
            "disk",
        ))]);
        let p = Particle::from_angle(Point::new(2.0, 0.0), 0.0);
        let ts = evolve_seeded(&p, &bd, 5_usize, 1).unwrap();
        assert_eq!(ts.termination, Termination::Escaped);
        assert!(ts.t.last().unwrap().is_infinite());
    }

    #[test]
    fn test_seeded_runs_are_deterministic() {
        // Random wall reflections drive the orbit; same seed, same orbit.
        let bd = Billiard::new(vec![
            Obstacle::RandomDisk(crate::obstacle::RandomDisk::new(
                Point::new(0.5, 0.5),
                0.2,
                "rough disk",
            )),
            Obstacle::InfiniteWall(crate::obstacle::InfiniteWall::new(
                Point::new(0.0, 0.0),
                Point::new(0.0, 1.0),
                Vector::new(1.0, 0.0),
                "left wall",
            )),
            Obstacle::InfiniteWall(crate::obstacle::InfiniteWall::new(
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Vector::new(-1.0, 0.0),
                "right wall",
            )),
            Obstacle::InfiniteWall(crate::obstacle::InfiniteWall::new(
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Vector::new(0.0, 1.0),
                "bottom wall",
            )),
            Obstacle::InfiniteWall(crate::obstacle::InfiniteWall::new(
                Point::new(0.0, 1.0),
                Point::new(1.0, 1.0),
                Vector::new(0.0, -1.0),
                "top wall",
            )),
        ]);
        let p = Particle::from_angle(Point::new(0.1, 0.5), 0.0);
        let a = evolve_seeded(&p, &bd, 50_usize, 42).unwrap();
        let b = evolve_seeded(&p, &bd, 50_usize, 42).unwrap();
        assert_eq!(a, b);
        let c = evolve_seeded(&p, &bd, 50_usize, 43).unwrap();
        assert_ne!(a.pos, c.pos, "different seeds should diverge");
    }

    #[test]
    fn test_raysplit_validation_errors() {
        let mut bd = Billiard::rectangle(1.0, 1.0);
        let p = Particle::from_angle(Point::new(0.5, 0.5), 0.0);
        // Walls of the rectangle carry no pflag.
        let splitters = vec![RaySplitter::new(vec![0], |_, _, _| 0.5, |phi, _, _| phi)];
        assert!(evolve_raysplit_seeded(&p, &mut bd, 3_usize, &splitters, 1).is_err());
    }

    #[test]
    fn test_raysplit_pass_through() {
        // Always-transmitting antidot in a box: the particle flies
        // straight through, flipping the flag twice per crossing.
        let mut bd = Billiard::rectangle(1.0, 1.0);
        let mut obstacles: Vec<Obstacle> = bd.iter().cloned().collect();
        obstacles.push(Obstacle::Antidot(Antidot::new(
            Point::new(0.5, 0.5),
            0.2,
            "dot",
        )));
        bd = Billiard::new(obstacles);
        let splitters = vec![RaySplitter::new(vec![4], |_, _, _| 1.0, |phi, _, _| phi)];
        let p = Particle::from_angle(Point::new(0.1, 0.5), 0.0);
        let ts = evolve_raysplit_seeded(&p, &mut bd, 3_usize, &splitters, 9).unwrap();
        // Events: enter antidot, exit antidot, right wall.
        assert_eq!(ts.t.len(), 4);
        assert!(ts.vel[1].is_close(&Vector::new(1.0, 0.0)));
        assert!(ts.vel[2].is_close(&Vector::new(1.0, 0.0)));
        assert!((ts.pos[3].x - 1.0).abs() < 1e-9);
        // Two transmissions: the flag is back to its initial value.
        assert_eq!(bd[4].pflag(), Some(true));
    }

    #[test]
    fn test_ensemble_matches_sequential() {
        let bd = Billiard::sinai(1.0, 1.0, 0.2);
        let ps = vec![
            Particle::from_angle(Point::new(0.1, 0.2), 0.4),
            Particle::from_angle(Point::new(0.8, 0.7), 2.1),
        ];
        let runs = evolve_ensemble(&ps, &bd, 20_usize, 5).unwrap();
        assert_eq!(runs.len(), 2);
        for (k, p) in ps.iter().enumerate() {
            let single = evolve_seeded(p, &bd, 20_usize, 5_u64.wrapping_add(k as u64)).unwrap();
            assert_eq!(runs[k], single);
        }
    }
}
