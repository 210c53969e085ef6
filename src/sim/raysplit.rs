//! Probabilistic ray-splitting: transmission through obstacles with
//! refraction, tracked by per-obstacle propagation flags.

use std::f64::consts::FRAC_PI_2;

use anyhow::{Result, bail};
use rand::Rng;

use crate::billiard::Billiard;
use crate::obstacle::Obstacle;
use crate::sim::resolve::specular;
use crate::{Particle, Vector};

/// Transmission and refraction laws: `f(phi, pflag, omega)`.
pub type AngleFn = Box<dyn Fn(f64, bool, f64) -> f64 + Send + Sync>;
/// Cyclotron frequency change on transmission: `f(omega, pflag)`.
pub type OmegaFn = Box<dyn Fn(f64, bool) -> f64 + Send + Sync>;

/// Governs ray-splitting for a set of obstacles.
///
/// `oidx` lists the obstacle indices this splitter answers for; `affect`
/// lists every index whose propagation flag flips atomically when a
/// transmission happens (a superset of `oidx`, e.g. both sides of a
/// double-sided membrane).
pub struct RaySplitter {
    pub oidx: Vec<usize>,
    pub affect: Vec<usize>,
    transmission: AngleFn,
    refraction: AngleFn,
    newomega: OmegaFn,
}

impl RaySplitter {
    /// Splitter over `oidx` with `affect = oidx` and an identity
    /// `newomega`.
    pub fn new(
        oidx: Vec<usize>,
        transmission: impl Fn(f64, bool, f64) -> f64 + Send + Sync + 'static,
        refraction: impl Fn(f64, bool, f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        let affect = oidx.clone();
        Self {
            oidx,
            affect,
            transmission: Box::new(transmission),
            refraction: Box::new(refraction),
            newomega: Box::new(|omega, _| omega),
        }
    }

    pub fn with_affect(mut self, affect: Vec<usize>) -> Self {
        self.affect = affect;
        self
    }

    pub fn with_newomega(
        mut self,
        newomega: impl Fn(f64, bool) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.newomega = Box::new(newomega);
        self
    }

    /// Transmission probability for incidence angle `phi`.
    pub fn transmission(&self, phi: f64, pflag: bool, omega: f64) -> f64 {
        (self.transmission)(phi, pflag, omega)
    }

    /// Refraction angle relative to the normal of the departure side.
    pub fn refraction(&self, phi: f64, pflag: bool, omega: f64) -> f64 {
        (self.refraction)(phi, pflag, omega)
    }

    pub fn newomega(&self, omega: f64, pflag: bool) -> f64 {
        (self.newomega)(omega, pflag)
    }

    /// Sweeps the angle/frequency/flag space checking that the splitter
    /// is physically sensible.
    ///
    /// Always checked: where the refraction angle reaches pi/2 the
    /// transmission must vanish, and a failing (non-finite) refraction is
    /// tolerated only where the transmission is zero. Unless
    /// `only_mandatory`, also requires transmission to be even and
    /// refraction odd in `phi` at `omega = 0`, and both the ray and the
    /// frequency map to be reversible wherever transmission can occur.
    pub fn isphysical(&self, only_mandatory: bool) -> bool {
        const ATOL: f64 = 1e-12;
        for pflag in [true, false] {
            for k in -10i32..=10 {
                let omega = f64::from(k) * 0.1;
                for j in -150i32..=150 {
                    let phi = f64::from(j) * 0.01;
                    let theta = self.refraction(phi, pflag, omega);
                    let t = self.transmission(phi, pflag, omega);
                    if !theta.is_finite() {
                        if t != 0.0 {
                            return false;
                        }
                        continue;
                    }
                    if theta >= FRAC_PI_2 && t > 0.0 {
                        return false;
                    }
                    if only_mandatory {
                        continue;
                    }
                    if omega == 0.0 {
                        if (t - self.transmission(-phi, pflag, omega)).abs() > ATOL {
                            return false;
                        }
                        let theta_m = self.refraction(-phi, pflag, omega);
                        if theta_m.is_finite() {
                            if (theta + theta_m).abs() > ATOL {
                                return false;
                            }
                        } else if self.transmission(-phi, pflag, omega) != 0.0 {
                            return false;
                        }
                    }
                    if t != 0.0 {
                        let back = self.refraction(theta, !pflag, omega);
                        if !back.is_finite() || (back - phi).abs() > ATOL {
                            return false;
                        }
                        let omega_back = self.newomega(self.newomega(omega, pflag), !pflag);
                        if (omega_back - omega).abs() > ATOL {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

/// Builds the obstacle-index -> splitter-index lookup table, built once
/// per evolution call.
pub fn raysplit_indices(bd: &Billiard, splitters: &[RaySplitter]) -> Vec<Option<usize>> {
    let mut table = vec![None; bd.len()];
    for (si, rs) in splitters.iter().enumerate() {
        for &i in &rs.oidx {
            table[i] = Some(si);
        }
    }
    table
}

pub(crate) fn validate_raysplitters(splitters: &[RaySplitter], bd: &Billiard) -> Result<()> {
    let mut claimed = vec![false; bd.len()];
    for (si, rs) in splitters.iter().enumerate() {
        for &i in &rs.oidx {
            if i >= bd.len() {
                bail!(
                    "ray splitter {si} references obstacle {i}, but the billiard has {} obstacles",
                    bd.len()
                );
            }
            if !bd[i].is_raysplittable() {
                bail!(
                    "obstacle {i} ({}) carries no propagation flag and cannot ray-split",
                    bd[i].name()
                );
            }
            if !rs.affect.contains(&i) {
                bail!("ray splitter {si}: obstacle {i} is missing from its affect list");
            }
            if claimed[i] {
                bail!("obstacle {i} is claimed by more than one ray splitter");
            }
            claimed[i] = true;
        }
        for &a in &rs.affect {
            if a >= bd.len() {
                bail!(
                    "ray splitter {si} affects obstacle {a}, but the billiard has {} obstacles",
                    bd.len()
                );
            }
            if !bd[a].is_raysplittable() {
                bail!(
                    "obstacle {a} ({}) carries no propagation flag and cannot be affected",
                    bd[a].name()
                );
            }
        }
    }
    Ok(())
}

/// Whether the splitter set is valid for this billiard: indices in range
/// and ray-splittable, `oidx` a subset of `affect`, `oidx` sets disjoint
/// across splitters.
pub fn acceptable_raysplitters(splitters: &[RaySplitter], bd: &Billiard) -> bool {
    validate_raysplitters(splitters, bd).is_ok()
}

/// Signed incidence angle between the velocity and the inward normal,
/// in `[-pi/2, pi/2]`.
pub fn incidence_angle(p: &Particle, o: &Obstacle) -> f64 {
    let n = o.normal_at(p.pos());
    let cosine = p.vel().dot(&-n).clamp(-1.0, 1.0);
    let phi = cosine.acos();
    if p.vel().cross(&n) < 0.0 { -phi } else { phi }
}

/// Draws the transmission decision for a collision with obstacle `o`.
pub fn is_transmitted(
    p: &Particle,
    o: &Obstacle,
    rs: &RaySplitter,
    rng: &mut impl Rng,
) -> bool {
    let phi = incidence_angle(p, o);
    let pflag = o.pflag().unwrap_or(true);
    rs.transmission(phi, pflag, p.omega()) > rng.gen_range(0.0..1.0)
}

/// Applies the post-collision update for a ray-splitting obstacle.
///
/// On transmission: refract relative to the departure side, flip every
/// affected propagation flag, then rebuild the velocity from the flipped
/// normal; magnetic particles also get their new cyclotron frequency.
/// Otherwise reflect specularly.
pub(crate) fn resolve_raysplit(
    p: &mut Particle,
    bd: &mut Billiard,
    idx: usize,
    trans: bool,
    rs: &RaySplitter,
) {
    if !trans {
        specular(p, &bd[idx]);
        return;
    }
    let o = &bd[idx];
    let old_pflag = o.pflag().unwrap_or(true);
    let theta = rs.refraction(incidence_angle(p, o), old_pflag, p.omega());
    // Flip before reading the normal again, so it points to the new side.
    for &ai in &rs.affect {
        let flag = bd[ai].pflag().unwrap_or(true);
        bd.obstacle_mut(ai).set_pflag(!flag);
    }
    let n = bd[idx].normal_at(p.pos());
    p.set_vel(Vector::from_angle(theta + n.angle()));
    if let Particle::Magnetic(m) = p {
        m.omega = rs.newomega(m.omega, !old_pflag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use crate::obstacle::{Antidot, Disk, SplitterWall};

    fn snell(n: f64) -> RaySplitter {
        RaySplitter::new(
            vec![0],
            move |phi: f64, pflag, _omega| {
                if !pflag && phi.sin().abs() >= 1.0 / n {
                    0.0
                } else {
                    0.5
                }
            },
            move |phi: f64, pflag, _omega| {
                if pflag {
                    (phi.sin() / n).asin()
                } else {
                    (phi.sin() * n).asin()
                }
            },
        )
    }

    fn antidot_billiard() -> Billiard {
        Billiard::new(vec![Obstacle::Antidot(Antidot::new(
            Point::new(0.0, 0.0),
            0.5,
            "dot",
        ))])
    }

    #[test]
    fn test_incidence_angle_head_on() {
        let bd = antidot_billiard();
        let p = Particle::from_angle(Point::new(-0.5, 0.0), 0.0);
        assert!(incidence_angle(&p, &bd[0]).abs() < 1e-12);
    }

    #[test]
    fn test_incidence_angle_sign() {
        let w = Obstacle::SplitterWall(SplitterWall::new(
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Vector::new(-1.0, 0.0),
            "membrane",
        ));
        let up = Particle::from_angle(Point::new(1.0, 0.5), 0.3);
        let down = Particle::from_angle(Point::new(1.0, 0.5), -0.3);
        let phi_up = incidence_angle(&up, &w);
        let phi_down = incidence_angle(&down, &w);
        assert!((phi_up - 0.3).abs() < 1e-12);
        assert!((phi_down + 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_resolve_raysplit_transmission_flips_flags() {
        let mut bd = antidot_billiard();
        let rs = RaySplitter::new(vec![0], |_, _, _| 1.0, |phi, _, _| phi);
        // Particle relocated just inside the antidot, heading through.
        let mut p = Particle::from_angle(Point::new(-0.5 + 1e-9, 0.0), 0.0);
        resolve_raysplit(&mut p, &mut bd, 0, true, &rs);
        assert_eq!(bd[0].pflag(), Some(false));
        // Head-on with identity refraction: direction unchanged.
        assert!((p.vel().dx - 1.0).abs() < 1e-9);
        assert!(p.vel().dy.abs() < 1e-9);
    }

    #[test]
    fn test_resolve_raysplit_reflection_keeps_flags() {
        let mut bd = antidot_billiard();
        let rs = RaySplitter::new(vec![0], |_, _, _| 0.0, |phi, _, _| phi);
        let mut p = Particle::from_angle(Point::new(-0.5, 0.0), 0.0);
        resolve_raysplit(&mut p, &mut bd, 0, false, &rs);
        assert_eq!(bd[0].pflag(), Some(true));
        assert!((p.vel().dx + 1.0).abs() < 1e-12, "specular turn-back");
    }

    #[test]
    fn test_affect_flips_every_listed_obstacle() {
        let mut bd = Billiard::new(vec![
            Obstacle::Antidot(Antidot::new(Point::new(0.0, 0.0), 0.5, "a")),
            Obstacle::Antidot(Antidot::new(Point::new(3.0, 0.0), 0.5, "b")),
        ]);
        let rs = RaySplitter::new(vec![0], |_, _, _| 1.0, |phi, _, _| phi)
            .with_affect(vec![0, 1]);
        let mut p = Particle::from_angle(Point::new(-0.5, 0.0), 0.0);
        resolve_raysplit(&mut p, &mut bd, 0, true, &rs);
        assert_eq!(bd[0].pflag(), Some(false));
        assert_eq!(bd[1].pflag(), Some(false));
    }

    #[test]
    fn test_acceptable_raysplitters() {
        let bd = Billiard::new(vec![
            Obstacle::Antidot(Antidot::new(Point::new(0.0, 0.0), 0.5, "dot")),
            Obstacle::Disk(Disk::new(Point::new(3.0, 0.0), 0.5, "plain")),
        ]);
        let ok = vec![RaySplitter::new(vec![0], |_, _, _| 0.5, |phi, _, _| phi)];
        assert!(acceptable_raysplitters(&ok, &bd));

        // A plain disk has no pflag.
        let on_disk = vec![RaySplitter::new(vec![1], |_, _, _| 0.5, |phi, _, _| phi)];
        assert!(!acceptable_raysplitters(&on_disk, &bd));

        // Out of range.
        let oor = vec![RaySplitter::new(vec![7], |_, _, _| 0.5, |phi, _, _| phi)];
        assert!(!acceptable_raysplitters(&oor, &bd));

        // oidx must be a subset of affect.
        let bad_affect = vec![
            RaySplitter::new(vec![0], |_, _, _| 0.5, |phi, _, _| phi).with_affect(vec![]),
        ];
        assert!(!acceptable_raysplitters(&bad_affect, &bd));

        // Two splitters must not share an obstacle.
        let shared = vec![
            RaySplitter::new(vec![0], |_, _, _| 0.5, |phi, _, _| phi),
            RaySplitter::new(vec![0], |_, _, _| 0.5, |phi, _, _| phi),
        ];
        assert!(!acceptable_raysplitters(&shared, &bd));
    }

    #[test]
    fn test_isphysical_snell() {
        assert!(snell(1.5).isphysical(false));
        assert!(snell(2.0).isphysical(true));
    }

    #[test]
    fn test_isphysical_rejects_transmission_past_critical() {
        // Transmits everywhere, including where refraction fails.
        let bad = RaySplitter::new(
            vec![0],
            |_, _, _| 1.0,
            |phi: f64, pflag, _| {
                if pflag {
                    (phi.sin() / 1.5).asin()
                } else {
                    (phi.sin() * 1.5).asin()
                }
            },
        );
        assert!(!bad.isphysical(true));
    }

    #[test]
    fn test_isphysical_rejects_asymmetric_transmission() {
        let lopsided = RaySplitter::new(
            vec![0],
            |phi: f64, _, _| if phi > 0.0 { 0.4 } else { 0.6 },
            |phi, _, _| phi,
        );
        assert!(!lopsided.isphysical(false));
        // The mandatory subset does not test symmetry.
        assert!(lopsided.isphysical(true));
    }

    #[test]
    fn test_raysplit_indices_table() {
        let bd = Billiard::new(vec![
            Obstacle::Antidot(Antidot::new(Point::new(0.0, 0.0), 0.5, "a")),
            Obstacle::Disk(Disk::new(Point::new(3.0, 0.0), 0.5, "plain")),
            Obstacle::Antidot(Antidot::new(Point::new(6.0, 0.0), 0.5, "b")),
        ]);
        let splitters = vec![RaySplitter::new(vec![2], |_, _, _| 0.5, |phi, _, _| phi)];
        let table = raysplit_indices(&bd, &splitters);
        assert_eq!(table, vec![None, None, Some(0)]);
    }
}
