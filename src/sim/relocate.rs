//! Corrective relocation onto the geometrically correct side.
//!
//! After propagating by the computed collision time the particle may sit
//! on the wrong side of the obstacle by a few ulps. The relocation loop
//! nudges the time in geometrically escalating steps (x10) until the
//! signed distance test passes; typical runs take at most a handful of
//! iterations.

use crate::Particle;
use crate::obstacle::Obstacle;
use crate::sim::precision::{timeprec, timeprec_forward};

fn time_precision(p: &Particle, o: &Obstacle) -> f64 {
    // Magnetic crossings of periodic walls happen at shallow angles
    // where position errors cost much more time.
    if p.is_magnetic() && o.is_periodic() {
        timeprec_forward()
    } else {
        timeprec()
    }
}

/// Propagates the particle by `tmin`, corrected so that it lands on the
/// correct side of `o` (just outside a standard obstacle, just past a
/// periodic wall). Returns the corrected time.
pub fn relocate(p: &mut Particle, o: &Obstacle, tmin: f64) -> f64 {
    let sig = o.timeprec_sign();
    let prec = time_precision(p, o);
    let mut t = tmin;
    let mut newpos = p.propagate_pos(t);
    let mut i = 1.0;
    while o.distance(newpos) * sig > 0.0 {
        t += sig * i * prec;
        newpos = p.propagate_pos(t);
        i *= 10.0;
    }
    p.propagate_to(newpos, t);
    t
}

/// Ray-splitting variant: the particle has already been propagated to the
/// obstacle; nudge it forward into the obstacle on transmission, backward
/// out of it otherwise. Returns the applied time correction.
pub fn relocate_rayspl(p: &mut Particle, o: &Obstacle, trans: bool) -> f64 {
    let ineq = if trans { 1.0 } else { -1.0 };
    let prec = timeprec();
    let mut t = 0.0;
    let mut newpos = p.pos();
    let mut i = 1.0;
    while ineq * o.distance(newpos) > 0.0 {
        t += ineq * i * prec;
        newpos = p.propagate_pos(t);
        i *= 10.0;
    }
    p.propagate_to(newpos, t);
    t
}
