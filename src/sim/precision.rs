//! Float-width dependent precision constants for relocation.
//!
//! The values follow eps(f64); a port to another float width only has to
//! touch this module. An extended-precision build would pin the two time
//! steps to a fixed 1e-12 instead of deriving them from eps.

/// Relocation time step, eps^(4/5).
pub fn timeprec() -> f64 {
    f64::EPSILON.powf(0.8)
}

/// Coarser forward relocation step for magnetic particles crossing
/// periodic walls, eps^(3/4). Near-tangential incidence turns tiny
/// position errors into large time corrections.
pub fn timeprec_forward() -> f64 {
    f64::EPSILON.powf(0.75)
}

/// Squared-distance threshold under which an intersection point is
/// suspected to be the obstacle the particle just left, sqrt(eps).
pub fn distancecheck() -> f64 {
    f64::EPSILON.sqrt()
}
