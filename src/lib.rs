pub mod billiard;
pub mod geom;
pub mod obstacle;
pub mod particle;
pub mod sim;

// Prelude
pub use billiard::Billiard;
pub use geom::point::Point;
pub use geom::vector::Vector;
pub use obstacle::Obstacle;
pub use particle::Particle;
pub use sim::evolution::{
    EvolveTarget, Termination, Timeseries, bounce, bounce_raysplit, evolve, evolve_ensemble,
    evolve_mut, evolve_raysplit, evolve_raysplit_mut, evolve_raysplit_seeded, evolve_seeded,
};
pub use sim::raysplit::{RaySplitter, acceptable_raysplitters, incidence_angle, raysplit_indices};
