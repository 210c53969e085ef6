pub mod collisions;
pub mod evolution;
pub mod precision;
pub mod raysplit;
pub mod relocate;
pub mod resolve;
