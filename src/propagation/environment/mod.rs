//! Environment collaborators consumed by the dynamics
//!
//! Gravity fields, atmospheres, ephemerides and guidance laws are traits so
//! that dynamics hold them as shared `Arc<dyn ...>` handles. The concrete
//! implementations wrap satkit.

pub mod atmosphere;
pub mod ephemeris;
pub mod gravity;
pub mod guidance;
pub mod satellite;

pub use atmosphere::{AtmosphereDensity, AtmosphereModel, AtmosphereModelType, Exponential, Nrlmsise00};
pub use ephemeris::{CelestialBody, Ephemeris, EphemerisType, SatkitEphemeris};
pub use gravity::{EarthGravity, GravityField, GravityModel};
pub use guidance::{ConstantThrust, GuidanceLaw, LocalOrbitalFrame};
pub use satellite::{PropulsionSystem, SatelliteSystem};
