//! Physical constants (SI units)

/// Earth's gravitational parameter (GM) in m³/s²
pub const MU_EARTH: f64 = 3.986004418e14;

/// Earth's mean radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Earth's equatorial radius (WGS84) in meters, reference radius of the zonal terms
pub const EARTH_EQUATORIAL_RADIUS_M: f64 = 6_378_137.0;

/// Earth's rotation rate in rad/s
pub const OMEGA_EARTH: f64 = 7.2921150e-5;

/// Sun's gravitational parameter in m³/s²
pub const MU_SUN: f64 = 1.32712440018e20;

/// Moon's gravitational parameter in m³/s²
pub const MU_MOON: f64 = 4.902800066e12;

/// Standard gravity in m/s², used to turn specific impulse into mass flow
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Zonal harmonic coefficients (EGM96, unnormalized)
pub const J2: f64 = 1.08262668e-3;
/// Third zonal harmonic
pub const J3: f64 = -2.53265649e-6;
/// Fourth zonal harmonic
pub const J4: f64 = -1.61962159e-6;
