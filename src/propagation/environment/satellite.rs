//! Physical description of the spacecraft

use serde::{Deserialize, Serialize};

use crate::propagation::constants::STANDARD_GRAVITY;

/// Chemical or electric propulsion unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropulsionSystem {
    /// Thrust magnitude (N)
    pub thrust: f64,
    /// Specific impulse (s)
    pub specific_impulse: f64,
}

impl PropulsionSystem {
    pub fn new(thrust: f64, specific_impulse: f64) -> Self {
        Self {
            thrust,
            specific_impulse,
        }
    }

    /// Propellant consumption (kg/s)
    pub fn mass_flow_rate(&self) -> f64 {
        if self.specific_impulse <= 0.0 {
            return 0.0;
        }
        self.thrust / (self.specific_impulse * STANDARD_GRAVITY)
    }
}

/// Spacecraft properties used when the state does not carry them
///
/// Typical values:
/// - Cd ≈ 2.0-2.5 for most satellites
/// - A depends on spacecraft geometry and attitude
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteSystem {
    /// Total mass (kg)
    pub mass: f64,
    /// Mass without propellant (kg)
    pub dry_mass: f64,
    /// Cross-sectional area for drag (m²)
    pub surface_area: f64,
    /// Drag coefficient
    pub drag_coefficient: f64,
    /// Propulsion unit, if any
    #[serde(default)]
    pub propulsion: Option<PropulsionSystem>,
}

impl Default for SatelliteSystem {
    /// Small satellite: 100 kg, 1 m², Cd = 2.2, no propulsion
    fn default() -> Self {
        Self {
            mass: 100.0,
            dry_mass: 100.0,
            surface_area: 1.0,
            drag_coefficient: 2.2,
            propulsion: None,
        }
    }
}

impl SatelliteSystem {
    pub fn new(mass: f64, surface_area: f64, drag_coefficient: f64) -> Self {
        Self {
            mass,
            dry_mass: mass,
            surface_area,
            drag_coefficient,
            propulsion: None,
        }
    }

    /// Attach a propulsion unit; `dry_mass` is the mass at propellant exhaustion
    pub fn with_propulsion(mut self, propulsion: PropulsionSystem, dry_mass: f64) -> Self {
        self.propulsion = Some(propulsion);
        self.dry_mass = dry_mass;
        self
    }

    /// Ballistic coefficient m / (Cd × A) in kg/m²
    ///
    /// Lower values mean more drag, faster decay.
    pub fn ballistic_coefficient(&self) -> f64 {
        let cd_area = self.drag_coefficient * self.surface_area;
        if cd_area > 0.0 {
            self.mass / cd_area
        } else {
            f64::INFINITY
        }
    }
}
