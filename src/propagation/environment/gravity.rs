//! Central body gravity fields
//!
//! Fidelity levels for Earth gravity:
//! - Point mass (μ/r²)
//! - J2 only (oblateness)
//! - Zonal harmonics up to J4
//! - Full spherical harmonics via satkit

use nalgebra::Vector3;
use satkit::Instant;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::propagation::constants::{EARTH_EQUATORIAL_RADIUS_M, J2, J3, J4, MU_EARTH};
use crate::propagation::frame::Frame;

/// Gravitational field of a central body
pub trait GravityField: std::fmt::Debug + Send + Sync {
    /// Gravitational acceleration at a GCRF position (m/s²)
    fn acceleration(&self, position: &Vector3<f64>, instant: &Instant) -> Result<Vector3<f64>>;

    /// Gravitational parameter of the body (m³/s²)
    fn gravitational_parameter(&self) -> f64;

    /// Model name for logging and display
    fn name(&self) -> &'static str;
}

/// Gravity model fidelity selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GravityModel {
    /// Simple point mass: a = -μ/r³ × r
    PointMass,

    /// Point mass + J2 oblateness perturbation
    J2Only,

    /// Point mass + zonal harmonics J2..Jn (n ≤ 4)
    ZonalOnly(u32),

    /// Full spherical harmonics (JGM3) truncated at `min(degree, order)`
    FullField {
        /// Maximum degree (n)
        degree: u32,
        /// Maximum order (m)
        order: u32,
    },
}

/// Earth gravity field
#[derive(Debug, Clone)]
pub struct EarthGravity {
    model: GravityModel,
}

impl EarthGravity {
    pub fn from_model(model: GravityModel) -> Self {
        Self { model }
    }

    pub fn point_mass() -> Self {
        Self::from_model(GravityModel::PointMass)
    }

    /// J2 accounts for Earth's oblateness (equatorial bulge)
    pub fn j2_only() -> Self {
        Self::from_model(GravityModel::J2Only)
    }

    /// Zonal (m = 0) harmonics up to `max_degree`
    pub fn zonal(max_degree: u32) -> Self {
        Self::from_model(GravityModel::ZonalOnly(max_degree))
    }

    /// Common values: (20, 20) for LEO, (70, 70) for precision
    pub fn full_field(degree: u32, order: u32) -> Self {
        Self::from_model(GravityModel::FullField { degree, order })
    }

    pub fn model(&self) -> GravityModel {
        self.model
    }

    fn point_mass_accel(position: &Vector3<f64>) -> Vector3<f64> {
        let r = position.norm();
        if r < 1.0 {
            // Singular at the origin
            return Vector3::zeros();
        }
        -MU_EARTH / (r * r * r) * position
    }

    fn j2_accel(position: &Vector3<f64>) -> Vector3<f64> {
        let r = position.norm();
        if r < 1.0 {
            return Vector3::zeros();
        }

        let r2 = r * r;
        let r5 = r2 * r2 * r;
        let re2 = EARTH_EQUATORIAL_RADIUS_M * EARTH_EQUATORIAL_RADIUS_M;

        // (3/2) J2 μ Re² / r⁵
        let factor = 1.5 * J2 * MU_EARTH * re2 / r5;
        let z2_r2 = position.z * position.z / r2;

        Vector3::new(
            factor * position.x * (5.0 * z2_r2 - 1.0),
            factor * position.y * (5.0 * z2_r2 - 1.0),
            factor * position.z * (5.0 * z2_r2 - 3.0),
        )
    }

    fn higher_zonal_accel(position: &Vector3<f64>, max_degree: u32) -> Vector3<f64> {
        let r = position.norm();
        if max_degree <= 2 || r < 1.0 {
            return Vector3::zeros();
        }

        let (x, y, z) = (position.x, position.y, position.z);
        let r2 = r * r;
        let r7 = r2 * r2 * r2 * r;
        let re3 = EARTH_EQUATORIAL_RADIUS_M.powi(3);
        let z2_r2 = z * z / r2;

        // J3 is odd: north/south asymmetric
        let factor3 = 2.5 * J3 * MU_EARTH * re3 / r7;
        let mut accel = Vector3::new(
            factor3 * x * z * (7.0 * z2_r2 - 3.0),
            factor3 * y * z * (7.0 * z2_r2 - 3.0),
            factor3 * (z * z * (7.0 * z2_r2 - 6.0) + 0.6 * r2),
        );

        if max_degree >= 4 {
            let factor4 = 0.625 * J4 * MU_EARTH * re3 * EARTH_EQUATORIAL_RADIUS_M / r7;
            let z4_r4 = z2_r2 * z2_r2;

            accel += Vector3::new(
                factor4 * x * (63.0 * z4_r4 - 42.0 * z2_r2 + 3.0),
                factor4 * y * (63.0 * z4_r4 - 42.0 * z2_r2 + 3.0),
                factor4 * z * (63.0 * z4_r4 - 70.0 * z2_r2 + 15.0),
            );
        }

        accel
    }

    /// Spherical harmonics evaluated by satkit in the Earth-fixed frame
    fn full_field_accel(
        position: &Vector3<f64>,
        instant: &Instant,
        degree: u32,
        order: u32,
    ) -> Result<Vector3<f64>> {
        let to_itrf = Frame::Gcrf.transform_to(Frame::Itrf, instant)?;
        let position_itrf = to_itrf.apply_to_vector(position);

        let accel_itrf = satkit::earthgravity::accel(
            &From::from([position_itrf.x, position_itrf.y, position_itrf.z]),
            degree.min(order) as usize,
            satkit::earthgravity::GravityModel::JGM3,
        );

        let accel_itrf = Vector3::new(accel_itrf[0], accel_itrf[1], accel_itrf[2]);
        Ok(to_itrf.inverse().apply_to_vector(&accel_itrf))
    }
}

impl GravityField for EarthGravity {
    fn acceleration(&self, position: &Vector3<f64>, instant: &Instant) -> Result<Vector3<f64>> {
        match self.model {
            GravityModel::PointMass => Ok(Self::point_mass_accel(position)),

            GravityModel::J2Only => {
                Ok(Self::point_mass_accel(position) + Self::j2_accel(position))
            }

            GravityModel::ZonalOnly(max_degree) => {
                let mut accel = Self::point_mass_accel(position);
                if max_degree >= 2 {
                    accel += Self::j2_accel(position);
                }
                Ok(accel + Self::higher_zonal_accel(position, max_degree))
            }

            GravityModel::FullField { degree, order } => {
                Self::full_field_accel(position, instant, degree, order)
            }
        }
    }

    fn gravitational_parameter(&self) -> f64 {
        MU_EARTH
    }

    fn name(&self) -> &'static str {
        match self.model {
            GravityModel::PointMass => "Earth Gravity (Point Mass)",
            GravityModel::J2Only => "Earth Gravity (J2)",
            GravityModel::ZonalOnly(_) => "Earth Gravity (Zonal)",
            GravityModel::FullField { .. } => "Earth Gravity (Full Field)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::constants::EARTH_RADIUS_M;

    fn epoch() -> Instant {
        Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap()
    }

    #[test]
    fn test_point_mass() {
        let gravity = EarthGravity::point_mass();
        let r = EARTH_RADIUS_M + 400_000.0;

        let accel = gravity
            .acceleration(&Vector3::new(r, 0.0, 0.0), &epoch())
            .unwrap();

        // Points toward the center with magnitude μ/r² ≈ 8.7 m/s²
        assert!(accel.x < 0.0);
        let expected = MU_EARTH / (r * r);
        assert!((accel.norm() - expected).abs() / expected < 1e-10);
    }

    #[test]
    fn test_j2_perturbation_is_small_and_inward_at_equator() {
        let r = EARTH_RADIUS_M + 400_000.0;
        let position = Vector3::new(r, 0.0, 0.0);

        let point_mass = EarthGravity::point_mass()
            .acceleration(&position, &epoch())
            .unwrap();
        let j2 = EarthGravity::j2_only()
            .acceleration(&position, &epoch())
            .unwrap();

        let perturbation = j2 - point_mass;
        assert!(perturbation.x < 0.0);
        assert!(perturbation.norm() / point_mass.norm() < 2e-3);
    }

    #[test]
    fn test_zonal_terms_break_symmetry() {
        let r = EARTH_RADIUS_M + 400_000.0;
        let north = Vector3::new(r * 0.707, 0.0, r * 0.707);
        let south = Vector3::new(r * 0.707, 0.0, -r * 0.707);

        let gravity = EarthGravity::zonal(4);
        let a_north = gravity.acceleration(&north, &epoch()).unwrap();
        let a_south = gravity.acceleration(&south, &epoch()).unwrap();

        // J3 makes the hemispheres differ
        assert!((a_north.z + a_south.z).abs() > 0.0);
        assert!((a_north.x - a_south.x).abs() > 0.0);

        let j2 = EarthGravity::j2_only().acceleration(&north, &epoch()).unwrap();
        assert!((a_north - j2).norm() / j2.norm() < 1e-5);
    }
}
