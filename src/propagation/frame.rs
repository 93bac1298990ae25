//! Reference frames and the rigid transforms between them
//!
//! Frame orientation comes from satkit's frame transform chain. All supported
//! frames are geocentric, so origin offsets are zero; the `Transform` type still
//! carries a translation so that non-geocentric frames can be added later.

use std::fmt;

use nalgebra::{Matrix3, Vector3};
use satkit::Instant;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::propagation::constants::OMEGA_EARTH;

/// Converts a satkit rotation quaternion into a rotation matrix of this crate's
/// nalgebra version, element by element.
macro_rules! rotation_matrix {
    ($quaternion:expr) => {{
        let rotation = $quaternion.to_rotation_matrix();
        let matrix = rotation.matrix();
        Matrix3::from_fn(|row, column| matrix[(row, column)])
    }};
}

/// Reference frame identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frame {
    /// Geocentric Celestial Reference Frame (inertial, integration frame)
    #[serde(rename = "GCRF")]
    Gcrf,
    /// International Terrestrial Reference Frame (Earth fixed, rotating)
    #[serde(rename = "ITRF")]
    Itrf,
    /// True Equator Mean Equinox (quasi-inertial, SGP4 output frame)
    #[serde(rename = "TEME")]
    Teme,
}

impl Frame {
    /// Frame name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gcrf => "GCRF",
            Self::Itrf => "ITRF",
            Self::Teme => "TEME",
        }
    }

    /// Whether the frame is (quasi-)inertial
    pub fn is_quasi_inertial(&self) -> bool {
        matches!(self, Self::Gcrf | Self::Teme)
    }

    /// Rigid transform taking coordinates expressed in `self` into `target` at `instant`
    pub fn transform_to(&self, target: Frame, instant: &Instant) -> Result<Transform> {
        if *self == target {
            return Ok(Transform::identity());
        }

        let to_gcrf = self.transform_to_gcrf(instant)?;
        let from_gcrf = target.transform_to_gcrf(instant)?.inverse();

        Ok(to_gcrf.then(&from_gcrf))
    }

    fn transform_to_gcrf(&self, instant: &Instant) -> Result<Transform> {
        match self {
            Self::Gcrf => Ok(Transform::identity()),
            Self::Itrf => {
                require_satkit_data("ITRF orientation")?;
                let rotation = rotation_matrix!(satkit::frametransform::qgcrf2itrf(instant));
                Ok(Transform::rotating(rotation, Vector3::new(0.0, 0.0, OMEGA_EARTH)).inverse())
            }
            Self::Teme => {
                let rotation = rotation_matrix!(satkit::frametransform::qteme2gcrf(instant));
                Ok(Transform::rotating(rotation, Vector3::zeros()))
            }
        }
    }
}

/// Fail with `Error::Environment` unless satkit's data files are installed
///
/// satkit loads IERS tables, gravity coefficients and space weather lazily and
/// panics when they are missing, so callers check before touching them.
pub(crate) fn require_satkit_data(what: &str) -> Result<()> {
    if satkit::utils::data_found() {
        return Ok(());
    }
    let location = satkit::utils::datadir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|_| "no data directory".to_string());
    Err(Error::Environment(format!(
        "{} needs satkit data files, not found ({}); run satkit::utils::update_datafiles",
        what, location
    )))
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rigid transform from a source frame A to a destination frame B
///
/// - position: `r_B = R r_A + t`
/// - velocity: `v_B = R v_A - ω × (R r_A)`
///
/// where `ω` is the angular velocity of B relative to A, expressed in B.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Origin offset expressed in the destination frame
    pub translation: Vector3<f64>,
    /// Rotation matrix mapping source axes onto destination axes
    pub rotation: Matrix3<f64>,
    /// Angular velocity of the destination frame relative to the source, in the destination frame
    pub angular_velocity: Vector3<f64>,
}

impl Transform {
    /// Identity transform
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: Matrix3::identity(),
            angular_velocity: Vector3::zeros(),
        }
    }

    /// Pure rotation with an angular rate, no origin offset
    pub fn rotating(rotation: Matrix3<f64>, angular_velocity: Vector3<f64>) -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation,
            angular_velocity,
        }
    }

    /// Rotate a free vector (direction, acceleration) into the destination frame
    pub fn apply_to_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * vector
    }

    /// Transform a position
    pub fn apply_to_position(&self, position: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * position + self.translation
    }

    /// Transform a velocity, which needs the source position for the transport term
    pub fn apply_to_velocity(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> Vector3<f64> {
        self.rotation * velocity - self.angular_velocity.cross(&(self.rotation * position))
    }

    /// Transform from B back to A
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.transpose();
        Self {
            translation: -(rotation * self.translation),
            angular_velocity: -(rotation * self.angular_velocity),
            rotation,
        }
    }

    /// Chain `self` (A → B) with `next` (B → C) into A → C
    pub fn then(&self, next: &Transform) -> Self {
        Self {
            translation: next.rotation * self.translation + next.translation,
            rotation: next.rotation * self.rotation,
            angular_velocity: next.angular_velocity + next.rotation * self.angular_velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation_about_z(angle: f64) -> Matrix3<f64> {
        let (s, c) = angle.sin_cos();
        Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_inverse_round_trip() {
        let transform = Transform::rotating(rotation_about_z(0.3), Vector3::new(0.0, 0.0, 1e-3));
        let inverse = transform.inverse();

        let r = Vector3::new(7.0e6, 1.0e5, -2.0e5);
        let v = Vector3::new(10.0, 7500.0, 300.0);

        let r_b = transform.apply_to_position(&r);
        let v_b = transform.apply_to_velocity(&r, &v);

        let r_a = inverse.apply_to_position(&r_b);
        let v_a = inverse.apply_to_velocity(&r_b, &v_b);

        assert!((r_a - r).norm() < 1e-6);
        assert!((v_a - v).norm() < 1e-9);
    }

    #[test]
    fn test_composition_matches_sequential_application() {
        let first = Transform::rotating(rotation_about_z(0.2), Vector3::new(0.0, 0.0, 2e-4));
        let second = Transform::rotating(rotation_about_z(-0.7), Vector3::new(0.0, 0.0, 5e-5));
        let chained = first.then(&second);

        let r = Vector3::new(6.8e6, -3.0e5, 1.0e6);
        let v = Vector3::new(-100.0, 7600.0, 50.0);

        let r_mid = first.apply_to_position(&r);
        let v_mid = first.apply_to_velocity(&r, &v);
        let r_expected = second.apply_to_position(&r_mid);
        let v_expected = second.apply_to_velocity(&r_mid, &v_mid);

        assert!((chained.apply_to_position(&r) - r_expected).norm() < 1e-6);
        assert!((chained.apply_to_velocity(&r, &v) - v_expected).norm() < 1e-9);
    }

    #[test]
    fn test_itrf_without_data_is_environment_error() {
        let epoch = Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap();
        let result = Frame::Gcrf.transform_to(Frame::Itrf, &epoch);

        if satkit::utils::data_found() {
            assert!(result.is_ok());
        } else {
            assert!(matches!(result, Err(Error::Environment(_))));
        }
    }

    /// Needs satkit's data files; skipped when they are not installed
    #[test]
    fn test_itrf_round_trip() {
        if !satkit::utils::data_found() {
            eprintln!("skipping: satkit data files not installed");
            return;
        }
        let epoch = Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap();
        let to_itrf = Frame::Gcrf.transform_to(Frame::Itrf, &epoch).unwrap();
        let back = Frame::Itrf.transform_to(Frame::Gcrf, &epoch).unwrap();

        let r = Vector3::new(7.0e6, 0.0, 0.0);
        let v = Vector3::new(0.0, 5335.865450622126, 5335.865450622126);

        let r_itrf = to_itrf.apply_to_position(&r);
        let v_itrf = to_itrf.apply_to_velocity(&r, &v);

        assert!((back.apply_to_position(&r_itrf) - r).norm() < 1e-6);
        assert!((back.apply_to_velocity(&r_itrf, &v_itrf) - v).norm() < 1e-9);

        // Earth-fixed speed of an inertial point differs by ω × r
        assert!((v_itrf.norm() - v.norm()).abs() > 1.0);
    }

    #[test]
    fn test_same_frame_is_identity() {
        let epoch = Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap();
        assert_eq!(
            Frame::Teme.transform_to(Frame::Teme, &epoch).unwrap(),
            Transform::identity()
        );
    }
}
