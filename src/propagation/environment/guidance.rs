//! Guidance laws and local orbital frames for thrust direction

use nalgebra::{Matrix3, Vector3};
use satkit::Instant;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Frame attached to the spacecraft and built from its position and velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalOrbitalFrame {
    /// x radial, z orbit normal, y completes (along-track for circular orbits)
    Qsw,
    /// z nadir, y anti orbit normal, x completes
    Lvlh,
    /// x velocity, y orbit normal, z completes
    Vnc,
    /// x velocity (tangent), z orbit normal, y completes
    Tnw,
}

impl LocalOrbitalFrame {
    /// Rotation from local axes into the frame of `position` and `velocity`
    ///
    /// Columns are the local axes expressed in the working frame.
    pub fn rotation(&self, position: &Vector3<f64>, velocity: &Vector3<f64>) -> Result<Matrix3<f64>> {
        let momentum = position.cross(velocity);
        if position.norm() < 1.0 || momentum.norm() <= f64::EPSILON {
            return Err(Error::InvalidArgument(format!(
                "{:?} frame undefined for degenerate position/velocity",
                self
            )));
        }

        let r_hat = position.normalize();
        let h_hat = momentum.normalize();
        let v_hat = velocity.normalize();

        let (x, y, z) = match self {
            Self::Qsw => (r_hat, h_hat.cross(&r_hat), h_hat),
            Self::Lvlh => {
                let z = -r_hat;
                let y = -h_hat;
                (y.cross(&z), y, z)
            }
            Self::Vnc => (v_hat, h_hat, v_hat.cross(&h_hat)),
            Self::Tnw => (v_hat, h_hat.cross(&v_hat), h_hat),
        };

        Ok(Matrix3::from_columns(&[x, y, z]))
    }
}

/// Commands the thrust direction
pub trait GuidanceLaw: std::fmt::Debug + Send + Sync {
    /// Thrust direction in the working frame, scaled by throttle (norm in [0, 1])
    fn thrust_direction(
        &self,
        instant: &Instant,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> Result<Vector3<f64>>;

    fn name(&self) -> &'static str;
}

/// Fixed direction in a local orbital frame
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantThrust {
    local_frame: LocalOrbitalFrame,
    direction: Vector3<f64>,
}

impl ConstantThrust {
    /// Thrust along `direction`, expressed in `local_frame` (normalized)
    pub fn new(local_frame: LocalOrbitalFrame, direction: Vector3<f64>) -> Result<Self> {
        let norm = direction.norm();
        if norm <= f64::EPSILON || !norm.is_finite() {
            return Err(Error::InvalidArgument(
                "thrust direction must be a non-zero vector".to_string(),
            ));
        }

        Ok(Self {
            local_frame,
            direction: direction / norm,
        })
    }

    /// Prograde thrust along the velocity
    pub fn prograde() -> Self {
        Self {
            local_frame: LocalOrbitalFrame::Vnc,
            direction: Vector3::x(),
        }
    }

    /// Retrograde thrust against the velocity
    pub fn retrograde() -> Self {
        Self {
            local_frame: LocalOrbitalFrame::Vnc,
            direction: -Vector3::x(),
        }
    }

    pub fn local_frame(&self) -> LocalOrbitalFrame {
        self.local_frame
    }

    pub fn direction(&self) -> Vector3<f64> {
        self.direction
    }
}

impl GuidanceLaw for ConstantThrust {
    fn thrust_direction(
        &self,
        _instant: &Instant,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> Result<Vector3<f64>> {
        Ok(self.local_frame.rotation(position, velocity)? * self.direction)
    }

    fn name(&self) -> &'static str {
        "Constant Thrust"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vector3<f64>, Vector3<f64>) {
        (
            Vector3::new(7.0e6, 0.0, 0.0),
            Vector3::new(100.0, 5335.9, 5335.9),
        )
    }

    #[test]
    fn test_local_frames_are_orthonormal() {
        let (r, v) = sample();
        for frame in [
            LocalOrbitalFrame::Qsw,
            LocalOrbitalFrame::Lvlh,
            LocalOrbitalFrame::Vnc,
            LocalOrbitalFrame::Tnw,
        ] {
            let rotation = frame.rotation(&r, &v).unwrap();
            let product = rotation.transpose() * rotation;
            assert!((product - Matrix3::identity()).norm() < 1e-12, "{:?}", frame);
            assert!((rotation.determinant() - 1.0).abs() < 1e-12, "{:?}", frame);
        }
    }

    #[test]
    fn test_prograde_follows_velocity() {
        let (r, v) = sample();
        let epoch = Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap();
        let direction = ConstantThrust::prograde()
            .thrust_direction(&epoch, &r, &v)
            .unwrap();

        assert!((direction - v.normalize()).norm() < 1e-12);
    }

    #[test]
    fn test_qsw_radial_axis() {
        let (r, v) = sample();
        let rotation = LocalOrbitalFrame::Qsw.rotation(&r, &v).unwrap();
        assert!((rotation * Vector3::x() - r.normalize()).norm() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs_rejected() {
        let r = Vector3::new(7.0e6, 0.0, 0.0);
        assert!(LocalOrbitalFrame::Tnw.rotation(&r, &(r * 1e-3)).is_err());
        assert!(ConstantThrust::new(LocalOrbitalFrame::Qsw, Vector3::zeros()).is_err());
    }
}
