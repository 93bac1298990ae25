//! Coordinate subsets: named groups of scalars travelling in a state vector
//!
//! Every subset knows its size and how two of its values combine. Most subsets
//! are plain real vectors; position, velocity, attitude and angular velocity also
//! know how to re-express themselves in another frame.

use std::fmt;
use std::sync::Arc;

use nalgebra::{DVector, Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector3, Vector4};

use super::CoordinateBroker;
use crate::error::Result;
use crate::propagation::frame::Transform;

/// Name of the Cartesian position subset
pub const CARTESIAN_POSITION: &str = "CARTESIAN_POSITION";
/// Name of the Cartesian velocity subset
pub const CARTESIAN_VELOCITY: &str = "CARTESIAN_VELOCITY";
/// Name of the attitude quaternion subset
pub const ATTITUDE_QUATERNION: &str = "ATTITUDE_QUATERNION";
/// Name of the body angular velocity subset
pub const ANGULAR_VELOCITY: &str = "ANGULAR_VELOCITY";
/// Name of the mass subset
pub const MASS: &str = "MASS";
/// Name of the surface area subset
pub const SURFACE_AREA: &str = "SURFACE_AREA";
/// Name of the drag coefficient subset
pub const DRAG_COEFFICIENT: &str = "DRAG_COEFFICIENT";

/// Shared handle to a coordinate subset definition
pub type SharedSubset = Arc<dyn CoordinateSubset>;

/// One physical quantity group within a state vector
///
/// Identity is the name: two subsets with the same name are the same subset.
pub trait CoordinateSubset: fmt::Debug + Send + Sync {
    /// Unique name
    fn name(&self) -> &str;

    /// Number of scalar components (at least one)
    fn size(&self) -> usize;

    /// Combine two values of this subset (elementwise sum by default)
    fn add(&self, lhs: &[f64], rhs: &[f64]) -> DVector<f64> {
        DVector::from_iterator(self.size(), lhs.iter().zip(rhs).map(|(a, b)| a + b))
    }

    /// Difference of two values of this subset (elementwise by default)
    fn subtract(&self, lhs: &[f64], rhs: &[f64]) -> DVector<f64> {
        DVector::from_iterator(self.size(), lhs.iter().zip(rhs).map(|(a, b)| a - b))
    }

    /// Re-express this subset's value in the destination frame of `transform`
    ///
    /// `coordinates` is the full state vector laid out by `broker`, so that subsets
    /// depending on others (velocity on position) can read them. Frame-independent
    /// quantities pass through unchanged.
    fn in_frame(
        &self,
        coordinates: &[f64],
        broker: &CoordinateBroker,
        _transform: &Transform,
    ) -> Result<DVector<f64>> {
        Ok(DVector::from_column_slice(broker.extract(coordinates, self.name())?))
    }
}

/// Frame-independent real-valued subset (mass, area, coefficients, user quantities)
#[derive(Debug, Clone, PartialEq)]
pub struct RealSubset {
    name: String,
    size: usize,
}

impl RealSubset {
    /// Create a named subset of `size` components
    ///
    /// The size is checked when the subset is registered with a broker.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

impl CoordinateSubset for RealSubset {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> usize {
        self.size
    }
}

/// Position vector (m)
#[derive(Debug, Clone, Copy, Default)]
pub struct CartesianPosition;

impl CoordinateSubset for CartesianPosition {
    fn name(&self) -> &str {
        CARTESIAN_POSITION
    }

    fn size(&self) -> usize {
        3
    }

    fn in_frame(
        &self,
        coordinates: &[f64],
        broker: &CoordinateBroker,
        transform: &Transform,
    ) -> Result<DVector<f64>> {
        let position = vector3(broker.extract(coordinates, CARTESIAN_POSITION)?);
        Ok(to_dvector(&transform.apply_to_position(&position)))
    }
}

/// Velocity vector (m/s)
#[derive(Debug, Clone, Copy, Default)]
pub struct CartesianVelocity;

impl CoordinateSubset for CartesianVelocity {
    fn name(&self) -> &str {
        CARTESIAN_VELOCITY
    }

    fn size(&self) -> usize {
        3
    }

    fn in_frame(
        &self,
        coordinates: &[f64],
        broker: &CoordinateBroker,
        transform: &Transform,
    ) -> Result<DVector<f64>> {
        let position = vector3(broker.extract(coordinates, CARTESIAN_POSITION)?);
        let velocity = vector3(broker.extract(coordinates, CARTESIAN_VELOCITY)?);
        Ok(to_dvector(&transform.apply_to_velocity(&position, &velocity)))
    }
}

/// Attitude quaternion, stored as (x, y, z, w)
///
/// The quaternion rotates reference-frame coordinates into body coordinates.
/// Values combine by composition, not by elementwise sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttitudeQuaternion;

impl AttitudeQuaternion {
    /// Read a unit quaternion from its stored (x, y, z, w) components
    pub fn from_components(components: &[f64]) -> UnitQuaternion<f64> {
        UnitQuaternion::from_quaternion(Quaternion::from_vector(Vector4::new(
            components[0],
            components[1],
            components[2],
            components[3],
        )))
    }

    /// Stored (x, y, z, w) components of a unit quaternion
    pub fn to_components(quaternion: &UnitQuaternion<f64>) -> DVector<f64> {
        DVector::from_column_slice(quaternion.coords.as_slice())
    }

    /// Attitude relative to the destination frame of `transform`
    fn rotate_reference(
        attitude: &UnitQuaternion<f64>,
        rotation: &Matrix3<f64>,
    ) -> UnitQuaternion<f64> {
        let reference_to_source =
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation.transpose()));
        attitude * reference_to_source
    }
}

impl CoordinateSubset for AttitudeQuaternion {
    fn name(&self) -> &str {
        ATTITUDE_QUATERNION
    }

    fn size(&self) -> usize {
        4
    }

    fn add(&self, lhs: &[f64], rhs: &[f64]) -> DVector<f64> {
        let composed = Self::from_components(lhs) * Self::from_components(rhs);
        Self::to_components(&composed)
    }

    fn subtract(&self, lhs: &[f64], rhs: &[f64]) -> DVector<f64> {
        let relative = Self::from_components(lhs) * Self::from_components(rhs).inverse();
        Self::to_components(&relative)
    }

    fn in_frame(
        &self,
        coordinates: &[f64],
        broker: &CoordinateBroker,
        transform: &Transform,
    ) -> Result<DVector<f64>> {
        let attitude = Self::from_components(broker.extract(coordinates, ATTITUDE_QUATERNION)?);
        Ok(Self::to_components(&Self::rotate_reference(
            &attitude,
            &transform.rotation,
        )))
    }
}

/// Angular velocity relative to the reference frame (rad/s)
///
/// Expressed in body axes when the layout also carries an attitude quaternion,
/// in reference-frame axes otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct AngularVelocity;

impl CoordinateSubset for AngularVelocity {
    fn name(&self) -> &str {
        ANGULAR_VELOCITY
    }

    fn size(&self) -> usize {
        3
    }

    fn in_frame(
        &self,
        coordinates: &[f64],
        broker: &CoordinateBroker,
        transform: &Transform,
    ) -> Result<DVector<f64>> {
        let rate = vector3(broker.extract(coordinates, ANGULAR_VELOCITY)?);
        if !broker.has_subset(ATTITUDE_QUATERNION) {
            return Ok(to_dvector(
                &(transform.apply_to_vector(&rate) - transform.angular_velocity),
            ));
        }

        let attitude = AttitudeQuaternion::from_components(
            broker.extract(coordinates, ATTITUDE_QUATERNION)?,
        );

        // Rate of the destination frame w.r.t. the source, expressed in body axes
        let attitude_in_target = AttitudeQuaternion::rotate_reference(&attitude, &transform.rotation);
        let frame_rate = attitude_in_target * transform.angular_velocity;

        Ok(to_dvector(&(rate - frame_rate)))
    }
}

/// Shared position subset
pub fn cartesian_position() -> SharedSubset {
    Arc::new(CartesianPosition)
}

/// Shared velocity subset
pub fn cartesian_velocity() -> SharedSubset {
    Arc::new(CartesianVelocity)
}

/// Shared attitude quaternion subset
pub fn attitude_quaternion() -> SharedSubset {
    Arc::new(AttitudeQuaternion)
}

/// Shared angular velocity subset
pub fn angular_velocity() -> SharedSubset {
    Arc::new(AngularVelocity)
}

/// Shared mass subset (kg)
pub fn mass() -> SharedSubset {
    Arc::new(RealSubset::new(MASS, 1))
}

/// Shared surface area subset (m²)
pub fn surface_area() -> SharedSubset {
    Arc::new(RealSubset::new(SURFACE_AREA, 1))
}

/// Shared drag coefficient subset
pub fn drag_coefficient() -> SharedSubset {
    Arc::new(RealSubset::new(DRAG_COEFFICIENT, 1))
}

/// Size a built-in subset name is bound to, `None` for user names
pub fn reserved_size(name: &str) -> Option<usize> {
    match name {
        CARTESIAN_POSITION | CARTESIAN_VELOCITY | ANGULAR_VELOCITY => Some(3),
        ATTITUDE_QUATERNION => Some(4),
        MASS | SURFACE_AREA | DRAG_COEFFICIENT => Some(1),
        _ => None,
    }
}

pub(crate) fn vector3(components: &[f64]) -> Vector3<f64> {
    Vector3::new(components[0], components[1], components[2])
}

pub(crate) fn to_dvector(vector: &Vector3<f64>) -> DVector<f64> {
    DVector::from_column_slice(vector.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_subset_elementwise() {
        let subset = RealSubset::new("BIAS", 2);
        assert_eq!(subset.add(&[1.0, 2.0], &[3.0, 4.0]).as_slice(), &[4.0, 6.0]);
        assert_eq!(subset.subtract(&[1.0, 2.0], &[3.0, 5.0]).as_slice(), &[-2.0, -3.0]);
    }

    #[test]
    fn test_reserved_sizes_match_builtins() {
        for subset in [
            cartesian_position(),
            cartesian_velocity(),
            attitude_quaternion(),
            angular_velocity(),
            mass(),
            surface_area(),
            drag_coefficient(),
        ] {
            assert_eq!(reserved_size(subset.name()), Some(subset.size()));
        }
        assert_eq!(reserved_size("BIAS"), None);
    }

    #[test]
    fn test_quaternion_subtract_then_add() {
        let subset = AttitudeQuaternion;
        let a = UnitQuaternion::from_euler_angles(0.1, -0.4, 1.2);
        let b = UnitQuaternion::from_euler_angles(-0.3, 0.2, 0.5);

        let a_components = AttitudeQuaternion::to_components(&a);
        let b_components = AttitudeQuaternion::to_components(&b);

        let difference = subset.subtract(a_components.as_slice(), b_components.as_slice());
        let restored = subset.add(difference.as_slice(), b_components.as_slice());

        let restored = AttitudeQuaternion::from_components(restored.as_slice());
        assert!(restored.angle_to(&a) < 1e-12);
    }

    #[test]
    fn test_angular_velocity_without_attitude_uses_reference_axes() {
        let broker = CoordinateBroker::from_subsets([angular_velocity()]).unwrap();
        let (s, c) = 0.4_f64.sin_cos();
        let rotation = Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0);

        // Spinning with the destination frame: no rate left relative to it
        let co_rotating = Transform::rotating(rotation, Vector3::new(0.0, 0.0, 7.0e-5));
        let rate = AngularVelocity.in_frame(&[0.0, 0.0, 7.0e-5], &broker, &co_rotating).unwrap();
        assert!(rate.norm() < 1e-18);

        let fixed = Transform::rotating(rotation, Vector3::zeros());
        let rate = AngularVelocity.in_frame(&[1.0e-3, 0.0, 0.0], &broker, &fixed).unwrap();
        assert!((rate[0] - c * 1.0e-3).abs() < 1e-15);
        assert!((rate[1] + s * 1.0e-3).abs() < 1e-15);
    }

    #[test]
    fn test_quaternion_component_order() {
        let identity = AttitudeQuaternion::to_components(&UnitQuaternion::identity());
        assert_eq!(identity.as_slice(), &[0.0, 0.0, 0.0, 1.0]);
    }
}
