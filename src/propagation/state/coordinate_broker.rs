//! Layout registry mapping coordinate subsets onto a flat state vector

use std::collections::HashMap;
use std::fmt;

use nalgebra::DVector;

use super::coordinate_subset::{reserved_size, SharedSubset};
use crate::error::{Error, Result};

/// Ordered collection of distinct coordinate subsets
///
/// Each subset occupies a contiguous block of the full vector; offsets follow
/// insertion order. Brokers are shared between states through `Arc`, so a
/// layout is never modified once a state refers to it.
#[derive(Debug, Clone, Default)]
pub struct CoordinateBroker {
    subsets: Vec<SharedSubset>,
    layout: HashMap<String, (usize, usize)>,
    total_size: usize,
}

impl CoordinateBroker {
    /// Empty broker
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker holding `subsets` in the given order
    pub fn from_subsets(subsets: impl IntoIterator<Item = SharedSubset>) -> Result<Self> {
        let mut broker = Self::new();
        for subset in subsets {
            broker.add_subset(subset)?;
        }
        Ok(broker)
    }

    /// Append a subset and return its offset
    ///
    /// Empty subsets are rejected, and so are built-in names registered with
    /// a size other than their own.
    pub fn add_subset(&mut self, subset: SharedSubset) -> Result<usize> {
        let name = subset.name().to_string();
        if self.layout.contains_key(&name) {
            return Err(Error::DuplicateSubset(name));
        }

        let size = subset.size();
        if size == 0 {
            return Err(Error::InvalidArgument(format!("subset [{}] has no components", name)));
        }
        if let Some(expected) = reserved_size(&name).filter(|expected| *expected != size) {
            return Err(Error::IncompatibleLayout(format!(
                "[{}] must have {} components, got {}",
                name, expected, size
            )));
        }

        let offset = self.total_size;
        self.layout.insert(name, (offset, size));
        self.subsets.push(subset);
        self.total_size += size;

        Ok(offset)
    }

    /// Whether a subset with this name is registered
    pub fn has_subset(&self, name: &str) -> bool {
        self.layout.contains_key(name)
    }

    /// Number of components of the named subset
    pub fn size_of(&self, name: &str) -> Result<usize> {
        self.locate(name).map(|(_, size)| size)
    }

    /// Offset of the named subset within the full vector
    pub fn offset_of(&self, name: &str) -> Result<usize> {
        self.locate(name).map(|(offset, _)| offset)
    }

    /// Length of the full vector
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Number of registered subsets
    pub fn subset_count(&self) -> usize {
        self.subsets.len()
    }

    /// Registered subsets in layout order
    pub fn subsets(&self) -> &[SharedSubset] {
        &self.subsets
    }

    /// Registered subset with this name
    pub fn subset(&self, name: &str) -> Result<&SharedSubset> {
        self.subsets
            .iter()
            .find(|subset| subset.name() == name)
            .ok_or_else(|| Error::UnknownSubset(name.to_string()))
    }

    /// Slice of `coordinates` belonging to the named subset
    pub fn extract<'a>(&self, coordinates: &'a [f64], name: &str) -> Result<&'a [f64]> {
        let (offset, size) = self.locate(name)?;
        coordinates.get(offset..offset + size).ok_or_else(|| {
            Error::IncompatibleLayout(format!(
                "vector of length {} cannot hold [{}] at {}..{}",
                coordinates.len(),
                name,
                offset,
                offset + size
            ))
        })
    }

    /// Concatenation of the named subsets' slices, in the requested order
    pub fn extract_many(&self, coordinates: &[f64], names: &[&str]) -> Result<DVector<f64>> {
        let mut values = Vec::new();
        for name in names {
            values.extend_from_slice(self.extract(coordinates, name)?);
        }
        Ok(DVector::from_vec(values))
    }

    /// Whether both brokers hold the same subsets in the same order
    pub fn is_equivalent(&self, other: &CoordinateBroker) -> bool {
        self.subsets.len() == other.subsets.len()
            && self
                .subsets
                .iter()
                .zip(&other.subsets)
                .all(|(lhs, rhs)| lhs.name() == rhs.name())
    }

    /// Whether both brokers hold the same subsets, in any order
    pub fn has_same_subsets(&self, other: &CoordinateBroker) -> bool {
        self.subsets.len() == other.subsets.len()
            && self
                .subsets
                .iter()
                .all(|subset| other.has_subset(subset.name()))
    }

    fn locate(&self, name: &str) -> Result<(usize, usize)> {
        self.layout
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownSubset(name.to_string()))
    }
}

impl PartialEq for CoordinateBroker {
    fn eq(&self, other: &Self) -> bool {
        self.is_equivalent(other)
    }
}

impl fmt::Display for CoordinateBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.subsets.iter().map(|subset| subset.name()).collect();
        write!(f, "[{}] ({} components)", names.join(", "), self.total_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::propagation::state::coordinate_subset::{
        cartesian_position, cartesian_velocity, mass, RealSubset, CARTESIAN_POSITION,
        CARTESIAN_VELOCITY, MASS,
    };

    fn position_velocity_mass() -> CoordinateBroker {
        CoordinateBroker::from_subsets([cartesian_position(), cartesian_velocity(), mass()]).unwrap()
    }

    #[test]
    fn test_offsets_follow_insertion_order() {
        let broker = position_velocity_mass();

        assert_eq!(broker.total_size(), 7);
        assert_eq!(broker.offset_of(CARTESIAN_POSITION), Ok(0));
        assert_eq!(broker.offset_of(CARTESIAN_VELOCITY), Ok(3));
        assert_eq!(broker.offset_of(MASS), Ok(6));
        assert_eq!(broker.size_of(MASS), Ok(1));
    }

    #[test]
    fn test_duplicate_subset_rejected() {
        let mut broker = position_velocity_mass();
        assert_eq!(
            broker.add_subset(cartesian_velocity()),
            Err(Error::DuplicateSubset(CARTESIAN_VELOCITY.to_string()))
        );
        assert_eq!(broker.total_size(), 7);
    }

    #[test]
    fn test_empty_and_missized_subsets_rejected() {
        let mut broker = CoordinateBroker::new();
        assert!(matches!(
            broker.add_subset(Arc::new(RealSubset::new("EMPTY", 0))),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            broker.add_subset(Arc::new(RealSubset::new(CARTESIAN_POSITION, 1))),
            Err(Error::IncompatibleLayout(_))
        ));
        assert_eq!(broker.total_size(), 0);

        broker.add_subset(Arc::new(RealSubset::new("BIAS", 2))).unwrap();
        assert_eq!(broker.total_size(), 2);
    }

    #[test]
    fn test_unknown_subset() {
        let broker = CoordinateBroker::from_subsets([cartesian_position()]).unwrap();
        assert_eq!(
            broker.size_of(MASS),
            Err(Error::UnknownSubset(MASS.to_string()))
        );
        assert!(!broker.has_subset(MASS));
    }

    #[test]
    fn test_extract_and_extract_many() {
        let broker = position_velocity_mass();
        let coordinates = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 100.0];

        assert_eq!(broker.extract(&coordinates, CARTESIAN_VELOCITY).unwrap(), &[4.0, 5.0, 6.0]);

        let many = broker
            .extract_many(&coordinates, &[MASS, CARTESIAN_POSITION])
            .unwrap();
        assert_eq!(many.as_slice(), &[100.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_equivalence_depends_on_order() {
        let forward = position_velocity_mass();
        let reversed =
            CoordinateBroker::from_subsets([mass(), cartesian_velocity(), cartesian_position()])
                .unwrap();

        assert!(forward.is_equivalent(&position_velocity_mass()));
        assert!(!forward.is_equivalent(&reversed));
        assert!(forward.has_same_subsets(&reversed));
    }
}
