//! Round-scoped lookup tables shared by every dispatch component, grounded on
//! `problemdata.py`'s `ProblemData` (factory/vehicle integer indices, distance
//! and travel-time matrices).
//!
//! `Metadata` is built once per round by [`crate::dispatch::bootstrap`] and then
//! shared (via `Rc`) by the `Plan`, the `EventEvaluator`, the `ConstructiveInserter`
//! and `LocalSearch` — none of them mutate it.

use std::collections::HashMap;

use crate::dispatch::error::DispatchError;
use crate::model::{FactoryId, FactoryMap, Map, VehicleId};

/// Dense distance/time matrices plus the factory_id/vehicle_id <-> integer index
/// maps every other dispatch component indexes through.
///
/// Factories and vehicles are assigned indices by sorting their ids
/// lexicographically, per spec.md §5 ("Deterministic integer indexing") —
/// this is what makes a round's output reproducible given the same input.
#[derive(Debug, Clone)]
pub struct Metadata {
    factory_ids: Vec<FactoryId>,
    factory_index: HashMap<FactoryId, usize>,
    dock_nums: Vec<u32>,
    vehicle_ids: Vec<VehicleId>,
    vehicle_index: HashMap<VehicleId, usize>,
    distance_mtx: Vec<Vec<f64>>,
    time_mtx: Vec<Vec<i64>>,
}

impl Metadata {
    pub fn build(
        factories: &FactoryMap,
        vehicle_ids: impl IntoIterator<Item = VehicleId>,
        distance_mtx: Vec<Vec<f64>>,
        time_mtx: Vec<Vec<i64>>,
    ) -> Result<Self, DispatchError> {
        let mut factory_ids: Vec<FactoryId> = factories.keys().cloned().collect();
        factory_ids.sort();

        let n = factory_ids.len();
        if distance_mtx.len() != n || time_mtx.len() != n {
            return Err(DispatchError::MalformedInput(format!(
                "distance/time matrix dimension {}x.. does not match {} factories",
                distance_mtx.len(),
                n
            )));
        }
        if distance_mtx.iter().any(|row| row.len() != n) || time_mtx.iter().any(|row| row.len() != n) {
            return Err(DispatchError::MalformedInput(
                "distance/time matrix is not square".to_string(),
            ));
        }

        let factory_index = factory_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let dock_nums = factory_ids
            .iter()
            .map(|id| factories.gets(id).dock_num)
            .collect();

        let mut vehicle_ids: Vec<VehicleId> = vehicle_ids.into_iter().collect();
        vehicle_ids.sort();
        let vehicle_index = vehicle_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        Ok(Self {
            factory_ids,
            factory_index,
            dock_nums,
            vehicle_ids,
            vehicle_index,
            distance_mtx,
            time_mtx,
        })
    }

    pub fn num_factories(&self) -> usize {
        self.factory_ids.len()
    }

    pub fn num_vehicles(&self) -> usize {
        self.vehicle_ids.len()
    }

    pub fn factory_id(&self, index: usize) -> &FactoryId {
        &self.factory_ids[index]
    }

    pub fn vehicle_id(&self, index: usize) -> &VehicleId {
        &self.vehicle_ids[index]
    }

    pub fn factory_index(&self, id: &FactoryId) -> Option<usize> {
        self.factory_index.get(id).copied()
    }

    pub fn vehicle_index(&self, id: &VehicleId) -> Option<usize> {
        self.vehicle_index.get(id).copied()
    }

    pub fn dock_num(&self, index: usize) -> u32 {
        self.dock_nums[index]
    }

    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distance_mtx[from][to]
    }

    pub fn travel_time(&self, from: usize, to: usize) -> i64 {
        self.time_mtx[from][to]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Factory;

    fn factories() -> FactoryMap {
        let mut map = FactoryMap::default();
        map.insert(
            FactoryId::new("f_b"),
            Factory {
                factory_id: FactoryId::new("f_b"),
                dock_num: 1,
            },
        );
        map.insert(
            FactoryId::new("f_a"),
            Factory {
                factory_id: FactoryId::new("f_a"),
                dock_num: 2,
            },
        );
        map
    }

    #[test]
    fn factories_indexed_lexicographically() {
        let meta = Metadata::build(
            &factories(),
            vec![VehicleId::new("v1")],
            vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            vec![vec![0, 10], vec![10, 0]],
        )
        .unwrap();
        assert_eq!(meta.factory_index(&FactoryId::new("f_a")), Some(0));
        assert_eq!(meta.factory_index(&FactoryId::new("f_b")), Some(1));
        assert_eq!(meta.factory_id(0), &FactoryId::new("f_a"));
    }

    #[test]
    fn mismatched_matrix_dimension_is_rejected() {
        let err = Metadata::build(&factories(), vec![VehicleId::new("v1")], vec![vec![0.0]], vec![vec![0]])
            .unwrap_err();
        assert!(matches!(err, DispatchError::MalformedInput(_)));
    }
}
