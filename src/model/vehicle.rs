use serde::{Deserialize, Serialize};

use crate::define_map;

use super::{
    ids::{FactoryId, ItemId, VehicleId},
    visit::Visit,
};

/// Per-vehicle fleet-state record, per spec.md §3.
///
/// `carrying_items` is bottom-first (the item loaded earliest is at index 0),
/// matching the stack semantics the LIFO constraint checker expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub vehicle_id: VehicleId,
    pub capacity: f64,
    pub current_factory: Option<FactoryId>,
    pub leave_time_at_current_factory: i64,
    pub gps_update_time: i64,
    pub destination: Option<Visit>,
    #[serde(default)]
    pub carrying_items: Vec<ItemId>,
    #[serde(default)]
    pub planned_route: Vec<Visit>,
}

impl Vehicle {
    pub fn carried_demand(&self, demand_of: impl Fn(&ItemId) -> f64) -> f64 {
        self.carrying_items.iter().map(demand_of).sum()
    }
}

define_map!(VehicleId, Vehicle, VehicleMap);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carried_demand_sums_over_stack() {
        let v = Vehicle {
            vehicle_id: VehicleId::new("v1"),
            capacity: 10.0,
            current_factory: Some(FactoryId::new("f1")),
            leave_time_at_current_factory: 0,
            gps_update_time: 0,
            destination: None,
            carrying_items: vec![ItemId::new("i1"), ItemId::new("i2")],
            planned_route: vec![],
        };
        let demand = v.carried_demand(|id| if id.as_str() == "i1" { 2.0 } else { 3.0 });
        assert_eq!(demand, 5.0);
    }
}
