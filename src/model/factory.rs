use serde::{Deserialize, Serialize};

use crate::define_map;

use super::ids::FactoryId;

/// Immutable record for one factory, per spec.md §3.
///
/// The integer index assigned by [`crate::dispatch::metadata::Metadata`] (sorting
/// `factory_id` lexicographically) is what the dispatch core actually indexes by;
/// `Factory` itself only carries the boundary-visible fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factory {
    pub factory_id: FactoryId,
    pub dock_num: u32,
}

define_map!(FactoryId, Factory, FactoryMap);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dock_num_is_carried_through() {
        let f = Factory {
            factory_id: FactoryId::new("f1"),
            dock_num: 2,
        };
        assert_eq!(f.dock_num, 2);
    }
}
