//! CLI entry point for one dispatch round.
//!
//! This binary is the "external collaborator" spec.md §1 explicitly places out
//! of scope (JSON ingestion/emission, CLI plumbing, persistence of the flag file
//! across rounds) — it exists only so the dispatch core in `dpdp_dispatch_core::dispatch`
//! is runnable end to end, the way the teacher's own `main.rs` drove its
//! simulator harness.
//!
//! Usage: `dpdp_dispatch_core <round-directory>`, reading
//! `factory_info.json`, `vehicle_infos.json`, `unallocated_order_items.json`,
//! `ongoing_order_items.json`, `distance_mtx.json`, `time_mtx.json` and
//! `first_iteration_flag` from the directory, and writing `destination.json` /
//! `planned_route.json` back into it — mirroring
//! `algorithm_best_insert.py::__read_input_json`/`__output_json`'s file layout.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use dpdp_dispatch_core::config::Config;
use dpdp_dispatch_core::dispatch::serialize::VehicleOutput;
use dpdp_dispatch_core::dispatch::{self, RoundInput};
use dpdp_dispatch_core::model::{Factory, FactoryMap, Map, OrderItem, OrderItemMap, Vehicle, VehicleId, VehicleMap};

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn read_factories(path: &Path) -> Result<FactoryMap> {
    let list: Vec<Factory> = read_json(path)?;
    let mut map = FactoryMap::default();
    for factory in list {
        map.insert(factory.factory_id.clone(), factory);
    }
    Ok(map)
}

fn read_vehicles(path: &Path) -> Result<VehicleMap> {
    let list: Vec<Vehicle> = read_json(path)?;
    let mut map = VehicleMap::default();
    for vehicle in list {
        map.insert(vehicle.vehicle_id.clone(), vehicle);
    }
    Ok(map)
}

fn read_order_items(path: &Path) -> Result<OrderItemMap> {
    let list: Vec<OrderItem> = read_json(path)?;
    let mut map = OrderItemMap::default();
    for item in list {
        map.insert(item.item_id.clone(), item);
    }
    Ok(map)
}

fn read_first_iteration_flag(path: &Path) -> Result<bool> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(raw.trim() == "1")
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(path, raw).with_context(|| format!("writing {}", path.display()))
}

fn run_round_dir(dir: &Path) -> Result<()> {
    let flag_path = dir.join("first_iteration_flag");
    let first_iteration_flag = read_first_iteration_flag(&flag_path)?;

    let input = RoundInput {
        factories: read_factories(&dir.join("factory_info.json"))?,
        vehicles: read_vehicles(&dir.join("vehicle_infos.json"))?,
        unallocated_order_items: read_order_items(&dir.join("unallocated_order_items.json"))?,
        ongoing_order_items: read_order_items(&dir.join("ongoing_order_items.json"))?,
        distance_mtx: read_json(&dir.join("distance_mtx.json"))?,
        time_mtx: read_json(&dir.join("time_mtx.json"))?,
        first_iteration_flag,
    };

    let config = Config::default();
    let output: BTreeMap<VehicleId, VehicleOutput> = dispatch::run_round_or_empty(input, &config);

    let destinations: BTreeMap<&VehicleId, &Option<_>> = output.iter().map(|(id, o)| (id, &o.destination)).collect();
    let planned_routes: BTreeMap<&VehicleId, &Vec<_>> = output.iter().map(|(id, o)| (id, &o.planned_route)).collect();
    write_json(&dir.join("destination.json"), &destinations)?;
    write_json(&dir.join("planned_route.json"), &planned_routes)?;

    // toggle the flag, per algorithm_best_insert.py::__read_input_json.
    fs::write(&flag_path, "0")?;

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    run_round_dir(&dir)
}
