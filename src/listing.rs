//! Operator Listings
//!
//! Text rendering of the inventory for the command line.

use crate::domain::entities::Disk;
use crate::hardware::registry::Topology;

const UNITS: [&str; 6] = ["", "K", "M", "G", "T", "P"];

/// Human readable size with decimal units, e.g. `1.0T`
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 2000.0 {
            break;
        }
        value /= 1000.0;
        unit = next;
    }
    format!("{:.1}{}", value, unit)
}

/// Disks ordered by controller, enclosure index and slot
pub fn sorted_disks(topology: &Topology) -> Vec<&Disk> {
    let mut disks: Vec<&Disk> = topology.disks().collect();
    disks.sort_by_key(|d| (d.address(), d.serial.clone()));
    disks
}

/// `pool: group` pairs joined by ` / `
pub fn pool_summary(disk: &Disk) -> String {
    disk.pools
        .iter()
        .map(|(pool, group)| format!("{}: {}", pool, group))
        .collect::<Vec<_>>()
        .join(" / ")
}

/// One listing line: address, device, model, size, state, pools
pub fn disk_line(disk: &Disk, device_dir: &str) -> String {
    let device = disk.short_device(device_dir).unwrap_or("-");
    format!(
        "{}  {:>23}  {:>16}  {:>6}  {} {}",
        disk.address(),
        device,
        disk.model,
        human_size(disk.size_bytes()),
        disk.state,
        pool_summary(disk)
    )
    .trim_end()
    .to_string()
}

/// Full disk listing with the capacity footer
pub fn disk_listing(topology: &Topology, device_dir: &str) -> Vec<String> {
    let disks = sorted_disks(topology);
    let mut lines: Vec<String> = disks.iter().map(|d| disk_line(d, device_dir)).collect();
    lines.push(format!(
        "Drives : {}   Total Capacity : {}",
        disks.len(),
        human_size(topology.total_bytes())
    ));
    lines
}
