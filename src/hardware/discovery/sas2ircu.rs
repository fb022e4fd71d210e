//! sas2ircu Extractors
//!
//! Parses the output of the LSI SAS2 controller utility: `LIST` enumerates
//! controllers, `<id> DISPLAY` dumps the enclosures and devices behind one
//! controller. Both grammars are best-effort; lines or blocks that do not
//! fit are dropped.

use super::record::Record;
use regex::Regex;
use std::sync::OnceLock;
use tracing::trace;

// =============================================================================
// Commands
// =============================================================================

/// Verb enumerating controllers
pub const LIST_VERB: &str = "LIST";
/// Verb dumping a controller's enclosures and devices
pub const DISPLAY_VERB: &str = "DISPLAY";
/// Verb driving a slot's locate indicator
pub const LOCATE_VERB: &str = "LOCATE";

/// Arguments for the controller listing
pub fn list_args() -> Vec<String> {
    vec![LIST_VERB.to_string()]
}

/// Arguments for one controller's detail dump
pub fn display_args(controller: u32) -> Vec<String> {
    vec![controller.to_string(), DISPLAY_VERB.to_string()]
}

/// Arguments for a locate command, e.g. `0 LOCATE 2:5 ON`
pub fn locate_args(controller: u32, enclosure_index: u32, slot: u32, on: bool) -> Vec<String> {
    vec![
        controller.to_string(),
        LOCATE_VERB.to_string(),
        format!("{}:{}", enclosure_index, slot),
        if on { "ON" } else { "OFF" }.to_string(),
    ]
}

// =============================================================================
// Grammars
// =============================================================================

fn controller_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?P<id>[0-9]+) +(?P<adapter_type>\S(?:.*\S)?) +(?P<vendor_id>\S+) +(?P<device_id>\S+) +(?P<pci_address>\S*:\S*) +(?P<subsys_vendor_id>\S+) +(?P<subsys_device_id>\S+)\s*$",
        )
        .expect("controller grammar")
    })
}

fn key_value_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?P<key>[^:]+?)\s*:\s*(?P<value>.*?)\s*$").expect("key/value grammar")
    })
}

fn device_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*Device is an? (?P<kind>.+?)\s*$").expect("device grammar"))
}

fn size_value() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<size_mb>[0-9]+)\s*/\s*(?P<size_sectors>[0-9]+)$").expect("size grammar")
    })
}

// =============================================================================
// Controller Listing
// =============================================================================

/// One record per controller line of `sas2ircu LIST`
pub fn extract_controllers(text: &str) -> Vec<Record> {
    let re = controller_line();
    text.lines()
        .filter_map(|line| match re.captures(line) {
            Some(caps) => Some(Record::from_captures(re, &caps)),
            None => {
                trace!(line, "skipping non-controller line");
                None
            }
        })
        .collect()
}

// =============================================================================
// Controller Display
// =============================================================================

/// Enclosure and disk records of one `sas2ircu <id> DISPLAY` dump
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayRecords {
    /// Fields: `index`, `id`, `slot_count`
    pub enclosures: Vec<Record>,
    /// Fields: `enclosure_index`, `slot`, `state`, `size_mb`, `size_sectors`,
    /// `manufacturer`, `model`, `firmware`, `serial`, `protocol`, `drive_type`
    pub disks: Vec<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Enclosure,
    HardDisk,
    OtherDevice,
}

/// Maps a dump key to its record field
fn field_for(kind: BlockKind, key: &str) -> Option<&'static str> {
    match (kind, key) {
        (BlockKind::Enclosure, "Logical ID") => Some("id"),
        (BlockKind::Enclosure, "Numslots") => Some("slot_count"),
        (BlockKind::HardDisk, "Enclosure #") => Some("enclosure_index"),
        (BlockKind::HardDisk, "Slot #") => Some("slot"),
        (BlockKind::HardDisk, "State") => Some("state"),
        (BlockKind::HardDisk, "Manufacturer") => Some("manufacturer"),
        (BlockKind::HardDisk, "Model Number") => Some("model"),
        (BlockKind::HardDisk, "Firmware Revision") => Some("firmware"),
        (BlockKind::HardDisk, "Serial No") => Some("serial"),
        (BlockKind::HardDisk, "Protocol") => Some("protocol"),
        (BlockKind::HardDisk, "Drive Type") => Some("drive_type"),
        _ => None,
    }
}

impl DisplayRecords {
    fn flush(&mut self, block: Option<(BlockKind, Record)>) {
        match block {
            Some((BlockKind::Enclosure, record)) => {
                if record.contains("index") && record.contains("id") {
                    self.enclosures.push(record);
                } else {
                    trace!(?record, "dropping incomplete enclosure block");
                }
            }
            Some((BlockKind::HardDisk, record)) => {
                if record.contains("size_mb") && record.contains("size_sectors") {
                    self.disks.push(record);
                } else {
                    trace!(?record, "dropping hard disk block without capacity");
                }
            }
            Some((BlockKind::OtherDevice, _)) | None => {}
        }
    }
}

/// Fold the dump's `key : value` lines into enclosure and hard disk blocks.
///
/// `Enclosure#` opens an enclosure block and `Device is a <kind>` opens a
/// device block; a separator line closes whatever is open. Keys the grammar
/// does not know about are ignored.
pub fn extract_display(text: &str) -> DisplayRecords {
    let mut out = DisplayRecords::default();
    let mut current: Option<(BlockKind, Record)> = None;

    for line in text.lines() {
        let trimmed = line.trim();

        if !trimmed.is_empty() && trimmed.chars().all(|c| c == '-') {
            out.flush(current.take());
            continue;
        }

        if let Some(caps) = device_header().captures(line) {
            out.flush(current.take());
            let kind = if caps["kind"].eq_ignore_ascii_case("hard disk") {
                BlockKind::HardDisk
            } else {
                BlockKind::OtherDevice
            };
            current = Some((kind, Record::new()));
            continue;
        }

        let Some(caps) = key_value_line().captures(line) else {
            continue;
        };
        let key = caps.name("key").map_or("", |m| m.as_str());
        let value = caps.name("value").map_or("", |m| m.as_str());

        if key == "Enclosure#" {
            out.flush(current.take());
            current = Some((BlockKind::Enclosure, Record::new().with("index", value)));
            continue;
        }

        let Some((kind, record)) = current.as_mut() else {
            continue;
        };

        if *kind == BlockKind::HardDisk && key.starts_with("Size (in MB)") {
            match size_value().captures(value) {
                Some(size) => {
                    record.insert("size_mb", &size["size_mb"]);
                    record.insert("size_sectors", &size["size_sectors"]);
                }
                None => trace!(value, "unparseable capacity"),
            }
            continue;
        }

        if let Some(field) = field_for(*kind, key) {
            record.insert(field, value);
        }
    }
    out.flush(current.take());

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "\
LSI Corporation SAS2 IR Configuration Utility.
Version 5.00.00.00 (2010.02.09)
Copyright (c) 2009 LSI Corporation. All rights reserved.


         Adapter      Vendor  Device                       SubSys  SubSys
 Index    Type          ID      ID    Pci Address          Ven ID  Dev ID
 -----  ------------  ------  ------  -----------------    ------  ------
   0     SAS2008     1000h    72h   00h:03h:00h:00h      1000h     3020h
   1     SAS2008     1000h    72h   00h:04h:00h:00h      1000h     3020h
SAS2IRCU: Utility Completed Successfully.
";

    const DISPLAY: &str = "\
------------------------------------------------------------------------
Physical device information
------------------------------------------------------------------------
Initiator at ID #0

Device is a Hard disk
  Enclosure #                             : 2
  Slot #                                  : 0
  SAS Address                             : 5000c50-0-1a2b-3c4d
  State                                   : Ready (RDY)
  Size (in MB)/(in sectors)               : 1907729/3907029167
  Manufacturer                            : ATA
  Model Number                            : WDC WD2003FYYS-0
  Firmware Revision                       : 1D01
  Serial No                               : WDWMAY04224767
  GUID                                    : 50014ee2b0b5c3b0
  Protocol                                : SATA
  Drive Type                              : SATA_HDD

Device is a Enclosure services device
  Enclosure #                             : 2
  Slot #                                  : 24
  State                                   : Standby (SBY)

Device is a Hard disk
  Enclosure #                             : 2
  Slot #                                  : 1
  State                                   : Ready (RDY)
  Size (in MB)/(in sectors)               : unknown
  Serial No                               : BROKEN
------------------------------------------------------------------------
Enclosure information
------------------------------------------------------------------------
  Enclosure#                              : 1
  Logical ID                              : 500605B0:0272B8F0
  Numslots                                : 8
  StartSlot                               : 0
  Enclosure#                              : 2
  Logical ID                              : 50030480:00F1D87F
  Numslots                                : 28
  StartSlot                               : 0
------------------------------------------------------------------------
SAS2IRCU: Command DISPLAY Completed Successfully.
";

    #[test]
    fn test_extract_controllers() {
        let records = extract_controllers(LIST);
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.get("id"), Some("0"));
        assert_eq!(first.get("adapter_type"), Some("SAS2008"));
        assert_eq!(first.get("vendor_id"), Some("1000h"));
        assert_eq!(first.get("device_id"), Some("72h"));
        assert_eq!(first.get("pci_address"), Some("00h:03h:00h:00h"));
        assert_eq!(first.get("subsys_vendor_id"), Some("1000h"));
        assert_eq!(first.get("subsys_device_id"), Some("3020h"));
        assert_eq!(records[1].get("pci_address"), Some("00h:04h:00h:00h"));
    }

    #[test]
    fn test_extract_controllers_tolerates_garbage() {
        assert!(extract_controllers("").is_empty());
        assert!(extract_controllers("SAS2IRCU: No Controllers Found.\n").is_empty());
    }

    #[test]
    fn test_extract_display_enclosures() {
        let records = extract_display(DISPLAY);
        assert_eq!(records.enclosures.len(), 2);

        let second = &records.enclosures[1];
        assert_eq!(second.get("index"), Some("2"));
        assert_eq!(second.get("id"), Some("50030480:00F1D87F"));
        assert_eq!(second.get("slot_count"), Some("28"));
    }

    #[test]
    fn test_extract_display_keeps_only_complete_hard_disks() {
        let records = extract_display(DISPLAY);
        assert_eq!(records.disks.len(), 1);

        let disk = &records.disks[0];
        assert_eq!(disk.get("enclosure_index"), Some("2"));
        assert_eq!(disk.get("slot"), Some("0"));
        assert_eq!(disk.get("state"), Some("Ready (RDY)"));
        assert_eq!(disk.get("size_mb"), Some("1907729"));
        assert_eq!(disk.get("size_sectors"), Some("3907029167"));
        assert_eq!(disk.get("model"), Some("WDC WD2003FYYS-0"));
        assert_eq!(disk.get("serial"), Some("WDWMAY04224767"));
        assert_eq!(disk.get("drive_type"), Some("SATA_HDD"));
    }

    #[test]
    fn test_locate_args() {
        assert_eq!(locate_args(0, 2, 5, true), vec!["0", "LOCATE", "2:5", "ON"]);
        assert_eq!(locate_args(1, 0, 3, false), vec!["1", "LOCATE", "0:3", "OFF"]);
    }
}
