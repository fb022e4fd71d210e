//! prtconf Extractor
//!
//! The verbose device tree dump spreads each disk's properties over many
//! lines. The dump is collapsed into one logical record per `disk,
//! instance` node, then the inquiry serial and the client GUID are pulled
//! out of each node.

use super::record::Record;
use regex::Regex;
use std::sync::OnceLock;
use tracing::trace;

/// Verbose flag for the property dump
pub const VERBOSE_FLAG: &str = "-v";

/// Marker that starts a disk node in the dump
const DISK_NODE_MARKER: &str = "disk, instance";

pub fn dump_args() -> Vec<String> {
    vec![VERBOSE_FLAG.to_string()]
}

fn serial_property() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"name='inquiry-serial-no' type=string items=1(?: dev=\S+)?\s*value='(?P<serial>[^']+)'",
        )
        .expect("serial property grammar")
    })
}

fn guid_property() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"name='client-guid' type=string items=1(?: dev=\S+)?\s*value='(?P<guid>[^']+)'",
        )
        .expect("guid property grammar")
    })
}

/// One `{serial, guid}` record per disk node carrying both properties.
/// Values are upper-cased; the serial is otherwise left as reported.
pub fn extract_device_mapping(text: &str) -> Vec<Record> {
    let collapsed = text.replace('\n', "");

    collapsed
        .split(DISK_NODE_MARKER)
        .skip(1)
        .filter_map(|node| {
            let serial = serial_property().captures(node)?;
            let Some(guid) = guid_property().captures(node) else {
                trace!(serial = &serial["serial"], "disk node without client-guid");
                return None;
            };
            Some(
                Record::new()
                    .with("serial", &serial["serial"].to_uppercase())
                    .with("guid", &guid["guid"].to_uppercase()),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
System Configuration:  Oracle Corporation  i86pc
    scsi_vhci, instance #0
        disk, instance #3
            Driver properties:
                name='inquiry-serial-no' type=string items=1 dev=none
                    value='WD-WMAY04224767'
                name='inquiry-product-id' type=string items=1 dev=none
                    value='WDC WD2003FYYS-0'
            Paths from multipath bus adapters:
                name='client-guid' type=string items=1
                    value='50014ee2b0b5c3b0'
        disk, instance #4
            Driver properties:
                name='inquiry-serial-no' type=string items=1 dev=none
                    value='9XG3ABCD'
        disk, instance #5
            Driver properties:
                name='inquiry-serial-no' type=string items=1 dev=none
                    value='z1z2z3'
                name='client-guid' type=string items=1
                    value='5000c500a1b2c3d4'
";

    #[test]
    fn test_extract_pairs_with_both_fields() {
        let records = extract_device_mapping(DUMP);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].get("serial"), Some("WD-WMAY04224767"));
        assert_eq!(records[0].get("guid"), Some("50014EE2B0B5C3B0"));
        assert_eq!(records[1].get("serial"), Some("Z1Z2Z3"));
        assert_eq!(records[1].get("guid"), Some("5000C500A1B2C3D4"));
    }

    #[test]
    fn test_text_before_first_disk_is_ignored() {
        let dump = "name='client-guid' type=string items=1 value='dead'\n";
        assert!(extract_device_mapping(dump).is_empty());
    }
}
