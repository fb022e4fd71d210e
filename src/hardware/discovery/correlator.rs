//! Discovery Correlator
//!
//! Runs the four discovery stages in their fixed order and joins their
//! results into one [`Topology`]:
//!
//! 1. controllers (`sas2ircu LIST`)
//! 2. enclosures and disks per controller (`sas2ircu <id> DISPLAY`)
//! 3. serial -> device path mapping (`prtconf -v`)
//! 4. pool membership (`zpool status`)
//!
//! The controller dump is the only source that creates disks. The two
//! later stages only enrich disks it already reported.

use super::builder::{build_controller, build_disk, build_enclosure, SerialNormalizer};
use super::{prtconf, sas2ircu, zpool};
use crate::config::DiskmapConfig;
use crate::domain::ports::ToolRunnerRef;
use crate::error::{Error, Result};
use crate::hardware::registry::Topology;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

// =============================================================================
// Discovery Report
// =============================================================================

/// Non-fatal findings of a discovery pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscoveryWarning {
    /// The device mapping names a serial the controllers did not report
    /// (the disk may have been pulled between tool runs)
    UnresolvedSerial { serial: String, device: String },
}

impl std::fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryWarning::UnresolvedSerial { serial, device } => write!(
                f,
                "serial {} ({}) reported by prtconf but not by sas2ircu (disk removed?)",
                serial, device
            ),
        }
    }
}

/// Summary of one discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub controllers: usize,
    pub enclosures: usize,
    pub disks: usize,
    /// Disks enriched with a device path
    pub mapped: usize,
    /// Pool leaves attached to a known disk
    pub pool_members: usize,
    /// Pool leaves naming no known disk
    pub pool_leaves_skipped: usize,
    pub warnings: Vec<DiscoveryWarning>,
}

// =============================================================================
// Correlator
// =============================================================================

fn partition_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<disk>.+d[0-9]+)s[0-9]+$").expect("partition grammar"))
}

fn tool_name(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Sequential join pipeline over the three sources
pub struct Correlator {
    runner: ToolRunnerRef,
    config: DiskmapConfig,
    normalizer: SerialNormalizer,
}

impl Correlator {
    pub fn new(runner: ToolRunnerRef, config: DiskmapConfig) -> Self {
        let normalizer = SerialNormalizer::new(config.serial_rules.clone());
        Self {
            runner,
            config,
            normalizer,
        }
    }

    pub fn config(&self) -> &DiskmapConfig {
        &self.config
    }

    /// Full discovery into a fresh graph
    pub async fn discover(&self) -> Result<(Topology, DiscoveryReport)> {
        self.discover_for(&[]).await
    }

    /// Full discovery, limiting stage 2 to `controllers` (all when empty)
    pub async fn discover_for(
        &self,
        controllers: &[u32],
    ) -> Result<(Topology, DiscoveryReport)> {
        let mut topology = Topology::new();
        let mut report = DiscoveryReport::default();

        self.discover_controllers(&mut topology).await?;
        self.discover_enclosures(&mut topology, controllers).await?;
        self.discover_mapping(&mut topology, &mut report).await?;
        self.discover_pools(&mut topology, &mut report).await?;

        report.controllers = topology.controller_count();
        report.enclosures = topology.enclosure_count();
        report.disks = topology.disk_count();

        info!(
            controllers = report.controllers,
            enclosures = report.enclosures,
            disks = report.disks,
            mapped = report.mapped,
            pool_members = report.pool_members,
            warnings = report.warnings.len(),
            "discovery complete"
        );
        Ok((topology, report))
    }

    // =========================================================================
    // Stage 1: Controllers
    // =========================================================================

    pub async fn discover_controllers(&self, topology: &mut Topology) -> Result<()> {
        let tool = tool_name(&self.config.tools.sas2ircu);
        let text = self.runner.run(&tool, &sas2ircu::list_args()).await?;
        self.apply_controllers(topology, &text);
        info!(count = topology.controller_count(), "controllers discovered");
        Ok(())
    }

    pub fn apply_controllers(&self, topology: &mut Topology, text: &str) {
        for record in sas2ircu::extract_controllers(text) {
            if let Some(controller) = build_controller(&record) {
                topology.insert_controller(controller);
            }
        }
    }

    // =========================================================================
    // Stage 2: Enclosures & Disks
    // =========================================================================

    /// Discover the enclosures and disks behind `controllers`, or behind
    /// every known controller when the slice is empty
    pub async fn discover_enclosures(
        &self,
        topology: &mut Topology,
        controllers: &[u32],
    ) -> Result<()> {
        let targets = if controllers.is_empty() {
            topology.controller_ids()
        } else {
            if let Some(&missing) = controllers
                .iter()
                .find(|id| topology.controller(**id).is_none())
            {
                return Err(Error::ControllerNotFound {
                    controller: missing,
                });
            }
            controllers.to_vec()
        };

        let tool = tool_name(&self.config.tools.sas2ircu);
        for controller in targets {
            let text = self
                .runner
                .run(&tool, &sas2ircu::display_args(controller))
                .await?;
            self.apply_display(topology, controller, &text);
        }

        info!(
            enclosures = topology.enclosure_count(),
            disks = topology.disk_count(),
            "enclosures and disks discovered"
        );
        Ok(())
    }

    pub fn apply_display(&self, topology: &mut Topology, controller: u32, text: &str) {
        let records = sas2ircu::extract_display(text);

        // Disks name their enclosure by the controller-local index
        let mut local: HashMap<u32, String> = HashMap::new();
        for record in &records.enclosures {
            if let Some(enclosure) = build_enclosure(record, controller) {
                local.insert(enclosure.index, enclosure.id.clone());
                topology.insert_enclosure(enclosure);
            }
        }

        for record in &records.disks {
            if let Some(disk) = build_disk(record, controller, &local, &self.normalizer) {
                topology.insert_disk(disk);
            }
        }
    }

    // =========================================================================
    // Stage 3: Device Mapping
    // =========================================================================

    pub async fn discover_mapping(
        &self,
        topology: &mut Topology,
        report: &mut DiscoveryReport,
    ) -> Result<()> {
        let tool = tool_name(&self.config.tools.prtconf);
        let text = self.runner.run(&tool, &prtconf::dump_args()).await?;
        self.apply_mapping(topology, &text, report);
        info!(mapped = report.mapped, "device paths correlated");
        Ok(())
    }

    pub fn apply_mapping(&self, topology: &mut Topology, text: &str, report: &mut DiscoveryReport) {
        for record in prtconf::extract_device_mapping(text) {
            let (Some(serial), Some(guid)) = (record.get("serial"), record.get("guid")) else {
                continue;
            };
            let serial = self.normalizer.normalize(serial);
            let device = self.config.device_path(guid);

            match topology.disk_id(&serial) {
                Some(id) => {
                    topology.attach_device(id, device);
                    report.mapped += 1;
                }
                None => {
                    let warning = DiscoveryWarning::UnresolvedSerial { serial, device };
                    warn!("{}", warning);
                    report.warnings.push(warning);
                }
            }
        }
    }

    // =========================================================================
    // Stage 4: Pool Membership
    // =========================================================================

    pub async fn discover_pools(
        &self,
        topology: &mut Topology,
        report: &mut DiscoveryReport,
    ) -> Result<()> {
        let tool = tool_name(&self.config.tools.zpool);
        let text = self.runner.run(&tool, &zpool::status_args()).await?;
        self.apply_pools(topology, &text, report);
        info!(members = report.pool_members, "pool membership correlated");
        Ok(())
    }

    pub fn apply_pools(&self, topology: &mut Topology, text: &str, report: &mut DiscoveryReport) {
        for record in zpool::extract_pools(text) {
            let (Some(pool), Some(group), Some(name)) =
                (record.get("pool"), record.get("group"), record.get("device"))
            else {
                continue;
            };
            let key = self.pool_device_key(name);

            match topology.disk_mut(&key) {
                Some(disk) => {
                    disk.pools.insert(pool.to_string(), group.to_string());
                    report.pool_members += 1;
                }
                None => {
                    debug!(pool, device = %key, "pool device not behind a known controller");
                    report.pool_leaves_skipped += 1;
                }
            }
        }
    }

    /// Device-path key for a pool leaf: partition suffix stripped, device
    /// directory prefixed
    pub fn pool_device_key(&self, name: &str) -> String {
        let name = partition_suffix()
            .captures(name)
            .and_then(|caps| caps.name("disk"))
            .map_or(name, |m| m.as_str());

        if name.starts_with(self.config.device_dir.as_str()) {
            name.to_string()
        } else {
            format!("{}{}", self.config.device_dir, name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ToolRunner;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Serves canned text keyed by the joined command line
    struct CannedRunner {
        outputs: HashMap<String, String>,
    }

    #[async_trait]
    impl ToolRunner for CannedRunner {
        async fn run(&self, program: &str, args: &[String]) -> Result<String> {
            let key = format!("{} {}", program, args.join(" "));
            self.outputs
                .get(&key)
                .cloned()
                .ok_or(Error::ToolNotFound { tool: key })
        }
    }

    const LIST: &str = "   0     SAS2008     1000h    72h   00h:03h:00h:00h      1000h     3020h\n";

    const DISPLAY: &str = "\
Device is a Hard disk
  Enclosure #                             : 0
  Slot #                                  : 3
  State                                   : Optimal (OPT)
  Size (in MB)/(in sectors)               : 1000000/1953525168
  Manufacturer                            : ATA
  Model Number                            : ST1000NM0011
  Firmware Revision                       : SN02
  Serial No                               : ABC123
  Protocol                                : SATA
  Drive Type                              : SATA_HDD
Device is a Hard disk
  Enclosure #                             : 0
  Slot #                                  : 4
  State                                   : Optimal (OPT)
  Size (in MB)/(in sectors)               : 1907729/3907029167
  Serial No                               : WDWMAY04224767
------------------------------------------------------------------------
Enclosure information
------------------------------------------------------------------------
  Enclosure#                              : 0
  Logical ID                              : 500003
  Numslots                                : 24
------------------------------------------------------------------------
";

    const PRTCONF: &str = "\
        disk, instance #1
                name='inquiry-serial-no' type=string items=1 dev=none
                    value='ABC123'
                name='client-guid' type=string items=1
                    value='7'
        disk, instance #2
                name='inquiry-serial-no' type=string items=1 dev=none
                    value='WD-WMAY04224767'
                name='client-guid' type=string items=1
                    value='50014ee2b0b5c3b0'
        disk, instance #3
                name='inquiry-serial-no' type=string items=1 dev=none
                    value='GONE42'
                name='client-guid' type=string items=1
                    value='5000c500deadbeef'
";

    const ZPOOL: &str = "  pool: tank
 state: ONLINE
config:

\tNAME                     STATE     READ WRITE CKSUM
\ttank                     ONLINE       0     0     0
\t  mirror-0               ONLINE       0     0     0
\t    c1t7d0               ONLINE       0     0     0
\t    c1t50014EE2B0B5C3B0d0s0  ONLINE   0     0     0
\t  logs
\t    c1t5000C500FFFFFFFFd0  ONLINE     0     0     0

errors: No known data errors
";

    fn runner(prtconf: &str) -> ToolRunnerRef {
        let outputs = HashMap::from([
            ("/usr/sbin/sas2ircu LIST".to_string(), LIST.to_string()),
            ("/usr/sbin/sas2ircu 0 DISPLAY".to_string(), DISPLAY.to_string()),
            ("/usr/sbin/prtconf -v".to_string(), prtconf.to_string()),
            ("/usr/sbin/zpool status".to_string(), ZPOOL.to_string()),
        ]);
        Arc::new(CannedRunner { outputs })
    }

    fn correlator(prtconf: &str) -> Correlator {
        Correlator::new(runner(prtconf), DiskmapConfig::default())
    }

    #[tokio::test]
    async fn test_full_discovery_joins_all_sources() {
        let (topology, report) = correlator(PRTCONF).discover().await.unwrap();

        assert_eq!(topology.controller_count(), 1);
        assert_eq!(topology.enclosure("500003").unwrap().controller, 0);
        assert_eq!(report.disks, 2);
        assert_eq!(report.mapped, 2);

        let disk = topology.disk("ABC123").unwrap();
        assert_eq!(disk.device.as_deref(), Some("/dev/rdsk/c1t7d0"));
        assert_eq!(disk.pools.get("tank").map(String::as_str), Some("mirror-0"));
        assert!(std::ptr::eq(disk, topology.disk("/dev/rdsk/c1t7d0").unwrap()));

        // WD- spelling from prtconf joins the sas2ircu serial; s0 suffix stripped
        let wd = topology.disk("/dev/rdsk/c1t50014EE2B0B5C3B0d0").unwrap();
        assert_eq!(wd.serial, "WDWMAY04224767");
        assert_eq!(wd.pools.get("tank").map(String::as_str), Some("mirror-0"));
    }

    #[tokio::test]
    async fn test_unresolved_serial_is_a_warning() {
        let (topology, report) = correlator(PRTCONF).discover().await.unwrap();

        assert_eq!(
            report.warnings,
            vec![DiscoveryWarning::UnresolvedSerial {
                serial: "GONE42".into(),
                device: "/dev/rdsk/c1t5000C500DEADBEEFd0".into(),
            }]
        );
        assert!(topology.disk("GONE42").is_none());
        // The log leaf names no known disk and creates nothing
        assert_eq!(report.pool_leaves_skipped, 1);
        assert_eq!(topology.disk_count(), 2);
    }

    #[tokio::test]
    async fn test_discovery_is_idempotent() {
        let correlator = correlator(PRTCONF);
        let (first, _) = correlator.discover().await.unwrap();
        let (second, _) = correlator.discover().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_mapping_keeps_disk() {
        let partial = PRTCONF
            .split("        disk, instance #2")
            .next()
            .unwrap()
            .to_string();
        let (topology, report) = correlator(&partial).discover().await.unwrap();

        let wd = topology.disk("WDWMAY04224767").unwrap();
        assert!(wd.device.is_none());
        assert!(wd.pools.is_empty());
        assert_eq!(report.mapped, 1);
        assert_eq!(topology.disk_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_tool_aborts_pass() {
        let outputs = HashMap::from([("/usr/sbin/sas2ircu LIST".to_string(), LIST.to_string())]);
        let correlator = Correlator::new(Arc::new(CannedRunner { outputs }), DiskmapConfig::default());

        let err = correlator.discover().await.unwrap_err();
        assert_matches!(err, Error::ToolNotFound { .. });
    }

    #[tokio::test]
    async fn test_unknown_controller_subset() {
        let err = correlator(PRTCONF)
            .discover_for(&[4])
            .await
            .unwrap_err();
        assert_matches!(err, Error::ControllerNotFound { controller: 4 });
    }

    #[test]
    fn test_pool_device_key() {
        let correlator = correlator(PRTCONF);
        assert_eq!(correlator.pool_device_key("c1t7d0"), "/dev/rdsk/c1t7d0");
        assert_eq!(correlator.pool_device_key("c1t7d0s0"), "/dev/rdsk/c1t7d0");
        assert_eq!(correlator.pool_device_key("/dev/rdsk/c1t7d0"), "/dev/rdsk/c1t7d0");
    }
}
