//! Locate Indicators
//!
//! Switches slot locate LEDs through the controller utility. A batch is
//! applied one slot at a time; a failing slot is recorded and the batch
//! carries on.

use crate::domain::entities::{Disk, SlotAddress};
use crate::domain::ports::{IndicatorController, ToolRunnerRef};
use crate::error::{Error, Result};
use crate::hardware::discovery::sas2ircu::locate_args;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// =============================================================================
// Controller Utility Adapter
// =============================================================================

/// Drives locate LEDs with `sas2ircu <c> LOCATE <e>:<s> ON|OFF`
#[derive(Clone)]
pub struct Sas2IrcuIndicator {
    runner: ToolRunnerRef,
    tool: PathBuf,
}

impl Sas2IrcuIndicator {
    pub fn new(runner: ToolRunnerRef, tool: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            tool: tool.into(),
        }
    }
}

#[async_trait]
impl IndicatorController for Sas2IrcuIndicator {
    async fn set_locate(
        &self,
        controller: u32,
        enclosure_index: u32,
        slot: u32,
        on: bool,
    ) -> Result<()> {
        let args = locate_args(controller, enclosure_index, slot, on);
        self.runner
            .run(&self.tool.to_string_lossy(), &args)
            .await
            .map(|_| ())
            .map_err(|e| Error::IndicatorFailed {
                controller,
                enclosure_index,
                slot,
                reason: e.to_string(),
            })
    }
}

// =============================================================================
// Batch Application
// =============================================================================

/// One slot the indicator could not be switched on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorFailure {
    pub address: SlotAddress,
    pub serial: String,
    pub reason: String,
}

/// Outcome of applying an indicator state to a batch of disks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorReport {
    pub applied: Vec<SlotAddress>,
    pub failed: Vec<IndicatorFailure>,
    /// Set when the batch stopped before reaching every disk
    pub cancelled: bool,
}

impl IndicatorReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    fn absorb(&mut self, other: IndicatorReport) {
        self.applied.extend(other.applied);
        self.failed.extend(other.failed);
        self.cancelled |= other.cancelled;
    }
}

/// Switch every disk's locate indicator to `on`, in order.
///
/// Cancellation is checked before each disk; disks already switched stay
/// switched.
pub async fn apply_indicator(
    indicator: &dyn IndicatorController,
    disks: &[&Disk],
    on: bool,
    cancel: Option<&CancellationToken>,
) -> IndicatorReport {
    let mut report = IndicatorReport::default();
    let state = if on { "on" } else { "off" };

    for (done, disk) in disks.iter().enumerate() {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            warn!(done, total = disks.len(), "indicator batch cancelled");
            report.cancelled = true;
            break;
        }

        let address = disk.address();
        match indicator
            .set_locate(address.controller, address.enclosure_index, address.slot, on)
            .await
        {
            Ok(()) => {
                debug!(%address, serial = %disk.serial, state, "locate indicator set");
                report.applied.push(address);
            }
            Err(e) => {
                warn!(%address, serial = %disk.serial, error = %e, "locate indicator failed");
                report.failed.push(IndicatorFailure {
                    address,
                    serial: disk.serial.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        state,
        applied = report.applied.len(),
        failed = report.failed.len(),
        cancelled = report.cancelled,
        "indicator batch finished"
    );
    report
}

/// Draw a glyph on an enclosure: every slot off, then the glyph's slots on
pub async fn draw_glyph(
    indicator: &dyn IndicatorController,
    enclosure_disks: &[&Disk],
    glyph_disks: &[&Disk],
    cancel: Option<&CancellationToken>,
) -> IndicatorReport {
    let mut report = apply_indicator(indicator, enclosure_disks, false, cancel).await;
    if report.cancelled {
        return report;
    }
    report.absorb(apply_indicator(indicator, glyph_disks, true, cancel).await);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ToolRunner;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    fn disk(serial: &str, slot: u32) -> Disk {
        Disk {
            serial: serial.into(),
            controller: 0,
            enclosure: "500605b0:0272b8f0".into(),
            enclosure_index: 1,
            slot,
            state: "Optimal (OPT)".into(),
            size_mb: 1000,
            size_sectors: 2_048_000,
            manufacturer: "ATA".into(),
            model: "ST1000NM0011".into(),
            firmware: "SN02".into(),
            protocol: "SATA".into(),
            drive_type: "SATA_HDD".into(),
            device: None,
            pools: BTreeMap::new(),
        }
    }

    /// Records every call; slots listed in `broken` fail
    #[derive(Default)]
    struct FakeIndicator {
        calls: Mutex<Vec<(u32, bool)>>,
        broken: Vec<u32>,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    #[async_trait]
    impl IndicatorController for FakeIndicator {
        async fn set_locate(&self, c: u32, e: u32, slot: u32, on: bool) -> Result<()> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((slot, on));
            if let Some((n, token)) = &self.cancel_after {
                if calls.len() == *n {
                    token.cancel();
                }
            }
            if self.broken.contains(&slot) {
                return Err(Error::IndicatorFailed {
                    controller: c,
                    enclosure_index: e,
                    slot,
                    reason: "no response".into(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_batch() {
        let disks = [disk("A", 0), disk("B", 1), disk("C", 2)];
        let refs: Vec<&Disk> = disks.iter().collect();
        let fake = FakeIndicator {
            broken: vec![1],
            ..Default::default()
        };

        let report = apply_indicator(&fake, &refs, true, None).await;

        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].serial, "B");
        assert!(!report.is_clean());
        assert_eq!(fake.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_cancellation_between_disks() {
        let disks = [disk("A", 0), disk("B", 1), disk("C", 2)];
        let refs: Vec<&Disk> = disks.iter().collect();
        let token = CancellationToken::new();
        let fake = FakeIndicator {
            cancel_after: Some((1, token.clone())),
            ..Default::default()
        };

        let report = apply_indicator(&fake, &refs, true, Some(&token)).await;

        assert!(report.cancelled);
        assert_eq!(report.applied.len(), 1);
        assert_eq!(fake.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_draw_glyph_clears_then_lights() {
        let disks = [disk("A", 0), disk("B", 2), disk("C", 4)];
        let all: Vec<&Disk> = disks.iter().collect();
        let glyph: Vec<&Disk> = vec![&disks[0], &disks[2]];
        let fake = FakeIndicator::default();

        let report = draw_glyph(&fake, &all, &glyph, None).await;

        assert!(report.is_clean());
        assert_eq!(
            *fake.calls.lock().unwrap(),
            vec![(0, false), (2, false), (4, false), (0, true), (4, true)]
        );
    }

    struct RecordingRunner {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl ToolRunner for RecordingRunner {
        async fn run(&self, program: &str, args: &[String]) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{} {}", program, args.join(" ")));
            if self.fail {
                return Err(Error::ToolFailed {
                    tool: program.into(),
                    reason: "exit status: 1".into(),
                });
            }
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_sas2ircu_locate_invocation() {
        let runner = Arc::new(RecordingRunner {
            seen: Mutex::new(Vec::new()),
            fail: false,
        });
        let indicator = Sas2IrcuIndicator::new(runner.clone(), "/usr/sbin/sas2ircu");

        indicator.set_locate(0, 2, 7, true).await.unwrap();
        indicator.set_locate(0, 2, 7, false).await.unwrap();

        assert_eq!(
            *runner.seen.lock().unwrap(),
            vec![
                "/usr/sbin/sas2ircu 0 LOCATE 2:7 ON".to_string(),
                "/usr/sbin/sas2ircu 0 LOCATE 2:7 OFF".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_sas2ircu_failure_names_slot() {
        let runner = Arc::new(RecordingRunner {
            seen: Mutex::new(Vec::new()),
            fail: true,
        });
        let indicator = Sas2IrcuIndicator::new(runner, "/usr/sbin/sas2ircu");

        let err = indicator.set_locate(1, 3, 9, true).await.unwrap_err();
        assert!(matches!(
            err,
            Error::IndicatorFailed { controller: 1, enclosure_index: 3, slot: 9, .. }
        ));
    }
}
