/// WiFi beacon sniffing exposed as a trigger/results scan facility.
///
/// The radio runs in promiscuous mode and hops channels. Every beacon or
/// probe response heard is parsed with the ieee80211 crate down to its
/// SSID. A "scan" is one sweep over [`WIFI_CHANNELS`]: `trigger_scan`
/// opens a sweep, SSIDs heard meanwhile are collected, and the channel hop
/// task closes it with [`SweepScanner::complete_sweep`], which publishes
/// the results and tells the driver whether to notify the pipeline.

use ieee80211::match_frames;
use ieee80211::mgmt_frame::{BeaconFrame, ProbeResponseFrame};

use crate::codec::{self, BeaconName};
use crate::pipeline::{FacilityError, ScanFacility, ScanResults};

/// Channels swept per scan: the three non-overlapping 2.4 GHz channels.
/// Card senders transmit on channel 1.
pub const WIFI_CHANNELS: &[u8] = &[1, 6, 11];

/// Default dwell time per channel in milliseconds.
/// 120ms ensures reliable beacon capture (beacons broadcast every ~100ms).
/// Full sweep: 3 channels × 120ms = 360ms, inside one scan interval.
pub const DEFAULT_DWELL_MS: u64 = 120;

/// Extract the SSID from a raw beacon or probe response frame.
///
/// Returns `None` for other frame types, hidden (empty) SSIDs and SSIDs
/// that are not valid UTF-8. Safe to call from ISR context (no
/// allocation, no blocking).
pub fn parse_beacon_ssid(frame: &[u8]) -> Option<BeaconName> {
    let ssid = match_frames! {
        frame,
        beacon = BeaconFrame<'_> => {
            beacon.body.ssid()
        }
        probe_resp = ProbeResponseFrame<'_> => {
            probe_resp.body.ssid()
        }
    }
    .ok()
    .flatten()?;

    if ssid.is_empty() {
        return None;
    }
    BeaconName::try_from(ssid).ok()
}

/// Sniffer-backed scan facility.
///
/// Shared between the sniffer callback (`record`), the channel hop task
/// (`complete_sweep`) and the pipeline (`ScanFacility`); the firmware keeps
/// it behind a critical-section mutex.
pub struct SweepScanner {
    radio_ready: bool,
    subscribed: bool,
    sweeping: bool,
    /// SSIDs heard during the open sweep
    heard: ScanResults,
    /// Results of the last completed sweep
    latest: ScanResults,
}

impl SweepScanner {
    pub const fn new() -> Self {
        Self {
            radio_ready: false,
            subscribed: false,
            sweeping: false,
            heard: ScanResults::new(),
            latest: ScanResults::new(),
        }
    }

    /// Mark the radio as usable. Until then subscribe and trigger fail
    /// with `Unavailable`. Taking the radio down abandons an open sweep.
    pub fn set_radio_ready(&mut self, ready: bool) {
        self.radio_ready = ready;
        if !ready {
            self.sweeping = false;
            self.heard.clear();
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeping
    }

    /// Record an SSID heard on air. Ignored outside a sweep; each SSID is
    /// kept once per sweep. When the buffer is full, card beacons displace
    /// other SSIDs.
    pub fn record(&mut self, ssid: &BeaconName) {
        if !self.sweeping || self.heard.contains(ssid) {
            return;
        }
        if self.heard.is_full() && codec::is_card_beacon(ssid) {
            if let Some(pos) = self.heard.iter().position(|h| !codec::is_card_beacon(h)) {
                self.heard.swap_remove(pos);
            }
        }
        if self.heard.push(ssid.clone()).is_err() {
            log::debug!("Sweep buffer full, dropping {:?}", ssid.as_str());
        }
    }

    /// Close the open sweep and publish its results.
    ///
    /// Returns true when a subscriber should be told results are
    /// available.
    pub fn complete_sweep(&mut self) -> bool {
        if !self.sweeping {
            return false;
        }
        self.sweeping = false;
        self.latest = core::mem::take(&mut self.heard);
        self.subscribed
    }
}

impl Default for SweepScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanFacility for SweepScanner {
    fn subscribe(&mut self) -> Result<(), FacilityError> {
        if !self.radio_ready {
            return Err(FacilityError::Unavailable);
        }
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<(), FacilityError> {
        if !self.subscribed {
            return Err(FacilityError::NotSubscribed);
        }
        self.subscribed = false;
        Ok(())
    }

    fn trigger_scan(&mut self) -> Result<(), FacilityError> {
        if !self.radio_ready {
            return Err(FacilityError::Unavailable);
        }
        if self.sweeping {
            return Err(FacilityError::Busy);
        }
        self.heard.clear();
        self.sweeping = true;
        Ok(())
    }

    fn current_results(&self) -> ScanResults {
        self.latest.clone()
    }
}
