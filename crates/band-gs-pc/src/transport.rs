//! Tracing bus transport for bring-up without hardware.
//!
//! Stands in for the DMA bus: accepts every transfer immediately, counts
//! traffic, and logs it at trace level. Useful for validating frame
//! submission and band cadence before the real transport exists.

use band_gs_hal::BusConnector;

/// Records all bus traffic; always clear to send.
pub struct TraceBus {
    bytes_written: u64,
    transfers: u64,
    bands_started: u64,
    current_band: u32,
}

impl TraceBus {
    pub fn new() -> Self {
        Self {
            bytes_written: 0,
            transfers: 0,
            bands_started: 0,
            current_band: 0,
        }
    }

    /// Total payload bytes handed to the bus.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Number of `write_data` calls.
    pub fn transfers(&self) -> u64 {
        self.transfers
    }

    /// Number of band announcements.
    pub fn bands_started(&self) -> u64 {
        self.bands_started
    }
}

impl Default for TraceBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusConnector for TraceBus {
    fn clear_to_send(&mut self) -> bool {
        true
    }

    fn write_data(&mut self, data: &[u8]) {
        self.bytes_written += data.len() as u64;
        self.transfers += 1;
        log::trace!("band {}: {} bytes", self.current_band, data.len());
    }

    fn start_color_buffer_transfer(&mut self, band_index: u32) {
        self.current_band = band_index;
        self.bands_started += 1;
        log::trace!("start band {band_index}");
    }
}
