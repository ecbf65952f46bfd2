#![no_std]

/// Abstracts the DMA-style bus between the host and the rasterizer hardware.
///
/// The device consumes at most one transfer buffer (2048 bytes) at a time and
/// signals readiness through a clear-to-send line. Implementations may
/// complete `write_data` asynchronously, but a transfer must have fully
/// drained before `clear_to_send` reports true again.
pub trait BusConnector {
    /// Non-blocking readiness poll. True when a new `write_data` may start.
    fn clear_to_send(&mut self) -> bool;

    /// Hand `data` to the bus. A texture chunk is exactly 2048 bytes; a
    /// display-list flush is the list's current size.
    fn write_data(&mut self, data: &[u8]);

    /// Announce that subsequent `write_data` bytes belong to the framebuffer
    /// band `band_index`.
    fn start_color_buffer_transfer(&mut self, band_index: u32);
}
