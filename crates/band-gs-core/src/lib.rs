#![no_std]
//! Platform-agnostic driver core for a band-based FPGA rasterizer.
//!
//! The device renders the screen in horizontal bands of `LINE_RESOLUTION`
//! scanlines; its on-chip framebuffer holds exactly one band. The driver
//! buffers a whole frame of commands into a compact display list, then
//! replays that list to the device once per band, pruning triangles that do
//! not reach the band and splitting texture uploads into bus-sized chunks.
//!
//! All bus traffic goes through the [`band_gs_hal::BusConnector`] seam, so
//! the core stays free of platform code.

pub mod gpu;
pub mod raster;

pub use gpu::registers::{
    BlendFunc, LogicOp, TestFunc, TexEnvParam, TexEnvParamName, TexEnvTarget, TextureWrapMode,
};
pub use gpu::renderer::{RenderError, Renderer, HARDWARE_BUFFER_SIZE};
