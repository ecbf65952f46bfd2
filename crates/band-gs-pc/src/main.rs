//! PC debug host for the band-gs rasterizer.
//!
//! Drives the driver core against a tracing bus transport: submits a few
//! demo frames, pumps the band walker to completion, and reports the bus
//! traffic. Swap [`transport::TraceBus`] for a real transport to talk to
//! hardware.

mod scene;
mod transport;

use anyhow::{anyhow, Result};
use band_gs_core::{RenderError, Renderer};
use clap::Parser;
use glam::Vec2;

use transport::TraceBus;

/// 480 visible lines split into four bands of 120.
type DemoRenderer<'tex> = Renderer<'tex, TraceBus, 4096, 4, 120, 32>;

#[derive(Parser)]
#[command(name = "band-gs-pc", about = "PC debug host for the band-gs rasterizer")]
struct Args {
    /// Number of frames to submit.
    #[arg(long, default_value_t = 8)]
    frames: u32,

    /// Stream the checkerboard texture each frame.
    #[arg(long)]
    textured: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    log::info!("band-gs-pc: debug host starting");

    let texture = scene::checkerboard();
    let mut renderer: DemoRenderer<'_> = Renderer::new(TraceBus::new());

    for frame in 0..args.frames {
        let pixels = args.textured.then_some(texture.as_slice());
        submit_frame(&mut renderer, frame, pixels)
            .map_err(|e| anyhow!("frame {frame} rejected: {e:?}"))?;
        renderer.commit();
        while renderer.upload_display_list() {}
        log::debug!(
            "frame {frame} done, {} bytes on the bus so far",
            renderer.bus().bytes_written()
        );
    }

    let bus = renderer.bus();
    log::info!(
        "submitted {} frames: {} band starts, {} transfers, {} bytes",
        args.frames,
        bus.bands_started(),
        bus.transfers(),
        bus.bytes_written()
    );
    Ok(())
}

fn submit_frame<'tex>(
    renderer: &mut DemoRenderer<'tex>,
    frame: u32,
    texture: Option<&'tex [u16]>,
) -> Result<(), RenderError> {
    renderer.clear(true, true)?;

    if let Some(pixels) = texture {
        renderer.use_texture(pixels, 64, 64)?;
    }

    for quad_half in scene::background_quad() {
        renderer.draw_triangle(
            quad_half[0],
            quad_half[1],
            quad_half[2],
            Vec2::ZERO,
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            [32, 48, 96, 255],
        )?;
    }

    let tri = scene::moving_triangle(frame);
    renderer.draw_triangle(
        tri[0],
        tri[1],
        tri[2],
        Vec2::new(0.5, 0.0),
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 1.0),
        [240, 96, 64, 255],
    )?;

    Ok(())
}
