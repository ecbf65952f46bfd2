//! Demo geometry for the debug host.

use glam::Vec4;

pub const SCREEN_WIDTH: f32 = 640.0;
pub const SCREEN_HEIGHT: f32 = 480.0;

/// Full-screen background as two triangles at far depth.
pub fn background_quad() -> [[Vec4; 3]; 2] {
    let z = 0.9;
    let v00 = Vec4::new(0.0, 0.0, z, 1.0);
    let v10 = Vec4::new(SCREEN_WIDTH - 1.0, 0.0, z, 1.0);
    let v11 = Vec4::new(SCREEN_WIDTH - 1.0, SCREEN_HEIGHT - 1.0, z, 1.0);
    let v01 = Vec4::new(0.0, SCREEN_HEIGHT - 1.0, z, 1.0);
    [[v00, v10, v11], [v00, v11, v01]]
}

/// A triangle that slides across the screen frame by frame, crossing band
/// boundaries on the way.
pub fn moving_triangle(frame: u32) -> [Vec4; 3] {
    let offset = (frame * 24 % 400) as f32;
    [
        Vec4::new(120.0 + offset, 80.0, 0.4, 1.0),
        Vec4::new(40.0 + offset, 360.0, 0.4, 1.0),
        Vec4::new(200.0 + offset, 360.0, 0.4, 1.0),
    ]
}

/// 64x64 RGBA4444 checkerboard, 8-pixel squares.
pub fn checkerboard() -> Vec<u16> {
    let mut pixels = Vec::with_capacity(64 * 64);
    for y in 0..64u16 {
        for x in 0..64u16 {
            let light = ((x / 8) + (y / 8)) % 2 == 0;
            pixels.push(if light { 0xFFFF } else { 0x448F });
        }
    }
    pixels
}
