//! Frame encoder and band-walking upload state machine.
//!
//! The screen is rendered in `DISPLAY_LINES` horizontal bands of
//! `LINE_RESOLUTION` scanlines; the device framebuffer holds one band. The
//! renderer collects a whole frame into a single back display list. After
//! commit the list becomes the front list and is walked once per band, most
//! of the work happening in [`Renderer::upload_display_list`]: triangles
//! outside the current band are pruned, texture uploads are split into
//! bus-sized chunks, and the surviving commands are flushed through the
//! [`BusConnector`]. Saving each triangle once and re-reading it per band
//! trades upload-time work for display-list memory.

use core::marker::PhantomData;
use core::mem::size_of;
use core::ptr;
use core::slice;

use band_gs_hal::BusConnector;
use glam::{Vec2, Vec4};

use super::display_list::{DisplayList, ListState, Record};
use super::registers::{
    convert_color, BlendFunc, ConfReg1, ConfReg2, LogicOp, TestFunc, TexEnvParam, TexEnvParamName,
    TexEnvTarget, TextureWrapMode,
};
use super::stream;
use crate::raster::{self, RasterizedTriangle};

/// Size of the device-side transfer buffer; one bus write never exceeds it.
pub const HARDWARE_BUFFER_SIZE: usize = 2048;

/// Front/back frame list pair. Only two are supported.
const DISPLAY_BUFFERS: usize = 2;

type UploadList<const BUS_WIDTH: usize> = DisplayList<{ HARDWARE_BUFFER_SIZE }, BUS_WIDTH>;

/// Errors reported by the command encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderError {
    /// The back display list has no room for the command and its payload.
    /// The list is left unchanged; retry after the next commit.
    OutOfMemory,
    /// Texture is not square or not one of the four supported sizes.
    UnsupportedTexture,
    /// Accepted for API compatibility but not implemented by the hardware.
    Unsupported,
}

/// Texture upload descriptor, also the walker's in-flight cursor.
///
/// `packed(4)` keeps the record's alignment at the bus alignment regardless
/// of the host pointer width.
#[repr(C, packed(4))]
#[derive(Clone, Copy)]
pub struct TextureStreamArg {
    /// Borrowed pixel storage; stays valid for the renderer's `'tex`
    /// lifetime.
    pub pixels: *const u16,
    /// Pixels left to stream.
    pub remaining_pixels: i32,
}

unsafe impl Record for TextureStreamArg {}

impl Default for TextureStreamArg {
    fn default() -> Self {
        Self {
            pixels: ptr::null(),
            remaining_pixels: 0,
        }
    }
}

/// The driver. Generic over the bus transport and the device geometry.
///
/// `'tex` is the lifetime of texture pixel storage handed to
/// [`Renderer::use_texture`]: pixels are borrowed, not copied, and are read
/// until the upload finishes.
pub struct Renderer<
    'tex,
    Bus,
    const DISPLAY_LIST_SIZE: usize = 2048,
    const DISPLAY_LINES: u16 = 1,
    const LINE_RESOLUTION: u16 = 128,
    const BUS_WIDTH: usize = 32,
> where
    Bus: BusConnector,
{
    bus: Bus,
    lists: [DisplayList<DISPLAY_LIST_SIZE, BUS_WIDTH>; DISPLAY_BUFFERS],
    upload: UploadList<BUS_WIDTH>,
    front: usize,
    back: usize,
    /// Band currently being re-emitted, counting down to zero.
    upload_band: u16,
    texture_cursor: TextureStreamArg,
    conf_reg1: ConfReg1,
    conf_reg2: ConfReg2,
    _textures: PhantomData<&'tex [u16]>,
}

impl<
        'tex,
        Bus,
        const DISPLAY_LIST_SIZE: usize,
        const DISPLAY_LINES: u16,
        const LINE_RESOLUTION: u16,
        const BUS_WIDTH: usize,
    > Renderer<'tex, Bus, DISPLAY_LIST_SIZE, DISPLAY_LINES, LINE_RESOLUTION, BUS_WIDTH>
where
    Bus: BusConnector,
{
    /// Aligned byte size of one triangle record, as carried in the
    /// `TRIANGLE_STREAM` immediate for the hardware's benefit.
    pub const TRIANGLE_SIZE_ALIGNED: u16 =
        DisplayList::<DISPLAY_LIST_SIZE, BUS_WIDTH>::size_of_aligned::<RasterizedTriangle>() as u16;

    /// Triangle opcode with the aligned payload size pre-baked.
    pub const OP_TRIANGLE_FULL: u16 = stream::TRIANGLE_STREAM | Self::TRIANGLE_SIZE_ALIGNED;

    /// Create the driver and push the initial register state into the first
    /// frame. A fresh list cannot run out of space for these.
    pub fn new(bus: Bus) -> Self {
        let mut renderer = Self {
            bus,
            lists: [DisplayList::new(), DisplayList::new()],
            upload: DisplayList::new(),
            front: 0,
            back: 1,
            upload_band: 0,
            texture_cursor: TextureStreamArg::default(),
            conf_reg1: ConfReg1 {
                enable_depth_test: false,
                depth_func: TestFunc::Less,
                alpha_func: TestFunc::Always,
                alpha_ref: 0xF,
                depth_mask: false,
                color_mask_a: true,
                color_mask_b: true,
                color_mask_g: true,
                color_mask_r: true,
            },
            conf_reg2: ConfReg2 {
                perspective_correct_tex: cfg!(feature = "perspective-correction"),
                tex_env_func: TexEnvParam::Modulate,
                blend_src: BlendFunc::One,
                blend_dst: BlendFunc::Zero,
                tex_clamp_s: false,
                tex_clamp_t: false,
            },
            _textures: PhantomData,
        };

        let _ = renderer.set_depth_func(TestFunc::Less);
        let _ = renderer.set_depth_mask(false);
        let _ = renderer.set_color_mask(true, true, true, true);
        let _ = renderer.set_alpha_func(TestFunc::Always, 0xF);
        let _ = renderer.set_tex_env(
            TexEnvTarget::TextureEnv,
            TexEnvParamName::TextureEnvMode,
            TexEnvParam::Modulate,
        );
        let _ = renderer.set_blend_func(BlendFunc::One, BlendFunc::Zero);
        let _ = renderer.set_logic_op(LogicOp::Copy);
        let _ = renderer.set_tex_env_color([0, 0, 0, 0]);
        let _ = renderer.set_clear_color([0, 0, 0, 0]);
        let _ = renderer.set_clear_depth(65535);
        renderer
    }

    /// Rasterize and record one triangle. Vertices are screen-space (x/y in
    /// pixels, z depth, w clip W). A triangle without visible coverage is
    /// dropped silently. Every call also steps the upload state machine, so
    /// streaming progresses while the frame is being built.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_triangle(
        &mut self,
        v0: Vec4,
        v1: Vec4,
        v2: Vec4,
        st0: Vec2,
        st1: Vec2,
        st2: Vec2,
        color: [u8; 4],
    ) -> Result<(), RenderError> {
        let mut tri = RasterizedTriangle::default();
        let result = if raster::rasterize(&mut tri, &v0, &st0, &v1, &st1, &v2, &st2) {
            tri.static_color = convert_color(color);
            Self::append_command(&mut self.lists[self.back], Self::OP_TRIANGLE_FULL, tri)
        } else {
            // Not visible.
            Ok(())
        };
        self.upload_display_list();
        result
    }

    /// Record a clear of the selected buffers. With neither buffer selected
    /// a `NOP` is recorded instead.
    pub fn clear(&mut self, color_buffer: bool, depth_buffer: bool) -> Result<(), RenderError> {
        let op_color = stream::FRAMEBUFFER_MEMSET | stream::FRAMEBUFFER_COLOR;
        let op_depth = stream::FRAMEBUFFER_MEMSET | stream::FRAMEBUFFER_DEPTH;
        let op = match (color_buffer, depth_buffer) {
            (true, true) => op_color | op_depth,
            (true, false) => op_color,
            (false, true) => op_depth,
            (false, false) => stream::NOP,
        };
        match self.lists[self.back].create::<u16>() {
            Some(slot) => {
                *slot = op;
                Ok(())
            }
            None => Err(RenderError::OutOfMemory),
        }
    }

    /// Finish the frame and hand it to the device.
    ///
    /// The commit opcode must make it into the list: without it the hardware
    /// never pushes the final band out and the image slips. If it does not
    /// fit, the whole frame is discarded to keep the band cadence. Otherwise
    /// any residual upload of the previous frame is drained (the only place
    /// the driver blocks), the lists are swapped, and the new frame's upload
    /// is kicked off.
    pub fn commit(&mut self) {
        match self.lists[self.back].create::<u16>() {
            Some(slot) => *slot = stream::FRAMEBUFFER_COMMIT | stream::FRAMEBUFFER_COLOR,
            None => {
                self.lists[self.back].clear();
                return;
            }
        }

        while self.upload_display_list() {}

        self.lists[self.back].enqueue();
        core::mem::swap(&mut self.front, &mut self.back);
        self.upload_display_list();
    }

    /// Record a texture switch. Only square 32/64/128/256 textures are
    /// supported; pixels are RGBA4444, row-major.
    ///
    /// The pixel storage is borrowed: the driver streams from it in
    /// bus-sized chunks until the upload completes.
    pub fn use_texture(
        &mut self,
        pixels: &'tex [u16],
        width: u16,
        height: u16,
    ) -> Result<(), RenderError> {
        if width != height {
            return Err(RenderError::UnsupportedTexture);
        }
        let op = match width {
            256 => stream::TEXTURE_STREAM_256X256,
            128 => stream::TEXTURE_STREAM_128X128,
            64 => stream::TEXTURE_STREAM_64X64,
            32 => stream::TEXTURE_STREAM_32X32,
            _ => return Err(RenderError::UnsupportedTexture),
        };
        let pixel_count = width as usize * height as usize;
        if pixels.len() < pixel_count {
            return Err(RenderError::UnsupportedTexture);
        }

        let arg = TextureStreamArg {
            pixels: pixels.as_ptr(),
            remaining_pixels: pixel_count as i32,
        };
        Self::append_command(&mut self.lists[self.back], op, arg)
    }

    pub fn set_clear_color(&mut self, color: [u8; 4]) -> Result<(), RenderError> {
        Self::append_command(
            &mut self.lists[self.back],
            stream::SET_COLOR_BUFFER_CLEAR_COLOR,
            convert_color(color),
        )
    }

    pub fn set_clear_depth(&mut self, depth: u16) -> Result<(), RenderError> {
        Self::append_command(
            &mut self.lists[self.back],
            stream::SET_DEPTH_BUFFER_CLEAR_DEPTH,
            depth,
        )
    }

    pub fn set_tex_env_color(&mut self, color: [u8; 4]) -> Result<(), RenderError> {
        Self::append_command(
            &mut self.lists[self.back],
            stream::SET_TEX_ENV_COLOR,
            convert_color(color),
        )
    }

    pub fn set_depth_mask(&mut self, flag: bool) -> Result<(), RenderError> {
        self.conf_reg1.depth_mask = flag;
        self.write_conf_reg1()
    }

    pub fn enable_depth_test(&mut self, enable: bool) -> Result<(), RenderError> {
        self.conf_reg1.enable_depth_test = enable;
        self.write_conf_reg1()
    }

    pub fn set_color_mask(
        &mut self,
        r: bool,
        g: bool,
        b: bool,
        a: bool,
    ) -> Result<(), RenderError> {
        self.conf_reg1.color_mask_r = r;
        self.conf_reg1.color_mask_g = g;
        self.conf_reg1.color_mask_b = b;
        self.conf_reg1.color_mask_a = a;
        self.write_conf_reg1()
    }

    pub fn set_depth_func(&mut self, func: TestFunc) -> Result<(), RenderError> {
        self.conf_reg1.depth_func = func;
        self.write_conf_reg1()
    }

    pub fn set_alpha_func(&mut self, func: TestFunc, reference: u8) -> Result<(), RenderError> {
        self.conf_reg1.alpha_func = func;
        self.conf_reg1.alpha_ref = reference;
        self.write_conf_reg1()
    }

    /// Only `TextureEnv` / `TextureEnvMode` are supported; the target and
    /// parameter name are accepted for API compatibility.
    pub fn set_tex_env(
        &mut self,
        _target: TexEnvTarget,
        _pname: TexEnvParamName,
        param: TexEnvParam,
    ) -> Result<(), RenderError> {
        self.conf_reg2.tex_env_func = param;
        self.write_conf_reg2()
    }

    pub fn set_blend_func(
        &mut self,
        sfactor: BlendFunc,
        dfactor: BlendFunc,
    ) -> Result<(), RenderError> {
        self.conf_reg2.blend_src = sfactor;
        self.conf_reg2.blend_dst = dfactor;
        self.write_conf_reg2()
    }

    /// Logic-op blending is not implemented by the hardware.
    pub fn set_logic_op(&mut self, _op: LogicOp) -> Result<(), RenderError> {
        Err(RenderError::Unsupported)
    }

    pub fn set_texture_wrap_mode_s(&mut self, mode: TextureWrapMode) -> Result<(), RenderError> {
        self.conf_reg2.tex_clamp_s = mode == TextureWrapMode::ClampToEdge;
        self.write_conf_reg2()
    }

    pub fn set_texture_wrap_mode_t(&mut self, mode: TextureWrapMode) -> Result<(), RenderError> {
        self.conf_reg2.tex_clamp_t = mode == TextureWrapMode::ClampToEdge;
        self.write_conf_reg2()
    }

    /// One step of the upload state machine.
    ///
    /// Normally driven implicitly by `draw_triangle` and `commit`; exposed so
    /// a host can pump the bus while otherwise idle. Returns true while an
    /// upload is in progress (more steps needed), false when the device has
    /// the whole frame and the driver is idle. A step never blocks for
    /// longer than one bus write.
    pub fn upload_display_list(&mut self) -> bool {
        if !self.bus.clear_to_send() {
            return true;
        }

        let front = self.front;
        if self.lists[front].state() == ListState::Free || self.lists[front].size() == 0 {
            return false;
        }
        if self.lists[front].state() == ListState::Queued {
            // The picture is emitted top-down but bands are addressed
            // bottom-up, so the index counts down.
            self.upload_band = DISPLAY_LINES - 1;
            self.lists[front].transfer();
        }

        // A pending texture upload owns the bus until it is done.
        if self.texture_cursor.remaining_pixels > 0 {
            self.write_texture_chunk();
            return true;
        }

        // Assemble this tick's sub-list from the front list.
        self.upload.clear();
        let mut leave_loop = false;
        while !leave_loop && Self::has_enough_space(&self.upload) {
            let op = match self.lists[front].get_next::<u16>() {
                Some(op) => *op,
                None => break,
            };
            match self.upload.create::<u16>() {
                Some(slot) => *slot = op,
                None => break,
            }

            match op & stream::OP_MASK {
                stream::TRIANGLE_STREAM => {
                    // A triangle record must follow its opcode.
                    let tri = match self.lists[front].get_next::<RasterizedTriangle>() {
                        Some(tri) => *tri,
                        None => {
                            self.upload.remove::<u16>();
                            break;
                        }
                    };
                    let band_y_start = self.upload_band * LINE_RESOLUTION;
                    let band_y_end = band_y_start + LINE_RESOLUTION;
                    match self.upload.create::<RasterizedTriangle>() {
                        Some(out) => {
                            if !raster::calc_line_increment(out, &tri, band_y_start, band_y_end) {
                                // Not in this band; nothing goes out for it.
                                self.upload.remove::<RasterizedTriangle>();
                                self.upload.remove::<u16>();
                            }
                        }
                        None => {
                            self.upload.remove::<u16>();
                            break;
                        }
                    }
                }
                stream::FRAMEBUFFER_OP | stream::NOP => {
                    // No payload.
                }
                stream::TEXTURE_STREAM => {
                    let new_arg = match self.lists[front].get_next::<TextureStreamArg>() {
                        Some(arg) => *arg,
                        None => {
                            self.upload.remove::<u16>();
                            break;
                        }
                    };
                    let prev = self.texture_cursor;
                    self.texture_cursor = new_arg;
                    let new_end = new_arg
                        .pixels
                        .wrapping_add(new_arg.remaining_pixels as usize);
                    if new_end == prev.pixels {
                        // The previous upload ran to completion ending
                        // exactly here: the texture is already in the device
                        // buffer. Fast-forward and drop the opcode.
                        self.texture_cursor.pixels = new_end;
                        self.texture_cursor.remaining_pixels = 0;
                        self.upload.remove::<u16>();
                    } else {
                        leave_loop = true;
                    }
                }
                stream::SET_REG => {
                    let value = match self.lists[front].get_next::<u16>() {
                        Some(value) => *value,
                        None => {
                            self.upload.remove::<u16>();
                            break;
                        }
                    };
                    match self.upload.create::<u16>() {
                        Some(slot) => *slot = value,
                        None => {
                            self.upload.remove::<u16>();
                            break;
                        }
                    }
                }
                _ => {
                    // Unknown op: elide it from the upload.
                    self.upload.remove::<u16>();
                }
            }
        }

        self.bus
            .start_color_buffer_transfer(self.upload_band as u32);
        self.bus.write_data(self.upload.as_bytes());

        if self.lists[front].at_end() {
            self.lists[front].reset_read();
            if self.upload_band == 0 {
                // Frame fully emitted.
                self.lists[front].clear();
                return false;
            }
            self.upload_band -= 1;
        }
        true
    }

    /// Bytes of the frame currently being built, for inspection.
    pub fn back_list(&self) -> &[u8] {
        self.lists[self.back].as_bytes()
    }

    /// Free bytes left in the frame currently being built.
    pub fn back_free_space(&self) -> usize {
        self.lists[self.back].free_space()
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    fn write_conf_reg1(&mut self) -> Result<(), RenderError> {
        let value = self.conf_reg1.pack();
        Self::append_command(&mut self.lists[self.back], stream::SET_CONF_REG1, value)
    }

    fn write_conf_reg2(&mut self) -> Result<(), RenderError> {
        let value = self.conf_reg2.pack();
        Self::append_command(&mut self.lists[self.back], stream::SET_CONF_REG2, value)
    }

    /// Append an opcode and its payload, or leave the list byte-identical.
    fn append_command<const SIZE: usize, T: Record>(
        list: &mut DisplayList<SIZE, BUS_WIDTH>,
        op: u16,
        arg: T,
    ) -> Result<(), RenderError> {
        match list.create::<u16>() {
            Some(slot) => *slot = op,
            None => return Err(RenderError::OutOfMemory),
        }
        match list.create::<T>() {
            Some(slot) => {
                *slot = arg;
                Ok(())
            }
            None => {
                list.remove::<u16>();
                Err(RenderError::OutOfMemory)
            }
        }
    }

    /// Room for at least one opcode plus the largest payload.
    fn has_enough_space(upload: &UploadList<BUS_WIDTH>) -> bool {
        upload.free_space()
            >= UploadList::<BUS_WIDTH>::size_of_aligned::<u16>()
                + UploadList::<BUS_WIDTH>::size_of_aligned::<RasterizedTriangle>()
    }

    /// Push one bus-buffer-sized chunk of the in-flight texture. Textures
    /// are whole multiples of the chunk size, so the write never overruns
    /// the borrowed storage.
    fn write_texture_chunk(&mut self) {
        let pixel_inc = HARDWARE_BUFFER_SIZE / size_of::<u16>();
        let pixels = self.texture_cursor.pixels;
        let chunk = unsafe { slice::from_raw_parts(pixels.cast::<u8>(), HARDWARE_BUFFER_SIZE) };
        self.bus.write_data(chunk);
        self.texture_cursor.pixels = pixels.wrapping_add(pixel_inc);
        self.texture_cursor.remaining_pixels -= pixel_inc as i32;
    }
}
