pub mod display_list;
pub mod registers;
pub mod renderer;
pub mod stream;

pub use renderer::{RenderError, Renderer};
