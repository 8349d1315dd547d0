#![forbid(unsafe_code)]

mod catalog;
mod rendering;

pub use catalog::{beam, block, demo_catalog, BEAM, BLOCK};
pub use rendering::{init_tracing, render_assemblage_to_png, ModuleStyle, RenderConfig};
