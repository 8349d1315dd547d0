use std::collections::HashMap;
use std::path::Path;

use assemblage::prelude::*;
use glam::{Vec2, Vec3};
use image::{Rgb, RgbImage};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber; `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[derive(Clone, Copy, Debug)]
pub struct ModuleStyle {
    pub fill: [u8; 3],
    pub outline: [u8; 3],
}

impl Default for ModuleStyle {
    fn default() -> Self {
        Self {
            fill: [120, 140, 170],
            outline: [40, 40, 50],
        }
    }
}

/// Top-down (XY) rendering options.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub image_size: (u32, u32),
    /// World-space rectangle mapped onto the image.
    pub min: Vec2,
    pub max: Vec2,
    pub background: [u8; 3],
    pub environment: [u8; 3],
    pub draw_ports: bool,
    styles: HashMap<String, ModuleStyle>,
}

impl RenderConfig {
    pub fn new(image_size: (u32, u32), min: Vec2, max: Vec2) -> Self {
        Self {
            image_size,
            min,
            max,
            background: [245, 245, 240],
            environment: [200, 90, 80],
            draw_ports: true,
            styles: HashMap::new(),
        }
    }

    pub fn with_background(mut self, rgb: [u8; 3]) -> Self {
        self.background = rgb;
        self
    }

    pub fn with_ports(mut self, draw: bool) -> Self {
        self.draw_ports = draw;
        self
    }

    pub fn set_module_style(&mut self, name: impl Into<String>, style: ModuleStyle) {
        self.styles.insert(name.into(), style);
    }

    fn style(&self, name: &str) -> ModuleStyle {
        self.styles.get(name).copied().unwrap_or_default()
    }

    fn to_pixel(&self, p: Vec3) -> (i64, i64) {
        let extent = (self.max - self.min).max(Vec2::splat(f32::EPSILON));
        let u = (p.x - self.min.x) / extent.x;
        // image rows grow downwards
        let v = 1.0 - (p.y - self.min.y) / extent.y;
        (
            (u * self.image_size.0 as f32).floor() as i64,
            (v * self.image_size.1 as f32).floor() as i64,
        )
    }
}

fn fill_rect(img: &mut RgbImage, a: (i64, i64), b: (i64, i64), rgb: [u8; 3], outline: Option<[u8; 3]>) {
    let (x0, x1) = (a.0.min(b.0), a.0.max(b.0));
    let (y0, y1) = (a.1.min(b.1), a.1.max(b.1));
    let (w, h) = (img.width() as i64, img.height() as i64);
    for y in y0.max(0)..=y1.min(h - 1) {
        for x in x0.max(0)..=x1.min(w - 1) {
            let edge = x == x0 || x == x1 || y == y0 || y == y1;
            let color = match outline {
                Some(o) if edge => o,
                _ => rgb,
            };
            img.put_pixel(x as u32, y as u32, Rgb(color));
        }
    }
}

fn port_color(occupancy: Occupancy) -> Option<[u8; 3]> {
    match occupancy {
        Occupancy::Available => Some([60, 170, 80]),
        Occupancy::Occluded => Some([210, 60, 50]),
        Occupancy::Contact => Some([60, 90, 210]),
        Occupancy::Connected => None,
    }
}

/// Draws environment geometry, module footprints and port markers, then writes a PNG.
pub fn render_assemblage_to_png(
    engine: &Assemblage,
    cfg: &RenderConfig,
    path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let (w, h) = cfg.image_size;
    let mut img = RgbImage::from_pixel(w, h, Rgb(cfg.background));

    for geometry in &engine.exogenous().environment {
        let bb = geometry.mesh.aabb();
        fill_rect(
            &mut img,
            cfg.to_pixel(bb.min),
            cfg.to_pixel(bb.max),
            cfg.environment,
            None,
        );
    }

    for module in engine.modules().values() {
        let bb = module.collision_mesh.aabb();
        let style = cfg.style(&module.name);
        fill_rect(
            &mut img,
            cfg.to_pixel(bb.min),
            cfg.to_pixel(bb.max),
            style.fill,
            Some(style.outline),
        );
    }

    if cfg.draw_ports {
        for module in engine.modules().values() {
            for port in &module.ports {
                let Some(rgb) = port_color(port.occupancy) else {
                    continue;
                };
                let (x, y) = cfg.to_pixel(port.sender.origin);
                fill_rect(&mut img, (x - 1, y - 1), (x + 1, y + 1), rgb, None);
            }
        }
    }

    img.save(path.as_ref())?;
    info!(
        "Wrote {} ({} modules, {}x{}).",
        path.as_ref().display(),
        engine.len(),
        w,
        h
    );
    Ok(())
}
