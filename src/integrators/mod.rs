use cgmath::{Point2, Vector2};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::accel::Acceleration;
use crate::samplers::Sampler;
use crate::scene::Scene;
use crate::structure::Color;
use crate::Scale;

/// A rectangular piece of the frame. Blocks double as worker-local render
/// targets and, with `pos = (0, 0)` and the full resolution, as the
/// assembled image.
pub struct ImageBlock {
    pub pos: Point2<u32>,
    pub size: Vector2<u32>,
    pixels: Vec<Color>,
}

impl ImageBlock {
    pub fn new(pos: Point2<u32>, size: Vector2<u32>) -> ImageBlock {
        ImageBlock {
            pos,
            size,
            pixels: vec![Color::default(); (size.x * size.y) as usize],
        }
    }

    fn offset(&self, p: Point2<u32>) -> usize {
        assert!(p.x < self.size.x && p.y < self.size.y);
        (p.y * self.size.x + p.x) as usize
    }

    /// Add into a pixel, in block-local coordinates
    pub fn accumulate(&mut self, p: Point2<u32>, c: Color) {
        let o = self.offset(p);
        self.pixels[o] += c;
    }

    /// Add into a pixel, dropping coordinates outside the block
    pub fn accumulate_safe(&mut self, p: Point2<i32>, c: Color) {
        if p.x >= 0 && p.y >= 0 && (p.x as u32) < self.size.x && (p.y as u32) < self.size.y {
            self.accumulate(Point2::new(p.x as u32, p.y as u32), c);
        }
    }

    pub fn get(&self, p: Point2<u32>) -> Color {
        self.pixels[self.offset(p)]
    }

    /// Add a finished block into this one at the block's own position
    pub fn merge(&mut self, other: &ImageBlock) {
        for (i, c) in other.pixels.iter().enumerate() {
            let x = other.pos.x + (i as u32) % other.size.x;
            let y = other.pos.y + (i as u32) / other.size.x;
            let o = self.offset(Point2::new(x, y));
            self.pixels[o] += *c;
        }
    }

    pub fn average(&self) -> Color {
        let mut sum = Color::default();
        for c in &self.pixels {
            sum += *c;
        }
        sum * (1.0 / self.pixels.len() as f32)
    }
}

impl Scale<f32> for ImageBlock {
    fn scale(&mut self, f: f32) {
        assert!(f > 0.0);
        for c in self.pixels.iter_mut() {
            c.scale(f);
        }
    }
}

/// Cut the frame into square worker blocks; border blocks shrink to fit
pub fn split_into_blocks(size: Vector2<u32>, block: u32) -> Vec<ImageBlock> {
    assert!(block > 0);
    let mut blocks = Vec::new();
    let mut y = 0;
    while y < size.y {
        let h = block.min(size.y - y);
        let mut x = 0;
        while x < size.x {
            let w = block.min(size.x - x);
            blocks.push(ImageBlock::new(Point2::new(x, y), Vector2::new(w, h)));
            x += w;
        }
        y += h;
    }
    blocks
}

pub fn build_pool(nb_threads: Option<usize>) -> rayon::ThreadPool {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = nb_threads {
        builder = builder.num_threads(n);
    }
    builder.build().unwrap()
}

/// Shared framebuffer with lock-free pixel accumulation, used by the
/// light-tracing (splat) strategies. Channels are stored as f32 bit
/// patterns inside atomics; ordering is relaxed because the final frame is
/// a sum regardless of order.
pub struct AtomicFramebuffer {
    size: Vector2<u32>,
    data: Vec<AtomicU32>,
}

impl AtomicFramebuffer {
    pub fn new(size: Vector2<u32>) -> AtomicFramebuffer {
        let mut data = Vec::new();
        data.resize_with((size.x * size.y * 3) as usize, || AtomicU32::new(0));
        AtomicFramebuffer { size, data }
    }

    pub fn size(&self) -> &Vector2<u32> {
        &self.size
    }

    pub fn splat(&self, p: Point2<f32>, c: Color) {
        let (x, y) = (p.x as i32, p.y as i32);
        if x < 0 || y < 0 || x >= self.size.x as i32 || y >= self.size.y as i32 {
            return;
        }
        let index = ((y as u32 * self.size.x + x as u32) * 3) as usize;
        for (off, v) in [c.r, c.g, c.b].into_iter().enumerate() {
            if v != 0.0 {
                atomic_add_f32(&self.data[index + off], v);
            }
        }
    }

    pub fn value(&self, p: Point2<u32>) -> Color {
        let index = ((p.y * self.size.x + p.x) * 3) as usize;
        Color::new(
            f32::from_bits(self.data[index].load(Ordering::Relaxed)),
            f32::from_bits(self.data[index + 1].load(Ordering::Relaxed)),
            f32::from_bits(self.data[index + 2].load(Ordering::Relaxed)),
        )
    }

    /// Fold the splat buffer into an image with the given scale
    pub fn add_into(&self, img: &mut ImageBlock, factor: f32) {
        for y in 0..self.size.y {
            for x in 0..self.size.x {
                let p = Point2::new(x, y);
                img.accumulate(p, self.value(p) * factor);
            }
        }
    }
}

fn atomic_add_f32(cell: &AtomicU32, v: f32) {
    let mut cur = cell.load(Ordering::Relaxed);
    loop {
        let new = (f32::from_bits(cur) + v).to_bits();
        match cell.compare_exchange_weak(cur, new, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => cur = actual,
        }
    }
}

/////////////// Integrators code
pub trait Integrator {
    fn compute(
        &mut self,
        sampler: &mut dyn Sampler,
        accel: &dyn Acceleration,
        scene: &Scene,
    ) -> ImageBlock;
}

pub mod bidir;
