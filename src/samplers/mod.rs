use cgmath::Point2;

pub trait Sampler: Send {
    fn next(&mut self) -> f32;
    fn next_u64(&mut self) -> u64;
    fn next2d(&mut self) -> Point2<f32>;
    fn clone_box(&mut self) -> Box<dyn Sampler>;
}

pub mod independent;
