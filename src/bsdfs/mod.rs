use crate::structure::*;
use cgmath::{Point2, Vector3};

// Helpers
pub fn reflect(d: &Vector3<f32>) -> Vector3<f32> {
    Vector3::new(-d.x, -d.y, d.z)
}

pub fn check_reflection_condition(wi: &Vector3<f32>, wo: &Vector3<f32>) -> bool {
    (wo.z * wi.z - wi.x * wo.x - wi.y * wo.y - 1.0).abs() < 0.0001
}

/// Struct that represent a sampled direction
#[derive(Clone, Copy)]
pub struct SampledDirection {
    pub weight: Color,
    pub d: Vector3<f32>,
    pub pdf: PDF,
}

pub trait BSDF: Send + Sync {
    /// sample an random direction based on the BSDF value
    /// @d_in: the incoming direction in the local space
    /// @sample: random number 2D
    /// @return: the outgoing direction, the pdf and the bsdf value $fs(...) * |n . d_out|$
    fn sample(&self, d_in: &Vector3<f32>, sample: Point2<f32>) -> Option<SampledDirection>;
    /// eval the bsdf pdf value. Queries in the solid-angle domain return 0
    /// for Dirac components, so they drop out of area-measure sums.
    fn pdf(&self, d_in: &Vector3<f32>, d_out: &Vector3<f32>, domain: Domain) -> PDF;
    /// eval the bsdf value : $fs(...) * |n . d_out|$
    fn eval(&self, d_in: &Vector3<f32>, d_out: &Vector3<f32>, domain: Domain) -> Color;
    /// check if it is smooth (Dirac)
    fn is_smooth(&self) -> bool {
        false
    }
}

pub mod diffuse;
pub mod specular;
