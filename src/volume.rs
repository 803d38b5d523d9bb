use crate::math;
use crate::structure::*;
use cgmath::*;

pub struct SampledPhase {
    pub d: Vector3<f32>,
    pub weight: Color,
    pub pdf: f32,
}

/// Phase functions are expressed in world space directions
#[derive(Clone, Copy)]
pub enum PhaseFunction {
    Isotropic(),
}

impl PhaseFunction {
    pub fn eval(&self, _w_i: &Vector3<f32>, _w_o: &Vector3<f32>) -> Color {
        match self {
            Self::Isotropic() => Color::value(1.0 / (std::f32::consts::PI * 4.0)),
        }
    }

    pub fn pdf(&self, _w_i: &Vector3<f32>, _w_o: &Vector3<f32>) -> f32 {
        match self {
            Self::Isotropic() => 1.0 / (std::f32::consts::PI * 4.0),
        }
    }

    pub fn sample(&self, _d_in: &Vector3<f32>, u: Point2<f32>) -> SampledPhase {
        match self {
            Self::Isotropic() => SampledPhase {
                d: math::sample_uniform_sphere(u),
                weight: Color::one(),
                pdf: 1.0 / (std::f32::consts::PI * 4.0),
            },
        }
    }
}
