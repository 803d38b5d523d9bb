use cgmath::*;
use std::sync::Arc;

use crate::geometry::Mesh;
use crate::math::{self, Distribution1D};
use crate::structure::*;

/// Emitter endpoint interface consumed by the path vertex algebra.
///
/// Sampling weights follow the usual bidirectional split: the position
/// weight is the inverse position pdf (no radiance), the direction weight
/// carries the emitted radiance, and `eval` answers the directional
/// emission used when a prefix is connected at the emitter endpoint.
pub trait Emitter: Send + Sync {
    fn sample_position(&self, s: f32, uv: Point2<f32>) -> (SampledPosition, Color);
    fn sample_direction(&self, pos: &SampledPosition, d: Point2<f32>) -> (Vector3<f32>, PDF, Color);
    /// Solid-angle pdf of emitting toward `d` from the sampled position
    fn direction_pdf(&self, pos: &SampledPosition, d: &Vector3<f32>) -> PDF;
    /// Area pdf of the position sampling
    fn position_pdf(&self) -> f32;
    /// Directional emission toward `d`
    fn eval(&self, n: &Vector3<f32>, d: &Vector3<f32>) -> Color;
    fn flux(&self) -> Color;
}

pub struct PointEmitter {
    pub intensity: Color,
    pub position: Point3<f32>,
}

impl Emitter for PointEmitter {
    fn sample_position(&self, _s: f32, _uv: Point2<f32>) -> (SampledPosition, Color) {
        (
            SampledPosition {
                p: self.position,
                // no normal on a point light; the zero vector zeroes the
                // cosine factor, so area strategies never reach it
                n: Vector3::new(0.0, 0.0, 0.0),
                pdf: PDF::Discrete(1.0),
            },
            Color::one(),
        )
    }

    fn sample_direction(&self, _: &SampledPosition, d: Point2<f32>) -> (Vector3<f32>, PDF, Color) {
        let pdf = std::f32::consts::FRAC_1_PI * 0.25;
        (
            math::sample_uniform_sphere(d),
            PDF::SolidAngle(pdf),
            self.intensity * (4.0 * std::f32::consts::PI),
        )
    }

    fn direction_pdf(&self, _: &SampledPosition, _: &Vector3<f32>) -> PDF {
        PDF::SolidAngle(std::f32::consts::FRAC_1_PI * 0.25)
    }

    fn position_pdf(&self) -> f32 {
        1.0
    }

    fn eval(&self, _: &Vector3<f32>, _: &Vector3<f32>) -> Color {
        self.intensity
    }

    fn flux(&self) -> Color {
        self.intensity * (4.0 * std::f32::consts::PI)
    }
}

/// Area light: any emissive mesh. Emission is one-sided (front of the
/// geometric normal) and cosine-distributed.
impl Emitter for Mesh {
    fn sample_position(&self, s: f32, uv: Point2<f32>) -> (SampledPosition, Color) {
        let sampled = self.sample(s, uv);
        (sampled, Color::value(self.total_area()))
    }

    fn sample_direction(&self, pos: &SampledPosition, d: Point2<f32>) -> (Vector3<f32>, PDF, Color) {
        let d_out = math::cosine_sample_hemisphere(d);
        if d_out.z <= 0.0 {
            // Can be due to f32 inaccuracies
            return (pos.n, PDF::SolidAngle(0.0), Color::zero());
        }
        let frame = math::Frame::new(pos.n);
        (
            frame.to_world(d_out),
            PDF::SolidAngle(d_out.z * std::f32::consts::FRAC_1_PI),
            // Le * cos / pdf with the cosine perfectly importance sampled
            self.emission * std::f32::consts::PI,
        )
    }

    fn direction_pdf(&self, pos: &SampledPosition, d: &Vector3<f32>) -> PDF {
        let cos_theta = pos.n.dot(*d);
        if cos_theta <= 0.0 {
            PDF::SolidAngle(0.0)
        } else {
            PDF::SolidAngle(cos_theta * std::f32::consts::FRAC_1_PI)
        }
    }

    fn position_pdf(&self) -> f32 {
        self.pdf()
    }

    fn eval(&self, n: &Vector3<f32>, d: &Vector3<f32>) -> Color {
        // connections multiply the two endpoint evals and 1/r^2, so the
        // emitted cosine has to live here
        let cos_theta = n.dot(*d);
        if cos_theta > 0.0 {
            self.emission * cos_theta
        } else {
            Color::zero()
        }
    }

    fn flux(&self) -> Color {
        self.emission * std::f32::consts::PI * self.total_area()
    }
}

fn get_addr(emitter: &dyn Emitter) -> *const u8 {
    emitter as *const dyn Emitter as *const u8
}

/// Selects emitters proportionally to their power
pub struct EmitterSampler {
    pub emitters: Vec<Arc<dyn Emitter>>,
    pub emitters_cdf: Distribution1D,
}

impl EmitterSampler {
    pub fn new(emitters: Vec<Arc<dyn Emitter>>) -> EmitterSampler {
        assert!(!emitters.is_empty());
        let powers = emitters.iter().map(|e| e.flux().avg()).collect();
        EmitterSampler {
            emitters,
            emitters_cdf: Distribution1D::from_weights(powers),
        }
    }

    pub fn random_select_emitter(&self, v: f32) -> (f32, &dyn Emitter) {
        let id_light = self.emitters_cdf.sample_discrete(v);
        (
            self.emitters_cdf.pdf(id_light),
            self.emitters[id_light].as_ref(),
        )
    }

    /// Selection pdf of a given emitter (reverse lookup by address)
    pub fn pdf(&self, emitter: &dyn Emitter) -> f32 {
        let emitter_addr = get_addr(emitter);
        for (i, e) in self.emitters.iter().enumerate() {
            if get_addr(e.as_ref()) == emitter_addr {
                return self.emitters_cdf.pdf(i);
            }
        }
        warn!("Selection pdf requested for an unregistered emitter");
        0.0
    }

}
