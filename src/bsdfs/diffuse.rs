use crate::bsdfs::*;
use crate::math::cosine_sample_hemisphere;

/// Lambertian BSDF Model
pub struct BSDFDiffuse {
    pub diffuse: Color,
}

impl BSDF for BSDFDiffuse {
    fn sample(&self, d_in: &Vector3<f32>, sample: Point2<f32>) -> Option<SampledDirection> {
        if d_in.z <= 0.0 {
            None
        } else {
            let d_out = cosine_sample_hemisphere(sample);
            if d_out.z == 0.0 {
                return None;
            }
            Some(SampledDirection {
                weight: self.diffuse,
                d: d_out,
                pdf: PDF::SolidAngle(d_out.z * std::f32::consts::FRAC_1_PI),
            })
        }
    }

    fn pdf(&self, d_in: &Vector3<f32>, d_out: &Vector3<f32>, domain: Domain) -> PDF {
        assert!(domain == Domain::SolidAngle);
        if d_in.z <= 0.0 || d_out.z <= 0.0 {
            PDF::SolidAngle(0.0)
        } else {
            PDF::SolidAngle(d_out.z * std::f32::consts::FRAC_1_PI)
        }
    }

    fn eval(&self, d_in: &Vector3<f32>, d_out: &Vector3<f32>, domain: Domain) -> Color {
        assert!(domain == Domain::SolidAngle);
        if d_in.z <= 0.0 || d_out.z <= 0.0 {
            Color::zero()
        } else {
            self.diffuse * d_out.z * std::f32::consts::FRAC_1_PI
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn pdf_matches_sample() {
        let bsdf = BSDFDiffuse {
            diffuse: Color::value(0.8),
        };
        let wi = Vector3::new(0.0, 0.0, 1.0);
        let s = bsdf.sample(&wi, Point2::new(0.3, 0.6)).unwrap();
        let p = bsdf.pdf(&wi, &s.d, Domain::SolidAngle);
        assert_approx_eq!(p.value(), s.pdf.value(), 1e-6);
    }

    #[test]
    fn flip_symmetry() {
        // Lambert pdf only depends on the outgoing cosine
        let bsdf = BSDFDiffuse {
            diffuse: Color::value(0.5),
        };
        let a = Vector3::new(0.0, 0.6, 0.8);
        let b = Vector3::new(0.6, 0.0, 0.8);
        let pdf_ab = bsdf.pdf(&a, &b, Domain::SolidAngle).value();
        let pdf_ba = bsdf.pdf(&b, &a, Domain::SolidAngle).value();
        assert_approx_eq!(pdf_ab, pdf_ba, 1e-6);
        assert_approx_eq!(pdf_ab, 0.8 * std::f32::consts::FRAC_1_PI, 1e-6);
    }

    #[test]
    fn below_surface_is_black() {
        let bsdf = BSDFDiffuse {
            diffuse: Color::value(0.5),
        };
        let below = Vector3::new(0.0, 0.0, -1.0);
        let up = Vector3::new(0.0, 0.0, 1.0);
        assert!(bsdf.sample(&below, Point2::new(0.5, 0.5)).is_none());
        assert!(bsdf.eval(&up, &below, Domain::SolidAngle).is_zero());
    }
}
