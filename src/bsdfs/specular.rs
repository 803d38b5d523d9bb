use crate::bsdfs::*;

/// Perfect mirror
pub struct BSDFSpecular {
    pub specular: Color,
}

impl BSDF for BSDFSpecular {
    fn sample(&self, d_in: &Vector3<f32>, _: Point2<f32>) -> Option<SampledDirection> {
        if d_in.z <= 0.0 {
            None
        } else {
            Some(SampledDirection {
                weight: self.specular,
                d: reflect(d_in),
                pdf: PDF::Discrete(1.0),
            })
        }
    }

    fn pdf(&self, d_in: &Vector3<f32>, d_out: &Vector3<f32>, domain: Domain) -> PDF {
        match domain {
            // a Dirac component has no density against the solid-angle measure
            Domain::SolidAngle => PDF::SolidAngle(0.0),
            _ => {
                if check_reflection_condition(d_in, d_out) {
                    PDF::Discrete(1.0)
                } else {
                    PDF::Discrete(0.0)
                }
            }
        }
    }

    fn eval(&self, d_in: &Vector3<f32>, d_out: &Vector3<f32>, domain: Domain) -> Color {
        match domain {
            Domain::SolidAngle => Color::zero(),
            _ => {
                if check_reflection_condition(d_in, d_out) {
                    self.specular
                } else {
                    Color::zero()
                }
            }
        }
    }

    fn is_smooth(&self) -> bool {
        true
    }
}
