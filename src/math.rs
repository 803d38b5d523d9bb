use cgmath::*;

/// Cosine-distributed direction around +z. Malley's method: a uniform
/// polar point on the unit disk lifted onto the hemisphere.
pub fn cosine_sample_hemisphere(u: Point2<f32>) -> Vector3<f32> {
    let r = u.x.sqrt();
    let phi = 2.0 * std::f32::consts::PI * u.y;
    let (sin_phi, cos_phi) = phi.sin_cos();
    let z = (1.0 - u.x).max(0.0).sqrt();
    Vector3::new(r * cos_phi, r * sin_phi, z)
}

pub fn sample_uniform_sphere(u: Point2<f32>) -> Vector3<f32> {
    // z is uniform on [-1, 1], the azimuth is free
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * std::f32::consts::PI * u.y;
    let (sin_phi, cos_phi) = phi.sin_cos();
    Vector3::new(r * cos_phi, r * sin_phi, z)
}

/// Barycentric coordinates uniform over a triangle: points of the unit
/// square above the diagonal are folded back onto the lower half.
pub fn uniform_sample_triangle(u: Point2<f32>) -> Point2<f32> {
    if u.x + u.y > 1.0 {
        Point2::new(1.0 - u.x, 1.0 - u.y)
    } else {
        u
    }
}

/// Orthonormal shading frame around a normal, built from whichever world
/// axis is furthest from it.
#[derive(Clone, Copy)]
pub struct Frame {
    t: Vector3<f32>,
    b: Vector3<f32>,
    n: Vector3<f32>,
}

impl Frame {
    pub fn new(n: Vector3<f32>) -> Frame {
        let helper = if n.x.abs() > 0.9 {
            Vector3::new(0.0, 1.0, 0.0)
        } else {
            Vector3::new(1.0, 0.0, 0.0)
        };
        let b = n.cross(helper).normalize();
        let t = b.cross(n);
        Frame { t, b, n }
    }

    pub fn to_world(&self, v: Vector3<f32>) -> Vector3<f32> {
        self.t * v.x + self.b * v.y + self.n * v.z
    }

    pub fn to_local(&self, v: Vector3<f32>) -> Vector3<f32> {
        Vector3::new(v.dot(self.t), v.dot(self.b), v.dot(self.n))
    }

    pub fn normal(&self) -> Vector3<f32> {
        self.n
    }
}

/// Discrete distribution over a weight table. The cumulative sums are kept
/// unnormalized; sampling scales the random number by the total instead.
pub struct Distribution1D {
    weights: Vec<f32>,
    cumulative: Vec<f32>,
    total: f32,
}

impl Distribution1D {
    pub fn from_weights(weights: Vec<f32>) -> Distribution1D {
        assert!(!weights.is_empty());
        let mut cumulative = Vec::with_capacity(weights.len());
        let mut running = 0.0;
        for w in &weights {
            assert!(*w >= 0.0);
            running += w;
            cumulative.push(running);
        }
        assert!(running > 0.0, "distribution needs at least one positive weight");
        Distribution1D {
            weights,
            cumulative,
            total: running,
        }
    }

    pub fn sample_discrete(&self, u: f32) -> usize {
        let target = u * self.total;
        let i = self.cumulative.partition_point(|&c| c <= target);
        i.min(self.weights.len() - 1)
    }

    pub fn pdf(&self, i: usize) -> f32 {
        self.weights[i] / self.total
    }

    pub fn total(&self) -> f32 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn distribution_sampling() {
        let d = Distribution1D::from_weights(vec![1.0, 2.0, 1.0]);
        assert_approx_eq!(d.total(), 4.0);
        assert_approx_eq!(d.pdf(0), 0.25);
        assert_approx_eq!(d.pdf(1), 0.5);
        assert_eq!(d.sample_discrete(0.1), 0);
        assert_eq!(d.sample_discrete(0.5), 1);
        assert_eq!(d.sample_discrete(0.9), 2);
        // the upper boundary stays in range
        assert_eq!(d.sample_discrete(0.9999999), 2);
    }

    #[test]
    fn frame_round_trip() {
        for n in [
            Vector3::new(0.3, -0.5, 0.8).normalize(),
            Vector3::new(0.99, 0.1, 0.0).normalize(),
            Vector3::new(0.0, 0.0, -1.0),
        ] {
            let frame = Frame::new(n);
            let v = Vector3::new(0.2, 0.7, -0.4);
            let back = frame.to_local(frame.to_world(v));
            assert_approx_eq!(back.x, v.x, 1e-5);
            assert_approx_eq!(back.y, v.y, 1e-5);
            assert_approx_eq!(back.z, v.z, 1e-5);
            // the z axis of the frame is the normal
            assert_approx_eq!(frame.to_world(Vector3::new(0.0, 0.0, 1.0)).dot(n), 1.0, 1e-5);
        }
    }

    #[test]
    fn warps_stay_in_range() {
        let d = cosine_sample_hemisphere(Point2::new(0.3, 0.7));
        assert_approx_eq!(d.magnitude(), 1.0, 1e-5);
        assert!(d.z >= 0.0);
        let s = sample_uniform_sphere(Point2::new(0.1, 0.9));
        assert_approx_eq!(s.magnitude(), 1.0, 1e-5);
        // folded triangle samples satisfy u + v <= 1
        let b = uniform_sample_triangle(Point2::new(0.8, 0.7));
        assert!(b.x + b.y <= 1.0);
        assert!(b.x >= 0.0 && b.y >= 0.0);
    }
}
