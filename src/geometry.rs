use cgmath::*;

use crate::bsdfs::BSDF;
use crate::math::{uniform_sample_triangle, Distribution1D, Frame};
use crate::structure::*;

/// Surface hit record. `wi` is the incoming direction expressed in the
/// shading frame (pointing away from the surface, toward the ray origin).
pub struct Intersection<'scene> {
    pub dist: f32,
    pub p: Point3<f32>,
    pub n_g: Vector3<f32>,
    pub n_s: Vector3<f32>,
    pub frame: Frame,
    pub wi: Vector3<f32>,
    pub mesh: &'scene Mesh,
}

impl<'scene> Intersection<'scene> {
    pub fn new(dist: f32, p: Point3<f32>, n: Vector3<f32>, ray_d: Vector3<f32>, mesh: &'scene Mesh) -> Intersection<'scene> {
        let frame = Frame::new(n);
        let wi = frame.to_local(-ray_d);
        Intersection {
            dist,
            p,
            n_g: n,
            n_s: n,
            frame,
            wi,
            mesh,
        }
    }

    pub fn cos_theta(&self) -> f32 {
        self.wi.z
    }

    pub fn to_local(&self, d: &Vector3<f32>) -> Vector3<f32> {
        self.frame.to_local(*d)
    }
}

/// (Triangle) Mesh information
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Point3<f32>>,
    pub indices: Vec<Vector3<usize>>,
    pub bsdf: Box<dyn BSDF>,
    pub emission: Color,
    pub cdf: Distribution1D,
}

impl Mesh {
    pub fn new(
        name: &str,
        vertices: Vec<Point3<f32>>,
        indices: Vec<Vector3<usize>>,
        bsdf: Box<dyn BSDF>,
    ) -> Mesh {
        // Distribution over the triangle areas for uniform surface sampling
        let areas = indices
            .iter()
            .map(|idx| {
                let v0 = vertices[idx.x];
                let v1 = vertices[idx.y];
                let v2 = vertices[idx.z];
                (v1 - v0).cross(v2 - v0).magnitude() * 0.5
            })
            .collect();

        Mesh {
            name: name.to_owned(),
            vertices,
            indices,
            bsdf,
            emission: Color::zero(),
            cdf: Distribution1D::from_weights(areas),
        }
    }

    pub fn is_light(&self) -> bool {
        !self.emission.is_zero()
    }

    pub fn total_area(&self) -> f32 {
        self.cdf.total()
    }

    /// Area pdf of the uniform surface sampling
    pub fn pdf(&self) -> f32 {
        1.0 / self.cdf.total()
    }

    /// Uniformly sample a point on the mesh surface
    pub fn sample(&self, s: f32, uv: Point2<f32>) -> SampledPosition {
        let id_tri = self.cdf.sample_discrete(s);
        let idx = self.indices[id_tri];
        let v0 = self.vertices[idx.x];
        let v1 = self.vertices[idx.y];
        let v2 = self.vertices[idx.z];

        let b = uniform_sample_triangle(uv);
        let p = Point3::from_vec(v0.to_vec() * (1.0 - b.x - b.y) + v1.to_vec() * b.x + v2.to_vec() * b.y);
        let n = (v1 - v0).cross(v2 - v0).normalize();
        SampledPosition {
            p,
            n,
            pdf: PDF::Area(self.pdf()),
        }
    }

    /// Moller-Trumbore intersection against triangle `i`.
    /// Updates `its` and returns true when a closer hit is found.
    pub fn intersection_tri(&self, i: usize, ray: &Ray, its: &mut IntersectionUV) -> bool {
        let idx = self.indices[i];
        let v0 = self.vertices[idx.x];
        let v1 = self.vertices[idx.y];
        let v2 = self.vertices[idx.z];

        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let p = ray.d.cross(e2);
        let det = e1.dot(p);
        if det.abs() < 1e-8 {
            return false;
        }
        let inv_det = 1.0 / det;
        let t_vec = ray.o - v0;
        let u = t_vec.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return false;
        }
        let q = t_vec.cross(e1);
        let v = ray.d.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return false;
        }
        let t = e2.dot(q) * inv_det;
        if t <= ray.tnear || t >= ray.tfar || t >= its.t {
            return false;
        }

        its.t = t;
        its.p = ray.o + ray.d * t;
        its.n = e1.cross(e2).normalize();
        its.u = u;
        its.v = v;
        true
    }
}

/// Scratch record filled by the triangle intersection routine
pub struct IntersectionUV {
    pub t: f32,
    pub p: Point3<f32>,
    pub n: Vector3<f32>,
    pub u: f32,
    pub v: f32,
}

impl Default for IntersectionUV {
    fn default() -> Self {
        IntersectionUV {
            t: std::f32::MAX,
            p: Point3::new(0.0, 0.0, 0.0),
            n: Vector3::new(0.0, 0.0, 0.0),
            u: 0.0,
            v: 0.0,
        }
    }
}

/// Build the two triangles of a quad from a corner and two edge vectors.
/// The normal follows the right-hand rule (e1 x e2).
pub fn quad(
    corner: Point3<f32>,
    e1: Vector3<f32>,
    e2: Vector3<f32>,
) -> (Vec<Point3<f32>>, Vec<Vector3<usize>>) {
    let vertices = vec![corner, corner + e1, corner + e1 + e2, corner + e2];
    let indices = vec![Vector3::new(0, 1, 2), Vector3::new(0, 2, 3)];
    (vertices, indices)
}
