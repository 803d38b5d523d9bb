use cgmath::*;

use crate::constants::EPSILON;
use crate::geometry::{Intersection, IntersectionUV};
use crate::scene::Scene;
use crate::structure::*;

pub trait Acceleration: Sync + Send {
    fn trace(&self, ray: &Ray) -> Option<Intersection>;
    /// True when something blocks the ray inside its `[tnear, tfar]` window
    fn occluded(&self, ray: &Ray) -> bool;
    fn visible(&self, p0: &Point3<f32>, p1: &Point3<f32>) -> bool;
}

pub struct NaiveAcceleration<'scene> {
    pub scene: &'scene Scene,
}

impl<'scene> NaiveAcceleration<'scene> {
    pub fn new(scene: &'scene Scene) -> NaiveAcceleration<'scene> {
        NaiveAcceleration { scene }
    }
}

impl<'a> Acceleration for NaiveAcceleration<'a> {
    fn trace(&self, ray: &Ray) -> Option<Intersection> {
        let mut its = IntersectionUV::default();
        let mut hit_mesh = None;

        for m in self.scene.meshes.iter() {
            for i in 0..m.indices.len() {
                if m.intersection_tri(i, ray, &mut its) {
                    hit_mesh = Some(m);
                }
            }
        }

        hit_mesh.map(|m| Intersection::new(its.t, its.p, its.n, ray.d, m))
    }

    fn occluded(&self, ray: &Ray) -> bool {
        let mut its = IntersectionUV::default();
        for m in self.scene.meshes.iter() {
            for i in 0..m.indices.len() {
                if m.intersection_tri(i, ray, &mut its) {
                    return true;
                }
            }
        }
        false
    }

    fn visible(&self, p0: &Point3<f32>, p1: &Point3<f32>) -> bool {
        let mut d = p1 - p0;
        let dist = d.magnitude();
        if dist == 0.0 {
            return false;
        }
        d /= dist;
        let mut ray = Ray::new(*p0, d);
        ray.tnear = EPSILON;
        ray.tfar = dist * (1.0 - EPSILON);
        !self.occluded(&ray)
    }
}
