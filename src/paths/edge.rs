use cgmath::*;

use crate::paths::vertex::PathVertex;

/// Geometric connector between two path vertices
#[derive(Clone, Copy)]
pub struct PathEdge {
    /// Unit direction from the start vertex to the end vertex
    pub d: Vector3<f32>,
    pub dist: f32,
    pub dist_sq: f32,
}

impl PathEdge {
    pub fn new(d: Vector3<f32>, dist: f32) -> PathEdge {
        PathEdge {
            d,
            dist,
            dist_sq: dist * dist,
        }
    }

    /// Edge from `a` to `b`. Never constructed with a root on either side.
    pub fn between(a: &PathVertex, b: &PathVertex) -> PathEdge {
        let mut d = b.pos() - a.pos();
        let dist = d.magnitude();
        if dist != 0.0 {
            d /= dist;
        }
        PathEdge::new(d, dist)
    }

    pub fn reverse(&self) -> PathEdge {
        PathEdge {
            d: -self.d,
            dist: self.dist,
            dist_sq: self.dist_sq,
        }
    }
}
