use cgmath::*;

use crate::accel::Acceleration;
use crate::camera::Camera;
use crate::constants::EPSILON;
use crate::emitter::{Emitter, EmitterSampler};
use crate::paths::edge::PathEdge;
use crate::paths::vertex::*;
use crate::samplers::Sampler;
use crate::scene::Scene;
use crate::structure::*;

/// Preallocated pdf arrays for the MIS computation (one per worker, so a
/// `trace_sample` call never allocates).
pub struct MisScratch {
    pub forward: Vec<f32>,
    pub backward: Vec<f32>,
}

impl MisScratch {
    pub fn new(max_bounces: usize) -> MisScratch {
        let n = 2 * (max_bounces + 2);
        MisScratch {
            forward: vec![0.0; n],
            backward: vec![0.0; n],
        }
    }
}

/// Bounded vertex + edge sequence. The root occupies an internal slot:
/// `vertex(0)` is the first committed endpoint vertex and `len()` counts
/// committed vertices only.
pub struct LightPath<'scene> {
    vertices: Vec<PathVertex<'scene>>,
    edges: Vec<PathEdge>,
    max_length: usize,
}

impl<'scene> LightPath<'scene> {
    /// `max_length` bounds the number of committed vertices (root excluded)
    pub fn new(max_length: usize) -> LightPath<'scene> {
        LightPath {
            vertices: Vec::with_capacity(max_length + 1),
            edges: Vec::with_capacity(max_length),
            max_length,
        }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
    }

    pub fn start_camera_path(&mut self, camera: &'scene Camera, pixel: Point2<f32>) {
        self.clear();
        self.vertices.push(PathVertex::camera_root(camera, pixel));
    }

    pub fn start_emitter_path(
        &mut self,
        emitters: &'scene EmitterSampler,
        sampler: &mut dyn Sampler,
    ) {
        self.clear();
        let (sel_pdf, emitter) = emitters.random_select_emitter(sampler.next());
        self.vertices
            .push(PathVertex::emitter_root(emitter, sel_pdf));
    }

    /// Number of committed vertices, root excluded
    pub fn len(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vertex(&self, i: usize) -> &PathVertex<'scene> {
        &self.vertices[i + 1]
    }

    /// Edge from vertex `i` to vertex `i + 1`
    pub fn edge(&self, i: usize) -> &PathEdge {
        &self.edges[i]
    }

    /// Iterated `scatter` from the root: each call commits one vertex and,
    /// past the endpoint, one edge. Stops on the length bound or the first
    /// failed extension.
    pub fn trace_path(
        &mut self,
        accel: &'scene dyn Acceleration,
        sampler: &mut dyn Sampler,
        state: &mut TraceState,
    ) {
        assert!(!self.vertices.is_empty());
        while self.len() < self.max_length {
            let n = self.vertices.len();
            let prev_edge = if n >= 3 { Some(self.edges[n - 3]) } else { None };
            let (head, tail) = self.vertices.split_at_mut(n - 1);
            let curr = &mut tail[0];
            let prev = head.last_mut();
            match curr.scatter(accel, sampler, state, prev, prev_edge.as_ref()) {
                Some((next, edge)) => {
                    if let Some(e) = edge {
                        self.edges.push(e);
                    }
                    self.vertices.push(next);
                }
                None => break,
            }
        }
    }

    /// Visibility test plus full geometric throughput of the connected
    /// path, before MIS weighting.
    pub fn connect(
        accel: &dyn Acceleration,
        a: &PathVertex,
        b: &PathVertex,
    ) -> Color {
        let edge = PathEdge::between(a, b);
        if edge.dist <= EPSILON {
            return Color::zero();
        }
        let mut ray = Ray::new(a.pos(), edge.d);
        ray.tnear = 1e-4;
        ray.tfar = edge.dist * (1.0 - 1e-4);
        if accel.occluded(&ray) {
            return Color::zero();
        }
        a.throughput * a.eval(&edge.d) * b.eval(&-edge.d) * b.throughput / edge.dist_sq
    }

    /// Camera-splat connection: the `t = 0` family. Asks the camera for its
    /// response toward `b` and returns the splat weight plus the raster
    /// position receiving it. None when the direction misses the sensor.
    pub fn connect_camera(
        accel: &dyn Acceleration,
        a: &PathVertex,
        b: &PathVertex,
    ) -> Option<(Color, Point2<f32>)> {
        let camera = match a.record {
            VertexRecord::Camera(ref r) => r.camera,
            _ => return None,
        };
        let edge = PathEdge::between(a, b);
        if edge.dist <= EPSILON {
            return None;
        }
        let (importance, raster) = camera.eval_direction(&edge.d)?;
        let mut ray = Ray::new(a.pos(), edge.d);
        ray.tnear = 1e-4;
        ray.tfar = edge.dist * (1.0 - 1e-4);
        if accel.occluded(&ray) {
            return None;
        }
        let weight = importance * a.throughput * b.eval(&-edge.d) * b.throughput / edge.dist_sq;
        Some((weight, raster))
    }

    /// Balance-heuristic weight of the `(s, t)` decomposition: the first
    /// `s + 1` emitter vertices connected to the first `t + 1` camera
    /// vertices. Stored pdfs cover the actual sampling strategy; the four
    /// slots around the connection are recomputed since traversing the
    /// connection differs from the directions the vertices were sampled
    /// under.
    pub fn mis_weight(
        camera: &LightPath,
        emitter: &LightPath,
        s: usize,
        t: usize,
        scratch: &mut MisScratch,
    ) -> f32 {
        let num_verts = s + t + 2;
        let pdf_forward = &mut scratch.forward;
        let pdf_backward = &mut scratch.backward;

        for i in 0..=s {
            pdf_forward[i] = emitter.vertex(i).pdf_forward;
            pdf_backward[i] = emitter.vertex(i).pdf_backward;
        }
        // the camera path was sampled tail-first relative to the combined
        // path: forward and backward swap
        for i in 0..=t {
            pdf_forward[num_verts - 1 - i] = camera.vertex(i).pdf_backward;
            pdf_backward[num_verts - 1 - i] = camera.vertex(i).pdf_forward;
        }

        let edge = PathEdge::between(emitter.vertex(s), camera.vertex(t));
        let prev_e = if s == 0 {
            None
        } else {
            Some((emitter.vertex(s - 1), emitter.edge(s - 1)))
        };
        let (f, b) = emitter.vertex(s).eval_pdfs(prev_e, camera.vertex(t), &edge);
        pdf_forward[s + 1] = f;
        if s > 0 {
            pdf_backward[s - 1] = b;
        }

        let rev = edge.reverse();
        let prev_c = if t == 0 {
            None
        } else {
            Some((camera.vertex(t - 1), camera.edge(t - 1)))
        };
        let (f, b) = camera.vertex(t).eval_pdfs(prev_c, emitter.vertex(s), &rev);
        pdf_backward[s] = f;
        if t > 0 {
            pdf_forward[s + 2] = b;
        }

        // walk the split point toward the camera side...
        let mut weight = 1.0;
        let mut pi = 1.0;
        for i in s..(s + t) {
            pi = ratio(pi, pdf_forward[i + 1], pdf_backward[i + 1]);
            weight += pi;
        }
        // ...then toward the emitter side. The i = 0 strategy is excluded:
        // the emitter-path builder is the only strategy family sampling
        // emitter endpoints here.
        pi = 1.0;
        for i in (1..s).rev() {
            pi = ratio(pi, pdf_backward[i + 1], pdf_forward[i + 1]);
            weight += pi;
        }

        1.0 / weight
    }

    /// Direct-hit emission gathered along a camera path, weighted against
    /// the hypothetical connection strategies for the same paths. The pdf
    /// arrays mirror `mis_weight` with this path's terminal vertex standing
    /// in for the emitter endpoint.
    pub fn weighted_path_emission(
        &self,
        scene: &Scene,
        scratch: &mut MisScratch,
    ) -> Color {
        let mut l = Color::zero();
        for t in 1..self.len() {
            let v = self.vertex(t);
            let (its, emission) = match v.record {
                VertexRecord::Surface(ref r) if !r.emission.is_zero() => (&r.its, r.emission),
                _ => continue,
            };

            let num_verts = t + 1;
            let pdf_forward = &mut scratch.forward;
            let pdf_backward = &mut scratch.backward;

            // slot 0: the emissive hit treated as an emitter endpoint
            let sel_pdf = scene.emitters.pdf(its.mesh);
            pdf_forward[0] = sel_pdf * its.mesh.position_pdf();
            pdf_backward[0] = v.pdf_forward;

            // slot 1: the light emitting toward the previous vertex
            let last_edge = self.edge(t - 1);
            let pos = SampledPosition {
                p: its.p,
                n: its.n_g,
                pdf: PDF::Area(its.mesh.position_pdf()),
            };
            pdf_forward[1] = Emitter::direction_pdf(its.mesh, &pos, &-last_edge.d).value()
                * self.vertex(t - 1).cosine_factor(&last_edge.d)
                / last_edge.dist_sq;
            pdf_backward[1] = self.vertex(t - 1).pdf_forward;
            for i in 2..num_verts {
                pdf_forward[i] = self.vertex(t - i).pdf_backward;
                pdf_backward[i] = self.vertex(t - i).pdf_forward;
            }

            // hypothetical splits; a split adjacent to a Dirac vertex has
            // no matching sampling strategy and contributes nothing
            let mut weight = 1.0;
            let mut pi = ratio(1.0, pdf_forward[0], pdf_backward[0]);
            for k in 1..num_verts - 1 {
                pi = ratio(pi, pdf_forward[k], pdf_backward[k]);
                if self.vertex(t - k).connectable() && self.vertex(t - k - 1).connectable() {
                    weight += pi;
                }
            }

            l += emission * v.throughput * (1.0 / weight);
        }
        l
    }
}

fn ratio(pi: f32, num: f32, denom: f32) -> f32 {
    if denom > 0.0 {
        pi * num / denom
    } else {
        0.0
    }
}
