use cgmath::*;

use crate::accel::Acceleration;
use crate::bsdfs::{SampledDirection, BSDF};
use crate::camera::Camera;
use crate::emitter::Emitter;
use crate::geometry::Intersection;
use crate::paths::edge::PathEdge;
use crate::samplers::Sampler;
use crate::structure::*;
use crate::volume::PhaseFunction;

/// Mutable state threaded through a path construction
pub struct TraceState {
    pub ray: Ray,
    pub bounce: u32,
    /// Russian roulette kicks in past this bounce count
    pub rr_depth: u32,
}

impl TraceState {
    pub fn new(rr_depth: u32) -> TraceState {
        TraceState {
            ray: Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0)),
            bounce: 0,
            rr_depth,
        }
    }
}

/// A direction sampled at an endpoint vertex
#[derive(Clone, Copy)]
pub struct DirectionSample {
    pub d: Vector3<f32>,
    pub pdf: f32,
    pub weight: Color,
}

pub struct EmitterRootRecord<'scene> {
    pub emitter: &'scene dyn Emitter,
    pub sel_pdf: f32,
    pub sel_weight: f32,
    pub point: Option<(SampledPosition, Color)>,
}

pub struct CameraRootRecord<'scene> {
    pub camera: &'scene Camera,
    pub pixel: Point2<f32>,
    pub point: Option<(SampledPosition, Color)>,
}

pub struct EmitterRecord<'scene> {
    pub emitter: &'scene dyn Emitter,
    pub point: SampledPosition,
    pub direction: Option<DirectionSample>,
}

pub struct CameraRecord<'scene> {
    pub camera: &'scene Camera,
    pub pixel: Point2<f32>,
    pub point: SampledPosition,
    pub direction: Option<DirectionSample>,
}

pub struct SurfaceRecord<'scene> {
    pub its: Intersection<'scene>,
    pub sampled: Option<SampledDirection>,
    /// Emission captured when the hit lands on a light, front side only
    pub emission: Color,
}

pub struct VolumeRecord {
    pub phase: PhaseFunction,
    pub p: Point3<f32>,
    pub d_in: Vector3<f32>,
    pub sampled: Option<DirectionSample>,
}

/// The five vertex kinds plus the two position-only roots
pub enum VertexRecord<'scene> {
    EmitterRoot(EmitterRootRecord<'scene>),
    CameraRoot(CameraRootRecord<'scene>),
    Emitter(EmitterRecord<'scene>),
    Camera(CameraRecord<'scene>),
    Surface(SurfaceRecord<'scene>),
    Volume(VolumeRecord),
}

/// A stop on a light transport path. `pdf_forward`/`pdf_backward` are area
/// measure densities of reaching this vertex from its predecessor/successor.
pub struct PathVertex<'scene> {
    pub record: VertexRecord<'scene>,
    pub throughput: Color,
    pub pdf_forward: f32,
    pub pdf_backward: f32,
}

impl<'scene> PathVertex<'scene> {
    pub fn emitter_root(emitter: &'scene dyn Emitter, sel_pdf: f32) -> PathVertex<'scene> {
        PathVertex {
            record: VertexRecord::EmitterRoot(EmitterRootRecord {
                emitter,
                sel_pdf,
                sel_weight: 1.0 / sel_pdf,
                point: None,
            }),
            throughput: Color::one(),
            pdf_forward: 1.0,
            pdf_backward: 0.0,
        }
    }

    pub fn camera_root(camera: &'scene Camera, pixel: Point2<f32>) -> PathVertex<'scene> {
        PathVertex {
            record: VertexRecord::CameraRoot(CameraRootRecord {
                camera,
                pixel,
                point: None,
            }),
            throughput: Color::one(),
            pdf_forward: 1.0,
            pdf_backward: 0.0,
        }
    }

    pub fn surface(its: Intersection<'scene>, throughput: Color) -> PathVertex<'scene> {
        let emission = if its.mesh.is_light() && its.cos_theta() > 0.0 {
            its.mesh.emission
        } else {
            Color::zero()
        };
        PathVertex {
            record: VertexRecord::Surface(SurfaceRecord {
                its,
                sampled: None,
                emission,
            }),
            throughput,
            pdf_forward: 0.0,
            pdf_backward: 0.0,
        }
    }

    /// The factor this vertex contributes to the path throughput when the
    /// path is extended past it.
    pub fn weight(&self) -> Color {
        match self.record {
            VertexRecord::EmitterRoot(ref r) => match r.point {
                Some((_, w)) => w * r.sel_weight,
                None => Color::zero(),
            },
            VertexRecord::CameraRoot(ref r) => match r.point {
                Some((_, w)) => w,
                None => Color::zero(),
            },
            VertexRecord::Emitter(ref r) => r.direction.map_or(Color::zero(), |d| d.weight),
            VertexRecord::Camera(ref r) => r.direction.map_or(Color::zero(), |d| d.weight),
            VertexRecord::Surface(ref r) => r.sampled.map_or(Color::zero(), |s| s.weight),
            VertexRecord::Volume(ref r) => r.sampled.map_or(Color::zero(), |s| s.weight),
        }
    }

    /// Forward pdf in the natural measure of the sampling step that
    /// produced this vertex (before any geometric conversion).
    pub fn pdf(&self) -> f32 {
        match self.record {
            VertexRecord::EmitterRoot(ref r) => {
                r.sel_pdf * r.point.map_or(0.0, |(p, _)| p.pdf.value())
            }
            VertexRecord::CameraRoot(ref r) => r.point.map_or(0.0, |(p, _)| p.pdf.value()),
            VertexRecord::Emitter(ref r) => r.direction.map_or(0.0, |d| d.pdf),
            VertexRecord::Camera(ref r) => r.direction.map_or(0.0, |d| d.pdf),
            VertexRecord::Surface(ref r) => r.sampled.map_or(0.0, |s| s.pdf.value()),
            VertexRecord::Volume(ref r) => r.sampled.map_or(0.0, |s| s.pdf),
        }
    }

    /// Directional pdf of the incoming direction given the outgoing (the
    /// flipped query). Only scatter vertices have one.
    pub fn reverse_pdf(&self) -> f32 {
        match self.record {
            VertexRecord::Surface(ref r) => match r.sampled {
                Some(s) => r
                    .its
                    .mesh
                    .bsdf
                    .pdf(&s.d, &r.its.wi, Domain::SolidAngle)
                    .value(),
                None => 0.0,
            },
            VertexRecord::Volume(ref r) => match r.sampled {
                Some(s) => r.phase.pdf(&s.d, &r.d_in),
                None => 0.0,
            },
            _ => 0.0,
        }
    }

    pub fn pos(&self) -> Point3<f32> {
        match self.record {
            VertexRecord::EmitterRoot(_) | VertexRecord::CameraRoot(_) => Point3::new(0.0, 0.0, 0.0),
            VertexRecord::Emitter(ref r) => r.point.p,
            VertexRecord::Camera(ref r) => r.point.p,
            VertexRecord::Surface(ref r) => r.its.p,
            VertexRecord::Volume(ref r) => r.p,
        }
    }

    /// |N_g . d| for vertices carrying a geometric normal, 1 otherwise
    pub fn cosine_factor(&self, d: &Vector3<f32>) -> f32 {
        match self.record {
            VertexRecord::Emitter(ref r) => r.point.n.dot(*d).abs(),
            VertexRecord::Camera(ref r) => r.point.n.dot(*d).abs(),
            VertexRecord::Surface(ref r) => r.its.n_g.dot(*d).abs(),
            _ => 1.0,
        }
    }

    /// Whether this vertex can take part in a deterministic connection
    pub fn connectable(&self) -> bool {
        match self.record {
            VertexRecord::Surface(ref r) => !r.its.mesh.bsdf.is_smooth(),
            VertexRecord::Emitter(_) | VertexRecord::Camera(_) | VertexRecord::Volume(_) => true,
            VertexRecord::EmitterRoot(_) | VertexRecord::CameraRoot(_) => false,
        }
    }

    /// Outgoing radiance/throughput toward `d` when this vertex is
    /// connected to an external partner. Cameras only answer through the
    /// dedicated splat connection.
    pub fn eval(&self, d: &Vector3<f32>) -> Color {
        match self.record {
            VertexRecord::Emitter(ref r) => r.emitter.eval(&r.point.n, d),
            VertexRecord::Surface(ref r) => r.its.mesh.bsdf.eval(
                &r.its.wi,
                &r.its.frame.to_local(*d),
                Domain::SolidAngle,
            ),
            VertexRecord::Volume(ref r) => r.phase.eval(&r.d_in, d),
            _ => Color::zero(),
        }
    }

    /// Area-measure pdfs of traversing the connection: forward is the pdf
    /// of moving from this vertex to `next`, backward the pdf of moving
    /// from this vertex to `prev`. The conversions happen at the receiving
    /// vertex of each transition.
    pub fn eval_pdfs(
        &self,
        prev: Option<(&PathVertex, &PathEdge)>,
        next: &PathVertex,
        next_edge: &PathEdge,
    ) -> (f32, f32) {
        match self.record {
            VertexRecord::EmitterRoot(ref r) => {
                (r.point.map_or(0.0, |(p, _)| p.pdf.value()), 0.0)
            }
            VertexRecord::CameraRoot(ref r) => (r.point.map_or(0.0, |(p, _)| p.pdf.value()), 0.0),
            VertexRecord::Emitter(ref r) => {
                let forward = r.emitter.direction_pdf(&r.point, &next_edge.d).value()
                    * next.cosine_factor(&next_edge.d)
                    / next_edge.dist_sq;
                // the root -> endpoint step has no directional density
                (forward, 1.0)
            }
            VertexRecord::Camera(ref r) => {
                let forward = r.camera.direction_pdf(&next_edge.d).value()
                    * next.cosine_factor(&next_edge.d)
                    / next_edge.dist_sq;
                (forward, 1.0)
            }
            VertexRecord::Surface(ref r) => {
                let (prev_v, prev_e) = match prev {
                    Some(p) => p,
                    None => return (0.0, 0.0),
                };
                let d_prev = r.its.frame.to_local(-prev_e.d);
                let d_next = r.its.frame.to_local(next_edge.d);
                let forward = r
                    .its
                    .mesh
                    .bsdf
                    .pdf(&d_prev, &d_next, Domain::SolidAngle)
                    .value()
                    * next.cosine_factor(&next_edge.d)
                    / next_edge.dist_sq;
                let backward = r
                    .its
                    .mesh
                    .bsdf
                    .pdf(&d_next, &d_prev, Domain::SolidAngle)
                    .value()
                    * prev_v.cosine_factor(&prev_e.d)
                    / prev_e.dist_sq;
                (forward, backward)
            }
            VertexRecord::Volume(ref r) => {
                let (prev_v, prev_e) = match prev {
                    Some(p) => p,
                    None => return (0.0, 0.0),
                };
                let d_prev = -prev_e.d;
                let d_next = next_edge.d;
                let forward = r.phase.pdf(&d_prev, &d_next) * next.cosine_factor(&next_edge.d)
                    / next_edge.dist_sq;
                let backward = r.phase.pdf(&d_next, &d_prev) * prev_v.cosine_factor(&prev_e.d)
                    / prev_e.dist_sq;
                (forward, backward)
            }
        }
    }

    /// Core path extension primitive: sample a successor for this vertex.
    /// Returns the new vertex and, for non-root vertices, the edge that
    /// reaches it. `prev` gets its `pdf_backward` filled in once the
    /// outgoing direction is known.
    pub fn scatter(
        &mut self,
        accel: &'scene dyn Acceleration,
        sampler: &mut dyn Sampler,
        state: &mut TraceState,
        prev: Option<&mut PathVertex<'scene>>,
        prev_edge: Option<&PathEdge>,
    ) -> Option<(PathVertex<'scene>, Option<PathEdge>)> {
        let pdf;
        match self.record {
            VertexRecord::EmitterRoot(ref mut r) => {
                let (pos, w) = r.emitter.sample_position(sampler.next(), sampler.next2d());
                if pos.pdf.is_zero() {
                    return None;
                }
                r.point = Some((pos, w));
                let next = PathVertex {
                    record: VertexRecord::Emitter(EmitterRecord {
                        emitter: r.emitter,
                        point: pos,
                        direction: None,
                    }),
                    // the root weight: position sample times emitter selection
                    throughput: w * r.sel_weight,
                    pdf_forward: pos.pdf.value(),
                    pdf_backward: 0.0,
                };
                return Some((next, None));
            }
            VertexRecord::CameraRoot(ref mut r) => {
                let (pos, w) = r.camera.sample_position();
                r.point = Some((pos, w));
                let next = PathVertex {
                    record: VertexRecord::Camera(CameraRecord {
                        camera: r.camera,
                        pixel: r.pixel,
                        point: pos,
                        direction: None,
                    }),
                    throughput: w,
                    pdf_forward: pos.pdf.value(),
                    pdf_backward: 0.0,
                };
                return Some((next, None));
            }
            VertexRecord::Emitter(ref mut r) => {
                let (d, dpdf, w) = r.emitter.sample_direction(&r.point, sampler.next2d());
                if dpdf.is_zero() {
                    return None;
                }
                r.direction = Some(DirectionSample {
                    d,
                    pdf: dpdf.value(),
                    weight: w,
                });
                if let Some(prev) = prev {
                    prev.pdf_backward = 1.0;
                }
                pdf = dpdf.value();
                state.ray = Ray::new(r.point.p, d);
            }
            VertexRecord::Camera(ref mut r) => {
                let (d, dpdf, w) = r.camera.sample_direction(r.pixel);
                if dpdf.is_zero() {
                    return None;
                }
                r.direction = Some(DirectionSample {
                    d,
                    pdf: dpdf.value(),
                    weight: w,
                });
                if let Some(prev) = prev {
                    prev.pdf_backward = 1.0;
                }
                pdf = dpdf.value();
                state.ray = Ray::new(r.point.p, d);
            }
            VertexRecord::Surface(ref mut r) => {
                // BSDF sampling, Russian roulette past rr_depth
                let mut sampled = r.its.mesh.bsdf.sample(&r.its.wi, sampler.next2d())?;
                if state.bounce >= state.rr_depth {
                    let rr = (self.throughput * sampled.weight).channel_max().min(0.95);
                    if rr <= 0.0 || sampler.next() > rr {
                        return None;
                    }
                    sampled.weight /= rr;
                }
                let d_world = r.its.frame.to_world(sampled.d);
                // the reverse density toward the previous vertex is known
                // only now that the outgoing direction exists
                let rev = r
                    .its
                    .mesh
                    .bsdf
                    .pdf(&sampled.d, &r.its.wi, Domain::SolidAngle)
                    .value();
                r.sampled = Some(sampled);
                if let (Some(prev), Some(pe)) = (prev, prev_edge) {
                    prev.pdf_backward = rev * prev.cosine_factor(&pe.d) / pe.dist_sq;
                }
                pdf = sampled.pdf.value();
                state.ray = Ray::new(r.its.p, d_world);
            }
            VertexRecord::Volume(_) => {
                // TODO: participating media transport is not wired up yet
                return None;
            }
        }

        // Shared tracing tail: cast the continuation ray and commit the
        // next surface vertex with its area-measure forward density.
        let its = accel.trace(&state.ray)?;
        state.bounce += 1;
        let throughput = self.throughput * self.weight();
        let mut next = PathVertex::surface(its, throughput);
        let edge = PathEdge::between(self, &next);
        if edge.dist_sq == 0.0 {
            return None;
        }
        next.pdf_forward = pdf * next.cosine_factor(&edge.d) / edge.dist_sq;
        if next.pdf_forward <= 0.0 {
            return None;
        }
        Some((next, Some(edge)))
    }
}
