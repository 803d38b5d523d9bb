use cgmath::Point2;
use pbr::ProgressBar;
use rayon::prelude::*;
use std::sync::Mutex;

use crate::accel::Acceleration;
use crate::integrators::*;
use crate::paths::path::{LightPath, MisScratch};
use crate::paths::vertex::TraceState;
use crate::samplers::Sampler;
use crate::scene::Scene;
use crate::structure::Color;
use crate::Scale;

/// Bidirectional path tracer: camera and emitter subpaths are built per
/// pixel sample, every prefix pair is connected and weighted with the
/// balance heuristic. The `t = 0` family splats onto the shared atomic
/// framebuffer instead of the current pixel.
pub struct IntegratorBidir {
    pub max_bounces: usize,
    pub rr_depth: u32,
}

/// Per-worker reusable state: both subpaths and the MIS scratch arrays are
/// preallocated so a `trace_sample` call does not allocate.
pub struct PixelContext<'scene> {
    pub camera_path: LightPath<'scene>,
    pub emitter_path: LightPath<'scene>,
    pub scratch: MisScratch,
}

impl<'scene> PixelContext<'scene> {
    pub fn new(max_bounces: usize) -> PixelContext<'scene> {
        PixelContext {
            camera_path: LightPath::new(max_bounces + 1),
            emitter_path: LightPath::new(max_bounces + 1),
            scratch: MisScratch::new(max_bounces),
        }
    }
}

impl IntegratorBidir {
    pub fn trace_sample<'scene>(
        &self,
        pix: Point2<f32>,
        scene: &'scene Scene,
        accel: &'scene dyn Acceleration,
        sampler: &mut dyn Sampler,
        ctx: &mut PixelContext<'scene>,
        splats: &AtomicFramebuffer,
    ) -> Color {
        // Build the two subpaths
        ctx.camera_path.start_camera_path(&scene.camera, pix);
        let mut state = TraceState::new(self.rr_depth);
        ctx.camera_path.trace_path(accel, sampler, &mut state);

        ctx.emitter_path.start_emitter_path(&scene.emitters, sampler);
        let mut state = TraceState::new(self.rr_depth);
        ctx.emitter_path.trace_path(accel, sampler, &mut state);

        // Emission gathered when the camera path lands on a light
        let mut l = ctx
            .camera_path
            .weighted_path_emission(scene, &mut ctx.scratch);

        for s in 0..ctx.emitter_path.len() {
            for t in 0..ctx.camera_path.len() {
                if s + t > self.max_bounces {
                    continue;
                }
                if s == 0 && t == 0 {
                    // directly visible emitters are already handled by the
                    // path emission estimator
                    continue;
                }
                let a = ctx.emitter_path.vertex(s);
                let b = ctx.camera_path.vertex(t);
                if !a.connectable() || !b.connectable() {
                    continue;
                }

                if t == 0 {
                    // light tracing family: splat on the pixel the camera
                    // reports, never on the current one
                    if let Some((w, raster)) = LightPath::connect_camera(accel, b, a) {
                        if !w.is_zero() {
                            let mis = LightPath::mis_weight(
                                &ctx.camera_path,
                                &ctx.emitter_path,
                                s,
                                t,
                                &mut ctx.scratch,
                            );
                            splats.splat(raster, w * mis);
                        }
                    }
                } else {
                    let c = LightPath::connect(accel, a, b);
                    if !c.is_zero() {
                        let mis = LightPath::mis_weight(
                            &ctx.camera_path,
                            &ctx.emitter_path,
                            s,
                            t,
                            &mut ctx.scratch,
                        );
                        l += c * mis;
                    }
                }
            }
        }
        l
    }
}

impl Integrator for IntegratorBidir {
    fn compute(
        &mut self,
        sampler: &mut dyn Sampler,
        accel: &dyn Acceleration,
        scene: &Scene,
    ) -> ImageBlock {
        assert_ne!(scene.nb_samples(), 0);
        let mut image_blocks = split_into_blocks(*scene.camera.size(), 16);
        let mut samplers: Vec<Box<dyn Sampler>> =
            image_blocks.iter().map(|_| sampler.clone_box()).collect();

        let splats = AtomicFramebuffer::new(*scene.camera.size());
        let progress_bar = Mutex::new(ProgressBar::new(image_blocks.len() as u64));
        let this = &*self;

        let pool = build_pool(scene.nb_threads);
        pool.install(|| {
            image_blocks
                .par_iter_mut()
                .zip(samplers.par_iter_mut())
                .for_each(|(im_block, s)| {
                    let mut ctx = PixelContext::new(this.max_bounces);
                    for iy in 0..im_block.size.y {
                        for ix in 0..im_block.size.x {
                            for _ in 0..scene.nb_samples() {
                                let pix = Point2::new(
                                    (ix + im_block.pos.x) as f32 + s.next(),
                                    (iy + im_block.pos.y) as f32 + s.next(),
                                );
                                let c = this.trace_sample(
                                    pix,
                                    scene,
                                    accel,
                                    s.as_mut(),
                                    &mut ctx,
                                    &splats,
                                );
                                im_block.accumulate(Point2::new(ix, iy), c);
                            }
                        }
                    }
                    im_block.scale(1.0 / scene.nb_samples() as f32);
                    progress_bar.lock().unwrap().inc();
                });
        });

        // Merge the blocks, then fold in the splat buffer: every emitter
        // path is a full-image estimator, so the buffer is normalized by
        // the total path count.
        let mut image = ImageBlock::new(Point2::new(0, 0), *scene.camera.size());
        for im_block in &image_blocks {
            image.merge(im_block);
        }
        let n_paths =
            scene.nb_samples() * (scene.camera.size().x * scene.camera.size().y) as usize;
        splats.add_into(&mut image, 1.0 / n_paths as f32);
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::NaiveAcceleration;
    use crate::bsdfs::diffuse::BSDFDiffuse;
    use crate::bsdfs::specular::BSDFSpecular;
    use crate::camera::Camera;
    use crate::emitter::{Emitter, PointEmitter};
    use crate::geometry::{quad, Mesh};
    use crate::samplers::independent::IndependentSampler;
    use assert_approx_eq::assert_approx_eq;
    use cgmath::{InnerSpace, Point3, Vector2, Vector3};
    use std::sync::Arc;

    fn diffuse(albedo: f32) -> Box<BSDFDiffuse> {
        Box::new(BSDFDiffuse {
            diffuse: Color::value(albedo),
        })
    }

    /// Scenario C: no geometry at all, a lonely point light
    #[test]
    fn empty_scene_is_black() {
        let camera = Camera::look_at(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector2::new(4, 4),
            60.0,
        );
        let light: Arc<dyn Emitter> = Arc::new(PointEmitter {
            intensity: Color::one(),
            position: Point3::new(0.0, 0.0, 5.0),
        });
        let scene = Scene::new(camera, vec![], vec![light], 4);
        let accel = NaiveAcceleration::new(&scene);
        let integrator = IntegratorBidir {
            max_bounces: 3,
            rr_depth: 5,
        };
        let splats = AtomicFramebuffer::new(*scene.camera.size());
        let mut ctx = PixelContext::new(integrator.max_bounces);
        let mut sampler = IndependentSampler::from_seed(7);
        for _ in 0..16 {
            let l = integrator.trace_sample(
                Point2::new(2.0, 2.0),
                &scene,
                &accel,
                &mut sampler,
                &mut ctx,
                &splats,
            );
            assert!(l.is_zero());
        }
        assert!(splats.value(Point2::new(2, 2)).is_zero());
    }

    /// Scenario E: the traced pixel sees nothing, yet the emitter paths
    /// keep splatting the directly lit floor through the `t = 0` family.
    #[test]
    fn light_tracing_only_fills_splat_buffer() {
        // camera looks toward +y; the floor covers only the lower half of
        // the frustum, the tested pixel aims at the empty upper half
        let camera = Camera::look_at(
            Point3::new(0.0, -2.0, 0.5),
            Point3::new(0.0, 0.0, 0.5),
            Vector3::new(0.0, 0.0, 1.0),
            Vector2::new(8, 8),
            90.0,
        );
        let (v, i) = quad(
            Point3::new(-2.0, 0.0, 0.0),
            Vector3::new(4.0, 0.0, 0.0),
            Vector3::new(0.0, 4.0, 0.0),
        );
        let floor = Mesh::new("floor", v, i, diffuse(0.7));
        let light: Arc<dyn Emitter> = Arc::new(PointEmitter {
            intensity: Color::one(),
            position: Point3::new(0.0, 1.0, 2.0),
        });
        let scene = Scene::new(camera, vec![floor], vec![light], 4);
        let accel = NaiveAcceleration::new(&scene);
        let integrator = IntegratorBidir {
            max_bounces: 1,
            rr_depth: 5,
        };
        let splats = AtomicFramebuffer::new(*scene.camera.size());
        let mut ctx = PixelContext::new(integrator.max_bounces);
        let mut sampler = IndependentSampler::from_seed(3);

        // a pixel in the top row looks above the floor
        let mut total = Color::zero();
        for _ in 0..512 {
            total += integrator.trace_sample(
                Point2::new(4.0, 0.5),
                &scene,
                &accel,
                &mut sampler,
                &mut ctx,
                &splats,
            );
        }
        assert!(total.is_zero());

        // the splat framebuffer received the floor
        let mut splat_total = Color::zero();
        for y in 0..8 {
            for x in 0..8 {
                splat_total += splats.value(Point2::new(x, y));
            }
        }
        assert!(splat_total.r > 0.0);
    }

    /// Scenario B: perfect mirror bounce into an area light. Every
    /// alternative strategy carries a Dirac vertex, so the direct-hit
    /// estimator keeps weight one and the pixel value is exact.
    #[test]
    fn mirror_reflection_hits_light() {
        // camera at the origin looks +z onto a 45 degree mirror which
        // reflects toward a light panel overhead
        let camera = Camera::look_at(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 2.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector2::new(4, 4),
            20.0,
        );
        // mirror plane through (0, 0, 2) with normal (0, 1, -1)/sqrt(2)
        let n = Vector3::new(0.0, 1.0, -1.0).normalize();
        let e1 = Vector3::new(0.0, 2.0, 2.0).normalize() * 4.0;
        let e2 = Vector3::new(4.0, 0.0, 0.0);
        // e1 x e2 points along (0, 1, -1): the front faces the camera
        let (v, i) = quad(
            Point3::new(0.0, 0.0, 2.0) - e1 * 0.5 - e2 * 0.5,
            e1,
            e2,
        );
        let mirror = Mesh::new(
            "mirror",
            v,
            i,
            Box::new(BSDFSpecular {
                specular: Color::value(0.9),
            }),
        );
        assert!(mirror.sample(0.2, Point2::new(0.3, 0.3)).n.dot(n) > 0.99);

        // light panel at y = 3 facing down (-y)
        let (v, i) = quad(
            Point3::new(-2.0, 3.0, 0.0),
            Vector3::new(4.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 4.0),
        );
        let mut panel = Mesh::new("panel", v, i, diffuse(0.0));
        panel.emission = Color::value(2.0);
        assert!(panel.sample(0.2, Point2::new(0.3, 0.3)).n.y < -0.99);

        let scene = Scene::new(camera, vec![mirror, panel], vec![], 4);
        let accel = NaiveAcceleration::new(&scene);
        let integrator = IntegratorBidir {
            max_bounces: 2,
            rr_depth: 5,
        };
        let splats = AtomicFramebuffer::new(*scene.camera.size());
        let mut ctx = PixelContext::new(integrator.max_bounces);
        let mut sampler = IndependentSampler::from_seed(11);
        for _ in 0..32 {
            // slightly off-center so the hit is strictly inside a triangle
            let l = integrator.trace_sample(
                Point2::new(2.2, 2.3),
                &scene,
                &accel,
                &mut sampler,
                &mut ctx,
                &splats,
            );
            // Le * mirror reflectance, weight exactly one
            assert_approx_eq!(l.r, 2.0 * 0.9, 1e-3);
            assert_approx_eq!(l.g, 2.0 * 0.9, 1e-3);
        }
    }

    /// Scenario A, deterministic part: the unweighted `(0, 1)` connection
    /// throughput matches the closed form rho/pi * cos * I / d^2.
    #[test]
    fn direct_connection_closed_form() {
        let camera = Camera::look_at(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector2::new(4, 4),
            90.0,
        );
        // corner offset keeps the central hit away from the quad diagonal
        let (v, i) = quad(
            Point3::new(-4.2, -3.7, 0.0),
            Vector3::new(8.0, 0.0, 0.0),
            Vector3::new(0.0, 8.0, 0.0),
        );
        let floor = Mesh::new("floor", v, i, diffuse(0.6));
        let light_pos = Point3::new(1.0, 0.0, 2.0);
        let light: Arc<dyn Emitter> = Arc::new(PointEmitter {
            intensity: Color::value(3.0),
            position: light_pos,
        });
        let scene = Scene::new(camera, vec![floor], vec![light], 4);
        let accel = NaiveAcceleration::new(&scene);

        // camera path: endpoint + the floor point under the image center
        let mut camera_path = LightPath::new(2);
        camera_path.start_camera_path(&scene.camera, Point2::new(2.0, 2.0));
        let mut state = TraceState::new(5);
        let mut sampler = IndependentSampler::from_seed(1);
        camera_path.trace_path(&accel, &mut sampler, &mut state);
        assert_eq!(camera_path.len(), 2);

        // emitter path: just the light endpoint
        let mut emitter_path = LightPath::new(1);
        emitter_path.start_emitter_path(&scene.emitters, &mut sampler);
        let mut state = TraceState::new(5);
        emitter_path.trace_path(&accel, &mut sampler, &mut state);
        assert!(emitter_path.len() >= 1);

        let c = LightPath::connect(&accel, emitter_path.vertex(0), camera_path.vertex(1));

        // hand side: the camera ray hits the floor at the origin
        let hit = camera_path.vertex(1).pos();
        assert_approx_eq!(hit.x, 0.0, 1e-4);
        assert_approx_eq!(hit.y, 0.0, 1e-4);
        let d = light_pos - hit;
        let r_sq = d.magnitude2();
        let cos = d.normalize().z;
        let expected = 0.6 * std::f32::consts::FRAC_1_PI * cos * 3.0 / r_sq;
        assert_approx_eq!(c.r, expected, 1e-4);
    }

    /// Smoke test: a tiny closed box renders finite, non-negative energy
    #[test]
    fn box_renders_finite_energy() {
        let camera = Camera::look_at(
            Point3::new(0.0, 0.0, 0.9),
            Point3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector2::new(4, 4),
            90.0,
        );
        let mut meshes = vec![];
        // axis-aligned unit box interior, normals pointing inside
        // interior faces of [-1,1]^3, normals (e1 x e2) pointing inside
        let faces: [(Point3<f32>, Vector3<f32>, Vector3<f32>); 5] = [
            // back wall z = -1, normal +z
            (Point3::new(-1.0, -1.0, -1.0), Vector3::new(2.0, 0.0, 0.0), Vector3::new(0.0, 2.0, 0.0)),
            // bottom y = -1, normal +y
            (Point3::new(-1.0, -1.0, -1.0), Vector3::new(0.0, 0.0, 2.0), Vector3::new(2.0, 0.0, 0.0)),
            // left wall x = -1, normal +x
            (Point3::new(-1.0, -1.0, -1.0), Vector3::new(0.0, 2.0, 0.0), Vector3::new(0.0, 0.0, 2.0)),
            // right wall x = 1, normal -x
            (Point3::new(1.0, -1.0, -1.0), Vector3::new(0.0, 0.0, 2.0), Vector3::new(0.0, 2.0, 0.0)),
            // top y = 1, normal -y
            (Point3::new(-1.0, 1.0, -1.0), Vector3::new(2.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 2.0)),
        ];
        for (k, (c, e1, e2)) in faces.into_iter().enumerate() {
            let (v, i) = quad(c, e1, e2);
            meshes.push(Mesh::new(&format!("face{}", k), v, i, diffuse(0.5)));
        }
        // small light panel below the ceiling
        let (v, i) = quad(
            Point3::new(-0.3, 0.95, -0.3),
            Vector3::new(0.6, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 0.6),
        );
        let mut panel = Mesh::new("light", v, i, diffuse(0.0));
        panel.emission = Color::value(5.0);
        assert!(panel.sample(0.5, Point2::new(0.5, 0.5)).n.y < -0.99);
        meshes.push(panel);

        let mut scene = Scene::new(camera, meshes, vec![], 8);
        scene.nb_threads = Some(1);
        let accel = NaiveAcceleration::new(&scene);
        let mut integrator = IntegratorBidir {
            max_bounces: 3,
            rr_depth: 2,
        };
        let mut sampler: Box<dyn Sampler> = Box::new(IndependentSampler::from_seed(17));
        let img = integrator.compute(sampler.as_mut(), &accel, &scene);
        let avg = img.average();
        assert!(avg.r.is_finite() && avg.g.is_finite() && avg.b.is_finite());
        assert!(avg.r > 0.0);
        for y in 0..4 {
            for x in 0..4 {
                let c = img.get(Point2::new(x, y));
                assert!(c.r >= 0.0 && c.g >= 0.0 && c.b >= 0.0);
                assert!(!c.has_nan());
            }
        }
    }
}
