use cgmath::{Point3, Vector2, Vector3};
use clap::{Parser, ValueEnum};
use std::time::Instant;

#[macro_use]
extern crate log;

use lightpath::accel::NaiveAcceleration;
use lightpath::bsdfs::diffuse::BSDFDiffuse;
use lightpath::bsdfs::specular::BSDFSpecular;
use lightpath::camera::Camera;
use lightpath::emitter::{Emitter, PointEmitter};
use lightpath::geometry::{quad, Mesh};
use lightpath::integrators::bidir::IntegratorBidir;
use lightpath::integrators::Integrator;
use lightpath::samplers::independent::IndependentSampler;
use lightpath::samplers::Sampler;
use lightpath::scene::Scene;
use lightpath::structure::Color;
use lightpath::tools::save;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum DemoScene {
    /// Diffuse box with an area light
    Cbox,
    /// Mirror panel reflecting a point light
    Mirror,
}

#[derive(Debug, Parser)]
#[command(version, about = "bidirectional path tracer")]
struct Cli {
    /// Output image (png or pfm)
    #[arg(long, short, default_value = "out.png")]
    output: String,
    /// Number of samples per pixel
    #[arg(long, short, default_value_t = 16)]
    nbsamples: usize,
    /// Number of threads (default: all)
    #[arg(long, short)]
    threads: Option<usize>,
    /// Image size
    #[arg(long, short, default_value_t = 256)]
    size: u32,
    /// Maximum number of bounces
    #[arg(long, short, default_value_t = 5)]
    max_bounces: usize,
    /// Bounce count after which Russian roulette starts
    #[arg(long, short, default_value_t = 3)]
    rr_depth: u32,
    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Built-in scene to render
    #[arg(long, value_enum, default_value_t = DemoScene::Cbox)]
    scene: DemoScene,
}

fn diffuse(c: Color) -> Box<BSDFDiffuse> {
    Box::new(BSDFDiffuse { diffuse: c })
}

/// Classic closed box: white walls, red/green sides, area light on top
fn cornell_box(img: Vector2<u32>, nb_samples: usize) -> Scene {
    let camera = Camera::look_at(
        Point3::new(0.0, 0.0, 3.5),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        img,
        39.0,
    );

    let white = Color::value(0.7);
    let red = Color::new(0.63, 0.065, 0.05);
    let green = Color::new(0.14, 0.45, 0.09);

    let mut meshes = vec![];
    let mut face = |name: &str, c: Point3<f32>, e1: Vector3<f32>, e2: Vector3<f32>, col: Color| {
        let (v, i) = quad(c, e1, e2);
        meshes.push(Mesh::new(name, v, i, diffuse(col)));
    };
    // interior of [-1,1]^3, normals inward
    face(
        "back",
        Point3::new(-1.0, -1.0, -1.0),
        Vector3::new(2.0, 0.0, 0.0),
        Vector3::new(0.0, 2.0, 0.0),
        white,
    );
    face(
        "floor",
        Point3::new(-1.0, -1.0, -1.0),
        Vector3::new(0.0, 0.0, 2.0),
        Vector3::new(2.0, 0.0, 0.0),
        white,
    );
    face(
        "ceiling",
        Point3::new(-1.0, 1.0, -1.0),
        Vector3::new(2.0, 0.0, 0.0),
        Vector3::new(0.0, 0.0, 2.0),
        white,
    );
    face(
        "left",
        Point3::new(-1.0, -1.0, -1.0),
        Vector3::new(0.0, 2.0, 0.0),
        Vector3::new(0.0, 0.0, 2.0),
        red,
    );
    face(
        "right",
        Point3::new(1.0, -1.0, -1.0),
        Vector3::new(0.0, 0.0, 2.0),
        Vector3::new(0.0, 2.0, 0.0),
        green,
    );

    // light panel just below the ceiling
    let (v, i) = quad(
        Point3::new(-0.25, 0.98, -0.25),
        Vector3::new(0.5, 0.0, 0.0),
        Vector3::new(0.0, 0.0, 0.5),
    );
    let mut panel = Mesh::new("light", v, i, diffuse(Color::zero()));
    panel.emission = Color::value(20.0);
    meshes.push(panel);

    Scene::new(camera, meshes, vec![], nb_samples)
}

/// A tilted mirror bouncing the view toward a lit floor
fn mirror_scene(img: Vector2<u32>, nb_samples: usize) -> Scene {
    let camera = Camera::look_at(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(0.0, 0.0, 2.0),
        Vector3::new(0.0, 1.0, 0.0),
        img,
        50.0,
    );

    let mut meshes = vec![];
    // 45 degree mirror in front of the camera
    let e1 = Vector3::new(0.0, 2.0, 2.0) / 2.0f32.sqrt() * 3.0;
    let e2 = Vector3::new(3.0, 0.0, 0.0);
    let (v, i) = quad(Point3::new(0.0, 0.0, 2.0) - e1 * 0.5 - e2 * 0.5, e1, e2);
    meshes.push(Mesh::new(
        "mirror",
        v,
        i,
        Box::new(BSDFSpecular {
            specular: Color::value(0.95),
        }),
    ));
    // diffuse panel overhead, seen through the mirror
    let (v, i) = quad(
        Point3::new(-3.0, 3.0, -1.0),
        Vector3::new(6.0, 0.0, 0.0),
        Vector3::new(0.0, 0.0, 6.0),
    );
    meshes.push(Mesh::new("panel", v, i, diffuse(Color::value(0.6))));

    let light: Arc<dyn Emitter> = Arc::new(PointEmitter {
        intensity: Color::value(10.0),
        position: Point3::new(0.0, 1.5, 1.0),
    });
    Scene::new(camera, meshes, vec![light], nb_samples)
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let img = Vector2::new(cli.size, cli.size);
    let mut scene = match cli.scene {
        DemoScene::Cbox => cornell_box(img, cli.nbsamples),
        DemoScene::Mirror => mirror_scene(img, cli.nbsamples),
    };
    scene.nb_threads = cli.threads;

    let accel = NaiveAcceleration::new(&scene);
    let mut sampler: Box<dyn Sampler> = Box::new(IndependentSampler::from_seed(cli.seed));
    let mut integrator = IntegratorBidir {
        max_bounces: cli.max_bounces,
        rr_depth: cli.rr_depth,
    };

    info!(
        "Rendering {}x{} with {} spp, {} bounces",
        img.x, img.y, cli.nbsamples, cli.max_bounces
    );
    let start = Instant::now();
    let image = integrator.compute(sampler.as_mut(), &accel, &scene);
    info!("Render time: {:?}", start.elapsed());

    let avg = image.average();
    info!("Average radiance: {:?}", avg);
    save(&cli.output, &image);
    info!("Image written to {}", cli.output);
}
