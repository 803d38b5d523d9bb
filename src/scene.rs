use std::sync::Arc;

use crate::camera::Camera;
use crate::emitter::{Emitter, EmitterSampler};
use crate::geometry::Mesh;

/// Scene representation: immutable during rendering, shared by reference
/// across the worker threads.
pub struct Scene {
    pub camera: Camera,
    pub meshes: Vec<Arc<Mesh>>,
    pub emitters: EmitterSampler,
    pub nb_samples: usize,
    pub nb_threads: Option<usize>,
}

impl Scene {
    pub fn new(
        camera: Camera,
        meshes: Vec<Mesh>,
        mut extra_emitters: Vec<Arc<dyn Emitter>>,
        nb_samples: usize,
    ) -> Scene {
        let meshes: Vec<Arc<Mesh>> = meshes.into_iter().map(Arc::new).collect();

        // Register all emissive meshes as area lights
        let mut emitters: Vec<Arc<dyn Emitter>> = vec![];
        for m in &meshes {
            if m.is_light() {
                let area_light: Arc<dyn Emitter> = m.clone();
                emitters.push(area_light);
            }
        }
        emitters.append(&mut extra_emitters);
        info!("Scene: {} meshes, {} emitters", meshes.len(), emitters.len());

        Scene {
            camera,
            meshes,
            emitters: EmitterSampler::new(emitters),
            nb_samples,
            nb_threads: None,
        }
    }

    pub fn nb_samples(&self) -> usize {
        self.nb_samples
    }
}
