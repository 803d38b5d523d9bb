use cgmath::*;
use std::f32;

use crate::structure::*;

pub struct Camera {
    pub img: Vector2<u32>,
    pub pos: Point3<f32>,
    // orthonormal basis of the sensor (dz looks into the scene)
    dx: Vector3<f32>,
    dy: Vector3<f32>,
    dz: Vector3<f32>,
    // image plane extent at unit distance
    dim_x: f32,
    dim_y: f32,
    dir_top_left: Vector3<f32>,
    screen_du: Vector3<f32>,
    screen_dv: Vector3<f32>,
}

impl Camera {
    pub fn new(
        pos: Point3<f32>,
        dir: Vector3<f32>,
        up: Vector3<f32>,
        img: Vector2<u32>,
        fov: f32,
    ) -> Camera {
        let dz = dir.normalize();
        let dx = -dz.cross(up).normalize();
        let dy = dx.cross(dz).normalize();
        let dim_y = 2.0 * f32::tan((fov / 2.0) * f32::consts::PI / 180.0);
        let aspect_ratio = img.x as f32 / img.y as f32;
        let dim_x = dim_y * aspect_ratio;
        let screen_du = dx * dim_x;
        let screen_dv = dy * dim_y;
        let dir_top_left = dz - 0.5 * screen_du - 0.5 * screen_dv;
        Camera {
            img,
            pos,
            dx,
            dy,
            dz,
            dim_x,
            dim_y,
            dir_top_left,
            screen_du,
            screen_dv,
        }
    }

    pub fn look_at(
        pos: Point3<f32>,
        at: Point3<f32>,
        up: Vector3<f32>,
        img: Vector2<u32>,
        fov: f32,
    ) -> Camera {
        Camera::new(pos, at - pos, up, img, fov)
    }

    pub fn size(&self) -> &Vector2<u32> {
        &self.img
    }

    pub fn position(&self) -> Point3<f32> {
        self.pos
    }

    /// Area of one pixel footprint on the image plane at unit distance
    fn pixel_area(&self) -> f32 {
        (self.dim_x * self.dim_y) / (self.img.x * self.img.y) as f32
    }

    /// Compute the ray direction going through the pixel passed
    pub fn generate(&self, px: Point2<f32>) -> Ray {
        let d = (self.dir_top_left
            + px.x / (self.img.x as f32) * self.screen_du
            + px.y / (self.img.y as f32) * self.screen_dv)
            .normalize();
        Ray::new(self.pos, d)
    }

    /// The pinhole position (Dirac in the area measure)
    pub fn sample_position(&self) -> (SampledPosition, Color) {
        (
            SampledPosition {
                p: self.pos,
                n: self.dz,
                pdf: PDF::Discrete(1.0),
            },
            Color::one(),
        )
    }

    /// Direction through the given raster position. The weight is one: the
    /// importance of a pinhole equals the per-pixel direction pdf.
    pub fn sample_direction(&self, px: Point2<f32>) -> (Vector3<f32>, PDF, Color) {
        let d = self.generate(px).d;
        (d, self.direction_pdf(&d), Color::one())
    }

    /// Solid-angle pdf of sampling `d` through its pixel
    pub fn direction_pdf(&self, d: &Vector3<f32>) -> PDF {
        if self.raster_position(d).is_none() {
            return PDF::SolidAngle(0.0);
        }
        let cos_theta = d.dot(self.dz);
        PDF::SolidAngle(1.0 / (self.pixel_area() * cos_theta.powi(3)))
    }

    /// Importance emitted toward `d` plus the raster position receiving it.
    /// None when the direction falls outside the sensor.
    pub fn eval_direction(&self, d: &Vector3<f32>) -> Option<(Color, Point2<f32>)> {
        let raster = self.raster_position(d)?;
        let cos_theta = d.dot(self.dz);
        let importance = 1.0 / (self.pixel_area() * cos_theta.powi(3));
        Some((Color::value(importance), raster))
    }

    fn raster_position(&self, d: &Vector3<f32>) -> Option<Point2<f32>> {
        let cos_theta = d.dot(self.dz);
        if cos_theta <= 0.0 {
            return None;
        }
        // project on the image plane at unit distance
        let q = *d / cos_theta;
        let u = 0.5 + q.dot(self.dx) / self.dim_x;
        let v = 0.5 + q.dot(self.dy) / self.dim_y;
        if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
            return None;
        }
        Some(Point2::new(u * self.img.x as f32, v * self.img.y as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn camera() -> Camera {
        Camera::look_at(
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector2::new(8, 8),
            60.0,
        )
    }

    #[test]
    fn raster_round_trip() {
        let cam = camera();
        let px = Point2::new(2.3, 5.7);
        let (d, pdf, weight) = cam.sample_direction(px);
        assert_eq!(weight, Color::one());
        let (importance, raster) = cam.eval_direction(&d).unwrap();
        assert_approx_eq!(raster.x, px.x, 1e-3);
        assert_approx_eq!(raster.y, px.y, 1e-3);
        // for a pinhole the importance equals the direction pdf
        assert_approx_eq!(importance.r, pdf.value(), 1e-2);
    }

    #[test]
    fn outside_sensor_rejected() {
        let cam = camera();
        assert!(cam.eval_direction(&Vector3::new(0.0, 0.0, 1.0)).is_none());
        assert!(cam.direction_pdf(&Vector3::new(0.0, 0.0, 1.0)).is_zero());
        // wildly off-axis but front-facing
        let d = (cam.generate(Point2::new(4.0, 4.0)).d + Vector3::new(5.0, 0.0, 0.0)).normalize();
        assert!(cam.eval_direction(&d).is_none());
    }
}
