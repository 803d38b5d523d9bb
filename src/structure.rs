use cgmath::*;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub};

/// Pixel color representation
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub fn new(r: f32, g: f32, b: f32) -> Color {
        Color { r, g, b }
    }

    pub fn value(v: f32) -> Color {
        Color { r: v, g: v, b: v }
    }

    pub fn zero() -> Color {
        Color::value(0.0)
    }

    pub fn one() -> Color {
        Color::value(1.0)
    }

    pub fn is_zero(&self) -> bool {
        self.r == 0.0 && self.g == 0.0 && self.b == 0.0
    }

    pub fn has_nan(&self) -> bool {
        self.r.is_nan() || self.g.is_nan() || self.b.is_nan()
    }

    pub fn avg(&self) -> f32 {
        (self.r + self.g + self.b) / 3.0
    }

    pub fn channel_max(&self) -> f32 {
        self.r.max(self.g).max(self.b)
    }

    pub fn abs(&self) -> Color {
        Color::new(self.r.abs(), self.g.abs(), self.b.abs())
    }

    pub fn to_rgb8(&self) -> [u8; 3] {
        // simple gamma 2.2 mapping for the LDR output
        let f = |v: f32| ((v.max(0.0).powf(1.0 / 2.2) * 255.0).min(255.0)) as u8;
        [f(self.r), f(self.g), f(self.b)]
    }
}

impl crate::Scale<f32> for Color {
    fn scale(&mut self, v: f32) {
        self.r *= v;
        self.g *= v;
        self.b *= v;
    }
}

/////////////// Operators
impl Add<Color> for Color {
    type Output = Color;
    fn add(self, other: Color) -> Color {
        Color::new(self.r + other.r, self.g + other.g, self.b + other.b)
    }
}

impl Sub<Color> for Color {
    type Output = Color;
    fn sub(self, other: Color) -> Color {
        Color::new(self.r - other.r, self.g - other.g, self.b - other.b)
    }
}

impl AddAssign<Color> for Color {
    fn add_assign(&mut self, other: Color) {
        self.r += other.r;
        self.g += other.g;
        self.b += other.b;
    }
}

impl Mul<Color> for Color {
    type Output = Color;
    fn mul(self, other: Color) -> Color {
        Color::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }
}

impl MulAssign<Color> for Color {
    fn mul_assign(&mut self, other: Color) {
        self.r *= other.r;
        self.g *= other.g;
        self.b *= other.b;
    }
}

impl Mul<f32> for Color {
    type Output = Color;
    fn mul(self, other: f32) -> Color {
        Color::new(self.r * other, self.g * other, self.b * other)
    }
}

impl Mul<Color> for f32 {
    type Output = Color;
    fn mul(self, other: Color) -> Color {
        other * self
    }
}

impl MulAssign<f32> for Color {
    fn mul_assign(&mut self, other: f32) {
        self.r *= other;
        self.g *= other;
        self.b *= other;
    }
}

impl Div<f32> for Color {
    type Output = Color;
    fn div(self, other: f32) -> Color {
        Color::new(self.r / other, self.g / other, self.b / other)
    }
}

impl DivAssign<f32> for Color {
    fn div_assign(&mut self, other: f32) {
        self.r /= other;
        self.g /= other;
        self.b /= other;
    }
}

/// Measure in which a density is expressed
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Domain {
    SolidAngle,
    Area,
    Discrete,
}

/// Measure-tagged probability density
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PDF {
    SolidAngle(f32),
    Area(f32),
    Discrete(f32),
}

impl PDF {
    pub fn value(&self) -> f32 {
        match *self {
            PDF::SolidAngle(v) | PDF::Area(v) | PDF::Discrete(v) => v,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value() == 0.0
    }
}

impl Mul<f32> for PDF {
    type Output = PDF;
    fn mul(self, other: f32) -> PDF {
        match self {
            PDF::SolidAngle(v) => PDF::SolidAngle(v * other),
            PDF::Area(v) => PDF::Area(v * other),
            PDF::Discrete(v) => PDF::Discrete(v * other),
        }
    }
}

/// A position sampled on an emitter or a sensor
#[derive(Clone, Copy)]
pub struct SampledPosition {
    pub p: Point3<f32>,
    pub n: Vector3<f32>,
    pub pdf: PDF,
}

/// Ray representation
#[derive(Clone)]
pub struct Ray {
    pub o: Point3<f32>,
    pub d: Vector3<f32>,
    pub tnear: f32,
    pub tfar: f32,
}

impl Ray {
    pub fn new(o: Point3<f32>, d: Vector3<f32>) -> Ray {
        Ray {
            o,
            d,
            tnear: crate::constants::EPSILON,
            tfar: std::f32::MAX,
        }
    }
}
