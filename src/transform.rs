use image::{Rgb, RgbImage};
use std::fmt;

/// Rotation of the display the preview surface lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayRotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl DisplayRotation {
    #[cfg(test)]
    pub const ALL: [DisplayRotation; 4] = [Self::R0, Self::R90, Self::R180, Self::R270];

    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Self::R0),
            90 => Some(Self::R90),
            180 => Some(Self::R180),
            270 => Some(Self::R270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }

    /// Next rotation clockwise
    pub fn next(self) -> Self {
        match self {
            Self::R0 => Self::R90,
            Self::R90 => Self::R180,
            Self::R180 => Self::R270,
            Self::R270 => Self::R0,
        }
    }
}

impl fmt::Display for DisplayRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// 2D affine matrix in screen coordinates (y grows downwards)
///
/// Maps `(x, y)` to `(sx*x + kx*y + tx, ky*x + sy*y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    sx: f32,
    kx: f32,
    tx: f32,
    ky: f32,
    sy: f32,
    ty: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        sx: 1.0,
        kx: 0.0,
        tx: 0.0,
        ky: 0.0,
        sy: 1.0,
        ty: 0.0,
    };

    /// Rotation by `degrees` (clockwise on screen) about `(px, py)`
    pub fn rotation(degrees: f32, px: f32, py: f32) -> Self {
        let (sin, cos) = sin_cos_degrees(degrees);
        Self {
            sx: cos,
            kx: -sin,
            tx: px - cos * px + sin * py,
            ky: sin,
            sy: cos,
            ty: py - sin * px - cos * py,
        }
    }

    /// Applies `self` first, then `other`
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            sx: other.sx * self.sx + other.kx * self.ky,
            kx: other.sx * self.kx + other.kx * self.sy,
            tx: other.sx * self.tx + other.kx * self.ty + other.tx,
            ky: other.ky * self.sx + other.sy * self.ky,
            sy: other.ky * self.kx + other.sy * self.sy,
            ty: other.ky * self.tx + other.sy * self.ty + other.ty,
        }
    }

    /// Post-concatenates a rotation about a pivot
    pub fn post_rotate(&mut self, degrees: f32, px: f32, py: f32) {
        *self = self.then(&Matrix::rotation(degrees, px, py));
    }

    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.sx * x + self.kx * y + self.tx,
            self.ky * x + self.sy * y + self.ty,
        )
    }

    pub fn invert(&self) -> Option<Matrix> {
        let det = self.sx * self.sy - self.kx * self.ky;
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Matrix {
            sx: self.sy * inv,
            kx: -self.kx * inv,
            tx: (self.kx * self.ty - self.sy * self.tx) * inv,
            ky: -self.ky * inv,
            sy: self.sx * inv,
            ty: (self.ky * self.tx - self.sx * self.ty) * inv,
        })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Exact values for quarter turns so the common display rotations
/// produce integer pixel mappings.
fn sin_cos_degrees(degrees: f32) -> (f32, f32) {
    let normalized = degrees.rem_euclid(360.0);
    if normalized == 0.0 {
        (0.0, 1.0)
    } else if normalized == 90.0 {
        (1.0, 0.0)
    } else if normalized == 180.0 {
        (0.0, -1.0)
    } else if normalized == 270.0 {
        (-1.0, 0.0)
    } else {
        normalized.to_radians().sin_cos()
    }
}

/// Preview correction for the current display rotation
///
/// Always derived from the display rotation and the surface size, never
/// tracked on its own: recompute it whenever the surface layout changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationTransform {
    degrees: f32,
    pivot: (f32, f32),
    matrix: Matrix,
}

impl RotationTransform {
    /// Counter-rotates by the display rotation about the surface center
    pub fn for_display(rotation: DisplayRotation, width: u32, height: u32) -> Self {
        let center_x = width as f32 / 2.0;
        let center_y = height as f32 / 2.0;
        let degrees = -(rotation.degrees() as f32);

        let mut matrix = Matrix::IDENTITY;
        matrix.post_rotate(degrees, center_x, center_y);

        Self {
            degrees,
            pivot: (center_x, center_y),
            matrix,
        }
    }

    pub fn rotation_degrees(&self) -> f32 {
        self.degrees
    }

    pub fn pivot(&self) -> (f32, f32) {
        self.pivot
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Renders `frame` through the transform onto a canvas of the same size.
    /// Pixels that land outside the source are black, as on a texture view.
    pub fn apply(&self, frame: &RgbImage) -> RgbImage {
        if self.matrix.is_identity() {
            return frame.clone();
        }

        let Some(inverse) = self.matrix.invert() else {
            return frame.clone();
        };

        let (width, height) = frame.dimensions();
        RgbImage::from_fn(width, height, |x, y| {
            // Sample at pixel centers so quarter turns stay pixel exact
            let (sx, sy) = inverse.map_point(x as f32 + 0.5, y as f32 + 0.5);
            let (sx, sy) = (sx.floor(), sy.floor());
            if sx >= 0.0 && sy >= 0.0 && (sx as u32) < width && (sy as u32) < height {
                *frame.get_pixel(sx as u32, sy as u32)
            } else {
                Rgb([0, 0, 0])
            }
        })
    }
}
