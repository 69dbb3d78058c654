//! Page geometry: page size and affine transforms

/// Page size in PDF points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: f32,
    pub height: f32,
}

impl PageDimensions {
    /// US Letter, 8.5 x 11 inches
    pub fn letter() -> Self {
        Self { width: 612.0, height: 792.0 }
    }

    /// MediaBox values in whole points: [0 0 width height]
    pub fn media_box(&self) -> [i64; 4] {
        [0, 0, self.width.round() as i64, self.height.round() as i64]
    }
}

/// Represents a PDF transformation matrix [a b c d e f]
/// where: x' = a*x + c*y + e, y' = b*x + d*y + f
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl TransformMatrix {
    /// Identity matrix (no transformation)
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    /// Pure translation
    pub fn translation(tx: f32, ty: f32) -> Self {
        Self { e: tx, f: ty, ..Self::identity() }
    }

    /// Pure counter-clockwise rotation in degrees
    pub fn rotation(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self { a: cos, b: sin, c: -sin, d: cos, e: 0.0, f: 0.0 }
    }

    /// Product `self × other`: apply `self` first, then `other`
    pub fn concat(&self, other: &TransformMatrix) -> Self {
        Self {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Rotate the local coordinate system, like a `cm` issued after this one
    pub fn then_rotate(&self, degrees: f32) -> Self {
        TransformMatrix::rotation(degrees).concat(self)
    }

    /// Map a point through the matrix
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    /// Operands for the `cm` operator
    pub fn to_operands(&self) -> String {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .iter()
            .map(|v| format_number(*v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Format a number for a content stream: at most 4 decimals, no trailing zeros
pub(crate) fn format_number(value: f32) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    // Avoid "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let text = format!("{:.4}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}
