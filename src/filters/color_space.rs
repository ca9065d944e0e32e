//! Luminance / chrominance split and merge.
//!
//! The flattening pipeline never does color math itself; it asks a
//! `LumaChromaSplit` collaborator for a luminance plane plus the remaining
//! chroma planes, filters the luminance, and hands both back for merging.
//!
//! ## Provided collaborators
//!
//! | Type | Input | Luma | Chroma |
//! |------|-------|------|--------|
//! | `LeadingChannel` | any space with luma first (Lab, YCbCr), 2+ channels | channel 0 | channels 1.. |
//! | `CieLab` | sRGB (3) or sRGBA (4) | L* | a*, b* (+ alpha) |

use ndarray::{concatenate, s, Array3, ArrayView3, Axis};

use crate::error::{ensure_non_empty, FilterError, FilterResult};

/// Caller-supplied color-space decomposition.
pub trait LumaChromaSplit {
    /// Whether an image with this many channels can be split.
    fn accepts(&self, channels: usize) -> bool;

    /// Human-readable description of the accepted channel layout.
    fn layout(&self) -> &'static str;

    /// Split into a (H, W, 1) luma plane and (H, W, k) chroma planes.
    fn split(&self, image: ArrayView3<u8>) -> FilterResult<(Array3<u8>, Array3<u8>)>;

    /// Inverse of `split`.
    fn merge(&self, luma: ArrayView3<u8>, chroma: ArrayView3<u8>) -> FilterResult<Array3<u8>>;

    /// `ShapeMismatch` unless `accepts(channels)`.
    fn check_channels(&self, channels: usize) -> FilterResult<()> {
        if self.accepts(channels) {
            Ok(())
        } else {
            Err(FilterError::ShapeMismatch {
                expected: self.layout(),
                actual: channels,
            })
        }
    }
}

/// Validate a luma/chroma pair before merging.
fn check_planes(luma: &ArrayView3<u8>, chroma: &ArrayView3<u8>) -> FilterResult<()> {
    ensure_non_empty(luma.dim())?;
    ensure_non_empty(chroma.dim())?;
    let (lh, lw, lc) = luma.dim();
    let (ch, cw, _) = chroma.dim();
    if lc != 1 {
        return Err(FilterError::ShapeMismatch {
            expected: "single-channel luma plane",
            actual: lc,
        });
    }
    if (lh, lw) != (ch, cw) {
        return Err(FilterError::InvalidParameter(format!(
            "luma plane is {lh}x{lw} but chroma planes are {ch}x{cw}"
        )));
    }
    Ok(())
}

// ============================================================================
// Leading channel
// ============================================================================

/// Input is already luma-first; channel 0 is filtered, the rest pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadingChannel;

impl LumaChromaSplit for LeadingChannel {
    fn accepts(&self, channels: usize) -> bool {
        channels >= 2
    }

    fn layout(&self) -> &'static str {
        "2 or more channels with luma first"
    }

    fn split(&self, image: ArrayView3<u8>) -> FilterResult<(Array3<u8>, Array3<u8>)> {
        ensure_non_empty(image.dim())?;
        self.check_channels(image.dim().2)?;
        let luma = image.slice(s![.., .., 0..1]).to_owned();
        let chroma = image.slice(s![.., .., 1..]).to_owned();
        Ok((luma, chroma))
    }

    fn merge(&self, luma: ArrayView3<u8>, chroma: ArrayView3<u8>) -> FilterResult<Array3<u8>> {
        check_planes(&luma, &chroma)?;
        concatenate(Axis(2), &[luma.view(), chroma.view()])
            .map_err(|e| FilterError::InvalidParameter(format!("cannot merge planes: {e}")))
    }
}

// ============================================================================
// CIE L*a*b*
// ============================================================================

// sRGB -> XYZ (D65)
const RGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.412453, 0.357580, 0.180423],
    [0.212671, 0.715160, 0.072169],
    [0.019334, 0.119193, 0.950227],
];

const XYZ_TO_RGB: [[f32; 3]; 3] = [
    [3.240479, -1.537150, -0.498535],
    [-0.969256, 1.875991, 0.041556],
    [0.055648, -0.204043, 1.057311],
];

// D65 reference white
const WHITE_X: f32 = 0.950456;
const WHITE_Z: f32 = 1.088754;

const LAB_EPSILON: f32 = 0.008856;
const LAB_KAPPA: f32 = 903.3;

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

#[inline]
fn lab_f_inv(v: f32) -> f32 {
    if v > 6.0 / 29.0 {
        v * v * v
    } else {
        (v - 16.0 / 116.0) / 7.787
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// 8-bit sRGB to 8-bit Lab: L scaled to 0-255, a/b offset by 128.
fn rgb_to_lab_u8(r: u8, g: u8, b: u8) -> [u8; 3] {
    let rgb = [
        srgb_to_linear(r as f32 / 255.0),
        srgb_to_linear(g as f32 / 255.0),
        srgb_to_linear(b as f32 / 255.0),
    ];
    let [x, y, z] = RGB_TO_XYZ.map(|row| row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]);

    let fx = lab_f(x / WHITE_X);
    let fy = lab_f(y);
    let fz = lab_f(z / WHITE_Z);

    let l = if y > LAB_EPSILON {
        116.0 * fy - 16.0
    } else {
        LAB_KAPPA * y
    };
    let a = 500.0 * (fx - fy);
    let bb = 200.0 * (fy - fz);

    [to_u8(l * 255.0 / 100.0), to_u8(a + 128.0), to_u8(bb + 128.0)]
}

fn lab_to_rgb_u8(l: u8, a: u8, b: u8) -> [u8; 3] {
    let l = l as f32 * 100.0 / 255.0;
    let a = a as f32 - 128.0;
    let b = b as f32 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    let xyz = [lab_f_inv(fx) * WHITE_X, lab_f_inv(fy), lab_f_inv(fz) * WHITE_Z];

    XYZ_TO_RGB.map(|row| {
        let linear = row[0] * xyz[0] + row[1] * xyz[1] + row[2] * xyz[2];
        to_u8(linear_to_srgb(linear.clamp(0.0, 1.0)) * 255.0)
    })
}

/// sRGB(A) <-> CIE L*a*b* using the common 8-bit Lab encoding.
///
/// Alpha (if present) travels with the chroma planes and is restored
/// unchanged on merge.
#[derive(Debug, Clone, Copy, Default)]
pub struct CieLab;

impl LumaChromaSplit for CieLab {
    fn accepts(&self, channels: usize) -> bool {
        channels == 3 || channels == 4
    }

    fn layout(&self) -> &'static str {
        "3 (RGB) or 4 (RGBA) channels"
    }

    fn split(&self, image: ArrayView3<u8>) -> FilterResult<(Array3<u8>, Array3<u8>)> {
        ensure_non_empty(image.dim())?;
        let (height, width, channels) = image.dim();
        self.check_channels(channels)?;

        let mut luma = Array3::<u8>::zeros((height, width, 1));
        let mut chroma = Array3::<u8>::zeros((height, width, channels - 1));

        for y in 0..height {
            for x in 0..width {
                let [l, a, b] =
                    rgb_to_lab_u8(image[[y, x, 0]], image[[y, x, 1]], image[[y, x, 2]]);
                luma[[y, x, 0]] = l;
                chroma[[y, x, 0]] = a;
                chroma[[y, x, 1]] = b;
                if channels == 4 {
                    chroma[[y, x, 2]] = image[[y, x, 3]];
                }
            }
        }

        Ok((luma, chroma))
    }

    fn merge(&self, luma: ArrayView3<u8>, chroma: ArrayView3<u8>) -> FilterResult<Array3<u8>> {
        check_planes(&luma, &chroma)?;
        let (height, width, chroma_channels) = chroma.dim();
        let channels = chroma_channels + 1;
        self.check_channels(channels)?;

        let mut output = Array3::<u8>::zeros((height, width, channels));
        for y in 0..height {
            for x in 0..width {
                let [r, g, b] =
                    lab_to_rgb_u8(luma[[y, x, 0]], chroma[[y, x, 0]], chroma[[y, x, 1]]);
                output[[y, x, 0]] = r;
                output[[y, x, 1]] = g;
                output[[y, x, 2]] = b;
                if channels == 4 {
                    output[[y, x, 3]] = chroma[[y, x, 2]];
                }
            }
        }

        Ok(output)
    }
}
