use crate::GrayImage;
use ::image::{ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;

type FloatBuffer = ImageBuffer<Luma<f32>, Vec<f32>>;

/// OpenCV-style automatic sigma for a `ksize`-tap Gaussian.
pub fn auto_sigma(ksize: usize) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    let sigma = auto_sigma(ksize);
    let half = (ksize / 2) as i32;
    let mut k: Vec<f32> = (-half..=half)
        .map(|i| (-(i * i) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = k.iter().sum();
    for v in &mut k {
        *v /= sum;
    }
    k
}

/// Separable correlation in float so the result is rounded only once.
/// `imageproc` clamps reads to the nearest edge pixel.
fn correlate(src: &GrayImage, kernel: &[f32]) -> FloatBuffer {
    let input: FloatBuffer = ImageBuffer::from_fn(src.width as u32, src.height as u32, |x, y| {
        Luma([src.get(x as usize, y as usize) as f32])
    });
    separable_filter_equal(&input, kernel)
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

pub(crate) fn scale(src: &GrayImage, factor: f32) -> GrayImage {
    GrayImage {
        width: src.width,
        height: src.height,
        data: src.data.iter().map(|&v| to_u8(v as f32 * factor)).collect(),
    }
}

pub(crate) fn gaussian_blur(src: &GrayImage, ksize: usize) -> GrayImage {
    if src.width == 0 || src.height == 0 || ksize < 3 {
        return src.clone();
    }
    let blurred = correlate(src, &gaussian_kernel(ksize | 1));
    GrayImage {
        width: src.width,
        height: src.height,
        data: blurred.into_raw().into_iter().map(to_u8).collect(),
    }
}

/// Inverse binary threshold against the local box mean.
///
/// A pixel becomes 255 when `src <= round(mean) - c`, 0 otherwise.
pub(crate) fn adaptive_threshold_mean_inv(src: &GrayImage, block: usize, c: i32) -> GrayImage {
    let (w, h) = (src.width, src.height);
    if w == 0 || h == 0 {
        return GrayImage::new(w, h);
    }
    let taps = (block.max(1) / 2) * 2 + 1;
    let mean = correlate(src, &vec![1.0 / taps as f32; taps]);
    let data = src
        .data
        .iter()
        .zip(mean.as_raw())
        .map(|(&v, &m)| if v as i32 <= m.round() as i32 - c { 255 } else { 0 })
        .collect();
    GrayImage {
        width: w,
        height: h,
        data,
    }
}
