//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! The image is split into a grid of tiles. Each tile gets its own
//! equalization lookup table built from a histogram whose bins are capped
//! at the clip limit, with the clipped excess spread evenly over all bins.
//! Every output pixel bilinearly blends the tables of the four nearest
//! tile centers, which hides the tile seams.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::color::saturate;

const BINS: usize = 256;

/// Parameters of [`clahe`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClaheConfig {
    /// Histogram bin cap, relative to a flat histogram (`1.0` means no
    /// bin may exceed the mean bin height).
    pub clip_limit: f64,
    /// Number of tile columns.
    pub tiles_x: u32,
    /// Number of tile rows.
    pub tiles_y: u32,
}

impl ClaheConfig {
    /// Default clip limit.
    pub const DEFAULT_CLIP_LIMIT: f64 = 3.0;
    /// Default tile grid edge.
    pub const DEFAULT_TILES: u32 = 8;
}

impl Default for ClaheConfig {
    fn default() -> Self {
        Self {
            clip_limit: Self::DEFAULT_CLIP_LIMIT,
            tiles_x: Self::DEFAULT_TILES,
            tiles_y: Self::DEFAULT_TILES,
        }
    }
}

/// Equalize `image` with CLAHE.
///
/// Images whose dimensions are not a multiple of the tile grid are
/// extended by mirroring for histogram purposes only; the output always
/// has the input's dimensions. A zero-sized grid or image returns the
/// input unchanged.
#[must_use = "returns the equalized image"]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn clahe(image: &GrayImage, config: &ClaheConfig) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || config.tiles_x == 0 || config.tiles_y == 0 {
        return image.clone();
    }

    let tile_w = w.div_ceil(config.tiles_x);
    let tile_h = h.div_ceil(config.tiles_y);
    let tile_area = u64::from(tile_w) * u64::from(tile_h);

    let clip = if config.clip_limit > 0.0 {
        ((config.clip_limit * tile_area as f64 / BINS as f64) as u64).max(1)
    } else {
        u64::MAX
    };

    let luts: Vec<[u8; BINS]> = (0..config.tiles_y)
        .flat_map(|ty| (0..config.tiles_x).map(move |tx| (tx, ty)))
        .map(|(tx, ty)| {
            let mut hist = tile_histogram(image, tx * tile_w, ty * tile_h, tile_w, tile_h);
            clip_histogram(&mut hist, clip);
            equalization_lut(&hist, tile_area)
        })
        .collect();
    let lut = |tx: usize, ty: usize| &luts[ty * config.tiles_x as usize + tx];

    let inv_tw = 1.0 / f64::from(tile_w);
    let inv_th = 1.0 / f64::from(tile_h);
    let last_tx = config.tiles_x as i64 - 1;
    let last_ty = config.tiles_y as i64 - 1;

    GrayImage::from_fn(w, h, |x, y| {
        let v = usize::from(image.get_pixel(x, y).0[0]);

        let txf = f64::from(x).mul_add(inv_tw, -0.5);
        let tx1 = txf.floor() as i64;
        let xa = txf - tx1 as f64;
        let (left, right) = (tx1.max(0) as usize, (tx1 + 1).min(last_tx) as usize);

        let tyf = f64::from(y).mul_add(inv_th, -0.5);
        let ty1 = tyf.floor() as i64;
        let ya = tyf - ty1 as f64;
        let (top, bottom) = (ty1.max(0) as usize, (ty1 + 1).min(last_ty) as usize);

        let blend = |row: usize| {
            f64::from(lut(left, row)[v]).mul_add(1.0 - xa, f64::from(lut(right, row)[v]) * xa)
        };
        Luma([saturate(blend(top).mul_add(1.0 - ya, blend(bottom) * ya))])
    })
}

fn tile_histogram(image: &GrayImage, x0: u32, y0: u32, tile_w: u32, tile_h: u32) -> [u64; BINS] {
    let (w, h) = image.dimensions();
    let mut hist = [0u64; BINS];
    for y in y0..y0 + tile_h {
        for x in x0..x0 + tile_w {
            let px = image.get_pixel(mirror(x, w), mirror(y, h)).0[0];
            hist[usize::from(px)] += 1;
        }
    }
    hist
}

/// Mirror a coordinate past the far edge back inside (`..cd|cb..`).
const fn mirror(i: u32, len: u32) -> u32 {
    if i < len {
        i
    } else if len == 1 {
        0
    } else {
        let back = i - len + 2;
        if back > len { 0 } else { len - back }
    }
}

/// Cap every bin at `clip` and redistribute the excess: an equal share to
/// every bin, then single counts stepped evenly across the histogram.
fn clip_histogram(hist: &mut [u64; BINS], clip: u64) {
    let mut clipped = 0;
    for bin in hist.iter_mut() {
        if *bin > clip {
            clipped += *bin - clip;
            *bin = clip;
        }
    }

    let bins = BINS as u64;
    let batch = clipped / bins;
    let mut residual = clipped - batch * bins;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (bins / residual).max(1);
        let mut i = 0;
        while i < bins && residual > 0 {
            hist[i as usize] += 1;
            residual -= 1;
            i += step;
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn equalization_lut(hist: &[u64; BINS], tile_area: u64) -> [u8; BINS] {
    let scale = 255.0 / tile_area as f64;
    let mut lut = [0u8; BINS];
    let mut cdf = 0u64;
    for (entry, &count) in lut.iter_mut().zip(hist) {
        cdf += count;
        *entry = saturate(cdf as f64 * scale);
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_dimensions() {
        let img = GrayImage::new(37, 23);
        let out = clahe(&img, &ClaheConfig::default());
        assert_eq!(out.dimensions(), (37, 23));
    }

    #[test]
    fn mirror_reflects_past_far_edge() {
        assert_eq!(mirror(3, 10), 3);
        assert_eq!(mirror(10, 10), 8);
        assert_eq!(mirror(11, 10), 7);
        assert_eq!(mirror(4, 1), 0);
    }

    #[test]
    fn clip_redistributes_all_excess() {
        let mut hist = [0u64; BINS];
        hist[10] = 1000;
        clip_histogram(&mut hist, 100);
        assert_eq!(hist.iter().sum::<u64>(), 1000);
        assert!(hist[10] <= 100 + 4);
    }

    #[test]
    fn lut_is_monotonic_and_ends_at_white() {
        let mut hist = [0u64; BINS];
        hist[50] = 30;
        hist[200] = 34;
        let lut = equalization_lut(&hist, 64);
        assert!(lut.windows(2).all(|p| p[0] <= p[1]));
        assert_eq!(lut[255], 255);
    }

    #[test]
    fn stretches_low_contrast_image() {
        let img = GrayImage::from_fn(64, 64, |x, _| Luma([if x < 32 { 100 } else { 110 }]));
        let config = ClaheConfig {
            tiles_x: 1,
            tiles_y: 1,
            ..ClaheConfig::default()
        };
        let out = clahe(&img, &config);
        let dark = out.get_pixel(2, 32).0[0];
        let bright = out.get_pixel(61, 32).0[0];
        assert!(
            i16::from(bright) - i16::from(dark) > 10,
            "dark = {dark}, bright = {bright}"
        );
    }

    #[test]
    fn preserves_intensity_order_within_tile() {
        let img = GrayImage::from_fn(16, 16, |x, y| Luma([u8::try_from(x + y * 16).unwrap_or(0)]));
        let config = ClaheConfig {
            clip_limit: 40.0,
            tiles_x: 1,
            tiles_y: 1,
        };
        let out = clahe(&img, &config);
        assert!(out.get_pixel(0, 0).0[0] <= out.get_pixel(15, 15).0[0]);
    }

    #[test]
    fn zero_grid_is_identity() {
        let img = GrayImage::from_pixel(8, 8, Luma([42]));
        let config = ClaheConfig {
            tiles_x: 0,
            ..ClaheConfig::default()
        };
        assert_eq!(clahe(&img, &config), img);
    }
}
