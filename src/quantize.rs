use std::collections::{BTreeMap, BTreeSet, HashMap};

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::region_labelling::{Connectivity, connected_components};
use ndarray::{Array2, ErrorKind, ShapeError};

use crate::config::TraceConfig;
use crate::pixels::{Color, PixelPlane};
use crate::ConvertResult;

/// Per-pixel palette class. The class one past the palette is the keyed-out one.
type ClassImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// No class ever takes this value, so every pixel is labelled.
const NO_BACKGROUND: Luma<u16> = Luma([u16::MAX]);

/// Summary of one region of a [`LabelPlane`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionInfo {
    /// Representative color; fully transparent for keyed-out regions.
    pub color: Color,
    /// Number of pixels carrying this region id.
    pub area: usize,
}

/// Dense per-pixel region ids plus the representative color of every region.
///
/// Ids run from `0` to `region_count() - 1` without gaps and are numbered in
/// raster order of each region's first pixel.
#[derive(Debug, Clone)]
pub struct LabelPlane {
    labels: Array2<u32>,
    regions: Vec<RegionInfo>,
}

impl LabelPlane {
    /// Build a label plane from `[row, column]` ids and one color per id.
    ///
    /// Fails when an id has no color or a color has no pixel.
    pub fn new(labels: Array2<u32>, colors: Vec<Color>) -> ConvertResult<Self> {
        if labels.is_empty() {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }
        let mut regions: Vec<RegionInfo> = colors
            .into_iter()
            .map(|color| RegionInfo { color, area: 0 })
            .collect();
        for &label in labels.iter() {
            let region = regions
                .get_mut(label as usize)
                .ok_or_else(|| ShapeError::from_kind(ErrorKind::OutOfBounds))?;
            region.area += 1;
        }
        if regions.iter().any(|region| region.area == 0) {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }
        Ok(Self { labels, regions })
    }

    pub fn width(&self) -> u32 {
        self.labels.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.labels.nrows() as u32
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Region id of the pixel at column `x`, row `y`.
    pub fn label(&self, x: u32, y: u32) -> u32 {
        self.labels[[y as usize, x as usize]]
    }

    /// All ids, indexed `[row, column]`.
    pub fn labels(&self) -> &Array2<u32> {
        &self.labels
    }

    pub fn regions(&self) -> &[RegionInfo] {
        &self.regions
    }

    pub fn region(&self, id: u32) -> Option<&RegionInfo> {
        self.regions.get(id as usize)
    }
}

/// Reduce a pixel plane to a label plane: classify every pixel into a palette
/// (or binary) class, merge speckles below the minimum area and label the
/// resulting 4-connected regions.
pub fn quantize(plane: &PixelPlane, config: &TraceConfig) -> ConvertResult<LabelPlane> {
    let (palette, classes) = match config.binary_threshold() {
        Some(thr) => classify_binary(plane, thr, config.alpha_threshold()),
        None => classify_palette(
            plane,
            config.palette_size(),
            config.kmeans_iterations(),
            config.alpha_threshold(),
        ),
    };
    log::debug!("quantized into {} palette entries", palette.len());

    let classes = merge_small_components(&classes, config.minimum_region_area());
    let label_plane = build_label_plane(plane, &classes, &palette, config.alpha_threshold())?;
    log::debug!("label plane holds {} regions", label_plane.region_count());
    Ok(label_plane)
}

/// Threshold the grayscale image to produce a binary mask.
pub fn threshold_mask(gray: &GrayImage, thr: u8) -> GrayImage {
    threshold(gray, thr, ThresholdType::Binary)
}

/// Luminance above the threshold is background (white), the rest is ink (black).
fn classify_binary(plane: &PixelPlane, thr: u8, alpha_threshold: u8) -> (Vec<Color>, ClassImage) {
    let palette = vec![Color::BLACK, Color::WHITE];
    let keyed = palette.len() as u16;
    let mask = threshold_mask(&image::imageops::grayscale(plane.image()), thr);

    let (w, h) = plane.dimensions();
    let classes = ClassImage::from_fn(w, h, |x, y| {
        if plane.image().get_pixel(x, y)[3] < alpha_threshold {
            Luma([keyed])
        } else if mask.get_pixel(x, y)[0] == 255 {
            Luma([1])
        } else {
            Luma([0])
        }
    });
    (palette, classes)
}

fn classify_palette(
    plane: &PixelPlane,
    palette_size: usize,
    iterations: usize,
    alpha_threshold: u8,
) -> (Vec<Color>, ClassImage) {
    let mut histogram: BTreeMap<[u8; 3], u64> = BTreeMap::new();
    for px in plane.image().pixels() {
        if px[3] >= alpha_threshold {
            *histogram.entry([px[0], px[1], px[2]]).or_insert(0) += 1;
        }
    }

    let centroids = kmeans(&histogram, palette_size, iterations);
    let nearest: HashMap<[u8; 3], u16> = histogram
        .keys()
        .map(|&color| (color, nearest_centroid(&centroids, color) as u16))
        .collect();

    let keyed = centroids.len() as u16;
    let (w, h) = plane.dimensions();
    let classes = ClassImage::from_fn(w, h, |x, y| {
        let px = plane.image().get_pixel(x, y);
        if px[3] < alpha_threshold {
            Luma([keyed])
        } else {
            Luma([nearest[&[px[0], px[1], px[2]]]])
        }
    });

    let palette = centroids
        .into_iter()
        .map(|[r, g, b]| Color::rgb(r, g, b))
        .collect();
    (palette, classes)
}

/// Integer luma used to order colors for centroid seeding.
fn luma_key([r, g, b]: [u8; 3]) -> u32 {
    299 * r as u32 + 587 * g as u32 + 114 * b as u32
}

fn distance_sq(a: [f64; 3], b: [f64; 3]) -> f64 {
    (0..3).map(|c| (a[c] - b[c]) * (a[c] - b[c])).sum()
}

fn to_f64([r, g, b]: [u8; 3]) -> [f64; 3] {
    [r as f64, g as f64, b as f64]
}

/// Index of the closest centroid; ties go to the lowest index.
fn nearest_centroid(centroids: &[[u8; 3]], color: [u8; 3]) -> usize {
    let color = to_f64(color);
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = distance_sq(to_f64(*centroid), color);
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

/// Weighted Lloyd refinement over a color histogram.
///
/// Seeds are the distinct colors at evenly spaced positions of the histogram
/// sorted by luminance, so the result only depends on the input colors.
/// Returns at most `k` distinct centroids; an empty histogram yields none.
pub fn kmeans(histogram: &BTreeMap<[u8; 3], u64>, k: usize, iterations: usize) -> Vec<[u8; 3]> {
    if histogram.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut entries: Vec<([u8; 3], u64)> = histogram.iter().map(|(c, n)| (*c, *n)).collect();
    entries.sort_by_key(|(color, _)| (luma_key(*color), *color));

    let k = k.min(entries.len());
    let len = entries.len();
    let mut centroids: Vec<[f64; 3]> = (0..k)
        .map(|i| to_f64(entries[(2 * i + 1) * len / (2 * k)].0))
        .collect();

    for _ in 0..iterations {
        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0u64; k];
        for (color, count) in &entries {
            let value = to_f64(*color);
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (i, centroid) in centroids.iter().enumerate() {
                let distance = distance_sq(*centroid, value);
                if distance < best_distance {
                    best = i;
                    best_distance = distance;
                }
            }
            for c in 0..3 {
                sums[best][c] += value[c] * *count as f64;
            }
            counts[best] += count;
        }
        for (centroid, (sum, count)) in centroids.iter_mut().zip(sums.iter().zip(&counts)) {
            if *count > 0 {
                for c in 0..3 {
                    centroid[c] = sum[c] / *count as f64;
                }
            }
        }
    }

    let mut palette: Vec<[u8; 3]> = Vec::with_capacity(k);
    for centroid in centroids {
        let color = centroid.map(|v| v.round().clamp(0.0, 255.0) as u8);
        if !palette.contains(&color) {
            palette.push(color);
        }
    }
    palette
}

/// 4-connected components of equal class, numbered densely in raster order.
struct Components {
    labels: Vec<u32>,
    count: usize,
}

fn label_components(classes: &ClassImage) -> Components {
    let raw = connected_components(classes, Connectivity::Four, NO_BACKGROUND).into_raw();
    let max_label = raw.iter().copied().max().unwrap_or(0) as usize;
    let mut remap = vec![u32::MAX; max_label + 1];
    let mut count = 0usize;
    let labels = raw
        .iter()
        .map(|&label| {
            let slot = &mut remap[label as usize];
            if *slot == u32::MAX {
                *slot = count as u32;
                count += 1;
            }
            *slot
        })
        .collect();
    Components { labels, count }
}

/// Merge components smaller than `min_area` into their dominant neighbour.
///
/// The smallest component goes first (ties by id) and joins the neighbour it
/// shares the most pixel edges with (ties to the lowest id). Merging stops
/// when no small component is left or a single component covers the image.
fn merge_small_components(classes: &ClassImage, min_area: usize) -> ClassImage {
    let components = label_components(classes);
    let n = components.count;
    if min_area <= 1 || n <= 1 {
        return classes.clone();
    }

    let (w, h) = classes.dimensions();
    let (w, h) = (w as usize, h as usize);
    let class_raw = classes.as_raw();
    let labels = &components.labels;

    let mut area = vec![0usize; n];
    let mut class = vec![0u16; n];
    for (i, &label) in labels.iter().enumerate() {
        area[label as usize] += 1;
        class[label as usize] = class_raw[i];
    }

    let mut adjacency: Vec<BTreeMap<usize, usize>> = vec![BTreeMap::new(); n];
    for y in 0..h {
        for x in 0..w {
            let here = labels[y * w + x] as usize;
            let mut link = |other: usize| {
                if other != here {
                    *adjacency[here].entry(other).or_insert(0) += 1;
                    *adjacency[other].entry(here).or_insert(0) += 1;
                }
            };
            if x + 1 < w {
                link(labels[y * w + x + 1] as usize);
            }
            if y + 1 < h {
                link(labels[(y + 1) * w + x] as usize);
            }
        }
    }

    let mut parent: Vec<usize> = (0..n).collect();
    let mut alive = n;
    let mut pending: BTreeSet<(usize, usize)> = (0..n)
        .filter(|&c| area[c] < min_area)
        .map(|c| (area[c], c))
        .collect();

    while alive > 1 {
        let Some((_, small)) = pending.pop_first() else {
            break;
        };
        let target = adjacency[small]
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&id, _)| id);
        let Some(target) = target else {
            continue;
        };

        let edges = std::mem::take(&mut adjacency[small]);
        for (neighbor, count) in edges {
            adjacency[neighbor].remove(&small);
            if neighbor != target {
                *adjacency[target].entry(neighbor).or_insert(0) += count;
                *adjacency[neighbor].entry(target).or_insert(0) += count;
            }
        }

        if area[target] < min_area {
            pending.remove(&(area[target], target));
        }
        area[target] += area[small];
        area[small] = 0;
        if area[target] < min_area {
            pending.insert((area[target], target));
        }
        parent[small] = target;
        alive -= 1;
    }

    let resolved: Vec<u16> = (0..n)
        .map(|mut c| {
            while parent[c] != c {
                c = parent[c];
            }
            class[c]
        })
        .collect();

    let merged: Vec<u16> = labels.iter().map(|&l| resolved[l as usize]).collect();
    ClassImage::from_raw(w as u32, h as u32, merged).unwrap_or_else(|| classes.clone())
}

/// Label the merged classes. A region's opacity is the mean alpha of its own
/// visible pixels; keyed pixels merged in from speckles do not count.
fn build_label_plane(
    plane: &PixelPlane,
    classes: &ClassImage,
    palette: &[Color],
    alpha_threshold: u8,
) -> ConvertResult<LabelPlane> {
    let components = label_components(classes);
    let n = components.count;

    let mut class = vec![0u16; n];
    let mut alpha_sum = vec![0u64; n];
    let mut visible = vec![0u64; n];
    for ((&label, &cls), px) in components
        .labels
        .iter()
        .zip(classes.as_raw())
        .zip(plane.image().pixels())
    {
        let label = label as usize;
        class[label] = cls;
        if px[3] >= alpha_threshold {
            alpha_sum[label] += px[3] as u64;
            visible[label] += 1;
        }
    }

    let colors = (0..n)
        .map(|id| match palette.get(class[id] as usize) {
            Some(color) => {
                let alpha = if visible[id] == 0 {
                    255
                } else {
                    (alpha_sum[id] as f64 / visible[id] as f64).round() as u8
                };
                Color::new(color.r, color.g, color.b, alpha.max(1))
            }
            None => Color::TRANSPARENT,
        })
        .collect();

    let (w, h) = plane.dimensions();
    let labels = Array2::from_shape_vec((h as usize, w as usize), components.labels)?;
    LabelPlane::new(labels, colors)
}
