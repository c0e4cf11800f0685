/// Template matching implementation
///
/// Zero-mean normalized cross-correlation with a coarse-to-fine search:
/// small searches scan every placement at full resolution, large ones scan a
/// downscaled pyramid level first and refine the best candidates.
use super::frame::Frame;
use super::region::Region;
use super::template::Template;
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::template_matching::{MatchTemplateMethod, match_template};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Minimum similarity for a placement to count as a match
pub const DEFAULT_SIMILARITY: f32 = 0.7;

/// Placements × template pixels above which the pyramid is used
const DIRECT_SEARCH_BUDGET: u64 = 40_000_000;
/// Smallest template side allowed on the coarse level
const MIN_COARSE_SIDE: u32 = 12;
const MAX_PYRAMID_FACTOR: u32 = 8;
/// Coarse scores are blurrier, so candidates get this much slack
const COARSE_SLACK: f32 = 0.25;
const COARSE_CANDIDATES: usize = 8;
/// Per-pixel variance below which a patch counts as flat
const FLAT_VARIANCE: f64 = 1.0;

/// A located template occurrence
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Match {
    /// Where the template sits, in device coordinates
    pub region: Region,
    /// Similarity in 0.0-1.0
    pub score: f32,
}

impl Match {
    /// Tap target for this match
    pub fn center(&self) -> (u32, u32) {
        self.region.center()
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}%", self.region, (self.score * 100.0) as u32)
    }
}

/// Locates templates in frames. Stateless apart from its threshold.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    threshold: f32,
}

impl TemplateMatcher {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Best placement of `template` in the whole frame, if it clears the threshold
    pub fn locate(&self, frame: &Frame, template: &Template) -> Option<Match> {
        self.locate_in(frame, template, None)
    }

    /// Like [`locate`](Self::locate), restricted to a region of interest
    pub fn locate_in(&self, frame: &Frame, template: &Template, roi: Option<Region>) -> Option<Match> {
        self.search(frame, template, roi, 1).into_iter().next()
    }

    /// Every non-overlapping placement above the threshold, best first
    pub fn locate_all(
        &self,
        frame: &Frame,
        template: &Template,
        roi: Option<Region>,
        max_matches: usize,
    ) -> Vec<Match> {
        self.search(frame, template, roi, max_matches)
    }

    fn search(&self, frame: &Frame, template: &Template, roi: Option<Region>, max_matches: usize) -> Vec<Match> {
        if max_matches == 0 {
            return Vec::new();
        }
        let area = match roi {
            Some(roi) => match frame.region().intersect(&roi) {
                Some(area) => area,
                None => return Vec::new(),
            },
            None => frame.region(),
        };
        let (tw, th) = (template.width(), template.height());
        if tw > area.width || th > area.height {
            log::debug!(
                "Template '{}' {}x{} larger than search area {}",
                template.name(),
                tw,
                th,
                area
            );
            return Vec::new();
        }

        let luma = frame.to_luma();
        let haystack = if area == frame.region() {
            luma
        } else {
            imageops::crop_imm(&luma, area.x, area.y, area.width, area.height).to_image()
        };

        let positions = (area.width - tw + 1) as u64 * (area.height - th + 1) as u64;
        let work = positions * (tw as u64 * th as u64);
        let factor = pyramid_factor(work, tw.min(th));

        let mut candidates = if factor > 1 {
            self.coarse_to_fine(&haystack, template.image(), factor, max_matches)
        } else {
            self.full_scan(&haystack, template.image())
        };

        sort_candidates(&mut candidates);
        let mut matches: Vec<Match> = Vec::new();
        for (x, y, score) in candidates {
            let region = Region::new(area.x + x, area.y + y, tw, th);
            if matches.iter().any(|m| m.region.overlaps(&region)) {
                continue;
            }
            matches.push(Match { region, score });
            if matches.len() >= max_matches {
                break;
            }
        }

        match matches.first() {
            Some(best) => log::debug!(
                "Template '{}' found at {} (pyramid x{}, {} match(es))",
                template.name(),
                best,
                factor,
                matches.len()
            ),
            None => log::debug!("Template '{}' not found in {}", template.name(), area),
        }
        matches
    }

    /// Score every placement at full resolution
    fn full_scan(&self, haystack: &GrayImage, template: &GrayImage) -> Vec<(u32, u32, f32)> {
        let scores = score_map(haystack, template);
        scores
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] >= self.threshold)
            .map(|(x, y, p)| (x, y, p[0]))
            .collect()
    }

    /// Find candidates on a downscaled level, then refine each at full resolution
    fn coarse_to_fine(
        &self,
        haystack: &GrayImage,
        template: &GrayImage,
        factor: u32,
        max_matches: usize,
    ) -> Vec<(u32, u32, f32)> {
        let small_haystack = imageops::resize(
            haystack,
            (haystack.width() / factor).max(1),
            (haystack.height() / factor).max(1),
            FilterType::Triangle,
        );
        let small_template = imageops::resize(
            template,
            (template.width() / factor).max(1),
            (template.height() / factor).max(1),
            FilterType::Triangle,
        );
        if small_template.width() > small_haystack.width()
            || small_template.height() > small_haystack.height()
        {
            return self.full_scan(haystack, template);
        }

        let coarse_threshold = (self.threshold - COARSE_SLACK).max(0.0);
        let mut coarse: Vec<(u32, u32, f32)> = score_map(&small_haystack, &small_template)
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] >= coarse_threshold)
            .map(|(x, y, p)| (x, y, p[0]))
            .collect();
        sort_candidates(&mut coarse);

        // One candidate per coarse neighbourhood
        let (sw, sh) = (small_template.width(), small_template.height());
        let limit = COARSE_CANDIDATES.max(max_matches.saturating_mul(2));
        let mut peaks: Vec<(u32, u32)> = Vec::new();
        for (x, y, _) in coarse {
            let footprint = Region::new(x, y, sw, sh);
            if peaks
                .iter()
                .any(|&(px, py)| Region::new(px, py, sw, sh).overlaps(&footprint))
            {
                continue;
            }
            peaks.push((x, y));
            if peaks.len() >= limit {
                break;
            }
        }

        let stats = WindowStats::new(haystack);
        let tstats = TemplateStats::new(template);
        let max_x = haystack.width() - template.width();
        let max_y = haystack.height() - template.height();

        let mut refined = Vec::new();
        for (cx, cy) in peaks {
            let (fx, fy) = (cx * factor, cy * factor);
            let mut best: Option<(u32, u32, f32)> = None;
            for y in fy.saturating_sub(factor)..=(fy + factor).min(max_y) {
                for x in fx.saturating_sub(factor)..=(fx + factor).min(max_x) {
                    let score = exact_score(haystack, template, &stats, &tstats, x, y);
                    if best.is_none_or(|(_, _, s)| score > s) {
                        best = Some((x, y, score));
                    }
                }
            }
            if let Some(candidate) = best
                && candidate.2 >= self.threshold
            {
                refined.push(candidate);
            }
        }
        refined
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY)
    }
}

/// Downscale factor keeping the search within budget, 1 for a direct scan
fn pyramid_factor(work: u64, template_min_side: u32) -> u32 {
    let mut factor = 1;
    while work / (factor as u64).pow(4) > DIRECT_SEARCH_BUDGET
        && factor < MAX_PYRAMID_FACTOR
        && template_min_side / (factor * 2) >= MIN_COARSE_SIDE
    {
        factor *= 2;
    }
    factor
}

/// Best score first; ties resolved in scan order so results are deterministic
fn sort_candidates(candidates: &mut [(u32, u32, f32)]) {
    candidates.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(Ordering::Equal)
            .then_with(|| (a.1, a.0).cmp(&(b.1, b.0)))
    });
}

/// Sums over any window of an image, from integral images
struct WindowStats {
    sum: ImageBuffer<Luma<u64>, Vec<u64>>,
    sum_sq: ImageBuffer<Luma<u64>, Vec<u64>>,
}

impl WindowStats {
    fn new(image: &GrayImage) -> Self {
        Self {
            sum: integral_image::<_, u64>(image),
            sum_sq: integral_squared_image::<_, u64>(image),
        }
    }

    /// (sum, sum of squares) of the w×h window at (x, y)
    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
        let rect = |img: &ImageBuffer<Luma<u64>, Vec<u64>>| {
            let a = img.get_pixel(x, y)[0];
            let b = img.get_pixel(x + w, y)[0];
            let c = img.get_pixel(x, y + h)[0];
            let d = img.get_pixel(x + w, y + h)[0];
            ((d + a) - (b + c)) as f64
        };
        (rect(&self.sum), rect(&self.sum_sq))
    }
}

struct TemplateStats {
    n: f64,
    sum: f64,
    mean: f64,
    /// Sum of squared deviations from the mean
    variance_n: f64,
}

impl TemplateStats {
    fn new(template: &GrayImage) -> Self {
        let n = (template.width() * template.height()) as f64;
        let (sum, sum_sq) = template.pixels().fold((0.0, 0.0), |(s, sq), p| {
            let v = p[0] as f64;
            (s + v, sq + v * v)
        });
        Self {
            n,
            sum,
            mean: sum / n,
            variance_n: (sum_sq - sum * sum / n).max(0.0),
        }
    }

    fn is_flat(&self) -> bool {
        self.variance_n / self.n < FLAT_VARIANCE
    }
}

/// Zero-mean normalized correlation from the window sums, clamped to 0.0-1.0
fn zncc(cross: f64, window_sum: f64, window_sum_sq: f64, t: &TemplateStats) -> f32 {
    let n = t.n;
    let window_variance_n = (window_sum_sq - window_sum * window_sum / n).max(0.0);
    let window_flat = window_variance_n / n < FLAT_VARIANCE;

    if t.is_flat() {
        // Correlation is undefined for a flat template; compare brightness instead
        return if window_flat {
            (1.0 - (window_sum / n - t.mean).abs() / 255.0) as f32
        } else {
            0.0
        };
    }
    if window_flat {
        return 0.0;
    }
    let numerator = cross - window_sum * t.sum / n;
    (numerator / (window_variance_n * t.variance_n).sqrt()).clamp(0.0, 1.0) as f32
}

/// Similarity of every placement of `template` in `image`
fn score_map(image: &GrayImage, template: &GrayImage) -> ImageBuffer<Luma<f32>, Vec<f32>> {
    let (tw, th) = template.dimensions();
    let stats = WindowStats::new(image);
    let tstats = TemplateStats::new(template);
    let mut cross = match_template(image, template, MatchTemplateMethod::CrossCorrelation);
    for (x, y, pixel) in cross.enumerate_pixels_mut() {
        let (window_sum, window_sum_sq) = stats.window(x, y, tw, th);
        pixel[0] = zncc(pixel[0] as f64, window_sum, window_sum_sq, &tstats);
    }
    cross
}

/// Similarity of one placement, computed directly
fn exact_score(
    image: &GrayImage,
    template: &GrayImage,
    stats: &WindowStats,
    tstats: &TemplateStats,
    x: u32,
    y: u32,
) -> f32 {
    let (tw, th) = template.dimensions();
    let mut cross = 0.0f64;
    for ty in 0..th {
        for tx in 0..tw {
            cross += image.get_pixel(x + tx, y + ty)[0] as f64 * template.get_pixel(tx, ty)[0] as f64;
        }
    }
    let (window_sum, window_sum_sq) = stats.window(x, y, tw, th);
    zncc(cross, window_sum, window_sum_sq, tstats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::path::Path;

    /// Deterministic texture so every placement looks different
    fn texture(x: u32, y: u32, seed: u32) -> u8 {
        let mut v = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663) ^ seed.wrapping_mul(83_492_791);
        v ^= v >> 13;
        v = v.wrapping_mul(0x5bd1_e995);
        v ^= v >> 15;
        (v & 0xff) as u8
    }

    fn textured_frame(width: u32, height: u32, seed: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = texture(x, y, seed);
            Rgba([v, v, v, 255])
        })
    }

    fn template_from(frame: &RgbaImage, region: Region) -> Template {
        let crop = imageops::crop_imm(frame, region.x, region.y, region.width, region.height).to_image();
        Template::from_image("patch.png", Path::new("patch.png"), imageops::grayscale(&crop)).unwrap()
    }

    #[test]
    fn test_exact_crop_is_found_with_full_score() {
        let image = textured_frame(120, 90, 1);
        let expected = Region::new(37, 21, 20, 16);
        let template = template_from(&image, expected);
        let frame = Frame::from_image(image).unwrap();

        let m = TemplateMatcher::default().locate(&frame, &template).unwrap();
        assert_eq!(m.region, expected);
        assert!(m.score > 0.99, "score was {}", m.score);
    }

    #[test]
    fn test_unrelated_template_is_not_found() {
        let frame = Frame::from_image(textured_frame(120, 90, 1)).unwrap();
        let other = textured_frame(40, 40, 99);
        let template = template_from(&other, Region::new(5, 5, 20, 16));

        assert!(TemplateMatcher::default().locate(&frame, &template).is_none());
    }

    #[test]
    fn test_large_search_uses_pyramid_and_finds_exact_spot() {
        let image = textured_frame(64, 64, 5);
        // Blocky texture survives downscaling
        let big = RgbaImage::from_fn(640, 960, |x, y| image.get_pixel((x / 8) % 64, (y / 8) % 64).to_owned());
        let mut frame_image = RgbaImage::from_pixel(640, 960, Rgba([30, 30, 30, 255]));
        let target = Region::new(333, 517, 64, 64);
        let patch = imageops::crop_imm(&big, 0, 0, 64, 64).to_image();
        imageops::replace(&mut frame_image, &patch, target.x as i64, target.y as i64);
        let template = template_from(&frame_image, target);

        let work = (640 - 64 + 1) as u64 * (960 - 64 + 1) as u64 * 64 * 64;
        assert!(pyramid_factor(work, 64) > 1);

        let frame = Frame::from_image(frame_image).unwrap();
        let m = TemplateMatcher::default().locate(&frame, &template).unwrap();
        assert_eq!(m.region, target);
        assert!(m.score > 0.99);
    }

    #[test]
    fn test_region_of_interest_limits_search() {
        let image = textured_frame(120, 90, 3);
        let target = Region::new(80, 50, 20, 20);
        let template = template_from(&image, target);
        let frame = Frame::from_image(image).unwrap();
        let matcher = TemplateMatcher::default();

        let m = matcher
            .locate_in(&frame, &template, Some(Region::new(60, 40, 60, 50)))
            .unwrap();
        assert_eq!(m.region, target, "coordinates are in device space");
        assert!(
            matcher
                .locate_in(&frame, &template, Some(Region::new(0, 0, 60, 45)))
                .is_none()
        );
        assert!(
            matcher
                .locate_in(&frame, &template, Some(Region::new(500, 500, 10, 10)))
                .is_none()
        );
    }

    #[test]
    fn test_locate_all_returns_non_overlapping_matches() {
        let tile = textured_frame(16, 16, 7);
        let mut image = textured_frame(200, 100, 8);
        let spots = [(10u32, 10u32), (90, 40), (160, 70)];
        for &(x, y) in &spots {
            imageops::replace(&mut image, &tile, x as i64, y as i64);
        }
        let template = Template::from_image("tile.png", Path::new("tile.png"), imageops::grayscale(&tile)).unwrap();
        let frame = Frame::from_image(image).unwrap();

        let matches = TemplateMatcher::default().locate_all(&frame, &template, None, 10);
        assert_eq!(matches.len(), 3);
        for &(x, y) in &spots {
            assert!(matches.iter().any(|m| m.region.x == x && m.region.y == y));
        }
        for (i, a) in matches.iter().enumerate() {
            for b in &matches[i + 1..] {
                assert!(!a.region.overlaps(&b.region));
            }
        }

        let limited = TemplateMatcher::default().locate_all(&frame, &template, None, 2);
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_template_larger_than_frame() {
        let frame = Frame::from_image(textured_frame(10, 10, 1)).unwrap();
        let template = template_from(&textured_frame(20, 20, 1), Region::new(0, 0, 20, 20));
        assert!(TemplateMatcher::default().locate(&frame, &template).is_none());
    }

    #[test]
    fn test_flat_template_matches_flat_area_of_same_brightness() {
        let mut image = RgbaImage::from_pixel(60, 60, Rgba([200, 200, 200, 255]));
        let dark = RgbaImage::from_pixel(10, 10, Rgba([20, 20, 20, 255]));
        imageops::replace(&mut image, &dark, 30, 30);
        let frame = Frame::from_image(image).unwrap();
        let template = Template::from_image(
            "dark.png",
            Path::new("dark.png"),
            GrayImage::from_pixel(10, 10, Luma([20])),
        )
        .unwrap();

        let m = TemplateMatcher::default().locate(&frame, &template).unwrap();
        assert_eq!(m.region, Region::new(30, 30, 10, 10));
    }

    #[test]
    fn test_zncc_is_brightness_invariant() {
        let t = GrayImage::from_fn(4, 4, |x, y| Luma([(x * 40 + y * 10) as u8]));
        let tstats = TemplateStats::new(&t);
        // Same pattern shifted +30 in brightness
        let window = GrayImage::from_fn(4, 4, |x, y| Luma([(x * 40 + y * 10 + 30) as u8]));
        let stats = WindowStats::new(&window);
        let score = exact_score(&window, &t, &stats, &tstats, 0, 0);
        assert!(score > 0.999, "score was {score}");
    }

    #[test]
    fn test_threshold_is_clamped() {
        assert_eq!(TemplateMatcher::new(1.7).threshold(), 1.0);
        assert_eq!(TemplateMatcher::new(-0.5).threshold(), 0.0);
        assert_eq!(TemplateMatcher::default().threshold(), DEFAULT_SIMILARITY);
    }
}
