//! Viola-Jones face detection with boosted Haar cascades.
//!
//! Reads the OpenCV cascade XML format (`opencv-cascade-classifier`, HAAR
//! features, BOOST stages) such as `haarcascade_frontalface_default.xml`, and
//! scans an image pyramid with it.

use anyhow::{Context, Result, anyhow, bail};
use image::GrayImage;
use image::imageops::{self, FilterType};
use roxmltree::Node;
use std::borrow::Cow;
use std::path::Path;

use super::{FaceBounds, FaceDetector, group_rectangles};

pub const DEFAULT_SCALE_FACTOR: f32 = 1.3;
pub const DEFAULT_MIN_NEIGHBORS: usize = 5;
/// Longest side the detector scans; larger inputs are downscaled first
pub const DEFAULT_MAX_DIMENSION: u32 = 640;
const GROUP_EPS: f32 = 0.2;
/// Subtracted from every stage threshold on load, as OpenCV does
const STAGE_THRESHOLD_EPS: f32 = 1e-5;

/// Tunables for `detect_multi_scale`
#[derive(Debug, Clone, Copy)]
pub struct DetectionParams {
    /// Pyramid step between scanned scales (must be > 1)
    pub scale_factor: f32,
    /// Raw hits a cluster needs beyond this count to count as a face
    pub min_neighbors: usize,
    pub max_dimension: u32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

#[derive(Debug)]
struct Rect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f32,
}

#[derive(Debug)]
struct Feature {
    rects: Vec<Rect>,
}

/// Split node; a child index <= 0 points at leaf `-index`
#[derive(Debug)]
struct TreeNode {
    left: i32,
    right: i32,
    feature: usize,
    threshold: f32,
}

#[derive(Debug)]
struct WeakClassifier {
    nodes: Vec<TreeNode>,
    leaves: Vec<f32>,
}

#[derive(Debug)]
struct Stage {
    threshold: f32,
    classifiers: Vec<WeakClassifier>,
}

/// Boosted cascade of Haar-like features
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<Feature>,
    params: DetectionParams,
}

impl HaarCascade {
    pub fn from_file(path: &Path) -> Result<Self> {
        let xml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cascade {}", path.display()))?;
        let cascade = Self::from_xml(&xml)?;

        log::info!(
            "Loaded Haar cascade {} ({} stages, {} features, {}x{} window)",
            path.display(),
            cascade.stages.len(),
            cascade.features.len(),
            cascade.window_width,
            cascade.window_height
        );
        Ok(cascade)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml).context("Invalid cascade XML")?;
        let root = doc
            .descendants()
            .find(|n| n.has_tag_name("cascade"))
            .ok_or_else(|| anyhow!("Missing <cascade> element (old-format cascades are not supported)"))?;

        let feature_type = child_text(root, "featureType")?;
        if !feature_type.eq_ignore_ascii_case("HAAR") {
            bail!("Unsupported feature type: {}", feature_type);
        }
        let stage_type = child_text(root, "stageType")?;
        if !stage_type.eq_ignore_ascii_case("BOOST") {
            bail!("Unsupported stage type: {}", stage_type);
        }

        let window_width: u32 = child_text(root, "width")?.parse()?;
        let window_height: u32 = child_text(root, "height")?.parse()?;
        if window_width < 3 || window_height < 3 {
            bail!("Cascade window {}x{} is too small", window_width, window_height);
        }

        let stages = items(child(root, "stages")?)
            .map(parse_stage)
            .collect::<Result<Vec<_>>>()?;
        let features = items(child(root, "features")?)
            .map(parse_feature)
            .collect::<Result<Vec<_>>>()?;

        let cascade = Self {
            window_width,
            window_height,
            stages,
            features,
            params: DetectionParams::default(),
        };
        cascade.validate()?;
        Ok(cascade)
    }

    pub fn with_params(mut self, params: DetectionParams) -> Self {
        self.params = params;
        self
    }

    /// Reject cascades whose indices or rectangles would read out of bounds,
    /// or whose trees could loop
    fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            bail!("Cascade has no stages");
        }

        for (s, stage) in self.stages.iter().enumerate() {
            for classifier in &stage.classifiers {
                if classifier.nodes.is_empty() {
                    bail!("Stage {} has a weak classifier without nodes", s);
                }
                for (n, node) in classifier.nodes.iter().enumerate() {
                    if node.feature >= self.features.len() {
                        bail!("Stage {} references missing feature {}", s, node.feature);
                    }
                    for child in [node.left, node.right] {
                        let valid = if child <= 0 {
                            ((-child) as usize) < classifier.leaves.len()
                        } else {
                            (child as usize) > n && (child as usize) < classifier.nodes.len()
                        };
                        if !valid {
                            bail!("Stage {} has an invalid tree link {}", s, child);
                        }
                    }
                }
            }
        }

        for (f, feature) in self.features.iter().enumerate() {
            if feature.rects.is_empty() {
                bail!("Feature {} has no rectangles", f);
            }
            for r in &feature.rects {
                if r.x + r.width > self.window_width || r.y + r.height > self.window_height {
                    bail!("Feature {} extends outside the detection window", f);
                }
            }
        }

        Ok(())
    }

    /// Scan an image pyramid and return grouped detections in the
    /// coordinates of `gray`
    pub fn detect_multi_scale(&self, gray: &GrayImage) -> Vec<FaceBounds> {
        let (width, height) = gray.dimensions();
        let longest = width.max(height);

        let (work, ratio) = if longest > self.params.max_dimension && self.params.max_dimension > 0 {
            let ratio = longest as f32 / self.params.max_dimension as f32;
            let w = ((width as f32 / ratio).round() as u32).max(1);
            let h = ((height as f32 / ratio).round() as u32).max(1);
            (Cow::Owned(imageops::resize(gray, w, h, FilterType::Triangle)), ratio)
        } else {
            (Cow::Borrowed(gray), 1.0)
        };

        let candidates = self.scan_pyramid(&work);
        let grouped = group_rectangles(&candidates, self.params.min_neighbors, GROUP_EPS);

        if ratio == 1.0 {
            return grouped;
        }
        grouped
            .into_iter()
            .map(|r| FaceBounds {
                x: (r.x as f32 * ratio).round() as i32,
                y: (r.y as f32 * ratio).round() as i32,
                width: (r.width as f32 * ratio).round() as i32,
                height: (r.height as f32 * ratio).round() as i32,
            })
            .collect()
    }

    /// Raw window hits over every pyramid level, before grouping
    fn scan_pyramid(&self, gray: &GrayImage) -> Vec<FaceBounds> {
        let mut hits = Vec::new();
        if self.params.scale_factor <= 1.0 {
            log::warn!("Scale factor {} must exceed 1.0, skipping face scan", self.params.scale_factor);
            return hits;
        }

        let (width, height) = gray.dimensions();
        let mut factor = 1.0f32;

        loop {
            let level_w = (width as f32 / factor).round() as u32;
            let level_h = (height as f32 / factor).round() as u32;
            if level_w <= self.window_width || level_h <= self.window_height {
                break;
            }

            let level = if factor == 1.0 {
                Cow::Borrowed(gray)
            } else {
                Cow::Owned(imageops::resize(gray, level_w, level_h, FilterType::Triangle))
            };
            let integral = Integral::new(&level);

            let step = if factor > 2.0 { 1 } else { 2 };
            let window_w = (self.window_width as f32 * factor).round() as i32;
            let window_h = (self.window_height as f32 * factor).round() as i32;

            for y in (0..level_h - self.window_height).step_by(step) {
                for x in (0..level_w - self.window_width).step_by(step) {
                    if self.accepts(&integral, x, y) {
                        hits.push(FaceBounds {
                            x: (x as f32 * factor).round() as i32,
                            y: (y as f32 * factor).round() as i32,
                            width: window_w,
                            height: window_h,
                        });
                    }
                }
            }

            factor *= self.params.scale_factor;
        }

        hits
    }

    /// Run every stage on the window at (x, y); true if none rejects
    fn accepts(&self, integral: &Integral, x: u32, y: u32) -> bool {
        let (ww, wh) = (self.window_width, self.window_height);
        let area = ((ww - 2) * (wh - 2)) as f64;
        let sum = integral.sum(x + 1, y + 1, ww - 2, wh - 2) as f64;
        let sqsum = integral.sqsum(x + 1, y + 1, ww - 2, wh - 2) as f64;

        let nf = area * sqsum - sum * sum;
        let nf = if nf > 0.0 { nf.sqrt() } else { 1.0 };

        for stage in &self.stages {
            let mut total = 0.0f64;
            for classifier in &stage.classifiers {
                total += self.evaluate_tree(classifier, integral, x, y, nf) as f64;
            }
            if total < stage.threshold as f64 {
                return false;
            }
        }
        true
    }

    fn evaluate_tree(
        &self,
        classifier: &WeakClassifier,
        integral: &Integral,
        x: u32,
        y: u32,
        nf: f64,
    ) -> f32 {
        let mut idx = 0i32;
        loop {
            let node = &classifier.nodes[idx as usize];
            let value = self.features[node.feature]
                .rects
                .iter()
                .map(|r| r.weight as f64 * integral.sum(x + r.x, y + r.y, r.width, r.height) as f64)
                .sum::<f64>()
                / nf;

            idx = if value < node.threshold as f64 {
                node.left
            } else {
                node.right
            };
            if idx <= 0 {
                return classifier.leaves[(-idx) as usize];
            }
        }
    }
}

impl FaceDetector for HaarCascade {
    fn detect(&self, gray: &GrayImage) -> Vec<FaceBounds> {
        self.detect_multi_scale(gray)
    }
}

/// Summed-area tables of pixel values and squared pixel values
struct Integral {
    stride: usize,
    sum: Vec<u32>,
    sqsum: Vec<u64>,
}

impl Integral {
    fn new(gray: &GrayImage) -> Self {
        let (width, height) = (gray.width() as usize, gray.height() as usize);
        let stride = width + 1;
        let mut sum = vec![0u32; stride * (height + 1)];
        let mut sqsum = vec![0u64; stride * (height + 1)];

        let raw = gray.as_raw();
        for y in 0..height {
            let mut row_sum = 0u32;
            let mut row_sqsum = 0u64;
            for x in 0..width {
                let v = raw[y * width + x] as u32;
                row_sum += v;
                row_sqsum += (v * v) as u64;
                let at = (y + 1) * stride + x + 1;
                sum[at] = sum[at - stride] + row_sum;
                sqsum[at] = sqsum[at - stride] + row_sqsum;
            }
        }

        Self { stride, sum, sqsum }
    }

    fn sum(&self, x: u32, y: u32, width: u32, height: u32) -> i64 {
        let at = |xx: u32, yy: u32| self.sum[yy as usize * self.stride + xx as usize] as i64;
        at(x + width, y + height) - at(x, y + height) - at(x + width, y) + at(x, y)
    }

    fn sqsum(&self, x: u32, y: u32, width: u32, height: u32) -> u64 {
        let at = |xx: u32, yy: u32| self.sqsum[yy as usize * self.stride + xx as usize];
        at(x + width, y + height) + at(x, y) - at(x, y + height) - at(x + width, y)
    }
}

fn parse_stage(node: Node) -> Result<Stage> {
    let threshold = child_text(node, "stageThreshold")?.parse::<f32>()? - STAGE_THRESHOLD_EPS;
    let classifiers = items(child(node, "weakClassifiers")?)
        .map(parse_weak_classifier)
        .collect::<Result<Vec<_>>>()?;

    Ok(Stage {
        threshold,
        classifiers,
    })
}

fn parse_weak_classifier(node: Node) -> Result<WeakClassifier> {
    let internal = numbers(child_text(node, "internalNodes")?)?;
    if internal.is_empty() || internal.len() % 4 != 0 {
        bail!("internalNodes must hold groups of 4 values, got {}", internal.len());
    }

    let nodes = internal
        .chunks_exact(4)
        .map(|n| TreeNode {
            left: n[0] as i32,
            right: n[1] as i32,
            feature: n[2] as usize,
            threshold: n[3] as f32,
        })
        .collect();
    let leaves = numbers(child_text(node, "leafValues")?)?
        .into_iter()
        .map(|v| v as f32)
        .collect();

    Ok(WeakClassifier { nodes, leaves })
}

fn parse_feature(node: Node) -> Result<Feature> {
    if let Ok(tilted) = child_text(node, "tilted") {
        if tilted != "0" {
            bail!("Tilted Haar features are not supported");
        }
    }

    let rects = items(child(node, "rects")?)
        .map(|r| -> Result<Rect> {
            let values = numbers(r.text().unwrap_or_default())?;
            let [x, y, width, height, weight] = values[..] else {
                bail!("Feature rect needs 5 values, got {}", values.len());
            };
            if x < 0.0 || y < 0.0 || width <= 0.0 || height <= 0.0 {
                bail!("Feature rect has a negative origin or empty size");
            }
            Ok(Rect {
                x: x as u32,
                y: y as u32,
                width: width as u32,
                height: height as u32,
                weight: weight as f32,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Feature { rects })
}

/// Element children (the `<_>` entries of an OpenCV sequence)
fn items<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .ok_or_else(|| anyhow!("Missing <{}> element", name))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    Ok(child(node, name)?.text().unwrap_or_default().trim())
}

fn numbers(text: &str) -> Result<Vec<f64>> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .with_context(|| format!("Invalid number in cascade: {}", token))
        })
        .collect()
}
