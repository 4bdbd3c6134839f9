//! Frame anomaly analysis for proctoring
//!
//! Stateless single-frame checks: no face, multiple faces, eyes not
//! visible, low light. Face and eye detection sit behind the
//! `FaceDetector` trait; the default implementation is a coarse
//! block-statistics heuristic, so its findings are advisory. The event
//! mapping and confidences are fixed regardless of detector.

use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::sync::Arc;

/// Mean luma below this reads as a dark room (0-255 scale)
const LOW_LIGHT_THRESHOLD: f64 = 50.0;

/// Frame event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameEventKind {
    NoFace,
    MultiFace,
    EyesOff,
    LowLight,
}

impl FrameEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameEventKind::NoFace => "no_face",
            FrameEventKind::MultiFace => "multi_face",
            FrameEventKind::EyesOff => "eyes_off",
            FrameEventKind::LowLight => "low_light",
        }
    }
}

/// One detected anomaly in a frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameEvent {
    pub kind: FrameEventKind,
    pub confidence: f64,
    pub note: String,
}

/// Bounding box of a detected face, in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Face/eye detection seam. Single-frame detection without temporal
/// calibration is inherently rough; implementations report what they see
/// and the analyzer keeps the confidences low accordingly.
pub trait FaceDetector: Send + Sync {
    fn detect_faces(&self, frame: &GrayImage) -> Vec<FaceRegion>;
    fn eyes_visible(&self, frame: &GrayImage, face: &FaceRegion) -> bool;
}

/// Stateless analyzer mapping detector output to proctor events
#[derive(Clone)]
pub struct FrameAnalyzer {
    detector: Arc<dyn FaceDetector>,
}

impl FrameAnalyzer {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self { detector }
    }

    /// Analyze one decoded frame. Output may be empty or contain several
    /// simultaneous findings.
    pub fn analyze(&self, frame: &DynamicImage) -> Vec<FrameEvent> {
        let gray = frame.to_luma8();
        let faces = self.detector.detect_faces(&gray);

        let mut events = Vec::new();

        if faces.is_empty() {
            events.push(FrameEvent {
                kind: FrameEventKind::NoFace,
                confidence: 1.0,
                note: "No face detected in frame".to_string(),
            });
        } else if faces.len() > 1 {
            events.push(FrameEvent {
                kind: FrameEventKind::MultiFace,
                confidence: 0.9,
                note: format!("Detected {} faces", faces.len()),
            });
        }

        for face in &faces {
            if !self.detector.eyes_visible(&gray, face) {
                events.push(FrameEvent {
                    kind: FrameEventKind::EyesOff,
                    confidence: 0.6,
                    note: "Eyes not clearly visible".to_string(),
                });
            }
        }

        let brightness = mean_brightness(&gray);
        if brightness < LOW_LIGHT_THRESHOLD {
            events.push(FrameEvent {
                kind: FrameEventKind::LowLight,
                confidence: 0.9,
                note: format!("Low brightness detected ({})", brightness as u32),
            });
        }

        events
    }

    /// Decode raw image bytes and analyze; undecodable frames yield no
    /// events rather than an error
    pub fn analyze_bytes(&self, bytes: &[u8]) -> Vec<FrameEvent> {
        match image::load_from_memory(bytes) {
            Ok(frame) => self.analyze(&frame),
            Err(e) => {
                tracing::warn!("Could not decode proctor frame: {}", e);
                Vec::new()
            }
        }
    }

    /// Largest detected face, used by the media processor's crop window
    pub fn largest_face(&self, frame: &DynamicImage) -> Option<FaceRegion> {
        let gray = frame.to_luma8();
        self.detector
            .detect_faces(&gray)
            .into_iter()
            .max_by_key(|f| f.width as u64 * f.height as u64)
    }
}

fn mean_brightness(gray: &GrayImage) -> f64 {
    let pixels = gray.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    let sum: u64 = pixels.iter().map(|&p| p as u64).sum();
    sum as f64 / pixels.len() as f64
}

/// Default detector: block statistics over a coarse grid. Candidate blocks
/// are mid-tone with local contrast; adjacent candidates merge into
/// regions, and regions of plausible size/aspect count as faces. Eyes are
/// dark spots in the upper part of a face region.
pub struct BlockFaceDetector {
    grid: u32,
}

impl BlockFaceDetector {
    pub fn new() -> Self {
        Self { grid: 16 }
    }

    fn block_stats(&self, frame: &GrayImage) -> Vec<(f64, f64)> {
        let (width, height) = frame.dimensions();
        let bw = (width / self.grid).max(1);
        let bh = (height / self.grid).max(1);

        let mut stats = Vec::with_capacity((self.grid * self.grid) as usize);
        for by in 0..self.grid {
            for bx in 0..self.grid {
                let mut sum = 0u64;
                let mut sum_sq = 0u64;
                let mut count = 0u64;
                for y in (by * bh)..((by + 1) * bh).min(height) {
                    for x in (bx * bw)..((bx + 1) * bw).min(width) {
                        let p = frame.get_pixel(x, y).0[0] as u64;
                        sum += p;
                        sum_sq += p * p;
                        count += 1;
                    }
                }
                if count == 0 {
                    stats.push((0.0, 0.0));
                    continue;
                }
                let mean = sum as f64 / count as f64;
                let variance = (sum_sq as f64 / count as f64) - mean * mean;
                stats.push((mean, variance.max(0.0).sqrt()));
            }
        }
        stats
    }
}

impl Default for BlockFaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceDetector for BlockFaceDetector {
    fn detect_faces(&self, frame: &GrayImage) -> Vec<FaceRegion> {
        let (width, height) = frame.dimensions();
        if width < self.grid || height < self.grid {
            return Vec::new();
        }
        let bw = width / self.grid;
        let bh = height / self.grid;
        let stats = self.block_stats(frame);

        let candidate = |bx: u32, by: u32| {
            let (mean, stddev) = stats[(by * self.grid + bx) as usize];
            (60.0..=200.0).contains(&mean) && stddev > 12.0
        };

        // Greedy region growth over the candidate grid, 4-connected
        let mut visited = vec![false; (self.grid * self.grid) as usize];
        let mut regions = Vec::new();
        for by in 0..self.grid {
            for bx in 0..self.grid {
                let idx = (by * self.grid + bx) as usize;
                if visited[idx] || !candidate(bx, by) {
                    continue;
                }
                let mut stack = vec![(bx, by)];
                let (mut min_x, mut min_y, mut max_x, mut max_y) = (bx, by, bx, by);
                let mut size = 0u32;
                while let Some((cx, cy)) = stack.pop() {
                    let cidx = (cy * self.grid + cx) as usize;
                    if visited[cidx] || !candidate(cx, cy) {
                        continue;
                    }
                    visited[cidx] = true;
                    size += 1;
                    min_x = min_x.min(cx);
                    min_y = min_y.min(cy);
                    max_x = max_x.max(cx);
                    max_y = max_y.max(cy);
                    if cx > 0 {
                        stack.push((cx - 1, cy));
                    }
                    if cy > 0 {
                        stack.push((cx, cy - 1));
                    }
                    if cx + 1 < self.grid {
                        stack.push((cx + 1, cy));
                    }
                    if cy + 1 < self.grid {
                        stack.push((cx, cy + 1));
                    }
                }

                let region_w = max_x - min_x + 1;
                let region_h = max_y - min_y + 1;
                let aspect = region_w as f64 / region_h as f64;
                if size >= 4 && region_w >= 2 && region_h >= 2 && (0.4..=2.5).contains(&aspect) {
                    regions.push(FaceRegion {
                        x: min_x * bw,
                        y: min_y * bh,
                        width: region_w * bw,
                        height: region_h * bh,
                    });
                }
            }
        }
        regions
    }

    fn eyes_visible(&self, frame: &GrayImage, face: &FaceRegion) -> bool {
        let (width, height) = frame.dimensions();
        let top = face.y;
        let bottom = (face.y + face.height * 2 / 5).min(height);
        let right = (face.x + face.width).min(width);
        if bottom <= top || right <= face.x {
            return false;
        }

        let mut sum = 0u64;
        let mut count = 0u64;
        for y in top..bottom {
            for x in face.x..right {
                sum += frame.get_pixel(x, y).0[0] as u64;
                count += 1;
            }
        }
        if count == 0 {
            return false;
        }
        let band_mean = sum as f64 / count as f64;

        // Count pixels markedly darker than the band; eyes show up as two
        // dark clusters, so require a minimal dark fraction
        let mut dark = 0u64;
        for y in top..bottom {
            for x in face.x..right {
                if (frame.get_pixel(x, y).0[0] as f64) < band_mean - 25.0 {
                    dark += 1;
                }
            }
        }
        dark as f64 / count as f64 > 0.02
    }
}
