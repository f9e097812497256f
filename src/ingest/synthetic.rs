//! Synthetic `stub://` videos for demos and tests.
//!
//! `stub://meadow?frames=60&fps=10&width=640&height=480&insects=3` renders a
//! static textured background with `insects` bright squares drifting across
//! it. Every parameter is optional. `fps=0` or `frames=0` describes a video
//! that probes as invalid.

use anyhow::{anyhow, Result};
use std::str::FromStr;

use crate::frame::RawFrame;

pub(crate) const STUB_SCHEME: &str = "stub://";

const DEFAULT_FRAMES: u64 = 120;
const DEFAULT_FPS: f64 = 10.0;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_INSECTS: u32 = 2;
const INSECT_INTENSITY: u8 = 235;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SyntheticSpec {
    pub name: String,
    pub frames: u64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub insects: u32,
}

impl SyntheticSpec {
    pub(crate) fn parse(path: &str) -> Result<Self> {
        let rest = path
            .strip_prefix(STUB_SCHEME)
            .ok_or_else(|| anyhow!("not a stub path: {}", path))?;
        let (name, query) = rest.split_once('?').unwrap_or((rest, ""));
        if name.trim().is_empty() {
            return Err(anyhow!("stub path needs a name: {}", path));
        }

        let mut spec = Self {
            name: name.to_string(),
            frames: DEFAULT_FRAMES,
            fps: DEFAULT_FPS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            insects: DEFAULT_INSECTS,
        };
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed stub parameter '{}'", pair))?;
            match key {
                "frames" => spec.frames = parse_value(key, value)?,
                "fps" => spec.fps = parse_value(key, value)?,
                "width" => spec.width = parse_value(key, value)?,
                "height" => spec.height = parse_value(key, value)?,
                "insects" => spec.insects = parse_value(key, value)?,
                other => return Err(anyhow!("unknown stub parameter '{}'", other)),
            }
        }
        if spec.width < 16 || spec.height < 16 {
            return Err(anyhow!("stub video must be at least 16x16"));
        }
        Ok(spec)
    }

    fn insect_side(&self) -> u32 {
        (self.width / 40).max(2)
    }
}

pub(crate) struct SyntheticDecoder {
    spec: SyntheticSpec,
    background: Vec<u8>,
    decoded: u64,
}

impl SyntheticDecoder {
    pub(crate) fn new(spec: SyntheticSpec) -> Self {
        let background = render_background(spec.width, spec.height);
        Self {
            spec,
            background,
            decoded: 0,
        }
    }

    pub(crate) fn spec(&self) -> &SyntheticSpec {
        &self.spec
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        if self.decoded >= self.spec.frames {
            return Ok(None);
        }
        let t = self.decoded;
        self.decoded += 1;

        let (w, h) = (self.spec.width, self.spec.height);
        let side = self.spec.insect_side();
        let mut pixels = self.background.clone();
        for insect in 0..self.spec.insects {
            let lane = h / (self.spec.insects + 1) * (insect + 1);
            let speed = 3 + insect as u64 * 2;
            let x = ((insect as u64 * 97 + t * speed) % (w - side) as u64) as u32;
            let y = lane.min(h - side);
            for yy in y..y + side {
                let row = (yy * w) as usize * 3;
                let start = row + x as usize * 3;
                pixels[start..start + side as usize * 3].fill(INSECT_INTENSITY);
            }
        }
        RawFrame::new(pixels, w, h).map(Some)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("invalid value for stub parameter '{}': {}", key, value))
}

fn render_background(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            let shade = 60 + ((x / 8 + y / 8) % 4) as u8 * 6;
            pixels.extend_from_slice(&[shade, shade.saturating_add(10), shade]);
        }
    }
    pixels
}
