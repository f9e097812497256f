/// Binary "changed pixel" mask, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    bits: Vec<bool>,
    width: u32,
    height: u32,
}

impl BinaryMask {
    /// All-unchanged mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            bits: vec![false; width as usize * height as usize],
            width,
            height,
        }
    }

    /// A pixel is set when its difference exceeds `min_change`.
    pub fn threshold(diff: &[u8], width: u32, height: u32, min_change: u8) -> Self {
        debug_assert_eq!(diff.len(), width as usize * height as usize);
        Self {
            bits: diff.iter().map(|&d| d > min_change).collect(),
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[self.offset(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let offset = self.offset(x, y);
        self.bits[offset] = value;
    }

    /// Set every pixel of a `w` x `h` rectangle at (`x`, `y`), clipped to the mask.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32) {
        for yy in y..(y + h).min(self.height) {
            for xx in x..(x + w).min(self.width) {
                self.set(xx, yy, true);
            }
        }
    }

    pub fn count_set(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Morphological dilation with a 3x3 square neighbourhood, repeated
    /// `iterations` times. Pixels outside the mask never contribute.
    pub fn dilate(&self, iterations: usize) -> Self {
        let mut current = self.clone();
        for _ in 0..iterations {
            current = current.dilate_once();
        }
        current
    }

    fn dilate_once(&self) -> Self {
        let (w, h) = (self.width as usize, self.height as usize);

        // Horizontal pass then vertical pass; a 3x3 box is separable.
        let mut horizontal = vec![false; self.bits.len()];
        for y in 0..h {
            let row = &self.bits[y * w..(y + 1) * w];
            for x in 0..w {
                let lo = x.saturating_sub(1);
                let hi = (x + 1).min(w - 1);
                horizontal[y * w + x] = row[lo..=hi].iter().any(|&b| b);
            }
        }

        let mut bits = vec![false; self.bits.len()];
        for y in 0..h {
            let lo = y.saturating_sub(1);
            let hi = (y + 1).min(h - 1);
            for x in 0..w {
                bits[y * w + x] = (lo..=hi).any(|yy| horizontal[yy * w + x]);
            }
        }

        Self {
            bits,
            width: self.width,
            height: self.height,
        }
    }

    pub(crate) fn bits(&self) -> &[bool] {
        &self.bits
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}
