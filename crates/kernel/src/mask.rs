use image::{GrayImage, Luma};

/// Single-channel render output. Read-only once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    pub fn from_image(image: GrayImage) -> Self {
        Self { image }
    }

    /// Build a mask by sampling `f(x, y)` for every pixel. Rows grow downwards.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Self {
        Self {
            image: GrayImage::from_fn(width, height, |x, y| Luma([f(x, y)])),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Intensity at (`x`, `y`), or None outside the image.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        self.image.get_pixel_checked(x, y).map(|p| p.0[0])
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    /// Foreground image for border following: 255 where intensity is below
    /// `threshold`, 0 elsewhere.
    pub fn binarize(&self, threshold: u8) -> GrayImage {
        let mut out = GrayImage::new(self.width(), self.height());
        for (src, dst) in self.image.pixels().zip(out.pixels_mut()) {
            dst.0[0] = if src.0[0] < threshold { 255 } else { 0 };
        }
        out
    }

    pub fn count_below(&self, threshold: u8) -> usize {
        self.image.as_raw().iter().filter(|&&v| v < threshold).count()
    }
}
