use image::RgbImage;

/// Byte order of the channels inside a captured buffer.
///
/// Industrial UVC cameras and legacy capture stacks hand out BGR; the model
/// always consumes RGB, so preprocessing swaps when needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// One captured video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub order: ChannelOrder,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            order: ChannelOrder::Rgb,
        }
    }

    pub fn with_order(mut self, order: ChannelOrder) -> Self {
        self.order = order;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self::new(image)
    }
}
