//! Frame preprocessing for the model input tensor.

use fast_image_resize::images::Image as FirImage;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use ndarray::Array4;

use crate::data::{ChannelOrder, Frame};
use crate::error::DetectorError;

/// Host-side input tensor, shaped `[1, H, W, 3]`.
///
/// Quantized models take raw 0–255 bytes; float models take values divided by
/// 255. The two paths must never be mixed, so the split is encoded in the
/// type.
#[derive(Debug, Clone)]
pub enum InputTensor {
    Quantized(Array4<u8>),
    Float(Array4<f32>),
}

/// Resizes the frame to the model input size, fixes the channel order to RGB
/// and applies the dtype-dependent normalization.
pub fn preprocess(
    frame: &Frame,
    target_w: u32,
    target_h: u32,
    quantized: bool,
) -> Result<InputTensor, DetectorError> {
    if frame.is_empty() {
        return Err(DetectorError::Preprocess("empty frame".to_string()));
    }

    let src = FirImage::from_vec_u8(
        frame.width(),
        frame.height(),
        frame.image.as_raw().clone(),
        PixelType::U8x3,
    )
    .map_err(|err| DetectorError::Preprocess(err.to_string()))?;

    let mut dst = FirImage::new(target_w, target_h, PixelType::U8x3);
    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    resizer
        .resize(&src, &mut dst, &options)
        .map_err(|err| DetectorError::Preprocess(err.to_string()))?;

    let (w, h) = (target_w as usize, target_h as usize);
    let swap = frame.order == ChannelOrder::Bgr;
    let buf = dst.buffer();

    if quantized {
        let mut data = Vec::with_capacity(h * w * 3);
        for px in buf.chunks_exact(3) {
            if swap {
                data.extend_from_slice(&[px[2], px[1], px[0]]);
            } else {
                data.extend_from_slice(&[px[0], px[1], px[2]]);
            }
        }
        let tensor = Array4::from_shape_vec((1, h, w, 3), data)
            .map_err(|err| DetectorError::Preprocess(err.to_string()))?;
        Ok(InputTensor::Quantized(tensor))
    } else {
        let mut data = Vec::with_capacity(h * w * 3);
        for px in buf.chunks_exact(3) {
            let (r, g, b) = if swap {
                (px[2], px[1], px[0])
            } else {
                (px[0], px[1], px[2])
            };
            data.push(r as f32 / 255.0);
            data.push(g as f32 / 255.0);
            data.push(b as f32 / 255.0);
        }
        let tensor = Array4::from_shape_vec((1, h, w, 3), data)
            .map_err(|err| DetectorError::Preprocess(err.to_string()))?;
        Ok(InputTensor::Float(tensor))
    }
}
