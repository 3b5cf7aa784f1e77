//! USB camera capture through V4L2.

use std::pin::Pin;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

use crate::data::{CameraConfig, Frame};
use crate::input::Camera;

const MJPG: &[u8; 4] = b"MJPG";
const YUYV: &[u8; 4] = b"YUYV";

pub struct V4lCamera {
    /// Pinned so the stream's device reference stays valid; the stream is
    /// dropped first (see `Drop`).
    device: Pin<Box<Device>>,
    stream: Option<Stream<'static>>,
    fourcc: FourCC,
    width: u32,
    height: u32,
}

impl V4lCamera {
    /// Opens the device and negotiates a pixel format. MJPG is preferred to
    /// keep USB bandwidth down; YUYV is the fallback.
    pub fn open(config: &CameraConfig) -> Result<Self> {
        let device = Box::pin(
            Device::with_path(&config.device)
                .with_context(|| format!("cannot open camera {}", config.device))?,
        );

        let mut format = device.format()?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = FourCC::new(MJPG);
        let mut format = device.set_format(&format)?;
        if format.fourcc != FourCC::new(MJPG) {
            format.fourcc = FourCC::new(YUYV);
            format = device.set_format(&format)?;
        }
        if format.fourcc != FourCC::new(MJPG) && format.fourcc != FourCC::new(YUYV) {
            anyhow::bail!("camera offers unsupported pixel format {}", format.fourcc);
        }

        log::info!(
            "camera {} opened: {}x{} {}",
            config.device,
            format.width,
            format.height,
            format.fourcc
        );

        let mut camera = Self {
            device,
            stream: None,
            fourcc: format.fourcc,
            width: format.width,
            height: format.height,
        };

        let device_ref: &Device = &camera.device;
        // SAFETY: the device is pinned on the heap and the stream is stored
        // in the same struct, dropped before the device.
        let stream = unsafe {
            let device_static: &'static Device = std::mem::transmute(device_ref);
            Stream::with_buffers(device_static, Type::VideoCapture, 4)
                .context("cannot create capture stream")?
        };
        camera.stream = Some(stream);

        Ok(camera)
    }

    fn decode(&self, data: &[u8]) -> Result<RgbImage> {
        if self.fourcc == FourCC::new(MJPG) {
            let image = image::load_from_memory(data).context("broken MJPG frame")?;
            Ok(image.to_rgb8())
        } else {
            let rgb = yuyv_to_rgb(data);
            RgbImage::from_raw(self.width, self.height, rgb)
                .ok_or_else(|| anyhow!("YUYV buffer size mismatch"))
        }
    }
}

impl Camera for V4lCamera {
    fn capture(&mut self) -> Result<Option<Frame>> {
        let data = {
            let stream = match self.stream.as_mut() {
                Some(stream) => stream,
                None => return Ok(None),
            };
            let (buffer, _meta) = stream.next().context("failed to capture frame")?;
            buffer.to_vec()
        };
        let image = self.decode(&data)?;
        Ok(Some(Frame::new(image)))
    }
}

impl Drop for V4lCamera {
    fn drop(&mut self) {
        // stream must go before the device it references
        self.stream.take();
    }
}

fn yuyv_to_rgb(yuyv: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(yuyv.len() / 2 * 3);

    for chunk in yuyv.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
            let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
            let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
            rgb.extend_from_slice(&[r, g, b]);
        }
    }

    rgb
}
