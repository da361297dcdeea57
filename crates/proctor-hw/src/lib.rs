//! Frame sources for the monitor: a V4L2 webcam and an image-directory replay.

use std::path::{Path, PathBuf};

use image::RgbImage;
use proctor_core::FrameSource;
use thiserror::Error;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

const REQUESTED_WIDTH: u32 = 640;
const REQUESTED_HEIGHT: u32 = 480;
const BUFFER_COUNT: u32 = 4;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("failed to open camera {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: std::io::Error,
    },
    #[error("camera I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported pixel format {0}")]
    UnsupportedFormat(String),
    #[error("failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
    #[error("short frame: got {got} bytes, expected {expected}")]
    ShortFrame { got: usize, expected: usize },
}

/// A V4L2 capture device streaming MJPG or YUYV frames.
pub struct Camera {
    stream: Stream<'static>,
    pub width: u32,
    pub height: u32,
    pub fourcc: FourCC,
}

impl Camera {
    /// Open the device and negotiate 640×480, preferring MJPG.
    pub fn open(device: &str) -> Result<Self, CameraError> {
        let open_err = |source| CameraError::Open {
            device: device.to_string(),
            source,
        };
        let dev = Device::with_path(device).map_err(open_err)?;

        let mut fmt = dev.format().map_err(open_err)?;
        fmt.width = REQUESTED_WIDTH;
        fmt.height = REQUESTED_HEIGHT;
        fmt.fourcc = FourCC::new(b"MJPG");
        let mut fmt = dev.set_format(&fmt).map_err(open_err)?;
        if fmt.fourcc != FourCC::new(b"MJPG") {
            fmt.fourcc = FourCC::new(b"YUYV");
            fmt = dev.set_format(&fmt).map_err(open_err)?;
        }
        if fmt.fourcc != FourCC::new(b"MJPG") && fmt.fourcc != FourCC::new(b"YUYV") {
            return Err(CameraError::UnsupportedFormat(fmt.fourcc.to_string()));
        }

        let stream =
            Stream::with_buffers(&dev, Type::VideoCapture, BUFFER_COUNT).map_err(open_err)?;

        Ok(Self {
            stream,
            width: fmt.width,
            height: fmt.height,
            fourcc: fmt.fourcc,
        })
    }

    /// Block until the next frame is available and decode it to RGB.
    pub fn capture_frame(&mut self) -> Result<RgbImage, CameraError> {
        let (buf, meta) = self.stream.next()?;
        let used = (meta.bytesused as usize).min(buf.len());
        let bytes = &buf[..used];

        if self.fourcc == FourCC::new(b"MJPG") {
            let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)?;
            Ok(img.to_rgb8())
        } else {
            yuyv_to_rgb(bytes, self.width, self.height)
        }
    }
}

impl FrameSource for Camera {
    type Error = CameraError;

    fn next_frame(&mut self) -> Result<Option<RgbImage>, CameraError> {
        self.capture_frame().map(Some)
    }
}

/// Convert packed YUYV 4:2:2 to RGB (BT.601, limited range).
pub fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<RgbImage, CameraError> {
    let expected = (width * height * 2) as usize;
    if data.len() < expected {
        return Err(CameraError::ShortFrame {
            got: data.len(),
            expected,
        });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in data[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_pixel(y0, u, v));
        rgb.extend_from_slice(&yuv_pixel(y1, u, v));
    }

    RgbImage::from_raw(width, height, rgb).ok_or(CameraError::ShortFrame {
        got: data.len(),
        expected,
    })
}

fn yuv_pixel(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as f32 - 16.0;
    let d = u as f32 - 128.0;
    let e = v as f32 - 128.0;
    let r = 1.164 * c + 1.596 * e;
    let g = 1.164 * c - 0.392 * d - 0.813 * e;
    let b = 1.164 * c + 2.017 * d;
    [
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    ]
}

/// Replays image files from a directory in file-name order.
pub struct ImageDirSource {
    files: std::vec::IntoIter<PathBuf>,
}

impl ImageDirSource {
    pub fn open(dir: &Path) -> Result<Self, CameraError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && image::ImageFormat::from_path(p).is_ok())
            .collect();
        files.sort();
        tracing::info!(dir = %dir.display(), frames = files.len(), "replaying frames from directory");
        Ok(Self {
            files: files.into_iter(),
        })
    }
}

impl FrameSource for ImageDirSource {
    type Error = CameraError;

    fn next_frame(&mut self) -> Result<Option<RgbImage>, CameraError> {
        match self.files.next() {
            Some(path) => Ok(Some(image::open(&path)?.to_rgb8())),
            None => Ok(None),
        }
    }
}
