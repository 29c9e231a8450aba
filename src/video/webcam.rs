//! V4L2 webcam access.
//!
//! Only V4L2 `VIDEO_CAPTURE` devices yielding JFIF JPEG or Motion JPEG frames are supported.

use std::path::Path;

use anyhow::{bail, Context};
use linuxvideo::{
    format::{FrameIntervals, FrameSizes, PixFormat, PixelFormat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device, Fract,
};

use super::CaptureSource;
use crate::image::{Image, Resolution};

/// Format negotiation options.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WebcamOptions {
    resolution: Option<Resolution>,
    fps: Option<u32>,
}

impl WebcamOptions {
    /// Sets the desired image resolution.
    ///
    /// A lower resolution might be selected if the webcam cannot deliver the desired resolution.
    #[inline]
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Sets the desired frame rate.
    ///
    /// A lower frame rate might be selected if the webcam cannot deliver it at the chosen
    /// resolution.
    #[inline]
    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }
}

#[derive(Clone, Copy)]
struct FrameFormat {
    resolution: Resolution,
    frame_interval: Fract,
}

impl FrameFormat {
    fn fps(&self) -> u32 {
        (1.0 / self.frame_interval.as_f32()).round() as u32
    }
}

fn list_formats(device: &Device, pixel_format: PixelFormat) -> anyhow::Result<Vec<FrameFormat>> {
    let mut formats = Vec::new();
    match device.frame_sizes(pixel_format)? {
        FrameSizes::Discrete(sizes) => {
            for size in sizes {
                let intervals =
                    match device.frame_intervals(pixel_format, size.width(), size.height())? {
                        FrameIntervals::Discrete(intervals) => intervals,
                        FrameIntervals::Stepwise(_) | FrameIntervals::Continuous(_) => {
                            bail!("stepwise or continuous frame rates are not supported")
                        }
                    };
                for rate in intervals {
                    formats.push(FrameFormat {
                        resolution: Resolution::new(size.width(), size.height()),
                        frame_interval: *rate.fract(),
                    });
                }
            }
        }
        FrameSizes::Stepwise(_) | FrameSizes::Continuous(_) => {
            bail!("stepwise or continuous resolutions are not supported");
        }
    }
    Ok(formats)
}

/// Picks the best format satisfying `options`, relaxing the frame rate and then the resolution
/// requirement if nothing matches.
///
/// An exact match of the requested resolution wins over larger ones.
fn pick_format(formats: &[FrameFormat], mut options: WebcamOptions) -> Option<FrameFormat> {
    loop {
        let best = formats
            .iter()
            .filter(|fmt| {
                options.resolution.map_or(true, |res| {
                    fmt.resolution.width() >= res.width() && fmt.resolution.height() >= res.height()
                }) && options.fps.map_or(true, |fps| fmt.fps() >= fps)
            })
            .max_by_key(|fmt| {
                (
                    options.resolution == Some(fmt.resolution),
                    fmt.resolution.num_pixels(),
                    fmt.fps(),
                )
            })
            .copied();
        if best.is_some() {
            return best;
        }

        log::debug!("no webcam format matches {:?}", options);
        if options.fps.take().is_none() && options.resolution.take().is_none() {
            return None;
        }
    }
}

/// A webcam yielding a stream of [`Image`]s.
pub struct Webcam {
    stream: ReadStream,
}

impl Webcam {
    /// Opens the V4L2 device at `path`.
    ///
    /// This can block for a significant amount of time while the webcam initializes (on the order
    /// of hundreds of milliseconds).
    pub fn open(path: &str, options: WebcamOptions) -> anyhow::Result<Self> {
        let dev = Device::open(Path::new(path))
            .with_context(|| format!("failed to open device {path}"))?;
        let caps = dev.capabilities()?;
        let cap_flags = caps.device_capabilities();
        log::debug!("device {} ({path}) capabilities: {:?}", caps.card(), cap_flags);

        if !cap_flags.contains(CapabilityFlags::VIDEO_CAPTURE) {
            bail!("{path} ({}) is not a video capture device", caps.card());
        }

        let mut pixel_format = None;
        for format in dev.formats(BufType::VIDEO_CAPTURE) {
            let format = format?.pixel_format();
            if format == PixelFormat::JPEG || format == PixelFormat::MJPG {
                pixel_format = Some(format);
                break;
            }
        }
        let Some(pixel_format) = pixel_format else {
            bail!("{path} does not support JPEG or MJPG capture");
        };

        let formats = list_formats(&dev, pixel_format)?;
        let Some(format) = pick_format(&formats, options) else {
            bail!("failed to negotiate a webcam format for {path}");
        };

        let capture = dev.video_capture(PixFormat::new(
            format.resolution.width(),
            format.resolution.height(),
            pixel_format,
        ))?;
        let actual_format = capture.format();
        let resolution = Resolution::new(actual_format.width(), actual_format.height());
        let actual_interval = capture.set_frame_interval(format.frame_interval)?;

        log::info!(
            "opened {} ({path}), {resolution} @ {:.1}Hz",
            caps.card(),
            1.0 / actual_interval.as_f32(),
        );

        Ok(Self {
            stream: capture.into_stream()?,
        })
    }

    /// Reads the next frame from the camera.
    ///
    /// Blocks until the camera has dequeued a buffer. Returns `Ok(None)` if the buffer does not
    /// contain a decodable image; webcams occasionally produce corrupted MJPG frames.
    pub fn read(&mut self) -> anyhow::Result<Option<Image>> {
        let frame = self.stream.dequeue(|buf| match Image::decode_jpeg(&buf) {
            Ok(image) => Ok(Some(image)),
            Err(e) => {
                log::debug!("dropping undecodable webcam frame: {e}");
                Ok(None)
            }
        })?;
        Ok(frame)
    }
}

impl CaptureSource for Webcam {
    fn next_frame(&mut self) -> anyhow::Result<Option<Image>> {
        self.read()
    }
}
