use crate::error::{FieldError, Result};
use gif::{Encoder, Frame, Repeat};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// GIF palette quantizer speed (1 = best, 30 = fastest)
const QUANTIZE_SPEED: i32 = 10;
/// Largest side a GIF frame may have
const MAX_GIF_DIM: u32 = u16::MAX as u32;

/// `<dir>/ambient-field-000042.png` for the frame at `tick`
pub fn snapshot_path(dir: &Path, tick: u64) -> PathBuf {
    dir.join(format!("ambient-field-{:06}.png", tick))
}

/// `<dir>/ambient-field-000042.gif` for a recording started at `tick`
pub fn recording_path(dir: &Path, tick: u64) -> PathBuf {
    dir.join(format!("ambient-field-{:06}.gif", tick))
}

/// Write a PNG, creating the parent directory if needed
pub fn save_snapshot(path: &Path, image: &RgbaImage) -> Result<()> {
    ensure_parent(path)?;
    image.save(path)?;
    log::info!("saved snapshot {} ({}x{})", path.display(), image.width(), image.height());
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FieldError::io(parent, e))?;
    }
    Ok(())
}

/// Animated GIF writer fed one composited frame at a time
pub struct GifRecorder {
    encoder: Encoder<BufWriter<File>>,
    path: PathBuf,
    width: u16,
    height: u16,
    delay: u16,
    frames: usize,
    max_frames: Option<usize>,
}

impl GifRecorder {
    /// Start a looping GIF of `width` x `height` pixels at `fps`
    pub fn create(path: &Path, width: u32, height: u32, fps: u32) -> Result<Self> {
        ensure_parent(path)?;
        let width = width.clamp(1, MAX_GIF_DIM) as u16;
        let height = height.clamp(1, MAX_GIF_DIM) as u16;
        let file = File::create(path).map_err(|e| FieldError::io(path, e))?;
        let mut encoder = Encoder::new(BufWriter::new(file), width, height, &[])?;
        encoder.set_repeat(Repeat::Infinite)?;
        log::info!("recording {} ({}x{} at {} fps)", path.display(), width, height, fps);

        Ok(Self {
            encoder,
            path: path.to_path_buf(),
            width,
            height,
            // GIF delays are in hundredths of a second
            delay: (100 / fps.max(1)).max(1) as u16,
            frames: 0,
            max_frames: None,
        })
    }

    /// Stop accepting frames after `max` have been written
    pub fn with_max_frames(mut self, max: usize) -> Self {
        self.max_frames = Some(max);
        self
    }

    /// Append a frame, rescaling it if the viewport changed size.
    /// Returns false once the frame limit is reached.
    pub fn push(&mut self, image: &RgbaImage) -> Result<bool> {
        if self.is_full() {
            return Ok(false);
        }
        let (w, h) = (self.width as u32, self.height as u32);
        let mut pixels = if image.dimensions() == (w, h) {
            image.as_raw().clone()
        } else {
            imageops::resize(image, w, h, FilterType::Triangle).into_raw()
        };

        let mut frame = Frame::from_rgba_speed(self.width, self.height, &mut pixels, QUANTIZE_SPEED);
        frame.delay = self.delay;
        self.encoder.write_frame(&frame)?;
        self.frames += 1;
        Ok(!self.is_full())
    }

    fn is_full(&self) -> bool {
        self.max_frames.is_some_and(|max| self.frames >= max)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the trailer, flush and close the file. Returns frames written.
    pub fn finish(self) -> Result<usize> {
        let Self { encoder, path, frames, .. } = self;
        let writer = encoder.into_inner().map_err(|e| FieldError::io(&path, e))?;
        writer
            .into_inner()
            .map_err(|e| FieldError::io(&path, e.into_error()))?;
        log::info!("finished recording {} ({} frames)", path.display(), frames);
        Ok(frames)
    }
}
