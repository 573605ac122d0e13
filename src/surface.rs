// src/surface.rs

//! Reference-counted framebuffer descriptions.
//!
//! A `Surface` is a cheap handle; clones share the same surface. The
//! explicit `retain`/`release` count decides when pixel storage is freed,
//! independently of how many handles are alive, so a released surface stays
//! memory-safe to inspect but refuses pixel access.

use crate::error::{Error, Result};
use crate::pixel_format::PixelFormat;
use bitflags::bitflags;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

bitflags! {
    /// Surface and video mode flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SurfaceFlags: u32 {
        const SWSURFACE = 0x0000_0000;
        const HWSURFACE = 0x0000_0001;
        const ASYNCBLIT = 0x0000_0004;
        const ANYFORMAT = 0x1000_0000;
        const HWPALETTE = 0x2000_0000;
        const DOUBLEBUF = 0x4000_0000;
        const FULLSCREEN = 0x8000_0000;
        const OPENGL = 0x0000_0002;
        const OPENGLBLIT = 0x0000_000A;
        const RESIZABLE = 0x0000_0010;
        const NOFRAME = 0x0000_0020;
        const HWACCEL = 0x0000_0100;
        const SRCCOLORKEY = 0x0000_1000;
        const RLEACCELOK = 0x0000_2000;
        const RLEACCEL = 0x0000_4000;
        const SRCALPHA = 0x0001_0000;
        const PREALLOC = 0x0100_0000;
    }
}

/// A rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Intersection of two rectangles; empty (at the clamped origin) when
    /// they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x0 = i64::from(self.x).max(i64::from(other.x));
        let y0 = i64::from(self.y).max(i64::from(other.y));
        let x1 = (i64::from(self.x) + i64::from(self.w)).min(i64::from(other.x) + i64::from(other.w));
        let y1 = (i64::from(self.y) + i64::from(self.h)).min(i64::from(other.y) + i64::from(other.h));
        Rect {
            x: x0 as i32,
            y: y0 as i32,
            w: (x1 - x0).max(0) as u32,
            h: (y1 - y0).max(0) as u32,
        }
    }
}

/// Where a surface's pixels live.
#[derive(Debug)]
pub enum PixelStorage {
    /// Allocated and freed by the surface.
    Owned(Vec<u8>),
    /// Caller-provided buffer; the surface never frees it, it only lets go
    /// of its handle.
    External(Arc<Mutex<Vec<u8>>>),
}

impl PixelStorage {
    pub fn is_external(&self) -> bool {
        matches!(self, PixelStorage::External(_))
    }
}

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct SurfaceInner {
    id: u64,
    width: u32,
    height: u32,
    pitch: u32,
    flags: SurfaceFlags,
    format: Arc<PixelFormat>,
    clip: Mutex<Rect>,
    pixels: Mutex<Option<PixelStorage>>,
    refcount: AtomicU32,
}

/// Handle to a framebuffer description.
#[derive(Debug, Clone)]
pub struct Surface {
    inner: Arc<SurfaceInner>,
}

impl PartialEq for Surface {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Surface {}

/// Row stride for `width` pixels of `format`, padded to 4 bytes.
pub fn calculate_pitch(width: u32, format: &PixelFormat) -> Result<u32> {
    let bits = u64::from(width) * u64::from(format.bits_per_pixel());
    let bytes = bits.div_ceil(8);
    let padded = (bytes + 3) & !3;
    u32::try_from(padded)
        .map_err(|_| Error::InvalidArgument(format!("surface width {} is too large", width)))
}

impl Surface {
    /// Allocates a zeroed surface with a reference count of 1.
    pub fn new(width: u32, height: u32, format: Arc<PixelFormat>, flags: SurfaceFlags) -> Result<Self> {
        check_dimensions(width, height)?;
        let pitch = calculate_pitch(width, &format)?;
        let len = buffer_len(pitch, height)?;
        Ok(Self::build(
            width,
            height,
            pitch,
            format,
            flags - SurfaceFlags::PREALLOC,
            PixelStorage::Owned(vec![0u8; len]),
        ))
    }

    /// Wraps a caller-owned pixel buffer. `pitch` must cover a full row and
    /// the buffer must hold `pitch * height` bytes.
    pub fn from_external(
        width: u32,
        height: u32,
        pitch: u32,
        format: Arc<PixelFormat>,
        flags: SurfaceFlags,
        buffer: Arc<Mutex<Vec<u8>>>,
    ) -> Result<Self> {
        check_dimensions(width, height)?;
        let min_pitch = u64::from(width) * u64::from(format.bits_per_pixel());
        if u64::from(pitch) * 8 < min_pitch {
            return Err(Error::InvalidArgument(format!(
                "pitch {} is shorter than a {}-pixel row",
                pitch, width
            )));
        }
        let needed = buffer_len(pitch, height)?;
        let available = lock(&buffer).len();
        if available < needed {
            return Err(Error::InvalidArgument(format!(
                "external buffer holds {} bytes, surface needs {}",
                available, needed
            )));
        }
        Ok(Self::build(
            width,
            height,
            pitch,
            format,
            flags | SurfaceFlags::PREALLOC,
            PixelStorage::External(buffer),
        ))
    }

    fn build(
        width: u32,
        height: u32,
        pitch: u32,
        format: Arc<PixelFormat>,
        flags: SurfaceFlags,
        storage: PixelStorage,
    ) -> Self {
        let id = NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed);
        trace!(
            "Surface {}: created {}x{} pitch={} bpp={} flags={:?}",
            id,
            width,
            height,
            pitch,
            format.bits_per_pixel(),
            flags
        );
        Surface {
            inner: Arc::new(SurfaceInner {
                id,
                width,
                height,
                pitch,
                flags,
                format,
                clip: Mutex::new(Rect::new(0, 0, width, height)),
                pixels: Mutex::new(Some(storage)),
                refcount: AtomicU32::new(1),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    pub fn pitch(&self) -> u32 {
        self.inner.pitch
    }

    pub fn flags(&self) -> SurfaceFlags {
        self.inner.flags
    }

    pub fn format(&self) -> &Arc<PixelFormat> {
        &self.inner.format
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.inner.width, self.inner.height)
    }

    pub fn refcount(&self) -> u32 {
        self.inner.refcount.load(Ordering::Acquire)
    }

    /// True once the reference count has reached zero.
    pub fn is_freed(&self) -> bool {
        self.refcount() == 0
    }

    pub fn clip_rect(&self) -> Rect {
        *lock(&self.inner.clip)
    }

    /// Sets the clip rectangle, clamped to the surface bounds. `None`
    /// resets it to the full surface. Returns whether the clamped rectangle
    /// is non-empty.
    pub fn set_clip_rect(&self, rect: Option<Rect>) -> bool {
        let bounds = self.bounds();
        let clamped = match rect {
            Some(rect) => rect.intersect(&bounds),
            None => bounds,
        };
        *lock(&self.inner.clip) = clamped;
        !clamped.is_empty()
    }

    /// Takes another counted reference.
    pub fn retain(&self) -> Result<u32> {
        let mut current = self.inner.refcount.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(Error::InvalidArgument(format!(
                    "surface {} was already freed",
                    self.inner.id
                )));
            }
            match self.inner.refcount.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(current + 1),
                Err(actual) => current = actual,
            }
        }
    }

    /// Drops a counted reference, freeing pixel storage when the count
    /// reaches zero. Returns the remaining count.
    pub fn release(&self) -> Result<u32> {
        let mut current = self.inner.refcount.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(Error::InvalidArgument(format!(
                    "surface {} released more times than retained",
                    self.inner.id
                )));
            }
            match self.inner.refcount.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        let remaining = current - 1;
        if remaining == 0 {
            self.free_storage();
        }
        Ok(remaining)
    }

    fn free_storage(&self) {
        match lock(&self.inner.pixels).take() {
            Some(PixelStorage::Owned(buffer)) => {
                debug!(
                    "Surface {}: freed {} bytes of pixel storage",
                    self.inner.id,
                    buffer.len()
                );
            }
            Some(PixelStorage::External(_)) => {
                debug!("Surface {}: detached external pixel buffer", self.inner.id);
            }
            None => {}
        }
    }

    /// True if the pixels are a wrapped external buffer.
    pub fn is_external(&self) -> bool {
        lock(&self.inner.pixels)
            .as_ref()
            .is_some_and(PixelStorage::is_external)
    }

    /// Runs `f` with exclusive access to the pixel rows
    /// (`pitch * height` bytes).
    pub fn with_pixels<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        let len = buffer_len(self.inner.pitch, self.inner.height)?;
        let mut pixels = lock(&self.inner.pixels);
        match pixels.as_mut() {
            Some(PixelStorage::Owned(buffer)) => Ok(f(&mut buffer[..len])),
            Some(PixelStorage::External(buffer)) => {
                let mut buffer = lock(buffer);
                let available = buffer.len();
                let rows = buffer.get_mut(..len).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "external buffer shrank to {} bytes, surface needs {}",
                        available, len
                    ))
                })?;
                Ok(f(rows))
            }
            None => Err(Error::InvalidArgument(format!(
                "surface {} was already freed",
                self.inner.id
            ))),
        }
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidArgument(format!(
            "surface dimensions must be non-zero, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

fn buffer_len(pitch: u32, height: u32) -> Result<usize> {
    usize::try_from(u64::from(pitch) * u64::from(height))
        .map_err(|_| Error::InvalidArgument("surface is too large to address".to_string()))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
