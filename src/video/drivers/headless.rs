// src/video/drivers/headless.rs
//! Headless video driver.
//!
//! Simulates a display with a fixed geometry and a list of framebuffer
//! configurations. Screen surfaces are real, allocated surfaces; presenting
//! one only bumps a counter. Native events are injected through a
//! `HeadlessHandle`, which is how tests and the demo script input.

use crate::config::{FramebufferConfig, HeadlessConfig};
use crate::event::Event;
use crate::pixel_format::{Channel, PixelFormat};
use crate::surface::{Surface, SurfaceFlags};
use crate::video::attributes::{AttributeRequests, GlAttr, GrantedAttributes, Requirement};
use crate::video::driver::VideoDriver;
use crate::video::messages::{
    BlitCapabilities, DriverError, DriverRequest, DriverResponse, ModeRequest, VideoInfo,
};
use log::{debug, info, trace};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Largest surface edge the simulated display accepts.
const MAX_EDGE: u32 = 16_384;

/// Weight of one missing bit on a preferred attribute relative to one
/// surplus bit.
const DEFICIT_WEIGHT: u64 = 1000;

#[derive(Debug, Default)]
struct Shared {
    presents: AtomicU64,
    surfaces_created: AtomicU64,
    cursor_visible: AtomicBool,
    pointer: AtomicU32,
    caption: Mutex<Option<(String, String)>>,
    pending: Mutex<VecDeque<Event>>,
}

/// Shared view of a headless driver, usable after the driver is boxed.
#[derive(Debug, Clone)]
pub struct HeadlessHandle {
    shared: Arc<Shared>,
}

impl HeadlessHandle {
    /// Queues a native event for the next `PollEvents`.
    pub fn inject(&self, event: Event) {
        lock(&self.shared.pending).push_back(event);
    }

    pub fn inject_all(&self, events: impl IntoIterator<Item = Event>) {
        lock(&self.shared.pending).extend(events);
    }

    pub fn pending(&self) -> usize {
        lock(&self.shared.pending).len()
    }

    pub fn presents(&self) -> u64 {
        self.shared.presents.load(Ordering::Relaxed)
    }

    pub fn surfaces_created(&self) -> u64 {
        self.shared.surfaces_created.load(Ordering::Relaxed)
    }

    pub fn cursor_visible(&self) -> bool {
        self.shared.cursor_visible.load(Ordering::Relaxed)
    }

    pub fn pointer(&self) -> (u16, u16) {
        let packed = self.shared.pointer.load(Ordering::Relaxed);
        ((packed >> 16) as u16, packed as u16)
    }

    /// `(title, icon)` last set.
    pub fn caption(&self) -> Option<(String, String)> {
        lock(&self.shared.caption).clone()
    }
}

pub struct HeadlessVideoDriver {
    config: HeadlessConfig,
    initialized: bool,
    shared: Arc<Shared>,
}

impl HeadlessVideoDriver {
    pub fn new(config: &HeadlessConfig) -> Self {
        info!(
            "HeadlessVideoDriver::new() {}x{}x{} with {} framebuffer configs",
            config.display_width,
            config.display_height,
            config.display_depth,
            config.framebuffer_configs.len()
        );
        let shared = Shared {
            cursor_visible: AtomicBool::new(true),
            ..Shared::default()
        };
        HeadlessVideoDriver {
            config: config.clone(),
            initialized: false,
            shared: Arc::new(shared),
        }
    }

    pub fn handle(&self) -> HeadlessHandle {
        HeadlessHandle {
            shared: self.shared.clone(),
        }
    }

    fn video_info(&self) -> Result<VideoInfo, DriverError> {
        let format = PixelFormat::for_depth(self.config.display_depth)
            .map_err(|err| DriverError::Failed(format!("display depth: {}", err)))?;
        let mut blit = BlitCapabilities::SW | BlitCapabilities::SW_COLORKEY | BlitCapabilities::SW_ALPHA;
        if self.config.hw_available {
            blit |= BlitCapabilities::HW | BlitCapabilities::HW_COLORKEY | BlitCapabilities::FILL;
        }
        Ok(VideoInfo {
            hw_available: self.config.hw_available,
            wm_available: self.config.wm_available,
            blit,
            video_mem_kb: self.config.video_memory_kb,
            format,
            current_w: self.config.display_width,
            current_h: self.config.display_height,
        })
    }

    fn create_surface(&self, mode: ModeRequest) -> Result<DriverResponse, DriverError> {
        check_geometry(&self.config, &mode)?;
        let format = PixelFormat::for_depth(mode.bits_per_pixel)
            .map_err(|err| DriverError::UnsupportedMode(err.to_string()))?;

        let (granted, flags) = if mode.wants_context() {
            let chosen = select_framebuffer(&self.config.framebuffer_configs, &mode.attributes)?;
            debug!("HeadlessVideoDriver: chose framebuffer {:?}", chosen);
            let mut flags = mode.flags;
            if flags.contains(SurfaceFlags::OPENGL) {
                flags.set(SurfaceFlags::DOUBLEBUF, chosen.double_buffer);
            }
            (granted_from_framebuffer(chosen), flags)
        } else {
            (granted_from_format(&format, mode.flags), mode.flags)
        };
        let flags = self.place_surface(flags, &mode, &format);

        let surface = Surface::new(mode.width, mode.height, Arc::new(format), flags)
            .map_err(|err| DriverError::UnsupportedMode(err.to_string()))?;
        self.shared.surfaces_created.fetch_add(1, Ordering::Relaxed);
        info!(
            "HeadlessVideoDriver: created screen {}x{}x{} flags={:?}",
            mode.width, mode.height, mode.bits_per_pixel, flags
        );
        Ok(DriverResponse::Surface { surface, granted })
    }

    /// Hardware surfaces need the display to have hardware and enough video
    /// memory; otherwise the surface silently becomes a software surface.
    fn place_surface(&self, flags: SurfaceFlags, mode: &ModeRequest, format: &PixelFormat) -> SurfaceFlags {
        if !flags.contains(SurfaceFlags::HWSURFACE) {
            return flags;
        }
        let buffers: u64 = if flags.contains(SurfaceFlags::DOUBLEBUF) { 2 } else { 1 };
        let needed = u64::from(mode.width)
            * u64::from(mode.height)
            * u64::from(format.bytes_per_pixel())
            * buffers;
        let available = u64::from(self.config.video_memory_kb) * 1024;
        if self.config.hw_available && needed <= available {
            flags
        } else {
            debug!(
                "HeadlessVideoDriver: falling back to a software surface (needs {} bytes, have {})",
                needed, available
            );
            flags - SurfaceFlags::HWSURFACE
        }
    }
}

impl VideoDriver for HeadlessVideoDriver {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn handle_request(&mut self, request: DriverRequest) -> Result<DriverResponse, DriverError> {
        if !self.initialized && !matches!(request, DriverRequest::Init) {
            return Err(DriverError::NotInitialized);
        }
        match request {
            DriverRequest::Init => {
                let info = self.video_info()?;
                info!("HeadlessVideoDriver: Init - returning video info");
                self.initialized = true;
                Ok(DriverResponse::InitComplete { info })
            }
            DriverRequest::PollEvents => {
                let events: Vec<Event> = lock(&self.shared.pending).drain(..).collect();
                if !events.is_empty() {
                    trace!("HeadlessVideoDriver: delivering {} events", events.len());
                }
                Ok(DriverResponse::Events(events))
            }
            DriverRequest::RequestSurface(mode) => self.create_surface(mode),
            DriverRequest::Present(surface) => {
                if surface.is_freed() {
                    return Err(DriverError::Failed(format!(
                        "cannot present freed surface {}",
                        surface.id()
                    )));
                }
                let presents = self.shared.presents.fetch_add(1, Ordering::Relaxed) + 1;
                trace!("HeadlessVideoDriver: Present surface {} (#{})", surface.id(), presents);
                Ok(DriverResponse::Presented)
            }
            DriverRequest::SetCaption { title, icon } => {
                info!("HeadlessVideoDriver: SetCaption '{}' icon '{}'", title, icon);
                *lock(&self.shared.caption) = Some((title, icon));
                Ok(DriverResponse::CaptionSet)
            }
            DriverRequest::WarpPointer { x, y } => {
                trace!("HeadlessVideoDriver: WarpPointer {},{}", x, y);
                let packed = (u32::from(x) << 16) | u32::from(y);
                self.shared.pointer.store(packed, Ordering::Relaxed);
                Ok(DriverResponse::PointerWarped)
            }
            DriverRequest::SetCursorVisible(visible) => {
                debug!("HeadlessVideoDriver: SetCursorVisible {}", visible);
                self.shared.cursor_visible.store(visible, Ordering::Relaxed);
                Ok(DriverResponse::CursorVisibilitySet)
            }
        }
    }
}

fn check_geometry(config: &HeadlessConfig, mode: &ModeRequest) -> Result<(), DriverError> {
    if mode.width > MAX_EDGE || mode.height > MAX_EDGE {
        return Err(DriverError::UnsupportedMode(format!(
            "{}x{} exceeds the {} pixel limit",
            mode.width, mode.height, MAX_EDGE
        )));
    }
    if mode.flags.contains(SurfaceFlags::FULLSCREEN)
        && (mode.width > config.display_width || mode.height > config.display_height)
    {
        return Err(DriverError::UnsupportedMode(format!(
            "fullscreen {}x{} is larger than the {}x{} display",
            mode.width, mode.height, config.display_width, config.display_height
        )));
    }
    Ok(())
}

/// Picks the cheapest configuration meeting every required request.
///
/// A preferred request costs `DEFICIT_WEIGHT` per missing bit and 1 per
/// surplus bit; a mismatched preferred flag costs one deficit. Ties go to
/// the earlier configuration.
pub fn select_framebuffer<'a>(
    configs: &'a [FramebufferConfig],
    requests: &AttributeRequests,
) -> Result<&'a FramebufferConfig, DriverError> {
    configs
        .iter()
        .filter(|config| {
            requests
                .required()
                .all(|request| request.is_met_by(config.get(request.attr)))
        })
        .min_by_key(|config| score(config, requests))
        .ok_or_else(|| {
            let required: Vec<String> = requests
                .required()
                .map(|request| format!("{} >= {}", request.attr, request.value))
                .collect();
            DriverError::NoMatchingConfig(format!(
                "{} candidates, required [{}]",
                configs.len(),
                required.join(", ")
            ))
        })
}

fn score(config: &FramebufferConfig, requests: &AttributeRequests) -> u64 {
    requests
        .iter()
        .filter(|request| request.requirement == Requirement::Preferred)
        .map(|request| {
            let granted = i64::from(config.get(request.attr));
            let wanted = i64::from(request.value);
            if request.attr.is_flag() {
                if granted == wanted {
                    0
                } else {
                    DEFICIT_WEIGHT
                }
            } else if granted < wanted {
                (wanted - granted) as u64 * DEFICIT_WEIGHT
            } else {
                (granted - wanted) as u64
            }
        })
        .sum()
}

fn granted_from_framebuffer(config: &FramebufferConfig) -> GrantedAttributes {
    GlAttr::ALL
        .into_iter()
        .fold(GrantedAttributes::new(), |granted, attr| granted.with(attr, config.get(attr)))
}

/// Non-GL modes report the screen format's channel widths.
fn granted_from_format(format: &PixelFormat, flags: SurfaceFlags) -> GrantedAttributes {
    let width = |channel| format.channel(channel).width() as i32;
    GrantedAttributes::new()
        .with(GlAttr::RedSize, width(Channel::Red))
        .with(GlAttr::GreenSize, width(Channel::Green))
        .with(GlAttr::BlueSize, width(Channel::Blue))
        .with(GlAttr::AlphaSize, width(Channel::Alpha))
        .with(GlAttr::BufferSize, i32::from(format.bits_per_pixel()))
        .with(GlAttr::DoubleBuffer, i32::from(flags.contains(SurfaceFlags::DOUBLEBUF)))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
