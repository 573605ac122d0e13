// src/video/negotiator.rs
//! Display/context negotiation.
//!
//! The negotiator records desired GL attributes, asks its driver for a
//! screen surface, rejects grants that miss a required minimum and keeps
//! the attributes actually granted for later queries.
//!
//! ```text
//! Unconfigured ──set_attribute──▶ AttributesRequested
//!      │                                 │
//!      └────────set_video_mode───────────┴──▶ ModeSet ──▶ Ready
//!                                                ▲          │
//!                                                └──────────┘ set_video_mode
//! ```
//!
//! The screen surface is retained once by the negotiator and released on
//! mode change or drop. Mode setting and buffer swaps must stay on the
//! thread that owns the rendering context.

use crate::error::{Error, Result};
use crate::event::Event;
use crate::surface::{Surface, SurfaceFlags};
use crate::video::attributes::{AttributeRequest, AttributeRequests, GlAttr, GrantedAttributes};
use crate::video::driver::VideoDriver;
use crate::video::messages::{DriverError, DriverRequest, DriverResponse, ModeRequest, VideoInfo};
use log::{debug, info, trace, warn};

/// Depths `set_video_mode` accepts; 0 selects the display depth.
pub const VALID_MODE_DEPTHS: [u8; 6] = [0, 8, 15, 16, 24, 32];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiatorState {
    Unconfigured,
    AttributesRequested,
    /// A surface was granted and is being installed.
    ModeSet,
    Ready,
}

impl NegotiatorState {
    pub fn name(self) -> &'static str {
        match self {
            NegotiatorState::Unconfigured => "Unconfigured",
            NegotiatorState::AttributesRequested => "AttributesRequested",
            NegotiatorState::ModeSet => "ModeSet",
            NegotiatorState::Ready => "Ready",
        }
    }

    fn accepts_attributes(self) -> bool {
        matches!(self, NegotiatorState::Unconfigured | NegotiatorState::AttributesRequested)
    }
}

/// Argument to `show_cursor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorToggle {
    Query,
    Show,
    Hide,
}

pub struct VideoNegotiator {
    /// Only `None` while `shutdown` hands the driver back.
    driver: Option<Box<dyn VideoDriver>>,
    info: VideoInfo,
    state: NegotiatorState,
    requests: AttributeRequests,
    granted: GrantedAttributes,
    screen: Option<Surface>,
    caption: Option<(String, String)>,
    cursor_visible: bool,
}

impl std::fmt::Debug for VideoNegotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoNegotiator")
            .field("driver", &self.driver_name())
            .field("state", &self.state)
            .field("requests", &self.requests)
            .field("screen", &self.screen.as_ref().map(Surface::id))
            .finish()
    }
}

impl VideoNegotiator {
    /// Initialises `driver` and discovers the display.
    pub fn new(mut driver: Box<dyn VideoDriver>) -> Result<Self> {
        info!("VideoNegotiator: initializing '{}' driver", driver.name());
        let info = match driver.handle_request(DriverRequest::Init)? {
            DriverResponse::InitComplete { info } => info,
            other => return Err(unexpected("InitComplete", &other)),
        };
        info!(
            "VideoNegotiator: display {}x{} at {} bpp, {} KiB video memory",
            info.current_w,
            info.current_h,
            info.format.bits_per_pixel(),
            info.video_mem_kb
        );
        Ok(VideoNegotiator {
            driver: Some(driver),
            info,
            state: NegotiatorState::Unconfigured,
            requests: AttributeRequests::new(),
            granted: GrantedAttributes::new(),
            screen: None,
            caption: None,
            cursor_visible: true,
        })
    }

    pub fn state(&self) -> NegotiatorState {
        self.state
    }

    pub fn video_info(&self) -> &VideoInfo {
        &self.info
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.as_ref().map_or("none", |driver| driver.name())
    }

    /// The current screen surface, if a mode is set.
    pub fn screen(&self) -> Option<&Surface> {
        self.screen.as_ref()
    }

    pub fn requests(&self) -> &AttributeRequests {
        &self.requests
    }

    /// Records a preferred attribute value.
    pub fn set_attribute(&mut self, attr: GlAttr, value: i32) -> Result<()> {
        self.request_attribute(AttributeRequest::preferred(attr, value))
    }

    /// Records a value the next mode set must meet or fail.
    pub fn require_attribute(&mut self, attr: GlAttr, value: i32) -> Result<()> {
        self.request_attribute(AttributeRequest::required(attr, value))
    }

    /// Records a desired attribute. Only valid before the first mode set.
    pub fn request_attribute(&mut self, request: AttributeRequest) -> Result<()> {
        if !self.state.accepts_attributes() {
            return Err(Error::InvalidState {
                operation: "set_attribute",
                state: self.state.name(),
            });
        }
        self.requests.insert(request)?;
        trace!(
            "VideoNegotiator: {:?} {} = {}",
            request.requirement,
            request.attr,
            request.value
        );
        self.transition(NegotiatorState::AttributesRequested);
        Ok(())
    }

    /// Creates a screen surface of `width`x`height` at `bits_per_pixel`
    /// (0 for the display depth), replacing any previous screen.
    ///
    /// On failure the previous screen and state are kept.
    pub fn set_video_mode(
        &mut self,
        width: u32,
        height: u32,
        bits_per_pixel: u8,
        flags: SurfaceFlags,
    ) -> Result<Surface> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument(format!(
                "video mode must have non-zero dimensions, got {}x{}",
                width, height
            )));
        }
        if !VALID_MODE_DEPTHS.contains(&bits_per_pixel) {
            return Err(Error::InvalidArgument(format!(
                "video mode depth must be one of {:?}, got {}",
                VALID_MODE_DEPTHS, bits_per_pixel
            )));
        }
        let depth = match bits_per_pixel {
            0 => self.info.format.bits_per_pixel(),
            bpp => bpp,
        };
        let mode = ModeRequest {
            width,
            height,
            bits_per_pixel: depth,
            flags,
            attributes: self.requests.clone(),
        };
        let wants_context = mode.wants_context();
        info!("VideoNegotiator: requesting {}x{}x{} flags={:?}", width, height, depth, flags);

        let response = self
            .request(DriverRequest::RequestSurface(mode))
            .map_err(|err| {
                warn!("VideoNegotiator: mode set failed: {}", err);
                Error::ModeSetFailed(err.to_string())
            })?;
        let (surface, granted) = match response {
            DriverResponse::Surface { surface, granted } => (surface, granted),
            other => return Err(unexpected("Surface", &other)),
        };

        if wants_context {
            if let Some(request) = granted.unmet(&self.requests) {
                let reason = format!(
                    "{} granted {} but {} is required",
                    request.attr,
                    granted.get(request.attr),
                    request.value
                );
                discard(&surface);
                warn!("VideoNegotiator: mode set failed: {}", reason);
                return Err(Error::ModeSetFailed(reason));
            }
            for request in self.requests.iter() {
                let value = granted.get(request.attr);
                if !request.is_met_by(value) {
                    info!(
                        "VideoNegotiator: preferred {} = {} degraded to {}",
                        request.attr, request.value, value
                    );
                }
            }
        }

        self.transition(NegotiatorState::ModeSet);
        if let Some(old) = self.screen.replace(surface.clone()) {
            release_screen(&old);
        }
        self.granted = granted;
        self.transition(NegotiatorState::Ready);
        Ok(surface)
    }

    /// The value actually granted for `attr`. Only valid once `Ready`.
    pub fn get_attribute(&self, attr: GlAttr) -> Result<i32> {
        if self.state != NegotiatorState::Ready {
            return Err(Error::InvalidState {
                operation: "get_attribute",
                state: self.state.name(),
            });
        }
        Ok(self.granted.get(attr))
    }

    pub fn granted(&self) -> Option<&GrantedAttributes> {
        (self.state == NegotiatorState::Ready).then_some(&self.granted)
    }

    /// True when the screen is a double-buffered GL surface.
    pub fn is_double_buffered_gl(&self) -> bool {
        self.state == NegotiatorState::Ready
            && self
                .screen
                .as_ref()
                .is_some_and(|screen| screen.flags().contains(SurfaceFlags::OPENGL))
            && self.granted.is_double_buffered()
    }

    /// Presents the back buffer. A documented no-op unless the screen is a
    /// double-buffered GL surface; returns whether anything was presented.
    pub fn swap_buffers(&mut self) -> Result<bool> {
        let screen = self.ready_screen("swap_buffers")?;
        if !self.is_double_buffered_gl() {
            trace!("VideoNegotiator: swap_buffers on a single-buffered screen is a no-op");
            return Ok(false);
        }
        self.present(screen)?;
        Ok(true)
    }

    /// Presents the screen surface, whatever its kind.
    pub fn flip(&mut self) -> Result<()> {
        let screen = self.ready_screen("flip")?;
        self.present(screen)
    }

    pub fn set_caption(&mut self, title: &str, icon: &str) -> Result<()> {
        self.expect_response(
            DriverRequest::SetCaption {
                title: title.to_string(),
                icon: icon.to_string(),
            },
            "CaptionSet",
            |response| matches!(response, DriverResponse::CaptionSet),
        )?;
        self.caption = Some((title.to_string(), icon.to_string()));
        Ok(())
    }

    /// `(title, icon)`.
    pub fn caption(&self) -> Option<(&str, &str)> {
        self.caption
            .as_ref()
            .map(|(title, icon)| (title.as_str(), icon.as_str()))
    }

    /// Shows, hides or queries the cursor; returns the visibility before
    /// the call.
    pub fn show_cursor(&mut self, toggle: CursorToggle) -> Result<bool> {
        let previous = self.cursor_visible;
        let visible = match toggle {
            CursorToggle::Query => return Ok(previous),
            CursorToggle::Show => true,
            CursorToggle::Hide => false,
        };
        if visible != previous {
            self.expect_response(
                DriverRequest::SetCursorVisible(visible),
                "CursorVisibilitySet",
                |response| matches!(response, DriverResponse::CursorVisibilitySet),
            )?;
            self.cursor_visible = visible;
        }
        Ok(previous)
    }

    pub fn warp_pointer(&mut self, x: u16, y: u16) -> Result<()> {
        self.expect_response(DriverRequest::WarpPointer { x, y }, "PointerWarped", |response| {
            matches!(response, DriverResponse::PointerWarped)
        })
    }

    /// Native events the driver has collected since the last call.
    pub fn poll_native_events(&mut self) -> Result<Vec<Event>> {
        match self.request(DriverRequest::PollEvents)? {
            DriverResponse::Events(events) => Ok(events),
            other => Err(unexpected("Events", &other)),
        }
    }

    /// Releases the screen surface and shuts the negotiator down, handing
    /// the driver back so it can be initialised again.
    pub fn shutdown(mut self) -> Option<Box<dyn VideoDriver>> {
        self.release();
        info!("VideoNegotiator: shut down");
        self.driver.take()
    }

    fn release(&mut self) {
        if let Some(screen) = self.screen.take() {
            release_screen(&screen);
        }
    }

    fn ready_screen(&self, operation: &'static str) -> Result<Surface> {
        match (&self.state, &self.screen) {
            (NegotiatorState::Ready, Some(screen)) => Ok(screen.clone()),
            _ => Err(Error::InvalidState {
                operation,
                state: self.state.name(),
            }),
        }
    }

    fn present(&mut self, screen: Surface) -> Result<()> {
        self.expect_response(DriverRequest::Present(screen), "Presented", |response| {
            matches!(response, DriverResponse::Presented)
        })
    }

    fn expect_response(
        &mut self,
        request: DriverRequest,
        expected: &'static str,
        is_expected: impl FnOnce(&DriverResponse) -> bool,
    ) -> Result<()> {
        let response = self.request(request)?;
        if is_expected(&response) {
            Ok(())
        } else {
            Err(unexpected(expected, &response))
        }
    }

    fn request(&mut self, request: DriverRequest) -> std::result::Result<DriverResponse, DriverError> {
        match self.driver.as_mut() {
            Some(driver) => driver.handle_request(request),
            None => Err(DriverError::NotInitialized),
        }
    }

    fn transition(&mut self, next: NegotiatorState) {
        if self.state != next {
            debug!("VideoNegotiator: {} -> {}", self.state.name(), next.name());
            self.state = next;
        }
    }
}

impl Drop for VideoNegotiator {
    fn drop(&mut self) {
        self.release();
    }
}

fn unexpected(expected: &'static str, got: &DriverResponse) -> Error {
    DriverError::UnexpectedResponse {
        expected,
        got: got.kind(),
    }
    .into()
}

fn release_screen(screen: &Surface) {
    match screen.release() {
        Ok(remaining) => debug!(
            "VideoNegotiator: released screen {} ({} references left)",
            screen.id(),
            remaining
        ),
        Err(err) => warn!("VideoNegotiator: releasing screen {}: {}", screen.id(), err),
    }
}

/// Drops the driver's reference to a surface that is not going to be used.
fn discard(surface: &Surface) {
    if let Err(err) = surface.release() {
        warn!("VideoNegotiator: discarding surface {}: {}", surface.id(), err);
    }
}
