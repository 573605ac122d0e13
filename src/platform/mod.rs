// src/platform/mod.rs
//
// The subsystem instance tying events, video and joysticks together.

//! `Platform` owns every piece of subsystem state: the event queue, the
//! current input levels, the video negotiator and the joystick subsystem.
//! Nothing is process-global, so independent instances can coexist.
//!
//! Each failing call also stores its message in the instance's last-error
//! slot, overwritten by the next failure.

use crate::config::Config;
use crate::error::{Error, ErrorSlot, Result, Subsystem};
use crate::event::{
    Event, EventProducer, EventQueue, EventState, EventType, InputState, KeyboardSnapshot,
    MouseState,
};
use crate::joystick::{Joystick, JoystickBackend, Joysticks, VirtualJoystickBackend};
use crate::keys::Modifiers;
use crate::surface::{Surface, SurfaceFlags};
use crate::video::{
    CursorToggle, GlAttr, HeadlessHandle, HeadlessVideoDriver, VideoDriver, VideoInfo,
    VideoNegotiator,
};
use bitflags::bitflags;
use log::*;
use std::sync::Arc;

bitflags! {
    /// Subsystems selectable at init.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InitFlags: u32 {
        const TIMER = 0x0000_0001;
        const AUDIO = 0x0000_0010;
        const VIDEO = 0x0000_0020;
        const CDROM = 0x0000_0100;
        const JOYSTICK = 0x0000_0200;
        const EVERYTHING = 0x0000_FFFF;
    }
}

/// Subsystems whose work is delegated entirely to the host.
const HOST_DELEGATED: InitFlags = InitFlags::TIMER
    .union(InitFlags::AUDIO)
    .union(InitFlags::CDROM);

/// Subsystems that need the event queue.
const EVENT_USERS: InitFlags = InitFlags::VIDEO.union(InitFlags::JOYSTICK);

pub struct Platform {
    config: Config,
    errors: ErrorSlot,
    initialized: InitFlags,
    queue: Arc<EventQueue>,
    producer: EventProducer,
    video_driver: Option<Box<dyn VideoDriver>>,
    video: Option<VideoNegotiator>,
    headless: Option<HeadlessHandle>,
    joystick_backend: Option<Box<dyn JoystickBackend>>,
    joysticks: Option<Joysticks>,
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("initialized", &self.initialized)
            .field("queued", &self.queue.len())
            .field("video", &self.video)
            .field("joysticks", &self.joysticks)
            .finish()
    }
}

impl Platform {
    /// An uninitialised instance. Nothing touches the display until `init`.
    pub fn new(config: Config) -> Self {
        let queue = Arc::new(EventQueue::new(
            config.events.queue_capacity,
            config.events.overflow_policy,
        ));
        let producer = EventProducer::new(queue.clone(), Arc::new(InputState::new()), &config.input);
        Platform {
            config,
            errors: ErrorSlot::new(),
            initialized: InitFlags::empty(),
            queue,
            producer,
            video_driver: None,
            video: None,
            headless: None,
            joystick_backend: None,
            joysticks: None,
        }
    }

    /// Uses `driver` for video instead of the headless one. The driver
    /// survives `quit_subsystem` and is reused by the next video init.
    pub fn with_video_driver(mut self, driver: Box<dyn VideoDriver>) -> Self {
        self.video_driver = Some(driver);
        self.headless = None;
        self
    }

    pub fn with_joystick_backend(mut self, backend: Box<dyn JoystickBackend>) -> Self {
        self.joystick_backend = Some(backend);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // --- Lifecycle ---

    /// Brings up the subsystems in `flags` that are not running yet.
    pub fn init(&mut self, flags: InitFlags) -> Result<()> {
        let result = self.init_subsystems(flags);
        self.errors.record(result)
    }

    fn init_subsystems(&mut self, flags: InitFlags) -> Result<()> {
        let missing = flags - self.initialized;
        if missing.is_empty() {
            return Ok(());
        }

        if missing.contains(InitFlags::VIDEO) {
            let driver = match self.video_driver.take() {
                Some(driver) => driver,
                None => {
                    let driver = HeadlessVideoDriver::new(&self.config.headless);
                    self.headless = Some(driver.handle());
                    Box::new(driver)
                }
            };
            self.video = Some(VideoNegotiator::new(driver)?);
            self.initialized |= InitFlags::VIDEO;
            info!("Platform: video subsystem up");
        }

        if missing.contains(InitFlags::JOYSTICK) {
            let backend = self.joystick_backend.take().unwrap_or_else(|| {
                Box::new(VirtualJoystickBackend::from_config(&self.config.joystick))
            });
            self.joysticks = Some(Joysticks::new(backend, self.queue.clone()));
            self.initialized |= InitFlags::JOYSTICK;
            info!("Platform: joystick subsystem up");
        }

        let delegated = missing & HOST_DELEGATED;
        if !delegated.is_empty() {
            info!("Platform: {:?} delegated to the host", delegated);
            self.initialized |= delegated;
        }
        Ok(())
    }

    /// Tears down the subsystems in `flags`.
    pub fn quit_subsystem(&mut self, flags: InitFlags) {
        let running = flags & self.initialized;
        if running.contains(InitFlags::VIDEO) {
            if let Some(video) = self.video.take() {
                // Kept for the next init, along with its headless handle.
                self.video_driver = video.shutdown();
            }
            info!("Platform: video subsystem down");
        }
        if running.contains(InitFlags::JOYSTICK) {
            self.joysticks = None;
            info!("Platform: joystick subsystem down");
        }
        self.initialized -= running;

        if !running.is_empty() && !self.initialized.intersects(EVENT_USERS) {
            let dropped = self.queue.clear();
            self.producer.state().reset();
            debug!("Platform: event queue closed, {} events dropped", dropped);
        }
    }

    /// Tears everything down.
    pub fn quit(&mut self) {
        self.quit_subsystem(InitFlags::all());
    }

    /// Which of `flags` are initialised.
    pub fn was_init(&self, flags: InitFlags) -> InitFlags {
        self.initialized & flags
    }

    pub fn last_error(&self) -> Option<String> {
        self.errors.get()
    }

    pub fn clear_error(&self) {
        self.errors.clear()
    }

    fn fail<T>(&self, err: Error) -> Result<T> {
        self.errors.record(Err(err))
    }

    // --- Events ---

    fn events_ready(&self) -> Result<()> {
        if self.initialized.intersects(EVENT_USERS) {
            Ok(())
        } else {
            self.fail(Error::SubsystemNotInitialized(Subsystem::Events))
        }
    }

    /// A producer handle for input backends; safe to move to other threads.
    pub fn producer(&self) -> Result<EventProducer> {
        self.events_ready()?;
        Ok(self.producer.clone())
    }

    pub fn event_queue(&self) -> Result<Arc<EventQueue>> {
        self.events_ready()?;
        Ok(self.queue.clone())
    }

    /// Moves pending native events from the driver into the queue, in driver
    /// order. Returns how many were queued. Events refused by a full queue
    /// are counted by the queue and reported through the last error.
    pub fn pump_events(&mut self) -> Result<usize> {
        self.events_ready()?;
        let Some(video) = self.video.as_mut() else {
            return Ok(0);
        };
        let events = match video.poll_native_events() {
            Ok(events) => events,
            Err(err) => return self.fail(err),
        };
        let mut queued = 0;
        for event in events {
            match self.producer.dispatch(event) {
                Ok(()) => queued += 1,
                Err(err) => {
                    warn!("Platform: dropping native event: {}", err);
                    self.errors.set(err.to_string());
                }
            }
        }
        Ok(queued)
    }

    /// Pumps, then dequeues at most one event. Never blocks.
    pub fn poll_event(&mut self) -> Result<Option<Event>> {
        self.pump_events()?;
        Ok(self.queue.poll())
    }

    /// Appends an event as-is.
    pub fn push_event(&self, event: Event) -> Result<()> {
        self.events_ready()?;
        self.errors.record(self.queue.push(event))
    }

    pub fn event_state(&self, ty: EventType, state: EventState) -> Result<EventState> {
        self.events_ready()?;
        Ok(self.queue.set_event_state(ty, state))
    }

    pub fn keyboard_state(&self) -> Result<KeyboardSnapshot> {
        self.events_ready()?;
        Ok(self.producer.state().keyboard())
    }

    pub fn mouse_state(&self) -> Result<MouseState> {
        self.events_ready()?;
        Ok(self.producer.state().mouse())
    }

    pub fn mod_state(&self) -> Result<Modifiers> {
        self.events_ready()?;
        Ok(self.producer.state().modifiers())
    }

    pub fn set_mod_state(&self, modifiers: Modifiers) -> Result<()> {
        self.events_ready()?;
        self.producer.state().set_modifiers(modifiers);
        Ok(())
    }

    pub fn enable_key_repeat(&self, delay_ms: u32, interval_ms: u32) -> Result<()> {
        self.events_ready()?;
        self.producer.enable_key_repeat(delay_ms, interval_ms);
        Ok(())
    }

    /// Returns the previous setting.
    pub fn enable_unicode(&self, enable: bool) -> Result<bool> {
        self.events_ready()?;
        Ok(self.producer.enable_unicode(enable))
    }

    // --- Video ---

    fn video(&self) -> Result<&VideoNegotiator> {
        match self.video.as_ref() {
            Some(video) => Ok(video),
            None => self.fail(Error::SubsystemNotInitialized(Subsystem::Video)),
        }
    }

    /// Runs `f` on the negotiator, recording any failure.
    fn with_video<T>(&mut self, f: impl FnOnce(&mut VideoNegotiator) -> Result<T>) -> Result<T> {
        let result = match self.video.as_mut() {
            Some(video) => f(video),
            None => Err(Error::SubsystemNotInitialized(Subsystem::Video)),
        };
        self.errors.record(result)
    }

    /// The headless driver's handle, when the default driver is in use.
    /// It stays valid across video re-inits, which reuse the same driver.
    pub fn headless(&self) -> Option<&HeadlessHandle> {
        self.headless.as_ref()
    }

    pub fn video_info(&self) -> Result<VideoInfo> {
        Ok(self.video()?.video_info().clone())
    }

    pub fn video_driver_name(&self) -> Result<&'static str> {
        Ok(self.video()?.driver_name())
    }

    pub fn set_attribute(&mut self, attr: GlAttr, value: i32) -> Result<()> {
        self.with_video(|video| video.set_attribute(attr, value))
    }

    pub fn require_attribute(&mut self, attr: GlAttr, value: i32) -> Result<()> {
        self.with_video(|video| video.require_attribute(attr, value))
    }

    /// Applies the attribute requests stored in the configuration.
    pub fn request_configured_attributes(&mut self) -> Result<()> {
        let requests = self.config.video.attributes.clone();
        self.with_video(|video| {
            requests
                .into_iter()
                .try_for_each(|request| video.request_attribute(request))
        })
    }

    pub fn get_attribute(&self, attr: GlAttr) -> Result<i32> {
        let result = self.video().and_then(|video| video.get_attribute(attr));
        self.errors.record(result)
    }

    pub fn set_video_mode(&mut self, width: u32, height: u32, bits_per_pixel: u8, flags: SurfaceFlags) -> Result<Surface> {
        self.with_video(|video| video.set_video_mode(width, height, bits_per_pixel, flags))
    }

    /// The current screen surface, if a mode is set.
    pub fn screen(&self) -> Result<Option<Surface>> {
        Ok(self.video()?.screen().cloned())
    }

    /// Returns whether a buffer was presented.
    pub fn swap_buffers(&mut self) -> Result<bool> {
        self.with_video(VideoNegotiator::swap_buffers)
    }

    pub fn flip(&mut self) -> Result<()> {
        self.with_video(VideoNegotiator::flip)
    }

    pub fn set_caption(&mut self, title: &str, icon: &str) -> Result<()> {
        self.with_video(|video| video.set_caption(title, icon))
    }

    pub fn caption(&self) -> Result<Option<(String, String)>> {
        Ok(self
            .video()?
            .caption()
            .map(|(title, icon)| (title.to_string(), icon.to_string())))
    }

    /// Returns whether the cursor was visible before the call.
    pub fn show_cursor(&mut self, toggle: CursorToggle) -> Result<bool> {
        self.with_video(|video| video.show_cursor(toggle))
    }

    /// Moves the pointer and posts the resulting motion event.
    pub fn warp_mouse(&mut self, x: u16, y: u16) -> Result<()> {
        self.with_video(|video| video.warp_pointer(x, y))?;
        let result = self.producer.mouse_motion(i32::from(x), i32::from(y));
        self.errors.record(result)
    }

    // --- Joysticks ---

    pub fn joysticks(&self) -> Result<&Joysticks> {
        match self.joysticks.as_ref() {
            Some(joysticks) => Ok(joysticks),
            None => self.fail(Error::SubsystemNotInitialized(Subsystem::Joystick)),
        }
    }

    pub fn joystick_count(&self) -> Result<usize> {
        Ok(self.joysticks()?.count())
    }

    pub fn joystick_name(&self, index: usize) -> Result<String> {
        let result = self.joysticks().and_then(|joysticks| joysticks.name(index));
        self.errors.record(result)
    }

    pub fn joystick_open(&self, index: usize) -> Result<Joystick> {
        let result = self.joysticks().and_then(|joysticks| joysticks.open(index));
        self.errors.record(result)
    }

    pub fn joystick_event_state(&self, state: EventState) -> Result<EventState> {
        Ok(self.joysticks()?.event_state(state))
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        if !self.initialized.is_empty() {
            self.quit();
        }
    }
}

#[cfg(test)]
mod tests;
