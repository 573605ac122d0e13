// src/joystick.rs

//! Joystick enumeration and polling.
//!
//! A `JoystickBackend` owns the devices. Each `JoystickDevice` keeps its
//! current axis/button/hat/ball levels in atomics; the input side updates
//! them through the `update_*` methods, which also post the matching event.
//! Index validity is checked everywhere: an out-of-range index is an
//! `InvalidArgument` error.

use crate::config::{JoystickConfig, VirtualJoystickConfig};
use crate::error::{Error, Result};
use crate::event::{ButtonState, EventProducer, EventQueue, EventState, EventType, HatPosition};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, AtomicI16, AtomicI32, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

/// Source of joystick devices.
pub trait JoystickBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn count(&self) -> usize;

    fn device(&self, index: usize) -> Option<Arc<JoystickDevice>>;
}

#[derive(Debug)]
struct Ball {
    dx: AtomicI32,
    dy: AtomicI32,
}

/// Live state of one device.
#[derive(Debug)]
pub struct JoystickDevice {
    index: u8,
    name: String,
    axes: Box<[AtomicI16]>,
    buttons: Box<[AtomicBool]>,
    hats: Box<[AtomicU8]>,
    balls: Box<[Ball]>,
    open_count: AtomicU32,
}

impl JoystickDevice {
    pub fn new(index: u8, config: &VirtualJoystickConfig) -> Self {
        JoystickDevice {
            index,
            name: config.name.clone(),
            axes: (0..config.axes).map(|_| AtomicI16::new(0)).collect(),
            buttons: (0..config.buttons).map(|_| AtomicBool::new(false)).collect(),
            hats: (0..config.hats).map(|_| AtomicU8::new(0)).collect(),
            balls: (0..config.balls)
                .map(|_| Ball {
                    dx: AtomicI32::new(0),
                    dy: AtomicI32::new(0),
                })
                .collect(),
            open_count: AtomicU32::new(0),
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    pub fn hat_count(&self) -> usize {
        self.hats.len()
    }

    pub fn ball_count(&self) -> usize {
        self.balls.len()
    }

    pub fn is_open(&self) -> bool {
        self.open_count.load(Ordering::Acquire) > 0
    }

    /// Sets an axis and posts the motion when the value changed.
    pub fn update_axis(&self, producer: &EventProducer, axis: u8, value: i16) -> Result<()> {
        let slot = slot(&self.axes, axis, "axis", &self.name)?;
        if slot.swap(value, Ordering::AcqRel) != value {
            producer.joy_axis(self.index, axis, value)?;
        }
        Ok(())
    }

    pub fn update_button(&self, producer: &EventProducer, button: u8, state: ButtonState) -> Result<()> {
        let slot = slot(&self.buttons, button, "button", &self.name)?;
        if slot.swap(state.is_pressed(), Ordering::AcqRel) != state.is_pressed() {
            producer.joy_button(self.index, button, state)?;
        }
        Ok(())
    }

    pub fn update_hat(&self, producer: &EventProducer, hat: u8, value: HatPosition) -> Result<()> {
        let slot = slot(&self.hats, hat, "hat", &self.name)?;
        if slot.swap(value.bits(), Ordering::AcqRel) != value.bits() {
            producer.joy_hat(self.index, hat, value)?;
        }
        Ok(())
    }

    /// Accumulates relative ball motion and posts it.
    pub fn update_ball(&self, producer: &EventProducer, ball: u8, xrel: i16, yrel: i16) -> Result<()> {
        let slot = slot(&self.balls, ball, "ball", &self.name)?;
        slot.dx.fetch_add(i32::from(xrel), Ordering::AcqRel);
        slot.dy.fetch_add(i32::from(yrel), Ordering::AcqRel);
        producer.joy_ball(self.index, ball, xrel, yrel)
    }
}

fn slot<'a, T>(slots: &'a [T], index: u8, kind: &str, device: &str) -> Result<&'a T> {
    slots.get(usize::from(index)).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "{} {} out of range for '{}' ({} available)",
            kind,
            index,
            device,
            slots.len()
        ))
    })
}

/// Devices described by configuration.
#[derive(Debug, Default)]
pub struct VirtualJoystickBackend {
    devices: Vec<Arc<JoystickDevice>>,
}

impl VirtualJoystickBackend {
    pub fn new(devices: &[VirtualJoystickConfig]) -> Self {
        let devices = devices
            .iter()
            .take(usize::from(u8::MAX) + 1)
            .enumerate()
            .map(|(index, config)| Arc::new(JoystickDevice::new(index as u8, config)))
            .collect();
        VirtualJoystickBackend { devices }
    }

    pub fn from_config(config: &JoystickConfig) -> Self {
        Self::new(&config.devices)
    }
}

impl JoystickBackend for VirtualJoystickBackend {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn count(&self) -> usize {
        self.devices.len()
    }

    fn device(&self, index: usize) -> Option<Arc<JoystickDevice>> {
        self.devices.get(index).cloned()
    }
}

/// An opened device. Dropping the handle closes it.
#[derive(Debug)]
pub struct Joystick {
    device: Arc<JoystickDevice>,
}

impl Joystick {
    pub fn index(&self) -> u8 {
        self.device.index
    }

    pub fn name(&self) -> &str {
        &self.device.name
    }

    pub fn axis_count(&self) -> usize {
        self.device.axis_count()
    }

    pub fn button_count(&self) -> usize {
        self.device.button_count()
    }

    pub fn hat_count(&self) -> usize {
        self.device.hat_count()
    }

    pub fn ball_count(&self) -> usize {
        self.device.ball_count()
    }

    pub fn axis(&self, axis: u8) -> Result<i16> {
        Ok(slot(&self.device.axes, axis, "axis", &self.device.name)?.load(Ordering::Acquire))
    }

    pub fn button(&self, button: u8) -> Result<ButtonState> {
        let pressed = slot(&self.device.buttons, button, "button", &self.device.name)?
            .load(Ordering::Acquire);
        Ok(ButtonState::from(pressed))
    }

    pub fn hat(&self, hat: u8) -> Result<HatPosition> {
        let bits = slot(&self.device.hats, hat, "hat", &self.device.name)?.load(Ordering::Acquire);
        Ok(HatPosition::from_bits_retain(bits))
    }

    /// Relative ball motion since the previous call.
    pub fn ball(&self, ball: u8) -> Result<(i32, i32)> {
        let slot = slot(&self.device.balls, ball, "ball", &self.device.name)?;
        Ok((
            slot.dx.swap(0, Ordering::AcqRel),
            slot.dy.swap(0, Ordering::AcqRel),
        ))
    }
}

impl Drop for Joystick {
    fn drop(&mut self) {
        self.device.open_count.fetch_sub(1, Ordering::AcqRel);
        debug!("Joystick {}: closed", self.device.index);
    }
}

/// The joystick subsystem.
pub struct Joysticks {
    backend: Box<dyn JoystickBackend>,
    queue: Arc<EventQueue>,
}

impl std::fmt::Debug for Joysticks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Joysticks")
            .field("backend", &self.backend.name())
            .field("count", &self.backend.count())
            .finish()
    }
}

impl Joysticks {
    pub fn new(backend: Box<dyn JoystickBackend>, queue: Arc<EventQueue>) -> Self {
        info!(
            "Joysticks: '{}' backend with {} devices",
            backend.name(),
            backend.count()
        );
        Joysticks { backend, queue }
    }

    pub fn count(&self) -> usize {
        self.backend.count()
    }

    pub fn name(&self, index: usize) -> Result<String> {
        Ok(self.device(index)?.name.clone())
    }

    pub fn open(&self, index: usize) -> Result<Joystick> {
        let device = self.device(index)?;
        device.open_count.fetch_add(1, Ordering::AcqRel);
        debug!("Joystick {}: opened '{}'", index, device.name);
        Ok(Joystick { device })
    }

    pub fn is_opened(&self, index: usize) -> Result<bool> {
        Ok(self.device(index)?.is_open())
    }

    /// Backend-side access for feeding input.
    pub fn device(&self, index: usize) -> Result<Arc<JoystickDevice>> {
        self.backend.device(index).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "joystick index {} out of range ({} devices)",
                index,
                self.backend.count()
            ))
        })
    }

    /// Enables, ignores or queries posting of every joystick event type.
    pub fn event_state(&self, state: EventState) -> EventState {
        match state {
            EventState::Query => self
                .queue
                .set_event_state(EventType::JoyAxisMotion, EventState::Query),
            _ => {
                let mut previous = EventState::Enable;
                for ty in EventType::JOYSTICK {
                    if self.queue.set_event_state(ty, state) == EventState::Ignore {
                        previous = EventState::Ignore;
                    }
                }
                previous
            }
        }
    }
}

#[cfg(test)]
mod tests;
