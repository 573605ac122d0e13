// src/platform/tests.rs

use super::*;
use crate::config::{HeadlessConfig, VirtualJoystickConfig};
use crate::event::{ButtonState, Keysym, MouseButton, MouseMotionEvent, MouseButtons, OverflowPolicy};
use crate::keys::{self, KeySymbol};
use anyhow::Result;
use test_log::test;

fn video_platform() -> Result<Platform> {
    let mut platform = Platform::new(Config::default());
    platform.init(InitFlags::VIDEO)?;
    Ok(platform)
}

#[test]
fn it_should_refuse_work_before_init() {
    let mut platform = Platform::new(Config::default());
    assert_eq!(
        platform.poll_event().unwrap_err(),
        Error::SubsystemNotInitialized(Subsystem::Events)
    );
    assert_eq!(
        platform.set_attribute(GlAttr::DepthSize, 24).unwrap_err(),
        Error::SubsystemNotInitialized(Subsystem::Video)
    );
    assert_eq!(
        platform.joystick_count().unwrap_err(),
        Error::SubsystemNotInitialized(Subsystem::Joystick)
    );
    assert!(platform.last_error().is_some());
}

#[test]
fn it_should_track_initialized_subsystems() -> Result<()> {
    let mut platform = Platform::new(Config::default());
    platform.init(InitFlags::VIDEO | InitFlags::TIMER)?;
    assert_eq!(
        platform.was_init(InitFlags::EVERYTHING),
        InitFlags::VIDEO | InitFlags::TIMER
    );

    platform.init(InitFlags::VIDEO | InitFlags::JOYSTICK)?;
    assert!(platform.was_init(InitFlags::JOYSTICK).contains(InitFlags::JOYSTICK));

    platform.quit_subsystem(InitFlags::VIDEO);
    assert!(platform.was_init(InitFlags::VIDEO).is_empty());
    assert!(platform.producer().is_ok());

    platform.quit();
    assert!(platform.was_init(InitFlags::EVERYTHING).is_empty());
    assert!(platform.producer().is_err());
    Ok(())
}

#[test]
fn it_should_poll_a_pushed_key_event_then_report_empty() -> Result<()> {
    let mut platform = video_platform()?;
    let event = Event::key(
        ButtonState::Pressed,
        Keysym::new(KeySymbol::A).with_unicode(0x61),
    );
    platform.push_event(event.clone())?;
    assert_eq!(platform.poll_event()?, Some(event));
    assert_eq!(platform.poll_event()?, None);
    Ok(())
}

#[test]
fn it_should_pump_native_events_through_the_state_tables() -> Result<()> {
    let mut platform = video_platform()?;
    let headless = platform.headless().cloned().expect("default driver is headless");

    let keysym = Keysym::new(keys::from_evdev(30)).with_scancode(keys::scancode_from_evdev(30));
    headless.inject_all([
        Event::key(ButtonState::Pressed, keysym),
        Event::MouseMotion(MouseMotionEvent {
            state: MouseButtons::empty(),
            x: 40,
            y: 30,
            xrel: 0,
            yrel: 0,
        }),
        Event::Quit,
    ]);

    let first = platform.poll_event()?;
    match first {
        Some(Event::Key(key)) => {
            assert_eq!(key.keysym.sym, KeySymbol::A);
            assert_eq!(key.keysym.char(), Some('a'));
        }
        other => panic!("expected the key press first, got {:?}", other),
    }
    assert!(platform.keyboard_state()?.is_pressed(KeySymbol::A));
    let mouse = platform.mouse_state()?;
    assert_eq!((mouse.x, mouse.y), (40, 30));

    assert!(matches!(platform.poll_event()?, Some(Event::MouseMotion(_))));
    assert_eq!(platform.poll_event()?, Some(Event::Quit));
    assert_eq!(platform.poll_event()?, None);
    Ok(())
}

#[test]
fn it_should_report_overflow_through_the_last_error() -> Result<()> {
    let mut config = Config::default();
    config.events.queue_capacity = 1;
    config.events.overflow_policy = OverflowPolicy::RejectNewest;
    let mut platform = Platform::new(config);
    platform.init(InitFlags::VIDEO)?;

    platform.push_event(Event::Expose)?;
    assert!(matches!(
        platform.push_event(Event::Quit),
        Err(Error::ResourceExhausted(_))
    ));
    assert!(platform.last_error().is_some_and(|msg| msg.contains("full")));
    platform.clear_error();
    assert_eq!(platform.last_error(), None);

    let headless = platform.headless().cloned().expect("headless driver");
    headless.inject(Event::Quit);
    assert_eq!(platform.pump_events()?, 0);
    assert_eq!(platform.event_queue()?.overflow_count(), 2);
    assert!(platform.last_error().is_some());
    Ok(())
}

#[test]
fn it_should_negotiate_a_mode_and_record_failures() -> Result<()> {
    let mut platform = video_platform()?;
    platform.require_attribute(GlAttr::StencilSize, 64)?;
    assert!(platform
        .set_video_mode(640, 480, 0, SurfaceFlags::OPENGL)
        .is_err());
    let message = platform.last_error().expect("failure recorded");
    assert!(message.contains("stencil size"), "{}", message);
    assert_eq!(platform.screen()?, None);
    Ok(())
}

#[test]
fn it_should_apply_configured_attributes() -> Result<()> {
    let mut platform = video_platform()?;
    platform.request_configured_attributes()?;
    let screen = platform.set_video_mode(640, 480, 0, SurfaceFlags::OPENGL | SurfaceFlags::DOUBLEBUF)?;
    assert_eq!(screen.format().bits_per_pixel(), 32);
    assert_eq!(platform.get_attribute(GlAttr::DoubleBuffer)?, 1);
    assert!(platform.get_attribute(GlAttr::DepthSize)? >= 16);
    assert!(platform.swap_buffers()?);
    assert_eq!(platform.headless().map(HeadlessHandle::presents), Some(1));
    Ok(())
}

#[test]
fn it_should_reuse_an_injected_driver_after_video_restarts() -> Result<()> {
    let headless = HeadlessConfig {
        display_width: 123,
        ..HeadlessConfig::default()
    };
    let driver = HeadlessVideoDriver::new(&headless);
    let handle = driver.handle();
    let mut platform = Platform::new(Config::default()).with_video_driver(Box::new(driver));

    platform.init(InitFlags::VIDEO)?;
    assert_eq!(platform.video_info()?.current_w, 123);
    platform.set_video_mode(64, 64, 16, SurfaceFlags::SWSURFACE)?;
    platform.flip()?;

    platform.quit_subsystem(InitFlags::VIDEO);
    platform.init(InitFlags::VIDEO)?;
    assert_eq!(platform.video_info()?.current_w, 123);
    assert_eq!(platform.screen()?, None);
    platform.set_video_mode(64, 64, 16, SurfaceFlags::SWSURFACE)?;
    platform.flip()?;
    assert_eq!(handle.presents(), 2);
    assert_eq!(handle.surfaces_created(), 2);
    Ok(())
}

#[test]
fn it_should_keep_the_default_driver_across_video_restarts() -> Result<()> {
    let mut platform = video_platform()?;
    let headless = platform.headless().cloned().expect("default driver is headless");
    platform.quit_subsystem(InitFlags::VIDEO);
    platform.init(InitFlags::VIDEO)?;

    headless.inject(Event::Expose);
    assert_eq!(platform.poll_event()?, Some(Event::Expose));
    Ok(())
}

#[test]
fn it_should_release_the_screen_on_quit() -> Result<()> {
    let mut platform = video_platform()?;
    let screen = platform.set_video_mode(320, 240, 16, SurfaceFlags::SWSURFACE)?;
    platform.push_event(Event::Expose)?;
    platform.quit();
    assert!(screen.is_freed());
    assert!(platform.screen().is_err());
    Ok(())
}

#[test]
fn it_should_warp_the_mouse_and_post_motion() -> Result<()> {
    let mut platform = video_platform()?;
    platform.warp_mouse(100, 50)?;
    assert_eq!(platform.headless().map(HeadlessHandle::pointer), Some((100, 50)));

    let producer = platform.producer()?;
    producer.mouse_button(MouseButton::Right, ButtonState::Pressed)?;
    assert_eq!(platform.mouse_state()?.buttons, MouseButtons::RIGHT);

    match platform.poll_event()? {
        Some(Event::MouseMotion(motion)) => assert_eq!((motion.x, motion.y), (100, 50)),
        other => panic!("expected motion, got {:?}", other),
    }
    Ok(())
}

#[test]
fn it_should_expose_display_info_and_cursor_state() -> Result<()> {
    let mut platform = video_platform()?;
    let info = platform.video_info()?;
    assert_eq!((info.current_w, info.current_h), (1920, 1080));
    assert_eq!(platform.video_driver_name()?, "headless");

    platform.set_caption("title", "icon")?;
    assert_eq!(platform.caption()?, Some(("title".to_string(), "icon".to_string())));
    assert!(platform.show_cursor(CursorToggle::Hide)?);
    assert!(!platform.show_cursor(CursorToggle::Query)?);
    Ok(())
}

#[test]
fn it_should_open_configured_joysticks() -> Result<()> {
    let mut config = Config::default();
    config.joystick.devices.push(VirtualJoystickConfig::default());
    let mut platform = Platform::new(config);
    platform.init(InitFlags::JOYSTICK)?;

    assert_eq!(platform.joystick_count()?, 1);
    assert_eq!(platform.joystick_name(0)?, "Virtual Gamepad");
    assert!(platform.joystick_open(1).is_err());
    assert!(platform.last_error().is_some_and(|msg| msg.contains("out of range")));

    let stick = platform.joystick_open(0)?;
    let producer = platform.producer()?;
    platform
        .joysticks()?
        .device(0)?
        .update_button(&producer, 3, ButtonState::Pressed)?;
    assert_eq!(stick.button(3)?, ButtonState::Pressed);
    assert!(matches!(platform.poll_event()?, Some(Event::JoyButton(_))));
    Ok(())
}

#[test]
fn it_should_use_an_injected_joystick_backend() -> Result<()> {
    let mut platform = Platform::new(Config::default())
        .with_joystick_backend(Box::new(VirtualJoystickBackend::default()));
    platform.init(InitFlags::JOYSTICK)?;
    assert_eq!(platform.joystick_count()?, 0);
    assert!(matches!(platform.joystick_open(0), Err(Error::InvalidArgument(_))));
    assert_eq!(platform.joystick_event_state(EventState::Query)?, EventState::Enable);
    Ok(())
}

#[test]
fn it_should_keep_instances_independent() -> Result<()> {
    let mut first = video_platform()?;
    let mut second = video_platform()?;
    first.push_event(Event::Quit)?;
    assert_eq!(second.poll_event()?, None);
    assert_eq!(first.poll_event()?, Some(Event::Quit));
    Ok(())
}
