// src/joystick/tests.rs

use super::*;
use crate::config::InputConfig;
use crate::event::{Event, InputState, JoyAxisEvent};
use test_log::test;

fn pad(name: &str) -> VirtualJoystickConfig {
    VirtualJoystickConfig {
        name: name.to_string(),
        axes: 2,
        buttons: 3,
        hats: 1,
        balls: 1,
    }
}

fn subsystem(devices: &[VirtualJoystickConfig]) -> (Joysticks, EventProducer) {
    let queue = Arc::new(EventQueue::default());
    let producer = EventProducer::new(queue.clone(), Arc::new(InputState::new()), &InputConfig::default());
    let joysticks = Joysticks::new(Box::new(VirtualJoystickBackend::new(devices)), queue);
    (joysticks, producer)
}

#[test]
fn it_should_fail_to_open_on_an_empty_device_list() {
    let (joysticks, _) = subsystem(&[]);
    assert_eq!(joysticks.count(), 0);
    assert!(matches!(joysticks.open(0), Err(Error::InvalidArgument(_))));
    assert!(matches!(joysticks.name(0), Err(Error::InvalidArgument(_))));
}

#[test]
fn it_should_enumerate_configured_devices() -> anyhow::Result<()> {
    let (joysticks, _) = subsystem(&[pad("Left"), pad("Right")]);
    assert_eq!(joysticks.count(), 2);
    assert_eq!(joysticks.name(1)?, "Right");

    let stick = joysticks.open(1)?;
    assert_eq!(stick.index(), 1);
    assert_eq!((stick.axis_count(), stick.button_count()), (2, 3));
    assert_eq!((stick.hat_count(), stick.ball_count()), (1, 1));
    assert!(joysticks.is_opened(1)?);
    assert!(!joysticks.is_opened(0)?);

    drop(stick);
    assert!(!joysticks.is_opened(1)?);
    Ok(())
}

#[test]
fn it_should_track_levels_and_post_changes() -> anyhow::Result<()> {
    let (joysticks, producer) = subsystem(&[pad("Pad")]);
    let device = joysticks.device(0)?;
    let stick = joysticks.open(0)?;

    device.update_axis(&producer, 1, -12000)?;
    device.update_axis(&producer, 1, -12000)?;
    device.update_button(&producer, 2, ButtonState::Pressed)?;
    device.update_hat(&producer, 0, HatPosition::LEFT_UP)?;
    device.update_ball(&producer, 0, 3, -1)?;
    device.update_ball(&producer, 0, 2, 0)?;

    assert_eq!(stick.axis(1)?, -12000);
    assert_eq!(stick.axis(0)?, 0);
    assert_eq!(stick.button(2)?, ButtonState::Pressed);
    assert_eq!(stick.hat(0)?, HatPosition::LEFT_UP);
    assert_eq!(stick.ball(0)?, (5, -1));
    assert_eq!(stick.ball(0)?, (0, 0));

    let queue = producer.queue();
    assert_eq!(
        queue.poll(),
        Some(Event::JoyAxis(JoyAxisEvent { which: 0, axis: 1, value: -12000 }))
    );
    assert_eq!(queue.len(), 4);
    Ok(())
}

#[test]
fn it_should_reject_out_of_range_controls() -> anyhow::Result<()> {
    let (joysticks, producer) = subsystem(&[pad("Pad")]);
    let stick = joysticks.open(0)?;
    assert!(matches!(stick.axis(2), Err(Error::InvalidArgument(_))));
    assert!(matches!(stick.button(3), Err(Error::InvalidArgument(_))));
    assert!(matches!(stick.hat(1), Err(Error::InvalidArgument(_))));
    assert!(matches!(
        joysticks.device(0)?.update_axis(&producer, 9, 1),
        Err(Error::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn it_should_toggle_joystick_event_posting() -> anyhow::Result<()> {
    let (joysticks, producer) = subsystem(&[pad("Pad")]);
    let device = joysticks.device(0)?;

    assert_eq!(joysticks.event_state(EventState::Ignore), EventState::Enable);
    assert_eq!(joysticks.event_state(EventState::Query), EventState::Ignore);
    device.update_axis(&producer, 0, 100)?;
    device.update_button(&producer, 0, ButtonState::Pressed)?;
    assert!(producer.queue().is_empty());

    let stick = joysticks.open(0)?;
    assert_eq!(stick.axis(0)?, 100);

    joysticks.event_state(EventState::Enable);
    device.update_axis(&producer, 0, 200)?;
    assert_eq!(producer.queue().len(), 1);
    Ok(())
}
