// src/main.rs

use core_media::config::CONFIG;
use core_media::event::{ButtonState, Keysym};
use core_media::keys::KeySymbol;
use core_media::surface::SurfaceFlags;
use core_media::{Event, InitFlags, Platform};

use anyhow::Context;
use log::{debug, error, info, warn};
use std::thread;
use std::time::Duration;

/// Frame pacing for the demo loop.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Main entry point for the `core-media` demo.
fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting core-media demo...");

    let mut platform = Platform::new(CONFIG.clone());
    platform
        .init(InitFlags::VIDEO | InitFlags::JOYSTICK)
        .context("Failed to initialize video and joystick subsystems")?;

    let info = platform.video_info()?;
    info!(
        "Display: {}x{} via '{}' driver ({} KB video memory)",
        info.current_w,
        info.current_h,
        platform.video_driver_name()?,
        info.video_mem_kb
    );

    platform.request_configured_attributes()?;
    platform.set_caption(&CONFIG.video.caption, &CONFIG.video.caption)?;
    let screen = platform
        .set_video_mode(
            CONFIG.video.width,
            CONFIG.video.height,
            CONFIG.video.bits_per_pixel,
            SurfaceFlags::OPENGL | SurfaceFlags::DOUBLEBUF,
        )
        .context("Failed to set the video mode")?;
    info!(
        "Screen surface {}x{} at {} bpp",
        screen.width(),
        screen.height(),
        screen.format().bits_per_pixel()
    );

    let joysticks = platform.joystick_count()?;
    for index in 0..joysticks {
        info!("Joystick {}: {}", index, platform.joystick_name(index)?);
    }

    // Stands in for an input thread feeding the queue.
    let producer = platform.producer()?;
    let input = thread::spawn(move || -> core_media::Result<()> {
        for sym in [KeySymbol::H, KeySymbol::I] {
            let keysym = Keysym::new(sym);
            producer.key(ButtonState::Pressed, keysym)?;
            producer.key(ButtonState::Released, keysym)?;
            thread::sleep(FRAME_INTERVAL);
        }
        producer.mouse_motion(120, 80)?;
        producer.quit()
    });

    info!("Starting main event loop...");
    'running: loop {
        while let Some(event) = platform.poll_event()? {
            match event {
                Event::Quit => {
                    info!("Quit requested. Exiting main loop.");
                    break 'running;
                }
                Event::Key(key) => info!(
                    "Key {:?} {} (unicode {:?})",
                    key.state,
                    key.keysym.sym,
                    key.keysym.char()
                ),
                other => debug!("Event: {:?}", other),
            }
        }
        platform.swap_buffers()?;
        thread::sleep(FRAME_INTERVAL);
    }

    match input.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Input thread stopped early: {}", e),
        Err(_) => error!("Input thread panicked"),
    }

    info!("Shutting down platform...");
    platform.quit();
    info!("core-media exited successfully.");
    Ok(())
}
