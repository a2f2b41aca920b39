mod camera;
mod capture;
mod commands;
mod output;
mod permission;
mod screen;
mod session;
mod transform;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use camera::{CaptureMode, LensFacing, NokhwaCameraProvider};
use clap::Parser;
use commands::UserAction;
use output::{PreviewSurface, ResultPanel, V4L2Output};
use permission::{PermissionGate, SystemPermissions};
use screen::CameraScreen;
use session::{CaptureSessionController, SessionSettings, SwitchPolicy};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use transform::DisplayRotation;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output v4l2loopback device showing the live preview
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Preview target resolution width
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Preview target resolution height
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Display surface width
    #[arg(long, default_value_t = 640)]
    surface_width: u32,

    /// Display surface height
    #[arg(long, default_value_t = 480)]
    surface_height: u32,

    /// Display rotation in degrees (0, 90, 180 or 270)
    #[arg(long, default_value = "0", value_parser = parse_rotation)]
    rotation: DisplayRotation,

    /// Camera to open first
    #[arg(long, value_enum, default_value_t = LensFacing::Back)]
    lens_facing: LensFacing,

    /// Device index used as the back camera
    #[arg(long, default_value_t = 0)]
    back_device: u32,

    /// Device index used as the front camera
    #[arg(long, default_value_t = 1)]
    front_device: u32,

    /// Still capture trade-off
    #[arg(long, value_enum, default_value_t = CaptureMode::MinLatency)]
    capture_mode: CaptureMode,

    /// Directory photos are written to (default: <pictures>/snapcam)
    #[arg(long)]
    media_dir: Option<PathBuf>,

    /// Also write the result view to this image file
    #[arg(long)]
    result_path: Option<PathBuf>,

    /// Result view width
    #[arg(long, default_value_t = 320)]
    result_width: u32,

    /// Result view height
    #[arg(long, default_value_t = 240)]
    result_height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Restore the selected camera when switching to a missing one fails
    #[arg(long)]
    rollback_failed_switch: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn parse_rotation(value: &str) -> Result<DisplayRotation, String> {
    let degrees: u32 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of degrees", value))?;
    DisplayRotation::from_degrees(degrees)
        .ok_or_else(|| format!("rotation must be 0, 90, 180 or 270, got {}", degrees))
}

fn default_media_dir() -> PathBuf {
    dirs::picture_dir()
        .map(|dir| dir.join("snapcam"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let media_dir = args.media_dir.clone().unwrap_or_else(default_media_dir);

    tracing::info!("snapcam starting");
    tracing::info!("Preview: {}x{}", args.width, args.height);
    tracing::info!("Surface: {}x{}", args.surface_width, args.surface_height);
    tracing::info!("Media directory: {}", media_dir.display());

    let provider = NokhwaCameraProvider::new(args.back_device, args.front_device, args.fps);

    let surface = V4L2Output::new(
        &args.output_device,
        args.surface_width,
        args.surface_height,
        args.rotation,
    )
    .context("Failed to initialize v4l2loopback output")?;

    let settings = SessionSettings {
        target_resolution: (args.width, args.height),
        capture_mode: args.capture_mode,
        media_dir: media_dir.clone(),
        switch_policy: if args.rollback_failed_switch {
            SwitchPolicy::Rollback
        } else {
            SwitchPolicy::KeepToggle
        },
    };

    let controller = CaptureSessionController::new(provider, surface, settings)
        .context("Failed to start capture worker")?;

    let camera_device = PathBuf::from(format!("/dev/video{}", args.back_device));
    let gate = PermissionGate::new(SystemPermissions::new(camera_device, media_dir));
    let results = ResultPanel::new(args.result_width, args.result_height, args.result_path.clone());

    let mut screen = CameraScreen::new(gate, controller, results, args.lens_facing);

    let (actions_tx, actions) = mpsc::channel();
    commands::spawn_stdin_reader(actions_tx.clone()).context("Failed to read commands")?;
    ctrlc::set_handler(move || {
        let _ = actions_tx.send(UserAction::Quit);
    })
    .context("Failed to install Ctrl+C handler")?;

    println!("{}", commands::HELP);

    screen.initialize();
    run_display_loop(&mut screen, &actions, args.fps);
    screen.teardown();

    tracing::info!("Camera screen closed");
    Ok(())
}

type DesktopScreen = CameraScreen<NokhwaCameraProvider, V4L2Output, SystemPermissions, ResultPanel>;

fn run_display_loop(screen: &mut DesktopScreen, actions: &mpsc::Receiver<UserAction>, fps: u32) {
    let frame_duration = Duration::from_secs_f32(1.0 / fps.max(1) as f32);

    loop {
        let loop_start = Instant::now();

        screen.tick();
        if screen.is_finished() {
            return;
        }

        while let Ok(action) = actions.try_recv() {
            match action {
                UserAction::Capture => screen.capture_clicked(),
                UserAction::SwitchCamera => screen.switch_clicked(),
                UserAction::RotateDisplay => {
                    let surface = screen.controller_mut().surface_mut();
                    let rotation = surface.display_rotation().next();
                    surface.set_display_rotation(rotation);
                }
                UserAction::Quit => return,
            }
        }

        // Frame rate limiting
        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }
}
