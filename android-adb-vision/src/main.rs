mod args;

use android_adb_vision::adb::{AdbBackend, AdbImpl};
use android_adb_vision::{Session, Settings, VisionResult};
use args::{Args, Command};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let args = match Args::parse() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(_) => return ExitCode::FAILURE,
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            println!("❌ Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(args)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            println!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn settings_for(args: &Args) -> VisionResult<Settings> {
    let mut settings = Settings::from_env()?;
    if let Some(bundle) = &args.bundle {
        settings.set_bundle_path(bundle);
    }
    if let Some(secs) = args.timeout_secs {
        settings.set_auto_wait_timeout(secs)?;
    }
    if let Some(secs) = args.move_delay_secs {
        settings.set_move_mouse_delay(secs)?;
    }
    Ok(settings)
}

async fn open(args: &Args, settings: Settings) -> VisionResult<Session<AdbBackend>> {
    let imp: AdbImpl = args.adb_impl;
    let session = match &args.device {
        Some(name) => Session::open(AdbBackend::new_with_device(name, imp).await?, settings),
        None => Session::connect(imp, settings).await?,
    };
    println!(
        "📱 Device: {} (backend={})",
        session.device().name(),
        imp.as_str()
    );
    Ok(session)
}

/// Run one command; `Ok(false)` means it completed with a negative answer
async fn run(args: Args) -> VisionResult<bool> {
    if args.command == Command::Devices {
        let devices = AdbBackend::list_devices(args.adb_impl).await?;
        if devices.is_empty() {
            println!("❌ No devices found");
            return Ok(false);
        }
        for device in devices {
            println!(
                "📱 {} (transport {})",
                device.name,
                device.transport_id.as_deref().unwrap_or("-")
            );
        }
        return Ok(true);
    }

    let settings = settings_for(&args)?;
    let mut session = open(&args, settings).await?;
    let screen = session.screen();

    let outcome = match &args.command {
        Command::Devices => true,
        Command::Bounds => {
            let bounds = screen.get_bounds().await?;
            println!("📐 Screen: {}x{}", bounds.width, bounds.height);
            true
        }
        Command::Capture { file } => {
            let frame = screen.capture().await?;
            frame.save_png(file)?;
            println!(
                "✅ Screenshot #{} {}x{} ({}ms) saved to {}",
                frame.index(),
                frame.width(),
                frame.height(),
                frame.capture_ms(),
                file.display()
            );
            true
        }
        Command::Exists { name } => {
            let found = screen.exists(name).await?;
            if found {
                println!("✅ '{name}' is on screen");
            } else {
                println!("❌ '{name}' not found");
            }
            found
        }
        Command::Find { name } => {
            let found = screen.find(name).await?;
            println!("🎯 '{name}' at {found}");
            true
        }
        Command::Click { name } => {
            let found = screen.click(name).await?;
            let (x, y) = found.center();
            println!("👆 Tapped '{name}' at ({x},{y})");
            true
        }
        Command::Drag { source, target } => {
            screen.drag_drop(source, target).await?;
            println!("✋ Dragged '{source}' onto '{target}'");
            true
        }
        Command::Type { text } => {
            screen.type_text(text).await?;
            println!("⌨️ Typed {} character(s)", text.chars().count());
            true
        }
        Command::Press { key, action } => {
            screen.press(*key, *action).await?;
            println!("🔘 Sent {key} {action}");
            true
        }
    };

    session.close();
    Ok(outcome)
}
