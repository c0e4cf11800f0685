use android_adb_vision::adb::AdbImpl;
use android_adb_vision::input::{KeyAction, KeyCode};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Devices,
    Bounds,
    Capture { file: PathBuf },
    Exists { name: String },
    Find { name: String },
    Click { name: String },
    Drag { source: String, target: String },
    Type { text: String },
    Press { key: KeyCode, action: KeyAction },
}

#[derive(Debug, PartialEq)]
pub struct Args {
    pub adb_impl: AdbImpl,
    pub device: Option<String>,
    pub bundle: Option<PathBuf>,
    pub timeout_secs: Option<f64>,
    pub move_delay_secs: Option<f64>,
    pub command: Command,
}

#[derive(Debug, PartialEq)]
pub enum Parsed {
    Run(Args),
    Help,
    Version,
}

impl Args {
    /// Parse the process arguments, printing help, version or errors itself.
    /// `Ok(None)` means there is nothing left to run; `Err` is a usage error.
    pub fn parse() -> Result<Option<Self>, String> {
        Self::from_cli(env::args().skip(1))
    }

    pub fn from_cli<I: IntoIterator<Item = String>>(args: I) -> Result<Option<Self>, String> {
        match Self::parse_from(args) {
            Ok(Parsed::Run(args)) => Ok(Some(args)),
            Ok(Parsed::Help) => {
                print_help();
                Ok(None)
            }
            Ok(Parsed::Version) => {
                println!(
                    "Android ADB Vision v{} ({})",
                    env!("APP_VERSION_DISPLAY"),
                    env!("APP_BUILD_YEAR")
                );
                Ok(None)
            }
            Err(msg) => {
                eprintln!("❌ {msg}");
                print_help();
                Err(msg)
            }
        }
    }

    pub fn parse_from<I: IntoIterator<Item = String>>(args: I) -> Result<Parsed, String> {
        let mut adb_impl = AdbImpl::from_env();
        let mut device = None;
        let mut bundle = None;
        let mut timeout_secs = None;
        let mut move_delay_secs = None;
        let mut positional: Vec<String> = Vec::new();

        for arg in args {
            if arg == "--help" || arg == "-h" {
                return Ok(Parsed::Help);
            } else if arg == "--version" || arg == "-v" {
                return Ok(Parsed::Version);
            } else if let Some(rest) = arg.strip_prefix("--impl=") {
                adb_impl = rest.parse()?;
            } else if let Some(rest) = arg.strip_prefix("--device=") {
                device = Some(rest.to_string());
            } else if let Some(rest) = arg.strip_prefix("--bundle=") {
                bundle = Some(PathBuf::from(rest));
            } else if let Some(rest) = arg.strip_prefix("--timeout=") {
                timeout_secs = Some(parse_seconds("timeout", rest)?);
            } else if let Some(rest) = arg.strip_prefix("--move-delay=") {
                move_delay_secs = Some(parse_seconds("move delay", rest)?);
            } else if arg.starts_with("--") {
                return Err(format!("Unknown argument: {arg}"));
            } else {
                positional.push(arg);
            }
        }

        let command = parse_command(&positional)?;
        Ok(Parsed::Run(Args {
            adb_impl,
            device,
            bundle,
            timeout_secs,
            move_delay_secs,
            command,
        }))
    }
}

fn parse_seconds(what: &str, val: &str) -> Result<f64, String> {
    match val.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(format!("Invalid {what} value: {val}")),
    }
}

fn parse_command(positional: &[String]) -> Result<Command, String> {
    let (verb, rest) = positional
        .split_first()
        .ok_or_else(|| "Missing command".to_string())?;
    let arity = |n: usize| {
        if rest.len() == n {
            Ok(())
        } else {
            Err(format!("'{verb}' expects {n} argument(s), got {}", rest.len()))
        }
    };

    let command = match verb.as_str() {
        "devices" => {
            arity(0)?;
            Command::Devices
        }
        "bounds" => {
            arity(0)?;
            Command::Bounds
        }
        "capture" => match rest {
            [] => Command::Capture {
                file: PathBuf::from("cli-screenshot.png"),
            },
            [file] => Command::Capture {
                file: PathBuf::from(file),
            },
            _ => return Err("'capture' expects at most one file name".into()),
        },
        "exists" => {
            arity(1)?;
            Command::Exists { name: rest[0].clone() }
        }
        "find" => {
            arity(1)?;
            Command::Find { name: rest[0].clone() }
        }
        "click" => {
            arity(1)?;
            Command::Click { name: rest[0].clone() }
        }
        "drag" => {
            arity(2)?;
            Command::Drag {
                source: rest[0].clone(),
                target: rest[1].clone(),
            }
        }
        "type" => {
            arity(1)?;
            Command::Type { text: rest[0].clone() }
        }
        "press" => {
            let (key, action) = match rest {
                [key] => (key, None),
                [key, action] => (key, Some(action)),
                _ => return Err("'press' expects KEYCODE_X [DOWN|UP|DOWN_AND_UP]".into()),
            };
            let key: KeyCode = key.parse().map_err(|e| format!("{e}"))?;
            let action = match action {
                Some(a) => a.parse().map_err(|e| format!("{e}"))?,
                None => KeyAction::DownAndUp,
            };
            Command::Press { key, action }
        }
        other => return Err(format!("Unknown command: {other}")),
    };
    Ok(command)
}

fn print_help() {
    println!("🤖 Android ADB Vision - image-based Android automation");
    println!();
    println!("USAGE:");
    println!("    android-adb-vision [FLAGS] <COMMAND>");
    println!();
    println!("FLAGS:");
    println!("    --impl=<shell|rust> Select ADB implementation (default: rust, env ADB_IMPL)");
    println!("                        The shell implementation requires the ADB tool to be installed.");
    println!("    --device=NAME       Device serial or host:port (default: first device)");
    println!("    --bundle=DIR        Directory holding template images (env ADB_VISION_BUNDLE_PATH)");
    println!("    --timeout=SECS      Wait for templates up to SECS seconds (default: 3)");
    println!("    --move-delay=SECS   Delay between drag motion events (default: 0)");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("COMMANDS:");
    println!("    devices                      List connected devices");
    println!("    bounds                       Print the screen size");
    println!("    capture [FILE]               Save a screenshot (default: cli-screenshot.png)");
    println!("    exists NAME                  Exit 0 if the template appears, 1 otherwise");
    println!("    find NAME                    Print where the template is");
    println!("    click NAME                   Tap the center of the template");
    println!("    drag SRC DST                 Drag one template onto another");
    println!("    type TEXT                    Type text on the device keyboard");
    println!("    press KEYCODE_X [ACTION]     Send a key (ACTION: DOWN, UP, DOWN_AND_UP)");
    println!();
    println!("EXAMPLES:");
    println!("    android-adb-vision capture");
    println!("    android-adb-vision --bundle=./res click lock.png");
    println!("    android-adb-vision --impl=shell press KEYCODE_POWER");
}
