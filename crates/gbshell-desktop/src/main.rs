mod audio;
mod headless;
mod keybinds;

use audio::{DetachedDevice, sample_channel};
use clap::{Parser, Subcommand};
use gbshell_core::backend::{AudioChannel, AudioDevice};
use gbshell_core::controller::{DEFAULT_SAMPLE_RATE, GameSpeed, WindowScale};
use gbshell_core::palette::ColorScheme;
use gbshell_core::{ConfigStore, RuntimeController};
use headless::{PlaceholderCore, run_session};
use keybinds::{KEYBINDS_FILE_NAME, KeyBindings};
use log::{error, info, warn};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "gbshell", version, about = "Game Boy frontend shell")]
struct Args {
    /// Directory holding config.ini and keybinds.toml
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List or extend the recently opened programs
    Recent {
        #[command(subcommand)]
        action: Option<RecentAction>,
    },

    /// List, add or delete color schemes
    Schemes {
        #[command(subcommand)]
        action: Option<SchemeAction>,
    },

    /// Show or change the boot ROM directory
    BootRomDir {
        dir: Option<PathBuf>,

        /// Forget the boot ROM directory
        #[arg(long, conflicts_with = "dir")]
        clear: bool,
    },

    /// Show the joypad bindings
    Keybinds {
        /// Write the active bindings to keybinds.toml
        #[arg(long)]
        write: bool,
    },

    /// Run a window-less session
    Run {
        /// Path to the program to load
        program: PathBuf,

        /// Number of display refreshes to run; runs until killed if omitted
        #[arg(long)]
        frames: Option<u64>,

        /// Game speed (x1/4, x1/2, x1, x2, x3, x4)
        #[arg(long, default_value = "x1", value_parser = parse_speed)]
        speed: GameSpeed,

        /// Window scale (2x2 .. 6x6)
        #[arg(long, default_value = "4x4", value_parser = parse_scale)]
        scale: WindowScale,

        /// Output sample rate in Hz
        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        /// Joypad buttons held for the whole session (e.g. start, a)
        #[arg(long)]
        hold: Vec<String>,

        /// Disable a sound channel (1-4)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
        mute_channel: Vec<u8>,

        /// Master volume in percent
        #[arg(long, default_value_t = 100)]
        volume: u8,

        #[arg(long)]
        mono: bool,

        /// Start paused
        #[arg(long)]
        paused: bool,

        /// Play through the default host output device (needs the
        /// `cpal-audio` build feature)
        #[arg(long)]
        host_audio: bool,
    },
}

#[derive(Subcommand)]
enum RecentAction {
    /// Put a path at the top of the list
    Add { path: PathBuf },
}

#[derive(Subcommand)]
enum SchemeAction {
    /// Add or replace a scheme; colors are rrggbb, lightest first
    Add {
        name: String,
        #[arg(num_args = 4, required = true)]
        colors: Vec<String>,
    },
    /// Delete a scheme
    Delete { name: String },
}

fn parse_speed(s: &str) -> Result<GameSpeed, String> {
    GameSpeed::from_label(s).ok_or_else(|| {
        let labels: Vec<_> = GameSpeed::ALL.iter().map(|g| g.label()).collect();
        format!("expected one of {}", labels.join(", "))
    })
}

fn parse_scale(s: &str) -> Result<WindowScale, String> {
    WindowScale::from_label(s).ok_or_else(|| {
        let labels: Vec<_> = WindowScale::ALL.iter().map(|w| w.label()).collect();
        format!("expected one of {}", labels.join(", "))
    })
}

fn default_config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("gbshell");
        }
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("gbshell");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".config").join("gbshell");
    }

    PathBuf::from(".")
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config_dir = args.config_dir.unwrap_or_else(default_config_dir);
    std::fs::create_dir_all(&config_dir)?;
    let mut config = ConfigStore::load(&config_dir)?;
    let keybinds_path = config_dir.join(KEYBINDS_FILE_NAME);

    match args.command {
        Command::Recent { action: None } => {
            for (slot, path) in config.recent_paths().iter().enumerate() {
                println!("{slot}: {}", path.display());
            }
        }
        Command::Recent {
            action: Some(RecentAction::Add { path }),
        } => config.add_recent_path(path)?,
        Command::Schemes { action: None } => {
            for (name, scheme) in config.color_schemes() {
                match scheme {
                    Ok(scheme) => println!("{name} = {scheme}"),
                    Err(e) => warn!("skipping color scheme '{name}': {e}"),
                }
            }
        }
        Command::Schemes {
            action: Some(SchemeAction::Add { name, colors }),
        } => {
            let scheme = ColorScheme::decode(&colors.join(" "))?;
            config.add_color_scheme(name, scheme)?;
        }
        Command::Schemes {
            action: Some(SchemeAction::Delete { name }),
        } => config.delete_color_scheme(&name)?,
        Command::BootRomDir { clear: true, .. } => config.set_boot_rom_dir(None)?,
        Command::BootRomDir {
            dir: Some(dir),
            clear: false,
        } => config.set_boot_rom_dir(Some(dir))?,
        Command::BootRomDir {
            dir: None,
            clear: false,
        } => match config.boot_rom_dir() {
            Some(dir) => println!("{}", dir.display()),
            None => println!("(none)"),
        },
        Command::Keybinds { write } => {
            let bindings = KeyBindings::load_from_file(&keybinds_path);
            for (button, key) in bindings.iter() {
                println!("{button} = {key}");
            }
            if write {
                bindings.save_to_file(&keybinds_path)?;
            }
        }
        Command::Run {
            program,
            frames,
            speed,
            scale,
            sample_rate,
            hold,
            mute_channel,
            volume,
            mono,
            paused,
            host_audio,
        } => {
            let session = Session {
                program,
                frames,
                speed,
                scale,
                sample_rate,
                hold,
                mute_channel,
                volume,
                mono,
                paused,
            };
            let bindings = KeyBindings::load_from_file(&keybinds_path);
            // About a tenth of a second of output at the highest rate.
            let (tx, rx) = sample_channel(4800);
            let core = PlaceholderCore::new(tx);

            if host_audio {
                #[cfg(feature = "cpal-audio")]
                {
                    let device = audio::CpalDevice::open(rx, sample_rate)
                        .ok_or("no usable audio output device")?;
                    return session.run(core, device, config, &bindings);
                }
                #[cfg(not(feature = "cpal-audio"))]
                return Err("built without the cpal-audio feature".into());
            }

            session.run(core, DetachedDevice::open(rx), config, &bindings)?;
        }
    }

    Ok(())
}

struct Session {
    program: PathBuf,
    frames: Option<u64>,
    speed: GameSpeed,
    scale: WindowScale,
    sample_rate: u32,
    hold: Vec<String>,
    mute_channel: Vec<u8>,
    volume: u8,
    mono: bool,
    paused: bool,
}

impl Session {
    fn run<D: AudioDevice>(
        self,
        core: PlaceholderCore,
        device: D,
        config: ConfigStore,
        bindings: &KeyBindings,
    ) -> Result<(), Box<dyn Error>> {
        let mut controller = RuntimeController::new(core, device, config, bindings.mapping());

        controller.set_sample_rate(self.sample_rate)?;
        controller.set_volume(self.volume)?;
        controller.set_mono(self.mono);
        for number in &self.mute_channel {
            if let Some(channel) = AudioChannel::from_number(*number) {
                controller.set_channel_enabled(channel, false);
            }
        }
        controller.set_game_speed(self.speed);
        let size = controller.set_window_scale(self.scale);
        info!("Display {}x{}", size.width, size.height);

        controller.load_program(&self.program)?;
        if self.paused {
            controller.set_paused(true);
        }

        for button in &self.hold {
            match bindings.key_for_button(button) {
                Some(key) => controller.record_key(key.to_string(), true),
                None => warn!("unknown joypad button '{button}'"),
            }
        }

        let shown = run_session(&mut controller, self.frames);
        info!(
            "Ran {shown} frames of {} (joypad {:?})",
            display_name(&self.program),
            controller.core().input()
        );
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
