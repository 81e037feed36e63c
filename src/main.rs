//! LoRa Board Tool
//!
//! Command line front end for the board adapter: inspect and export board
//! profiles, probe the GPIO lines and SPI device of a board, and watch the
//! radio's DIO lines.
//!
//! # Usage
//!
//! ```bash
//! # List built-in board profiles
//! lora-board boards list
//!
//! # Show the pin map of a board
//! lora-board boards show rpi
//!
//! # Validate a custom pin-map file
//! lora-board boards check --config my-board.toml
//!
//! # Export a built-in profile as a starting point for a new revision
//! lora-board generate config --board sbc -o sbc.toml
//!
//! # Acquire and release every line (blinks the LED twice)
//! lora-board setup --board rpi
//!
//! # Print DIO and switch edges for 30 seconds
//! lora-board watch --board rpi --seconds 30
//!
//! # Read the SX127x version register
//! lora-board spi transfer --bus 0 --cs 0 0x42 0x00
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lora_board::board::DEFAULT_CONSUMER;
use lora_board::boards::{get_profile, profile_names, SPI_MAX_SPEED_HZ};
use lora_board::{BoardAdapter, BoardProfile, EdgeEvent};

/// LoRa Board Tool
///
/// Board adaptation for SX127x LoRa modules on Linux SBCs
#[derive(Parser)]
#[command(name = "lora-board")]
#[command(author = "Prasanna Gautam")]
#[command(version = "0.1.0")]
#[command(about = "Board adaptation for SX127x LoRa modules on Linux single-board computers")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Board profile operations
    #[command(subcommand)]
    Boards(BoardCommands),

    /// Generate pin-map files
    #[command(subcommand)]
    Generate(GenerateCommands),

    /// Acquire every line, blink the LED twice, release everything
    Setup {
        #[command(flatten)]
        board: BoardSelector,
    },

    /// Switch the LED on or off for a while
    Led {
        /// Desired LED state
        state: LedState,

        /// Seconds to hold the state before releasing the line
        #[arg(long, default_value_t = 1.0)]
        hold: f64,

        #[command(flatten)]
        board: BoardSelector,
    },

    /// Blink the LED
    Blink {
        /// Half-period in seconds
        #[arg(short, long, default_value_t = 0.5)]
        period: f64,

        /// Number of blinks
        #[arg(short = 'n', long, default_value_t = 3)]
        count: u32,

        #[command(flatten)]
        board: BoardSelector,
    },

    /// Print rising edges on the DIO lines and the switch
    Watch {
        /// How long to watch
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,

        #[command(flatten)]
        board: BoardSelector,
    },

    /// SPI operations
    #[command(subcommand)]
    Spi(SpiCommands),
}

#[derive(Subcommand)]
enum BoardCommands {
    /// List all built-in board profiles
    List,

    /// Show the pin map of a board profile
    Show {
        /// Board profile name (e.g., rpi, sbc)
        board: String,
    },

    /// Validate a board profile or pin-map file
    Check {
        #[command(flatten)]
        board: BoardSelector,
    },
}

#[derive(Subcommand)]
enum GenerateCommands {
    /// Write a board profile as a TOML pin-map file
    Config {
        /// Board profile
        #[arg(short, long, default_value = "rpi")]
        board: String,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SpiCommands {
    /// Run one full-duplex transfer and print the received bytes
    Transfer {
        /// SPI bus
        #[arg(long)]
        bus: Option<u8>,

        /// Chip select
        #[arg(long)]
        cs: Option<u8>,

        /// Bytes to send, hex (e.g., 0x42 00)
        #[arg(required = true)]
        bytes: Vec<String>,

        #[command(flatten)]
        board: BoardSelector,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LedState {
    On,
    Off,
}

/// Built-in profile name or pin-map file
#[derive(Args)]
struct BoardSelector {
    /// Built-in board profile
    #[arg(short, long, default_value = "rpi")]
    board: String,

    /// Pin-map file (overrides --board)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Consumer label attached to the requested lines
    #[arg(long, default_value = DEFAULT_CONSUMER)]
    consumer: String,
}

impl BoardSelector {
    fn load(&self) -> Result<BoardProfile> {
        if let Some(path) = &self.config {
            return BoardProfile::from_path(path)
                .with_context(|| format!("Failed to load pin map {}", path.display()));
        }

        get_profile(&self.board).cloned().ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown board profile: {}. Use 'lora-board boards list' to see available profiles.",
                self.board
            )
        })
    }

    fn open(&self) -> Result<BoardAdapter> {
        let profile = self.load()?;
        println!(
            "{} Using board profile: {}",
            "[*]".cyan().bold(),
            profile.name.white()
        );
        Ok(BoardAdapter::new(profile)?.with_consumer(&self.consumer))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Commands::Boards(cmd) => handle_boards(cmd),
        Commands::Generate(cmd) => handle_generate(cmd),
        Commands::Setup { board } => handle_setup(&board),
        Commands::Led { state, hold, board } => handle_led(state, hold, &board),
        Commands::Blink {
            period,
            count,
            board,
        } => handle_blink(period, count, &board),
        Commands::Watch { seconds, board } => handle_watch(seconds, &board),
        Commands::Spi(cmd) => handle_spi(cmd),
    }
}

fn seconds(value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("Invalid duration: {}", value))
}

fn handle_boards(cmd: BoardCommands) -> Result<()> {
    match cmd {
        BoardCommands::List => {
            println!("{}", "=".repeat(60));
            println!("{}", "Supported Board Profiles".cyan().bold());
            println!("{}", "=".repeat(60));

            for name in profile_names() {
                if let Some(profile) = get_profile(name) {
                    println!("\n  {}: {}", name.white().bold(), profile.name);
                    println!("    Radio: {}", profile.radio);
                    println!("    Band: {}", profile.band());
                    println!(
                        "    SPI: bus {} chip select {}",
                        profile.spi.bus, profile.spi.chip_select
                    );
                }
            }

            println!("\n{}", "=".repeat(60));
            println!(
                "Use {} to see the pin map",
                "lora-board boards show <board>".cyan()
            );
        }

        BoardCommands::Show { board } => {
            let profile = get_profile(&board).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown board profile: {}. Use 'lora-board boards list' to see available profiles.",
                    board
                )
            })?;

            print_board_profile(profile);
        }

        BoardCommands::Check { board } => {
            // Loading validates the pin map
            let profile = board.load()?;
            println!(
                "{} Pin map for {} is valid",
                "[OK]".green().bold(),
                profile.name.white()
            );
        }
    }

    Ok(())
}

fn print_board_profile(profile: &BoardProfile) {
    println!("{}", "=".repeat(70));
    println!("{}", format!("Board Profile: {}", profile.name).cyan().bold());
    println!("{}", "=".repeat(70));

    println!("\n{}", "Basic Information:".white().bold());
    println!("  ID: {}", profile.id);
    println!("  Description: {}", profile.description);
    println!("  Radio: {}", profile.radio);
    println!("  Band: {}", profile.band());

    println!("\n{}", "SPI:".white().bold());
    println!("  Bus: {}", profile.spi.bus);
    println!("  Chip select: {}", profile.spi.chip_select);
    println!("  Max clock: {} Hz", SPI_MAX_SPEED_HZ);

    println!("\n{}", "Pin Map:".white().bold());
    for (role, binding) in profile.pins.roles() {
        println!("  {:<8} {}", role.cyan(), binding);
    }

    println!("\n{}", "=".repeat(70));
}

fn handle_generate(cmd: GenerateCommands) -> Result<()> {
    match cmd {
        GenerateCommands::Config { board, output } => {
            let profile = get_profile(&board)
                .ok_or_else(|| anyhow::anyhow!("Unknown board profile: {}", board))?;

            if let Some(path) = output {
                profile.write_to(&path)?;
                println!(
                    "{} Pin map written to {}",
                    "[OK]".green().bold(),
                    path.display()
                );
            } else {
                println!("{}", profile.to_toml()?);
            }
        }
    }

    Ok(())
}

fn handle_setup(selector: &BoardSelector) -> Result<()> {
    let mut board = selector.open()?;

    board.setup().context("Board setup failed")?;
    println!("{} All lines acquired", "[OK]".green().bold());

    board.teardown()?;
    println!("{} All lines released", "[OK]".green().bold());
    Ok(())
}

fn handle_led(state: LedState, hold: f64, selector: &BoardSelector) -> Result<()> {
    let hold = seconds(hold)?;
    let mut board = selector.open()?;
    board.setup().context("Board setup failed")?;

    match state {
        LedState::On => board.led_on()?,
        LedState::Off => board.led_off()?,
    }
    std::thread::sleep(hold);

    board.teardown()?;
    Ok(())
}

fn handle_blink(period: f64, count: u32, selector: &BoardSelector) -> Result<()> {
    let period = seconds(period)?;
    let mut board = selector.open()?;
    board.setup().context("Board setup failed")?;

    println!(
        "{} Blinking {} times ({:?} half-period)",
        "[*]".cyan().bold(),
        count,
        period
    );
    board.blink(period, count)?;

    board.teardown()?;
    Ok(())
}

fn handle_watch(secs: u64, selector: &BoardSelector) -> Result<()> {
    let mut board = selector.open()?;
    board.setup().context("Board setup failed")?;

    let count = Arc::new(Mutex::new(0usize));
    let printer = |count: Arc<Mutex<usize>>| {
        move |event: EdgeEvent| {
            if let Ok(mut n) = count.lock() {
                *n += 1;
            }
            println!(
                "{} {} rising edge at {} ns",
                "[IRQ]".yellow().bold(),
                event.signal.to_string().white().bold(),
                event.timestamp_ns
            );
        }
    };

    for dio in 0..lora_board::boards::DIO_COUNT as u8 {
        board.register_interrupt_callback(dio, printer(Arc::clone(&count)))?;
    }
    board.register_switch_callback(printer(Arc::clone(&count)))?;

    println!(
        "{} Watching DIO0-DIO3 and switch for {} s",
        "[*]".cyan().bold(),
        secs
    );
    std::thread::sleep(Duration::from_secs(secs));

    board.teardown()?;
    let total = count.lock().map(|n| *n).unwrap_or(0);
    println!("{} {} edges seen", "[OK]".green().bold(), total);
    Ok(())
}

fn parse_hex_byte(s: &str) -> Result<u8> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(digits, 16).with_context(|| format!("Invalid hex byte: {}", s))
}

fn handle_spi(cmd: SpiCommands) -> Result<()> {
    match cmd {
        SpiCommands::Transfer {
            bus,
            cs,
            bytes,
            board,
        } => {
            let tx = bytes
                .iter()
                .map(|b| parse_hex_byte(b))
                .collect::<Result<Vec<u8>>>()?;

            let mut board = board.open()?;
            let bus = bus.unwrap_or(board.profile().spi.bus);
            let cs = cs.unwrap_or(board.profile().spi.chip_select);

            let mut rx = vec![0u8; tx.len()];
            board.open_spi(bus, cs)?.transfer(&tx, &mut rx)?;

            let hex = |buf: &[u8]| {
                buf.iter()
                    .map(|b| format!("{:02x}", b))
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            println!("{} {}", "[TX]".cyan().bold(), hex(&tx));
            println!("{} {}", "[RX]".green().bold(), hex(&rx));

            board.teardown()?;
        }
    }

    Ok(())
}
