//! watt - live MIDI sequencer input for the DigiTech Whammy.
//!
//! Runs a named program from the banks, a live keyboard session, or both
//! worlds' controls at once: pitch keys, tempo nudges, and transpose changes
//! all work while a program plays.
//!
//! ```text
//! watt -p arp          # run the 'arp' program until a key ends it
//! watt -l              # list available programs
//! watt -c 4 -p gliss   # play four cycles of 'gliss'
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use watt_core::intervals::P1;
use watt_core::{
    command_queue, nudge_channel, open_sink, stop_channel, Command, Config, DeviceClock,
    Dispatcher, Effect, InputRouter, KeySource, Program, ProgramRunner, ShutdownCoordinator,
    Stomp, SustainWatch,
};

/// Live MIDI sequencer input for the DigiTech Whammy
#[derive(Parser, Debug)]
#[command(name = "watt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live MIDI sequencer input for the DigiTech Whammy", long_about = None)]
struct Args {
    /// Program to run (live keyboard mode when omitted)
    #[arg(short, long)]
    program: Option<String>,

    /// Cycles to run the program for (-1 is infinite)
    #[arg(short, long, default_value = "-1")]
    count: i64,

    /// Mute after this many seconds of keyboard inactivity (-1 disables)
    #[arg(short, long, default_value = "-1")]
    sustain: i64,

    /// List available programs and exit
    #[arg(short, long)]
    list: bool,

    /// Verbose logging (echoes every wire write)
    #[arg(short, long)]
    verbose: bool,

    /// Config file path (defaults apply when omitted)
    #[arg(long)]
    config: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let registry = watt_banks::registry();

    if args.list {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config {path}"))?,
        None => Config::default(),
    };
    config.validate().map_err(|e| anyhow!("{e}"))?;

    // Resolve the program before touching the device, so a typo exits
    // non-zero without opening any port.
    let program = match &args.program {
        Some(name) => Some(registry.get(name)?),
        None => None,
    };

    run(config, program, args.count, args.sustain)
}

/// Wire up the threads, run the input router, then tear everything down.
fn run(config: Config, program: Option<Program>, count: i64, sustain_secs: i64) -> Result<()> {
    let clock = DeviceClock::new();
    let sink = open_sink(clock, &config.output).map_err(|e| anyhow!("{e}"))?;
    let device_present = sink.device_present();
    let buffer_window_ms = config.buffer_window_ms(device_present);
    log::info!(
        "output sink '{}' ({}), lookahead {} ms",
        sink.name(),
        if device_present { "device" } else { "file" },
        buffer_window_ms
    );

    let (cmd_tx, cmd_rx) = command_queue();
    let (nudge_tx, nudge_rx) = nudge_channel();
    let (stop_tx, stop_rx) = stop_channel();
    let background_cancel = Arc::new(AtomicBool::new(false));

    let dispatcher = Dispatcher::new(cmd_rx, sink, stop_rx);
    let watermark = dispatcher.watermark();
    let dispatcher_handle = thread::spawn(move || dispatcher.run());

    let background = match program {
        Some(program) => {
            let runner = ProgramRunner::new(
                program,
                count,
                clock,
                buffer_window_ms,
                config.timing.poll_sleep_ms,
                cmd_tx.clone(),
                nudge_rx,
                background_cancel.clone(),
            );
            Some(thread::spawn(move || runner.run()))
        }
        None => {
            // Initialize to the two-octave-up patch: it works well under
            // live keyboard input.
            cmd_tx
                .send(
                    Command::at(watermark.get() + config.timing.live_offset_ms)
                        .with_effect(Effect::UP_TWO_OCTAVES)
                        .with_stomp(Stomp::Enabled)
                        .with_toe(P1),
                )
                .map_err(|_| watt_core::Error::QueueClosed)?;

            if sustain_secs >= 0 {
                let watch = SustainWatch::new(
                    cmd_tx.clone(),
                    watermark.clone(),
                    clock,
                    background_cancel.clone(),
                    sustain_secs as u64 * 1000,
                );
                Some(thread::spawn(move || watch.run()))
            } else {
                None
            }
        }
    };

    // The router owns the terminal for the whole session; raw mode is
    // restored on every exit path, including panics, via the guard.
    {
        let _guard = RawModeGuard::enable()?;
        let router = InputRouter::new(
            TerminalKeys,
            cmd_tx.clone(),
            nudge_tx,
            watermark.clone(),
            config.timing.live_offset_ms,
        );
        router.run();
    }

    let coordinator = ShutdownCoordinator::new(
        background_cancel,
        stop_tx,
        background,
        dispatcher_handle,
        cmd_tx,
        watermark,
        clock,
        config.timing.poll_sleep_ms,
        config.timing.flush_grace_ms,
    );
    coordinator.shutdown();
    Ok(())
}

/// Restores the terminal's cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("enabling raw terminal mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::error!("failed to restore terminal: {e}");
        }
    }
}

/// Blocking single-key source over crossterm events.
struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn read_key(&mut self) -> watt_core::Result<char> {
        loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => match key.code {
                    // Ctrl+C must terminate like any other exit key
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok('\x03')
                    }
                    KeyCode::Char(c) => return Ok(c),
                    KeyCode::Enter => return Ok('\r'),
                    KeyCode::Esc => return Ok('\x1b'),
                    _ => {}
                },
                Ok(_) => {}
                Err(e) => return Err(watt_core::Error::Input(e.to_string())),
            }
        }
    }
}
