//! Dry run of the GPIO remote against the in-memory playback core.
//!
//! Loads the shipped sample configuration (or the file named by
//! `PMOGPIO_CONFIG`), then presses a few buttons on a simulated pin bank.
//!
//! ```sh
//! RUST_LOG=pmogpio=debug cargo run -p pmogpio --example simulated_remote
//! ```

use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pmogpio::{
    ActiveLevel, GpioConfig, GpioFrontend, MemoryCore, PlaybackStatus, RecordingAnnouncer,
    SAMPLE_CONFIG, SimulatedPinBank, SimulatedPins, VolumeControl,
};
use tracing_subscriber::EnvFilter;

fn tap(pins: &SimulatedPins, pin: u8, active: ActiveLevel) {
    pins.press(pin, active);
    thread::sleep(Duration::from_millis(40));
    pins.let_go(pin, active);
    thread::sleep(Duration::from_millis(400));
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pmogpio=info")),
        )
        .init();

    let config = if env::var_os("PMOGPIO_CONFIG").is_some() {
        GpioConfig::load(None)?
    } else {
        GpioConfig::from_yaml_str(SAMPLE_CONFIG)?
    };

    let mut core = MemoryCore::new();
    for (index, name) in config.playlists.iter().enumerate() {
        let uri = format!("m3u:{}", name.to_lowercase());
        let tracks: Vec<String> = (1..=3)
            .map(|track| format!("file:{}-{}.flac", index, track))
            .collect();
        let tracks: Vec<&str> = tracks.iter().map(String::as_str).collect();
        core = core.with_playlist(name, &uri, &tracks);
    }
    let core = Arc::new(core);
    let announcer = Arc::new(RecordingAnnouncer::new());

    let bank = SimulatedPinBank::all_bcm();
    let pins = bank.handle();
    let frontend = GpioFrontend::start(&config, bank, core.clone(), announcer.clone())?;
    println!("Armed pins: {:?}", frontend.armed_pins());
    thread::sleep(Duration::from_millis(100));

    for settings in config.pin_settings()? {
        println!("Pressing bcm{} ({})", settings.pin, settings.event);
        tap(&pins, settings.pin, settings.active);
    }

    frontend.shutdown();

    println!("\nPlayback state: {}", core.playback_state()?);
    println!("Volume: {}", core.volume()?);
    println!("Tracklist: {:?}", core.tracklist());
    println!("Announcements: {:?}", announcer.phrases());
    println!("Commands:");
    for command in core.journal() {
        println!("  {:?}", command);
    }
    Ok(())
}
