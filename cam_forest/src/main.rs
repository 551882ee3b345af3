//! cam_forest — interactive entry point.

use cam_forest::app::{run, AppConfig};
use forest_nav::Season;
use std::io::{self, Write};

fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║         Cam Forest — Gesture-Steered Seasonal Forest         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hand tracking");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Keyboard simulation  (use --features leap for hardware)");
    println!();

    let cfg = if std::env::args().any(|a| a == "--quick") {
        println!("  Quick-start: summer, audio off until M\n");
        AppConfig::default()
    } else {
        configure_interactively()
    };

    println!();
    println!("  Opening visualizer window…");
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn configure_interactively() -> AppConfig {
    println!("  Season: 1=spring  2=summer  3=autumn  4=winter");
    let season = match read_line("  Choice (default 2): ").trim() {
        "1" => Season::Spring,
        "3" => Season::Autumn,
        "4" => Season::Winter,
        _   => Season::Summer,
    };

    let seed: u64 = read_line("  Ambience seed (default 42): ")
        .trim().parse().unwrap_or(42);

    let audio_on_start = matches!(
        read_line("  Start audio immediately? y/N (default: wait for M): ").trim(),
        "y" | "Y"
    );

    let latency_ms: u32 = {
        let l: u32 = read_line("  Audio latency ms (default 90): ")
            .trim().parse().unwrap_or(90);
        l.max(20).min(500)
    };

    AppConfig { season, seed, audio_on_start, latency_ms }
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
