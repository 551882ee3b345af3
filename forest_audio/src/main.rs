//! forest_audio — offline ambience preview.
//!
//! Renders a few seconds of a chosen season to a WAV file, with the same
//! Poisson scheduling the interactive app uses. Handy for tuning the season
//! tables without waving at a camera.

use std::io::{self, Write};

use forest_audio::synth::BLOCK_FRAMES;
use forest_audio::{bird_rate, wind_level, PoissonClock, SynthCore, SPRING_GROWTH_RATE};
use forest_nav::Season;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const SAMPLE_RATE: f32 = 44_100.0;

struct PreviewConfig {
    season:  Season,
    wind:    f32,
    seconds: f32,
    seed:    u64,
    path:    String,
}

impl Default for PreviewConfig {
    fn default() -> PreviewConfig {
        PreviewConfig {
            season:  Season::Summer,
            wind:    0.2,
            seconds: 8.0,
            seed:    42,
            path:    "forest_summer.wav".to_string(),
        }
    }
}

fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Forest Audio — Seasonal Ambience WAV Preview          ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let cfg = if std::env::args().any(|a| a == "--quick") {
        println!("  Quick-start: summer, light wind, 8 s, seed 42\n");
        PreviewConfig::default()
    } else {
        configure_interactively()
    };

    println!();
    println!("  Rendering {:.1} s of {}…", cfg.seconds, cfg.season.name());

    if let Err(e) = run(&cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    println!("  Wrote {}", cfg.path);
}

fn configure_interactively() -> PreviewConfig {
    println!("  Season: 1=spring  2=summer  3=autumn  4=winter");
    let season = match read_line("  Choice (default 2): ").trim() {
        "1" => Season::Spring,
        "3" => Season::Autumn,
        "4" => Season::Winter,
        _   => Season::Summer,
    };

    let wind: f32 = read_line("  Wind intensity 0.0–1.0 (default 0.2): ")
        .trim().parse().unwrap_or(0.2);
    let seconds: f32 = {
        let s: f32 = read_line("  Duration seconds (default 8): ")
            .trim().parse().unwrap_or(8.0);
        s.clamp(1.0, 600.0)
    };
    let seed: u64 = read_line("  Seed (default 42): ")
        .trim().parse().unwrap_or(42);

    let default_path = format!("forest_{}.wav", season.name());
    let path = {
        let p = read_line(&format!("  Output file (default {}): ", default_path));
        let p = p.trim();
        if p.is_empty() { default_path } else { p.to_string() }
    };

    PreviewConfig { season, wind: wind.clamp(0.0, 1.0), seconds, seed, path }
}

fn run(cfg: &PreviewConfig) -> Result<(), String> {
    let spec = hound::WavSpec {
        channels:        2,
        sample_rate:     SAMPLE_RATE as u32,
        bits_per_sample: 16,
        sample_format:   hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&cfg.path, spec).map_err(|e| e.to_string())?;

    let mut core = SynthCore::new(SAMPLE_RATE, cfg.seed);
    core.set_season(cfg.season);
    core.set_wind(if cfg.wind <= 0.05 { 0 } else { wind_level(cfg.wind) });

    // The same event model the live app drives: birds and leaves on Poisson
    // clocks, growth pulses only in spring.
    let mut birds = PoissonClock::new(bird_rate(cfg.season), cfg.seed ^ 0xb12d);
    let leaf_rate = if cfg.season == Season::Autumn { 1.2 } else { 0.3 };
    let mut leaves = PoissonClock::new(leaf_rate, cfg.seed ^ 0x1eaf);
    let growth_rate = if cfg.season == Season::Spring { SPRING_GROWTH_RATE } else { 0.0 };
    let mut growth = PoissonClock::new(growth_rate, cfg.seed ^ 0x960);

    let mut places = SmallRng::seed_from_u64(cfg.seed ^ 0x905);
    let dt = BLOCK_FRAMES as f32 / SAMPLE_RATE;
    let blocks = (cfg.seconds * SAMPLE_RATE / BLOCK_FRAMES as f32).ceil() as usize;
    let mut block = vec![0.0f32; BLOCK_FRAMES * 2];

    for _ in 0..blocks {
        for _ in 0..birds.tick(dt) {
            let position = [
                places.gen_range(-8.0..8.0),
                places.gen_range(1.0..5.0),
                places.gen_range(-10.0..-2.0),
            ];
            core.trigger_bird(Some(position));
        }
        for _ in 0..leaves.tick(dt) {
            core.trigger_leaf();
        }
        for _ in 0..growth.tick(dt) {
            core.trigger_growth();
        }

        core.render(&mut block);
        for &s in &block {
            let q = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(q).map_err(|e| e.to_string())?;
        }
    }

    writer.finalize().map_err(|e| e.to_string())
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
