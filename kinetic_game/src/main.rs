//! Headless runner.
//!
//! Usage:
//!   cargo run -p kinetic_game -- [--config sim.json] [--levels-dir levels] [--level 1] [--frames 600]
//!
//! Loads a level from `<levels-dir>/level_<id>.json`, drives the frame loop
//! from a tokio interval with no renderer attached, follows `next_level` on
//! completion and prints a summary when the frame budget runs out.

use std::env;

use anyhow::Context;
use kinetic_game::{app::LevelLoad, loader::FsLevelSource, ArcadeScene, Director};
use kinetic_shared::{
    config::SimConfig,
    event::EventBus,
    hud::SharedHud,
    input::NullInput,
    render::NullRenderer,
};
use tokio::time::{self, Duration, Instant};
use tracing::info;

struct Args {
    config: Option<String>,
    levels_dir: Option<String>,
    level: Option<u32>,
    frames: u64,
}

fn parse_args() -> Args {
    let mut out = Args {
        config: None,
        levels_dir: None,
        level: None,
        frames: 600,
    };
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                out.config = Some(args[i + 1].clone());
                i += 2;
            }
            "--levels-dir" if i + 1 < args.len() => {
                out.levels_dir = Some(args[i + 1].clone());
                i += 2;
            }
            "--level" if i + 1 < args.len() => {
                out.level = args[i + 1].parse().ok();
                i += 2;
            }
            "--frames" if i + 1 < args.len() => {
                out.frames = args[i + 1].parse().unwrap_or(600);
                i += 2;
            }
            _ => i += 1,
        }
    }
    out
}

async fn load_config(args: &Args) -> anyhow::Result<SimConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("read config {path}"))?;
            SimConfig::from_json_str(&text).with_context(|| format!("parse config {path}"))?
        }
        None => SimConfig::default(),
    };
    if let Some(dir) = &args.levels_dir {
        cfg.levels_dir = dir.clone();
    }
    if let Some(level) = args.level {
        cfg.start_level = level;
    }
    Ok(cfg)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args();
    let cfg = load_config(&args).await?;
    info!(
        levels_dir = %cfg.levels_dir,
        level = cfg.start_level,
        step = cfg.fixed_time_step,
        frames = args.frames,
        "Starting simulation"
    );

    let events = EventBus::new();
    let _event_log = events.subscribe_all(|event| info!(event = %event.name(), ?event, "Game event"));

    let hud = SharedHud::new();
    let scene = ArcadeScene::new(
        &cfg,
        events.clone(),
        Box::new(NullInput),
        Box::new(hud.clone()),
    );
    let mut director = Director::new(
        &cfg,
        events.clone(),
        Box::new(FsLevelSource::new(&cfg.levels_dir)),
        Box::new(scene),
    );
    director
        .transition_to(cfg.start_level)
        .await
        .with_context(|| format!("load starting level {}", cfg.start_level))?;

    let mut renderer = NullRenderer;
    let origin = Instant::now();
    let mut ticker = time::interval(Duration::from_secs_f64(director.clock().step()));
    director.start(0.0);

    // Follow-up levels load while the current scene keeps ticking.
    let mut pending: Option<(u32, LevelLoad)> = None;
    let mut frame = 0;
    while frame < args.frames {
        if pending.is_none() {
            pending = director.take_pending_transition().map(|id| (id, director.load(id)));
        }

        let loaded = match pending.as_mut() {
            Some((_, load)) => tokio::select! {
                loaded = load => Some(loaded),
                _ = ticker.tick() => None,
            },
            None => {
                ticker.tick().await;
                None
            }
        };
        if let Some(loaded) = loaded {
            if let Some((id, _)) = pending.take() {
                // Failures publish scene_load_failed and leave the scene running.
                if director.activate(id, loaded).is_err() {
                    info!(level = id, "Continuing on the current level");
                }
            }
            continue;
        }

        let now = origin.elapsed().as_secs_f64();
        director.frame(now, &mut renderer);
        frame += 1;

        if frame % 60 == 0 {
            if let Some(s) = hud.latest() {
                info!(health = s.health, score = s.score, level = s.level, time = s.time, "HUD");
            }
        }
    }

    let clock = director.clock();
    let snapshot = hud.latest().unwrap_or_default();
    let hud_json = serde_json::to_string(&snapshot).context("serialize hud snapshot")?;
    println!(
        "frames={} steps={} dropped={} levels={} events={} hud={}",
        args.frames,
        clock.total_steps(),
        clock.total_dropped(),
        director.levels_loaded(),
        events.published(),
        hud_json,
    );
    director.stop();
    Ok(())
}
