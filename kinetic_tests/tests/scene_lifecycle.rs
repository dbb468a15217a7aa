use std::{cell::RefCell, rc::Rc, time::Duration};

use async_trait::async_trait;
use kinetic_game::{
    loader::{LevelSource, MemoryLevelSource},
    scene::{Scene, SceneState},
    ArcadeScene, Director,
};
use kinetic_shared::{
    config::SimConfig,
    event::{EventBus, EventName, GameEvent},
    hud::{NullHud, SharedHud},
    input::NullInput,
    level::LevelConfig,
};
use kinetic_tests::{init_tracing, level_json, CountingRenderer};

/// Hands back whatever the JSON deserializes to, without validating it.
struct LaxSource(&'static str);

#[async_trait(?Send)]
impl LevelSource for LaxSource {
    async fn fetch(&self, _id: u32) -> anyhow::Result<LevelConfig> {
        Ok(serde_json::from_str(self.0)?)
    }
}

/// A memory source that takes a while to answer.
struct SlowSource(MemoryLevelSource, Duration);

#[async_trait(?Send)]
impl LevelSource for SlowSource {
    async fn fetch(&self, id: u32) -> anyhow::Result<LevelConfig> {
        tokio::time::sleep(self.1).await;
        self.0.fetch(id).await
    }
}

fn director(source: impl LevelSource + 'static, hud: SharedHud) -> (Director, EventBus) {
    let cfg = SimConfig::default();
    let events = EventBus::new();
    let scene = ArcadeScene::new(&cfg, events.clone(), Box::new(NullInput), Box::new(hud));
    let director = Director::new(&cfg, events.clone(), Box::new(source), Box::new(scene));
    (director, events)
}

#[test]
fn cleanup_releases_everything_and_scene_can_be_reused() -> anyhow::Result<()> {
    let cfg = SimConfig::default();
    let events = EventBus::new();
    let mut scene = ArcadeScene::new(&cfg, events.clone(), Box::new(NullInput), Box::new(NullHud));

    scene.initialize(LevelConfig::from_json_str(&level_json(1, None, 50))?)?;
    scene.start();
    for _ in 0..30 {
        scene.update(1.0 / 60.0);
    }
    assert_eq!(scene.entity_count(), 2);

    scene.cleanup();
    assert_eq!(scene.entity_count(), 0);
    assert_eq!(scene.body_count(), 0);
    assert_eq!(scene.level_id(), None);
    assert_eq!(events.listener_count(), 0);

    scene.initialize(LevelConfig::from_json_str(&level_json(2, None, 50))?)?;
    assert_eq!(scene.state(), SceneState::Initialized);
    assert_eq!(scene.level_id(), Some(2));
    assert_eq!(scene.entity_count(), 2);
    assert_eq!(scene.body_count(), 2);
    assert_eq!(scene.snapshot().score, 0);
    Ok(())
}

#[tokio::test]
async fn failed_load_keeps_previous_scene() -> anyhow::Result<()> {
    init_tracing();
    let source = MemoryLevelSource::new()
        .with_level(1, level_json(1, None, 50))
        .with_level(2, r#"{"id": 2, "entities": []}"#);
    let (mut director, events) = director(source, SharedHud::new());

    let failures = Rc::new(RefCell::new(Vec::new()));
    let sink = failures.clone();
    let _sub = events.subscribe(EventName::SceneLoadFailed, move |e| {
        sink.borrow_mut().push(e.clone())
    });

    director.transition_to(1).await?;
    let mut renderer = CountingRenderer::default();
    director.start(0.0);
    director.frame(0.04, &mut renderer);
    let entities = director.scene().entity_count();

    assert!(director.transition_to(2).await.is_err());
    assert!(director.transition_to(7).await.is_err());

    assert_eq!(director.scene().level_id(), Some(1));
    assert_eq!(director.scene().state(), SceneState::Running);
    assert_eq!(director.scene().entity_count(), entities);
    assert_eq!(director.levels_loaded(), 1);

    let failures = failures.borrow();
    assert_eq!(failures.len(), 2);
    assert!(matches!(failures[0], GameEvent::SceneLoadFailed { level: 2, .. }));
    assert!(matches!(failures[1], GameEvent::SceneLoadFailed { level: 7, .. }));

    // Still simulating.
    let report = director.frame(0.09, &mut renderer);
    assert_eq!(report.steps, 3);
    assert_eq!(renderer.draws, 4);
    Ok(())
}

#[tokio::test]
async fn completed_level_advances_to_next() -> anyhow::Result<()> {
    init_tracing();
    let source = MemoryLevelSource::new()
        .with_level(1, level_json(1, Some(2), 0))
        .with_level(2, level_json(2, None, 1000));
    let hud = SharedHud::new();
    let (mut director, events) = director(source, hud.clone());

    director.transition_to(1).await?;
    director.start(0.0);
    let mut renderer = CountingRenderer::default();

    let mut now = 0.0;
    let mut advanced = false;
    for _ in 0..60 {
        now += 0.05;
        director.frame(now, &mut renderer);
        if director.advance().await? {
            advanced = true;
            break;
        }
    }

    assert!(advanced);
    assert_eq!(director.scene().level_id(), Some(2));
    assert_eq!(director.levels_loaded(), 2);
    assert_eq!(director.pending_transition(), None);
    assert!(events.published() >= 2);

    director.frame(now + 0.05, &mut renderer);
    assert_eq!(hud.latest().map(|s| s.level), Some(2));
    Ok(())
}

#[tokio::test]
async fn unvalidated_level_is_rejected_before_cleanup() -> anyhow::Result<()> {
    init_tracing();
    let (mut director, events) = director(LaxSource(r#"{"id": 2, "entities": []}"#), SharedHud::new());
    let failures = Rc::new(RefCell::new(0));
    let sink = failures.clone();
    let _sub = events.subscribe(EventName::SceneLoadFailed, move |_| *sink.borrow_mut() += 1);

    director.activate(1, LevelConfig::from_json_str(&level_json(1, Some(2), 50)))?;
    director.start(0.0);
    let mut renderer = CountingRenderer::default();
    director.frame(0.04, &mut renderer);
    let entities = director.scene().entity_count();

    assert!(director.transition_to(2).await.is_err());
    // Handed straight to activate, skipping the validating load.
    let lax: LevelConfig = serde_json::from_str(r#"{"id": 2, "entities": []}"#)?;
    assert!(director.activate(2, Ok(lax)).is_err());

    assert_eq!(director.scene().state(), SceneState::Running);
    assert_eq!(director.scene().level_id(), Some(1));
    assert_eq!(director.scene().entity_count(), entities);
    assert_eq!(director.levels_loaded(), 1);
    assert_eq!(*failures.borrow(), 2);
    Ok(())
}

#[tokio::test]
async fn frames_keep_running_while_a_level_loads() -> anyhow::Result<()> {
    init_tracing();
    let levels = MemoryLevelSource::new()
        .with_level(1, level_json(1, Some(2), 1000))
        .with_level(2, level_json(2, None, 1000));
    let (mut director, _events) = director(SlowSource(levels, Duration::from_millis(40)), SharedHud::new());

    director.transition_to(1).await?;
    director.start(0.0);
    let mut renderer = CountingRenderer::default();

    let mut load = director.load(2);
    let mut now = 0.0;
    let mut frames = 0;
    let loaded = loop {
        tokio::select! {
            loaded = &mut load => break loaded,
            _ = tokio::time::sleep(Duration::from_millis(2)) => {
                now += 0.02;
                director.frame(now, &mut renderer);
                frames += 1;
                assert_eq!(director.scene().level_id(), Some(1));
            }
        }
    };

    assert!(frames >= 2, "only {frames} frames ran during the load");
    assert!(director.clock().total_steps() >= 2);
    assert_eq!(director.scene().state(), SceneState::Running);

    director.activate(2, loaded)?;
    assert_eq!(director.scene().level_id(), Some(2));
    assert_eq!(director.levels_loaded(), 2);
    Ok(())
}
