//! Scene tick ordering, root destruction and rendering

use super::{Journal, Probe, Scripted};
use crate::ecs::components::{Lifetime, LightSource, MeshRenderer};
use crate::ecs::{Actor, ActorCtx, Component};
use crate::foundation::math::{Transform, Vec3};
use crate::foundation::resource::{Ref, ResourceError};
use crate::scene::render_queue::{LightShape, RenderQueue, RenderSink};
use crate::scene::{Scene, SceneBehavior};
use approx::assert_relative_eq;
use std::cell::Cell;
use std::rc::Rc;

const DT: f32 = 1.0 / 60.0;

struct Hooked(Journal);

impl SceneBehavior for Hooked {
    fn update(&mut self, _scene: &mut Scene, _delta_time: f32) {
        self.0.push("scene:update");
    }

    fn render(&mut self, _sink: &mut dyn RenderSink) {
        self.0.push("scene:render");
    }
}

fn watch_deaths(scene: &mut Scene, journal: &Journal) {
    let journal = journal.clone();
    scene
        .on_actor_destroyed()
        .subscribe(move |event| journal.push(format!("destroyed:{}", event.name)));
}

#[test]
fn test_tick_runs_hook_then_begin_then_update_then_destruction() {
    let journal = Journal::default();
    let mut scene = Scene::with_behavior("Ordered", Hooked(journal.clone()));
    watch_deaths(&mut scene, &journal);
    let root = scene.add_actor(Actor::with_behavior("Root", Scripted::new(&journal)));
    root.with_mut(|r| r.add_component(Probe::<'A'>::new(&journal)))
        .expect("root is free");

    scene.update(DT);
    assert_eq!(
        journal.entries(),
        vec!["scene:update", "Root:begin", "Root:update", "A:begin"]
    );

    journal.clear();
    assert!(scene.destroy(&root));
    scene.update(DT);
    assert_eq!(
        journal.entries(),
        vec!["scene:update", "Root:update", "A:update", "A:drop", "destroyed:Root"]
    );
    assert!(!root.is_valid());
    assert!(scene.actors().is_empty());
    assert_eq!(scene.ticks(), 2);

    journal.clear();
    scene.render(&mut RenderQueue::new());
    assert_eq!(journal.entries(), vec!["scene:render"]);
}

struct Executioner {
    victim: Option<Ref<Actor>>,
}

impl Component for Executioner {
    fn update(&mut self, actor: &mut ActorCtx<'_>) {
        if let Some(victim) = self.victim.take() {
            assert!(actor.destroy_actor(&victim));
            assert!(actor.destroy_actor(&victim));
        }
    }
}

#[test]
fn test_repeated_destroy_requests_collapse_into_one() {
    let journal = Journal::default();
    let mut scene = Scene::new("Collapse");
    watch_deaths(&mut scene, &journal);

    let victim = scene.spawn_actor("Victim");
    victim
        .with_mut(|v| v.add_component(Probe::<'V'>::new(&journal)))
        .expect("victim is free");
    let killer = scene.spawn_actor("Killer");
    killer
        .with_mut(|k| {
            k.add_component(Executioner {
                victim: Some(victim.clone()),
            })
        })
        .expect("killer is free");
    scene.update(DT);

    // once from outside, once more from the executioner during the tick
    assert!(scene.destroy(&victim));
    assert!(scene.destroy(&victim));
    scene.update(DT);
    assert!(!victim.is_valid());

    scene.update(DT);
    assert!(killer.is_valid());
    assert_eq!(journal.count("V:drop"), 1);
    assert_eq!(journal.count("destroyed:Victim"), 1);
}

/// Marks another actor for death from its own update
struct Condemner {
    victim: Option<Ref<Actor>>,
}

impl Component for Condemner {
    fn update(&mut self, _actor: &mut ActorCtx<'_>) {
        if let Some(victim) = self.victim.take() {
            victim
                .with_mut(Actor::mark_for_death)
                .expect("victim is not being updated");
        }
    }
}

#[test]
fn test_root_marked_after_its_update_dies_the_same_tick() {
    let journal = Journal::default();
    let mut scene = Scene::new("LateMark");
    watch_deaths(&mut scene, &journal);

    let victim = scene.spawn_actor("Victim");
    let judge = scene.spawn_actor("Judge");
    judge
        .with_mut(|j| {
            j.add_component(Condemner {
                victim: Some(victim.clone()),
            })
        })
        .expect("judge is free");
    scene.update(DT);
    assert!(victim.is_valid());

    // the judge updates after the victim
    scene.update(DT);
    assert!(!victim.is_valid());
    assert!(judge.is_valid());
    assert_eq!(journal.entries(), vec!["destroyed:Victim"]);
}

#[test]
fn test_root_marked_between_ticks_dies_at_the_next_one() {
    let mut scene = Scene::new("Outside");
    let root = scene.spawn_actor("Root");
    scene.update(DT);

    root.with_mut(Actor::mark_for_death).expect("root is free");
    assert!(root.is_valid());
    scene.update(DT);
    assert!(!root.is_valid());
    assert!(scene.actors().is_empty());
}

#[test]
fn test_destroying_an_unknown_actor_is_refused() {
    let mut scene = Scene::new("Strict");
    let mut other = Scene::new("Elsewhere");
    let stranger = other.spawn_actor("Stranger");

    assert!(!scene.destroy(&Ref::invalid()));
    assert!(!scene.destroy(&stranger));
    scene.update(DT);
    other.update(DT);
    assert!(stranger.is_valid());
}

#[test]
fn test_expired_lifetime_destroys_its_actor() {
    let journal = Journal::default();
    let mut scene = Scene::new("Mayflies");
    watch_deaths(&mut scene, &journal);
    let fly = scene.spawn_actor("Fly");
    fly.with_mut(|f| f.add_component(Lifetime::new(0.05)))
        .expect("fly is free");

    scene.update(0.02);
    for _ in 0..2 {
        scene.update(0.02);
        assert!(fly.is_valid());
    }
    scene.update(0.02);
    assert!(!fly.is_valid());
    assert_eq!(journal.entries(), vec!["destroyed:Fly"]);
}

#[test]
fn test_actor_spawned_during_update_goes_live_next_tick() {
    let journal = Journal::default();
    let mut scene = Scene::new("Spawning");
    let late_journal = journal.clone();
    let once = Rc::new(Cell::new(false));
    scene.add_actor(Actor::with_behavior(
        "Root",
        Scripted::new(&journal).on_update(move |actor| {
            if !once.replace(true) {
                actor.add_actor(Actor::with_behavior("Late", Scripted::new(&late_journal)));
            }
        }),
    ));

    scene.update(DT);
    assert_eq!(scene.actors().len(), 1);
    assert_eq!(scene.pending_actors().len(), 1);
    assert_eq!(journal.count("Late:begin"), 0);

    journal.clear();
    scene.update(DT);
    assert_eq!(
        journal.entries(),
        vec!["Late:begin", "Root:update", "Late:update"]
    );
    assert_eq!(scene.actors().len(), 2);
}

struct Peek(Rc<Cell<bool>>);

impl Component for Peek {
    fn update(&mut self, actor: &mut ActorCtx<'_>) {
        let Some(parent) = actor.parent().cloned() else {
            return;
        };
        let blocked = matches!(
            parent.with(|p| p.name().to_string()),
            Err(ResourceError::AlreadyBorrowed { .. })
        );
        self.0.set(blocked);
    }
}

#[test]
fn test_ancestors_are_busy_during_traversal() {
    let mut scene = Scene::new("Busy");
    let blocked = Rc::new(Cell::new(false));
    let root = scene.spawn_actor("Root");
    let child = Actor::create("Child");
    if let Some(mut node) = child.get_mut() {
        node.add_component(Peek(Rc::clone(&blocked)));
    }
    root.with_mut(|r| r.add_child_actor(child)).expect("root is free");

    // child goes live, then its component, then the component runs
    scene.update(DT);
    scene.update(DT);
    assert!(!blocked.get());
    scene.update(DT);
    assert!(blocked.get());
    assert_eq!(root.with(|r| r.name().to_string()), Ok("Root".to_string()));
}

#[test]
fn test_dropping_the_scene_invalidates_every_handle() {
    let journal = Journal::default();
    let mut scene = Scene::new("Doomed");
    let root = scene.spawn_actor("Root");
    let child = root
        .with_mut(|r| r.add_child_actor(Actor::create("Child")))
        .expect("root is free");
    let probe = child
        .with_mut(|c| c.add_component(Probe::<'P'>::new(&journal)))
        .expect("child is free");
    scene.update(DT);

    drop(scene);
    assert!(!root.is_valid());
    assert!(!child.is_valid());
    assert!(!probe.is_valid());
    assert_eq!(journal.count("P:drop"), 1);
    assert_eq!(journal.count("P:destroy"), 0);
}

#[test]
fn test_render_collects_live_components() {
    let mut scene = Scene::new("Lit");
    let lamp = scene.spawn_actor_with("Lamp", Transform::from_position(Vec3::new(0.0, 3.0, 0.0)));
    lamp.with_mut(|l| {
        l.add_component(MeshRenderer::new("bulb", "glass").with_transparency(1));
        l.add_component(MeshRenderer::new("socket", "metal"));
        l.add_component(LightSource::point(Vec3::new(1.0, 0.9, 0.8), 2.0, 15.0));
    })
    .expect("lamp is free");

    let mut queue = RenderQueue::new();
    scene.render(&mut queue);
    assert!(queue.is_empty());

    scene.update(DT);
    scene.render(&mut queue);
    assert_eq!(queue.draw_count(), 2);
    assert_eq!(queue.opaque()[0].mesh, "socket");
    assert_eq!(queue.transparent()[0].material, "glass");
    assert_relative_eq!(
        queue.opaque()[0].transform.fixed_view::<3, 1>(0, 3).into_owned(),
        Vec3::new(0.0, 3.0, 0.0)
    );
    assert_eq!(queue.lights().len(), 1);
    match &queue.lights()[0].shape {
        LightShape::Point { position, range } => {
            assert_relative_eq!(*position, Vec3::new(0.0, 3.0, 0.0));
            assert_relative_eq!(*range, 15.0);
        }
        LightShape::Directional { .. } => panic!("expected a point light"),
    }
}
