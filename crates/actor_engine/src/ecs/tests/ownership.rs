//! Owner/observer behaviour as seen through actors and components

use super::{Journal, Probe};
use crate::ecs::{Actor, Component};
use crate::foundation::resource::{make_owned, Ref, Resource, ResourceError};

#[test]
fn test_moved_out_owner_reads_as_empty() {
    let mut first = make_owned(String::from("hull"));
    let observer = first.downgrade();

    let mut second = first.take();
    assert!(first.get().is_none());
    assert!(first.is_empty());
    assert!(observer.is_valid());

    let third = second.take();
    assert!(second.get().is_none());
    assert_eq!(third.get().as_deref().map(String::as_str), Some("hull"));
    assert!(third.owns(&observer));
}

#[test]
fn test_validity_tracks_the_value_not_the_observers() {
    let mut owner = Resource::new(41_u32);
    let observers: Vec<Ref<u32>> = (0..4).map(|_| owner.downgrade()).collect();

    drop(observers[..2].to_vec());
    assert!(observers.iter().all(Ref::is_valid));
    assert_eq!(observers[3].with(|v| v + 1), Ok(42));

    owner.release();
    assert!(observers.iter().all(|o| !o.is_valid()));
    assert!(matches!(
        observers[0].with(|v| *v),
        Err(ResourceError::InvalidReference { .. })
    ));
}

#[test]
fn test_upcast_component_observer_follows_the_original() {
    let journal = Journal::default();
    let owner = Resource::new(Probe::<'A'>::new(&journal));
    let typed = owner.downgrade();
    let erased: Ref<dyn Component> = typed.clone().upcast();

    let mut upcast_owner = owner.upcast();
    assert!(erased.is_valid());
    assert!(erased.type_tag().is_some_and(|tag| tag.is::<Probe<'A'>>()));
    assert!(typed.same_as(&erased));

    upcast_owner.release();
    assert!(!typed.is_valid());
    assert!(!erased.is_valid());
    assert_eq!(journal.count("A:drop"), 1);
}

#[test]
fn test_component_handle_dies_with_its_actor() {
    let journal = Journal::default();
    let actor = Actor::create("Crate");
    let probe = actor
        .get_mut()
        .map(|mut a| a.add_component(Probe::<'A'>::new(&journal)))
        .expect("actor is free");

    assert!(probe.is_valid());
    drop(actor);
    assert!(!probe.is_valid());
    assert_eq!(journal.count("A:drop"), 1);
}

#[test]
fn test_actor_knows_its_own_handle() {
    let actor = Actor::create("Mirror");
    let this = actor.get().map(|a| a.this()).expect("actor is free");
    assert!(actor.owns(&this));
    assert_eq!(this.with(|a| a.name().to_string()), Ok("Mirror".to_string()));
}
