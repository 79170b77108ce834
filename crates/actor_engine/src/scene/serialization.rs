//! Saving and loading scenes as RON documents
//!
//! A document is a flat list of actors, each naming its parent by [`ActorId`].
//! Since a child may be listed before its parent, loading runs in three passes:
//!
//! 1. create every actor as a root through [`Scene::create_actor`], with its components
//! 2. move each child under its parent, found through [`Scene::get_actor`]
//! 3. let components re-link references to other actors ([`Scene::resolve_links`])
//!
//! Problems found while loading are logged and collected in a [`LoadReport`];
//! they never abort the load.

use crate::ecs::actor::{Actor, Reparent};
use crate::ecs::components::{Lifetime, LightSource, LookAt, MeshRenderer, Spin};
use crate::ecs::entity::ActorId;
use crate::foundation::math::Transform;
use crate::foundation::resource::ResourceError;
use crate::scene::Scene;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Scene-level errors
#[derive(Error, Debug)]
pub enum SceneError {
    /// Reading or writing a scene file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid RON
    #[error("Parse error: {0}")]
    Parse(String),

    /// The scene could not be written as RON
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Two actors in one document share an identity
    #[error("Duplicate actor {0}")]
    DuplicateActor(ActorId),

    /// An actor names a parent that is not in the scene
    #[error("Actor {actor} references missing parent {parent}")]
    MissingParent {
        /// Actor whose parent is missing
        actor: ActorId,
        /// Identity that could not be found
        parent: ActorId,
    },

    /// Linking an actor under its parent would make it its own ancestor
    #[error("Actor {actor} cannot be parented under its own descendant {parent}")]
    CyclicParent {
        /// Actor being linked
        actor: ActorId,
        /// Parent named by the document
        parent: ActorId,
    },

    /// An actor was not reachable while linking
    #[error("Actor {actor} could not be linked: {source}")]
    Link {
        /// Actor being linked
        actor: ActorId,
        /// Underlying access failure
        source: ResourceError,
    },
}

/// Serialized form of the built-in components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentRecord {
    /// [`MeshRenderer`]
    MeshRenderer(MeshRenderer),
    /// [`LightSource`]
    Light(LightSource),
    /// [`LookAt`]
    LookAt(LookAt),
    /// [`Lifetime`]
    Lifetime(Lifetime),
    /// [`Spin`]
    Spin(Spin),
}

impl ComponentRecord {
    /// Attach the recorded component to `actor`
    pub fn attach_to(self, actor: &mut Actor) {
        match self {
            Self::MeshRenderer(component) => {
                actor.add_component(component);
            }
            Self::Light(component) => {
                actor.add_component(component);
            }
            Self::LookAt(component) => {
                actor.add_component(component);
            }
            Self::Lifetime(component) => {
                actor.add_component(component);
            }
            Self::Spin(component) => {
                actor.add_component(component);
            }
        }
    }
}

/// One actor in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    /// Persistent identity
    pub id: ActorId,
    /// Display name
    pub name: String,
    /// Local transform
    pub transform: Transform,
    /// Parent identity; `None` for scene roots
    #[serde(default)]
    pub parent: Option<ActorId>,
    /// Serializable components
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
}

/// A saved scene
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Scene name
    pub name: String,
    /// Every actor, parents before children on save (not required on load)
    pub actors: Vec<ActorRecord>,
}

/// Outcome of a load
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Actors created in the first pass
    pub created: usize,
    /// Child actors moved under their parent in the second pass
    pub linked: usize,
    /// Problems that were skipped over
    pub issues: Vec<SceneError>,
}

impl LoadReport {
    /// Whether the load went through without any problem
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    fn issue(&mut self, error: SceneError) {
        warn!("Scene load: {}", error);
        self.issues.push(error);
    }
}

/// Capture the scene's actors, live and pending, depth first
pub fn to_document(scene: &Scene) -> SceneDocument {
    let mut document = SceneDocument {
        name: scene.name().to_string(),
        actors: Vec::new(),
    };
    for root in scene.actors().iter().chain(scene.pending_actors()) {
        match root.borrow() {
            Ok(actor) => record_actor(&actor, None, &mut document.actors),
            Err(error) => warn!("Skipping actor while saving: {}", error),
        }
    }
    debug!("Captured {} actor(s) from '{}'", document.actors.len(), scene.name());
    document
}

fn record_actor(actor: &Actor, parent: Option<ActorId>, out: &mut Vec<ActorRecord>) {
    let components = actor
        .components()
        .filter_map(|component| component.borrow().ok().and_then(|c| c.record()))
        .collect();
    out.push(ActorRecord {
        id: actor.id(),
        name: actor.name().to_string(),
        transform: *actor.transform(),
        parent,
        components,
    });
    for child in actor.children() {
        if let Some(node) = child.get() {
            record_actor(&node, Some(actor.id()), out);
        }
    }
}

/// Add every actor of `document` to `scene`
pub fn load_document(scene: &mut Scene, document: SceneDocument) -> LoadReport {
    let mut report = LoadReport::default();
    let mut links = Vec::new();

    for record in document.actors {
        if scene.find_actor(record.id).is_some() {
            report.issue(SceneError::DuplicateActor(record.id));
            continue;
        }
        let handle = scene.create_actor(record.id, record.name, record.transform);
        let components = record.components;
        if let Err(source) = handle.with_mut(|actor| {
            for component in components {
                component.attach_to(actor);
            }
        }) {
            report.issue(SceneError::Link {
                actor: record.id,
                source,
            });
        }
        report.created += 1;
        if let Some(parent) = record.parent {
            links.push((record.id, parent));
        }
    }

    for (id, parent_id) in links {
        match link_parent(scene, id, parent_id) {
            Ok(()) => report.linked += 1,
            Err(error) => report.issue(error),
        }
    }

    scene.resolve_links();
    info!(
        "Loaded {} actor(s) into '{}' ({} linked, {} issue(s))",
        report.created,
        scene.name(),
        report.linked,
        report.issues.len()
    );
    report
}

fn link_parent(scene: &mut Scene, id: ActorId, parent_id: ActorId) -> Result<(), SceneError> {
    let child = scene.get_actor(id);
    let parent = scene.get_actor(parent_id);
    if !parent.is_valid() {
        return Err(SceneError::MissingParent {
            actor: id,
            parent: parent_id,
        });
    }
    let cyclic = child
        .with(|actor| actor.id() == parent_id || actor.find_descendant(parent_id).is_some())
        .map_err(|source| SceneError::Link { actor: id, source })?;
    if cyclic {
        return Err(SceneError::CyclicParent {
            actor: id,
            parent: parent_id,
        });
    }

    let Some(owned) = scene.take_actor(&child) else {
        return Err(SceneError::Link {
            actor: id,
            source: ResourceError::InvalidReference {
                type_name: std::any::type_name::<Actor>(),
            },
        });
    };
    let mut owned = Some(owned);
    let linked = parent.with_mut(|node| {
        if let Some(child) = owned.take() {
            node.attach_child(child, Reparent::KeepLocal);
        }
    });
    if let Err(source) = linked {
        if let Some(child) = owned {
            scene.add_actor(child);
        }
        return Err(SceneError::Link { actor: id, source });
    }
    Ok(())
}

/// Write the scene as pretty-printed RON
pub fn save_ron(scene: &Scene) -> Result<String, SceneError> {
    ron::ser::to_string_pretty(&to_document(scene), ron::ser::PrettyConfig::default())
        .map_err(|e| SceneError::Serialize(e.to_string()))
}

/// Parse a RON document and load it into `scene`
pub fn load_ron(scene: &mut Scene, source: &str) -> Result<LoadReport, SceneError> {
    let document: SceneDocument =
        ron::from_str(source).map_err(|e| SceneError::Parse(e.to_string()))?;
    Ok(load_document(scene, document))
}

/// Save the scene to a RON file
pub fn save_file(scene: &Scene, path: impl AsRef<Path>) -> Result<(), SceneError> {
    std::fs::write(path, save_ron(scene)?)?;
    Ok(())
}

/// Load a RON file into `scene`
pub fn load_file(scene: &mut Scene, path: impl AsRef<Path>) -> Result<LoadReport, SceneError> {
    let contents = std::fs::read_to_string(path)?;
    load_ron(scene, &contents)
}
