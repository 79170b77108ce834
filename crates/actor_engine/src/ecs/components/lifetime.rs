//! Lifetime Component
//!
//! Counts down and marks its actor for death once the time is up.

use crate::ecs::component::Component;
use crate::ecs::context::ActorCtx;
use crate::scene::serialization::ComponentRecord;
use serde::{Deserialize, Serialize};

/// Destroys its actor after a duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lifetime {
    /// How long the actor should live (in seconds, <= 0 means forever)
    pub duration: f32,
    /// Time lived so far
    #[serde(default)]
    pub elapsed: f32,
}

impl Lifetime {
    /// Create a new lifetime component
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            elapsed: 0.0,
        }
    }

    /// Check if the lifetime has run out
    pub fn is_expired(&self) -> bool {
        if self.duration <= 0.0 {
            false // Infinite lifetime
        } else {
            self.elapsed >= self.duration
        }
    }

    /// Get remaining lifetime in seconds
    pub fn remaining(&self) -> f32 {
        if self.duration <= 0.0 {
            f32::INFINITY
        } else {
            (self.duration - self.elapsed).max(0.0)
        }
    }
}

impl Component for Lifetime {
    fn update(&mut self, actor: &mut ActorCtx<'_>) {
        if self.is_expired() {
            return;
        }
        self.elapsed += actor.delta_time();
        if self.is_expired() {
            log::debug!("Lifetime of '{}' ran out after {:.2}s", actor.name(), self.elapsed);
            actor.mark_for_death();
        }
    }

    fn record(&self) -> Option<ComponentRecord> {
        Some(ComponentRecord::Lifetime(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lifetime_not_expired() {
        let lifetime = Lifetime {
            duration: 5.0,
            elapsed: 2.0,
        };
        assert!(!lifetime.is_expired());
    }

    #[test]
    fn test_lifetime_expired() {
        let lifetime = Lifetime {
            duration: 5.0,
            elapsed: 6.0,
        };
        assert!(lifetime.is_expired());
    }

    #[test]
    fn test_infinite_lifetime() {
        let lifetime = Lifetime {
            duration: 0.0,
            elapsed: 1000.0,
        };
        assert!(!lifetime.is_expired());
        assert!(lifetime.remaining().is_infinite());
    }

    #[test]
    fn test_remaining_time() {
        let mut lifetime = Lifetime::new(10.0);
        lifetime.elapsed = 3.0;
        assert_relative_eq!(lifetime.remaining(), 7.0);
        lifetime.elapsed = 12.0;
        assert_relative_eq!(lifetime.remaining(), 0.0);
    }
}
