//! The meal-tracker schema, one module per revision.
//!
//! New revisions take the next number, point `down_revision` at the current
//! head and are registered at the end of [`registry`].

mod m001_create_users;
mod m002_create_meals;
mod m003_create_food_items;
mod m004_create_chat;
mod m005_create_subscriptions;
mod m006_create_notification_preferences;
mod m007_add_user_timezone;
mod m008_add_meal_image;

use crate::chain::{RevisionChain, RevisionRegistry};
use crate::error::ChainIntegrityError;

pub fn registry() -> RevisionRegistry {
    let mut registry = RevisionRegistry::new();
    registry.register(m001_create_users::revision());
    registry.register(m002_create_meals::revision());
    registry.register(m003_create_food_items::revision());
    registry.register(m004_create_chat::revision());
    registry.register(m005_create_subscriptions::revision());
    registry.register(m006_create_notification_preferences::revision());
    registry.register(m007_add_user_timezone::revision());
    registry.register(m008_add_meal_image::revision());
    registry
}

pub fn chain() -> Result<RevisionChain, ChainIntegrityError> {
    registry().into_chain()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Target;
    use crate::dialect::{Dialect, MySql, Postgres, Sqlite};
    use crate::engine::Engine;
    use crate::store::MemoryStore;

    #[test]
    fn chain_is_linear() {
        let chain = chain().unwrap();
        let ids: Vec<&str> = chain.iter().map(|r| r.revision).collect();

        assert_eq!(
            ids,
            vec!["001", "002", "003", "004", "005", "006", "007", "008"]
        );
        assert_eq!(chain.root().map(|r| r.revision), Some("001"));
        assert_eq!(chain.head().map(|r| r.revision), Some("008"));
    }

    #[test]
    fn every_revision_is_reversible() {
        let chain = chain().unwrap();
        for dialect in [&Sqlite as &dyn Dialect, &Postgres, &MySql] {
            for revision in chain.iter() {
                assert!(
                    revision.backward_actions(dialect).is_some(),
                    "{} not reversible on {}",
                    revision.revision,
                    dialect.name()
                );
            }
        }
    }

    #[test]
    fn plan_from_base_covers_whole_chain() {
        let chain = chain().unwrap();
        let plan = chain.plan_upgrade(None, &Target::Head).unwrap();
        assert_eq!(plan.steps.len(), chain.len());

        let plan = chain.plan_upgrade(Some("005"), &Target::Head).unwrap();
        assert_eq!(plan.revisions(), vec!["006", "007", "008"]);
    }

    #[test]
    fn round_trip_restores_empty_schema() {
        let chain = chain().unwrap();
        let mut engine = Engine::new(&chain, MemoryStore::new());

        engine.upgrade(&Target::Head).unwrap();
        assert_eq!(
            engine.store().tables(),
            [
                "chat_messages",
                "chat_threads",
                "food_items",
                "meals",
                "notification_preferences",
                "subscriptions",
                "users",
            ]
        );
        assert!(engine.store().columns("users").contains(&"timezone"));
        assert!(engine.store().columns("meals").contains(&"image_url"));

        engine.downgrade(&Target::Base).unwrap();
        assert!(engine.store().tables().is_empty());
        assert_eq!(engine.store().marker(), None);
    }

    #[test]
    fn stamp_then_upgrade_runs_later_steps_only() {
        let chain = chain().unwrap();
        let mut engine = Engine::new(&chain, MemoryStore::new());

        engine.stamp(&Target::Revision("003".to_string())).unwrap();
        assert!(engine.store().executed().is_empty());
        assert!(engine.store().tables().is_empty());

        let reports = engine.upgrade(&Target::Head).unwrap();
        let applied: Vec<&str> = reports.iter().map(|r| r.revision.as_str()).collect();
        assert_eq!(applied, vec!["004", "005", "006", "007", "008"]);
        assert!(!engine.store().tables().contains(&"food_items"));
    }
}
