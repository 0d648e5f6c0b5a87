//! Tag and group indices.

use std::collections::{BTreeSet, HashMap};

use crate::entity::Entity;

/// A one-to-one mapping between tag names and entities.
///
/// Tagging is last-write-wins in both directions: re-tagging an entity drops
/// its previous tag, and assigning a tag which another entity holds takes the
/// tag away from that entity.
#[derive(Debug, Clone, Default)]
pub(crate) struct TagIndex {
    entity_per_tag: HashMap<String, Entity>,
    tag_per_entity: HashMap<Entity, String>,
}

impl TagIndex {
    pub fn tag(&mut self, entity: Entity, tag: &str) {
        self.remove(entity);

        if let Some(previous) = self.entity_per_tag.insert(tag.to_owned(), entity) {
            self.tag_per_entity.remove(&previous);
        }
        self.tag_per_entity.insert(entity, tag.to_owned());
    }

    pub fn has_tag(&self, entity: Entity, tag: &str) -> bool {
        self.tag_per_entity.get(&entity).map_or(false, |t| t == tag)
    }

    pub fn entity(&self, tag: &str) -> Option<Entity> {
        self.entity_per_tag.get(tag).copied()
    }

    pub fn tag_of(&self, entity: Entity) -> Option<&str> {
        self.tag_per_entity.get(&entity).map(String::as_str)
    }

    pub fn remove(&mut self, entity: Entity) -> Option<String> {
        let tag = self.tag_per_entity.remove(&entity)?;
        self.entity_per_tag.remove(&tag);
        Some(tag)
    }

    pub fn clear(&mut self) {
        self.entity_per_tag.clear();
        self.tag_per_entity.clear();
    }
}

/// A one-to-many mapping between group names and entities.
///
/// An entity is in at most one group; grouping it again moves it. Groups are
/// never deleted once created, so a group whose members have all left is
/// still known (and empty).
#[derive(Debug, Clone, Default)]
pub(crate) struct GroupIndex {
    entities_per_group: HashMap<String, BTreeSet<Entity>>,
    group_per_entity: HashMap<Entity, String>,
}

impl GroupIndex {
    pub fn group(&mut self, entity: Entity, group: &str) {
        self.remove(entity);

        self.entities_per_group
            .entry(group.to_owned())
            .or_default()
            .insert(entity);
        self.group_per_entity.insert(entity, group.to_owned());
    }

    pub fn belongs_to_group(&self, entity: Entity, group: &str) -> bool {
        self.entities_per_group
            .get(group)
            .map_or(false, |entities| entities.contains(&entity))
    }

    pub fn entities(&self, group: &str) -> Option<&BTreeSet<Entity>> {
        self.entities_per_group.get(group)
    }

    pub fn group_of(&self, entity: Entity) -> Option<&str> {
        self.group_per_entity.get(&entity).map(String::as_str)
    }

    pub fn remove(&mut self, entity: Entity) -> Option<String> {
        let group = self.group_per_entity.remove(&entity)?;
        if let Some(entities) = self.entities_per_group.get_mut(&group) {
            entities.remove(&entity);
        }
        Some(group)
    }

    pub fn clear(&mut self) {
        self.entities_per_group.clear();
        self.group_per_entity.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_retag() {
        let a = Entity::new(0, 0);
        let b = Entity::new(1, 0);
        let mut tags = TagIndex::default();

        tags.tag(a, "player");
        assert_eq!(tags.entity("player"), Some(a));

        tags.tag(a, "hero");
        assert_eq!(tags.entity("player"), None);
        assert_eq!(tags.entity("hero"), Some(a));
        assert!(tags.has_tag(a, "hero"));
        assert!(!tags.has_tag(a, "player"));

        tags.tag(b, "hero");
        assert_eq!(tags.entity("hero"), Some(b));
        assert_eq!(tags.tag_of(a), None);

        assert_eq!(tags.remove(b).as_deref(), Some("hero"));
        assert_eq!(tags.entity("hero"), None);
        assert_eq!(tags.remove(b), None);
    }

    #[test]
    fn test_regroup() {
        let a = Entity::new(0, 0);
        let b = Entity::new(1, 0);
        let mut groups = GroupIndex::default();

        groups.group(a, "enemies");
        groups.group(b, "enemies");
        assert_eq!(groups.entities("enemies").unwrap().len(), 2);

        groups.group(a, "projectiles");
        assert!(!groups.belongs_to_group(a, "enemies"));
        assert!(groups.belongs_to_group(a, "projectiles"));
        assert_eq!(groups.group_of(a), Some("projectiles"));

        groups.remove(b);
        assert!(groups.entities("enemies").unwrap().is_empty());
        assert!(groups.entities("allies").is_none());
    }
}
