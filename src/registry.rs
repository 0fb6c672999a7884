//! Engraver registry: in-progress engravers and finished-shape buffer.
//!
//! While a layout pass walks the columns, every relation that has been
//! started but not yet finalized lives here, keyed by the relation's
//! identity or by a string tag when several same-kind relations are
//! told apart externally (lyric verse numbers). Finished shapes whose
//! owning box may not exist yet are buffered in [`ShapesStorage`] and
//! released in bulk once the box tree is ready.

use std::collections::HashMap;

use crate::engravers::RelObjEngraver;
use crate::graphic_model::{GraphicModel, ShapeBoxInfo};
use crate::model::RelationId;
use crate::shapes::{ShapeId, ShapeLayer};

/// Registry key: a relation identity, or an external tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EngraverKey {
    Relation(RelationId),
    Tag(String),
}

impl EngraverKey {
    /// Tag for a lyric line, one per verse and instrument.
    pub fn lyric(instr: usize, verse: u32) -> Self {
        EngraverKey::Tag(format!("lyric-{instr}-{verse}"))
    }
}

impl From<RelationId> for EngraverKey {
    fn from(id: RelationId) -> Self {
        EngraverKey::Relation(id)
    }
}

/// Map of in-progress engravers. At most one live engraver per key; a
/// second `save_engraver` on an unreleased key is a caller bug.
#[derive(Default)]
pub struct EngraversMap {
    engravers: HashMap<EngraverKey, Box<dyn RelObjEngraver>>,
}

impl EngraversMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_engraver(&mut self, engraver: Box<dyn RelObjEngraver>, key: EngraverKey) {
        debug_assert!(
            !self.engravers.contains_key(&key),
            "second engraver saved for an unreleased key"
        );
        self.engravers.insert(key, engraver);
    }

    pub fn get_engraver(&self, key: &EngraverKey) -> Option<&dyn RelObjEngraver> {
        self.engravers.get(key).map(|e| e.as_ref())
    }

    pub fn get_engraver_mut(&mut self, key: &EngraverKey) -> Option<&mut Box<dyn RelObjEngraver>> {
        self.engravers.get_mut(key)
    }

    /// Release the engraver for `key`; later `get_engraver` calls on
    /// that key return none.
    pub fn remove_engraver(&mut self, key: &EngraverKey) -> Option<Box<dyn RelObjEngraver>> {
        self.engravers.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.engravers.is_empty()
    }

    /// Keys still holding an engraver, for end-of-pass diagnostics.
    pub fn pending_keys(&self) -> Vec<EngraverKey> {
        self.engravers.keys().cloned().collect()
    }
}

/// One finished shape waiting for its owning box.
#[derive(Debug, Clone, Copy)]
pub struct PendingShape {
    pub shape: ShapeId,
    pub layer: ShapeLayer,
    pub box_info: ShapeBoxInfo,
}

/// Buffer of finished-but-not-yet-inserted shapes.
#[derive(Debug, Default)]
pub struct ShapesStorage {
    pending: Vec<PendingShape>,
}

impl ShapesStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ready_shape(&mut self, shape: ShapeId, layer: ShapeLayer, box_info: ShapeBoxInfo) {
        self.pending.push(PendingShape { shape, layer, box_info });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Release every buffered shape into its owning box, lowest layer
    /// first so boxes keep their draw order.
    pub fn add_ready_shapes_to_model(&mut self, model: &mut GraphicModel) {
        let mut pending = std::mem::take(&mut self.pending);
        pending.sort_by_key(|p| p.layer);
        for p in pending {
            model.add_shape_to_box(p.shape, p.layer, p.box_info);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engravers::{AnchorInfo, EngraveContext};
    use crate::error::EngraveError;

    struct DummyEngraver(RelationId);

    impl RelObjEngraver for DummyEngraver {
        fn relation(&self) -> RelationId {
            self.0
        }
        fn set_start_staffobj(&mut self, _anchor: AnchorInfo) {}
        fn set_end_staffobj(&mut self, _anchor: AnchorInfo) {}
        fn create_shapes(
            &mut self,
            _ctx: &mut EngraveContext,
        ) -> Result<Vec<ShapeId>, EngraveError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn round_trip_by_relation_id() {
        let mut map = EngraversMap::new();
        let key = EngraverKey::from(RelationId(7));
        map.save_engraver(Box::new(DummyEngraver(RelationId(7))), key.clone());

        let found = map.get_engraver(&key).map(|e| e.relation());
        assert_eq!(found, Some(RelationId(7)));

        assert!(map.remove_engraver(&key).is_some());
        assert!(map.get_engraver(&key).is_none());
    }

    #[test]
    fn tag_keys_are_distinct_from_relation_keys() {
        let mut map = EngraversMap::new();
        map.save_engraver(
            Box::new(DummyEngraver(RelationId(1))),
            EngraverKey::lyric(0, 1),
        );
        map.save_engraver(
            Box::new(DummyEngraver(RelationId(2))),
            EngraverKey::lyric(0, 2),
        );

        let verse1 = map.get_engraver(&EngraverKey::lyric(0, 1)).map(|e| e.relation());
        let verse2 = map.get_engraver(&EngraverKey::lyric(0, 2)).map(|e| e.relation());
        assert_eq!(verse1, Some(RelationId(1)));
        assert_eq!(verse2, Some(RelationId(2)));
        assert!(map.get_engraver(&EngraverKey::Relation(RelationId(1))).is_none());
    }
}
