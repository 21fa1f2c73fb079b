//! The control-point arena.

use patchwork_math::{Point3, Transform, Vec3};
use slotmap::{new_key_type, SlotMap};
use tracing::debug;

use crate::{Result, TopoError};

new_key_type! {
    /// Stable handle to a control point.
    pub struct PointId;
}

/// A single control point.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPoint {
    /// Position in world space.
    pub position: Point3,
    /// Whether user-level deletion may remove this point.
    ///
    /// Surfaces clear the flag on every point they reference and restore
    /// it when they are released.
    pub deletable: bool,
    /// Display name.
    pub name: String,
}

impl ControlPoint {
    /// A deletable point at `position`.
    pub fn new(position: Point3) -> Self {
        Self {
            position,
            deletable: true,
            name: String::from("point"),
        }
    }
}

/// Arena of control points addressed by [`PointId`].
#[derive(Debug, Clone, Default)]
pub struct PointStore {
    points: SlotMap<PointId, ControlPoint>,
}

impl PointStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new deletable point and return its id.
    pub fn insert(&mut self, position: Point3) -> PointId {
        self.points.insert(ControlPoint::new(position))
    }

    /// Insert a fully specified point.
    pub fn insert_point(&mut self, point: ControlPoint) -> PointId {
        self.points.insert(point)
    }

    /// Look up a point.
    pub fn get(&self, id: PointId) -> Option<&ControlPoint> {
        self.points.get(id)
    }

    /// Position of a point, if it is still alive.
    pub fn position(&self, id: PointId) -> Option<Point3> {
        self.points.get(id).map(|p| p.position)
    }

    /// Whether `id` refers to a live point.
    pub fn contains(&self, id: PointId) -> bool {
        self.points.contains_key(id)
    }

    /// Number of live points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over all live points.
    pub fn iter(&self) -> impl Iterator<Item = (PointId, &ControlPoint)> {
        self.points.iter()
    }

    /// Move a point to an absolute position.
    pub fn set_position(&mut self, id: PointId, position: Point3) -> Result<()> {
        let point = self.points.get_mut(id).ok_or(TopoError::UnknownPoint(id))?;
        point.position = position;
        Ok(())
    }

    /// Move a point by an offset.
    pub fn translate(&mut self, id: PointId, offset: Vec3) -> Result<()> {
        let point = self.points.get_mut(id).ok_or(TopoError::UnknownPoint(id))?;
        point.position += offset;
        Ok(())
    }

    /// Apply an affine transform to a point.
    pub fn transform(&mut self, id: PointId, t: &Transform) -> Result<()> {
        let point = self.points.get_mut(id).ok_or(TopoError::UnknownPoint(id))?;
        point.position = t.apply_point(&point.position);
        Ok(())
    }

    /// Rename a point.
    pub fn set_name(&mut self, id: PointId, name: impl Into<String>) -> Result<()> {
        let point = self.points.get_mut(id).ok_or(TopoError::UnknownPoint(id))?;
        point.name = name.into();
        Ok(())
    }

    /// Set the deletability flag.
    pub fn set_deletable(&mut self, id: PointId, deletable: bool) -> Result<()> {
        let point = self.points.get_mut(id).ok_or(TopoError::UnknownPoint(id))?;
        point.deletable = deletable;
        Ok(())
    }

    /// Remove a point that no surface depends on.
    pub fn remove(&mut self, id: PointId) -> Result<ControlPoint> {
        match self.points.get(id) {
            None => Err(TopoError::UnknownPoint(id)),
            Some(p) if !p.deletable => Err(TopoError::PointInUse(id)),
            Some(_) => {
                debug!(?id, "removing control point");
                self.points.remove(id).ok_or(TopoError::UnknownPoint(id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_move() {
        let mut store = PointStore::new();
        let id = store.insert(Point3::new(1.0, 2.0, 3.0));
        assert_eq!(store.len(), 1);
        store.set_position(id, Point3::new(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(store.position(id), Some(Point3::new(0.0, 0.0, 1.0)));

        store.transform(id, &Transform::translation(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(store.position(id), Some(Point3::new(1.0, 0.0, 1.0)));

        store.translate(id, Vec3::new(0.0, 2.0, 0.0)).unwrap();
        assert_eq!(store.position(id), Some(Point3::new(1.0, 2.0, 1.0)));
    }

    #[test]
    fn test_undeletable_point_survives_remove() {
        let mut store = PointStore::new();
        let id = store.insert(Point3::origin());
        store.set_deletable(id, false).unwrap();
        assert_eq!(store.remove(id), Err(TopoError::PointInUse(id)));
        assert!(store.contains(id));

        store.set_deletable(id, true).unwrap();
        assert!(store.remove(id).is_ok());
        assert!(!store.contains(id));
        assert_eq!(store.position(id), None);
    }

    #[test]
    fn test_stale_id_reports_unknown() {
        let mut store = PointStore::new();
        let id = store.insert(Point3::origin());
        store.remove(id).unwrap();
        assert_eq!(
            store.set_position(id, Point3::origin()),
            Err(TopoError::UnknownPoint(id))
        );
    }
}
