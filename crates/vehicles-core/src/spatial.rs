use crate::entity::{StaticObject, StaticShape, Vehicle};
use rstar::{RTree, RTreeObject, AABB};

/// Which entity a spatial entry stands for, by index into the world's arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityRef {
    Vehicle(usize),
    Static(usize),
}

/// Lightweight bounding box per entity to avoid cloning whole vehicles into the tree.
#[derive(Clone, Debug)]
pub struct EntityLocation {
    pub entity: EntityRef,
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl EntityLocation {
    fn around(entity: EntityRef, center: [f64; 2], radius: f64) -> Self {
        Self {
            entity,
            min: [center[0] - radius, center[1] - radius],
            max: [center[0] + radius, center[1] + radius],
        }
    }

    fn spanning(entity: EntityRef, a: [f64; 2], b: [f64; 2]) -> Self {
        Self {
            entity,
            min: [a[0].min(b[0]), a[1].min(b[1])],
            max: [a[0].max(b[0]), a[1].max(b[1])],
        }
    }
}

impl RTreeObject for EntityLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

/// Index of everything a receptor could see: vehicle positions and the
/// light point of each emitting static object.
pub fn build_light_index(vehicles: &[Vehicle], statics: &[StaticObject]) -> RTree<EntityLocation> {
    let vehicle_points = vehicles
        .iter()
        .enumerate()
        .map(|(i, v)| EntityLocation::around(EntityRef::Vehicle(i), v.position, 0.0));
    let static_points = statics
        .iter()
        .enumerate()
        .filter(|(_, s)| s.emits_brightness)
        .map(|(i, s)| EntityLocation::around(EntityRef::Static(i), s.position, 0.0));
    RTree::bulk_load(vehicle_points.chain(static_points).collect())
}

/// Index of collision bodies: vehicle discs at `positions` (one per vehicle,
/// index-aligned), point discs and wall segments.
pub fn build_body_index(
    positions: &[[f64; 2]],
    radii: &[f64],
    statics: &[StaticObject],
) -> RTree<EntityLocation> {
    let discs = positions
        .iter()
        .zip(radii)
        .enumerate()
        .map(|(i, (p, r))| EntityLocation::around(EntityRef::Vehicle(i), *p, *r));
    let obstacles = statics.iter().enumerate().map(|(i, s)| match s.shape {
        StaticShape::Point { radius } => {
            EntityLocation::around(EntityRef::Static(i), s.position, radius)
        }
        StaticShape::Wall { end } => EntityLocation::spanning(EntityRef::Static(i), s.position, end),
    });
    RTree::bulk_load(discs.chain(obstacles).collect())
}

/// Entities whose bounding box touches the square of half-width `radius`
/// around `center`, in a stable order. Callers run the exact test.
pub fn candidates(tree: &RTree<EntityLocation>, center: [f64; 2], radius: f64) -> Vec<EntityRef> {
    let envelope = AABB::from_corners(
        [center[0] - radius, center[1] - radius],
        [center[0] + radius, center[1] + radius],
    );
    let mut found: Vec<EntityRef> = tree
        .locate_in_envelope_intersecting(&envelope)
        .map(|loc| loc.entity)
        .collect();
    found.sort_unstable();
    found
}
