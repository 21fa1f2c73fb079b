//! The object document: named objects, selection, shared control points
//! and lazy recomputation of dependents.

use patchwork_gaps::{find_gaps, GregoryFill, SurfaceGap};
use patchwork_geom::{DerivativeOverlay, Surface, TorusSurface};
use patchwork_intersect::{trace, Intersection, TraceSettings};
use patchwork_math::{Dir3, Point2, Point3, Transform, Vec3};
use patchwork_mill::{finish, rough, BakeTarget, HeightMap, ToolPath};
use patchwork_spline::{BicubicSurface, InterpolatingCurve, PatchKind, SurfacePatch, SurfaceTemplate};
use patchwork_topo::{EventBus, EventKind, PointId, PointStore, TopoError};
use patchwork_trim::TrimDomain;
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, info, warn};

use crate::{DocumentError, Result, Settings};

new_key_type! {
    /// Stable identifier of a document object.
    pub struct ObjectId;
}

/// Something that can publish change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// A control point.
    Point(PointId),
    /// A document object.
    Object(ObjectId),
}

/// A bicubic surface with its optional trimming raster.
#[derive(Debug, Clone)]
pub struct PatchSurface {
    /// The surface.
    pub surface: BicubicSurface,
    /// Trimming raster, created on first use.
    pub trim: Option<TrimDomain>,
}

/// A torus with its optional trimming raster.
#[derive(Debug, Clone)]
pub struct TorusObject {
    /// The torus.
    pub torus: TorusSurface,
    /// Trimming raster, created on first use.
    pub trim: Option<TrimDomain>,
}

/// A Gregory fill of one gap between Bézier surfaces.
#[derive(Debug, Clone)]
pub struct GregoryObject {
    /// Surfaces whose patches, in this order, bound the gap.
    pub sources: Vec<ObjectId>,
    /// The filled gap.
    pub gap: SurfaceGap,
    /// Current fill; `None` while the gap cannot be rebuilt.
    pub fill: Option<GregoryFill>,
}

/// A traced intersection curve.
#[derive(Debug, Clone)]
pub struct CurveObject {
    /// The two intersected objects.
    pub surfaces: [ObjectId; 2],
    /// Curve points on the first surface, backward trace first.
    pub points: Vec<Point3>,
    /// Parameters of the points on each surface.
    pub params: [Vec<Point2>; 2],
    /// Interpolating spline through `points`.
    pub curve: Option<InterpolatingCurve>,
}

/// A derivative overlay following its source surface.
#[derive(Debug, Clone)]
pub struct OverlayObject {
    /// Sampled surface.
    pub source: ObjectId,
    /// Current segments.
    pub overlay: DerivativeOverlay,
}

/// Kind-specific data of an object.
#[derive(Debug, Clone)]
pub enum Shape {
    /// A free control point.
    Point(PointId),
    /// A Bézier or B-spline surface.
    Surface(PatchSurface),
    /// An analytic torus.
    Torus(TorusObject),
    /// A gap fill.
    Gregory(GregoryObject),
    /// An intersection curve.
    Curve(CurveObject),
    /// A marker left by the intersection tracer.
    DebugPoint(Point3),
    /// A derivative overlay.
    Overlay(OverlayObject),
}

/// A named document object.
#[derive(Debug, Clone)]
pub struct Object {
    /// Display name.
    pub name: String,
    /// Kind-specific data.
    pub shape: Shape,
}

/// Work decided for a dependent while the document is borrowed.
enum Recompute {
    Surface,
    Gregory(Vec<ObjectId>, SurfaceGap),
    Overlay(ObjectId),
    Nothing,
}

/// Objects, selection and control points of one model.
///
/// Mutations publish events instead of recomputing dependents directly;
/// [`Document::integrate`] drains them once per frame.
#[derive(Debug, Default)]
pub struct Document {
    objects: SlotMap<ObjectId, Object>,
    selection: Vec<ObjectId>,
    points: PointStore,
    events: EventBus<Source, ObjectId>,
    settings: Settings,
    counter: usize,
}

impl Document {
    /// An empty document with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty document with `settings`.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mutable settings; applies to later operations.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Shared control points.
    pub fn points(&self) -> &PointStore {
        &self.points
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when the document has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Look up an object.
    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    /// All objects.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter()
    }

    // =========================================================================
    // Adding objects
    // =========================================================================

    fn next_name(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{prefix} {}", self.counter)
    }

    /// Add an object and register it for the events it depends on.
    pub fn add_object(&mut self, name: impl Into<String>, shape: Shape) -> ObjectId {
        let id = self.objects.insert(Object {
            name: name.into(),
            shape,
        });
        self.wire(id);
        debug!(?id, "object added");
        id
    }

    fn wire(&mut self, id: ObjectId) {
        let Some(object) = self.objects.get(id) else {
            return;
        };
        match &object.shape {
            Shape::Surface(s) => {
                for point in s.surface.serialize_points() {
                    self.events.subscribe(Source::Point(point), EventKind::Moved, id);
                }
            }
            Shape::Gregory(g) => {
                for &source in &g.sources {
                    self.events.subscribe_all(Source::Object(source), id);
                }
            }
            Shape::Overlay(o) => self.events.subscribe_all(Source::Object(o.source), id),
            _ => {}
        }
    }

    /// Add a free control point.
    pub fn add_point(&mut self, position: Point3) -> ObjectId {
        let point = self.points.insert(position);
        let name = self.next_name("Point");
        self.add_object(name, Shape::Point(point))
    }

    /// Add a surface whose points already live in this document.
    pub fn add_surface(&mut self, surface: BicubicSurface) -> ObjectId {
        let name = self.next_name("Surface");
        self.add_object(name, Shape::Surface(PatchSurface { surface, trim: None }))
    }

    /// Build a surface template into the document.
    pub fn add_template(&mut self, template: &SurfaceTemplate) -> Result<ObjectId> {
        let surface = template.build(&mut self.points)?;
        Ok(self.add_surface(surface))
    }

    /// Add a torus.
    pub fn add_torus(&mut self, torus: TorusSurface) -> ObjectId {
        let name = self.next_name("Torus");
        self.add_object(name, Shape::Torus(TorusObject { torus, trim: None }))
    }

    /// Insert a control point without a point object, for surfaces.
    pub fn insert_point(&mut self, position: Point3) -> PointId {
        self.points.insert(position)
    }

    /// Build a bicubic surface over existing control points.
    pub fn add_bicubic(
        &mut self,
        kind: PatchKind,
        patches_x: usize,
        patches_y: usize,
        points: Vec<PointId>,
        wrap: (bool, bool),
    ) -> Result<ObjectId> {
        let surface = BicubicSurface::new(kind, patches_x, patches_y, points, wrap, &mut self.points)?;
        Ok(self.add_surface(surface))
    }

    /// Add the 4×4 Bézier base plate `(-6 + 4x, 0, -6 + 4y)` used as the
    /// floor of a milled model.
    pub fn prepare_milling_base(&mut self) -> Result<ObjectId> {
        let ids: Vec<PointId> = (0..16)
            .map(|i| {
                let (x, y) = ((i % 4) as f64, (i / 4) as f64);
                self.insert_point(Point3::new(-6.0 + 4.0 * x, 0.0, -6.0 + 4.0 * y))
            })
            .collect();
        let surface = BicubicSurface::new(PatchKind::Bezier, 1, 1, ids, (false, false), &mut self.points)?;
        Ok(self.add_object("Base", Shape::Surface(PatchSurface { surface, trim: None })))
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Add an object to the selection.
    pub fn select(&mut self, id: ObjectId) -> Result<()> {
        if !self.objects.contains_key(id) {
            return Err(DocumentError::UnknownObject(id));
        }
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
        Ok(())
    }

    /// Remove an object from the selection.
    pub fn deselect(&mut self, id: ObjectId) {
        self.selection.retain(|s| *s != id);
    }

    /// Empty the selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected objects in selection order.
    pub fn selected(&self) -> &[ObjectId] {
        &self.selection
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Move a control point by `offset`.
    pub fn move_point(&mut self, point: PointId, offset: Vec3) -> Result<()> {
        self.points.translate(point, offset)?;
        self.events.notify(Source::Point(point), EventKind::Moved);
        Ok(())
    }

    /// Apply a transform to a control point.
    pub fn transform_point(&mut self, point: PointId, t: &Transform) -> Result<()> {
        self.points.transform(point, t)?;
        self.events.notify(Source::Point(point), EventKind::Moved);
        Ok(())
    }

    /// Apply a transform to a torus.
    pub fn transform_torus(&mut self, id: ObjectId, t: &Transform) -> Result<()> {
        match self.objects.get_mut(id).map(|o| &mut o.shape) {
            Some(Shape::Torus(object)) => object.torus = object.torus.transform(t),
            Some(_) => {
                return Err(DocumentError::WrongKind {
                    id,
                    expected: "torus",
                })
            }
            None => return Err(DocumentError::UnknownObject(id)),
        }
        self.events.notify(Source::Object(id), EventKind::Changed);
        Ok(())
    }

    /// Apply a transform to every selected point, surface and torus.
    ///
    /// Control points shared by several selected surfaces move once.
    /// Returns the number of control points moved.
    pub fn transform_selection(&mut self, t: &Transform) -> Result<usize> {
        let mut points: Vec<PointId> = Vec::new();
        let mut tori = Vec::new();
        for &id in &self.selection {
            match &self.objects.get(id).ok_or(DocumentError::UnknownObject(id))?.shape {
                Shape::Point(point) => points.push(*point),
                Shape::Surface(s) => points.extend(s.surface.serialize_points()),
                Shape::Torus(_) => tori.push(id),
                _ => {}
            }
        }
        points.sort_unstable();
        points.dedup();

        for &point in &points {
            self.transform_point(point, t)?;
        }
        for id in tori {
            self.transform_torus(id, t)?;
        }
        debug!(points = points.len(), "selection transformed");
        Ok(points.len())
    }

    /// Rotate the selection by `angle` radians about `axis` through `pivot`.
    pub fn rotate_selection(&mut self, pivot: Point3, axis: Vec3, angle: f64) -> Result<usize> {
        let t = Transform::rotation(&Dir3::new_normalize(axis), angle).about(&pivot);
        self.transform_selection(&t)
    }

    /// Scale the selection uniformly about `pivot`.
    pub fn scale_selection(&mut self, pivot: Point3, factor: f64) -> Result<usize> {
        let t = Transform::scale(factor, factor, factor).about(&pivot);
        self.transform_selection(&t)
    }

    /// Replace two control points by one at their midpoint.
    ///
    /// Every surface referencing either point is rewired to the merged
    /// point, and free point objects for them are replaced by one object.
    pub fn merge_points(&mut self, a: PointId, b: PointId) -> Result<PointId> {
        let pa = self.points.position(a).ok_or(TopoError::UnknownPoint(a))?;
        let pb = self.points.position(b).ok_or(TopoError::UnknownPoint(b))?;
        if a == b {
            return Ok(a);
        }
        let merged = self.points.insert(Point3::from((pa.coords + pb.coords) / 2.0));

        let owners: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, o)| matches!(&o.shape, Shape::Surface(s) if s.surface.contains_point(a) || s.surface.contains_point(b)))
            .map(|(id, _)| id)
            .collect();
        for &id in &owners {
            if let Some(Shape::Surface(s)) = self.objects.get_mut(id).map(|o| &mut o.shape) {
                s.surface.replace_point(a, merged, &mut self.points)?;
                s.surface.replace_point(b, merged, &mut self.points)?;
            }
            self.events.subscribe(Source::Point(merged), EventKind::Moved, id);
            self.events.notify(Source::Object(id), EventKind::TopologyChanged);
        }

        // Gap fills address hole corners by point id.
        let mut fills = 0;
        for object in self.objects.values_mut() {
            if let Shape::Gregory(g) = &mut object.shape {
                for vertex in g.gap.vertices.iter_mut().filter(|v| **v == a || **v == b) {
                    *vertex = merged;
                    fills += 1;
                }
            }
        }

        let free: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, o)| matches!(o.shape, Shape::Point(p) if p == a || p == b))
            .map(|(id, _)| id)
            .collect();
        for &id in &free {
            self.objects.remove(id);
            self.selection.retain(|s| *s != id);
        }
        if !free.is_empty() {
            let name = self.next_name("Point");
            self.add_object(name, Shape::Point(merged));
        }

        for old in [a, b] {
            self.events.forget_source(Source::Point(old));
            self.points.remove(old)?;
        }
        info!(surfaces = owners.len(), fills, "points merged");
        Ok(merged)
    }

    fn point_in_use(&self, point: PointId) -> bool {
        self.objects.values().any(|o| match &o.shape {
            Shape::Point(p) => *p == point,
            Shape::Surface(s) => s.surface.contains_point(point),
            _ => false,
        })
    }

    /// Remove an object.
    ///
    /// A point still owned by a surface cannot be removed. Removing a
    /// surface releases its points; points nothing else uses are dropped.
    /// Dependents are disposed on the next [`integrate`](Self::integrate).
    pub fn remove_object(&mut self, id: ObjectId) -> Result<()> {
        let object = self.objects.get(id).ok_or(DocumentError::UnknownObject(id))?;
        let mut released = Vec::new();
        match &object.shape {
            Shape::Point(point) => {
                let point = *point;
                self.points.remove(point)?;
                self.events.forget_source(Source::Point(point));
            }
            Shape::Surface(s) => {
                s.surface.release(&mut self.points)?;
                released = s.surface.serialize_points();
            }
            _ => {}
        }
        self.objects.remove(id);
        self.selection.retain(|s| *s != id);

        released.sort();
        released.dedup();
        for point in released {
            if !self.points.contains(point) {
                continue;
            }
            if self.point_in_use(point) {
                let shared = self.objects.values().any(|o| matches!(&o.shape, Shape::Surface(s) if s.surface.contains_point(point)));
                self.points.set_deletable(point, !shared)?;
            } else {
                self.points.remove(point)?;
                self.events.forget_source(Source::Point(point));
            }
        }

        self.events.notify(Source::Object(id), EventKind::Deleted);
        self.events.forget_source(Source::Object(id));
        self.events.unsubscribe_all(id);
        debug!(?id, "object removed");
        Ok(())
    }

    // =========================================================================
    // Derived objects
    // =========================================================================

    /// Differentiable view of a surface or torus object.
    pub fn surface_of(&self, id: ObjectId) -> Result<&dyn Surface> {
        let object = self.objects.get(id).ok_or(DocumentError::UnknownObject(id))?;
        match &object.shape {
            Shape::Surface(s) => s
                .surface
                .geometry()
                .map(|g| g as &dyn Surface)
                .ok_or(DocumentError::NotReady(id)),
            Shape::Torus(t) => Ok(&t.torus),
            _ => Err(DocumentError::WrongKind {
                id,
                expected: "surface",
            }),
        }
    }

    fn collect_patches(&self, sources: &[ObjectId]) -> Option<Vec<SurfacePatch>> {
        let mut patches = Vec::new();
        for &id in sources {
            match self.objects.get(id).map(|o| &o.shape) {
                Some(Shape::Surface(s)) => patches.extend(s.surface.patches()),
                _ => return None,
            }
        }
        Some(patches)
    }

    /// Fill every triangular gap between the selected Bézier surfaces.
    ///
    /// Patches are gathered in selection order. Returns the new Gregory
    /// objects, which follow later changes of their source surfaces.
    pub fn fill_gaps(&mut self) -> Result<Vec<ObjectId>> {
        let sources: Vec<ObjectId> = self
            .selection
            .iter()
            .copied()
            .filter(|&id| {
                matches!(self.objects.get(id).map(|o| &o.shape),
                    Some(Shape::Surface(s)) if s.surface.kind() == PatchKind::Bezier)
            })
            .collect();
        let patches = self.collect_patches(&sources).unwrap_or_default();

        let mut created = Vec::new();
        for gap in find_gaps(&patches) {
            let fill = GregoryFill::build(&gap, &patches, &self.points)?;
            let name = self.next_name("Gregory");
            let shape = Shape::Gregory(GregoryObject {
                sources: sources.clone(),
                gap,
                fill: Some(fill),
            });
            created.push(self.add_object(name, shape));
        }
        info!(sources = sources.len(), fills = created.len(), "gaps filled");
        Ok(created)
    }

    /// Trace the intersection of the two selected surfaces.
    ///
    /// `hint` seeds the search near a cursor position. On success two
    /// debug markers and a curve object are added; with `trim` the curve
    /// is also drawn into both trimming rasters. `Ok(None)` means no
    /// intersection was found.
    pub fn intersect_selected(
        &mut self,
        settings: &TraceSettings,
        hint: Option<Point3>,
        trim: bool,
    ) -> Result<Option<ObjectId>> {
        let candidates: Vec<ObjectId> = self
            .selection
            .iter()
            .copied()
            .filter(|&id| self.surface_of(id).is_ok())
            .collect();
        let &[a, b] = candidates.as_slice() else {
            return Err(DocumentError::Selection {
                expected: 2,
                found: candidates.len(),
            });
        };

        let Some(found) = trace(self.surface_of(a)?, self.surface_of(b)?, settings, hint) else {
            return Ok(None);
        };

        for marker in [found.seed.point1, found.seed.point2] {
            let name = self.next_name("Debug point");
            self.add_object(name, Shape::DebugPoint(marker));
        }

        let (points, params1, params2) = join(&found);
        if trim {
            self.trim_domain_mut(a)?.trim_curve(&params1);
            self.trim_domain_mut(b)?.trim_curve(&params2);
        }
        let curve = InterpolatingCurve::through(&points);
        let name = self.next_name("Intersection");
        let id = self.add_object(
            name,
            Shape::Curve(CurveObject {
                surfaces: [a, b],
                points,
                params: [params1, params2],
                curve,
            }),
        );
        Ok(Some(id))
    }

    /// Attach a derivative overlay to a surface or torus.
    pub fn add_overlay(&mut self, source: ObjectId) -> Result<ObjectId> {
        let overlay = DerivativeOverlay::build(self.surface_of(source)?, &self.settings.overlay);
        let name = self.next_name("Overlay");
        Ok(self.add_object(name, Shape::Overlay(OverlayObject { source, overlay })))
    }

    // =========================================================================
    // Trimming
    // =========================================================================

    /// Trimming raster of an object, if one was created.
    pub fn trim_domain(&self, id: ObjectId) -> Option<&TrimDomain> {
        match &self.objects.get(id)?.shape {
            Shape::Surface(s) => s.trim.as_ref(),
            Shape::Torus(t) => t.trim.as_ref(),
            _ => None,
        }
    }

    fn trim_domain_mut(&mut self, id: ObjectId) -> Result<&mut TrimDomain> {
        let settings = self.settings.trim;
        let object = self.objects.get_mut(id).ok_or(DocumentError::UnknownObject(id))?;
        let (slot, range, wrap) = match &mut object.shape {
            Shape::Surface(s) => (&mut s.trim, ((0.0, 1.0), (0.0, 1.0)), s.surface.wrap()),
            Shape::Torus(t) => (&mut t.trim, t.torus.domain(), (true, true)),
            _ => {
                return Err(DocumentError::WrongKind {
                    id,
                    expected: "surface",
                })
            }
        };
        let domain = match slot.take() {
            Some(domain) => domain,
            None => TrimDomain::from_settings(&settings)?
                .with_range(range.0, range.1)?
                .with_wrap(wrap.0, wrap.1),
        };
        Ok(slot.insert(domain))
    }

    /// Toggle the trimmed region of `id` containing parameter `(u, v)`.
    /// Returns the number of toggled pixels.
    pub fn trim_at(&mut self, id: ObjectId, u: f64, v: f64) -> Result<usize> {
        Ok(self.trim_domain_mut(id)?.trim(u, v))
    }

    // =========================================================================
    // Milling
    // =========================================================================

    /// Bake the given surfaces into a heightmap.
    ///
    /// Regions hidden by an object's trimming raster carry no material.
    pub fn bake_heightmap(&self, ids: &[ObjectId]) -> Result<HeightMap> {
        let targets = ids
            .iter()
            .map(|&id| Ok(BakeTarget::new(self.surface_of(id)?).trimmed(self.trim_domain(id))))
            .collect::<Result<Vec<_>>>()?;
        Ok(HeightMap::bake(&targets, &self.settings.bake)?)
    }

    /// Roughing path for the given surfaces with the configured cutter.
    pub fn roughing_path(&self, ids: &[ObjectId]) -> Result<ToolPath> {
        let map = self.bake_heightmap(ids)?;
        Ok(rough(&map, &self.settings.cutter, &self.settings.roughing)?)
    }

    /// Finishing path for the given surfaces with the configured cutter.
    pub fn finishing_path(&self, ids: &[ObjectId]) -> Result<ToolPath> {
        let map = self.bake_heightmap(ids)?;
        Ok(finish(&map, &self.settings.cutter, &self.settings.roughing)?)
    }

    // =========================================================================
    // Integration
    // =========================================================================

    /// Whether events are waiting for [`integrate`](Self::integrate).
    pub fn has_pending(&self) -> bool {
        self.events.has_pending()
    }

    /// Recompute every dependent queued since the last call.
    ///
    /// Surfaces re-resolve their points and notify their own dependents,
    /// which are handled in the same call. Dependents of deleted sources
    /// are removed. Returns the number of objects processed.
    pub fn integrate(&mut self) -> usize {
        let mut processed = 0;
        while self.events.has_pending() {
            let mut batch: Vec<(ObjectId, bool)> = Vec::new();
            for (dependent, kind) in self.events.drain() {
                let deleted = kind == EventKind::Deleted;
                match batch.iter_mut().find(|(d, _)| *d == dependent) {
                    Some(entry) => entry.1 |= deleted,
                    None => batch.push((dependent, deleted)),
                }
            }
            for (id, deleted) in batch {
                if !self.objects.contains_key(id) {
                    continue;
                }
                processed += 1;
                if deleted {
                    if let Err(err) = self.remove_object(id) {
                        warn!(?id, %err, "could not dispose dependent");
                    }
                } else {
                    self.recompute(id);
                }
            }
        }
        if processed > 0 {
            debug!(processed, "document integrated");
        }
        processed
    }

    fn recompute(&mut self, id: ObjectId) {
        let work = match self.objects.get(id).map(|o| &o.shape) {
            Some(Shape::Surface(_)) => Recompute::Surface,
            Some(Shape::Gregory(g)) => Recompute::Gregory(g.sources.clone(), g.gap),
            Some(Shape::Overlay(o)) => Recompute::Overlay(o.source),
            _ => Recompute::Nothing,
        };
        match work {
            Recompute::Surface => {
                if let Some(Shape::Surface(s)) = self.objects.get_mut(id).map(|o| &mut o.shape) {
                    s.surface.rebuild(&self.points);
                }
                self.events.notify(Source::Object(id), EventKind::Changed);
            }
            Recompute::Gregory(sources, gap) => {
                let fill = self
                    .collect_patches(&sources)
                    .and_then(|patches| match GregoryFill::build(&gap, &patches, &self.points) {
                        Ok(fill) => Some(fill),
                        Err(err) => {
                            warn!(?id, %err, "gap fill could not be rebuilt");
                            None
                        }
                    });
                if let Some(Shape::Gregory(g)) = self.objects.get_mut(id).map(|o| &mut o.shape) {
                    g.fill = fill;
                }
            }
            Recompute::Overlay(source) => {
                let overlay = match self.surface_of(source) {
                    Ok(surface) => DerivativeOverlay::build(surface, &self.settings.overlay),
                    Err(_) => DerivativeOverlay::default(),
                };
                if let Some(Shape::Overlay(o)) = self.objects.get_mut(id).map(|o| &mut o.shape) {
                    o.overlay = overlay;
                }
            }
            Recompute::Nothing => {}
        }
    }
}

/// Concatenate both traces into one polyline running backward to forward.
fn join(found: &Intersection) -> (Vec<Point3>, Vec<Point2>, Vec<Point2>) {
    let (back, fwd) = (&found.backward, &found.forward);
    let points = back.points.iter().rev().chain(fwd.points.iter().skip(1)).copied().collect();
    let params1 = back.params1.iter().rev().chain(fwd.params1.iter().skip(1)).copied().collect();
    let params2 = back.params2.iter().rev().chain(fwd.params2.iter().skip(1)).copied().collect();
    (points, params1, params2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwork_spline::BuildMode;

    fn grid(doc: &mut Document) -> ObjectId {
        let template = SurfaceTemplate::new(PatchKind::Bezier, BuildMode::Grid, 2, 2);
        doc.add_template(&template).unwrap()
    }

    fn surface(doc: &Document, id: ObjectId) -> &BicubicSurface {
        match &doc.get(id).unwrap().shape {
            Shape::Surface(s) => &s.surface,
            other => panic!("not a surface: {other:?}"),
        }
    }

    #[test]
    fn test_selection_order() {
        let mut doc = Document::new();
        let a = doc.add_point(Point3::origin());
        let b = doc.add_point(Point3::new(1.0, 0.0, 0.0));
        doc.select(b).unwrap();
        doc.select(a).unwrap();
        doc.select(b).unwrap();
        assert_eq!(doc.selected(), &[b, a]);
        doc.deselect(b);
        assert_eq!(doc.selected(), &[a]);
        doc.remove_object(a).unwrap();
        assert!(doc.selected().is_empty());
        assert!(matches!(doc.select(a), Err(DocumentError::UnknownObject(_))));
    }

    #[test]
    fn test_move_point_rebuilds_on_integrate() {
        let mut doc = Document::new();
        let id = grid(&mut doc);
        let corner = surface(&doc, id).serialize_points()[0];
        let before = surface(&doc, id).geometry().unwrap().evaluate(Point2::new(0.0, 0.0));

        doc.move_point(corner, Vec3::new(0.0, 1.0, 0.0)).unwrap();
        doc.move_point(corner, Vec3::new(0.0, 1.0, 0.0)).unwrap();
        let unchanged = surface(&doc, id).geometry().unwrap().evaluate(Point2::new(0.0, 0.0));
        assert_eq!(before, unchanged);

        assert_eq!(doc.integrate(), 1);
        let after = surface(&doc, id).geometry().unwrap().evaluate(Point2::new(0.0, 0.0));
        assert!((after.y - before.y - 2.0).abs() < 1e-12);
        assert!(!doc.has_pending());
    }

    #[test]
    fn test_surface_points_are_protected() {
        let mut doc = Document::new();
        let id = grid(&mut doc);
        let point = surface(&doc, id).serialize_points()[4];
        assert_eq!(doc.points().len(), 49);

        let free = doc.add_point(Point3::origin());
        let Shape::Point(free_point) = doc.get(free).unwrap().shape else {
            unreachable!()
        };
        let merged = doc.merge_points(free_point, point).unwrap();
        assert!(surface(&doc, id).contains_point(merged));
        assert!(!doc.points().contains(point));
        assert_eq!(doc.points().len(), 49);

        let handle = doc
            .iter()
            .find(|(_, o)| matches!(o.shape, Shape::Point(p) if p == merged))
            .map(|(id, _)| id)
            .unwrap();
        assert!(matches!(
            doc.remove_object(handle),
            Err(DocumentError::Topo(TopoError::PointInUse(_)))
        ));

        doc.remove_object(id).unwrap();
        assert_eq!(doc.points().len(), 1);
        doc.remove_object(handle).unwrap();
        assert!(doc.points().is_empty());
    }

    #[test]
    fn test_overlay_follows_and_dies_with_source() {
        let mut doc = Document::new();
        let id = grid(&mut doc);
        let overlay = doc.add_overlay(id).unwrap();
        let segments = |doc: &Document| match &doc.get(overlay).unwrap().shape {
            Shape::Overlay(o) => o.overlay.segments().to_vec(),
            _ => unreachable!(),
        };
        let before = segments(&doc);
        assert!(!before.is_empty());

        let point = surface(&doc, id).serialize_points()[8];
        doc.move_point(point, Vec3::new(0.0, 0.5, 0.0)).unwrap();
        assert_eq!(doc.integrate(), 2);
        assert_ne!(segments(&doc), before);

        doc.remove_object(id).unwrap();
        doc.integrate();
        assert!(doc.get(overlay).is_none());
    }

    #[test]
    fn test_torus_transform_refreshes_overlay() {
        let mut doc = Document::new();
        let torus = doc.add_torus(TorusSurface::new(2.0, 0.5));
        let overlay = doc.add_overlay(torus).unwrap();
        doc.transform_torus(torus, &Transform::translation(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(doc.integrate(), 1);
        let Shape::Overlay(o) = &doc.get(overlay).unwrap().shape else {
            unreachable!()
        };
        assert!(o.overlay.segments().iter().all(|s| s.start.z >= 0.5 - 1e-9));
        assert!(matches!(
            doc.transform_torus(overlay, &Transform::identity()),
            Err(DocumentError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_trim_at_creates_raster() {
        let mut doc = Document::new();
        let base = doc.prepare_milling_base().unwrap();
        assert!(doc.trim_domain(base).is_none());
        let toggled = doc.trim_at(base, 0.5, 0.5).unwrap();
        assert_eq!(toggled, 512 * 512);
        assert!(!doc.trim_domain(base).unwrap().is_visible(0.25, 0.75));
        let point = doc.add_point(Point3::origin());
        assert!(doc.trim_at(point, 0.5, 0.5).is_err());
    }

    #[test]
    fn test_rotate_selection_moves_shared_points_once() {
        let mut doc = Document::new();
        let patch = grid(&mut doc);
        let corner = surface(&doc, patch).serialize_points()[0];
        let before = doc.points().position(corner).unwrap();
        let loose = doc.add_point(Point3::new(1.0, 0.0, 0.0));
        let torus = doc.add_torus(TorusSurface::new(2.0, 0.5));
        doc.select(patch).unwrap();
        doc.select(loose).unwrap();
        doc.select(torus).unwrap();

        let moved = doc.rotate_selection(Point3::origin(), Vec3::y(), std::f64::consts::FRAC_PI_2).unwrap();
        assert_eq!(moved, doc.points().len());

        let after = doc.points().position(corner).unwrap();
        assert!((after - Point3::new(before.z, before.y, -before.x)).norm() < 1e-12);
        let Shape::Point(id) = doc.get(loose).unwrap().shape else {
            unreachable!()
        };
        assert!((doc.points().position(id).unwrap() - Point3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
        let Shape::Torus(t) = &doc.get(torus).unwrap().shape else {
            unreachable!()
        };
        assert!((t.torus.axis.as_ref() - Vec3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
        assert!(doc.has_pending());
    }

    #[test]
    fn test_scale_selection_about_pivot() {
        let mut doc = Document::new();
        let a = doc.add_point(Point3::new(2.0, 1.0, 0.0));
        doc.select(a).unwrap();
        doc.scale_selection(Point3::new(1.0, 1.0, 0.0), 3.0).unwrap();
        let Shape::Point(id) = doc.get(a).unwrap().shape else {
            unreachable!()
        };
        assert!((doc.points().position(id).unwrap() - Point3::new(4.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_bake_respects_trim() {
        let mut doc = Document::new();
        doc.settings_mut().bake = patchwork_mill::BakeSettings {
            samples: 128,
            resolution: 64,
            ..Default::default()
        };
        let torus = doc.add_torus(TorusSurface::with_axis(Point3::origin(), Vec3::y(), 3.0, 1.0));
        let before = doc.bake_heightmap(&[torus]).unwrap();
        assert!(before.max_height() > 0.9);

        doc.trim_at(torus, 1.0, 1.0).unwrap();
        let after = doc.bake_heightmap(&[torus]).unwrap();
        assert_eq!(after.max_height(), after.base);
        assert!(after.heights.iter().all(|&h| h == after.base));
    }

    #[test]
    fn test_intersect_needs_two_surfaces() {
        let mut doc = Document::new();
        let base = doc.prepare_milling_base().unwrap();
        doc.select(base).unwrap();
        let result = doc.intersect_selected(&TraceSettings::default(), None, false);
        assert!(matches!(
            result,
            Err(DocumentError::Selection { expected: 2, found: 1 })
        ));
    }
}
