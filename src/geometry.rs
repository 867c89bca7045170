//! Geometry subsystem: claim footprints, the `SpatialBackend` trait, grid and
//! flat backends, and the `GeometryIndex` that maps columns to claims.
//!
//! The index is the sole authority for "which claim covers this column" and
//! "which claims overlap this rectangle". Footprints are decomposed into
//! inclusive rectangles (row runs for explicit column sets) and stored per
//! world in a backend. The backend only knows slots and rectangles; the
//! index owns the slot → claim mapping.

use crate::error::{ClaimError, Result};
use crate::types::{BoundedArea, ClaimId, Column, Rect, WorldId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap};

/// Largest rectangle footprint that may be expanded into an explicit column
/// set when columns are carved out of it.
pub const MAX_EXPLICIT_COLUMNS: u64 = 1 << 20;

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Explicit `(x, z)` pairs.
    Columns(BTreeSet<(i32, i32)>),
    /// Every column of an inclusive rectangle.
    Rect(Rect),
    /// Disjoint rectangles, left behind when columns are carved out of a
    /// rectangle too large to expand into explicit columns.
    Rects(Vec<Rect>),
}

/// The set of columns a claim covers. Always within a single world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    pub world: WorldId,
    pub shape: Shape,
}

impl Footprint {
    /// Footprint made of the given columns. They must share one world.
    pub fn from_columns<I>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = Column>,
    {
        let mut world: Option<WorldId> = None;
        let mut set = BTreeSet::new();
        for c in columns {
            match &world {
                None => world = Some(c.world.clone()),
                Some(w) if *w != c.world => {
                    return Err(ClaimError::Validation(format!(
                        "footprint spans worlds '{}' and '{}'",
                        w, c.world
                    )));
                }
                Some(_) => {}
            }
            set.insert((c.x, c.z));
        }
        let world = world
            .ok_or_else(|| ClaimError::Validation("footprint has no columns".into()))?;
        Ok(Self {
            world,
            shape: Shape::Columns(set),
        })
    }

    pub fn single(column: Column) -> Self {
        let mut set = BTreeSet::new();
        set.insert((column.x, column.z));
        Self {
            world: column.world,
            shape: Shape::Columns(set),
        }
    }

    pub fn rect(area: &BoundedArea) -> Self {
        Self {
            world: area.world.clone(),
            shape: Shape::Rect(area.rect()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.shape {
            Shape::Columns(set) => set.is_empty(),
            Shape::Rect(_) => false,
            Shape::Rects(rects) => rects.is_empty(),
        }
    }

    /// Covered columns, saturating at `u64::MAX`.
    pub fn column_count(&self) -> u64 {
        match &self.shape {
            Shape::Columns(set) => set.len() as u64,
            Shape::Rect(r) => r.area(),
            Shape::Rects(rects) => rects
                .iter()
                .fold(0u64, |n, r| n.saturating_add(r.area())),
        }
    }

    pub fn contains(&self, column: &Column) -> bool {
        if column.world != self.world {
            return false;
        }
        match &self.shape {
            Shape::Columns(set) => set.contains(&(column.x, column.z)),
            Shape::Rect(r) => r.contains(column.x, column.z),
            Shape::Rects(rects) => rects.iter().any(|r| r.contains(column.x, column.z)),
        }
    }

    /// Minimal bounding rectangle, `None` when empty.
    pub fn bounds(&self) -> Option<Rect> {
        match &self.shape {
            Shape::Columns(set) => set
                .iter()
                .map(|&(x, z)| Rect::point(x, z))
                .reduce(|a, b| a.union(&b)),
            Shape::Rect(r) => Some(*r),
            Shape::Rects(rects) => rects.iter().copied().reduce(|a, b| a.union(&b)),
        }
    }

    /// All covered columns.
    pub fn columns(&self) -> Box<dyn Iterator<Item = Column> + '_> {
        let world = &self.world;
        let at = move |(x, z): (i32, i32)| Column {
            world: world.clone(),
            x,
            z,
        };
        match &self.shape {
            Shape::Columns(set) => Box::new(set.iter().copied().map(at)),
            Shape::Rect(r) => Box::new(r.cells().map(at)),
            Shape::Rects(rects) => Box::new(rects.iter().flat_map(|r| r.cells()).map(at)),
        }
    }

    /// Decompose into disjoint rectangles. Explicit sets become row runs, so
    /// a solid block of columns costs one slot per row rather than per column.
    pub fn rects(&self) -> Vec<Rect> {
        match &self.shape {
            Shape::Rect(r) => vec![*r],
            Shape::Rects(rects) => rects.clone(),
            Shape::Columns(set) => {
                let mut cells: Vec<(i32, i32)> = set.iter().map(|&(x, z)| (z, x)).collect();
                cells.sort_unstable();

                let mut out: Vec<Rect> = Vec::new();
                for (z, x) in cells {
                    match out.last_mut() {
                        Some(run) if run.min_z == z && run.max_x.checked_add(1) == Some(x) => {
                            run.max_x = x;
                        }
                        _ => out.push(Rect::point(x, z)),
                    }
                }
                out
            }
        }
    }

    /// Add columns of the same world. Rectangles that already cover every new
    /// column stay rectangles; otherwise the footprint becomes explicit, or a
    /// rectangle list when it is too large for that.
    pub fn add_columns<I>(&mut self, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = Column>,
    {
        let added: Vec<Column> = columns.into_iter().collect();
        if let Some(c) = added.iter().find(|c| c.world != self.world) {
            return Err(ClaimError::Validation(format!(
                "column {} is outside footprint world '{}'",
                c, self.world
            )));
        }
        let fresh: BTreeSet<(i32, i32)> = added
            .iter()
            .filter(|c| !self.contains(c))
            .map(|c| (c.x, c.z))
            .collect();
        if fresh.is_empty() {
            return Ok(());
        }
        self.make_mutable();
        match &mut self.shape {
            Shape::Columns(set) => set.extend(fresh),
            Shape::Rects(rects) => {
                rects.extend(fresh.into_iter().map(|(x, z)| Rect::point(x, z)));
            }
            Shape::Rect(_) => {}
        }
        Ok(())
    }

    /// Remove columns. Returns how many were actually covered.
    ///
    /// Small rectangles turn into explicit column sets; larger ones are split
    /// into disjoint rectangles around each removed column.
    pub fn remove_columns<'a, I>(&mut self, columns: I) -> usize
    where
        I: IntoIterator<Item = &'a Column>,
    {
        let hits: Vec<(i32, i32)> = columns
            .into_iter()
            .filter(|c| self.contains(c))
            .map(|c| (c.x, c.z))
            .collect();
        if hits.is_empty() {
            return 0;
        }
        self.make_mutable();
        match &mut self.shape {
            Shape::Columns(set) => hits.iter().filter(|&&k| set.remove(&k)).count(),
            Shape::Rects(rects) => {
                let mut removed = 0;
                for (x, z) in hits {
                    if let Some(i) = rects.iter().position(|r| r.contains(x, z)) {
                        let r = rects.swap_remove(i);
                        rects.extend(r.without(x, z));
                        removed += 1;
                    }
                }
                removed
            }
            Shape::Rect(_) => 0,
        }
    }

    /// Turn a single rectangle into a shape that can gain or lose columns:
    /// explicit columns when small enough, a rectangle list otherwise.
    fn make_mutable(&mut self) {
        if let Shape::Rect(r) = self.shape {
            self.shape = if r.area() <= MAX_EXPLICIT_COLUMNS {
                Shape::Columns(r.cells().collect())
            } else {
                Shape::Rects(vec![r])
            };
        }
    }
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Spatial structure over integer rectangles, addressed by slot.
///
/// Backends never see claim ids; [`GeometryIndex`] maps slots to claims.
pub trait SpatialBackend {
    /// Store `rect` under a slot that is currently vacant.
    fn insert(&mut self, slot: usize, rect: Rect);

    /// Drop a slot. Vacant slots are ignored.
    fn remove(&mut self, slot: usize);

    fn clear(&mut self);

    /// Visit every slot whose rectangle contains `(x, z)`.
    fn visit_point<F: FnMut(usize)>(&self, x: i32, z: i32, f: F);

    /// Visit every slot whose rectangle intersects `rect`, each once.
    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, f: F);
}

// ---------------------------------------------------------------------------
// Grid backend
// ---------------------------------------------------------------------------

/// Rectangles spanning more grid cells than this go to a side list that is
/// scanned linearly instead of being bucketed into every cell.
const OVERSIZED_CELLS: u64 = 1024;

/// Uniform hashed grid with a fixed cell size.
#[derive(Debug, Clone)]
pub struct GridBackend {
    cell_size: i32,
    cells: HashMap<(i32, i32), SmallVec<[usize; 8]>>,
    slots: Vec<Option<GridSlot>>,
    oversized: Vec<usize>,
}

#[derive(Debug, Clone)]
struct GridSlot {
    rect: Rect,
    span: CellSpan,
    oversized: bool,
}

/// Inclusive range of grid cells.
#[derive(Debug, Clone, Copy)]
struct CellSpan {
    min_x: i32,
    min_z: i32,
    max_x: i32,
    max_z: i32,
}

impl CellSpan {
    fn count(&self) -> u64 {
        Rect::new(self.min_x, self.min_z, self.max_x, self.max_z).area()
    }

    fn contains(&self, cx: i32, cz: i32) -> bool {
        self.min_x <= cx && cx <= self.max_x && self.min_z <= cz && cz <= self.max_z
    }
}

impl GridBackend {
    /// Create a grid whose cells are `cell_size` columns wide.
    pub fn new(cell_size: i32) -> Self {
        debug_assert!(cell_size > 0, "grid cell_size must be strictly positive");
        Self {
            cell_size: cell_size.max(1),
            cells: HashMap::new(),
            slots: Vec::new(),
            oversized: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    /// Number of non-empty grid cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    fn cell_coord(&self, v: i32) -> i32 {
        // Euclidean division floors toward -∞ for negative coordinates.
        v.div_euclid(self.cell_size)
    }

    fn span(&self, rect: Rect) -> CellSpan {
        CellSpan {
            min_x: self.cell_coord(rect.min_x),
            min_z: self.cell_coord(rect.min_z),
            max_x: self.cell_coord(rect.max_x),
            max_z: self.cell_coord(rect.max_z),
        }
    }

    fn slot(&self, slot: usize) -> Option<&GridSlot> {
        self.slots.get(slot).and_then(|s| s.as_ref())
    }

    /// Emit `slot` from cell `(cx, cz)` only if that cell is the first cell
    /// shared by the slot's span and the query span, so multi-cell slots are
    /// reported once without a scratch set.
    fn first_shared_cell(slot: &CellSpan, query: &CellSpan, cx: i32, cz: i32) -> bool {
        cx == slot.min_x.max(query.min_x) && cz == slot.min_z.max(query.min_z)
    }
}

impl Default for GridBackend {
    fn default() -> Self {
        Self::new(16)
    }
}

impl SpatialBackend for GridBackend {
    fn insert(&mut self, slot: usize, rect: Rect) {
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        debug_assert!(self.slots[slot].is_none(), "grid slot {} already occupied", slot);

        let span = self.span(rect);
        let oversized = span.count() > OVERSIZED_CELLS;
        if oversized {
            self.oversized.push(slot);
        } else {
            for cz in span.min_z..=span.max_z {
                for cx in span.min_x..=span.max_x {
                    self.cells.entry((cx, cz)).or_default().push(slot);
                }
            }
        }
        self.slots[slot] = Some(GridSlot {
            rect,
            span,
            oversized,
        });
    }

    fn remove(&mut self, slot: usize) {
        let Some(entry) = self.slots.get_mut(slot).and_then(Option::take) else {
            return;
        };
        if entry.oversized {
            self.oversized.retain(|&s| s != slot);
            return;
        }
        let span = entry.span;
        for cz in span.min_z..=span.max_z {
            for cx in span.min_x..=span.max_x {
                if let Some(cell) = self.cells.get_mut(&(cx, cz)) {
                    if let Some(pos) = cell.iter().position(|&s| s == slot) {
                        cell.swap_remove(pos);
                    }
                    if cell.is_empty() {
                        self.cells.remove(&(cx, cz));
                    }
                }
            }
        }
    }

    fn clear(&mut self) {
        self.cells.clear();
        self.slots.clear();
        self.oversized.clear();
    }

    fn visit_point<F: FnMut(usize)>(&self, x: i32, z: i32, mut f: F) {
        let key = (self.cell_coord(x), self.cell_coord(z));
        if let Some(cell) = self.cells.get(&key) {
            for &s in cell {
                if self.slot(s).is_some_and(|e| e.rect.contains(x, z)) {
                    f(s);
                }
            }
        }
        for &s in &self.oversized {
            if self.slot(s).is_some_and(|e| e.rect.contains(x, z)) {
                f(s);
            }
        }
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, mut f: F) {
        let query = self.span(rect);
        let mut emit = |cx: i32, cz: i32, bucket: &SmallVec<[usize; 8]>| {
            for &s in bucket {
                let Some(e) = self.slot(s) else { continue };
                if Self::first_shared_cell(&e.span, &query, cx, cz) && e.rect.intersects(&rect) {
                    f(s);
                }
            }
        };

        // A query wider than the populated part of the grid walks the
        // occupied cells instead of every cell in range.
        if query.count() > self.cells.len() as u64 {
            for (&(cx, cz), bucket) in &self.cells {
                if query.contains(cx, cz) {
                    emit(cx, cz, bucket);
                }
            }
        } else {
            for cz in query.min_z..=query.max_z {
                for cx in query.min_x..=query.max_x {
                    if let Some(bucket) = self.cells.get(&(cx, cz)) {
                        emit(cx, cz, bucket);
                    }
                }
            }
        }

        for &s in &self.oversized {
            if self.slot(s).is_some_and(|e| e.rect.intersects(&rect)) {
                f(s);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Flat backend
// ---------------------------------------------------------------------------

/// Linear scan over every slot. Small and obviously correct.
#[derive(Debug, Clone, Default)]
pub struct FlatBackend {
    slots: Vec<Option<Rect>>,
}

impl SpatialBackend for FlatBackend {
    fn insert(&mut self, slot: usize, rect: Rect) {
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        self.slots[slot] = Some(rect);
    }

    fn remove(&mut self, slot: usize) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = None;
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
    }

    fn visit_point<F: FnMut(usize)>(&self, x: i32, z: i32, mut f: F) {
        for (i, r) in self.slots.iter().enumerate() {
            if r.is_some_and(|r| r.contains(x, z)) {
                f(i);
            }
        }
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, mut f: F) {
        for (i, r) in self.slots.iter().enumerate() {
            if r.is_some_and(|r| r.intersects(&rect)) {
                f(i);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SlotEntry {
    claim: ClaimId,
    rect: Rect,
}

/// One backend per world.
#[derive(Debug, Clone)]
struct Layer<B> {
    backend: B,
    slots: Vec<Option<SlotEntry>>,
    free_list: Vec<usize>,
}

impl<B: SpatialBackend> Layer<B> {
    fn new(backend: B) -> Self {
        Self {
            backend,
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    fn insert(&mut self, claim: ClaimId, rect: Rect) -> usize {
        let entry = Some(SlotEntry { claim, rect });
        let slot = match self.free_list.pop() {
            Some(slot) => {
                self.slots[slot] = entry;
                slot
            }
            None => {
                self.slots.push(entry);
                self.slots.len() - 1
            }
        };
        self.backend.insert(slot, rect);
        slot
    }

    fn remove(&mut self, slot: usize) {
        if let Some(s) = self.slots.get_mut(slot) {
            if s.take().is_some() {
                self.backend.remove(slot);
                self.free_list.push(slot);
            }
        }
    }

    fn entry(&self, slot: usize) -> Option<&SlotEntry> {
        self.slots.get(slot).and_then(|s| s.as_ref())
    }

    /// First column of `rect` already covered by a claim other than `except`.
    fn first_conflict(&self, rect: Rect, except: Option<ClaimId>) -> Option<(ClaimId, Rect)> {
        let mut hit = None;
        self.backend.visit_rect(rect, |slot| {
            if hit.is_some() {
                return;
            }
            if let Some(e) = self.entry(slot) {
                if Some(e.claim) != except {
                    hit = e.rect.intersection(&rect).map(|i| (e.claim, i));
                }
            }
        });
        hit
    }
}

#[derive(Debug, Clone)]
struct ClaimSlots {
    world: WorldId,
    slots: Vec<usize>,
    columns: u128,
}

/// Maps claim footprints to claim ids. Footprints never overlap.
#[derive(Debug, Clone)]
pub struct GeometryIndex<B = GridBackend> {
    prototype: B,
    layers: HashMap<WorldId, Layer<B>>,
    claims: HashMap<ClaimId, ClaimSlots>,
    /// Wider than any single footprint so full-range claims in several
    /// worlds add up without overflow.
    columns: u128,
}

impl GeometryIndex<GridBackend> {
    /// Grid-backed index with the given bucket size.
    pub fn with_cell_size(cell_size: i32) -> Self {
        Self::with_backend(GridBackend::new(cell_size))
    }
}

impl Default for GeometryIndex<GridBackend> {
    fn default() -> Self {
        Self::with_backend(GridBackend::default())
    }
}

impl<B: SpatialBackend + Clone> GeometryIndex<B> {
    /// Index whose per-world layers are clones of an empty `prototype`.
    pub fn with_backend(mut prototype: B) -> Self {
        prototype.clear();
        Self {
            prototype,
            layers: HashMap::new(),
            claims: HashMap::new(),
            columns: 0,
        }
    }

    /// Number of indexed claims.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Total columns covered by every indexed claim, saturating at
    /// `u64::MAX`.
    pub fn indexed_columns(&self) -> u64 {
        u64::try_from(self.columns).unwrap_or(u64::MAX)
    }

    pub fn contains_claim(&self, id: ClaimId) -> bool {
        self.claims.contains_key(&id)
    }

    /// Index a new claim's footprint.
    ///
    /// Fails with [`ClaimError::Overlap`] if any column is already covered;
    /// nothing is committed in that case.
    pub fn insert(&mut self, id: ClaimId, footprint: &Footprint) -> Result<()> {
        if self.claims.contains_key(&id) {
            return Err(ClaimError::Validation(format!("{} is already indexed", id)));
        }
        let rects = self.check_free(id, footprint)?;
        self.commit(id, &footprint.world, rects);
        Ok(())
    }

    /// Atomically swap a claim's footprint. Columns the claim already covers
    /// do not count as conflicts.
    pub fn replace(&mut self, id: ClaimId, footprint: &Footprint) -> Result<()> {
        let rects = self.check_free(id, footprint)?;
        self.remove(id);
        self.commit(id, &footprint.world, rects);
        Ok(())
    }

    /// Drop a claim. Returns whether it was present; absent claims are a no-op.
    pub fn remove(&mut self, id: ClaimId) -> bool {
        let Some(entry) = self.claims.remove(&id) else {
            return false;
        };
        if let Some(layer) = self.layers.get_mut(&entry.world) {
            for slot in entry.slots {
                layer.remove(slot);
            }
        }
        self.columns -= entry.columns;
        true
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.claims.clear();
        self.columns = 0;
    }

    /// The claim covering `column`, if any.
    pub fn point_query(&self, column: &Column) -> Option<ClaimId> {
        let layer = self.layers.get(&column.world)?;
        let mut hit = None;
        layer.backend.visit_point(column.x, column.z, |slot| {
            if hit.is_none() {
                hit = layer.entry(slot).map(|e| e.claim);
            }
        });
        hit
    }

    /// Every claim with at least one column inside `area` (bounds inclusive),
    /// each once, in ascending id order.
    pub fn range_query(&self, area: &BoundedArea) -> impl ExactSizeIterator<Item = ClaimId> {
        let mut found = BTreeSet::new();
        if let Some(layer) = self.layers.get(&area.world) {
            layer.backend.visit_rect(area.rect(), |slot| {
                if let Some(e) = layer.entry(slot) {
                    found.insert(e.claim);
                }
            });
        }
        found.into_iter().collect::<Vec<_>>().into_iter()
    }

    fn check_free(&self, id: ClaimId, footprint: &Footprint) -> Result<Vec<Rect>> {
        if footprint.is_empty() {
            return Err(ClaimError::Validation(format!(
                "{} has an empty footprint",
                id
            )));
        }
        let rects = footprint.rects();
        if let Some(layer) = self.layers.get(&footprint.world) {
            for r in &rects {
                if let Some((existing, overlap)) = layer.first_conflict(*r, Some(id)) {
                    return Err(ClaimError::Overlap {
                        column: Column {
                            world: footprint.world.clone(),
                            x: overlap.min_x,
                            z: overlap.min_z,
                        },
                        existing,
                    });
                }
            }
        }
        Ok(rects)
    }

    fn commit(&mut self, id: ClaimId, world: &WorldId, rects: Vec<Rect>) {
        let layer = self
            .layers
            .entry(world.clone())
            .or_insert_with(|| Layer::new(self.prototype.clone()));
        let columns: u128 = rects.iter().map(|r| u128::from(r.area())).sum();
        let slots = rects.into_iter().map(|r| layer.insert(id, r)).collect();
        self.columns += columns;
        self.claims.insert(
            id,
            ClaimSlots {
                world: world.clone(),
                slots,
                columns,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_rect<B: SpatialBackend>(b: &B, r: Rect) -> Vec<usize> {
        let mut out = Vec::new();
        b.visit_rect(r, |s| out.push(s));
        out.sort_unstable();
        out
    }

    #[test]
    fn grid_reports_multi_cell_slot_once() {
        let mut g = GridBackend::new(4);
        g.insert(0, Rect::new(0, 0, 20, 20));
        assert_eq!(collect_rect(&g, Rect::new(-5, -5, 30, 30)), vec![0]);
        assert_eq!(collect_rect(&g, Rect::new(9, 9, 9, 9)), vec![0]);
    }

    #[test]
    fn grid_handles_negative_coordinates() {
        let mut g = GridBackend::new(16);
        g.insert(3, Rect::point(-1, -17));
        let mut hits = Vec::new();
        g.visit_point(-1, -17, |s| hits.push(s));
        assert_eq!(hits, vec![3]);
        hits.clear();
        g.visit_point(0, -17, |s| hits.push(s));
        assert!(hits.is_empty());
    }

    #[test]
    fn grid_remove_drops_empty_cells() {
        let mut g = GridBackend::new(8);
        g.insert(0, Rect::new(0, 0, 15, 15));
        assert_eq!(g.occupied_cells(), 4);
        g.remove(0);
        assert_eq!(g.occupied_cells(), 0);
        g.remove(0);
    }

    #[test]
    fn oversized_rects_bypass_buckets() {
        let mut g = GridBackend::new(1);
        g.insert(0, Rect::new(0, 0, 99, 99));
        assert_eq!(g.occupied_cells(), 0);
        assert_eq!(collect_rect(&g, Rect::point(50, 50)), vec![0]);
        g.remove(0);
        assert!(collect_rect(&g, Rect::point(50, 50)).is_empty());
    }

    #[test]
    fn full_range_query_walks_occupied_cells() {
        let mut g = GridBackend::new(16);
        g.insert(0, Rect::point(i32::MIN, i32::MIN));
        g.insert(1, Rect::point(i32::MAX, i32::MAX));
        let all = Rect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(collect_rect(&g, all), vec![0, 1]);
    }

    #[test]
    fn row_runs_merge_adjacent_columns() {
        let fp = Footprint::from_columns(
            [(0, 0), (1, 0), (2, 0), (5, 0), (0, 1)]
                .into_iter()
                .map(|(x, z)| Column::new("w", x, z)),
        )
        .unwrap();
        assert_eq!(
            fp.rects(),
            vec![Rect::new(0, 0, 2, 0), Rect::point(5, 0), Rect::point(0, 1)]
        );
    }

    #[test]
    fn carving_a_rect_makes_it_explicit() {
        let mut fp = Footprint::rect(&BoundedArea::new("w", 0, 0, 2, 2));
        let removed = fp.remove_columns(&[Column::new("w", 1, 1)]);
        assert_eq!(removed, 1);
        assert_eq!(fp.column_count(), 8);
        assert!(!fp.contains(&Column::new("w", 1, 1)));
        assert!(matches!(fp.shape, Shape::Columns(_)));
    }
}
