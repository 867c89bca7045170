//! GeometryIndex and backend tests

#[cfg(test)]
mod tests {
    use faction_claims::{
        geometry::{FlatBackend, Footprint, GeometryIndex, GridBackend, Shape, SpatialBackend},
        BoundedArea, ClaimError, ClaimId, Column, Rect,
    };
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn area(x1: i32, z1: i32, x2: i32, z2: i32) -> Footprint {
        Footprint::rect(&BoundedArea::new("world1", x1, z1, x2, z2))
    }

    fn col(x: i32, z: i32) -> Column {
        Column::new("world1", x, z)
    }

    // -----------------------------------------------------------------------
    // Footprints
    // -----------------------------------------------------------------------

    #[test]
    fn footprint_rejects_mixed_worlds() {
        let err = Footprint::from_columns([col(0, 0), Column::new("nether", 0, 0)]).unwrap_err();
        assert!(matches!(err, ClaimError::Validation(_)));
    }

    #[test]
    fn footprint_rejects_no_columns() {
        let err = Footprint::from_columns(Vec::<Column>::new()).unwrap_err();
        assert!(matches!(err, ClaimError::Validation(_)));
    }

    #[test]
    fn footprint_rows_become_runs() {
        let fp = Footprint::from_columns([col(0, 0), col(1, 0), col(2, 0), col(5, 0), col(0, 1)])
            .unwrap();
        assert_eq!(
            fp.rects(),
            vec![Rect::new(0, 0, 2, 0), Rect::point(5, 0), Rect::point(0, 1)]
        );
        assert_eq!(fp.column_count(), 5);
        assert_eq!(fp.bounds(), Some(Rect::new(0, 0, 5, 1)));
    }

    #[test]
    fn carving_a_rect_makes_it_explicit() {
        let mut fp = area(0, 0, 2, 2);
        assert_eq!(fp.remove_columns([&col(1, 1)]), 1);
        assert!(matches!(fp.shape, Shape::Columns(_)));
        assert_eq!(fp.column_count(), 8);
        assert!(!fp.contains(&col(1, 1)));
        assert!(fp.contains(&col(2, 2)));
    }

    #[test]
    fn removing_uncovered_columns_keeps_shape() {
        let mut fp = area(0, 0, 2, 2);
        assert_eq!(fp.remove_columns([&col(9, 9)]), 0);
        assert!(matches!(fp.shape, Shape::Rect(_)));
    }

    #[test]
    fn huge_rect_splits_around_carved_column() {
        let mut fp = area(-2000, -2000, 2000, 2000);
        let before = fp.column_count();
        assert_eq!(fp.remove_columns([&col(0, 0)]), 1);

        match &fp.shape {
            Shape::Rects(rects) => assert_eq!(rects.len(), 4),
            other => panic!("expected rectangle list, got {:?}", other),
        }
        assert_eq!(fp.column_count(), before - 1);
        assert!(!fp.contains(&col(0, 0)));
        for (x, z) in [(-1, 0), (1, 0), (0, -1), (0, 1), (2000, 2000), (-2000, -2000)] {
            assert!(fp.contains(&col(x, z)), "lost ({}, {})", x, z);
        }

        // Carving again splits only the piece that held the column.
        assert_eq!(fp.remove_columns([&col(5, 5), &col(0, 0)]), 1);
        assert_eq!(fp.column_count(), before - 2);
        fp.add_columns([col(0, 0)]).unwrap();
        assert!(fp.contains(&col(0, 0)));
        assert_eq!(fp.column_count(), before - 1);
    }

    #[test]
    fn full_range_rect_can_be_carved() {
        let mut fp = area(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(fp.remove_columns([&col(i32::MIN, i32::MAX)]), 1);
        assert!(!fp.contains(&col(i32::MIN, i32::MAX)));
        assert!(fp.contains(&col(i32::MAX, i32::MIN)));
        assert!(fp.contains(&col(0, 0)));
    }

    // -----------------------------------------------------------------------
    // Index
    // -----------------------------------------------------------------------

    #[test]
    fn overlap_reports_first_conflicting_column() {
        let mut idx = GeometryIndex::default();
        idx.insert(ClaimId(0), &area(0, 0, 9, 9)).unwrap();

        match idx.insert(ClaimId(1), &area(5, 5, 20, 20)) {
            Err(ClaimError::Overlap { column, existing }) => {
                assert_eq!(existing, ClaimId(0));
                assert_eq!(column, col(5, 5));
            }
            other => panic!("expected overlap, got {:?}", other),
        }
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.point_query(&col(15, 15)), None);
    }

    #[test]
    fn worlds_do_not_interfere() {
        let mut idx = GeometryIndex::default();
        idx.insert(ClaimId(0), &area(0, 0, 9, 9)).unwrap();
        let nether = Footprint::rect(&BoundedArea::new("nether", 0, 0, 9, 9));
        idx.insert(ClaimId(1), &nether).unwrap();

        assert_eq!(idx.point_query(&col(3, 3)), Some(ClaimId(0)));
        assert_eq!(
            idx.point_query(&Column::new("nether", 3, 3)),
            Some(ClaimId(1))
        );
        assert_eq!(idx.point_query(&Column::new("end", 3, 3)), None);
    }

    #[test]
    fn range_query_is_inclusive_and_sorted() {
        let mut idx = GeometryIndex::with_cell_size(4);
        idx.insert(ClaimId(7), &area(10, 10, 12, 12)).unwrap();
        idx.insert(ClaimId(2), &area(0, 0, 0, 0)).unwrap();
        idx.insert(ClaimId(5), &area(-20, -20, -15, -15)).unwrap();

        let hits: Vec<_> = idx
            .range_query(&BoundedArea::new("world1", 0, 0, 10, 10))
            .collect();
        assert_eq!(hits, vec![ClaimId(2), ClaimId(7)]);

        let none = idx.range_query(&BoundedArea::new("world1", 1, 1, 9, 9));
        assert_eq!(none.len(), 0);
    }

    #[test]
    fn replace_ignores_own_columns() {
        let mut idx = GeometryIndex::default();
        idx.insert(ClaimId(0), &area(0, 0, 3, 3)).unwrap();
        idx.insert(ClaimId(1), &area(10, 10, 12, 12)).unwrap();

        idx.replace(ClaimId(0), &area(0, 0, 5, 5)).unwrap();
        assert_eq!(idx.point_query(&col(5, 5)), Some(ClaimId(0)));
        assert_eq!(idx.indexed_columns(), 36 + 9);

        // Growing into claim 1 fails and leaves claim 0 as it was.
        assert!(idx.replace(ClaimId(0), &area(0, 0, 10, 10)).is_err());
        assert_eq!(idx.point_query(&col(5, 5)), Some(ClaimId(0)));
        assert_eq!(idx.point_query(&col(6, 6)), None);
    }

    #[test]
    fn remove_is_idempotent_and_frees_columns() {
        let mut idx = GeometryIndex::default();
        idx.insert(ClaimId(0), &area(0, 0, 3, 3)).unwrap();
        assert!(idx.remove(ClaimId(0)));
        assert!(!idx.remove(ClaimId(0)));
        assert_eq!(idx.indexed_columns(), 0);

        idx.insert(ClaimId(1), &area(0, 0, 3, 3)).unwrap();
        assert_eq!(idx.point_query(&col(2, 2)), Some(ClaimId(1)));
    }

    #[test]
    fn full_range_claims_do_not_overflow_column_total() {
        let mut idx = GeometryIndex::default();
        let everything = Footprint::rect(&BoundedArea::new(
            "world1",
            i32::MIN,
            i32::MIN,
            i32::MAX,
            i32::MAX,
        ));
        idx.insert(ClaimId(0), &everything).unwrap();
        idx.insert(ClaimId(1), &Footprint::single(Column::new("nether", 0, 0)))
            .unwrap();
        assert_eq!(idx.indexed_columns(), u64::MAX);

        assert!(idx.remove(ClaimId(0)));
        assert_eq!(idx.indexed_columns(), 1);
    }

    #[test]
    fn duplicate_claim_id_rejected() {
        let mut idx = GeometryIndex::default();
        idx.insert(ClaimId(0), &area(0, 0, 0, 0)).unwrap();
        assert!(matches!(
            idx.insert(ClaimId(0), &area(5, 5, 5, 5)),
            Err(ClaimError::Validation(_))
        ));
    }

    #[test]
    fn flat_backend_index_behaves_like_grid() {
        let mut idx = GeometryIndex::with_backend(FlatBackend::default());
        idx.insert(ClaimId(0), &area(0, 0, 9, 9)).unwrap();
        assert!(idx.insert(ClaimId(1), &area(9, 9, 9, 9)).is_err());
        assert_eq!(idx.point_query(&col(9, 0)), Some(ClaimId(0)));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn small_rect() -> impl Strategy<Value = Rect> {
        (-40i32..40, -40i32..40, 0i32..12, 0i32..12)
            .prop_map(|(x, z, w, h)| Rect::new(x, z, x + w, z + h))
    }

    /// Wide enough to land on the grid's oversized list at small cell sizes.
    fn large_rect() -> impl Strategy<Value = Rect> {
        (-60i32..20, -60i32..20, 33i32..90, 33i32..90)
            .prop_map(|(x, z, w, h)| Rect::new(x, z, x + w, z + h))
    }

    /// Too large to expand into explicit columns.
    fn huge_rect() -> impl Strategy<Value = Rect> {
        (-100i32..100, -100i32..100, 1100i32..1500, 1100i32..1500)
            .prop_map(|(x, z, w, h)| Rect::new(x, z, x + w, z + h))
    }

    fn any_rect() -> impl Strategy<Value = Rect> {
        prop_oneof![3 => small_rect(), 1 => large_rect()]
    }

    /// Footprint under test, with a model to check the index against.
    #[derive(Debug, Clone)]
    enum Model {
        Rect(Rect),
        Columns(BTreeSet<(i32, i32)>),
    }

    impl Model {
        fn contains(&self, x: i32, z: i32) -> bool {
            match self {
                Model::Rect(r) => r.contains(x, z),
                Model::Columns(set) => set.contains(&(x, z)),
            }
        }

        fn intersects(&self, q: &Rect) -> bool {
            match self {
                Model::Rect(r) => r.intersects(q),
                Model::Columns(set) => set.iter().any(|&(x, z)| q.contains(x, z)),
            }
        }

        fn clashes(&self, other: &Model) -> bool {
            match (self, other) {
                (Model::Rect(a), Model::Rect(b)) => a.intersects(b),
                (Model::Rect(r), Model::Columns(set)) | (Model::Columns(set), Model::Rect(r)) => {
                    set.iter().any(|&(x, z)| r.contains(x, z))
                }
                (Model::Columns(a), Model::Columns(b)) => !a.is_disjoint(b),
            }
        }

        fn footprint(&self) -> Footprint {
            match self {
                Model::Rect(r) => area(r.min_x, r.min_z, r.max_x, r.max_z),
                Model::Columns(set) => {
                    Footprint::from_columns(set.iter().map(|&(x, z)| col(x, z))).unwrap()
                }
            }
        }
    }

    fn model() -> impl Strategy<Value = Model> {
        prop_oneof![
            any_rect().prop_map(Model::Rect),
            prop::collection::btree_set((-40i32..40, -40i32..40), 1..40).prop_map(Model::Columns),
        ]
    }

    fn visit<B: SpatialBackend>(b: &B, r: Rect) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        b.visit_rect(r, |s| {
            out.insert(s);
        });
        out
    }

    proptest! {
        #[test]
        fn grid_agrees_with_flat_scan(
            rects in prop::collection::vec(any_rect(), 1..30),
            query in any_rect(),
            cell in 1i32..9,
        ) {
            let mut grid = GridBackend::new(cell);
            let mut flat = FlatBackend::default();
            for (slot, r) in rects.iter().enumerate() {
                grid.insert(slot, *r);
                flat.insert(slot, *r);
            }
            // Drop every third slot so removal is exercised too.
            for slot in (0..rects.len()).step_by(3) {
                grid.remove(slot);
                flat.remove(slot);
            }
            prop_assert_eq!(visit(&grid, query), visit(&flat, query));

            let (x, z) = (query.min_x, query.min_z);
            let mut from_grid = BTreeSet::new();
            grid.visit_point(x, z, |s| { from_grid.insert(s); });
            let mut from_flat = BTreeSet::new();
            flat.visit_point(x, z, |s| { from_flat.insert(s); });
            prop_assert_eq!(from_grid, from_flat);
        }

        #[test]
        fn accepted_claims_never_overlap(
            models in prop::collection::vec(model(), 1..20),
            query in small_rect(),
            cell in 1i32..4,
        ) {
            let mut idx = GeometryIndex::with_cell_size(cell);
            let mut accepted: Vec<(ClaimId, Model)> = Vec::new();
            for (i, m) in models.iter().enumerate() {
                let id = ClaimId(i as u64);
                let clashes = accepted.iter().any(|(_, a)| a.clashes(m));
                match idx.insert(id, &m.footprint()) {
                    Ok(()) => {
                        prop_assert!(!clashes);
                        accepted.push((id, m.clone()));
                    }
                    Err(ClaimError::Overlap { .. }) => prop_assert!(clashes),
                    Err(e) => prop_assert!(false, "unexpected error {}", e),
                }
            }

            for (x, z) in query.cells() {
                let owners: Vec<ClaimId> = accepted
                    .iter()
                    .filter(|(_, a)| a.contains(x, z))
                    .map(|(id, _)| *id)
                    .collect();
                prop_assert!(owners.len() <= 1);
                prop_assert_eq!(idx.point_query(&col(x, z)), owners.first().copied());
            }

            let expected: Vec<ClaimId> = accepted
                .iter()
                .filter(|(_, a)| a.intersects(&query))
                .map(|(id, _)| *id)
                .collect();
            let got: Vec<ClaimId> = idx
                .range_query(&BoundedArea::new(
                    "world1",
                    query.min_x,
                    query.min_z,
                    query.max_x,
                    query.max_z,
                ))
                .collect();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn carved_rects_keep_every_other_column(
            rect in huge_rect(),
            carve in prop::collection::vec((-120i32..1650, -120i32..1650), 1..12),
        ) {
            let mut fp = area(rect.min_x, rect.min_z, rect.max_x, rect.max_z);
            let removed: BTreeSet<(i32, i32)> =
                carve.iter().copied().filter(|&(x, z)| rect.contains(x, z)).collect();
            let carved: Vec<Column> = carve.iter().map(|&(x, z)| col(x, z)).collect();
            fp.remove_columns(&carved);
            prop_assert!(matches!(fp.shape, Shape::Rects(_)) || removed.is_empty());

            prop_assert_eq!(fp.column_count(), rect.area() - removed.len() as u64);
            for &(x, z) in &carve {
                prop_assert!(!fp.contains(&col(x, z)));
            }
            let pieces = fp.rects();
            for (i, a) in pieces.iter().enumerate() {
                for b in &pieces[i + 1..] {
                    prop_assert!(!a.intersects(b));
                }
            }
        }
    }
}
