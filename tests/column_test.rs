use vircol::{Column, RowIndex, Stype};

#[test]
fn test_rowindex_view_matches_direct_reads() {
    let col = Column::from_options(vec![
        Some(10i64),
        None,
        Some(30),
        Some(40),
        None,
        Some(60),
    ])
    .unwrap();

    let ri = RowIndex::slice(0, 3, 2);
    let view = col.apply_rowindex(&ri).unwrap();
    assert_eq!(view.nrows(), 3);
    for i in 0..3 {
        let direct = ri.get(i).and_then(|row| col.get::<i64>(row));
        assert_eq!(view.get::<i64>(i), direct);
    }
}

#[test]
fn test_rowindex_bounds_checked() {
    let col = Column::from_vec(vec![1i32, 2, 3]).unwrap();
    assert!(col.apply_rowindex(&RowIndex::slice(0, 4, 1)).is_err());
    assert!(col
        .apply_rowindex(&RowIndex::from_indices32(vec![0, 3]))
        .is_err());
    // Negative entries mean missing, not out-of-range.
    assert!(col
        .apply_rowindex(&RowIndex::from_indices32(vec![0, -5]))
        .is_ok());
}

#[test]
fn test_view_of_view_reads_through() {
    let col = Column::from_vec(vec![0i64, 1, 2, 3, 4, 5, 6, 7]).unwrap();
    let evens = col.apply_rowindex(&RowIndex::slice(0, 4, 2)).unwrap();
    let reversed = evens.apply_rowindex(&RowIndex::slice(3, 4, -1)).unwrap();
    let values: Vec<_> = (0..4).map(|i| reversed.get::<i64>(i)).collect();
    assert_eq!(values, vec![Some(6), Some(4), Some(2), Some(0)]);
}

#[test]
fn test_materialize_collapses_view_chain() {
    let col = Column::from_strings(vec![
        Some("a".to_string()),
        None,
        Some("c".to_string()),
        Some("d".to_string()),
    ])
    .unwrap();
    let view = col
        .apply_rowindex(&RowIndex::from_indices64(vec![3, -1, 1, 0]))
        .unwrap();
    assert!(view.is_virtual());

    let mat = view.materialize().unwrap();
    assert!(!mat.is_virtual());
    assert_eq!(mat.stype(), Stype::Str);
    assert_eq!(mat.get::<String>(0), Some("d".to_string()));
    assert_eq!(mat.get::<String>(1), None);
    assert_eq!(mat.get::<String>(2), None);
    assert_eq!(mat.get::<String>(3), Some("a".to_string()));
}

#[test]
fn test_materialize_inplace() {
    let col = Column::from_vec(vec![1i32, 2, 3]).unwrap();
    let mut view = col.apply_rowindex(&RowIndex::slice(2, 3, -1)).unwrap();
    view.materialize_inplace().unwrap();
    assert!(!view.is_virtual());
    assert_eq!(view.get::<i32>(0), Some(3));
}

#[test]
fn test_large_column_materializes_in_parallel() {
    // Crosses the parallel-gather threshold.
    let n = 10_000;
    let col = Column::from_vec((0..n as i64).collect()).unwrap();
    let view = col
        .apply_rowindex(&RowIndex::slice(n - 1, n, -1))
        .unwrap();
    let mat = view.materialize().unwrap();
    assert_eq!(mat.nrows(), n);
    assert_eq!(mat.get::<i64>(0), Some(n as i64 - 1));
    assert_eq!(mat.get::<i64>(n - 1), Some(0));
}

#[test]
fn test_stats_and_na_count() {
    let col = Column::from_options(vec![Some(1.0f64), None, Some(4.0), Some(7.0)]).unwrap();
    assert_eq!(col.na_count(), 1);
    assert_eq!(col.sum_f64().unwrap(), 12.0);
    assert_eq!(col.mean_f64().unwrap(), Some(4.0));
    assert_eq!(col.min_f64().unwrap(), Some(1.0));
    assert_eq!(col.max_f64().unwrap(), Some(7.0));

    let empty = Column::from_options(vec![None::<f64>, None]).unwrap();
    assert_eq!(empty.min_f64().unwrap(), None);
    assert_eq!(empty.mean_f64().unwrap(), None);
}

#[test]
fn test_verify_integrity_recurses() {
    let col = Column::from_vec(vec![1i64, 2, 3, 4]).unwrap();
    let view = col.apply_rowindex(&RowIndex::slice(0, 2, 2)).unwrap();
    view.verify_integrity().unwrap();
}

#[test]
fn test_string_column_roundtrip() {
    let values = vec![
        Some("".to_string()),
        Some("many words here".to_string()),
        None,
        Some("ünïcødé".to_string()),
    ];
    let col = Column::from_strings(values.clone()).unwrap();
    for (i, expected) in values.iter().enumerate() {
        assert_eq!(col.get::<String>(i), *expected);
    }
}
