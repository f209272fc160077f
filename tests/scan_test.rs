use vircol::{vcol, Column, Groupby};

fn values(col: &Column) -> Vec<Option<i64>> {
    (0..col.nrows()).map(|i| col.get::<i64>(i)).collect()
}

#[test]
fn test_cummax_carries_first_value() {
    let src = Column::from_options(vec![Some(5i64), None, Some(3), None, None, Some(2)]).unwrap();
    let gb = Groupby::single_group(6);
    let out = vcol::cummax(&src, &gb, false).unwrap();
    assert_eq!(values(&out), vec![Some(5); 6]);
}

#[test]
fn test_cumsum_reemits_running_total_over_missing() {
    let src = Column::from_options(vec![Some(5i64), None, Some(3), None, None, Some(2)]).unwrap();
    let gb = Groupby::single_group(6);
    let out = vcol::cumsum(&src, &gb, false).unwrap();
    assert_eq!(
        values(&out),
        vec![Some(5), Some(5), Some(8), Some(8), Some(8), Some(10)]
    );
}

#[test]
fn test_cummin_missing_until_first_valid() {
    let src = Column::from_options(vec![None, None, Some(4i64), Some(2), Some(9)]).unwrap();
    let gb = Groupby::single_group(5);
    let out = vcol::cummin(&src, &gb, false).unwrap();
    assert_eq!(values(&out), vec![None, None, Some(4), Some(2), Some(2)]);
}

#[test]
fn test_scans_restart_at_group_boundaries() {
    let src = Column::from_vec(vec![1i64, 2, 3, 10, 20, 30]).unwrap();
    let gb = Groupby::from_offsets(vec![0, 3, 6]).unwrap();

    let sums = vcol::cumsum(&src, &gb, false).unwrap();
    assert_eq!(
        values(&sums),
        vec![Some(1), Some(3), Some(6), Some(10), Some(30), Some(60)]
    );

    let prods = vcol::cumprod(&src, &gb, false).unwrap();
    assert_eq!(
        values(&prods),
        vec![Some(1), Some(2), Some(6), Some(10), Some(200), Some(6000)]
    );
}

#[test]
fn test_reverse_scan_runs_from_group_end() {
    let src = Column::from_options(vec![Some(1i64), None, Some(3), Some(4)]).unwrap();
    let gb = Groupby::single_group(4);
    let out = vcol::cumsum(&src, &gb, true).unwrap();
    assert_eq!(values(&out), vec![Some(8), Some(7), Some(7), Some(4)]);
}

#[test]
fn test_empty_groups_are_skipped() {
    let src = Column::from_vec(vec![7i64, 8]).unwrap();
    let gb = Groupby::from_offsets(vec![0, 0, 1, 1, 2]).unwrap();
    let out = vcol::cumsum(&src, &gb, false).unwrap();
    assert_eq!(values(&out), vec![Some(7), Some(8)]);
}

#[test]
fn test_float_scan() {
    let src = Column::from_options(vec![Some(0.5f64), None, Some(1.5)]).unwrap();
    let gb = Groupby::single_group(3);
    let out = vcol::cumsum(&src, &gb, false).unwrap();
    let floats: Vec<_> = (0..3).map(|i| out.get::<f64>(i)).collect();
    assert_eq!(floats, vec![Some(0.5), Some(0.5), Some(2.0)]);
}

#[test]
fn test_cumcount_ngroup_need_no_source() {
    let gb = Groupby::from_offsets(vec![0, 2, 2, 5]).unwrap();
    let counts = vcol::cumcount(&gb, false);
    assert_eq!(
        values(&counts),
        vec![Some(0), Some(1), Some(0), Some(1), Some(2)]
    );

    let groups = vcol::ngroup(&gb);
    assert_eq!(
        values(&groups),
        vec![Some(0), Some(0), Some(2), Some(2), Some(2)]
    );
}

#[test]
fn test_nth_with_skip_na_broadcasts() {
    let src = Column::from_options(vec![None, Some(2i64), Some(3), Some(4), None, Some(6)])
        .unwrap();
    let gb = Groupby::from_offsets(vec![0, 3, 6]).unwrap();

    let first = vcol::nth(&src, &gb, 0, false).unwrap();
    assert_eq!(
        values(&first),
        vec![None, None, None, Some(4), Some(4), Some(4)]
    );

    let first_valid = vcol::nth(&src, &gb, 0, true).unwrap();
    assert_eq!(
        values(&first_valid),
        vec![Some(2), Some(2), Some(2), Some(4), Some(4), Some(4)]
    );

    let last = vcol::nth(&src, &gb, -1, true).unwrap();
    assert_eq!(
        values(&last),
        vec![Some(3), Some(3), Some(3), Some(6), Some(6), Some(6)]
    );
}

#[test]
fn test_scan_output_is_materialized_after_first_read() {
    let src = Column::from_vec(vec![1i64, 2, 3]).unwrap();
    let gb = Groupby::single_group(3);
    let out = vcol::cumsum(&src, &gb, false).unwrap();
    assert!(out.is_virtual());
    assert_eq!(out.get::<i64>(1), Some(3));
    // The latent wrapper now delegates to a materialized column.
    let mat = out.materialize().unwrap();
    assert!(!mat.is_virtual());
    assert_eq!(values(&mat), vec![Some(1), Some(3), Some(6)]);
}

#[test]
fn test_scan_validates_inputs() {
    let src = Column::from_vec(vec![1i64, 2, 3]).unwrap();
    let wrong_len = Groupby::single_group(5);
    assert!(vcol::cumsum(&src, &wrong_len, false).is_err());

    let strings = Column::from_strings(vec![Some("a".to_string())]).unwrap();
    assert!(vcol::cummin(&strings, &Groupby::single_group(1), false).is_err());
}
