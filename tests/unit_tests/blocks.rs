use fenris_terms::blocks::{ElementBlocks, QuadratureData};
use fenris_terms::nalgebra::DMatrix;
use matrixcompare::assert_matrix_eq;

#[test]
fn element_blocks_are_column_major() {
    let mut blocks = ElementBlocks::zeros(3, (2, 2));
    blocks.block_mut(1).copy_from(&DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]));

    assert_eq!(&blocks.as_slice()[4..8], &[1.0, 3.0, 2.0, 4.0]);
    assert_matrix_eq!(blocks.block(0), DMatrix::<f64>::zeros(2, 2));
    assert_matrix_eq!(blocks.sum(), DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]));
}

#[test]
fn element_blocks_accumulate_and_scale() {
    let mut a = ElementBlocks::zeros(2, (2, 1));
    a.fill(1.0);
    let mut b = ElementBlocks::zeros(2, (2, 1));
    let mut block = b.block_mut(1);
    block[(0, 0)] = 3.0;

    a.accumulate(&b);
    a.scale_mut(2.0);
    assert_eq!(a.as_slice(), &[2.0, 2.0, 8.0, 2.0]);
}

#[test]
fn gather_reorders_cells() {
    let data = QuadratureData::from_fn(3, 2, (1, 1), |cell, q, mut out| {
        out[(0, 0)] = (10 * cell + q) as f64;
    });
    let gathered = data.gather(&[2, 0]);

    assert_eq!(gathered.num_cells(), 2);
    assert_eq!(gathered.num_qp(), 2);
    assert_eq!(gathered.entry(0, 1)[(0, 0)], 21.0);
    assert_eq!(gathered.entry(1, 0)[(0, 0)], 0.0);
}

#[test]
fn broadcast_data_is_shared_by_all_cells() {
    let data = QuadratureData::from_fn(1, 2, (2, 1), |_, q, mut out| {
        out[(1, 0)] = q as f64;
    });
    assert!(data.is_broadcast());
    assert_eq!(data.entry(7, 1)[(1, 0)], 1.0);
    assert_eq!(data.gather(&[4, 5, 6]), data);
}
