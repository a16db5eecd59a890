use fenris_terms::chunk::ElementChunks;
use proptest::collection::vec;
use proptest::prelude::*;

#[test]
fn single_chunk_when_no_chunk_size_given() {
    let cells = [3, 5, 8, 9];
    let chunks: Vec<_> = ElementChunks::<f64>::new(&cells, None, (2, 2)).collect();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].indices(), &cells);
    assert_eq!(chunks[0].local_indices(), 0..4);
    assert_eq!(chunks[0].output.len(), 4);
    assert_eq!(chunks[0].output.block_shape(), (2, 2));
}

#[test]
fn no_chunks_for_empty_cells() {
    let chunks = ElementChunks::<f64>::new(&[], Some(3), (1, 1));
    assert_eq!(chunks.num_chunks(), 0);
    assert_eq!(chunks.count(), 0);

    let chunks = ElementChunks::<f64>::new(&[], None, (1, 1));
    assert_eq!(chunks.count(), 0);
}

#[test]
#[should_panic]
fn zero_chunk_size_panics() {
    let _ = ElementChunks::<f64>::new(&[0, 1], Some(0), (1, 1));
}

#[test]
fn last_chunk_is_shorter() {
    let cells: Vec<usize> = (0..7).collect();
    let lengths: Vec<_> = ElementChunks::<f64>::new(&cells, Some(3), (1, 1))
        .map(|chunk| chunk.len())
        .collect();
    assert_eq!(lengths, vec![3, 3, 1]);
}

proptest! {
    #[test]
    fn chunks_partition_cells_in_order(
        cells in vec(0..100usize, 0..50),
        chunk_size in 1..10usize,
        rows in 1..4usize,
        cols in 1..4usize
    ) {
        let chunks = ElementChunks::<f64>::new(&cells, Some(chunk_size), (rows, cols));
        let expected_count = (cells.len() + chunk_size - 1) / chunk_size;
        prop_assert_eq!(chunks.num_chunks(), expected_count);
        prop_assert_eq!(chunks.len(), expected_count);

        let mut visited = Vec::new();
        let mut next_local = 0;
        for chunk in chunks {
            prop_assert!(!chunk.is_empty());
            prop_assert!(chunk.len() <= chunk_size);
            prop_assert_eq!(chunk.local_indices(), next_local..next_local + chunk.len());
            prop_assert_eq!(chunk.output.len(), chunk.len());
            prop_assert_eq!(chunk.output.block_shape(), (rows, cols));
            prop_assert!(chunk.output.as_slice().iter().all(|&x| x == 0.0));
            next_local += chunk.len();
            visited.extend_from_slice(chunk.indices());
        }
        prop_assert_eq!(visited, cells);
    }
}
