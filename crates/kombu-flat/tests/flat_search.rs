//! End-to-end tests for the flat search engine.

use kombu_data::{AccessMode, Dataset, SimpleData};
use kombu_distance::{Cosine, Distance, InnerProduct, SquaredL2};
use kombu_flat::{scoped_flat_index, FlatIndex, QueryResult};
use kombu_threads::NativeThreadPool;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;

/// The five-point fixture used throughout: distances from the origin are
/// 0, 1, 1, 25, 169 (squared).
fn small_dataset() -> SimpleData<f32> {
    SimpleData::from_rows(&[
        vec![0.0, 0.0],
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![3.0, 4.0],
        vec![5.0, 12.0],
    ])
    .unwrap()
}

fn queries_of(rows: &[Vec<f32>]) -> SimpleData<f32> {
    SimpleData::from_rows(rows).unwrap()
}

fn random_data(rng: &mut StdRng, n: usize, d: usize) -> SimpleData<f32> {
    let rows: Vec<Vec<f32>> = (0..n)
        .map(|_| (0..d).map(|_| rng.gen_range(-10.0..10.0)).collect())
        .collect();
    SimpleData::from_rows(&rows).unwrap()
}

/// Single-threaded reference: score everything, sort by (score, id),
/// truncate.
fn reference_topk(
    data: &SimpleData<f32>,
    query: &[f32],
    k: usize,
    score: impl Fn(&[f32], &[f32]) -> f32,
    better: impl Fn(f32, f32) -> bool,
    predicate: impl Fn(usize) -> bool,
) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = (0..data.size())
        .filter(|&i| predicate(i))
        .map(|i| (i, score(query, data.get_datum(i, AccessMode::Full))))
        .collect();
    scored.sort_by(|a, b| {
        if a.1 == b.1 {
            a.0.cmp(&b.0)
        } else if better(a.1, b.1) {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    });
    scored.truncate(k);
    scored
}

#[test]
fn test_euclidean_nearest_with_tie_break() {
    let index = FlatIndex::new(small_dataset(), SquaredL2, 2);
    let queries = queries_of(&[vec![0.0, 0.0]]);

    let result = index.search(&queries, 3).unwrap();
    assert_eq!(result.row_ids(0), &[0, 1, 2]);
    assert_eq!(result.row_distances(0), &[0.0, 1.0, 1.0]);
}

#[test]
fn test_inner_product_maximizes() {
    let index = FlatIndex::new(small_dataset(), InnerProduct, 2);
    let queries = queries_of(&[vec![1.0, 1.0]]);

    let result = index.search(&queries, 2).unwrap();
    assert_eq!(result.row_ids(0), &[4, 3]);
    assert_eq!(result.row_distances(0), &[17.0, 7.0]);
}

#[test]
fn test_predicate_excludes_indices() {
    let index = FlatIndex::new(small_dataset(), SquaredL2, 2);
    let queries = queries_of(&[vec![0.0, 0.0]]);

    let result = index.search_filtered(&queries, 3, |i| i != 0).unwrap();
    assert_eq!(result.row_ids(0), &[1, 2, 3]);
    assert_eq!(result.row_distances(0), &[1.0, 1.0, 25.0]);
}

#[test]
fn test_cosine_with_fixed_query_norm() {
    let data = SimpleData::from_rows(&[
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![-1.0, 0.0],
        vec![2.0, 0.0],
    ])
    .unwrap();
    let index = FlatIndex::new(data, Cosine::default(), 2);
    let queries = queries_of(&[vec![1.0, 0.0]]);

    let result = index.search(&queries, 4).unwrap();
    // Ids 0 and 3 are both at cosine distance 0; the lower id wins.
    assert_eq!(result.row_ids(0), &[0, 3, 1, 2]);
    let distances = result.row_distances(0);
    assert!(distances[0].abs() < 1e-6 && distances[1].abs() < 1e-6);
    assert!((distances[2] - 1.0).abs() < 1e-6);
    assert!((distances[3] - 2.0).abs() < 1e-6);
}

#[test]
fn test_k_larger_than_dataset_returns_fewer() {
    let index = FlatIndex::new(small_dataset(), SquaredL2, 2);
    let queries = queries_of(&[vec![0.0, 0.0]]);

    let result = index.search(&queries, 10).unwrap();
    assert_eq!(result.n_neighbors(), 10);
    assert_eq!(result.row_ids(0), &[0, 1, 2, 3, 4]);
}

#[test]
fn test_topk_prefix_monotonicity() {
    let mut rng = StdRng::seed_from_u64(11);
    let data = random_data(&mut rng, 200, 8);
    let queries = random_data(&mut rng, 4, 8);
    let index = FlatIndex::new(data, SquaredL2, 4);

    let small = index.search(&queries, 3).unwrap();
    let large = index.search(&queries, 9).unwrap();
    for qi in 0..queries.size() {
        assert_eq!(small.row_ids(qi), &large.row_ids(qi)[..3]);
        assert_eq!(small.row_distances(qi), &large.row_distances(qi)[..3]);
    }
}

#[test]
fn test_predicate_consistency_with_full_search() {
    let mut rng = StdRng::seed_from_u64(12);
    let data = random_data(&mut rng, 150, 6);
    let queries = random_data(&mut rng, 5, 6);
    let n = data.size();
    let index = FlatIndex::new(data, SquaredL2, 4);
    let predicate = |i: usize| i % 3 != 0;

    let unfiltered = index.search(&queries, n).unwrap();
    let filtered = index.search_filtered(&queries, n, predicate).unwrap();

    for qi in 0..queries.size() {
        let expected: Vec<usize> = unfiltered
            .row_ids(qi)
            .iter()
            .copied()
            .filter(|&id| predicate(id))
            .collect();
        assert_eq!(filtered.row_ids(qi), &expected[..]);
    }
}

#[test]
fn test_exactness_against_reference() {
    let mut rng = StdRng::seed_from_u64(13);
    let data = random_data(&mut rng, 300, 10);
    let queries = random_data(&mut rng, 8, 10);

    let l2 = FlatIndex::new(data.clone(), SquaredL2, 4);
    let ip = FlatIndex::new(data.clone(), InnerProduct, 4);
    let l2_result = l2.search(&queries, 7).unwrap();
    let ip_result = ip.search(&queries, 7).unwrap();

    for qi in 0..queries.size() {
        let query = queries.get_datum(qi, AccessMode::Full);

        let expected = reference_topk(
            &data,
            query,
            7,
            |q, x| SquaredL2.compute(q, x),
            |a, b| a < b,
            |_| true,
        );
        let ids: Vec<usize> = expected.iter().map(|&(id, _)| id).collect();
        assert_eq!(l2_result.row_ids(qi), &ids[..]);

        let expected = reference_topk(
            &data,
            query,
            7,
            |q, x| InnerProduct.compute(q, x),
            |a, b| a > b,
            |_| true,
        );
        let ids: Vec<usize> = expected.iter().map(|&(id, _)| id).collect();
        assert_eq!(ip_result.row_ids(qi), &ids[..]);
    }
}

#[test]
fn test_results_identical_across_threads_and_tiles() {
    let mut rng = StdRng::seed_from_u64(42);
    let n = 1024;
    let data = random_data(&mut rng, n, 16);
    let queries = random_data(&mut rng, 32, 16);
    let k = 10;

    let collect = |workers: usize, data_batch: usize, query_batch: usize| -> QueryResult {
        let mut index = FlatIndex::new(data.clone(), SquaredL2, workers);
        index.set_data_batch_size(data_batch);
        index.set_query_batch_size(query_batch);
        index.search(&queries, k).unwrap()
    };

    let baseline = collect(1, 0, 0);
    for (workers, data_batch, query_batch) in [
        (4, 100, 0),
        (8, 10, 1),
        (2, 1, 0),
        (4, n / 3, 32),
        (4, n, 0),
        (4, 10 * n, 0),
        (8, 0, 1),
    ] {
        let run = collect(workers, data_batch, query_batch);
        for qi in 0..queries.size() {
            assert_eq!(baseline.row_ids(qi), run.row_ids(qi));
            // Bit-identical, not approximately equal.
            assert_eq!(baseline.row_distances(qi), run.row_distances(qi));
        }
    }
}

#[test]
fn test_scoped_index_matches_owning_index() {
    let mut rng = StdRng::seed_from_u64(21);
    let data = random_data(&mut rng, 64, 4);
    let queries = random_data(&mut rng, 3, 4);

    let owning = FlatIndex::new(data.clone(), SquaredL2, 2);
    let expected = owning.search(&queries, 5).unwrap();

    let pool = NativeThreadPool::new(2);
    let scoped = scoped_flat_index(&data, SquaredL2, &pool);
    let actual = scoped.search(&queries, 5).unwrap();

    for qi in 0..queries.size() {
        assert_eq!(expected.row_ids(qi), actual.row_ids(qi));
        assert_eq!(expected.row_distances(qi), actual.row_distances(qi));
    }
    // The dataset and pool are still ours afterwards.
    assert_eq!(data.size(), 64);
    assert_eq!(kombu_threads::ThreadPool::size(&pool), 2);
}

#[test]
fn test_search_into_reuses_caller_allocation() {
    let index = FlatIndex::new(small_dataset(), SquaredL2, 2);
    let queries = queries_of(&[vec![0.0, 0.0], vec![5.0, 12.0]]);

    let mut result = QueryResult::new(2, 2);
    index.search_into(&queries, &mut result, |_| true).unwrap();
    assert_eq!(result.row_ids(0), &[0, 1]);
    assert_eq!(result.row_ids(1), &[4, 3]);
}

#[test]
fn test_f16_dataset_with_f32_queries() {
    use half::f16;

    let rows: Vec<Vec<f16>> = [[0.0f32, 0.0], [1.0, 0.0], [0.0, 2.0]]
        .iter()
        .map(|row| row.iter().map(|&x| f16::from_f32(x)).collect())
        .collect();
    let data = SimpleData::from_rows(&rows).unwrap();

    let index = FlatIndex::new(data, SquaredL2, 2);
    let queries = queries_of(&[vec![0.0, 0.0]]);
    let result = index.search(&queries, 2).unwrap();
    assert_eq!(result.row_ids(0), &[0, 1]);
    assert_eq!(result.row_distances(0), &[0.0, 1.0]);
}

#[test]
fn test_search_after_thread_clamp() {
    let mut index = FlatIndex::new(small_dataset(), SquaredL2, 4);
    index.set_num_threads(0);
    assert!(index.get_num_threads() >= 1);

    let queries = queries_of(&[vec![0.0, 0.0]]);
    let result = index.search(&queries, 1).unwrap();
    assert_eq!(result.row_ids(0), &[0]);
}

#[test]
fn test_predicate_rejecting_everything_yields_empty_rows() {
    let index = FlatIndex::new(small_dataset(), SquaredL2, 2);
    let queries = queries_of(&[vec![0.0, 0.0]]);

    let result = index.search_filtered(&queries, 3, |_| false).unwrap();
    assert!(result.row_ids(0).is_empty());
    assert!(result.row_distances(0).is_empty());
}
