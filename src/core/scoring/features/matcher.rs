//! Hamming-distance descriptor matching.

use super::orb::Descriptor;
use crate::error::MethodError;
use rayon::prelude::*;

/// Lowe ratio for accepting a nearest neighbour
pub const RATIO: f32 = 0.7;

/// A query descriptor paired with its best train descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub query: usize,
    pub train: usize,
    pub distance: u32,
}

/// Two nearest neighbours of every query descriptor.
///
/// Fails when the train set cannot supply a second neighbour.
pub fn knn2(query: &[Descriptor], train: &[Descriptor]) -> Result<Vec<(Match, Match)>, MethodError> {
    if query.is_empty() {
        return Err(MethodError::InsufficientData(
            "no query descriptors".to_string(),
        ));
    }
    if train.len() < 2 {
        return Err(MethodError::InsufficientData(format!(
            "need 2 train descriptors for a 2-NN search, got {}",
            train.len()
        )));
    }

    Ok(query
        .par_iter()
        .enumerate()
        .map(|(qi, q)| {
            let mut best = Match { query: qi, train: 0, distance: u32::MAX };
            let mut second = best;
            for (ti, t) in train.iter().enumerate() {
                let distance = q.hamming(t);
                if distance < best.distance {
                    second = best;
                    best = Match { query: qi, train: ti, distance };
                } else if distance < second.distance {
                    second = Match { query: qi, train: ti, distance };
                }
            }
            (best, second)
        })
        .collect())
}

/// Keep nearest neighbours that are clearly better than the runner-up
pub fn ratio_test(pairs: &[(Match, Match)], ratio: f32) -> Vec<Match> {
    pairs
        .iter()
        .filter(|(best, second)| (best.distance as f32) < ratio * second.distance as f32)
        .map(|(best, _)| *best)
        .collect()
}

/// Mutual nearest neighbours, sorted by distance
pub fn cross_check(query: &[Descriptor], train: &[Descriptor]) -> Vec<Match> {
    let nearest = |from: &[Descriptor], to: &[Descriptor]| -> Vec<Option<(usize, u32)>> {
        from.par_iter()
            .map(|d| {
                to.iter()
                    .enumerate()
                    .map(|(i, t)| (i, d.hamming(t)))
                    .min_by_key(|&(i, distance)| (distance, i))
            })
            .collect()
    };

    let forward = nearest(query, train);
    let backward = nearest(train, query);

    let mut matches: Vec<Match> = forward
        .into_iter()
        .enumerate()
        .filter_map(|(qi, hit)| {
            let (ti, distance) = hit?;
            match backward[ti] {
                Some((back, _)) if back == qi => Some(Match { query: qi, train: ti, distance }),
                _ => None,
            }
        })
        .collect();

    matches.sort_by_key(|m| (m.distance, m.query));
    matches
}

/// Mean Hamming distance of a match set
pub fn mean_distance(matches: &[Match]) -> f64 {
    if matches.is_empty() {
        return 0.0;
    }
    matches.iter().map(|m| m.distance as f64).sum::<f64>() / matches.len() as f64
}
