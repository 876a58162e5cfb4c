//! Reliability-guided 2-D phase unwrapping.
//!
//! Each pixel gets a reliability from the wrapped second differences over its
//! 8-neighbourhood. Unwrapping grows from the most reliable pixel, always
//! extending through the most reliable frontier pixel next, so noisy regions
//! are reached last. Disconnected regions are unwrapped independently and
//! keep the wrapped value of their own seed. NaN samples are never visited.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::f64::consts::{PI, TAU};

use tracing::debug;

use crate::interferometry::common::{Grid, PhaseMap, Result};

#[inline]
fn wrap(delta: f64) -> f64 {
    (delta + PI).rem_euclid(TAU) - PI
}

#[derive(Debug, PartialEq)]
struct Candidate {
    reliability: f64,
    index: usize,
    from: usize,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.reliability
            .total_cmp(&other.reliability)
            .then_with(|| other.index.cmp(&self.index))
            .then_with(|| other.from.cmp(&self.from))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn reliability_map(phase: &PhaseMap) -> Vec<f64> {
    let (width, height) = phase.shape();
    let at = |x: isize, y: isize| -> Option<f64> {
        if x < 0 || y < 0 || x >= width as isize || y >= height as isize {
            return None;
        }
        let value = phase[(x as usize, y as usize)];
        value.is_finite().then_some(value)
    };

    let mut reliability = vec![0.0; width * height];
    for y in 0..height as isize {
        for x in 0..width as isize {
            let Some(center) = at(x, y) else { continue };
            let second_difference = |(dx, dy): (isize, isize)| -> Option<f64> {
                let before = at(x - dx, y - dy)?;
                let after = at(x + dx, y + dy)?;
                Some(wrap(before - center) - wrap(center - after))
            };
            let squared: Option<f64> = [(1, 0), (0, 1), (1, 1), (1, -1)]
                .into_iter()
                .map(|offset| second_difference(offset).map(|d| d * d))
                .sum();
            if let Some(squared) = squared {
                reliability[y as usize * width + x as usize] = 1.0 / (squared.sqrt() + f64::EPSILON);
            }
        }
    }
    reliability
}

/// Unwraps a wrapped phase map (radians). NaN samples stay NaN.
pub fn unwrap_phase(wrapped: &PhaseMap) -> Result<PhaseMap> {
    let (width, height) = wrapped.shape();
    let values = wrapped.data();
    let reliability = reliability_map(wrapped);

    let mut seeds: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_finite()).collect();
    seeds.sort_by(|&a, &b| reliability[b].total_cmp(&reliability[a]).then(a.cmp(&b)));

    let neighbours = |index: usize| {
        let (x, y) = (index % width, index / width);
        let mut out = [None; 4];
        if x > 0 {
            out[0] = Some(index - 1);
        }
        if x + 1 < width {
            out[1] = Some(index + 1);
        }
        if y > 0 {
            out[2] = Some(index - width);
        }
        if y + 1 < height {
            out[3] = Some(index + width);
        }
        out.into_iter().flatten()
    };

    let mut unwrapped = vec![f64::NAN; values.len()];
    let mut visited = vec![false; values.len()];
    let mut frontier = BinaryHeap::new();
    let mut regions = 0usize;

    let push_neighbours = |from: usize, frontier: &mut BinaryHeap<Candidate>, visited: &[bool]| {
        for index in neighbours(from) {
            if !visited[index] && values[index].is_finite() {
                frontier.push(Candidate {
                    reliability: reliability[index],
                    index,
                    from,
                });
            }
        }
    };

    for seed in seeds {
        if visited[seed] {
            continue;
        }
        regions += 1;
        visited[seed] = true;
        unwrapped[seed] = values[seed];
        push_neighbours(seed, &mut frontier, &visited);

        while let Some(Candidate { index, from, .. }) = frontier.pop() {
            if visited[index] {
                continue;
            }
            visited[index] = true;
            unwrapped[index] = unwrapped[from] + wrap(values[index] - values[from]);
            push_neighbours(index, &mut frontier, &visited);
        }
    }

    debug!(width, height, regions, "Phase unwrapped");
    Grid::new(width, height, unwrapped)
}

/// Converts unwrapped radians to waves and applies the wedge factor.
pub fn to_waves(unwrapped: &PhaseMap, wedge_factor: f64) -> Grid<f64> {
    unwrapped.map(|&phase| phase / TAU * wedge_factor)
}
