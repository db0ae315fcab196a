//! Distance metrics used to rank rows by similarity.
//!
//! Ranking itself belongs to the vector engine. These functions back the
//! in-process engine and let tests reason about expected orderings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Supported distance metrics. Lower values are always more similar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cos(a, b)`; range `[0, 2]`.
    #[default]
    Cosine,
    /// Squared Euclidean distance.
    L2,
    /// `1 - a · b`, for vectors that are already normalized.
    Ip,
}

impl DistanceMetric {
    /// Computes the distance between two vectors of equal length.
    #[inline]
    pub fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::L2 => squared_l2(a, b),
            DistanceMetric::Ip => 1.0 - dot_product(a, b),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L2 => "l2",
            DistanceMetric::Ip => "ip",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            "ip" | "dot" => Ok(DistanceMetric::Ip),
            other => Err(Error::contract(format!(
                "unknown distance metric '{other}', expected cosine, l2 or ip"
            ))),
        }
    }
}

/// Sum of squared differences.
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// `1 - (a · b) / (|a| |b|)`. A zero vector is maximally unrelated (distance 1).
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let denominator = norm(a) * norm(b);
    if denominator == 0.0 {
        return 1.0;
    }
    1.0 - dot_product(a, b) / denominator
}

#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn norm(a: &[f32]) -> f32 {
    dot_product(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_l2() {
        assert!((squared_l2(&[0.0, 0.0], &[3.0, 4.0]) - 25.0).abs() < 1e-6);
        assert!(squared_l2(&[1.0, 2.0], &[1.0, 2.0]) < 1e-10);
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert!((cosine_distance(&[0.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_inner_product_metric() {
        let d = DistanceMetric::Ip.compute(&[0.6, 0.8], &[0.6, 0.8]);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_metric_names() {
        for metric in [DistanceMetric::Cosine, DistanceMetric::L2, DistanceMetric::Ip] {
            assert_eq!(metric.as_str().parse::<DistanceMetric>().unwrap(), metric);
        }
        assert_eq!("Euclidean".parse::<DistanceMetric>().unwrap(), DistanceMetric::L2);
        assert!("manhattan".parse::<DistanceMetric>().is_err());
    }
}
