//! Betweenness centrality maintenance and the freshness marker.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use tracing::info;

use super::GraphStore;
use crate::driver::Connector;
use crate::errors::{Result, RoadGraphError};
use crate::mapper;
use crate::query::cypher::{self, SamplingStrategy};
use crate::utils::datetime::parse_local_datetime;

/// Which betweenness computation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CentralityAlgorithm {
    Exact,
    BrandesRandom,
    BrandesDegree,
    /// The degree-biased sampler.
    #[default]
    Default,
}

impl CentralityAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            CentralityAlgorithm::Exact => "exact",
            CentralityAlgorithm::BrandesRandom => "brandes-random",
            CentralityAlgorithm::BrandesDegree => "brandes-degree",
            CentralityAlgorithm::Default => "default",
        }
    }
}

impl fmt::Display for CentralityAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CentralityAlgorithm {
    type Err = RoadGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "brandes-random" => Ok(Self::BrandesRandom),
            "brandes-degree" => Ok(Self::BrandesDegree),
            "" | "default" => Ok(Self::Default),
            other => Err(RoadGraphError::Validation(format!(
                "unknown centrality algorithm `{other}`"
            ))),
        }
    }
}

/// RA-Brandes sampling probability for `n` nodes: `log10(n) / e²`, in `[0, 1]`.
pub fn random_sampling_probability(n: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let e2 = std::f64::consts::E.powi(2);
    ((n as f64).log10() / e2).clamp(0.0, 1.0)
}

impl<C: Connector> GraphStore<C> {
    /// Exact betweenness over all sources.
    pub async fn update_betweenness_exact(&self) -> Result<()> {
        self.exact().await?;
        Ok(())
    }

    /// Randomly sampled sources, probability `log10(N)/e²`.
    pub async fn update_betweenness_brandes_random(&self) -> Result<()> {
        self.brandes_random().await?;
        Ok(())
    }

    /// Sources restricted to nodes with above-mean degree.
    pub async fn update_betweenness_brandes_degree(&self) -> Result<()> {
        self.brandes_degree().await?;
        Ok(())
    }

    /// Default recomputation (degree-biased sampling).
    pub async fn update_betweenness(&self) -> Result<()> {
        self.update_betweenness_brandes_degree().await
    }

    /// Run `algorithm` and return the freshness timestamp its write set.
    ///
    /// The timestamp comes from the write primary, so it is correct even
    /// while the read replica still serves the previous one.
    pub async fn update_betweenness_with(
        &self,
        algorithm: CentralityAlgorithm,
    ) -> Result<NaiveDateTime> {
        match algorithm {
            CentralityAlgorithm::Exact => self.exact().await,
            CentralityAlgorithm::BrandesRandom => self.brandes_random().await,
            CentralityAlgorithm::BrandesDegree | CentralityAlgorithm::Default => {
                self.brandes_degree().await
            }
        }
    }

    /// Time of the last centrality recomputation.
    pub async fn last_modified(&self) -> Result<NaiveDateTime> {
        let rows = self.handle.read(&cypher::read_control()).await?;
        let row = rows
            .first()
            .ok_or_else(|| RoadGraphError::not_found("control", "timestamp"))?;
        parse_timestamp(&mapper::string_column(row, "timestamp")?)
    }

    async fn exact(&self) -> Result<NaiveDateTime> {
        info!(algorithm = "exact", "updating betweenness");
        self.handle.write(&cypher::betweenness_exact()).await?;
        self.touch_control().await
    }

    async fn brandes_random(&self) -> Result<NaiveDateTime> {
        let rows = self.handle.read(&cypher::count_intersections()).await?;
        let count = match rows.first() {
            Some(row) => mapper::i64_column(row, "count")?,
            None => 0,
        };
        let probability = random_sampling_probability(u64::try_from(count).unwrap_or(0));
        info!(algorithm = "brandes-random", nodes = count, probability, "updating betweenness");
        self.handle
            .write(&cypher::betweenness_sampled(SamplingStrategy::Random, probability))
            .await?;
        self.touch_control().await
    }

    async fn brandes_degree(&self) -> Result<NaiveDateTime> {
        info!(algorithm = "brandes-degree", "updating betweenness");
        self.handle
            .write(&cypher::betweenness_sampled(SamplingStrategy::Degree, 1.0))
            .await?;
        self.touch_control().await
    }

    async fn touch_control(&self) -> Result<NaiveDateTime> {
        let rows = self.handle.write(&cypher::touch_control()).await?;
        let row = rows
            .first()
            .ok_or_else(|| RoadGraphError::Driver("control touch returned no row".into()))?;
        let stamp = parse_timestamp(&mapper::string_column(row, "timestamp")?)?;
        info!(timestamp = %stamp, "centrality refreshed");
        Ok(stamp)
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    parse_local_datetime(raw)
        .ok_or_else(|| RoadGraphError::decode("timestamp", format!("unparseable `{raw}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_algorithm_names() {
        assert_eq!("exact".parse::<CentralityAlgorithm>().unwrap(), CentralityAlgorithm::Exact);
        assert_eq!(
            "Brandes-Random".parse::<CentralityAlgorithm>().unwrap(),
            CentralityAlgorithm::BrandesRandom
        );
        assert_eq!(
            "brandes-degree".parse::<CentralityAlgorithm>().unwrap(),
            CentralityAlgorithm::BrandesDegree
        );
        assert_eq!("".parse::<CentralityAlgorithm>().unwrap(), CentralityAlgorithm::Default);
        assert!(matches!(
            "pagerank".parse::<CentralityAlgorithm>(),
            Err(RoadGraphError::Validation(_))
        ));
    }

    #[test]
    fn sampling_probability_is_clamped() {
        assert_eq!(random_sampling_probability(0), 0.0);
        assert_eq!(random_sampling_probability(1), 0.0);
        let p = random_sampling_probability(1_000);
        assert!((p - 3.0 / std::f64::consts::E.powi(2)).abs() < 1e-12);
        // log10(N) exceeds e² only for astronomically large N
        assert!(random_sampling_probability(u64::MAX) <= 1.0);
    }
}
