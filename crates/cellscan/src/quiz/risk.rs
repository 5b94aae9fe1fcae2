use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::RiskAssessment;

/// How a band table with gaps or overlaps is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPolicy {
    /// Reject gaps and overlaps between consecutive bands.
    #[default]
    Strict,
    /// Keep the table, log problems, and resolve overlaps by ascending `min_score`.
    Lenient,
}

impl BandPolicy {
    pub fn build(self, bands: Vec<RiskAssessment>) -> Result<RiskBandTable, RiskTableError> {
        match self {
            BandPolicy::Strict => RiskBandTable::strict(bands),
            BandPolicy::Lenient => RiskBandTable::lenient(bands),
        }
    }
}

/// Band whose inclusive range holds `score`. When bands overlap, the one with the lowest
/// `min_score` wins, and input order breaks any remaining tie.
pub fn resolve_risk(
    bands: &[RiskAssessment],
    score: u32,
) -> Result<&RiskAssessment, RiskResolutionError> {
    bands
        .iter()
        .filter(|band| band.contains(score))
        .min_by_key(|band| band.min_score)
        .ok_or(RiskResolutionError::NotFound { score })
}

/// Score-to-band lookup table ordered by ascending `min_score`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskBandTable {
    bands: Vec<RiskAssessment>,
}

impl RiskBandTable {
    pub fn strict(bands: Vec<RiskAssessment>) -> Result<Self, RiskTableError> {
        let bands = sorted(bands)?;
        if let Some(inverted) = bands.iter().find(|band| band.min_score > band.max_score) {
            return Err(inverted_band(inverted));
        }
        if let Some(problem) = bands.windows(2).find_map(|pair| seam(&pair[0], &pair[1])) {
            return Err(problem);
        }
        Ok(Self { bands })
    }

    pub fn lenient(bands: Vec<RiskAssessment>) -> Result<Self, RiskTableError> {
        let bands: Vec<RiskAssessment> = sorted(bands)?
            .into_iter()
            .filter(|band| {
                let keep = band.min_score <= band.max_score;
                if !keep {
                    warn!(risk_level = %band.risk_level, "dropping risk band with inverted bounds");
                }
                keep
            })
            .collect();
        if bands.is_empty() {
            return Err(RiskTableError::Empty);
        }
        for problem in bands.windows(2).filter_map(|pair| seam(&pair[0], &pair[1])) {
            warn!(%problem, "risk band table is not a clean partition");
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[RiskAssessment] {
        &self.bands
    }

    pub fn resolve(&self, score: u32) -> Result<&RiskAssessment, RiskResolutionError> {
        resolve_risk(&self.bands, score)
    }

    /// Checks that every score in `lowest..=highest` falls in some band.
    pub fn ensure_covers(&self, lowest: u32, highest: u32) -> Result<(), RiskTableError> {
        let highest = u64::from(highest);
        let mut next = u64::from(lowest);
        for band in &self.bands {
            if next > highest {
                break;
            }
            let (min, max) = (u64::from(band.min_score), u64::from(band.max_score));
            if max < next {
                continue;
            }
            if min > next {
                return Err(RiskTableError::Gap {
                    from: next as u32,
                    to: (min - 1).min(highest) as u32,
                });
            }
            next = max + 1;
        }
        if next <= highest {
            return Err(RiskTableError::Gap {
                from: next as u32,
                to: highest as u32,
            });
        }
        Ok(())
    }
}

fn sorted(mut bands: Vec<RiskAssessment>) -> Result<Vec<RiskAssessment>, RiskTableError> {
    if bands.is_empty() {
        return Err(RiskTableError::Empty);
    }
    bands.sort_by_key(|band| (band.min_score, band.max_score));
    Ok(bands)
}

fn inverted_band(band: &RiskAssessment) -> RiskTableError {
    RiskTableError::InvertedBand {
        risk_level: band.risk_level.clone(),
        min_score: band.min_score,
        max_score: band.max_score,
    }
}

/// Overlap or gap between two bands adjacent in `min_score` order.
fn seam(lower: &RiskAssessment, upper: &RiskAssessment) -> Option<RiskTableError> {
    if upper.min_score <= lower.max_score {
        return Some(RiskTableError::Overlap {
            lower: lower.risk_level.clone(),
            upper: upper.risk_level.clone(),
            from: upper.min_score,
            to: lower.max_score.min(upper.max_score),
        });
    }
    if u64::from(upper.min_score) > u64::from(lower.max_score) + 1 {
        return Some(RiskTableError::Gap {
            from: lower.max_score + 1,
            to: upper.min_score - 1,
        });
    }
    None
}

/// Problems with the band table itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RiskTableError {
    #[error("risk band table is empty")]
    Empty,
    #[error("risk band '{risk_level}' has min_score {min_score} above max_score {max_score}")]
    InvertedBand {
        risk_level: String,
        min_score: u32,
        max_score: u32,
    },
    #[error("risk bands '{lower}' and '{upper}' overlap on {from}..={to}")]
    Overlap {
        lower: String,
        upper: String,
        from: u32,
        to: u32,
    },
    #[error("no risk band covers scores {from}..={to}")]
    Gap { from: u32, to: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RiskResolutionError {
    #[error("no risk band covers score {score}")]
    NotFound { score: u32 },
}
