//! Chart tables derived from the filtered view

use super::{
    first_population_by_region, rate_per_100k, require, sorted_descending, sum_by, Availability,
    SkipReason,
};
use crate::dataset::Column;
use crate::filter::FilteredView;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// One slice of the benefits-by-region donut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionShare {
    pub region: String,
    pub benefits: f64,
    /// Share of the total, in percent
    pub share_pct: f64,
}

/// Benefits-by-region donut with its highlighted largest region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionShares {
    pub rows: Vec<RegionShare>,
    pub total: f64,
    pub leader: String,
    pub leader_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTotal {
    pub benefit_type: String,
    pub benefits: f64,
}

/// Pareto row; `cumulative_pct` reaches 100 on the last row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoRow {
    pub status: String,
    pub benefits: f64,
    pub cumulative_benefits: f64,
    pub cumulative_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBracketTotal {
    pub age_bracket: String,
    pub benefits: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRate {
    pub region: String,
    pub benefits: f64,
    pub population: f64,
    /// Benefits per 100k inhabitants
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSexRate {
    pub month_key: String,
    pub sex: String,
    pub benefits: f64,
    /// Benefits per 100k inhabitants of the region baseline
    pub rate: f64,
}

/// Month x sex rates sharing one population denominator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSexRates {
    pub denominator: f64,
    pub rows: Vec<MonthSexRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPopulation {
    pub region: String,
    pub population: f64,
}

/// Benefits per region as a share of the total, plus the largest region
pub fn by_region_share(view: &FilteredView<'_>) -> Availability<RegionShares> {
    let build = || -> Result<RegionShares, SkipReason> {
        require(view, &[Column::Region, Column::BenefitCount])?;

        let groups: Vec<(String, f64)> = sum_by(view, Column::Region)
            .into_iter()
            .filter(|(_, benefits)| *benefits > 0.0)
            .collect();
        let total: f64 = groups.iter().map(|(_, benefits)| benefits).sum();
        if groups.is_empty() || total <= 0.0 {
            return Err(SkipReason::ZeroTotal);
        }

        let rows: Vec<RegionShare> = groups
            .into_iter()
            .map(|(region, benefits)| RegionShare {
                share_pct: benefits / total * 100.0,
                region,
                benefits,
            })
            .collect();

        // First region wins a tie
        let leader = rows
            .iter()
            .fold(None::<&RegionShare>, |best, row| match best {
                Some(b) if b.benefits >= row.benefits => Some(b),
                _ => Some(row),
            })
            .ok_or(SkipReason::ZeroTotal)?;
        let (leader, leader_pct) = (leader.region.clone(), leader.share_pct);

        Ok(RegionShares {
            rows,
            total,
            leader,
            leader_pct,
        })
    };
    build().into()
}

/// Benefits per benefit type, largest first
pub fn by_type(view: &FilteredView<'_>) -> Availability<Vec<TypeTotal>> {
    let build = || -> Result<Vec<TypeTotal>, SkipReason> {
        require(view, &[Column::BenefitType, Column::BenefitCount])?;

        let sums = sum_by(view, Column::BenefitType)
            .into_iter()
            .filter(|(_, benefits)| *benefits > 0.0)
            .collect();
        let rows: Vec<TypeTotal> = sorted_descending(sums)
            .into_iter()
            .map(|(benefit_type, benefits)| TypeTotal {
                benefit_type,
                benefits,
            })
            .collect();

        if rows.is_empty() {
            return Err(SkipReason::ZeroTotal);
        }
        Ok(rows)
    };
    build().into()
}

/// Benefits per beneficiary status, sorted descending with cumulative share
pub fn pareto_by_status(view: &FilteredView<'_>) -> Availability<Vec<ParetoRow>> {
    let build = || -> Result<Vec<ParetoRow>, SkipReason> {
        require(view, &[Column::BeneficiaryStatus, Column::BenefitCount])?;

        let groups = sorted_descending(sum_by(view, Column::BeneficiaryStatus));
        let total: f64 = groups.iter().map(|(_, benefits)| benefits).sum();
        if groups.is_empty() || total <= 0.0 {
            return Err(SkipReason::ZeroTotal);
        }

        let mut cumulative = 0.0;
        let rows = groups
            .into_iter()
            .map(|(status, benefits)| {
                cumulative += benefits;
                ParetoRow {
                    status,
                    benefits,
                    cumulative_benefits: cumulative,
                    cumulative_pct: cumulative / total * 100.0,
                }
            })
            .collect();
        Ok(rows)
    };
    build().into()
}

fn leading_number() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").ok()).as_ref()
}

/// First integer embedded in an age bracket label ("60-69" -> 60)
pub fn age_sort_key(label: &str) -> Option<u64> {
    leading_number()?
        .find(label)
        .and_then(|m| m.as_str().parse().ok())
}

/// Benefits per age bracket, ordered by the bracket's first integer
///
/// When any label carries no integer the whole table falls back to lexical
/// order.
pub fn by_age_bracket(view: &FilteredView<'_>) -> Availability<Vec<AgeBracketTotal>> {
    let build = || -> Result<Vec<AgeBracketTotal>, SkipReason> {
        require(view, &[Column::AgeBracket, Column::BenefitCount])?;

        // Lexical order comes from the sorted group keys
        let groups: Vec<(String, f64)> = sum_by(view, Column::AgeBracket)
            .into_iter()
            .filter(|(_, benefits)| *benefits > 0.0)
            .collect();
        if groups.is_empty() {
            return Err(SkipReason::ZeroTotal);
        }

        let keys: Option<Vec<u64>> = groups.iter().map(|(label, _)| age_sort_key(label)).collect();
        let mut keyed: Vec<(Option<u64>, String, f64)> = match keys {
            Some(keys) => keys
                .into_iter()
                .zip(groups)
                .map(|(key, (label, benefits))| (Some(key), label, benefits))
                .collect(),
            None => groups
                .into_iter()
                .map(|(label, benefits)| (None, label, benefits))
                .collect(),
        };
        keyed.sort_by_key(|(key, _, _)| *key);

        Ok(keyed
            .into_iter()
            .map(|(_, age_bracket, benefits)| AgeBracketTotal {
                age_bracket,
                benefits,
            })
            .collect())
    };
    build().into()
}

/// Benefits per 100k inhabitants for each region, highest first
pub fn rate_by_region(view: &FilteredView<'_>) -> Availability<Vec<RegionRate>> {
    let build = || -> Result<Vec<RegionRate>, SkipReason> {
        require(view, &[Column::Region, Column::BenefitCount, Column::Population])?;

        let sums = sum_by(view, Column::Region);
        let populations = first_population_by_region(view);

        let mut rows: Vec<RegionRate> = sums
            .into_iter()
            .filter_map(|(region, benefits)| {
                let population = populations.get(&region).copied().unwrap_or(0.0);
                (population > 0.0).then(|| RegionRate {
                    rate: rate_per_100k(benefits, population),
                    region,
                    benefits,
                    population,
                })
            })
            .collect();

        if rows.is_empty() {
            return Err(SkipReason::NoPositivePopulation);
        }
        rows.sort_by(|a, b| b.rate.total_cmp(&a.rate));
        Ok(rows)
    };
    build().into()
}

/// Benefits per 100k inhabitants by month and sex
///
/// The denominator is the population of the region-only `baseline`, not of
/// the filtered view, so rates stay comparable as the date window moves.
pub fn rate_by_month_sex(
    view: &FilteredView<'_>,
    baseline: &FilteredView<'_>,
) -> Availability<MonthSexRates> {
    let build = || -> Result<MonthSexRates, SkipReason> {
        require(
            view,
            &[Column::Sex, Column::BenefitCount, Column::Region, Column::Population],
        )?;

        let denominator: f64 = first_population_by_region(baseline).values().sum();
        if denominator <= 0.0 {
            return Err(SkipReason::ZeroDenominator);
        }

        let mut sums: BTreeMap<(String, String), f64> = BTreeMap::new();
        for record in view.iter() {
            if let Some(sex) = record.sex.as_deref() {
                *sums
                    .entry((record.month_key.clone(), sex.to_string()))
                    .or_insert(0.0) += record.benefit_count;
            }
        }

        let rows = sums
            .into_iter()
            .map(|((month_key, sex), benefits)| MonthSexRate {
                rate: rate_per_100k(benefits, denominator),
                month_key,
                sex,
                benefits,
            })
            .collect();

        Ok(MonthSexRates { denominator, rows })
    };
    build().into()
}

/// Population counted for each region in the view
pub fn population_by_region(view: &FilteredView<'_>) -> Availability<Vec<RegionPopulation>> {
    let build = || -> Result<Vec<RegionPopulation>, SkipReason> {
        require(view, &[Column::Region, Column::Population])?;

        Ok(first_population_by_region(view)
            .into_iter()
            .map(|(region, population)| RegionPopulation { region, population })
            .collect())
    };
    build().into()
}
