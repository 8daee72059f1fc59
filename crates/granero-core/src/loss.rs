use crate::matching::BatchMatch;
use crate::model::{HistorialPerdidaSilo, Sample};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Days in the weekly damage window.
const WEEK_DAYS: i64 = 7;
/// Larvae developing per live adult weevil.
const LARVAE_PER_ADULT: i64 = 6;

/// Cost of grain per kilogram, keyed by grain type.
///
/// Lookups ignore case and surrounding whitespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrainCosts(BTreeMap<String, Decimal>);

impl GrainCosts {
    pub fn new() -> Self {
        GrainCosts::default()
    }

    pub fn insert(&mut self, grain_type: &str, cost_per_kg: Decimal) {
        self.0.insert(grain_type.to_string(), cost_per_kg);
    }

    pub fn cost_per_kg(&self, grain_type: &str) -> Option<Decimal> {
        let wanted = grain_type.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.0
            .iter()
            .find(|(k, _)| k.trim().to_lowercase() == wanted)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Decimal)> for GrainCosts {
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        GrainCosts(iter.into_iter().collect())
    }
}

/// Weekly loss for one silo group of a report.
///
/// Top and bottom readings of a silo are averaged, not summed. Tonnage comes
/// from the largest positive observation on the report, else from the
/// matched batch. An observation too large to compute with is discarded in
/// favour of the batch tonnage. An unmatched group still produces a row,
/// with no batch id.
pub fn compute_loss(
    silo: &str,
    samples: &[Sample],
    batch: Option<&BatchMatch>,
    costs: &GrainCosts,
    week_date: NaiveDate,
    report_number: Option<&str>,
) -> HistorialPerdidaSilo {
    let avg_live_weevils = average(samples, |s| s.live_weevils());
    let avg_lice = average(samples, |s| s.counts.lice);

    let observed = samples
        .iter()
        .map(|s| s.observation)
        .filter(|o| *o > Decimal::ZERO)
        .max();
    let batch_tons = batch.map(|b| b.quantity_tonnes).unwrap_or(Decimal::ZERO);
    let mut total_tons = observed.unwrap_or(batch_tons);

    if batch.is_none() {
        warn!(silo, week = %week_date, "no batch matched; loss row has no batch reference");
    }

    // The grain column is sometimes lost; the matched batch still knows it.
    let grain_type = samples
        .iter()
        .map(|s| s.grain_type.trim())
        .find(|g| !g.is_empty())
        .or_else(|| batch.and_then(|b| b.grain_type.as_deref()).map(str::trim))
        .unwrap_or_default()
        .to_string();

    let cost = match costs.cost_per_kg(&grain_type) {
        Some(cost) => cost,
        None => {
            warn!(silo, grain_type = %grain_type, "no grain cost; economic loss is 0");
            Decimal::ZERO
        }
    };

    let damage = match weekly_damage(avg_live_weevils, avg_lice, total_tons, cost) {
        Some(damage) => damage,
        None => {
            warn!(
                silo,
                observed = %total_tons,
                fallback = %batch_tons,
                "tonnage overflows loss arithmetic; using batch tonnage"
            );
            total_tons = batch_tons;
            match weekly_damage(avg_live_weevils, avg_lice, total_tons, cost) {
                Some(damage) => damage,
                None => {
                    warn!(silo, tons = %total_tons, "batch tonnage overflows loss arithmetic; loss is 0");
                    total_tons = Decimal::ZERO;
                    WeeklyDamage::default()
                }
            }
        }
    };

    HistorialPerdidaSilo {
        batch_id: batch.map(|b| b.batch_id.clone()),
        silo: silo.to_string(),
        week_date,
        grain_type,
        report_number: report_number.map(str::to_string),
        avg_live_weevils,
        avg_lice,
        total_tons,
        acid_uric: damage.acid_uric,
        damage_adult_weevils_kg: damage.adult_weevils_kg,
        damage_total_weevils_kg: damage.total_weevils_kg,
        damage_lice_kg: damage.lice_kg,
        damage_total_pest_kg: damage.total_pest_kg,
        weekly_economic_loss: damage.economic_loss,
    }
}

#[derive(Debug, Default)]
struct WeeklyDamage {
    acid_uric: Decimal,
    adult_weevils_kg: Decimal,
    total_weevils_kg: Decimal,
    lice_kg: Decimal,
    total_pest_kg: Decimal,
    economic_loss: Decimal,
}

/// The coefficient chain, or `None` when any step overflows.
fn weekly_damage(
    weevils: Decimal,
    lice: Decimal,
    tons: Decimal,
    cost: Decimal,
) -> Option<WeeklyDamage> {
    let tenth = Decimal::new(1, 1);
    let week = Decimal::from(WEEK_DAYS);
    let larvae = Decimal::from(LARVAE_PER_ADULT);
    let kilograms = tons.checked_mul(Decimal::ONE_THOUSAND)?;

    let adults = weevils.checked_mul(tenth)?;
    let young = weevils.checked_mul(larvae)?.checked_mul(tenth)?;
    let acid_uric = adults
        .checked_add(young)?
        .checked_mul(week)?
        .checked_div(Decimal::TEN)?
        .checked_mul(tons.checked_div(Decimal::ONE_THOUSAND)?)?;

    let adult_weevils_kg = weevils
        .checked_mul(kilograms)?
        .checked_mul(Decimal::new(1, 6))?
        .checked_mul(week)?;
    let total_weevils_kg = adult_weevils_kg.checked_mul(larvae)?;
    let lice_kg = lice
        .checked_mul(kilograms)?
        .checked_mul(Decimal::new(33, 8))?
        .checked_mul(week)?;
    let total_pest_kg = total_weevils_kg.checked_add(lice_kg)?;

    Some(WeeklyDamage {
        acid_uric,
        adult_weevils_kg,
        total_weevils_kg,
        lice_kg,
        total_pest_kg,
        economic_loss: total_pest_kg.checked_mul(cost)?,
    })
}

fn average(samples: &[Sample], count: impl Fn(&Sample) -> u32) -> Decimal {
    if samples.is_empty() {
        return Decimal::ZERO;
    }
    let total: u64 = samples.iter().map(|s| u64::from(count(s))).sum();
    Decimal::from(total) / Decimal::from(samples.len() as u64)
}

/// Accumulated loss of one batch across weeks and silo moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchLossSummary {
    pub batch_id: String,
    pub entries: usize,
    pub silos: Vec<String>,
    pub first_week: Option<NaiveDate>,
    pub last_week: Option<NaiveDate>,
    pub damage_total_pest_kg: Decimal,
    pub economic_loss: Decimal,
}

/// Sum every ledger row of `batch_id`. Duplicate ingestions count twice.
pub fn summarize_batch(batch_id: &str, rows: &[HistorialPerdidaSilo]) -> BatchLossSummary {
    let mine: Vec<&HistorialPerdidaSilo> = rows
        .iter()
        .filter(|r| r.batch_id.as_deref() == Some(batch_id))
        .collect();

    BatchLossSummary {
        batch_id: batch_id.to_string(),
        entries: mine.len(),
        silos: mine
            .iter()
            .map(|r| r.silo.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
        first_week: mine.iter().map(|r| r.week_date).min(),
        last_week: mine.iter().map(|r| r.week_date).max(),
        damage_total_pest_kg: mine.iter().map(|r| r.damage_total_pest_kg).sum(),
        economic_loss: mine.iter().map(|r| r.weekly_economic_loss).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Muestra, PestCounts};
    use rust_decimal_macros::dec;

    fn week() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 8).unwrap()
    }

    fn sample(weevils: u32, lice: u32, observation: Decimal) -> Sample {
        let mut fields = [0; 11];
        fields[0] = lice;
        fields[1] = weevils;
        Sample {
            silo: "AP-01".into(),
            muestra: Muestra::Arriba,
            ship: "MALTA EXPRESS".into(),
            grain_type: "TRIGO".into(),
            storage_date: None,
            days_stored: 0,
            counts: PestCounts::from_fields(fields),
            observation,
        }
    }

    fn costs() -> GrainCosts {
        let mut costs = GrainCosts::new();
        costs.insert("Trigo", dec!(0.5));
        costs
    }

    fn matched(tons: Decimal) -> BatchMatch {
        BatchMatch {
            batch_id: "L-1".into(),
            quantity_tonnes: tons,
            grain_type: Some("Trigo".into()),
        }
    }

    #[test]
    fn test_weekly_loss_regression() {
        let samples = vec![sample(10, 0, Decimal::ZERO)];
        let batch = matched(dec!(100));
        let row = compute_loss("AP-01", &samples, Some(&batch), &costs(), week(), Some("2024-118"));

        assert_eq!(row.avg_live_weevils, dec!(10));
        assert_eq!(row.total_tons, dec!(100));
        assert_eq!(row.acid_uric, dec!(0.49));
        assert_eq!(row.damage_adult_weevils_kg, dec!(7));
        assert_eq!(row.damage_total_weevils_kg, dec!(42));
        assert_eq!(row.damage_lice_kg, dec!(0));
        assert_eq!(row.damage_total_pest_kg, dec!(42));
        assert_eq!(row.weekly_economic_loss, dec!(21));
        assert_eq!(row.batch_id.as_deref(), Some("L-1"));
        assert_eq!(row.report_number.as_deref(), Some("2024-118"));
    }

    #[test]
    fn test_top_and_bottom_are_averaged() {
        let samples = vec![sample(12, 4, Decimal::ZERO), sample(8, 2, Decimal::ZERO)];
        let batch = matched(dec!(100));
        let row = compute_loss("AP-01", &samples, Some(&batch), &costs(), week(), None);
        assert_eq!(row.avg_live_weevils, dec!(10));
        assert_eq!(row.avg_lice, dec!(3));
        // 3 * 100000 * 0.00000033 * 7
        assert_eq!(row.damage_lice_kg, dec!(0.693));
        assert_eq!(row.damage_total_pest_kg, dec!(42.693));
    }

    #[test]
    fn test_observation_overrides_batch_tonnage() {
        let samples = vec![sample(10, 0, dec!(50)), sample(10, 0, dec!(80))];
        let batch = matched(dec!(100));
        let row = compute_loss("AP-01", &samples, Some(&batch), &costs(), week(), None);
        assert_eq!(row.total_tons, dec!(80));
    }

    #[test]
    fn test_unmatched_batch_still_emits_row() {
        let samples = vec![sample(10, 0, dec!(100))];
        let row = compute_loss("AP-01", &samples, None, &costs(), week(), None);
        assert_eq!(row.batch_id, None);
        assert_eq!(row.total_tons, dec!(100));
        assert_eq!(row.weekly_economic_loss, dec!(21));
    }

    #[test]
    fn test_unmatched_without_observation_has_zero_tons() {
        let samples = vec![sample(10, 0, Decimal::ZERO)];
        let row = compute_loss("AP-01", &samples, None, &costs(), week(), None);
        assert_eq!(row.total_tons, Decimal::ZERO);
        assert_eq!(row.damage_total_pest_kg, Decimal::ZERO);
    }

    #[test]
    fn test_missing_cost_means_zero_loss() {
        let samples = vec![sample(10, 0, dec!(100))];
        let row = compute_loss("AP-01", &samples, None, &GrainCosts::new(), week(), None);
        assert_eq!(row.damage_total_pest_kg, dec!(42));
        assert_eq!(row.weekly_economic_loss, Decimal::ZERO);
    }

    #[test]
    fn test_cost_lookup_ignores_case() {
        let costs = costs();
        assert_eq!(costs.cost_per_kg(" trigo "), Some(dec!(0.5)));
        assert_eq!(costs.cost_per_kg("MAIZ"), None);
        assert_eq!(costs.cost_per_kg(""), None);
    }

    #[test]
    fn test_oversized_observation_falls_back_to_batch() {
        let huge: Decimal = "100000000000000000000000000".parse().unwrap();
        let samples = vec![sample(10, 0, huge)];
        let batch = matched(dec!(100));
        let row = compute_loss("AP-01", &samples, Some(&batch), &costs(), week(), None);
        assert_eq!(row.total_tons, dec!(100));
        assert_eq!(row.weekly_economic_loss, dec!(21));

        let row = compute_loss("AP-01", &samples, None, &costs(), week(), None);
        assert_eq!(row.total_tons, Decimal::ZERO);
        assert_eq!(row.damage_total_pest_kg, Decimal::ZERO);
        assert_eq!(row.weekly_economic_loss, Decimal::ZERO);
    }

    #[test]
    fn test_batch_grain_type_prices_sample_without_grain() {
        let mut s = sample(10, 0, Decimal::ZERO);
        s.grain_type.clear();
        let batch = matched(dec!(100));
        let row = compute_loss("AP-01", &[s.clone()], Some(&batch), &costs(), week(), None);
        assert_eq!(row.grain_type, "Trigo");
        assert_eq!(row.weekly_economic_loss, dec!(21));

        let row = compute_loss("AP-01", &[s], None, &costs(), week(), None);
        assert_eq!(row.grain_type, "");
        assert_eq!(row.weekly_economic_loss, Decimal::ZERO);
    }

    #[test]
    fn test_summarize_batch() {
        let samples = vec![sample(10, 0, Decimal::ZERO)];
        let batch = matched(dec!(100));
        let first = compute_loss("AP-01", &samples, Some(&batch), &costs(), week(), None);
        let mut moved = first.clone();
        moved.silo = "AP-02".into();
        moved.week_date = NaiveDate::from_ymd_opt(2024, 4, 15).unwrap();
        let unmatched = compute_loss("AP-03", &samples, None, &costs(), week(), None);

        let summary = summarize_batch("L-1", &[first.clone(), first, moved, unmatched]);
        assert_eq!(summary.entries, 3);
        assert_eq!(summary.silos, vec!["AP-01".to_string(), "AP-02".to_string()]);
        assert_eq!(summary.first_week, Some(week()));
        assert_eq!(summary.damage_total_pest_kg, dec!(126));
        assert_eq!(summary.economic_loss, dec!(63));
    }
}
