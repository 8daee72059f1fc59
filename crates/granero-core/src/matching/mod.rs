pub mod silo;

use crate::model::{GrainBatch, Ship};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use silo::SiloResolver;
use std::collections::HashMap;
use tracing::{debug, warn};

/// The batch a silo group was drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMatch {
    pub batch_id: String,
    pub quantity_tonnes: Decimal,
    #[serde(default)]
    pub grain_type: Option<String>,
}

/// Finds the grain batch physically present in a silo.
///
/// Ship and grain names in reports rarely match the batch records exactly,
/// so both are compared loosely and a batch is only ruled out when it has a
/// value that clearly disagrees.
pub struct BatchMatcher<'a> {
    silos: &'a SiloResolver,
    batches: &'a [GrainBatch],
    ship_names: HashMap<&'a str, &'a str>,
}

impl<'a> BatchMatcher<'a> {
    pub fn new(silos: &'a SiloResolver, batches: &'a [GrainBatch], ships: &'a [Ship]) -> Self {
        BatchMatcher {
            silos,
            batches,
            ship_names: ships
                .iter()
                .map(|s| (s.id.as_str(), s.name.as_str()))
                .collect(),
        }
    }

    /// Pick the most plausible batch for a silo reading.
    ///
    /// Among the batches resident in the silo on `as_of` that agree on ship
    /// and grain, the latest entry date wins, then the largest quantity.
    pub fn find(
        &self,
        silo_id: &str,
        ship: &str,
        grain_type: &str,
        as_of: Option<NaiveDate>,
    ) -> Option<BatchMatch> {
        let Some(target) = self.silos.resolve(silo_id) else {
            warn!(silo = silo_id, "cannot resolve silo for batch matching");
            return None;
        };

        let best = self
            .batches
            .iter()
            .filter(|b| self.is_resident(b, target, as_of))
            .filter(|b| ship_agrees(self.ship_name(b), ship))
            .filter(|b| grain_agrees(b, grain_type))
            .max_by(|a, b| {
                a.entry_date
                    .cmp(&b.entry_date)
                    .then_with(|| a.quantity_tonnes().cmp(&b.quantity_tonnes()))
            });

        match best {
            Some(batch) => {
                debug!(silo = silo_id, batch = %batch.id, "matched batch");
                Some(BatchMatch {
                    batch_id: batch.id.clone(),
                    quantity_tonnes: batch.quantity_tonnes(),
                    grain_type: batch.grain_type.clone(),
                })
            }
            None => {
                debug!(silo = silo_id, ship, grain_type, "no batch candidate");
                None
            }
        }
    }

    fn is_resident(&self, batch: &GrainBatch, target: &str, as_of: Option<NaiveDate>) -> bool {
        let silo = match as_of {
            Some(date) => {
                if batch.entry_date.is_some_and(|entry| entry > date) {
                    return false;
                }
                batch.silo_on(date)
            }
            None => batch.current_silo.as_deref(),
        };
        silo.is_some_and(|s| self.silos.same_silo(s, target))
    }

    /// Ship name recorded for a batch: its own field, the ship table, then origin.
    fn ship_name(&self, batch: &'a GrainBatch) -> Option<&'a str> {
        non_empty(batch.ship.as_deref())
            .or_else(|| {
                batch
                    .ship_id
                    .as_deref()
                    .and_then(|id| self.ship_names.get(id).copied())
            })
            .or_else(|| non_empty(batch.origin.as_deref()))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn ship_agrees(recorded: Option<&str>, reported: &str) -> bool {
    let reported = normalize(reported);
    let Some(recorded) = recorded.map(normalize) else {
        return true;
    };
    if reported.is_empty() || recorded.is_empty() {
        return true;
    }
    recorded.contains(&reported) || reported.contains(&recorded)
}

fn grain_agrees(batch: &GrainBatch, reported: &str) -> bool {
    let recorded: Vec<&str> = [batch.grain_type.as_deref(), batch.grain_subtype.as_deref()]
        .into_iter()
        .flatten()
        .filter(|v| !v.trim().is_empty())
        .collect();
    if reported.trim().is_empty() || recorded.is_empty() {
        return true;
    }
    recorded.iter().any(|r| grain_matches(r, reported))
}

/// Exact, substring either way, or any shared word split on spaces/dashes.
pub fn grain_matches(recorded: &str, reported: &str) -> bool {
    let a = normalize(recorded);
    let b = normalize(reported);
    if a == b || a.contains(&b) || b.contains(&a) {
        return true;
    }
    let words = |s: &str| -> Vec<String> {
        s.split(|c: char| c.is_whitespace() || c == '-')
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    };
    let a_words = words(&a);
    words(&b).iter().any(|w| a_words.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{QuantityUnit, Silo, SiloMovement};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn resolver() -> SiloResolver {
        let silos = vec![
            Silo {
                id: "AP-01".into(),
                name: "Silo 1".into(),
            },
            Silo {
                id: "AP-02".into(),
                name: "Silo 2".into(),
            },
        ];
        let config = EngineConfig {
            silo_prefix: "AP".into(),
            silo_aliases: BTreeMap::new(),
            line_gap: 3.0,
        };
        SiloResolver::new(&silos, &config)
    }

    fn batch(id: &str, silo: &str, entry: &str, quantity: Decimal) -> GrainBatch {
        GrainBatch {
            id: id.into(),
            ship: Some("MV MALTA EXPRESS".into()),
            ship_id: None,
            origin: None,
            grain_type: Some("Trigo".into()),
            grain_subtype: Some("HRW".into()),
            quantity,
            unit: QuantityUnit::Tonnes,
            entry_date: Some(d(entry)),
            current_silo: Some(silo.into()),
            movements: vec![],
        }
    }

    #[test]
    fn test_latest_entry_date_wins() {
        let r = resolver();
        let batches = vec![
            batch("L-1", "AP-01", "2024-01-10", dec!(900)),
            batch("L-2", "AP-01", "2024-02-10", dec!(300)),
        ];
        let m = BatchMatcher::new(&r, &batches, &[]);
        let found = m
            .find("AP-1", "MALTA EXPRESS", "TRIGO", Some(d("2024-04-08")))
            .unwrap();
        assert_eq!(found.batch_id, "L-2");
        assert_eq!(found.quantity_tonnes, dec!(300));
    }

    #[test]
    fn test_equal_dates_larger_quantity_wins() {
        let r = resolver();
        let batches = vec![
            batch("L-1", "AP-01", "2024-01-10", dec!(300)),
            batch("L-2", "AP-01", "2024-01-10", dec!(900)),
            batch("L-3", "AP-01", "2024-01-10", dec!(500)),
        ];
        let m = BatchMatcher::new(&r, &batches, &[]);
        let found = m.find("SILO 1", "MALTA", "", None).unwrap();
        assert_eq!(found.batch_id, "L-2");
    }

    #[test]
    fn test_kilograms_normalized_to_tonnes() {
        let r = resolver();
        let mut b = batch("L-1", "AP-01", "2024-01-10", dec!(250000));
        b.unit = QuantityUnit::Kilograms;
        let batches = vec![b];
        let m = BatchMatcher::new(&r, &batches, &[]);
        let found = m.find("AP-01", "", "", None).unwrap();
        assert_eq!(found.quantity_tonnes, dec!(250));
    }

    #[test]
    fn test_unresolvable_silo() {
        let r = resolver();
        let batches = vec![batch("L-1", "AP-01", "2024-01-10", dec!(300))];
        let m = BatchMatcher::new(&r, &batches, &[]);
        assert!(m.find("ZZ-9", "MALTA", "TRIGO", None).is_none());
    }

    #[test]
    fn test_other_silo_excluded() {
        let r = resolver();
        let batches = vec![batch("L-1", "AP-02", "2024-01-10", dec!(300))];
        let m = BatchMatcher::new(&r, &batches, &[]);
        assert!(m.find("AP-01", "MALTA", "TRIGO", None).is_none());
    }

    #[test]
    fn test_ship_disagreement_excludes() {
        let r = resolver();
        let mut other = batch("L-1", "AP-01", "2024-03-01", dec!(300));
        other.ship = Some("NORDIC STAR".into());
        let batches = vec![other, batch("L-2", "AP-01", "2024-01-01", dec!(100))];
        let m = BatchMatcher::new(&r, &batches, &[]);
        let found = m.find("AP-01", "malta express", "", None).unwrap();
        assert_eq!(found.batch_id, "L-2");
    }

    #[test]
    fn test_missing_batch_fields_do_not_exclude() {
        let r = resolver();
        let mut b = batch("L-1", "AP-01", "2024-01-01", dec!(100));
        b.ship = None;
        b.grain_type = None;
        b.grain_subtype = None;
        let batches = vec![b];
        let m = BatchMatcher::new(&r, &batches, &[]);
        assert!(m.find("AP-01", "ANY SHIP", "MAIZ", None).is_some());
    }

    #[test]
    fn test_ship_from_lookup_table_and_origin() {
        let r = resolver();
        let mut by_id = batch("L-1", "AP-01", "2024-01-01", dec!(100));
        by_id.ship = None;
        by_id.ship_id = Some("S-7".into());
        let mut by_origin = batch("L-2", "AP-02", "2024-01-01", dec!(100));
        by_origin.ship = None;
        by_origin.origin = Some("Malta Express / Rosario".into());
        let ships = vec![Ship {
            id: "S-7".into(),
            name: "Nordic Star".into(),
        }];
        let batches = vec![by_id, by_origin];
        let m = BatchMatcher::new(&r, &batches, &ships);
        assert!(m.find("AP-01", "NORDIC STAR", "", None).is_some());
        assert!(m.find("AP-01", "MALTA EXPRESS", "", None).is_none());
        assert!(m.find("AP-02", "MALTA EXPRESS", "", None).is_some());
    }

    #[test]
    fn test_grain_matching() {
        assert!(grain_matches("Trigo", "TRIGO"));
        assert!(grain_matches("Trigo Pan", "trigo"));
        assert!(grain_matches("Soya-HP", "harina soya"));
        assert!(!grain_matches("Maiz", "Trigo"));
    }

    #[test]
    fn test_grain_subtype_agrees() {
        let r = resolver();
        let batches = vec![batch("L-1", "AP-01", "2024-01-01", dec!(100))];
        let m = BatchMatcher::new(&r, &batches, &[]);
        assert!(m.find("AP-01", "", "HRW", None).is_some());
        assert!(m.find("AP-01", "", "MAIZ", None).is_none());
    }

    #[test]
    fn test_as_of_date_uses_movement_history() {
        let r = resolver();
        let mut moved = batch("L-1", "AP-02", "2024-01-01", dec!(100));
        moved.movements.push(SiloMovement {
            date: d("2024-03-01"),
            from_silo: "AP-01".into(),
            to_silo: "AP-02".into(),
            quantity: dec!(100),
        });
        let late = batch("L-2", "AP-01", "2024-05-01", dec!(100));
        let batches = vec![moved, late];
        let m = BatchMatcher::new(&r, &batches, &[]);

        let found = m.find("AP-01", "", "", Some(d("2024-02-01"))).unwrap();
        assert_eq!(found.batch_id, "L-1");
        let found = m.find("AP-02", "", "", Some(d("2024-04-01"))).unwrap();
        assert_eq!(found.batch_id, "L-1");
        assert!(m.find("AP-01", "", "", Some(d("2024-04-01"))).is_none());
    }
}
