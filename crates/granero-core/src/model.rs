use crate::matching::silo::canonical_silo_code;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Sampling position inside a silo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Muestra {
    Arriba,
    Abajo,
}

impl Muestra {
    pub fn from_str_loose(s: &str) -> Option<Muestra> {
        match s.trim().to_lowercase().as_str() {
            "arriba" => Some(Muestra::Arriba),
            "abajo" => Some(Muestra::Abajo),
            _ => None,
        }
    }
}

impl fmt::Display for Muestra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Muestra::Arriba => write!(f, "Arriba"),
            Muestra::Abajo => write!(f, "Abajo"),
        }
    }
}

/// The five insect species tracked per sample, in report column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Gorgojo,
    Taladrillo,
    Tribolium,
    Oryzaephilus,
    Cryptolestes,
}

impl Species {
    pub const ALL: [Species; 5] = [
        Species::Gorgojo,
        Species::Taladrillo,
        Species::Tribolium,
        Species::Oryzaephilus,
        Species::Cryptolestes,
    ];

    pub fn scientific_name(&self) -> &'static str {
        match self {
            Species::Gorgojo => "Sitophilus spp.",
            Species::Taladrillo => "Rhyzopertha dominica",
            Species::Tribolium => "Tribolium castaneum",
            Species::Oryzaephilus => "Oryzaephilus surinamensis",
            Species::Cryptolestes => "Cryptolestes ferrugineus",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Gorgojo => write!(f, "Gorgojo"),
            Species::Taladrillo => write!(f, "Taladrillo"),
            Species::Tribolium => write!(f, "Tribolium"),
            Species::Oryzaephilus => write!(f, "Oryzaephilus"),
            Species::Cryptolestes => write!(f, "Cryptolestes"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PestCount {
    pub alive: u32,
    pub dead: u32,
}

/// Raw insect counts for one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PestCounts {
    /// Lice/mite count. Reported without an alive/dead split.
    pub lice: u32,
    pub gorgojo: PestCount,
    pub taladrillo: PestCount,
    pub tribolium: PestCount,
    pub oryzaephilus: PestCount,
    pub cryptolestes: PestCount,
}

/// Number of count columns in a report row: lice, then an alive/dead pair per species.
pub const COUNT_FIELDS: usize = 11;

impl PestCounts {
    /// Build from the 11 count columns in report order.
    pub fn from_fields(fields: [u32; COUNT_FIELDS]) -> Self {
        let pair = |i: usize| PestCount {
            alive: fields[i],
            dead: fields[i + 1],
        };
        PestCounts {
            lice: fields[0],
            gorgojo: pair(1),
            taladrillo: pair(3),
            tribolium: pair(5),
            oryzaephilus: pair(7),
            cryptolestes: pair(9),
        }
    }

    pub fn get(&self, species: Species) -> PestCount {
        match species {
            Species::Gorgojo => self.gorgojo,
            Species::Taladrillo => self.taladrillo,
            Species::Tribolium => self.tribolium,
            Species::Oryzaephilus => self.oryzaephilus,
            Species::Cryptolestes => self.cryptolestes,
        }
    }

    pub fn total_alive(&self) -> u64 {
        Species::ALL
            .iter()
            .map(|s| u64::from(self.get(*s).alive))
            .sum::<u64>()
            + u64::from(self.lice)
    }

    pub fn total_dead(&self) -> u64 {
        Species::ALL
            .iter()
            .map(|s| u64::from(self.get(*s).dead))
            .sum()
    }
}

/// One inspected position in one silo, from one report.
///
/// Totals are never stored: `total_alive`/`total_dead` are recomputed from
/// the per-species counts, so stale aggregates in persisted JSON are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub silo: String,
    pub muestra: Muestra,
    pub ship: String,
    pub grain_type: String,
    #[serde(default)]
    pub storage_date: Option<NaiveDate>,
    pub days_stored: u32,
    pub counts: PestCounts,
    /// Tonnage written on the report. Authoritative when positive.
    pub observation: Decimal,
}

impl Sample {
    pub fn total_alive(&self) -> u64 {
        self.counts.total_alive()
    }

    pub fn total_dead(&self) -> u64 {
        self.counts.total_dead()
    }

    pub fn live_weevils(&self) -> u32 {
        self.counts.gorgojo.alive
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Bajo,
    Medio,
    Alto,
    Critico,
}

impl RiskLevel {
    /// Bucket an average live-insect pressure per silo.
    pub fn from_pressure(pressure: Decimal) -> RiskLevel {
        if pressure > Decimal::TEN {
            RiskLevel::Critico
        } else if pressure > Decimal::from(5) {
            RiskLevel::Alto
        } else if pressure > Decimal::ZERO {
            RiskLevel::Medio
        } else {
            RiskLevel::Bajo
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Bajo => write!(f, "bajo"),
            RiskLevel::Medio => write!(f, "medio"),
            RiskLevel::Alto => write!(f, "alto"),
            RiskLevel::Critico => write!(f, "critico"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportHeader {
    pub report_number: Option<String>,
    pub client: Option<String>,
    pub service_date: Option<NaiveDate>,
    pub report_date: Option<NaiveDate>,
}

/// One inspection report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MuestreoGrano {
    pub report_number: Option<String>,
    pub service_date: Option<NaiveDate>,
    pub report_date: Option<NaiveDate>,
    pub client: Option<String>,
    pub samples: Vec<Sample>,
}

impl MuestreoGrano {
    pub fn new(header: ReportHeader, samples: Vec<Sample>) -> Self {
        MuestreoGrano {
            report_number: header.report_number,
            service_date: header.service_date,
            report_date: header.report_date,
            client: header.client,
            samples,
        }
    }

    /// Date the weekly loss rows are filed under.
    pub fn week_date(&self) -> Option<NaiveDate> {
        self.service_date.or(self.report_date)
    }

    /// Number of silos sampled. "AP-1" and "SILO 1" count once.
    pub fn distinct_silos(&self, silo_prefix: &str) -> usize {
        self.samples
            .iter()
            .map(|s| canonical_silo_code(&s.silo, silo_prefix))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Total live insects divided by the number of silos sampled.
    pub fn average_pressure(&self, silos: usize) -> Decimal {
        if silos == 0 {
            return Decimal::ZERO;
        }
        let total: u64 = self.samples.iter().map(Sample::total_alive).sum();
        Decimal::from(total) / Decimal::from(silos as u64)
    }

    pub fn risk_level(&self, silos: usize) -> RiskLevel {
        RiskLevel::from_pressure(self.average_pressure(silos))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantityUnit {
    #[serde(rename = "kg")]
    Kilograms,
    #[serde(rename = "t")]
    #[default]
    Tonnes,
}

impl QuantityUnit {
    pub fn from_str_loose(s: &str) -> QuantityUnit {
        let lower = s.trim().to_lowercase();
        if lower == "kg" || lower.starts_with("kilo") {
            QuantityUnit::Kilograms
        } else {
            QuantityUnit::Tonnes
        }
    }
}

impl fmt::Display for QuantityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantityUnit::Kilograms => write!(f, "kg"),
            QuantityUnit::Tonnes => write!(f, "t"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiloMovement {
    pub date: NaiveDate,
    pub from_silo: String,
    pub to_silo: String,
    pub quantity: Decimal,
}

/// A quantity of grain tracked from ship arrival through silo moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrainBatch {
    pub id: String,
    #[serde(default)]
    pub ship: Option<String>,
    /// Key into the ship table, used when `ship` is absent.
    #[serde(default)]
    pub ship_id: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub grain_type: Option<String>,
    #[serde(default)]
    pub grain_subtype: Option<String>,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: QuantityUnit,
    #[serde(default)]
    pub entry_date: Option<NaiveDate>,
    #[serde(default)]
    pub current_silo: Option<String>,
    #[serde(default)]
    pub movements: Vec<SiloMovement>,
}

impl GrainBatch {
    pub fn quantity_tonnes(&self) -> Decimal {
        match self.unit {
            QuantityUnit::Kilograms => self.quantity / Decimal::ONE_THOUSAND,
            QuantityUnit::Tonnes => self.quantity,
        }
    }

    /// Silo holding this batch on `date`.
    ///
    /// The earliest movement after `date` tells where the batch was before
    /// it moved; with no later movement it is still in its current silo.
    pub fn silo_on(&self, date: NaiveDate) -> Option<&str> {
        self.movements
            .iter()
            .filter(|m| m.date > date)
            .min_by_key(|m| m.date)
            .map(|m| m.from_silo.as_str())
            .or(self.current_silo.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Silo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    pub id: String,
    pub name: String,
}

/// Weekly loss aggregate for one silo in one report. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorialPerdidaSilo {
    /// `None` when no batch could be matched.
    pub batch_id: Option<String>,
    pub silo: String,
    pub week_date: NaiveDate,
    pub grain_type: String,
    #[serde(default)]
    pub report_number: Option<String>,
    pub avg_live_weevils: Decimal,
    pub avg_lice: Decimal,
    pub total_tons: Decimal,
    pub acid_uric: Decimal,
    pub damage_adult_weevils_kg: Decimal,
    pub damage_total_weevils_kg: Decimal,
    pub damage_lice_kg: Decimal,
    pub damage_total_pest_kg: Decimal,
    pub weekly_economic_loss: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample(silo: &str, counts: [u32; COUNT_FIELDS]) -> Sample {
        Sample {
            silo: silo.into(),
            muestra: Muestra::Arriba,
            ship: "MALTA EXPRESS".into(),
            grain_type: "TRIGO".into(),
            storage_date: None,
            days_stored: 0,
            counts: PestCounts::from_fields(counts),
            observation: Decimal::ZERO,
        }
    }

    #[test]
    fn test_totals_are_derived() {
        let s = sample("AP-01", [4, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        // alive: 1 + 3 + 5 + 7 + 9 + lice 4
        assert_eq!(s.total_alive(), 29);
        // dead: 2 + 4 + 6 + 8 + 10
        assert_eq!(s.total_dead(), 30);
        assert_eq!(s.live_weevils(), 1);
    }

    #[test]
    fn test_stale_totals_ignored_on_read() {
        let json = r#"{
            "silo": "AP-01",
            "muestra": "Abajo",
            "ship": "MALTA EXPRESS",
            "grain_type": "",
            "days_stored": 12,
            "counts": {
                "lice": 1,
                "gorgojo": {"alive": 2, "dead": 0},
                "taladrillo": {"alive": 0, "dead": 3},
                "tribolium": {"alive": 0, "dead": 0},
                "oryzaephilus": {"alive": 0, "dead": 0},
                "cryptolestes": {"alive": 0, "dead": 0}
            },
            "observation": "1500",
            "total_alive": 999,
            "total_dead": 999
        }"#;
        let s: Sample = serde_json::from_str(json).unwrap();
        assert_eq!(s.total_alive(), 3);
        assert_eq!(s.total_dead(), 3);
        assert_eq!(s.storage_date, None);
    }

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_pressure(dec!(0)), RiskLevel::Bajo);
        assert_eq!(RiskLevel::from_pressure(dec!(0.5)), RiskLevel::Medio);
        assert_eq!(RiskLevel::from_pressure(dec!(5)), RiskLevel::Medio);
        assert_eq!(RiskLevel::from_pressure(dec!(5.01)), RiskLevel::Alto);
        assert_eq!(RiskLevel::from_pressure(dec!(10)), RiskLevel::Alto);
        assert_eq!(RiskLevel::from_pressure(dec!(10.5)), RiskLevel::Critico);
    }

    #[test]
    fn test_report_risk_averages_per_silo() {
        let report = MuestreoGrano {
            samples: vec![
                sample("AP-01", [0, 6, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
                sample("AP-01", [0, 6, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
                sample("AP-02", [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
            ],
            ..Default::default()
        };
        let silos = report.distinct_silos("AP");
        assert_eq!(silos, 2);
        // 12 live insects over 2 silos
        assert_eq!(report.average_pressure(silos), dec!(6));
        assert_eq!(report.risk_level(silos), RiskLevel::Alto);
    }

    #[test]
    fn test_silo_spellings_count_once() {
        let report = MuestreoGrano {
            samples: vec![
                sample("AP-1", [0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
                sample("SILO 1", [0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
                sample("ap 01", [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
            ],
            ..Default::default()
        };
        let silos = report.distinct_silos("AP");
        assert_eq!(silos, 1);
        assert_eq!(report.average_pressure(silos), dec!(8));
        assert_eq!(report.risk_level(silos), RiskLevel::Alto);
    }

    #[test]
    fn test_empty_report_is_bajo() {
        let report = MuestreoGrano::default();
        assert_eq!(report.distinct_silos("AP"), 0);
        assert_eq!(report.risk_level(0), RiskLevel::Bajo);
    }

    #[test]
    fn test_quantity_tonnes() {
        let mut batch = GrainBatch {
            id: "L-1".into(),
            ship: None,
            ship_id: None,
            origin: None,
            grain_type: None,
            grain_subtype: None,
            quantity: dec!(250000),
            unit: QuantityUnit::Kilograms,
            entry_date: None,
            current_silo: Some("AP-01".into()),
            movements: vec![],
        };
        assert_eq!(batch.quantity_tonnes(), dec!(250));
        batch.unit = QuantityUnit::Tonnes;
        assert_eq!(batch.quantity_tonnes(), dec!(250000));
    }

    #[test]
    fn test_silo_on_rewinds_movements() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let batch = GrainBatch {
            id: "L-1".into(),
            ship: None,
            ship_id: None,
            origin: None,
            grain_type: None,
            grain_subtype: None,
            quantity: dec!(100),
            unit: QuantityUnit::Tonnes,
            entry_date: Some(d("2024-01-01")),
            current_silo: Some("AP-03".into()),
            movements: vec![
                SiloMovement {
                    date: d("2024-02-01"),
                    from_silo: "AP-01".into(),
                    to_silo: "AP-02".into(),
                    quantity: dec!(100),
                },
                SiloMovement {
                    date: d("2024-03-01"),
                    from_silo: "AP-02".into(),
                    to_silo: "AP-03".into(),
                    quantity: dec!(100),
                },
            ],
        };
        assert_eq!(batch.silo_on(d("2024-01-15")), Some("AP-01"));
        assert_eq!(batch.silo_on(d("2024-02-15")), Some("AP-02"));
        assert_eq!(batch.silo_on(d("2024-03-01")), Some("AP-03"));
        assert_eq!(batch.silo_on(d("2024-06-01")), Some("AP-03"));
    }
}
