//! Structured form submissions mapped onto the same `Sample` shape as the
//! document path.
//!
//! Field names in submissions vary between form revisions, so every logical
//! field has an ordered alias list and the first alias present wins.

use crate::model::{Muestra, PestCounts, ReportHeader, Sample, COUNT_FIELDS};
use crate::parsing::values::{parse_count, parse_date_loose, parse_observation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::{info, warn};

const SILO: &[&str] = &["silo", "Silo", "silo_id", "siloId", "SILO"];
const MUESTRA: &[&str] = &["muestra", "Muestra", "posicion", "position"];
const SHIP: &[&str] = &["barco", "Barco", "buque", "nave", "ship"];
const GRAIN_TYPE: &[&str] = &["tipo_grano", "tipoGrano", "grano", "Grano", "grain_type"];
const STORAGE_DATE: &[&str] = &[
    "fecha_almacenamiento",
    "fechaAlmacenamiento",
    "fecha_ingreso",
    "storage_date",
];
const DAYS_STORED: &[&str] = &[
    "dias_almacenamiento",
    "diasAlmacenamiento",
    "dias",
    "days_stored",
];
const LICE: &[&str] = &["piojillo", "Piojillo", "acaros", "psocidos", "lice"];
const OBSERVATION: &[&str] = &[
    "observacion",
    "Observacion",
    "observaciones",
    "toneladas",
    "observation",
];

const REPORT_NUMBER: &[&str] = &[
    "numero_informe",
    "numeroInforme",
    "informe",
    "report_number",
];
const CLIENT: &[&str] = &["cliente", "Cliente", "client"];
const SERVICE_DATE: &[&str] = &["fecha_servicio", "fechaServicio", "service_date"];
const REPORT_DATE: &[&str] = &["fecha_informe", "fechaInforme", "report_date"];

struct SpeciesAliases {
    alive: &'static [&'static str],
    dead: &'static [&'static str],
}

/// In `Species::ALL` order.
const SPECIES: [SpeciesAliases; 5] = [
    SpeciesAliases {
        alive: &["gorgojo_vivos", "gorgojoVivos", "sitophilus_vivos", "gorgojo_alive"],
        dead: &["gorgojo_muertos", "gorgojoMuertos", "sitophilus_muertos", "gorgojo_dead"],
    },
    SpeciesAliases {
        alive: &["taladrillo_vivos", "taladrilloVivos", "rhyzopertha_vivos", "taladrillo_alive"],
        dead: &["taladrillo_muertos", "taladrilloMuertos", "rhyzopertha_muertos", "taladrillo_dead"],
    },
    SpeciesAliases {
        alive: &["tribolium_vivos", "triboliumVivos", "tribolium_alive"],
        dead: &["tribolium_muertos", "triboliumMuertos", "tribolium_dead"],
    },
    SpeciesAliases {
        alive: &["oryzaephilus_vivos", "oryzaephilusVivos", "oryzaephilus_alive"],
        dead: &["oryzaephilus_muertos", "oryzaephilusMuertos", "oryzaephilus_dead"],
    },
    SpeciesAliases {
        alive: &["cryptolestes_vivos", "cryptolestesVivos", "cryptolestes_alive"],
        dead: &["cryptolestes_muertos", "cryptolestesMuertos", "cryptolestes_dead"],
    },
];

/// Samples and report fields recovered from one form submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormMapping {
    pub header: ReportHeader,
    pub samples: Vec<Sample>,
    pub warnings: Vec<String>,
}

/// Map a deserialized form submission into samples.
///
/// `content` is either an array of row objects or an object holding exactly
/// one array of row objects. Rows that are not objects, or carry no silo,
/// are skipped with a warning.
pub fn map_form(submission: &Value) -> FormMapping {
    let mut mapping = FormMapping {
        header: map_header(submission),
        ..Default::default()
    };

    let Some(rows) = content_rows(submission) else {
        mapping
            .warnings
            .push("form content has no row array".to_string());
        return mapping;
    };

    for (idx, row) in rows.iter().enumerate() {
        let Some(obj) = row.as_object() else {
            warn!(row = idx, "form row is not an object");
            mapping
                .warnings
                .push(format!("row {} skipped: not an object", idx + 1));
            continue;
        };
        match map_row(obj) {
            Some(sample) => mapping.samples.push(sample),
            None => {
                warn!(row = idx, "form row has no silo");
                mapping
                    .warnings
                    .push(format!("row {} skipped: no silo", idx + 1));
            }
        }
    }

    info!(
        samples = mapping.samples.len(),
        warnings = mapping.warnings.len(),
        "mapped form submission"
    );

    mapping
}

/// Map one row object. Missing numeric fields default to 0, missing text
/// fields to empty, a missing position to `Arriba`.
pub fn map_row(obj: &Map<String, Value>) -> Option<Sample> {
    let silo = text_field(obj, SILO);
    if silo.is_empty() {
        return None;
    }

    let muestra = Muestra::from_str_loose(&text_field(obj, MUESTRA)).unwrap_or(Muestra::Arriba);

    let mut fields = [0u32; COUNT_FIELDS];
    fields[0] = count_field(obj, LICE);
    for (i, aliases) in SPECIES.iter().enumerate() {
        fields[1 + 2 * i] = count_field(obj, aliases.alive);
        fields[2 + 2 * i] = count_field(obj, aliases.dead);
    }

    Some(Sample {
        silo,
        muestra,
        ship: text_field(obj, SHIP),
        grain_type: text_field(obj, GRAIN_TYPE),
        storage_date: probe(obj, STORAGE_DATE)
            .and_then(Value::as_str)
            .and_then(parse_date_loose),
        days_stored: count_field(obj, DAYS_STORED),
        counts: PestCounts::from_fields(fields),
        observation: decimal_field(obj, OBSERVATION),
    })
}

fn map_header(submission: &Value) -> ReportHeader {
    let mut scopes: Vec<&Map<String, Value>> = Vec::new();
    if let Some(top) = submission.as_object() {
        scopes.push(top);
    }
    if let Some(content) = submission.get("content").and_then(Value::as_object) {
        scopes.push(content);
    }

    let text = |aliases: &[&str]| {
        scopes
            .iter()
            .map(|obj| text_field(obj, aliases))
            .find(|v| !v.is_empty())
    };
    let date = |aliases: &[&str]| {
        scopes
            .iter()
            .find_map(|obj| probe(obj, aliases).and_then(Value::as_str).and_then(parse_date_loose))
    };

    ReportHeader {
        report_number: text(REPORT_NUMBER),
        client: text(CLIENT),
        service_date: date(SERVICE_DATE),
        report_date: date(REPORT_DATE),
    }
}

fn content_rows(submission: &Value) -> Option<&Vec<Value>> {
    match submission.get("content")? {
        Value::Array(rows) => Some(rows),
        Value::Object(map) => {
            let mut arrays = map.values().filter_map(Value::as_array);
            let first = arrays.next()?;
            if arrays.next().is_some() {
                return None;
            }
            Some(first)
        }
        _ => None,
    }
}

/// First alias present with a non-null value.
fn probe<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|key| obj.get(*key))
        .find(|v| !v.is_null())
}

fn text_field(obj: &Map<String, Value>, aliases: &[&str]) -> String {
    match probe(obj, aliases) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn count_field(obj: &Map<String, Value>, aliases: &[&str]) -> u32 {
    match probe(obj, aliases) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .unwrap_or(0),
        Some(Value::String(s)) => parse_count(s).unwrap_or(0),
        _ => 0,
    }
}

fn decimal_field(obj: &Map<String, Value>, aliases: &[&str]) -> Decimal {
    match probe(obj, aliases) {
        Some(Value::Number(n)) => {
            let s = n.to_string();
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .unwrap_or(Decimal::ZERO)
        }
        Some(Value::String(s)) => parse_observation(s),
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_array_content() {
        let form = json!({
            "numero_informe": "F-12",
            "cliente": "Molinos del Sur",
            "fecha_servicio": "2024-04-08",
            "content": [
                {
                    "silo": "AP-01",
                    "muestra": "abajo",
                    "barco": "MALTA EXPRESS",
                    "tipo_grano": "TRIGO",
                    "fecha_almacenamiento": "06Apr2024",
                    "dias_almacenamiento": 45,
                    "piojillo": 2,
                    "gorgojo_vivos": 4,
                    "gorgojo_muertos": "1",
                    "tribolium_vivos": 1,
                    "observacion": "1,250.5"
                }
            ]
        });
        let m = map_form(&form);
        assert!(m.warnings.is_empty());
        assert_eq!(m.header.report_number.as_deref(), Some("F-12"));
        assert_eq!(m.header.client.as_deref(), Some("Molinos del Sur"));
        assert_eq!(m.header.service_date, NaiveDate::from_ymd_opt(2024, 4, 8));
        assert_eq!(m.samples.len(), 1);

        let s = &m.samples[0];
        assert_eq!(s.silo, "AP-01");
        assert_eq!(s.muestra, Muestra::Abajo);
        assert_eq!(s.ship, "MALTA EXPRESS");
        assert_eq!(s.storage_date, NaiveDate::from_ymd_opt(2024, 4, 6));
        assert_eq!(s.days_stored, 45);
        assert_eq!(s.counts.lice, 2);
        assert_eq!(s.counts.gorgojo.alive, 4);
        assert_eq!(s.counts.gorgojo.dead, 1);
        assert_eq!(s.counts.tribolium.alive, 1);
        assert_eq!(s.total_alive(), 7);
        assert_eq!(s.observation, dec!(1250.5));
    }

    #[test]
    fn test_object_content_with_single_array() {
        let form = json!({
            "content": {
                "cliente": "Molinos del Sur",
                "muestras": [
                    {"Silo": "AP-02", "gorgojoVivos": 3, "toneladas": 800},
                    {"silo_id": "AP-03", "Muestra": "Arriba"}
                ]
            }
        });
        let m = map_form(&form);
        assert_eq!(m.samples.len(), 2);
        assert_eq!(m.header.client.as_deref(), Some("Molinos del Sur"));
        assert_eq!(m.samples[0].silo, "AP-02");
        assert_eq!(m.samples[0].counts.gorgojo.alive, 3);
        assert_eq!(m.samples[0].observation, dec!(800));
        assert_eq!(m.samples[1].silo, "AP-03");
        assert_eq!(m.samples[1].grain_type, "");
        assert_eq!(m.samples[1].observation, Decimal::ZERO);
    }

    #[test]
    fn test_alias_order_first_present_wins() {
        let form = json!({
            "content": [{"silo": "AP-01", "Silo": "AP-09", "silo_id": "AP-07"}]
        });
        assert_eq!(map_form(&form).samples[0].silo, "AP-01");

        let form = json!({
            "content": [{"silo": null, "Silo": "AP-09"}]
        });
        assert_eq!(map_form(&form).samples[0].silo, "AP-09");
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let form = json!({
            "content": [
                "not a row",
                {"barco": "MALTA EXPRESS"},
                {"silo": "AP-04", "gorgojo_vivos": "x"}
            ]
        });
        let m = map_form(&form);
        assert_eq!(m.samples.len(), 1);
        assert_eq!(m.samples[0].counts.gorgojo.alive, 0);
        assert_eq!(m.warnings.len(), 2);
    }

    #[test]
    fn test_ambiguous_object_content() {
        let form = json!({
            "content": {"a": [{"silo": "AP-01"}], "b": [{"silo": "AP-02"}]}
        });
        let m = map_form(&form);
        assert!(m.samples.is_empty());
        assert_eq!(m.warnings.len(), 1);
    }

    #[test]
    fn test_missing_content() {
        let m = map_form(&json!({"cliente": "X"}));
        assert!(m.samples.is_empty());
        assert_eq!(m.header.client.as_deref(), Some("X"));
        assert_eq!(m.warnings.len(), 1);
    }

    #[test]
    fn test_numeric_silo_and_float_counts() {
        let form = json!({
            "content": [{"silo": 7, "gorgojo_vivos": 2.0, "piojillo": -1}]
        });
        let m = map_form(&form);
        assert_eq!(m.samples[0].silo, "7");
        assert_eq!(m.samples[0].counts.gorgojo.alive, 2);
        assert_eq!(m.samples[0].counts.lice, 0);
    }
}
