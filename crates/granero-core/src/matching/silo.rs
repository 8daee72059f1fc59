use crate::config::EngineConfig;
use crate::model::Silo;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::warn;

static SILO_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(SILO)|([A-Z]{1,4}))?[\s\-_]*0*(\d+)$").expect("valid regex")
});

/// Canonical spelling of a silo reference.
///
/// "AP-01", "ap 1", "AP1" all become "AP-1". A bare number or "SILO 1" takes
/// `default_prefix`. Anything else is uppercased with whitespace collapsed.
pub fn canonical_silo_code(raw: &str, default_prefix: &str) -> String {
    let upper = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    match SILO_NUMBER.captures(&upper) {
        Some(caps) => {
            let prefix = match caps.get(2) {
                Some(p) => p.as_str().to_string(),
                None => default_prefix.trim().to_uppercase(),
            };
            format!("{}-{}", prefix, &caps[3])
        }
        None => upper,
    }
}

/// Maps the many spellings of a silo onto its repository id.
#[derive(Debug, Clone)]
pub struct SiloResolver {
    prefix: String,
    keys: HashMap<String, String>,
}

impl SiloResolver {
    pub fn new(silos: &[Silo], config: &EngineConfig) -> Self {
        let mut resolver = SiloResolver {
            prefix: config.silo_prefix.clone(),
            keys: HashMap::new(),
        };

        for silo in silos {
            resolver
                .keys
                .insert(resolver.canonical(&silo.id), silo.id.clone());
        }
        // Display names never shadow an id spelling.
        for silo in silos {
            let key = resolver.canonical(&silo.name);
            resolver.keys.entry(key).or_insert_with(|| silo.id.clone());
        }

        for (alias, target) in &config.silo_aliases {
            match resolver.resolve(target).map(str::to_string) {
                Some(id) => {
                    let key = resolver.canonical(alias);
                    resolver.keys.insert(key, id);
                }
                None => warn!(alias, target, "silo alias points at an unknown silo"),
            }
        }

        resolver
    }

    pub fn canonical(&self, raw: &str) -> String {
        canonical_silo_code(raw, &self.prefix)
    }

    /// Repository id of the silo `raw` refers to.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        self.keys.get(&self.canonical(raw)).map(String::as_str)
    }

    /// True when both spellings refer to the same silo. Spellings the
    /// resolver does not know are compared by canonical code.
    pub fn same_silo(&self, a: &str, b: &str) -> bool {
        match (self.resolve(a), self.resolve(b)) {
            (Some(x), Some(y)) => x == y,
            _ => self.canonical(a) == self.canonical(b),
        }
    }
}
