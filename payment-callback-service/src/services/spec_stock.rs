//! Per-variant stock stored in a product's specification string.
//!
//! Two forms are accepted:
//!
//! * `variant:stock` entries joined by `;`, e.g. `red/L:10;red/M:3`
//! * a bare count such as `42` for products without variants
//!
//! Rendering keeps the entry order so untouched variants round-trip unchanged.

use once_cell::sync::Lazy;
use regex::Regex;
use service_core::error::AppError;

static ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([^:;]+?)\s*:\s*(\d+)\s*$").expect("specification entry pattern is valid")
});

static BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s*$").expect("bare stock pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecStock {
    Single(u32),
    Variants(Vec<(String, u32)>),
}

impl SpecStock {
    pub fn parse(spec: &str) -> Result<Self, AppError> {
        if let Some(caps) = BARE.captures(spec) {
            return Ok(Self::Single(parse_count(&caps[1], spec)?));
        }

        let mut variants = Vec::new();
        for entry in spec.split(';').filter(|e| !e.trim().is_empty()) {
            let caps = ENTRY.captures(entry).ok_or_else(|| malformed(spec))?;
            variants.push((caps[1].to_string(), parse_count(&caps[2], spec)?));
        }

        if variants.is_empty() {
            return Err(malformed(spec));
        }
        Ok(Self::Variants(variants))
    }

    /// Take `quantity` from `variant`; the empty name addresses single-stock products.
    pub fn decrement(&mut self, variant: &str, quantity: u32) -> Result<(), AppError> {
        let slot = match self {
            Self::Single(count) if variant.is_empty() => count,
            Self::Single(_) => return Err(unknown_variant(variant)),
            Self::Variants(entries) => entries
                .iter_mut()
                .find(|(name, _)| name == variant)
                .map(|(_, count)| count)
                .ok_or_else(|| unknown_variant(variant))?,
        };

        if *slot < quantity {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Insufficient stock for variant '{}': {} left, {} requested",
                variant,
                slot,
                quantity
            )));
        }
        *slot -= quantity;
        Ok(())
    }

    pub fn render(&self) -> String {
        match self {
            Self::Single(count) => count.to_string(),
            Self::Variants(entries) => entries
                .iter()
                .map(|(name, count)| format!("{}:{}", name, count))
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

/// Parse `spec`, take `quantity` from `variant`, and return the new string.
pub fn decrement_spec(spec: &str, variant: &str, quantity: i32) -> Result<String, AppError> {
    let quantity = u32::try_from(quantity).map_err(|_| {
        AppError::BadRequest(anyhow::anyhow!("Invalid order quantity {}", quantity))
    })?;
    let mut stock = SpecStock::parse(spec)?;
    stock.decrement(variant, quantity)?;
    Ok(stock.render())
}

fn parse_count(raw: &str, spec: &str) -> Result<u32, AppError> {
    raw.parse().map_err(|_| malformed(spec))
}

fn malformed(spec: &str) -> AppError {
    AppError::InternalError(anyhow::anyhow!(
        "Malformed product specification string '{}'",
        spec
    ))
}

fn unknown_variant(variant: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Unknown product variant '{}'", variant))
}
