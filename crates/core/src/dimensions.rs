//! Conformed dimension payloads, enrichment, and resolved key maps.
//!
//! Dimension rows are created lazily on first reference from any source.
//! This module builds the attribute payload for a business key (enriching
//! from OLTP master data where available, falling back to the reserved
//! unknown values where not) and holds the in-memory map of business key to
//! warehouse surrogate key that the normalizer reads.

use std::collections::HashMap;

use starlift_shared::types::{
    CountryKey, CurrencyKey, CustomerKey, ProductKey, SalespersonKey, WarehouseKey,
};

/// Reserved business key of every seeded "unknown" dimension row.
pub const UNKNOWN_CODE: &str = "UNK";

/// Display name of the seeded unknown rows.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Business key of the synthetic customer that owns JSON aggregate facts.
pub const AGGREGATE_CUSTOMER_CODE: &str = "AGG_JSON";

/// Display name of the synthetic aggregate customer.
pub const AGGREGATE_CUSTOMER_NAME: &str = "Aggregated JSON feed";

/// Brand assigned to products first seen in the JSON aggregate feed.
pub const AGGREGATE_BRAND: &str = "AGG_JSON";

/// ISO code of the US dollar, the reference currency of every source.
pub const USD_CODE: &str = "USD";

/// Canonical form of a business key: trimmed and upper-cased.
///
/// Both the fact-side reference and the master-side key go through this, so
/// joins are insensitive to the source's whitespace and casing noise.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

// ============================================================================
// OLTP master data (enrichment inputs)
// ============================================================================

/// Customer master attributes keyed by card code.
#[derive(Debug, Clone)]
pub struct CustomerMaster {
    /// Customer display name.
    pub name: String,
    /// Sales zone code, resolved to a zone name via [`MasterData::zones`].
    pub zone_code: Option<String>,
    /// ISO-3166 alpha-2 country code.
    pub country_iso2: Option<String>,
}

/// Product master attributes keyed by item code.
#[derive(Debug, Clone)]
pub struct ProductMaster {
    /// Product display name.
    pub name: String,
    /// Brand code, resolved to a brand name via [`MasterData::brands`].
    pub brand_code: Option<String>,
}

/// Master tables extracted from the OLTP source, keyed by normalized
/// business key.
#[derive(Debug, Clone, Default)]
pub struct MasterData {
    /// Customers by card code.
    pub customers: HashMap<String, CustomerMaster>,
    /// Products by item code.
    pub products: HashMap<String, ProductMaster>,
    /// Salesperson names by code.
    pub salespersons: HashMap<String, String>,
    /// Warehouse names by code.
    pub warehouses: HashMap<String, String>,
    /// Country names by ISO-3166 alpha-2 code.
    pub countries: HashMap<String, String>,
    /// Brand names by brand code.
    pub brands: HashMap<String, String>,
    /// Zone names by zone code.
    pub zones: HashMap<String, String>,
}

// ============================================================================
// Creation payloads (attributes for first-sight rows)
// ============================================================================

/// Attributes for a customer dimension row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    /// Business key (card code).
    pub card_code: String,
    /// Display name.
    pub name: String,
    /// Sales zone name.
    pub zone: String,
    /// Country ISO code, if known.
    pub country_iso2: Option<String>,
}

/// Attributes for a product dimension row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    /// Business key (item code).
    pub item_code: String,
    /// Display name.
    pub name: String,
    /// Brand name.
    pub brand: String,
}

/// Attributes for a code+name dimension row (salesperson, warehouse,
/// country, currency).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCoded {
    /// Business key.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// Builds the customer payload for a card code, enriching from master data.
///
/// Enrichment misses never fail key assignment: an unknown card code gets
/// its code as the name and the reserved unknown zone.
#[must_use]
pub fn customer_payload(card_code: &str, masters: &MasterData) -> NewCustomer {
    let code = normalize_code(card_code);
    match masters.customers.get(&code) {
        Some(master) => {
            let zone = master
                .zone_code
                .as_deref()
                .map(normalize_code)
                .and_then(|z| masters.zones.get(&z).cloned())
                .unwrap_or_else(|| UNKNOWN_NAME.to_string());
            NewCustomer {
                card_code: code,
                name: master.name.trim().to_string(),
                zone,
                country_iso2: master.country_iso2.as_deref().map(normalize_code),
            }
        }
        None => NewCustomer {
            name: code.clone(),
            card_code: code,
            zone: UNKNOWN_NAME.to_string(),
            country_iso2: None,
        },
    }
}

/// The synthetic customer the JSON aggregate feed attaches to.
#[must_use]
pub fn aggregate_customer() -> NewCustomer {
    NewCustomer {
        card_code: AGGREGATE_CUSTOMER_CODE.to_string(),
        name: AGGREGATE_CUSTOMER_NAME.to_string(),
        zone: AGGREGATE_BRAND.to_string(),
        country_iso2: None,
    }
}

/// Builds the product payload for an item code, enriching from master data.
#[must_use]
pub fn product_payload(item_code: &str, masters: &MasterData) -> NewProduct {
    let code = normalize_code(item_code);
    match masters.products.get(&code) {
        Some(master) => {
            let brand = master
                .brand_code
                .as_deref()
                .map(normalize_code)
                .and_then(|b| masters.brands.get(&b).cloned())
                .or_else(|| master.brand_code.clone())
                .unwrap_or_else(|| UNKNOWN_NAME.to_string());
            NewProduct {
                item_code: code,
                name: master.name.trim().to_string(),
                brand: brand.trim().to_string(),
            }
        }
        // Products first seen outside the OLTP master (e.g. the JSON feed)
        // get their code as the name, per the aggregate contract.
        None => NewProduct {
            name: code.clone(),
            item_code: code,
            brand: AGGREGATE_BRAND.to_string(),
        },
    }
}

/// Builds a code+name payload from a master map, falling back to the code
/// itself as the name.
#[must_use]
pub fn coded_payload(code: &str, names: &HashMap<String, String>) -> NewCoded {
    let code = normalize_code(code);
    let name = names
        .get(&code)
        .map_or_else(|| code.clone(), |n| n.trim().to_string());
    NewCoded { code, name }
}

// ============================================================================
// Resolved key map (read by the normalizer)
// ============================================================================

/// Business key → surrogate key map for one pipeline batch.
///
/// Populated by the dimension resolver before normalization; two lookups of
/// the same business key always return the same surrogate key.
#[derive(Debug, Clone, Default)]
pub struct ResolvedDimensions {
    customers: HashMap<String, CustomerKey>,
    products: HashMap<String, ProductKey>,
    salespersons: HashMap<String, SalespersonKey>,
    warehouses: HashMap<String, WarehouseKey>,
    countries: HashMap<String, CountryKey>,
    currencies: HashMap<String, CurrencyKey>,
    customer_countries: HashMap<String, String>,
}

impl ResolvedDimensions {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a resolved customer key.
    pub fn insert_customer(&mut self, card_code: &str, key: CustomerKey) {
        self.customers.insert(normalize_code(card_code), key);
    }

    /// Records the country ISO code a customer's payload carried, so facts
    /// can inherit their customer's country.
    pub fn insert_customer_country(&mut self, card_code: &str, iso2: &str) {
        self.customer_countries
            .insert(normalize_code(card_code), normalize_code(iso2));
    }

    /// The country ISO code recorded for a customer, if any.
    #[must_use]
    pub fn customer_country(&self, card_code: &str) -> Option<String> {
        self.customer_countries
            .get(&normalize_code(card_code))
            .cloned()
    }

    /// Records a resolved product key.
    pub fn insert_product(&mut self, item_code: &str, key: ProductKey) {
        self.products.insert(normalize_code(item_code), key);
    }

    /// Records a resolved salesperson key.
    pub fn insert_salesperson(&mut self, sp_code: &str, key: SalespersonKey) {
        self.salespersons.insert(normalize_code(sp_code), key);
    }

    /// Records a resolved warehouse key.
    pub fn insert_warehouse(&mut self, whs_code: &str, key: WarehouseKey) {
        self.warehouses.insert(normalize_code(whs_code), key);
    }

    /// Records a resolved country key.
    pub fn insert_country(&mut self, iso2: &str, key: CountryKey) {
        self.countries.insert(normalize_code(iso2), key);
    }

    /// Records a resolved currency key.
    pub fn insert_currency(&mut self, code: &str, key: CurrencyKey) {
        self.currencies.insert(normalize_code(code), key);
    }

    /// Looks up a customer key.
    #[must_use]
    pub fn customer(&self, card_code: &str) -> Option<CustomerKey> {
        self.customers.get(&normalize_code(card_code)).copied()
    }

    /// Looks up a product key.
    #[must_use]
    pub fn product(&self, item_code: &str) -> Option<ProductKey> {
        self.products.get(&normalize_code(item_code)).copied()
    }

    /// Looks up a salesperson key; misses map to the unknown key.
    #[must_use]
    pub fn salesperson_or_unknown(&self, sp_code: Option<&str>) -> SalespersonKey {
        sp_code
            .and_then(|c| self.salespersons.get(&normalize_code(c)).copied())
            .unwrap_or(SalespersonKey::UNKNOWN)
    }

    /// Looks up a warehouse key; misses map to the unknown key.
    #[must_use]
    pub fn warehouse_or_unknown(&self, whs_code: Option<&str>) -> WarehouseKey {
        whs_code
            .and_then(|c| self.warehouses.get(&normalize_code(c)).copied())
            .unwrap_or(WarehouseKey::UNKNOWN)
    }

    /// Looks up a country key; misses map to the unknown key.
    #[must_use]
    pub fn country_or_unknown(&self, iso2: Option<&str>) -> CountryKey {
        iso2.and_then(|c| self.countries.get(&normalize_code(c)).copied())
            .unwrap_or(CountryKey::UNKNOWN)
    }

    /// Looks up a currency key; misses map to the unknown key.
    #[must_use]
    pub fn currency_or_unknown(&self, code: Option<&str>) -> CurrencyKey {
        code.and_then(|c| self.currencies.get(&normalize_code(c)).copied())
            .unwrap_or(CurrencyKey::UNKNOWN)
    }

    /// Returns true if a key has already been recorded for this card code.
    #[must_use]
    pub fn contains_customer(&self, card_code: &str) -> bool {
        self.customers.contains_key(&normalize_code(card_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masters() -> MasterData {
        let mut m = MasterData::default();
        m.customers.insert(
            "C001".into(),
            CustomerMaster {
                name: " Acme Ltd ".into(),
                zone_code: Some("Z1".into()),
                country_iso2: Some("cr".into()),
            },
        );
        m.zones.insert("Z1".into(), "North".into());
        m.products.insert(
            "P1".into(),
            ProductMaster {
                name: "Widget".into(),
                brand_code: Some("B1".into()),
            },
        );
        m.brands.insert("B1".into(), "BrandOne".into());
        m.salespersons.insert("S9".into(), "Alex".into());
        m
    }

    #[test]
    fn test_customer_enrichment() {
        let c = customer_payload(" c001 ", &masters());
        assert_eq!(c.card_code, "C001");
        assert_eq!(c.name, "Acme Ltd");
        assert_eq!(c.zone, "North");
        assert_eq!(c.country_iso2.as_deref(), Some("CR"));
    }

    #[test]
    fn test_customer_enrichment_miss_falls_back_to_unknown() {
        let c = customer_payload("C999", &masters());
        assert_eq!(c.card_code, "C999");
        assert_eq!(c.name, "C999");
        assert_eq!(c.zone, UNKNOWN_NAME);
        assert_eq!(c.country_iso2, None);
    }

    #[test]
    fn test_product_brand_lookup_and_fallback() {
        let known = product_payload("p1", &masters());
        assert_eq!(known.brand, "BrandOne");

        let unknown = product_payload("JSON-ITEM", &masters());
        assert_eq!(unknown.name, "JSON-ITEM");
        assert_eq!(unknown.brand, AGGREGATE_BRAND);
    }

    #[test]
    fn test_coded_payload_fallback() {
        let m = masters();
        assert_eq!(coded_payload("s9", &m.salespersons).name, "Alex");
        assert_eq!(coded_payload("S404", &m.salespersons).name, "S404");
    }

    #[test]
    fn test_resolved_lookup_is_code_normalized() {
        let mut dims = ResolvedDimensions::new();
        dims.insert_product("P1", ProductKey(7));
        assert_eq!(dims.product(" p1 "), Some(ProductKey(7)));
        assert_eq!(dims.product("P2"), None);
    }

    #[test]
    fn test_optional_lookups_return_unknown_never_none() {
        let dims = ResolvedDimensions::new();
        assert_eq!(dims.warehouse_or_unknown(None), WarehouseKey::UNKNOWN);
        assert_eq!(dims.warehouse_or_unknown(Some("W1")), WarehouseKey::UNKNOWN);
        assert_eq!(dims.salesperson_or_unknown(Some("S1")), SalespersonKey::UNKNOWN);
        assert_eq!(dims.country_or_unknown(None), CountryKey::UNKNOWN);
        assert_eq!(dims.currency_or_unknown(Some("XXX")), CurrencyKey::UNKNOWN);
    }
}
