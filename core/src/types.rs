//! Domain DTOs for the GoSell API.
//!
//! # Design
//! The backend is loosely typed: money may arrive as a number or a numeric
//! string, and most dashboard sections are optional. Every field that the
//! front end tolerates missing is `Option` or `#[serde(default)]`, plain
//! fields also read an explicit `null` as their default, and numeric fields
//! go through `lenient_number`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnNull};

/// Authenticated user as returned by `/api/auth/me` and `/api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub prenom: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// First name, preferring `first_name` over `prenom`.
    pub fn display_name(&self) -> Option<&str> {
        self.first_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.prenom.as_deref().filter(|s| !s.is_empty()))
    }

    pub fn greeting(&self) -> String {
        match self.display_name() {
            Some(name) => format!("Bienvenue, {name}"),
            None => "Bienvenue".to_string(),
        }
    }
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response of `POST /api/auth/login`. CSRF echo fields and anything else
/// the backend adds end up in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    #[serde(default)]
    pub ok: Option<bool>,
    pub user: User,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `GET /api/auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeResponse {
    #[serde(default)]
    pub user: Option<User>,
}

/// One row of `GET /api/products`.
///
/// A row without a usable `id` is still listed.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Product {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub nom: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub en_vente: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub est_vendu: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub a_ete_achete: bool,
    #[serde(default, deserialize_with = "lenient_number")]
    pub prix_achat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub prix_vente: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub prix_min_espere: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub prix_max_espere: Option<f64>,
    #[serde(default)]
    pub date_mise_en_vente: Option<String>,
}

/// Lifecycle badge shown for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleStatus {
    Sold,
    OnSale,
    Draft,
}

impl Product {
    pub fn sale_status(&self) -> SaleStatus {
        if self.est_vendu {
            SaleStatus::Sold
        } else if self.en_vente {
            SaleStatus::OnSale
        } else {
            SaleStatus::Draft
        }
    }

    /// Second badge: whether the item was bought or came for free.
    pub fn acquisition_label(&self) -> &'static str {
        if self.a_ete_achete {
            "Acheté"
        } else {
            "Gratuit"
        }
    }
}

impl SaleStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SaleStatus::Sold => "Vendu",
            SaleStatus::OnSale => "En vente",
            SaleStatus::Draft => "Brouillon",
        }
    }
}

/// Response of `GET /api/dashboard/summary`.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DashboardSummary {
    #[serde_as(as = "DefaultOnNull")]
    pub counts: Counts,
    #[serde_as(as = "DefaultOnNull")]
    pub benefices: Benefices,
    #[serde_as(as = "DefaultOnNull")]
    pub best_types: BestTypes,
    #[serde_as(as = "DefaultOnNull")]
    pub risk_products: RiskProducts,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Counts {
    #[serde_as(as = "DefaultOnNull")]
    pub nb_produits_total: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub nb_produits_en_vente: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub nb_produits_vendus: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub nb_lots: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub nb_stocks: u64,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Benefices {
    #[serde_as(as = "DefaultOnNull")]
    pub counts: BeneficeCounts,
    #[serde_as(as = "DefaultOnNull")]
    pub scope: Scope,
    #[serde_as(as = "DefaultOnNull")]
    pub totals: Totals,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BeneficeCounts {
    #[serde_as(as = "DefaultOnNull")]
    pub nb_produits: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub nb_produits_ignored_missing_cost: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub nb_produits_ignored_missing_expected: u64,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Scope {
    #[serde_as(as = "DefaultOnNull")]
    pub include_products: bool,
    #[serde_as(as = "DefaultOnNull")]
    pub include_stocks: bool,
    #[serde_as(as = "DefaultOnNull")]
    pub include_fees: bool,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Totals {
    #[serde(deserialize_with = "lenient_number")]
    pub profit_expected_median: Option<f64>,
    #[serde_as(as = "DefaultOnNull")]
    pub is_profit_expected_median: bool,
    #[serde(deserialize_with = "lenient_number")]
    pub revenue_expected_median: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub cost_total: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub cost_products: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub cost_stocks: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub fees: Option<f64>,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BestTypes {
    #[serde_as(as = "DefaultOnNull")]
    pub count: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub items: Vec<BestType>,
    #[serde_as(as = "DefaultOnNull")]
    pub filters: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BestType {
    pub nom: Option<String>,
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub multiple: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub avg_multiple: Option<f64>,
}

impl BestType {
    /// `nom`, then `name`, then a positional placeholder.
    pub fn label(&self, index: usize) -> String {
        self.nom
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| format!("Type {}", index + 1))
    }

    pub fn multiple(&self) -> f64 {
        self.multiple.or(self.avg_multiple).unwrap_or(0.0)
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RiskProducts {
    #[serde_as(as = "DefaultOnNull")]
    pub count: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub items: Vec<RiskProduct>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RiskProduct {
    pub product_id: Option<i64>,
    pub nom: Option<String>,
    pub reason: Option<String>,
    pub risk_level: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub cost_total: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub profit_amount: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub multiple: Option<f64>,
}

/// Severity bucket of a risk level code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTone {
    Danger,
    Warn,
    Info,
}

impl RiskProduct {
    pub fn tone(&self) -> RiskTone {
        match self.risk_level.as_deref() {
            Some("HIGH" | "HIGH_RISK") => RiskTone::Danger,
            Some("MEDIUM" | "MEDIUM_RISK") => RiskTone::Warn,
            _ => RiskTone::Info,
        }
    }

    pub fn reason_label(&self) -> &str {
        match self.reason.as_deref() {
            Some("ZERO_COST") => "Coût d’achat manquant (0€)",
            Some("MISSING_EXPECTED") => "Prix attendu manquant",
            Some("LOW_MARGIN") => "Marge faible",
            Some(other) => other,
            None => "—",
        }
    }
}

/// Accept a JSON number, a numeric string, or null.
///
/// Anything else (including non-finite or unparsable strings) becomes `None`.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Accept an integer id as a JSON number or numeric string; anything else
/// becomes `None`.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

pub(crate) fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn product_accepts_string_prices() {
        let product: Product = serde_json::from_value(json!({
            "id": 3,
            "nom": "Lampe",
            "prix_achat": "12.50",
            "prix_vente": 30,
            "prix_min_espere": null,
            "en_vente": true
        }))
        .unwrap();
        assert_eq!(product.prix_achat, Some(12.5));
        assert_eq!(product.prix_vente, Some(30.0));
        assert_eq!(product.prix_min_espere, None);
        assert_eq!(product.prix_max_espere, None);
        assert_eq!(product.sale_status(), SaleStatus::OnSale);
    }

    #[test]
    fn sold_wins_over_on_sale() {
        let product = Product {
            en_vente: true,
            est_vendu: true,
            ..Default::default()
        };
        assert_eq!(product.sale_status().label(), "Vendu");
        assert_eq!(Product::default().sale_status(), SaleStatus::Draft);
    }

    #[test]
    fn dashboard_summary_tolerates_missing_sections() {
        let summary: DashboardSummary = serde_json::from_value(json!({
            "counts": {"nb_produits_total": 4},
            "benefices": {"totals": {"cost_total": "100.5"}}
        }))
        .unwrap();
        assert_eq!(summary.counts.nb_produits_total, 4);
        assert_eq!(summary.benefices.totals.cost_total, Some(100.5));
        assert!(summary.risk_products.items.is_empty());
        assert!(!summary.benefices.scope.include_fees);
    }

    #[test]
    fn user_greeting_prefers_first_name() {
        let user: User =
            serde_json::from_value(json!({"id": 1, "first_name": "Ana", "prenom": "Anne", "role": "admin"}))
                .unwrap();
        assert_eq!(user.greeting(), "Bienvenue, Ana");
        assert_eq!(user.extra["role"], "admin");

        let user: User = serde_json::from_value(json!({"prenom": "Léa"})).unwrap();
        assert_eq!(user.greeting(), "Bienvenue, Léa");
        assert_eq!(User::default().greeting(), "Bienvenue");
    }

    #[test]
    fn best_type_label_and_multiple() {
        let bt = BestType {
            name: Some("Mobilier".into()),
            avg_multiple: Some(2.5),
            ..Default::default()
        };
        assert_eq!(bt.label(0), "Mobilier");
        assert_eq!(bt.multiple(), 2.5);
        assert_eq!(BestType::default().label(2), "Type 3");
        assert_eq!(BestType::default().multiple(), 0.0);
    }

    #[test]
    fn risk_tone_and_reason() {
        let risk = RiskProduct {
            risk_level: Some("HIGH_RISK".into()),
            reason: Some("LOW_MARGIN".into()),
            ..Default::default()
        };
        assert_eq!(risk.tone(), RiskTone::Danger);
        assert_eq!(risk.reason_label(), "Marge faible");
        assert_eq!(RiskProduct::default().tone(), RiskTone::Info);
        assert_eq!(RiskProduct::default().reason_label(), "—");
    }

    #[test]
    fn dashboard_summary_reads_null_as_default() {
        let summary: DashboardSummary = serde_json::from_value(json!({
            "counts": {"nb_lots": null, "nb_produits_total": 2},
            "benefices": {"scope": {"include_fees": null, "include_products": true}, "totals": null},
            "best_types": {"items": null, "filters": null},
            "risk_products": {"count": null, "items": null}
        }))
        .unwrap();
        assert_eq!(summary.counts.nb_lots, 0);
        assert_eq!(summary.counts.nb_produits_total, 2);
        assert!(!summary.benefices.scope.include_fees);
        assert!(summary.benefices.scope.include_products);
        assert_eq!(summary.benefices.totals, Totals::default());
        assert!(summary.best_types.items.is_empty());
        assert!(summary.risk_products.items.is_empty());

        let summary: DashboardSummary =
            serde_json::from_value(json!({"counts": null, "benefices": null, "risk_products": null})).unwrap();
        assert_eq!(summary, DashboardSummary::default());
    }

    #[test]
    fn product_rows_tolerate_missing_or_string_ids() {
        let products: Vec<Product> = serde_json::from_value(json!([
            {"id": 1, "nom": "a"},
            {"nom": "no id"},
            {"id": "7", "nom": null, "en_vente": null},
            {"id": "abc"}
        ]))
        .unwrap();
        let ids: Vec<Option<i64>> = products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Some(1), None, Some(7), None]);
        assert_eq!(products[2].nom, "");
        assert!(!products[2].en_vente);
    }

    #[test]
    fn acquisition_label_follows_a_ete_achete() {
        let bought = Product {
            a_ete_achete: true,
            ..Default::default()
        };
        assert_eq!(bought.acquisition_label(), "Acheté");
        assert_eq!(Product::default().acquisition_label(), "Gratuit");
    }
}
