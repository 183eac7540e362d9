//! Filter, sort and pagination state of the product list.
//!
//! `ProductQuery` renders to the `GET /api/products` query string. Every
//! `with_*` setter other than the page setters moves back to page 1, since a
//! changed filter invalidates the current page.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Allowed page sizes; anything else snaps to the next one up.
pub const PAGE_SIZES: [u32; 4] = [10, 20, 50, 100];

const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    #[default]
    DateMiseEnVente,
    Nom,
    PrixAchat,
    PrixVente,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::DateMiseEnVente => "date_mise_en_vente",
            OrderBy::Nom => "nom",
            OrderBy::PrixAchat => "prix_achat",
            OrderBy::PrixVente => "prix_vente",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDir {
    Asc,
    #[default]
    Desc,
}

impl OrderDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDir::Asc => "asc",
            OrderDir::Desc => "desc",
        }
    }
}

/// Price column a min/max range applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Achat,
    Vente,
    MinEspere,
    MaxEspere,
}

impl PriceField {
    const ALL: [PriceField; 4] = [
        PriceField::Achat,
        PriceField::Vente,
        PriceField::MinEspere,
        PriceField::MaxEspere,
    ];

    fn keys(&self) -> (&'static str, &'static str) {
        match self {
            PriceField::Achat => ("prix_achat_min", "prix_achat_max"),
            PriceField::Vente => ("prix_vente_min", "prix_vente_max"),
            PriceField::MinEspere => ("prix_min_espere_min", "prix_min_espere_max"),
            PriceField::MaxEspere => ("prix_max_espere_min", "prix_max_espere_max"),
        }
    }

    fn index(&self) -> usize {
        match self {
            PriceField::Achat => 0,
            PriceField::Vente => 1,
            PriceField::MinEspere => 2,
            PriceField::MaxEspere => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Bounds {
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    search: String,
    en_vente: Option<bool>,
    est_vendu: Option<bool>,
    a_ete_achete: Option<bool>,
    prices: [Bounds; 4],
    date_from: Option<String>,
    date_to: Option<String>,
    order_by: OrderBy,
    order_dir: OrderDir,
    page: u32,
    page_size: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            en_vente: None,
            est_vendu: None,
            a_ete_achete: None,
            prices: [Bounds::default(); 4],
            date_from: None,
            date_to: None,
            order_by: OrderBy::default(),
            order_dir: OrderDir::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-text search; surrounding whitespace is dropped.
    pub fn with_search(mut self, search: &str) -> Self {
        self.search = search.trim().to_string();
        self.page = 1;
        self
    }

    pub fn with_en_vente(mut self, value: Option<bool>) -> Self {
        self.en_vente = value;
        self.page = 1;
        self
    }

    pub fn with_est_vendu(mut self, value: Option<bool>) -> Self {
        self.est_vendu = value;
        self.page = 1;
        self
    }

    pub fn with_a_ete_achete(mut self, value: Option<bool>) -> Self {
        self.a_ete_achete = value;
        self.page = 1;
        self
    }

    /// Non-finite bounds are treated as unset.
    pub fn with_price_range(mut self, field: PriceField, min: Option<f64>, max: Option<f64>) -> Self {
        self.prices[field.index()] = Bounds {
            min: min.filter(|n| n.is_finite()),
            max: max.filter(|n| n.is_finite()),
        };
        self.page = 1;
        self
    }

    /// Date bounds in `YYYY-MM-DD`; empty strings clear the bound.
    pub fn with_date_range(mut self, from: Option<&str>, to: Option<&str>) -> Self {
        let clean = |d: Option<&str>| d.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string);
        self.date_from = clean(from);
        self.date_to = clean(to);
        self.page = 1;
        self
    }

    pub fn with_order(mut self, order_by: OrderBy, order_dir: OrderDir) -> Self {
        self.order_by = order_by;
        self.order_dir = order_dir;
        self.page = 1;
        self
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = PAGE_SIZES
            .iter()
            .copied()
            .find(|&allowed| allowed >= size)
            .unwrap_or(PAGE_SIZES[PAGE_SIZES.len() - 1]);
        self.page = 1;
        self
    }

    /// Jump to `page`; pages start at 1.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn next_page(self) -> Self {
        let page = self.page.saturating_add(1);
        self.with_page(page)
    }

    pub fn previous_page(self) -> Self {
        let page = self.page.saturating_sub(1);
        self.with_page(page)
    }

    /// Back to the defaults: no filters, newest first, 20 per page.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn order(&self) -> (OrderBy, OrderDir) {
        (self.order_by, self.order_dir)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// A full page suggests there is another one.
    pub fn has_next(&self, items_on_page: usize) -> bool {
        items_on_page == self.page_size as usize
    }

    /// Number of filters currently narrowing the list (sort and paging
    /// excluded).
    pub fn active_filter_count(&self) -> usize {
        let flags = [self.en_vente, self.est_vendu, self.a_ete_achete]
            .iter()
            .filter(|f| f.is_some())
            .count();
        let dates = [&self.date_from, &self.date_to]
            .iter()
            .filter(|d| d.is_some())
            .count();
        let bounds = self
            .prices
            .iter()
            .map(|b| usize::from(b.min.is_some()) + usize::from(b.max.is_some()))
            .sum::<usize>();
        usize::from(!self.search.is_empty()) + flags + dates + bounds
    }

    /// Query string without the leading `?`, keys in a fixed order.
    pub fn to_query_string(&self) -> Result<String, ApiError> {
        let mut pairs: Vec<(&str, String)> = Vec::new();

        if !self.search.is_empty() {
            pairs.push(("search", self.search.clone()));
        }
        for (key, flag) in [
            ("en_vente", self.en_vente),
            ("est_vendu", self.est_vendu),
            ("a_ete_achete", self.a_ete_achete),
        ] {
            if let Some(flag) = flag {
                pairs.push((key, flag.to_string()));
            }
        }
        for field in PriceField::ALL {
            let (min_key, max_key) = field.keys();
            let bounds = self.prices[field.index()];
            if let Some(min) = bounds.min {
                pairs.push((min_key, min.to_string()));
            }
            if let Some(max) = bounds.max {
                pairs.push((max_key, max.to_string()));
            }
        }
        if let Some(from) = &self.date_from {
            pairs.push(("date_mise_en_vente_from", from.clone()));
        }
        if let Some(to) = &self.date_to {
            pairs.push(("date_mise_en_vente_to", to.clone()));
        }
        pairs.push(("order_by", self.order_by.as_str().to_string()));
        pairs.push(("order_dir", self.order_dir.as_str().to_string()));
        pairs.push(("page", self.page.to_string()));
        pairs.push(("page_size", self.page_size.to_string()));

        serde_urlencoded::to_string(&pairs).map_err(|e| ApiError::SerializationError(e.to_string()))
    }
}
