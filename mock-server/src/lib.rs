use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cookie::{time::Duration, Cookie};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "access_token_cookie";
pub const CSRF_COOKIE: &str = "csrf_access_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

pub const DEMO_EMAIL: &str = "demo@gosell.test";
pub const DEMO_PASSWORD: &str = "secret";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub nom: String,
    pub description: Option<String>,
    pub type_produit: String,
    pub en_vente: bool,
    pub est_vendu: bool,
    pub a_ete_achete: bool,
    pub prix_achat: Option<f64>,
    pub prix_vente: Option<f64>,
    pub prix_min_espere: Option<f64>,
    pub prix_max_espere: Option<f64>,
    pub date_mise_en_vente: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct Session {
    pub user: User,
    pub csrf: String,
}

/// Filters accepted by `GET /api/products`; unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub en_vente: Option<bool>,
    pub est_vendu: Option<bool>,
    pub a_ete_achete: Option<bool>,
    pub prix_achat_min: Option<f64>,
    pub prix_achat_max: Option<f64>,
    pub prix_vente_min: Option<f64>,
    pub prix_vente_max: Option<f64>,
    pub prix_min_espere_min: Option<f64>,
    pub prix_min_espere_max: Option<f64>,
    pub prix_max_espere_min: Option<f64>,
    pub prix_max_espere_max: Option<f64>,
    pub date_mise_en_vente_from: Option<String>,
    pub date_mise_en_vente_to: Option<String>,
    pub order_by: Option<String>,
    pub order_dir: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

pub type Sessions = Arc<RwLock<HashMap<String, Session>>>;

#[derive(Clone)]
pub struct AppState {
    sessions: Sessions,
    products: Arc<Vec<Product>>,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Identifiants invalides")]
    BadCredentials,

    #[error("Missing or expired session")]
    Unauthenticated,

    #[error("CSRF token missing or invalid")]
    BadCsrf,

    #[error("Unknown page size {0}")]
    BadPageSize(usize),

    #[error("not found")]
    NotFound,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match self {
            ServerError::BadCredentials | ServerError::Unauthenticated | ServerError::BadCsrf => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::BadPageSize(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
        };
        // CSRF failures use the flat `{message}` shape, everything else nests
        // the message under `error`.
        let body = match self {
            ServerError::BadCsrf => json!({ "message": self.to_string() }),
            ServerError::BadPageSize(size) => json!({ "field": "page_size", "value": size }),
            _ => json!({ "error": { "message": self.to_string() } }),
        };
        (status, Json(body)).into_response()
    }
}

pub fn app() -> Router {
    let state = AppState {
        sessions: Arc::new(RwLock::new(HashMap::new())),
        products: Arc::new(seed_products()),
    };
    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/dashboard/summary", get(dashboard_summary))
        .route("/api/products", get(list_products))
        .fallback(|| async { ServerError::NotFound })
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn health() -> &'static str {
    "ok"
}

async fn login(State(state): State<AppState>, Json(input): Json<LoginInput>) -> Result<Response, ServerError> {
    if input.email.trim() != DEMO_EMAIL || input.password != DEMO_PASSWORD {
        warn!(email = %input.email, "login rejected");
        return Err(ServerError::BadCredentials);
    }

    let session_id = Uuid::new_v4().to_string();
    let csrf = Uuid::new_v4().to_string();
    let user = demo_user();
    state.sessions.write().await.insert(
        session_id.clone(),
        Session {
            user: user.clone(),
            csrf: csrf.clone(),
        },
    );
    info!(user = user.id, "login accepted");

    let cookies = AppendHeaders([
        (SET_COOKIE, session_cookie(SESSION_COOKIE, &session_id, true)),
        (SET_COOKIE, session_cookie(CSRF_COOKIE, &csrf, false)),
    ]);
    let body = json!({ "ok": true, "user": user, "csrf_access": csrf });
    Ok((StatusCode::OK, cookies, Json(body)).into_response())
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ServerError> {
    let (_, session) = authenticate(&state, &headers).await?;
    Ok(Json(json!({ "user": session.user })))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ServerError> {
    let (session_id, session) = authenticate(&state, &headers).await?;
    state.sessions.write().await.remove(&session_id);
    info!(user = session.user.id, "logout");

    let cookies = AppendHeaders([
        (SET_COOKIE, expired_cookie(SESSION_COOKIE)),
        (SET_COOKIE, expired_cookie(CSRF_COOKIE)),
    ]);
    Ok((StatusCode::NO_CONTENT, cookies).into_response())
}

async fn dashboard_summary(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ServerError> {
    authenticate(&state, &headers).await?;
    Ok(Json(summarize(&state.products)))
}

async fn list_products(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ServerError> {
    authenticate(&state, &headers).await?;
    let page_size = filter.page_size.unwrap_or(20);
    if ![10, 20, 50, 100].contains(&page_size) {
        return Err(ServerError::BadPageSize(page_size));
    }
    let page = filter.page.unwrap_or(1).max(1);

    let mut items: Vec<Product> = state
        .products
        .iter()
        .filter(|p| matches(p, &filter))
        .cloned()
        .collect();
    sort_products(&mut items, filter.order_by.as_deref(), filter.order_dir.as_deref());

    let items = items.into_iter().skip((page - 1) * page_size).take(page_size).collect();
    Ok(Json(items))
}

/// Look up the session cookie and check the CSRF header against it. The
/// check runs for every method, GET included.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<(String, Session), ServerError> {
    let cookies = request_cookies(headers);
    let session_id = cookies.get(SESSION_COOKIE).ok_or(ServerError::Unauthenticated)?;
    let session = state
        .sessions
        .read()
        .await
        .get(session_id)
        .cloned()
        .ok_or(ServerError::Unauthenticated)?;

    let sent = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    if sent != Some(session.csrf.as_str()) {
        warn!(user = session.user.id, "csrf mismatch");
        return Err(ServerError::BadCsrf);
    }
    Ok((session_id.clone(), session))
}

fn request_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw.to_string()))
        .filter_map(Result::ok)
        .map(|c| (c.name().to_string(), c.value().to_string()))
        .collect()
}

fn session_cookie(name: &str, value: &str, http_only: bool) -> String {
    Cookie::build((name.to_string(), value.to_string()))
        .path("/")
        .http_only(http_only)
        .build()
        .to_string()
}

fn expired_cookie(name: &str) -> String {
    Cookie::build((name.to_string(), String::new()))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
        .to_string()
}

fn in_range(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(v) = value else {
        return false;
    };
    min.is_none_or(|m| v >= m) && max.is_none_or(|m| v <= m)
}

fn matches(p: &Product, f: &ProductFilter) -> bool {
    if let Some(search) = f.search.as_deref().map(str::to_lowercase) {
        let haystack = format!("{} {}", p.nom, p.description.as_deref().unwrap_or("")).to_lowercase();
        if !haystack.contains(&search) {
            return false;
        }
    }
    let flags = [
        (f.en_vente, p.en_vente),
        (f.est_vendu, p.est_vendu),
        (f.a_ete_achete, p.a_ete_achete),
    ];
    if flags.iter().any(|(want, have)| want.is_some_and(|w| w != *have)) {
        return false;
    }
    let date = p.date_mise_en_vente.as_deref();
    if let Some(from) = f.date_mise_en_vente_from.as_deref() {
        if date.is_none_or(|d| d < from) {
            return false;
        }
    }
    if let Some(to) = f.date_mise_en_vente_to.as_deref() {
        if date.is_none_or(|d| d > to) {
            return false;
        }
    }
    in_range(p.prix_achat, f.prix_achat_min, f.prix_achat_max)
        && in_range(p.prix_vente, f.prix_vente_min, f.prix_vente_max)
        && in_range(p.prix_min_espere, f.prix_min_espere_min, f.prix_min_espere_max)
        && in_range(p.prix_max_espere, f.prix_max_espere_min, f.prix_max_espere_max)
}

fn sort_products(items: &mut [Product], order_by: Option<&str>, order_dir: Option<&str>) {
    fn price(a: Option<f64>, b: Option<f64>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
    items.sort_by(|a, b| match order_by.unwrap_or("date_mise_en_vente") {
        "nom" => a.nom.cmp(&b.nom),
        "prix_achat" => price(a.prix_achat, b.prix_achat),
        "prix_vente" => price(a.prix_vente, b.prix_vente),
        _ => a.date_mise_en_vente.cmp(&b.date_mise_en_vente),
    });
    if order_dir != Some("asc") {
        items.reverse();
    }
}

fn summarize(products: &[Product]) -> Value {
    let cost_products: f64 = products.iter().filter_map(|p| p.prix_achat).sum();
    let expected: Vec<f64> = products
        .iter()
        .filter_map(|p| Some((p.prix_min_espere? + p.prix_max_espere?) / 2.0))
        .collect();
    let revenue: f64 = expected.iter().sum();
    let ignored_missing_cost = products
        .iter()
        .filter(|p| p.a_ete_achete && p.prix_achat.is_none())
        .count();
    let ignored_missing_expected = products.len() - expected.len();

    let risk: Vec<Value> = products
        .iter()
        .filter_map(|p| {
            let reason = if p.a_ete_achete && p.prix_achat.unwrap_or(0.0) == 0.0 {
                ("ZERO_COST", "HIGH_RISK")
            } else if p.prix_min_espere.is_none() || p.prix_max_espere.is_none() {
                ("MISSING_EXPECTED", "MEDIUM_RISK")
            } else {
                return None;
            };
            Some(json!({
                "product_id": p.id,
                "nom": p.nom,
                "reason": reason.0,
                "risk_level": reason.1,
                "cost_total": p.prix_achat,
                "profit_amount": null,
                "multiple": null,
            }))
        })
        .collect();

    let mut by_type: HashMap<&str, Vec<f64>> = HashMap::new();
    for p in products {
        if let (Some(cost), Some(min), Some(max)) = (p.prix_achat, p.prix_min_espere, p.prix_max_espere) {
            if cost > 0.0 {
                by_type
                    .entry(p.type_produit.as_str())
                    .or_default()
                    .push((min + max) / 2.0 / cost);
            }
        }
    }
    let mut best: Vec<(&str, f64)> = by_type
        .into_iter()
        .map(|(name, multiples)| (name, multiples.iter().sum::<f64>() / multiples.len() as f64))
        .filter(|(_, avg)| *avg >= 1.5)
        .collect();
    best.sort_by(|a, b| b.1.total_cmp(&a.1));

    json!({
        "counts": {
            "nb_produits_total": products.len(),
            "nb_produits_en_vente": products.iter().filter(|p| p.en_vente && !p.est_vendu).count(),
            "nb_produits_vendus": products.iter().filter(|p| p.est_vendu).count(),
            "nb_lots": 2,
            "nb_stocks": 1,
        },
        "benefices": {
            "counts": {
                "nb_produits": products.len(),
                "nb_produits_ignored_missing_cost": ignored_missing_cost,
                "nb_produits_ignored_missing_expected": ignored_missing_expected,
            },
            "scope": { "include_products": true, "include_stocks": true, "include_fees": false },
            "totals": {
                "profit_expected_median": revenue - cost_products,
                "is_profit_expected_median": true,
                "revenue_expected_median": revenue,
                "cost_total": cost_products,
                "cost_products": cost_products,
                "cost_stocks": 0.0,
                "fees": 0.0,
            },
        },
        "best_types": {
            "count": best.len(),
            "items": best.iter().map(|(name, avg)| json!({ "nom": name, "avg_multiple": avg })).collect::<Vec<_>>(),
            "filters": { "min_multiple": 1.5 },
        },
        "risk_products": { "count": risk.len(), "items": risk },
    })
}

fn demo_user() -> User {
    User {
        id: 1,
        email: DEMO_EMAIL.to_string(),
        first_name: "Camille".to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn product(
    id: i64,
    nom: &str,
    type_produit: &str,
    (en_vente, est_vendu, a_ete_achete): (bool, bool, bool),
    prix_achat: Option<f64>,
    prix_vente: Option<f64>,
    espere: Option<(f64, f64)>,
    date: Option<&str>,
) -> Product {
    Product {
        id,
        nom: nom.to_string(),
        description: None,
        type_produit: type_produit.to_string(),
        en_vente,
        est_vendu,
        a_ete_achete,
        prix_achat,
        prix_vente,
        prix_min_espere: espere.map(|e| e.0),
        prix_max_espere: espere.map(|e| e.1),
        date_mise_en_vente: date.map(str::to_string),
    }
}

pub fn seed_products() -> Vec<Product> {
    let mut items = vec![
        product(1, "Lampe laiton", "Luminaire", (true, false, true), Some(12.0), None, Some((35.0, 50.0)), Some("2024-03-02")),
        product(2, "Chaise bistrot", "Mobilier", (true, false, true), Some(8.5), None, Some((25.0, 40.0)), Some("2024-02-10")),
        product(3, "Miroir doré", "Décoration", (false, true, true), Some(20.0), Some(65.0), Some((50.0, 80.0)), Some("2024-01-15")),
        product(4, "Table basse", "Mobilier", (false, false, false), None, None, None, None),
        product(5, "Vase Art déco", "Décoration", (true, false, true), Some(0.0), None, Some((15.0, 30.0)), Some("2024-04-01")),
        product(6, "Applique murale", "Luminaire", (true, false, true), Some(6.0), None, None, Some("2024-03-20")),
    ];
    items[0].description = Some("Pied en laiton, abat-jour lin".to_string());
    items
}
