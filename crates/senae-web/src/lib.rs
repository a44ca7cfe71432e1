//! Axum + Askama front end for the SENAE tariff engine.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use askama::Template;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use senae_core::{
    round_for_display, BatchError, BatchResult, Category, Charges, InputField, LineItem,
    ProductType, RegulatoryRates, TariffEngine, TariffError, TariffRequest, TariffResult,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

pub const CRATE_NAME: &str = "senae-web";

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub rates_path: Option<PathBuf>,
}

impl WebConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("SENAE_BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(IpAddr::from([0, 0, 0, 0])),
            port: std::env::var("SENAE_WEB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            rates_path: std::env::var("SENAE_RATES_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Rate table from `rates_path`, or the built-in one.
    pub fn load_rates(&self) -> anyhow::Result<RegulatoryRates> {
        match &self.rates_path {
            Some(path) => load_rates_from_yaml(path),
            None => Ok(RegulatoryRates::default()),
        }
    }
}

pub fn load_rates_from_yaml(path: &Path) -> anyhow::Result<RegulatoryRates> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("reading rates file {}", path.display()))?;
    let rates: RegulatoryRates = serde_yaml::from_str(&yaml)
        .with_context(|| format!("parsing rates file {}", path.display()))?;
    rates
        .validate()
        .with_context(|| format!("validating rates file {}", path.display()))?;
    Ok(rates)
}

#[derive(Clone)]
pub struct AppState {
    pub engine: TariffEngine,
}

impl AppState {
    pub fn new(engine: TariffEngine) -> Self {
        Self { engine }
    }
}

/// One printable line of a tariff breakdown, amounts already rounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownRow {
    pub label: String,
    pub amount: String,
}

/// Shared by the HTML partial and the CLI table.
pub fn breakdown_rows(result: &TariffResult) -> Vec<BreakdownRow> {
    let row = |label: String, amount: Decimal| BreakdownRow {
        label,
        amount: money(amount),
    };
    let mut rows = vec![row("Customs value".into(), result.base_value())];
    match result.charges() {
        Charges::B { duty, .. } => rows.push(row("Flat duty".into(), *duty)),
        Charges::C {
            duty,
            duty_rate,
            vat,
            vat_rate,
            fodinfa,
            fodinfa_rate,
            ..
        } => {
            rows.push(row(format!("Duty ({})", percent(*duty_rate)), *duty));
            rows.push(row(format!("VAT ({})", percent(*vat_rate)), *vat));
            rows.push(row(format!("FODINFA ({})", percent(*fodinfa_rate)), *fodinfa));
        }
        Charges::D {
            product_type,
            adv,
            adv_rate,
            specific_duty,
            vat,
            vat_rate,
            fodinfa,
            fodinfa_rate,
            ..
        } => {
            rows.push(row(format!("ADV ({})", percent(*adv_rate)), *adv));
            rows.push(row(format!("Specific duty ({product_type})"), *specific_duty));
            rows.push(row(format!("VAT ({})", percent(*vat_rate)), *vat));
            rows.push(row(format!("FODINFA ({})", percent(*fodinfa_rate)), *fodinfa));
        }
    }
    rows.push(row("Total taxes".into(), result.total_taxes()));
    rows.push(row("Total cost".into(), result.total_cost()));
    rows
}

/// Compliance remarks worth showing next to a breakdown.
pub fn compliance_notes(result: &TariffResult) -> Vec<String> {
    let mut notes = Vec::new();
    if result.free_of_tributes() {
        notes.push("Free of tributes (no VAT or FODINFA)".to_string());
    }
    if let (Some(limit), Some(count)) = (result.annual_limit(), result.import_count()) {
        notes.push(format!("Annual limit {} (import #{count} this year)", money(limit)));
    }
    if let Some(savings) = result.savings() {
        notes.push(format!("Saves {} in VAT and FODINFA", money(savings)));
    }
    if let Some(shares) = result.tax_shares() {
        notes.push(format!(
            "Tax share: duty {}, VAT {}, FODINFA {}",
            share(shares.duty_percentage),
            share(shares.vat_percentage),
            share(shares.fodinfa_percentage),
        ));
    }
    if result.requires_control_document() {
        notes.push("Prior control document may be required".to_string());
    }
    if result.requires_inen() {
        notes.push("INEN certification required".to_string());
    }
    notes
}

fn money(amount: Decimal) -> String {
    format!("${:.2}", round_for_display(amount))
}

fn share(percentage: Decimal) -> String {
    format!("{:.2}%", round_for_display(percentage))
}

fn percent(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}

#[derive(Debug, Clone)]
struct CategoryRow {
    code: &'static str,
    max_value: String,
    max_weight: String,
    selected: bool,
}

#[derive(Debug, Clone)]
struct ProductTypeRow {
    value: &'static str,
    selected: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    categories: Vec<CategoryRow>,
    product_types: Vec<ProductTypeRow>,
}

#[derive(Template)]
#[template(path = "calculator_result_partial.html")]
struct CalculatorResultPartialTemplate {
    category: String,
    rows: Vec<BreakdownRow>,
    notes: Vec<String>,
}

#[derive(Template)]
#[template(path = "calculator_error_partial.html")]
struct CalculatorErrorPartialTemplate {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CalculatorForm {
    value: String,
    weight: String,
    category: String,
    #[serde(default)]
    product_type: String,
    #[serde(default)]
    import_count: String,
}

impl CalculatorForm {
    fn into_request(self) -> Result<TariffRequest, TariffError> {
        let product_type = match self.product_type.trim() {
            "" => None,
            raw => Some(raw.parse::<ProductType>()?),
        };
        let import_count = match self.import_count.trim() {
            "" => None,
            raw => Some(raw.parse::<u32>().map_err(|_| TariffError::InvalidField {
                field: InputField::ImportCount,
                reason: format!("`{raw}` is not a whole number"),
            })?),
        };
        Ok(TariffRequest {
            value: Some(parse_decimal(InputField::Value, &self.value)?),
            weight: Some(parse_decimal(InputField::Weight, &self.weight)?),
            category: Some(self.category.parse::<Category>()?),
            product_type,
            import_count,
        })
    }
}

fn parse_decimal(field: InputField, raw: &str) -> Result<Decimal, TariffError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TariffError::InvalidField {
            field,
            reason: "is required".to_string(),
        });
    }
    Decimal::from_str(raw).map_err(|_| TariffError::InvalidField {
        field,
        reason: format!("`{raw}` is not a number"),
    })
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<LineItem>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub quote_number: String,
    pub calculated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub batch: BatchResult,
}

#[derive(Debug, Deserialize)]
struct SuggestQuery {
    value: Decimal,
    weight: Decimal,
    product_type: Option<ProductType>,
    label: Option<String>,
}

#[derive(Debug, Serialize)]
struct SuggestResponse {
    category: Category,
    product_type: Option<ProductType>,
}

/// Quote reference in the `IBT-YYYYMMDD-XXXXXXXX` shape used on orders.
pub fn new_quote_number(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase();
    format!("IBT-{}-{suffix}", at.format("%Y%m%d"))
}

enum ApiError {
    Tariff(TariffError),
    Batch(BatchError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Tariff(err) => serde_json::json!({
                "error": err.kind(),
                "message": err.to_string(),
                "excess": err.excess(),
            }),
            ApiError::Batch(err) => serde_json::json!({
                "error": err.tariff_error().kind(),
                "message": err.to_string(),
                "index": err.index(),
                "excess": err.tariff_error().excess(),
            }),
        };
        (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/calculator", post(calculator_handler))
        .route("/api/tariffs/calculate", post(api_calculate_handler))
        .route("/api/tariffs/batch", post(api_batch_handler))
        .route("/api/tariffs/suggest", get(api_suggest_handler))
        .route("/api/rates", get(api_rates_handler))
        .route("/healthz", get(healthz_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn serve(config: WebConfig) -> anyhow::Result<()> {
    let rates = config.load_rates()?;
    let state = AppState::new(TariffEngine::new(rates));
    let listener = TcpListener::bind((config.bind_addr, config.port))
        .await
        .with_context(|| format!("binding {}:{}", config.bind_addr, config.port))?;
    let rates_source = config
        .rates_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());
    info!(addr = %listener.local_addr()?, rates = %rates_source, "tariff calculator listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    serve(WebConfig::from_env()).await
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let rates = state.engine.rates();
    let categories = Category::ALL
        .into_iter()
        .map(|category| {
            let limits = rates.limits(category);
            CategoryRow {
                code: category.as_str(),
                max_value: money(limits.max_value),
                max_weight: limits.max_weight.normalize().to_string(),
                selected: category == Category::B,
            }
        })
        .collect();
    let product_types = ProductType::ALL
        .into_iter()
        .map(|p| ProductTypeRow {
            value: p.as_str(),
            selected: p == ProductType::General,
        })
        .collect();
    render_html(IndexTemplate {
        categories,
        product_types,
    })
}

async fn calculator_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CalculatorForm>,
) -> Response {
    let outcome = form
        .into_request()
        .and_then(TariffRequest::into_input)
        .and_then(|input| state.engine.calculate(&input));
    match outcome {
        Ok(result) => render_html(CalculatorResultPartialTemplate {
            category: result.category().to_string(),
            rows: breakdown_rows(&result),
            notes: compliance_notes(&result),
        }),
        Err(err) => {
            info!(kind = err.kind(), %err, "calculator form rejected");
            render_html(CalculatorErrorPartialTemplate {
                message: err.to_string(),
            })
        }
    }
}

async fn api_calculate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TariffRequest>,
) -> Result<Json<TariffResult>, ApiError> {
    let input = request.into_input().map_err(reject)?;
    let result = state.engine.calculate(&input).map_err(reject)?;
    debug!(
        category = %result.category(),
        total_taxes = %result.total_taxes(),
        "tariff calculated"
    );
    Ok(Json(result))
}

async fn api_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let batch = state.engine.calculate_batch(&request.items).map_err(|err| {
        info!(index = err.index(), kind = err.tariff_error().kind(), %err, "batch rejected");
        ApiError::Batch(err)
    })?;
    let calculated_at = Utc::now();
    let quote_number = new_quote_number(calculated_at);
    debug!(
        %quote_number,
        items = batch.summary.item_count,
        total_cost = %batch.summary.total_cost,
        "batch quoted"
    );
    Ok(Json(QuoteResponse {
        quote_number,
        calculated_at,
        batch,
    }))
}

async fn api_suggest_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuggestQuery>,
) -> Json<SuggestResponse> {
    let product_type = query
        .product_type
        .or_else(|| query.label.as_deref().and_then(ProductType::from_label));
    let category = state
        .engine
        .suggest_category(query.value, query.weight, product_type);
    Json(SuggestResponse {
        category,
        product_type,
    })
}

async fn api_rates_handler(State(state): State<Arc<AppState>>) -> Json<RegulatoryRates> {
    Json(state.engine.rates().clone())
}

async fn healthz_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "ok")
}

fn reject(err: TariffError) -> ApiError {
    info!(kind = err.kind(), %err, "tariff request rejected");
    ApiError::Tariff(err)
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}
