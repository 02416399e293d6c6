//! Search query for `GET /services`.
//!
//! User input only ever reaches the statement as a bound parameter. Sort
//! columns and directions come from closed enums, so the tokens spliced into
//! `ORDER BY` are always one of a handful of static strings.

use serde::Deserialize;

/// Raw query string. Every field is optional and empty values count as absent.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServiceListQuery {
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    Name,
    #[default]
    CreatedAt,
    /// Cheapest item of the service.
    Price,
}

impl SortColumn {
    /// Unknown values fall back to `created_at`.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("name") => Self::Name,
            Some("price") => Self::Price,
            _ => Self::CreatedAt,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Name => "s.name",
            Self::CreatedAt => "s.created_at",
            Self::Price => "min_price",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            Some("DESC") => Self::Desc,
            _ => Self::Asc,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// `filter=` presets. Both override `sort_by`/`order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Popular,
    Recommended,
}

impl Highlight {
    fn from_param(raw: Option<&str>) -> Option<Self> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("popular") => Some(Self::Popular),
            Some("recommended") => Some(Self::Recommended),
            _ => None,
        }
    }
}

pub const RECOMMENDED_MIN_RATING: i32 = 4;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceFilter {
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: SortColumn,
    pub order: SortOrder,
    pub highlight: Option<Highlight>,
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_price(field: &str, raw: Option<&str>, errors: &mut Vec<String>) -> Option<f64> {
    let raw = raw?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            errors.push(format!("{field}: must be a number"));
            None
        }
    }
}

impl ServiceFilter {
    pub fn from_query(q: &ServiceListQuery) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();

        let category_id = match present(&q.category_id) {
            None => None,
            Some(raw) => match raw.parse::<i32>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push("category_id: must be an integer".to_string());
                    None
                }
            },
        };
        let min_price = parse_price("min_price", present(&q.min_price), &mut errors);
        let max_price = parse_price("max_price", present(&q.max_price), &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            search: present(&q.search).map(String::from),
            category_id,
            min_price,
            max_price,
            sort: SortColumn::from_param(q.sort_by.as_deref()),
            order: SortOrder::from_param(q.order.as_deref()),
            highlight: Highlight::from_param(q.filter.as_deref()),
        })
    }
}

/// Bound value of a built query, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i32),
    Float(f64),
}

/// Finished statement: text plus its parameters. `params[i]` binds `$i+1`.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    sql: String,
    params: Vec<SqlParam>,
}

impl BuiltQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }
}

/// Hands out `$n` placeholders in the order clauses are written.
#[derive(Default)]
struct Placeholders {
    params: Vec<SqlParam>,
}

impl Placeholders {
    fn bind(&mut self, p: SqlParam) -> String {
        self.params.push(p);
        format!("${}", self.params.len())
    }
}

const SELECT: &str = "SELECT s.id, s.name, s.description, s.category_id, s.image_url, \
s.created_at, s.updated_at, \
c.name AS category_name, \
AVG(r.rating)::float8 AS avg_rating, \
COUNT(DISTINCT oi.id) AS order_count, \
MIN(si.price_per_unit)::float8 AS min_price, \
MAX(si.price_per_unit)::float8 AS max_price \
FROM services s \
LEFT JOIN categories c ON c.id = s.category_id \
LEFT JOIN reviews r ON r.service_id = s.id \
LEFT JOIN order_items oi ON oi.service_id = s.id \
LEFT JOIN service_items si ON si.service_id = s.id";

/// Escapes LIKE metacharacters so the term matches literally.
fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

pub fn build_service_search(f: &ServiceFilter) -> BuiltQuery {
    let mut ph = Placeholders::default();
    let mut sql = String::from(SELECT);

    let mut wheres = Vec::new();
    if let Some(term) = &f.search {
        let pattern = like_pattern(term);
        let by_name = ph.bind(SqlParam::Text(pattern.clone()));
        let by_description = ph.bind(SqlParam::Text(pattern));
        wheres.push(format!(
            "(s.name ILIKE {by_name} OR s.description ILIKE {by_description})"
        ));
    }
    if let Some(category_id) = f.category_id {
        wheres.push(format!("s.category_id = {}", ph.bind(SqlParam::Int(category_id))));
    }
    if !wheres.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&wheres.join(" AND "));
    }

    sql.push_str(" GROUP BY s.id, c.id");

    let mut havings = Vec::new();
    if let Some(min) = f.min_price {
        havings.push(format!(
            "MIN(si.price_per_unit)::float8 >= {}",
            ph.bind(SqlParam::Float(min))
        ));
    }
    if let Some(max) = f.max_price {
        havings.push(format!(
            "MIN(si.price_per_unit)::float8 <= {}",
            ph.bind(SqlParam::Float(max))
        ));
    }
    if f.highlight == Some(Highlight::Recommended) {
        havings.push(format!("AVG(r.rating) >= {}", RECOMMENDED_MIN_RATING));
    }
    if !havings.is_empty() {
        sql.push_str(" HAVING ");
        sql.push_str(&havings.join(" AND "));
    }

    let order_by = match f.highlight {
        Some(Highlight::Recommended) => "avg_rating DESC NULLS LAST".to_string(),
        Some(Highlight::Popular) => "order_count DESC".to_string(),
        None => format!("{} {}", f.sort.column(), f.order.keyword()),
    };
    sql.push_str(" ORDER BY ");
    sql.push_str(&order_by);
    sql.push_str(", s.id ASC");

    BuiltQuery {
        sql,
        params: ph.params,
    }
}
