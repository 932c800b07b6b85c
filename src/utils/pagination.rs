// Pagination page/limit : {count, next, previous, results}
// Les liens next/previous reprennent l'URL de la requête en remplaçant `page`.

use actix_web::{web, HttpRequest};
use serde::{Deserialize, Serialize};

const MAX_LIMIT: u64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageParams {
    /// Lit page/limit depuis les paires de la query string (valeurs invalides ignorées)
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let find = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.parse::<u64>().ok())
        };
        Self {
            page: find("page"),
            limit: find("limit"),
        }
    }

    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self, default: u64) -> u64 {
        self.limit.unwrap_or(default).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(req: &HttpRequest, page: u64, limit: u64, count: u64, results: Vec<T>) -> Self {
        let pages = count.div_ceil(limit);
        let next = (page < pages).then(|| page_link(req, Some(page + 1)));
        let previous = (page > 1).then(|| {
            if page == 2 {
                page_link(req, None)
            } else {
                page_link(req, Some(page - 1))
            }
        });

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

/// Query string décodée en paires, clés répétées conservées (`?tags=a&tags=b`)
pub type QueryPairs = web::Query<Vec<(String, String)>>;

/// `page = None` retire le paramètre (première page)
fn page_link(req: &HttpRequest, page: Option<u64>) -> String {
    let info = req.connection_info();
    let mut pairs: Vec<(String, String)> =
        serde_urlencoded::from_str::<Vec<(String, String)>>(req.query_string())
            .unwrap_or_default()
            .into_iter()
            .filter(|(k, _)| k != "page")
            .collect();
    if let Some(page) = page {
        pairs.push(("page".to_string(), page.to_string()));
    }

    let base = format!("{}://{}{}", info.scheme(), info.host(), req.path());
    match serde_urlencoded::to_string(&pairs) {
        Ok(query) if !query.is_empty() => format!("{}?{}", base, query),
        _ => base,
    }
}
