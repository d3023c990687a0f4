//! Exam catalog: loading it and layering session prices on top.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    config::CatalogSource,
    error::AppError,
    models::{
        organization::{Exam, Organization},
        session::Session,
    },
    remote::wordpress::WordPressClient,
};

const BUNDLED_CATALOG: &str = include_str!("../../data/catalog.json");

/// Applies the session's synced prices to the static catalog.
///
/// Exams whose `productSku` has an entry in `session.exam_prices` get that
/// price and regular price; everything else keeps its catalog defaults.
pub fn resolve_catalog(static_orgs: &[Organization], session: Option<&Session>) -> Vec<Organization> {
    let Some(session) = session else {
        return static_orgs.to_vec();
    };

    static_orgs
        .iter()
        .map(|org| {
            let mut org = org.clone();
            for exam in org.exams.iter_mut() {
                let synced = exam
                    .product_sku
                    .as_deref()
                    .and_then(|sku| session.exam_prices.get(sku));
                if let Some(synced) = synced {
                    exam.price = synced.price;
                    exam.regular_price = synced.regular_price;
                }
            }
            org
        })
        .collect()
}

/// Practice exams are free; paid ones need their id or SKU among the entitlements.
pub fn is_entitled(session: &Session, exam: &Exam) -> bool {
    if exam.is_practice {
        return true;
    }
    session.paid_exam_ids.contains(&exam.id)
        || exam
            .product_sku
            .as_ref()
            .is_some_and(|sku| session.paid_exam_ids.contains(sku))
}

pub fn find_org<'a>(orgs: &'a [Organization], org_id: &str) -> Result<&'a Organization, AppError> {
    orgs.iter()
        .find(|o| o.id == org_id)
        .ok_or_else(|| AppError::NotFound(format!("Organization '{}' not found", org_id)))
}

pub fn find_exam<'a>(org: &'a Organization, exam_id: &str) -> Result<&'a Exam, AppError> {
    org.exam(exam_id)
        .ok_or_else(|| AppError::NotFound(format!("Exam '{}' not found", exam_id)))
}

/// The catalog shipped with the binary.
pub fn bundled_catalog() -> Result<Vec<Organization>, AppError> {
    serde_json::from_str(BUNDLED_CATALOG)
        .map_err(|e| AppError::ConfigError(format!("Bundled catalog is invalid: {}", e)))
}

/// Holds the loaded catalog. Empty until the first successful load.
#[derive(Default)]
pub struct CatalogCache {
    orgs: RwLock<Option<Arc<Vec<Organization>>>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orgs(orgs: Vec<Organization>) -> Self {
        Self {
            orgs: RwLock::new(Some(Arc::new(orgs))),
        }
    }

    /// The static catalog, or `ConfigError` while none could be loaded.
    pub async fn get(&self) -> Result<Arc<Vec<Organization>>, AppError> {
        self.orgs.read().await.clone().ok_or_else(|| {
            AppError::ConfigError(
                "Exam catalog is not available. Please retry shortly.".to_string(),
            )
        })
    }

    /// (Re)loads the catalog. On failure the previous catalog stays in place.
    pub async fn load(
        &self,
        source: CatalogSource,
        client: &WordPressClient,
    ) -> Result<usize, AppError> {
        let orgs = match source {
            CatalogSource::Bundled => bundled_catalog()?,
            CatalogSource::Remote => client.get_app_config().await.map_err(|e| {
                AppError::ConfigError(format!("Failed to fetch exam catalog: {}", e))
            })?,
        };

        if orgs.is_empty() {
            return Err(AppError::ConfigError(
                "Exam catalog contains no organizations".to_string(),
            ));
        }

        let exam_count = orgs.iter().map(|o| o.exams.len()).sum();
        tracing::info!(
            "Loaded catalog: {} organization(s), {} exam(s)",
            orgs.len(),
            exam_count
        );
        *self.orgs.write().await = Some(Arc::new(orgs));
        Ok(exam_count)
    }
}
