// src/models/organization.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A certifying organization and its static catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub website: String,
    /// Logo as URL or data URI.
    #[serde(default)]
    pub logo: String,
    pub exams: Vec<Exam>,
    #[serde(default)]
    pub exam_product_categories: Vec<ExamProductCategory>,
    #[serde(default)]
    pub certificate_templates: Vec<CertificateTemplate>,
}

impl Organization {
    pub fn exam(&self, exam_id: &str) -> Option<&Exam> {
        self.exams.iter().find(|e| e.id == exam_id)
    }

    pub fn template(&self, template_id: &str) -> Option<&CertificateTemplate> {
        self.certificate_templates.iter().find(|t| t.id == template_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regular_price: Option<f64>,
    /// WooCommerce SKU; only paid exams carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_slug: Option<String>,
    /// Google Sheets URL with the question bank; empty means the bundled bank.
    #[serde(default)]
    pub question_source_url: String,
    pub number_of_questions: u32,
    pub pass_score: f64,
    pub duration_minutes: u32,
    pub certificate_template_id: String,
    #[serde(default)]
    pub is_practice: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_book: Option<RecommendedBook>,
}

/// Groups the free practice test and the paid certification exam of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamProductCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub practice_exam_id: String,
    pub certification_exam_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateTemplate {
    pub id: String,
    pub title: String,
    /// May contain the `{finalScore}` placeholder and inline HTML.
    pub body: String,
    pub signature1_name: String,
    pub signature1_title: String,
    pub signature2_name: String,
    pub signature2_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedBook {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    /// Amazon storefront (e.g. `com`, `in`, `ae`) to affiliate URL.
    #[serde(default)]
    pub affiliate_links: BTreeMap<String, String>,
}
