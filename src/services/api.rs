use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::modules::course::model::Course;
use crate::modules::Keyed;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("API returned {0}: {1}")]
    Status(u16, String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A course as the LMS API serves it. Only the fields the checks need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCourse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub modules: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CourseList {
    Bare(Vec<ApiCourse>),
    Wrapped { data: Vec<ApiCourse> },
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_courses(&self) -> Result<Vec<ApiCourse>, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/courses", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(status, error_text));
        }

        let body = response.text().await?;
        match serde_json::from_str::<CourseList>(&body) {
            Ok(CourseList::Bare(courses)) | Ok(CourseList::Wrapped { data: courses }) => Ok(courses),
            Err(e) => Err(ApiError::InvalidResponse(e.to_string())),
        }
    }

    /// `None` when the API answers 404.
    pub async fn get_course(&self, id: &str) -> Result<Option<ApiCourse>, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/courses/{}", self.base_url, id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(status, error_text));
        }

        let course = response
            .json::<ApiCourse>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        Ok(Some(course))
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct CrossCheck {
    /// Published in the database but not served.
    pub missing: Vec<String>,
    /// Served but unknown to the database.
    pub unexpected: Vec<String>,
    /// Same id, different title: (database, api).
    pub title_mismatches: Vec<(String, String)>,
    pub matched: usize,
}

impl CrossCheck {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.title_mismatches.is_empty()
    }
}

pub fn cross_check(db_courses: &[Course], api_courses: &[ApiCourse]) -> CrossCheck {
    let mut result = CrossCheck::default();
    let served: HashMap<&str, &ApiCourse> = api_courses
        .iter()
        .filter_map(|c| c.id.as_deref().map(|id| (id, c)))
        .collect();

    let mut known = Vec::new();
    for course in db_courses {
        let Some(reference) = course.reference() else {
            continue;
        };
        match served.get(reference.as_str()) {
            Some(api) => {
                result.matched += 1;
                if api.title != course.title {
                    result.title_mismatches.push((course.title.clone(), api.title.clone()));
                }
            }
            None if course.is_live() => result.missing.push(course.title.clone()),
            None => {}
        }
        known.push(reference);
    }

    result.unexpected = api_courses
        .iter()
        .filter(|c| c.id.as_ref().map_or(true, |id| !known.contains(id)))
        .map(|c| c.title.clone())
        .collect();
    result
}

impl fmt::Display for CrossCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} courses match", self.matched)?;
        for title in &self.missing {
            writeln!(f, "  missing from API: {}", title)?;
        }
        for title in &self.unexpected {
            writeln!(f, "  not in database: {}", title)?;
        }
        for (db, api) in &self.title_mismatches {
            writeln!(f, "  title differs: {:?} (db) vs {:?} (api)", db, api)?;
        }
        Ok(())
    }
}
