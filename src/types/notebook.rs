use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub pages: Vec<Page>,
    #[serde(default)]
    pub texts: Vec<TextEntry>,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default)]
    pub shared_with: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub drawings: Vec<Stroke>,
    #[serde(default)]
    pub text: String,
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<Point>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Speech-capture entry tagged with the page it was taken on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEntry {
    pub id: u64,
    pub text: String,
    pub timestamp: String,
    pub page: u32,
}

impl Page {
    pub fn blank(page_number: u32) -> Self {
        Self {
            drawings: Vec::new(),
            text: String::new(),
            page_number,
        }
    }
}

impl Notebook {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is required");
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err("name must be at most 100 characters");
    }
    Ok(())
}

/// Page numbers must run 1..=len in order; pages are addressed by
/// zero-based index everywhere else.
pub fn validate_pages(pages: &[Page]) -> Result<(), &'static str> {
    if pages.is_empty() {
        return Err("a notebook must keep at least one page");
    }
    for (index, page) in pages.iter().enumerate() {
        if page.page_number as usize != index + 1 {
            return Err("pages must be numbered contiguously from 1");
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn validate_pages__should_accept_contiguous_numbering() {
        // Given
        let pages = vec![Page::blank(1), Page::blank(2), Page::blank(3)];

        // Then
        assert!(validate_pages(&pages).is_ok());
    }

    #[test]
    fn validate_pages__should_reject_gaps_and_reorderings() {
        // Then
        assert!(validate_pages(&[Page::blank(1), Page::blank(3)]).is_err());
        assert!(validate_pages(&[Page::blank(2), Page::blank(1)]).is_err());
        assert!(validate_pages(&[Page::blank(0)]).is_err());
        assert!(validate_pages(&[]).is_err());
    }

    #[test]
    fn validate_name__should_enforce_bounds() {
        // Then
        assert!(validate_name("Physics").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"n".repeat(101)).is_err());
    }

    #[test]
    fn page_serialization__should_use_camel_case_wire_names() {
        // Given
        let page = Page::blank(1);

        // When
        let json = serde_json::to_value(&page).expect("serialize page");

        // Then
        assert_eq!(
            json,
            serde_json::json!({"drawings": [], "text": "", "pageNumber": 1})
        );
    }
}
