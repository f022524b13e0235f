//! Qualitative labels derived from raw counts and keyword text.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Level {
    /// Buckets `ratio` against descending `(very_high, high, medium)` thresholds.
    /// Anything at or below the last threshold is `Low`.
    fn bucket(ratio: f64, thresholds: [f64; 3]) -> Level {
        let [very_high, high, medium] = thresholds;
        if ratio > very_high {
            Level::VeryHigh
        } else if ratio > high {
            Level::High
        } else if ratio > medium {
            Level::Medium
        } else {
            Level::Low
        }
    }
}

const BLOG_SATURATION_THRESHOLDS: [f64; 3] = [0.5, 0.3, 0.1];
const COMPETITION_THRESHOLDS: [f64; 3] = [0.7, 0.4, 0.2];

const COMMERCIAL_TERMS: &[&str] = &[
    "구매", "할인", "최저가", "쇼핑", "구입", "판매", "가격", "원", "만원", "세일", "특가",
];

/// How saturated the blog space is relative to search demand.
pub fn blog_saturation(blog_total: u64, search_volume: u64) -> Level {
    if search_volume == 0 {
        return Level::Low;
    }
    Level::bucket(
        blog_total as f64 / search_volume as f64,
        BLOG_SATURATION_THRESHOLDS,
    )
}

pub fn competition(search_volume: u64, blog_total: u64) -> Level {
    if search_volume == 0 {
        return Level::Low;
    }
    Level::bucket(blog_total as f64 / search_volume as f64, COMPETITION_THRESHOLDS)
}

/// Commercial intent, from how many purchase-related terms the keyword contains.
pub fn commercial_intent(keyword: &str) -> Level {
    let score = COMMERCIAL_TERMS
        .iter()
        .filter(|term| keyword.contains(*term))
        .count();

    match score {
        0 => Level::Low,
        1 => Level::Medium,
        2 => Level::High,
        _ => Level::VeryHigh,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShopCategory {
    Clothing,
    Electronics,
    Food,
    Beauty,
    Furniture,
    Books,
    Other,
}

// Checked in order; the first category with a matching term wins.
const CATEGORY_TERMS: &[(ShopCategory, &[&str])] = &[
    (
        ShopCategory::Clothing,
        &["옷", "셔츠", "바지", "코트", "자켓", "패션", "의류"],
    ),
    (
        ShopCategory::Electronics,
        &["폰", "컴퓨터", "노트북", "태블릿", "전자", "가전"],
    ),
    (
        ShopCategory::Food,
        &["음식", "과자", "식품", "음료", "차", "커피"],
    ),
    (
        ShopCategory::Beauty,
        &["화장품", "스킨케어", "메이크업", "뷰티", "미용"],
    ),
    (
        ShopCategory::Furniture,
        &["가구", "소파", "침대", "테이블", "의자"],
    ),
    (ShopCategory::Books, &["책", "도서", "소설", "만화", "잡지"]),
];

impl ShopCategory {
    pub fn classify(keyword: &str) -> ShopCategory {
        CATEGORY_TERMS
            .iter()
            .find(|(_, terms)| terms.iter().any(|term| keyword.contains(term)))
            .map(|(category, _)| *category)
            .unwrap_or(ShopCategory::Other)
    }
}
