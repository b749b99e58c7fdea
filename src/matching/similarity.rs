// src/matching/similarity.rs - Field, slug and weighted similarity scoring
use once_cell::sync::Lazy;
use regex::Regex;

use crate::matching::weights::NormalizedWeights;
use crate::models::records::{Candidate, FieldScores, Record};

const SAME_CATEGORY_SCORE: f64 = 0.9;
const INCOMPATIBLE_CATEGORY_SCORE: f64 = 0.1;
const CONTAINED_SLUG_SCORE: f64 = 0.8;

static SLUG_DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\-_]").unwrap());
static REPEATED_HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

/// Coarse product family inferred from slug tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductCategory {
    Roupa(Garment),
    Calcado,
    Acessorio,
}

/// Which part of the body an apparel item covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Garment {
    Upper,
    Lower,
}

impl ProductCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::Roupa(_) => "roupa",
            ProductCategory::Calcado => "calcado",
            ProductCategory::Acessorio => "acessorio",
        }
    }
}

use ProductCategory::{Acessorio, Calcado, Roupa};

const PRODUCT_LEXICON: [(&str, ProductCategory); 38] = [
    // Roupas
    ("blusa", Roupa(Garment::Upper)),
    ("camiseta", Roupa(Garment::Upper)),
    ("camisa", Roupa(Garment::Upper)),
    ("vestido", Roupa(Garment::Upper)),
    ("jaqueta", Roupa(Garment::Upper)),
    ("casaco", Roupa(Garment::Upper)),
    ("moletom", Roupa(Garment::Upper)),
    ("sueter", Roupa(Garment::Upper)),
    ("cardigan", Roupa(Garment::Upper)),
    ("bermuda", Roupa(Garment::Lower)),
    ("calca", Roupa(Garment::Lower)),
    ("calça", Roupa(Garment::Lower)),
    ("short", Roupa(Garment::Lower)),
    ("saia", Roupa(Garment::Lower)),
    // Calçados
    ("sapato", Calcado),
    ("tenis", Calcado),
    ("tênis", Calcado),
    ("sandalias", Calcado),
    ("sandálias", Calcado),
    ("chinelo", Calcado),
    ("bota", Calcado),
    ("salto", Calcado),
    ("sneaker", Calcado),
    // Acessórios
    ("oculos", Acessorio),
    ("óculos", Acessorio),
    ("mochila", Acessorio),
    ("bolsa", Acessorio),
    ("carteira", Acessorio),
    ("cinto", Acessorio),
    ("relogio", Acessorio),
    ("relógio", Acessorio),
    ("chapeu", Acessorio),
    ("chapéu", Acessorio),
    ("boné", Acessorio),
    ("bonet", Acessorio),
    ("luvas", Acessorio),
    ("cachecol", Acessorio),
    ("cachecól", Acessorio),
];

const INCOMPATIBLE_CATEGORIES: [(ProductCategory, ProductCategory); 6] = [
    (Roupa(Garment::Upper), Roupa(Garment::Lower)),
    (Roupa(Garment::Upper), Calcado),
    (Roupa(Garment::Lower), Calcado),
    (Roupa(Garment::Upper), Acessorio),
    (Roupa(Garment::Lower), Acessorio),
    (Calcado, Acessorio),
];

/// Classic edit distance (unit insert/delete/substitute cost) over chars.
///
/// Fills the full `(|b|+1) x (|a|+1)` matrix; rows follow `b`, columns `a`.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (cols, rows) = (a_chars.len(), b_chars.len());
    if cols == 0 {
        return rows;
    }
    if rows == 0 {
        return cols;
    }

    let mut matrix = vec![vec![0usize; cols + 1]; rows + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=rows {
        for j in 1..=cols {
            matrix[i][j] = if b_chars[i - 1] == a_chars[j - 1] {
                matrix[i - 1][j - 1]
            } else {
                (matrix[i - 1][j - 1] + 1)
                    .min(matrix[i][j - 1] + 1)
                    .min(matrix[i - 1][j] + 1)
            };
        }
    }
    matrix[rows][cols]
}

/// Case-insensitive edit-distance similarity in [0, 1].
pub fn field_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let distance = levenshtein_distance(&a.to_lowercase(), &b.to_lowercase());
    let max_len = a.chars().count().max(b.chars().count());
    (1.0 - distance as f64 / max_len as f64).max(0.0)
}

/// Lowercases, keeps only `[a-z0-9-_]`, collapses and trims hyphens.
pub fn clean_slug(slug: &str) -> String {
    let lowered = slug.to_lowercase();
    let stripped = SLUG_DISALLOWED_CHARS.replace_all(&lowered, "");
    let collapsed = REPEATED_HYPHENS.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// First hyphen-separated token found in the lexicon decides the category.
pub fn extract_product_category(slug: &str) -> Option<ProductCategory> {
    slug.split('-').find_map(|token| {
        let token = token.to_lowercase();
        PRODUCT_LEXICON
            .iter()
            .find(|(word, _)| *word == token)
            .map(|(_, category)| *category)
    })
}

pub fn are_incompatible_categories(a: ProductCategory, b: ProductCategory) -> bool {
    INCOMPATIBLE_CATEGORIES
        .iter()
        .any(|&(x, y)| (a == x && b == y) || (a == y && b == x))
}

/// Layered slug heuristic; the first rule that applies decides the score.
pub fn slug_similarity(slug_a: &str, slug_b: &str) -> f64 {
    if slug_a.is_empty() || slug_b.is_empty() {
        return 0.0;
    }
    if slug_a == slug_b {
        return 1.0;
    }

    let clean_a = clean_slug(slug_a);
    let clean_b = clean_slug(slug_b);
    if clean_a == clean_b {
        return 1.0;
    }

    let category_a = extract_product_category(&clean_a);
    let category_b = extract_product_category(&clean_b);
    if let (Some(a), Some(b)) = (category_a, category_b) {
        if a == b {
            return SAME_CATEGORY_SCORE;
        }
        if are_incompatible_categories(a, b) {
            return INCOMPATIBLE_CATEGORY_SCORE;
        }
    }

    if clean_a.contains(&clean_b) || clean_b.contains(&clean_a) {
        return CONTAINED_SLUG_SCORE;
    }

    field_similarity(&clean_a, &clean_b)
}

/// Scores one RASTREIO record against one DE record.
pub fn weighted_score(de: &Record, rast: &Record, weights: &NormalizedWeights) -> Candidate {
    let details = FieldScores {
        slug_score: slug_similarity(&de.slug, &rast.slug),
        title_score: field_similarity(&de.meta_title, &rast.meta_title),
        desc_score: field_similarity(&de.meta_description, &rast.meta_description),
        h1_score: field_similarity(&de.h1, &rast.h1),
    };
    let score = details.slug_score * weights.slug
        + details.title_score * weights.title
        + details.desc_score * weights.description
        + details.h1_score * weights.h1;
    Candidate::new(rast.clone(), score.clamp(0.0, 1.0), details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::weights::WeightVector;

    #[test]
    fn test_levenshtein_matches_reference() {
        let pairs = [
            ("", ""),
            ("", "abc"),
            ("kitten", "sitting"),
            ("flaw", "lawn"),
            ("blusa azul", "camiseta azul"),
            ("calça", "calca"),
            ("tênis-branco", "tenis-branco"),
        ];
        for (a, b) in pairs {
            assert_eq!(levenshtein_distance(a, b), strsim::levenshtein(a, b), "{} vs {}", a, b);
            assert_eq!(levenshtein_distance(a, b), levenshtein_distance(b, a));
        }
    }

    #[test]
    fn test_field_similarity_bounds() {
        assert_eq!(field_similarity("", "abc"), 0.0);
        assert_eq!(field_similarity("abc", ""), 0.0);
        assert_eq!(field_similarity("Blusa", "Blusa"), 1.0);
        assert_eq!(field_similarity("BLUSA", "blusa"), 1.0);
        let s = field_similarity("kitten", "sitting");
        assert!((s - (1.0 - 3.0 / 7.0)).abs() < 1e-12);
        for (a, b) in [("a", "zzzzzzzz"), ("İİİ", "i"), ("x", "y")] {
            let s = field_similarity(a, b);
            assert!((0.0..=1.0).contains(&s), "{} vs {} = {}", a, b, s);
        }
    }

    #[test]
    fn test_clean_slug() {
        assert_eq!(clean_slug("Blusa--Azul!!"), "blusa-azul");
        assert_eq!(clean_slug("-tenis_corrida-"), "tenis_corrida");
        assert_eq!(clean_slug("calça-jeans"), "cala-jeans");
        assert_eq!(clean_slug("---"), "");
    }

    #[test]
    fn test_category_extraction() {
        assert_eq!(extract_product_category("camiseta-preta"), Some(Roupa(Garment::Upper)));
        assert_eq!(extract_product_category("bermuda-jeans"), Some(Roupa(Garment::Lower)));
        assert_eq!(extract_product_category("kit-tenis-meia"), Some(Calcado));
        assert_eq!(extract_product_category("oculos-sol-bolsa"), Some(Acessorio));
        assert_eq!(extract_product_category("perfume-floral"), None);
        assert_eq!(Roupa(Garment::Lower).label(), "roupa");
        assert!(are_incompatible_categories(Acessorio, Roupa(Garment::Upper)));
        assert!(!are_incompatible_categories(Calcado, Calcado));
    }

    #[test]
    fn test_slug_similarity_rules() {
        assert_eq!(slug_similarity("", "blusa"), 0.0);
        assert_eq!(slug_similarity("blusa-azul", "blusa-azul"), 1.0);
        assert_eq!(slug_similarity("Blusa-Azul", "blusa--azul"), 1.0);
        assert_eq!(slug_similarity("camiseta-preta", "blusa-branca"), 0.9);
        assert!(slug_similarity("blusa-azul", "bermuda-jeans") <= 0.1);
        assert_eq!(slug_similarity("tenis-corrida", "bolsa-couro"), 0.1);
        assert_eq!(slug_similarity("blusa-azul", "sapato-social"), 0.1);
        // no category signal: substring rule, then edit distance
        assert_eq!(slug_similarity("perfume", "perfume-floral"), 0.8);
        let s = slug_similarity("perfume-floral", "colonia-amadeirada");
        assert!(s < 0.8 && s >= 0.0);
    }

    #[test]
    fn test_upper_and_lower_apparel_never_match() {
        let upper = ["blusa-azul", "camiseta-preta", "vestido-longo", "jaqueta-couro"];
        let lower = ["bermuda-jeans", "calca-jeans", "saia-longa", "short-praia"];
        for a in upper {
            for b in lower {
                assert_eq!(slug_similarity(a, b), 0.1, "{} vs {}", a, b);
                assert_eq!(slug_similarity(b, a), 0.1, "{} vs {}", b, a);
            }
        }
        // same side of the body is still a category match
        assert_eq!(slug_similarity("vestido-longo", "casaco-la"), 0.9);
        assert_eq!(slug_similarity("calca-jeans", "bermuda-sarja"), 0.9);
    }

    #[test]
    fn test_category_on_one_side_only_is_no_signal() {
        // "perfume" has no category, so the substring rule applies
        assert_eq!(slug_similarity("blusa-perfume", "perfume"), 0.8);
    }

    #[test]
    fn test_weighted_score_combines_fields() {
        let weights = WeightVector::new(0.4, 0.25, 0.2, 0.15).normalized().unwrap();
        let de = Record {
            url: "/a".into(),
            slug: "blusa-azul".into(),
            meta_title: "Blusa Azul".into(),
            meta_description: "".into(),
            h1: "Blusa".into(),
        };
        let same = weighted_score(&de, &de, &weights);
        // description is empty on both sides, so it contributes 0
        assert!((same.score - 0.8).abs() < 1e-9);
        assert_eq!(same.details.desc_score, 0.0);
        assert_eq!(same.details.slug_score, 1.0);

        let expected = same.details.slug_score * weights.slug
            + same.details.title_score * weights.title
            + same.details.h1_score * weights.h1;
        assert!((same.score - expected).abs() < 1e-12);
        assert!(same.gemini_score.is_none());
    }
}
