//! Static public content served when the backend cannot answer an
//! anonymous read.
//!
//! Every call builds a fresh value, so a caller mutating one default never
//! affects the next.

use serde_json::{json, Value};

/// Platform pages with a built-in default.
pub const PLATFORM_PAGES: [&str; 5] = ["home", "about", "faq", "contact", "products"];

/// Default payload for a platform page.
///
/// Unknown slugs get an empty page with the same envelope.
pub fn default_page(slug: &str) -> Value {
    let content = match slug {
        "home" => json!({
            "hero": {
                "title": {"prefix": "Welcome to", "highlight": "Stencil"},
                "subtitle": "Multi-tenant storefronts for custom manufacturing"
            },
            "sections": []
        }),
        "about" => json!({
            "title": "About Stencil",
            "subtitle": "Professional Multi-Tenant CMS Platform",
            "content": "Stencil provides storefront and order management for modern businesses."
        }),
        "faq" => json!({
            "title": "Frequently Asked Questions",
            "subtitle": "Find answers to common questions",
            "faqs": [
                {"question": "What is Stencil?", "answer": "A multi-tenant CMS platform for modern businesses."},
                {"question": "How do I get started?", "answer": "Contact our team for a consultation."}
            ]
        }),
        "contact" => json!({
            "title": "Contact Us",
            "subtitle": "Get in Touch",
            "contactInfo": {"email": null, "phone": null, "address": null}
        }),
        "products" => json!({
            "title": "Products",
            "subtitle": "Browse the catalog",
            "products": []
        }),
        _ => json!({}),
    };

    json!({
        "id": format!("page-{slug}-default"),
        "pageSlug": slug,
        "content": content,
        "status": "published",
        "version": 1,
        "isDefault": true
    })
}

/// Empty first page of the public catalog.
pub fn default_catalog() -> Value {
    json!({
        "data": [],
        "meta": {"current_page": 1, "per_page": 0, "total": 0, "last_page": 1}
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_platform_page_has_content() {
        for slug in PLATFORM_PAGES {
            let page = default_page(slug);
            assert_eq!(page["pageSlug"], slug);
            assert!(page["content"].as_object().is_some_and(|c| !c.is_empty()), "{slug}");
        }
    }

    #[test]
    fn test_unknown_page_is_empty_but_shaped() {
        let page = default_page("pricing");
        assert_eq!(page["pageSlug"], "pricing");
        assert_eq!(page["content"], json!({}));
        assert_eq!(page["isDefault"], true);
    }

    #[test]
    fn test_defaults_are_fresh_per_call() {
        let mut first = default_page("about");
        first["content"]["title"] = json!("changed");
        assert_eq!(default_page("about")["content"]["title"], "About Stencil");
    }
}
