//! Route matching logic.
//!
//! # Responsibilities
//! - Resolve a request path to zero or one route
//! - Capture `{name}` segments of templated routes
//!
//! # Design Decisions
//! - Literal routes are looked up by string equality before any template is
//!   tried, so a literal always wins over a template on the same path
//! - Templates are tried in table order; first match wins
//! - Matching is exact: no prefix matching, no regex

use std::sync::Arc;

use crate::routing::pattern::PathParams;
use crate::routing::route::Route;
use crate::routing::table::RouteTable;

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub params: PathParams,
}

/// Resolve `path` (without query string) against `table`.
pub fn match_route(table: &RouteTable, path: &str) -> Option<RouteMatch> {
    if let Some(route) = table.literal(path) {
        return Some(RouteMatch {
            route: route.clone(),
            params: PathParams::default(),
        });
    }

    table.templates().find_map(|route| {
        route.pattern().captures(path).map(|params| RouteMatch {
            route: route.clone(),
            params,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteSpec;

    fn table(specs: &[(&str, &str)]) -> RouteTable {
        let specs: Vec<RouteSpec> = specs
            .iter()
            .map(|(id, path)| RouteSpec::new(*id, *path, "http://127.0.0.1:9000"))
            .collect();
        RouteTable::load(&specs).unwrap()
    }

    #[test]
    fn literal_beats_template_regardless_of_order() {
        let t = table(&[
            ("template", "/documents/{id}"),
            ("literal", "/documents/latest"),
        ]);

        let m = match_route(&t, "/documents/latest").unwrap();
        assert_eq!(m.route.id(), "literal");
        assert!(m.params.is_empty());

        let m = match_route(&t, "/documents/17").unwrap();
        assert_eq!(m.route.id(), "template");
        assert_eq!(m.params.get("id"), Some("17"));
    }

    #[test]
    fn literal_is_not_a_prefix_of_template() {
        let t = table(&[
            ("delete-template", "/delete-document/{document_id}"),
            ("delete-literal", "/delete-document"),
        ]);

        assert_eq!(
            match_route(&t, "/delete-document").unwrap().route.id(),
            "delete-literal"
        );
        assert_eq!(
            match_route(&t, "/delete-document/abc").unwrap().route.id(),
            "delete-template"
        );
    }

    #[test]
    fn first_registered_template_wins() {
        let t = table(&[
            ("first", "/items/{id}"),
            ("second", "/{kind}/{id}"),
        ]);

        for _ in 0..100 {
            assert_eq!(match_route(&t, "/items/9").unwrap().route.id(), "first");
        }
        assert_eq!(match_route(&t, "/things/9").unwrap().route.id(), "second");
    }

    #[test]
    fn unmapped_paths_do_not_match() {
        let t = table(&[("search", "/search"), ("delete", "/delete-document/{id}")]);
        assert!(match_route(&t, "/does-not-exist").is_none());
        assert!(match_route(&t, "/search/").is_none());
        assert!(match_route(&t, "/searchx").is_none());
        assert!(match_route(&t, "/delete-document/1/2").is_none());
    }

    #[test]
    fn every_sampled_path_matches_its_route() {
        let t = table(&[
            ("analyze-document", "/analyze-document"),
            ("search", "/search"),
            ("get-labels", "/get-labels"),
            ("delete-document", "/delete-document/{document_id}"),
            ("user-doc", "/users/{user}/documents/{doc}"),
        ]);

        let samples = [
            ("/analyze-document", "analyze-document"),
            ("/search", "search"),
            ("/get-labels", "get-labels"),
            ("/delete-document/1", "delete-document"),
            ("/delete-document/a-b_c", "delete-document"),
            ("/users/u1/documents/d1", "user-doc"),
        ];
        for (path, id) in samples {
            assert_eq!(match_route(&t, path).unwrap().route.id(), id, "path {}", path);
        }
    }
}
