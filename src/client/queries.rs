// src/client/queries.rs

//! Pure builders for the two query shapes the crawler needs: paginated
//! search-with-filters, and the per-repository README probe.

/// Traversal orders used to diversify which repositories are surfaced
/// within pagination limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Stars,
    Forks,
    Updated,
    BestMatch,
}

impl SortMode {
    /// Fixed traversal order for every topic.
    pub const ALL: [SortMode; 4] = [
        SortMode::Stars,
        SortMode::Forks,
        SortMode::Updated,
        SortMode::BestMatch,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Stars => "stars",
            SortMode::Forks => "forks",
            SortMode::Updated => "updated",
            SortMode::BestMatch => "best-match",
        }
    }

    /// Minimum-popularity filter paired with this sort.
    fn popularity_filter(&self) -> Option<&'static str> {
        match self {
            SortMode::Stars => Some("stars:>10"),
            SortMode::Forks => Some("forks:>5"),
            SortMode::Updated => Some("pushed:>2020-01-01"),
            SortMode::BestMatch => None,
        }
    }

    /// Sort directive; best-match relies on the API default order.
    fn directive(&self) -> Option<&'static str> {
        match self {
            SortMode::Stars => Some("sort:stars-desc"),
            SortMode::Forks => Some("sort:forks-desc"),
            SortMode::Updated => Some("sort:updated-desc"),
            SortMode::BestMatch => None,
        }
    }
}

/// Compose the search filter expression for one (topic, sort) pair.
pub fn build_search_query(topic: &str, sort: SortMode) -> String {
    // `language:English` mirrors the upstream query construction; README
    // language is checked separately by the heuristic filter.
    let mut parts = vec![
        format!("topic:{topic}"),
        "language:English".to_string(),
        "in:readme".to_string(),
    ];

    if let Some(filter) = sort.popularity_filter() {
        parts.push(filter.to_string());
    }
    if let Some(directive) = sort.directive() {
        parts.push(directive.to_string());
    }

    parts.join(" ")
}

/// GraphQL document for one page of search results, with the fixed field
/// projection and an embedded quota probe.
pub fn search_request(search_query: &str, batch_size: u32, after_cursor: Option<&str>) -> String {
    let after = after_cursor
        .map(|cursor| format!(", after: \"{cursor}\""))
        .unwrap_or_default();

    format!(
        r#"
query {{
    rateLimit {{
        remaining
        resetAt
    }}
    search(
        query: "{search_query}"
        type: REPOSITORY
        first: {batch_size}
        {after}
    ) {{
        repositoryCount
        pageInfo {{
            hasNextPage
            endCursor
        }}
        nodes {{
            ... on Repository {{
                id
                name
                nameWithOwner
                description
                primaryLanguage {{
                    name
                }}
                repositoryTopics(first: 20) {{
                    nodes {{
                        topic {{
                            name
                        }}
                    }}
                }}
                stargazerCount
                forkCount
                createdAt
                updatedAt
                url
            }}
        }}
    }}
}}
"#
    )
}

/// GraphQL document probing the four README filename variants in one
/// round trip. First non-empty result wins, in field order.
pub fn readme_request(owner: &str, name: &str) -> String {
    format!(
        r#"
query {{
    repository(owner: "{owner}", name: "{name}") {{
        readme: object(expression: "HEAD:README.md") {{
            ... on Blob {{
                text
            }}
        }}
        readmeLower: object(expression: "HEAD:readme.md") {{
            ... on Blob {{
                text
            }}
        }}
        readmeUpper: object(expression: "HEAD:README.MD") {{
            ... on Blob {{
                text
            }}
        }}
        readmeRst: object(expression: "HEAD:README.rst") {{
            ... on Blob {{
                text
            }}
        }}
    }}
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stars_query_filters_and_sorts() {
        let query = build_search_query("rust", SortMode::Stars);
        assert_eq!(
            query,
            "topic:rust language:English in:readme stars:>10 sort:stars-desc"
        );
    }

    #[test]
    fn forks_query_filters_and_sorts() {
        let query = build_search_query("rust", SortMode::Forks);
        assert_eq!(
            query,
            "topic:rust language:English in:readme forks:>5 sort:forks-desc"
        );
    }

    #[test]
    fn updated_query_filters_by_push_date() {
        let query = build_search_query("rust", SortMode::Updated);
        assert_eq!(
            query,
            "topic:rust language:English in:readme pushed:>2020-01-01 sort:updated-desc"
        );
    }

    #[test]
    fn best_match_query_has_no_extra_filter_or_directive() {
        let query = build_search_query("rust", SortMode::BestMatch);
        assert_eq!(query, "topic:rust language:English in:readme");
    }

    #[test]
    fn search_request_embeds_batch_size_and_cursor() {
        let request = search_request("topic:rust", 15, Some("abc"));
        assert!(request.contains("first: 15"));
        assert!(request.contains(r#"after: "abc""#));
        assert!(request.contains("rateLimit"));
        assert!(request.contains("hasNextPage"));

        let first_page = search_request("topic:rust", 15, None);
        assert!(!first_page.contains("after:"));
    }

    #[test]
    fn readme_request_probes_all_four_variants() {
        let request = readme_request("acme", "demo");
        assert!(request.contains(r#"repository(owner: "acme", name: "demo")"#));
        for expression in [
            "HEAD:README.md",
            "HEAD:readme.md",
            "HEAD:README.MD",
            "HEAD:README.rst",
        ] {
            assert!(request.contains(expression));
        }
    }
}
