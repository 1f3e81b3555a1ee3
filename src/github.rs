//! Repository enumeration over the GitHub REST API.

use crate::constants::{API_PAGE_SIZE, API_TIMEOUT};
use crate::repo::RepositoryDescriptor;
use anyhow::Context;
use serde::Deserialize;

const API_BASE: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct ApiRepository {
    name: String,
}

/// Whose repositories to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing<'a> {
    /// Repositories owned by a user.
    User(&'a str),
    /// Every repository of an organization.
    Org(&'a str),
}

impl Listing<'_> {
    fn owner(&self) -> &str {
        match self {
            Listing::User(name) | Listing::Org(name) => name,
        }
    }

    fn url(&self) -> String {
        match self {
            Listing::User(user) => format!("{API_BASE}/users/{user}/repos"),
            Listing::Org(org) => format!("{API_BASE}/orgs/{org}/repos"),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Listing::User(_) => "owner",
            Listing::Org(_) => "all",
        }
    }
}

/// Lists every repository for `listing`, sorted by full name.
///
/// Sends `GITHUB_TOKEN` when it is set. Any HTTP or decoding failure is an
/// error; there is no partial result.
pub fn list_repositories(listing: &Listing<'_>) -> anyhow::Result<Vec<RepositoryDescriptor>> {
    let agent = ureq::AgentBuilder::new().timeout(API_TIMEOUT).build();
    let token = std::env::var("GITHUB_TOKEN").ok();
    let url = listing.url();
    let per_page = API_PAGE_SIZE.to_string();

    let repos = paginate(API_PAGE_SIZE, |page| {
        let mut request = agent
            .get(&url)
            .set("User-Agent", "git-haul")
            .set("Accept", "application/vnd.github+json")
            .query("per_page", &per_page)
            .query("page", &page.to_string())
            .query("type", listing.kind())
            .query("sort", "full_name");
        if let Some(token) = &token {
            request = request.set("Authorization", &format!("token {token}"));
        }
        let response = request
            .call()
            .with_context(|| format!("GitHub API request failed: {url} (page {page})"))?;
        response
            .into_json::<Vec<ApiRepository>>()
            .with_context(|| format!("Failed to decode GitHub API response from {url}"))
    })?;

    let owner = listing.owner();
    Ok(repos
        .into_iter()
        .map(|repo| RepositoryDescriptor::new(repo.name, owner))
        .collect())
}

/// Fetches 1-based pages until one comes back empty or short.
fn paginate<T, F>(page_size: usize, mut fetch: F) -> anyhow::Result<Vec<T>>
where
    F: FnMut(u32) -> anyhow::Result<Vec<T>>,
{
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let chunk = fetch(page)?;
        let len = chunk.len();
        all.extend(chunk);
        if len < page_size {
            return Ok(all);
        }
        page += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_stops_on_short_page() -> anyhow::Result<()> {
        let mut requested = Vec::new();
        let items = paginate(2, |page| {
            requested.push(page);
            Ok(match page {
                1 => vec!["a", "b"],
                2 => vec!["c", "d"],
                _ => vec!["e"],
            })
        })?;
        assert_eq!(items, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(requested, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_paginate_stops_on_empty_page() -> anyhow::Result<()> {
        let items = paginate(1, |page| Ok(if page < 3 { vec![page] } else { vec![] }))?;
        assert_eq!(items, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn test_paginate_propagates_errors() {
        let result: anyhow::Result<Vec<u32>> = paginate(1, |page| {
            if page == 2 {
                anyhow::bail!("rate limited")
            }
            Ok(vec![page])
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_listing_urls() {
        assert_eq!(
            Listing::User("alice").url(),
            "https://api.github.com/users/alice/repos"
        );
        assert_eq!(Listing::Org("acme").url(), "https://api.github.com/orgs/acme/repos");
        assert_eq!(Listing::User("alice").kind(), "owner");
        assert_eq!(Listing::Org("acme").kind(), "all");
        assert_eq!(Listing::Org("acme").owner(), "acme");
    }

    #[test]
    fn test_api_repository_ignores_extra_fields() -> anyhow::Result<()> {
        let json = r#"[{"name": "widget", "private": false, "owner": {"login": "acme"}}]"#;
        let repos: Vec<ApiRepository> = serde_json::from_str(json)?;
        assert_eq!(repos[0].name, "widget");
        Ok(())
    }
}
