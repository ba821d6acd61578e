//! Listing card parser shared by every HTML-producing strategy.
//!
//! Search result pages render one `.job_seen_beacon` card per listing. Cards
//! missing a title, company or link are skipped one by one; the rest of the
//! page is still used.

use chrono::{DateTime, Utc};
use jobwatch_core::RawListing;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::params::SearchParams;
use crate::recency::{parse_posted_age, posted_at, random_posted_at};

const CARD: &str = ".job_seen_beacon";
const TITLE_ATTR: &str = "h2.jobTitle span[title]";
const TITLE: &str = "h2.jobTitle";
const LINK: &str = "h2.jobTitle a";
const COMPANY: &str = ".companyName, [data-testid='company-name']";
const LOCATION: &str = ".companyLocation, [data-testid='text-location']";
const SALARY: &str = ".salary-snippet, .salary-snippet-container";
const SNIPPET: &str = ".job-snippet";
const DATE: &str = ".date, [data-testid='myJobsStateDate']";

struct CardSelectors {
    card: Selector,
    title_attr: Selector,
    title: Selector,
    link: Selector,
    company: Selector,
    location: Selector,
    salary: Selector,
    snippet: Selector,
    date: Selector,
}

impl CardSelectors {
    fn new() -> Option<Self> {
        Some(Self {
            card: Selector::parse(CARD).ok()?,
            title_attr: Selector::parse(TITLE_ATTR).ok()?,
            title: Selector::parse(TITLE).ok()?,
            link: Selector::parse(LINK).ok()?,
            company: Selector::parse(COMPANY).ok()?,
            location: Selector::parse(LOCATION).ok()?,
            salary: Selector::parse(SALARY).ok()?,
            snippet: Selector::parse(SNIPPET).ok()?,
            date: Selector::parse(DATE).ok()?,
        })
    }
}

/// Parse at most `limit` listings from a search results page.
///
/// `page_url` resolves relative job links. Cards without a readable posting
/// age get a random date inside the request's recency window.
pub fn parse_listing_cards(
    html: &str,
    page_url: &Url,
    params: &SearchParams,
    limit: usize,
) -> Vec<RawListing> {
    let Some(sel) = CardSelectors::new() else {
        tracing::error!("Listing card selectors failed to compile");
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let now = Utc::now();
    let mut rng = rand::rng();
    let mut listings = Vec::new();

    for (index, card) in document.select(&sel.card).enumerate() {
        if listings.len() >= limit {
            break;
        }
        match parse_card(&card, &sel, page_url) {
            Some(parsed) => {
                let date_posted = parsed
                    .age
                    .and_then(|age| posted_at(now, age))
                    .unwrap_or_else(|| random_posted_at(now, params.window_days(), &mut rng));
                listings.push(parsed.into_listing(date_posted));
            }
            None => tracing::debug!(card = index, "Skipping unparseable listing card"),
        }
    }

    listings
}

struct ParsedCard {
    title: String,
    company: String,
    location: String,
    salary: Option<String>,
    description: Option<String>,
    url: String,
    age: Option<chrono::Duration>,
}

impl ParsedCard {
    fn into_listing(self, date_posted: DateTime<Utc>) -> RawListing {
        RawListing {
            title: self.title,
            company: self.company,
            location: self.location,
            salary: self.salary,
            description: self.description,
            url: self.url,
            date_posted,
        }
    }
}

fn parse_card(card: &ElementRef<'_>, sel: &CardSelectors, page_url: &Url) -> Option<ParsedCard> {
    let title = card
        .select(&sel.title_attr)
        .next()
        .and_then(|el| el.value().attr("title"))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| first_text(card, &sel.title))?;

    let company = first_text(card, &sel.company)?;

    let href = card
        .select(&sel.link)
        .next()
        .and_then(|el| el.value().attr("href"))?;
    let url = page_url.join(href).ok()?.to_string();

    Some(ParsedCard {
        title,
        company,
        location: first_text(card, &sel.location).unwrap_or_default(),
        salary: first_text(card, &sel.salary),
        description: first_text(card, &sel.snippet),
        url,
        age: first_text(card, &sel.date).and_then(|d| parse_posted_age(&d)),
    })
}

fn first_text(card: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}
