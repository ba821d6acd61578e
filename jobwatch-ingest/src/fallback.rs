//! Synthetic Fallback Generator
//!
//! Produces plausible placeholder listings when every acquisition strategy
//! came back empty for a term. This is the documented degraded mode of the
//! system, not an error path: the listings say so in their description.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use jobwatch_core::RawListing;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::normalize::derive_job_id;
use crate::params::SearchParams;
use crate::recency::random_posted_at;

pub const PLACEHOLDER_COMPANIES: [&str; 26] = [
    "Acme Tech Solutions",
    "ByteWave Technologies",
    "CloudSphere Inc.",
    "DataFlow Systems",
    "Elevate Digital",
    "FutureStack",
    "GlobalTech Partners",
    "Horizon Software",
    "InnovateX",
    "JetCode",
    "Kinetic Software",
    "LuminaIT",
    "MetaVerse Technologies",
    "NexGen Solutions",
    "OmniTech",
    "Pulse Digital",
    "Quantum Code",
    "RapidDev",
    "SkyNet Solutions",
    "TechFusion",
    "UltraLogic",
    "VelocityByte",
    "WebSphere Inc.",
    "XeraTech",
    "YottaByte Systems",
    "ZenithCode",
];

pub const PLACEHOLDER_CITIES: [&str; 4] = ["New York, NY", "San Francisco, CA", "Austin, TX", "Remote"];

const VIEW_JOB_URL: &str = "https://www.indeed.com/viewjob?jk=";

fn default_title_templates() -> HashMap<String, Vec<String>> {
    let table: [(&str, &[&str]); 4] = [
        (
            "Web Developer",
            &[
                "Senior Web Developer",
                "Full Stack Web Developer",
                "Frontend Web Developer",
                "Backend Web Developer",
                "React Web Developer",
                "Angular Web Developer",
                "Vue.js Web Developer",
                "WordPress Web Developer",
                "PHP Web Developer",
                "JavaScript Web Developer",
                "Web Application Developer",
            ],
        ),
        (
            "Website Dev",
            &[
                "Website Developer",
                "Senior Website Developer",
                "Website Engineer",
                "Website Development Lead",
                "WordPress Website Developer",
                "E-commerce Website Developer",
                "Website Development Specialist",
                "Website Architect",
                "Website Development Manager",
            ],
        ),
        (
            "CraftCMS",
            &[
                "CraftCMS Developer",
                "Senior CraftCMS Developer",
                "CraftCMS Specialist",
                "CraftCMS Engineer",
                "CraftCMS Architect",
                "CraftCMS Frontend Developer",
                "CraftCMS Backend Developer",
                "CraftCMS Full Stack Developer",
                "CraftCMS Technical Lead",
            ],
        ),
        (
            "DevOps",
            &[
                "DevOps Engineer",
                "Senior DevOps Engineer",
                "DevOps Specialist",
                "DevOps Architect",
                "Cloud DevOps Engineer",
                "AWS DevOps Engineer",
                "Azure DevOps Engineer",
                "DevOps Team Lead",
                "Site Reliability Engineer",
                "Infrastructure Engineer",
                "DevOps Automation Engineer",
            ],
        ),
    ];

    table
        .iter()
        .map(|(term, titles)| {
            (
                term.to_string(),
                titles.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct FallbackGenerator {
    companies: Vec<String>,
    title_templates: HashMap<String, Vec<String>>,
    min_count: usize,
    max_count: usize,
}

impl Default for FallbackGenerator {
    fn default() -> Self {
        Self::new(
            PLACEHOLDER_COMPANIES.iter().map(|c| c.to_string()).collect(),
            default_title_templates(),
        )
    }
}

impl FallbackGenerator {
    pub fn new(companies: Vec<String>, title_templates: HashMap<String, Vec<String>>) -> Self {
        Self {
            companies,
            title_templates,
            min_count: 5,
            max_count: 10,
        }
    }

    /// Bound the number of listings per term; `max` is raised to `min` if lower.
    pub fn with_counts(mut self, min: usize, max: usize) -> Self {
        self.min_count = min.max(1);
        self.max_count = max.max(self.min_count);
        self
    }

    pub fn companies(&self) -> &[String] {
        &self.companies
    }

    /// Titles for `term`: the template table entry, or generic patterns.
    pub fn titles_for(&self, term: &str) -> Vec<String> {
        match self.title_templates.get(term) {
            Some(titles) if !titles.is_empty() => titles.clone(),
            _ => vec![
                format!("{} Specialist", term),
                format!("Senior {}", term),
                format!("{} Engineer", term),
            ],
        }
    }

    pub fn generate(&self, params: &SearchParams) -> Vec<RawListing> {
        let mut rng = rand::rng();
        self.generate_with_rng(params, Utc::now(), &mut rng)
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        params: &SearchParams,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<RawListing> {
        let titles = self.titles_for(&params.term);
        let count = rng.random_range(self.min_count..=self.max_count);
        let salary = format!(
            "${}-{}/year",
            params.min_salary,
            u64::from(params.min_salary) + 50_000
        );

        (0..count)
            .map(|index| {
                let title = titles
                    .choose(rng)
                    .cloned()
                    .unwrap_or_else(|| params.term.clone());
                let company = self
                    .companies
                    .choose(rng)
                    .cloned()
                    .unwrap_or_else(|| "Confidential".to_string());
                let location = if params.remote_only {
                    "Remote".to_string()
                } else {
                    PLACEHOLDER_CITIES
                        .choose(rng)
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "Remote".to_string())
                };

                let id = derive_job_id(&title, &company, &index.to_string());
                let description = format!(
                    "We are looking for a talented {} to join our team. This is a fallback job listing.",
                    title
                );

                RawListing {
                    url: format!("{}{}", VIEW_JOB_URL, id),
                    date_posted: random_posted_at(now, params.window_days(), rng),
                    salary: Some(salary.clone()),
                    description: Some(description),
                    title,
                    company,
                    location,
                }
            })
            .collect()
    }
}
