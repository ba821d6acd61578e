//! jobwatch-cli: command-line client for the Jobwatch HTTP API
//!
//! # Subcommands
//! - `jobs [-q <text>] [--days <n>] [--remote-only <bool>] [--fulltime-only <bool>] [--json]`
//! - `terms [--json]`: default search terms
//! - `update [-t <term>]... [--days <n>] [--wait]`: trigger an ingestion run
//! - `status`: show server health

use clap::{ArgAction, Parser, Subcommand};
use serde::{Deserialize, Serialize};

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "jobwatch-cli", version, about = "Query and refresh a Jobwatch server")]
struct Cli {
    /// Jobwatch HTTP server URL (overrides JOBWATCH_HTTP_URL env var)
    #[arg(long, env = "JOBWATCH_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List stored jobs, newest first
    Jobs {
        /// Case-insensitive title filter
        #[arg(short, long)]
        query: Option<String>,

        /// Only jobs posted within this many days
        #[arg(long, default_value_t = 1)]
        days: u32,

        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        remote_only: bool,

        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        fulltime_only: bool,

        /// Accepted by the server, not applied (salaries are free text)
        #[arg(long, default_value_t = 200_000)]
        min_salary: u32,

        /// Print the raw JSON array
        #[arg(long)]
        json: bool,
    },

    /// Show the default search terms
    Terms {
        #[arg(long)]
        json: bool,
    },

    /// Trigger an ingestion run
    Update {
        /// Search term; repeat for several. Defaults to the server's terms.
        #[arg(short, long = "term")]
        terms: Vec<String>,

        #[arg(long)]
        days: Option<u32>,

        #[arg(long)]
        min_salary: Option<u32>,

        /// Wait for the run to finish and print what it added
        #[arg(long)]
        wait: bool,
    },

    /// Show Jobwatch server status
    Status,
}

// ============================================================================
// API Types
// ============================================================================

/// One job as returned by GET /api/jobs
#[derive(Debug, Deserialize, Serialize)]
pub struct JobSummary {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub url: String,
    pub date_posted: String,
    pub is_remote: bool,
    pub is_fulltime: bool,
}

/// Query string for GET /api/jobs.
pub fn jobs_query(
    query: Option<&str>,
    days: u32,
    remote_only: bool,
    fulltime_only: bool,
    min_salary: u32,
) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
        params.push(("query", q.to_string()));
    }
    params.push(("time_period", days.to_string()));
    params.push(("remote_only", remote_only.to_string()));
    params.push(("fulltime_only", fulltime_only.to_string()));
    params.push(("min_salary", min_salary.to_string()));
    params
}

/// Body for POST /api/update-jobs; unset fields are left to the server.
pub fn update_body(
    terms: &[String],
    days: Option<u32>,
    min_salary: Option<u32>,
    wait: bool,
) -> serde_json::Value {
    let mut body = serde_json::json!({ "wait": wait });
    if !terms.is_empty() {
        body["search_terms"] = serde_json::json!(terms);
    }
    if let Some(d) = days {
        body["days_ago"] = serde_json::json!(d);
    }
    if let Some(s) = min_salary {
        body["min_salary"] = serde_json::json!(s);
    }
    body
}

/// One-line human rendering of a job.
pub fn format_job_line(job: &JobSummary) -> String {
    let date: String = job.date_posted.chars().take(10).collect();
    let mut line = format!("{}  {} @ {} ({})", date, job.title, job.company, job.location);
    if let Some(salary) = job.salary.as_deref().filter(|s| !s.is_empty()) {
        line.push_str(&format!("  {}", salary));
    }
    line
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

fn send_or_exit(
    url: &str,
    resp: reqwest::Result<reqwest::blocking::Response>,
) -> reqwest::blocking::Response {
    let resp = match resp {
        Ok(r) => r,
        Err(e) => {
            eprintln!("jobwatch-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("jobwatch-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }
    resp
}

fn do_jobs(
    server: &str,
    query: Option<&str>,
    days: u32,
    remote_only: bool,
    fulltime_only: bool,
    min_salary: u32,
    json_output: bool,
) -> anyhow::Result<()> {
    let url = format!("{}/api/jobs", server);
    let params = jobs_query(query, days, remote_only, fulltime_only, min_salary);
    let resp = send_or_exit(&url, client(30)?.get(&url).query(&params).send());

    let jobs: Vec<JobSummary> = match resp.json() {
        Ok(j) => j,
        Err(e) => {
            eprintln!("jobwatch-cli: failed to parse jobs response: {}", e);
            std::process::exit(1);
        }
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    if jobs.is_empty() {
        eprintln!("No jobs found");
        return Ok(());
    }
    for job in &jobs {
        println!("{}", format_job_line(job));
        println!("    {}", job.url);
    }
    eprintln!("{} job(s)", jobs.len());
    Ok(())
}

fn do_terms(server: &str, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/api/search-terms", server);
    let resp = send_or_exit(&url, client(10)?.get(&url).send());
    let terms: Vec<String> = resp.json()?;

    if json_output {
        println!("{}", serde_json::to_string(&terms)?);
    } else {
        for term in terms {
            println!("{}", term);
        }
    }
    Ok(())
}

fn do_update(
    server: &str,
    terms: &[String],
    days: Option<u32>,
    min_salary: Option<u32>,
    wait: bool,
) -> anyhow::Result<()> {
    let url = format!("{}/api/update-jobs", server);
    // A waited run scrapes every term in sequence; give it room.
    let timeout = if wait { 900 } else { 30 };
    let body = update_body(terms, days, min_salary, wait);
    let resp = send_or_exit(&url, client(timeout)?.post(&url).json(&body).send());
    let body: serde_json::Value = resp.json()?;

    println!("{}", body["message"].as_str().unwrap_or("Ingestion requested"));
    if let Some(outcomes) = body["terms"].as_array() {
        for outcome in outcomes {
            println!(
                "  {:<16} source={:<9} fetched={} added={}{}",
                outcome["term"].as_str().unwrap_or("?"),
                outcome["source"].as_str().unwrap_or("none"),
                outcome["fetched"],
                outcome["added"],
                outcome["error"]
                    .as_str()
                    .map(|e| format!(" error={}", e))
                    .unwrap_or_default(),
            );
        }
    }
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client(10)?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Jobwatch server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
            println!("Store:           {}", body["store"].as_str().unwrap_or("?"));
            println!("Jobs stored:     {}", body["jobs"]);
            println!("Ingesting:       {}", body["ingestion_running"]);
            println!("Socket:          {}", body["socket"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            eprintln!("jobwatch-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("jobwatch-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Jobs {
            query,
            days,
            remote_only,
            fulltime_only,
            min_salary,
            json,
        } => do_jobs(
            &server,
            query.as_deref(),
            days,
            remote_only,
            fulltime_only,
            min_salary,
            json,
        ),
        Commands::Terms { json } => do_terms(&server, json),
        Commands::Update {
            terms,
            days,
            min_salary,
            wait,
        } => do_update(&server, &terms, days, min_salary, wait),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("jobwatch-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(salary: Option<&str>) -> JobSummary {
        JobSummary {
            id: "0123456789abcdef".to_string(),
            title: "DevOps Engineer".to_string(),
            company: "JetCode".to_string(),
            location: "Remote".to_string(),
            salary: salary.map(str::to_string),
            url: "https://www.indeed.com/viewjob?jk=0123456789abcdef".to_string(),
            date_posted: "2026-10-15T08:30:00Z".to_string(),
            is_remote: true,
            is_fulltime: true,
        }
    }

    // ========================================================================
    // TEST 1: jobs query maps flags onto the server's parameter names
    // ========================================================================
    #[test]
    fn test_jobs_query_parameters() {
        let params = jobs_query(Some(" devops "), 3, false, true, 200_000);
        assert_eq!(
            params,
            vec![
                ("query", "devops".to_string()),
                ("time_period", "3".to_string()),
                ("remote_only", "false".to_string()),
                ("fulltime_only", "true".to_string()),
                ("min_salary", "200000".to_string()),
            ]
        );
    }

    // ========================================================================
    // TEST 2: blank query is omitted
    // ========================================================================
    #[test]
    fn test_jobs_query_blank_omitted() {
        let params = jobs_query(Some("   "), 1, true, true, 1);
        assert!(params.iter().all(|(k, _)| *k != "query"));
        assert!(jobs_query(None, 1, true, true, 1).iter().all(|(k, _)| *k != "query"));
    }

    // ========================================================================
    // TEST 3: update body leaves unset fields to the server
    // ========================================================================
    #[test]
    fn test_update_body_minimal() {
        let body = update_body(&[], None, None, false);
        assert_eq!(body, serde_json::json!({ "wait": false }));
    }

    // ========================================================================
    // TEST 4: update body carries terms and overrides
    // ========================================================================
    #[test]
    fn test_update_body_full() {
        let body = update_body(&["CraftCMS".to_string()], Some(7), Some(150_000), true);
        assert_eq!(body["search_terms"], serde_json::json!(["CraftCMS"]));
        assert_eq!(body["days_ago"], 7);
        assert_eq!(body["min_salary"], 150_000);
        assert_eq!(body["wait"], true);
    }

    // ========================================================================
    // TEST 5: job line shows date, title, company, location, salary
    // ========================================================================
    #[test]
    fn test_format_job_line() {
        let line = format_job_line(&summary(Some("$200000-250000/year")));
        assert_eq!(
            line,
            "2026-10-15  DevOps Engineer @ JetCode (Remote)  $200000-250000/year"
        );
    }

    // ========================================================================
    // TEST 6: missing salary is left out
    // ========================================================================
    #[test]
    fn test_format_job_line_without_salary() {
        let line = format_job_line(&summary(None));
        assert!(line.ends_with("(Remote)"));
    }

    // ========================================================================
    // TEST 7: server job JSON deserializes (extra fields ignored)
    // ========================================================================
    #[test]
    fn test_job_summary_from_server_json() {
        let json = serde_json::json!({
            "id": "0123456789abcdef",
            "title": "Senior DevOps Engineer",
            "company": "OmniTech",
            "location": "Remote",
            "salary": null,
            "description": "Job description",
            "url": "https://www.indeed.com/viewjob?jk=0123456789abcdef",
            "date_posted": "2026-10-15T08:30:00Z",
            "date_found": "2026-10-15T09:00:00Z",
            "is_remote": true,
            "is_fulltime": true
        });
        let job: JobSummary = serde_json::from_value(json).unwrap();
        assert_eq!(job.company, "OmniTech");
        assert!(job.salary.is_none());
    }

    // ========================================================================
    // TEST 8: CLI definition is valid
    // ========================================================================
    #[test]
    fn test_cli_parses_update() {
        let cli = Cli::try_parse_from([
            "jobwatch-cli",
            "update",
            "-t",
            "DevOps",
            "--term",
            "CraftCMS",
            "--wait",
        ])
        .unwrap();
        match cli.command {
            Commands::Update { terms, wait, .. } => {
                assert_eq!(terms, vec!["DevOps", "CraftCMS"]);
                assert!(wait);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_jobs_flags() {
        let cli =
            Cli::try_parse_from(["jobwatch-cli", "jobs", "--remote-only", "false", "--days", "7"])
                .unwrap();
        match cli.command {
            Commands::Jobs {
                remote_only,
                fulltime_only,
                days,
                ..
            } => {
                assert!(!remote_only);
                assert!(fulltime_only);
                assert_eq!(days, 7);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
