use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::enrich::EnrichmentReport;
use crate::model::JobPosting;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS job_postings (
            id               INTEGER PRIMARY KEY,
            url              TEXT UNIQUE NOT NULL,
            source           TEXT NOT NULL CHECK(source IN ('jsearch','pracuj')),
            title            TEXT,
            company          TEXT,
            location         TEXT,
            description      TEXT,
            level            TEXT,
            schedule         TEXT,
            mode             TEXT,
            contract         TEXT,
            responsibilities TEXT,
            requirements     TEXT,
            benefits         TEXT,
            sal_min          INTEGER,
            sal_max          INTEGER,
            added_date       TEXT NOT NULL,
            CHECK ((sal_min IS NULL) = (sal_max IS NULL)),
            CHECK (sal_min IS NULL OR sal_min <= sal_max)
        );
        CREATE INDEX IF NOT EXISTS idx_postings_source ON job_postings(source);
        CREATE INDEX IF NOT EXISTS idx_postings_added ON job_postings(added_date);

        CREATE TABLE IF NOT EXISTS etl_runs (
            id                  INTEGER PRIMARY KEY,
            started_at          TEXT NOT NULL,
            finished_at         TEXT NOT NULL DEFAULT (datetime('now')),
            scraped             INTEGER NOT NULL,
            cleaned             INTEGER NOT NULL,
            inserted            INTEGER NOT NULL,
            classifier_calls    INTEGER NOT NULL,
            enrichment_failures INTEGER NOT NULL
        );
        ",
    )?;
    Ok(())
}

// ── Upsert ──

pub fn existing_urls(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT url FROM job_postings")?;
    let urls = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(urls)
}

/// Append postings; a URL that is already stored is left as it is.
pub fn insert_new(conn: &Connection, postings: &[JobPosting]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO job_postings
             (url, source, title, company, location, description, level, schedule, mode,
              contract, responsibilities, requirements, benefits, sal_min, sal_max, added_date)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)",
        )?;
        for p in postings {
            count += stmt.execute(params![
                p.url,
                p.source.as_str(),
                p.title,
                p.company,
                p.location,
                p.description,
                list_to_sql(&p.level)?,
                list_to_sql(&p.schedule)?,
                list_to_sql(&p.mode)?,
                list_to_sql(&p.contract)?,
                list_to_sql(&p.responsibilities)?,
                list_to_sql(&p.requirements)?,
                list_to_sql(&p.benefits)?,
                p.salary.map(|s| s.min()),
                p.salary.map(|s| s.max()),
                p.added_date().format("%Y-%m-%d").to_string(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

fn list_to_sql(items: &Option<Vec<String>>) -> Result<Option<String>> {
    items
        .as_ref()
        .map(|v| serde_json::to_string(v).context("Failed to encode list column"))
        .transpose()
}

fn list_from_sql(raw: Option<String>) -> Vec<String> {
    raw.and_then(|r| serde_json::from_str(&r).ok())
        .unwrap_or_default()
}

// ── Runs ──

pub struct RunRecord {
    pub started_at: String,
    pub scraped: usize,
    pub cleaned: usize,
    pub inserted: usize,
}

pub fn record_run(conn: &Connection, run: &RunRecord, enrichment: &EnrichmentReport) -> Result<()> {
    conn.execute(
        "INSERT INTO etl_runs
         (started_at, scraped, cleaned, inserted, classifier_calls, enrichment_failures)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            run.started_at,
            run.scraped as i64,
            run.cleaned as i64,
            run.inserted as i64,
            enrichment.calls as i64,
            enrichment.failures.len() as i64,
        ],
    )?;
    Ok(())
}

// ── Stats ──

pub struct Stats {
    pub total: i64,
    pub by_source: Vec<(String, i64)>,
    pub with_salary: i64,
    pub with_requirements: i64,
    pub with_benefits: i64,
    pub last_run: Option<LastRun>,
}

pub struct LastRun {
    pub finished_at: String,
    pub scraped: i64,
    pub inserted: i64,
    pub classifier_calls: i64,
    pub enrichment_failures: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };

    let total = count("SELECT COUNT(*) FROM job_postings")?;
    let with_salary = count("SELECT COUNT(*) FROM job_postings WHERE sal_min IS NOT NULL")?;
    let with_requirements =
        count("SELECT COUNT(*) FROM job_postings WHERE requirements IS NOT NULL")?;
    let with_benefits = count("SELECT COUNT(*) FROM job_postings WHERE benefits IS NOT NULL")?;

    let mut stmt =
        conn.prepare("SELECT source, COUNT(*) FROM job_postings GROUP BY source ORDER BY source")?;
    let by_source = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT finished_at, scraped, inserted, classifier_calls, enrichment_failures
         FROM etl_runs ORDER BY id DESC LIMIT 1",
    )?;
    let last_run = stmt
        .query_map([], |row| {
            Ok(LastRun {
                finished_at: row.get(0)?,
                scraped: row.get(1)?,
                inserted: row.get(2)?,
                classifier_calls: row.get(3)?,
                enrichment_failures: row.get(4)?,
            })
        })?
        .next()
        .transpose()?;

    Ok(Stats {
        total,
        by_source,
        with_salary,
        with_requirements,
        with_benefits,
        last_run,
    })
}

// ── Listing ──

pub struct PostingRow {
    pub title: String,
    pub company: String,
    pub source: String,
    pub level: Vec<String>,
    pub mode: Vec<String>,
    pub sal_min: Option<i64>,
    pub sal_max: Option<i64>,
    pub added_date: String,
}

pub fn fetch_recent(conn: &Connection, source: Option<&str>, limit: usize) -> Result<Vec<PostingRow>> {
    let mut stmt = conn.prepare(
        "SELECT COALESCE(title, ''), COALESCE(company, ''), source, level, mode,
                sal_min, sal_max, added_date
         FROM job_postings
         WHERE (?1 IS NULL OR source = ?1)
         ORDER BY added_date DESC, id DESC
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![source, limit as i64], |row| {
            Ok(PostingRow {
                title: row.get(0)?,
                company: row.get(1)?,
                source: row.get(2)?,
                level: list_from_sql(row.get(3)?),
                mode: list_from_sql(row.get(4)?),
                sal_min: row.get(5)?,
                sal_max: row.get(6)?,
                added_date: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PostingDraft, Salary, Source};

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn posting(url: &str, source: Source) -> JobPosting {
        JobPosting::from_draft(
            url,
            source,
            PostingDraft {
                title: Some("Data Engineer".into()),
                company: Some("Acme".into()),
                level: vec!["senior".into()],
                mode: vec!["remote".into(), "hybrid".into()],
                salary: Some(Salary::new(18000, 24000)),
                ..Default::default()
            },
        )
    }

    #[test]
    fn insert_only_adds_unknown_urls() {
        let conn = memory();
        let first = insert_new(&conn, &[posting("https://a/1", Source::Pracuj)]).unwrap();
        assert_eq!(first, 1);
        let second = insert_new(
            &conn,
            &[posting("https://a/1", Source::Pracuj), posting("https://a/2", Source::Jsearch)],
        )
        .unwrap();
        assert_eq!(second, 1);
        let urls = existing_urls(&conn).unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls.contains("https://a/2"));
    }

    #[test]
    fn lists_stored_as_json_and_absent_as_null() {
        let conn = memory();
        insert_new(&conn, &[posting("https://a/1", Source::Pracuj)]).unwrap();
        let (mode, benefits): (Option<String>, Option<String>) = conn
            .query_row("SELECT mode, benefits FROM job_postings", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(mode.as_deref(), Some(r#"["remote","hybrid"]"#));
        assert!(benefits.is_none());

        let rows = fetch_recent(&conn, None, 10).unwrap();
        assert_eq!(rows[0].mode, vec!["remote", "hybrid"]);
        assert_eq!((rows[0].sal_min, rows[0].sal_max), (Some(18000), Some(24000)));
    }

    #[test]
    fn stats_and_runs() {
        let conn = memory();
        insert_new(
            &conn,
            &[posting("https://a/1", Source::Pracuj), posting("https://a/2", Source::Jsearch)],
        )
        .unwrap();
        let run = RunRecord {
            started_at: "2025-02-16 10:00:00".into(),
            scraped: 5,
            cleaned: 4,
            inserted: 2,
        };
        record_run(&conn, &run, &EnrichmentReport::default()).unwrap();

        let s = get_stats(&conn).unwrap();
        assert_eq!(s.total, 2);
        assert_eq!(s.with_salary, 2);
        assert_eq!(s.with_requirements, 0);
        assert_eq!(
            s.by_source,
            vec![("jsearch".to_string(), 1), ("pracuj".to_string(), 1)]
        );
        let last = s.last_run.unwrap();
        assert_eq!((last.scraped, last.inserted), (5, 2));

        let only_pracuj = fetch_recent(&conn, Some("pracuj"), 10).unwrap();
        assert_eq!(only_pracuj.len(), 1);
    }
}
