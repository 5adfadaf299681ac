//! Demo data generation
//!
//! Demo mode answers a fetch without touching the network: a plausible mix of
//! phone and meeting records is synthesized for the requested date range,
//! shaped exactly like normalized upstream output so every consumer downstream
//! of the orchestrator is exercised unchanged.

use crate::models::{Owner, Recording, Site, SourceKind};
use crate::sources::FetchRange;
use rand::Rng;
use uuid::Uuid;

/// Hard cap on generated records, for absurdly wide ranges
const MAX_RECORDS: usize = 200;

const PEOPLE: &[&str] = &[
    "Ana Flores",
    "Ben Ortiz",
    "Carla Mendes",
    "Dana Whitfield",
    "Elio Marchetti",
    "Farah Nassar",
    "Gustav Lindqvist",
];

const TOPICS: &[&str] = &[
    "Weekly sync",
    "Design review",
    "Customer onboarding",
    "Incident retro",
    "Quarterly planning",
    "Support escalation",
];

const FILE_TYPES: &[&str] = &["MP4", "M4A", "TRANSCRIPT", "CHAT"];

fn pick<'a>(rng: &mut impl Rng, pool: &[&'a str]) -> &'a str {
    pool[rng.gen_range(0..pool.len())]
}

fn email_for(name: &str) -> String {
    let local: String = name
        .split_whitespace()
        .next()
        .unwrap_or("host")
        .to_lowercase();
    format!("{local}@demo.example")
}

fn phone_record(rng: &mut impl Rng, date_time: String) -> Recording {
    let caller = pick(rng, PEOPLE);
    let callee = pick(rng, PEOPLE);

    let mut rec = Recording::new(
        format!("call_{}", Uuid::new_v4().simple()),
        SourceKind::Phone,
        date_time,
    );
    rec.duration = rng.gen_range(30..1800);
    rec.caller_name = caller.to_string();
    rec.callee_name = callee.to_string();
    rec.owner = Owner::user(format!("u_{:04}", rng.gen_range(1..100)), callee);
    rec.site = Site {
        id: "s_main".to_string(),
        name: "Main Site".to_string(),
    };
    rec.download_url = Some(format!("https://demo.invalid/phone/{}.mp3", rec.id));
    rec
}

fn meeting_record(rng: &mut impl Rng, date_time: String) -> Recording {
    let host = pick(rng, PEOPLE);
    let email = email_for(host);
    let topic = pick(rng, TOPICS);
    let files_count = rng.gen_range(1..=3);

    let mut rec = Recording::new(Uuid::new_v4().to_string(), SourceKind::Meetings, date_time);
    rec.duration = rng.gen_range(10..120);
    rec.caller_name = topic.to_string();
    rec.callee_name = email.clone();
    rec.owner = Owner::user(format!("u_{:04}", rng.gen_range(1..100)), host);
    rec.topic = Some(topic.to_string());
    rec.host_email = Some(email);
    rec.file_size = Some(rng.gen_range(5_000_000..500_000_000));
    rec.files_count = Some(files_count);
    rec.files_types = Some(
        FILE_TYPES[..files_count.min(FILE_TYPES.len())]
            .iter()
            .map(|t| t.to_string())
            .collect(),
    );
    rec
}

/// Synthesize plausible records for every day in the range
pub fn generate(range: FetchRange) -> Vec<Recording> {
    let mut rng = rand::thread_rng();
    let mut recordings = Vec::new();

    let mut day = range.from;
    while day <= range.to && recordings.len() < MAX_RECORDS {
        for _ in 0..rng.gen_range(1..=4) {
            if recordings.len() >= MAX_RECORDS {
                break;
            }
            let hour = rng.gen_range(8..18);
            let minute = rng.gen_range(0..60);
            let start = day.and_hms_opt(hour, minute, 0).unwrap_or_default();
            let date_time = format!("{}Z", start.format("%Y-%m-%dT%H:%M:%S"));

            let rec = if rng.gen_bool(0.5) {
                phone_record(&mut rng, date_time)
            } else {
                meeting_record(&mut rng, date_time)
            };
            recordings.push(rec);
        }

        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    recordings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn records_stay_inside_the_range() {
        let range = FetchRange::new(date("2025-11-03"), date("2025-11-05"));
        for rec in generate(range) {
            let day = &rec.date_time[..10];
            assert!(day >= "2025-11-03" && day <= "2025-11-05", "{day}");
        }
    }

    #[test]
    fn tags_select_the_populated_fields() {
        let range = FetchRange::new(date("2025-11-01"), date("2025-11-14"));
        for rec in generate(range) {
            match rec.source {
                SourceKind::Phone => {
                    assert!(rec.download_url.is_some());
                    assert!(rec.topic.is_none());
                    assert!(rec.files_types.is_none());
                }
                SourceKind::Meetings => {
                    assert!(rec.download_url.is_none());
                    assert!(rec.topic.is_some());
                    assert!(rec.host_email.is_some());
                    assert!(rec.files_count.is_some());
                }
            }
        }
    }

    #[test]
    fn ids_are_unique() {
        let range = FetchRange::new(date("2025-11-01"), date("2025-11-30"));
        let recordings = generate(range);
        let mut ids: Vec<&str> = recordings.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), recordings.len());
    }

    #[test]
    fn wide_range_is_capped() {
        let range = FetchRange::new(date("2020-01-01"), date("2025-12-31"));
        assert!(generate(range).len() <= MAX_RECORDS);
    }

    #[test]
    fn inverted_range_yields_nothing() {
        let range = FetchRange::new(date("2025-11-10"), date("2025-11-01"));
        assert!(generate(range).is_empty());
    }
}
