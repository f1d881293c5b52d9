//! Parse worker pool.
//!
//! Workers parse one file each in isolation (their own source bytes,
//! their own parsers) and hand results to a single joiner, which merges
//! them deterministically in file-path order. Workers never touch the
//! symbol registry.

use crossbeam_channel::bounded;
use std::collections::HashMap;
use std::path::PathBuf;
use std::thread;

use crate::definitions::compute_structure_signature;
use crate::parsing::{Language, new_parser};

/// A parse job: source bytes were read by the coordinator.
pub struct ParseJob {
    pub path: PathBuf,
    pub relative: PathBuf,
    pub language: Language,
    pub source: String,
    pub content_hash: String,
}

/// A successfully parsed file, ready for ingestion by the joiner.
pub struct ParsedFile {
    pub path: PathBuf,
    pub relative: PathBuf,
    pub language: Language,
    pub source: String,
    pub content_hash: String,
    pub tree: tree_sitter::Tree,
    pub structure_signature: String,
}

pub enum ParseOutcome {
    Parsed(Box<ParsedFile>),
    Failed { path: PathBuf, reason: String },
}

/// Parse all jobs across `worker_count` threads and return the results
/// sorted by file path.
pub fn parse_batch(jobs: Vec<ParseJob>, worker_count: usize) -> Vec<ParseOutcome> {
    if jobs.is_empty() {
        return Vec::new();
    }
    let worker_count = worker_count.clamp(1, jobs.len());

    let (job_tx, job_rx) = bounded::<ParseJob>(worker_count * 2);
    let (result_tx, result_rx) = bounded::<ParseOutcome>(worker_count * 2);

    let handles: Vec<_> = (0..worker_count)
        .map(|_| {
            let rx = job_rx.clone();
            let tx = result_tx.clone();
            thread::spawn(move || {
                // Thread-local parsers, created per language on demand.
                let mut parsers: HashMap<Language, tree_sitter::Parser> = HashMap::new();
                for job in rx {
                    let outcome = parse_one(job, &mut parsers);
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(job_rx);
    drop(result_tx);

    let feeder = thread::spawn(move || {
        for job in jobs {
            if job_tx.send(job).is_err() {
                break;
            }
        }
    });

    let mut outcomes: Vec<ParseOutcome> = result_rx.iter().collect();
    let _ = feeder.join();
    for handle in handles {
        let _ = handle.join();
    }

    outcomes.sort_by(|a, b| outcome_path(a).cmp(outcome_path(b)));
    outcomes
}

fn outcome_path(outcome: &ParseOutcome) -> &PathBuf {
    match outcome {
        ParseOutcome::Parsed(parsed) => &parsed.path,
        ParseOutcome::Failed { path, .. } => path,
    }
}

fn parse_one(job: ParseJob, parsers: &mut HashMap<Language, tree_sitter::Parser>) -> ParseOutcome {
    // TSX needs its own grammar; keyed per language is enough for the
    // rest, so reconfigure only when the variant differs.
    let parser = match parsers.entry(job.language) {
        std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
        std::collections::hash_map::Entry::Vacant(entry) => {
            match new_parser(job.language, Some(&job.path)) {
                Ok(parser) => entry.insert(parser),
                Err(e) => {
                    return ParseOutcome::Failed {
                        path: job.path,
                        reason: e.to_string(),
                    };
                }
            }
        }
    };
    if job.language == Language::TypeScript {
        if let Ok(fresh) = new_parser(job.language, Some(&job.path)) {
            *parser = fresh;
        }
    }

    match parser.parse(&job.source, None) {
        Some(tree) => {
            let signature =
                compute_structure_signature(tree.root_node(), &job.source, job.language);
            ParseOutcome::Parsed(Box::new(ParsedFile {
                path: job.path,
                relative: job.relative,
                language: job.language,
                source: job.source,
                content_hash: job.content_hash,
                tree,
                structure_signature: signature,
            }))
        }
        None => ParseOutcome::Failed {
            path: job.path,
            reason: "parser produced no tree".to_string(),
        },
    }
}
