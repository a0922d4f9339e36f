use anyhow::{anyhow, Context, Result};
use practice_arena::budget::fill_with_budget;
use practice_arena::config::Config;
use practice_arena::database::SqliteQuestionSource;
use practice_arena::grade::Grade;
use practice_arena::log_validation;
use practice_arena::models::{Question, Subject};
use practice_arena::question_bank::StaticQuestionBank;
use practice_arena::question_source::RawQuestion;
use practice_arena::random::{RandomSource, RngSource};
use practice_arena::session_assembler::generate_question;
use serde_json::Value;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_PER_SUBJECT: usize = 25;

#[derive(Debug, Default)]
struct SeedStats {
    curated: usize,
    generated: usize,
    imported: usize,
    inserted: usize,
    skipped_duplicates: usize,
    rejected_records: Vec<String>,
}

impl SeedStats {
    fn print_summary(&self, dry_run: bool, total_in_bank: i64) {
        println!("\n=== Seed Summary ===");
        println!("Curated questions considered: {}", self.curated);
        println!("Generated questions considered: {}", self.generated);
        println!("Imported records considered: {}", self.imported);

        if dry_run {
            println!(
                "Questions that WOULD BE inserted: {}",
                self.curated + self.generated + self.imported
            );
            println!("\n** DRY RUN MODE - No changes were made **");
        } else {
            println!("Questions inserted: {}", self.inserted);
            println!("Skipped (prompt already stored): {}", self.skipped_duplicates);
        }
        if !self.rejected_records.is_empty() {
            println!("Rejected records: {}", self.rejected_records.len());
            for error in &self.rejected_records {
                println!("  - {}", error);
            }
        }
        println!("Questions now in bank: {}", total_in_bank);
    }
}

struct SeedArgs {
    dry_run: bool,
    per_subject: usize,
    import: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<SeedArgs> {
    let mut parsed = SeedArgs {
        dry_run: false,
        per_subject: DEFAULT_PER_SUBJECT,
        import: None,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--dry-run" => parsed.dry_run = true,
            "--per-subject" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--per-subject needs a number"))?;
                parsed.per_subject = value
                    .parse()
                    .map_err(|_| anyhow!("Invalid --per-subject value: '{}'", value))?;
            }
            "--import" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--import needs a file path"))?;
                parsed.import = Some(PathBuf::from(path));
            }
            other => return Err(anyhow!("Unknown argument: {}", other)),
        }
    }
    Ok(parsed)
}

/// Records exported by other clients, stored as-is. Each record must name
/// a known subject; the rest are returned as rejection messages.
fn imported_records(json: &str) -> Result<(Vec<(Subject, RawQuestion)>, Vec<String>)> {
    let items: Vec<Value> = serde_json::from_str(json)?;
    let mut records = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        let raw = match serde_json::from_value::<RawQuestion>(item) {
            Ok(raw) => raw,
            Err(e) => {
                rejected.push(format!("import #{}: {}", index, e));
                continue;
            }
        };
        match raw.subject.as_deref().map(str::parse::<Subject>) {
            Some(Ok(subject)) => records.push((subject, raw)),
            _ => rejected.push(format!("import #{}: missing or unknown subject", index)),
        }
    }
    Ok((records, rejected))
}

/// Up to `count` generated questions with distinct prompts.
fn generated_questions<R: RandomSource>(
    subject: Subject,
    count: usize,
    rng: &mut R,
) -> Vec<Question> {
    fill_with_budget(Vec::with_capacity(count), count, count * 3, |accepted: &[Question]| {
        let grade = Grade::random(rng);
        generate_question(subject, grade, rng)
            .ok()
            .filter(|candidate| accepted.iter().all(|q| q.prompt != candidate.prompt))
    })
    .accepted
}

fn preview(question: &Question) {
    println!(
        "  [{} grade {}] {} -> {}",
        question.subject,
        question.grade,
        question.prompt.chars().take(60).collect::<String>(),
        question.correct_answer
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let args = parse_args(&args)?;

    let config = Config::from_lookup(|key| env::var(key).ok())?;
    println!("Question bank: {}", config.database.url);
    let db = SqliteQuestionSource::new(&config.database.url).await?;

    let mut stats = SeedStats::default();
    let mut pending: Vec<Question> = Vec::new();

    let bank = StaticQuestionBank::built_in()?;
    for subject in [Subject::Math, Subject::English] {
        for raw in bank.records_for(subject).cloned() {
            match Question::try_from(raw) {
                Ok(question) => {
                    stats.curated += 1;
                    pending.push(question);
                }
                Err(e) => {
                    log_validation!(failure, "seed_questions", error = e);
                    stats.rejected_records.push(e.to_string());
                }
            }
        }
    }

    let mut imports = Vec::new();
    if let Some(path) = &args.import {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read import file {}", path.display()))?;
        let (records, rejected) = imported_records(&json)?;
        stats.imported = records.len();
        stats.rejected_records.extend(rejected);
        imports = records;
    }

    let mut rng = RngSource::from_entropy();
    for subject in [Subject::Math, Subject::English] {
        let generated = generated_questions(subject, args.per_subject, &mut rng);
        stats.generated += generated.len();
        pending.extend(generated);
    }

    println!("\nPrepared {} questions:", pending.len());
    for (i, question) in pending.iter().enumerate() {
        if i < 5 || args.dry_run {
            preview(question);
        } else if i == 5 {
            println!("  ... and {} more", pending.len() - 5);
            break;
        }
    }

    if args.dry_run {
        stats.print_summary(true, db.count_questions(None).await?);
        println!("\nTo insert the questions, run:");
        println!("cargo run --bin seed_questions");
        return Ok(());
    }

    for question in &pending {
        match db.insert_question(question).await? {
            Some(_) => stats.inserted += 1,
            None => stats.skipped_duplicates += 1,
        }
    }
    for (subject, raw) in &imports {
        if db.insert_raw(*subject, raw).await? {
            stats.inserted += 1;
        } else {
            stats.skipped_duplicates += 1;
        }
    }

    stats.print_summary(false, db.count_questions(None).await?);
    Ok(())
}
