use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;

use lmsctl::config::{database, logging, Overrides, Settings};
use lmsctl::modules::Keyed;
use lmsctl::services::api::{cross_check, ApiClient};
use lmsctl::workflow::audit::{audit, Snapshot};
use lmsctl::workflow::inspect;
use lmsctl::workflow::locator::{Locator, Selector};
use lmsctl::workflow::mutator::{parse_assignment, LessonPath, Mutator, TrimMode};
use lmsctl::workflow::seed::{self, LessonSeed, QuizSeed, SeedPlan};

/// Maintenance toolkit for the LMS course database.
///
/// Selectors: `id:<id>`, `code:<code>`, `title:<exact>`, `match:<regex>`,
/// `contains:<text>`, `order:<n>`, `all`; bare text is an exact title.
#[derive(Parser)]
#[command(name = "lmsctl", version)]
struct Cli {
    /// Count what would change without writing anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// MongoDB connection string (overrides MONGODB_URI)
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Database name (overrides MONGODB_DATABASE)
    #[arg(long, global = true)]
    database: Option<String>,

    /// LMS API base URL (overrides LMS_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List courses with module, lesson and quiz counts
    Courses {
        #[arg(default_value = "all")]
        selector: Selector,
    },
    /// Print one course with its modules, lessons and quizzes
    Show { selector: Selector },
    /// Documents per collection
    Count,
    /// Check referential integrity
    Audit,
    /// Insert the courses of a JSON plan, skipping codes that exist
    Seed { plan: PathBuf },
    Rename { selector: Selector, new_title: String },
    /// Set both publication flags
    Publish {
        selector: Selector,
        #[arg(long)]
        unpublish: bool,
    },
    /// `$set` course fields given as key=value
    Set {
        selector: Selector,
        #[arg(required = true)]
        assignments: Vec<String>,
        /// Update every matching course instead of exactly one
        #[arg(long)]
        many: bool,
    },
    Recategorize { from: String, to: String },
    NormalizeCategories,
    /// Delete a course and everything that references it
    DeleteCourse { selector: Selector },
    /// Delete every course whose type is not the given one
    Prune {
        #[arg(long)]
        keep: String,
    },
    /// Keep the copy with most lessons among courses sharing a title
    Dedupe { title: String },
    TrimLessons {
        selector: Selector,
        #[command(flatten)]
        mode: TrimArgs,
    },
    /// `$set` fields on one lesson, stored or embedded
    SetLesson {
        #[command(flatten)]
        target: LessonArgs,
        /// New HTML content
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,
        /// Read the new HTML content from a file
        #[arg(long)]
        content_file: Option<PathBuf>,
        /// Other fields as key=value
        assignments: Vec<String>,
    },
    DeleteLesson {
        #[command(flatten)]
        target: LessonArgs,
    },
    /// Append lessons to a module, creating one if the course has none
    AddLessons {
        #[arg(long)]
        course: Selector,
        #[arg(long)]
        module: Option<Selector>,
        #[arg(long, required_unless_present = "lessons", conflicts_with = "lessons")]
        title: Option<String>,
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,
        #[arg(long)]
        content_file: Option<PathBuf>,
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        duration_minutes: Option<i64>,
        /// JSON array of lessons instead of a single --title
        #[arg(long)]
        lessons: Option<PathBuf>,
    },
    /// Replace a quiz's title and questions from a JSON file
    ReplaceQuiz {
        #[arg(long)]
        course: Selector,
        #[arg(long, default_value = "all")]
        quiz: Selector,
        file: PathBuf,
    },
    RewriteUrls {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Point numbered lessons at `{image_base}{n}.{ext}`
    RenderSlides {
        selector: Selector,
        #[arg(long)]
        image_base: String,
        #[arg(long, default_value = "jpeg")]
        ext: String,
        #[arg(long)]
        alt: Option<String>,
    },
    LinkQuiz { selector: Selector },
    AddMissingQuizzes,
    ClearProgress { selector: Selector },
    Enroll {
        #[arg(long)]
        user: Selector,
        #[arg(long)]
        course: Selector,
    },
    /// Empty all enrollments and delete all progress and certificates
    UnenrollAll {
        #[arg(long)]
        yes: bool,
    },
    /// Compare the database with what the LMS API serves
    VerifyApi {
        #[arg(long)]
        course: Option<Selector>,
    },
}

#[derive(Args)]
struct LessonArgs {
    #[arg(long)]
    course: Selector,
    /// Module heading; `(unassigned)` holds lessons without a module
    #[arg(long)]
    module: Option<Selector>,
    /// e.g. `order:3` or an exact title
    #[arg(long)]
    lesson: Selector,
}

impl From<LessonArgs> for LessonPath {
    fn from(args: LessonArgs) -> Self {
        LessonPath {
            course: args.course,
            module: args.module,
            lesson: args.lesson,
        }
    }
}

fn read_content(inline: Option<String>, file: Option<PathBuf>) -> Result<Option<String>> {
    match (inline, file) {
        (Some(text), _) => Ok(Some(text)),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
            Ok(Some(text))
        }
        (None, None) => Ok(None),
    }
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TrimArgs {
    #[arg(long)]
    keep_first: Option<usize>,
    #[arg(long)]
    drop_last: Option<usize>,
}

impl TrimArgs {
    fn mode(&self) -> Result<TrimMode> {
        match (self.keep_first, self.drop_last) {
            (Some(n), None) => Ok(TrimMode::KeepFirst(n)),
            (None, Some(n)) => Ok(TrimMode::DropLast(n)),
            _ => bail!("give exactly one of --keep-first or --drop-last"),
        }
    }
}

fn emit<T: Serialize + Display>(value: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", value);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let settings = Settings::from_env(&Overrides {
        uri: cli.uri.clone(),
        database: cli.database.clone(),
        api_base_url: cli.api_url.clone(),
    })?;
    let db = database::connect(&settings)
        .await
        .with_context(|| format!("connecting to database {}", settings.database))?;

    let mutator = Mutator::new(&db, cli.dry_run);
    let locator = Locator::new(&db);
    let json = cli.json;

    let report = match cli.command {
        Command::Courses { selector } => {
            let summaries = inspect::courses(&db, &selector).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for summary in &summaries {
                    println!("{}", summary);
                }
                println!("{} courses", summaries.len());
            }
            return Ok(());
        }
        Command::Show { selector } => {
            let tree = inspect::show(&db, &selector).await?;
            return emit(&tree, json);
        }
        Command::Count => {
            let counts = inspect::count(&db).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                for (name, n) in &counts {
                    println!("{:<20} {}", name, n);
                }
            }
            return Ok(());
        }
        Command::Audit => {
            let findings = audit(&Snapshot::load(&db).await?);
            return emit(&findings, json);
        }
        Command::Seed { plan: path } => {
            let plan = SeedPlan::load(&path).with_context(|| format!("loading seed plan {}", path.display()))?;
            seed::seed(&db, &plan, cli.dry_run).await?
        }
        Command::Rename { selector, new_title } => mutator.rename_course(&selector, &new_title).await?,
        Command::Publish { selector, unpublish } => mutator.publish(&selector, !unpublish).await?,
        Command::Set {
            selector,
            assignments,
            many,
        } => {
            let mut fields = bson::Document::new();
            for raw in &assignments {
                let (key, value) = parse_assignment(raw)?;
                fields.insert(key, value);
            }
            mutator.set_course_fields(&selector, fields, many).await?
        }
        Command::Recategorize { from, to } => mutator.recategorize(&from, &to).await?,
        Command::NormalizeCategories => mutator.normalize_categories().await?,
        Command::DeleteCourse { selector } => {
            let course = locator.course(&selector).await?;
            mutator.delete_course(&course).await?
        }
        Command::Prune { keep } => mutator.prune_courses(&keep).await?,
        Command::Dedupe { title } => mutator.dedupe_courses(&title).await?,
        Command::TrimLessons { selector, mode } => mutator.trim_lessons(&selector, mode.mode()?).await?,
        Command::SetLesson {
            target,
            content,
            content_file,
            assignments,
        } => {
            let mut fields = bson::Document::new();
            if let Some(html) = read_content(content, content_file)? {
                fields.insert("content", html);
            }
            for raw in &assignments {
                let (key, value) = parse_assignment(raw)?;
                fields.insert(key, value);
            }
            mutator.update_lesson(&target.into(), fields).await?
        }
        Command::DeleteLesson { target } => mutator.delete_lesson(&target.into()).await?,
        Command::AddLessons {
            course,
            module,
            title,
            content,
            content_file,
            content_type,
            duration_minutes,
            lessons,
        } => {
            let seeds: Vec<LessonSeed> = match (lessons, title) {
                (Some(path), _) => seed::read_json(&path).with_context(|| format!("loading lessons {}", path.display()))?,
                (None, Some(title)) => vec![LessonSeed {
                    title,
                    content: read_content(content, content_file)?.unwrap_or_default(),
                    content_type,
                    duration_minutes,
                    order: None,
                }],
                (None, None) => bail!("give --title or --lessons"),
            };
            mutator.add_lessons(&course, module.as_ref(), &seeds).await?
        }
        Command::ReplaceQuiz { course, quiz, file } => {
            let replacement: QuizSeed =
                seed::read_json(&file).with_context(|| format!("loading quiz {}", file.display()))?;
            mutator.replace_quiz(&course, &quiz, &replacement).await?
        }
        Command::RewriteUrls { from, to } => mutator.rewrite_urls(&from, &to).await?,
        Command::RenderSlides {
            selector,
            image_base,
            ext,
            alt,
        } => {
            mutator
                .render_slides(&selector, &image_base, &ext, alt.as_deref())
                .await?
        }
        Command::LinkQuiz { selector } => mutator.link_quiz(&selector).await?,
        Command::AddMissingQuizzes => mutator.add_missing_quizzes().await?,
        Command::ClearProgress { selector } => mutator.clear_progress(&selector).await?,
        Command::Enroll { user, course } => {
            let user = locator.user(&user).await?;
            let course = locator.course(&course).await?;
            mutator.enroll(&user, &course).await?
        }
        Command::UnenrollAll { yes } => {
            if !yes && !cli.dry_run {
                bail!("unenroll-all clears every enrollment; pass --yes (or --dry-run to preview)");
            }
            mutator.unenroll_all().await?
        }
        Command::VerifyApi { course } => {
            let client = ApiClient::new(&settings.api_base_url);
            match course {
                Some(selector) => verify_one(&locator, &client, &selector).await?,
                None => {
                    let db_courses = locator.courses(&Selector::All).await?;
                    let served = client
                        .list_courses()
                        .await
                        .with_context(|| format!("listing courses from {}", settings.api_base_url))?;
                    let check = cross_check(&db_courses, &served);
                    emit(&check, json)?;
                    if !check.is_consistent() {
                        bail!("database and API disagree");
                    }
                }
            }
            return Ok(());
        }
    };

    emit(&report, json)
}

async fn verify_one(locator: &Locator<'_>, client: &ApiClient, selector: &Selector) -> Result<()> {
    let course = locator.course(selector).await?;
    let reference = course
        .reference()
        .context("course has neither id nor _id")?;
    let modules = locator.modules(&course).await?.len();

    let Some(served) = client.get_course(&reference).await? else {
        bail!("API does not serve {} ({})", course.title, reference);
    };

    println!("{}", served.title);
    println!("  modules: {} in database, {} from API", modules, served.modules.len());
    if served.title != course.title {
        bail!("title differs: {:?} (db) vs {:?} (api)", course.title, served.title);
    }
    Ok(())
}
