use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Days, NaiveDate, Utc};
use uuid::Uuid;

use pagehub::{
    access::{Authorizer, RoleName, UserId, WorkspaceId},
    calendar::{
        CalendarView, Recurrence, RecurrencePattern, ScheduledPost, ViewMode,
        parse_reference_date,
    },
    generation::ContentGenerator,
    grid::{GridOptions, build_grid},
    storage::Store,
};

pub const USAGE: &str = "Usage:
  pagehub calendar [--view month|week|day] [--date YYYY/MM/DD] [--workspace ID] [--next|--prev]
  pagehub authorize USER WORKSPACE PERMISSION
  pagehub caption PROMPT...
  pagehub image PROMPT...
  pagehub user add EMAIL [--name NAME] [--super-admin]
  pagehub user super-admin USER on|off
  pagehub workspace add NAME OWNER
  pagehub workspace members WORKSPACE
  pagehub member invite WORKSPACE EMAIL ROLE
  pagehub post add WORKSPACE RFC3339_TIME TITLE [--content TEXT] [--image URL] [--repeat daily|weekly|monthly]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Stay,
    Next,
    Previous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarArgs {
    pub view: Option<ViewMode>,
    pub date: Option<NaiveDate>,
    pub workspace: Option<WorkspaceId>,
    pub step: Step,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub workspace: WorkspaceId,
    pub scheduled_at: DateTime<Utc>,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub repeat: Option<RecurrencePattern>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Calendar(CalendarArgs),
    Authorize {
        user: UserId,
        workspace: WorkspaceId,
        permission: String,
    },
    Caption(String),
    Image(String),
    AddUser {
        email: String,
        name: Option<String>,
        super_admin: bool,
    },
    SetSuperAdmin {
        user: UserId,
        enabled: bool,
    },
    AddWorkspace {
        name: String,
        owner: UserId,
    },
    ListMembers(WorkspaceId),
    InviteMember {
        workspace: WorkspaceId,
        email: String,
        role: RoleName,
    },
    AddPost(NewPost),
    Help,
}

pub fn parse_args<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(command) = args.next() else {
        return Ok(Command::Help);
    };
    let rest: Vec<String> = args.collect();

    match command.as_str() {
        "calendar" => parse_calendar(rest).map(Command::Calendar),
        "authorize" => match rest.as_slice() {
            [user, workspace, permission] => Ok(Command::Authorize {
                user: parse_id(user)?,
                workspace: parse_id(workspace)?,
                permission: permission.clone(),
            }),
            _ => Err("authorize expects USER WORKSPACE PERMISSION".to_string()),
        },
        "caption" => Ok(Command::Caption(rest.join(" "))),
        "image" => Ok(Command::Image(rest.join(" "))),
        "user" => parse_user(rest),
        "workspace" => match rest.as_slice() {
            [sub, name, owner] if sub == "add" => Ok(Command::AddWorkspace {
                name: name.clone(),
                owner: parse_id(owner)?,
            }),
            [sub, workspace] if sub == "members" => Ok(Command::ListMembers(parse_id(workspace)?)),
            _ => Err("workspace expects 'add NAME OWNER' or 'members WORKSPACE'".to_string()),
        },
        "member" => match rest.as_slice() {
            [sub, workspace, email, role] if sub == "invite" => Ok(Command::InviteMember {
                workspace: parse_id(workspace)?,
                email: email.clone(),
                role: role.parse().map_err(|e: pagehub::access::AccessError| e.to_string())?,
            }),
            _ => Err("member expects 'invite WORKSPACE EMAIL ROLE'".to_string()),
        },
        "post" => parse_post(rest),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn parse_calendar(args: Vec<String>) -> Result<CalendarArgs, String> {
    let mut parsed = CalendarArgs {
        view: None,
        date: None,
        workspace: None,
        step: Step::Stay,
    };
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--view" => {
                let value = flag_value(&mut args, "--view")?;
                parsed.view = Some(value.parse().map_err(|_| {
                    format!("Invalid view '{}'. Use month, week or day.", value)
                })?);
            }
            "--date" => {
                let value = flag_value(&mut args, "--date")?;
                parsed.date = Some(
                    parse_reference_date(&value)
                        .map_err(|_| format!("Invalid date '{}'. Use YYYY/MM/DD.", value))?,
                );
            }
            "--workspace" => {
                let value = flag_value(&mut args, "--workspace")?;
                parsed.workspace = Some(parse_id(&value)?);
            }
            "--next" => parsed.step = Step::Next,
            "--prev" => parsed.step = Step::Previous,
            _ => return Err(format!("Unknown argument: {}", arg)),
        }
    }

    Ok(parsed)
}

fn parse_user(args: Vec<String>) -> Result<Command, String> {
    if let [sub, user, toggle] = args.as_slice()
        && sub == "super-admin"
    {
        let enabled = match toggle.as_str() {
            "on" => true,
            "off" => false,
            _ => return Err(format!("Invalid toggle '{}'. Use on or off.", toggle)),
        };
        return Ok(Command::SetSuperAdmin {
            user: parse_id(user)?,
            enabled,
        });
    }

    let mut args = args.into_iter();
    if args.next().as_deref() != Some("add") {
        return Err("user expects 'add EMAIL' or 'super-admin USER on|off'".to_string());
    }
    let email = args.next().ok_or("user add expects EMAIL")?;
    let mut name = None;
    let mut super_admin = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--name" => name = Some(flag_value(&mut args, "--name")?),
            "--super-admin" => super_admin = true,
            _ => return Err(format!("Unknown argument: {}", arg)),
        }
    }

    Ok(Command::AddUser {
        email,
        name,
        super_admin,
    })
}

fn parse_post(args: Vec<String>) -> Result<Command, String> {
    let mut args = args.into_iter();
    if args.next().as_deref() != Some("add") {
        return Err("post expects 'add WORKSPACE TIME TITLE'".to_string());
    }
    let workspace = parse_id(&args.next().ok_or("post add expects WORKSPACE")?)?;
    let time = args.next().ok_or("post add expects TIME")?;
    let scheduled_at = DateTime::parse_from_rfc3339(&time)
        .map_err(|_| format!("Invalid time '{}'. Use RFC 3339, e.g. 2024-05-01T09:30:00Z.", time))?
        .with_timezone(&Utc);
    let title = args.next().ok_or("post add expects TITLE")?;

    let mut post = NewPost {
        workspace,
        scheduled_at,
        title,
        content: String::new(),
        image_url: None,
        repeat: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--content" => post.content = flag_value(&mut args, "--content")?,
            "--image" => post.image_url = Some(flag_value(&mut args, "--image")?),
            "--repeat" => {
                let value = flag_value(&mut args, "--repeat")?;
                post.repeat = Some(match value.as_str() {
                    "daily" => RecurrencePattern::Daily,
                    "weekly" => RecurrencePattern::Weekly,
                    "monthly" => RecurrencePattern::Monthly,
                    _ => return Err(format!("Invalid repeat '{}'", value)),
                });
            }
            _ => return Err(format!("Unknown argument: {}", arg)),
        }
    }

    Ok(Command::AddPost(post))
}

fn flag_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{} expects a value", flag))
}

fn parse_id<T: std::str::FromStr>(value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid identifier '{}'", value))
}

/// Renders the requested calendar grid as JSON.
pub fn calendar_json(
    args: &CalendarArgs,
    store: &Store,
    options: &GridOptions,
    default_view: ViewMode,
    today: NaiveDate,
) -> anyhow::Result<String> {
    let mut view = CalendarView::new(args.view.unwrap_or(default_view), args.date.unwrap_or(today));
    view = match args.step {
        Step::Stay => view,
        Step::Next => view.next()?,
        Step::Previous => view.previous()?,
    };

    let posts = match args.workspace {
        Some(workspace) => {
            let (start, end) = posts_window(view.reference)?;
            store.posts_between(workspace, start, end)?
        }
        None => Vec::new(),
    };

    let grid = build_grid(&view, &posts, options, today)?;
    Ok(serde_json::to_string_pretty(&grid)?)
}

// Six weeks either side covers every month grid and absorbs any UTC offset.
fn posts_window(reference: NaiveDate) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = reference
        .checked_sub_days(Days::new(42))
        .context("calendar date out of range")?;
    let end = reference
        .checked_add_days(Days::new(42))
        .context("calendar date out of range")?;

    Ok((
        start.and_hms_opt(0, 0, 0).context("invalid start")?.and_utc(),
        end.and_hms_opt(0, 0, 0).context("invalid end")?.and_utc(),
    ))
}

pub async fn authorize(
    authorizer: &Authorizer,
    user: UserId,
    workspace: WorkspaceId,
    permission: &str,
) -> String {
    authorizer
        .authorize_or_deny(user, workspace, permission)
        .await
        .as_str()
        .to_string()
}

pub async fn caption(generator: &dyn ContentGenerator, prompt: &str) -> anyhow::Result<String> {
    Ok(generator.generate_caption(prompt).await?)
}

pub async fn image(generator: &dyn ContentGenerator, prompt: &str) -> anyhow::Result<String> {
    Ok(generator.generate_image(prompt).await?)
}

pub fn add_post(store: &Store, post: NewPost) -> anyhow::Result<String> {
    let post = ScheduledPost {
        id: Uuid::new_v4().to_string(),
        workspace_id: post.workspace,
        title: post.title,
        content: post.content,
        image_url: post.image_url,
        scheduled_at: post.scheduled_at,
        recurrence: post.repeat.map(|pattern| Recurrence {
            pattern,
            ends_on: None,
        }),
    };
    store.store_post(&post)?;
    Ok(post.id)
}

pub fn authorizer_for(store: Arc<Store>) -> Authorizer {
    Authorizer::new(store)
}
