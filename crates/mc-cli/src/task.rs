use crate::{now_ms, print_json, read_payload};
use anyhow::Result;
use clap::{Args, Subcommand};
use mc_core::{Assignee, TaskCreate, TaskStatus, TaskUpsert};
use mc_store::MissionStore;
use serde_json::json;

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum TaskCommand {
    List(TaskListArgs),
    Add(TaskAddArgs),
    #[command(alias = "set-status")]
    Status(TaskStatusArgs),
    Assign(TaskAssignArgs),
    Edit(TaskEditArgs),
    /// Upsert an automation task from a JSON payload keyed by `autoKey`
    Upsert(TaskUpsertArgs),
    Summary,
}

#[derive(Args, Debug)]
pub struct TaskListArgs {
    #[arg(long)]
    pub status: Option<TaskStatus>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TaskAddArgs {
    pub title: String,
    #[arg(long, alias = "description")]
    pub desc: Option<String>,
    #[arg(long, default_value = "operator")]
    pub assignee: Assignee,
    #[arg(long)]
    pub status: Option<TaskStatus>,
}

#[derive(Args, Debug)]
pub struct TaskStatusArgs {
    pub id: String,
    pub status: TaskStatus,
}

#[derive(Args, Debug)]
pub struct TaskAssignArgs {
    pub id: String,
    pub assignee: Assignee,
}

#[derive(Args, Debug)]
pub struct TaskEditArgs {
    pub id: String,
    #[arg(long)]
    pub title: String,
    #[arg(long, alias = "description")]
    pub desc: Option<String>,
}

#[derive(Args, Debug)]
pub struct TaskUpsertArgs {
    /// Payload file, or `-` for stdin
    #[arg(default_value = "-")]
    pub payload: String,
}

pub fn run(store: &MissionStore, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::List(args) => list(store, args),
        TaskCommand::Add(args) => add(store, args),
        TaskCommand::Status(args) => {
            store.set_task_status(&args.id, args.status, now_ms())?;
            Ok(())
        }
        TaskCommand::Assign(args) => {
            store.set_task_assignee(&args.id, args.assignee, now_ms())?;
            Ok(())
        }
        TaskCommand::Edit(args) => {
            store.update_task_details(&args.id, &args.title, args.desc.as_deref(), now_ms())?;
            Ok(())
        }
        TaskCommand::Upsert(args) => upsert(store, args),
        TaskCommand::Summary => print_json(&store.task_summary()?),
    }
}

fn list(store: &MissionStore, args: TaskListArgs) -> Result<()> {
    let mut tasks = store.list_tasks()?;
    if let Some(status) = args.status {
        tasks.retain(|t| t.status == status);
    }

    if args.json {
        return print_json(&tasks);
    }

    println!("Found {} tasks:", tasks.len());
    for task in &tasks {
        println!(
            "- [{}] {} ({}, {})",
            task.status, task.title, task.assignee, task.id
        );
    }
    Ok(())
}

fn add(store: &MissionStore, args: TaskAddArgs) -> Result<()> {
    let draft = TaskCreate {
        title: args.title,
        description: args.desc,
        assignee: args.assignee,
        status: args.status,
    };
    let id = store.create_task(&draft, now_ms())?;
    println!("{id}");
    Ok(())
}

fn upsert(store: &MissionStore, args: TaskUpsertArgs) -> Result<()> {
    let payload = read_payload(&args.payload)?;
    let (auto_key, draft) = TaskUpsert::from_value(&payload)?;
    let id = store.upsert_automation_task(&auto_key, &draft, now_ms())?;
    print_json(&json!({ "ok": true, "id": id }))
}
