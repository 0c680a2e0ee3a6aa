use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;

use crate::lists::ListStore;
use crate::models::{Priority, Task, TaskList};
use crate::tasks::TaskStore;
use crate::utils::{generate_id, parse_due_date};

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "Taskflow - tasks, lists and today/planned/important views")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which derived view `tasks` prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TaskView {
    #[default]
    All,
    Pending,
    Completed,
    Important,
    Today,
    Planned,
    Assigned,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show tasks in one of the dashboard views
    Tasks {
        #[arg(long, value_enum, default_value_t = TaskView::All)]
        view: TaskView,
        /// Only tasks filed under this list
        #[arg(long)]
        list: Option<String>,
    },
    /// Add a new task
    Add {
        /// Task title
        title: String,
        /// low, medium or high (defaults to the configured priority)
        #[arg(long)]
        priority: Option<Priority>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
        /// Mark as important
        #[arg(long)]
        important: bool,
        /// List id to file the task under
        #[arg(long)]
        list: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Toggle a task between pending and completed
    Complete { id: String },
    /// Toggle the important flag of a task
    Star { id: String },
    /// Edit fields of an existing task
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        /// New due date (YYYY-MM-DD or RFC 3339)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a task
    Remove { id: String },
    /// Show all lists
    Lists,
    /// Add a new list
    AddList {
        /// List name
        name: String,
        /// Explicit list id (generated if omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Delete a list (tasks are kept)
    RemoveList { id: String },
    /// Show pending/completed counts
    Stats,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("List not found: {0}")]
    ListNotFound(String),
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Id already in use: {0}")]
    DuplicateId(String),
}

/// Options for a new task collected from the command line
#[derive(Debug, Default)]
pub struct NewTask {
    pub title: String,
    pub priority: Option<Priority>,
    pub due: Option<String>,
    pub important: bool,
    pub list: Option<String>,
    pub notes: Option<String>,
}

/// Field changes for an existing task
#[derive(Debug, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub due: Option<String>,
    pub clear_due: bool,
    pub notes: Option<String>,
}

/// Collect the tasks shown by a view, optionally narrowed to one list
pub fn select_tasks<'a>(store: &'a TaskStore, view: TaskView, list: Option<&str>) -> Vec<&'a Task> {
    let tasks: Vec<&Task> = match view {
        TaskView::All => store.all_tasks().iter().collect(),
        TaskView::Pending => store.by_completion(false),
        TaskView::Completed => store.by_completion(true),
        TaskView::Important => store.important(),
        TaskView::Today => store.due_today(),
        TaskView::Planned => store.with_due_date(),
        TaskView::Assigned => store.assigned(),
    };

    match list {
        Some(list_id) => tasks
            .into_iter()
            .filter(|t| t.in_list(list_id))
            .collect(),
        None => tasks,
    }
}

/// Format a task as a single display line
pub fn format_task_line(task: &Task) -> String {
    let check = if task.completed { "x" } else { " " };
    let star = if task.important { " *" } else { "" };
    let mut line = format!("[{}] {}  {} ({}){}", check, task.id, task.title, task.priority, star);
    if let Some(due) = task.due_date {
        line.push_str(&format!("  due {}", due.with_timezone(&chrono::Local).format("%Y-%m-%d")));
    }
    line
}

/// Handle the tasks command
pub fn handle_tasks(store: &TaskStore, view: TaskView, list: Option<String>) -> Result<(), CliError> {
    let tasks = select_tasks(store, view, list.as_deref());
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    for task in tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

/// Build a task from command line options
pub fn build_task(id: String, new: NewTask, default_priority: Priority) -> Result<Task, CliError> {
    let title = new.title.trim();
    if title.is_empty() {
        return Err(CliError::EmptyTitle);
    }

    let mut task = Task::new(id, title);
    task.priority = new.priority.unwrap_or(default_priority);
    task.important = new.important;
    task.list_id = new.list;
    task.notes = new.notes;
    if let Some(due_str) = new.due {
        task.due_date = Some(parse_due_date(&due_str).map_err(CliError::DateParseError)?);
    }
    Ok(task)
}

/// Handle the add command
pub fn handle_add(store: &mut TaskStore, new: NewTask, default_priority: Priority) -> Result<(), CliError> {
    let task = build_task(generate_id(), new, default_priority)?;
    let id = task.id.clone();
    if !store.add(task) {
        return Err(CliError::DuplicateId(id));
    }
    println!("Task created successfully (ID: {})", id);
    Ok(())
}

/// Handle the complete command
pub fn handle_complete(store: &mut TaskStore, id: &str) -> Result<(), CliError> {
    store.toggle_completion(id);
    let task = store.get(id).ok_or_else(|| CliError::TaskNotFound(id.to_string()))?;
    let state = if task.completed { "completed" } else { "pending" };
    println!("Task {} marked {}", id, state);
    Ok(())
}

/// Handle the star command
pub fn handle_star(store: &mut TaskStore, id: &str) -> Result<(), CliError> {
    store.toggle_importance(id);
    let task = store.get(id).ok_or_else(|| CliError::TaskNotFound(id.to_string()))?;
    if task.important {
        println!("Task {} marked important", id);
    } else {
        println!("Task {} no longer important", id);
    }
    Ok(())
}

/// Apply an edit to a copy of the task; the store replaces the whole entity
pub fn apply_edit(mut task: Task, edit: TaskEdit) -> Result<Task, CliError> {
    if let Some(title) = edit.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(CliError::EmptyTitle);
        }
        task.title = title.to_string();
    }
    if let Some(priority) = edit.priority {
        task.priority = priority;
    }
    if edit.clear_due {
        task.due_date = None;
    } else if let Some(due_str) = edit.due {
        task.due_date = Some(parse_due_date(&due_str).map_err(CliError::DateParseError)?);
    }
    if let Some(notes) = edit.notes {
        task.notes = Some(notes);
    }
    Ok(task)
}

/// Handle the edit command
pub fn handle_edit(store: &mut TaskStore, id: &str, edit: TaskEdit) -> Result<(), CliError> {
    let current = store
        .get(id)
        .cloned()
        .ok_or_else(|| CliError::TaskNotFound(id.to_string()))?;
    let updated = apply_edit(current, edit)?;
    store.update(updated);
    println!("Task {} updated", id);
    Ok(())
}

/// Handle the remove command
pub fn handle_remove(store: &mut TaskStore, id: &str) -> Result<(), CliError> {
    if store.get(id).is_none() {
        return Err(CliError::TaskNotFound(id.to_string()));
    }
    store.remove(id);
    println!("Task {} removed", id);
    Ok(())
}

/// Handle the stats command
pub fn handle_stats(store: &TaskStore) -> Result<(), CliError> {
    let stats = store.stats();
    println!("{} pending, {} completed", stats.pending, stats.completed);
    println!("Progress: {}%", stats.completion_percentage);
    Ok(())
}

/// Handle the lists command
pub fn handle_lists(lists: &ListStore, tasks: &TaskStore) -> Result<(), CliError> {
    for list in lists.all_lists() {
        let count = tasks.in_list(&list.id).len();
        println!("{}  {} ({} tasks)", list.id, list.name, count);
    }
    Ok(())
}

/// Handle the add-list command
pub fn handle_add_list(lists: &mut ListStore, name: String, id: Option<String>) -> Result<(), CliError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::EmptyName);
    }
    let id = id.unwrap_or_else(generate_id);
    if !lists.add(TaskList::new(id.clone(), name)) {
        return Err(CliError::DuplicateId(id));
    }
    println!("List created successfully (ID: {})", id);
    Ok(())
}

/// Handle the remove-list command
pub fn handle_remove_list(lists: &mut ListStore, id: &str) -> Result<(), CliError> {
    if lists.get(id).is_none() {
        return Err(CliError::ListNotFound(id.to_string()));
    }
    lists.remove(id);
    println!("List {} removed", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_add_with_options() {
        let cli = Cli::try_parse_from([
            "taskflow", "add", "Write report", "--priority", "high", "--due", "2024-01-15", "--important",
        ])
        .unwrap();

        match cli.command {
            Commands::Add { title, priority, due, important, .. } => {
                assert_eq!(title, "Write report");
                assert_eq!(priority, Some(Priority::High));
                assert_eq!(due.as_deref(), Some("2024-01-15"));
                assert!(important);
            }
            _ => panic!("expected add command"),
        }
    }

    #[test]
    fn cli_parses_view_names() {
        let cli = Cli::try_parse_from(["taskflow", "tasks", "--view", "today"]).unwrap();
        assert!(matches!(cli.command, Commands::Tasks { view: TaskView::Today, list: None }));
    }

    #[test]
    fn cli_rejects_due_with_clear_due() {
        let result = Cli::try_parse_from(["taskflow", "edit", "1", "--due", "2024-01-01", "--clear-due"]);
        assert!(result.is_err());
    }

    #[test]
    fn build_task_rejects_blank_title() {
        let new = NewTask {
            title: "   ".to_string(),
            ..NewTask::default()
        };
        assert!(matches!(build_task("1".into(), new, Priority::Medium), Err(CliError::EmptyTitle)));
    }

    #[test]
    fn build_task_uses_default_priority() {
        let new = NewTask {
            title: "Water plants".to_string(),
            list: Some("personal".to_string()),
            ..NewTask::default()
        };
        let task = build_task("42".into(), new, Priority::Low).unwrap();
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.list_id.as_deref(), Some("personal"));
        assert!(!task.completed);
    }

    #[test]
    fn apply_edit_clears_due_date() {
        let mut task = Task::new("1", "t");
        task.due_date = Some(chrono::Utc::now());
        let edited = apply_edit(task, TaskEdit { clear_due: true, ..TaskEdit::default() }).unwrap();
        assert!(edited.due_date.is_none());
    }

    fn loaded_stores() -> (TaskStore, ListStore) {
        let persistence = crate::persistence::Persistence::in_memory();
        let mut tasks = TaskStore::new(persistence.clone(), std::time::Duration::ZERO);
        tasks.load();
        let mut lists = ListStore::new(persistence);
        lists.load();
        (tasks, lists)
    }

    #[test]
    fn handlers_report_missing_task() {
        let (mut tasks, _) = loaded_stores();
        let before = tasks.all_tasks().to_vec();

        assert!(matches!(
            handle_edit(&mut tasks, "nope", TaskEdit::default()),
            Err(CliError::TaskNotFound(id)) if id == "nope"
        ));
        assert!(matches!(handle_remove(&mut tasks, "nope"), Err(CliError::TaskNotFound(_))));
        assert!(matches!(handle_complete(&mut tasks, "nope"), Err(CliError::TaskNotFound(_))));
        assert!(matches!(handle_star(&mut tasks, "nope"), Err(CliError::TaskNotFound(_))));
        assert_eq!(tasks.all_tasks(), before.as_slice());
    }

    #[test]
    fn remove_list_reports_missing_list() {
        let (_, mut lists) = loaded_stores();
        assert!(matches!(
            handle_remove_list(&mut lists, "nope"),
            Err(CliError::ListNotFound(id)) if id == "nope"
        ));
        assert_eq!(lists.all_lists().len(), 3);
    }

    #[test]
    fn handle_edit_replaces_task_in_store() {
        let (mut tasks, _) = loaded_stores();
        let edit = TaskEdit {
            title: Some("Buy oat milk".to_string()),
            priority: Some(Priority::High),
            ..TaskEdit::default()
        };
        handle_edit(&mut tasks, "1", edit).unwrap();

        let task = tasks.get("1").unwrap();
        assert_eq!(task.title, "Buy oat milk");
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn select_tasks_narrows_view_to_list() {
        let (mut tasks, _) = loaded_stores();
        let mut filed = Task::new("w1", "Quarterly review");
        filed.list_id = Some("work".to_string());
        filed.important = true;
        tasks.add(filed);

        let important_work = select_tasks(&tasks, TaskView::Important, Some("work"));
        assert_eq!(important_work.len(), 1);
        assert_eq!(important_work[0].id, "w1");
        assert_eq!(
            select_tasks(&tasks, TaskView::All, Some("work")).len(),
            tasks.in_list("work").len()
        );
        assert_eq!(select_tasks(&tasks, TaskView::Important, None).len(), 2);
    }

    #[test]
    fn format_task_line_marks_state() {
        let mut task = Task::new("7", "Clean the house");
        task.completed = true;
        task.important = true;
        assert_eq!(format_task_line(&task), "[x] 7  Clean the house (medium) *");
    }
}
