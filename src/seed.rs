//! Data written to an empty store on first start.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Priority, Task, TaskList};

/// Sample tasks; nine items, the last four completed
pub fn sample_tasks(now: DateTime<Utc>) -> Vec<Task> {
    let entries = [
        ("1", "Buy groceries", false, Priority::Medium),
        ("2", "Finish project report", false, Priority::High),
        ("3", "Call the bank", false, Priority::Low),
        ("4", "Schedule dentist appointment", false, Priority::Medium),
        ("5", "Plan weekend trip", false, Priority::Low),
        ("6", "Read a book", true, Priority::Low),
        ("7", "Clean the house", true, Priority::Medium),
        ("8", "Prepare presentation", true, Priority::High),
        ("9", "Update blog", true, Priority::Medium),
    ];

    entries
        .into_iter()
        .map(|(id, title, completed, priority)| {
            let mut task = Task::new(id, title);
            task.completed = completed;
            task.priority = priority;
            task.created_at = now;
            if id == "2" {
                task.important = true;
                task.due_date = Some(now + Duration::days(1));
            }
            task
        })
        .collect()
}

pub fn default_lists() -> Vec<TaskList> {
    vec![
        TaskList::new("personal", "Personal"),
        TaskList::new("work", "Work"),
        TaskList::new("shopping", "Shopping"),
    ]
}
