use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

mod view;
mod wire;
pub use view::TodoView;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoList {
    #[serde(deserialize_with = "wire::hyphenated_uuid")]
    pub id: Uuid,
    pub name: String,
    #[serde(with = "wire::utc_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl TodoList {
    pub fn new(id: Uuid, name: &str, created_at: DateTime<Utc>) -> Result<Self, ListError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ListError::EmptyName);
        }

        Ok(Self {
            id,
            name: name.to_string(),
            created_at,
        })
    }

    pub fn rename(&mut self, new_name: &str) -> Result<(), ListError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ListError::EmptyName);
        }
        self.name = new_name.to_string();
        Ok(())
    }

    /// Field rules that serde cannot express. Stored names are checked as-is,
    /// without trimming.
    pub fn validate(&self) -> Result<(), ListError> {
        if self.name.is_empty() {
            return Err(ListError::EmptyName);
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListError {
    #[error("List name cannot be empty")]
    EmptyName,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[serde(deserialize_with = "wire::hyphenated_uuid")]
    pub id: Uuid,
    pub title: String,
    #[serde(deserialize_with = "wire::hyphenated_uuid")]
    pub list_id: Uuid,
    #[serde(with = "wire::utc_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "wire::required_date")]
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub completed: bool,
}

impl Todo {
    pub fn new(
        id: Uuid,
        list_id: Uuid,
        title: &str,
        due_date: Option<NaiveDate>,
        priority: Priority,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TodoError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TodoError::EmptyTitle);
        }

        Ok(Self {
            id,
            title: title.to_string(),
            list_id,
            created_at,
            due_date,
            priority,
            completed: false,
        })
    }

    /// Applies a partial update. Nothing is changed when the new title trims
    /// to an empty string.
    pub fn apply(&mut self, changes: &TodoChanges) -> Result<(), TodoError> {
        let title = match changes.title.as_deref().map(str::trim) {
            Some("") => return Err(TodoError::EmptyTitle),
            other => other.map(str::to_string),
        };

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(completed) = changes.completed {
            self.completed = completed;
        }
        Ok(())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date.is_some_and(|due| due < today)
    }

    pub fn validate(&self) -> Result<(), TodoError> {
        if self.title.is_empty() {
            return Err(TodoError::EmptyTitle);
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TodoError {
    #[error("Todo title cannot be empty")]
    EmptyTitle,
}

/// A partial update to a [`Todo`]. `due_date` is doubly optional so that a
/// due date can be cleared (`Some(None)`) as well as left alone (`None`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
}

impl TodoChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
    }
}

/// Ordered from least to most urgent.
#[derive(
    Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Default,
)]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::None, Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = PriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Priority::None),
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(PriorityError::InvalidPriority(s.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriorityError {
    #[error("Invalid priority value: {0} (expected none, low, medium or high)")]
    InvalidPriority(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn sample_todo() -> Todo {
        Todo::new(
            Uuid::from_u128(2),
            Uuid::from_u128(1),
            "  Milk ",
            None,
            Priority::None,
            at(0),
        )
        .unwrap()
    }

    #[test]
    fn test_list_name_is_trimmed() {
        let list = TodoList::new(Uuid::from_u128(1), "  Groceries\t", at(0)).unwrap();
        assert_eq!(list.name, "Groceries");
    }

    #[test]
    fn test_list_rejects_blank_name() {
        assert_eq!(
            TodoList::new(Uuid::from_u128(1), "   ", at(0)),
            Err(ListError::EmptyName)
        );

        let mut list = TodoList::new(Uuid::from_u128(1), "Work", at(0)).unwrap();
        assert_eq!(list.rename(" "), Err(ListError::EmptyName));
        assert_eq!(list.name, "Work");
    }

    #[test]
    fn test_new_todo_is_incomplete_with_trimmed_title() {
        let todo = sample_todo();
        assert_eq!(todo.title, "Milk");
        assert!(!todo.completed);
    }

    #[test]
    fn test_apply_changes_only_touches_given_fields() {
        let mut todo = sample_todo();
        let due = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        todo.apply(&TodoChanges::new().completed(true).due_date(Some(due)))
            .unwrap();

        assert!(todo.completed);
        assert_eq!(todo.due_date, Some(due));
        assert_eq!(todo.title, "Milk");
        assert_eq!(todo.priority, Priority::None);

        todo.apply(&TodoChanges::new().due_date(None)).unwrap();
        assert_eq!(todo.due_date, None);
    }

    #[test]
    fn test_apply_blank_title_changes_nothing() {
        let mut todo = sample_todo();
        let result = todo.apply(&TodoChanges::new().title("  ").completed(true));
        assert_eq!(result, Err(TodoError::EmptyTitle));
        assert_eq!(todo, sample_todo());
    }

    #[test]
    fn test_overdue_is_strictly_before_today() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut todo = sample_todo();
        assert!(!todo.is_overdue(today));

        todo.due_date = today.pred_opt();
        assert!(todo.is_overdue(today));

        todo.due_date = Some(today);
        assert!(!todo.is_overdue(today));
    }

    #[test]
    fn test_priority_parsing_and_order() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(" low ".parse::<Priority>(), Ok(Priority::Low));
        assert!("urgent".parse::<Priority>().is_err());
        assert!(Priority::None < Priority::Low);
        assert!(Priority::Medium < Priority::High);
    }

    #[test]
    fn test_serialized_field_names_are_camel_case() {
        let json = serde_json::to_value(sample_todo()).unwrap();
        assert_eq!(json["listId"], Uuid::from_u128(1).to_string());
        assert_eq!(json["dueDate"], serde_json::Value::Null);
        assert_eq!(json["priority"], "None");
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00.000Z");
    }
}
