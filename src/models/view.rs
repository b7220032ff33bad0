use super::Todo;
use chrono::NaiveDate;
use std::cmp::Ordering;

/// The todos of one list, split the way they are displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoView<'a> {
    /// Dated before undated, earliest due date first, then oldest first.
    pub active: Vec<&'a Todo>,
    /// Stored order.
    pub completed: Vec<&'a Todo>,
    today: NaiveDate,
}

impl<'a> TodoView<'a> {
    pub fn for_list<I>(todos: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a Todo>,
    {
        let (mut active, completed): (Vec<&Todo>, Vec<&Todo>) =
            todos.into_iter().partition(|todo| !todo.completed);
        active.sort_by(|a, b| compare_active(a, b));

        Self {
            active,
            completed,
            today,
        }
    }

    /// Only active todos count as overdue.
    pub fn is_overdue(&self, todo: &Todo) -> bool {
        !todo.completed && todo.is_overdue(self.today)
    }

    pub fn overdue_count(&self) -> usize {
        self.active
            .iter()
            .filter(|todo| todo.is_overdue(self.today))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.completed.is_empty()
    }
}

fn compare_active(a: &Todo, b: &Todo) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y).then(a.created_at.cmp(&b.created_at)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.created_at.cmp(&b.created_at),
    }
}
