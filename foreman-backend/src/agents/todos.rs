//! Supervisor todo list and its reconciliation against worker completions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
}

impl TodoItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        TodoItem {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Give every todo a unique id, keeping the ones the model supplied
pub fn assign_ids(entries: Vec<(Option<String>, String)>) -> Vec<TodoItem> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .enumerate()
        .map(|(i, (id, text))| {
            let fallback = format!("todo-{}", i + 1);
            let mut id = id
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| fallback.clone());
            if !seen.insert(id.clone()) {
                id = format!("{}-{}", id, i + 1);
                seen.insert(id.clone());
            }
            TodoItem::new(id, text)
        })
        .collect()
}

/// Something that happened during one supervisor iteration, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum TodoEvent {
    Replaced(Vec<TodoItem>),
    WorkerFinished { todo_id: Option<String> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoList {
    items: Vec<TodoItem>,
}

impl TodoList {
    pub fn new(items: Vec<TodoItem>) -> Self {
        TodoList { items }
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(|t| t.text.clone()).collect()
    }

    pub fn replace_all(&mut self, items: Vec<TodoItem>) {
        self.items = items;
    }

    /// Remove up to `n` items from the front; returns how many were removed
    pub fn drop_front(&mut self, n: usize) -> usize {
        let n = n.min(self.items.len());
        self.items.drain(..n);
        n
    }

    pub fn remove_by_id(&mut self, id: &str) -> bool {
        match self.items.iter().position(|t| t.id == id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove one todo per completion. A completion naming a listed todo
    /// removes that todo; the rest remove from the front.
    pub fn reconcile(&mut self, completions: &[Option<String>]) -> usize {
        let mut anonymous = 0;
        let mut removed = 0;
        for todo_id in completions {
            match todo_id.as_deref() {
                Some(id) if self.remove_by_id(id) => removed += 1,
                Some(id) => {
                    log::warn!("[SUPERVISOR] Completion names unknown todo '{}'", id);
                    anonymous += 1;
                }
                None => anonymous += 1,
            }
        }
        removed + self.drop_front(anonymous)
    }

    /// Apply one iteration's events. Only completions after the last
    /// replacement are reconciled; earlier ones are already reflected in it.
    pub fn apply_events(&mut self, events: &[TodoEvent]) -> usize {
        let start = match events
            .iter()
            .rposition(|e| matches!(e, TodoEvent::Replaced(_)))
        {
            Some(index) => {
                if let TodoEvent::Replaced(items) = &events[index] {
                    self.replace_all(items.clone());
                }
                index + 1
            }
            None => 0,
        };

        let completions: Vec<Option<String>> = events[start..]
            .iter()
            .filter_map(|e| match e {
                TodoEvent::WorkerFinished { todo_id } => Some(todo_id.clone()),
                TodoEvent::Replaced(_) => None,
            })
            .collect();
        self.reconcile(&completions)
    }

    /// Numbered list for the supervisor prompt
    pub fn render(&self) -> String {
        if self.items.is_empty() {
            return "  (No todos yet)".to_string();
        }
        self.items
            .iter()
            .enumerate()
            .map(|(i, t)| format!("  {}. [{}] {}", i + 1, t.id, t.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
