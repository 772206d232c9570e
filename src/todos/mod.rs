//! Todos — one-line tasks with a fixed priority and a local view filter.

pub mod model;
pub mod panel;

pub use model::{NewTodo, Priority, Todo, TodoFilter};
pub use panel::TodoPanel;
