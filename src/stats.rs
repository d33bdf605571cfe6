//! Task counts for the side panel.

use crate::blueprint::Blueprint;
use crate::model::{EntityId, Task, TaskStatus};
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub completed: usize,
    /// Whole percent, rounded half up; 0 without tasks.
    pub completion_rate: u32,
}

impl TaskStats {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut stats = TaskStats::default();
        for task in tasks {
            stats.total += 1;
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Blocked => stats.blocked += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
        }
        if stats.total > 0 {
            stats.completion_rate =
                (stats.completed as f64 / stats.total as f64 * 100.0).round() as u32;
        }
        stats
    }
}

/// Stats over the tasks linked to pins inside `room_id`. A task linked from
/// several pins in the room counts once.
pub fn room_progress(blueprint: &Blueprint, room_id: &EntityId, tasks: &[Task]) -> TaskStats {
    let linked: HashSet<&str> = blueprint
        .pins_in_room(room_id)
        .into_iter()
        .filter_map(|pin| pin.task_id.as_deref())
        .collect();
    TaskStats::from_tasks(tasks.iter().filter(|t| linked.contains(t.id.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Pin, Point, Room};

    fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.into(),
            title: id.into(),
            status,
            priority: Default::default(),
        }
    }

    #[test]
    fn completion_rate_rounds_half_up() {
        assert_eq!(TaskStats::from_tasks(&[]).completion_rate, 0);

        let tasks = vec![
            task("a", TaskStatus::Completed),
            task("b", TaskStatus::Pending),
            task("c", TaskStatus::Blocked),
        ];
        let stats = TaskStats::from_tasks(&tasks);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completion_rate, 33);
        assert_eq!(stats.blocked, 1);

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let status = if i == 0 { TaskStatus::Completed } else { TaskStatus::InProgress };
                task(&i.to_string(), status)
            })
            .collect();
        // 1/8 = 12.5%
        assert_eq!(TaskStats::from_tasks(&tasks).completion_rate, 13);
    }

    #[test]
    fn room_progress_counts_linked_tasks_inside_the_room() {
        let room = Room {
            id: EntityId::new("r1"),
            name: "Bath".into(),
            points: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0), Point::new(0.0, 10.0)],
        };
        let pins = vec![
            Pin { id: EntityId::new("p1"), task_id: Some("a".into()), position: Point::new(2.0, 2.0) },
            Pin { id: EntityId::new("p2"), task_id: Some("a".into()), position: Point::new(3.0, 3.0) },
            Pin { id: EntityId::new("p3"), task_id: Some("b".into()), position: Point::new(50.0, 3.0) },
            Pin { id: EntityId::new("p4"), task_id: None, position: Point::new(5.0, 5.0) },
        ];
        let bp = Blueprint::new(vec![room], pins);
        let tasks = vec![task("a", TaskStatus::Completed), task("b", TaskStatus::Pending)];
        let stats = room_progress(&bp, &EntityId::new("r1"), &tasks);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.completion_rate, 100);
    }
}
