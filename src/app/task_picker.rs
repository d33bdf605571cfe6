use eframe::egui;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use planmark::model::{Task, TaskId};

/// Tasks whose selector label matches `query`, best match first.
pub(super) fn filter_tasks<'t>(tasks: &'t [Task], query: &str) -> Vec<&'t Task> {
    let q = query.trim();
    if q.is_empty() {
        return tasks.iter().collect();
    }
    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(&Task, i64)> = tasks
        .iter()
        .filter_map(|t| matcher.fuzzy_match(&t.selector_label(), q).map(|s| (t, s)))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.title.cmp(&b.0.title)));
    scored.into_iter().map(|(t, _)| t).collect()
}

/// Searchable task list. Returns the clicked task id; the empty entry at
/// the top unlinks.
pub(super) fn task_picker(
    ui: &mut egui::Ui,
    tasks: &[Task],
    query: &mut String,
    current: Option<&TaskId>,
) -> Option<Option<TaskId>> {
    let mut picked = None;
    ui.add(
        egui::TextEdit::singleline(query)
            .desired_width(f32::INFINITY)
            .hint_text("Search tasks"),
    );
    egui::ScrollArea::vertical().max_height(96.0).show(ui, |ui| {
        if ui
            .add(egui::Button::new("— No task —").selected(current.is_none()))
            .clicked()
        {
            picked = Some(None);
        }
        for task in filter_tasks(tasks, query).into_iter().take(24) {
            let selected = current.is_some_and(|c| c == &task.id);
            if ui
                .add(egui::Button::new(task.selector_label()).selected(selected))
                .clicked()
            {
                picked = Some(Some(task.id.clone()));
            }
        }
    });
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use planmark::model::TaskStatus;

    fn task(id: &str, title: &str) -> Task {
        Task {
            id: id.into(),
            title: title.into(),
            status: TaskStatus::Pending,
            priority: Default::default(),
        }
    }

    #[test]
    fn empty_query_keeps_every_task_in_order() {
        let tasks = vec![task("1", "Pour slab"), task("2", "Frame walls")];
        let ids: Vec<_> = filter_tasks(&tasks, "  ").iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn query_narrows_to_matching_titles() {
        let tasks = vec![
            task("1", "Pour slab"),
            task("2", "Frame walls"),
            task("3", "Install drywall"),
        ];
        let ids: Vec<_> = filter_tasks(&tasks, "wall").iter().map(|t| t.id.as_str()).collect();
        assert!(ids.contains(&"2") && ids.contains(&"3"));
        assert!(!ids.contains(&"1"));
    }
}
