use eframe::egui;
use planmark::controller::Selection;
use planmark::model::TaskId;
use planmark::placement::PopupKind;
use planmark::sync::EntityKey;

use super::geometry::viewport_size;
use super::render::{status_color, sync_badge};
use super::task_picker::task_picker;
use super::{BlueprintApp, EditorBuffers};

enum EditorAction {
    SaveName,
    Cancel,
    DeleteRoom,
    Link(Option<TaskId>),
    DeletePin,
    OpenTask(TaskId),
    NewTask,
    Close,
}

impl BlueprintApp {
    /// Resets the text buffers when the editor opens on another entity.
    pub(super) fn sync_editor_buffers(&mut self) {
        let target = self.session.state().editor.as_ref().map(|e| e.target.clone());
        let target_id = target.as_ref().map(|t| t.id().clone());
        if target_id == self.buffers.target {
            return;
        }
        let mut buffers = EditorBuffers {
            target: target_id,
            ..Default::default()
        };
        match &target {
            Some(Selection::Room(id)) => {
                if let Some(room) = self.session.blueprint().room(id) {
                    buffers.room_name = room.name.clone();
                }
            }
            Some(Selection::Pin(id)) => {
                buffers.task_choice = self.session.blueprint().pin(id).and_then(|p| p.task_id.clone());
            }
            None => {}
        }
        self.buffers = buffers;
    }

    pub(super) fn draw_editor(&mut self, ctx: &egui::Context) {
        self.sync_editor_buffers();
        let Some(editor) = self.session.state().editor.clone() else {
            return;
        };
        let viewport = ctx.content_rect();
        let Some(top_left) = self.session.popup_position(viewport_size(viewport)) else {
            return;
        };
        let kind = editor.kind();
        let size = kind.size();
        let pos = viewport.min + egui::vec2(top_left.x, top_left.y);

        let session = &self.session;
        let buffers = &mut self.buffers;
        let mut action = None;
        egui::Area::new(egui::Id::new("blueprint_editor"))
            .fixed_pos(pos)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                let frame = egui::Frame::new()
                    .fill(ui.visuals().window_fill)
                    .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(90, 160, 255)))
                    .inner_margin(10.0)
                    .corner_radius(egui::CornerRadius::same(8));
                frame.show(ui, |ui| {
                    ui.set_width(size.width - 20.0);
                    ui.set_min_height(size.height - 20.0);
                    let key = match &editor.target {
                        Selection::Room(id) => EntityKey::Room(id.clone()),
                        Selection::Pin(id) => EntityKey::Pin(id.clone()),
                    };
                    match kind {
                        PopupKind::RoomEditor => {
                            ui.horizontal(|ui| {
                                ui.strong("Room name");
                                if let Some((badge, color)) = sync_badge(session.status(&key)) {
                                    ui.colored_label(color, badge);
                                }
                            });
                            let resp = ui.add(
                                egui::TextEdit::singleline(&mut buffers.room_name)
                                    .desired_width(f32::INFINITY)
                                    .hint_text("e.g. Kitchen"),
                            );
                            if buffers.room_name.is_empty() && !resp.has_focus() {
                                resp.request_focus();
                            }
                            if resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                                action = Some(EditorAction::SaveName);
                            }
                            if let Some(err) = &buffers.error {
                                ui.colored_label(egui::Color32::from_rgb(200, 40, 40), err);
                            }
                            ui.horizontal(|ui| {
                                if ui.button("Save").clicked() {
                                    action = Some(EditorAction::SaveName);
                                }
                                if ui.button("Cancel").clicked() {
                                    action = Some(EditorAction::Cancel);
                                }
                                if ui.button("Delete").clicked() {
                                    action = Some(EditorAction::DeleteRoom);
                                }
                            });
                        }
                        PopupKind::TaskEditor => {
                            let linked = session.linked_task(key.id());
                            ui.horizontal(|ui| {
                                match linked {
                                    Some(task) => {
                                        ui.colored_label(status_color(Some(task.status)), "●");
                                        ui.strong(&task.title);
                                        ui.label(format!("{} · {}", task.status.label(), task.priority.label()));
                                    }
                                    None => {
                                        ui.weak("No task linked");
                                    }
                                }
                                if let Some((badge, color)) = sync_badge(session.status(&key)) {
                                    ui.colored_label(color, badge);
                                }
                            });
                            if let Some(picked) = task_picker(
                                ui,
                                session.tasks(),
                                &mut buffers.task_query,
                                buffers.task_choice.as_ref(),
                            ) {
                                buffers.task_choice = picked.clone();
                                action = Some(EditorAction::Link(picked));
                            }
                            if let Some(err) = &buffers.error {
                                ui.colored_label(egui::Color32::from_rgb(200, 40, 40), err);
                            }
                            ui.horizontal(|ui| {
                                if let Some(task) = linked {
                                    if ui.button("Open task").clicked() {
                                        action = Some(EditorAction::OpenTask(task.id.clone()));
                                    }
                                }
                                if ui.button("New task…").clicked() {
                                    action = Some(EditorAction::NewTask);
                                }
                                if ui.button("Delete pin").clicked() {
                                    action = Some(EditorAction::DeletePin);
                                }
                                if ui.button("Close").clicked() {
                                    action = Some(EditorAction::Close);
                                }
                            });
                        }
                    }
                });
            });

        let Some(action) = action else {
            return;
        };
        self.buffers.error = None;
        match action {
            EditorAction::SaveName => {
                let name = self.buffers.room_name.clone();
                if self.run(|s| s.save_room_name(&name)) {
                    self.status = Some("Saving room…".to_string());
                }
            }
            EditorAction::Cancel => self.session.cancel_editor(),
            EditorAction::DeleteRoom => {
                self.run(|s| s.delete_room());
            }
            EditorAction::Link(task_id) => {
                self.run(|s| s.link_task(task_id));
            }
            EditorAction::DeletePin => {
                self.run(|s| s.delete_pin());
            }
            EditorAction::OpenTask(task_id) => self.open_task_page(ctx, &task_id),
            EditorAction::NewTask => self.open_new_task_page(ctx),
            EditorAction::Close => {
                self.dispatch_event(planmark::controller::Event::DismissEditor);
            }
        }
    }
}
