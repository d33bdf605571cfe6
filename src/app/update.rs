use eframe::egui;
use planmark::controller::{Event, Mode};
use planmark::session::SyncStatus;
use planmark::stats::{TaskStats, room_progress};
use planmark::sync::EntityKey;
use planmark::validation::PolygonPolicy;

use super::geometry::pointer_at;
use super::help::draw_help_window;
use super::render::{draw_background, draw_in_progress, draw_pins, draw_rooms, sync_badge, tool_button};
use super::{BlueprintApp, Tool};

enum Shortcut {
    OpenImage,
    ExportSvg,
    SaveSelection,
    Help,
    Escape,
    Tool(Tool),
    Finish,
    Backspace,
    Delete,
}

impl BlueprintApp {
    pub(super) fn dispatch_event(&mut self, event: Event) {
        let requests = self.session.handle(event);
        self.dispatch(requests);
    }

    fn set_tool(&mut self, tool: Tool) {
        if self.tool == tool {
            return;
        }
        self.tool = tool;
        match tool {
            Tool::Room => self.dispatch_event(Event::BeginRoom),
            Tool::Pin => self.dispatch_event(Event::BeginPin),
            Tool::Select => {
                if !self.session.state().is_idle() {
                    self.dispatch_event(Event::Cancel);
                }
            }
            Tool::Pan => {}
        }
    }

    fn collect_shortcuts(&self, ctx: &egui::Context) -> Vec<Shortcut> {
        let wants_keyboard = ctx.wants_keyboard_input();
        let mut out = Vec::new();
        ctx.input_mut(|i| {
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::O) {
                out.push(Shortcut::OpenImage);
            }
            if i.consume_key(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::S) {
                out.push(Shortcut::ExportSvg);
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::S) {
                out.push(Shortcut::SaveSelection);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::F1) {
                out.push(Shortcut::Help);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Escape) {
                out.push(Shortcut::Escape);
            }
            if wants_keyboard {
                return;
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::V) {
                out.push(Shortcut::Tool(Tool::Select));
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::R) {
                out.push(Shortcut::Tool(Tool::Room));
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::P) {
                out.push(Shortcut::Tool(Tool::Pin));
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Enter) {
                out.push(Shortcut::Finish);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Backspace) {
                out.push(Shortcut::Backspace);
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Delete) {
                out.push(Shortcut::Delete);
            }
        });
        out
    }

    fn apply_shortcut(&mut self, ctx: &egui::Context, shortcut: Shortcut) {
        let drawing = matches!(self.session.state().mode, Mode::DrawingRoom { .. });
        match shortcut {
            Shortcut::OpenImage => self.open_image_dialog(ctx),
            Shortcut::ExportSvg => self.save_svg_dialog(),
            Shortcut::SaveSelection => self.save_selection(),
            Shortcut::Help => self.show_help = true,
            Shortcut::Escape => {
                if self.session.state().editor.is_some() && self.session.state().is_idle() {
                    self.session.cancel_editor();
                } else {
                    self.dispatch_event(Event::Cancel);
                }
                self.tool = Tool::Select;
                self.tool_before_pan = None;
            }
            Shortcut::Tool(tool) => self.set_tool(tool),
            Shortcut::Finish if drawing => self.dispatch_event(Event::FinishRoom),
            Shortcut::Backspace if drawing => self.dispatch_event(Event::UndoVertex),
            Shortcut::Backspace | Shortcut::Delete => self.delete_selection(),
            Shortcut::Finish => {}
        }
    }

    /// Falls back to the select tool once the controller has finished a
    /// drawing or placement gesture.
    fn follow_controller_mode(&mut self) {
        let idle = self.session.state().is_idle();
        if idle && matches!(self.tool, Tool::Room | Tool::Pin) {
            self.tool = Tool::Select;
        }
    }

    fn canvas(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        let origin = rect.min;
        let viewport = ctx.content_rect();

        let space_down = ctx.input(|i| i.key_down(egui::Key::Space)) && !ctx.wants_keyboard_input();
        if space_down {
            if self.tool_before_pan.is_none() {
                self.tool_before_pan = Some(self.tool);
                self.tool = Tool::Pan;
            }
        } else if let Some(prev) = self.tool_before_pan.take() {
            if self.tool == Tool::Pan {
                self.tool = prev;
            }
        }

        let scroll_delta = ctx.input(|i| i.raw_scroll_delta.y);
        if scroll_delta.abs() > 0.0 {
            if let Some(hover_pos) = ctx.input(|i| i.pointer.hover_pos()) {
                if rect.contains(hover_pos) {
                    let zoom_delta = (1.0 + scroll_delta * 0.001).clamp(0.8, 1.25);
                    self.view.zoom_about_screen_point(origin, hover_pos, zoom_delta);
                    self.session.set_zoom(self.view.zoom);
                }
            }
        }

        if self.tool == Tool::Pan {
            if response.dragged() {
                self.view.pan_screen += response.drag_delta();
            }
        } else {
            let view = self.view;
            let at = |pos: egui::Pos2| pointer_at(&view, origin, viewport, pos);
            if let Some(pos) = response.hover_pos() {
                self.dispatch_event(Event::Hover(at(pos)));
            }
            if response.drag_started() {
                let start = ctx
                    .input(|i| i.pointer.press_origin())
                    .or_else(|| response.interact_pointer_pos());
                if let Some(pos) = start {
                    self.dispatch_event(Event::DragStart(at(pos)));
                }
            }
            if response.dragged() && matches!(self.session.state().mode, Mode::Dragging(_)) {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.dispatch_event(Event::DragMove(at(pos)));
                }
            }
            if response.drag_stopped() {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.dispatch_event(Event::DragEnd(at(pos)));
                }
            }
            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.dispatch_event(Event::Tap(at(pos)));
                }
            }
        }
        self.follow_controller_mode();

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, &self.view, origin, self.image.as_ref());
        draw_rooms(&painter, origin, &self.view, &self.session);
        draw_pins(&painter, origin, &self.view, &self.session);
        draw_in_progress(&painter, origin, &self.view, self.session.state());
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Project");
        let mut project = self.settings.project_id.clone();
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut project);
            if ui.button("Load").clicked() {
                self.switch_project(&project.trim().to_string());
                self.persist_settings();
            }
        });
        if project != self.settings.project_id && !project.trim().is_empty() {
            self.settings.project_id = project;
        }

        ui.separator();
        let stats = TaskStats::from_tasks(self.session.tasks());
        ui.label(format!("Tasks: {}  ·  {}% complete", stats.total, stats.completion_rate));
        ui.add(egui::ProgressBar::new(stats.completion_rate as f32 / 100.0));
        ui.small(format!(
            "Pending {}  In progress {}  Blocked {}  Completed {}",
            stats.pending, stats.in_progress, stats.blocked, stats.completed
        ));

        let mut revert = None;
        let mut resave = None;
        ui.separator();
        ui.heading("Rooms");
        egui::ScrollArea::vertical()
            .id_salt("rooms")
            .max_height(220.0)
            .show(ui, |ui| {
                for room in &self.session.blueprint().rooms {
                    let key = EntityKey::Room(room.id.clone());
                    let status = self.session.status(&key);
                    let progress = room_progress(self.session.blueprint(), &room.id, self.session.tasks());
                    ui.horizontal(|ui| {
                        ui.label(room.display_name());
                        if progress.total > 0 {
                            ui.weak(format!("{}/{} done", progress.completed, progress.total));
                        }
                        if let Some((badge, color)) = sync_badge(status) {
                            ui.colored_label(color, badge);
                        }
                        if matches!(status, SyncStatus::Unconfirmed | SyncStatus::Modified) {
                            if ui.small_button("Save").clicked() {
                                resave = Some(key.clone());
                            }
                            if ui.small_button("Revert").clicked() {
                                revert = Some(key.clone());
                            }
                        }
                    });
                }
            });

        ui.separator();
        ui.heading("Pins");
        egui::ScrollArea::vertical()
            .id_salt("pins")
            .max_height(220.0)
            .show(ui, |ui| {
                for pin in &self.session.blueprint().pins {
                    let key = EntityKey::Pin(pin.id.clone());
                    let status = self.session.status(&key);
                    ui.horizontal(|ui| {
                        match self.session.linked_task(&pin.id) {
                            Some(task) => ui.label(task.selector_label()),
                            None => ui.weak("Unlinked pin"),
                        };
                        if let Some((badge, color)) = sync_badge(status) {
                            ui.colored_label(color, badge);
                        }
                        if matches!(status, SyncStatus::Unconfirmed | SyncStatus::Modified) {
                            if ui.small_button("Save").clicked() {
                                resave = Some(key.clone());
                            }
                            if ui.small_button("Revert").clicked() {
                                revert = Some(key.clone());
                            }
                        }
                    });
                }
            });

        if let Some(key) = revert {
            if !self.session.revert(&key) {
                self.status = Some("Wait for the pending save before reverting".to_string());
            }
        }
        if let Some(key) = resave {
            match &key {
                EntityKey::Room(id) => {
                    self.run(|s| s.save_room(id));
                }
                EntityKey::Pin(id) => {
                    self.run(|s| s.save_pin(id));
                }
            }
        }

        ui.separator();
        let mut strict = self.session.config().polygon_policy == PolygonPolicy::RequireSimple;
        if ui.checkbox(&mut strict, "Reject self-crossing rooms").changed() {
            let mut config = *self.session.config();
            config.polygon_policy = if strict {
                PolygonPolicy::RequireSimple
            } else {
                PolygonPolicy::Permissive
            };
            self.session.set_config(config);
            self.persist_settings();
        }
    }
}

impl eframe::App for BlueprintApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_worker(ctx);
        for shortcut in self.collect_shortcuts(ctx) {
            self.apply_shortcut(ctx, shortcut);
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open image… (⌘O)").clicked() {
                        self.open_image_dialog(ctx);
                        ui.close_menu();
                    }
                    if ui.button("Open store…").clicked() {
                        self.open_store_dialog();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Export SVG… (⌘⇧S)").clicked() {
                        self.save_svg_dialog();
                        ui.close_menu();
                    }
                    if ui.button(format!("Export to {}", self.settings.svg_path)).clicked() {
                        self.save_svg_to_path();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Reload settings").clicked() {
                        self.reload_settings(ctx);
                        ui.close_menu();
                    }
                });
                ui.separator();
                let current = self.tool;
                for (label, tool) in [
                    ("Select (V)", Tool::Select),
                    ("Room (R)", Tool::Room),
                    ("Pin (P)", Tool::Pin),
                    ("Pan (Space)", Tool::Pan),
                ] {
                    if tool_button(ui, label, tool, current) {
                        self.set_tool(tool);
                    }
                }
                ui.separator();
                if ui.button("Save (⌘S)").clicked() {
                    self.save_selection();
                }
                if ui.button("Help (F1)").clicked() {
                    self.show_help = true;
                }
            });
        });

        egui::SidePanel::right("right_panel")
            .default_width(260.0)
            .show(ctx, |ui| self.side_panel(ui));

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(status) = &self.status {
                    ui.label(status);
                } else {
                    ui.label("Ready");
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Zoom: {:.0}%", self.view.zoom * 100.0));
                    ui.separator();
                    ui.label(format!("Rooms: {}", self.session.blueprint().rooms.len()));
                    ui.separator();
                    ui.label(format!("Pins: {}", self.session.blueprint().pins.len()));
                    if self.session.in_flight() > 0 {
                        ui.separator();
                        ui.spinner();
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| self.canvas(ctx, ui));

        self.draw_editor(ctx);
        draw_help_window(ctx, &mut self.show_help);
    }
}
