use eframe::egui;
use planmark::blueprint::ModelResult;
use planmark::controller::Selection;
use planmark::model::{new_task_route, task_detail_route};
use planmark::session::NoticeLevel;
use planmark::store::JsonFileStore;
use planmark::sync::BridgeRequest;
use planmark::worker::{BridgeWorker, WorkerReply};

use super::{BlueprintApp, BlueprintImage, settings, svg};

impl BlueprintApp {
    /// Starts a worker over the JSON store at `path` and loads the project.
    pub(super) fn open_store(&mut self, path: &str) {
        let store = match JsonFileStore::open(path) {
            Ok(store) => store,
            Err(e) => {
                log::warn!("event=store_open_failed path={path} error={e}");
                self.status = Some(format!("Open store failed: {e}"));
                return;
            }
        };
        match BridgeWorker::spawn(store) {
            Ok(worker) => {
                self.worker = Some(worker);
                self.settings.store_path = path.to_string();
                let project = self.settings.project_id.clone();
                self.switch_project(&project);
            }
            Err(e) => self.status = Some(format!("Could not start store worker: {e}")),
        }
    }

    pub(super) fn open_store_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            self.open_store(&path.display().to_string());
            self.persist_settings();
        }
    }

    /// Closes the current view and requests `project` from the store.
    pub(super) fn switch_project(&mut self, project: &str) {
        self.session.open(project.to_string());
        self.settings.project_id = project.to_string();
        self.buffers = Default::default();
        let Some(worker) = &self.worker else {
            self.status = Some("No store open".to_string());
            return;
        };
        match worker.load(self.session.epoch(), project.to_string()) {
            Ok(()) => self.status = Some(format!("Loading {project}…")),
            Err(e) => self.status = Some(format!("Load failed: {e}")),
        }
    }

    pub(super) fn dispatch(&mut self, requests: Vec<BridgeRequest>) {
        if requests.is_empty() {
            return;
        }
        let Some(worker) = &self.worker else {
            log::warn!("event=requests_dropped count={} reason=no_store", requests.len());
            self.status = Some("No store open; changes stay local".to_string());
            return;
        };
        if let Err(e) = worker.submit_all(requests) {
            self.status = Some(format!("Save failed: {e}"));
        }
    }

    /// Runs a session action and dispatches what it returns.
    pub(super) fn run(&mut self, action: impl FnOnce(&mut planmark::session::BlueprintSession) -> ModelResult<Vec<BridgeRequest>>) -> bool {
        match action(&mut self.session) {
            Ok(requests) => {
                self.dispatch(requests);
                true
            }
            Err(e) => {
                self.buffers.error = Some(e.to_string());
                self.status = Some(e.to_string());
                false
            }
        }
    }

    pub(super) fn poll_worker(&mut self, ctx: &egui::Context) {
        let Some(worker) = &self.worker else {
            return;
        };
        let replies = worker.poll();
        for reply in replies {
            match reply {
                WorkerReply::Bridge(reply) => {
                    let released = self.session.apply_reply(reply);
                    self.dispatch(released);
                }
                WorkerReply::Loaded {
                    epoch,
                    project,
                    result,
                } => {
                    if epoch != self.session.epoch() || &project != self.session.project() {
                        log::debug!("event=stale_load project={project}");
                        continue;
                    }
                    match result {
                        Ok(snapshot) => {
                            self.session.load(snapshot);
                            self.status = Some(format!("Loaded {project}"));
                        }
                        Err(e) => self.status = Some(format!("Load failed: {e}")),
                    }
                }
            }
        }
        for notice in self.session.drain_notices() {
            if notice.level == NoticeLevel::Error {
                self.buffers.error = Some(notice.message.clone());
            }
            self.status = Some(notice.message);
        }
        if self.session.in_flight() > 0 {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        }
    }

    pub(super) fn load_image(&mut self, ctx: &egui::Context, path: &str) {
        let decoded = match image::open(path) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                self.status = Some(format!("Image load failed: {e}"));
                return;
            }
        };
        let size = [decoded.width() as usize, decoded.height() as usize];
        let color = egui::ColorImage::from_rgba_unmultiplied(size, decoded.as_raw());
        let texture = ctx.load_texture("blueprint", color, egui::TextureOptions::LINEAR);
        log::info!("event=image_loaded path={path} width={} height={}", size[0], size[1]);
        self.image = Some(BlueprintImage {
            texture,
            size: egui::vec2(size[0] as f32, size[1] as f32),
            path: path.to_string(),
        });
        self.settings.image_path = Some(path.to_string());
        self.status = Some(format!("Opened {path}"));
    }

    pub(super) fn open_image_dialog(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg"])
            .pick_file()
        {
            self.load_image(ctx, &path.display().to_string());
            self.persist_settings();
        }
    }

    fn image_size(&self) -> Option<egui::Vec2> {
        self.image.as_ref().map(|img| img.size)
    }

    pub(super) fn save_svg_to_path(&mut self) {
        let doc = svg::blueprint_to_svg(self.session.blueprint(), self.session.tasks(), self.image_size());
        match std::fs::write(&self.settings.svg_path, doc) {
            Ok(()) => self.status = Some(format!("Saved {}", self.settings.svg_path)),
            Err(e) => self.status = Some(format!("SVG save failed: {e}")),
        }
    }

    pub(super) fn save_svg_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name(&self.settings.svg_path)
            .add_filter("SVG", &["svg"])
            .save_file()
        {
            let path_str = path.display().to_string();
            let doc = svg::blueprint_to_svg(self.session.blueprint(), self.session.tasks(), self.image_size());
            match std::fs::write(&path, doc) {
                Ok(()) => {
                    self.settings.svg_path = path_str.clone();
                    self.status = Some(format!("Saved {}", path_str));
                    self.persist_settings();
                }
                Err(e) => self.status = Some(format!("SVG save failed: {e}")),
            }
        }
    }

    /// Saves the selected room, or the dragged position of the selected pin.
    pub(super) fn save_selection(&mut self) {
        let Some(selection) = self.session.state().selection.clone() else {
            self.status = Some("Nothing selected".to_string());
            return;
        };
        let saved = match &selection {
            Selection::Room(id) => self.run(|s| s.save_room(id)),
            Selection::Pin(id) => self.run(|s| s.save_pin(id)),
        };
        if saved {
            self.status = Some("Saving…".to_string());
        }
    }

    pub(super) fn delete_selection(&mut self) {
        let selection = self.session.state().selection.clone();
        match selection {
            Some(Selection::Room(_)) => {
                self.run(|s| s.delete_room());
            }
            Some(Selection::Pin(_)) => {
                self.run(|s| s.delete_pin());
            }
            None => {}
        }
        self.buffers = Default::default();
    }

    fn dashboard_url(&self, route: &str) -> String {
        format!("{}{}", self.settings.dashboard_url.trim_end_matches('/'), route)
    }

    pub(super) fn open_task_page(&self, ctx: &egui::Context, task_id: &str) {
        let url = self.dashboard_url(&task_detail_route(self.session.project(), task_id));
        ctx.open_url(egui::OpenUrl::new_tab(url));
    }

    pub(super) fn open_new_task_page(&self, ctx: &egui::Context) {
        let url = self.dashboard_url(&new_task_route(self.session.project()));
        ctx.open_url(egui::OpenUrl::new_tab(url));
    }

    pub(super) fn persist_settings(&mut self) {
        self.settings.interaction = *self.session.config();
        if let Err(e) = settings::save_settings(&self.settings_path, &self.settings) {
            self.status = Some(format!("Settings save failed: {e}"));
        }
    }

    pub(super) fn reload_settings(&mut self, ctx: &egui::Context) {
        let Some(loaded) = settings::load_settings(&self.settings_path) else {
            self.status = Some(format!("No settings at {}", self.settings_path));
            return;
        };
        let store_changed = loaded.store_path != self.settings.store_path;
        let project_changed = loaded.project_id != self.settings.project_id;
        let image_changed = loaded.image_path != self.image.as_ref().map(|i| i.path.clone());
        self.session.set_config(loaded.interaction);
        self.settings = loaded;
        if store_changed {
            let path = self.settings.store_path.clone();
            self.open_store(&path);
        } else if project_changed {
            let project = self.settings.project_id.clone();
            self.switch_project(&project);
        }
        if image_changed {
            if let Some(path) = self.settings.image_path.clone() {
                self.load_image(ctx, &path);
            }
        }
        self.status = Some("Settings reloaded".to_string());
    }
}
