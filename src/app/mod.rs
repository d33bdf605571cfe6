use eframe::egui;
use planmark::model::{EntityId, TaskId};
use planmark::session::BlueprintSession;
use planmark::worker::BridgeWorker;

mod actions;
mod editors;
mod geometry;
mod help;
mod render;
pub(crate) mod settings;
mod svg;
mod task_picker;
mod update;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tool {
    Select,
    Room,
    Pin,
    Pan,
}

#[derive(Clone, Copy, Debug)]
struct View {
    pan_screen: egui::Vec2,
    zoom: f32,
}

impl Default for View {
    fn default() -> Self {
        Self {
            pan_screen: egui::Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl View {
    fn image_to_screen(&self, origin: egui::Pos2, image: egui::Pos2) -> egui::Pos2 {
        origin + self.pan_screen + image.to_vec2() * self.zoom
    }

    fn screen_to_image(&self, origin: egui::Pos2, screen: egui::Pos2) -> egui::Pos2 {
        ((screen - origin - self.pan_screen) / self.zoom).to_pos2()
    }

    fn zoom_about_screen_point(
        &mut self,
        origin: egui::Pos2,
        screen_point: egui::Pos2,
        zoom_delta: f32,
    ) {
        let before = self.screen_to_image(origin, screen_point);
        self.zoom = (self.zoom * zoom_delta).clamp(0.1, 8.0);
        let after_screen = self.image_to_screen(origin, before);
        self.pan_screen += screen_point - after_screen;
    }
}

struct BlueprintImage {
    texture: egui::TextureHandle,
    size: egui::Vec2,
    path: String,
}

/// Text buffers of the open editor popup.
#[derive(Default)]
struct EditorBuffers {
    target: Option<EntityId>,
    room_name: String,
    task_query: String,
    task_choice: Option<TaskId>,
    error: Option<String>,
}

pub struct BlueprintApp {
    session: BlueprintSession,
    worker: Option<BridgeWorker>,
    image: Option<BlueprintImage>,
    tool: Tool,
    tool_before_pan: Option<Tool>,
    view: View,
    buffers: EditorBuffers,
    settings: settings::AppSettings,
    settings_path: String,
    status: Option<String>,
    show_help: bool,
}

impl BlueprintApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings_path: String, settings: settings::AppSettings) -> Self {
        let session = BlueprintSession::new(settings.project_id.clone(), settings.interaction);
        let mut app = Self {
            session,
            worker: None,
            image: None,
            tool: Tool::Select,
            tool_before_pan: None,
            view: View::default(),
            buffers: EditorBuffers::default(),
            settings,
            settings_path,
            status: None,
            show_help: false,
        };
        let store_path = app.settings.store_path.clone();
        app.open_store(&store_path);
        if let Some(image_path) = app.settings.image_path.clone() {
            app.load_image(&cc.egui_ctx, &image_path);
        }
        app
    }
}
