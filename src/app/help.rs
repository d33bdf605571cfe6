use eframe::egui;

pub(super) fn draw_help_window(ctx: &egui::Context, open: &mut bool) {
    egui::Window::new("Help")
        .open(open)
        .resizable(true)
        .default_width(480.0)
        .default_height(420.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Keyboard Shortcuts");
                ui.separator();

                ui.label("General");
                help_row(ui, "⌘O", "Open blueprint image");
                help_row(ui, "⌘S", "Save selected room or pin");
                help_row(ui, "⌘⇧S", "Export SVG");
                help_row(ui, "F1", "Show this help");
                help_row(ui, "Escape", "Cancel drawing, drag or editor");

                ui.add_space(10.0);
                ui.label("Tools");
                help_row(ui, "V", "Select");
                help_row(ui, "R", "Draw room");
                help_row(ui, "P", "Place pin");
                help_row(ui, "Space (hold)", "Pan");
                help_row(ui, "Scroll wheel", "Zoom in/out");

                ui.add_space(10.0);
                ui.label("Drawing a room");
                help_row(ui, "Click", "Add vertex");
                help_row(ui, "Click first vertex", "Close outline (3+ vertices)");
                help_row(ui, "Enter", "Finish outline");
                help_row(ui, "Backspace", "Remove last vertex");

                ui.add_space(10.0);
                ui.label("Editing");
                help_row(ui, "Click room / pin", "Open its editor");
                help_row(ui, "Drag vertex", "Reshape the selected room");
                help_row(ui, "Drag pin", "Move pin");
                help_row(ui, "Delete / Backspace", "Delete selection");

                ui.add_space(20.0);
                ui.heading("Sync");
                ui.separator();
                ui.label("Edits show immediately and are saved in the background.");
                ui.label("Labels marked \"not saved\" failed to save; save again or revert them from the side panel.");
            });
        });
}

fn help_row(ui: &mut egui::Ui, key: &str, desc: &str) {
    ui.horizontal(|ui| {
        ui.add_sized([140.0, 18.0], egui::Label::new(egui::RichText::new(key).monospace().strong()));
        ui.label(desc);
    });
}
