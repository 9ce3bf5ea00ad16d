use egui::{Color32, Key, RichText, Slider, TextEdit, Ui};
use log::{debug, trace};

use crate::id::LayerId;
use crate::layer::BlendMode;
use crate::surface::{DroppedFile, LayerPanel, PanelEvent};

#[derive(Debug, Clone)]
struct PanelEntry {
    id: LayerId,
    title: String,
    visible: bool,
    opacity_percent: f32,
    multiply: bool,
}

/// Layer list panel for egui hosts.
///
/// Keeps its own copy of the list, topmost layer first. `show` returns the user's actions as
/// [`PanelEvent`]s which the host passes on to the viewer.
#[derive(Debug, Default)]
pub struct LayerListPanel {
    entries: Vec<PanelEntry>,
    search_text: String,
    notices: Vec<String>,
    prompt: Option<String>,
    feature_info: Option<String>,
}

impl LayerListPanel {
    pub fn ids(&self) -> Vec<LayerId> {
        self.entries
            .iter()
            .map(|entry| entry.id.clone())
            .collect()
    }

    pub fn show(&mut self, ui: &mut Ui) -> Vec<PanelEvent> {
        let mut events = vec![];

        self.show_search(ui, &mut events);
        ui.separator();

        ui.heading("Layers");
        self.show_layers(ui, &mut events);

        if let Some(text) = &self.feature_info {
            ui.separator();
            ui.label(text);
        }

        self.show_notices(ui);
        collect_dropped_files(ui, &mut events);

        if !events.is_empty() {
            trace!("panel events: {:?}", events);
        }
        events
    }

    fn show_search(&mut self, ui: &mut Ui, events: &mut Vec<PanelEvent>) {
        ui.horizontal(|ui| {
            let response = ui.add(TextEdit::singleline(&mut self.search_text).hint_text("Search"));
            let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
            if submitted || ui.button("Go").clicked() {
                events.push(PanelEvent::SearchSubmitted(self.search_text.clone()));
            }
        });

        let Some(prompt) = self.prompt.clone() else {
            return;
        };
        ui.label(prompt);
        ui.horizontal(|ui| {
            if ui.button("Yes").clicked() {
                self.prompt = None;
                events.push(PanelEvent::JumpConfirmed);
            }
            if ui.button("No").clicked() {
                self.prompt = None;
                events.push(PanelEvent::JumpDeclined);
            }
        });
    }

    fn show_layers(&mut self, ui: &mut Ui, events: &mut Vec<PanelEvent>) {
        let mut moved = None;
        let count = self.entries.len();

        for (index, entry) in self.entries.iter_mut().enumerate() {
            ui.horizontal(|ui| {
                if ui
                    .checkbox(&mut entry.visible, "")
                    .changed()
                {
                    events.push(PanelEvent::VisibilityToggled(entry.id.clone(), entry.visible));
                }
                ui.label(&entry.title);
            });

            ui.horizontal(|ui| {
                if ui
                    .add(Slider::new(&mut entry.opacity_percent, 0.0..=100.0).suffix("%"))
                    .changed()
                {
                    events.push(PanelEvent::OpacityChanged(entry.id.clone(), entry.opacity_percent / 100.0));
                }
                if ui
                    .toggle_value(&mut entry.multiply, "Multiply")
                    .changed()
                {
                    events.push(PanelEvent::BlendToggled(entry.id.clone()));
                }
            });

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(index > 0, egui::Button::new("▲").small())
                    .clicked()
                {
                    moved = Some((index, index - 1));
                }
                if ui
                    .add_enabled(index + 1 < count, egui::Button::new("▼").small())
                    .clicked()
                {
                    moved = Some((index, index + 1));
                }
                if ui.small_button("Zoom").clicked() {
                    events.push(PanelEvent::ZoomToLayer(entry.id.clone()));
                }
                if ui.small_button("Remove").clicked() {
                    events.push(PanelEvent::RemoveRequested(entry.id.clone()));
                }
            });
            ui.add_space(4.0);
        }

        if let Some((from, to)) = moved {
            if let Some(order) = self.move_entry(from, to) {
                events.push(PanelEvent::ReorderRequested(order));
            }
        }
    }

    fn show_notices(&mut self, ui: &mut Ui) {
        if self.notices.is_empty() {
            return;
        }
        ui.separator();
        for notice in &self.notices {
            ui.label(RichText::new(notice).color(Color32::LIGHT_RED));
        }
        if ui.small_button("Clear").clicked() {
            self.notices.clear();
        }
    }

    /// Moves an entry within the list, returning the new list order.
    fn move_entry(&mut self, from: usize, to: usize) -> Option<Vec<LayerId>> {
        if from >= self.entries.len() || to >= self.entries.len() || from == to {
            return None;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Some(self.ids())
    }
}

fn collect_dropped_files(ui: &Ui, events: &mut Vec<PanelEvent>) {
    let dropped = ui.ctx().input(|i| i.raw.dropped_files.clone());
    for file in dropped {
        debug!("File dropped. name: '{}', path: {:?}", file.name, file.path);
        let name = match (&file.path, file.name.is_empty()) {
            (Some(path), true) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            _ => file.name,
        };
        events.push(PanelEvent::FileDropped(DroppedFile {
            name,
            path: file.path,
            bytes: file.bytes,
        }));
    }
}

impl LayerPanel for LayerListPanel {
    fn on_layer_added(&mut self, id: &LayerId, title: &str, visible: bool) {
        self.entries.insert(0, PanelEntry {
            id: id.clone(),
            title: title.to_string(),
            visible,
            opacity_percent: 100.0,
            multiply: false,
        });
    }

    fn on_layer_removed(&mut self, id: &LayerId) {
        self.entries
            .retain(|entry| &entry.id != id);
    }

    fn on_layer_style_changed(&mut self, id: &LayerId, opacity: f32, blend_mode: BlendMode) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| &entry.id == id)
        {
            entry.opacity_percent = opacity * 100.0;
            entry.multiply = blend_mode == BlendMode::Multiply;
        }
    }

    fn notify(&mut self, message: &str) {
        self.notices
            .push(message.to_string());
    }

    fn request_confirmation(&mut self, prompt: &str) {
        self.prompt = Some(prompt.to_string());
    }

    fn show_feature_info(&mut self, text: &str) {
        self.feature_info = match text.is_empty() {
            true => None,
            false => Some(text.to_string()),
        };
    }
}

#[cfg(test)]
mod ui_tests {
    use rstest::rstest;

    use super::*;

    fn panel() -> LayerListPanel {
        let mut panel = LayerListPanel::default();
        for id in ["L0", "L1", "L2"] {
            panel.on_layer_added(&LayerId::from(id), id, true);
        }
        panel
    }

    fn ids(values: &[&str]) -> Vec<LayerId> {
        values
            .iter()
            .map(|value| LayerId::from(*value))
            .collect()
    }

    #[test]
    fn newest_entry_is_listed_first() {
        assert_eq!(panel().ids(), ids(&["L2", "L1", "L0"]));
    }

    #[rstest]
    #[case(2, 0, Some(ids(&["L0", "L2", "L1"])))]
    #[case(0, 1, Some(ids(&["L1", "L2", "L0"])))]
    #[case(1, 1, None)]
    #[case(2, 3, None)]
    fn moving_entries(#[case] from: usize, #[case] to: usize, #[case] expected: Option<Vec<LayerId>>) {
        let mut panel = panel();

        assert_eq!(panel.move_entry(from, to), expected);
    }

    #[test]
    fn entry_starts_from_the_layer_style() {
        // given
        let mut panel = panel();
        let id = LayerId::from("L1");

        // when
        panel.on_layer_style_changed(&id, 0.25, BlendMode::Multiply);

        // then
        let entry = panel
            .entries
            .iter()
            .find(|entry| entry.id == id)
            .unwrap();
        assert_eq!(entry.opacity_percent, 25.0);
        assert!(entry.multiply);
        assert!(panel
            .entries
            .iter()
            .filter(|entry| entry.id != id)
            .all(|entry| entry.opacity_percent == 100.0 && !entry.multiply));
    }

    #[test]
    fn removed_entry_is_dropped() {
        let mut panel = panel();

        panel.on_layer_removed(&LayerId::from("L1"));

        assert_eq!(panel.ids(), ids(&["L2", "L0"]));
    }

    #[test]
    fn empty_feature_info_clears_the_label() {
        let mut panel = panel();

        panel.show_feature_info("Fuji");
        panel.show_feature_info("");

        assert!(panel.feature_info.is_none());
    }
}
